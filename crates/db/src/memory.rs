//! In-process [`CredentialStore`] keeping users in a `HashMap`.
//!
//! Mirrors the PostgreSQL semantics the session layer relies on: ids are
//! assigned sequentially, usernames are matched case-insensitively, duplicate
//! username or email is a [`StoreError::Conflict`], and refresh token writes
//! are last-write-wins.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use tollgate_core::types::DbId;

use crate::models::user::{NewUser, User, UserProfile};
use crate::store::{CredentialStore, StoreError};

#[derive(Default)]
struct Inner {
    next_id: DbId,
    users: HashMap<DbId, User>,
}

/// Credential store held entirely in memory.
#[derive(Default)]
pub struct MemoryCredentialStore {
    inner: RwLock<Inner>,
}

impl MemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored users.
    pub async fn len(&self) -> usize {
        self.inner.read().await.users.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Delete a user outright. Returns `true` if it existed.
    pub async fn remove(&self, id: DbId) -> bool {
        self.inner.write().await.users.remove(&id).is_some()
    }
}

#[async_trait]
impl CredentialStore for MemoryCredentialStore {
    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }

    async fn find_by_username_or_email(
        &self,
        username: &str,
        email: &str,
    ) -> Result<Option<User>, StoreError> {
        let username = username.to_lowercase();
        let inner = self.inner.read().await;
        let found = inner
            .users
            .values()
            .filter(|u| u.username == username || u.email == email)
            .min_by_key(|u| u.id)
            .cloned();
        Ok(found)
    }

    async fn find_by_id(&self, id: DbId) -> Result<Option<User>, StoreError> {
        Ok(self.inner.read().await.users.get(&id).cloned())
    }

    async fn find_profile_by_id(&self, id: DbId) -> Result<Option<UserProfile>, StoreError> {
        Ok(self.inner.read().await.users.get(&id).map(UserProfile::from))
    }

    async fn create(&self, input: NewUser) -> Result<User, StoreError> {
        let mut inner = self.inner.write().await;

        if inner.users.values().any(|u| u.username == input.username) {
            return Err(StoreError::Conflict("uq_users_username".into()));
        }
        if inner.users.values().any(|u| u.email == input.email) {
            return Err(StoreError::Conflict("uq_users_email".into()));
        }

        inner.next_id += 1;
        let now = Utc::now();
        let user = User {
            id: inner.next_id,
            username: input.username,
            email: input.email,
            full_name: input.full_name,
            avatar_url: input.avatar_url,
            cover_image_url: input.cover_image_url,
            password_hash: input.password_hash,
            refresh_token: None,
            created_at: now,
            updated_at: now,
        };
        inner.users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn save_refresh_token(
        &self,
        id: DbId,
        refresh_token: Option<&str>,
    ) -> Result<bool, StoreError> {
        let mut inner = self.inner.write().await;
        match inner.users.get_mut(&id) {
            Some(user) => {
                user.refresh_token = refresh_token.map(str::to_string);
                user.updated_at = Utc::now();
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    fn new_user(username: &str, email: &str) -> NewUser {
        NewUser {
            username: username.to_string(),
            email: email.to_string(),
            full_name: "Test User".to_string(),
            avatar_url: "https://cdn.example/avatar.png".to_string(),
            cover_image_url: String::new(),
            password_hash: "hash".to_string(),
        }
    }

    #[tokio::test]
    async fn create_assigns_sequential_ids() {
        let store = MemoryCredentialStore::new();
        let a = store.create(new_user("alice", "alice@x.com")).await.unwrap();
        let b = store.create(new_user("bob", "bob@x.com")).await.unwrap();
        assert_eq!(a.id + 1, b.id);
        assert!(a.refresh_token.is_none());
        assert_eq!(store.len().await, 2);
    }

    #[tokio::test]
    async fn duplicate_username_or_email_conflicts() {
        let store = MemoryCredentialStore::new();
        store.create(new_user("alice", "alice@x.com")).await.unwrap();

        assert_matches!(
            store.create(new_user("alice", "other@x.com")).await,
            Err(StoreError::Conflict(c)) if c == "uq_users_username"
        );
        assert_matches!(
            store.create(new_user("other", "alice@x.com")).await,
            Err(StoreError::Conflict(c)) if c == "uq_users_email"
        );
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn lookup_matches_either_identifier() {
        let store = MemoryCredentialStore::new();
        let alice = store.create(new_user("alice", "alice@x.com")).await.unwrap();

        let by_username = store
            .find_by_username_or_email("ALICE", "nobody@x.com")
            .await
            .unwrap();
        assert_eq!(by_username.map(|u| u.id), Some(alice.id));

        let by_email = store
            .find_by_username_or_email("nobody", "alice@x.com")
            .await
            .unwrap();
        assert_eq!(by_email.map(|u| u.id), Some(alice.id));

        let missing = store
            .find_by_username_or_email("nobody", "nobody@x.com")
            .await
            .unwrap();
        assert!(missing.is_none());
    }

    #[tokio::test]
    async fn refresh_token_is_overwritten_and_cleared() {
        let store = MemoryCredentialStore::new();
        let alice = store.create(new_user("alice", "alice@x.com")).await.unwrap();

        assert!(store.save_refresh_token(alice.id, Some("t1")).await.unwrap());
        assert!(store.save_refresh_token(alice.id, Some("t2")).await.unwrap());
        let stored = store.find_by_id(alice.id).await.unwrap().unwrap();
        assert_eq!(stored.refresh_token.as_deref(), Some("t2"));

        assert!(store.save_refresh_token(alice.id, None).await.unwrap());
        let stored = store.find_by_id(alice.id).await.unwrap().unwrap();
        assert!(stored.refresh_token.is_none());
    }

    #[tokio::test]
    async fn save_refresh_token_for_missing_user_reports_false() {
        let store = MemoryCredentialStore::new();
        assert!(!store.save_refresh_token(99, Some("t")).await.unwrap());
    }

    #[tokio::test]
    async fn removed_user_is_gone() {
        let store = MemoryCredentialStore::new();
        let alice = store.create(new_user("alice", "alice@x.com")).await.unwrap();
        assert!(store.remove(alice.id).await);
        assert!(store.find_profile_by_id(alice.id).await.unwrap().is_none());
        assert!(store.is_empty().await);
    }
}
