#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::header::{AUTHORIZATION, CONTENT_TYPE, COOKIE, SET_COOKIE};
use axum::http::{HeaderValue, Request, Response};
use axum::Router;
use http_body_util::BodyExt;
use tempfile::TempDir;
use tower::ServiceExt;

use tollgate_api::assets::{remove_staged_file, AssetUploader, UploadConfig, UploadError, UploadedAsset};
use tollgate_api::auth::jwt::{TokenConfig, TokenIssuer};
use tollgate_api::auth::password::hash_password;
use tollgate_api::auth::session::SessionManager;
use tollgate_api::config::{ServerConfig, StoreBackend};
use tollgate_api::router::build_app_router;
use tollgate_api::state::AppState;
use tollgate_db::models::user::{NewUser, User};
use tollgate_db::{CredentialStore, MemoryCredentialStore};

/// Staged files whose content starts with this marker fail to upload.
pub const FAILING_UPLOAD: &[u8] = b"FAIL";

pub const TEST_PASSWORD: &str = "test_password_123!";

/// Uploader standing in for the remote asset store.
///
/// Returns `https://cdn.test/<file name>` and deletes the staged file, like the
/// real uploader does.
#[derive(Default)]
pub struct FakeUploader {
    pub uploads: AtomicUsize,
}

impl FakeUploader {
    async fn try_upload(&self, local_path: &Path) -> Result<UploadedAsset, UploadError> {
        let bytes = tokio::fs::read(local_path).await?;
        if bytes.starts_with(FAILING_UPLOAD) {
            return Err(UploadError::MissingUrl);
        }
        self.uploads.fetch_add(1, Ordering::SeqCst);
        let name = local_path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("upload");
        Ok(UploadedAsset {
            url: format!("https://cdn.test/{name}"),
        })
    }

    pub fn upload_count(&self) -> usize {
        self.uploads.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl AssetUploader for FakeUploader {
    async fn upload(&self, local_path: &Path) -> Result<UploadedAsset, UploadError> {
        let result = self.try_upload(local_path).await;
        remove_staged_file(local_path).await;
        result
    }
}

pub fn test_token_config() -> TokenConfig {
    TokenConfig::new(
        "test-access-secret".to_string(),
        15,
        "test-refresh-secret".to_string(),
        10,
    )
    .unwrap()
}

/// Build a test `ServerConfig` with safe defaults and the given staging dir.
pub fn test_config(staging_dir: PathBuf) -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        cors_origins: vec![HeaderValue::from_static("http://localhost:5173")],
        request_timeout_secs: 30,
        shutdown_timeout_secs: 30,
        store: StoreBackend::Memory,
        tokens: test_token_config(),
        uploads: UploadConfig {
            staging_dir,
            max_body_bytes: 1024 * 1024,
            endpoint: "http://127.0.0.1:9/upload".to_string(),
            preset: None,
        },
    }
}

/// Everything a test needs to drive the API and inspect the store.
pub struct TestApp {
    pub router: Router,
    pub store: Arc<MemoryCredentialStore>,
    pub uploader: Arc<FakeUploader>,
    pub sessions: Arc<SessionManager>,
    pub staging: TempDir,
}

impl TestApp {
    pub fn app(&self) -> Router {
        self.router.clone()
    }

    /// Files currently left in the staging directory.
    pub fn staged_files(&self) -> Vec<PathBuf> {
        std::fs::read_dir(self.staging.path().join("temp"))
            .map(|entries| entries.filter_map(|e| e.ok()).map(|e| e.path()).collect())
            .unwrap_or_default()
    }
}

/// Build the full application router, backed by an in-memory store and a
/// fake uploader.
///
/// Uses the same `build_app_router` as `main.rs`, so the middleware stack
/// (CORS, request ID, timeout, tracing, panic recovery) matches production.
pub fn build_test_app() -> TestApp {
    let staging = tempfile::tempdir().unwrap();
    let config = test_config(staging.path().join("temp"));

    let store = Arc::new(MemoryCredentialStore::new());
    let uploader = Arc::new(FakeUploader::default());
    let sessions = Arc::new(SessionManager::new(
        store.clone(),
        uploader.clone(),
        TokenIssuer::new(config.tokens.clone()),
    ));

    let state = AppState {
        config: Arc::new(config.clone()),
        sessions: sessions.clone(),
    };

    TestApp {
        router: build_app_router(state, &config),
        store,
        uploader,
        sessions,
        staging,
    }
}

/// Insert a user straight into the store and return it with its password.
pub async fn create_test_user(store: &MemoryCredentialStore, username: &str) -> (User, String) {
    let user = store
        .create(NewUser {
            username: username.to_lowercase(),
            email: format!("{}@test.com", username.to_lowercase()),
            full_name: format!("{username} Tester"),
            avatar_url: "https://cdn.test/avatar.png".to_string(),
            cover_image_url: String::new(),
            password_hash: hash_password(TEST_PASSWORD).unwrap(),
        })
        .await
        .unwrap();
    (user, TEST_PASSWORD.to_string())
}

// ---------------------------------------------------------------------------
// Request helpers
// ---------------------------------------------------------------------------

pub async fn send(app: Router, request: Request<Body>) -> Response<Body> {
    app.oneshot(request).await.unwrap()
}

pub async fn get(app: Router, uri: &str) -> Response<Body> {
    send(app, Request::get(uri).body(Body::empty()).unwrap()).await
}

pub async fn get_auth(app: Router, uri: &str, token: &str) -> Response<Body> {
    let request = Request::get(uri)
        .header(AUTHORIZATION, format!("Bearer {token}"))
        .body(Body::empty())
        .unwrap();
    send(app, request).await
}

pub async fn post_json(app: Router, uri: &str, body: serde_json::Value) -> Response<Body> {
    let request = Request::post(uri)
        .header(CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();
    send(app, request).await
}

pub async fn post_auth(app: Router, uri: &str, token: &str) -> Response<Body> {
    let request = Request::post(uri)
        .header(AUTHORIZATION, format!("Bearer {token}"))
        .body(Body::empty())
        .unwrap();
    send(app, request).await
}

pub async fn post_with_cookie(app: Router, uri: &str, cookie: &str) -> Response<Body> {
    let request = Request::post(uri)
        .header(COOKIE, cookie)
        .body(Body::empty())
        .unwrap();
    send(app, request).await
}

pub async fn post_multipart(app: Router, uri: &str, form: MultipartForm) -> Response<Body> {
    let (content_type, body) = form.finish();
    let request = Request::post(uri)
        .header(CONTENT_TYPE, content_type)
        .body(Body::from(body))
        .unwrap();
    send(app, request).await
}

pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

/// All `Set-Cookie` values on a response.
pub fn set_cookies<B>(response: &Response<B>) -> Vec<String> {
    response
        .headers()
        .get_all(SET_COOKIE)
        .iter()
        .map(|v| v.to_str().unwrap().to_string())
        .collect()
}

/// Value of the named cookie in a response's `Set-Cookie` headers.
pub fn cookie_value<B>(response: &Response<B>, name: &str) -> Option<String> {
    set_cookies(response).into_iter().find_map(|cookie| {
        let (pair, _) = cookie.split_once(';')?;
        let (key, value) = pair.split_once('=')?;
        (key == name).then(|| value.to_string())
    })
}

// ---------------------------------------------------------------------------
// Multipart body builder
// ---------------------------------------------------------------------------

const BOUNDARY: &str = "tollgate-test-boundary";

#[derive(Default)]
pub struct MultipartForm {
    body: Vec<u8>,
}

impl MultipartForm {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registration form with every text field filled in.
    pub fn registration(full_name: &str, email: &str, username: &str, password: &str) -> Self {
        Self::new()
            .text("fullName", full_name)
            .text("email", email)
            .text("username", username)
            .text("password", password)
    }

    pub fn text(mut self, name: &str, value: &str) -> Self {
        self.body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n"
            )
            .as_bytes(),
        );
        self
    }

    pub fn file(mut self, name: &str, file_name: &str, contents: &[u8]) -> Self {
        self.body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"; filename=\"{file_name}\"\r\nContent-Type: application/octet-stream\r\n\r\n"
            )
            .as_bytes(),
        );
        self.body.extend_from_slice(contents);
        self.body.extend_from_slice(b"\r\n");
        self
    }

    pub fn finish(mut self) -> (String, Vec<u8>) {
        self.body
            .extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
        (format!("multipart/form-data; boundary={BOUNDARY}"), self.body)
    }
}
