/// Error kinds surfaced by account and session operations.
///
/// Every message carried here is safe to show to the caller. Infrastructure
/// causes (database, signing, upload) are logged where they are normalized
/// and never embedded in the message.
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl CoreError {
    /// The caller-facing message without the kind prefix.
    pub fn message(&self) -> &str {
        match self {
            CoreError::Validation(msg)
            | CoreError::Conflict(msg)
            | CoreError::NotFound(msg)
            | CoreError::Unauthorized(msg)
            | CoreError::Internal(msg) => msg,
        }
    }
}
