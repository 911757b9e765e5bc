//! Request body extractors whose rejections use the JSON error envelope.
//!
//! axum's own `Json` and `Multipart` reject with plain-text bodies and leak
//! parser detail. These wrappers route every rejection through [`AppError`].

use axum::extract::{FromRequest, Multipart, Request};

use crate::error::AppError;

/// `axum::Json` with rejections mapped to [`AppError::BadRequest`].
#[derive(Debug, FromRequest)]
#[from_request(via(axum::Json), rejection(AppError))]
pub struct AppJson<T>(pub T);

/// `axum::extract::Multipart` with rejections mapped to [`AppError::BadRequest`].
pub struct AppMultipart(pub Multipart);

impl<S> FromRequest<S> for AppMultipart
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        Multipart::from_request(req, state)
            .await
            .map(AppMultipart)
            .map_err(AppError::from)
    }
}
