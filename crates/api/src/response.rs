//! Shared response envelope for API handlers.
//!
//! Every successful response is wrapped as
//! `{ "statusCode": u16, "data": T, "message": String }`. Use [`ApiResponse`]
//! instead of ad-hoc `serde_json::json!` so the shape stays consistent.

use axum::http::StatusCode;
use serde::Serialize;

/// Standard success envelope.
///
/// # Example
///
/// ```ignore
/// Ok(Json(ApiResponse::new(StatusCode::OK, user, "Current user fetched")))
/// ```
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiResponse<T: Serialize> {
    pub status_code: u16,
    pub data: T,
    pub message: String,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn new(status: StatusCode, data: T, message: impl Into<String>) -> Self {
        Self {
            status_code: status.as_u16(),
            data,
            message: message.into(),
        }
    }
}
