//! API error type with HTTP response mapping.

use crate::utils::error::{ErrorCategory, SyncError};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

/// Webhook 端點的錯誤；驗證失敗回 401，其餘一律 500
#[derive(Debug)]
pub struct ApiError(pub SyncError);

impl From<SyncError> for ApiError {
    fn from(err: SyncError) -> Self {
        ApiError(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let err = self.0;
        let status = match err.category() {
            ErrorCategory::Authentication => {
                tracing::warn!("❌ Webhook not verified: {}", err);
                StatusCode::UNAUTHORIZED
            }
            category => {
                tracing::error!(
                    "❌ Webhook processing failed: {} (Category: {:?}, Severity: {:?})",
                    err,
                    category,
                    err.severity()
                );
                tracing::error!("💡 Recovery suggestion: {}", err.recovery_suggestion());
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };

        let body = serde_json::json!({ "error": err.user_friendly_message() });
        (status, axum::Json(body)).into_response()
    }
}

/// 處理過程中 panic 時回傳一般的 500
pub fn panic_response(err: Box<dyn std::any::Any + Send + 'static>) -> Response {
    let detail = err
        .downcast_ref::<String>()
        .map(String::as_str)
        .or_else(|| err.downcast_ref::<&str>().copied())
        .unwrap_or("unknown panic");
    tracing::error!("💥 Panic while handling request: {}", detail);

    let body = serde_json::json!({ "error": "Internal error" });
    (StatusCode::INTERNAL_SERVER_ERROR, axum::Json(body)).into_response()
}
