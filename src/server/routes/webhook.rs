//! Shopify `orders/create` webhook endpoint.

use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::State;
use axum::http::HeaderMap;
use axum::Json;
use serde::Serialize;

use crate::core::persister::PersistOutcome;
use crate::domain::ports::RecordStore;
use crate::server::error::ApiError;
use crate::server::AppState;

#[derive(Debug, Serialize)]
pub struct WebhookResponse {
    pub status: &'static str,
    pub message: String,
    pub order_number: Option<i64>,
    pub records: Vec<PersistOutcome>,
}

pub async fn receive_order<S: RecordStore + 'static>(
    State(state): State<Arc<AppState<S>>>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<WebhookResponse>, ApiError> {
    let signature = headers
        .get(state.signature_header.as_str())
        .and_then(|value| value.to_str().ok());

    // 驗證失敗時不做任何處理
    state.authenticator.verify(&body, signature)?;
    tracing::info!("✅ Webhook verified ({} bytes)", body.len());

    let report = state.sync.process_payload(&body).await?;
    let message = report.status_message();
    tracing::info!("✅ Order {:?}: {}", report.order_number, message);

    Ok(Json(WebhookResponse {
        status: if report.is_partial() { "partial" } else { "ok" },
        message,
        order_number: report.order_number,
        records: report.records,
    }))
}
