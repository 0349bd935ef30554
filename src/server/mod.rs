//! HTTP layer: webhook receiver and health check.

pub mod error;
pub mod routes;

use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::trace::TraceLayer;

use crate::core::auth::WebhookAuthenticator;
use crate::core::sync::OrderSync;
use crate::domain::ports::RecordStore;

/// Handler 共用的唯讀狀態
pub struct AppState<S: RecordStore> {
    pub authenticator: WebhookAuthenticator,
    pub signature_header: String,
    pub sync: OrderSync<S>,
}

/// Creates the Axum router with the webhook route mounted at `webhook_path`.
pub fn create_app<S: RecordStore + 'static>(state: Arc<AppState<S>>, webhook_path: &str) -> Router {
    Router::new()
        .route("/health", get(routes::health::check))
        .route(webhook_path, post(routes::webhook::receive_order::<S>))
        .with_state(state)
        .layer(CatchPanicLayer::custom(error::panic_response))
        .layer(TraceLayer::new_for_http())
}
