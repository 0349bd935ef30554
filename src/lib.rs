pub mod adapters;
pub mod config;
pub mod core;
pub mod domain;
pub mod server;
pub mod utils;

use std::sync::Arc;

pub use adapters::AirtableStore;
pub use config::AppConfig;
pub use crate::core::{
    auth::WebhookAuthenticator,
    mapper::{FieldMapper, MappingRules},
    persister::AdaptivePersister,
    sync::OrderSync,
};
pub use utils::error::{Result, SyncError};

use crate::domain::ports::RecordStore;
use crate::server::AppState;

/// 依配置組出共用狀態，store 由呼叫端提供 (正式環境為 [`AirtableStore`])
pub fn build_state<S: RecordStore>(config: &AppConfig, store: S) -> Result<Arc<AppState<S>>> {
    let rules = MappingRules::from_config(&config.mapping)?;
    let sync = OrderSync::new(
        FieldMapper::new(rules),
        AdaptivePersister::new(store, config.max_retries()),
    );

    Ok(Arc::new(AppState {
        authenticator: WebhookAuthenticator::new(&config.webhook.secret),
        signature_header: config.signature_header().to_string(),
        sync,
    }))
}

/// Router wired to the real Airtable API.
pub fn create_airtable_app(config: &AppConfig) -> Result<axum::Router> {
    let store = AirtableStore::new(&config.airtable)?;
    tracing::info!("🗄️ Airtable endpoint: {}", store.endpoint());
    let state = build_state(config, store)?;
    Ok(server::create_app(state, config.webhook_path()))
}
