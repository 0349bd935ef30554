use crate::domain::model::{TargetRecord, UpstreamError};
use crate::domain::ports::RecordStore;
use crate::utils::error::{Result, SyncError};
use serde::Serialize;
use serde_json::Value;

/// 成功寫入後的結果
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PersistOutcome {
    pub record_id: String,
    pub accepted_fields: Vec<String>,
    pub removed_fields: Vec<String>,
    pub attempts: u32,
}

impl PersistOutcome {
    pub fn is_partial(&self) -> bool {
        !self.removed_fields.is_empty()
    }
}

/// 遇到欄位被拒絕時移除該欄位並重送，最多重送 `max_retries` 次
pub struct AdaptivePersister<S: RecordStore> {
    store: S,
    max_retries: u32,
}

impl<S: RecordStore> AdaptivePersister<S> {
    pub fn new(store: S, max_retries: u32) -> Self {
        Self { store, max_retries }
    }

    pub async fn persist(&self, record: TargetRecord) -> Result<PersistOutcome> {
        let mut remaining = record;
        let mut removed = Vec::new();
        let mut attempts = 0u32;

        loop {
            if remaining.is_empty() {
                tracing::error!("❌ No fields left to submit after removing {:?}", removed);
                return Err(SyncError::EmptyRecord { removed });
            }

            attempts += 1;
            tracing::debug!(
                "📤 Attempt {} submitting {} field(s)",
                attempts,
                remaining.len()
            );

            let rejection = match self.store.create_record(&remaining).await {
                Ok(created) => {
                    tracing::info!(
                        "✅ Record {} created with {} field(s) after {} attempt(s)",
                        created.id,
                        remaining.len(),
                        attempts
                    );
                    if !removed.is_empty() {
                        tracing::warn!("⚠️ Saved without fields: {:?}", removed);
                    }
                    return Ok(PersistOutcome {
                        record_id: created.id,
                        accepted_fields: remaining.field_names(),
                        removed_fields: removed,
                        attempts,
                    });
                }
                Err(SyncError::UpstreamError(rejection)) if rejection.kind().is_schema_rejection() => {
                    rejection
                }
                Err(other) => return Err(other),
            };

            let Some(field) = offending_field(&remaining, &rejection) else {
                tracing::error!(
                    "❌ Could not identify the rejected field in: {}",
                    rejection.message
                );
                return Err(SyncError::UpstreamError(rejection));
            };

            if attempts > self.max_retries {
                tracing::error!(
                    "❌ Giving up after {} attempts, last rejection: {}",
                    attempts,
                    rejection
                );
                return Err(SyncError::RetriesExhausted {
                    attempts,
                    removed,
                    last: rejection,
                });
            }

            tracing::warn!(
                "🔁 Field '{}' rejected ({:?}), retrying without it",
                field,
                rejection.kind()
            );
            remaining.remove(&field);
            removed.push(field);
        }
    }
}

/// 從錯誤訊息中的引號片段找出要移除的欄位：先比對欄位名稱，再比對欄位值
pub fn offending_field(record: &TargetRecord, rejection: &UpstreamError) -> Option<String> {
    let tokens = rejection.quoted_tokens();

    if let Some(name) = tokens.iter().find(|token| record.contains(token)) {
        return Some(name.clone());
    }

    tokens.iter().find_map(|token| {
        record
            .iter()
            .find(|(_, value)| value_matches(value, token))
            .map(|(name, _)| name.clone())
    })
}

fn value_matches(value: &Value, token: &str) -> bool {
    match value {
        Value::String(s) => s == token,
        Value::Number(n) => n.to_string() == token,
        Value::Array(items) => items.iter().any(|item| value_matches(item, token)),
        _ => false,
    }
}
