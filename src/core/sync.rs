use crate::core::mapper::FieldMapper;
use crate::core::persister::{AdaptivePersister, PersistOutcome};
use crate::domain::model::Order;
use crate::domain::ports::RecordStore;
use crate::utils::error::{Result, SyncError};
use serde::Serialize;

/// 一次 webhook 的處理結果
#[derive(Debug, Clone, Serialize)]
pub struct SyncReport {
    pub order_number: Option<i64>,
    pub records: Vec<PersistOutcome>,
}

impl SyncReport {
    pub fn is_partial(&self) -> bool {
        self.records.iter().any(PersistOutcome::is_partial)
    }

    pub fn status_message(&self) -> String {
        if self.is_partial() {
            let mut removed: Vec<&str> = self
                .records
                .iter()
                .flat_map(|r| r.removed_fields.iter().map(String::as_str))
                .collect();
            removed.sort_unstable();
            removed.dedup();
            format!(
                "Saved {} record(s) without fields: {}",
                self.records.len(),
                removed.join(", ")
            )
        } else {
            format!("Saved {} record(s)", self.records.len())
        }
    }
}

/// 對應 + 寫入，串起整個處理流程
pub struct OrderSync<S: RecordStore> {
    mapper: FieldMapper,
    persister: AdaptivePersister<S>,
}

impl<S: RecordStore> OrderSync<S> {
    pub fn new(mapper: FieldMapper, persister: AdaptivePersister<S>) -> Self {
        Self { mapper, persister }
    }

    /// 解析原始 body 後處理
    pub async fn process_payload(&self, body: &[u8]) -> Result<SyncReport> {
        let order: Order =
            serde_json::from_slice(body).map_err(|e| SyncError::PayloadError {
                message: e.to_string(),
            })?;
        self.process(&order).await
    }

    /// 依序寫入；第一筆失敗即中止
    pub async fn process(&self, order: &Order) -> Result<SyncReport> {
        tracing::info!(
            "📦 Processing order {:?} ({} line item(s))",
            order.order_number.or(order.id),
            order.line_items.len()
        );

        let records = self.mapper.map(order);
        let total = records.len();
        let mut outcomes = Vec::with_capacity(total);

        for (index, record) in records.into_iter().enumerate() {
            tracing::debug!("📝 Record {}/{}: {:?}", index + 1, total, record.field_names());
            let outcome = self.persister.persist(record).await?;
            outcomes.push(outcome);
        }

        Ok(SyncReport {
            order_number: order.order_number,
            records: outcomes,
        })
    }
}
