use crate::domain::model::{CreatedRecord, TargetRecord};
use crate::utils::error::Result;
use async_trait::async_trait;

/// 遠端表格儲存 (Airtable 或測試替身)
///
/// 欄位被拒絕時必須回傳 `SyncError::UpstreamError`，以便重試邏輯判斷要移除哪個欄位。
#[async_trait]
pub trait RecordStore: Send + Sync {
    async fn create_record(&self, record: &TargetRecord) -> Result<CreatedRecord>;
}
