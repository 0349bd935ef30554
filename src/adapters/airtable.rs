use crate::config::AirtableConfig;
use crate::domain::model::{CreatedRecord, TargetRecord, UpstreamError};
use crate::domain::ports::RecordStore;
use crate::utils::error::{Result, SyncError};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use url::Url;

#[derive(Debug, Deserialize)]
struct CreateResponse {
    #[serde(default)]
    records: Vec<CreatedRecord>,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

/// Airtable 錯誤有兩種形狀：`{"error": {"type", "message"}}` 與 `{"error": "TYPE"}`
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ErrorBody {
    Detailed {
        #[serde(rename = "type")]
        error_type: String,
        #[serde(default)]
        message: String,
    },
    Code(String),
}

/// 透過 Airtable REST API 建立記錄
#[derive(Debug, Clone)]
pub struct AirtableStore {
    client: Client,
    endpoint: Url,
    api_key: String,
    typecast: bool,
    timeout: Option<Duration>,
}

impl AirtableStore {
    pub fn new(config: &AirtableConfig) -> Result<Self> {
        Ok(Self {
            client: Client::new(),
            endpoint: table_endpoint(&config.api_url, &config.base_id, &config.table)?,
            api_key: config.api_key.clone(),
            typecast: config.typecast.unwrap_or(false),
            timeout: config.timeout_seconds.map(Duration::from_secs),
        })
    }

    pub fn endpoint(&self) -> &str {
        self.endpoint.as_str()
    }
}

#[async_trait]
impl RecordStore for AirtableStore {
    async fn create_record(&self, record: &TargetRecord) -> Result<CreatedRecord> {
        let payload = serde_json::json!({
            "records": [{ "fields": record }],
            "typecast": self.typecast,
        });

        tracing::debug!("📡 POST {}", self.endpoint);
        let mut request = self
            .client
            .post(self.endpoint.clone())
            .bearer_auth(&self.api_key)
            .json(&payload);

        if let Some(timeout) = self.timeout {
            request = request.timeout(timeout);
        }

        let response = request.send().await?;
        let status = response.status();
        let body = response.text().await?;
        tracing::debug!("📡 Airtable response status: {}", status);

        if !status.is_success() {
            let rejection = parse_error(status.as_u16(), &body);
            tracing::warn!("⚠️ Airtable rejected record: {}", rejection);
            return Err(SyncError::UpstreamError(rejection));
        }

        let parsed: CreateResponse = serde_json::from_str(&body)?;
        parsed.records.into_iter().next().ok_or_else(|| {
            SyncError::UpstreamError(UpstreamError {
                status: status.as_u16(),
                error_type: "EMPTY_RESPONSE".to_string(),
                message: "Airtable returned no created records".to_string(),
            })
        })
    }
}

/// `{api_url}/{base_id}/{table}`，表格名稱會做 URL 編碼
pub fn table_endpoint(api_url: &str, base_id: &str, table: &str) -> Result<Url> {
    let invalid = |reason: &str| SyncError::InvalidConfigValueError {
        field: "airtable.api_url".to_string(),
        value: api_url.to_string(),
        reason: reason.to_string(),
    };

    let mut url = Url::parse(api_url).map_err(|e| invalid(&format!("Invalid URL format: {}", e)))?;
    url.path_segments_mut()
        .map_err(|_| invalid("URL cannot be used as a base"))?
        .pop_if_empty()
        .push(base_id)
        .push(table);
    Ok(url)
}

pub fn parse_error(status: u16, body: &str) -> UpstreamError {
    match serde_json::from_str::<ErrorEnvelope>(body) {
        Ok(ErrorEnvelope {
            error: ErrorBody::Detailed {
                error_type,
                message,
            },
        }) => UpstreamError {
            status,
            error_type,
            message,
        },
        Ok(ErrorEnvelope {
            error: ErrorBody::Code(code),
        }) => UpstreamError {
            status,
            message: code.clone(),
            error_type: code,
        },
        Err(_) => UpstreamError {
            status,
            error_type: format!("HTTP_{}", status),
            message: body.to_string(),
        },
    }
}
