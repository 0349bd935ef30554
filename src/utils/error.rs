use crate::domain::model::UpstreamError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SyncError {
    #[error("API request failed: {0}")]
    ApiError(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Configuration validation failed for '{field}': {message}")]
    ConfigValidationError { field: String, message: String },

    #[error("Invalid value '{value}' for '{field}': {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Missing required configuration: {field}")]
    MissingConfigError { field: String },

    #[error("Webhook signature rejected: {message}")]
    SignatureError { message: String },

    #[error("Invalid order payload: {message}")]
    PayloadError { message: String },

    #[error("Upstream rejected record: {0}")]
    UpstreamError(UpstreamError),

    #[error("Gave up after {attempts} attempts (removed fields: {removed:?}): {last}")]
    RetriesExhausted {
        attempts: u32,
        removed: Vec<String>,
        last: UpstreamError,
    },

    #[error("Record has no fields left to submit (removed fields: {removed:?})")]
    EmptyRecord { removed: Vec<String> },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Configuration,
    Authentication,
    Network,
    Upstream,
    Data,
    System,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl SyncError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            SyncError::ConfigValidationError { .. }
            | SyncError::InvalidConfigValueError { .. }
            | SyncError::MissingConfigError { .. } => ErrorCategory::Configuration,
            SyncError::SignatureError { .. } => ErrorCategory::Authentication,
            SyncError::ApiError(_) => ErrorCategory::Network,
            SyncError::UpstreamError(_)
            | SyncError::RetriesExhausted { .. }
            | SyncError::EmptyRecord { .. } => ErrorCategory::Upstream,
            SyncError::PayloadError { .. } | SyncError::SerializationError(_) => {
                ErrorCategory::Data
            }
            SyncError::IoError(_) => ErrorCategory::System,
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self.category() {
            ErrorCategory::Authentication => ErrorSeverity::Low,
            ErrorCategory::Network | ErrorCategory::Upstream => ErrorSeverity::Medium,
            ErrorCategory::Data => ErrorSeverity::High,
            ErrorCategory::Configuration | ErrorCategory::System => ErrorSeverity::Critical,
        }
    }

    pub fn recovery_suggestion(&self) -> &'static str {
        match self {
            SyncError::ConfigValidationError { .. } | SyncError::InvalidConfigValueError { .. } => {
                "Check the configuration file and environment variables"
            }
            SyncError::MissingConfigError { .. } => {
                "Set the missing value in the config file or the matching environment variable"
            }
            SyncError::SignatureError { .. } => {
                "Make sure SHOPIFY_WEBHOOK_SECRET matches the secret configured in the Shopify admin"
            }
            SyncError::ApiError(_) => "Check network connectivity to the Airtable API",
            SyncError::UpstreamError(_) => {
                "Check the Airtable API key, base id and table name"
            }
            SyncError::RetriesExhausted { .. } | SyncError::EmptyRecord { .. } => {
                "Compare the Airtable table columns with the mapped field names"
            }
            SyncError::PayloadError { .. } | SyncError::SerializationError(_) => {
                "Inspect the webhook payload; it must be a Shopify order JSON object"
            }
            SyncError::IoError(_) => "Check file permissions and paths",
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self.category() {
            ErrorCategory::Configuration => format!("Configuration problem: {}", self),
            ErrorCategory::Authentication => "Webhook not verified".to_string(),
            ErrorCategory::Network => "Could not reach the Airtable API".to_string(),
            ErrorCategory::Upstream => "Failed to save the record in Airtable".to_string(),
            ErrorCategory::Data => "The order payload could not be processed".to_string(),
            ErrorCategory::System => format!("System error: {}", self),
        }
    }
}

pub type Result<T> = std::result::Result<T, SyncError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_categories() {
        let err = SyncError::SignatureError {
            message: "missing header".to_string(),
        };
        assert_eq!(err.category(), ErrorCategory::Authentication);
        assert_eq!(err.severity(), ErrorSeverity::Low);
        assert_eq!(err.user_friendly_message(), "Webhook not verified");

        let err = SyncError::MissingConfigError {
            field: "airtable.api_key".to_string(),
        };
        assert_eq!(err.category(), ErrorCategory::Configuration);
        assert_eq!(err.severity(), ErrorSeverity::Critical);
    }

    #[test]
    fn test_retries_exhausted_message_lists_removed_fields() {
        let err = SyncError::RetriesExhausted {
            attempts: 3,
            removed: vec!["TAG".to_string()],
            last: UpstreamError {
                status: 422,
                error_type: "UNKNOWN_FIELD_NAME".to_string(),
                message: "Unknown field name: \"CEP\"".to_string(),
            },
        };
        let text = err.to_string();
        assert!(text.contains("3 attempts"));
        assert!(text.contains("TAG"));
        assert_eq!(err.category(), ErrorCategory::Upstream);
    }
}
