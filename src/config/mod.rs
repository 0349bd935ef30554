#[cfg(feature = "cli")]
pub mod cli;

use crate::utils::error::{Result, SyncError};
use crate::utils::validation::{self, Validate};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

pub const DEFAULT_SIGNATURE_HEADER: &str = "X-Shopify-Hmac-Sha256";
pub const DEFAULT_WEBHOOK_PATH: &str = "/webhook/orders/create";
pub const DEFAULT_AIRTABLE_URL: &str = "https://api.airtable.com/v0";
pub const DEFAULT_MAX_RETRIES: u32 = 10;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    pub webhook: WebhookConfig,
    pub airtable: AirtableConfig,
    #[serde(default)]
    pub mapping: MappingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    /// "compact" 或 "json"
    pub log_format: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebhookConfig {
    pub secret: String,
    pub signature_header: Option<String>,
    pub path: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AirtableConfig {
    #[serde(default = "default_airtable_url")]
    pub api_url: String,
    pub api_key: String,
    pub base_id: String,
    #[serde(default = "default_table")]
    pub table: String,
    pub max_retries: Option<u32>,
    pub timeout_seconds: Option<u64>,
    pub typecast: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MappingConfig {
    #[serde(default)]
    pub per_line_item: bool,
    #[serde(default = "default_payment_label")]
    pub default_payment_status: String,
    #[serde(default = "default_payment_status")]
    pub payment_status: BTreeMap<String, String>,
    /// 依序比對，越具體的規則放越前面
    #[serde(default = "default_rules")]
    pub rules: Vec<RuleConfig>,
    #[serde(default = "default_choice_fields")]
    pub choice_fields: Vec<String>,
    #[serde(default = "default_source_tag")]
    pub source_tag: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleConfig {
    pub pattern: String,
    pub label: String,
}

impl RuleConfig {
    pub fn new(pattern: &str, label: &str) -> Self {
        Self {
            pattern: pattern.to_string(),
            label: label.to_string(),
        }
    }
}

fn escape_toml_basic(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '\\' => escaped.push_str("\\\\"),
            '"' => escaped.push_str("\\\""),
            '\n' => escaped.push_str("\\n"),
            '\r' => escaped.push_str("\\r"),
            '\t' => escaped.push_str("\\t"),
            c if c.is_control() => escaped.push_str(&format!("\\u{:04X}", c as u32)),
            c => escaped.push(c),
        }
    }
    escaped
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    3000
}

fn default_airtable_url() -> String {
    DEFAULT_AIRTABLE_URL.to_string()
}

fn default_table() -> String {
    "Shopify".to_string()
}

fn default_payment_label() -> String {
    "Pendente".to_string()
}

fn default_payment_status() -> BTreeMap<String, String> {
    [
        ("paid", "Pago"),
        ("pending", "Pendente"),
        ("authorized", "Autorizado"),
        ("partially_paid", "Parcialmente Pago"),
        ("refunded", "Reembolsado"),
        ("partially_refunded", "Parcialmente Reembolsado"),
        ("voided", "Cancelado"),
        ("expired", "Expirado"),
    ]
    .into_iter()
    .map(|(code, label)| (code.to_string(), label.to_string()))
    .collect()
}

fn default_rules() -> Vec<RuleConfig> {
    vec![
        RuleConfig::new(r"(?i)hemograma\s+completo", "Hemograma Completo"),
        RuleConfig::new(r"(?i)hemograma", "Hemograma"),
        RuleConfig::new(r"(?i)perfil\s+(renal|hep[aá]tico)", "Perfil Bioquímico"),
        RuleConfig::new(r"(?i)bioqu[ií]mic", "Bioquímico"),
        RuleConfig::new(r"(?i)urin[aá]lise|\burina\b", "Urinálise"),
        RuleConfig::new(r"(?i)parasitol[oó]gico|\bfezes\b", "Parasitológico"),
        RuleConfig::new(r"(?i)\bpcr\b", "PCR"),
        RuleConfig::new(r"(?i)sorolog", "Sorologia"),
    ]
}

fn default_choice_fields() -> Vec<String> {
    ["Estado", "Status do Pagamento", "Tipo de Teste", "TAG"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

fn default_source_tag() -> Option<String> {
    Some("Shopify".to_string())
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            log_format: None,
        }
    }
}

impl Default for MappingConfig {
    fn default() -> Self {
        Self {
            per_line_item: false,
            default_payment_status: default_payment_label(),
            payment_status: default_payment_status(),
            rules: default_rules(),
            choice_fields: default_choice_fields(),
            source_tag: default_source_tag(),
        }
    }
}

impl AppConfig {
    /// 從 TOML 檔案載入配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path)?;
        Self::from_toml_str(&content)
    }

    /// 從 TOML 字串解析配置
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content);

        toml::from_str(&processed_content).map_err(|e| SyncError::ConfigValidationError {
            field: "toml_parsing".to_string(),
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// 只用環境變數組出配置 (沒有提供設定檔時)
    pub fn from_env() -> Result<Self> {
        let env = |name: &str| std::env::var(name).ok().filter(|v| !v.trim().is_empty());

        let port = match env("PORT") {
            Some(raw) => raw.parse().map_err(|_| SyncError::InvalidConfigValueError {
                field: "PORT".to_string(),
                value: raw.clone(),
                reason: "must be a valid port number".to_string(),
            })?,
            None => default_port(),
        };

        let max_retries = match env("MAX_RETRIES") {
            Some(raw) => Some(raw.parse().map_err(|_| SyncError::InvalidConfigValueError {
                field: "MAX_RETRIES".to_string(),
                value: raw.clone(),
                reason: "must be a non-negative integer".to_string(),
            })?),
            None => None,
        };

        let per_line_item = env("PER_LINE_ITEM")
            .map(|v| matches!(v.to_lowercase().as_str(), "1" | "true" | "yes"))
            .unwrap_or(false);

        Ok(Self {
            server: ServerConfig {
                host: env("HOST").unwrap_or_else(default_host),
                port,
                log_format: env("LOG_FORMAT"),
            },
            webhook: WebhookConfig {
                secret: env("SHOPIFY_WEBHOOK_SECRET").unwrap_or_default(),
                signature_header: None,
                path: None,
            },
            airtable: AirtableConfig {
                api_url: env("AIRTABLE_API_URL").unwrap_or_else(default_airtable_url),
                api_key: env("AIRTABLE_API_KEY").unwrap_or_default(),
                base_id: env("AIRTABLE_BASE_ID").unwrap_or_default(),
                table: env("AIRTABLE_TABLE").unwrap_or_else(default_table),
                max_retries,
                timeout_seconds: None,
                typecast: None,
            },
            mapping: MappingConfig {
                per_line_item,
                ..MappingConfig::default()
            },
        })
    }

    /// 替換環境變數 (例如 ${AIRTABLE_API_KEY})
    ///
    /// 只支援放在雙引號字串內的 `${...}`；值會依 TOML basic string 規則跳脫。
    fn substitute_env_vars(content: &str) -> String {
        use regex::Regex;
        use std::sync::OnceLock;

        static ENV_VAR: OnceLock<Regex> = OnceLock::new();
        let re = ENV_VAR.get_or_init(|| Regex::new(r"\$\{([^}]+)\}").expect("static pattern"));

        re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            match std::env::var(var_name) {
                Ok(value) => escape_toml_basic(&value),
                Err(_) => format!("${{{}}}", var_name),
            }
        })
        .to_string()
    }

    pub fn addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }

    pub fn signature_header(&self) -> &str {
        self.webhook
            .signature_header
            .as_deref()
            .unwrap_or(DEFAULT_SIGNATURE_HEADER)
    }

    pub fn webhook_path(&self) -> &str {
        self.webhook.path.as_deref().unwrap_or(DEFAULT_WEBHOOK_PATH)
    }

    pub fn max_retries(&self) -> u32 {
        self.airtable.max_retries.unwrap_or(DEFAULT_MAX_RETRIES)
    }

    pub fn json_logs(&self) -> bool {
        self.server.log_format.as_deref() == Some("json")
    }
}

impl Validate for AppConfig {
    fn validate(&self) -> Result<()> {
        validation::validate_secret("webhook.secret", &self.webhook.secret)?;
        validation::validate_secret("airtable.api_key", &self.airtable.api_key)?;
        validation::validate_secret("airtable.base_id", &self.airtable.base_id)?;
        validation::validate_non_empty_string("airtable.table", &self.airtable.table)?;
        validation::validate_url("airtable.api_url", &self.airtable.api_url)?;
        validation::validate_range("airtable.max_retries", self.max_retries(), 0, 50)?;

        if !self.webhook_path().starts_with('/') {
            return Err(SyncError::InvalidConfigValueError {
                field: "webhook.path".to_string(),
                value: self.webhook_path().to_string(),
                reason: "Path must start with '/'".to_string(),
            });
        }

        for (index, rule) in self.mapping.rules.iter().enumerate() {
            let field = format!("mapping.rules[{}]", index);
            validation::validate_regex(&field, &rule.pattern)?;
            validation::validate_non_empty_string(&field, &rule.label)?;
        }

        Ok(())
    }
}
