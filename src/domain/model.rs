use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::sync::OnceLock;

/// Shopify `orders/create` 的訂單內容；所有欄位皆可缺省
///
/// 型別不符的欄位一律視為缺省，不會讓整個 webhook 失敗。
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Order {
    #[serde(deserialize_with = "lenient::integer")]
    pub id: Option<i64>,
    #[serde(deserialize_with = "lenient::integer")]
    pub order_number: Option<i64>,
    #[serde(deserialize_with = "lenient::text")]
    pub name: Option<String>,
    #[serde(deserialize_with = "lenient::text")]
    pub email: Option<String>,
    #[serde(deserialize_with = "lenient::text")]
    pub phone: Option<String>,
    #[serde(deserialize_with = "lenient::text")]
    pub note: Option<String>,
    #[serde(deserialize_with = "lenient::text")]
    pub tags: Option<String>,
    #[serde(deserialize_with = "lenient::text")]
    pub financial_status: Option<String>,
    #[serde(deserialize_with = "lenient::text")]
    pub created_at: Option<String>,
    #[serde(deserialize_with = "lenient::object")]
    pub customer: Option<Customer>,
    #[serde(deserialize_with = "lenient::object")]
    pub shipping_address: Option<Address>,
    #[serde(deserialize_with = "lenient::object")]
    pub billing_address: Option<Address>,
    #[serde(deserialize_with = "lenient::list")]
    pub line_items: Vec<LineItem>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Customer {
    #[serde(deserialize_with = "lenient::text")]
    pub first_name: Option<String>,
    #[serde(deserialize_with = "lenient::text")]
    pub last_name: Option<String>,
    #[serde(deserialize_with = "lenient::text")]
    pub email: Option<String>,
    #[serde(deserialize_with = "lenient::text")]
    pub phone: Option<String>,
    #[serde(deserialize_with = "lenient::text")]
    pub note: Option<String>,
    #[serde(deserialize_with = "lenient::object")]
    pub default_address: Option<Address>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Address {
    #[serde(deserialize_with = "lenient::text")]
    pub first_name: Option<String>,
    #[serde(deserialize_with = "lenient::text")]
    pub last_name: Option<String>,
    #[serde(deserialize_with = "lenient::text")]
    pub address1: Option<String>,
    #[serde(deserialize_with = "lenient::text")]
    pub address2: Option<String>,
    #[serde(deserialize_with = "lenient::text")]
    pub city: Option<String>,
    #[serde(deserialize_with = "lenient::text")]
    pub province: Option<String>,
    #[serde(deserialize_with = "lenient::text")]
    pub zip: Option<String>,
    #[serde(deserialize_with = "lenient::text")]
    pub phone: Option<String>,
    #[serde(deserialize_with = "lenient::text")]
    pub company: Option<String>,
}

impl Address {
    pub fn has_street_line(&self) -> bool {
        self.address1
            .as_deref()
            .map(|line| !line.trim().is_empty())
            .unwrap_or(false)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LineItem {
    #[serde(deserialize_with = "lenient::text")]
    pub name: Option<String>,
    #[serde(deserialize_with = "lenient::text")]
    pub title: Option<String>,
    #[serde(deserialize_with = "lenient::integer")]
    pub quantity: Option<i64>,
}

impl LineItem {
    /// 顯示名稱：優先 `name`，其次 `title`
    pub fn display_name(&self) -> &str {
        self.name
            .as_deref()
            .filter(|n| !n.trim().is_empty())
            .or(self.title.as_deref())
            .unwrap_or("")
    }
}

/// 寬鬆的反序列化：null 或型別不符時回傳缺省值
mod lenient {
    use serde::de::DeserializeOwned;
    use serde::{Deserialize, Deserializer};
    use serde_json::Value;

    /// 字串原樣保留；數字轉字串；字串陣列以 ", " 串接 (例如 tags)
    pub fn text<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<String>, D::Error> {
        Ok(match Value::deserialize(deserializer)? {
            Value::String(s) => Some(s),
            Value::Number(n) => Some(n.to_string()),
            Value::Bool(b) => Some(b.to_string()),
            Value::Array(items) => {
                let parts: Vec<String> = items
                    .into_iter()
                    .filter_map(|item| match item {
                        Value::String(s) => Some(s),
                        Value::Number(n) => Some(n.to_string()),
                        _ => None,
                    })
                    .collect();
                (!parts.is_empty()).then(|| parts.join(", "))
            }
            Value::Null | Value::Object(_) => None,
        })
    }

    /// 整數或數字字串 (允許前置 `#`)
    pub fn integer<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<i64>, D::Error> {
        Ok(match Value::deserialize(deserializer)? {
            Value::Number(n) => n
                .as_i64()
                .or_else(|| n.as_f64().filter(|f| f.fract() == 0.0).map(|f| f as i64)),
            Value::String(s) => s.trim().trim_start_matches('#').parse().ok(),
            _ => None,
        })
    }

    pub fn object<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
    where
        D: Deserializer<'de>,
        T: DeserializeOwned,
    {
        Ok(match Value::deserialize(deserializer)? {
            value @ Value::Object(_) => serde_json::from_value(value).ok(),
            _ => None,
        })
    }

    /// 非陣列視為空；無法解析的元素略過
    pub fn list<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
    where
        D: Deserializer<'de>,
        T: DeserializeOwned,
    {
        Ok(match Value::deserialize(deserializer)? {
            Value::Array(items) => items
                .into_iter()
                .filter_map(|item| serde_json::from_value(item).ok())
                .collect(),
            _ => Vec::new(),
        })
    }
}

/// 要寫入 Airtable 的單筆記錄 (欄位名稱 → 值)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TargetRecord {
    fields: Map<String, Value>,
}

impl TargetRecord {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        self.fields.insert(name.into(), value.into());
    }

    pub fn insert_text(&mut self, name: impl Into<String>, value: &str) {
        self.fields
            .insert(name.into(), Value::String(value.trim().to_string()));
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }

    pub fn get_str(&self, name: &str) -> Option<&str> {
        self.fields.get(name).and_then(Value::as_str)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.fields.contains_key(name)
    }

    pub fn remove(&mut self, name: &str) -> Option<Value> {
        self.fields.remove(name)
    }

    pub fn retain(&mut self, keep: impl FnMut(&String, &mut Value) -> bool) {
        self.fields.retain(keep);
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn field_names(&self) -> Vec<String> {
        self.fields.keys().cloned().collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.fields.iter()
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for TargetRecord {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut record = TargetRecord::new();
        for (name, value) in iter {
            record.insert(name, value);
        }
        record
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreatedRecord {
    pub id: String,
}

/// 遠端拒絕的原因分類
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectionKind {
    UnknownField,
    InvalidChoice,
    InvalidValue,
    Other,
}

impl RejectionKind {
    /// 可以透過移除欄位後重送來修復的錯誤
    pub fn is_schema_rejection(self) -> bool {
        !matches!(self, RejectionKind::Other)
    }
}

/// Airtable 回傳的錯誤內容
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpstreamError {
    pub status: u16,
    pub error_type: String,
    pub message: String,
}

impl UpstreamError {
    pub fn kind(&self) -> RejectionKind {
        match self.error_type.as_str() {
            "UNKNOWN_FIELD_NAME" => return RejectionKind::UnknownField,
            "INVALID_MULTIPLE_CHOICE_OPTIONS" | "INVALID_SELECT_OPTION" => {
                return RejectionKind::InvalidChoice
            }
            "INVALID_VALUE_FOR_COLUMN" => return RejectionKind::InvalidValue,
            _ => {}
        }

        let message = self.message.to_lowercase();
        if message.contains("unknown field name") {
            RejectionKind::UnknownField
        } else if message.contains("select option") {
            RejectionKind::InvalidChoice
        } else if message.contains("cannot accept the provided value") {
            RejectionKind::InvalidValue
        } else {
            RejectionKind::Other
        }
    }

    /// 錯誤訊息中所有以雙引號包住的片段，依出現順序
    pub fn quoted_tokens(&self) -> Vec<String> {
        static QUOTED: OnceLock<Regex> = OnceLock::new();
        let re = QUOTED.get_or_init(|| Regex::new(r#""([^"]+)""#).expect("static pattern"));

        re.captures_iter(&self.message)
            .map(|caps| caps[1].to_string())
            .collect()
    }
}

impl fmt::Display for UpstreamError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}: {}", self.status, self.error_type, self.message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rejection(error_type: &str, message: &str) -> UpstreamError {
        UpstreamError {
            status: 422,
            error_type: error_type.to_string(),
            message: message.to_string(),
        }
    }

    #[test]
    fn test_rejection_kind_from_type() {
        assert_eq!(
            rejection("UNKNOWN_FIELD_NAME", "Unknown field name: \"B\"").kind(),
            RejectionKind::UnknownField
        );
        assert_eq!(
            rejection("INVALID_MULTIPLE_CHOICE_OPTIONS", "x").kind(),
            RejectionKind::InvalidChoice
        );
        assert_eq!(
            rejection("INVALID_VALUE_FOR_COLUMN", "x").kind(),
            RejectionKind::InvalidValue
        );
        assert_eq!(
            rejection("AUTHENTICATION_REQUIRED", "x").kind(),
            RejectionKind::Other
        );
    }

    #[test]
    fn test_rejection_kind_from_message() {
        let err = rejection("UNPROCESSABLE", "Unknown field name: \"TAG\"");
        assert_eq!(err.kind(), RejectionKind::UnknownField);
    }

    #[test]
    fn test_quoted_tokens() {
        let err = rejection(
            "INVALID_MULTIPLE_CHOICE_OPTIONS",
            "Insufficient permissions to create new select option \"\"Shopify\"\"",
        );
        assert_eq!(err.quoted_tokens(), vec!["Shopify".to_string()]);

        let err = rejection(
            "INVALID_VALUE_FOR_COLUMN",
            "Field \"Data do Pedido\" cannot accept the provided value \"ontem\"",
        );
        assert_eq!(
            err.quoted_tokens(),
            vec!["Data do Pedido".to_string(), "ontem".to_string()]
        );
    }

    #[test]
    fn test_order_deserializes_with_missing_and_null_fields() {
        let order: Order = serde_json::from_value(serde_json::json!({
            "order_number": 1001,
            "customer": null,
            "shipping_address": {"address1": "Rua A, 10", "zip": null},
            "unexpected": {"ignored": true}
        }))
        .unwrap();

        assert_eq!(order.order_number, Some(1001));
        assert!(order.customer.is_none());
        assert!(order.shipping_address.unwrap().has_street_line());
        assert!(order.line_items.is_empty());
    }

    #[test]
    fn test_order_tolerates_mistyped_fields() {
        let order: Order = serde_json::from_value(serde_json::json!({
            "id": "450789469",
            "order_number": "5",
            "tags": ["a", "b"],
            "email": 42,
            "customer": "not-an-object",
            "line_items": null
        }))
        .unwrap();

        assert_eq!(order.id, Some(450789469));
        assert_eq!(order.order_number, Some(5));
        assert_eq!(order.tags.as_deref(), Some("a, b"));
        assert_eq!(order.email.as_deref(), Some("42"));
        assert!(order.customer.is_none());
        assert!(order.line_items.is_empty());
    }

    #[test]
    fn test_line_items_with_extra_or_mistyped_attributes() {
        let order: Order = serde_json::from_value(serde_json::json!({
            "line_items": [
                {"name": "PCR", "price": 10.5, "quantity": "2"},
                {"title": "Hemograma", "sku": 77, "quantity": 1.0},
                "garbage"
            ]
        }))
        .unwrap();

        assert_eq!(order.line_items.len(), 2);
        assert_eq!(order.line_items[0].display_name(), "PCR");
        assert_eq!(order.line_items[0].quantity, Some(2));
        assert_eq!(order.line_items[1].display_name(), "Hemograma");
        assert_eq!(order.line_items[1].quantity, Some(1));
    }

    #[test]
    fn test_line_item_display_name_falls_back_to_title() {
        let item = LineItem {
            name: Some("  ".to_string()),
            title: Some("Hemograma".to_string()),
            ..Default::default()
        };
        assert_eq!(item.display_name(), "Hemograma");
    }
}
