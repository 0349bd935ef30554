use crate::config::MappingConfig;
use crate::core::classifier::PatternClassifier;
use crate::core::dates::format_date;
use crate::domain::model::{Address, Order, TargetRecord};
use crate::utils::error::Result;
use serde_json::Value;
use std::collections::{HashMap, HashSet};

/// Airtable 欄位名稱
pub mod fields {
    pub const FIRST_NAME: &str = "Nome";
    pub const LAST_NAME: &str = "Sobrenome";
    pub const EMAIL: &str = "Email";
    pub const PHONE: &str = "Telefone";
    pub const ADDRESS: &str = "Endereço";
    pub const ZIP: &str = "CEP";
    pub const CITY: &str = "Cidade";
    pub const STATE: &str = "Estado";
    pub const CRMV: &str = "CRMV";
    pub const COMPANY: &str = "Nome da Clínica ou Hospital";
    pub const ORDER_NUMBER: &str = "Número do Pedido";
    pub const PAYMENT_STATUS: &str = "Status do Pagamento";
    pub const ORDER_DATE: &str = "Data do Pedido";
    pub const TEST_TYPE: &str = "Tipo de Teste";
    pub const NOTES: &str = "Observações";
    pub const PRODUCT: &str = "Produto";
    pub const QUANTITY: &str = "Quantidade";
    pub const TAG: &str = "TAG";
}

/// 載入一次後不再變動的對應規則
#[derive(Debug, Clone)]
pub struct MappingRules {
    payment_status: HashMap<String, String>,
    default_payment_status: String,
    classifier: PatternClassifier,
    choice_fields: HashSet<String>,
    per_line_item: bool,
    source_tag: Option<String>,
}

impl MappingRules {
    pub fn from_config(config: &MappingConfig) -> Result<Self> {
        Ok(Self {
            payment_status: config
                .payment_status
                .iter()
                .map(|(code, label)| (code.trim().to_lowercase(), label.clone()))
                .collect(),
            default_payment_status: config.default_payment_status.clone(),
            classifier: PatternClassifier::new(&config.rules)?,
            choice_fields: config.choice_fields.iter().cloned().collect(),
            per_line_item: config.per_line_item,
            source_tag: config
                .source_tag
                .clone()
                .filter(|tag| !tag.trim().is_empty()),
        })
    }

    pub fn translate_payment_status(&self, code: Option<&str>) -> &str {
        code.map(|c| c.trim().to_lowercase())
            .and_then(|c| self.payment_status.get(&c))
            .map(String::as_str)
            .unwrap_or(&self.default_payment_status)
    }

    pub fn is_choice_field(&self, name: &str) -> bool {
        self.choice_fields.contains(name)
    }
}

/// Order → Airtable 記錄的純函式轉換
#[derive(Debug, Clone)]
pub struct FieldMapper {
    rules: MappingRules,
}

impl FieldMapper {
    pub fn new(rules: MappingRules) -> Self {
        Self { rules }
    }

    /// 逐行模式下每個商品一筆記錄，否則整張訂單一筆
    pub fn map(&self, order: &Order) -> Vec<TargetRecord> {
        let base = self.order_fields(order);
        let tags = order.tags.as_deref().unwrap_or("");

        let mut records = if self.rules.per_line_item && !order.line_items.is_empty() {
            order
                .line_items
                .iter()
                .map(|item| {
                    let mut record = base.clone();
                    let name = item.display_name();
                    record.insert_text(fields::PRODUCT, name);
                    if let Some(quantity) = item.quantity {
                        record.insert(fields::QUANTITY, quantity);
                    }
                    let label = self.rules.classifier.classify_first([name, tags]);
                    record.insert_text(fields::TEST_TYPE, label.unwrap_or(""));
                    record
                })
                .collect::<Vec<_>>()
        } else {
            let item_names = order
                .line_items
                .iter()
                .map(|item| item.display_name())
                .collect::<Vec<_>>()
                .join(", ");
            let label = self
                .rules
                .classifier
                .classify_first([tags, item_names.as_str()]);

            let mut record = base;
            record.insert_text(fields::TEST_TYPE, label.unwrap_or(""));
            vec![record]
        };

        for record in &mut records {
            self.apply_empty_value_policy(record);
        }

        tracing::debug!(
            "🗺️ Mapped order {:?} into {} record(s)",
            order.order_number,
            records.len()
        );
        records
    }

    /// 選項欄位不可送出空值；文字欄位可以
    pub fn apply_empty_value_policy(&self, record: &mut TargetRecord) {
        record.retain(|name, value| !(self.rules.is_choice_field(name) && is_blank(value)));
    }

    fn order_fields(&self, order: &Order) -> TargetRecord {
        let customer = order.customer.clone().unwrap_or_default();
        let default_address = customer.default_address.clone().unwrap_or_default();
        let address = select_address(order);

        let mut record = TargetRecord::new();
        record.insert_text(
            fields::FIRST_NAME,
            first_non_blank([customer.first_name.as_deref(), address.first_name.as_deref()]),
        );
        record.insert_text(
            fields::LAST_NAME,
            first_non_blank([customer.last_name.as_deref(), address.last_name.as_deref()]),
        );
        record.insert_text(
            fields::EMAIL,
            first_non_blank([customer.email.as_deref(), order.email.as_deref()]),
        );
        record.insert_text(
            fields::PHONE,
            first_non_blank([
                address.phone.as_deref(),
                customer.phone.as_deref(),
                order.phone.as_deref(),
                default_address.phone.as_deref(),
            ]),
        );
        record.insert_text(fields::ADDRESS, &street_line(&address));
        record.insert_text(fields::ZIP, address.zip.as_deref().unwrap_or(""));
        record.insert_text(fields::CITY, address.city.as_deref().unwrap_or(""));
        record.insert_text(fields::STATE, address.province.as_deref().unwrap_or(""));
        record.insert_text(fields::CRMV, "");
        record.insert_text(
            fields::COMPANY,
            first_non_blank([
                address.company.as_deref(),
                order
                    .billing_address
                    .as_ref()
                    .and_then(|billing| billing.company.as_deref()),
                default_address.company.as_deref(),
            ]),
        );

        if let Some(number) = order_number(order) {
            record.insert(fields::ORDER_NUMBER, number);
        }

        record.insert_text(
            fields::PAYMENT_STATUS,
            self.rules
                .translate_payment_status(order.financial_status.as_deref()),
        );
        record.insert_text(
            fields::ORDER_DATE,
            &format_date(order.created_at.as_deref().unwrap_or("")),
        );
        record.insert_text(
            fields::NOTES,
            first_non_blank([order.note.as_deref(), customer.note.as_deref()]),
        );

        if let Some(tag) = &self.rules.source_tag {
            record.insert_text(fields::TAG, tag);
        }

        record
    }
}

/// 優先使用有街道地址的收件地址，其次帳單地址
pub fn select_address(order: &Order) -> Address {
    let shipping = order.shipping_address.as_ref();
    let billing = order.billing_address.as_ref();

    shipping
        .filter(|a| a.has_street_line())
        .or_else(|| billing.filter(|a| a.has_street_line()))
        .or(shipping)
        .or(billing)
        .cloned()
        .unwrap_or_default()
}

fn street_line(address: &Address) -> String {
    let line1 = address.address1.as_deref().unwrap_or("").trim();
    match address.address2.as_deref().map(str::trim) {
        Some(line2) if !line2.is_empty() && !line1.is_empty() => format!("{}, {}", line1, line2),
        _ => line1.to_string(),
    }
}

fn order_number(order: &Order) -> Option<i64> {
    order.order_number.or_else(|| {
        order
            .name
            .as_deref()
            .map(|name| name.trim().trim_start_matches('#'))
            .and_then(|digits| digits.parse().ok())
    })
}

fn first_non_blank<'a, const N: usize>(candidates: [Option<&'a str>; N]) -> &'a str {
    candidates
        .into_iter()
        .flatten()
        .find(|value| !value.trim().is_empty())
        .unwrap_or("")
}

fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.trim().is_empty(),
        Value::Array(items) => items.is_empty(),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::model::{Customer, LineItem};

    fn mapper() -> FieldMapper {
        FieldMapper::new(MappingRules::from_config(&MappingConfig::default()).unwrap())
    }

    fn line_item_mapper() -> FieldMapper {
        let config = MappingConfig {
            per_line_item: true,
            ..MappingConfig::default()
        };
        FieldMapper::new(MappingRules::from_config(&config).unwrap())
    }

    fn address(street: &str, phone: &str, company: &str) -> Address {
        Address {
            address1: Some(street.to_string()),
            phone: Some(phone.to_string()),
            company: Some(company.to_string()),
            city: Some("Campinas".to_string()),
            province: Some("SP".to_string()),
            zip: Some("13000-000".to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn test_payment_status_translation_table() {
        let rules = MappingRules::from_config(&MappingConfig::default()).unwrap();
        let expected = [
            ("paid", "Pago"),
            ("pending", "Pendente"),
            ("authorized", "Autorizado"),
            ("partially_paid", "Parcialmente Pago"),
            ("refunded", "Reembolsado"),
            ("partially_refunded", "Parcialmente Reembolsado"),
            ("voided", "Cancelado"),
            ("expired", "Expirado"),
        ];
        for (code, label) in expected {
            assert_eq!(rules.translate_payment_status(Some(code)), label);
        }
        assert_eq!(rules.translate_payment_status(Some("PAID")), "Pago");
        assert_eq!(rules.translate_payment_status(Some("mystery")), "Pendente");
        assert_eq!(rules.translate_payment_status(None), "Pendente");
    }

    #[test]
    fn test_prefers_shipping_address_with_street_line() {
        let order = Order {
            shipping_address: Some(address("Rua das Flores, 10", "111", "Clínica A")),
            billing_address: Some(address("Av. Brasil, 99", "222", "Clínica B")),
            ..Default::default()
        };
        let record = &mapper().map(&order)[0];
        assert_eq!(record.get_str(fields::ADDRESS), Some("Rua das Flores, 10"));
        assert_eq!(record.get_str(fields::PHONE), Some("111"));
        assert_eq!(record.get_str(fields::COMPANY), Some("Clínica A"));
    }

    #[test]
    fn test_falls_back_to_billing_when_shipping_has_no_street() {
        let order = Order {
            shipping_address: Some(address("  ", "111", "")),
            billing_address: Some(address("Av. Brasil, 99", "222", "Clínica B")),
            ..Default::default()
        };
        let record = &mapper().map(&order)[0];
        assert_eq!(record.get_str(fields::ADDRESS), Some("Av. Brasil, 99"));
        assert_eq!(record.get_str(fields::PHONE), Some("222"));
    }

    #[test]
    fn test_phone_company_and_notes_fallback_chains() {
        let order = Order {
            phone: Some("333".to_string()),
            note: None,
            billing_address: Some(Address {
                company: Some("Hospital Vet".to_string()),
                ..Default::default()
            }),
            shipping_address: Some(address("Rua A", "", "")),
            customer: Some(Customer {
                phone: None,
                note: Some("Entregar pela manhã".to_string()),
                ..Default::default()
            }),
            ..Default::default()
        };
        let record = &mapper().map(&order)[0];
        assert_eq!(record.get_str(fields::PHONE), Some("333"));
        assert_eq!(record.get_str(fields::COMPANY), Some("Hospital Vet"));
        assert_eq!(record.get_str(fields::NOTES), Some("Entregar pela manhã"));
    }

    #[test]
    fn test_default_address_is_last_resort_for_phone() {
        let order = Order {
            customer: Some(Customer {
                default_address: Some(Address {
                    phone: Some("444".to_string()),
                    company: Some("Clínica Padrão".to_string()),
                    ..Default::default()
                }),
                ..Default::default()
            }),
            ..Default::default()
        };
        let record = &mapper().map(&order)[0];
        assert_eq!(record.get_str(fields::PHONE), Some("444"));
        assert_eq!(record.get_str(fields::COMPANY), Some("Clínica Padrão"));
    }

    #[test]
    fn test_empty_choice_fields_are_omitted_but_text_fields_kept() {
        let order = Order::default();
        let record = &mapper().map(&order)[0];

        assert!(!record.contains(fields::STATE));
        assert!(!record.contains(fields::TEST_TYPE));
        assert_eq!(record.get_str(fields::CITY), Some(""));
        assert_eq!(record.get_str(fields::CRMV), Some(""));
        assert_eq!(record.get_str(fields::PAYMENT_STATUS), Some("Pendente"));
    }

    #[test]
    fn test_apply_empty_value_policy_on_arbitrary_record() {
        let mapper = mapper();
        let mut record: TargetRecord = [
            (fields::TEST_TYPE, Value::from("")),
            (fields::STATE, Value::Null),
            (fields::CITY, Value::from("")),
        ]
        .into_iter()
        .collect();

        mapper.apply_empty_value_policy(&mut record);
        assert_eq!(record.field_names(), vec![fields::CITY.to_string()]);
    }

    #[test]
    fn test_order_level_classification_prefers_tags() {
        let order = Order {
            tags: Some("PCR, urgente".to_string()),
            line_items: vec![LineItem {
                name: Some("Hemograma Completo".to_string()),
                ..Default::default()
            }],
            ..Default::default()
        };
        let record = &mapper().map(&order)[0];
        assert_eq!(record.get_str(fields::TEST_TYPE), Some("PCR"));

        let order = Order {
            tags: Some("urgente".to_string()),
            ..order
        };
        let record = &mapper().map(&order)[0];
        assert_eq!(record.get_str(fields::TEST_TYPE), Some("Hemograma Completo"));
    }

    #[test]
    fn test_per_line_item_mode_emits_one_record_per_item() {
        let order = Order {
            order_number: Some(77),
            financial_status: Some("paid".to_string()),
            line_items: vec![
                LineItem {
                    name: Some("Hemograma Completo".to_string()),
                    quantity: Some(2),
                    ..Default::default()
                },
                LineItem {
                    name: Some("Urinálise".to_string()),
                    quantity: Some(1),
                    ..Default::default()
                },
                LineItem {
                    name: Some("Frete".to_string()),
                    ..Default::default()
                },
            ],
            ..Default::default()
        };

        let records = line_item_mapper().map(&order);
        assert_eq!(records.len(), 3);

        for record in &records {
            assert_eq!(record.get(fields::ORDER_NUMBER), Some(&Value::from(77)));
            assert_eq!(record.get_str(fields::PAYMENT_STATUS), Some("Pago"));
        }
        assert_eq!(records[0].get_str(fields::TEST_TYPE), Some("Hemograma Completo"));
        assert_eq!(records[0].get(fields::QUANTITY), Some(&Value::from(2)));
        assert_eq!(records[1].get_str(fields::TEST_TYPE), Some("Urinálise"));
        assert!(!records[2].contains(fields::TEST_TYPE));
        assert!(!records[2].contains(fields::QUANTITY));
        assert_eq!(records[2].get_str(fields::PRODUCT), Some("Frete"));
    }

    #[test]
    fn test_per_line_item_mode_without_items_yields_order_record() {
        let records = line_item_mapper().map(&Order::default());
        assert_eq!(records.len(), 1);
        assert!(!records[0].contains(fields::PRODUCT));
    }

    #[test]
    fn test_order_number_falls_back_to_name() {
        let order = Order {
            name: Some("#1042".to_string()),
            ..Default::default()
        };
        let record = &mapper().map(&order)[0];
        assert_eq!(record.get(fields::ORDER_NUMBER), Some(&Value::from(1042)));
    }

    #[test]
    fn test_street_line_joins_address2() {
        let addr = Address {
            address1: Some("Rua A, 10".to_string()),
            address2: Some("Sala 3".to_string()),
            ..Default::default()
        };
        assert_eq!(street_line(&addr), "Rua A, 10, Sala 3");
    }
}
