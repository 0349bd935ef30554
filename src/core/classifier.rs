use crate::config::RuleConfig;
use crate::utils::error::{Result, SyncError};
use regex::Regex;

#[derive(Debug, Clone)]
struct Rule {
    pattern: Regex,
    label: String,
}

/// 依序比對的正規表達式規則；第一個符合的規則決定分類
#[derive(Debug, Clone, Default)]
pub struct PatternClassifier {
    rules: Vec<Rule>,
}

impl PatternClassifier {
    pub fn new(rules: &[RuleConfig]) -> Result<Self> {
        let rules = rules
            .iter()
            .enumerate()
            .map(|(index, rule)| {
                let pattern =
                    Regex::new(&rule.pattern).map_err(|e| SyncError::InvalidConfigValueError {
                        field: format!("mapping.rules[{}]", index),
                        value: rule.pattern.clone(),
                        reason: format!("Invalid regular expression: {}", e),
                    })?;
                Ok(Rule {
                    pattern,
                    label: rule.label.clone(),
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self { rules })
    }

    pub fn classify(&self, text: &str) -> Option<&str> {
        if text.trim().is_empty() {
            return None;
        }

        self.rules
            .iter()
            .find(|rule| rule.pattern.is_match(text))
            .map(|rule| rule.label.as_str())
    }

    /// 依序嘗試多段文字，回傳第一段有分類結果的標籤
    pub fn classify_first<'a, I>(&self, texts: I) -> Option<&str>
    where
        I: IntoIterator<Item = &'a str>,
    {
        texts.into_iter().find_map(|text| self.classify(text))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn classifier() -> PatternClassifier {
        PatternClassifier::new(&[
            RuleConfig::new(r"(?i)hemograma\s+completo", "Hemograma Completo"),
            RuleConfig::new(r"(?i)hemograma", "Hemograma"),
            RuleConfig::new(r"(?i)\bpcr\b", "PCR"),
        ])
        .unwrap()
    }

    #[test]
    fn test_first_listed_rule_wins() {
        let classifier = classifier();
        assert_eq!(
            classifier.classify("Hemograma Completo - Canino"),
            Some("Hemograma Completo")
        );
        assert_eq!(classifier.classify("hemograma simples"), Some("Hemograma"));
    }

    #[test]
    fn test_rule_order_is_respected_even_when_less_specific_first() {
        let classifier = PatternClassifier::new(&[
            RuleConfig::new(r"(?i)hemograma", "Hemograma"),
            RuleConfig::new(r"(?i)hemograma\s+completo", "Hemograma Completo"),
        ])
        .unwrap();
        assert_eq!(classifier.classify("Hemograma Completo"), Some("Hemograma"));
    }

    #[test]
    fn test_no_match_yields_none() {
        let classifier = classifier();
        assert_eq!(classifier.classify("Raio-X"), None);
        assert_eq!(classifier.classify(""), None);
        assert_eq!(classifier.classify("PCRX"), None);
    }

    #[test]
    fn test_classify_first_falls_through_texts() {
        let classifier = classifier();
        assert_eq!(
            classifier.classify_first(["vip, atacado", "PCR Cinomose"]),
            Some("PCR")
        );
        assert_eq!(classifier.classify_first(["", "nada"]), None);
    }

    #[test]
    fn test_invalid_pattern_is_reported_with_index() {
        let err = PatternClassifier::new(&[
            RuleConfig::new("ok", "Ok"),
            RuleConfig::new("(broken", "Broken"),
        ])
        .unwrap_err();

        match err {
            SyncError::InvalidConfigValueError { field, .. } => {
                assert_eq!(field, "mapping.rules[1]")
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
