use std::borrow::Cow;

use serde_json::Value;

use crate::models::AuditRecord;

/// An event name plus a request parameter whose value must start with `prefix`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchRule {
    pub event_name: String,
    pub parameter: String,
    pub prefix: String,
}

impl Default for MatchRule {
    fn default() -> Self {
        MatchRule {
            event_name: "CreateUser".to_string(),
            parameter: "userName".to_string(),
            prefix: "foo".to_string(),
        }
    }
}

impl MatchRule {
    /// Event names compare exactly, the parameter prefix ignores case.
    pub fn matches(&self, record: &AuditRecord) -> bool {
        if record.event_name != self.event_name {
            return false;
        }

        record
            .parameter(&self.parameter)
            .is_some_and(|value| starts_with_ignore_case(&parameter_text(value), &self.prefix))
    }

    /// Matching records in their original order.
    pub fn select<'a>(&self, records: &'a [AuditRecord]) -> Vec<&'a AuditRecord> {
        records.iter().filter(|record| self.matches(record)).collect()
    }
}

/// Text form of a request parameter: strings as-is, `null` as empty, everything else as
/// compact JSON.
pub fn parameter_text(value: &Value) -> Cow<'_, str> {
    match value {
        Value::String(s) => Cow::Borrowed(s.as_str()),
        Value::Null => Cow::Borrowed(""),
        other => Cow::Owned(other.to_string()),
    }
}

fn starts_with_ignore_case(text: &str, prefix: &str) -> bool {
    let mut text_chars = text.chars().flat_map(char::to_lowercase);
    prefix
        .chars()
        .flat_map(char::to_lowercase)
        .all(|expected| text_chars.next() == Some(expected))
}
