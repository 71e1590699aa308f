//! Argument extraction and formatting helpers shared by the bundled tools

use chrono::Utc;
use serde_json::{Map, Value};

use crate::tool_registry::ToolError;

pub const DEFAULT_INSURANCE_TYPE: &str = "general";
pub const DEFAULT_CAMPAIGN_OBJECTIVE: &str = "acquisition";
pub const DEFAULT_CHANNEL: &str = "email";
pub const DEFAULT_CAMPAIGN_GOAL: &str = "awareness";

pub fn now_millis() -> i64 {
    Utc::now().timestamp_millis()
}

pub fn required_str<'a>(arguments: &'a Map<String, Value>, key: &str) -> Result<&'a str, ToolError> {
    arguments
        .get(key)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .ok_or_else(|| ToolError::InvalidArguments(format!("{key} is required")))
}

pub fn optional_str<'a>(arguments: &'a Map<String, Value>, key: &str) -> Option<&'a str> {
    arguments
        .get(key)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|value| !value.is_empty())
}

pub fn str_or<'a>(arguments: &'a Map<String, Value>, key: &str, default: &'a str) -> &'a str {
    optional_str(arguments, key).unwrap_or(default)
}

pub fn contains_any(haystack: &str, needles: &[&str]) -> bool {
    needles.iter().any(|needle| haystack.contains(needle))
}

/// `life_insurance` becomes `life insurance`.
pub fn humanize(value: &str) -> String {
    value.replace('_', " ")
}

pub fn strings(values: &[&str]) -> Vec<String> {
    values.iter().map(|value| (*value).to_string()).collect()
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn args(value: Value) -> Map<String, Value> {
        value.as_object().cloned().expect("object")
    }

    #[test]
    fn required_str_rejects_blank_values() {
        let arguments = args(json!({"query": "   "}));
        let err = required_str(&arguments, "query").expect_err("blank");
        assert_eq!(err.to_string(), "invalid arguments: query is required");
    }

    #[test]
    fn str_or_falls_back_for_missing_or_non_string() {
        let arguments = args(json!({"channel": 5}));
        assert_eq!(str_or(&arguments, "channel", DEFAULT_CHANNEL), "email");
    }

    #[test]
    fn humanize_replaces_underscores() {
        assert_eq!(humanize("property_insurance"), "property insurance");
    }
}
