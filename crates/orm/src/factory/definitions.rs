//! Factory document model

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use crate::error::{OrmError, OrmResult};

/// `{ "columns": [ { "<column>": <rule> }, ... ] }`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FactoryDocument {
    #[serde(default)]
    pub columns: Vec<BTreeMap<String, ColumnGenRule>>,
}

impl FactoryDocument {
    pub fn from_json(content: &str) -> OrmResult<Self> {
        Ok(serde_json::from_str(content)?)
    }

    /// Column rules in document order
    pub fn rules(&self) -> impl Iterator<Item = (&str, &ColumnGenRule)> {
        self.columns
            .iter()
            .flat_map(|entry| entry.iter().map(|(name, rule)| (name.as_str(), rule)))
    }

    pub fn has_column(&self, column: &str) -> bool {
        self.rules().any(|(name, _)| name == column)
    }
}

/// How one column's value is produced
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ColumnGenRule {
    #[serde(default)]
    pub fake: bool,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub value_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom: Option<JsonValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub manipulation: Option<Manipulation>,
}

impl ColumnGenRule {
    /// Classify `custom` into a literal, a reference lookup or nothing
    pub fn custom_value(&self) -> OrmResult<CustomValue> {
        let Some(custom) = &self.custom else {
            return Ok(CustomValue::Empty);
        };

        match custom {
            JsonValue::Null => Ok(CustomValue::Empty),
            JsonValue::String(s) if s.is_empty() || s == "null" => Ok(CustomValue::Empty),
            JsonValue::Object(map) => match map.get("reference_table") {
                Some(reference) => {
                    let reference: TableReference = serde_json::from_value(reference.clone())
                        .map_err(|e| OrmError::InvalidDocument(format!("invalid reference_table: {}", e)))?;
                    Ok(CustomValue::Reference(reference))
                }
                None => Ok(CustomValue::Empty),
            },
            literal => Ok(CustomValue::Literal(literal.clone())),
        }
    }
}

/// Resolved meaning of a rule's `custom` field
#[derive(Debug, Clone, PartialEq)]
pub enum CustomValue {
    Literal(JsonValue),
    Reference(TableReference),
    Empty,
}

/// `{"table": ..., "column": ...}` inside `reference_table`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableReference {
    pub table: String,
    pub column: String,
}

/// Regex substitution applied to textual values
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Manipulation {
    pub regex: String,
    #[serde(default)]
    pub replace_with: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn rule(value: JsonValue) -> ColumnGenRule {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_rules_keep_document_order() {
        let doc = FactoryDocument::from_json(
            r#"{"columns": [
                {"name": {"fake": true, "type": "name"}},
                {"email": {"fake": true, "type": "email"}},
                {"role": {"fake": false, "custom": "admin"}}
            ]}"#,
        )
        .unwrap();

        let names: Vec<&str> = doc.rules().map(|(name, _)| name).collect();
        assert_eq!(names, vec!["name", "email", "role"]);
        assert!(doc.has_column("email"));
        assert!(!doc.has_column("id"));
    }

    #[test]
    fn test_custom_classification() {
        assert_eq!(
            rule(json!({"custom": "admin"})).custom_value().unwrap(),
            CustomValue::Literal(json!("admin"))
        );
        assert_eq!(
            rule(json!({"custom": 42})).custom_value().unwrap(),
            CustomValue::Literal(json!(42))
        );
        assert_eq!(rule(json!({"custom": "null"})).custom_value().unwrap(), CustomValue::Empty);
        assert_eq!(rule(json!({"custom": ""})).custom_value().unwrap(), CustomValue::Empty);
        assert_eq!(rule(json!({})).custom_value().unwrap(), CustomValue::Empty);
        assert_eq!(
            rule(json!({"custom": {"reference_table": {"table": "users", "column": "id"}}}))
                .custom_value()
                .unwrap(),
            CustomValue::Reference(TableReference {
                table: "users".to_string(),
                column: "id".to_string()
            })
        );
        assert_eq!(rule(json!({"custom": {"other": 1}})).custom_value().unwrap(), CustomValue::Empty);
    }

    #[test]
    fn test_malformed_reference_is_invalid() {
        let err = rule(json!({"custom": {"reference_table": {"table": "users"}}}))
            .custom_value()
            .unwrap_err();
        assert!(matches!(err, OrmError::InvalidDocument(_)));
    }
}
