//! Custom Field Model

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Custom field value type (as configured on the server)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum CustomFieldType {
    String,
    /// Localized string, stored per translation
    LocaleString,
    Text,
    Int,
    Float,
    Boolean,
    Datetime,
}

impl CustomFieldType {
    /// Whether values of this type live on the translation rather than the entity
    pub fn is_localized(&self) -> bool {
        matches!(self, CustomFieldType::LocaleString)
    }

    /// Value substituted when a form submits an empty string for this type
    pub fn default_value(&self) -> Value {
        match self {
            CustomFieldType::String | CustomFieldType::LocaleString | CustomFieldType::Text => {
                Value::String(String::new())
            }
            CustomFieldType::Boolean => Value::Bool(false),
            CustomFieldType::Int | CustomFieldType::Float => Value::from(0),
            CustomFieldType::Datetime => Value::String(chrono::Utc::now().to_rfc3339()),
        }
    }
}

/// Custom field definition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomFieldDef {
    pub name: String,
    #[serde(rename = "type")]
    pub field_type: CustomFieldType,
    /// Display label (falls back to `name`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

impl CustomFieldDef {
    pub fn new(name: impl Into<String>, field_type: CustomFieldType) -> Self {
        Self {
            name: name.into(),
            field_type,
            label: None,
        }
    }

    pub fn label(&self) -> &str {
        self.label.as_deref().unwrap_or(&self.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_default_values() {
        assert_eq!(CustomFieldType::String.default_value(), json!(""));
        assert_eq!(CustomFieldType::LocaleString.default_value(), json!(""));
        assert_eq!(CustomFieldType::Boolean.default_value(), json!(false));
        assert_eq!(CustomFieldType::Int.default_value(), json!(0));
        assert_eq!(CustomFieldType::Float.default_value(), json!(0));

        let ts = CustomFieldType::Datetime.default_value();
        let parsed = chrono::DateTime::parse_from_rfc3339(ts.as_str().unwrap());
        assert!(parsed.is_ok());
    }

    #[test]
    fn test_deserialize_definition() {
        let def: CustomFieldDef =
            serde_json::from_value(json!({ "name": "subtitle", "type": "localeString" })).unwrap();
        assert_eq!(def.field_type, CustomFieldType::LocaleString);
        assert!(def.field_type.is_localized());
        assert_eq!(def.label(), "subtitle");
    }
}
