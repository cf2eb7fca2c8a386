//! Form edit set

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Key under which a form submits its custom field values
pub const CUSTOM_FIELDS_KEY: &str = "customFields";

/// The fields a user touched in a form
///
/// Flat key → value map, optionally with a nested `customFields` map.
/// Keys that are absent leave the corresponding entity field untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FormEditSet(pub Map<String, Value>);

impl FormEditSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.0.insert(key.into(), value.into());
        self
    }

    pub fn with_custom_field(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        let entry = self
            .0
            .entry(CUSTOM_FIELDS_KEY)
            .or_insert_with(|| Value::Object(Map::new()));
        if let Value::Object(map) = entry {
            map.insert(key.into(), value.into());
        }
        self
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Whether the form submitted a `customFields` entry at all
    pub fn has_custom_fields(&self) -> bool {
        self.0.contains_key(CUSTOM_FIELDS_KEY)
    }

    /// Submitted custom field values (non-object submissions count as empty)
    pub fn custom_fields(&self) -> Option<&Map<String, Value>> {
        self.0.get(CUSTOM_FIELDS_KEY).and_then(Value::as_object)
    }

    /// Scalar edits, excluding the `customFields` entry
    pub fn scalar_fields(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.0.iter().filter(|(k, _)| k.as_str() != CUSTOM_FIELDS_KEY)
    }
}

impl From<Map<String, Value>> for FormEditSet {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

impl TryFrom<Value> for FormEditSet {
    type Error = serde_json::Error;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        serde_json::from_value(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_custom_fields_are_nested() {
        let edits = FormEditSet::new()
            .with("name", "Shoes")
            .with_custom_field("weight", 3)
            .with_custom_field("subtitle", "Fast");

        assert!(edits.has_custom_fields());
        let custom = edits.custom_fields().unwrap();
        assert_eq!(custom["weight"], 3);
        assert_eq!(custom["subtitle"], "Fast");

        let scalars: Vec<_> = edits.scalar_fields().map(|(k, _)| k.as_str()).collect();
        assert_eq!(scalars, vec!["name"]);
    }

    #[test]
    fn test_from_json_value() {
        let edits = FormEditSet::try_from(json!({ "code": "x", "customFields": {} })).unwrap();
        assert_eq!(edits.get("code"), Some(&json!("x")));
        assert!(edits.custom_fields().unwrap().is_empty());

        assert!(FormEditSet::try_from(json!([1, 2])).is_err());
    }
}
