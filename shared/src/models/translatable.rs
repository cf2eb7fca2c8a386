//! Translatable Model

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::types::LanguageCode;

/// 实体 ID 为空字符串时表示尚未持久化 (新建草稿)
pub const NEW_ENTITY_ID: &str = "";

/// Translatable entity
///
/// Dynamic record form of any entity whose user-facing text is stored per
/// language. Non-localized scalar fields live in `fields`; identity
/// (`id`), `translations` and `customFields` are modelled explicitly.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Translatable {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub translations: Vec<Translation>,
    /// Non-localized extension data
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_fields: Option<Map<String, Value>>,
    /// Non-localized scalar fields
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

/// One language's localized fields
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Translation {
    pub language_code: LanguageCode,
    /// Localized extension data (`localeString` custom fields)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_fields: Option<Map<String, Value>>,
    /// Localized fields (name, slug, description, ...)
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

impl Translation {
    pub fn new(language_code: impl Into<LanguageCode>) -> Self {
        Self {
            language_code: language_code.into(),
            custom_fields: None,
            fields: Map::new(),
        }
    }

    pub fn with_field(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.insert(key.into(), value.into());
        self
    }

    pub fn with_custom_field(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.custom_fields
            .get_or_insert_with(Map::new)
            .insert(key.into(), value.into());
        self
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }
}

impl Translatable {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Default::default()
        }
    }

    /// 新建草稿 (id 为空)
    pub fn draft() -> Self {
        Self::new(NEW_ENTITY_ID)
    }

    pub fn with_field(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.insert(key.into(), value.into());
        self
    }

    pub fn with_custom_field(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.custom_fields
            .get_or_insert_with(Map::new)
            .insert(key.into(), value.into());
        self
    }

    /// Append a translation, replacing an existing one for the same language
    pub fn with_translation(mut self, translation: Translation) -> Self {
        match self.translation_index(&translation.language_code) {
            Some(index) => self.translations[index] = translation,
            None => self.translations.push(translation),
        }
        self
    }

    pub fn is_new(&self) -> bool {
        self.id == NEW_ENTITY_ID
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    pub fn translation(&self, language_code: &LanguageCode) -> Option<&Translation> {
        self.translations
            .iter()
            .find(|t| &t.language_code == language_code)
    }

    pub fn translation_index(&self, language_code: &LanguageCode) -> Option<usize> {
        self.translations
            .iter()
            .position(|t| &t.language_code == language_code)
    }

    /// Languages that currently have a translation, in insertion order
    pub fn languages(&self) -> Vec<LanguageCode> {
        self.translations
            .iter()
            .map(|t| t.language_code.clone())
            .collect()
    }

    /// Convert a typed entity into its dynamic record form
    pub fn from_entity<T: Serialize>(entity: &T) -> Result<Self, serde_json::Error> {
        serde_json::from_value(serde_json::to_value(entity)?)
    }

    /// Convert back into a typed entity
    pub fn into_entity<T: DeserializeOwned>(self) -> Result<T, serde_json::Error> {
        serde_json::from_value(serde_json::to_value(self)?)
    }

    /// Input object for a create/update mutation
    ///
    /// Drafts omit the empty id so the server assigns one.
    pub fn to_mutation_input(&self) -> Result<Value, serde_json::Error> {
        let mut value = serde_json::to_value(self)?;
        if self.is_new()
            && let Value::Object(map) = &mut value
        {
            map.remove("id");
        }
        Ok(value)
    }
}

/// Typed access to an entity's identifier
pub trait Identifiable {
    fn id(&self) -> &str;

    fn is_new(&self) -> bool {
        self.id() == NEW_ENTITY_ID
    }
}

impl Identifiable for Translatable {
    fn id(&self) -> &str {
        &self.id
    }
}

/// Fetch result for an entity type that may be a plain JSON record
impl Identifiable for Value {
    fn id(&self) -> &str {
        self.get("id").and_then(Value::as_str).unwrap_or(NEW_ENTITY_ID)
    }
}
