//! Server settings shared by every screen
//!
//! Holds what the server reports about the channel: its default language,
//! the languages content may be edited in, and custom-field definitions per
//! entity type. Screens read the current value or subscribe to changes.

use std::collections::HashMap;

use futures::stream::BoxStream;
use serde::{Deserialize, Serialize};
use shared::{CustomFieldDef, LanguageCode};
use tokio::sync::watch;

use crate::stream::watch_distinct;

/// 服务端配置快照
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerConfig {
    /// Channel default language; overrides the console default when set
    #[serde(default)]
    pub default_language: Option<LanguageCode>,
    #[serde(default)]
    pub available_languages: Vec<LanguageCode>,
    /// Entity type name (e.g. "Product") → definitions
    #[serde(default)]
    pub custom_fields: HashMap<String, Vec<CustomFieldDef>>,
}

impl ServerConfig {
    pub fn with_default_language(mut self, code: impl Into<LanguageCode>) -> Self {
        self.default_language = Some(code.into());
        self
    }

    pub fn with_languages<I, L>(mut self, languages: I) -> Self
    where
        I: IntoIterator<Item = L>,
        L: Into<LanguageCode>,
    {
        self.available_languages = languages.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_custom_fields(mut self, entity_type: impl Into<String>, defs: Vec<CustomFieldDef>) -> Self {
        self.custom_fields.insert(entity_type.into(), defs);
        self
    }
}

/// Live server settings
#[derive(Debug)]
pub struct ServerSettings {
    tx: watch::Sender<ServerConfig>,
}

impl ServerSettings {
    pub fn new(config: ServerConfig) -> Self {
        let (tx, _) = watch::channel(config);
        Self { tx }
    }

    /// Parse a server settings payload
    pub fn from_json(value: serde_json::Value) -> Result<Self, serde_json::Error> {
        Ok(Self::new(serde_json::from_value(value)?))
    }

    pub fn current(&self) -> ServerConfig {
        self.tx.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<ServerConfig> {
        self.tx.subscribe()
    }

    /// Replace the whole snapshot (e.g. after a settings refetch)
    pub fn update(&self, config: ServerConfig) {
        tracing::debug!(
            languages = config.available_languages.len(),
            entity_types = config.custom_fields.len(),
            "Server settings updated"
        );
        self.tx.send_replace(config);
    }

    pub fn set_available_languages(&self, languages: Vec<LanguageCode>) {
        self.tx.send_if_modified(|config| {
            let changed = config.available_languages != languages;
            config.available_languages = languages;
            changed
        });
    }

    pub fn default_language(&self) -> Option<LanguageCode> {
        self.tx.borrow().default_language.clone()
    }

    pub fn available_languages(&self) -> Vec<LanguageCode> {
        self.tx.borrow().available_languages.clone()
    }

    /// Definitions for one entity type; empty when none are declared
    pub fn custom_fields_for(&self, entity_type: &str) -> Vec<CustomFieldDef> {
        self.tx
            .borrow()
            .custom_fields
            .get(entity_type)
            .cloned()
            .unwrap_or_default()
    }

    /// Available languages now and on every change
    pub fn watch_languages(&self) -> BoxStream<'static, Vec<LanguageCode>> {
        watch_distinct(self.subscribe(), |c: &ServerConfig| c.available_languages.clone())
    }
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self::new(ServerConfig::default())
    }
}
