//! UI message catalog
//!
//! One `<lang>.json` file per language. Nested objects flatten to dotted keys
//! (`{"common": {"save": "Save"}}` → `common.save`). Lookups fall back to the
//! default language, then to the key itself. `{name}` placeholders are
//! substituted from the caller's arguments.

use std::collections::HashMap;
use std::fs::{self, File};
use std::io::BufReader;
use std::path::{Path, PathBuf};

use serde_json::Value;
use shared::LanguageCode;
use thiserror::Error;

/// Catalog loading error
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid catalog {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Catalog {0} is not a JSON object")]
    NotAnObject(PathBuf),
}

/// 界面文案目录
#[derive(Debug, Clone)]
pub struct TranslationCatalog {
    default_language: LanguageCode,
    messages: HashMap<LanguageCode, HashMap<String, String>>,
}

impl TranslationCatalog {
    pub fn new(default_language: impl Into<LanguageCode>) -> Self {
        Self {
            default_language: default_language.into(),
            messages: HashMap::new(),
        }
    }

    /// Load every `*.json` file in `dir`; the file stem is the language code
    pub fn load_dir(dir: &Path, default_language: impl Into<LanguageCode>) -> Result<Self, CatalogError> {
        let mut catalog = Self::new(default_language);
        for entry in fs::read_dir(dir)? {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            let language = LanguageCode::from(stem);
            let value = read_json_file(&path)?;
            if !value.is_object() {
                return Err(CatalogError::NotAnObject(path));
            }
            catalog.insert_json(language.clone(), &value);
            tracing::debug!(%language, path = %path.display(), "Catalog loaded");
        }
        Ok(catalog)
    }

    /// Merge a nested JSON object into one language's messages
    pub fn insert_json(&mut self, language: LanguageCode, value: &Value) {
        let messages = self.messages.entry(language).or_default();
        flatten_into(String::new(), value, messages);
    }

    pub fn insert(&mut self, language: impl Into<LanguageCode>, key: impl Into<String>, message: impl Into<String>) {
        self.messages
            .entry(language.into())
            .or_default()
            .insert(key.into(), message.into());
    }

    pub fn default_language(&self) -> &LanguageCode {
        &self.default_language
    }

    /// Languages with at least one message, sorted
    pub fn languages(&self) -> Vec<LanguageCode> {
        let mut languages: Vec<_> = self.messages.keys().cloned().collect();
        languages.sort();
        languages
    }

    pub fn contains(&self, language: &LanguageCode, key: &str) -> bool {
        self.messages
            .get(language)
            .is_some_and(|m| m.contains_key(key))
    }

    /// Raw message, falling back to the default language, then to `key`
    pub fn get<'a>(&'a self, language: &LanguageCode, key: &'a str) -> &'a str {
        self.lookup(language, key)
            .or_else(|| self.lookup(&self.default_language, key))
            .unwrap_or_else(|| {
                tracing::trace!(%language, key, "Missing catalog entry");
                key
            })
    }

    /// Message with `{name}` placeholders substituted
    pub fn translate(&self, language: &LanguageCode, key: &str, args: &[(&str, &str)]) -> String {
        let mut message = self.get(language, key).to_string();
        for (name, value) in args {
            message = message.replace(&format!("{{{}}}", name), value);
        }
        message
    }

    fn lookup(&self, language: &LanguageCode, key: &str) -> Option<&str> {
        self.messages
            .get(language)
            .and_then(|m| m.get(key))
            .map(String::as_str)
    }
}

fn read_json_file(path: &Path) -> Result<Value, CatalogError> {
    let reader = BufReader::new(File::open(path)?);
    serde_json::from_reader(reader).map_err(|source| CatalogError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

fn flatten_into(prefix: String, value: &Value, out: &mut HashMap<String, String>) {
    match value {
        Value::Object(map) => {
            for (key, child) in map {
                let path = if prefix.is_empty() {
                    key.clone()
                } else {
                    format!("{}.{}", prefix, key)
                };
                flatten_into(path, child, out);
            }
        }
        Value::String(s) => {
            out.insert(prefix, s.clone());
        }
        Value::Number(n) => {
            out.insert(prefix, n.to_string());
        }
        Value::Bool(b) => {
            out.insert(prefix, b.to_string());
        }
        // Arrays and nulls carry no message
        Value::Array(_) | Value::Null => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn write(dir: &Path, name: &str, value: &Value) {
        fs::write(dir.join(name), serde_json::to_vec(value).unwrap()).unwrap();
    }

    #[test]
    fn test_load_dir_and_fallback() {
        let dir = tempfile::tempdir().unwrap();
        write(
            dir.path(),
            "en.json",
            &json!({ "common": { "save": "Save", "delete": "Delete" }, "catalog": { "products": "Products" } }),
        );
        write(dir.path(), "de.json", &json!({ "common": { "save": "Speichern" } }));
        fs::write(dir.path().join("README.md"), "ignored").unwrap();

        let catalog = TranslationCatalog::load_dir(dir.path(), "en").unwrap();
        let de = LanguageCode::from("de");

        assert_eq!(catalog.languages(), vec![LanguageCode::from("de"), LanguageCode::from("en")]);
        assert_eq!(catalog.get(&de, "common.save"), "Speichern");
        assert_eq!(catalog.get(&de, "common.delete"), "Delete");
        assert_eq!(catalog.get(&de, "missing.key"), "missing.key");
        assert!(catalog.contains(&LanguageCode::from("en"), "catalog.products"));
    }

    #[test]
    fn test_invalid_file() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("en.json"), "{ not json").unwrap();
        assert!(matches!(
            TranslationCatalog::load_dir(dir.path(), "en"),
            Err(CatalogError::Parse { .. })
        ));

        fs::write(dir.path().join("en.json"), "[1, 2]").unwrap();
        assert!(matches!(
            TranslationCatalog::load_dir(dir.path(), "en"),
            Err(CatalogError::NotAnObject(_))
        ));
    }

    #[test]
    fn test_interpolation() {
        let mut catalog = TranslationCatalog::new("en");
        catalog.insert("en", "list.total", "Showing {count} of {total}");
        let text = catalog.translate(&"en".into(), "list.total", &[("count", "10"), ("total", "42")]);
        assert_eq!(text, "Showing 10 of 42");
    }
}
