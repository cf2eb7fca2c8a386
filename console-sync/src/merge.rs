//! Translation merger
//!
//! Folds a form's edits into a translatable entity snapshot. The input
//! snapshot is borrowed and never modified; a new snapshot is returned.
//!
//! Overlay rule: an edit key is applied only where the target (translation
//! or entity) already has that key. Custom fields follow the server-provided
//! definitions: `localeString` values go to the translation, everything else
//! to the entity, with empty strings replaced by a type default.

use serde_json::{Map, Value};
use shared::{CustomFieldDef, FormEditSet, LanguageCode, Translatable, Translation};

/// Keys that identify a record and are never patched by a form
const IDENTITY_KEYS: [&str; 3] = ["id", "languageCode", "translations"];

/// Merge `edits` into `current` for `language_code`
///
/// When `current` has no translation for the language, `default_translation`
/// (a caller-supplied skeleton) is used as the base; without one, the new
/// translation is built from the edit keys that are not entity fields.
/// A translation that already existed keeps its position; a new one is
/// appended.
///
/// When the form submitted `customFields` and `custom_field_defs` is not
/// empty, the entity's `customFields` is *replaced* by the values processed
/// here; fields present on the entity but absent from the definitions are
/// dropped.
pub fn merge(
    current: &Translatable,
    edits: &FormEditSet,
    custom_field_defs: &[CustomFieldDef],
    language_code: &LanguageCode,
    default_translation: Option<&Translation>,
) -> Translatable {
    let existing_index = current.translation_index(language_code);
    let base = match (existing_index, default_translation) {
        (Some(index), _) => current.translations[index].clone(),
        (None, Some(skeleton)) => Translation {
            language_code: language_code.clone(),
            ..skeleton.clone()
        },
        (None, None) => synthesize_translation(current, edits, language_code),
    };

    let mut new_translation = Translation {
        fields: overlay(&base.fields, edits),
        ..base
    };
    let mut new_entity = Translatable {
        id: current.id.clone(),
        translations: Vec::new(),
        custom_fields: current.custom_fields.clone(),
        fields: overlay(&current.fields, edits),
    };

    if let Some(submitted) = edits.custom_fields()
        && !custom_field_defs.is_empty()
    {
        let (entity_custom, translation_custom) = route_custom_fields(submitted, custom_field_defs);
        if custom_field_defs.iter().any(|d| d.field_type.is_localized()) {
            new_translation.custom_fields = Some(translation_custom);
        }
        new_entity.custom_fields = Some(entity_custom);
    }

    let mut translations = current.translations.clone();
    match existing_index {
        Some(index) => translations[index] = new_translation,
        None => translations.push(new_translation),
    }
    new_entity.translations = translations;
    new_entity
}

/// Shallow overlay of the edit keys that already exist on `target`
fn overlay(target: &Map<String, Value>, edits: &FormEditSet) -> Map<String, Value> {
    let mut result = target.clone();
    for (key, value) in edits.scalar_fields() {
        if IDENTITY_KEYS.contains(&key.as_str()) {
            continue;
        }
        if let Some(slot) = result.get_mut(key) {
            *slot = value.clone();
        }
    }
    result
}

/// New translation when neither the entity nor the caller supplies a base
fn synthesize_translation(
    current: &Translatable,
    edits: &FormEditSet,
    language_code: &LanguageCode,
) -> Translation {
    let mut translation = Translation::new(language_code.clone());
    for (key, value) in edits.scalar_fields() {
        if IDENTITY_KEYS.contains(&key.as_str()) || current.fields.contains_key(key) {
            continue;
        }
        translation.fields.insert(key.clone(), value.clone());
    }
    translation
}

/// Split submitted custom field values into (entity, translation) maps
fn route_custom_fields(
    submitted: &Map<String, Value>,
    defs: &[CustomFieldDef],
) -> (Map<String, Value>, Map<String, Value>) {
    let mut entity_custom = Map::new();
    let mut translation_custom = Map::new();

    for def in defs {
        let Some(value) = submitted.get(&def.name) else {
            continue;
        };
        if def.field_type.is_localized() {
            translation_custom.insert(def.name.clone(), value.clone());
        } else {
            let value = match value {
                Value::String(s) if s.is_empty() => def.field_type.default_value(),
                other => other.clone(),
            };
            entity_custom.insert(def.name.clone(), value);
        }
    }

    for name in submitted.keys() {
        if !defs.iter().any(|d| &d.name == name) {
            tracing::trace!(field = %name, "Ignoring custom field without definition");
        }
    }

    (entity_custom, translation_custom)
}
