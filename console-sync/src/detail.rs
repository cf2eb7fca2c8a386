//! Detail screen view model
//!
//! Combines a resolved entity stream with the `lang` query param:
//!
//! - create screens populate their form once, from the empty draft
//! - edit screens repopulate on every entity push and every language switch
//!
//! `save` merges the form's edits into the latest entity at the current
//! language and hands a create or update to the mutator. Failures are
//! returned unchanged; the view model never retries.

use std::sync::{Arc, Mutex};

use futures::StreamExt;
use futures::stream::BoxStream;
use serde_json::{Value, json};
use shared::intent::CrudAction;
use shared::{FormEditSet, LanguageCode, Translatable, Translation};
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

use crate::config::ConsoleConfig;
use crate::data_access::Mutator;
use crate::error::{SyncError, SyncResult};
use crate::inspector::Inspector;
use crate::merge::merge;
use crate::params::{LANG_PARAM, ParamMap, QueryParamStore};
use crate::resolver::ResolvedEntity;
use crate::settings::ServerSettings;
use crate::stream::watch_stream;

const INSPECT_SOURCE: &str = "detail";

/// 详情页视图模型
pub struct DetailViewModel<T> {
    entity_type: String,
    is_new: bool,
    params: Arc<dyn QueryParamStore>,
    settings: Arc<ServerSettings>,
    fallback_language: LanguageCode,
    entity: Arc<watch::Sender<Option<T>>>,
    language: Arc<watch::Sender<LanguageCode>>,
    pending: Mutex<Option<BoxStream<'static, T>>>,
    shutdown: CancellationToken,
    inspector: Inspector,
}

impl<T: Clone + Send + Sync + 'static> DetailViewModel<T> {
    /// `entity_type` selects the custom-field definitions (e.g. "Product")
    pub fn new(
        entity_type: impl Into<String>,
        resolved: ResolvedEntity<T>,
        params: Arc<dyn QueryParamStore>,
        settings: Arc<ServerSettings>,
        config: &ConsoleConfig,
    ) -> Self {
        let fallback_language = config.default_language.clone();
        let initial = language_from(&params.subscribe().borrow(), &settings, &fallback_language);
        Self {
            entity_type: entity_type.into(),
            is_new: resolved.is_new,
            params,
            settings,
            fallback_language,
            entity: Arc::new(watch::channel(None).0),
            language: Arc::new(watch::channel(initial).0),
            pending: Mutex::new(Some(resolved.stream)),
            shutdown: CancellationToken::new(),
            inspector: Inspector::disabled(),
        }
    }

    pub fn with_inspector(mut self, inspector: Inspector) -> Self {
        self.inspector = inspector;
        self
    }

    /// Start following the entity and the language
    ///
    /// `populate(entity, language)` is the screen's form-population hook.
    pub fn start<F>(&self, populate: F) -> SyncResult<()>
    where
        F: FnMut(&T, &LanguageCode) + Send + 'static,
    {
        if self.shutdown.is_cancelled() {
            return Err(SyncError::Destroyed);
        }
        let stream = self
            .pending
            .lock()
            .ok()
            .and_then(|mut pending| pending.take())
            .ok_or(SyncError::AlreadyBound)?;

        let worker = PopulateWorker {
            entity_type: self.entity_type.clone(),
            is_new: self.is_new,
            settings: self.settings.clone(),
            fallback_language: self.fallback_language.clone(),
            entity: self.entity.clone(),
            language: self.language.clone(),
            inspector: self.inspector.clone(),
        };
        tokio::spawn(worker.run(stream, self.params.subscribe(), populate, self.shutdown.clone()));
        Ok(())
    }

    pub fn is_new(&self) -> bool {
        self.is_new
    }

    pub fn entity_type(&self) -> &str {
        &self.entity_type
    }

    /// Latest entity, `None` until the first push
    pub fn entity_snapshot(&self) -> Option<T> {
        self.entity.borrow().clone()
    }

    pub fn entity(&self) -> BoxStream<'static, T> {
        watch_stream(self.entity.subscribe())
            .filter_map(futures::future::ready)
            .boxed()
    }

    pub fn current_language(&self) -> LanguageCode {
        self.language.borrow().clone()
    }

    pub fn language_code(&self) -> BoxStream<'static, LanguageCode> {
        watch_stream(self.language.subscribe())
    }

    pub fn available_languages(&self) -> BoxStream<'static, Vec<LanguageCode>> {
        self.settings.watch_languages()
    }

    /// Switch the edited language; only the URL changes here
    pub fn set_language(&self, code: impl Into<LanguageCode>) {
        let code = code.into();
        let available = self.settings.available_languages();
        if !available.is_empty() && !available.contains(&code) {
            tracing::warn!(entity_type = %self.entity_type, %code, "Language not enabled on the server");
        }
        self.params.set(LANG_PARAM, Some(code.to_string()));
    }

    pub fn destroy(&self) {
        if !self.shutdown.is_cancelled() {
            tracing::debug!(entity_type = %self.entity_type, "Detail view destroyed");
            self.shutdown.cancel();
        }
    }
}

impl DetailViewModel<Translatable> {
    /// Merge `edits` at the current language and persist through `mutator`
    ///
    /// Creates when the entity is a draft, updates otherwise. Returns the
    /// mutator's response.
    pub async fn save(
        &self,
        edits: &FormEditSet,
        mutator: &dyn Mutator,
        default_translation: Option<&Translation>,
    ) -> SyncResult<Value> {
        if self.shutdown.is_cancelled() {
            return Err(SyncError::Destroyed);
        }
        let current = self.entity_snapshot().ok_or(SyncError::EntityNotLoaded)?;
        let language = self.current_language();
        let defs = self.settings.custom_fields_for(&self.entity_type);

        let merged = merge(&current, edits, &defs, &language, default_translation);
        let input = merged.to_mutation_input()?;
        let action = if merged.is_new() {
            CrudAction::Create(input)
        } else {
            CrudAction::Update {
                id: merged.id.clone(),
                data: input,
            }
        };

        let operation = action.name();
        self.inspector.record(INSPECT_SOURCE, operation, || {
            json!({ "entityType": self.entity_type, "id": merged.id, "language": language })
        });

        match mutator.mutate(action).await {
            Ok(response) => {
                tracing::info!(entity_type = %self.entity_type, operation, %language, "Entity saved");
                Ok(response)
            }
            Err(e) => {
                tracing::warn!(entity_type = %self.entity_type, operation, error = %e, "Save failed");
                Err(e.into())
            }
        }
    }
}

impl<T> Drop for DetailViewModel<T> {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

/// `lang` param if present, else the server default, else the console default
fn language_from(params: &ParamMap, settings: &ServerSettings, fallback: &LanguageCode) -> LanguageCode {
    params
        .get(LANG_PARAM)
        .filter(|code| !code.is_empty())
        .map(|code| LanguageCode::from(code.as_str()))
        .or_else(|| settings.default_language())
        .unwrap_or_else(|| fallback.clone())
}

struct PopulateWorker<T> {
    entity_type: String,
    is_new: bool,
    settings: Arc<ServerSettings>,
    fallback_language: LanguageCode,
    entity: Arc<watch::Sender<Option<T>>>,
    language: Arc<watch::Sender<LanguageCode>>,
    inspector: Inspector,
}

impl<T: Clone + Send + Sync + 'static> PopulateWorker<T> {
    async fn run<F>(
        self,
        mut entities: BoxStream<'static, T>,
        mut params_rx: watch::Receiver<ParamMap>,
        mut populate: F,
        shutdown: CancellationToken,
    ) where
        F: FnMut(&T, &LanguageCode) + Send + 'static,
    {
        let mut language = language_from(&params_rx.borrow_and_update(), &self.settings, &self.fallback_language);
        self.language.send_replace(language.clone());

        let mut entities_open = true;
        let mut current: Option<T> = None;
        let mut populated = false;

        loop {
            tokio::select! {
                biased;

                _ = shutdown.cancelled() => {
                    tracing::debug!(entity_type = %self.entity_type, "Populate worker stopped");
                    break;
                }
                next = entities.next(), if entities_open => {
                    let Some(entity) = next else {
                        tracing::debug!(entity_type = %self.entity_type, "Entity stream ended");
                        entities_open = false;
                        continue;
                    };
                    self.entity.send_replace(Some(entity.clone()));
                    if !(self.is_new && populated) {
                        self.fire(&mut populate, &entity, &language, "entity");
                        populated = true;
                    }
                    current = Some(entity);
                }
                changed = params_rx.changed() => {
                    if changed.is_err() {
                        tracing::info!(entity_type = %self.entity_type, "Query params closed, stopping populate worker");
                        break;
                    }
                    let next = language_from(&params_rx.borrow_and_update(), &self.settings, &self.fallback_language);
                    if next == language {
                        continue;
                    }
                    language = next;
                    self.language.send_replace(language.clone());
                    if !self.is_new
                        && let Some(entity) = &current
                    {
                        self.fire(&mut populate, entity, &language, "language");
                    }
                }
            }
        }
    }

    fn fire<F>(&self, populate: &mut F, entity: &T, language: &LanguageCode, reason: &str)
    where
        F: FnMut(&T, &LanguageCode),
    {
        tracing::debug!(entity_type = %self.entity_type, %language, reason, "Populating form");
        self.inspector.record(INSPECT_SOURCE, "populate", || {
            json!({ "entityType": self.entity_type, "language": language, "reason": reason })
        });
        populate(entity, language);
    }
}
