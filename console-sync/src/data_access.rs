//! Data-access capabilities consumed by the coordinators
//!
//! The concrete transport (GraphQL client, cache) lives outside this crate.
//! Screens hand the coordinators implementations of these traits.
//!
//! In-memory implementations ([`MemoryQuery`], [`MemoryEntityStore`]) back
//! local development and tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use futures::StreamExt;
use futures::channel::mpsc;
use futures::stream::BoxStream;
use serde_json::Value;
use shared::intent::CrudAction;
use shared::{DataError, DataResult, Translatable};
use tokio::sync::watch;

use crate::stream::watch_stream;

/// A live paginated query
///
/// `refetch` re-issues the query on the same subscription; results (including
/// failures) arrive on every stream returned by `results`. Ordering between
/// overlapping refetches is last-write-wins and owned by the handle.
#[async_trait]
pub trait QueryHandle<R>: Send + Sync {
    async fn refetch(&self, variables: Value) -> DataResult<()>;

    fn results(&self) -> BoxStream<'static, DataResult<R>>;
}

/// Ongoing stream of one entity; `None` while unresolved or not found
pub trait EntitySource<T>: Send + Sync {
    fn fetch_by_id(&self, id: &str) -> BoxStream<'static, Option<T>>;
}

/// [`EntitySource`] backed by a closure
pub struct FnSource<F>(F);

/// Wrap a `fetch_by_id` closure as an [`EntitySource`]
pub fn source_fn<T, F>(fetch_by_id: F) -> FnSource<F>
where
    F: Fn(&str) -> BoxStream<'static, Option<T>> + Send + Sync,
{
    FnSource(fetch_by_id)
}

impl<T, F> EntitySource<T> for FnSource<F>
where
    F: Fn(&str) -> BoxStream<'static, Option<T>> + Send + Sync,
{
    fn fetch_by_id(&self, id: &str) -> BoxStream<'static, Option<T>> {
        (self.0)(id)
    }
}

/// Fire-once create/update/delete operation
#[async_trait]
pub trait Mutator: Send + Sync {
    async fn mutate(&self, action: CrudAction<Value>) -> DataResult<Value>;
}

// =============================================================================
// In-memory query
// =============================================================================

type Resolver<R> = dyn Fn(&Value) -> DataResult<R> + Send + Sync;

/// In-memory [`QueryHandle`]
///
/// Every refetch runs `resolver` against the variables and pushes the result
/// to all subscribers. Variables are recorded for inspection.
pub struct MemoryQuery<R> {
    resolver: Arc<Resolver<R>>,
    subscribers: Mutex<Vec<mpsc::UnboundedSender<DataResult<R>>>>,
    refetches: Mutex<Vec<Value>>,
    refetch_count: watch::Sender<usize>,
}

impl<R: Send + 'static> MemoryQuery<R> {
    pub fn new<F>(resolver: F) -> Self
    where
        F: Fn(&Value) -> DataResult<R> + Send + Sync + 'static,
    {
        let (refetch_count, _) = watch::channel(0);
        Self {
            resolver: Arc::new(resolver),
            subscribers: Mutex::new(Vec::new()),
            refetches: Mutex::new(Vec::new()),
            refetch_count,
        }
    }

    /// Variables of every refetch so far, oldest first
    pub fn refetches(&self) -> Vec<Value> {
        self.refetches
            .lock()
            .map(|r| r.clone())
            .unwrap_or_default()
    }

    /// Wait until at least `n` refetches have been issued
    pub async fn wait_for_refetches(&self, n: usize) {
        let mut rx = self.refetch_count.subscribe();
        let _ = rx.wait_for(|count| *count >= n).await;
    }

    fn publish(&self, variables: &Value) {
        let Ok(mut subscribers) = self.subscribers.lock() else {
            return;
        };
        subscribers.retain(|tx| tx.unbounded_send((self.resolver)(variables)).is_ok());
    }
}

#[async_trait]
impl<R: Send + 'static> QueryHandle<R> for MemoryQuery<R> {
    async fn refetch(&self, variables: Value) -> DataResult<()> {
        if let Ok(mut log) = self.refetches.lock() {
            log.push(variables.clone());
        }
        self.publish(&variables);
        self.refetch_count.send_modify(|count| *count += 1);
        Ok(())
    }

    fn results(&self) -> BoxStream<'static, DataResult<R>> {
        let (tx, rx) = mpsc::unbounded();
        if let Ok(mut subscribers) = self.subscribers.lock() {
            subscribers.push(tx);
        }
        rx.boxed()
    }
}

// =============================================================================
// In-memory entity store
// =============================================================================

/// In-memory live cache of entities keyed by id
///
/// `fetch_by_id` streams `None` until the entity is stored, then every update.
pub struct MemoryEntityStore<T> {
    entries: Mutex<HashMap<String, watch::Sender<Option<T>>>>,
    next_id: AtomicU64,
}

impl<T: Clone + Send + Sync + 'static> MemoryEntityStore<T> {
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            next_id: AtomicU64::new(1),
        }
    }

    fn sender(&self, id: &str) -> Option<watch::Sender<Option<T>>> {
        let mut entries = self.entries.lock().ok()?;
        Some(
            entries
                .entry(id.to_string())
                .or_insert_with(|| watch::channel(None).0)
                .clone(),
        )
    }

    /// Store or replace an entity, notifying live subscribers
    pub fn put(&self, id: &str, entity: T) {
        if let Some(tx) = self.sender(id) {
            tx.send_replace(Some(entity));
        }
    }

    pub fn remove(&self, id: &str) {
        if let Some(tx) = self.sender(id) {
            tx.send_replace(None);
        }
    }

    pub fn get(&self, id: &str) -> Option<T> {
        let entries = self.entries.lock().ok()?;
        entries.get(id).and_then(|tx| tx.borrow().clone())
    }

    fn allocate_id(&self) -> String {
        self.next_id.fetch_add(1, Ordering::Relaxed).to_string()
    }
}

impl<T: Clone + Send + Sync + 'static> Default for MemoryEntityStore<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Clone + Send + Sync + 'static> EntitySource<T> for MemoryEntityStore<T> {
    fn fetch_by_id(&self, id: &str) -> BoxStream<'static, Option<T>> {
        match self.sender(id) {
            Some(tx) => watch_stream(tx.subscribe()),
            None => futures::stream::empty().boxed(),
        }
    }
}

#[async_trait]
impl Mutator for MemoryEntityStore<Translatable> {
    async fn mutate(&self, action: CrudAction<Value>) -> DataResult<Value> {
        match action {
            CrudAction::Create(input) => {
                let mut entity: Translatable = serde_json::from_value(input)?;
                entity.id = self.allocate_id();
                self.put(&entity.id.clone(), entity.clone());
                Ok(serde_json::to_value(entity)?)
            }
            CrudAction::Update { id, data } => {
                if self.get(&id).is_none() {
                    return Err(DataError::not_found(format!("Entity {} not found", id)));
                }
                let mut entity: Translatable = serde_json::from_value(data)?;
                entity.id = id.clone();
                self.put(&id, entity.clone());
                Ok(serde_json::to_value(entity)?)
            }
            CrudAction::Delete { id } => {
                self.remove(&id);
                Ok(serde_json::json!({ "result": "DELETED", "id": id }))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_memory_query_pushes_results_to_subscribers() {
        let query = MemoryQuery::new(|vars: &Value| Ok(vars["options"]["skip"].as_u64().unwrap_or(0)));
        let mut results = query.results();

        query.refetch(json!({ "options": { "skip": 20 } })).await.unwrap();
        assert_eq!(results.next().await.unwrap().unwrap(), 20);
        assert_eq!(query.refetches().len(), 1);

        query.wait_for_refetches(1).await;
    }

    #[tokio::test]
    async fn test_entity_store_streams_updates() {
        let store: MemoryEntityStore<Translatable> = MemoryEntityStore::new();
        let mut stream = store.fetch_by_id("1");
        assert_eq!(stream.next().await, Some(None));

        store.put("1", Translatable::new("1").with_field("code", "a"));
        let first = stream.next().await.unwrap().unwrap();
        assert_eq!(first.get("code"), Some(&json!("a")));
    }

    #[tokio::test]
    async fn test_entity_store_mutations() {
        let store: MemoryEntityStore<Translatable> = MemoryEntityStore::new();
        let created = store
            .mutate(CrudAction::Create(json!({ "code": "new", "translations": [] })))
            .await
            .unwrap();
        let id = created["id"].as_str().unwrap().to_string();
        assert_eq!(store.get(&id).unwrap().get("code"), Some(&json!("new")));

        let missing = store
            .mutate(CrudAction::Update { id: "999".into(), data: json!({}) })
            .await;
        assert!(matches!(missing, Err(DataError::NotFound(_))));

        store.mutate(CrudAction::Delete { id: id.clone() }).await.unwrap();
        assert!(store.get(&id).is_none());
    }
}
