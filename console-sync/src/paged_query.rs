//! Paged list query coordinator
//!
//! Keeps a list screen's query in sync with the URL:
//!
//! ```text
//! URL (page, perPage) ─┐
//!                      ├─► PagingState ─► PageWindow ─► handle.refetch(variables)
//! refresh() ───────────┘
//!                         handle.results() ─► extract_page ─► items / total_items
//! ```
//!
//! The URL is the only source of truth for paging. Navigation methods write
//! query params and nothing else; the refetch happens when the change comes
//! back through the param subscription. One query handle is created per
//! bind and reused for every refetch.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use futures::StreamExt;
use futures::stream::BoxStream;
use serde_json::{Value, json};
use shared::intent::{PageWindow, PaginatedResponse, PagingState};
use shared::DataError;
use tokio::sync::{broadcast, watch};
use tokio_util::sync::CancellationToken;

use crate::config::ConsoleConfig;
use crate::data_access::QueryHandle;
use crate::error::{SyncError, SyncResult};
use crate::inspector::Inspector;
use crate::params::{PAGE_PARAM, PER_PAGE_PARAM, ParamMap, QueryParamStore};
use crate::stream::{watch_distinct, watch_stream};

const INSPECT_SOURCE: &str = "paged_query";

/// Query-param names carrying paging state
///
/// Screens with two paged lists use distinct names for the second one
/// (e.g. a collection's contents list uses [`PagingKeys::contents`]).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PagingKeys {
    pub page: String,
    pub per_page: String,
}

impl PagingKeys {
    pub fn new(page: impl Into<String>, per_page: impl Into<String>) -> Self {
        Self {
            page: page.into(),
            per_page: per_page.into(),
        }
    }

    /// `contentsPage` / `contentsPerPage`
    pub fn contents() -> Self {
        Self::new("contentsPage", "contentsPerPage")
    }

    fn derive(&self, params: &ParamMap, default_per_page: u32) -> PagingState {
        let page = params.get(&self.page).map(String::as_str);
        let per_page = params.get(&self.per_page).map(String::as_str);
        let paging = PagingState::from_params_or(page, per_page, default_per_page);
        if page.is_some_and(|raw| raw.trim() != paging.current_page.to_string())
            || per_page.is_some_and(|raw| raw.trim() != paging.items_per_page.to_string())
        {
            tracing::debug!(?page, ?per_page, ?paging, "Malformed paging params, using defaults");
        }
        paging
    }
}

impl Default for PagingKeys {
    fn default() -> Self {
        Self::new(PAGE_PARAM, PER_PAGE_PARAM)
    }
}

struct Channels<T> {
    paging: watch::Sender<PagingState>,
    items: watch::Sender<Vec<T>>,
    total_items: watch::Sender<u64>,
    refresh: watch::Sender<u64>,
    errors: broadcast::Sender<Arc<DataError>>,
}

/// 分页列表协调器
pub struct PagedQuery<T> {
    name: String,
    params: Arc<dyn QueryParamStore>,
    keys: PagingKeys,
    default_per_page: u32,
    channels: Arc<Channels<T>>,
    bound: AtomicBool,
    shutdown: CancellationToken,
    inspector: Inspector,
}

impl<T: Clone + Send + Sync + 'static> PagedQuery<T> {
    pub fn new(name: impl Into<String>, params: Arc<dyn QueryParamStore>, config: &ConsoleConfig) -> Self {
        let keys = PagingKeys::default();
        let default_per_page = config.items_per_page;
        let initial = keys.derive(&params.subscribe().borrow(), default_per_page);
        let (errors, _) = broadcast::channel(16);
        Self {
            name: name.into(),
            params,
            keys,
            default_per_page,
            channels: Arc::new(Channels {
                paging: watch::channel(initial).0,
                items: watch::channel(Vec::new()).0,
                total_items: watch::channel(0).0,
                refresh: watch::channel(0).0,
                errors,
            }),
            bound: AtomicBool::new(false),
            shutdown: CancellationToken::new(),
            inspector: Inspector::disabled(),
        }
    }

    pub fn with_keys(mut self, keys: PagingKeys) -> Self {
        self.keys = keys;
        self.rederive();
        self
    }

    pub fn with_default_per_page(mut self, per_page: u32) -> Self {
        self.default_per_page = per_page.max(1);
        self.rederive();
        self
    }

    pub fn with_inspector(mut self, inspector: Inspector) -> Self {
        self.inspector = inspector;
        self
    }

    fn rederive(&self) {
        let paging = self
            .keys
            .derive(&self.params.subscribe().borrow(), self.default_per_page);
        self.channels.paging.send_replace(paging);
    }

    /// Supply the query and start following the URL
    ///
    /// `fetch_page(take, skip)` is called once with the initial window and
    /// must return the handle every later refetch goes through.
    /// `extract_page` pulls items and total from each result.
    pub fn bind<R, F, E>(&self, fetch_page: F, extract_page: E) -> SyncResult<()>
    where
        R: Send + 'static,
        F: FnOnce(u32, u32) -> Arc<dyn QueryHandle<R>>,
        E: Fn(&R) -> PaginatedResponse<T> + Send + Sync + 'static,
    {
        self.bind_with_variables(fetch_page, extract_page, |window: PageWindow| {
            window.to_variables()
        })
    }

    /// Like [`PagedQuery::bind`], with a custom `PageWindow` → variables mapping
    pub fn bind_with_variables<R, F, E, V>(&self, fetch_page: F, extract_page: E, variables: V) -> SyncResult<()>
    where
        R: Send + 'static,
        F: FnOnce(u32, u32) -> Arc<dyn QueryHandle<R>>,
        E: Fn(&R) -> PaginatedResponse<T> + Send + Sync + 'static,
        V: Fn(PageWindow) -> Value + Send + Sync + 'static,
    {
        if self.shutdown.is_cancelled() {
            return Err(SyncError::Destroyed);
        }
        if self.bound.swap(true, Ordering::SeqCst) {
            return Err(SyncError::AlreadyBound);
        }

        let params_rx = self.params.subscribe();
        let initial = self.keys.derive(&params_rx.borrow(), self.default_per_page);
        let window = initial.window();
        let handle = fetch_page(window.take, window.skip);

        tracing::debug!(query = %self.name, skip = window.skip, take = window.take, "Paged query bound");

        let worker = RefetchWorker {
            name: self.name.clone(),
            handle,
            extract_page,
            variables,
            keys: self.keys.clone(),
            default_per_page: self.default_per_page,
            channels: self.channels.clone(),
            inspector: self.inspector.clone(),
        };
        let refresh_rx = self.channels.refresh.subscribe();
        tokio::spawn(worker.run(params_rx, refresh_rx, self.shutdown.clone()));
        Ok(())
    }

    pub fn is_bound(&self) -> bool {
        self.bound.load(Ordering::SeqCst)
    }

    fn ensure_navigable(&self, operation: &str) -> SyncResult<()> {
        if self.shutdown.is_cancelled() {
            return Err(SyncError::Destroyed);
        }
        if !self.is_bound() {
            tracing::error!(query = %self.name, operation, "Paged query used before bind()");
            return Err(SyncError::QueryNotBound);
        }
        Ok(())
    }

    /// Navigate to `page`; only the URL changes here
    pub fn set_page_number(&self, page: u32) -> SyncResult<()> {
        self.ensure_navigable("set_page_number")?;
        self.params.set(&self.keys.page, Some(page.to_string()));
        Ok(())
    }

    /// Change page size; only the URL changes here
    pub fn set_items_per_page(&self, per_page: u32) -> SyncResult<()> {
        self.ensure_navigable("set_items_per_page")?;
        self.params.set(&self.keys.per_page, Some(per_page.to_string()));
        Ok(())
    }

    /// Re-issue the query with the current window
    pub fn refresh(&self) -> SyncResult<()> {
        self.ensure_navigable("refresh")?;
        self.channels.refresh.send_modify(|n| *n += 1);
        Ok(())
    }

    /// Stop following the URL; no refetch is issued afterwards
    pub fn destroy(&self) {
        if !self.shutdown.is_cancelled() {
            tracing::debug!(query = %self.name, "Paged query destroyed");
            self.shutdown.cancel();
        }
    }

    pub fn paging(&self) -> PagingState {
        *self.channels.paging.borrow()
    }

    pub fn items_snapshot(&self) -> Vec<T> {
        self.channels.items.borrow().clone()
    }

    pub fn total_items_snapshot(&self) -> u64 {
        *self.channels.total_items.borrow()
    }

    /// Current page items, then every new result
    pub fn items(&self) -> BoxStream<'static, Vec<T>> {
        watch_stream(self.channels.items.subscribe())
    }

    pub fn total_items(&self) -> BoxStream<'static, u64> {
        watch_stream(self.channels.total_items.subscribe())
    }

    pub fn current_page(&self) -> BoxStream<'static, u32> {
        watch_distinct(self.channels.paging.subscribe(), |p: &PagingState| p.current_page)
    }

    pub fn items_per_page(&self) -> BoxStream<'static, u32> {
        watch_distinct(self.channels.paging.subscribe(), |p: &PagingState| p.items_per_page)
    }

    /// Refetch and result failures, as reported by the query handle
    pub fn errors(&self) -> broadcast::Receiver<Arc<DataError>> {
        self.channels.errors.subscribe()
    }
}

impl<T> Drop for PagedQuery<T> {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

struct RefetchWorker<T, R, E, V> {
    name: String,
    handle: Arc<dyn QueryHandle<R>>,
    extract_page: E,
    variables: V,
    keys: PagingKeys,
    default_per_page: u32,
    channels: Arc<Channels<T>>,
    inspector: Inspector,
}

impl<T, R, E, V> RefetchWorker<T, R, E, V>
where
    T: Clone + Send + Sync + 'static,
    R: Send + 'static,
    E: Fn(&R) -> PaginatedResponse<T> + Send + Sync + 'static,
    V: Fn(PageWindow) -> Value + Send + Sync + 'static,
{
    async fn run(
        self,
        mut params_rx: watch::Receiver<ParamMap>,
        mut refresh_rx: watch::Receiver<u64>,
        shutdown: CancellationToken,
    ) {
        let mut results = self.handle.results();
        let mut results_open = true;

        let mut paging = self.keys.derive(&params_rx.borrow_and_update(), self.default_per_page);
        let _ = refresh_rx.borrow_and_update();
        self.channels.paging.send_replace(paging);
        self.refetch(paging, "activate").await;

        loop {
            tokio::select! {
                biased;

                _ = shutdown.cancelled() => {
                    tracing::debug!(query = %self.name, "Refetch worker stopped");
                    break;
                }
                changed = params_rx.changed() => {
                    if changed.is_err() {
                        tracing::info!(query = %self.name, "Query params closed, stopping refetch worker");
                        break;
                    }
                    let next = self.keys.derive(&params_rx.borrow_and_update(), self.default_per_page);
                    if next != paging {
                        paging = next;
                        self.channels.paging.send_replace(paging);
                        self.refetch(paging, "navigate").await;
                    }
                }
                changed = refresh_rx.changed() => {
                    if changed.is_err() {
                        break;
                    }
                    let _ = refresh_rx.borrow_and_update();
                    self.refetch(paging, "refresh").await;
                }
                result = results.next(), if results_open => {
                    match result {
                        Some(Ok(response)) => self.publish(&response),
                        Some(Err(e)) => self.report(e),
                        None => {
                            tracing::debug!(query = %self.name, "Query results closed");
                            results_open = false;
                        }
                    }
                }
            }
        }
    }

    async fn refetch(&self, paging: PagingState, reason: &str) {
        let window = paging.window();
        tracing::debug!(
            query = %self.name,
            reason,
            skip = window.skip,
            take = window.take,
            "Refetching page"
        );
        self.inspector.record(INSPECT_SOURCE, reason, || {
            json!({ "query": self.name, "skip": window.skip, "take": window.take })
        });
        if let Err(e) = self.handle.refetch((self.variables)(window)).await {
            self.report(e);
        }
    }

    fn publish(&self, response: &R) {
        let page = (self.extract_page)(response);
        tracing::trace!(query = %self.name, items = page.items.len(), total = page.total_items, "Page received");
        self.inspector.publish_state(&self.name, || {
            json!({ "items": page.items.len(), "totalItems": page.total_items })
        });
        self.channels.total_items.send_replace(page.total_items);
        self.channels.items.send_replace(page.items);
    }

    fn report(&self, error: DataError) {
        tracing::warn!(query = %self.name, error = %error, "Paged query failed");
        let _ = self.channels.errors.send(Arc::new(error));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data_access::MemoryQuery;
    use crate::params::MemoryParamStore;
    use std::sync::Mutex;
    use std::time::Duration;

    /// Server holding 42 items named "item-N"
    fn server() -> Arc<MemoryQuery<Value>> {
        Arc::new(MemoryQuery::new(|vars: &Value| {
            let skip = vars["options"]["skip"].as_u64().unwrap_or(0);
            let take = vars["options"]["take"].as_u64().unwrap_or(0);
            let items: Vec<Value> = (skip..(skip + take).min(42))
                .map(|i| json!(format!("item-{}", i)))
                .collect();
            Ok(json!({ "items": items, "totalItems": 42 }))
        }))
    }

    fn handle(query: &Arc<MemoryQuery<Value>>) -> Arc<dyn QueryHandle<Value>> {
        query.clone()
    }

    fn extract(response: &Value) -> PaginatedResponse<String> {
        serde_json::from_value(response.clone()).unwrap_or_default()
    }

    async fn next_non_empty(items: &mut BoxStream<'static, Vec<String>>) -> Vec<String> {
        tokio::time::timeout(Duration::from_secs(2), async {
            loop {
                let page = items.next().await.unwrap();
                if !page.is_empty() {
                    return page;
                }
            }
        })
        .await
        .unwrap()
    }

    #[tokio::test]
    async fn test_default_window_on_activation() {
        let params = Arc::new(MemoryParamStore::new());
        let paged: PagedQuery<String> = PagedQuery::new("products", params.clone(), &ConsoleConfig::default());
        let query = server();
        let initial = Arc::new(Mutex::new(None));

        let (q, seen) = (handle(&query), initial.clone());
        paged
            .bind(
                move |take, skip| {
                    *seen.lock().unwrap() = Some((take, skip));
                    q
                },
                extract,
            )
            .unwrap();

        query.wait_for_refetches(1).await;
        assert_eq!(*initial.lock().unwrap(), Some((10, 0)));
        assert_eq!(query.refetches()[0], json!({ "options": { "skip": 0, "take": 10 } }));

        let page = next_non_empty(&mut paged.items()).await;
        assert_eq!(page.len(), 10);
        assert_eq!(page[0], "item-0");
        assert_eq!(paged.total_items_snapshot(), 42);
    }

    #[tokio::test]
    async fn test_window_from_url() {
        let params = Arc::new(MemoryParamStore::from_pairs([("page", "3"), ("perPage", "25")]));
        let paged: PagedQuery<String> = PagedQuery::new("products", params.clone(), &ConsoleConfig::default());
        assert_eq!(paged.paging(), PagingState { current_page: 3, items_per_page: 25 });

        let query = server();
        let q = handle(&query);
        paged.bind(move |_, _| q, extract).unwrap();

        query.wait_for_refetches(1).await;
        assert_eq!(query.refetches()[0], json!({ "options": { "skip": 50, "take": 25 } }));
    }

    #[tokio::test]
    async fn test_navigation_goes_through_url() {
        let params = Arc::new(MemoryParamStore::new());
        let paged: PagedQuery<String> = PagedQuery::new("products", params.clone(), &ConsoleConfig::default());
        let query = server();
        let q = handle(&query);
        paged.bind(move |_, _| q, extract).unwrap();
        query.wait_for_refetches(1).await;

        paged.set_page_number(2).unwrap();
        assert_eq!(params.get("page").as_deref(), Some("2"));
        query.wait_for_refetches(2).await;
        assert_eq!(query.refetches()[1], json!({ "options": { "skip": 10, "take": 10 } }));

        paged.set_items_per_page(5).unwrap();
        query.wait_for_refetches(3).await;
        assert_eq!(query.refetches()[2], json!({ "options": { "skip": 5, "take": 5 } }));
        assert_eq!(paged.paging(), PagingState { current_page: 2, items_per_page: 5 });
    }

    #[tokio::test]
    async fn test_refresh_reuses_window() {
        let params = Arc::new(MemoryParamStore::from_pairs([("page", "2")]));
        let paged: PagedQuery<String> = PagedQuery::new("products", params, &ConsoleConfig::default());
        let query = server();
        let q = handle(&query);
        paged.bind(move |_, _| q, extract).unwrap();
        query.wait_for_refetches(1).await;

        paged.refresh().unwrap();
        query.wait_for_refetches(2).await;
        let log = query.refetches();
        assert_eq!(log[0], log[1]);
    }

    #[tokio::test]
    async fn test_unbound_and_double_bind() {
        let params = Arc::new(MemoryParamStore::new());
        let paged: PagedQuery<String> = PagedQuery::new("products", params.clone(), &ConsoleConfig::default());

        assert!(matches!(paged.set_page_number(2), Err(SyncError::QueryNotBound)));
        assert!(matches!(paged.refresh(), Err(SyncError::QueryNotBound)));
        assert!(params.get("page").is_none());

        let query = server();
        let q = handle(&query);
        paged.bind(move |_, _| q, extract).unwrap();
        let again = paged.bind(move |_, _| handle(&query), extract);
        assert!(matches!(again, Err(SyncError::AlreadyBound)));
    }

    #[tokio::test]
    async fn test_destroy_stops_refetching() {
        let params = Arc::new(MemoryParamStore::new());
        let paged: PagedQuery<String> = PagedQuery::new("products", params.clone(), &ConsoleConfig::default());
        let query = server();
        let q = handle(&query);
        paged.bind(move |_, _| q, extract).unwrap();
        query.wait_for_refetches(1).await;

        paged.destroy();
        params.set("page", Some("4".into()));
        tokio::time::sleep(Duration::from_millis(50)).await;

        assert_eq!(query.refetches().len(), 1);
        assert!(matches!(paged.set_page_number(5), Err(SyncError::Destroyed)));
    }

    #[tokio::test]
    async fn test_custom_keys_and_variables() {
        let params = Arc::new(MemoryParamStore::from_pairs([("contentsPage", "2"), ("page", "9")]));
        let paged: PagedQuery<String> = PagedQuery::new("contents", params.clone(), &ConsoleConfig::default())
            .with_keys(PagingKeys::contents())
            .with_default_per_page(20);
        let query = server();
        let q = handle(&query);
        paged
            .bind_with_variables(
                move |_, _| q,
                extract,
                |w: PageWindow| json!({ "id": "7", "options": { "skip": w.skip, "take": w.take } }),
            )
            .unwrap();

        query.wait_for_refetches(1).await;
        assert_eq!(
            query.refetches()[0],
            json!({ "id": "7", "options": { "skip": 20, "take": 20 } })
        );

        // The other list's page param is ignored
        params.set("page", Some("1".into()));
        paged.set_page_number(3).unwrap();
        assert_eq!(params.get("contentsPage").as_deref(), Some("3"));
        query.wait_for_refetches(2).await;
        assert_eq!(query.refetches().len(), 2);
    }

    #[tokio::test]
    async fn test_failures_are_forwarded() {
        let params = Arc::new(MemoryParamStore::new());
        let paged: PagedQuery<String> = PagedQuery::new("products", params, &ConsoleConfig::default());
        let mut errors = paged.errors();
        let query: Arc<MemoryQuery<Value>> =
            Arc::new(MemoryQuery::new(|_: &Value| Err(DataError::network("offline"))));
        let q = handle(&query);
        paged.bind(move |_, _| q, extract).unwrap();

        let error = tokio::time::timeout(Duration::from_secs(2), errors.recv())
            .await
            .unwrap()
            .unwrap();
        assert!(matches!(*error, DataError::Network(_)));
        assert!(paged.items_snapshot().is_empty());
    }
}
