//! Query-parameter store
//!
//! The navigable URL's query parameters are the single source of truth for
//! paging (`page`, `perPage`) and the detail language (`lang`). Coordinators
//! never keep their own copy: they write here and react to the change.

use std::collections::BTreeMap;

use tokio::sync::watch;

/// 查询参数 (键 → 值)
pub type ParamMap = BTreeMap<String, String>;

/// 页码参数名
pub const PAGE_PARAM: &str = "page";
/// 每页数量参数名
pub const PER_PAGE_PARAM: &str = "perPage";
/// 详情页语言参数名
pub const LANG_PARAM: &str = "lang";

/// Query-parameter read/write capability owned by the navigation layer
pub trait QueryParamStore: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;

    /// Apply several updates as one navigation; `None` removes the key
    fn set_many(&self, updates: &[(&str, Option<String>)]);

    /// Current parameters followed by every navigation
    fn subscribe(&self) -> watch::Receiver<ParamMap>;

    fn set(&self, key: &str, value: Option<String>) {
        self.set_many(&[(key, value)]);
    }
}

/// In-memory navigation state (one per router outlet)
#[derive(Debug)]
pub struct MemoryParamStore {
    tx: watch::Sender<ParamMap>,
}

impl MemoryParamStore {
    pub fn new() -> Self {
        Self::with_params(ParamMap::new())
    }

    pub fn with_params(params: ParamMap) -> Self {
        let (tx, _) = watch::channel(params);
        Self { tx }
    }

    /// Build from `key=value` pairs (e.g. parsed from a URL)
    pub fn from_pairs<'a, I>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        Self::with_params(
            pairs
                .into_iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        )
    }

    pub fn snapshot(&self) -> ParamMap {
        self.tx.borrow().clone()
    }
}

impl Default for MemoryParamStore {
    fn default() -> Self {
        Self::new()
    }
}

impl QueryParamStore for MemoryParamStore {
    fn get(&self, key: &str) -> Option<String> {
        self.tx.borrow().get(key).cloned()
    }

    fn set_many(&self, updates: &[(&str, Option<String>)]) {
        self.tx.send_if_modified(|params| {
            let mut modified = false;
            for (key, value) in updates {
                let changed = match value {
                    Some(v) => params.insert(key.to_string(), v.clone()).as_ref() != Some(v),
                    None => params.remove(*key).is_some(),
                };
                modified |= changed;
            }
            if modified {
                tracing::debug!(?updates, "Query params updated");
            }
            modified
        });
    }

    fn subscribe(&self) -> watch::Receiver<ParamMap> {
        self.tx.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_and_remove() {
        let store = MemoryParamStore::from_pairs([("page", "2")]);
        assert_eq!(store.get(PAGE_PARAM).as_deref(), Some("2"));

        store.set_many(&[(PAGE_PARAM, None), (PER_PAGE_PARAM, Some("50".into()))]);
        assert_eq!(store.get(PAGE_PARAM), None);
        assert_eq!(store.get(PER_PAGE_PARAM).as_deref(), Some("50"));
    }

    #[tokio::test]
    async fn test_subscribers_only_notified_on_change() {
        let store = MemoryParamStore::new();
        let mut rx = store.subscribe();
        let _ = rx.borrow_and_update();

        store.set(LANG_PARAM, Some("de".into()));
        assert!(rx.has_changed().unwrap());
        let _ = rx.borrow_and_update();

        // Same value again: no navigation
        store.set(LANG_PARAM, Some("de".into()));
        assert!(!rx.has_changed().unwrap());

        store.set(LANG_PARAM, None);
        assert!(rx.has_changed().unwrap());
        assert!(rx.borrow_and_update().get(LANG_PARAM).is_none());
    }
}
