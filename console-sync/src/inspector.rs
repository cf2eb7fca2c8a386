//! Debug inspector
//!
//! Opt-in diagnostic surface: coordinators record their actions here and
//! publish a state snapshot under their own name. Developers read the
//! history, subscribe to live events, or dump the snapshot.
//!
//! Disabled inspectors are no-ops; payload closures are never evaluated.

use std::collections::{BTreeMap, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use tokio::sync::broadcast;

use crate::config::ConsoleConfig;

/// 默认保留的事件数量
pub const DEFAULT_HISTORY: usize = 256;

/// 检查事件
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InspectEvent {
    pub seq: u64,
    pub at: DateTime<Utc>,
    /// Emitting coordinator (e.g. "paged_query")
    pub source: String,
    pub action: String,
    pub payload: Value,
}

struct Inner {
    tx: broadcast::Sender<InspectEvent>,
    seq: AtomicU64,
    capacity: usize,
    history: Mutex<VecDeque<InspectEvent>>,
    snapshot: Mutex<BTreeMap<String, Value>>,
}

/// Cheaply cloneable handle; all clones share one event log
#[derive(Clone, Default)]
pub struct Inspector {
    inner: Option<Arc<Inner>>,
}

impl std::fmt::Debug for Inspector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Inspector")
            .field("enabled", &self.is_enabled())
            .finish()
    }
}

impl Inspector {
    pub fn disabled() -> Self {
        Self { inner: None }
    }

    pub fn enabled(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        let (tx, _) = broadcast::channel(capacity);
        Self {
            inner: Some(Arc::new(Inner {
                tx,
                seq: AtomicU64::new(0),
                capacity,
                history: Mutex::new(VecDeque::with_capacity(capacity)),
                snapshot: Mutex::new(BTreeMap::new()),
            })),
        }
    }

    pub fn from_config(config: &ConsoleConfig) -> Self {
        if config.debug_inspector {
            tracing::info!("Debug inspector enabled");
            Self::enabled(DEFAULT_HISTORY)
        } else {
            Self::disabled()
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.inner.is_some()
    }

    /// Record an action
    pub fn record<F>(&self, source: &str, action: &str, payload: F)
    where
        F: FnOnce() -> Value,
    {
        let Some(inner) = &self.inner else {
            return;
        };
        let event = InspectEvent {
            seq: inner.seq.fetch_add(1, Ordering::Relaxed),
            at: Utc::now(),
            source: source.to_string(),
            action: action.to_string(),
            payload: payload(),
        };
        if let Ok(mut history) = inner.history.lock() {
            if history.len() == inner.capacity {
                history.pop_front();
            }
            history.push_back(event.clone());
        }
        // No live subscribers is fine
        let _ = inner.tx.send(event);
    }

    /// Replace the state snapshot published under `source`
    pub fn publish_state<F>(&self, source: &str, state: F)
    where
        F: FnOnce() -> Value,
    {
        if let Some(inner) = &self.inner
            && let Ok(mut snapshot) = inner.snapshot.lock()
        {
            snapshot.insert(source.to_string(), state());
        }
    }

    /// Current state of every coordinator, keyed by source
    pub fn snapshot(&self) -> BTreeMap<String, Value> {
        self.inner
            .as_ref()
            .and_then(|inner| inner.snapshot.lock().ok().map(|s| s.clone()))
            .unwrap_or_default()
    }

    /// Retained events, oldest first
    pub fn history(&self) -> Vec<InspectEvent> {
        self.inner
            .as_ref()
            .and_then(|inner| inner.history.lock().ok().map(|h| h.iter().cloned().collect()))
            .unwrap_or_default()
    }

    /// Live events; `None` when disabled
    pub fn subscribe(&self) -> Option<broadcast::Receiver<InspectEvent>> {
        self.inner.as_ref().map(|inner| inner.tx.subscribe())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_disabled_is_noop() {
        let inspector = Inspector::disabled();
        inspector.record("test", "never", || panic!("payload must not be built"));
        inspector.publish_state("test", || panic!("state must not be built"));
        assert!(inspector.history().is_empty());
        assert!(inspector.snapshot().is_empty());
        assert!(inspector.subscribe().is_none());
    }

    #[test]
    fn test_history_is_bounded() {
        let inspector = Inspector::enabled(2);
        for i in 0..3 {
            inspector.record("paged_query", "refetch", || json!({ "n": i }));
        }
        let history = inspector.history();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].payload, json!({ "n": 1 }));
        assert_eq!(history[1].seq, 2);
    }

    #[tokio::test]
    async fn test_live_events_and_snapshot() {
        let inspector = Inspector::from_config(&ConsoleConfig::default().with_debug_inspector(true));
        let mut rx = inspector.subscribe().unwrap();

        let clone = inspector.clone();
        clone.record("detail", "populate", || json!({ "lang": "en" }));
        clone.publish_state("detail", || json!({ "isNew": false }));

        let event = rx.recv().await.unwrap();
        assert_eq!(event.source, "detail");
        assert_eq!(event.action, "populate");
        assert_eq!(inspector.snapshot()["detail"], json!({ "isNew": false }));
    }
}
