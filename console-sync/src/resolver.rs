//! Route → entity resolution for detail screens
//!
//! - `create` route id: a fresh empty entity, `is_new = true`, never updated
//! - any other id: waits for the first non-empty value from the data source,
//!   then follows every later non-empty value
//!
//! The detail screen only activates once resolution succeeds.

use std::sync::Arc;
use std::time::Duration;

use futures::StreamExt;
use futures::stream::{self, BoxStream};
use shared::Translatable;

use crate::config::ConsoleConfig;
use crate::data_access::EntitySource;
use crate::error::ResolveError;
use crate::inspector::Inspector;

/// Route id for the create screen
pub const CREATE_ROUTE_ID: &str = "create";

/// Resolution result handed to the detail screen
pub struct ResolvedEntity<T> {
    pub is_new: bool,
    /// Route id, `None` for the create screen
    pub id: Option<String>,
    /// Live entity; the first item is available immediately
    pub stream: BoxStream<'static, T>,
}

impl<T> std::fmt::Debug for ResolvedEntity<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResolvedEntity")
            .field("is_new", &self.is_new)
            .field("id", &self.id)
            .finish_non_exhaustive()
    }
}

/// 实体路由解析器
pub struct EntityRouteResolver<T> {
    empty: T,
    source: Arc<dyn EntitySource<T>>,
    timeout: Option<Duration>,
    inspector: Inspector,
}

impl<T: Clone + Send + 'static> EntityRouteResolver<T> {
    /// `empty` is the entity handed to the create screen
    pub fn new(empty: T, source: Arc<dyn EntitySource<T>>) -> Self {
        Self {
            empty,
            source,
            timeout: None,
            inspector: Inspector::disabled(),
        }
    }

    /// Treat an entity that has not appeared within `timeout` as missing
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn with_config(mut self, config: &ConsoleConfig) -> Self {
        self.timeout = config.resolve_timeout;
        self
    }

    pub fn with_inspector(mut self, inspector: Inspector) -> Self {
        self.inspector = inspector;
        self
    }

    pub async fn resolve(&self, route_id: Option<&str>) -> Result<ResolvedEntity<T>, ResolveError> {
        let id = route_id.ok_or(ResolveError::MissingRouteId)?;

        if id == CREATE_ROUTE_ID {
            tracing::debug!("Resolved create route");
            self.inspector.record("resolver", "create", || serde_json::Value::Null);
            let stream = stream::once(futures::future::ready(self.empty.clone()))
                .chain(stream::pending())
                .boxed();
            return Ok(ResolvedEntity {
                is_new: true,
                id: None,
                stream,
            });
        }

        let mut values = self.source.fetch_by_id(id);
        let first = async {
            while let Some(value) = values.next().await {
                if let Some(entity) = value {
                    return Some(entity);
                }
            }
            None
        };

        let first = match self.timeout {
            Some(limit) => tokio::time::timeout(limit, first).await.ok().flatten(),
            None => first.await,
        };

        let Some(first) = first else {
            tracing::warn!(id, "Entity not found");
            self.inspector
                .record("resolver", "not_found", || serde_json::json!({ "id": id }));
            return Err(ResolveError::NotFound { id: id.to_string() });
        };

        tracing::debug!(id, "Entity resolved");
        self.inspector
            .record("resolver", "resolved", || serde_json::json!({ "id": id }));
        let rest = values.filter_map(futures::future::ready);
        Ok(ResolvedEntity {
            is_new: false,
            id: Some(id.to_string()),
            stream: stream::once(futures::future::ready(first)).chain(rest).boxed(),
        })
    }
}

/// Empty translatable draft for create screens
///
/// Carries no translation, so saving builds one from the caller's default
/// translation skeleton.
pub fn empty_translatable() -> Translatable {
    Translatable::draft()
}
