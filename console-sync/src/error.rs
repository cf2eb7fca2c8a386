//! Console sync error types

use shared::DataError;
use thiserror::Error;

/// Coordinator error type
#[derive(Debug, Error)]
pub enum SyncError {
    /// A navigation method was called before `bind` supplied the query
    #[error("Query function not bound: call bind() before navigating")]
    QueryNotBound,

    #[error("Query function already bound")]
    AlreadyBound,

    /// The owning screen already destroyed this coordinator
    #[error("Coordinator destroyed")]
    Destroyed,

    /// Detail view has no entity yet
    #[error("Entity not loaded")]
    EntityNotLoaded,

    /// Data-access failure, surfaced unchanged
    #[error("Data error: {0}")]
    Data(#[from] DataError),

    #[error("Resolve error: {0}")]
    Resolve(#[from] ResolveError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Route resolution error
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResolveError {
    /// Route carried no id parameter
    #[error("Route has no id parameter")]
    MissingRouteId,

    /// Entity stream ended (or timed out) without producing an entity
    #[error("Entity {id} not found")]
    NotFound { id: String },
}

/// Tree rearrange error
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RearrangeError {
    /// Drop container has no id (root without a server-side id)
    #[error("Could not determine the id of the drop target")]
    UnknownDropTarget,

    /// Dragged node is not part of the tree
    #[error("Entity {0} is not in the tree")]
    UnknownEntity(String),

    /// Drop container is the dragged node or one of its descendants
    #[error("Cannot move a node into its own subtree (target {0})")]
    InvalidDropTarget(String),
}

/// Result type for coordinator operations
pub type SyncResult<T> = Result<T, SyncError>;
