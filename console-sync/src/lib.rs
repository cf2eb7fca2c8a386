//! Console Sync - entity synchronization core for admin console screens
//!
//! Screen-independent coordinators that keep list and detail screens in sync
//! with the URL and the data-access layer:
//!
//! - [`PagedQuery`]: URL paging → query refetch → items / total
//! - [`EntityRouteResolver`]: route id → live entity stream
//! - [`DetailViewModel`]: entity + language → form population, save
//! - [`merge()`]: form edits → translatable entity snapshot
//! - [`tree`] / [`rearrange`]: hierarchy indexing and reorder commands

pub mod catalog;
pub mod config;
pub mod data_access;
pub mod detail;
pub mod error;
pub mod inspector;
pub mod logger;
pub mod merge;
pub mod paged_query;
pub mod params;
pub mod rearrange;
pub mod resolver;
pub mod settings;
pub mod stream;
pub mod tree;

pub use catalog::{CatalogError, TranslationCatalog};
pub use config::ConsoleConfig;
pub use data_access::{
    EntitySource, MemoryEntityStore, MemoryQuery, Mutator, QueryHandle, source_fn,
};
pub use detail::DetailViewModel;
pub use error::{RearrangeError, ResolveError, SyncError, SyncResult};
pub use inspector::{InspectEvent, Inspector};
pub use merge::merge;
pub use paged_query::{PagedQuery, PagingKeys};
pub use params::{MemoryParamStore, ParamMap, QueryParamStore};
pub use rearrange::{DropContainer, RearrangeEvents, drop_into, move_down, move_to, move_up};
pub use resolver::{CREATE_ROUTE_ID, EntityRouteResolver, ResolvedEntity, empty_translatable};
pub use settings::{ServerConfig, ServerSettings};
pub use tree::{MoveTarget, RootNode, TreeNode, TreeRecord, list_move_targets, to_tree, to_tree_with_state};

// Re-export shared types for convenience
pub use shared::{
    CustomFieldDef, CustomFieldType, DataError, FormEditSet, LanguageCode, PaginatedResponse,
    RearrangeCommand, Translatable, Translation,
};
