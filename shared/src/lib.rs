//! Shared types for the admin console
//!
//! Data model used by every screen coordinator: translatable entities,
//! custom-field definitions, paging types, permission sets, rearrange
//! commands and the data-access error type.

pub mod error;
pub mod intent;
pub mod models;
pub mod types;

// Re-exports
pub use serde::{Deserialize, Serialize};

pub use error::{DataError, DataResult};
pub use intent::{PageWindow, PaginatedResponse, PagingState};
pub use models::{
    CustomFieldDef, CustomFieldType, FormEditSet, RearrangeCommand, Translatable, Translation,
};
pub use types::LanguageCode;
