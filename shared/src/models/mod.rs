//! Data models
//!
//! Shared between every screen coordinator and the data-access layer.
//! Entity ids are strings; the empty string marks a not-yet-persisted draft.

pub mod custom_field;
pub mod form;
pub mod permission;
pub mod rearrange;
pub mod translatable;

// Re-exports
pub use custom_field::*;
pub use form::*;
pub use permission::*;
pub use rearrange::*;
pub use translatable::*;
