//! Core types - pure abstractions shared across the codebase.

mod scope;
mod state;

pub use scope::RebuildScope;
pub use state::{is_shutdown, register_shutdown, setup_shutdown_handler};
