//! Path utilities.
//!
//! Pure functions for path manipulation. No side effects.
//!
//! - [`fs`]: Filesystem path normalization and hidden-path detection

pub mod fs;

pub use fs::{is_hidden, normalize_path};
