//! `[frontend]` section configuration.
//!
//! # Example
//!
//! ```toml
//! [frontend]
//! dir = "frontend"                  # Everything here is frontend-only
//! routes = "frontend/src/routes"    # One page per file
//! bundler = ["node"]                # Invoked with the generated build script
//! build_timeout = 60                # Seconds per page (omit = wait forever)
//! ```

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Frontend tree and bundler settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FrontendConfig {
    /// Frontend source tree. Changes below it never restart the backend.
    pub dir: PathBuf,

    /// Route tree scanned for pages.
    pub routes: PathBuf,

    /// Bundler command; the generated build script path is appended.
    pub bundler: Vec<String>,

    /// Per-page build time limit in seconds.
    pub build_timeout: Option<u64>,
}

impl FrontendConfig {
    pub fn build_timeout(&self) -> Option<Duration> {
        self.build_timeout.map(Duration::from_secs)
    }
}

impl Default for FrontendConfig {
    fn default() -> Self {
        Self {
            dir: "frontend".into(),
            routes: "frontend/src/routes".into(),
            bundler: vec!["node".into()],
            build_timeout: None,
        }
    }
}
