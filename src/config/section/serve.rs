//! `[serve]` section configuration.
//!
//! Settings for `wap run`.
//!
//! # Example
//!
//! ```toml
//! [serve]
//! reload_port = 8081   # Live reload WebSocket port (next free port if taken)
//! debounce_ms = 1000   # Events closer than this to the last accepted one are dropped
//! settle_ms = 500      # Wait after a backend restart before telling browsers
//! ```

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Development loop settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServeConfig {
    pub reload_port: u16,
    pub debounce_ms: u64,
    pub settle_ms: u64,
}

impl ServeConfig {
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    pub fn settle(&self) -> Duration {
        Duration::from_millis(self.settle_ms)
    }
}

impl Default for ServeConfig {
    fn default() -> Self {
        Self {
            reload_port: 8081,
            debounce_ms: 1000,
            settle_ms: 500,
        }
    }
}
