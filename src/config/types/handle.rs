//! Global config with atomic reload support.
//!
//! Uses `arc-swap` for lock-free reads and atomic config replacement.
//! This enables hot-reloading of `wap.toml` during `wap run`.

use crate::config::ProjectConfig;
use anyhow::{Result, bail};
use arc_swap::ArcSwap;
use rustc_hash::FxHasher;
use std::hash::Hasher;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, LazyLock};

/// Global config storage.
pub static CONFIG: LazyLock<ArcSwap<ProjectConfig>> =
    LazyLock::new(|| ArcSwap::from_pointee(ProjectConfig::default()));

/// Hash of the config file content currently loaded.
static CONFIG_HASH: AtomicU64 = AtomicU64::new(0);

fn content_hash(content: &str) -> u64 {
    let mut hasher = FxHasher::default();
    hasher.write(content.as_bytes());
    hasher.finish()
}

#[inline]
pub fn cfg() -> Arc<ProjectConfig> {
    CONFIG.load_full()
}

/// Reload config from disk if content changed.
///
/// Returns `Ok(true)` if config was updated, `Ok(false)` if unchanged.
pub fn reload_config() -> Result<bool> {
    use std::fs;

    let c = cfg();
    let Some(cli) = c.cli else {
        bail!("config reloaded before initialization");
    };

    let content = fs::read_to_string(&c.config_path).unwrap_or_default();
    let new_hash = content_hash(&content);

    if new_hash == CONFIG_HASH.load(Ordering::Relaxed) {
        return Ok(false);
    }

    let new_config = ProjectConfig::load(cli)?;
    CONFIG.store(Arc::new(new_config));
    CONFIG_HASH.store(new_hash, Ordering::Relaxed);

    Ok(true)
}

#[inline]
pub fn init_config(config: ProjectConfig) -> Arc<ProjectConfig> {
    let content = std::fs::read_to_string(&config.config_path).unwrap_or_default();
    CONFIG_HASH.store(content_hash(&content), Ordering::Relaxed);

    let arc = Arc::new(config);
    CONFIG.store(Arc::clone(&arc));
    arc
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_content_hash_changes() {
        assert_eq!(content_hash("[serve]"), content_hash("[serve]"));
        assert_ne!(content_hash("[serve]"), content_hash("[serve]\n"));
    }
}
