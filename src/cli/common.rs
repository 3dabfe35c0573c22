//! Common utilities shared across CLI commands.

use anyhow::{Context, Result};
use tokio::runtime::Runtime;

use crate::config::ProjectConfig;
use crate::utils::exec::warn_if_missing;

/// Multi-threaded runtime for bundler and toolchain subprocesses.
pub fn build_runtime() -> Result<Runtime> {
    tokio::runtime::Builder::new_multi_thread()
        .worker_threads(2)
        .enable_all()
        .build()
        .context("failed to create tokio runtime")
}

/// Warn early about external programs that are not on `PATH`.
///
/// Commands are still attempted; each failing cycle reports its own error.
pub fn check_tools(config: &ProjectConfig) {
    if let Some(bundler) = config.frontend.bundler.first() {
        warn_if_missing(bundler, "page builds");
    }
    if let Some(build) = config.backend.build.first() {
        warn_if_missing(build, "backend builds");
    }
}
