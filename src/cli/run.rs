//! `wap run`: the development loop.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;

use super::common::{build_runtime, check_tools};
use crate::actor::Coordinator;
use crate::config::ProjectConfig;
use crate::core::register_shutdown;

/// Run until Ctrl+C. The backend process is killed on the way out.
pub fn run_dev(config: Arc<ProjectConfig>) -> Result<()> {
    check_tools(&config);

    let (shutdown_tx, shutdown_rx) = crossbeam::channel::unbounded();
    register_shutdown(shutdown_tx);

    let rt = build_runtime()?;
    let result = rt.block_on(
        Coordinator::with_config(config)
            .with_shutdown_signal(shutdown_rx)
            .run(),
    );
    // Blocking handshakes must not hold up exit.
    rt.shutdown_timeout(Duration::from_secs(1));
    result
}
