//! Actor Coordinator - Wires up the Development Loop
//!
//! The Coordinator is a thin orchestrator that:
//! - Creates communication channels
//! - Binds the live reload port
//! - Wires up actors and queues the startup build
//! - Runs them until shutdown

mod runtime;

use std::sync::Arc;

use anyhow::{Context, Result};
use crossbeam::channel::Receiver;
use tokio::sync::mpsc;

use super::fs::FsActor;
use super::messages::{RebuildMsg, WsMsg};
use super::rebuild::RebuildActor;
use super::ws::WsActor;
use crate::config::ProjectConfig;
use crate::core::RebuildScope;
use crate::page::{PageLayout, scan_routes};
use crate::reload::start_acceptor;

const CHANNEL_BUFFER: usize = 32;

/// Coordinator - wires up and runs the actor system.
pub struct Coordinator {
    config: Arc<ProjectConfig>,
    shutdown_rx: Option<Receiver<()>>,
}

impl Coordinator {
    pub fn with_config(config: Arc<ProjectConfig>) -> Self {
        Self {
            config,
            shutdown_rx: None,
        }
    }

    /// Set shutdown signal receiver.
    pub fn with_shutdown_signal(mut self, rx: Receiver<()>) -> Self {
        self.shutdown_rx = Some(rx);
        self
    }

    /// Run the actor system.
    ///
    /// A missing route tree fails here, before anything is started. Once
    /// running, failures only end the current rebuild cycle.
    pub async fn run(mut self) -> Result<()> {
        let layout = PageLayout::from_config(&self.config);
        let pages = scan_routes(&self.config.frontend.routes, &layout)?;
        crate::log!(
            "run";
            "found {} routes in {}",
            pages.len(),
            self.config.root_relative(&self.config.frontend.routes).display()
        );

        let (rebuild_tx, rebuild_rx) = mpsc::channel::<RebuildMsg>(CHANNEL_BUFFER);
        let (ws_tx, ws_rx) = mpsc::channel::<WsMsg>(CHANNEL_BUFFER);

        let reload_port = start_acceptor(self.config.serve.reload_port, ws_tx.clone())
            .context("failed to start live reload server")?;
        crate::log!("reload"; "listening on ws://127.0.0.1:{}", reload_port);

        // Watcher first: edits made during the startup build are queued.
        let fs_actor = FsActor::new(rebuild_tx.clone())
            .map_err(|e| anyhow::anyhow!("watcher failed: {}", e))?;
        let rebuild_actor =
            RebuildActor::new(rebuild_rx, ws_tx.clone(), Arc::clone(&self.config), reload_port);
        let ws_actor = WsActor::new(ws_rx);

        rebuild_tx
            .send(RebuildMsg::Rebuild {
                scope: RebuildScope::Full,
                trigger: None,
            })
            .await
            .context("rebuild actor stopped before the startup build")?;

        crate::debug!("actor"; "start");
        let shutdown_rx = self.shutdown_rx.take();
        runtime::run_actors(fs_actor, rebuild_actor, ws_actor, rebuild_tx, ws_tx, shutdown_rx)
            .await;

        crate::debug!("actor"; "stopped");
        Ok(())
    }
}
