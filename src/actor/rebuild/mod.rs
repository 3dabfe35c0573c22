//! Rebuild Actor - Serial Rebuild Cycles
//!
//! Receives rebuild requests from the FsActor and runs them one at a time:
//!
//! ```text
//! FrontendOnly: build changed page(s) ─────────────────────────────▶ Update
//! Full:         scan → build all → prune → emit → relaunch → settle ─▶ Update
//! ```
//!
//! Requests that queue up while a cycle is running are merged into the next
//! cycle, so a burst of accepted changes costs at most one extra cycle.

mod cycle;


use std::sync::Arc;

use thiserror::Error;
use tokio::sync::mpsc;

use super::messages::{RebuildMsg, Trigger, WsMsg};
use crate::build::{Bundler, NodeBundler, PageBuilder};
use crate::config::ProjectConfig;
use crate::core::RebuildScope;
use crate::emit::{EmitError, GoEmitter};
use crate::page::{Page, ScanError};
use crate::process::{ProcessError, Supervisor};

/// Builds the bundler for the current configuration.
type BundlerFactory<B> = Box<dyn Fn(&ProjectConfig) -> B + Send + Sync>;

/// Why a cycle stopped before notifying browsers.
#[derive(Debug, Error)]
pub(super) enum CycleError {
    #[error("failed to reload config: {0:#}")]
    Config(anyhow::Error),

    #[error(transparent)]
    Scan(#[from] ScanError),

    #[error("{failed} of {total} pages failed to build")]
    Pages {
        failed: usize,
        total: usize,
        detail: String,
    },

    #[error(transparent)]
    Emit(#[from] EmitError),

    #[error(transparent)]
    Process(#[from] ProcessError),
}

impl CycleError {
    /// Extra lines shown under the status summary.
    fn detail(&self) -> &str {
        match self {
            Self::Pages { detail, .. } => detail,
            _ => "",
        }
    }
}

/// Rebuild requests merged into one cycle.
#[derive(Debug)]
pub(super) struct Pending {
    pub(super) scope: RebuildScope,
    /// Changes behind the request; empty for the startup build.
    pub(super) triggers: Vec<Trigger>,
}

impl Pending {
    pub(super) fn new(scope: RebuildScope, trigger: Option<Trigger>) -> Self {
        Self {
            scope,
            triggers: trigger.into_iter().collect(),
        }
    }

    /// Fold another request in, keeping the wider scope.
    pub(super) fn merge(&mut self, scope: RebuildScope, trigger: Option<Trigger>) {
        if scope.is_full() {
            self.scope = RebuildScope::Full;
        }
        self.triggers.extend(trigger);
    }
}

/// Rebuild Actor - owns the page set, the emitter and the backend process
pub struct RebuildActor<B: Bundler> {
    rx: mpsc::Receiver<RebuildMsg>,
    ws_tx: mpsc::Sender<WsMsg>,
    config: Arc<ProjectConfig>,
    make_bundler: BundlerFactory<B>,
    builder: PageBuilder<B>,
    emitter: GoEmitter,
    supervisor: Supervisor,
    /// Pages as of the last full scan, with style fields from their last build
    pages: Vec<Page>,
    /// Port the reload server bound, baked into generated source
    reload_port: u16,
}

impl RebuildActor<NodeBundler> {
    pub fn new(
        rx: mpsc::Receiver<RebuildMsg>,
        ws_tx: mpsc::Sender<WsMsg>,
        config: Arc<ProjectConfig>,
        reload_port: u16,
    ) -> Self {
        Self::with_bundler(rx, ws_tx, config, reload_port, NodeBundler::from_config)
    }
}

impl<B: Bundler> RebuildActor<B> {
    pub fn with_bundler<F>(
        rx: mpsc::Receiver<RebuildMsg>,
        ws_tx: mpsc::Sender<WsMsg>,
        config: Arc<ProjectConfig>,
        reload_port: u16,
        make_bundler: F,
    ) -> Self
    where
        F: Fn(&ProjectConfig) -> B + Send + Sync + 'static,
    {
        Self {
            rx,
            ws_tx,
            builder: PageBuilder::new(make_bundler(&config)),
            emitter: GoEmitter::from_config(&config).with_reload_port(reload_port),
            supervisor: Supervisor::from_config(&config),
            make_bundler: Box::new(make_bundler),
            config,
            pages: Vec::new(),
            reload_port,
        }
    }

    /// Run the actor event loop
    pub async fn run(mut self) {
        while let Some(msg) = self.rx.recv().await {
            let RebuildMsg::Rebuild { scope, trigger } = msg else {
                break;
            };

            let mut pending = Pending::new(scope, trigger);
            let mut shutdown = false;
            while let Ok(next) = self.rx.try_recv() {
                match next {
                    RebuildMsg::Rebuild { scope, trigger } => pending.merge(scope, trigger),
                    RebuildMsg::Shutdown => {
                        shutdown = true;
                        break;
                    }
                }
            }
            if shutdown {
                break;
            }

            self.cycle(pending).await;
        }

        self.supervisor.stop().await;
        crate::debug!("rebuild"; "stopped");
    }

    /// Tell connected browsers to reload.
    async fn notify(&self) {
        let _ = self.ws_tx.send(WsMsg::Update).await;
    }
}
