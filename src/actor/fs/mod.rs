//! FileSystem Actor
//!
//! Watches the project tree and sends rebuild requests to the RebuildActor.
//! Implements the "Watcher-First" pattern: the watcher is attached before the
//! startup build, so edits made during that build are not lost.
//!
//! Architecture:
//! ```text
//! Watcher → ignore filter → Debouncer (timing) → Classifier (scope) → RebuildMsg
//! ```

use std::time::Instant;

use notify::RecommendedWatcher;
use tokio::sync::mpsc;

use super::messages::{ChangeKind, RebuildMsg, Trigger};
use crate::config::{ProjectConfig, cfg};

// Pure classification (change -> rebuild scope).
mod classifier;
// Pure timing.
mod debouncer;
// Shared fs event types.
mod types;
// Per-directory watch registrations.
mod watch_roots;


use classifier::{classify_all, is_ignored};
use debouncer::Debouncer;
use types::{FsChange, changes_from_event};
use watch_roots::WatchSet;

/// FileSystem Actor - watches for file changes
pub struct FsActor {
    /// Channel to receive notify events (sync -> async bridge)
    notify_rx: std::sync::mpsc::Receiver<notify::Result<notify::Event>>,
    /// Watcher handle (must be kept alive)
    watcher: RecommendedWatcher,
    watch_set: WatchSet,
    /// Channel to send messages to RebuildActor
    rebuild_tx: mpsc::Sender<RebuildMsg>,
    pipeline: EventPipeline,
}

impl FsActor {
    /// Create a new FsActor with Watcher-First pattern
    ///
    /// The watcher starts immediately, buffering events while the caller
    /// performs the startup build.
    pub fn new(rebuild_tx: mpsc::Sender<RebuildMsg>) -> notify::Result<Self> {
        let config = cfg();

        // Create sync channel for notify (it doesn't support async)
        let (notify_tx, notify_rx) = std::sync::mpsc::channel();
        let mut watcher = notify::recommended_watcher(move |res| {
            let _ = notify_tx.send(res);
        })?;

        let mut watch_set = WatchSet::new();
        watch_set.add_tree(&mut watcher, config.get_root(), &config);
        crate::log!("watch"; "watching {} directories", watch_set.len());

        Ok(Self {
            notify_rx,
            watcher,
            watch_set,
            rebuild_tx,
            pipeline: EventPipeline::new(&config),
        })
    }

    /// Run the actor event loop
    pub async fn run(self) {
        let Self {
            notify_rx,
            mut watcher,
            mut watch_set,
            rebuild_tx,
            mut pipeline,
        } = self;

        let (async_tx, mut async_rx) = mpsc::channel::<(Instant, notify::Event)>(256);

        // Stamp events on arrival so debouncing reflects when they happened,
        // not when this loop got around to them.
        std::thread::spawn(move || {
            while let Ok(result) = notify_rx.recv() {
                match result {
                    Ok(event) => {
                        if async_tx.blocking_send((Instant::now(), event)).is_err() {
                            break; // Receiver dropped
                        }
                    }
                    Err(e) => crate::log!("watch"; "notify error: {}", e),
                }
            }
        });

        while let Some((at, event)) = async_rx.recv().await {
            // Picks up `wap.toml` reloads done by the RebuildActor.
            let config = cfg();

            let changes = relevant_changes(&event, &config);
            if changes.is_empty() {
                continue;
            }

            for change in &changes {
                match change.kind {
                    ChangeKind::Created if change.path.is_dir() => {
                        let added = watch_set.add_tree(&mut watcher, &change.path, &config);
                        crate::debug!("watch"; "added {} new directories", added);
                    }
                    ChangeKind::Removed => watch_set.forget(&change.path),
                    _ => {}
                }
            }

            let Some(msg) = pipeline.process(at, &changes, &config) else {
                continue;
            };
            if rebuild_tx.send(msg).await.is_err() {
                break; // RebuildActor shut down
            }
        }
    }
}

/// Path-level changes of `event` that may matter to a rebuild.
fn relevant_changes(event: &notify::Event, config: &ProjectConfig) -> Vec<FsChange> {
    let mut changes = changes_from_event(event);
    changes.retain(|c| !is_ignored(&c.path, config));
    changes
}

/// Debounce then classify the relevant changes of one event.
struct EventPipeline {
    debouncer: Debouncer,
}

impl EventPipeline {
    fn new(config: &ProjectConfig) -> Self {
        Self {
            debouncer: Debouncer::new(config.serve.debounce()),
        }
    }

    fn process(
        &mut self,
        at: Instant,
        changes: &[FsChange],
        config: &ProjectConfig,
    ) -> Option<RebuildMsg> {
        self.debouncer.set_window(config.serve.debounce());
        if !self.debouncer.accept_at(at) {
            for change in changes {
                crate::debug!("watch"; "debounced {}: {}", change.kind.label(), change.path.display());
            }
            return None;
        }

        let Some((scope, change)) = classify_all(changes, config) else {
            crate::debug!("watch"; "no rebuild needed");
            return None;
        };

        crate::debug!(
            "watch";
            "{} {} -> {} rebuild",
            change.kind.label(),
            config.root_relative(&change.path).display(),
            scope
        );
        Some(RebuildMsg::Rebuild {
            scope,
            trigger: Some(Trigger {
                path: change.path.clone(),
                kind: change.kind,
            }),
        })
    }
}
