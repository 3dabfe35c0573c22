use std::time::Duration;

use crossbeam::channel::Receiver;
use tokio::sync::mpsc;

use crate::actor::fs::FsActor;
use crate::actor::messages::{RebuildMsg, WsMsg};
use crate::actor::rebuild::RebuildActor;
use crate::actor::ws::WsActor;
use crate::build::Bundler;

/// How long actors get to wind down after a shutdown signal.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(3);

/// Run all actors concurrently until a shutdown signal (or an actor exits).
pub(super) async fn run_actors<B: Bundler>(
    fs: FsActor,
    rebuild: RebuildActor<B>,
    ws: WsActor,
    rebuild_tx: mpsc::Sender<RebuildMsg>,
    ws_tx: mpsc::Sender<WsMsg>,
    shutdown_rx: Option<Receiver<()>>,
) {
    let fs_handle = tokio::spawn(async move { fs.run().await });
    let mut rebuild_handle = tokio::spawn(async move { rebuild.run().await });
    let ws_handle = tokio::spawn(async move { ws.run().await });

    match shutdown_rx {
        Some(rx) => loop {
            if rx.try_recv().is_ok() {
                crate::debug!("actor"; "shutdown signal received");
                break;
            }
            if rebuild_handle.is_finished() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(100)).await;
        },
        None => {
            let _ = (&mut rebuild_handle).await;
        }
    }

    // Stopping the rebuild actor kills the backend. A cycle in flight is
    // allowed to finish first, within the grace period.
    // A full queue means the actor is stuck; the abort below covers that.
    let _ = rebuild_tx.try_send(RebuildMsg::Shutdown);
    let _ = ws_tx.try_send(WsMsg::Shutdown);
    if tokio::time::timeout(SHUTDOWN_GRACE, &mut rebuild_handle)
        .await
        .is_err()
    {
        crate::debug!("actor"; "rebuild cycle still running, abandoning it");
        rebuild_handle.abort();
    }
    let _ = tokio::time::timeout(Duration::from_millis(500), ws_handle).await;
    fs_handle.abort();
}
