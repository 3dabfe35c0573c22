//! WebSocket Actor - Live Reload Broadcast
//!
//! Owns the connection registry. Accepted TCP streams arrive from the
//! acceptor thread; `Update` requests arrive from the RebuildActor.
//!
//! ```text
//! acceptor --AddClient--> WsActor <--Update-- RebuildActor
//!                            |
//!                            +--"update"--> Clients
//! ```

use std::net::TcpStream;
use std::sync::Arc;

use tokio::sync::mpsc;

use super::messages::WsMsg;
use crate::reload::{ConnectionRegistry, WsConnection};

/// WebSocket Actor - manages client connections and broadcasts
pub struct WsActor {
    /// Channel to receive messages
    rx: mpsc::Receiver<WsMsg>,
    /// Connected clients (shared with per-client reader threads)
    registry: Arc<ConnectionRegistry<WsConnection>>,
}

impl WsActor {
    pub fn new(rx: mpsc::Receiver<WsMsg>) -> Self {
        Self {
            rx,
            registry: ConnectionRegistry::new(),
        }
    }

    /// Run the actor event loop
    pub async fn run(mut self) {
        while let Some(msg) = self.rx.recv().await {
            match msg {
                WsMsg::AddClient(stream) => self.add_client(stream),
                WsMsg::Update => {
                    let delivered = self.registry.notify_all();
                    if delivered > 0 {
                        crate::debug!("reload"; "reloaded {} clients", delivered);
                    }
                }
                WsMsg::Shutdown => {
                    crate::debug!("ws"; "shutdown");
                    self.registry.close_all();
                    break;
                }
            }
        }
    }

    /// Handshake off the actor task, then register.
    ///
    /// A browser that stalls mid-handshake only blocks its own blocking task.
    fn add_client(&self, stream: TcpStream) {
        let registry = Arc::clone(&self.registry);
        tokio::task::spawn_blocking(move || match WsConnection::accept(stream) {
            Ok(connection) => {
                let id = registry.register(connection);
                crate::debug!("reload"; "client {} connected ({} total)", id, registry.len());
            }
            Err(e) => crate::debug!("reload"; "{:#}", e),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::TcpListener;
    use std::time::Duration;

    use tungstenite::Message;

    /// Accepted server-side stream plus the client's handshake thread.
    fn connect_client(
        listener: &TcpListener,
    ) -> (
        TcpStream,
        std::thread::JoinHandle<tungstenite::WebSocket<tungstenite::stream::MaybeTlsStream<TcpStream>>>,
    ) {
        let port = listener.local_addr().unwrap().port();
        let client = std::thread::spawn(move || {
            let (ws, _) = tungstenite::connect(format!("ws://127.0.0.1:{port}")).unwrap();
            ws
        });
        let (stream, _) = listener.accept().unwrap();
        (stream, client)
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_update_reaches_client() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let (tx, rx) = mpsc::channel(8);
        let actor = WsActor::new(rx);
        let registry = Arc::clone(&actor.registry);
        let handle = tokio::spawn(actor.run());

        let (stream, client) = connect_client(&listener);
        tx.send(WsMsg::AddClient(stream)).await.unwrap();
        let mut ws = tokio::task::spawn_blocking(move || client.join().unwrap())
            .await
            .unwrap();

        // Registration happens after the handshake completes
        for _ in 0..50 {
            if registry.len() == 1 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        assert_eq!(registry.len(), 1);

        tx.send(WsMsg::Update).await.unwrap();
        let message = tokio::task::spawn_blocking(move || ws.read().unwrap())
            .await
            .unwrap();
        assert_eq!(message, Message::Text("update".into()));

        tx.send(WsMsg::Shutdown).await.unwrap();
        handle.await.unwrap();
        assert!(registry.is_empty());
    }

    #[tokio::test]
    async fn test_update_without_clients() {
        let (tx, rx) = mpsc::channel(8);
        let handle = tokio::spawn(WsActor::new(rx).run());

        tx.send(WsMsg::Update).await.unwrap();
        tx.send(WsMsg::Shutdown).await.unwrap();
        handle.await.unwrap();
    }
}
