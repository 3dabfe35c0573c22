//! WebSocket-backed connection.

use std::io::ErrorKind;
use std::net::TcpStream;
use std::time::Duration;

use anyhow::{Context, Result};
use parking_lot::Mutex;
use tungstenite::WebSocket;
use tungstenite::protocol::Message;

use super::registry::{BroadcastSendError, Connection, Inbound};

/// How long a reader holds the socket waiting for input.
const READ_POLL: Duration = Duration::from_millis(100);

/// A browser connected over WebSocket.
///
/// Reads and writes share one socket, so the reader polls with a short
/// timeout and releases the lock between polls.
pub struct WsConnection {
    ws: Mutex<WebSocket<TcpStream>>,
}

impl WsConnection {
    /// Perform the server handshake on a freshly accepted stream.
    pub fn accept(stream: TcpStream) -> Result<Self> {
        let ws = tungstenite::accept(stream)
            .map_err(|e| anyhow::anyhow!("{e}"))
            .context("websocket handshake failed")?;
        ws.get_ref()
            .set_read_timeout(Some(READ_POLL))
            .context("failed to set read timeout")?;
        Ok(Self { ws: Mutex::new(ws) })
    }
}

impl Connection for WsConnection {
    fn send(&self, payload: &str) -> Result<(), BroadcastSendError> {
        self.ws
            .lock()
            .send(Message::Text(payload.to_owned().into()))
            .map_err(|e| BroadcastSendError(e.to_string()))
    }

    fn recv(&self) -> Inbound {
        let inbound = match self.ws.lock().read() {
            Ok(Message::Text(text)) => Inbound::Text(text.as_str().to_owned()),
            Ok(Message::Close(_)) => Inbound::Closed,
            Ok(_) => Inbound::Idle,
            Err(tungstenite::Error::Io(ref e))
                if matches!(e.kind(), ErrorKind::WouldBlock | ErrorKind::TimedOut) =>
            {
                Inbound::Idle
            }
            Err(_) => Inbound::Closed,
        };
        if inbound == Inbound::Idle {
            // Let a pending broadcast take the socket
            std::thread::yield_now();
        }
        inbound
    }

    fn close(&self) {
        let mut ws = self.ws.lock();
        let _ = ws.close(None);
        let _ = ws.flush();
    }
}
