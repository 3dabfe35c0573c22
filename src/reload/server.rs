//! TCP acceptor for live reload clients.
//!
//! Accepted streams are handed to `WsActor`, which performs the WebSocket
//! handshake off the acceptor thread.

use std::net::TcpListener;
use std::time::Duration;

use anyhow::Result;

use crate::actor::messages::WsMsg;

/// Maximum port retry attempts
const MAX_PORT_RETRIES: u16 = 10;

const ACCEPT_POLL: Duration = Duration::from_millis(100);

/// Bind the reload port (or the next free one) and start accepting.
///
/// Returns the port actually bound, which the generated live reload snippet
/// must use.
pub fn start_acceptor(base_port: u16, ws_tx: tokio::sync::mpsc::Sender<WsMsg>) -> Result<u16> {
    let (listener, actual_port) = try_bind_port(base_port, MAX_PORT_RETRIES)?;
    listener.set_nonblocking(true)?;

    std::thread::Builder::new()
        .name("wap-reload-accept".into())
        .spawn(move || {
            loop {
                if crate::core::is_shutdown() {
                    break;
                }
                match listener.accept() {
                    Ok((stream, addr)) => {
                        crate::debug!("reload"; "connection from {}", addr);
                        let _ = stream.set_nonblocking(false);
                        if ws_tx.blocking_send(WsMsg::AddClient(stream)).is_err() {
                            // Actor gone, nothing left to serve
                            break;
                        }
                    }
                    Err(ref e) if e.kind() == std::io::ErrorKind::WouldBlock => {
                        std::thread::sleep(ACCEPT_POLL);
                    }
                    Err(e) => {
                        crate::log!("reload"; "accept error: {}", e);
                        std::thread::sleep(ACCEPT_POLL);
                    }
                }
            }
        })?;

    Ok(actual_port)
}

/// Try binding to port, retry with incremented port if in use
fn try_bind_port(base_port: u16, max_retries: u16) -> Result<(TcpListener, u16)> {
    let mut last_error = None;

    for offset in 0..max_retries {
        let port = base_port.saturating_add(offset);
        match TcpListener::bind(("127.0.0.1", port)) {
            Ok(listener) => {
                let actual_port = listener.local_addr()?.port();
                if base_port != 0 && actual_port != base_port {
                    crate::log!("reload"; "port {} in use, using {}", base_port, actual_port);
                }
                return Ok((listener, actual_port));
            }
            Err(e) => last_error = Some(e),
        }
    }

    Err(anyhow::anyhow!(
        "Failed to bind live reload server after {} attempts: {}",
        max_retries,
        last_error.map(|e| e.to_string()).unwrap_or_default()
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bind_retries_next_port() {
        let (taken, port) = try_bind_port(0, 1).unwrap();
        let result = try_bind_port(port, 5);
        // Port 0 asks the OS for any free port; retrying from a taken port
        // must land on a different one.
        if let Ok((_listener, next)) = result {
            assert_ne!(next, port);
        }
        drop(taken);
    }

    #[test]
    fn test_bind_gives_up() {
        let (_taken, port) = try_bind_port(0, 1).unwrap();
        assert!(try_bind_port(port, 1).is_err());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_acceptor_forwards_streams() {
        let (tx, mut rx) = tokio::sync::mpsc::channel(4);
        let port = start_acceptor(0, tx).unwrap();

        let _client = std::net::TcpStream::connect(("127.0.0.1", port)).unwrap();
        let msg = tokio::time::timeout(Duration::from_secs(3), rx.recv())
            .await
            .unwrap();
        assert!(matches!(msg, Some(WsMsg::AddClient(_))));
    }
}
