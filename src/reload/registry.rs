//! Connected live reload clients.
//!
//! The map sits behind one `RwLock`: broadcasts take a read-lock snapshot and
//! send outside the lock, while registration and removal take the write
//! lock briefly. A slow or dead client therefore never blocks new
//! registrations, and a failed send removes only that client.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::RwLock;
use rustc_hash::FxHashMap;
use thiserror::Error;

use super::{CLOSE, UPDATE};

/// Delivery to one connection failed. The connection is dropped.
#[derive(Debug, Error)]
#[error("failed to deliver to connection: {0}")]
pub struct BroadcastSendError(pub String);

/// What a connection's reader observed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Inbound {
    Text(String),
    /// Nothing arrived within the poll interval.
    Idle,
    /// Peer went away or the channel broke.
    Closed,
}

/// A bidirectional text channel to one client.
pub trait Connection: Send + Sync + 'static {
    fn send(&self, payload: &str) -> Result<(), BroadcastSendError>;

    /// Wait a bounded time for the next inbound message.
    fn recv(&self) -> Inbound;

    /// Best-effort close notification to the peer.
    fn close(&self);
}

/// Registry key, assigned in registration order and never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConnectionId(u64);

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

pub struct ConnectionRegistry<C> {
    connections: RwLock<FxHashMap<ConnectionId, Arc<C>>>,
    next_id: AtomicU64,
}

impl<C> Default for ConnectionRegistry<C> {
    fn default() -> Self {
        Self {
            connections: RwLock::new(FxHashMap::default()),
            next_id: AtomicU64::new(1),
        }
    }
}

impl<C: Connection> ConnectionRegistry<C> {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Add a connection and start its reader thread.
    pub fn register(self: &Arc<Self>, connection: C) -> ConnectionId {
        let id = ConnectionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let connection = Arc::new(connection);
        self.connections.write().insert(id, Arc::clone(&connection));

        let registry = Arc::downgrade(self);
        let spawned = std::thread::Builder::new()
            .name(format!("wap-reload-{}", id.0))
            .spawn(move || reader_loop(&registry, id, connection.as_ref()));
        if let Err(err) = spawned {
            crate::log!("reload"; "failed to start reader for client {}: {}", id, err);
            self.unregister(id);
        } else {
            crate::debug!("reload"; "client {} connected (total: {})", id, self.len());
        }
        id
    }

    /// Remove a connection. Returns whether it was still registered.
    pub fn unregister(&self, id: ConnectionId) -> bool {
        let removed = self.connections.write().remove(&id).is_some();
        if removed {
            crate::debug!("reload"; "client {} disconnected", id);
        }
        removed
    }

    pub fn contains(&self, id: ConnectionId) -> bool {
        self.connections.read().contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.connections.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Send `update` to every connection, dropping the ones that fail.
    ///
    /// Returns the number of successful deliveries.
    pub fn notify_all(&self) -> usize {
        let snapshot: Vec<(ConnectionId, Arc<C>)> = self
            .connections
            .read()
            .iter()
            .map(|(id, conn)| (*id, Arc::clone(conn)))
            .collect();

        if snapshot.is_empty() {
            crate::debug!("reload"; "no clients connected");
            return 0;
        }

        let mut delivered = 0;
        let mut failed = Vec::new();
        for (id, conn) in snapshot {
            match conn.send(UPDATE) {
                Ok(()) => delivered += 1,
                Err(err) => {
                    crate::debug!("reload"; "client {}: {}", id, err);
                    failed.push(id);
                }
            }
        }

        if !failed.is_empty() {
            let mut connections = self.connections.write();
            for id in &failed {
                connections.remove(id);
            }
        }

        crate::debug!("reload"; "notified {} clients, dropped {}", delivered, failed.len());
        delivered
    }

    /// Close and forget every connection.
    pub fn close_all(&self) {
        let drained: Vec<Arc<C>> = self.connections.write().drain().map(|(_, c)| c).collect();
        for conn in drained {
            conn.close();
        }
    }
}

/// Watch one connection for a peer close or a `close` message.
///
/// Exits once the connection is gone from the registry, whoever removed it.
fn reader_loop<C: Connection>(
    registry: &Weak<ConnectionRegistry<C>>,
    id: ConnectionId,
    connection: &C,
) {
    loop {
        match connection.recv() {
            Inbound::Text(text) if text.trim() == CLOSE => break,
            Inbound::Closed => break,
            Inbound::Text(_) | Inbound::Idle => {}
        }
        match registry.upgrade() {
            Some(registry) if registry.contains(id) => {}
            _ => return,
        }
    }

    if let Some(registry) = registry.upgrade() {
        registry.unregister(id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossbeam::channel::{Receiver, Sender, unbounded};
    use std::sync::atomic::AtomicUsize;
    use std::time::{Duration, Instant};

    /// In-memory connection; inbound messages are pushed through `inbox`.
    struct StubConnection {
        fail: bool,
        sent: Arc<AtomicUsize>,
        inbound: Receiver<Inbound>,
    }

    impl Connection for StubConnection {
        fn send(&self, payload: &str) -> Result<(), BroadcastSendError> {
            if self.fail {
                return Err(BroadcastSendError("broken pipe".into()));
            }
            assert_eq!(payload, UPDATE);
            self.sent.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        fn recv(&self) -> Inbound {
            self.inbound
                .recv_timeout(Duration::from_millis(20))
                .unwrap_or(Inbound::Idle)
        }

        fn close(&self) {}
    }

    fn stub(fail: bool) -> (StubConnection, Arc<AtomicUsize>, Sender<Inbound>) {
        let sent = Arc::new(AtomicUsize::new(0));
        let (tx, rx) = unbounded();
        let conn = StubConnection {
            fail,
            sent: Arc::clone(&sent),
            inbound: rx,
        };
        (conn, sent, tx)
    }

    fn wait_until(cond: impl Fn() -> bool) -> bool {
        let deadline = Instant::now() + Duration::from_secs(2);
        while Instant::now() < deadline {
            if cond() {
                return true;
            }
            std::thread::sleep(Duration::from_millis(10));
        }
        cond()
    }

    #[test]
    fn test_ids_are_unique_and_increasing() {
        let registry = ConnectionRegistry::new();
        let (a, _, _ta) = stub(false);
        let (b, _, _tb) = stub(false);
        let first = registry.register(a);
        let second = registry.register(b);
        assert!(second > first);
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn test_failed_send_removes_only_that_connection() {
        let registry = ConnectionRegistry::new();
        let (broken, _, _tb) = stub(true);
        let (healthy, sent, _th) = stub(false);
        let broken_id = registry.register(broken);
        let healthy_id = registry.register(healthy);

        let delivered = registry.notify_all();

        assert_eq!(delivered, 1);
        assert_eq!(sent.load(Ordering::SeqCst), 1);
        assert!(!registry.contains(broken_id));
        assert!(registry.contains(healthy_id));

        registry.notify_all();
        assert_eq!(sent.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_close_message_unregisters() {
        let registry = ConnectionRegistry::new();
        let (conn, _, inbox) = stub(false);
        let id = registry.register(conn);

        inbox.send(Inbound::Text("close".into())).unwrap();
        assert!(wait_until(|| !registry.contains(id)));
    }

    #[test]
    fn test_peer_close_unregisters() {
        let registry = ConnectionRegistry::new();
        let (conn, _, inbox) = stub(false);
        let id = registry.register(conn);

        inbox.send(Inbound::Closed).unwrap();
        assert!(wait_until(|| !registry.contains(id)));
    }

    #[test]
    fn test_other_text_ignored() {
        let registry = ConnectionRegistry::new();
        let (conn, _, inbox) = stub(false);
        let id = registry.register(conn);

        inbox.send(Inbound::Text("hello".into())).unwrap();
        std::thread::sleep(Duration::from_millis(100));
        assert!(registry.contains(id));
    }

    #[test]
    fn test_concurrent_register_and_notify() {
        let registry = ConnectionRegistry::new();
        let mut inboxes = Vec::new();
        let mut counters = Vec::new();

        std::thread::scope(|s| {
            let (tx, rx) = std::sync::mpsc::channel();
            for _ in 0..4 {
                let registry = Arc::clone(&registry);
                let tx = tx.clone();
                s.spawn(move || {
                    for _ in 0..25 {
                        let (conn, sent, inbox) = stub(false);
                        registry.register(conn);
                        tx.send((sent, inbox)).unwrap();
                    }
                });
            }
            drop(tx);
            s.spawn(|| {
                for _ in 0..50 {
                    registry.notify_all();
                }
            });
            for (sent, inbox) in rx {
                counters.push(sent);
                inboxes.push(inbox);
            }
        });

        assert_eq!(registry.len(), 100);
        assert_eq!(registry.notify_all(), 100);
        assert!(counters.iter().all(|c| c.load(Ordering::SeqCst) >= 1));
    }

    #[test]
    fn test_close_all_empties_registry() {
        let registry = ConnectionRegistry::new();
        let (a, _, _ta) = stub(false);
        let id = registry.register(a);
        registry.close_all();
        assert!(registry.is_empty());
        assert!(wait_until(|| !registry.contains(id)));
    }
}
