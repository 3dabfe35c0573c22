//! Live reload for connected browsers.
//!
//! # Architecture
//!
//! ```text
//! acceptor thread --TcpStream--> WsActor --handshake--> ConnectionRegistry
//!                                   ^                      |  reader thread per client
//!              RebuildActor --Update+                      +--"update"--> Browser
//! ```
//!
//! # Modules
//!
//! - `registry` - Connection set with snapshot broadcast and pruning
//! - `connection` - WebSocket-backed `Connection`
//! - `server` - TCP acceptor with port retry
//!
//! # Wire protocol
//!
//! Text frames only. The server sends `update` after a successful rebuild.
//! A client may send `close` before leaving; anything else is ignored.

mod connection;
mod registry;
mod server;

pub use connection::WsConnection;
pub use registry::{BroadcastSendError, Connection, ConnectionId, ConnectionRegistry, Inbound};
pub use server::start_acceptor;

/// Server → client: a rebuild finished, reload the page.
pub const UPDATE: &str = "update";

/// Client → server: graceful disconnect.
pub const CLOSE: &str = "close";
