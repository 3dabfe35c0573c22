//! Actor Message Definitions
//!
//! Message types for inter-actor communication.
//!
//! ```text
//! FsActor --Rebuild--> RebuildActor --Update--> WsActor
//! ```

use std::path::PathBuf;

use crate::core::RebuildScope;

/// What happened to a watched path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    Created,
    Modified,
    Removed,
}

impl ChangeKind {
    pub fn label(self) -> &'static str {
        match self {
            Self::Created => "created",
            Self::Modified => "modified",
            Self::Removed => "removed",
        }
    }
}

/// The accepted filesystem change that caused a rebuild.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Trigger {
    pub path: PathBuf,
    pub kind: ChangeKind,
}

// =============================================================================
// RebuildActor Messages
// =============================================================================

/// Messages to Rebuild Actor
#[derive(Debug)]
pub enum RebuildMsg {
    /// Run one rebuild cycle. `trigger` is `None` for the startup build.
    Rebuild {
        scope: RebuildScope,
        trigger: Option<Trigger>,
    },
    /// Stop the backend and exit
    Shutdown,
}

// =============================================================================
// WsActor Messages
// =============================================================================

/// Messages to WebSocket Actor
#[derive(Debug)]
pub enum WsMsg {
    /// Handshake and register a freshly accepted client
    AddClient(std::net::TcpStream),
    /// Tell every client to reload
    Update,
    /// Close all clients and exit
    Shutdown,
}
