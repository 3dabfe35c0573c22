//! Actor System for the Development Loop
//!
//! Message-passing concurrency for `wap run`:
//!
//! ```text
//! FsActor --> RebuildActor --> WsActor
//! (watch)     (build, emit,    (broadcast)
//!              relaunch)
//! ```
//!
//! # Module Structure
//!
//! - `messages` - Message types for inter-actor communication
//! - `fs` - File system watcher with debouncing and classification
//! - `rebuild` - Serial rebuild cycles and backend supervision
//! - `ws` - Live reload broadcast
//! - `coordinator` - Wires up and runs actors

pub mod coordinator;
pub mod fs;
pub mod messages;
pub mod rebuild;
pub mod ws;

pub use coordinator::Coordinator;
