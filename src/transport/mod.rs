//! The `transport` module is responsible for network communication with the
//! broker's admin server.
//!
//! It defines the push-event envelope and its lenient decoding, the
//! WebSocket event stream listener, the HTTP snapshot loader, and the
//! command dispatcher that sends UI actions back to the server.

pub mod command;
pub mod message;
pub mod snapshot_loader;
pub mod websocket;

pub use command::{Command, CommandDispatcher, CommandResponse, NewUser};
pub use message::{Envelope, StreamEvent};
pub use snapshot_loader::SnapshotLoader;
pub use websocket::EventStreamListener;


#[cfg(test)]
mod websocket_tests;
