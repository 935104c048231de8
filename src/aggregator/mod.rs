//! The `aggregator` module owns the dashboard's live state.
//!
//! It merges two independent inputs, one-shot snapshots and the push-event
//! stream, into a single bounded model, and reports every change as a
//! [`Notification`] naming exactly the view fragment that needs redrawing.

pub mod engine;
pub mod input;
pub mod notification;

pub use engine::{AggregatorSettings, StateAggregator};
pub use input::{
    ClientEvent, ClientRecord, LogEvent, MessageEvent, Snapshot, SnapshotKind, TopicEvent,
    UserRecord,
};
pub use notification::Notification;
