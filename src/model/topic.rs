use serde::Serialize;

/// A topic observed on the broker, keyed by name.
///
/// Topics are created on first observation and live for the session;
/// `message_count` is the broker-side count, not the length of the local
/// message buffer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Topic {
    pub name: String,
    pub message_count: u64,
}

impl Topic {
    pub fn new(name: &str, message_count: u64) -> Self {
        Self {
            name: name.to_string(),
            message_count,
        }
    }
}
