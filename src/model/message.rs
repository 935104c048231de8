//! Message records and the per-topic bounded buffer
//!
//! Messages are kept in arrival order, which is also display order. The
//! timestamp is display text supplied by the broker (or the receipt time) and
//! is never used for ordering.

use std::collections::VecDeque;

use serde::Serialize;
use serde_json::Value;

use crate::utils::lenient;

/// Maximum number of messages kept per topic.
pub const MESSAGE_CAPACITY: usize = 100;

/// MQTT delivery level. Serialized as the bare number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(into = "u8")]
pub enum Qos {
    #[default]
    AtMostOnce,
    AtLeastOnce,
    ExactlyOnce,
}

impl Qos {
    /// Decode any JSON value. Out-of-range or non-numeric input is level 0.
    pub fn from_value(value: &Value) -> Self {
        match lenient::count(value) {
            Some(1) => Qos::AtLeastOnce,
            Some(2) => Qos::ExactlyOnce,
            _ => Qos::AtMostOnce,
        }
    }
}

impl From<Qos> for u8 {
    fn from(qos: Qos) -> Self {
        match qos {
            Qos::AtMostOnce => 0,
            Qos::AtLeastOnce => 1,
            Qos::ExactlyOnce => 2,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Message {
    pub timestamp: String,
    pub payload: String,
    pub qos: Qos,
}

/// FIFO buffer holding the most recent messages of one topic.
///
/// `len() <= capacity()` holds after every operation, including
/// construction from a snapshot.
#[derive(Debug, Clone)]
pub struct MessageBuffer {
    messages: VecDeque<Message>,
    capacity: usize,
}

impl MessageBuffer {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            messages: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Build a buffer from a snapshot, keeping only the last `capacity` entries.
    pub fn from_messages<I>(messages: I, capacity: usize) -> Self
    where
        I: IntoIterator<Item = Message>,
    {
        let mut buffer = Self::new(capacity);
        for message in messages {
            buffer.push(message);
        }
        buffer
    }

    /// Append a message, returning the evicted oldest one on overflow.
    pub fn push(&mut self, message: Message) -> Option<Message> {
        let evicted = if self.messages.len() >= self.capacity {
            self.messages.pop_front()
        } else {
            None
        };
        self.messages.push_back(message);
        evicted
    }

    pub fn clear(&mut self) {
        self.messages.clear();
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn iter(&self) -> impl Iterator<Item = &Message> {
        self.messages.iter()
    }

    /// Copy of the whole buffer, oldest first.
    pub fn to_vec(&self) -> Vec<Message> {
        self.messages.iter().cloned().collect()
    }
}

impl Default for MessageBuffer {
    fn default() -> Self {
        Self::new(MESSAGE_CAPACITY)
    }
}
