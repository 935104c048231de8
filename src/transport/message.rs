use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::aggregator::input::{decode_clients, decode_or_default};
use crate::aggregator::{
    ClientEvent, LogEvent, MessageEvent, Snapshot, SnapshotKind, TopicEvent,
};
use crate::transport::command::CommandResponse;
use crate::utils::Result;

/// One frame on the event stream: `{"event": <name>, "data": <payload>}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    pub event: String,
    #[serde(default)]
    pub data: Value,
}

impl Envelope {
    pub fn new(event: &str, data: Value) -> Self {
        Self {
            event: event.to_string(),
            data,
        }
    }

    pub fn to_frame(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}

/// A push event, decoded and ready for the aggregator.
#[derive(Debug, Clone, PartialEq)]
pub enum StreamEvent {
    Topic(TopicEvent),
    Message(MessageEvent),
    /// A message echoed to topic subscribers; buffered without counting.
    TopicMessage(MessageEvent),
    Client(ClientEvent),
    Log(LogEvent),
    Snapshot(Snapshot),
    LogsCleared,
    /// Server confirmation of a dashboard reset; applied only on success.
    DashboardCleared(CommandResponse),
}

impl StreamEvent {
    /// Map an event name and payload to a stream event. Returns `None` for
    /// names this dashboard does not handle.
    pub fn decode(name: &str, data: Value) -> Option<Self> {
        let event = match name {
            "new_topic" | "topic_added" => StreamEvent::Topic(decode_or_default(data, name)),
            "message_update" | "message_appended" => {
                StreamEvent::Message(decode_or_default(data, name))
            }
            "topic_message" => StreamEvent::TopicMessage(decode_or_default(data, name)),
            "client_connected" => {
                StreamEvent::Client(ClientEvent::Connected(decode_or_default(data, name)))
            }
            "client_disconnected" => {
                StreamEvent::Client(ClientEvent::Disconnected(decode_or_default(data, name)))
            }
            "client_update" | "init_clients" | "clients_replaced" => {
                StreamEvent::Client(ClientEvent::ReplaceAll(decode_clients(data)))
            }
            "log_update" | "log_appended" => StreamEvent::Log(decode_or_default(data, name)),
            "init_logs" | "logs_snapshot" => snapshot(SnapshotKind::Logs, data),
            "init_topics" => snapshot(SnapshotKind::Topics, data),
            "init_messages" => snapshot(SnapshotKind::Messages, data),
            "stats_update" | "stats_changed" => snapshot(SnapshotKind::Stats, data),
            "users_updated" | "users_changed" => snapshot(SnapshotKind::Users, data),
            "system_info" => snapshot(SnapshotKind::SystemInfo, data),
            "init_config" => snapshot(SnapshotKind::Config, data),
            "logs_cleared" => StreamEvent::LogsCleared,
            "dashboard_cleared" => StreamEvent::DashboardCleared(decode_or_default(data, name)),
            _ => {
                debug!(event = name, "Ignoring unknown event");
                return None;
            }
        };
        Some(event)
    }

    /// Decode one text frame. Errors only when the frame is not an envelope.
    pub fn from_frame(text: &str) -> Result<Option<Self>> {
        let envelope: Envelope = serde_json::from_str(text)?;
        Ok(Self::decode(&envelope.event, envelope.data))
    }
}

fn snapshot(kind: SnapshotKind, data: Value) -> StreamEvent {
    StreamEvent::Snapshot(Snapshot::from_json(kind, data))
}
