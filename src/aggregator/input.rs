//! Inbound payloads accepted by the aggregator.
//!
//! Everything here is deliberately loose: every field is optional and
//! decoded with the lenient helpers, so a payload with missing keys or odd
//! types still produces a value. Normalization to safe defaults (empty
//! string, zero, receipt time) happens when the aggregator applies it.

use std::collections::{BTreeSet, HashMap};

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};
use serde_json::Value;
use tracing::warn;

use crate::model::{
    ANONYMOUS, BrokerConfig, BrokerStats, Client, LogEntry, LogLevel, Message, Permission, Qos,
    SystemInfo, User,
};
use crate::utils::lenient;

fn qos_or_default<'de, D>(deserializer: D) -> Result<Qos, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(Qos::from_value(&value))
}

/// Decode a whole payload, falling back to the all-defaults value when its
/// top-level shape is wrong (for example a string where an object belongs).
pub(crate) fn decode_or_default<T>(value: Value, what: &str) -> T
where
    T: DeserializeOwned + Default,
{
    match serde_json::from_value(value) {
        Ok(decoded) => decoded,
        Err(e) => {
            warn!(payload = what, error = %e, "Malformed payload replaced with defaults");
            T::default()
        }
    }
}

/// `{topic, count?}`: a topic observed, optionally with its broker-side count.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct TopicEvent {
    #[serde(deserialize_with = "lenient::opt_text")]
    pub topic: Option<String>,
    #[serde(deserialize_with = "lenient::opt_count")]
    pub count: Option<u64>,
}

impl TopicEvent {
    pub fn new(topic: &str, count: Option<u64>) -> Self {
        Self {
            topic: Some(topic.to_string()),
            count,
        }
    }
}

/// `{topic, payload | message, qos, time?}`: one published message.
///
/// Also used for the entries of a messages snapshot, where `topic` is
/// implied by the map key.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct MessageEvent {
    #[serde(deserialize_with = "lenient::opt_text")]
    pub topic: Option<String>,
    #[serde(deserialize_with = "lenient::opt_text")]
    pub payload: Option<String>,
    /// Older producers put the body under `message`.
    #[serde(deserialize_with = "lenient::opt_text")]
    pub message: Option<String>,
    #[serde(deserialize_with = "qos_or_default")]
    pub qos: Qos,
    #[serde(deserialize_with = "lenient::opt_text")]
    pub time: Option<String>,
}

impl MessageEvent {
    pub fn new(topic: &str, payload: &str, qos: Qos) -> Self {
        Self {
            topic: Some(topic.to_string()),
            payload: Some(payload.to_string()),
            qos,
            ..Self::default()
        }
    }

    pub fn at(mut self, time: &str) -> Self {
        self.time = Some(time.to_string());
        self
    }

    /// Split into the normalized topic name and message.
    pub(crate) fn into_parts(self, received_at: &str) -> (String, Message) {
        let message = Message {
            timestamp: self.time.unwrap_or_else(|| received_at.to_string()),
            payload: self.payload.or(self.message).unwrap_or_default(),
            qos: self.qos,
        };
        (self.topic.unwrap_or_default(), message)
    }
}

/// A client as reported by the broker. The id may be under `client_id` or
/// `id`, or only present as the key of the enclosing clients map.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ClientRecord {
    #[serde(deserialize_with = "lenient::opt_text")]
    pub client_id: Option<String>,
    #[serde(deserialize_with = "lenient::opt_text")]
    pub id: Option<String>,
    #[serde(deserialize_with = "lenient::opt_text")]
    pub username: Option<String>,
    #[serde(deserialize_with = "lenient::opt_text")]
    pub connected_at: Option<String>,
    #[serde(deserialize_with = "lenient::opt_text_list")]
    pub subscriptions: Option<Vec<String>>,
}

impl ClientRecord {
    pub fn new(client_id: &str, username: &str) -> Self {
        Self {
            client_id: Some(client_id.to_string()),
            username: Some(username.to_string()),
            ..Self::default()
        }
    }

    pub(crate) fn key(&self, map_key: Option<&str>) -> String {
        self.client_id
            .clone()
            .or_else(|| self.id.clone())
            .or_else(|| map_key.map(str::to_string))
            .unwrap_or_default()
    }

    pub(crate) fn into_client(self, map_key: Option<&str>, received_at: &str) -> Client {
        let client_id = self.key(map_key);
        let username = self
            .username
            .filter(|name| !name.trim().is_empty())
            .unwrap_or_else(|| ANONYMOUS.to_string());
        Client {
            client_id,
            username,
            connected_at: self
                .connected_at
                .unwrap_or_else(|| received_at.to_string()),
            subscriptions: self
                .subscriptions
                .unwrap_or_default()
                .into_iter()
                .collect::<BTreeSet<_>>(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientEvent {
    /// Upsert by id. A repeated connect for the same id is idempotent.
    Connected(ClientRecord),
    /// Remove by id. Unknown ids are ignored.
    Disconnected(ClientRecord),
    /// Swap the whole collection, keyed by client id.
    ReplaceAll(HashMap<String, ClientRecord>),
}

/// `{time, level, message}`: one log record.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct LogEvent {
    #[serde(deserialize_with = "lenient::opt_text")]
    pub time: Option<String>,
    #[serde(deserialize_with = "lenient::opt_text")]
    pub level: Option<String>,
    #[serde(deserialize_with = "lenient::opt_text")]
    pub message: Option<String>,
}

impl LogEvent {
    pub fn new(time: &str, level: &str, message: &str) -> Self {
        Self {
            time: Some(time.to_string()),
            level: Some(level.to_string()),
            message: Some(message.to_string()),
        }
    }

    pub(crate) fn into_entry(self, received_at: &str) -> LogEntry {
        LogEntry {
            time: self.time.unwrap_or_else(|| received_at.to_string()),
            level: self
                .level
                .as_deref()
                .map(LogLevel::parse)
                .unwrap_or_default(),
            message: self.message.unwrap_or_default(),
        }
    }
}

/// A broker account. Any `password` key in the source is dropped here.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct UserRecord {
    #[serde(deserialize_with = "lenient::opt_text")]
    pub username: Option<String>,
    #[serde(deserialize_with = "lenient::opt_text_list")]
    pub permissions: Option<Vec<String>>,
}

impl UserRecord {
    pub(crate) fn into_user(self) -> User {
        User {
            username: self.username.unwrap_or_default(),
            permissions: self
                .permissions
                .unwrap_or_default()
                .iter()
                .filter_map(|p| Permission::parse(p))
                .collect(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SnapshotKind {
    Config,
    Topics,
    Messages,
    Clients,
    Logs,
    Users,
    SystemInfo,
    Stats,
}

impl SnapshotKind {
    pub const ALL: [SnapshotKind; 8] = [
        SnapshotKind::Config,
        SnapshotKind::Topics,
        SnapshotKind::Messages,
        SnapshotKind::Clients,
        SnapshotKind::Logs,
        SnapshotKind::Users,
        SnapshotKind::SystemInfo,
        SnapshotKind::Stats,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            SnapshotKind::Config => "config",
            SnapshotKind::Topics => "topics",
            SnapshotKind::Messages => "messages",
            SnapshotKind::Clients => "clients",
            SnapshotKind::Logs => "logs",
            SnapshotKind::Users => "users",
            SnapshotKind::SystemInfo => "system info",
            SnapshotKind::Stats => "stats",
        }
    }
}

/// A full replacement for one collection.
#[derive(Debug, Clone, PartialEq)]
pub enum Snapshot {
    Config(BrokerConfig),
    /// Topic name to broker-side message count.
    Topics(HashMap<String, u64>),
    Messages(HashMap<String, Vec<MessageEvent>>),
    Clients(HashMap<String, ClientRecord>),
    Logs(Vec<LogEvent>),
    Users(Vec<UserRecord>),
    SystemInfo(SystemInfo),
    Stats(BrokerStats),
}

impl Snapshot {
    pub fn kind(&self) -> SnapshotKind {
        match self {
            Snapshot::Config(_) => SnapshotKind::Config,
            Snapshot::Topics(_) => SnapshotKind::Topics,
            Snapshot::Messages(_) => SnapshotKind::Messages,
            Snapshot::Clients(_) => SnapshotKind::Clients,
            Snapshot::Logs(_) => SnapshotKind::Logs,
            Snapshot::Users(_) => SnapshotKind::Users,
            Snapshot::SystemInfo(_) => SnapshotKind::SystemInfo,
            Snapshot::Stats(_) => SnapshotKind::Stats,
        }
    }

    /// Decode a snapshot body. Never fails: unexpected shapes decode to an
    /// empty collection or default record.
    pub fn from_json(kind: SnapshotKind, value: Value) -> Self {
        match kind {
            SnapshotKind::Config => Snapshot::Config(decode_or_default(value, "config")),
            SnapshotKind::Topics => Snapshot::Topics(decode_topics(value)),
            SnapshotKind::Messages => Snapshot::Messages(
                object_entries(value)
                    .map(|(topic, items)| {
                        let messages = array_items(items)
                            .map(|item| decode_or_default(item, "message"))
                            .collect();
                        (topic, messages)
                    })
                    .collect(),
            ),
            SnapshotKind::Clients => Snapshot::Clients(decode_clients(value)),
            SnapshotKind::Logs => Snapshot::Logs(
                array_items(unwrap_field(value, "logs"))
                    .map(|item| decode_or_default(item, "log"))
                    .collect(),
            ),
            SnapshotKind::Users => Snapshot::Users(decode_users(unwrap_field(value, "users"))),
            SnapshotKind::SystemInfo => {
                Snapshot::SystemInfo(decode_or_default(value, "system info"))
            }
            SnapshotKind::Stats => Snapshot::Stats(decode_or_default(value, "stats")),
        }
    }
}

/// `{field: X}` yields `X`; anything else is returned unchanged.
fn unwrap_field(value: Value, field: &str) -> Value {
    match value {
        Value::Object(mut map) if map.contains_key(field) => {
            map.remove(field).unwrap_or(Value::Null)
        }
        other => other,
    }
}

fn object_entries(value: Value) -> impl Iterator<Item = (String, Value)> {
    let map = match value {
        Value::Object(map) => map,
        _ => serde_json::Map::new(),
    };
    map.into_iter()
}

fn array_items(value: Value) -> impl Iterator<Item = Value> {
    let items = match value {
        Value::Array(items) => items,
        _ => Vec::new(),
    };
    items.into_iter()
}

/// A clients map keyed by client id. Non-object bodies decode as empty.
pub(crate) fn decode_clients(value: Value) -> HashMap<String, ClientRecord> {
    object_entries(value)
        .map(|(key, record)| (key, decode_or_default(record, "client")))
        .collect()
}

fn decode_topics(value: Value) -> HashMap<String, u64> {
    object_entries(unwrap_field(value, "topics"))
        .map(|(name, count)| {
            let count = lenient::count(&count).unwrap_or(0);
            (name, count)
        })
        .collect()
}

fn decode_users(value: Value) -> Vec<UserRecord> {
    match value {
        Value::Array(items) => items
            .into_iter()
            .map(|item| decode_or_default(item, "user"))
            .collect(),
        Value::Object(map) => map
            .into_iter()
            .map(|(username, item)| {
                let mut record: UserRecord = decode_or_default(item, "user");
                record.username.get_or_insert(username);
                record
            })
            .collect(),
        _ => Vec::new(),
    }
}
