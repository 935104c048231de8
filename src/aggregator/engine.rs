//! State aggregator engine
//!
//! This module contains the in-memory store responsible for:
//! - holding topics, per-topic message buffers, clients, logs, users and
//!   broker-level records for one dashboard session
//! - applying snapshots (whole-collection replace, last snapshot wins) and
//!   incremental events (mutate forward from whatever state exists)
//! - bounding message buffers and the dashboard log region
//! - fanning out one [`Notification`] per view fragment that changed
//!
//! Concurrency and usage notes:
//! - The API is synchronous and `&mut self`; the session runtime owns the
//!   aggregator and drives it one work item at a time, so no locking is
//!   needed and no call suspends mid-mutation.
//! - No call can fail. Malformed input is normalized, and a subscriber whose
//!   channel has closed is dropped without affecting the others.

use std::cmp::Reverse;
use std::collections::{BTreeMap, HashMap, VecDeque};

use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tracing::{debug, trace, warn};

use crate::aggregator::input::{
    ClientEvent, ClientRecord, LogEvent, MessageEvent, Snapshot, TopicEvent,
};
use crate::aggregator::notification::Notification;
use crate::model::{
    BrokerConfig, BrokerStats, BrokerStatus, Client, LogEntry, MESSAGE_CAPACITY, Message,
    MessageBuffer, SystemInfo, Topic, User,
};
use crate::utils::clock;

/// Maximum number of entries kept in the dashboard log region.
pub const DASHBOARD_LOG_CAPACITY: usize = 100;

#[derive(Debug, Clone)]
pub struct AggregatorSettings {
    pub message_capacity: usize,
    pub dashboard_log_capacity: usize,
    /// Select the first topic that gets a non-empty buffer while nothing is
    /// selected.
    pub auto_select_first_topic: bool,
}

impl Default for AggregatorSettings {
    fn default() -> Self {
        Self {
            message_capacity: MESSAGE_CAPACITY,
            dashboard_log_capacity: DASHBOARD_LOG_CAPACITY,
            auto_select_first_topic: true,
        }
    }
}

enum CountUpdate {
    Increment,
    Replace(u64),
}

#[derive(Debug, Default)]
pub struct StateAggregator {
    topics: HashMap<String, Topic>,
    buffers: HashMap<String, MessageBuffer>,
    clients: HashMap<String, Client>,
    full_log: Vec<LogEntry>,
    dashboard_log: VecDeque<LogEntry>,
    users: BTreeMap<String, User>,
    config: BrokerConfig,
    stats: BrokerStats,
    status: BrokerStatus,
    system_info: SystemInfo,
    selection: Option<String>,
    settings: AggregatorSettings,
    listeners: Vec<UnboundedSender<Notification>>,
}

impl StateAggregator {
    pub fn new(settings: AggregatorSettings) -> Self {
        Self {
            settings,
            ..Self::default()
        }
    }

    /// Register a notification consumer. Every notification emitted after
    /// this call is delivered to the returned receiver, in emission order.
    pub fn subscribe(&mut self) -> UnboundedReceiver<Notification> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.listeners.push(tx);
        rx
    }

    fn emit(&mut self, notification: Notification) {
        if self.listeners.is_empty() {
            trace!(kind = notification.kind(), "No notification listeners");
            return;
        }
        let kind = notification.kind();
        self.listeners.retain(|listener| match listener.send(notification.clone()) {
            Ok(()) => true,
            Err(_) => {
                warn!(kind, "Notification listener closed, dropping it");
                false
            }
        });
    }

    /// Replace one whole collection. A snapshot that lands after incremental
    /// events for the same collection overwrites them.
    pub fn apply_snapshot(&mut self, snapshot: Snapshot) {
        debug!(kind = snapshot.kind().name(), "Applying snapshot");
        match snapshot {
            Snapshot::Config(config) => {
                self.config = config.clone();
                self.emit(Notification::ConfigChanged { config });
            }
            Snapshot::Topics(counts) => {
                self.topics = counts
                    .into_iter()
                    .map(|(name, count)| {
                        let topic = Topic::new(&name, count);
                        (name, topic)
                    })
                    .collect();
                let topics = self.topics();
                self.emit(Notification::TopicsReplaced { topics });
                self.auto_select();
            }
            Snapshot::Messages(by_topic) => {
                let received_at = clock::now_display();
                let capacity = self.settings.message_capacity;
                self.buffers = by_topic
                    .into_iter()
                    .map(|(topic, records)| {
                        let messages = records
                            .into_iter()
                            .map(|record| record.into_parts(&received_at).1);
                        (topic, MessageBuffer::from_messages(messages, capacity))
                    })
                    .collect();
                let message_count = self.total_messages();
                self.emit(Notification::MessagesReplaced { message_count });

                match self.selection.clone() {
                    Some(topic) => self.replay_selection(topic),
                    None => self.auto_select(),
                }
            }
            Snapshot::Clients(records) => self.replace_clients(records),
            Snapshot::Logs(records) => {
                let received_at = clock::now_display();
                self.full_log = records
                    .into_iter()
                    .map(|record| record.into_entry(&received_at))
                    .collect();
                let keep_from = self
                    .full_log
                    .len()
                    .saturating_sub(self.settings.dashboard_log_capacity);
                self.dashboard_log = self.full_log[keep_from..].iter().cloned().collect();
                let entries = self.full_log.clone();
                self.emit(Notification::LogsReplaced { entries });
            }
            Snapshot::Users(records) => {
                self.users = records
                    .into_iter()
                    .map(|record| {
                        let user = record.into_user();
                        (user.username.clone(), user)
                    })
                    .collect();
                let users = self.users();
                self.emit(Notification::UsersChanged { users });
            }
            Snapshot::SystemInfo(info) => {
                self.system_info = info.clone();
                self.emit(Notification::SystemInfoChanged { info });
            }
            Snapshot::Stats(stats) => {
                let status = BrokerStatus::from_running(stats.running);
                self.stats = stats.clone();
                self.emit(Notification::StatsChanged { stats });
                self.set_broker_status(status);
            }
        }
    }

    /// A topic observed. New topics are created with `count` (default 1);
    /// existing topics get `count` as their new value, or are incremented
    /// when no count is given.
    pub fn apply_topic_event(&mut self, event: TopicEvent) {
        let topic = event.topic.unwrap_or_default();
        let update = match event.count {
            Some(count) => CountUpdate::Replace(count),
            None => CountUpdate::Increment,
        };
        self.upsert_topic(&topic, update);
    }

    /// One message published. Creates the topic and its buffer on first
    /// sight, appends with FIFO eviction, and only reports message content
    /// when the topic is on screen.
    pub fn apply_message_event(&mut self, event: MessageEvent) {
        let received_at = clock::now_display();
        let (topic, message) = event.into_parts(&received_at);

        self.upsert_topic(&topic, CountUpdate::Increment);
        self.buffer_message(topic, message);
    }

    /// Buffer a message echoed for a topic without touching its count.
    pub fn append_topic_message(&mut self, event: MessageEvent) {
        let received_at = clock::now_display();
        let (topic, message) = event.into_parts(&received_at);
        self.buffer_message(topic, message);
    }

    fn buffer_message(&mut self, topic: String, message: Message) {
        let capacity = self.settings.message_capacity;
        let buffer = self
            .buffers
            .entry(topic.clone())
            .or_insert_with(|| MessageBuffer::new(capacity));
        if let Some(evicted) = buffer.push(message.clone()) {
            trace!(topic = %topic, evicted_at = %evicted.timestamp, "Evicted oldest message");
        }

        if self.selection.as_deref() == Some(topic.as_str()) {
            self.emit(Notification::MessageAppended { topic, message });
        } else if self.selection.is_none() && self.settings.auto_select_first_topic {
            debug!(topic = %topic, "Selecting first topic with messages");
            self.selection = Some(topic.clone());
            self.replay_selection(topic);
        }
    }

    pub fn apply_client_event(&mut self, event: ClientEvent) {
        match event {
            ClientEvent::Connected(record) => {
                let client = record.into_client(None, &clock::now_display());
                debug!(client_id = %client.client_id, "Client connected");
                self.clients.insert(client.client_id.clone(), client);
                self.emit_clients();
            }
            ClientEvent::Disconnected(record) => {
                let client_id = record.key(None);
                if self.clients.remove(&client_id).is_none() {
                    debug!(client_id = %client_id, "Disconnect for unknown client");
                }
                self.emit_clients();
            }
            ClientEvent::ReplaceAll(records) => self.replace_clients(records),
        }
    }

    /// Append to both log regions. Only the dashboard region is bounded.
    pub fn apply_log_event(&mut self, event: LogEvent) {
        let entry = event.into_entry(&clock::now_display());
        self.full_log.push(entry.clone());
        self.dashboard_log.push_back(entry.clone());
        while self.dashboard_log.len() > self.settings.dashboard_log_capacity {
            self.dashboard_log.pop_front();
        }
        self.emit(Notification::LogAppended { entry });
    }

    pub fn clear_logs(&mut self) {
        self.full_log.clear();
        self.dashboard_log.clear();
        self.emit(Notification::LogsCleared);
    }

    /// Change the selection. Selecting a topic replays its whole buffer
    /// once; the buffer is created empty if the topic has none yet.
    pub fn select_topic(&mut self, topic: Option<&str>) {
        match topic {
            Some(topic) => {
                self.selection = Some(topic.to_string());
                self.replay_selection(topic.to_string());
            }
            None => {
                self.selection = None;
                self.emit(Notification::SelectionCleared);
            }
        }
    }

    /// Empty one topic's buffer. The broker-side count is left alone.
    pub fn clear_topic_messages(&mut self, topic: &str) {
        let Some(buffer) = self.buffers.get_mut(topic) else {
            return;
        };
        buffer.clear();
        if self.selection.as_deref() == Some(topic) {
            self.replay_selection(topic.to_string());
        }
    }

    /// Reset everything the dashboard page shows, keeping config, users,
    /// system info and whether the broker is running. The full log is left
    /// alone; only `clear_logs` empties it.
    pub fn clear_dashboard(&mut self) {
        self.topics.clear();
        self.buffers.clear();
        self.clients.clear();
        self.dashboard_log.clear();
        self.selection = None;
        self.stats = BrokerStats {
            running: self.stats.running,
            ..BrokerStats::default()
        };
        self.emit(Notification::DashboardCleared);
    }

    pub fn set_broker_status(&mut self, status: BrokerStatus) {
        if self.status != status {
            self.status = status;
            self.emit(Notification::BrokerStatusChanged { status });
        }
    }

    fn upsert_topic(&mut self, name: &str, update: CountUpdate) {
        if let Some(topic) = self.topics.get_mut(name) {
            topic.message_count = match update {
                CountUpdate::Increment => topic.message_count.saturating_add(1),
                CountUpdate::Replace(count) => count,
            };
            let count = topic.message_count;
            self.emit(Notification::TopicCountChanged {
                topic: name.to_string(),
                count,
            });
            return;
        }

        let count = match update {
            CountUpdate::Increment => 1,
            CountUpdate::Replace(count) => count,
        };
        let index = self
            .topics
            .keys()
            .filter(|existing| existing.as_str() < name)
            .count();
        self.topics.insert(name.to_string(), Topic::new(name, count));
        self.emit(Notification::TopicAdded {
            topic: name.to_string(),
            count,
            index,
        });
    }

    fn replay_selection(&mut self, topic: String) {
        let capacity = self.settings.message_capacity;
        let messages = self
            .buffers
            .entry(topic.clone())
            .or_insert_with(|| MessageBuffer::new(capacity))
            .to_vec();
        self.emit(Notification::TopicSelected { topic, messages });
    }

    fn auto_select(&mut self) {
        if self.selection.is_some() || !self.settings.auto_select_first_topic {
            return;
        }
        let first = self
            .buffers
            .iter()
            .filter(|(_, buffer)| !buffer.is_empty())
            .map(|(topic, _)| topic)
            .min()
            .cloned();
        if let Some(topic) = first {
            debug!(topic = %topic, "Selecting first topic with messages");
            self.selection = Some(topic.clone());
            self.replay_selection(topic);
        }
    }

    fn replace_clients(&mut self, records: HashMap<String, ClientRecord>) {
        let received_at = clock::now_display();
        self.clients = records
            .into_iter()
            .map(|(key, record)| {
                let client = record.into_client(Some(&key), &received_at);
                (client.client_id.clone(), client)
            })
            .collect();
        self.emit_clients();
    }

    fn emit_clients(&mut self) {
        let clients = self.clients();
        self.emit(Notification::ClientsChanged { clients });
    }

    /// All topics sorted by name.
    pub fn topics(&self) -> Vec<Topic> {
        let mut topics: Vec<Topic> = self.topics.values().cloned().collect();
        topics.sort_by(|a, b| a.name.cmp(&b.name));
        topics
    }

    pub fn topic(&self, name: &str) -> Option<&Topic> {
        self.topics.get(name)
    }

    pub fn messages(&self, topic: &str) -> Option<&MessageBuffer> {
        self.buffers.get(topic)
    }

    pub fn total_messages(&self) -> usize {
        self.buffers.values().map(MessageBuffer::len).sum()
    }

    /// All clients, newest connection first. Unparseable connection times
    /// sort last; ties break on client id.
    pub fn clients(&self) -> Vec<Client> {
        let mut clients: Vec<Client> = self.clients.values().cloned().collect();
        clients.sort_by(|a, b| {
            let a_key = (Reverse(clock::parse_display(&a.connected_at)), &a.client_id);
            let b_key = (Reverse(clock::parse_display(&b.connected_at)), &b.client_id);
            // Reverse(None) sorts after every Reverse(Some(_))
            a_key.cmp(&b_key)
        });
        clients
    }

    pub fn client(&self, client_id: &str) -> Option<&Client> {
        self.clients.get(client_id)
    }

    pub fn full_log(&self) -> &[LogEntry] {
        &self.full_log
    }

    pub fn dashboard_log(&self) -> &VecDeque<LogEntry> {
        &self.dashboard_log
    }

    pub fn users(&self) -> Vec<User> {
        self.users.values().cloned().collect()
    }

    pub fn config(&self) -> &BrokerConfig {
        &self.config
    }

    pub fn stats(&self) -> &BrokerStats {
        &self.stats
    }

    pub fn status(&self) -> BrokerStatus {
        self.status
    }

    pub fn system_info(&self) -> &SystemInfo {
        &self.system_info
    }

    pub fn selection(&self) -> Option<&str> {
        self.selection.as_deref()
    }
}
