//! Change notifications
//!
//! Each variant names one view fragment and carries just enough data to
//! redraw it. Incremental variants (`TopicAdded`, `TopicCountChanged`,
//! `MessageAppended`, `LogAppended`) carry a single record; the `*Replaced`
//! and `*Changed` variants carry the full collection because they follow a
//! whole-collection swap or a low-frequency change.
//!
//! Serialized as `{"kind": "<snake_case variant>", ...fields}` for renderers
//! that live outside the process.

use serde::Serialize;

use crate::model::{
    BrokerConfig, BrokerStats, BrokerStatus, Client, LogEntry, Message, SystemInfo, Topic, User,
};

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Notification {
    /// A topic seen for the first time. `index` is its position in the
    /// name-sorted topic list, so a renderer can insert one row.
    TopicAdded {
        topic: String,
        count: u64,
        index: usize,
    },
    TopicCountChanged {
        topic: String,
        count: u64,
    },
    /// Topics snapshot applied; sorted by name.
    TopicsReplaced {
        topics: Vec<Topic>,
    },
    /// A message for the selected topic. Never sent for unselected topics.
    MessageAppended {
        topic: String,
        message: Message,
    },
    /// Full buffer replay for the newly selected topic.
    TopicSelected {
        topic: String,
        messages: Vec<Message>,
    },
    SelectionCleared,
    /// Messages snapshot applied. `message_count` is the total across topics.
    MessagesReplaced {
        message_count: usize,
    },
    /// Client table changed; newest connection first.
    ClientsChanged {
        clients: Vec<Client>,
    },
    LogAppended {
        entry: LogEntry,
    },
    /// Logs snapshot applied; the full-log region contents.
    LogsReplaced {
        entries: Vec<LogEntry>,
    },
    LogsCleared,
    StatsChanged {
        stats: BrokerStats,
    },
    BrokerStatusChanged {
        status: BrokerStatus,
    },
    SystemInfoChanged {
        info: SystemInfo,
    },
    UsersChanged {
        users: Vec<User>,
    },
    ConfigChanged {
        config: BrokerConfig,
    },
    DashboardCleared,
}

impl Notification {
    pub fn kind(&self) -> &'static str {
        match self {
            Notification::TopicAdded { .. } => "topic_added",
            Notification::TopicCountChanged { .. } => "topic_count_changed",
            Notification::TopicsReplaced { .. } => "topics_replaced",
            Notification::MessageAppended { .. } => "message_appended",
            Notification::TopicSelected { .. } => "topic_selected",
            Notification::SelectionCleared => "selection_cleared",
            Notification::MessagesReplaced { .. } => "messages_replaced",
            Notification::ClientsChanged { .. } => "clients_changed",
            Notification::LogAppended { .. } => "log_appended",
            Notification::LogsReplaced { .. } => "logs_replaced",
            Notification::LogsCleared => "logs_cleared",
            Notification::StatsChanged { .. } => "stats_changed",
            Notification::BrokerStatusChanged { .. } => "broker_status_changed",
            Notification::SystemInfoChanged { .. } => "system_info_changed",
            Notification::UsersChanged { .. } => "users_changed",
            Notification::ConfigChanged { .. } => "config_changed",
            Notification::DashboardCleared => "dashboard_cleared",
        }
    }
}
