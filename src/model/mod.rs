//! The `model` module defines the records the dashboard displays.
//!
//! These are plain data: the [`StateAggregator`](crate::aggregator::StateAggregator)
//! owns every collection built from them, and the renderer only ever sees
//! them through notifications.

pub mod broker;
pub mod client;
pub mod log;
pub mod message;
pub mod topic;
pub mod user;

pub use broker::{
    BrokerConfig, BrokerStats, BrokerStatus, InterfaceAddress, ListenerConfig, MqttConfig,
    SystemInfo, format_uptime,
};
pub use client::{ANONYMOUS, Client};
pub use log::{LogEntry, LogLevel};
pub use message::{MESSAGE_CAPACITY, Message, MessageBuffer, Qos};
pub use topic::Topic;
pub use user::{Permission, User};
