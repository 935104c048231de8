//! Broker-level records: configuration, runtime statistics and host info.
//!
//! These arrive whole (snapshot or push) and are replaced whole, so they
//! deserialize directly with lenient field decoders and per-field defaults.

use serde::{Deserialize, Serialize};

use crate::utils::lenient;

/// Broker configuration as edited on the settings page.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct BrokerConfig {
    pub broker: ListenerConfig,
    pub mqtt: MqttConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ListenerConfig {
    #[serde(deserialize_with = "lenient::text_or_default")]
    pub host: String,
    #[serde(deserialize_with = "lenient::count_or_default")]
    pub port: u16,
    #[serde(deserialize_with = "lenient::count_or_default")]
    pub max_connections: u64,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 1883,
            max_connections: 100,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MqttConfig {
    #[serde(deserialize_with = "lenient::count_or_default")]
    pub keep_alive: u64,
    #[serde(deserialize_with = "lenient::flag_or_default")]
    pub allow_anonymous: bool,
}

impl Default for MqttConfig {
    fn default() -> Self {
        Self {
            keep_alive: 60,
            allow_anonymous: false,
        }
    }
}

/// Runtime counters reported by the broker.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct BrokerStats {
    #[serde(deserialize_with = "lenient::flag_or_default")]
    pub running: bool,
    #[serde(deserialize_with = "lenient::count_or_default")]
    pub connections: u64,
    #[serde(deserialize_with = "lenient::count_or_default")]
    pub active_topics: u64,
    #[serde(deserialize_with = "lenient::count_or_default")]
    pub messages: u64,
    /// Seconds since the broker started.
    #[serde(deserialize_with = "lenient::count_or_default")]
    pub uptime: u64,
}

impl BrokerStats {
    pub fn uptime_display(&self) -> String {
        format_uptime(self.uptime)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BrokerStatus {
    Running,
    Paused,
    #[default]
    Stopped,
}

impl BrokerStatus {
    pub fn from_running(running: bool) -> Self {
        if running {
            BrokerStatus::Running
        } else {
            BrokerStatus::Stopped
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SystemInfo {
    pub ip_addresses: Vec<InterfaceAddress>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct InterfaceAddress {
    #[serde(deserialize_with = "lenient::text_or_default")]
    pub interface: String,
    #[serde(deserialize_with = "lenient::text_or_default")]
    pub ip: String,
}

/// Render an uptime in seconds as `HH:MM:SS`. Hours are not wrapped at 24.
pub fn format_uptime(seconds: u64) -> String {
    let hours = seconds / 3600;
    let minutes = (seconds % 3600) / 60;
    let secs = seconds % 60;
    format!("{hours:02}:{minutes:02}:{secs:02}")
}
