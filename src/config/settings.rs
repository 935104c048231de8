use std::time::Duration;

use serde::Deserialize;

use crate::aggregator::AggregatorSettings;

/// Top-level configuration settings for the dashboard.
///
/// Includes where the admin server lives and how the session behaves.
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct Settings {
    pub server: ServerSettings,
    pub dashboard: DashboardSettings,
}

/// Where to reach the broker's admin server.
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct ServerSettings {
    /// Base URL for snapshot and command requests.
    pub base_url: String,
    /// WebSocket URL of the push-event stream.
    pub events_url: String,
    pub request_timeout_ms: u64,
}

/// Session behaviour: buffer sizes, timers and logging.
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct DashboardSettings {
    pub message_capacity: usize,
    pub dashboard_log_capacity: usize,
    pub housekeeping_interval_ms: u64,
    pub reconnect_delay_ms: u64,
    pub update_channel_capacity: usize,
    pub auto_select_first_topic: bool,
    pub log_level: String,
}

/// Partial configuration settings loaded from files or environment.
///
/// Allows partial specification of settings. Missing values can be filled using defaults.
#[derive(Debug, Deserialize, Default)]
pub struct PartialSettings {
    pub server: Option<PartialServerSettings>,
    pub dashboard: Option<PartialDashboardSettings>,
}

#[derive(Debug, Deserialize, Default)]
pub struct PartialServerSettings {
    pub base_url: Option<String>,
    pub events_url: Option<String>,
    pub request_timeout_ms: Option<u64>,
}

#[derive(Debug, Deserialize, Default)]
pub struct PartialDashboardSettings {
    pub message_capacity: Option<usize>,
    pub dashboard_log_capacity: Option<usize>,
    pub housekeeping_interval_ms: Option<u64>,
    pub reconnect_delay_ms: Option<u64>,
    pub update_channel_capacity: Option<usize>,
    pub auto_select_first_topic: Option<bool>,
    pub log_level: Option<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            server: ServerSettings {
                base_url: "http://127.0.0.1:8083".to_string(),
                events_url: "ws://127.0.0.1:8083/events".to_string(),
                request_timeout_ms: 5000,
            },
            dashboard: DashboardSettings {
                message_capacity: 100,
                dashboard_log_capacity: 100,
                housekeeping_interval_ms: 1000,
                reconnect_delay_ms: 2000,
                update_channel_capacity: 1024,
                auto_select_first_topic: true,
                log_level: "info".to_string(),
            },
        }
    }
}

impl Settings {
    /// Fill every field missing from `partial` with its default.
    pub fn merged(partial: PartialSettings) -> Self {
        let default = Settings::default();
        let server = partial.server.unwrap_or_default();
        let dashboard = partial.dashboard.unwrap_or_default();

        Settings {
            server: ServerSettings {
                base_url: server.base_url.unwrap_or(default.server.base_url),
                events_url: server.events_url.unwrap_or(default.server.events_url),
                request_timeout_ms: server
                    .request_timeout_ms
                    .unwrap_or(default.server.request_timeout_ms),
            },
            dashboard: DashboardSettings {
                message_capacity: dashboard
                    .message_capacity
                    .unwrap_or(default.dashboard.message_capacity),
                dashboard_log_capacity: dashboard
                    .dashboard_log_capacity
                    .unwrap_or(default.dashboard.dashboard_log_capacity),
                housekeeping_interval_ms: dashboard
                    .housekeeping_interval_ms
                    .unwrap_or(default.dashboard.housekeeping_interval_ms),
                reconnect_delay_ms: dashboard
                    .reconnect_delay_ms
                    .unwrap_or(default.dashboard.reconnect_delay_ms),
                update_channel_capacity: dashboard
                    .update_channel_capacity
                    .unwrap_or(default.dashboard.update_channel_capacity),
                auto_select_first_topic: dashboard
                    .auto_select_first_topic
                    .unwrap_or(default.dashboard.auto_select_first_topic),
                log_level: dashboard.log_level.unwrap_or(default.dashboard.log_level),
            },
        }
    }
}

impl ServerSettings {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}

impl DashboardSettings {
    pub fn housekeeping_interval(&self) -> Duration {
        Duration::from_millis(self.housekeeping_interval_ms.max(1))
    }

    pub fn reconnect_delay(&self) -> Duration {
        Duration::from_millis(self.reconnect_delay_ms)
    }

    pub fn aggregator_settings(&self) -> AggregatorSettings {
        AggregatorSettings {
            message_capacity: self.message_capacity.max(1),
            dashboard_log_capacity: self.dashboard_log_capacity.max(1),
            auto_select_first_topic: self.auto_select_first_topic,
        }
    }
}
