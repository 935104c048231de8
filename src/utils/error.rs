//! The `error` module defines the error type used by the I/O edges of the
//! dashboard: the snapshot loader, the event stream listener, the command
//! dispatcher and configuration loading.
//!
//! The state aggregator and the scroll-region controller never return errors.
//! Malformed input is normalized there instead.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum DashboardError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("unexpected HTTP status {status} from {url}")]
    Status { status: u16, url: String },

    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tungstenite::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("{0} channel closed")]
    ChannelClosed(&'static str),
}

pub type Result<T> = std::result::Result<T, DashboardError>;
