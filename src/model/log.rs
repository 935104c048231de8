use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum LogLevel {
    #[default]
    Info,
    Warning,
    Error,
}

impl LogLevel {
    /// Case-insensitive parse; unknown levels are treated as `INFO`.
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_ascii_uppercase().as_str() {
            "ERROR" | "CRITICAL" => LogLevel::Error,
            "WARNING" | "WARN" => LogLevel::Warning,
            _ => LogLevel::Info,
        }
    }
}

/// One broker log record as shown in the log regions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LogEntry {
    pub time: String,
    pub level: LogLevel,
    pub message: String,
}
