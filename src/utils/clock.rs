//! Wall-clock helpers.
//!
//! Every timestamp the dashboard displays is a local-time string in the same
//! `YYYY-MM-DD HH:MM:SS` form the broker uses in its own log records.

use chrono::{Local, NaiveDateTime};

pub const DISPLAY_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Current local time rendered as a display string.
pub fn now_display() -> String {
    Local::now().format(DISPLAY_FORMAT).to_string()
}

/// Parse a display string back into a comparable instant.
///
/// Returns `None` for anything not in [`DISPLAY_FORMAT`]; callers sort such
/// values after every parseable one.
pub fn parse_display(value: &str) -> Option<NaiveDateTime> {
    NaiveDateTime::parse_from_str(value.trim(), DISPLAY_FORMAT).ok()
}
