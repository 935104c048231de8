//! Line-oriented user input for the terminal front end.
//!
//! One action per line, words separated by whitespace:
//!
//! ```text
//! select <topic>             unselect
//! clear-messages <topic>     toggle-scroll <region>
//! scroll <region> bottom|up  start | stop | pause
//! clear-logs                 clear-dashboard
//! add-user <name> <password> [read,write,admin]
//! delete-user <name>         save-config <json>
//! quit
//! ```

use tracing::warn;

use crate::model::{BrokerConfig, Permission};
use crate::scroll::{ScrollObservation, ScrollRegion};
use crate::session::WorkItem;
use crate::transport::{Command, NewUser};

/// Parse one input line. Blank and unrecognised lines yield `None`.
pub fn parse_line(line: &str) -> Option<WorkItem> {
    let line = line.trim();
    let (verb, rest) = match line.split_once(char::is_whitespace) {
        Some((verb, rest)) => (verb, rest.trim()),
        None => (line, ""),
    };
    let mut args = rest.split_whitespace();

    let item = match verb {
        "" => return None,
        "select" if !rest.is_empty() => WorkItem::SelectTopic(Some(rest.to_string())),
        "unselect" => WorkItem::SelectTopic(None),
        "clear-messages" if !rest.is_empty() => WorkItem::ClearTopicMessages(rest.to_string()),
        "toggle-scroll" => WorkItem::ToggleAutoScroll(region(args.next())?),
        "scroll" => {
            let region = region(args.next())?;
            let is_at_bottom = match args.next() {
                Some("bottom") => true,
                Some("up") => false,
                _ => return invalid(line),
            };
            WorkItem::Scroll {
                region,
                observation: ScrollObservation::user(is_at_bottom),
            }
        }
        "start" => WorkItem::Command(Command::StartBroker),
        "stop" => WorkItem::Command(Command::StopBroker),
        "pause" => WorkItem::Command(Command::PauseBroker),
        "clear-logs" => WorkItem::Command(Command::ClearLogs),
        "clear-dashboard" => WorkItem::Command(Command::ClearDashboard),
        "add-user" => {
            let (Some(username), Some(password)) = (args.next(), args.next()) else {
                return invalid(line);
            };
            let permissions = args
                .next()
                .unwrap_or("read")
                .split(',')
                .filter_map(Permission::parse)
                .collect();
            WorkItem::Command(Command::AddUser(NewUser {
                username: username.to_string(),
                password: password.to_string(),
                permissions,
            }))
        }
        "delete-user" if !rest.is_empty() => WorkItem::Command(Command::DeleteUser {
            username: rest.to_string(),
        }),
        "save-config" => match serde_json::from_str::<BrokerConfig>(rest) {
            Ok(config) => WorkItem::Command(Command::SaveConfig(config)),
            Err(e) => {
                warn!(error = %e, "Invalid config JSON");
                return None;
            }
        },
        "quit" | "exit" => WorkItem::Shutdown,
        _ => return invalid(line),
    };
    Some(item)
}

fn region(raw: Option<&str>) -> Option<ScrollRegion> {
    let parsed = raw.and_then(ScrollRegion::parse);
    if parsed.is_none() {
        warn!(region = ?raw, "Unknown scroll region");
    }
    parsed
}

fn invalid(line: &str) -> Option<WorkItem> {
    warn!(input = line, "Unrecognised input");
    None
}
