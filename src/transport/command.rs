use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tokio::sync::mpsc::UnboundedSender;
use tracing::{error, info, warn};
use tungstenite::protocol::Message as WsMessage;
use uuid::Uuid;

use crate::model::{BrokerConfig, BrokerStatus, Permission};
use crate::transport::message::Envelope;
use crate::utils::{DashboardError, Result, lenient};

/// Account details for `add_user`. The password only travels outbound.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NewUser {
    pub username: String,
    pub password: String,
    pub permissions: Vec<Permission>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    StartBroker,
    StopBroker,
    PauseBroker,
    SaveConfig(BrokerConfig),
    AddUser(NewUser),
    DeleteUser { username: String },
    ClearLogs,
    ClearDashboard,
}

impl Command {
    pub fn name(&self) -> &'static str {
        match self {
            Command::StartBroker => "start broker",
            Command::StopBroker => "stop broker",
            Command::PauseBroker => "pause broker",
            Command::SaveConfig(_) => "save config",
            Command::AddUser(_) => "add user",
            Command::DeleteUser { .. } => "delete user",
            Command::ClearLogs => "clear logs",
            Command::ClearDashboard => "clear dashboard",
        }
    }

    /// Broker status after this command succeeds, for broker commands.
    pub fn resulting_status(&self) -> Option<BrokerStatus> {
        match self {
            Command::StartBroker => Some(BrokerStatus::Running),
            Command::StopBroker => Some(BrokerStatus::Stopped),
            Command::PauseBroker => Some(BrokerStatus::Paused),
            _ => None,
        }
    }
}

/// `{success, error?}` as returned by the server.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandResponse {
    #[serde(default, deserialize_with = "lenient::flag_or_default")]
    pub success: bool,
    #[serde(
        default,
        deserialize_with = "lenient::opt_text",
        skip_serializing_if = "Option::is_none"
    )]
    pub error: Option<String>,
}

impl CommandResponse {
    pub fn ok() -> Self {
        Self {
            success: true,
            error: None,
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            success: false,
            error: Some(error.into()),
        }
    }

    /// The alert text for a failed response, `None` on success.
    pub fn failure_message(&self, command_name: &str) -> Option<String> {
        if self.success {
            return None;
        }
        let reason = self.error.as_deref().unwrap_or("unknown error");
        Some(format!("{command_name} failed: {reason}"))
    }
}

/// Sends UI actions to the admin server.
///
/// Broker control and config go over HTTP and wait for a response. User
/// management and clearing go out on the event stream and are considered
/// successful once queued.
#[derive(Debug, Clone)]
pub struct CommandDispatcher {
    http: reqwest::Client,
    base_url: String,
    outbound: UnboundedSender<WsMessage>,
}

impl CommandDispatcher {
    pub fn new(
        http: reqwest::Client,
        base_url: &str,
        outbound: UnboundedSender<WsMessage>,
    ) -> Self {
        Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            outbound,
        }
    }

    /// Never fails: transport errors come back as `success = false`.
    pub async fn dispatch(&self, command: &Command) -> CommandResponse {
        let request_id = Uuid::new_v4();
        info!(%request_id, command = command.name(), "Dispatching command");

        let result = match command {
            Command::StartBroker => self.get("/api/broker/start").await,
            Command::StopBroker => self.get("/api/broker/stop").await,
            Command::PauseBroker => self.get("/api/broker/pause").await,
            Command::SaveConfig(config) => self.post("/api/config", config).await,
            Command::AddUser(user) => self.emit("add_user", json!(user), request_id),
            Command::DeleteUser { username } => {
                self.emit("delete_user", json!({ "username": username }), request_id)
            }
            Command::ClearLogs => self.emit("clear_logs", json!({}), request_id),
            Command::ClearDashboard => self.emit("clear_dashboard", json!({}), request_id),
        };

        match result {
            Ok(response) => {
                if !response.success {
                    warn!(%request_id, error = ?response.error, "Command rejected");
                }
                response
            }
            Err(e) => {
                error!(%request_id, error = %e, "Command failed");
                CommandResponse::failed(e.to_string())
            }
        }
    }

    async fn get(&self, path: &str) -> Result<CommandResponse> {
        let url = format!("{}{}", self.base_url, path);
        let response = self.http.get(&url).send().await?;
        read_response(response, url).await
    }

    async fn post<T: Serialize>(&self, path: &str, body: &T) -> Result<CommandResponse> {
        let url = format!("{}{}", self.base_url, path);
        let response = self.http.post(&url).json(body).send().await?;
        read_response(response, url).await
    }

    fn emit(&self, event: &str, data: Value, request_id: Uuid) -> Result<CommandResponse> {
        let frame = Envelope::new(event, data).to_frame()?;
        self.outbound
            .send(WsMessage::Text(frame.into()))
            .map_err(|_| DashboardError::ChannelClosed("event stream"))?;
        info!(%request_id, event, "Command queued on event stream");
        Ok(CommandResponse::ok())
    }
}

/// A JSON `{success, error?}` body wins when present; otherwise the HTTP
/// status decides.
async fn read_response(response: reqwest::Response, url: String) -> Result<CommandResponse> {
    let status = response.status();
    let body = response.bytes().await?;
    if let Ok(parsed) = serde_json::from_slice::<CommandResponse>(&body) {
        if status.is_success() || !parsed.success {
            return Ok(parsed);
        }
    }
    if status.is_success() {
        Ok(CommandResponse::ok())
    } else {
        Err(DashboardError::Status {
            status: status.as_u16(),
            url,
        })
    }
}
