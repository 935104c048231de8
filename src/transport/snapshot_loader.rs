use std::time::Duration;

use futures::stream::{FuturesUnordered, StreamExt};
use serde_json::Value;
use tokio::sync::mpsc::UnboundedSender;
use tracing::{debug, error, info};

use crate::aggregator::{Snapshot, SnapshotKind};
use crate::session::WorkItem;
use crate::utils::{DashboardError, Result};

/// Endpoint serving the initial state of one collection.
pub fn endpoint(kind: SnapshotKind) -> &'static str {
    match kind {
        SnapshotKind::Config => "/api/config",
        SnapshotKind::Topics => "/api/topics",
        SnapshotKind::Messages => "/api/messages",
        SnapshotKind::Clients => "/api/clients",
        SnapshotKind::Logs => "/api/logs",
        SnapshotKind::Users => "/api/users",
        SnapshotKind::SystemInfo => "/api/system",
        SnapshotKind::Stats => "/api/stats",
    }
}

/// Fetches the initial full view of every collection over HTTP.
#[derive(Debug, Clone)]
pub struct SnapshotLoader {
    http: reqwest::Client,
    base_url: String,
}

impl SnapshotLoader {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self::with_client(http, base_url))
    }

    pub fn with_client(http: reqwest::Client, base_url: &str) -> Self {
        Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn http(&self) -> &reqwest::Client {
        &self.http
    }

    pub async fn fetch(&self, kind: SnapshotKind) -> Result<Snapshot> {
        let url = format!("{}{}", self.base_url, endpoint(kind));
        debug!(kind = kind.name(), url = %url, "Fetching snapshot");

        let response = self.http.get(&url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(DashboardError::Status {
                status: status.as_u16(),
                url,
            });
        }
        let body = response.bytes().await?;
        let value: Value = serde_json::from_slice(&body)?;
        Ok(Snapshot::from_json(kind, value))
    }

    /// Fetch every collection concurrently and forward each result to the
    /// session as soon as it arrives.
    pub async fn load_all(&self, work: &UnboundedSender<WorkItem>) -> Result<()> {
        self.load(&SnapshotKind::ALL, work).await?;
        info!("Initial snapshots loaded");
        Ok(())
    }

    /// Fetch `kinds` concurrently, forwarding a `Snapshot` or `SnapshotFailed`
    /// per kind in completion order.
    pub async fn load(
        &self,
        kinds: &[SnapshotKind],
        work: &UnboundedSender<WorkItem>,
    ) -> Result<()> {
        let mut pending: FuturesUnordered<_> = kinds
            .iter()
            .copied()
            .map(|kind| async move { (kind, self.fetch(kind).await) })
            .collect();

        while let Some((kind, result)) = pending.next().await {
            let item = match result {
                Ok(snapshot) => WorkItem::Snapshot(snapshot),
                Err(e) => {
                    error!(kind = kind.name(), error = %e, "Snapshot fetch failed");
                    WorkItem::SnapshotFailed {
                        kind,
                        error: e.to_string(),
                    }
                }
            };
            work.send(item)
                .map_err(|_| DashboardError::ChannelClosed("session work queue"))?;
        }
        Ok(())
    }
}
