//! CLI for the PopSub dashboard
//!
//! Connects to a broker's admin server, keeps the live dashboard state and
//! prints every view update to stdout as one JSON object per line. Actions
//! are read from stdin, one per line (see `session::input`).

use clap::Parser;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::broadcast::{self, error::RecvError};
use tokio::sync::mpsc::{self, UnboundedSender};
use tracing::{error, info, warn};

use popsub_dashboard::config::{Settings, load_config};
use popsub_dashboard::session::{
    DashboardSession, ViewUpdate, WorkItem, parse_line, spawn_housekeeping,
};
use popsub_dashboard::transport::{CommandDispatcher, EventStreamListener, SnapshotLoader};
use popsub_dashboard::utils::{Result, logging};

#[derive(Parser)]
#[command(name = "popsub-dashboard", about = "Live dashboard for a PopSub broker")]
struct Args {
    /// Base URL of the admin server (overrides `server.base_url`)
    #[arg(long)]
    base_url: Option<String>,

    /// WebSocket URL of the event stream (overrides `server.events_url`)
    #[arg(long)]
    events_url: Option<String>,

    /// Log level: error, warn, info, debug or trace
    #[arg(long)]
    log_level: Option<String>,
}

#[tokio::main]
async fn main() {
    let _ = dotenvy::dotenv();
    let args = Args::parse();

    let settings = match load_config() {
        Ok(settings) => settings,
        Err(e) => {
            logging::init("info");
            error!("Failed to load configuration: {}", e);
            std::process::exit(1);
        }
    };
    let settings = apply_overrides(settings, args);
    logging::init(&settings.dashboard.log_level);

    if let Err(e) = run(settings).await {
        error!("Dashboard failed: {}", e);
        std::process::exit(1);
    }
}

fn apply_overrides(mut settings: Settings, args: Args) -> Settings {
    if let Some(base_url) = args.base_url {
        settings.server.base_url = base_url;
    }
    if let Some(events_url) = args.events_url {
        settings.server.events_url = events_url;
    }
    if let Some(log_level) = args.log_level {
        settings.dashboard.log_level = log_level;
    }
    settings
}

async fn run(settings: Settings) -> Result<()> {
    info!(
        base_url = %settings.server.base_url,
        events_url = %settings.server.events_url,
        "Starting dashboard"
    );

    let (work_tx, work_rx) = mpsc::unbounded_channel();
    let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();

    let loader = SnapshotLoader::new(&settings.server.base_url, settings.server.request_timeout())?;
    let dispatcher =
        CommandDispatcher::new(loader.http().clone(), &settings.server.base_url, outbound_tx);
    let session = DashboardSession::new(
        settings.dashboard.aggregator_settings(),
        settings.dashboard.update_channel_capacity,
    )
    .with_dispatcher(dispatcher, work_tx.clone())
    .with_loader(loader.clone(), work_tx.clone());

    tokio::spawn(render(session.subscribe()));

    let listener = EventStreamListener::new(
        &settings.server.events_url,
        settings.dashboard.reconnect_delay(),
    );
    tokio::spawn(listener.run(work_tx.clone(), outbound_rx));

    let loader_tx = work_tx.clone();
    tokio::spawn(async move {
        if let Err(e) = loader.load_all(&loader_tx).await {
            warn!("Snapshot loading stopped: {}", e);
        }
    });

    spawn_housekeeping(work_tx.clone(), settings.dashboard.housekeeping_interval());
    tokio::spawn(read_input(work_tx.clone()));

    tokio::select! {
        _ = session.run(work_rx) => {
            info!("Session finished.");
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Shutdown signal received. Exiting gracefully.");
        }
    }
    Ok(())
}

/// Print every view update as a JSON line.
async fn render(mut updates: broadcast::Receiver<ViewUpdate>) {
    loop {
        match updates.recv().await {
            Ok(update) => match serde_json::to_string(&update) {
                Ok(line) => println!("{line}"),
                Err(e) => error!("Failed to encode view update: {}", e),
            },
            Err(RecvError::Lagged(skipped)) => {
                warn!(skipped, "Renderer fell behind, view updates dropped");
            }
            Err(RecvError::Closed) => break,
        }
    }
}

async fn read_input(work: UnboundedSender<WorkItem>) {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        match lines.next_line().await {
            Ok(Some(line)) => {
                if let Some(item) = parse_line(&line) {
                    if work.send(item).is_err() {
                        break;
                    }
                }
            }
            Ok(None) => {
                info!("Input closed");
                break;
            }
            Err(e) => {
                error!("Failed to read input: {}", e);
                break;
            }
        }
    }
}
