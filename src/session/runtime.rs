use std::time::Duration;

use serde::Serialize;
use tokio::sync::broadcast;
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender};
use tokio::task::JoinHandle;
use tracing::{debug, info, trace, warn};

use crate::aggregator::{
    AggregatorSettings, Notification, Snapshot, SnapshotKind, StateAggregator,
};
use crate::scroll::{
    ScrollCommand, ScrollMode, ScrollObservation, ScrollRegion, ScrollRegionController,
};
use crate::transport::{
    Command, CommandDispatcher, CommandResponse, SnapshotLoader, StreamEvent,
};
use crate::utils::clock;

/// Collections reloaded from the server after the dashboard is cleared.
pub const REFRESH_AFTER_CLEAR: [SnapshotKind; 3] = [
    SnapshotKind::SystemInfo,
    SnapshotKind::Clients,
    SnapshotKind::Topics,
];

/// One unit of work for the session. Producers are the snapshot loader, the
/// event stream listener, housekeeping and the user.
#[derive(Debug, Clone, PartialEq)]
pub enum WorkItem {
    Snapshot(Snapshot),
    SnapshotFailed { kind: SnapshotKind, error: String },
    Stream(StreamEvent),
    SelectTopic(Option<String>),
    ClearTopicMessages(String),
    Scroll {
        region: ScrollRegion,
        observation: ScrollObservation,
    },
    ToggleAutoScroll(ScrollRegion),
    Command(Command),
    CommandCompleted {
        command: Command,
        response: CommandResponse,
    },
    Tick,
    Shutdown,
}

/// What a renderer receives.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "update", content = "data", rename_all = "snake_case")]
pub enum ViewUpdate {
    Notification(Notification),
    Scroll(ScrollCommand),
    ScrollModeChanged {
        region: ScrollRegion,
        mode: ScrollMode,
    },
    Clock { time: String },
    Alert { message: String },
}

pub struct DashboardSession {
    aggregator: StateAggregator,
    notifications: UnboundedReceiver<Notification>,
    scroll: ScrollRegionController,
    updates: broadcast::Sender<ViewUpdate>,
    dispatcher: Option<(CommandDispatcher, UnboundedSender<WorkItem>)>,
    loader: Option<(SnapshotLoader, UnboundedSender<WorkItem>)>,
}

impl DashboardSession {
    pub fn new(settings: AggregatorSettings, update_capacity: usize) -> Self {
        let mut aggregator = StateAggregator::new(settings);
        let notifications = aggregator.subscribe();
        let (updates, _) = broadcast::channel(update_capacity.max(1));
        Self {
            aggregator,
            notifications,
            scroll: ScrollRegionController::new(),
            updates,
            dispatcher: None,
            loader: None,
        }
    }

    /// Route commands through `dispatcher`; completions come back on `work`.
    pub fn with_dispatcher(
        mut self,
        dispatcher: CommandDispatcher,
        work: UnboundedSender<WorkItem>,
    ) -> Self {
        self.dispatcher = Some((dispatcher, work));
        self
    }

    /// Reload collections through `loader` when needed; results come back
    /// on `work`.
    pub fn with_loader(
        mut self,
        loader: SnapshotLoader,
        work: UnboundedSender<WorkItem>,
    ) -> Self {
        self.loader = Some((loader, work));
        self
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ViewUpdate> {
        self.updates.subscribe()
    }

    pub fn aggregator(&self) -> &StateAggregator {
        &self.aggregator
    }

    pub fn scroll(&self) -> &ScrollRegionController {
        &self.scroll
    }

    /// Drain `work` until it closes or a `Shutdown` arrives.
    pub async fn run(mut self, mut work: UnboundedReceiver<WorkItem>) {
        info!("Dashboard session started");
        while let Some(item) = work.recv().await {
            if !self.handle(item) {
                break;
            }
        }
        info!("Dashboard session ended");
    }

    /// Process one work item to completion. Returns false on shutdown.
    pub fn handle(&mut self, item: WorkItem) -> bool {
        match item {
            WorkItem::Snapshot(snapshot) => self.aggregator.apply_snapshot(snapshot),
            WorkItem::SnapshotFailed { kind, error } => {
                self.alert(format!("Failed to load {}: {error}", kind.name()));
            }
            WorkItem::Stream(event) => self.apply_stream(event),
            WorkItem::SelectTopic(topic) => self.aggregator.select_topic(topic.as_deref()),
            WorkItem::ClearTopicMessages(topic) => self.aggregator.clear_topic_messages(&topic),
            WorkItem::Scroll {
                region,
                observation,
            } => {
                let before = self.scroll.mode(region);
                let mode = self.scroll.observe(region, observation);
                if mode != before {
                    self.publish(ViewUpdate::ScrollModeChanged { region, mode });
                }
            }
            WorkItem::ToggleAutoScroll(region) => {
                let command = self.scroll.toggle(region);
                let mode = self.scroll.mode(region);
                self.publish(ViewUpdate::ScrollModeChanged { region, mode });
                if let Some(command) = command {
                    self.publish(ViewUpdate::Scroll(command));
                }
            }
            WorkItem::Command(command) => self.start_command(command),
            WorkItem::CommandCompleted { command, response } => {
                self.complete_command(command, response)
            }
            WorkItem::Tick => {
                self.publish(ViewUpdate::Clock {
                    time: clock::now_display(),
                });
            }
            WorkItem::Shutdown => {
                info!("Shutdown requested");
                return false;
            }
        }
        self.flush_notifications();
        true
    }

    fn apply_stream(&mut self, event: StreamEvent) {
        match event {
            StreamEvent::Topic(event) => self.aggregator.apply_topic_event(event),
            StreamEvent::Message(event) => self.aggregator.apply_message_event(event),
            StreamEvent::TopicMessage(event) => self.aggregator.append_topic_message(event),
            StreamEvent::Client(event) => self.aggregator.apply_client_event(event),
            StreamEvent::Log(event) => self.aggregator.apply_log_event(event),
            StreamEvent::Snapshot(snapshot) => self.aggregator.apply_snapshot(snapshot),
            StreamEvent::LogsCleared => self.aggregator.clear_logs(),
            StreamEvent::DashboardCleared(response) => {
                if response.success {
                    self.aggregator.clear_dashboard();
                    self.refresh_after_clear();
                } else if let Some(message) = response.failure_message("clear dashboard") {
                    self.alert(message);
                }
            }
        }
    }

    fn start_command(&mut self, command: Command) {
        match &command {
            Command::ClearLogs => self.aggregator.clear_logs(),
            Command::ClearDashboard => {
                self.aggregator.clear_dashboard();
                self.refresh_after_clear();
            }
            _ => {}
        }

        let Some((dispatcher, work)) = &self.dispatcher else {
            warn!(command = command.name(), "No command dispatcher configured");
            self.complete_command(command, CommandResponse::failed("not connected"));
            return;
        };
        let dispatcher = dispatcher.clone();
        let work = work.clone();
        tokio::spawn(async move {
            let response = dispatcher.dispatch(&command).await;
            if work
                .send(WorkItem::CommandCompleted { command, response })
                .is_err()
            {
                debug!("Session closed before command completed");
            }
        });
    }

    fn complete_command(&mut self, command: Command, response: CommandResponse) {
        if let Some(message) = response.failure_message(command.name()) {
            self.alert(message);
            return;
        }
        if let Some(status) = command.resulting_status() {
            self.aggregator.set_broker_status(status);
        }
        if let Command::SaveConfig(config) = command {
            self.aggregator.apply_snapshot(Snapshot::Config(config));
        }
    }

    fn refresh_after_clear(&self) {
        let Some((loader, work)) = &self.loader else {
            debug!("No snapshot loader configured; skipping refresh");
            return;
        };
        let loader = loader.clone();
        let work = work.clone();
        tokio::spawn(async move {
            if let Err(e) = loader.load(&REFRESH_AFTER_CLEAR, &work).await {
                debug!(error = %e, "Session closed during refresh");
            }
        });
    }

    fn alert(&self, message: String) {
        warn!(alert = %message, "User-visible alert");
        self.publish(ViewUpdate::Alert { message });
    }

    /// Publish pending notifications in emission order, each followed by the
    /// scroll commands it caused.
    fn flush_notifications(&mut self) {
        while let Ok(notification) = self.notifications.try_recv() {
            let commands = self.scroll.on_notification(&notification);
            self.publish(ViewUpdate::Notification(notification));
            for command in commands {
                self.publish(ViewUpdate::Scroll(command));
            }
        }
    }

    fn publish(&self, update: ViewUpdate) {
        if self.updates.send(update).is_err() {
            trace!("No view subscribers");
        }
    }
}

/// Send a `Tick` every `period` until the session stops taking work.
pub fn spawn_housekeeping(work: UnboundedSender<WorkItem>, period: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(period);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        loop {
            interval.tick().await;
            if work.send(WorkItem::Tick).is_err() {
                debug!("Housekeeping stopped");
                break;
            }
        }
    })
}
