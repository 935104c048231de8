use std::collections::HashMap;

use serde::Serialize;
use tracing::debug;

use crate::aggregator::Notification;

/// Distance from the bottom, in pixels, that still counts as "at the bottom".
pub const BOTTOM_TOLERANCE_PX: f64 = 5.0;

/// Whether a view scrolled to `scroll_top` is showing its last line.
pub fn is_at_bottom(scroll_height: f64, scroll_top: f64, client_height: f64) -> bool {
    scroll_height - scroll_top <= client_height + BOTTOM_TOLERANCE_PX
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ScrollRegion {
    FullLog,
    DashboardLog,
    TopicMessages,
}

impl ScrollRegion {
    pub const ALL: [ScrollRegion; 3] = [
        ScrollRegion::FullLog,
        ScrollRegion::DashboardLog,
        ScrollRegion::TopicMessages,
    ];

    /// Regions whose content grows because of `notification`.
    pub fn affected_by(notification: &Notification) -> &'static [ScrollRegion] {
        match notification {
            Notification::LogAppended { .. } | Notification::LogsReplaced { .. } => {
                &[ScrollRegion::FullLog, ScrollRegion::DashboardLog]
            }
            Notification::MessageAppended { .. } | Notification::TopicSelected { .. } => {
                &[ScrollRegion::TopicMessages]
            }
            _ => &[],
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            ScrollRegion::FullLog => "full_log",
            ScrollRegion::DashboardLog => "dashboard_log",
            ScrollRegion::TopicMessages => "topic_messages",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        ScrollRegion::ALL
            .into_iter()
            .find(|region| region.name() == raw.trim())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ScrollMode {
    #[default]
    Following,
    Paused,
}

/// One scroll event as seen by the view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScrollObservation {
    pub is_at_bottom: bool,
    /// False when the scroll was caused by a scroll-to-bottom command.
    pub user_initiated: bool,
}

impl ScrollObservation {
    pub fn user(is_at_bottom: bool) -> Self {
        Self {
            is_at_bottom,
            user_initiated: true,
        }
    }

    pub fn programmatic(is_at_bottom: bool) -> Self {
        Self {
            is_at_bottom,
            user_initiated: false,
        }
    }

    pub fn from_metrics(
        scroll_height: f64,
        scroll_top: f64,
        client_height: f64,
        user_initiated: bool,
    ) -> Self {
        Self {
            is_at_bottom: is_at_bottom(scroll_height, scroll_top, client_height),
            user_initiated,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "command", rename_all = "snake_case")]
pub enum ScrollCommand {
    ScrollToBottom { region: ScrollRegion },
}

impl ScrollCommand {
    pub fn region(&self) -> ScrollRegion {
        match self {
            ScrollCommand::ScrollToBottom { region } => *region,
        }
    }
}

/// Per-region follow/pause state for one dashboard session.
#[derive(Debug, Default)]
pub struct ScrollRegionController {
    modes: HashMap<ScrollRegion, ScrollMode>,
}

impl ScrollRegionController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mode(&self, region: ScrollRegion) -> ScrollMode {
        self.modes.get(&region).copied().unwrap_or_default()
    }

    pub fn is_following(&self, region: ScrollRegion) -> bool {
        self.mode(region) == ScrollMode::Following
    }

    fn set_mode(&mut self, region: ScrollRegion, mode: ScrollMode) {
        let previous = self.modes.insert(region, mode).unwrap_or_default();
        if previous != mode {
            debug!(region = region.name(), ?mode, "Scroll mode changed");
        }
    }

    /// Apply a scroll-position observation and return the resulting mode.
    ///
    /// Reaching the bottom always resumes following. Leaving it only pauses
    /// when the user did the scrolling.
    pub fn observe(&mut self, region: ScrollRegion, observation: ScrollObservation) -> ScrollMode {
        if observation.is_at_bottom {
            self.set_mode(region, ScrollMode::Following);
        } else if observation.user_initiated {
            self.set_mode(region, ScrollMode::Paused);
        }
        self.mode(region)
    }

    /// New content landed in `region`.
    pub fn content_changed(&self, region: ScrollRegion) -> Option<ScrollCommand> {
        self.is_following(region)
            .then_some(ScrollCommand::ScrollToBottom { region })
    }

    /// One command per affected region that is following.
    pub fn on_notification(&self, notification: &Notification) -> Vec<ScrollCommand> {
        ScrollRegion::affected_by(notification)
            .iter()
            .filter_map(|region| self.content_changed(*region))
            .collect()
    }

    /// Flip the mode of `region`. Switching to following scrolls to the
    /// bottom straight away.
    pub fn toggle(&mut self, region: ScrollRegion) -> Option<ScrollCommand> {
        match self.mode(region) {
            ScrollMode::Following => {
                self.set_mode(region, ScrollMode::Paused);
                None
            }
            ScrollMode::Paused => {
                self.set_mode(region, ScrollMode::Following);
                Some(ScrollCommand::ScrollToBottom { region })
            }
        }
    }
}
