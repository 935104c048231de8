//! # PopSub Dashboard
//!
//! `popsub_dashboard` is the live-state layer of a monitoring dashboard for a
//! message broker. It reconciles a one-shot snapshot fetch and a continuous
//! push-event stream into one bounded in-memory model, and turns every change
//! into a minimal, scroll-aware view update.
//!
//! ## Core Modules
//!
//! - `aggregator`: The canonical state (topics, per-topic message buffers, clients, logs, users) and its change notifications.
//! - `scroll`: Follow/pause state for each scrollable view region.
//! - `session`: The single-threaded runtime that drives the aggregator one work item at a time.
//! - `transport`: The event stream listener, snapshot loader and command dispatcher.
//! - `config`: Handles loading and managing dashboard configuration.
//! - `model`: Plain records shown on the dashboard.
//! - `utils`: Shared utilities such as error handling and logging.

pub mod aggregator;
pub mod config;
pub mod model;
pub mod scroll;
pub mod session;
pub mod transport;
pub mod utils;
