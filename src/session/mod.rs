//! The `session` module runs one dashboard session.
//!
//! A [`DashboardSession`] owns the state aggregator and the scroll-region
//! controller and processes [`WorkItem`]s strictly one at a time. Every
//! change is published to renderers as a [`ViewUpdate`].

pub mod input;
pub mod runtime;

pub use input::parse_line;
pub use runtime::{
    DashboardSession, REFRESH_AFTER_CLEAR, ViewUpdate, WorkItem, spawn_housekeeping,
};
