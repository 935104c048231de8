//! The `utils` module provides a collection of utility functions and common
//! definitions used across the dashboard.
//!
//! It centralizes the error type, logging setup, wall-clock display helpers
//! and the lenient field decoders used when reading upstream payloads.

pub mod clock;
pub mod error;
pub mod lenient;
pub mod logging;

pub use error::{DashboardError, Result};
