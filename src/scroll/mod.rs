//! The `scroll` module decides when a scrollable view region should follow
//! new content.
//!
//! Each region is a two-state machine (`following`, `paused`) driven by two
//! inputs: scroll-position observations reported by the view, and content
//! changes reported by the aggregator. It never touches aggregator state.

pub mod controller;

pub use controller::{
    BOTTOM_TOLERANCE_PX, ScrollCommand, ScrollMode, ScrollObservation, ScrollRegion,
    ScrollRegionController, is_at_bottom,
};
