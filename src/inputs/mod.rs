//! Gesture input streams.
//!
//! These convert raw host payloads (wheel, touch) into `start`/`update`/`end`
//! gesture streams carrying delta, accumulated value and velocity. Velocity
//! computation floors the inter-event gap at [`MINIMUM_TICK_TIME_MS`] so a
//! burst of events in one frame cannot produce unbounded velocities.

pub mod scroll;
pub mod touch;

pub use scroll::{ScrollInput, ScrollOptions};
pub use touch::{TouchInput, TouchOptions, TouchTracker};

/// Floor for inter-event time gaps in velocity computation, in milliseconds.
pub const MINIMUM_TICK_TIME_MS: f64 = 8.0;
