//! # cadence
//!
//! Frame-synchronized reactive scene runtime for Rust.
//!
//! A graph of producer/consumer nodes (event sources, derived streams,
//! transitionable values) whose recomputation is synchronized to discrete
//! frames driven by one explicit [`Engine`](engine::Engine).
//!
//! ## Architecture
//!
//! Every frame walks the same cycle:
//! ```text
//! injected input → pre-frame drain → frame queue → post-frame drain
//!                → commit (contexts, then roots) → settle drain
//! ```
//!
//! Raw platform events enter through a single injection point and only
//! become observable at the next pre-frame drain. Values with several
//! concurrent drivers keep themselves consistent through the dirty/lock
//! protocol: overlapping `start`/`end` lifecycles are reference-counted into
//! one logical bracket, and dirty values recompute on read.
//!
//! ## Modules
//!
//! - [`types`] - Event types and payloads
//! - [`event`] - Publish/subscribe channels with lazy upstream forwarding
//! - [`engine`] - The phased frame scheduler
//! - [`dirty`] - Dirty/lock accounting for multi-driver values
//! - [`timer`] - Frame-synchronized timers and debouncing
//! - [`transition`] - Transitioning values and the composed transform
//! - [`stream`] - Frame-deferred value streams
//! - [`root`] - Render roots and commit targets
//! - [`inputs`] - Wheel and touch gesture streams
//! - [`host`] - Crossterm event pump

pub mod dirty;
pub mod engine;
pub mod event;
pub mod host;
pub mod inputs;
pub mod root;
pub mod stream;
pub mod timer;
pub mod transform;
pub mod transition;
pub mod types;

// Re-export commonly used items
pub use types::*;

pub use engine::{current_phase, frame_callback, Engine, FrameCallback, Phase};

pub use event::{handler, EventChannel, Handler};

pub use dirty::DirtyTracker;

pub use transform::{Transform, TransformComponents};

pub use transition::{SourceNode, Transitionable, TransitionableTransform, ValueSource};

pub use stream::SizeObservable;

pub use root::{RenderRoot, RenderTarget, SceneRoot};

pub use inputs::{
    ScrollInput, ScrollOptions, TouchInput, TouchOptions, TouchTracker, MINIMUM_TICK_TIME_MS,
};

pub use host::Host;
