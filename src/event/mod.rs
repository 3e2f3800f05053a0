//! The event propagation layer.

pub mod channel;

pub use channel::{handler, EventChannel, Handler};
