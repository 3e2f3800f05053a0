//! Discrete value streams synchronized to the frame cycle.

pub mod size_observable;

pub use size_observable::SizeObservable;
