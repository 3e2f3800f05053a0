//! Isolated callback execution.
//!
//! Every listener, queued job and frame callback runs through
//! [`run_isolated`], so a panic in one callback cannot corrupt the rest of
//! the pass it runs in. Failures are reported through `tracing`, never
//! swallowed.

use std::panic::{catch_unwind, AssertUnwindSafe};

/// Runs `f`, catching a panic and reporting it with the given context label.
///
/// The surrounding drain or emit pass continues with its remaining callbacks.
pub(crate) fn run_isolated<F: FnOnce()>(context: &str, f: F) {
    if let Err(err) = catch_unwind(AssertUnwindSafe(f)) {
        let message = if let Some(s) = err.downcast_ref::<&str>() {
            (*s).to_string()
        } else if let Some(s) = err.downcast_ref::<String>() {
            s.clone()
        } else {
            "non-string panic payload".to_string()
        };
        tracing::error!(context, panic = %message, "callback panicked; continuing pass");
    }
}
