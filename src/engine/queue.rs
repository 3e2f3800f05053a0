//! The engine's phase queues.
//!
//! Two kinds of queue back the frame cycle:
//!
//! - [`JobQueue`] — a drained FIFO of one-shot jobs (pre-frame, post-frame
//!   and settle). Draining is re-entrant: jobs pushed while draining run in
//!   the same pass.
//! - [`FrameQueue`] — a persistent membership list of per-frame callbacks.
//!   Callbacks registered once run every frame until explicitly removed.
//!   Each pass executes a snapshot of the membership, so removal mid-pass
//!   takes effect on the next frame, not retroactively.
//!
//! Both are cheap cloneable handles around shared state, so components can
//! hold the specific queue they need without holding the whole engine.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

use super::isolate::run_isolated;

/// A one-shot job on a drained queue.
pub type Job = Box<dyn FnOnce()>;

/// A persistent per-frame callback; removal is by `Rc` pointer identity.
pub type FrameCallback = Rc<RefCell<dyn FnMut()>>;

/// Wraps a closure into a [`FrameCallback`].
pub fn frame_callback<F: FnMut() + 'static>(f: F) -> FrameCallback {
    Rc::new(RefCell::new(f))
}

// =============================================================================
// DRAINED QUEUE
// =============================================================================

/// A FIFO queue of one-shot jobs, fully drained once per phase.
#[derive(Clone, Default)]
pub struct JobQueue {
    jobs: Rc<RefCell<VecDeque<Job>>>,
}

impl JobQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a job to the back of the queue.
    pub fn push<F: FnOnce() + 'static>(&self, job: F) {
        self.jobs.borrow_mut().push_back(Box::new(job));
    }

    /// Runs and removes every job, including jobs pushed during the drain.
    ///
    /// Jobs are popped one at a time so a running job may push more work
    /// without aliasing a live borrow. A panicking job does not stop the
    /// drain.
    pub fn drain(&self) {
        loop {
            let job = self.jobs.borrow_mut().pop_front();
            match job {
                Some(job) => run_isolated("queue job", || job()),
                None => break,
            }
        }
    }

    /// Number of jobs currently queued.
    pub fn len(&self) -> usize {
        self.jobs.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.borrow().is_empty()
    }
}

// =============================================================================
// FRAME QUEUE
// =============================================================================

/// The persistent per-frame callback list.
///
/// Unlike [`JobQueue`], membership survives across frames; this is what
/// distinguishes continuous per-frame recomputation from one-shot reactions.
#[derive(Clone, Default)]
pub struct FrameQueue {
    callbacks: Rc<RefCell<Vec<FrameCallback>>>,
}

impl FrameQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a callback to run every frame, in registration order.
    pub fn push(&self, callback: FrameCallback) {
        self.callbacks.borrow_mut().push(callback);
    }

    /// Removes a callback by identity. Removing an unregistered callback is
    /// a no-op.
    pub fn remove(&self, callback: &FrameCallback) {
        self.callbacks
            .borrow_mut()
            .retain(|c| !Rc::ptr_eq(c, callback));
    }

    /// Whether the callback is currently registered.
    pub fn contains(&self, callback: &FrameCallback) -> bool {
        self.callbacks
            .borrow()
            .iter()
            .any(|c| Rc::ptr_eq(c, callback))
    }

    /// Runs every currently registered callback once.
    ///
    /// The membership is snapshot at the start of the pass: callbacks added
    /// during the pass first run next frame, and a callback removed during
    /// the pass still runs this frame if it had not run yet.
    pub fn run(&self) {
        let snapshot: Vec<FrameCallback> = self.callbacks.borrow().clone();
        for callback in snapshot {
            run_isolated("frame callback", || (callback.borrow_mut())());
        }
    }

    /// Number of registered callbacks.
    pub fn len(&self) -> usize {
        self.callbacks.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.callbacks.borrow().is_empty()
    }
}
