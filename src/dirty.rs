//! Dirty/lock accounting for values with multiple concurrent drivers.
//!
//! A [`DirtyTracker`] turns N overlapping `start`/`end` pairs arriving on an
//! input channel into exactly one logical `start`/`end` pair on an output
//! channel, and tracks whether the owning value needs recomputation.
//!
//! The state machine:
//!
//! - `start` while unlocked → value becomes dirty, the logical `start` is
//!   emitted downstream; every `start` takes a lock.
//! - every `end` releases a lock; the release that brings the count to zero
//!   while dirty clears the flag and emits the logical `end`.
//! - a read while dirty and unlocked may settle eagerly via
//!   [`settle_after_read`](DirtyTracker::settle_after_read), so consumers
//!   never observe a stale-but-settled value.
//!
//! Lock underflow (an `end` with no matching `start`) clamps at zero and is
//! reported through `tracing`; the tracker stays usable.

use std::cell::Cell;
use std::rc::Rc;

use crate::event::{handler, EventChannel, Handler};
use crate::types::{EventType, Payload};

#[derive(Default)]
struct TrackerState {
    dirty: Cell<bool>,
    lock: Cell<u32>,
}

/// Reference-counted dirty state shared between an input channel's lifecycle
/// events and the owning value's read path.
#[derive(Clone, Default)]
pub struct DirtyTracker {
    state: Rc<TrackerState>,
    output: EventChannel,
    start_handler: Option<Handler>,
    end_handler: Option<Handler>,
}

impl DirtyTracker {
    /// Installs `start`/`end` handlers on `input` and emits the single
    /// logical `start`/`end` pair on `output`.
    ///
    /// Handler order matters and mirrors the protocol exactly: `start`
    /// checks the lock count before incrementing it, `end` decrements before
    /// checking, so back-to-back transitions produce one bracket, not two.
    pub fn wire(input: &EventChannel, output: &EventChannel) -> Self {
        let state = Rc::new(TrackerState::default());

        let start_handler = {
            let state = state.clone();
            let output = output.clone();
            handler(move |payload: &Payload| {
                if state.lock.get() == 0 {
                    state.dirty.set(true);
                    output.emit(EventType::Start, payload);
                }
                state.lock.set(state.lock.get() + 1);
            })
        };

        let end_handler = {
            let state = state.clone();
            let output = output.clone();
            handler(move |payload: &Payload| {
                match state.lock.get().checked_sub(1) {
                    Some(remaining) => state.lock.set(remaining),
                    None => {
                        tracing::warn!("lock underflow: end without matching start");
                    }
                }
                if state.lock.get() == 0 && state.dirty.get() {
                    state.dirty.set(false);
                    output.emit(EventType::End, payload);
                }
            })
        };

        input.on(EventType::Start, &start_handler);
        input.on(EventType::End, &end_handler);

        Self {
            state,
            output: output.clone(),
            start_handler: Some(start_handler),
            end_handler: Some(end_handler),
        }
    }

    /// Whether the tracked value currently needs recomputation.
    pub fn is_dirty(&self) -> bool {
        self.state.dirty.get()
    }

    /// Number of outstanding `start`s without a matching `end`.
    pub fn lock_count(&self) -> u32 {
        self.state.lock.get()
    }

    /// `!dirty && lock == 0`.
    pub fn is_settled(&self) -> bool {
        !self.state.dirty.get() && self.state.lock.get() == 0
    }

    /// Marks the value dirty directly, emitting the logical `start` if it
    /// was settled. Used by owners whose sources change without a lifecycle
    /// event (constant writes).
    pub fn mark_dirty(&self) {
        if !self.state.dirty.get() && self.state.lock.get() == 0 {
            self.state.dirty.set(true);
            self.output.emit(EventType::Start, &Payload::Empty);
        } else {
            self.state.dirty.set(true);
        }
    }

    /// Takes a permanent lock. Used for computed sources that must be
    /// re-evaluated on every read: the value stays dirty, recomputes each
    /// `get`, and never emits a premature logical `end`.
    pub fn lock(&self) {
        if !self.state.dirty.get() && self.state.lock.get() == 0 {
            self.state.dirty.set(true);
            self.output.emit(EventType::Start, &Payload::Empty);
        } else {
            self.state.dirty.set(true);
        }
        self.state.lock.set(self.state.lock.get() + 1);
    }

    /// Settles eagerly after a recompute-on-read: when the value is dirty
    /// but no locks are outstanding, clears the flag and emits the logical
    /// `end`. Returns whether settling happened.
    pub fn settle_after_read(&self) -> bool {
        if self.state.dirty.get() && self.state.lock.get() == 0 {
            self.state.dirty.set(false);
            self.output.emit(EventType::End, &Payload::Empty);
            true
        } else {
            false
        }
    }

    /// Removes the wired handlers from `input`. The tracker keeps its state
    /// but stops reacting to the channel's lifecycle events.
    pub fn unwire(&self, input: &EventChannel) {
        if let Some(h) = &self.start_handler {
            input.off(EventType::Start, h);
        }
        if let Some(h) = &self.end_handler {
            input.off(EventType::End, h);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    fn setup() -> (EventChannel, EventChannel, DirtyTracker, Rc<RefCell<Vec<EventType>>>) {
        let input = EventChannel::new();
        let output = EventChannel::new();
        let tracker = DirtyTracker::wire(&input, &output);
        let log = Rc::new(RefCell::new(Vec::new()));
        for ty in [EventType::Start, EventType::End] {
            let log = log.clone();
            output.on(ty, &handler(move |_| log.borrow_mut().push(ty)));
        }
        (input, output, tracker, log)
    }

    #[test]
    fn test_single_start_end_brackets_once() {
        let (input, _output, tracker, log) = setup();
        input.emit(EventType::Start, &Payload::Empty);
        assert!(tracker.is_dirty());
        assert_eq!(tracker.lock_count(), 1);
        input.emit(EventType::End, &Payload::Empty);
        assert!(tracker.is_settled());
        assert_eq!(*log.borrow(), vec![EventType::Start, EventType::End]);
    }

    #[test]
    fn test_overlapping_starts_emit_one_logical_pair() {
        let (input, _output, tracker, log) = setup();
        for _ in 0..3 {
            input.emit(EventType::Start, &Payload::Empty);
        }
        assert_eq!(tracker.lock_count(), 3);
        for _ in 0..2 {
            input.emit(EventType::End, &Payload::Empty);
        }
        assert!(tracker.is_dirty(), "still locked after 2 of 3 ends");
        assert_eq!(*log.borrow(), vec![EventType::Start]);

        input.emit(EventType::End, &Payload::Empty);
        assert!(tracker.is_settled());
        assert_eq!(*log.borrow(), vec![EventType::Start, EventType::End]);
    }

    #[test]
    fn test_back_to_back_sequences_bracket_separately() {
        let (input, _output, _tracker, log) = setup();
        for _ in 0..2 {
            input.emit(EventType::Start, &Payload::Empty);
            input.emit(EventType::End, &Payload::Empty);
        }
        assert_eq!(
            *log.borrow(),
            vec![EventType::Start, EventType::End, EventType::Start, EventType::End]
        );
    }

    #[test]
    fn test_underflow_clamps_at_zero() {
        let (input, _output, tracker, log) = setup();
        input.emit(EventType::End, &Payload::Empty);
        assert_eq!(tracker.lock_count(), 0);
        assert!(!tracker.is_dirty());
        assert!(log.borrow().is_empty());

        // Still usable afterwards.
        input.emit(EventType::Start, &Payload::Empty);
        input.emit(EventType::End, &Payload::Empty);
        assert_eq!(*log.borrow(), vec![EventType::Start, EventType::End]);
    }

    #[test]
    fn test_mark_dirty_emits_start_once() {
        let (_input, _output, tracker, log) = setup();
        tracker.mark_dirty();
        tracker.mark_dirty();
        assert!(tracker.is_dirty());
        assert_eq!(*log.borrow(), vec![EventType::Start]);
    }

    #[test]
    fn test_settle_after_read_when_unlocked() {
        let (_input, _output, tracker, log) = setup();
        tracker.mark_dirty();
        assert!(tracker.settle_after_read());
        assert!(tracker.is_settled());
        assert_eq!(*log.borrow(), vec![EventType::Start, EventType::End]);
        assert!(!tracker.settle_after_read(), "second settle is a no-op");
    }

    #[test]
    fn test_settle_after_read_blocked_while_locked() {
        let (input, _output, tracker, log) = setup();
        input.emit(EventType::Start, &Payload::Empty);
        assert!(!tracker.settle_after_read());
        assert!(tracker.is_dirty());
        assert_eq!(*log.borrow(), vec![EventType::Start]);
    }

    #[test]
    fn test_permanent_lock_keeps_value_dirty() {
        let (_input, _output, tracker, log) = setup();
        tracker.lock();
        assert!(tracker.is_dirty());
        assert!(!tracker.settle_after_read());
        assert_eq!(*log.borrow(), vec![EventType::Start]);
    }

    #[test]
    fn test_unwire_stops_tracking() {
        let (input, _output, tracker, log) = setup();
        tracker.unwire(&input);
        input.emit(EventType::Start, &Payload::Empty);
        assert!(!tracker.is_dirty());
        assert!(log.borrow().is_empty());
    }
}
