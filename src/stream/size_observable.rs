//! A discrete resize stream.
//!
//! Writes are frame-deferred: [`set`](SizeObservable::set) queues the change
//! for the next pre-frame drain, where it is emitted as `resize`, and queues
//! a second announcement from the settle queue of the same frame. The double
//! emission lets size-dependent layout that runs during the frame observe
//! the change again after commit; consumers whose commits are idempotent
//! absorb the duplicate.

use std::cell::Cell;
use std::rc::Rc;

use crate::engine::{Engine, JobQueue};
use crate::event::EventChannel;
use crate::types::{EventType, Payload};

struct SizeInner {
    pre_frame: JobQueue,
    settle: JobQueue,
    value: Cell<[f64; 2]>,
    output: EventChannel,
}

/// A two-element size whose changes are announced on the frame boundary.
#[derive(Clone)]
pub struct SizeObservable {
    inner: Rc<SizeInner>,
}

impl SizeObservable {
    pub fn new(engine: &Engine, initial: [f64; 2]) -> Self {
        Self {
            inner: Rc::new(SizeInner {
                pre_frame: engine.pre_frame_queue(),
                settle: engine.settle_queue(),
                value: Cell::new(initial),
                output: EventChannel::new(),
            }),
        }
    }

    /// The current size. Reflects a pending [`set`](Self::set) only after
    /// the pre-frame drain has run.
    pub fn get(&self) -> [f64; 2] {
        self.inner.value.get()
    }

    /// The `resize` channel.
    pub fn output(&self) -> EventChannel {
        self.inner.output.clone()
    }

    /// Queues a size change for the next frame.
    ///
    /// The value is written and emitted at the pre-frame drain, then
    /// re-announced once from the same frame's settle queue.
    pub fn set(&self, size: [f64; 2]) {
        let inner = self.inner.clone();
        self.inner.pre_frame.push(move || {
            inner.value.set(size);
            let payload = Payload::Size(size);
            inner.output.emit(EventType::Resize, &payload);
            let output = inner.output.clone();
            inner
                .settle
                .push(move || output.emit(EventType::Resize, &payload));
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::handler;
    use std::cell::RefCell;

    fn setup() -> (Engine, SizeObservable, Rc<RefCell<Vec<[f64; 2]>>>) {
        let engine = Engine::new();
        let size = SizeObservable::new(&engine, [0.0, 0.0]);
        let log = Rc::new(RefCell::new(Vec::new()));
        {
            let log = log.clone();
            size.output().on(
                EventType::Resize,
                &handler(move |payload| {
                    if let Payload::Size(s) = payload {
                        log.borrow_mut().push(*s);
                    }
                }),
            );
        }
        (engine, size, log)
    }

    #[test]
    fn test_set_is_deferred_to_the_frame() {
        let (engine, size, log) = setup();
        size.set([100.0, 50.0]);
        assert_eq!(size.get(), [0.0, 0.0]);
        assert!(log.borrow().is_empty());

        engine.step();
        assert_eq!(size.get(), [100.0, 50.0]);
    }

    #[test]
    fn test_change_is_announced_twice_in_one_frame() {
        let (engine, size, log) = setup();
        size.set([100.0, 50.0]);
        engine.step();
        assert_eq!(*log.borrow(), vec![[100.0, 50.0], [100.0, 50.0]]);

        engine.step();
        assert_eq!(log.borrow().len(), 2, "quiet frames announce nothing");
    }

    #[test]
    fn test_last_write_in_a_frame_wins() {
        let (engine, size, log) = setup();
        size.set([10.0, 10.0]);
        size.set([20.0, 20.0]);
        engine.step();
        assert_eq!(size.get(), [20.0, 20.0]);
        assert_eq!(
            *log.borrow(),
            vec![[10.0, 10.0], [20.0, 20.0], [10.0, 10.0], [20.0, 20.0]]
        );
    }
}
