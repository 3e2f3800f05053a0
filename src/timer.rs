//! Frame-synchronized timers.
//!
//! Every timer here is a per-frame callback on the engine's frame queue:
//! nothing fires between frames, and [`clear`] gives the same immediate
//! cancellation guarantee as removing any frame callback. Frame-counted
//! wrappers ([`after`], [`every`]) count ticks; wall-clock wrappers
//! ([`set_timeout`], [`set_interval`]) compare the engine clock against a
//! captured origin, so they fire on the first frame at or past the deadline,
//! never before.
//!
//! # Example
//!
//! ```
//! use cadence::engine::Engine;
//! use cadence::timer;
//!
//! let engine = Engine::new();
//! let pending = timer::after(&engine, 2, || println!("two frames later"));
//! engine.step();
//! timer::clear(&engine, &pending);   // never fires
//! ```

use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

use crate::engine::{frame_callback, Engine, FrameCallback};

/// Runs `f` once, `frames` ticks from now, then removes itself.
///
/// Returns the underlying frame callback for use with [`clear`].
pub fn after<F: FnOnce() + 'static>(engine: &Engine, frames: u32, f: F) -> FrameCallback {
    let counter = Cell::new(0u32);
    one_shot(engine, f, move || {
        counter.set(counter.get() + 1);
        counter.get() >= frames
    })
}

/// Runs `f` every `frames` ticks until cleared. `frames == 0` is treated
/// as 1.
pub fn every<F: FnMut() + 'static>(engine: &Engine, frames: u32, mut f: F) -> FrameCallback {
    let frames = frames.max(1);
    let counter = Cell::new(0u32);
    let callback = frame_callback(move || {
        counter.set(counter.get() + 1);
        if counter.get() >= frames {
            counter.set(0);
            f();
        }
    });
    engine.add_frame_callback(callback.clone());
    callback
}

/// Runs `f` once on the first frame at or after `duration_ms` milliseconds
/// of engine-clock time, then removes itself.
pub fn set_timeout<F: FnOnce() + 'static>(
    engine: &Engine,
    duration_ms: f64,
    f: F,
) -> FrameCallback {
    let clock = engine.clone();
    let deadline = engine.now_ms() + duration_ms;
    one_shot(engine, f, move || clock.now_ms() >= deadline)
}

/// Runs `f` on every frame at which at least `duration_ms` milliseconds have
/// elapsed since the previous firing (or since registration).
pub fn set_interval<F: FnMut() + 'static>(
    engine: &Engine,
    duration_ms: f64,
    mut f: F,
) -> FrameCallback {
    let clock = engine.clone();
    let origin = Cell::new(engine.now_ms());
    let callback = frame_callback(move || {
        let now = clock.now_ms();
        if now - origin.get() >= duration_ms {
            origin.set(now);
            f();
        }
    });
    engine.add_frame_callback(callback.clone());
    callback
}

/// Cancels a timer by identity. Clearing a timer that already fired (or was
/// never registered) is a no-op; after `clear` returns the callback will not
/// run again.
pub fn clear(engine: &Engine, timer: &FrameCallback) {
    engine.remove_frame_callback(timer);
}

/// Builds a self-removing one-shot wrapper around `ready`.
///
/// The wrapper holds only a weak reference to itself, so a cleared one-shot
/// that never fires does not leak through an `Rc` cycle.
fn one_shot<F, R>(engine: &Engine, f: F, ready: R) -> FrameCallback
where
    F: FnOnce() + 'static,
    R: Fn() -> bool + 'static,
{
    let queue = engine.frame_queue();
    let slot: Rc<RefCell<Option<Weak<RefCell<dyn FnMut()>>>>> = Rc::new(RefCell::new(None));
    let mut f = Some(f);
    let callback = frame_callback({
        let slot = slot.clone();
        move || {
            if !ready() {
                return;
            }
            if let Some(weak) = slot.borrow_mut().take() {
                if let Some(this) = weak.upgrade() {
                    queue.remove(&this);
                }
            }
            if let Some(f) = f.take() {
                f();
            }
        }
    });
    *slot.borrow_mut() = Some(Rc::downgrade(&callback));
    engine.add_frame_callback(callback.clone());
    callback
}

// =============================================================================
// DEBOUNCE
// =============================================================================

enum DebounceKind {
    Millis(f64),
    Frames(u32),
}

struct DebouncedInner {
    engine: Engine,
    action: Rc<dyn Fn()>,
    pending: RefCell<Option<FrameCallback>>,
    kind: DebounceKind,
}

/// A debounced action: each [`call`](Debounced::call) cancels the previous
/// pending invocation and schedules a fresh one, so a burst of calls yields
/// at most one trailing invocation per quiescent gap.
#[derive(Clone)]
pub struct Debounced {
    inner: Rc<DebouncedInner>,
}

impl Debounced {
    /// Restarts the quiescence window.
    pub fn call(&self) {
        self.cancel();
        let weak = Rc::downgrade(&self.inner);
        let fire = move || {
            if let Some(inner) = weak.upgrade() {
                inner.pending.borrow_mut().take();
                (inner.action)();
            }
        };
        let pending = match self.inner.kind {
            DebounceKind::Millis(ms) => set_timeout(&self.inner.engine, ms, fire),
            DebounceKind::Frames(frames) => after(&self.inner.engine, frames, fire),
        };
        *self.inner.pending.borrow_mut() = Some(pending);
    }

    /// Drops the pending invocation, if any, without running it.
    pub fn cancel(&self) {
        if let Some(pending) = self.inner.pending.borrow_mut().take() {
            clear(&self.inner.engine, &pending);
        }
    }

    /// Whether an invocation is currently scheduled.
    pub fn is_pending(&self) -> bool {
        self.inner.pending.borrow().is_some()
    }
}

/// Debounces `f` by `wait_ms` milliseconds of engine-clock quiescence.
pub fn debounce<F: Fn() + 'static>(engine: &Engine, wait_ms: f64, f: F) -> Debounced {
    Debounced {
        inner: Rc::new(DebouncedInner {
            engine: engine.clone(),
            action: Rc::new(f),
            pending: RefCell::new(None),
            kind: DebounceKind::Millis(wait_ms),
        }),
    }
}

/// Debounces `f` by `frames` ticks of quiescence.
pub fn frame_debounce<F: Fn() + 'static>(engine: &Engine, frames: u32, f: F) -> Debounced {
    Debounced {
        inner: Rc::new(DebouncedInner {
            engine: engine.clone(),
            action: Rc::new(f),
            pending: RefCell::new(None),
            kind: DebounceKind::Frames(frames),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn manual_clock(engine: &Engine) -> Rc<Cell<f64>> {
        let now = Rc::new(Cell::new(0.0));
        let clock = now.clone();
        engine.set_clock(move || clock.get());
        now
    }

    fn counter() -> (Rc<Cell<u32>>, impl Fn() + Clone + 'static) {
        let count = Rc::new(Cell::new(0));
        let bump = {
            let count = count.clone();
            move || count.set(count.get() + 1)
        };
        (count, bump)
    }

    #[test]
    fn test_after_fires_once_on_the_nth_frame() {
        let engine = Engine::new();
        let (count, bump) = counter();
        after(&engine, 3, bump);
        engine.step();
        engine.step();
        assert_eq!(count.get(), 0);
        engine.step();
        assert_eq!(count.get(), 1);
        engine.step();
        assert_eq!(count.get(), 1, "one-shot must self-remove");
    }

    #[test]
    fn test_every_fires_periodically_until_cleared() {
        let engine = Engine::new();
        let (count, bump) = counter();
        let timer = every(&engine, 2, bump);
        for _ in 0..6 {
            engine.step();
        }
        assert_eq!(count.get(), 3);
        clear(&engine, &timer);
        engine.step();
        engine.step();
        assert_eq!(count.get(), 3);
    }

    #[test]
    fn test_set_timeout_fires_at_or_after_deadline() {
        let engine = Engine::new();
        let now = manual_clock(&engine);
        let (count, bump) = counter();
        set_timeout(&engine, 100.0, bump);

        now.set(99.9);
        engine.step();
        assert_eq!(count.get(), 0, "must not fire before the deadline");

        now.set(100.0);
        engine.step();
        assert_eq!(count.get(), 1);

        now.set(500.0);
        engine.step();
        assert_eq!(count.get(), 1);
    }

    #[test]
    fn test_set_timeout_cleared_before_deadline_never_fires() {
        let engine = Engine::new();
        let now = manual_clock(&engine);
        let (count, bump) = counter();
        let timer = set_timeout(&engine, 50.0, bump);
        engine.step();
        clear(&engine, &timer);
        now.set(1000.0);
        engine.step();
        assert_eq!(count.get(), 0);
    }

    #[test]
    fn test_set_interval_advances_origin_per_firing() {
        let engine = Engine::new();
        let now = manual_clock(&engine);
        let (count, bump) = counter();
        set_interval(&engine, 100.0, bump);

        now.set(100.0);
        engine.step();
        assert_eq!(count.get(), 1);

        now.set(150.0);
        engine.step();
        assert_eq!(count.get(), 1, "next window starts at the last firing");

        now.set(200.0);
        engine.step();
        assert_eq!(count.get(), 2);
    }

    #[test]
    fn test_debounce_burst_fires_once() {
        let engine = Engine::new();
        let now = manual_clock(&engine);
        let (count, bump) = counter();
        let debounced = debounce(&engine, 100.0, bump);

        for i in 0..5 {
            now.set(i as f64 * 10.0);
            debounced.call();
            engine.step();
        }
        assert_eq!(count.get(), 0);
        assert!(debounced.is_pending());

        now.set(140.0);
        engine.step();
        assert_eq!(count.get(), 1, "exactly one trailing invocation");
        assert!(!debounced.is_pending());
    }

    #[test]
    fn test_debounce_cancel_suppresses_trailing_call() {
        let engine = Engine::new();
        let now = manual_clock(&engine);
        let (count, bump) = counter();
        let debounced = debounce(&engine, 10.0, bump);
        debounced.call();
        debounced.cancel();
        now.set(1000.0);
        engine.step();
        assert_eq!(count.get(), 0);
    }

    #[test]
    fn test_frame_debounce_counts_ticks() {
        let engine = Engine::new();
        let (count, bump) = counter();
        let debounced = frame_debounce(&engine, 2, bump);
        debounced.call();
        engine.step();
        debounced.call();
        engine.step();
        assert_eq!(count.get(), 0, "each call restarts the window");
        engine.step();
        assert_eq!(count.get(), 1);
    }

    #[test]
    fn test_clear_unknown_timer_is_noop() {
        let engine = Engine::new();
        let other = Engine::new();
        let timer = after(&other, 1, || {});
        clear(&engine, &timer);
        engine.step();
    }
}
