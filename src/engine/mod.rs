//! The frame scheduler.
//!
//! One [`Engine`] owns the phase queues and drives the per-frame cycle.
//! Each [`step`](Engine::step) runs the full frame:
//!
//! 1. drain the pre-frame queue (injected raw input, deferred size writes)
//! 2. enter `Update` and emit the `Tick` heartbeat when armed
//! 3. run every frame callback once
//! 4. drain the post-frame queue
//! 5. enter `End` and commit registered contexts, then roots
//! 6. drain the settle queue (deferred `end` emissions)
//! 7. return to `Start`
//!
//! The engine is an explicit, cloneable handle rather than ambient global
//! state: tests run several engines side by side and components hold a clone
//! of exactly the engine they were built against.
//!
//! # Example
//!
//! ```
//! use cadence::engine::Engine;
//!
//! let engine = Engine::new();
//! engine.push_pre_frame(|| println!("before the frame"));
//! engine.step();
//! ```

pub(crate) mod isolate;
pub mod phase;
pub mod queue;

use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};
use std::time::Instant;

use crate::event::{EventChannel, Handler};
use crate::root::RenderRoot;
use crate::types::{EventType, LayoutSpec, Payload};

use isolate::run_isolated;
pub use phase::{current_phase, Phase};
pub use queue::{frame_callback, FrameCallback, FrameQueue, Job, JobQueue};

type ClockFn = Box<dyn Fn() -> f64>;
type RootRef = Weak<RefCell<dyn RenderRoot>>;

struct EngineState {
    pre_frame: JobQueue,
    post_frame: JobQueue,
    settle: JobQueue,
    frame: FrameQueue,
    /// Global event channel; raw injected input and the `Tick` heartbeat
    /// flow through here.
    events: EventChannel,
    /// Global size channel; registered contexts and roots subscribe to it.
    size: EventChannel,
    /// Global layout channel; bracketed by `start` at engine start.
    layout: EventChannel,
    contexts: RefCell<Vec<RootRef>>,
    roots: RefCell<Vec<RootRef>>,
    listen_on_tick: Cell<bool>,
    frame_count: Cell<u64>,
    size_value: Cell<[f64; 2]>,
    size_announced: Cell<bool>,
    epoch: Instant,
    clock: RefCell<Option<ClockFn>>,
}

/// Cloneable handle to one frame scheduler.
#[derive(Clone)]
pub struct Engine {
    state: Rc<EngineState>,
}

impl Default for Engine {
    fn default() -> Self {
        Self::new()
    }
}

impl Engine {
    pub fn new() -> Self {
        Self {
            state: Rc::new(EngineState {
                pre_frame: JobQueue::new(),
                post_frame: JobQueue::new(),
                settle: JobQueue::new(),
                frame: FrameQueue::new(),
                events: EventChannel::new(),
                size: EventChannel::new(),
                layout: EventChannel::new(),
                contexts: RefCell::new(Vec::new()),
                roots: RefCell::new(Vec::new()),
                listen_on_tick: Cell::new(false),
                frame_count: Cell::new(0),
                size_value: Cell::new([0.0, 0.0]),
                size_announced: Cell::new(false),
                epoch: Instant::now(),
                clock: RefCell::new(None),
            }),
        }
    }

    /// Whether two handles drive the same scheduler.
    pub fn same_engine(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.state, &other.state)
    }

    // =========================================================================
    // FRAME CYCLE
    // =========================================================================

    /// Runs one full frame.
    pub fn step(&self) {
        self.state.frame_count.set(self.state.frame_count.get() + 1);

        self.state.pre_frame.drain();

        // The heartbeat is part of the frame proper: listeners observe
        // phase `Update`, not the between-frames state.
        phase::set_phase(Phase::Update);
        if self.state.listen_on_tick.get() {
            let now = Payload::Value(self.now_ms());
            self.state.events.emit(EventType::Tick, &now);
        }
        self.state.frame.run();
        self.state.post_frame.drain();

        phase::set_phase(Phase::End);
        commit_list(&self.state.contexts);
        commit_list(&self.state.roots);
        self.state.settle.drain();

        phase::set_phase(Phase::Start);
    }

    /// Primes the first frame: defers the initial resize to the pre-frame
    /// queue and brackets an initial layout pass with `start` now / `end`
    /// at settle, so every registered root sees one complete layout cycle
    /// on the first [`step`](Self::step). Both bracket events carry the
    /// default layout spec, so roots start from a known layout.
    pub fn start(&self, initial_size: [f64; 2]) {
        self.notify_resize(initial_size);
        let layout = self.state.layout.clone();
        self.state.pre_frame.push(move || {
            layout.emit(EventType::Start, &Payload::Layout(LayoutSpec::default()));
        });
        let layout = self.state.layout.clone();
        self.state.settle.push(move || {
            layout.emit(EventType::End, &Payload::Layout(LayoutSpec::default()));
        });
    }

    /// Frames completed or in progress since construction.
    pub fn frame_count(&self) -> u64 {
        self.state.frame_count.get()
    }

    // =========================================================================
    // EVENTS
    // =========================================================================

    /// Listens on the engine's global event channel. Listening for
    /// [`EventType::Tick`] arms the per-frame heartbeat.
    pub fn on(&self, ty: EventType, handler: &Handler) {
        if ty == EventType::Tick {
            self.state.listen_on_tick.set(true);
        }
        self.state.events.on(ty, handler);
    }

    /// Removes a listener from the global event channel by identity.
    pub fn off(&self, ty: EventType, handler: &Handler) {
        self.state.events.off(ty, handler);
        if ty == EventType::Tick && self.state.events.listener_count(EventType::Tick) == 0 {
            self.state.listen_on_tick.set(false);
        }
    }

    /// The single injection point for raw platform events.
    ///
    /// The payload is queued and emitted on the global event channel at the
    /// next pre-frame drain, so raw input is only ever observed
    /// frame-synchronized.
    pub fn inject(&self, ty: EventType, payload: Payload) {
        let events = self.state.events.clone();
        self.state.pre_frame.push(move || events.emit(ty, &payload));
    }

    /// Announces a size change.
    ///
    /// The new size is emitted on the size channel (and as `Resize` on the
    /// event channel) at the next pre-frame drain, then re-announced once
    /// from the settle queue of the same frame. Downstream consumers see the
    /// change twice per frame; idempotent commits absorb the duplicate.
    pub fn notify_resize(&self, size: [f64; 2]) {
        let state = self.state.clone();
        self.state.pre_frame.push(move || {
            state.size_value.set(size);
            state.size_announced.set(true);
            let payload = Payload::Size(size);
            state.size.emit(EventType::Resize, &payload);
            state.events.emit(EventType::Resize, &payload);
            let size_channel = state.size.clone();
            state
                .settle
                .push(move || size_channel.emit(EventType::Resize, &payload));
        });
    }

    /// The most recently announced size.
    pub fn size(&self) -> [f64; 2] {
        self.state.size_value.get()
    }

    /// The engine's global event channel.
    pub fn events(&self) -> EventChannel {
        self.state.events.clone()
    }

    /// The engine's global size channel.
    pub fn size_channel(&self) -> EventChannel {
        self.state.size.clone()
    }

    /// The engine's global layout channel.
    pub fn layout_channel(&self) -> EventChannel {
        self.state.layout.clone()
    }

    // =========================================================================
    // CONTEXTS & ROOTS
    // =========================================================================

    /// Registers a context: its size and layout channels subscribe to the
    /// engine's global channels and it commits each frame, before roots.
    ///
    /// The engine's reference is non-owning; a dropped context is pruned at
    /// the next commit pass.
    pub fn register_context(&self, context: &Rc<RefCell<dyn RenderRoot>>) {
        self.attach(context);
        self.state.contexts.borrow_mut().push(Rc::downgrade(context));
    }

    /// Reverses [`register_context`](Self::register_context). Deregistering
    /// an unknown context is a no-op.
    pub fn deregister_context(&self, context: &Rc<RefCell<dyn RenderRoot>>) {
        self.detach(context);
        remove_root(&self.state.contexts, context);
    }

    /// Registers a render root; commits each frame after every context.
    pub fn register_root(&self, root: &Rc<RefCell<dyn RenderRoot>>) {
        self.attach(root);
        self.state.roots.borrow_mut().push(Rc::downgrade(root));
    }

    /// Reverses [`register_root`](Self::register_root). Deregistering an
    /// unknown root is a no-op.
    pub fn deregister_root(&self, root: &Rc<RefCell<dyn RenderRoot>>) {
        self.detach(root);
        remove_root(&self.state.roots, root);
    }

    fn attach(&self, root: &Rc<RefCell<dyn RenderRoot>>) {
        let (size_channel, layout_channel) = {
            let root = root.borrow();
            (root.size_channel(), root.layout_channel())
        };
        size_channel.subscribe(&self.state.size);
        layout_channel.subscribe(&self.state.layout);
        // A late registrant observes the current size with the same
        // two-announcement protocol as a live resize.
        if self.state.size_announced.get() {
            let payload = Payload::Size(self.state.size_value.get());
            size_channel.emit(EventType::Resize, &payload);
            self.state
                .settle
                .push(move || size_channel.emit(EventType::Resize, &payload));
        }
    }

    fn detach(&self, root: &Rc<RefCell<dyn RenderRoot>>) {
        let root = root.borrow();
        root.size_channel().unsubscribe(&self.state.size);
        root.layout_channel().unsubscribe(&self.state.layout);
    }

    // =========================================================================
    // QUEUE ACCESS
    // =========================================================================

    /// Queues a one-shot job before the next frame's recomputation.
    pub fn push_pre_frame<F: FnOnce() + 'static>(&self, job: F) {
        self.state.pre_frame.push(job);
    }

    /// Queues a one-shot job after the next frame's recomputation, before
    /// commit.
    pub fn push_post_frame<F: FnOnce() + 'static>(&self, job: F) {
        self.state.post_frame.push(job);
    }

    /// Queues a one-shot job after the next frame's commit.
    pub fn push_settle<F: FnOnce() + 'static>(&self, job: F) {
        self.state.settle.push(job);
    }

    /// Registers a callback to run every frame until removed.
    pub fn add_frame_callback(&self, callback: FrameCallback) {
        self.state.frame.push(callback);
    }

    /// Removes a per-frame callback by identity; no-op when absent. The
    /// callback will not run again after removal.
    pub fn remove_frame_callback(&self, callback: &FrameCallback) {
        self.state.frame.remove(callback);
    }

    pub(crate) fn frame_queue(&self) -> FrameQueue {
        self.state.frame.clone()
    }

    pub(crate) fn pre_frame_queue(&self) -> JobQueue {
        self.state.pre_frame.clone()
    }

    pub(crate) fn settle_queue(&self) -> JobQueue {
        self.state.settle.clone()
    }

    // =========================================================================
    // CLOCK
    // =========================================================================

    /// Milliseconds on the engine clock. Monotonic from construction by
    /// default; replaceable via [`set_clock`](Self::set_clock) for
    /// deterministic timer tests.
    pub fn now_ms(&self) -> f64 {
        match &*self.state.clock.borrow() {
            Some(clock) => clock(),
            None => self.state.epoch.elapsed().as_secs_f64() * 1000.0,
        }
    }

    /// Replaces the engine clock.
    pub fn set_clock<F: Fn() -> f64 + 'static>(&self, clock: F) {
        *self.state.clock.borrow_mut() = Some(Box::new(clock));
    }
}

/// Commits every live entry in registration order and prunes dead ones.
fn commit_list(list: &RefCell<Vec<RootRef>>) {
    let snapshot: Vec<RootRef> = list.borrow().clone();
    let mut any_dead = false;
    for weak in &snapshot {
        match weak.upgrade() {
            Some(root) => run_isolated("commit", || root.borrow_mut().commit()),
            None => any_dead = true,
        }
    }
    if any_dead {
        list.borrow_mut().retain(|w| w.strong_count() > 0);
    }
}

fn remove_root(list: &RefCell<Vec<RootRef>>, target: &Rc<RefCell<dyn RenderRoot>>) {
    list.borrow_mut()
        .retain(|w| !w.upgrade().is_some_and(|r| Rc::ptr_eq(&r, target)));
}
