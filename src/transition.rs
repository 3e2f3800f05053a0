//! Transitioning values and the composed transitionable transform.
//!
//! A [`Transitionable`] is a scalar animated over engine-clock time through
//! the frame queue. Its output channel carries the transition lifecycle:
//! `start` when the value leaves rest, `update` once per frame while moving,
//! `end` exactly once on arrival. Those lifecycle brackets are what the
//! [`DirtyTracker`](crate::dirty::DirtyTracker) reference-counts when several
//! transitionables drive one composed value.
//!
//! A [`TransitionableTransform`] is the canonical composed value: twelve
//! scalar slots (translate/scale/rotate/skew, three axes each), each fed by a
//! tagged [`ValueSource`], rebuilt into a matrix on read while dirty.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

use crate::dirty::DirtyTracker;
use crate::engine::{frame_callback, Engine, FrameCallback};
use crate::event::EventChannel;
use crate::transform::{Transform, TransformComponents};
use crate::types::{EventType, Payload};

// =============================================================================
// TRANSITIONABLE
// =============================================================================

struct ActiveTransition {
    start_value: f64,
    target: f64,
    start_time: f64,
    duration: f64,
}

struct TransitionableInner {
    engine: Engine,
    value: Cell<f64>,
    active: Cell<bool>,
    /// Bumped on every `set`; stale deferred `end` jobs check it and bail.
    generation: Cell<u64>,
    transition: RefCell<Option<ActiveTransition>>,
    callback: RefCell<Option<FrameCallback>>,
    output: EventChannel,
}

impl Drop for TransitionableInner {
    fn drop(&mut self) {
        if let Some(callback) = self.callback.borrow_mut().take() {
            self.engine.remove_frame_callback(&callback);
        }
    }
}

/// A scalar value that moves toward a target over engine-clock time.
#[derive(Clone)]
pub struct Transitionable {
    inner: Rc<TransitionableInner>,
}

impl Transitionable {
    pub fn new(engine: &Engine, value: f64) -> Self {
        Self {
            inner: Rc::new(TransitionableInner {
                engine: engine.clone(),
                value: Cell::new(value),
                active: Cell::new(false),
                generation: Cell::new(0),
                transition: RefCell::new(None),
                callback: RefCell::new(None),
                output: EventChannel::new(),
            }),
        }
    }

    /// The current value.
    pub fn get(&self) -> f64 {
        self.inner.value.get()
    }

    /// Whether a transition is in flight (or a zero-duration jump has not
    /// settled yet).
    pub fn is_active(&self) -> bool {
        self.inner.active.get()
    }

    /// The lifecycle channel: `start`/`update`/`end` with `Value` payloads.
    pub fn output(&self) -> EventChannel {
        self.inner.output.clone()
    }

    /// Moves toward `target` over `duration_ms` milliseconds of linear
    /// interpolation driven by the frame queue.
    ///
    /// `start` is emitted only when the value leaves rest; retargeting a
    /// transition already in flight redirects it without a second `start`,
    /// so lifecycle brackets stay balanced. A non-positive duration jumps
    /// immediately and defers the `end` to the settle queue, keeping even
    /// instant changes inside one frame bracket.
    pub fn set(&self, target: f64, duration_ms: f64) {
        let inner = &self.inner;
        inner.generation.set(inner.generation.get() + 1);

        if duration_ms <= 0.0 {
            self.remove_callback();
            inner.transition.borrow_mut().take();
            inner.value.set(target);
            if !inner.active.get() {
                inner.active.set(true);
                inner.output.emit(EventType::Start, &Payload::Value(target));
            }
            inner.output.emit(EventType::Update, &Payload::Value(target));

            let weak = Rc::downgrade(inner);
            let generation = inner.generation.get();
            inner.engine.push_settle(move || {
                if let Some(inner) = weak.upgrade() {
                    if inner.generation.get() == generation && inner.active.get() {
                        inner.active.set(false);
                        let value = Payload::Value(inner.value.get());
                        inner.output.emit(EventType::End, &value);
                    }
                }
            });
            return;
        }

        let now = inner.engine.now_ms();
        *inner.transition.borrow_mut() = Some(ActiveTransition {
            start_value: inner.value.get(),
            target,
            start_time: now,
            duration: duration_ms,
        });
        if !inner.active.get() {
            inner.active.set(true);
            let value = Payload::Value(inner.value.get());
            inner.output.emit(EventType::Start, &value);
        }
        self.ensure_callback();
    }

    /// Halts any in-flight transition at the current value, emitting the
    /// `end` immediately.
    pub fn halt(&self) {
        let inner = &self.inner;
        inner.generation.set(inner.generation.get() + 1);
        self.remove_callback();
        inner.transition.borrow_mut().take();
        if inner.active.get() {
            inner.active.set(false);
            let value = Payload::Value(inner.value.get());
            inner.output.emit(EventType::End, &value);
        }
    }

    fn ensure_callback(&self) {
        if self.inner.callback.borrow().is_some() {
            return;
        }
        let weak = Rc::downgrade(&self.inner);
        let callback = frame_callback(move || {
            if let Some(inner) = weak.upgrade() {
                advance(&inner);
            }
        });
        *self.inner.callback.borrow_mut() = Some(callback.clone());
        self.inner.engine.add_frame_callback(callback);
    }

    fn remove_callback(&self) {
        if let Some(callback) = self.inner.callback.borrow_mut().take() {
            self.inner.engine.remove_frame_callback(&callback);
        }
    }
}

/// One frame of interpolation.
fn advance(inner: &Rc<TransitionableInner>) {
    let now = inner.engine.now_ms();
    let (value, done) = {
        let transition = inner.transition.borrow();
        let Some(t) = transition.as_ref() else { return };
        let progress = ((now - t.start_time) / t.duration).clamp(0.0, 1.0);
        let value = t.start_value + (t.target - t.start_value) * progress;
        (value, progress >= 1.0)
    };
    inner.value.set(value);
    if done {
        inner.transition.borrow_mut().take();
        if let Some(callback) = inner.callback.borrow_mut().take() {
            inner.engine.remove_frame_callback(&callback);
        }
        inner.output.emit(EventType::Update, &Payload::Value(value));
        inner.active.set(false);
        inner.output.emit(EventType::End, &Payload::Value(value));
    } else {
        inner.output.emit(EventType::Update, &Payload::Value(value));
    }
}

// =============================================================================
// VALUE SOURCES
// =============================================================================

/// A node that can be read and observed; [`Transitionable`] is the primary
/// implementor.
pub trait SourceNode {
    fn get(&self) -> f64;
    /// The node's lifecycle channel (`start`/`update`/`end`).
    fn output(&self) -> EventChannel;
}

impl SourceNode for Transitionable {
    fn get(&self) -> f64 {
        Transitionable::get(self)
    }

    fn output(&self) -> EventChannel {
        Transitionable::output(self)
    }
}

/// How one scalar slot of a composed value is driven.
///
/// The tag decides the dirty protocol for the slot: a constant marks dirty
/// once, a computed closure takes a permanent lock (re-evaluated on every
/// read), and a delegated node's lifecycle events are reference-counted.
#[derive(Clone)]
pub enum ValueSource {
    Constant(f64),
    Computed(Rc<dyn Fn() -> f64>),
    Delegated(Rc<dyn SourceNode>),
}

impl ValueSource {
    /// Builds a computed source from a closure.
    pub fn computed<F: Fn() -> f64 + 'static>(f: F) -> Self {
        Self::Computed(Rc::new(f))
    }

    /// Builds a delegated source from a node.
    pub fn delegated<N: SourceNode + 'static>(node: N) -> Self {
        Self::Delegated(Rc::new(node))
    }

    fn resolve(&self) -> f64 {
        match self {
            Self::Constant(v) => *v,
            Self::Computed(f) => f(),
            Self::Delegated(node) => node.get(),
        }
    }
}

impl fmt::Debug for ValueSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Constant(v) => f.debug_tuple("Constant").field(v).finish(),
            Self::Computed(_) => f.write_str("Computed(..)"),
            Self::Delegated(_) => f.write_str("Delegated(..)"),
        }
    }
}

// =============================================================================
// TRANSITIONABLE TRANSFORM
// =============================================================================

#[derive(Clone, Copy)]
enum Group {
    Translate = 0,
    Scale = 1,
    Rotate = 2,
    Skew = 3,
}

/// A composed transform whose components are independently driven by tagged
/// value sources, with one dirty/lock tracker bracketing all of them.
///
/// `get` recomputes the matrix from the current sources while dirty and
/// settles eagerly once no drivers remain active, so a read never observes a
/// stale-but-settled matrix.
pub struct TransitionableTransform {
    input: EventChannel,
    output: EventChannel,
    tracker: DirtyTracker,
    sources: RefCell<[[ValueSource; 3]; 4]>,
    /// Cache freshness, tracked separately from the lifecycle bracket: the
    /// final `update` of a driver arrives in the same emit pass as its
    /// `end`, so the matrix can be stale after the tracker has settled.
    stale: Rc<Cell<bool>>,
    cache: RefCell<Transform>,
}

impl Default for TransitionableTransform {
    fn default() -> Self {
        Self::new()
    }
}

impl TransitionableTransform {
    pub fn new() -> Self {
        let input = EventChannel::new();
        let output = EventChannel::new();
        let stale = Rc::new(Cell::new(false));
        // Staleness handlers go on first so a consumer reacting to the
        // logical `end` already reads a recomputed matrix.
        for ty in [EventType::Start, EventType::Update, EventType::End] {
            let flag = stale.clone();
            input.on(ty, &crate::event::handler(move |_| flag.set(true)));
        }
        let tracker = DirtyTracker::wire(&input, &output);
        let identity = TransformComponents::identity();
        Self {
            input,
            output,
            tracker,
            sources: RefCell::new([
                identity.translate.map(ValueSource::Constant),
                identity.scale.map(ValueSource::Constant),
                identity.rotate.map(ValueSource::Constant),
                identity.skew.map(ValueSource::Constant),
            ]),
            stale,
            cache: RefCell::new(Transform::IDENTITY),
        }
    }

    /// The logical lifecycle channel: one `start`/`end` pair per burst of
    /// overlapping driver activity.
    pub fn output(&self) -> EventChannel {
        self.output.clone()
    }

    /// Whether the composed matrix is settled (no dirty flag, no locks).
    pub fn is_settled(&self) -> bool {
        self.tracker.is_settled()
    }

    /// The composed matrix, recomputed from the current sources while dirty
    /// or stale.
    pub fn get(&self) -> Transform {
        if self.stale.get() || self.tracker.is_dirty() {
            let sources = self.sources.borrow();
            let components = TransformComponents {
                translate: resolve_group(&sources[Group::Translate as usize]),
                scale: resolve_group(&sources[Group::Scale as usize]),
                rotate: resolve_group(&sources[Group::Rotate as usize]),
                skew: resolve_group(&sources[Group::Skew as usize]),
            };
            drop(sources);
            *self.cache.borrow_mut() = components.build();
            self.stale.set(false);
            self.tracker.settle_after_read();
        }
        *self.cache.borrow()
    }

    // Per-component source installers.

    pub fn translate_from(&self, sources: [ValueSource; 3]) {
        self.install_group(Group::Translate, sources);
    }

    pub fn translate_x_from(&self, source: ValueSource) {
        self.install(Group::Translate, 0, source);
    }

    pub fn translate_y_from(&self, source: ValueSource) {
        self.install(Group::Translate, 1, source);
    }

    pub fn translate_z_from(&self, source: ValueSource) {
        self.install(Group::Translate, 2, source);
    }

    pub fn scale_from(&self, sources: [ValueSource; 3]) {
        self.install_group(Group::Scale, sources);
    }

    pub fn rotate_from(&self, sources: [ValueSource; 3]) {
        self.install_group(Group::Rotate, sources);
    }

    pub fn rotate_z_from(&self, source: ValueSource) {
        self.install(Group::Rotate, 2, source);
    }

    pub fn skew_from(&self, source: ValueSource) {
        self.install(Group::Skew, 0, source);
    }

    /// Constant-translate convenience.
    pub fn set_translate(&self, translate: [f64; 3]) {
        self.translate_from(translate.map(ValueSource::Constant));
    }

    /// Constant-scale convenience.
    pub fn set_scale(&self, scale: [f64; 3]) {
        self.scale_from(scale.map(ValueSource::Constant));
    }

    fn install_group(&self, group: Group, sources: [ValueSource; 3]) {
        for (axis, source) in sources.into_iter().enumerate() {
            self.install(group, axis, source);
        }
    }

    fn install(&self, group: Group, axis: usize, source: ValueSource) {
        match &source {
            ValueSource::Constant(_) => self.tracker.mark_dirty(),
            // Re-evaluated on every read; the permanent lock keeps the
            // matrix dirty so no stale value is ever served as settled.
            ValueSource::Computed(_) => self.tracker.lock(),
            ValueSource::Delegated(node) => {
                self.input.subscribe(&node.output());
                self.tracker.mark_dirty();
            }
        }
        self.sources.borrow_mut()[group as usize][axis] = source;
    }
}

fn resolve_group(sources: &[ValueSource; 3]) -> [f64; 3] {
    [
        sources[0].resolve(),
        sources[1].resolve(),
        sources[2].resolve(),
    ]
}
