//! Render roots: where settled state leaves the graph.
//!
//! A [`RenderRoot`] is anything the engine commits once per frame after the
//! frame queue has run. [`SceneRoot`] is the concrete root: it accumulates
//! the latest size and layout from its channels during the frame and applies
//! them to a host-supplied [`RenderTarget`] at commit, skipping the
//! application entirely when nothing changed. Commit idempotence is what
//! absorbs the duplicate announcements of the resize protocol.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use crate::event::{handler, EventChannel};
use crate::transition::TransitionableTransform;
use crate::types::{EventType, LayoutSpec, Payload};

/// The host surface a [`SceneRoot`] draws into.
pub trait RenderTarget {
    fn apply_size(&mut self, size: [f64; 2]);
    fn apply_layout(&mut self, layout: &LayoutSpec);
}

/// A node the engine commits each frame.
///
/// `commit` must be idempotent for unchanged state: the engine may commit a
/// root on frames where nothing it observes has moved.
pub trait RenderRoot {
    fn commit(&mut self);
    /// The channel this root observes size changes on.
    fn size_channel(&self) -> EventChannel;
    /// The channel this root observes layout changes on.
    fn layout_channel(&self) -> EventChannel;
}

#[derive(Default)]
struct SceneState {
    size: Cell<Option<[f64; 2]>>,
    layout: RefCell<LayoutSpec>,
}

/// The concrete render root: latest size + layout, optionally a live
/// transform, applied to a boxed target on commit.
pub struct SceneRoot {
    size_channel: EventChannel,
    layout_channel: EventChannel,
    state: Rc<SceneState>,
    transform: Option<Rc<TransitionableTransform>>,
    target: Box<dyn RenderTarget>,
    last_applied: Option<(Option<[f64; 2]>, LayoutSpec)>,
}

impl SceneRoot {
    pub fn new(target: Box<dyn RenderTarget>) -> Self {
        let size_channel = EventChannel::new();
        let layout_channel = EventChannel::new();
        let state = Rc::new(SceneState::default());

        {
            let state = state.clone();
            size_channel.on(
                EventType::Resize,
                &handler(move |payload| {
                    if let Payload::Size(size) = payload {
                        state.size.set(Some(*size));
                    }
                }),
            );
        }
        // Any lifecycle event may carry a layout spec; the engine's initial
        // bracket delivers one on `start`.
        for ty in [EventType::Start, EventType::Update, EventType::End] {
            let state = state.clone();
            layout_channel.on(
                ty,
                &handler(move |payload| {
                    if let Payload::Layout(layout) = payload {
                        *state.layout.borrow_mut() = layout.clone();
                    }
                }),
            );
        }

        Self {
            size_channel,
            layout_channel,
            state,
            transform: None,
            target,
            last_applied: None,
        }
    }

    /// Convenience for [`Engine::register_root`](crate::engine::Engine::register_root).
    pub fn shared(target: Box<dyn RenderTarget>) -> Rc<RefCell<SceneRoot>> {
        Rc::new(RefCell::new(Self::new(target)))
    }

    /// Attaches a live transform; its settled matrix overrides the layout's
    /// transform at each commit.
    pub fn set_transform(&mut self, transform: Rc<TransitionableTransform>) {
        self.transform = Some(transform);
    }

    /// The size last observed, if any.
    pub fn size(&self) -> Option<[f64; 2]> {
        self.state.size.get()
    }
}

impl RenderRoot for SceneRoot {
    fn commit(&mut self) {
        let size = self.state.size.get();
        let mut layout = self.state.layout.borrow().clone();
        if let Some(transform) = &self.transform {
            layout.transform = transform.get();
        }

        let next = (size, layout);
        if self.last_applied.as_ref() == Some(&next) {
            return;
        }
        if let Some(size) = next.0 {
            self.target.apply_size(size);
        }
        self.target.apply_layout(&next.1);
        self.last_applied = Some(next);
    }

    fn size_channel(&self) -> EventChannel {
        self.size_channel.clone()
    }

    fn layout_channel(&self) -> EventChannel {
        self.layout_channel.clone()
    }
}
