//! Typed publish/subscribe channels with lazy upstream forwarding.
//!
//! An [`EventChannel`] holds per-type listener lists and a list of upstream
//! sources it forwards from. Wiring is lazy and graph-shaped rather than
//! broadcast-shaped: a forwarding handler is installed on an upstream source
//! only for event types this channel actually listens to, so cost stays
//! proportional to observed event types even when a scene holds hundreds of
//! channels.
//!
//! # Wiring invariant
//!
//! A forwarding handler for type `T` exists on every upstream source iff this
//! channel has (or has ever had) a listener for `T`. `off` does not tear the
//! forwarder down again — once a type is wired it stays wired, which avoids
//! flapping when listeners churn. `unsubscribe` removes the forwarders from
//! that one source.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::{Rc, Weak};

use crate::engine::isolate::run_isolated;
use crate::types::{EventType, Payload};

/// A listener. Removal (`off`) is by `Rc` pointer identity, so keep a clone
/// of the handler you registered if you intend to remove it later.
pub type Handler = Rc<dyn Fn(&Payload)>;

/// Wraps a closure into a [`Handler`].
pub fn handler<F: Fn(&Payload) + 'static>(f: F) -> Handler {
    Rc::new(f)
}

#[derive(Default)]
struct ChannelInner {
    listeners: RefCell<HashMap<EventType, Vec<Handler>>>,
    upstream: RefCell<Vec<EventChannel>>,
    forwarders: RefCell<HashMap<EventType, Handler>>,
}

/// A typed publish/subscribe node.
///
/// Cloning yields another handle to the same channel. Channels hold their
/// upstream sources strongly; forwarding handlers hold the downstream channel
/// weakly, so subscription chains do not form reference cycles.
#[derive(Clone, Default)]
pub struct EventChannel {
    inner: Rc<ChannelInner>,
}

impl EventChannel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether two handles refer to the same channel.
    pub fn same_channel(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    /// Registers a listener for `ty`, appended in call order (replay order is
    /// registration order).
    ///
    /// The first listener for a type wires one forwarding handler for that
    /// type onto every current upstream source.
    pub fn on(&self, ty: EventType, handler: &Handler) {
        self.inner
            .listeners
            .borrow_mut()
            .entry(ty)
            .or_default()
            .push(handler.clone());
        self.ensure_forwarder(ty);
    }

    /// Removes a listener by identity. Forwarding handlers stay in place
    /// (see the module-level wiring invariant).
    pub fn off(&self, ty: EventType, handler: &Handler) {
        if let Some(list) = self.inner.listeners.borrow_mut().get_mut(&ty) {
            list.retain(|l| !Rc::ptr_eq(l, handler));
        }
    }

    /// Invokes every listener for `ty` in registration order, passing the
    /// same payload by reference. A panicking listener does not stop the
    /// remaining listeners.
    pub fn emit(&self, ty: EventType, payload: &Payload) {
        let listeners: Vec<Handler> = match self.inner.listeners.borrow().get(&ty) {
            Some(list) => list.clone(),
            None => return,
        };
        for listener in listeners {
            run_isolated("event listener", || listener(payload));
        }
    }

    /// Re-emits an event that arrived from an upstream source.
    ///
    /// Mechanically identical to [`emit`](Self::emit) — both paths invoke the
    /// same listener list — but call sites use it to distinguish forwarded
    /// events from locally originated ones.
    pub fn trigger(&self, ty: EventType, payload: &Payload) {
        self.emit(ty, payload);
    }

    /// Adds `source` as an upstream source and immediately wires forwarding
    /// handlers for every type currently listened to. Subscribing an already
    /// subscribed source is a no-op. Returns the source for chaining.
    pub fn subscribe(&self, source: &EventChannel) -> EventChannel {
        let already = self
            .inner
            .upstream
            .borrow()
            .iter()
            .any(|s| s.same_channel(source));
        if !already {
            self.inner.upstream.borrow_mut().push(source.clone());
            let forwarders: Vec<(EventType, Handler)> = self
                .inner
                .forwarders
                .borrow()
                .iter()
                .map(|(ty, fwd)| (*ty, fwd.clone()))
                .collect();
            for (ty, fwd) in forwarders {
                source.on(ty, &fwd);
            }
        }
        source.clone()
    }

    /// Reverses [`subscribe`](Self::subscribe): removes `source` from the
    /// upstream list and unregisters the forwarding handlers this channel had
    /// installed on it. Unsubscribing a non-subscribed source is a no-op.
    pub fn unsubscribe(&self, source: &EventChannel) {
        let position = self
            .inner
            .upstream
            .borrow()
            .iter()
            .position(|s| s.same_channel(source));
        if let Some(index) = position {
            self.inner.upstream.borrow_mut().remove(index);
            let forwarders: Vec<(EventType, Handler)> = self
                .inner
                .forwarders
                .borrow()
                .iter()
                .map(|(ty, fwd)| (*ty, fwd.clone()))
                .collect();
            for (ty, fwd) in forwarders {
                source.off(ty, &fwd);
            }
        }
    }

    /// Number of listeners registered for `ty` (forwarding handlers placed
    /// here by downstream channels included).
    pub fn listener_count(&self, ty: EventType) -> usize {
        self.inner
            .listeners
            .borrow()
            .get(&ty)
            .map_or(0, |list| list.len())
    }

    /// Whether `source` is currently subscribed upstream.
    pub fn has_upstream(&self, source: &EventChannel) -> bool {
        self.inner
            .upstream
            .borrow()
            .iter()
            .any(|s| s.same_channel(source))
    }

    /// Creates the forwarding handler for `ty` if it does not exist yet and
    /// registers it on every current upstream source.
    fn ensure_forwarder(&self, ty: EventType) {
        let forwarder = {
            let mut forwarders = self.inner.forwarders.borrow_mut();
            if forwarders.contains_key(&ty) {
                return;
            }
            let weak: Weak<ChannelInner> = Rc::downgrade(&self.inner);
            let forwarder: Handler = Rc::new(move |payload: &Payload| {
                if let Some(inner) = weak.upgrade() {
                    EventChannel { inner }.trigger(ty, payload);
                }
            });
            forwarders.insert(ty, forwarder.clone());
            forwarder
        };
        let sources: Vec<EventChannel> = self.inner.upstream.borrow().clone();
        for source in &sources {
            source.on(ty, &forwarder);
        }
    }
}
