//! Wheel events as a gesture stream.
//!
//! A scroll gesture has no explicit end on the wire: the stream opens with
//! `start` on the first wheel event after quiescence, emits `update` per
//! event, and closes with `end` after 100 ms without input, via the timer
//! facility's debounce.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use crate::engine::Engine;
use crate::event::{handler, EventChannel};
use crate::timer::{debounce, Debounced};
use crate::types::{Axis, AxisValue, EventType, GesturePayload, Payload, WheelEvent};

use super::MINIMUM_TICK_TIME_MS;

const SCROLL_END_DEBOUNCE_MS: f64 = 100.0;

/// Configuration for a [`ScrollInput`].
#[derive(Clone, Copy)]
pub struct ScrollOptions {
    /// Restrict output to one axis; `None` emits planar values.
    pub direction: Option<Axis>,
    /// Multiplier applied to every wheel delta.
    pub scale: f64,
}

impl Default for ScrollOptions {
    fn default() -> Self {
        Self {
            direction: None,
            scale: 1.0,
        }
    }
}

struct ScrollState {
    options: ScrollOptions,
    in_progress: Cell<bool>,
    value: Cell<AxisValue>,
    prev_time: Cell<Option<f64>>,
    last_payload: RefCell<GesturePayload>,
    output: EventChannel,
}

/// Converts raw [`WheelEvent`]s into a `start`/`update`/`end` gesture stream.
pub struct ScrollInput {
    state: Rc<ScrollState>,
    input: EventChannel,
    end_debounce: Debounced,
}

impl ScrollInput {
    /// Builds the stream and subscribes it to the engine's global event
    /// channel, so injected wheel events flow in frame-synchronized.
    pub fn new(engine: &Engine, options: ScrollOptions) -> Self {
        let input = EventChannel::new();
        let state = Rc::new(ScrollState {
            options,
            in_progress: Cell::new(false),
            value: Cell::new(AxisValue::zero(options.direction)),
            prev_time: Cell::new(None),
            last_payload: RefCell::new(GesturePayload::at_rest(options.direction, [0.0, 0.0])),
            output: EventChannel::new(),
        });

        let end_debounce = {
            let state = state.clone();
            debounce(engine, SCROLL_END_DEBOUNCE_MS, move || {
                if state.in_progress.get() {
                    state.in_progress.set(false);
                    state.prev_time.set(None);
                    let payload = Payload::Gesture(state.last_payload.borrow().clone());
                    state.output.emit(EventType::End, &payload);
                }
            })
        };

        {
            let state = state.clone();
            let clock = engine.clone();
            let end_debounce = end_debounce.clone();
            input.on(
                EventType::Wheel,
                &handler(move |payload| {
                    if let Payload::Wheel(wheel) = payload {
                        state.handle_wheel(wheel, clock.now_ms());
                        end_debounce.call();
                    }
                }),
            );
        }
        input.subscribe(&engine.events());

        Self {
            state,
            input,
            end_debounce,
        }
    }

    /// The gesture channel: `start`/`update`/`end` with `Gesture` payloads.
    pub fn output(&self) -> EventChannel {
        self.state.output.clone()
    }

    /// The raw channel this stream listens on, for wiring sources other
    /// than the engine.
    pub fn input(&self) -> EventChannel {
        self.input.clone()
    }

    /// Whether a gesture is currently open.
    pub fn in_progress(&self) -> bool {
        self.state.in_progress.get()
    }

    /// Closes an open gesture immediately instead of waiting out the
    /// debounce gap.
    pub fn flush(&self) {
        self.end_debounce.cancel();
        if self.state.in_progress.get() {
            self.state.in_progress.set(false);
            self.state.prev_time.set(None);
            let payload = Payload::Gesture(self.state.last_payload.borrow().clone());
            self.state.output.emit(EventType::End, &payload);
        }
    }
}

impl ScrollState {
    fn handle_wheel(&self, wheel: &WheelEvent, now: f64) {
        let direction = self.options.direction;
        if !self.in_progress.get() {
            self.in_progress.set(true);
            self.value.set(AxisValue::zero(direction));
            let at_rest = GesturePayload::at_rest(direction, wheel.client);
            *self.last_payload.borrow_mut() = at_rest.clone();
            self.output.emit(EventType::Start, &Payload::Gesture(at_rest));
        }

        let delta = match direction {
            Some(axis) => AxisValue::Scalar(wheel.delta[axis.index()]),
            None => AxisValue::Planar(wheel.delta),
        }
        .scaled(self.options.scale);

        let dt = match self.prev_time.get() {
            Some(prev) => (now - prev).max(MINIMUM_TICK_TIME_MS),
            None => MINIMUM_TICK_TIME_MS,
        };
        self.prev_time.set(Some(now));

        let value = self.value.get().add(delta);
        self.value.set(value);

        let payload = GesturePayload {
            delta,
            value,
            velocity: delta.scaled(1.0 / dt),
            client: wheel.client,
            count: 0,
            touch: None,
        };
        *self.last_payload.borrow_mut() = payload.clone();
        self.output.emit(EventType::Update, &Payload::Gesture(payload));
    }
}
