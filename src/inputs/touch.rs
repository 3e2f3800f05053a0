//! Touch events as a gesture stream.
//!
//! [`TouchTracker`] is the bookkeeping half: it follows every active touch,
//! keeps a bounded per-touch sample history with engine-clock timestamps,
//! and re-emits the raw events as `track` events with that history attached.
//! [`TouchInput`] consumes the track stream and produces
//! `start`/`update`/`end` gesture payloads for the primary touch, with
//! velocity sampled against the history rather than the last event alone.

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::Rc;

use crate::engine::Engine;
use crate::event::{handler, EventChannel};
use crate::types::{
    Axis, AxisValue, EventType, GesturePayload, Payload, TouchEvent, TouchSample, TrackData,
};

use super::MINIMUM_TICK_TIME_MS;

/// Samples kept per touch; older samples are discarded.
const HISTORY_LIMIT: usize = 10;

// =============================================================================
// TOUCH TRACKER
// =============================================================================

struct TrackerState {
    touches: RefCell<HashMap<u64, Vec<TouchSample>>>,
    output: EventChannel,
}

impl TrackerState {
    fn track(&self, ty: EventType, touch: &TouchEvent, now: f64) {
        let sample = TouchSample {
            x: touch.x,
            y: touch.y,
            timestamp: now,
        };
        let data = {
            let mut touches = self.touches.borrow_mut();
            match ty {
                EventType::TouchStart => {
                    touches.insert(touch.id, vec![sample]);
                }
                EventType::TouchMove | EventType::TouchEnd => {
                    // Moves and ends for untracked ids are dropped.
                    let Some(history) = touches.get_mut(&touch.id) else {
                        return;
                    };
                    history.push(sample);
                    if history.len() > HISTORY_LIMIT {
                        history.remove(0);
                    }
                }
                _ => return,
            }
            let history = touches[&touch.id].clone();
            let count = if ty == EventType::TouchEnd {
                touches.remove(&touch.id);
                touches.len()
            } else {
                touches.len()
            };
            TrackData {
                id: touch.id,
                x: touch.x,
                y: touch.y,
                count,
                history,
            }
        };
        let out_ty = match ty {
            EventType::TouchStart => EventType::TrackStart,
            EventType::TouchMove => EventType::TrackMove,
            _ => EventType::TrackEnd,
        };
        self.output.emit(out_ty, &Payload::Track(data));
    }
}

/// Raw-touch bookkeeping: active touches, bounded histories, `track` events.
pub struct TouchTracker {
    state: Rc<TrackerState>,
    input: EventChannel,
}

impl TouchTracker {
    /// Builds the tracker and subscribes it to the engine's global event
    /// channel.
    pub fn new(engine: &Engine) -> Self {
        let input = EventChannel::new();
        let state = Rc::new(TrackerState {
            touches: RefCell::new(HashMap::new()),
            output: EventChannel::new(),
        });

        for ty in [EventType::TouchStart, EventType::TouchMove, EventType::TouchEnd] {
            let state = state.clone();
            let clock = engine.clone();
            input.on(
                ty,
                &handler(move |payload| {
                    if let Payload::Touch(touch) = payload {
                        state.track(ty, touch, clock.now_ms());
                    }
                }),
            );
        }
        input.subscribe(&engine.events());

        Self { state, input }
    }

    /// The `track` channel (`TrackStart`/`TrackMove`/`TrackEnd` with
    /// `Track` payloads).
    pub fn output(&self) -> EventChannel {
        self.state.output.clone()
    }

    /// The raw channel this tracker listens on.
    pub fn input(&self) -> EventChannel {
        self.input.clone()
    }

    /// Number of currently active touches.
    pub fn active_count(&self) -> usize {
        self.state.touches.borrow().len()
    }
}

// =============================================================================
// TOUCH INPUT
// =============================================================================

/// Configuration for a [`TouchInput`].
#[derive(Clone, Copy)]
pub struct TouchOptions {
    /// Restrict output to one axis; `None` emits planar values.
    pub direction: Option<Axis>,
    /// Without a fixed direction, zero the minor axis of each delta.
    pub rails: bool,
    /// Multiplier applied to every delta.
    pub scale: f64,
    /// How many history samples back to reach when computing velocity.
    pub velocity_sample_length: usize,
}

impl Default for TouchOptions {
    fn default() -> Self {
        Self {
            direction: None,
            rails: false,
            scale: 1.0,
            velocity_sample_length: 10,
        }
    }
}

struct TouchState {
    options: TouchOptions,
    cur_touch: Cell<Option<u64>>,
    value: Cell<AxisValue>,
    prev_pos: Cell<[f64; 2]>,
    last_payload: RefCell<GesturePayload>,
    output: EventChannel,
}

impl TouchState {
    fn on_start(&self, data: &TrackData) {
        // Only the first touch drives the gesture; later fingers are
        // observed through `count` but do not restart it.
        if self.cur_touch.get().is_some() {
            return;
        }
        self.cur_touch.set(Some(data.id));
        self.value.set(AxisValue::zero(self.options.direction));
        self.prev_pos.set([data.x, data.y]);

        let mut payload = GesturePayload::at_rest(self.options.direction, [data.x, data.y]);
        payload.count = data.count;
        payload.touch = Some(data.id);
        *self.last_payload.borrow_mut() = payload.clone();
        self.output.emit(EventType::Start, &Payload::Gesture(payload));
    }

    fn on_move(&self, data: &TrackData) {
        if self.cur_touch.get() != Some(data.id) {
            return;
        }
        let prev = self.prev_pos.get();
        self.prev_pos.set([data.x, data.y]);
        let raw = [data.x - prev[0], data.y - prev[1]];

        let delta = self.shape(raw).scaled(self.options.scale);
        let value = self.value.get().add(delta);
        self.value.set(value);

        let payload = GesturePayload {
            delta,
            value,
            velocity: self.velocity(&data.history),
            client: [data.x, data.y],
            count: data.count,
            touch: Some(data.id),
        };
        *self.last_payload.borrow_mut() = payload.clone();
        self.output.emit(EventType::Update, &Payload::Gesture(payload));
    }

    fn on_end(&self, data: &TrackData) {
        if self.cur_touch.get() != Some(data.id) {
            return;
        }
        self.cur_touch.set(None);
        let mut payload = self.last_payload.borrow().clone();
        payload.count = data.count;
        self.output.emit(EventType::End, &Payload::Gesture(payload));
    }

    /// Applies the direction/rails policy to a planar displacement.
    fn shape(&self, raw: [f64; 2]) -> AxisValue {
        match self.options.direction {
            Some(axis) => AxisValue::Scalar(raw[axis.index()]),
            None if self.options.rails => {
                if raw[0].abs() >= raw[1].abs() {
                    AxisValue::Planar([raw[0], 0.0])
                } else {
                    AxisValue::Planar([0.0, raw[1]])
                }
            }
            None => AxisValue::Planar(raw),
        }
    }

    /// Velocity over the last `velocity_sample_length` history samples,
    /// floored at the minimum tick time.
    fn velocity(&self, history: &[TouchSample]) -> AxisValue {
        let Some(last) = history.last() else {
            return AxisValue::zero(self.options.direction);
        };
        let back = self.options.velocity_sample_length.max(1);
        let then = &history[history.len().saturating_sub(back + 1)];
        let dt = (last.timestamp - then.timestamp).max(MINIMUM_TICK_TIME_MS);
        self.shape([last.x - then.x, last.y - then.y])
            .scaled(self.options.scale / dt)
    }
}

/// Converts tracked touches into a `start`/`update`/`end` gesture stream.
pub struct TouchInput {
    state: Rc<TouchState>,
    tracker: TouchTracker,
}

impl TouchInput {
    pub fn new(engine: &Engine, options: TouchOptions) -> Self {
        let tracker = TouchTracker::new(engine);
        let state = Rc::new(TouchState {
            options,
            cur_touch: Cell::new(None),
            value: Cell::new(AxisValue::zero(options.direction)),
            prev_pos: Cell::new([0.0, 0.0]),
            last_payload: RefCell::new(GesturePayload::at_rest(options.direction, [0.0, 0.0])),
            output: EventChannel::new(),
        });

        for ty in [EventType::TrackStart, EventType::TrackMove, EventType::TrackEnd] {
            let state = state.clone();
            tracker.output().on(
                ty,
                &handler(move |payload| {
                    if let Payload::Track(data) = payload {
                        match ty {
                            EventType::TrackStart => state.on_start(data),
                            EventType::TrackMove => state.on_move(data),
                            _ => state.on_end(data),
                        }
                    }
                }),
            );
        }

        Self { state, tracker }
    }

    /// The gesture channel: `start`/`update`/`end` with `Gesture` payloads.
    pub fn output(&self) -> EventChannel {
        self.state.output.clone()
    }

    /// The underlying tracker.
    pub fn tracker(&self) -> &TouchTracker {
        &self.tracker
    }

    /// Whether a gesture is currently open.
    pub fn in_progress(&self) -> bool {
        self.state.cur_touch.get().is_some()
    }
}
