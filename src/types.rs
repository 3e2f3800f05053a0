//! Core types shared across the runtime.
//!
//! Event payloads are passed to every listener by shared reference, so a
//! single `emit` hands the same `Payload` value to each handler in turn
//! (payload identity is preserved through forwarding chains).

use crate::transform::Transform;

// =============================================================================
// EVENT TYPES
// =============================================================================

/// The channel an event travels on.
///
/// `Start`/`Update`/`End` carry transition lifecycles, `Resize` carries size
/// changes, and `Tick` is the engine's per-frame heartbeat. The raw input
/// types (`Wheel`, `Touch*`) are what hosts inject; the `Track*` types are
/// produced by [`TouchTracker`](crate::inputs::TouchTracker). `Custom` is an
/// escape hatch for application-defined channels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventType {
    Start,
    Update,
    End,
    Resize,
    Tick,
    Wheel,
    TouchStart,
    TouchMove,
    TouchEnd,
    TrackStart,
    TrackMove,
    TrackEnd,
    Custom(&'static str),
}

// =============================================================================
// PAYLOADS
// =============================================================================

/// Event payload, passed by reference to every listener.
///
/// Listeners must not assume exclusive ownership of payload fields; the same
/// value is observed by every listener of an `emit` and by every channel a
/// forwarding handler re-emits it on.
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    Empty,
    /// A scalar value, e.g. the current state of a transitionable.
    Value(f64),
    /// A two-element size in pixels.
    Size([f64; 2]),
    /// A layout specification flowing toward render roots.
    Layout(LayoutSpec),
    /// A processed gesture (scroll or touch stream output).
    Gesture(GesturePayload),
    /// A raw wheel event from the host.
    Wheel(WheelEvent),
    /// A raw touch/pointer event from the host.
    Touch(TouchEvent),
    /// A tracked touch with its sample history.
    Track(TrackData),
}

/// Axis selection for directional inputs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    X,
    Y,
}

impl Axis {
    /// Index of this axis into a two-element array.
    pub fn index(self) -> usize {
        match self {
            Self::X => 0,
            Self::Y => 1,
        }
    }
}

/// A scalar or planar quantity, depending on whether an input stream was
/// constructed with a fixed direction.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AxisValue {
    Scalar(f64),
    Planar([f64; 2]),
}

impl AxisValue {
    /// The zero value matching an optional direction: scalar zero when a
    /// direction is fixed, planar zero otherwise.
    pub fn zero(direction: Option<Axis>) -> Self {
        match direction {
            Some(_) => Self::Scalar(0.0),
            None => Self::Planar([0.0, 0.0]),
        }
    }

    /// Component-wise sum. Mixing scalar and planar shapes keeps the shape
    /// of `self` and reads component 0 of the planar side.
    pub fn add(self, other: Self) -> Self {
        match (self, other) {
            (Self::Scalar(a), Self::Scalar(b)) => Self::Scalar(a + b),
            (Self::Planar(a), Self::Planar(b)) => Self::Planar([a[0] + b[0], a[1] + b[1]]),
            (Self::Scalar(a), Self::Planar(b)) => Self::Scalar(a + b[0]),
            (Self::Planar(a), Self::Scalar(b)) => Self::Planar([a[0] + b, a[1]]),
        }
    }

    /// Component-wise scaling.
    pub fn scaled(self, factor: f64) -> Self {
        match self {
            Self::Scalar(v) => Self::Scalar(v * factor),
            Self::Planar([x, y]) => Self::Planar([x * factor, y * factor]),
        }
    }
}

/// Output payload of the gesture input streams.
///
/// `delta` is the differential since the last event, `value` the accumulated
/// displacement since the gesture started, and `velocity` the rate of change
/// in units per millisecond.
#[derive(Debug, Clone, PartialEq)]
pub struct GesturePayload {
    pub delta: AxisValue,
    pub value: AxisValue,
    pub velocity: AxisValue,
    /// Pointer position in host coordinates.
    pub client: [f64; 2],
    /// Number of concurrently active touches (0 for wheel gestures).
    pub count: usize,
    /// Identifier of the driving touch, if any.
    pub touch: Option<u64>,
}

impl GesturePayload {
    /// A quiescent payload for the start of a gesture.
    pub fn at_rest(direction: Option<Axis>, client: [f64; 2]) -> Self {
        let zero = AxisValue::zero(direction);
        Self {
            delta: zero,
            value: zero,
            velocity: zero,
            client,
            count: 0,
            touch: None,
        }
    }
}

/// A raw wheel event as delivered by the host.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WheelEvent {
    /// Scroll displacement on each axis.
    pub delta: [f64; 2],
    /// Pointer position in host coordinates.
    pub client: [f64; 2],
    pub modifiers: Modifiers,
}

/// A raw touch (or pointer-as-touch) event as delivered by the host.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TouchEvent {
    pub id: u64,
    pub x: f64,
    pub y: f64,
}

/// One position sample in a touch history.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TouchSample {
    pub x: f64,
    pub y: f64,
    /// Engine clock timestamp in milliseconds.
    pub timestamp: f64,
}

/// A tracked touch with its bounded sample history, emitted by
/// [`TouchTracker`](crate::inputs::TouchTracker).
#[derive(Debug, Clone, PartialEq)]
pub struct TrackData {
    pub id: u64,
    pub x: f64,
    pub y: f64,
    /// Number of touches active after this event.
    pub count: usize,
    pub history: Vec<TouchSample>,
}

/// Keyboard modifiers active during an input event.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Modifiers {
    pub ctrl: bool,
    pub alt: bool,
    pub shift: bool,
}

// =============================================================================
// LAYOUT
// =============================================================================

/// The layout state a render root applies to its target on commit.
#[derive(Debug, Clone, PartialEq)]
pub struct LayoutSpec {
    pub transform: Transform,
    pub opacity: f64,
    pub origin: Option<[f64; 2]>,
    pub align: Option<[f64; 2]>,
}

impl Default for LayoutSpec {
    fn default() -> Self {
        Self {
            transform: Transform::IDENTITY,
            opacity: 1.0,
            origin: None,
            align: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_axis_value_zero_matches_direction() {
        assert_eq!(AxisValue::zero(Some(Axis::X)), AxisValue::Scalar(0.0));
        assert_eq!(AxisValue::zero(None), AxisValue::Planar([0.0, 0.0]));
    }

    #[test]
    fn test_axis_index() {
        assert_eq!(Axis::X.index(), 0);
        assert_eq!(Axis::Y.index(), 1);
    }

    #[test]
    fn test_default_layout_spec_is_identity() {
        let spec = LayoutSpec::default();
        assert_eq!(spec.transform, Transform::IDENTITY);
        assert_eq!(spec.opacity, 1.0);
        assert!(spec.origin.is_none());
        assert!(spec.align.is_none());
    }
}
