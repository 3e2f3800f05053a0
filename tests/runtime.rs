//! Cross-module frame-loop scenarios.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use cadence::{
    handler, Axis, AxisValue, Engine, EventType, LayoutSpec, Payload, RenderRoot, RenderTarget,
    SceneRoot, ScrollInput, ScrollOptions, Transitionable, TransitionableTransform, ValueSource,
};

#[derive(Default)]
struct Recording {
    sizes: Vec<[f64; 2]>,
    layouts: Vec<LayoutSpec>,
}

struct RecordingTarget {
    record: Rc<RefCell<Recording>>,
}

impl RenderTarget for RecordingTarget {
    fn apply_size(&mut self, size: [f64; 2]) {
        self.record.borrow_mut().sizes.push(size);
    }

    fn apply_layout(&mut self, layout: &LayoutSpec) {
        self.record.borrow_mut().layouts.push(layout.clone());
    }
}

fn recording_root() -> (Rc<RefCell<SceneRoot>>, Rc<RefCell<Recording>>) {
    let record = Rc::new(RefCell::new(Recording::default()));
    let root = SceneRoot::shared(Box::new(RecordingTarget {
        record: record.clone(),
    }));
    (root, record)
}

fn manual_clock(engine: &Engine) -> Rc<Cell<f64>> {
    let now = Rc::new(Cell::new(0.0));
    let clock = now.clone();
    engine.set_clock(move || clock.get());
    now
}

#[test]
fn resize_reaches_a_registered_root_exactly_once_per_change() {
    let engine = Engine::new();
    let (root, record) = recording_root();
    let shared: Rc<RefCell<dyn RenderRoot>> = root.clone();
    engine.register_root(&shared);

    engine.notify_resize([800.0, 600.0]);
    engine.step();

    // The size is announced twice per frame (pre-frame and settle), but the
    // idempotent commit applies it once.
    assert_eq!(record.borrow().sizes, vec![[800.0, 600.0]]);
    assert_eq!(root.borrow().size(), Some([800.0, 600.0]));

    engine.step();
    assert_eq!(record.borrow().sizes.len(), 1, "quiet frames apply nothing");

    engine.notify_resize([400.0, 300.0]);
    engine.step();
    assert_eq!(record.borrow().sizes, vec![[800.0, 600.0], [400.0, 300.0]]);
}

#[test]
fn engine_start_primes_roots_with_size_and_layout() {
    let engine = Engine::new();
    let (root, record) = recording_root();
    let shared: Rc<RefCell<dyn RenderRoot>> = root.clone();
    engine.register_root(&shared);

    engine.start([120.0, 40.0]);
    engine.step();

    let record = record.borrow();
    assert_eq!(record.sizes, vec![[120.0, 40.0]]);
    assert_eq!(record.layouts, vec![LayoutSpec::default()]);
}

#[test]
fn animated_transform_lands_on_the_render_target() {
    let engine = Engine::new();
    let now = manual_clock(&engine);
    let (root, record) = recording_root();

    let transform = Rc::new(TransitionableTransform::new());
    let x = Transitionable::new(&engine, 0.0);
    transform.translate_x_from(ValueSource::delegated(x.clone()));
    root.borrow_mut().set_transform(transform.clone());

    let shared: Rc<RefCell<dyn RenderRoot>> = root.clone();
    engine.register_root(&shared);

    x.set(100.0, 100.0);
    now.set(50.0);
    engine.step();
    now.set(100.0);
    engine.step();

    let record = record.borrow();
    let translations: Vec<f64> = record
        .layouts
        .iter()
        .map(|l| l.transform.translation()[0])
        .collect();
    assert_eq!(translations.first(), Some(&50.0));
    assert_eq!(translations.last(), Some(&100.0));
    assert!(transform.is_settled());
}

#[test]
fn overlapping_drivers_bracket_one_layout_burst() {
    let engine = Engine::new();
    let now = manual_clock(&engine);
    let transform = TransitionableTransform::new();
    let log = Rc::new(RefCell::new(Vec::new()));
    for ty in [EventType::Start, EventType::End] {
        let log = log.clone();
        transform
            .output()
            .on(ty, &handler(move |_| log.borrow_mut().push(ty)));
    }

    let x = Transitionable::new(&engine, 0.0);
    let y = Transitionable::new(&engine, 0.0);
    transform.translate_x_from(ValueSource::delegated(x.clone()));
    transform.translate_y_from(ValueSource::delegated(y.clone()));
    transform.get();
    log.borrow_mut().clear();

    x.set(10.0, 100.0);
    y.set(10.0, 300.0);
    for step in 1..=6 {
        now.set(step as f64 * 50.0);
        engine.step();
    }

    assert_eq!(*log.borrow(), vec![EventType::Start, EventType::End]);
    assert_eq!(transform.get().translation(), [10.0, 10.0, 0.0]);
}

#[test]
fn injected_wheel_events_become_one_scroll_gesture() {
    let engine = Engine::new();
    let now = manual_clock(&engine);
    let scroll = ScrollInput::new(
        &engine,
        ScrollOptions {
            direction: Some(Axis::Y),
            scale: 1.0,
        },
    );
    let log = Rc::new(RefCell::new(Vec::new()));
    for ty in [EventType::Start, EventType::Update, EventType::End] {
        let log = log.clone();
        scroll
            .output()
            .on(ty, &handler(move |_| log.borrow_mut().push(ty)));
    }

    for step in 0..5 {
        now.set(step as f64 * 20.0);
        engine.inject(
            EventType::Wheel,
            Payload::Wheel(cadence::WheelEvent {
                delta: [0.0, 2.0],
                client: [0.0, 0.0],
                modifiers: cadence::Modifiers::default(),
            }),
        );
        engine.step();
    }
    let mid: Vec<EventType> = log.borrow().clone();
    assert_eq!(mid.iter().filter(|ty| **ty == EventType::Start).count(), 1);
    assert_eq!(mid.iter().filter(|ty| **ty == EventType::End).count(), 0);

    now.set(300.0);
    engine.step();
    assert_eq!(log.borrow().last(), Some(&EventType::End));
}

#[test]
fn jobs_queued_mid_drain_run_in_the_same_frame() {
    let engine = Engine::new();
    let ran = Rc::new(Cell::new(0));
    {
        let engine2 = engine.clone();
        let ran = ran.clone();
        engine.push_pre_frame(move || {
            // Work queued from inside a pre-frame job still runs this frame.
            let ran = ran.clone();
            engine2.push_pre_frame(move || ran.set(ran.get() + 1));
        });
    }
    engine.step();
    assert_eq!(ran.get(), 1);
}

#[test]
fn two_engines_do_not_share_state() {
    let a = Engine::new();
    let b = Engine::new();
    let count = Rc::new(Cell::new(0));
    {
        let count = count.clone();
        a.on(EventType::Tick, &handler(move |_| count.set(count.get() + 1)));
    }
    b.step();
    b.step();
    assert_eq!(count.get(), 0);
    a.step();
    assert_eq!(count.get(), 1);
    assert!(!a.same_engine(&b));
}

#[test]
fn gesture_value_drives_a_transform_through_the_graph() {
    let engine = Engine::new();
    manual_clock(&engine);
    let scroll = ScrollInput::new(
        &engine,
        ScrollOptions {
            direction: Some(Axis::Y),
            scale: 1.0,
        },
    );

    // A computed source pulling the scroll offset: the permanent lock keeps
    // the matrix recomputing on every read.
    let offset = Rc::new(Cell::new(0.0));
    {
        let offset = offset.clone();
        scroll.output().on(
            EventType::Update,
            &handler(move |payload| {
                if let Payload::Gesture(g) = payload {
                    if let AxisValue::Scalar(v) = g.value {
                        offset.set(v);
                    }
                }
            }),
        );
    }
    let transform = TransitionableTransform::new();
    {
        let offset = offset.clone();
        transform.translate_y_from(ValueSource::computed(move || offset.get()));
    }

    engine.inject(
        EventType::Wheel,
        Payload::Wheel(cadence::WheelEvent {
            delta: [0.0, 7.0],
            client: [0.0, 0.0],
            modifiers: cadence::Modifiers::default(),
        }),
    );
    engine.step();
    assert_eq!(transform.get().translation()[1], 7.0);
    assert!(!transform.is_settled());
}
