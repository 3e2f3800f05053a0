//! Terminal host bridge.
//!
//! Pumps crossterm events into the engine and drives the frame loop. All
//! delivery goes through [`Engine::inject`] (or
//! [`Engine::notify_resize`](crate::engine::Engine::notify_resize) for size
//! changes), so raw platform input only ever becomes observable at a
//! pre-frame drain.
//!
//! Event mapping:
//! - terminal resize → `notify_resize`
//! - scroll events → `Wheel` payloads; shift+vertical scrolls horizontally
//! - mouse down/drag/up → `TouchStart`/`TouchMove`/`TouchEnd` with pointer
//!   id 0, so the gesture streams treat the mouse as a single touch
//! - ctrl+c → stop

use std::cell::Cell;
use std::io;
use std::time::Duration;

use crossterm::event::{
    self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEventKind, KeyModifiers,
    MouseEventKind,
};
use crossterm::{execute, terminal};

use crate::engine::Engine;
use crate::types::{EventType, Modifiers, Payload, TouchEvent, WheelEvent};

/// Lines of scroll per wheel event.
const WHEEL_STEP: f64 = 1.0;

/// The primary pointer id used for mouse-as-touch events.
const MOUSE_TOUCH_ID: u64 = 0;

/// What a host event means to the engine.
#[derive(Debug, Clone, PartialEq)]
enum HostAction {
    Inject(EventType, Payload),
    Resize([f64; 2]),
    Quit,
}

/// Translates one crossterm event into a host action. Pure, so the mapping
/// is testable without a terminal.
fn translate(event: &Event) -> Option<HostAction> {
    match event {
        Event::Resize(cols, rows) => Some(HostAction::Resize([*cols as f64, *rows as f64])),
        Event::Key(key) => {
            if key.kind == KeyEventKind::Press
                && key.code == KeyCode::Char('c')
                && key.modifiers.contains(KeyModifiers::CONTROL)
            {
                Some(HostAction::Quit)
            } else {
                None
            }
        }
        Event::Mouse(mouse) => {
            let client = [mouse.column as f64, mouse.row as f64];
            let modifiers = Modifiers {
                ctrl: mouse.modifiers.contains(KeyModifiers::CONTROL),
                alt: mouse.modifiers.contains(KeyModifiers::ALT),
                shift: mouse.modifiers.contains(KeyModifiers::SHIFT),
            };
            let wheel = |delta: [f64; 2]| {
                // Shifted vertical scroll reads as horizontal, the common
                // terminal convention.
                let delta = if modifiers.shift && delta[0] == 0.0 {
                    [delta[1], 0.0]
                } else {
                    delta
                };
                HostAction::Inject(
                    EventType::Wheel,
                    Payload::Wheel(WheelEvent {
                        delta,
                        client,
                        modifiers,
                    }),
                )
            };
            let touch = |ty: EventType| {
                HostAction::Inject(
                    ty,
                    Payload::Touch(TouchEvent {
                        id: MOUSE_TOUCH_ID,
                        x: client[0],
                        y: client[1],
                    }),
                )
            };
            match mouse.kind {
                MouseEventKind::ScrollUp => Some(wheel([0.0, -WHEEL_STEP])),
                MouseEventKind::ScrollDown => Some(wheel([0.0, WHEEL_STEP])),
                MouseEventKind::ScrollLeft => Some(wheel([-WHEEL_STEP, 0.0])),
                MouseEventKind::ScrollRight => Some(wheel([WHEEL_STEP, 0.0])),
                MouseEventKind::Down(_) => Some(touch(EventType::TouchStart)),
                MouseEventKind::Drag(_) => Some(touch(EventType::TouchMove)),
                MouseEventKind::Up(_) => Some(touch(EventType::TouchEnd)),
                MouseEventKind::Moved => None,
            }
        }
        _ => None,
    }
}

/// Crossterm event pump driving one engine.
pub struct Host {
    engine: Engine,
    running: Cell<bool>,
    mounted: Cell<bool>,
}

impl Host {
    pub fn new(engine: &Engine) -> Self {
        Self {
            engine: engine.clone(),
            running: Cell::new(false),
            mounted: Cell::new(false),
        }
    }

    /// Enters raw mode with mouse capture and primes the engine with the
    /// current terminal size.
    pub fn mount(&self) -> io::Result<()> {
        if self.mounted.get() {
            return Ok(());
        }
        terminal::enable_raw_mode()?;
        execute!(io::stdout(), EnableMouseCapture)?;
        let (cols, rows) = terminal::size()?;
        self.engine.start([cols as f64, rows as f64]);
        self.mounted.set(true);
        Ok(())
    }

    /// Restores the terminal. Safe to call when not mounted.
    pub fn unmount(&self) -> io::Result<()> {
        if !self.mounted.get() {
            return Ok(());
        }
        execute!(io::stdout(), DisableMouseCapture)?;
        terminal::disable_raw_mode()?;
        self.mounted.set(false);
        Ok(())
    }

    /// Pumps pending terminal events (waiting up to `timeout` for the
    /// first), runs one frame, and reports whether the loop should continue.
    pub fn tick(&self, timeout: Duration) -> io::Result<bool> {
        if event::poll(timeout)? {
            self.route(&event::read()?);
            // Drain whatever else arrived without waiting again.
            while event::poll(Duration::ZERO)? {
                self.route(&event::read()?);
            }
        }
        self.engine.step();
        Ok(self.running.get())
    }

    /// Mounts, runs the frame loop at roughly 60 fps until [`stop`](Self::stop)
    /// (or ctrl+c), then unmounts. The terminal is restored even when a tick
    /// fails.
    pub fn run(&self) -> io::Result<()> {
        self.mount()?;
        self.running.set(true);
        let result = loop {
            match self.tick(Duration::from_millis(16)) {
                Ok(true) => {}
                Ok(false) => break Ok(()),
                Err(err) => break Err(err),
            }
        };
        self.unmount()?;
        result
    }

    /// Ends the loop after the current frame.
    pub fn stop(&self) {
        self.running.set(false);
    }

    fn route(&self, event: &Event) {
        match translate(event) {
            Some(HostAction::Inject(ty, payload)) => self.engine.inject(ty, payload),
            Some(HostAction::Resize(size)) => self.engine.notify_resize(size),
            Some(HostAction::Quit) => self.stop(),
            None => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossterm::event::{KeyEvent, MouseButton, MouseEvent};

    fn mouse(kind: MouseEventKind, modifiers: KeyModifiers) -> Event {
        Event::Mouse(MouseEvent {
            kind,
            column: 4,
            row: 2,
            modifiers,
        })
    }

    #[test]
    fn test_resize_translates_to_size() {
        assert_eq!(
            translate(&Event::Resize(80, 24)),
            Some(HostAction::Resize([80.0, 24.0]))
        );
    }

    #[test]
    fn test_ctrl_c_quits() {
        let event = Event::Key(KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL));
        assert_eq!(translate(&event), Some(HostAction::Quit));

        let plain = Event::Key(KeyEvent::new(KeyCode::Char('c'), KeyModifiers::NONE));
        assert_eq!(translate(&plain), None);
    }

    #[test]
    fn test_scroll_maps_to_wheel() {
        let action = translate(&mouse(MouseEventKind::ScrollDown, KeyModifiers::NONE));
        let Some(HostAction::Inject(EventType::Wheel, Payload::Wheel(wheel))) = action else {
            panic!("expected a wheel injection, got {action:?}");
        };
        assert_eq!(wheel.delta, [0.0, WHEEL_STEP]);
        assert_eq!(wheel.client, [4.0, 2.0]);
    }

    #[test]
    fn test_shift_scroll_becomes_horizontal() {
        let action = translate(&mouse(MouseEventKind::ScrollDown, KeyModifiers::SHIFT));
        let Some(HostAction::Inject(EventType::Wheel, Payload::Wheel(wheel))) = action else {
            panic!("expected a wheel injection, got {action:?}");
        };
        assert_eq!(wheel.delta, [WHEEL_STEP, 0.0]);
        assert!(wheel.modifiers.shift);
    }

    #[test]
    fn test_mouse_buttons_map_to_touch_lifecycle() {
        let cases = [
            (MouseEventKind::Down(MouseButton::Left), EventType::TouchStart),
            (MouseEventKind::Drag(MouseButton::Left), EventType::TouchMove),
            (MouseEventKind::Up(MouseButton::Left), EventType::TouchEnd),
        ];
        for (kind, expected) in cases {
            let action = translate(&mouse(kind, KeyModifiers::NONE));
            let Some(HostAction::Inject(ty, Payload::Touch(touch))) = action else {
                panic!("expected a touch injection, got {action:?}");
            };
            assert_eq!(ty, expected);
            assert_eq!(touch.id, MOUSE_TOUCH_ID);
            assert_eq!((touch.x, touch.y), (4.0, 2.0));
        }
    }

    #[test]
    fn test_plain_mouse_motion_is_ignored() {
        assert_eq!(translate(&mouse(MouseEventKind::Moved, KeyModifiers::NONE)), None);
    }
}
