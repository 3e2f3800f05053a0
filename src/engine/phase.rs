//! The globally observable frame phase.
//!
//! The engine walks `Start → Update → End → Start` once per frame.
//! Components consult the current phase to decide whether a write is visible
//! this frame or must be deferred until `End`. The runtime is single-threaded
//! (one renderer loop per process), so a thread-local cell is the
//! process-wide phase flag.

use std::cell::Cell;

/// One stage of the engine's frame cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Between frames; also the state entered after settle completes.
    Start,
    /// Pre-frame input has been drained; frame-queue recomputation runs.
    Update,
    /// Frame recomputation is done; commits and settle cleanup run.
    End,
}

thread_local! {
    static CURRENT_PHASE: Cell<Phase> = const { Cell::new(Phase::Start) };
}

/// The phase the engine is currently in.
pub fn current_phase() -> Phase {
    CURRENT_PHASE.with(|p| p.get())
}

pub(crate) fn set_phase(phase: Phase) {
    CURRENT_PHASE.with(|p| p.set(phase));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_phase_round_trip() {
        set_phase(Phase::Update);
        assert_eq!(current_phase(), Phase::Update);
        set_phase(Phase::End);
        assert_eq!(current_phase(), Phase::End);
        set_phase(Phase::Start);
        assert_eq!(current_phase(), Phase::Start);
    }
}
