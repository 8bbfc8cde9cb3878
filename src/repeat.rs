//! Single-segment repeat looping.
//!
//! `RepeatLoop` is a two-state machine (`Idle`, `Looping(i)`). It never exits a loop on its
//! own; only user selection, explicit navigation, or a segment list that no longer holds
//! `i` brings it back to `Idle`.

use tracing::{debug, warn};

use crate::segments::Segment;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LoopState {
    #[default]
    Idle,
    Looping(usize),
}

/// An instruction for the host clock.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Seek {
    /// Target position in seconds.
    pub to: f64,
    /// Whether the host should (re)start playback after seeking.
    ///
    /// Loop rewinds leave the play state alone; entering a loop starts playback.
    pub resume: bool,
}

#[derive(Debug, Clone, Default)]
pub struct RepeatLoop {
    state: LoopState,
}

impl RepeatLoop {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> LoopState {
        self.state
    }

    pub fn looping_index(&self) -> Option<usize> {
        match self.state {
            LoopState::Looping(i) => Some(i),
            LoopState::Idle => None,
        }
    }

    /// User toggled looping on segment `index`.
    ///
    /// - Same segment while looping: toggles off, no seek.
    /// - Any other valid segment: enters `Looping(index)` and asks the host to seek to its start.
    /// - Out of range: falls back to `Idle`.
    pub fn select(&mut self, segments: &[Segment], index: usize) -> Option<Seek> {
        if self.state == LoopState::Looping(index) {
            debug!(index, "repeat loop toggled off");
            self.state = LoopState::Idle;
            return None;
        }

        let Some(seg) = segments.get(index) else {
            warn!(index, len = segments.len(), "repeat loop target out of range");
            self.state = LoopState::Idle;
            return None;
        };

        debug!(index, start = seg.start_time, end = seg.end_time, "repeat loop engaged");
        self.state = LoopState::Looping(index);
        Some(Seek {
            to: seg.start_time,
            resume: true,
        })
    }

    /// User navigated elsewhere (clicked another sentence, left the page, ...).
    pub fn exit(&mut self) {
        if self.state != LoopState::Idle {
            debug!("repeat loop exited by navigation");
        }
        self.state = LoopState::Idle;
    }

    /// Run on every clock tick, before the active segment is located.
    ///
    /// Returns a rewind once the clock reaches the looped segment's end.
    pub fn check(&mut self, segments: &[Segment], t: f64) -> Option<Seek> {
        let LoopState::Looping(index) = self.state else {
            return None;
        };

        let Some(seg) = segments.get(index) else {
            warn!(index, len = segments.len(), "looped segment vanished; going idle");
            self.state = LoopState::Idle;
            return None;
        };

        (t >= seg.end_time).then_some(Seek {
            to: seg.start_time,
            resume: false,
        })
    }

    /// Drop back to `Idle` if the looped index is no longer valid for `segments`.
    pub fn revalidate(&mut self, segments: &[Segment]) {
        if let LoopState::Looping(index) = self.state {
            if index >= segments.len() {
                warn!(index, len = segments.len(), "looped segment vanished; going idle");
                self.state = LoopState::Idle;
            }
        }
    }
}
