use log::debug;
use serde::{Deserialize, Serialize};

use crate::movement::{KeyStates, MovementKey};

/// Kind of a completed left/right key swap.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, strum_macros::Display)]
pub enum TransitionKind {
    /// New direction pressed before the old one was released.
    Overlap,
    /// Old direction released, then the new one pressed after a short gap.
    EarlyRelease,
}

/// The single most recent completed stop.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TransitionRecord {
    pub kind: TransitionKind,
    /// Overlap or gap length in ms, never negative.
    pub magnitude: f64,
    pub completed_at: f64,
}

/// Latch holding the last completed stop, `None` until the first one.
#[derive(Debug, Clone)]
pub struct TransitionTracker {
    last: Option<TransitionRecord>,
    early_release_window_ms: f64,
}

impl TransitionTracker {
    pub fn new(early_release_window_ms: f64) -> Self {
        Self {
            last: None,
            early_release_window_ms,
        }
    }

    pub fn last(&self) -> Option<&TransitionRecord> {
        self.last.as_ref()
    }

    /// Call after `key` has been recorded as pressed in `keys`.
    pub fn on_press(&mut self, keys: &KeyStates, key: MovementKey, t: f64) {
        let Some(opposite) = key.opposite() else {
            return;
        };
        let opp = keys.get(opposite);
        // a held opposite key resolves as an overlap once it is released
        if opp.is_held {
            return;
        }
        let Some(released_at) = opp.release_time else {
            return;
        };
        let gap = t - released_at;
        if (0.0..self.early_release_window_ms).contains(&gap) {
            self.record(TransitionKind::EarlyRelease, gap, t);
        }
    }

    /// Call after `key` has been recorded as released in `keys`.
    pub fn on_release(&mut self, keys: &KeyStates, key: MovementKey, t: f64) {
        let Some(opposite) = key.opposite() else {
            return;
        };
        let opp = keys.get(opposite);
        if !opp.is_held {
            return;
        }
        let Some(pressed_at) = opp.press_time else {
            return;
        };
        let overlap = t - pressed_at;
        if overlap > 0.0 {
            self.record(TransitionKind::Overlap, overlap, t);
        }
    }

    fn record(&mut self, kind: TransitionKind, magnitude: f64, completed_at: f64) {
        debug!("stop completed: {kind} {magnitude:.1}ms at {completed_at:.1}");
        self.last = Some(TransitionRecord {
            kind,
            magnitude,
            completed_at,
        });
    }
}
