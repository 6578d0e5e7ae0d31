use std::sync::{Arc, Mutex};

use log::info;

use crate::shot::ShotResult;

/// Consumer of classified shots. Never called while the session lock is held,
/// so implementations may block.
pub trait ShotSink: Send + Sync {
    fn deliver(&self, shot: &ShotResult);
}

/// Holds the newest shot for the overlay to draw.
#[derive(Debug, Clone, Default)]
pub struct LatestShot {
    inner: Arc<Mutex<Option<ShotResult>>>,
}

impl LatestShot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self) -> Option<ShotResult> {
        match self.inner.lock() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

impl ShotSink for LatestShot {
    fn deliver(&self, shot: &ShotResult) {
        let mut guard = match self.inner.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        *guard = Some(shot.clone());
    }
}

/// Writes every shot to the log at info level.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogSink;

impl ShotSink for LogSink {
    fn deliver(&self, shot: &ShotResult) {
        let wire = shot.to_wire_form();
        info!(
            "shot: {} diff={:?} delay={:?}",
            wire.shot_type, wire.diff, wire.delay
        );
    }
}
