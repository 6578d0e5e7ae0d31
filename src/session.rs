use std::sync::{Mutex, MutexGuard};

use crate::classifier::MovementClassifier;
use crate::movement::MovementKey;
use crate::shot::ShotResult;
use crate::sink::ShotSink;

/// One input-capture session: a classifier behind a single lock plus the
/// sinks that receive each classified shot.
///
/// Press, release and click may arrive from different threads. Sinks run
/// after the lock has been released.
pub struct InputSession {
    classifier: Mutex<MovementClassifier>,
    sinks: Vec<Box<dyn ShotSink>>,
}

impl InputSession {
    pub fn new(classifier: MovementClassifier) -> Self {
        Self {
            classifier: Mutex::new(classifier),
            sinks: Vec::new(),
        }
    }

    pub fn with_sink(mut self, sink: impl ShotSink + 'static) -> Self {
        self.sinks.push(Box::new(sink));
        self
    }

    fn lock(&self) -> MutexGuard<'_, MovementClassifier> {
        // sinks never run under this lock, so a poisoned guard still holds consistent state
        match self.classifier.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    pub fn on_press(&self, key: MovementKey, t: f64) {
        self.lock().on_press(key, t);
    }

    pub fn on_release(&self, key: MovementKey, t: f64) {
        self.lock().on_release(key, t);
    }

    /// Classify a shot and hand it to every sink.
    pub fn on_click(&self, t: f64) -> ShotResult {
        let shot = self.lock().classify(t);
        for sink in &self.sinks {
            sink.deliver(&shot);
        }
        shot
    }

    pub fn held_keys(&self) -> Vec<MovementKey> {
        self.lock().held_keys()
    }

    /// Run `f` against a consistent view of the classifier.
    pub fn inspect<R>(&self, f: impl FnOnce(&MovementClassifier) -> R) -> R {
        f(&self.lock())
    }
}

impl Default for InputSession {
    fn default() -> Self {
        Self::new(MovementClassifier::default())
    }
}
