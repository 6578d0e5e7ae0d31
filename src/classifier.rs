use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::movement::{KeyState, KeyStates, MovementKey};
use crate::shot::{
    ShotResult, ShotType, CLEAN_STOP_COLOR, LOOSE_STOP_COLOR, RUN_AND_GUN_COLOR, STATIC_COLOR,
};
use crate::transition::{TransitionKind, TransitionRecord, TransitionTracker};

/// Timing windows, all in milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Thresholds {
    /// A press this soon after the opposite key's release counts as a gap stop (exclusive).
    pub early_release_window_ms: f64,
    /// A stop this recent is reported with the shot (exclusive).
    pub recent_stop_window_ms: f64,
    /// Stops at or under this magnitude are shown as clean.
    pub clean_stop_tolerance_ms: f64,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            early_release_window_ms: 300.0,
            recent_stop_window_ms: 500.0,
            clean_stop_tolerance_ms: 20.0,
        }
    }
}

/// How a shot is turned into a type and color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum ClassificationPolicy {
    /// Run&Gun carries recent stop data; stop color graded by magnitude.
    #[default]
    Graded,
    /// Run&Gun is bare; overlap is always green and gap always orange.
    KindOnly,
}

/// Movement/shot classifier for one input session.
///
/// Not synchronized; callers serialize access (see [`crate::session::InputSession`]).
#[derive(Debug, Clone)]
pub struct MovementClassifier {
    keys: KeyStates,
    tracker: TransitionTracker,
    thresholds: Thresholds,
    policy: ClassificationPolicy,
}

impl Default for MovementClassifier {
    fn default() -> Self {
        Self::new(Thresholds::default(), ClassificationPolicy::default())
    }
}

impl MovementClassifier {
    pub fn new(thresholds: Thresholds, policy: ClassificationPolicy) -> Self {
        Self {
            keys: KeyStates::new(),
            tracker: TransitionTracker::new(thresholds.early_release_window_ms),
            thresholds,
            policy,
        }
    }

    pub fn thresholds(&self) -> &Thresholds {
        &self.thresholds
    }

    pub fn policy(&self) -> ClassificationPolicy {
        self.policy
    }

    pub fn key_state(&self, key: MovementKey) -> &KeyState {
        self.keys.get(key)
    }

    pub fn held_keys(&self) -> Vec<MovementKey> {
        self.keys.held().collect()
    }

    pub fn last_transition(&self) -> Option<&TransitionRecord> {
        self.tracker.last()
    }

    pub fn is_moving_horizontally(&self) -> bool {
        self.keys.is_held(MovementKey::Left) || self.keys.is_held(MovementKey::Right)
    }

    pub fn on_press(&mut self, key: MovementKey, t: f64) {
        self.keys.on_press(key, t);
        if key.is_horizontal() {
            self.tracker.on_press(&self.keys, key, t);
        }
    }

    pub fn on_release(&mut self, key: MovementKey, t: f64) {
        self.keys.on_release(key, t);
        if key.is_horizontal() {
            self.tracker.on_release(&self.keys, key, t);
        }
    }

    /// The most recent stop with its delay to `shot_time`, if still recent.
    fn recent_stop(&self, shot_time: f64) -> Option<(&TransitionRecord, f64)> {
        let rec = self.tracker.last()?;
        let delay = shot_time - rec.completed_at;
        (0.0..self.thresholds.recent_stop_window_ms)
            .contains(&delay)
            .then_some((rec, delay))
    }

    /// Classify a shot fired at `shot_time`. Does not change any state.
    pub fn classify(&self, shot_time: f64) -> ShotResult {
        let run_gun = self.is_moving_horizontally();
        let recent = self.recent_stop(shot_time);

        match (self.policy, run_gun, recent) {
            (ClassificationPolicy::Graded, true, Some((rec, delay))) => ShotResult {
                shot_type: ShotType::RunAndGun,
                color: RUN_AND_GUN_COLOR,
                magnitude: Some(rec.magnitude),
                delay: Some(delay),
            },
            (_, true, _) => ShotResult::bare(ShotType::RunAndGun, RUN_AND_GUN_COLOR),
            (policy, false, Some((rec, delay))) => ShotResult {
                shot_type: shot_type_of(rec.kind),
                color: stop_color(policy, rec, &self.thresholds),
                magnitude: Some(rec.magnitude),
                delay: Some(delay),
            },
            (_, false, None) => ShotResult::bare(ShotType::Static, STATIC_COLOR),
        }
    }
}

fn shot_type_of(kind: TransitionKind) -> ShotType {
    match kind {
        TransitionKind::Overlap => ShotType::Overlap,
        TransitionKind::EarlyRelease => ShotType::EarlyRelease,
    }
}

fn stop_color(
    policy: ClassificationPolicy,
    rec: &TransitionRecord,
    thresholds: &Thresholds,
) -> &'static str {
    match policy {
        ClassificationPolicy::Graded => {
            if rec.magnitude.abs() <= thresholds.clean_stop_tolerance_ms {
                CLEAN_STOP_COLOR
            } else {
                LOOSE_STOP_COLOR
            }
        }
        ClassificationPolicy::KindOnly => match rec.kind {
            TransitionKind::Overlap => CLEAN_STOP_COLOR,
            TransitionKind::EarlyRelease => LOOSE_STOP_COLOR,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use MovementKey::{Forward, Left, Right};

    fn overlap_at(c: &mut MovementClassifier, magnitude: f64, completed_at: f64) {
        c.on_press(Right, completed_at - magnitude - 100.0);
        c.on_press(Left, completed_at - magnitude);
        c.on_release(Right, completed_at);
        c.on_release(Left, completed_at);
    }

    #[test]
    fn no_transition_is_static_even_near_clock_start() {
        let c = MovementClassifier::default();
        let shot = c.classify(10.0);
        assert_eq!(shot, ShotResult::bare(ShotType::Static, STATIC_COLOR));
    }

    #[test]
    fn run_and_gun_dominates() {
        let mut c = MovementClassifier::default();
        c.on_press(Left, 0.0);
        c.on_press(Right, 5.0);
        let shot = c.classify(1000.0);
        assert_eq!(shot.shot_type, ShotType::RunAndGun);
        assert_eq!(shot.color, RUN_AND_GUN_COLOR);
        assert!(!shot.has_stop_data());
    }

    #[test]
    fn run_and_gun_surfaces_recent_stop() {
        let mut c = MovementClassifier::default();
        c.on_press(Right, 0.0);
        c.on_press(Left, 250.0);
        c.on_release(Right, 260.0);

        let shot = c.classify(300.0);
        assert_eq!(shot.shot_type, ShotType::RunAndGun);
        assert_eq!(shot.color, RUN_AND_GUN_COLOR);
        assert_eq!(shot.magnitude, Some(10.0));
        assert_eq!(shot.delay, Some(40.0));
    }

    #[test]
    fn vertical_keys_do_not_make_run_and_gun() {
        let mut c = MovementClassifier::default();
        c.on_press(Forward, 0.0);
        assert_eq!(c.classify(50.0).shot_type, ShotType::Static);
        assert_eq!(c.held_keys(), vec![Forward]);
    }

    #[test]
    fn recency_boundary_is_exclusive() {
        let mut c = MovementClassifier::default();
        overlap_at(&mut c, 15.0, 1000.0);

        assert_eq!(c.classify(1499.0).shot_type, ShotType::Overlap);
        assert_eq!(c.classify(1500.0).shot_type, ShotType::Static);
        assert_eq!(c.classify(1500.0).magnitude, None);
    }

    #[test]
    fn color_threshold_is_inclusive() {
        let mut c = MovementClassifier::default();
        overlap_at(&mut c, 20.0, 1000.0);
        let shot = c.classify(1100.0);
        assert_eq!(shot.color, CLEAN_STOP_COLOR);
        assert_eq!(shot.magnitude, Some(20.0));
        assert_eq!(shot.delay, Some(100.0));

        let mut c = MovementClassifier::default();
        overlap_at(&mut c, 21.0, 1000.0);
        assert_eq!(c.classify(1100.0).color, LOOSE_STOP_COLOR);
    }

    #[test]
    fn small_gap_is_graded_green() {
        let mut c = MovementClassifier::default();
        c.on_press(Right, 0.0);
        c.on_release(Right, 100.0);
        c.on_press(Left, 112.0);
        c.on_release(Left, 130.0);

        let shot = c.classify(200.0);
        assert_eq!(shot.shot_type, ShotType::EarlyRelease);
        assert_eq!(shot.color, CLEAN_STOP_COLOR);
    }

    #[test]
    fn shot_before_stop_completion_is_not_recent() {
        let mut c = MovementClassifier::default();
        overlap_at(&mut c, 10.0, 1000.0);
        assert_eq!(c.classify(990.0).shot_type, ShotType::Static);
    }

    #[test]
    fn classify_is_a_pure_read() {
        let mut c = MovementClassifier::default();
        overlap_at(&mut c, 30.0, 1000.0);
        let first = c.classify(1200.0);
        let second = c.classify(1200.0);
        assert_eq!(first, second);
        assert_eq!(c.last_transition().unwrap().completed_at, 1000.0);
    }

    #[test]
    fn kind_only_policy() {
        let mut c = MovementClassifier::new(Thresholds::default(), ClassificationPolicy::KindOnly);
        overlap_at(&mut c, 80.0, 1000.0);
        assert_eq!(c.classify(1100.0).color, CLEAN_STOP_COLOR);

        c.on_press(Right, 1200.0);
        c.on_release(Right, 1300.0);
        c.on_press(Left, 1305.0);
        assert!(!c.classify(1310.0).has_stop_data());

        c.on_release(Left, 1320.0);
        let shot = c.classify(1350.0);
        assert_eq!(shot.shot_type, ShotType::EarlyRelease);
        assert_eq!(shot.color, LOOSE_STOP_COLOR);
        assert_eq!(shot.magnitude, Some(5.0));
    }

    #[test]
    fn custom_thresholds() {
        let thresholds = Thresholds {
            early_release_window_ms: 100.0,
            recent_stop_window_ms: 200.0,
            clean_stop_tolerance_ms: 50.0,
        };
        let mut c = MovementClassifier::new(thresholds, ClassificationPolicy::Graded);
        c.on_press(Right, 0.0);
        c.on_release(Right, 10.0);
        c.on_press(Left, 150.0);
        assert!(c.last_transition().is_none());

        c.on_release(Left, 160.0);
        c.on_press(Right, 200.0);
        c.on_release(Right, 210.0);
        let shot = c.classify(300.0);
        assert_eq!(shot.shot_type, ShotType::EarlyRelease);
        assert_eq!(shot.color, CLEAN_STOP_COLOR);
        assert_eq!(c.classify(410.0).shot_type, ShotType::Static);
    }
}
