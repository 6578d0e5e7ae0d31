use serde::{Deserialize, Serialize};

/// The four tracked movement keys.
///
/// Only `Left` and `Right` take part in stop detection. `Forward` and `Back`
/// are recorded so the overlay can show them, nothing more.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, strum_macros::Display,
)]
pub enum MovementKey {
    Forward,
    Back,
    Left,
    Right,
}

impl MovementKey {
    pub const ALL: [MovementKey; 4] = [
        MovementKey::Forward,
        MovementKey::Back,
        MovementKey::Left,
        MovementKey::Right,
    ];

    fn index(self) -> usize {
        match self {
            MovementKey::Forward => 0,
            MovementKey::Back => 1,
            MovementKey::Left => 2,
            MovementKey::Right => 3,
        }
    }

    pub fn is_horizontal(self) -> bool {
        matches!(self, MovementKey::Left | MovementKey::Right)
    }

    /// Left <-> Right. Vertical keys have no counter-strafe partner.
    pub fn opposite(self) -> Option<MovementKey> {
        match self {
            MovementKey::Left => Some(MovementKey::Right),
            MovementKey::Right => Some(MovementKey::Left),
            MovementKey::Forward | MovementKey::Back => None,
        }
    }
}

/// Press/release bookkeeping for one key, timestamps in milliseconds.
///
/// Both timestamps start out as `None`: a key that was never released must
/// not look like it was released at time zero.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct KeyState {
    pub press_time: Option<f64>,
    pub release_time: Option<f64>,
    pub is_held: bool,
}

impl KeyState {
    pub fn on_press(&mut self, t: f64) {
        self.press_time = Some(t);
        self.is_held = true;
    }

    pub fn on_release(&mut self, t: f64) {
        self.release_time = Some(t);
        self.is_held = false;
    }
}

/// Fixed table of key states indexed by [`MovementKey`].
#[derive(Debug, Clone, Default)]
pub struct KeyStates {
    states: [KeyState; 4],
}

impl KeyStates {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: MovementKey) -> &KeyState {
        &self.states[key.index()]
    }

    pub fn on_press(&mut self, key: MovementKey, t: f64) {
        self.states[key.index()].on_press(t);
    }

    pub fn on_release(&mut self, key: MovementKey, t: f64) {
        self.states[key.index()].on_release(t);
    }

    pub fn is_held(&self, key: MovementKey) -> bool {
        self.get(key).is_held
    }

    pub fn held(&self) -> impl Iterator<Item = MovementKey> + '_ {
        MovementKey::ALL.into_iter().filter(|k| self.is_held(*k))
    }
}
