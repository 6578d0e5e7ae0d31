use crossterm::event::KeyCode;
use serde::{Deserialize, Serialize};

use crate::movement::MovementKey;

/// Characters bound to the four movement keys. Matching ignores case.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct KeyBindings {
    pub forward: char,
    pub back: char,
    pub left: char,
    pub right: char,
}

impl Default for KeyBindings {
    fn default() -> Self {
        Self {
            forward: 'w',
            back: 's',
            left: 'a',
            right: 'd',
        }
    }
}

impl KeyBindings {
    pub fn key_for(&self, code: KeyCode) -> Option<MovementKey> {
        let KeyCode::Char(c) = code else {
            return None;
        };
        let c = c.to_ascii_lowercase();
        [
            (self.forward, MovementKey::Forward),
            (self.back, MovementKey::Back),
            (self.left, MovementKey::Left),
            (self.right, MovementKey::Right),
        ]
        .into_iter()
        .find(|(bound, _)| bound.to_ascii_lowercase() == c)
        .map(|(_, key)| key)
    }

    pub fn label(&self, key: MovementKey) -> char {
        let c = match key {
            MovementKey::Forward => self.forward,
            MovementKey::Back => self.back,
            MovementKey::Left => self.left,
            MovementKey::Right => self.right,
        };
        c.to_ascii_uppercase()
    }
}
