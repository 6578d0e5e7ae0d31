use serde::{Deserialize, Serialize};

pub const RUN_AND_GUN_COLOR: &str = "#ff4444";
pub const CLEAN_STOP_COLOR: &str = "#228b22";
pub const LOOSE_STOP_COLOR: &str = "#ff8c00";
pub const STATIC_COLOR: &str = "#888888";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, strum_macros::Display)]
pub enum ShotType {
    RunAndGun,
    Overlap,
    EarlyRelease,
    Static,
}

/// Classification of a single shot.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ShotResult {
    pub shot_type: ShotType,
    pub color: &'static str,
    /// Overlap or gap of the most recent stop, in ms.
    pub magnitude: Option<f64>,
    /// Time from that stop completing to the shot, in ms.
    pub delay: Option<f64>,
}

/// JSON shape pushed to display clients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WireShot {
    #[serde(rename = "type")]
    pub shot_type: ShotType,
    pub color: String,
    pub diff: Option<i64>,
    pub delay: Option<i64>,
}

impl ShotResult {
    pub fn bare(shot_type: ShotType, color: &'static str) -> Self {
        Self {
            shot_type,
            color,
            magnitude: None,
            delay: None,
        }
    }

    pub fn has_stop_data(&self) -> bool {
        self.magnitude.is_some() && self.delay.is_some()
    }

    /// Millisecond values are truncated, not rounded.
    pub fn to_wire_form(&self) -> WireShot {
        WireShot {
            shot_type: self.shot_type,
            color: self.color.to_string(),
            diff: self.magnitude.map(|m| m.trunc() as i64),
            delay: self.delay.map(|d| d.trunc() as i64),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wire_form_truncates() {
        let shot = ShotResult {
            shot_type: ShotType::Overlap,
            color: CLEAN_STOP_COLOR,
            magnitude: Some(19.99),
            delay: Some(120.7),
        };
        let wire = shot.to_wire_form();
        assert_eq!(wire.diff, Some(19));
        assert_eq!(wire.delay, Some(120));
    }

    #[test]
    fn wire_json_has_exactly_four_fields() {
        let shot = ShotResult::bare(ShotType::Static, STATIC_COLOR);
        let json = serde_json::to_value(shot.to_wire_form()).unwrap();
        let obj = json.as_object().unwrap();

        assert_eq!(obj.len(), 4);
        assert_eq!(obj["type"], "Static");
        assert_eq!(obj["color"], "#888888");
        assert!(obj["diff"].is_null());
        assert!(obj["delay"].is_null());
    }

    #[test]
    fn wire_type_names() {
        for (ty, name) in [
            (ShotType::RunAndGun, "\"RunAndGun\""),
            (ShotType::Overlap, "\"Overlap\""),
            (ShotType::EarlyRelease, "\"EarlyRelease\""),
            (ShotType::Static, "\"Static\""),
        ] {
            assert_eq!(serde_json::to_string(&ty).unwrap(), name);
        }
    }

    #[test]
    fn colors_are_seven_char_hex() {
        for c in [
            RUN_AND_GUN_COLOR,
            CLEAN_STOP_COLOR,
            LOOSE_STOP_COLOR,
            STATIC_COLOR,
        ] {
            assert_eq!(c.len(), 7);
            assert!(c.starts_with('#'));
            assert!(c[1..].chars().all(|ch| ch.is_ascii_hexdigit()));
        }
    }
}
