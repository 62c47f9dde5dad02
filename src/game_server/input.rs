//! Input - Key codes to steering commands

use serde::{Deserialize, Serialize};

use crate::game_server::player::Direction;

/// How steering keys move the player
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum SteeringMode {
    /// Held keys set a lateral velocity
    #[default]
    Velocity,
    /// Each key press jumps a fixed distance
    Step { step: f32 },
}

/// A steering key going down or up
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum InputEvent {
    KeyDown(Direction),
    KeyUp(Direction),
}

impl InputEvent {
    /// `None` for keys that do not steer
    pub fn key_down(code: &str) -> Option<Self> {
        direction_for_key(code).map(InputEvent::KeyDown)
    }

    pub fn key_up(code: &str) -> Option<Self> {
        direction_for_key(code).map(InputEvent::KeyUp)
    }
}

/// Map a DOM-style key value (`"a"`, `"ArrowLeft"`, ...) to a direction.
pub fn direction_for_key(code: &str) -> Option<Direction> {
    match code.to_lowercase().as_str() {
        "a" | "arrowleft" => Some(Direction::Left),
        "d" | "arrowright" => Some(Direction::Right),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_mapping() {
        assert_eq!(direction_for_key("a"), Some(Direction::Left));
        assert_eq!(direction_for_key("A"), Some(Direction::Left));
        assert_eq!(direction_for_key("ArrowRight"), Some(Direction::Right));
        assert_eq!(direction_for_key("w"), None);
    }

    #[test]
    fn test_events() {
        assert_eq!(InputEvent::key_down("D"), Some(InputEvent::KeyDown(Direction::Right)));
        assert_eq!(InputEvent::key_up("arrowleft"), Some(InputEvent::KeyUp(Direction::Left)));
        assert_eq!(InputEvent::key_up("Escape"), None);
    }

    #[test]
    fn test_steering_mode_json() {
        let mode: SteeringMode = serde_json::from_str(r#"{"kind":"step","step":2.5}"#).unwrap();
        assert_eq!(mode, SteeringMode::Step { step: 2.5 });
    }
}
