//! Player - The cube running down the track
//!
//! Holds position and steering state. The run loop advances the player
//! once per tick at a fixed forward speed.

use serde::{Deserialize, Serialize};

/// Lateral steering direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Left,
    Right,
}

impl Direction {
    /// Sign along the lateral axis (left is negative)
    pub fn sign(self) -> f32 {
        match self {
            Direction::Left => -1.0,
            Direction::Right => 1.0,
        }
    }

    pub fn opposite(self) -> Self {
        match self {
            Direction::Left => Direction::Right,
            Direction::Right => Direction::Left,
        }
    }
}

/// Which steering keys are currently held
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct SteerFlags {
    pub left: bool,
    pub right: bool,
}

impl SteerFlags {
    fn held(&self, direction: Direction) -> bool {
        match direction {
            Direction::Left => self.left,
            Direction::Right => self.right,
        }
    }

    fn set(&mut self, direction: Direction, held: bool) {
        match direction {
            Direction::Left => self.left = held,
            Direction::Right => self.right = held,
        }
    }
}

/// Complete player state
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PlayerState {
    /// Lateral offset from the track center
    pub lateral: f32,
    /// Distance traveled along the track
    pub distance: f32,
    /// Lateral movement per tick
    pub lateral_velocity: f32,
    /// Held steering keys
    pub steer: SteerFlags,
}

impl PlayerState {
    /// Back to the start line. Steering is left untouched so a held key
    /// keeps working across runs.
    pub fn reset(&mut self) {
        self.lateral = 0.0;
        self.distance = 0.0;
    }
}

/// Player movement logic
pub struct Player;

impl Player {
    /// Height of the cube's center above the track surface
    pub const HEIGHT: f32 = 0.5;

    /// Advance one tick. Returns true when the lateral position was clamped.
    pub fn update(state: &mut PlayerState, forward_speed: f32, lateral_bound: f32) -> bool {
        state.lateral += state.lateral_velocity;
        let clamped = Self::clamp_lateral(state, lateral_bound);
        state.distance += forward_speed;
        clamped
    }

    /// Hold a steering key down: move at `lateral_speed` toward `direction`.
    pub fn press(state: &mut PlayerState, direction: Direction, lateral_speed: f32) {
        state.steer.set(direction, true);
        state.lateral_velocity = direction.sign() * lateral_speed;
    }

    /// Release a steering key. Falls back to the other direction if its key
    /// is still held, otherwise stops lateral movement.
    pub fn release(state: &mut PlayerState, direction: Direction, lateral_speed: f32) {
        state.steer.set(direction, false);
        let other = direction.opposite();
        state.lateral_velocity = if state.steer.held(other) {
            other.sign() * lateral_speed
        } else {
            0.0
        };
    }

    /// Jump `step` units toward `direction` right away.
    pub fn step(state: &mut PlayerState, direction: Direction, step: f32, lateral_bound: f32) -> bool {
        state.lateral += direction.sign() * step;
        Self::clamp_lateral(state, lateral_bound)
    }

    fn clamp_lateral(state: &mut PlayerState, bound: f32) -> bool {
        let clamped = state.lateral.clamp(-bound, bound);
        let changed = clamped != state.lateral;
        state.lateral = clamped;
        changed
    }
}

/// Compact player state for IPC transfer
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlayerSnapshot {
    /// `[lateral, height, distance]`
    pub position: [f32; 3],
    pub lateral_velocity: f32,
}

impl From<&PlayerState> for PlayerSnapshot {
    fn from(state: &PlayerState) -> Self {
        Self {
            position: [state.lateral, Player::HEIGHT, state.distance],
            lateral_velocity: state.lateral_velocity,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_update_moves_forward() {
        let mut state = PlayerState::default();
        Player::update(&mut state, 0.15, 4.0);
        Player::update(&mut state, 0.15, 4.0);
        assert!((state.distance - 0.3).abs() < 1e-6);
        assert_eq!(state.lateral, 0.0);
    }

    #[test]
    fn test_lateral_clamps_to_bound() {
        let mut state = PlayerState::default();
        Player::press(&mut state, Direction::Right, 0.15);
        let mut clamped = false;
        for _ in 0..100 {
            clamped |= Player::update(&mut state, 0.15, 4.0);
            assert!(state.lateral <= 4.0);
        }
        assert!(clamped);
        assert_eq!(state.lateral, 4.0);
    }

    #[test]
    fn test_release_falls_back_to_held_key() {
        let mut state = PlayerState::default();
        Player::press(&mut state, Direction::Left, 0.15);
        Player::press(&mut state, Direction::Right, 0.15);
        assert_eq!(state.lateral_velocity, 0.15);

        Player::release(&mut state, Direction::Right, 0.15);
        assert_eq!(state.lateral_velocity, -0.15);

        Player::release(&mut state, Direction::Left, 0.15);
        assert_eq!(state.lateral_velocity, 0.0);
    }

    #[test]
    fn test_step_clamps() {
        let mut state = PlayerState::default();
        assert!(!Player::step(&mut state, Direction::Left, 2.5, 4.0));
        assert_eq!(state.lateral, -2.5);
        assert!(Player::step(&mut state, Direction::Left, 2.5, 4.0));
        assert_eq!(state.lateral, -4.0);
    }

    #[test]
    fn test_reset_keeps_steering() {
        let mut state = PlayerState::default();
        Player::press(&mut state, Direction::Left, 0.15);
        state.distance = 500.0;
        state.lateral = -3.0;
        state.reset();
        assert_eq!((state.lateral, state.distance), (0.0, 0.0));
        assert_eq!(state.lateral_velocity, -0.15);
    }
}
