//! Camera - Chase camera framing for the renderer

use serde::{Deserialize, Serialize};

use crate::game_server::player::{Player, PlayerState};

/// Perspective camera trailing the player at a fixed offset
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FollowCamera {
    /// Offset from the player, behind and above
    pub offset: [f32; 3],
    /// Vertical field of view in degrees
    pub fov: f32,
    pub near: f32,
    pub far: f32,
    /// Viewport width / height
    pub aspect: f32,
}

impl Default for FollowCamera {
    fn default() -> Self {
        Self {
            offset: [0.0, 6.0, -15.0],
            fov: 75.0,
            near: 0.1,
            far: 1000.0,
            aspect: 16.0 / 9.0,
        }
    }
}

impl FollowCamera {
    /// Track a new viewport size. Zero-height viewports are ignored.
    pub fn resize(&mut self, width: u32, height: u32) {
        if height == 0 {
            return;
        }
        self.aspect = width as f32 / height as f32;
    }

    /// Camera placement for the current player position
    pub fn view(&self, player: &PlayerState) -> CameraSnapshot {
        let target = [player.lateral, Player::HEIGHT, player.distance];
        CameraSnapshot {
            position: [
                target[0] + self.offset[0],
                target[1] + self.offset[1],
                target[2] + self.offset[2],
            ],
            look_at: target,
            fov: self.fov,
            aspect: self.aspect,
            near: self.near,
            far: self.far,
        }
    }
}

/// Everything a renderer needs to set up the projection for one frame
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CameraSnapshot {
    pub position: [f32; 3],
    pub look_at: [f32; 3],
    pub fov: f32,
    pub aspect: f32,
    pub near: f32,
    pub far: f32,
}
