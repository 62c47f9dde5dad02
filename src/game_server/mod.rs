//! Game Server Module
//!
//! Headless run loop: player movement, gate scoring and run resets.
//! The desktop shell drives it through Tauri commands.

pub mod camera;
pub mod error;
pub mod gate;
pub mod input;
pub mod player;
pub mod run;
pub mod simulation;

pub use error::ConfigError;
pub use gate::{Effect, EffectSet, Gate, GateEffect, GateLayout, GateState};
pub use input::{InputEvent, SteeringMode};
pub use player::{Direction, Player, PlayerState};
pub use run::{Run, RunConfig, RunEvent, RunResult, RunSnapshot};
pub use simulation::{GameServer, GameState, ServerStats, TickReport};
