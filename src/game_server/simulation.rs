//! Simulation - Main game server and loop
//!
//! Manages the game server state, handles tick updates and input, and
//! provides the interface for Tauri commands.

use std::time::Instant;

use serde::{Deserialize, Serialize};

use crate::game_server::error::ConfigError;
use crate::game_server::gate::Gate;
use crate::game_server::input::{InputEvent, SteeringMode};
use crate::game_server::run::{Run, RunConfig, RunEvent, RunResult, RunSnapshot};

/// Session state of the game server
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GameState {
    Idle,
    Ready,
    Running,
    Paused,
}

/// Server statistics
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerStats {
    pub tick_rate: f32,
    pub avg_tick_time_ms: f32,
    pub gate_count: u32,
    pub run_number: u32,
    pub game_state: GameState,
}

/// Result of one tick: the new state plus anything that happened during it
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TickReport {
    pub snapshot: RunSnapshot,
    pub events: Vec<RunEvent>,
}

impl TickReport {
    /// Results of runs that finished during this tick
    pub fn runs_ended(&self) -> impl Iterator<Item = &RunResult> {
        self.events.iter().filter_map(|event| match event {
            RunEvent::RunEnded(result) => Some(result),
            _ => None,
        })
    }
}

/// Main game server
pub struct GameServer {
    /// Current game state
    state: GameState,
    /// Active run loop (if any)
    run: Option<Run>,
    /// Target tick rate (ticks per second)
    tick_rate: f32,
    /// Recent tick durations in milliseconds
    tick_times: Vec<f32>,
}

impl GameServer {
    /// Number of tick durations kept for averaging
    const TICK_WINDOW: usize = 60;

    /// Create a new game server
    pub fn new() -> Self {
        Self {
            state: GameState::Idle,
            run: None,
            tick_rate: 60.0,
            tick_times: Vec::with_capacity(Self::TICK_WINDOW),
        }
    }

    /// Set up a run with generated gates
    pub fn init_run(&mut self, config: RunConfig) -> Result<(), ConfigError> {
        let run = Run::new(config)?;
        self.install(run);
        Ok(())
    }

    /// Set up a run over a fixed list of gates
    pub fn init_with_gates(&mut self, config: RunConfig, gates: Vec<Gate>) -> Result<(), ConfigError> {
        let run = Run::with_gates(config, gates)?;
        self.install(run);
        Ok(())
    }

    fn install(&mut self, run: Run) {
        log::info!(
            "Run initialized: {} gates over {} units",
            run.gates.len(),
            run.config.track_length
        );
        self.run = Some(run);
        self.state = GameState::Ready;
        self.tick_times.clear();
    }

    /// Start running the configured run
    pub fn start(&mut self) {
        if self.run.is_some() && self.state == GameState::Ready {
            self.state = GameState::Running;
            log::info!("Run started");
        }
    }

    /// Perform a single simulation tick.
    ///
    /// Only advances while running; otherwise reports the current state with
    /// no events. `None` when no run is configured.
    pub fn tick(&mut self) -> Option<TickReport> {
        let running = self.state == GameState::Running;
        let run = self.run.as_mut()?;

        if !running {
            return Some(TickReport {
                snapshot: run.get_snapshot(),
                events: Vec::new(),
            });
        }

        let tick_start = Instant::now();
        let events = run.update();
        let tick_time = tick_start.elapsed().as_secs_f32() * 1000.0;

        self.tick_times.push(tick_time);
        if self.tick_times.len() > Self::TICK_WINDOW {
            self.tick_times.remove(0);
        }

        Some(TickReport {
            snapshot: run.get_snapshot(),
            events,
        })
    }

    /// Route a key press. Returns false for keys that do not steer, and for
    /// step presses while not running (a step moves the player at once).
    pub fn key_down(&mut self, code: &str) -> bool {
        self.handle_input(InputEvent::key_down(code))
    }

    /// Route a key release. Returns false for keys that do not steer.
    pub fn key_up(&mut self, code: &str) -> bool {
        self.handle_input(InputEvent::key_up(code))
    }

    fn handle_input(&mut self, event: Option<InputEvent>) -> bool {
        let running = self.state == GameState::Running;
        match (event, self.run.as_mut()) {
            (Some(InputEvent::KeyDown(_)), Some(run))
                if !running && matches!(run.config.steering, SteeringMode::Step { .. }) =>
            {
                log::debug!("step input dropped while {:?}", self.state);
                false
            }
            (Some(event), Some(run)) => {
                run.handle_input(event);
                true
            }
            _ => false,
        }
    }

    /// Viewport changed size
    pub fn resize(&mut self, width: u32, height: u32) {
        if let Some(run) = &mut self.run {
            run.camera.resize(width, height);
        }
    }

    /// Get current run snapshot
    pub fn get_snapshot(&self) -> Option<RunSnapshot> {
        self.run.as_ref().map(|r| r.get_snapshot())
    }

    /// Get finished runs
    pub fn get_results(&self) -> Option<Vec<RunResult>> {
        self.run.as_ref().map(|r| r.results.clone())
    }

    /// Get server statistics
    pub fn get_stats(&self) -> ServerStats {
        let avg_tick_time = if self.tick_times.is_empty() {
            0.0
        } else {
            self.tick_times.iter().sum::<f32>() / self.tick_times.len() as f32
        };

        ServerStats {
            tick_rate: self.tick_rate,
            avg_tick_time_ms: avg_tick_time,
            gate_count: self.run.as_ref().map(|r| r.gates.len() as u32).unwrap_or(0),
            run_number: self.run.as_ref().map(|r| r.run_number).unwrap_or(0),
            game_state: self.state,
        }
    }

    /// Get current game state
    pub fn get_state(&self) -> GameState {
        self.state
    }

    /// Reset to idle state
    pub fn reset(&mut self) {
        self.state = GameState::Idle;
        self.run = None;
        self.tick_times.clear();
        log::info!("Run reset");
    }

    /// Pause the simulation
    pub fn pause(&mut self) {
        if self.state == GameState::Running {
            self.state = GameState::Paused;
            log::info!("Run paused");
        }
    }

    /// Resume the simulation
    pub fn resume(&mut self) {
        if self.state == GameState::Paused {
            self.state = GameState::Running;
            log::info!("Run resumed");
        }
    }

    /// Check if server is running
    pub fn is_running(&self) -> bool {
        self.state == GameState::Running
    }
}

impl Default for GameServer {
    fn default() -> Self {
        Self::new()
    }
}
