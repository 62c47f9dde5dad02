//! Run - Run configuration and the per-tick gate evaluator
//!
//! A run is one traversal from the start line to the track end. Each tick
//! moves the player, scores any gate the player is passing through, and
//! restarts the run once the track end is reached.

use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};

use crate::game_server::camera::{CameraSnapshot, FollowCamera};
use crate::game_server::error::ConfigError;
use crate::game_server::gate::{
    generate_gates, Effect, EffectSet, Gate, GateEffect, GateLayout, GateSnapshot, GateState,
};
use crate::game_server::input::{InputEvent, SteeringMode};
use crate::game_server::player::{Player, PlayerSnapshot, PlayerState};

/// Run configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    /// Track length; reaching it ends the run
    pub track_length: f32,
    /// Distance between gate rows
    pub gate_spacing: f32,
    /// Forward movement per tick
    pub forward_speed: f32,
    /// Lateral movement per tick while steering
    pub lateral_speed: f32,
    /// Player stays within `[-lateral_bound, lateral_bound]`
    pub lateral_bound: f32,
    /// Longitudinal hit distance (exclusive)
    pub longitudinal_threshold: f32,
    /// Lateral hit distance (exclusive)
    pub lateral_threshold: f32,
    /// Gates per row
    pub layout: GateLayout,
    /// Effects to draw from
    pub effect_set: EffectSet,
    /// Steering behavior
    pub steering: SteeringMode,
    /// Seed for gate generation; `None` draws from entropy
    pub seed: Option<u64>,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            track_length: 1000.0,
            gate_spacing: 20.0,
            forward_speed: 0.15,
            lateral_speed: 0.15,
            lateral_bound: 4.0,
            longitudinal_threshold: 0.5,
            lateral_threshold: 5.0,
            layout: GateLayout::Single,
            effect_set: EffectSet::Arithmetic,
            steering: SteeringMode::Velocity,
            seed: None,
        }
    }
}

impl RunConfig {
    /// The two-gate equation variant: pick the left or right gate each row.
    pub fn equation_gates() -> Self {
        Self {
            layout: GateLayout::Paired { offset: 2.5 },
            effect_set: EffectSet::Equation,
            lateral_threshold: 2.5,
            ..Default::default()
        }
    }

    /// Parse a (possibly partial) JSON config and validate it
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: RunConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut checks = vec![
            ("track_length", self.track_length),
            ("gate_spacing", self.gate_spacing),
            ("forward_speed", self.forward_speed),
            ("lateral_speed", self.lateral_speed),
            ("lateral_bound", self.lateral_bound),
            ("longitudinal_threshold", self.longitudinal_threshold),
            ("lateral_threshold", self.lateral_threshold),
        ];
        if let GateLayout::Paired { offset } = self.layout {
            checks.push(("layout.offset", offset));
        }
        if let SteeringMode::Step { step } = self.steering {
            checks.push(("steering.step", step));
        }

        for (field, value) in checks {
            if !(value.is_finite() && value > 0.0) {
                return Err(ConfigError::NotPositive { field, value });
            }
        }

        // f32 distance must still grow by a step near the track end
        if self.track_length + self.forward_speed <= self.track_length {
            return Err(ConfigError::SpeedBelowPrecision {
                speed: self.forward_speed,
                track_length: self.track_length,
            });
        }

        let max = 2.0 * self.longitudinal_threshold;
        if self.forward_speed >= max {
            return Err(ConfigError::SpeedTunnels {
                speed: self.forward_speed,
                max,
            });
        }

        Ok(())
    }
}

/// Outcome of one finished run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunResult {
    pub run_number: u32,
    pub final_score: i64,
    pub gates_consumed: u32,
    pub ticks: u64,
}

/// Something the presentation layer should react to
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum RunEvent {
    GateConsumed {
        gate_id: u32,
        row: u32,
        label: String,
        score_before: i64,
        score_after: i64,
    },
    RunEnded(RunResult),
}

/// Complete run state
#[derive(Debug)]
pub struct Run<E = Effect> {
    /// Run configuration
    pub config: RunConfig,
    /// The player
    pub player: PlayerState,
    /// Gates in track order
    pub gates: Vec<Gate<E>>,
    /// Current score
    pub score: i64,
    /// 1-based number of the current run
    pub run_number: u32,
    /// Ticks since the current run started
    pub run_ticks: u64,
    /// Ticks since the run loop was created
    pub total_ticks: u64,
    /// Chase camera
    pub camera: FollowCamera,
    /// Most recent finished runs, oldest first
    pub results: Vec<RunResult>,
}

impl<E> Run<E> {
    /// Number of finished runs kept in `results`
    pub const RESULTS_KEPT: usize = 100;
}

impl Run<Effect> {
    /// Create a run with generated gates
    pub fn new(config: RunConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let mut rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let gates = generate_gates(
            config.track_length,
            config.gate_spacing,
            config.layout,
            config.effect_set,
            &mut rng,
        );
        Self::with_gates(config, gates)
    }
}

impl<E: GateEffect> Run<E> {
    /// Create a run over an explicit gate list
    pub fn with_gates(config: RunConfig, gates: Vec<Gate<E>>) -> Result<Self, ConfigError> {
        config.validate()?;
        if let Some(gate) = gates
            .iter()
            .find(|g| !(g.distance >= 0.0 && g.distance < config.track_length))
        {
            return Err(ConfigError::GateOffTrack {
                id: gate.id,
                distance: gate.distance,
                track_length: config.track_length,
            });
        }
        let gates = gates
            .into_iter()
            .map(|gate| Gate {
                effect: gate.effect.sanitized(),
                state: GateState::Pending,
                ..gate
            })
            .collect();

        Ok(Self {
            config,
            player: PlayerState::default(),
            gates,
            score: 0,
            run_number: 1,
            run_ticks: 0,
            total_ticks: 0,
            camera: FollowCamera::default(),
            results: Vec::new(),
        })
    }

    /// Apply a steering event; read by the next tick
    pub fn handle_input(&mut self, event: InputEvent) {
        let speed = self.config.lateral_speed;
        let bound = self.config.lateral_bound;
        match (self.config.steering, event) {
            (SteeringMode::Velocity, InputEvent::KeyDown(dir)) => {
                Player::press(&mut self.player, dir, speed)
            }
            (SteeringMode::Velocity, InputEvent::KeyUp(dir)) => {
                Player::release(&mut self.player, dir, speed)
            }
            (SteeringMode::Step { step }, InputEvent::KeyDown(dir)) => {
                if Player::step(&mut self.player, dir, step, bound) {
                    log::debug!("lateral position clamped to {}", self.player.lateral);
                }
            }
            (SteeringMode::Step { .. }, InputEvent::KeyUp(_)) => {}
        }
    }

    /// Advance the run by one tick
    pub fn update(&mut self) -> Vec<RunEvent> {
        let mut events = Vec::new();
        self.run_ticks += 1;
        self.total_ticks += 1;

        if Player::update(
            &mut self.player,
            self.config.forward_speed,
            self.config.lateral_bound,
        ) {
            log::debug!("lateral position clamped to {}", self.player.lateral);
        }

        self.evaluate_gates(&mut events);

        if self.player.distance >= self.config.track_length {
            self.end_run(&mut events);
        }

        events
    }

    /// Score gates the player is passing through and retire passed ones
    fn evaluate_gates(&mut self, events: &mut Vec<RunEvent>) {
        let z = self.player.distance;
        let x = self.player.lateral;
        let long = self.config.longitudinal_threshold;
        let lat = self.config.lateral_threshold;

        // Best (row, index, lateral distance, id) per row
        let mut hits: Vec<(u32, usize, f32, u32)> = Vec::new();
        for (idx, gate) in self.gates.iter().enumerate() {
            if !gate.is_pending() {
                continue;
            }
            let dz = (z - gate.distance).abs();
            let dx = (x - gate.lateral).abs();
            if dz >= long || dx >= lat {
                continue;
            }
            let candidate = (gate.row, idx, dx, gate.id);
            match hits.iter_mut().find(|hit| hit.0 == gate.row) {
                // Nearest wins; equal distances go to the lowest id
                Some(hit) if (dx, gate.id) < (hit.2, hit.3) => *hit = candidate,
                Some(_) => {}
                None => hits.push(candidate),
            }
        }

        for (row, idx, _, _) in hits {
            let gate = &mut self.gates[idx];
            let score_before = self.score;
            self.score = gate.effect.apply(score_before);
            gate.state = GateState::Consumed;

            let gate_id = gate.id;
            let label = gate.effect.label();
            log::debug!(
                "gate {} ({}) consumed: {} -> {}",
                gate_id,
                label,
                score_before,
                self.score
            );

            for sibling in self
                .gates
                .iter_mut()
                .filter(|g| g.row == row && g.is_pending())
            {
                sibling.state = GateState::Missed;
            }

            events.push(RunEvent::GateConsumed {
                gate_id,
                row,
                label,
                score_before,
                score_after: self.score,
            });
        }

        for gate in self
            .gates
            .iter_mut()
            .filter(|g| g.is_pending() && g.distance + long <= z)
        {
            gate.state = GateState::Missed;
        }
    }

    /// Report the finished run and start the next one
    fn end_run(&mut self, events: &mut Vec<RunEvent>) {
        let result = RunResult {
            run_number: self.run_number,
            final_score: self.score,
            gates_consumed: self.gates_consumed() as u32,
            ticks: self.run_ticks,
        };
        log::info!(
            "Run {} finished with score {} ({} gates)",
            result.run_number,
            result.final_score,
            result.gates_consumed
        );

        self.player.reset();
        self.score = 0;
        for gate in &mut self.gates {
            gate.rearm();
        }
        self.run_number += 1;
        self.run_ticks = 0;

        self.results.push(result.clone());
        if self.results.len() > Self::RESULTS_KEPT {
            self.results.remove(0);
        }
        events.push(RunEvent::RunEnded(result));
    }

    /// Gates whose effect has been applied this run
    pub fn gates_consumed(&self) -> usize {
        self.gates
            .iter()
            .filter(|g| g.state == GateState::Consumed)
            .count()
    }

    /// Text for the score readout
    pub fn score_label(&self) -> String {
        format!("Score: {}", self.score)
    }

    /// Get compact snapshot for IPC transfer
    pub fn get_snapshot(&self) -> RunSnapshot {
        RunSnapshot {
            run_number: self.run_number,
            tick: self.total_ticks,
            score: self.score,
            score_label: self.score_label(),
            player: PlayerSnapshot::from(&self.player),
            camera: self.camera.view(&self.player),
            gates: self.gates.iter().map(GateSnapshot::from).collect(),
            gates_consumed: self.gates_consumed() as u32,
        }
    }
}

/// Compact run snapshot for IPC transfer
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunSnapshot {
    pub run_number: u32,
    pub tick: u64,
    pub score: i64,
    pub score_label: String,
    pub player: PlayerSnapshot,
    pub camera: CameraSnapshot,
    pub gates: Vec<GateSnapshot>,
    pub gates_consumed: u32,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game_server::player::Direction;

    fn run_with(gates: Vec<Gate>) -> Run {
        Run::with_gates(RunConfig::default(), gates).unwrap()
    }

    fn tick_until(run: &mut Run, distance: f32) -> Vec<RunEvent> {
        let mut events = Vec::new();
        while run.player.distance < distance {
            events.extend(run.update());
        }
        events
    }

    #[test]
    fn test_default_config_is_valid() {
        assert!(RunConfig::default().validate().is_ok());
        assert!(RunConfig::equation_gates().validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let config = RunConfig {
            gate_spacing: 0.0,
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::NotPositive {
                field: "gate_spacing",
                ..
            })
        ));

        let config = RunConfig {
            track_length: f32::NAN,
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::NotPositive {
                field: "track_length",
                ..
            })
        ));

        let config = RunConfig {
            forward_speed: 1.0,
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::SpeedTunnels { .. })
        ));

        let config = RunConfig {
            steering: SteeringMode::Step { step: -1.0 },
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_from_json_fills_defaults() {
        let config = RunConfig::from_json(r#"{"track_length": 200, "seed": 3}"#).unwrap();
        assert_eq!(config.track_length, 200.0);
        assert_eq!(config.seed, Some(3));
        assert_eq!(config.gate_spacing, 20.0);

        assert!(matches!(
            RunConfig::from_json("{not json"),
            Err(ConfigError::Json(_))
        ));
        assert!(matches!(
            RunConfig::from_json(r#"{"lateral_bound": 0}"#),
            Err(ConfigError::NotPositive { .. })
        ));
    }

    #[test]
    fn test_gate_off_track_rejected() {
        let result = Run::with_gates(
            RunConfig::default(),
            vec![Gate::new(4, 0, 1000.0, 0.0, Effect::Add(1))],
        );
        assert!(matches!(
            result,
            Err(ConfigError::GateOffTrack { id: 4, .. })
        ));
    }

    #[test]
    fn test_gate_scores_once_across_its_window() {
        let mut run = run_with(vec![Gate::new(0, 0, 20.0, 0.0, Effect::Add(50))]);
        let events = tick_until(&mut run, 25.0);

        let consumed = events
            .iter()
            .filter(|e| matches!(e, RunEvent::GateConsumed { .. }))
            .count();
        assert_eq!(consumed, 1);
        assert_eq!(run.score, 50);
        assert_eq!(run.gates[0].state, GateState::Consumed);
    }

    #[test]
    fn test_lateral_miss_retires_gate() {
        let config = RunConfig {
            lateral_threshold: 1.0,
            ..Default::default()
        };
        let mut run = Run::with_gates(config, vec![Gate::new(0, 0, 20.0, 3.0, Effect::Add(50))])
            .unwrap();
        tick_until(&mut run, 21.0);
        assert_eq!(run.score, 0);
        assert_eq!(run.gates[0].state, GateState::Missed);
    }

    #[test]
    fn test_paired_row_picks_nearest_gate() {
        let gates = vec![
            Gate::new(0, 0, 20.0, -2.5, Effect::Add(10)),
            Gate::new(1, 0, 20.0, 2.5, Effect::Add(99)),
        ];
        let mut run = Run::with_gates(RunConfig::equation_gates(), gates).unwrap();
        run.handle_input(InputEvent::KeyDown(Direction::Left));
        tick_until(&mut run, 25.0);

        assert_eq!(run.score, 10);
        assert_eq!(run.gates[0].state, GateState::Consumed);
        assert_eq!(run.gates[1].state, GateState::Missed);
    }

    #[test]
    fn test_track_end_resets_and_rearms() {
        let config = RunConfig {
            track_length: 30.0,
            ..Default::default()
        };
        let gates = vec![Gate::new(0, 0, 20.0, 0.0, Effect::Add(7))];
        let mut run = Run::with_gates(config, gates).unwrap();

        let mut ended = None;
        for _ in 0..1000 {
            for event in run.update() {
                if let RunEvent::RunEnded(result) = event {
                    ended = Some(result);
                }
            }
            if ended.is_some() {
                break;
            }
        }

        let result = ended.expect("run should end");
        assert_eq!(result.run_number, 1);
        assert_eq!(result.final_score, 7);
        assert_eq!(result.gates_consumed, 1);
        assert_eq!(run.player.distance, 0.0);
        assert_eq!(run.score, 0);
        assert_eq!(run.run_number, 2);
        assert!(run.gates[0].is_pending());
        assert_eq!(run.results, vec![result]);
    }

    #[test]
    fn test_step_steering() {
        let config = RunConfig {
            steering: SteeringMode::Step { step: 2.5 },
            ..Default::default()
        };
        let mut run: Run<Effect> = Run::with_gates(config, Vec::new()).unwrap();
        run.handle_input(InputEvent::KeyDown(Direction::Right));
        run.handle_input(InputEvent::KeyUp(Direction::Right));
        run.update();
        assert_eq!(run.player.lateral, 2.5);
    }

    #[test]
    fn test_snapshot() {
        let mut run = run_with(vec![Gate::new(0, 0, 20.0, 0.0, Effect::Multiply(2))]);
        run.update();
        let snapshot = run.get_snapshot();
        assert_eq!(snapshot.tick, 1);
        assert_eq!(snapshot.score_label, "Score: 0");
        assert_eq!(snapshot.gates[0].label, "*2");
        assert_eq!(snapshot.gates[0].state, GateState::Pending);
        assert_eq!(snapshot.camera.look_at, snapshot.player.position);
    }

    #[test]
    fn test_rejects_speed_lost_to_rounding() {
        let config = RunConfig {
            track_length: 1.0e7,
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::SpeedBelowPrecision { .. })
        ));
        assert!(matches!(
            RunConfig::from_json(r#"{"track_length": 1e7}"#),
            Err(ConfigError::SpeedBelowPrecision { .. })
        ));

        // Coarser steps near the end still advance, so the run still ends
        let config = RunConfig {
            track_length: 3.0e6,
            ..Default::default()
        };
        assert!(config.validate().is_ok());
        let mut run: Run<Effect> = Run::with_gates(config, Vec::new()).unwrap();
        run.player.distance = 3.0e6 - 10.0;
        let mut ended = false;
        for _ in 0..1000 {
            ended |= run
                .update()
                .iter()
                .any(|e| matches!(e, RunEvent::RunEnded(_)));
        }
        assert!(ended);
    }

    #[test]
    fn test_equal_lateral_distance_goes_to_lowest_id() {
        let gates = vec![
            Gate::new(5, 0, 20.0, 1.0, Effect::Add(5)),
            Gate::new(2, 0, 20.0, -1.0, Effect::Add(2)),
        ];
        let mut run = run_with(gates);
        tick_until(&mut run, 21.0);

        assert_eq!(run.score, 2);
        assert_eq!(run.gates[0].state, GateState::Missed);
        assert_eq!(run.gates[1].state, GateState::Consumed);
    }

    #[test]
    fn test_with_gates_clamps_degenerate_operands() {
        let mut run = run_with(vec![
            Gate::new(0, 0, 10.0, 0.0, Effect::Add(7)),
            Gate::new(1, 1, 20.0, 0.0, Effect::Multiply(0)),
        ]);
        assert_eq!(run.get_snapshot().gates[1].label, "*1");
        assert_eq!(run.gates[1].effect, Effect::Multiply(1));

        tick_until(&mut run, 21.0);
        assert_eq!(run.score, 7);
    }

    #[test]
    fn test_results_are_capped() {
        let config = RunConfig {
            track_length: 0.5,
            ..Default::default()
        };
        let mut run: Run<Effect> = Run::with_gates(config, Vec::new()).unwrap();
        let cap = Run::<Effect>::RESULTS_KEPT;

        // Four ticks per run at 0.15 per tick
        for _ in 0..(cap + 10) * 4 {
            run.update();
        }

        assert_eq!(run.results.len(), cap);
        assert_eq!(run.results[0].run_number, 11);
        assert_eq!(run.results[cap - 1].run_number, (cap + 10) as u32);
    }
}
