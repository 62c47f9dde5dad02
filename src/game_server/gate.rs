//! Gate - Scoring triggers placed along the track
//!
//! A gate carries an effect that rewrites the score when the player passes
//! through it. Effects are pluggable through [`GateEffect`]; the built-in
//! [`Effect`] covers the add/subtract/multiply/divide operators.

use std::fmt;

use rand::Rng;
use serde::{Deserialize, Serialize};

/// Scoring strategy bound to a gate
pub trait GateEffect: fmt::Debug {
    /// Transform the score. Must be total: no panics, no overflow.
    fn apply(&self, score: i64) -> i64;

    /// Short text shown on the gate, e.g. `+5` or `*2`
    fn label(&self) -> String;

    /// Normalize operands that would make the effect degenerate.
    /// Called once when a gate enters a run.
    fn sanitized(self) -> Self
    where
        Self: Sized,
    {
        self
    }
}

/// Built-in arithmetic effects
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "lowercase")]
pub enum Effect {
    Add(i64),
    Subtract(i64),
    Multiply(i64),
    Divide(i64),
}

impl Effect {
    /// Operator symbol used in labels
    pub fn operator(&self) -> char {
        match self {
            Effect::Add(_) => '+',
            Effect::Subtract(_) => '-',
            Effect::Multiply(_) => '*',
            Effect::Divide(_) => '/',
        }
    }

    /// Operand of the effect
    pub fn value(&self) -> i64 {
        match *self {
            Effect::Add(v) | Effect::Subtract(v) | Effect::Multiply(v) | Effect::Divide(v) => v,
        }
    }
}

impl GateEffect for Effect {
    fn apply(&self, score: i64) -> i64 {
        match *self {
            Effect::Add(v) => score.saturating_add(v),
            Effect::Subtract(v) => score.saturating_sub(v),
            Effect::Multiply(v) => score.saturating_mul(v.max(1)),
            // Floor division, so -7 / 2 == -4
            Effect::Divide(v) => {
                let v = v.max(1);
                let q = score / v;
                if score % v != 0 && score < 0 {
                    q - 1
                } else {
                    q
                }
            }
        }
    }

    fn label(&self) -> String {
        format!("{}{}", self.operator(), self.value())
    }

    /// Clamp multiply/divide operands below 1 up to 1, so a gate can never
    /// wipe the score or divide by zero.
    fn sanitized(self) -> Self {
        match self {
            Effect::Multiply(v) if v < 1 => {
                log::warn!("multiply gate value {} clamped to 1", v);
                Effect::Multiply(1)
            }
            Effect::Divide(v) if v < 1 => {
                log::warn!("divide gate value {} clamped to 1", v);
                Effect::Divide(1)
            }
            other => other,
        }
    }
}

/// Which effects gate generation draws from
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EffectSet {
    /// `add(1..=50)` or `multiply(2..=3)`
    #[default]
    Arithmetic,
    /// `+ - * /` with operands `1..=10`
    Equation,
}

impl EffectSet {
    /// Draw a random effect from this set
    pub fn roll<R: Rng + ?Sized>(&self, rng: &mut R) -> Effect {
        match self {
            EffectSet::Arithmetic => {
                if rng.gen_bool(0.5) {
                    Effect::Add(rng.gen_range(1..=50))
                } else {
                    Effect::Multiply(rng.gen_range(2..=3))
                }
            }
            EffectSet::Equation => {
                let value = rng.gen_range(1..=10);
                match rng.gen_range(0..4) {
                    0 => Effect::Add(value),
                    1 => Effect::Subtract(value),
                    2 => Effect::Multiply(value),
                    _ => Effect::Divide(value),
                }
            }
        }
    }
}

/// How many gates stand at each checkpoint and where
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum GateLayout {
    /// One gate centered on the track
    #[default]
    Single,
    /// A left and a right gate at `-offset` / `+offset`
    Paired { offset: f32 },
}

impl GateLayout {
    /// Lateral offsets of the gates in one row, left to right
    pub fn laterals(&self) -> Vec<f32> {
        match *self {
            GateLayout::Single => vec![0.0],
            GateLayout::Paired { offset } => vec![-offset, offset],
        }
    }
}

/// Gate lifecycle within a run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GateState {
    #[default]
    Pending,
    /// Effect applied this run
    Consumed,
    /// Passed without scoring, or a sibling in the row was taken
    Missed,
}

/// A single gate on the track
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Gate<E = Effect> {
    /// Unique gate ID
    pub id: u32,
    /// Checkpoint row; gates sharing a row are mutually exclusive
    pub row: u32,
    /// Distance along the track
    pub distance: f32,
    /// Lateral offset from the track center
    pub lateral: f32,
    /// Scoring effect
    pub effect: E,
    /// Current state
    pub state: GateState,
}

impl<E: GateEffect> Gate<E> {
    pub fn new(id: u32, row: u32, distance: f32, lateral: f32, effect: E) -> Self {
        Self {
            id,
            row,
            distance,
            lateral,
            effect,
            state: GateState::Pending,
        }
    }

    pub fn is_pending(&self) -> bool {
        self.state == GateState::Pending
    }

    /// Make the gate scoreable again for the next run
    pub fn rearm(&mut self) {
        self.state = GateState::Pending;
    }
}

/// Lay out gates every `spacing` units from `spacing` up to (not including)
/// `track_length`, rolling one effect per gate.
pub fn generate_gates<R: Rng + ?Sized>(
    track_length: f32,
    spacing: f32,
    layout: GateLayout,
    effects: EffectSet,
    rng: &mut R,
) -> Vec<Gate> {
    let laterals = layout.laterals();
    let mut gates = Vec::new();
    let mut row = 0u32;

    loop {
        let distance = spacing * (row + 1) as f32;
        if distance >= track_length {
            break;
        }
        for &lateral in &laterals {
            let id = gates.len() as u32;
            gates.push(Gate::new(id, row, distance, lateral, effects.roll(rng)));
        }
        row += 1;
    }

    gates
}

/// Compact gate state for IPC transfer
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GateSnapshot {
    pub id: u32,
    pub row: u32,
    pub distance: f32,
    pub lateral: f32,
    pub label: String,
    pub state: GateState,
}

impl<E: GateEffect> From<&Gate<E>> for GateSnapshot {
    fn from(gate: &Gate<E>) -> Self {
        Self {
            id: gate.id,
            row: gate.row,
            distance: gate.distance,
            lateral: gate.lateral,
            label: gate.effect.label(),
            state: gate.state,
        }
    }
}
