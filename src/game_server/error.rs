//! Errors from configuring a run.
//!
//! Ticking never fails; only the configuration surface can be rejected.

/// Errors from building or parsing a [`RunConfig`](super::run::RunConfig).
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{field} must be positive and finite, got {value}")]
    NotPositive { field: &'static str, value: f32 },
    #[error(
        "forward speed {speed} can skip the detection band (must be below {max}, twice the longitudinal threshold)"
    )]
    SpeedTunnels { speed: f32, max: f32 },
    #[error(
        "forward speed {speed} is lost to f32 rounding near track length {track_length}; the player would stop short of the end"
    )]
    SpeedBelowPrecision { speed: f32, track_length: f32 },
    #[error("gate {id} at distance {distance} lies outside the track (0..{track_length})")]
    GateOffTrack {
        id: u32,
        distance: f32,
        track_length: f32,
    },
    #[error("invalid config JSON: {0}")]
    Json(#[from] serde_json::Error),
}
