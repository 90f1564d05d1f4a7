//! Pathforge - endless-runner path generation
//!
//! Core modules:
//! - `level`: Deterministic planning, content generation and segment streaming
//! - `sim`: Per-tick obstacle behaviors, navigation agents and the level root state
//! - `settings`: Data-driven generation tuning
//! - `error`: Config errors and recoverable diagnostics

pub mod error;
pub mod level;
pub mod settings;
pub mod sim;

pub use error::{ConfigError, Diagnostic, GenerationError};
pub use level::{LevelPlan, LevelRequest, Segment, SegmentType, Theme};
pub use settings::{DensityPreset, GenerationSettings};
pub use sim::{Level, LevelEvent, TickInput, tick};

/// Generation and simulation constants
pub mod consts {
    /// Fixed simulation timestep (60 Hz)
    pub const SIM_DT: f32 = 1.0 / 60.0;

    /// Default segment length along the forward axis (meters)
    pub const SEGMENT_LENGTH: f32 = 30.0;
    /// Default walkable path width (meters)
    pub const SEGMENT_WIDTH: f32 = 12.0;
    /// Segment count bounds
    pub const MIN_SEGMENTS: u32 = 5;
    pub const MAX_SEGMENTS: u32 = 60;
    /// Every Nth segment is a checkpoint
    pub const CHECKPOINT_INTERVAL: u32 = 5;

    /// Streaming hysteresis band (deactivation must exceed activation)
    pub const ACTIVATION_DISTANCE: f32 = 50.0;
    pub const DEACTIVATION_DISTANCE: f32 = 70.0;
    /// Smallest band `sanitize` will accept
    pub const MIN_HYSTERESIS_BAND: f32 = 5.0;

    /// Difficulty range
    pub const MIN_DIFFICULTY: u8 = 1;
    pub const MAX_DIFFICULTY: u8 = 10;
    /// Tutorial difficulty ceiling
    pub const TUTORIAL_MAX_DIFFICULTY: u8 = 4;
    /// Ramp scale applied to tutorial levels
    pub const TUTORIAL_RAMP_SCALE: f32 = 0.5;

    /// Minimum lateral clearance between an obstacle and the path edge
    pub const PLACEMENT_MARGIN: f32 = 1.0;
    /// Obstacles are placed inside this band of segment progress
    pub const PLACEMENT_PROGRESS_MIN: f32 = 0.15;
    pub const PLACEMENT_PROGRESS_MAX: f32 = 0.85;

    /// Lateral offset of a curve's end pose
    pub const CURVE_OFFSET: f32 = 8.0;
    /// Yaw added by a curve segment (radians)
    pub const CURVE_YAW: f32 = 0.26;
    /// Height change of a hill segment
    pub const HILL_RISE: f32 = 4.0;

    /// Patrol waypoint arrival distance
    pub const PATROL_ARRIVAL_DISTANCE: f32 = 0.2;
    /// Delay between destruction and removal of destructible obstacles
    pub const DESTROY_REMOVAL_DELAY: f32 = 2.0;
    /// Maximum phases in a sequenced obstacle
    pub const MAX_PHASES: usize = 4;
    /// Floor for phase durations so a tick always terminates
    pub const MIN_PHASE_DURATION: f32 = 0.01;

    /// Seconds a failed navigation agent waits before asking again
    pub const NAV_RETRY_DELAY: f32 = 1.0;
}

/// Linear interpolation between `a` and `b`
#[inline]
pub fn lerp(a: f32, b: f32, t: f32) -> f32 {
    a + (b - a) * t
}

/// Replace a non-finite value with `fallback`
#[inline]
pub fn finite_or(value: f32, fallback: f32) -> f32 {
    if value.is_finite() { value } else { fallback }
}
