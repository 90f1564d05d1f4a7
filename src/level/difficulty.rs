//! Difficulty curve and dynamic density adjustment

use serde::{Deserialize, Serialize};

use super::theme::Theme;
use crate::consts::*;
use crate::finite_or;

/// Difficulty of a segment in [1, 10].
///
/// Linear from `start` to `end` across the level, scaled by `ramp` and the
/// theme's ramp multiplier. Tutorial levels use half the ramp and a ceiling of
/// [`TUTORIAL_MAX_DIFFICULTY`]. Non-decreasing in `segment_index` for any
/// fixed theme and parameters: `end < start` is treated as a flat curve and a
/// negative ramp as zero.
pub fn difficulty_at(
    segment_index: u32,
    total_segments: u32,
    start: f32,
    end: f32,
    ramp: f32,
    theme: Theme,
    is_tutorial: bool,
) -> u8 {
    let t = if total_segments <= 1 {
        0.0
    } else {
        segment_index.min(total_segments - 1) as f32 / (total_segments - 1) as f32
    };

    let start = finite_or(start, MIN_DIFFICULTY as f32);
    let end = finite_or(end, start).max(start);
    let mut scale = finite_or(ramp, 1.0).max(0.0) * theme.ramp_multiplier();
    if is_tutorial {
        scale *= TUTORIAL_RAMP_SCALE;
    }

    let ceiling = if is_tutorial {
        TUTORIAL_MAX_DIFFICULTY
    } else {
        MAX_DIFFICULTY
    };

    let value = start + (end - start) * t * scale;
    value.round().clamp(MIN_DIFFICULTY as f32, ceiling as f32) as u8
}

/// Start/end/ramp triple captured from a level plan
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DifficultyCurve {
    pub start: f32,
    pub end: f32,
    pub ramp: f32,
}

impl DifficultyCurve {
    pub fn at(&self, segment_index: u32, total_segments: u32, theme: Theme, is_tutorial: bool) -> u8 {
        difficulty_at(
            segment_index,
            total_segments,
            self.start,
            self.end,
            self.ramp,
            theme,
            is_tutorial,
        )
    }
}

/// Bounds on the dynamic density scale
pub const ADJUST_MIN: f32 = 0.75;
pub const ADJUST_MAX: f32 = 1.25;

/// Player-performance feedback for levels with dynamic difficulty enabled.
///
/// Only scales spawn density of segments generated afterwards; stored segment
/// difficulty is never touched.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DifficultyAdjuster {
    pressure: f32,
    failures: u32,
    clears: u32,
}

impl DifficultyAdjuster {
    /// Player died or restarted from a checkpoint
    pub fn record_failure(&mut self) {
        self.failures += 1;
        self.pressure = (self.pressure - 0.1).max(ADJUST_MIN - 1.0);
    }

    /// Player cleared a segment without failing
    pub fn record_clear(&mut self) {
        self.clears += 1;
        self.pressure = (self.pressure + 0.05).min(ADJUST_MAX - 1.0);
    }

    /// Multiplier applied to obstacle and enemy density
    pub fn density_scale(&self) -> f32 {
        (1.0 + self.pressure).clamp(ADJUST_MIN, ADJUST_MAX)
    }

    pub fn failures(&self) -> u32 {
        self.failures
    }

    pub fn clears(&self) -> u32 {
        self.clears
    }
}
