//! Scripted tutorial scenarios
//!
//! A flat table of authored placements. When a tutorial level has a table,
//! segments that cover an entry's distance take their obstacles from the
//! table instead of the spawn probabilities.

use std::path::Path;

use serde::{Deserialize, Serialize};

use super::seed::SegmentRng;
use crate::consts::*;
use crate::error::ConfigError;

/// Progress step between consecutive placements of one entry
const PATTERN_STEP: f32 = 0.08;

/// How an entry's obstacles are arranged
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlacementPattern {
    /// Single file down the centerline
    #[default]
    Line,
    /// Side by side across the path
    Row,
    /// Alternating left and right
    Zigzag,
    /// Random inside the placement band
    Scatter,
}

impl PlacementPattern {
    /// `(progress, lateral)` slots for `count` obstacles anchored at
    /// `anchor` progress. Lateral is in [-1, 1] of the usable half-width.
    pub fn slots(&self, anchor: f32, count: u32, rng: &mut SegmentRng) -> Vec<(f32, f32)> {
        let anchor = anchor.clamp(PLACEMENT_PROGRESS_MIN, PLACEMENT_PROGRESS_MAX);
        let along = |i: u32| (anchor + i as f32 * PATTERN_STEP).clamp(PLACEMENT_PROGRESS_MIN, PLACEMENT_PROGRESS_MAX);
        (0..count)
            .map(|i| match self {
                PlacementPattern::Line => (along(i), 0.0),
                PlacementPattern::Row => {
                    let lateral = if count > 1 {
                        -1.0 + 2.0 * i as f32 / (count - 1) as f32
                    } else {
                        0.0
                    };
                    (anchor, lateral)
                }
                PlacementPattern::Zigzag => (along(i), if i % 2 == 0 { -0.5 } else { 0.5 }),
                PlacementPattern::Scatter => {
                    let progress = rng.range(PLACEMENT_PROGRESS_MIN, PLACEMENT_PROGRESS_MAX);
                    (progress, rng.range(-1.0, 1.0))
                }
            })
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScenarioEntry {
    /// Path distance from the level start (meters)
    pub distance: f32,
    /// Archetype codes, cycled across `count`
    pub codes: Vec<String>,
    pub count: u32,
    #[serde(default)]
    pub pattern: PlacementPattern,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScenarioTable {
    pub entries: Vec<ScenarioEntry>,
}

impl ScenarioTable {
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let table = Self::from_json(&json)?;
        log::info!("Loaded {} scenario entries from {}", table.entries.len(), path.display());
        Ok(table)
    }

    /// Entries whose distance falls in `[start, start + length)`
    pub fn entries_in(&self, start: f32, length: f32) -> impl Iterator<Item = &ScenarioEntry> {
        self.entries
            .iter()
            .filter(move |e| e.distance.is_finite() && e.distance >= start && e.distance < start + length)
    }

    /// Whether any entry lands in `[start, start + length)`
    pub fn covers(&self, start: f32, length: f32) -> bool {
        self.entries_in(start, length).next().is_some()
    }
}
