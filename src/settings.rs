//! Generation settings
//!
//! Every tunable the generator reads. Injected per level, loaded from JSON,
//! never mutated by the core after `sanitize`.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::consts::*;
use crate::error::{ConfigError, Diagnostic};
use crate::level::HazardKind;

/// Spawn density presets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum DensityPreset {
    Sparse,
    #[default]
    Normal,
    Dense,
}

impl DensityPreset {
    pub fn as_str(&self) -> &'static str {
        match self {
            DensityPreset::Sparse => "Sparse",
            DensityPreset::Normal => "Normal",
            DensityPreset::Dense => "Dense",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "sparse" | "low" => Some(DensityPreset::Sparse),
            "normal" | "medium" => Some(DensityPreset::Normal),
            "dense" | "high" => Some(DensityPreset::Dense),
            _ => None,
        }
    }

    /// Multiplier applied to every density factor of the level plan
    pub fn factor(&self) -> f32 {
        match self {
            DensityPreset::Sparse => 0.7,
            DensityPreset::Normal => 1.0,
            DensityPreset::Dense => 1.3,
        }
    }
}

/// Per-theme special hazard probabilities
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HazardProbabilities {
    pub lava: f32,
    pub ice: f32,
    pub digital_barrier: f32,
    pub underwater: f32,
    pub slippery: f32,
    pub toxic: f32,
}

impl Default for HazardProbabilities {
    fn default() -> Self {
        Self {
            lava: 0.05,
            ice: 0.05,
            digital_barrier: 0.05,
            underwater: 0.05,
            slippery: 0.04,
            toxic: 0.04,
        }
    }
}

impl HazardProbabilities {
    pub fn for_hazard(&self, hazard: HazardKind) -> f32 {
        match hazard {
            HazardKind::Lava => self.lava,
            HazardKind::Ice => self.ice,
            HazardKind::DigitalBarrier => self.digital_barrier,
            HazardKind::Underwater => self.underwater,
            HazardKind::Slippery => self.slippery,
            HazardKind::Toxic => self.toxic,
        }
    }

    fn sanitize(&mut self, out: &mut Vec<Diagnostic>) {
        clamp_probability("hazards.lava", &mut self.lava, out);
        clamp_probability("hazards.ice", &mut self.ice, out);
        clamp_probability("hazards.digital_barrier", &mut self.digital_barrier, out);
        clamp_probability("hazards.underwater", &mut self.underwater, out);
        clamp_probability("hazards.slippery", &mut self.slippery, out);
        clamp_probability("hazards.toxic", &mut self.toxic, out);
    }
}

/// Obstacle spawn table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ObstacleSpawnConfig {
    pub min_count: u32,
    pub max_count: u32,
    /// Cumulative size table: small, then medium, remainder large
    pub small_probability: f32,
    pub medium_probability: f32,
    /// Chance of a universal archetype instead of a theme-specific one
    pub universal_probability: f32,
    pub hazards: HazardProbabilities,
    /// Hazard probability multiplier inside the tutorial window
    pub tutorial_hazard_scale: f32,
    /// Per-difficulty-level chance that an obstacle moves
    pub moving_chance_per_difficulty: f32,
    pub density_factor: f32,
}

impl Default for ObstacleSpawnConfig {
    fn default() -> Self {
        Self {
            min_count: 2,
            max_count: 6,
            small_probability: 0.5,
            medium_probability: 0.35,
            universal_probability: 0.3,
            hazards: HazardProbabilities::default(),
            tutorial_hazard_scale: 0.01,
            moving_chance_per_difficulty: 0.04,
            density_factor: 1.0,
        }
    }
}

/// Enemy spawn table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EnemySpawnConfig {
    pub min_count: u32,
    pub max_count: u32,
    /// Drone vs patrol split for basic enemies
    pub drone_probability: f32,
    /// Tier probabilities layered above the basic split
    pub mid_boss_probability: f32,
    pub boss_probability: f32,
    /// Difficulty at which each tier unlocks
    pub mid_boss_min_difficulty: u8,
    pub boss_min_difficulty: u8,
    pub group_probability: f32,
    /// Cluster radius and per-member radial jitter
    pub group_radius: f32,
    pub group_jitter: f32,
    pub density_factor: f32,
}

impl Default for EnemySpawnConfig {
    fn default() -> Self {
        Self {
            min_count: 1,
            max_count: 3,
            drone_probability: 0.6,
            mid_boss_probability: 0.05,
            boss_probability: 0.01,
            mid_boss_min_difficulty: 5,
            boss_min_difficulty: 8,
            group_probability: 0.3,
            group_radius: 3.0,
            group_jitter: 0.75,
            density_factor: 1.0,
        }
    }
}

/// Collectible spawn table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CollectibleSpawnConfig {
    pub min_count: u32,
    pub max_count: u32,
    pub power_up_probability: f32,
    pub coin_value: u32,
    pub density_factor: f32,
}

impl Default for CollectibleSpawnConfig {
    fn default() -> Self {
        Self {
            min_count: 3,
            max_count: 8,
            power_up_probability: 0.08,
            coin_value: 10,
            density_factor: 1.0,
        }
    }
}

/// Streaming hysteresis band
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StreamingConfig {
    pub activation_distance: f32,
    pub deactivation_distance: f32,
}

impl Default for StreamingConfig {
    fn default() -> Self {
        Self {
            activation_distance: ACTIVATION_DISTANCE,
            deactivation_distance: DEACTIVATION_DISTANCE,
        }
    }
}

/// Complete generation tuning
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationSettings {
    pub density: DensityPreset,

    // === Layout ===
    pub segment_length: f32,
    pub segment_width: f32,
    pub min_segments: u32,
    pub max_segments: u32,
    /// 0 = mostly straight, 1 = frequent special segments
    pub variety_factor: f32,
    /// Maximum share of segments that take the secondary theme
    pub theme_blend: f32,
    pub checkpoint_interval: u32,
    pub checkpoints_enabled: bool,

    // === Difficulty ===
    pub start_difficulty: f32,
    pub end_difficulty: f32,
    pub difficulty_ramp: f32,
    /// Leading segments with halved density and suppressed hazards
    pub tutorial_window: u32,
    pub dynamic_difficulty: bool,

    // === Spawning ===
    pub obstacles: ObstacleSpawnConfig,
    pub enemies: EnemySpawnConfig,
    pub collectibles: CollectibleSpawnConfig,

    // === Streaming ===
    pub streaming: StreamingConfig,
}

impl Default for GenerationSettings {
    fn default() -> Self {
        Self {
            density: DensityPreset::Normal,

            segment_length: SEGMENT_LENGTH,
            segment_width: SEGMENT_WIDTH,
            min_segments: MIN_SEGMENTS,
            max_segments: MAX_SEGMENTS,
            variety_factor: 0.5,
            theme_blend: 0.25,
            checkpoint_interval: CHECKPOINT_INTERVAL,
            checkpoints_enabled: true,

            start_difficulty: 1.0,
            end_difficulty: 8.0,
            difficulty_ramp: 1.0,
            tutorial_window: 2,
            dynamic_difficulty: false,

            obstacles: ObstacleSpawnConfig::default(),
            enemies: EnemySpawnConfig::default(),
            collectibles: CollectibleSpawnConfig::default(),

            streaming: StreamingConfig::default(),
        }
    }
}

impl GenerationSettings {
    /// Create settings from a density preset
    pub fn from_preset(preset: DensityPreset) -> Self {
        Self {
            density: preset,
            ..Self::default()
        }
    }

    /// Parse settings from JSON (missing fields take defaults)
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Read settings from a JSON file
    pub fn read(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json(&json)
    }

    /// Load settings, falling back to defaults when the file is missing or invalid
    pub fn load(path: impl AsRef<Path>) -> Self {
        match Self::read(path) {
            Ok(settings) => {
                log::info!("Loaded generation settings");
                settings
            }
            Err(err) => {
                log::warn!("{err}; using default generation settings");
                Self::default()
            }
        }
    }

    /// Clamp malformed tunables to safe values. Returns one diagnostic per fix.
    pub fn sanitize(&mut self) -> Vec<Diagnostic> {
        let mut out = Vec::new();
        let defaults = Self::default();

        clamp_min("segment_length", &mut self.segment_length, 1.0, defaults.segment_length, &mut out);
        clamp_min("segment_width", &mut self.segment_width, 2.0 * PLACEMENT_MARGIN, defaults.segment_width, &mut out);

        if self.min_segments == 0 {
            out.push(clamped("min_segments", 0.0, 1.0));
            self.min_segments = 1;
        }
        if self.max_segments < self.min_segments {
            out.push(clamped("max_segments", self.max_segments as f32, self.min_segments as f32));
            self.max_segments = self.min_segments;
        }
        if self.checkpoint_interval == 0 {
            out.push(clamped("checkpoint_interval", 0.0, CHECKPOINT_INTERVAL as f32));
            self.checkpoint_interval = CHECKPOINT_INTERVAL;
        }

        clamp_probability("variety_factor", &mut self.variety_factor, &mut out);
        clamp_probability("theme_blend", &mut self.theme_blend, &mut out);

        clamp_range(
            "start_difficulty",
            &mut self.start_difficulty,
            MIN_DIFFICULTY as f32,
            MAX_DIFFICULTY as f32,
            &mut out,
        );
        clamp_range(
            "end_difficulty",
            &mut self.end_difficulty,
            self.start_difficulty,
            MAX_DIFFICULTY as f32,
            &mut out,
        );
        clamp_min("difficulty_ramp", &mut self.difficulty_ramp, 0.0, defaults.difficulty_ramp, &mut out);

        let obstacles = &mut self.obstacles;
        if obstacles.max_count < obstacles.min_count {
            out.push(clamped("obstacles.max_count", obstacles.max_count as f32, obstacles.min_count as f32));
            obstacles.max_count = obstacles.min_count;
        }
        clamp_probability("obstacles.small_probability", &mut obstacles.small_probability, &mut out);
        let medium_cap = 1.0 - obstacles.small_probability;
        clamp_range("obstacles.medium_probability", &mut obstacles.medium_probability, 0.0, medium_cap, &mut out);
        clamp_probability("obstacles.universal_probability", &mut obstacles.universal_probability, &mut out);
        clamp_probability("obstacles.tutorial_hazard_scale", &mut obstacles.tutorial_hazard_scale, &mut out);
        clamp_probability(
            "obstacles.moving_chance_per_difficulty",
            &mut obstacles.moving_chance_per_difficulty,
            &mut out,
        );
        clamp_min("obstacles.density_factor", &mut obstacles.density_factor, 0.0, 1.0, &mut out);
        obstacles.hazards.sanitize(&mut out);

        let enemies = &mut self.enemies;
        if enemies.max_count < enemies.min_count {
            out.push(clamped("enemies.max_count", enemies.max_count as f32, enemies.min_count as f32));
            enemies.max_count = enemies.min_count;
        }
        clamp_probability("enemies.drone_probability", &mut enemies.drone_probability, &mut out);
        clamp_probability("enemies.mid_boss_probability", &mut enemies.mid_boss_probability, &mut out);
        clamp_probability("enemies.boss_probability", &mut enemies.boss_probability, &mut out);
        clamp_probability("enemies.group_probability", &mut enemies.group_probability, &mut out);
        clamp_min("enemies.group_radius", &mut enemies.group_radius, 0.0, 3.0, &mut out);
        clamp_min("enemies.group_jitter", &mut enemies.group_jitter, 0.0, 0.75, &mut out);
        clamp_min("enemies.density_factor", &mut enemies.density_factor, 0.0, 1.0, &mut out);

        let collectibles = &mut self.collectibles;
        if collectibles.max_count < collectibles.min_count {
            out.push(clamped(
                "collectibles.max_count",
                collectibles.max_count as f32,
                collectibles.min_count as f32,
            ));
            collectibles.max_count = collectibles.min_count;
        }
        clamp_probability("collectibles.power_up_probability", &mut collectibles.power_up_probability, &mut out);
        clamp_min("collectibles.density_factor", &mut collectibles.density_factor, 0.0, 1.0, &mut out);

        let streaming = &mut self.streaming;
        clamp_min("streaming.activation_distance", &mut streaming.activation_distance, 1.0, ACTIVATION_DISTANCE, &mut out);
        let floor = streaming.activation_distance + MIN_HYSTERESIS_BAND;
        if !streaming.deactivation_distance.is_finite() || streaming.deactivation_distance < floor {
            out.push(clamped("streaming.deactivation_distance", streaming.deactivation_distance, floor));
            streaming.deactivation_distance = floor;
        }

        out
    }
}

fn clamped(field: &'static str, from: f32, to: f32) -> Diagnostic {
    Diagnostic::ConfigClamped { field, from, to }
}

fn clamp_probability(field: &'static str, value: &mut f32, out: &mut Vec<Diagnostic>) {
    clamp_range(field, value, 0.0, 1.0, out);
}

fn clamp_range(field: &'static str, value: &mut f32, lo: f32, hi: f32, out: &mut Vec<Diagnostic>) {
    let fixed = if value.is_finite() { value.clamp(lo, hi) } else { lo };
    if fixed != *value {
        out.push(clamped(field, *value, fixed));
        *value = fixed;
    }
}

fn clamp_min(field: &'static str, value: &mut f32, min: f32, fallback: f32, out: &mut Vec<Diagnostic>) {
    let fixed = if !value.is_finite() {
        fallback
    } else {
        value.max(min)
    };
    if fixed != *value {
        out.push(clamped(field, *value, fixed));
        *value = fixed;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_clean() {
        let mut settings = GenerationSettings::default();
        assert!(settings.sanitize().is_empty());
    }

    #[test]
    fn test_sanitize_fixes_inverted_bounds() {
        let mut settings = GenerationSettings::default();
        settings.min_segments = 10;
        settings.max_segments = 4;
        settings.obstacles.density_factor = -2.0;
        settings.obstacles.max_count = 0;
        settings.streaming.deactivation_distance = 10.0;

        let diagnostics = settings.sanitize();
        assert_eq!(settings.max_segments, 10);
        assert_eq!(settings.obstacles.density_factor, 0.0);
        assert_eq!(settings.obstacles.max_count, settings.obstacles.min_count);
        assert!(settings.streaming.deactivation_distance > settings.streaming.activation_distance);
        assert_eq!(diagnostics.len(), 4);
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let settings = GenerationSettings::from_json(
            r#"{ "segment_length": 25.0, "obstacles": { "max_count": 9 }, "density": "Dense" }"#,
        )
        .unwrap();
        assert_eq!(settings.segment_length, 25.0);
        assert_eq!(settings.obstacles.max_count, 9);
        assert_eq!(settings.obstacles.min_count, 2);
        assert_eq!(settings.density, DensityPreset::Dense);
        assert_eq!(settings.streaming, StreamingConfig::default());
    }

    #[test]
    fn test_bad_json_is_an_error() {
        assert!(matches!(
            GenerationSettings::from_json("{ nope"),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn test_load_missing_file_falls_back() {
        let settings = GenerationSettings::load("/definitely/not/here.json");
        assert_eq!(settings, GenerationSettings::default());
    }

    #[test]
    fn test_preset_names() {
        assert_eq!(DensityPreset::from_str("HIGH"), Some(DensityPreset::Dense));
        assert_eq!(DensityPreset::Sparse.as_str(), "Sparse");
        assert_eq!(GenerationSettings::from_preset(DensityPreset::Dense).density.factor(), 1.3);
    }
}
