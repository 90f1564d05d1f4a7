//! Thematic palettes and their hazard mapping

use serde::{Deserialize, Serialize};

/// Visual/hazard palette of a segment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Theme {
    #[default]
    City,
    Forest,
    Tundra,
    Volcano,
    Abyss,
    Virtual,
}

/// Theme-specific special hazard
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HazardKind {
    Lava,
    Ice,
    DigitalBarrier,
    Underwater,
    Slippery,
    Toxic,
}

impl Theme {
    pub const ALL: [Theme; 6] = [
        Theme::City,
        Theme::Forest,
        Theme::Tundra,
        Theme::Volcano,
        Theme::Abyss,
        Theme::Virtual,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Theme::City => "City",
            Theme::Forest => "Forest",
            Theme::Tundra => "Tundra",
            Theme::Volcano => "Volcano",
            Theme::Abyss => "Abyss",
            Theme::Virtual => "Virtual",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "city" => Some(Theme::City),
            "forest" => Some(Theme::Forest),
            "tundra" | "ice" => Some(Theme::Tundra),
            "volcano" | "lava" => Some(Theme::Volcano),
            "abyss" | "underwater" => Some(Theme::Abyss),
            "virtual" | "digital" => Some(Theme::Virtual),
            _ => None,
        }
    }

    /// How steeply difficulty climbs in this theme (1.0 = nominal)
    pub fn ramp_multiplier(&self) -> f32 {
        match self {
            Theme::City => 1.0,
            Theme::Forest => 0.9,
            Theme::Tundra => 1.1,
            Theme::Volcano => 1.25,
            Theme::Abyss => 1.2,
            Theme::Virtual => 1.15,
        }
    }

    /// The special hazard native to this theme
    pub fn hazard(&self) -> HazardKind {
        match self {
            Theme::City => HazardKind::Slippery,
            Theme::Forest => HazardKind::Toxic,
            Theme::Tundra => HazardKind::Ice,
            Theme::Volcano => HazardKind::Lava,
            Theme::Abyss => HazardKind::Underwater,
            Theme::Virtual => HazardKind::DigitalBarrier,
        }
    }

    /// Pick a secondary theme different from `self` using a draw in [0, 1)
    pub fn secondary_from_roll(&self, roll: f32) -> Theme {
        let others: Vec<Theme> = Theme::ALL.into_iter().filter(|t| t != self).collect();
        let idx = ((roll.clamp(0.0, 0.999_999) * others.len() as f32) as usize).min(others.len() - 1);
        others[idx]
    }
}

impl HazardKind {
    /// Archetype code spawned for this hazard
    pub fn archetype_code(&self) -> &'static str {
        match self {
            HazardKind::Lava => "lava_pool",
            HazardKind::Ice => "ice_patch",
            HazardKind::DigitalBarrier => "digital_barrier",
            HazardKind::Underwater => "undertow",
            HazardKind::Slippery => "oil_slick",
            HazardKind::Toxic => "toxic_pool",
        }
    }
}
