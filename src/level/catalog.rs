//! Obstacle archetype catalog
//!
//! A static, read-only table mapping archetype codes to their footprint and
//! toughness. Unknown codes resolve to [`DEFAULT_ARCHETYPE`].

use serde::{Deserialize, Serialize};

use super::theme::{HazardKind, Theme};
use crate::error::Diagnostic;

/// Size class used by downstream collision and scoring systems
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SizeCategory {
    Small,
    Medium,
    Large,
    /// Theme hazards (pools, barriers) with no solid body
    Special,
}

/// Catalog record for one archetype
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ArchetypeInfo {
    pub category: SizeCategory,
    pub default_height: f32,
    pub default_width: f32,
    pub collision_radius: f32,
    pub destructible: bool,
    pub strength: f32,
}

/// Read-only archetype lookup
pub trait ArchetypeCatalog: Send + Sync {
    fn lookup(&self, code: &str) -> Option<ArchetypeInfo>;
}

/// Code used when a lookup misses
pub const DEFAULT_ARCHETYPE: &str = "crate";

const UNIVERSAL_SMALL: &[&str] = &["cone", "crate", "barrel"];
const UNIVERSAL_MEDIUM: &[&str] = &["barrier", "fence", "road_block"];
const UNIVERSAL_LARGE: &[&str] = &["wall", "container", "boulder"];

/// Universal archetypes for a size class
pub fn universal_codes(size: SizeCategory) -> &'static [&'static str] {
    match size {
        SizeCategory::Small => UNIVERSAL_SMALL,
        SizeCategory::Medium => UNIVERSAL_MEDIUM,
        SizeCategory::Large => UNIVERSAL_LARGE,
        SizeCategory::Special => &[],
    }
}

/// Theme-specific archetypes for a size class
pub fn theme_codes(theme: Theme, size: SizeCategory) -> &'static [&'static str] {
    use SizeCategory::*;
    match (theme, size) {
        (_, Special) => &[],
        (Theme::City, Small) => &["hydrant", "trash_can"],
        (Theme::City, Medium) => &["car", "bench"],
        (Theme::City, Large) => &["bus", "billboard"],
        (Theme::Forest, Small) => &["stump", "mushroom"],
        (Theme::Forest, Medium) => &["fallen_log", "bramble"],
        (Theme::Forest, Large) => &["tree", "rock_arch"],
        (Theme::Tundra, Small) => &["snowdrift", "icicle"],
        (Theme::Tundra, Medium) => &["ice_block", "sled"],
        (Theme::Tundra, Large) => &["glacier_shard", "snow_fort"],
        (Theme::Volcano, Small) => &["ember_rock", "ash_pile"],
        (Theme::Volcano, Medium) => &["magma_vent", "obsidian_spike"],
        (Theme::Volcano, Large) => &["lava_column", "basalt_wall"],
        (Theme::Abyss, Small) => &["coral", "urchin"],
        (Theme::Abyss, Medium) => &["anchor", "clam"],
        (Theme::Abyss, Large) => &["shipwreck", "kelp_wall"],
        (Theme::Virtual, Small) => &["glitch_cube", "bit_shard"],
        (Theme::Virtual, Medium) => &["firewall", "data_node"],
        (Theme::Virtual, Large) => &["data_tower", "server_rack"],
    }
}

/// Built-in catalog covering every code the generator can emit
#[derive(Debug, Clone, Copy, Default)]
pub struct StaticCatalog;

impl StaticCatalog {
    fn category_of(code: &str) -> Option<SizeCategory> {
        const HAZARDS: [HazardKind; 6] = [
            HazardKind::Lava,
            HazardKind::Ice,
            HazardKind::DigitalBarrier,
            HazardKind::Underwater,
            HazardKind::Slippery,
            HazardKind::Toxic,
        ];
        if HAZARDS.iter().any(|h| h.archetype_code() == code) {
            return Some(SizeCategory::Special);
        }
        [SizeCategory::Small, SizeCategory::Medium, SizeCategory::Large]
            .into_iter()
            .find(|&size| {
                universal_codes(size).contains(&code)
                    || Theme::ALL.iter().any(|&t| theme_codes(t, size).contains(&code))
            })
    }
}

impl ArchetypeCatalog for StaticCatalog {
    fn lookup(&self, code: &str) -> Option<ArchetypeInfo> {
        let category = Self::category_of(code)?;
        let mut info = match category {
            SizeCategory::Small => ArchetypeInfo {
                category,
                default_height: 1.0,
                default_width: 1.0,
                collision_radius: 0.6,
                destructible: true,
                strength: 25.0,
            },
            SizeCategory::Medium => ArchetypeInfo {
                category,
                default_height: 2.0,
                default_width: 2.5,
                collision_radius: 1.3,
                destructible: true,
                strength: 60.0,
            },
            SizeCategory::Large => ArchetypeInfo {
                category,
                default_height: 4.0,
                default_width: 4.5,
                collision_radius: 2.4,
                destructible: false,
                strength: 150.0,
            },
            SizeCategory::Special => ArchetypeInfo {
                category,
                default_height: 0.2,
                default_width: 3.0,
                collision_radius: 1.5,
                destructible: false,
                strength: 0.0,
            },
        };

        match code {
            "wall" | "basalt_wall" | "kelp_wall" => info.default_width = 6.0,
            "container" | "bus" => {
                info.default_width = 5.0;
                info.destructible = true;
            }
            "digital_barrier" => {
                info.default_height = 3.0;
                info.default_width = 4.0;
            }
            "boulder" | "glacier_shard" => info.strength = 200.0,
            _ => {}
        }
        Some(info)
    }
}

/// Look up `code`, falling back to the default archetype on a miss
pub fn resolve(catalog: &dyn ArchetypeCatalog, code: &str) -> (String, ArchetypeInfo, Option<Diagnostic>) {
    if let Some(info) = catalog.lookup(code) {
        return (code.to_string(), info, None);
    }
    let info = catalog
        .lookup(DEFAULT_ARCHETYPE)
        .or_else(|| StaticCatalog.lookup(DEFAULT_ARCHETYPE))
        .unwrap_or(ArchetypeInfo {
            category: SizeCategory::Small,
            default_height: 1.0,
            default_width: 1.0,
            collision_radius: 0.6,
            destructible: true,
            strength: 25.0,
        });
    let miss = Diagnostic::CatalogMiss {
        code: code.to_string(),
        fallback: DEFAULT_ARCHETYPE,
    };
    (DEFAULT_ARCHETYPE.to_string(), info, Some(miss))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_generated_code_is_cataloged() {
        let catalog = StaticCatalog;
        for size in [SizeCategory::Small, SizeCategory::Medium, SizeCategory::Large] {
            for code in universal_codes(size) {
                assert_eq!(catalog.lookup(code).map(|i| i.category), Some(size), "{code}");
            }
            for theme in Theme::ALL {
                for code in theme_codes(theme, size) {
                    assert_eq!(catalog.lookup(code).map(|i| i.category), Some(size), "{code}");
                }
            }
        }
        for theme in Theme::ALL {
            let code = theme.hazard().archetype_code();
            assert_eq!(catalog.lookup(code).map(|i| i.category), Some(SizeCategory::Special));
        }
    }

    #[test]
    fn test_miss_falls_back_with_warning() {
        let (code, info, miss) = resolve(&StaticCatalog, "flying_piano");
        assert_eq!(code, DEFAULT_ARCHETYPE);
        assert_eq!(info.category, SizeCategory::Small);
        assert!(matches!(miss, Some(Diagnostic::CatalogMiss { .. })));
    }

    #[test]
    fn test_hit_has_no_warning() {
        let (code, info, miss) = resolve(&StaticCatalog, "digital_barrier");
        assert_eq!(code, "digital_barrier");
        assert_eq!(info.default_height, 3.0);
        assert!(miss.is_none());
    }
}
