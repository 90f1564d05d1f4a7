//! Level generation pipeline
//!
//! Seed derivation -> segment planning -> content generation, with the
//! streaming manager deciding when each segment gets its content. Nothing in
//! here keeps a shared RNG: every unit of work derives its own stream.

pub mod catalog;
pub mod content;
pub mod difficulty;
pub mod planner;
pub mod scenario;
pub mod seed;
pub mod segment;
pub mod streaming;
pub mod theme;

pub use catalog::{ArchetypeCatalog, ArchetypeInfo, SizeCategory, StaticCatalog};
pub use content::{ContentContext, GeneratedContent, populate};
pub use difficulty::{DifficultyAdjuster, DifficultyCurve, difficulty_at};
pub use planner::{PlannedLevel, plan};
pub use scenario::{PlacementPattern, ScenarioEntry, ScenarioTable};
pub use seed::{SeedStream, SegmentRng, derive_item_seed, derive_level_seed, derive_segment_seed};
pub use segment::{
    ContentEntry, ContentId, ContentKind, LevelPlan, LevelRequest, Pose, Segment, SegmentContent, SegmentType,
};
pub use streaming::{StreamingManager, StreamingUpdate};
pub use theme::{HazardKind, Theme};
