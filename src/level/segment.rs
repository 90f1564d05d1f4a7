//! Level plan and segment types

use glam::{Quat, Vec3};
use serde::{Deserialize, Serialize};

use super::difficulty::DifficultyCurve;
use super::theme::Theme;

/// Segment shape
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SegmentType {
    Straight,
    Curve,
    Uphill,
    Downhill,
    Jump,
    Narrow,
    Wide,
    Hazard,
    Checkpoint,
}

impl SegmentType {
    /// Obstacle density multiplier for this shape
    pub fn density_multiplier(&self) -> f32 {
        match self {
            SegmentType::Hazard => 1.5,
            SegmentType::Narrow => 0.7,
            SegmentType::Jump => 0.5,
            _ => 1.0,
        }
    }

    /// Path width relative to the level's base width
    pub fn width_scale(&self) -> f32 {
        match self {
            SegmentType::Narrow => 0.6,
            SegmentType::Wide => 1.5,
            _ => 1.0,
        }
    }
}

/// A level creation request
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LevelRequest {
    pub theme: Theme,
    pub length_m: f32,
    pub seed: u64,
    pub is_tutorial: bool,
}

/// Root descriptor of a level. Immutable once segment planning begins.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LevelPlan {
    pub length: f32,
    pub segment_length: f32,
    pub segment_width: f32,
    pub min_segments: u32,
    pub max_segments: u32,
    pub segment_count: u32,
    /// Seed as requested
    pub root_seed: u64,
    /// Derived level seed every segment seed hangs off
    pub seed: u64,
    pub seed_version: u32,
    pub primary_theme: Theme,
    pub secondary_theme: Theme,
    pub theme_blend: f32,
    pub difficulty: DifficultyCurve,
    pub obstacle_density: f32,
    pub enemy_density: f32,
    pub collectible_density: f32,
    pub checkpoints_enabled: bool,
    pub checkpoint_interval: u32,
    pub dynamic_difficulty: bool,
    pub is_tutorial: bool,
    pub tutorial_window: u32,
    pub variety_factor: f32,
}

impl LevelPlan {
    /// Whether a segment falls in the reduced-density onboarding window
    pub fn in_tutorial_window(&self, segment_index: u32) -> bool {
        self.is_tutorial || segment_index < self.tutorial_window
    }
}

/// Position and orientation on the path
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Pose {
    pub position: Vec3,
    pub rotation: Quat,
}

impl Default for Pose {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            rotation: Quat::IDENTITY,
        }
    }
}

impl Pose {
    pub fn new(position: Vec3, rotation: Quat) -> Self {
        Self { position, rotation }
    }

    /// Forward direction (+Z rotated)
    pub fn forward(&self) -> Vec3 {
        self.rotation * Vec3::Z
    }

    /// Lateral direction (+X rotated)
    pub fn right(&self) -> Vec3 {
        self.rotation * Vec3::X
    }
}

/// A linear slice of the path
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Segment {
    pub index: u32,
    pub kind: SegmentType,
    pub start: Pose,
    pub end: Pose,
    pub width: f32,
    pub length: f32,
    pub theme: Theme,
    pub difficulty: u8,
    /// Derived from the level seed and index
    pub seed: u64,
    pub active: bool,
    pub generated: bool,
    pub next: Option<u32>,
}

impl Segment {
    /// Point on the centerline at `progress` in [0, 1]
    pub fn point_at(&self, progress: f32) -> Vec3 {
        self.start.position.lerp(self.end.position, progress)
    }

    /// Lateral axis at `progress`
    pub fn right_at(&self, progress: f32) -> Vec3 {
        self.start.rotation.slerp(self.end.rotation, progress) * Vec3::X
    }

    /// Path distance from the level start to this segment's start
    pub fn distance_from_start(&self) -> f32 {
        self.index as f32 * self.length
    }
}

/// Stable identity of a spawned instance: owning segment + ordinal.
/// Never drawn from a shared counter, so ids are the same for any
/// generation order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ContentId {
    pub segment: u32,
    pub ordinal: u32,
}

impl ContentId {
    pub fn new(segment: u32, ordinal: u32) -> Self {
        Self { segment, ordinal }
    }
}

impl std::fmt::Display for ContentId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.segment, self.ordinal)
    }
}

/// What a content entry refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ContentKind {
    Obstacle,
    Enemy,
    Collectible,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentEntry {
    pub id: ContentId,
    pub kind: ContentKind,
}

/// Ordered list of everything spawned for one segment. Append-only.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SegmentContent {
    entries: Vec<ContentEntry>,
}

impl SegmentContent {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, id: ContentId, kind: ContentKind) {
        self.entries.push(ContentEntry { id, kind });
    }

    pub fn entries(&self) -> &[ContentEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn count(&self, kind: ContentKind) -> usize {
        self.entries.iter().filter(|e| e.kind == kind).count()
    }
}
