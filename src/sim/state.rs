//! Level state and spawned entity types
//!
//! [`Level`] owns everything a running level needs: the plan, the segment
//! graph, spawned instances and the streaming manager. All of it can be
//! rebuilt from the request seed.

use std::collections::BTreeMap;

use glam::Vec3;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use super::navigation::{DirectNavigator, NavAgent, Navigator};
use super::obstacle::{Lifetime, ObstacleInstance, Oscillate};
use crate::error::{Diagnostic, GenerationError};
use crate::level::catalog::{self, ArchetypeCatalog, StaticCatalog};
use crate::level::{
    ContentContext, ContentId, ContentKind, DifficultyAdjuster, GeneratedContent, HazardKind, LevelPlan,
    LevelRequest, ScenarioTable, Segment, SegmentContent, StreamingManager, plan, populate,
};
use crate::settings::GenerationSettings;

/// Enemy tier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EnemyKind {
    /// Hovers in place
    Drone,
    /// Walks across the path
    Patroller,
    MidBoss,
    Boss,
}

impl EnemyKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EnemyKind::Drone => "drone",
            EnemyKind::Patroller => "patroller",
            EnemyKind::MidBoss => "mid_boss",
            EnemyKind::Boss => "boss",
        }
    }

    /// Starting health
    pub fn health(&self) -> f32 {
        match self {
            EnemyKind::Drone => 20.0,
            EnemyKind::Patroller => 40.0,
            EnemyKind::MidBoss => 200.0,
            EnemyKind::Boss => 500.0,
        }
    }
}

/// A spawned enemy
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnemyInstance {
    pub id: ContentId,
    pub kind: EnemyKind,
    pub position: Vec3,
    pub health: f32,
    /// Spawned as part of a cluster
    pub grouped: bool,
    /// Hover motion (drones)
    pub hover: Option<Oscillate>,
    /// Path follower (patrollers)
    pub agent: Option<NavAgent>,
    /// Endpoints walked in turn by the agent
    pub patrol_points: Vec<Vec3>,
    pub patrol_target: usize,
}

impl EnemyInstance {
    pub fn new(id: ContentId, kind: EnemyKind, position: Vec3) -> Self {
        Self {
            id,
            kind,
            position,
            health: kind.health(),
            grouped: false,
            hover: None,
            agent: None,
            patrol_points: Vec::new(),
            patrol_target: 0,
        }
    }
}

/// Power-up variants
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PowerUpKind {
    Magnet,
    Shield,
    SpeedBoost,
    DoubleScore,
}

impl PowerUpKind {
    pub const ALL: [PowerUpKind; 4] = [
        PowerUpKind::Magnet,
        PowerUpKind::Shield,
        PowerUpKind::SpeedBoost,
        PowerUpKind::DoubleScore,
    ];
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CollectibleKind {
    Coin { value: u32 },
    PowerUp(PowerUpKind),
}

/// A spawned collectible
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Collectible {
    pub id: ContentId,
    pub kind: CollectibleKind,
    pub position: Vec3,
    pub collected: bool,
}

/// Snapshot of a level for logs and tools
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LevelSummary {
    pub seed: u64,
    pub theme: String,
    pub segments: usize,
    pub generated: usize,
    pub active: usize,
    pub obstacles: usize,
    pub enemies: usize,
    pub collectibles: usize,
    pub diagnostics: usize,
    pub time_ticks: u64,
}

/// A running level (deterministic from its request)
pub struct Level {
    pub plan: LevelPlan,
    pub settings: GenerationSettings,
    pub segments: Vec<Segment>,
    /// Content records by segment index
    pub contents: BTreeMap<u32, SegmentContent>,
    pub obstacles: Vec<ObstacleInstance>,
    pub enemies: Vec<EnemyInstance>,
    pub collectibles: Vec<Collectible>,
    pub streaming: StreamingManager,
    pub adjuster: DifficultyAdjuster,
    /// Every recovered problem, in the order it happened
    pub diagnostics: Vec<Diagnostic>,
    /// Simulation tick counter
    pub time_ticks: u64,
    pub(crate) navigator: Box<dyn Navigator>,
    catalog: Box<dyn ArchetypeCatalog>,
    scenario: Option<ScenarioTable>,
}

impl Level {
    /// Plan a level with the built-in catalog and straight-line navigation,
    /// then generate segment 0
    pub fn new(request: &LevelRequest, settings: &GenerationSettings) -> Self {
        Self::with_capabilities(request, settings, Box::new(StaticCatalog), Box::new(DirectNavigator), None)
    }

    pub fn with_capabilities(
        request: &LevelRequest,
        settings: &GenerationSettings,
        catalog: Box<dyn ArchetypeCatalog>,
        navigator: Box<dyn Navigator>,
        scenario: Option<ScenarioTable>,
    ) -> Self {
        let planned = plan(request, settings);
        let settings = planned.settings;

        let mut level = Self {
            plan: planned.plan,
            streaming: StreamingManager::new(&settings.streaming),
            settings,
            segments: planned.segments,
            contents: BTreeMap::new(),
            obstacles: Vec::new(),
            enemies: Vec::new(),
            collectibles: Vec::new(),
            adjuster: DifficultyAdjuster::default(),
            diagnostics: Vec::new(),
            time_ticks: 0,
            navigator,
            catalog,
            scenario,
        };
        // Already logged by the planner
        level.diagnostics.extend(planned.diagnostics);

        if let Err(err) = level.populate_segment(0) {
            log::warn!("Initial segment not generated: {err}");
        }
        log::info!(
            "Level ready: seed={} segments={} obstacles={}",
            level.plan.root_seed,
            level.segments.len(),
            level.obstacles.len()
        );
        level
    }

    /// Log and keep a diagnostic
    pub fn record(&mut self, diagnostic: Diagnostic) {
        diagnostic.report();
        self.diagnostics.push(diagnostic);
    }

    pub fn is_torn_down(&self) -> bool {
        self.streaming.is_torn_down()
    }

    pub fn segment(&self, index: u32) -> Option<&Segment> {
        self.segments.get(index as usize)
    }

    pub fn content(&self, index: u32) -> Option<&SegmentContent> {
        self.contents.get(&index)
    }

    /// Density scale from dynamic difficulty (1.0 when disabled)
    pub fn density_scale(&self) -> f32 {
        if self.plan.dynamic_difficulty {
            self.adjuster.density_scale()
        } else {
            1.0
        }
    }

    fn context(&self) -> ContentContext<'_> {
        ContentContext {
            plan: &self.plan,
            settings: &self.settings,
            catalog: self.catalog.as_ref(),
            scenario: self.scenario.as_ref(),
            density_scale: self.density_scale(),
        }
    }

    /// Check that a segment can still be mutated
    fn check_present(&mut self, index: u32) -> Result<(), GenerationError> {
        if self.is_torn_down() {
            self.record(Diagnostic::TornDown { segment: index });
            return Err(GenerationError::TornDown);
        }
        if self.segment(index).is_none() {
            self.record(Diagnostic::SegmentMissing { segment: index });
            return Err(GenerationError::SegmentMissing(index));
        }
        Ok(())
    }

    /// Generate content for one segment.
    ///
    /// A second call on a generated segment is a no-op returning the existing
    /// content.
    pub fn populate_segment(&mut self, index: u32) -> Result<&SegmentContent, GenerationError> {
        self.check_present(index)?;

        let generated = self.segments[index as usize].generated;
        if generated {
            self.record(Diagnostic::AlreadyGenerated { segment: index });
        } else {
            let output = populate(&self.segments[index as usize], &self.context());
            self.apply(output)?;
        }
        self.contents
            .get(&index)
            .ok_or(GenerationError::SegmentMissing(index))
    }

    /// Generate several segments in parallel. Already generated, duplicate or
    /// missing indices are skipped. Returns how many segments were generated.
    pub fn generate_segments(&mut self, indices: &[u32]) -> usize {
        if self.is_torn_down() {
            for &segment in indices {
                self.record(Diagnostic::TornDown { segment });
            }
            return 0;
        }

        let mut todo: Vec<u32> = Vec::with_capacity(indices.len());
        for &index in indices {
            match self.segment(index).map(|s| s.generated) {
                None => {
                    self.record(Diagnostic::SegmentMissing { segment: index });
                    self.streaming.complete(index);
                }
                Some(true) => {
                    self.record(Diagnostic::AlreadyGenerated { segment: index });
                    self.streaming.complete(index);
                }
                Some(false) if todo.contains(&index) => {}
                Some(false) => todo.push(index),
            }
        }

        let ctx = self.context();
        let segments = &self.segments;
        let outputs: Vec<GeneratedContent> = todo
            .par_iter()
            .map(|&index| populate(&segments[index as usize], &ctx))
            .collect();

        let mut count = 0;
        for output in outputs {
            if self.apply(output).is_ok() {
                count += 1;
            }
        }
        count
    }

    /// Merge generated content, re-checking the segment right before mutating
    fn apply(&mut self, output: GeneratedContent) -> Result<(), GenerationError> {
        let index = output.segment;
        self.streaming.complete(index);
        self.check_present(index)?;
        if self.segments[index as usize].generated {
            self.record(Diagnostic::AlreadyGenerated { segment: index });
            return Ok(());
        }

        for diagnostic in output.diagnostics {
            self.record(diagnostic);
        }
        self.obstacles.extend(output.obstacles);
        self.enemies.extend(output.enemies);
        self.collectibles.extend(output.collectibles);
        self.contents.insert(index, output.content);
        self.segments[index as usize].generated = true;
        Ok(())
    }

    /// Drop a segment's content so it is generated again on next activation
    pub fn reset_segment(&mut self, index: u32) -> Result<(), GenerationError> {
        self.check_present(index)?;
        self.obstacles.retain(|o| o.id.segment != index);
        self.enemies.retain(|e| e.id.segment != index);
        self.collectibles.retain(|c| c.id.segment != index);
        self.contents.remove(&index);
        self.streaming.reset_segment(&mut self.segments[index as usize]);
        log::debug!("Segment {index} reset");
        Ok(())
    }

    /// Tear the level down. Later requests are dropped with a diagnostic.
    pub fn teardown(&mut self) {
        self.streaming.teardown();
        self.segments.clear();
        self.contents.clear();
        self.obstacles.clear();
        self.enemies.clear();
        self.collectibles.clear();
        log::info!("Level seed={} torn down", self.plan.root_seed);
    }

    /// Spawn a temporary hazard at runtime. Its id continues the owning
    /// segment's ordinals, generating the segment first if needed.
    pub fn spawn_hazard(
        &mut self,
        segment: u32,
        hazard: HazardKind,
        position: Vec3,
        lifetime: Lifetime,
    ) -> Result<ContentId, GenerationError> {
        if !self.segment(segment).is_some_and(|s| s.generated) {
            self.populate_segment(segment)?;
        }
        let (code, info, miss) = catalog::resolve(self.catalog.as_ref(), hazard.archetype_code());
        if let Some(miss) = miss {
            self.record(miss);
        }

        let content = self.contents.entry(segment).or_default();
        let id = ContentId::new(segment, content.len() as u32);
        content.push(id, ContentKind::Obstacle);

        let mut obstacle = ObstacleInstance::new(id, code, info.category, position);
        obstacle.collision_radius = info.collision_radius;
        obstacle.strength = info.strength;
        obstacle.behavior.lifetime = Some(lifetime);
        self.obstacles.push(obstacle);
        Ok(id)
    }

    /// Damage an obstacle. Returns false for unknown or indestructible targets.
    pub fn apply_hit(&mut self, id: ContentId, amount: f32) -> bool {
        self.obstacles
            .iter_mut()
            .find(|o| o.id == id)
            .is_some_and(|o| o.apply_damage(amount))
    }

    pub fn summary(&self) -> LevelSummary {
        LevelSummary {
            seed: self.plan.root_seed,
            theme: self.plan.primary_theme.as_str().to_string(),
            segments: self.segments.len(),
            generated: self.segments.iter().filter(|s| s.generated).count(),
            active: self.segments.iter().filter(|s| s.active).count(),
            obstacles: self.obstacles.len(),
            enemies: self.enemies.len(),
            collectibles: self.collectibles.len(),
            diagnostics: self.diagnostics.len(),
            time_ticks: self.time_ticks,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::level::Theme;

    fn request(seed: u64) -> LevelRequest {
        LevelRequest {
            theme: Theme::City,
            length_m: 600.0,
            seed,
            is_tutorial: false,
        }
    }

    #[test]
    fn test_new_generates_first_segment_only() {
        let level = Level::new(&request(1), &GenerationSettings::default());
        assert!(level.segments[0].generated);
        assert!(level.segments[0].active);
        assert!(level.segments[1..].iter().all(|s| !s.generated && !s.active));
        assert!(level.content(0).is_some());
        assert!(level.diagnostics.is_empty());
    }

    #[test]
    fn test_keeps_planner_settings_and_diagnostics() {
        let mut settings = GenerationSettings::default();
        settings.max_segments = 2;
        settings.enemies.min_count = 9;
        settings.enemies.max_count = 1;
        let planned = plan(&request(3), &settings);
        let level = Level::new(&request(3), &settings);

        assert_eq!(level.settings, planned.settings);
        assert_eq!(level.settings.enemies.max_count, 9);
        assert_eq!(level.diagnostics, planned.diagnostics);
        assert_eq!(level.diagnostics.len(), 2);
    }

    #[test]
    fn test_populate_twice_is_noop() {
        let mut level = Level::new(&request(2), &GenerationSettings::default());
        let first = level.populate_segment(3).unwrap().clone();
        let obstacles = level.obstacles.len();
        let second = level.populate_segment(3).unwrap().clone();
        assert_eq!(first, second);
        assert_eq!(level.obstacles.len(), obstacles);
        assert!(matches!(
            level.diagnostics.last(),
            Some(Diagnostic::AlreadyGenerated { segment: 3 })
        ));
    }

    #[test]
    fn test_missing_segment_is_reported() {
        let mut level = Level::new(&request(3), &GenerationSettings::default());
        assert_eq!(level.populate_segment(999).err(), Some(GenerationError::SegmentMissing(999)));
        assert!(matches!(level.diagnostics.last(), Some(Diagnostic::SegmentMissing { segment: 999 })));
    }

    #[test]
    fn test_batch_matches_sequential() {
        let settings = GenerationSettings::default();
        let mut batch = Level::new(&request(4), &settings);
        let mut sequential = Level::new(&request(4), &settings);

        let indices: Vec<u32> = (1..batch.segments.len() as u32).rev().collect();
        assert_eq!(batch.generate_segments(&indices), indices.len());
        for index in 1..sequential.segments.len() as u32 {
            sequential.populate_segment(index).unwrap();
        }
        assert_eq!(batch.contents, sequential.contents);

        let mut a = batch.obstacles.clone();
        let mut b = sequential.obstacles.clone();
        a.sort_by_key(|o| o.id);
        b.sort_by_key(|o| o.id);
        assert_eq!(a, b);
    }

    #[test]
    fn test_reset_then_regenerate_is_identical() {
        let mut level = Level::new(&request(5), &GenerationSettings::default());
        let before = level.populate_segment(6).unwrap().clone();
        let obstacles: Vec<_> = level.obstacles.iter().filter(|o| o.id.segment == 6).cloned().collect();

        level.reset_segment(6).unwrap();
        assert!(!level.segments[6].generated);
        assert!(level.obstacles.iter().all(|o| o.id.segment != 6));

        let after = level.populate_segment(6).unwrap().clone();
        assert_eq!(before, after);
        let again: Vec<_> = level.obstacles.iter().filter(|o| o.id.segment == 6).cloned().collect();
        assert_eq!(obstacles, again);
    }

    #[test]
    fn test_teardown_drops_requests() {
        let mut level = Level::new(&request(6), &GenerationSettings::default());
        level.teardown();
        assert_eq!(level.populate_segment(1).err(), Some(GenerationError::TornDown));
        assert_eq!(level.generate_segments(&[1, 2]), 0);
        assert!(level.obstacles.is_empty());
        assert!(matches!(level.diagnostics.last(), Some(Diagnostic::TornDown { segment: 2 })));
    }

    #[test]
    fn test_spawn_hazard_extends_segment_ordinals() {
        let mut level = Level::new(&request(7), &GenerationSettings::default());
        let before = level.content(2).map_or(0, SegmentContent::len);
        assert_eq!(before, 0);
        let id = level
            .spawn_hazard(
                2,
                HazardKind::Lava,
                Vec3::new(0.0, 0.0, 70.0),
                Lifetime {
                    remaining: 3.0,
                    fade_out_time: 1.0,
                },
            )
            .unwrap();
        let content = level.content(2).unwrap();
        assert_eq!(id, ContentId::new(2, content.len() as u32 - 1));
        assert!(level.segments[2].generated);
        let hazard = level.obstacles.iter().find(|o| o.id == id).unwrap();
        assert_eq!(hazard.code, "lava_pool");
    }

    #[test]
    fn test_apply_hit() {
        let mut level = Level::new(&request(8), &GenerationSettings::default());
        level.generate_segments(&(0..level.segments.len() as u32).collect::<Vec<_>>());
        let target = level.obstacles.iter().find(|o| o.behavior.damage.is_some()).map(|o| o.id);
        let plain = level.obstacles.iter().find(|o| o.behavior.damage.is_none()).map(|o| o.id);
        if let Some(id) = target {
            assert!(level.apply_hit(id, 5.0));
        }
        if let Some(id) = plain {
            assert!(!level.apply_hit(id, 5.0));
        }
        assert!(!level.apply_hit(ContentId::new(999, 0), 5.0));
    }

    #[test]
    fn test_summary_counts() {
        let level = Level::new(&request(9), &GenerationSettings::default());
        let summary = level.summary();
        assert_eq!(summary.segments, level.segments.len());
        assert_eq!(summary.generated, 1);
        assert_eq!(summary.active, 1);
        assert_eq!(summary.theme, Theme::City.as_str());
    }
}
