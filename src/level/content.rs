//! Segment content generation
//!
//! Fills one planned segment with obstacles, enemies and collectibles. Every
//! draw comes from the segment's content stream (or an item stream for
//! per-obstacle behavior), so the result depends on `(level seed, segment
//! index)` alone and segments can be generated in any order or in parallel.
//!
//! Ordinals are assigned obstacles first, then enemies, then collectibles.

use std::f32::consts::TAU;

use glam::{Quat, Vec3};

use super::catalog::{self, ArchetypeCatalog, ArchetypeInfo, SizeCategory};
use super::scenario::ScenarioTable;
use super::seed::{SeedStream, SegmentRng};
use super::segment::{ContentId, ContentKind, LevelPlan, Segment, SegmentContent, SegmentType};
use super::theme::HazardKind;
use crate::consts::*;
use crate::error::Diagnostic;
use crate::settings::{EnemySpawnConfig, GenerationSettings, ObstacleSpawnConfig};
use crate::sim::navigation::NavAgent;
use crate::sim::obstacle::{DamageState, ObstacleInstance, Oscillate, Patrol, Phase, PhaseKind, PhaseSequence, Rotate};
use crate::sim::state::{Collectible, CollectibleKind, EnemyInstance, EnemyKind, PowerUpKind};

/// Hover height of drones above the path
pub const DRONE_HOVER_HEIGHT: f32 = 2.0;
/// Walking speed of patrolling enemies (m/s)
pub const PATROLLER_SPEED: f32 = 2.5;
/// Height of collectibles above the path
pub const COLLECTIBLE_HEIGHT: f32 = 1.0;
/// Seconds before a wrecked large obstacle stands back up
pub const WRECK_RECOVERY_DELAY: f32 = 5.0;
/// Seconds between smoke/fire pulses on damaged obstacles
pub const DAMAGE_EFFECT_INTERVAL: f32 = 0.5;

/// Everything needed to populate a segment besides the segment itself
#[derive(Clone, Copy)]
pub struct ContentContext<'a> {
    pub plan: &'a LevelPlan,
    pub settings: &'a GenerationSettings,
    pub catalog: &'a dyn ArchetypeCatalog,
    pub scenario: Option<&'a ScenarioTable>,
    /// Dynamic difficulty density scale (1.0 when disabled)
    pub density_scale: f32,
}

/// Output of [`populate`] for one segment
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GeneratedContent {
    pub segment: u32,
    pub content: SegmentContent,
    pub obstacles: Vec<ObstacleInstance>,
    pub enemies: Vec<EnemyInstance>,
    pub collectibles: Vec<Collectible>,
    pub diagnostics: Vec<Diagnostic>,
}

impl GeneratedContent {
    fn next_id(&self) -> ContentId {
        ContentId::new(self.segment, self.content.len() as u32)
    }
}

/// Inclusive count bounds `(lo, hi)` from a spawn table.
///
/// `lo = max(1, min * mult)`, `hi = max(2, max * mult * density)`; an
/// inverted range collapses to `lo`.
pub fn count_bounds(min_count: u32, max_count: u32, mult: f32, density: f32) -> (u32, u32) {
    let mult = mult.max(0.0);
    let density = density.max(0.0);
    let lo = ((min_count as f32 * mult).floor() as u32).max(1);
    let hi = ((max_count as f32 * mult * density).floor() as u32).max(2);
    (lo, hi.max(lo))
}

/// Obstacle density multiplier for a segment
pub fn obstacle_multiplier(kind: SegmentType, in_tutorial_window: bool) -> f32 {
    let mult = kind.density_multiplier();
    if in_tutorial_window { mult * 0.5 } else { mult }
}

/// Obstacle count bounds for a segment
pub fn obstacle_bounds(segment: &Segment, ctx: &ContentContext) -> (u32, u32) {
    let cfg = &ctx.settings.obstacles;
    let mult = obstacle_multiplier(segment.kind, ctx.plan.in_tutorial_window(segment.index));
    count_bounds(cfg.min_count, cfg.max_count, mult, ctx.plan.obstacle_density * ctx.density_scale)
}

/// Half-width available for lateral jitter, never negative
pub fn lateral_half_band(width: f32, footprint: f32) -> f32 {
    (width * 0.5 - PLACEMENT_MARGIN.max(footprint * 0.5)).max(0.0)
}

/// Chance that an obstacle becomes the segment theme's hazard
pub fn hazard_probability(cfg: &ObstacleSpawnConfig, hazard: HazardKind, difficulty: u8, in_tutorial_window: bool) -> f32 {
    let scale = 1.0 + (difficulty.max(1) - 1) as f32 * 0.1;
    let p = cfg.hazards.for_hazard(hazard) * scale;
    let p = if in_tutorial_window { p * cfg.tutorial_hazard_scale } else { p };
    p.clamp(0.0, 1.0)
}

/// Populate a planned segment.
///
/// Pure: the caller owns the `generated` guard and applies the result.
/// Checkpoints only receive collectibles.
pub fn populate(segment: &Segment, ctx: &ContentContext) -> GeneratedContent {
    let mut out = GeneratedContent {
        segment: segment.index,
        ..Default::default()
    };
    let mut rng = SegmentRng::for_stream(segment.seed, SeedStream::Content);

    if segment.kind != SegmentType::Checkpoint {
        let scripted = ctx
            .scenario
            .filter(|table| ctx.plan.is_tutorial && table.covers(segment.distance_from_start(), segment.length));
        match scripted {
            Some(table) => spawn_scripted(segment, ctx, table, &mut rng, &mut out),
            None => spawn_obstacles(segment, ctx, &mut rng, &mut out),
        }
        if !ctx.plan.in_tutorial_window(segment.index) {
            spawn_enemies(segment, ctx, &mut rng, &mut out);
        }
    }
    spawn_collectibles(segment, ctx, &mut rng, &mut out);

    log::debug!(
        "Populated segment {} ({:?}, {}, d={}): {} obstacles, {} enemies, {} collectibles",
        segment.index,
        segment.kind,
        segment.theme.as_str(),
        segment.difficulty,
        out.obstacles.len(),
        out.enemies.len(),
        out.collectibles.len()
    );
    out
}

/// Pose on the segment at `progress` with a lateral offset in meters
fn place(segment: &Segment, progress: f32, lateral: f32) -> (Vec3, Quat) {
    let position = segment.point_at(progress) + segment.right_at(progress) * lateral;
    let rotation = segment.start.rotation.slerp(segment.end.rotation, progress);
    (position, rotation)
}

/// Fixed-order draws for one probability-driven obstacle
struct ObstacleDraw {
    progress: f32,
    lateral: f32,
    size_roll: f32,
    hazard_roll: f32,
    universal_roll: f32,
    pick: f32,
}

impl ObstacleDraw {
    fn draw(rng: &mut SegmentRng) -> Self {
        Self {
            progress: rng.range(PLACEMENT_PROGRESS_MIN, PLACEMENT_PROGRESS_MAX),
            lateral: rng.range(-1.0, 1.0),
            size_roll: rng.unit(),
            hazard_roll: rng.unit(),
            universal_roll: rng.unit(),
            pick: rng.unit(),
        }
    }
}

fn pick_code(codes: &[&'static str], pick: f32) -> &'static str {
    if codes.is_empty() {
        return catalog::DEFAULT_ARCHETYPE;
    }
    let index = ((pick * codes.len() as f32) as usize).min(codes.len() - 1);
    codes[index]
}

fn select_archetype(segment: &Segment, ctx: &ContentContext, draw: &ObstacleDraw) -> &'static str {
    let cfg = &ctx.settings.obstacles;
    let in_window = ctx.plan.in_tutorial_window(segment.index);
    let hazard = segment.theme.hazard();
    if draw.hazard_roll < hazard_probability(cfg, hazard, segment.difficulty, in_window) {
        return hazard.archetype_code();
    }

    let size = if draw.size_roll < cfg.small_probability {
        SizeCategory::Small
    } else if draw.size_roll < cfg.small_probability + cfg.medium_probability {
        SizeCategory::Medium
    } else {
        SizeCategory::Large
    };
    let codes = if draw.universal_roll < cfg.universal_probability {
        catalog::universal_codes(size)
    } else {
        catalog::theme_codes(segment.theme, size)
    };
    pick_code(codes, draw.pick)
}

fn spawn_obstacles(segment: &Segment, ctx: &ContentContext, rng: &mut SegmentRng, out: &mut GeneratedContent) {
    let (lo, hi) = obstacle_bounds(segment, ctx);
    let count = rng.range_inclusive(lo, hi);

    for _ in 0..count {
        let draw = ObstacleDraw::draw(rng);
        let code = select_archetype(segment, ctx, &draw);
        spawn_obstacle(segment, ctx, code, draw.progress, draw.lateral, out);
    }
}

fn spawn_scripted(
    segment: &Segment,
    ctx: &ContentContext,
    table: &ScenarioTable,
    rng: &mut SegmentRng,
    out: &mut GeneratedContent,
) {
    let start = segment.distance_from_start();
    for entry in table.entries_in(start, segment.length) {
        let anchor = (entry.distance - start) / segment.length.max(f32::EPSILON);
        for (i, (progress, lateral)) in entry.pattern.slots(anchor, entry.count, rng).into_iter().enumerate() {
            let code = match entry.codes.len() {
                0 => catalog::DEFAULT_ARCHETYPE,
                n => entry.codes[i % n].as_str(),
            };
            spawn_obstacle(segment, ctx, code, progress, lateral, out);
        }
    }
}

/// Resolve, place and record one obstacle. `lateral` is in [-1, 1].
fn spawn_obstacle(
    segment: &Segment,
    ctx: &ContentContext,
    code: &str,
    progress: f32,
    lateral: f32,
    out: &mut GeneratedContent,
) {
    let (code, info, miss) = catalog::resolve(ctx.catalog, code);
    if let Some(miss) = miss {
        out.diagnostics.push(miss);
    }

    let half_band = lateral_half_band(segment.width, info.default_width);
    let (position, rotation) = place(segment, progress, lateral.clamp(-1.0, 1.0) * half_band);

    let id = out.next_id();
    let mut obstacle = ObstacleInstance::new(id, code, info.category, position);
    obstacle.rotation = rotation;
    obstacle.collision_radius = info.collision_radius;
    obstacle.destructible = info.destructible;
    obstacle.strength = info.strength;

    let mut item_rng = SegmentRng::for_item(segment.seed, id.ordinal);
    assign_behavior(&mut obstacle, &info, segment, ctx, half_band, progress, &mut item_rng);

    out.content.push(id, ContentKind::Obstacle);
    out.obstacles.push(obstacle);
}

/// Attach behavior components from the obstacle's own item stream
fn assign_behavior(
    obstacle: &mut ObstacleInstance,
    info: &ArchetypeInfo,
    segment: &Segment,
    ctx: &ContentContext,
    half_band: f32,
    progress: f32,
    rng: &mut SegmentRng,
) {
    let moving_roll = rng.unit();
    let magnitude = rng.unit();
    let speed_roll = rng.unit();
    let sign = rng.sign();

    let right = segment.right_at(progress);
    let travel = half_band.min(1.0 + magnitude * 2.0);
    let in_window = ctx.plan.in_tutorial_window(segment.index);

    if obstacle.code == HazardKind::DigitalBarrier.archetype_code() {
        // Sweep out and back so the barrier never drifts
        let direction = right * sign;
        let sweep = 1.0;
        let speed = travel / sweep;
        let still = |kind, duration| Phase {
            kind,
            duration,
            direction: Vec3::ZERO,
            speed: 0.0,
        };
        let out_and_back = |direction| Phase {
            kind: PhaseKind::Active,
            duration: sweep,
            direction,
            speed,
        };
        obstacle.behavior.phases = Some(PhaseSequence::new(vec![
            still(PhaseKind::Idle, 1.0 + speed_roll),
            still(PhaseKind::Warning, 0.75),
            out_and_back(direction),
            out_and_back(-direction),
        ]));
    } else if !in_window {
        let chance = ctx.settings.obstacles.moving_chance_per_difficulty * segment.difficulty as f32;
        if moving_roll < chance {
            match info.category {
                SizeCategory::Small => {
                    let points = vec![obstacle.position + right * travel, obstacle.position - right * travel];
                    obstacle.behavior.patrol = Some(Patrol::new(points, 1.5 + speed_roll * 1.5));
                }
                SizeCategory::Medium => {
                    obstacle.behavior.oscillate = Some(Oscillate::new(
                        obstacle.position,
                        right * travel,
                        Vec3::splat(1.0 + speed_roll),
                    ));
                }
                SizeCategory::Large => {
                    obstacle.behavior.rotate = Some(Rotate {
                        axis: Vec3::Y,
                        speed: sign * (0.5 + speed_roll),
                    });
                }
                SizeCategory::Special => {}
            }
        }
    }

    if info.destructible {
        obstacle.behavior.damage = Some(DamageState::new(info.strength, false, 0.0, DAMAGE_EFFECT_INTERVAL));
    } else if info.category == SizeCategory::Large && info.strength > 0.0 {
        obstacle.behavior.damage = Some(DamageState::new(
            info.strength,
            true,
            WRECK_RECOVERY_DELAY,
            DAMAGE_EFFECT_INTERVAL,
        ));
    }
}

fn enemy_kind(cfg: &EnemySpawnConfig, difficulty: u8, tier_roll: f32, type_roll: f32) -> EnemyKind {
    if difficulty >= cfg.boss_min_difficulty && tier_roll < cfg.boss_probability {
        EnemyKind::Boss
    } else if difficulty >= cfg.mid_boss_min_difficulty && tier_roll < cfg.boss_probability + cfg.mid_boss_probability {
        EnemyKind::MidBoss
    } else if type_roll < cfg.drone_probability {
        EnemyKind::Drone
    } else {
        EnemyKind::Patroller
    }
}

fn spawn_enemies(segment: &Segment, ctx: &ContentContext, rng: &mut SegmentRng, out: &mut GeneratedContent) {
    let cfg = &ctx.settings.enemies;
    let mult = segment.kind.density_multiplier();
    let (lo, hi) = count_bounds(cfg.min_count, cfg.max_count, mult, ctx.plan.enemy_density * ctx.density_scale);
    let count = rng.range_inclusive(lo, hi);

    let group_roll = rng.unit();
    let group_size = if group_roll < cfg.group_probability && count >= 2 {
        rng.range_inclusive(2, count)
    } else {
        0
    };

    if group_size > 0 {
        let half_band = lateral_half_band(segment.width, cfg.group_radius * 2.0);
        let progress = rng.range(PLACEMENT_PROGRESS_MIN, PLACEMENT_PROGRESS_MAX);
        let lateral = rng.range(-1.0, 1.0) * half_band;
        let base_angle = rng.range(0.0, TAU);
        let lateral_limit = lateral_half_band(segment.width, 0.0);

        // Ring offsets are taken in path space and clamped, so members never leave the band
        for i in 0..group_size {
            let angle = base_angle + TAU * i as f32 / group_size as f32;
            let radius = (cfg.group_radius + rng.range(-cfg.group_jitter, cfg.group_jitter)).max(0.0);
            let member_lateral = (lateral + angle.cos() * radius).clamp(-lateral_limit, lateral_limit);
            let member_progress = (progress + angle.sin() * radius / segment.length.max(1.0))
                .clamp(PLACEMENT_PROGRESS_MIN, PLACEMENT_PROGRESS_MAX);
            let (position, _) = place(segment, member_progress, member_lateral);
            spawn_enemy(segment, ctx, position, member_progress, true, rng, out);
        }
    }

    for _ in group_size..count {
        let progress = rng.range(PLACEMENT_PROGRESS_MIN, PLACEMENT_PROGRESS_MAX);
        let lateral = rng.range(-1.0, 1.0) * lateral_half_band(segment.width, 0.0);
        let (position, _) = place(segment, progress, lateral);
        spawn_enemy(segment, ctx, position, progress, false, rng, out);
    }
}

fn spawn_enemy(
    segment: &Segment,
    ctx: &ContentContext,
    position: Vec3,
    progress: f32,
    grouped: bool,
    rng: &mut SegmentRng,
    out: &mut GeneratedContent,
) {
    let tier_roll = rng.unit();
    let type_roll = rng.unit();
    let kind = enemy_kind(&ctx.settings.enemies, segment.difficulty, tier_roll, type_roll);

    let id = out.next_id();
    let mut enemy = EnemyInstance::new(id, kind, position);
    enemy.grouped = grouped;
    match kind {
        EnemyKind::Drone => {
            enemy.position.y += DRONE_HOVER_HEIGHT;
            enemy.hover = Some(Oscillate::new(enemy.position, Vec3::new(0.0, 0.5, 0.0), Vec3::splat(2.0)));
        }
        EnemyKind::Patroller => {
            let right = segment.right_at(progress);
            let reach = lateral_half_band(segment.width, 0.0);
            let center = segment.point_at(progress);
            enemy.patrol_points = vec![center - right * reach, center + right * reach];
            let mut agent = NavAgent::new(PATROLLER_SPEED);
            agent.set_destination(enemy.patrol_points[0]);
            enemy.agent = Some(agent);
        }
        EnemyKind::MidBoss | EnemyKind::Boss => {}
    }

    out.content.push(id, ContentKind::Enemy);
    out.enemies.push(enemy);
}

fn spawn_collectibles(segment: &Segment, ctx: &ContentContext, rng: &mut SegmentRng, out: &mut GeneratedContent) {
    let cfg = &ctx.settings.collectibles;
    let (lo, hi) = count_bounds(cfg.min_count, cfg.max_count, 1.0, ctx.plan.collectible_density);
    let count = rng.range_inclusive(lo, hi);
    let lane = rng.range(-1.0, 1.0) * lateral_half_band(segment.width, 0.0);

    for i in 0..count {
        let t = (i as f32 + 0.5) / count as f32;
        let progress = crate::lerp(PLACEMENT_PROGRESS_MIN, PLACEMENT_PROGRESS_MAX, t);
        let (mut position, _) = place(segment, progress, lane);
        position.y += COLLECTIBLE_HEIGHT;

        let power_roll = rng.unit();
        let pick = rng.unit();
        let kind = if power_roll < cfg.power_up_probability {
            let index = ((pick * PowerUpKind::ALL.len() as f32) as usize).min(PowerUpKind::ALL.len() - 1);
            CollectibleKind::PowerUp(PowerUpKind::ALL[index])
        } else {
            CollectibleKind::Coin { value: cfg.coin_value }
        };

        let id = out.next_id();
        out.content.push(id, ContentKind::Collectible);
        out.collectibles.push(Collectible {
            id,
            kind,
            position,
            collected: false,
        });
    }
}
