//! Fixed timestep level tick
//!
//! Order within a tick: streaming, generation of newly requested segments,
//! queued hits, enemies, obstacle behaviors. Obstacles only tick while their
//! segment is active; runtime hazards always tick.

use glam::Vec3;

use super::behavior::tick_obstacles;
use super::events::LevelEvent;
use super::navigation::{Navigator, PathState};
use super::state::{EnemyInstance, Level};
use crate::consts::*;
use crate::error::Diagnostic;
use crate::level::ContentId;

/// Input for a single tick
#[derive(Debug, Clone, Default)]
pub struct TickInput {
    /// Player position from the movement collaborator
    pub player_position: Vec3,
    /// Damage to apply this tick: (obstacle, amount)
    pub hits: Vec<(ContentId, f32)>,
}

/// Advance the level by one timestep, returning the events it produced
pub fn tick(level: &mut Level, input: &TickInput, dt: f32) -> Vec<LevelEvent> {
    let mut events = Vec::new();
    if level.is_torn_down() {
        return events;
    }
    level.time_ticks += 1;

    // Streaming
    let update = level.streaming.update(&mut level.segments, input.player_position);
    for &segment in &update.activations {
        log::debug!("Segment {segment} activated");
        events.push(LevelEvent::SegmentActivated { segment });
    }
    for &segment in &update.deactivations {
        log::debug!("Segment {segment} deactivated");
        events.push(LevelEvent::SegmentDeactivated { segment });
    }
    if !update.generation_requests.is_empty() {
        level.generate_segments(&update.generation_requests);
    }

    for &(id, amount) in &input.hits {
        if !level.apply_hit(id, amount) {
            log::debug!("Hit on {id} ignored");
        }
    }

    // Snapshot of active flags taken before any entity moves
    let active: Vec<bool> = level.segments.iter().map(|s| s.active).collect();
    let is_active = |segment: u32| active.get(segment as usize).copied().unwrap_or(false);

    let mut failures = Vec::new();
    for enemy in level.enemies.iter_mut().filter(|e| is_active(e.id.segment)) {
        if tick_enemy(enemy, level.navigator.as_ref(), dt, &mut events) {
            failures.push(enemy.id);
        }
    }
    for id in failures {
        level.record(Diagnostic::NavigationFailed {
            segment: id.segment,
            ordinal: id.ordinal,
        });
    }

    events.extend(tick_obstacles(&mut level.obstacles, dt, |obstacle| {
        is_active(obstacle.id.segment) || obstacle.behavior.lifetime.is_some()
    }));

    events
}

/// Returns true when the enemy's path request failed this tick
fn tick_enemy(enemy: &mut EnemyInstance, navigator: &dyn Navigator, dt: f32, events: &mut Vec<LevelEvent>) -> bool {
    if let Some(hover) = enemy.hover.as_mut() {
        hover.time += dt;
        enemy.position = hover.sample();
    }

    let Some(agent) = enemy.agent.as_mut() else {
        return false;
    };
    if agent.state == PathState::Failed && agent.since_failure >= NAV_RETRY_DELAY {
        agent.retry();
    }
    let before = agent.state;
    match agent.update(enemy.id, &mut enemy.position, navigator, dt, events) {
        PathState::Arrived if !enemy.patrol_points.is_empty() => {
            enemy.patrol_target = (enemy.patrol_target + 1) % enemy.patrol_points.len();
            agent.set_destination(enemy.patrol_points[enemy.patrol_target]);
            false
        }
        PathState::Failed => before != PathState::Failed,
        _ => false,
    }
}
