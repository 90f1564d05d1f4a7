//! Per-tick obstacle behavior
//!
//! Each obstacle is advanced independently from its own state, so the batch
//! runs in parallel. Events and removals are collected per obstacle and merged
//! in obstacle order afterwards.

use glam::{Quat, Vec3};
use rayon::prelude::*;

use super::events::{DestroyCause, EffectKind, LevelEvent};
use super::obstacle::{Capabilities, DamageState, MotionDriver, ObstacleInstance, PhaseKind, PhaseSequence};
use crate::consts::*;
use crate::level::ContentId;

/// Tolerance for timer comparisons against accumulated dt
const TIMER_EPSILON: f32 = 1e-4;

/// Whether an obstacle survives the tick
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObstacleFate {
    Keep,
    Remove,
}

/// Advance one obstacle by `dt`, pushing any lifecycle events
pub fn tick_obstacle(obstacle: &mut ObstacleInstance, dt: f32, events: &mut Vec<LevelEvent>) -> ObstacleFate {
    let caps = Capabilities::resolve(obstacle);
    let id = obstacle.id;
    let position = obstacle.position;

    if caps.damageable {
        if let Some(damage) = obstacle.behavior.damage.as_mut() {
            if update_damage(id, position, caps.destructible, damage, dt, events) == ObstacleFate::Remove {
                return ObstacleFate::Remove;
            }
        }
    }

    if caps.temporary {
        if let Some(lifetime) = obstacle.behavior.lifetime.as_mut() {
            lifetime.remaining -= dt;
            if lifetime.remaining <= 0.0 {
                lifetime.remaining = 0.0;
                events.push(LevelEvent::ObstacleDestroyed {
                    id,
                    position,
                    cause: DestroyCause::Expired,
                });
                return ObstacleFate::Remove;
            }
        }
    }

    if caps.phased {
        if let Some(seq) = obstacle.behavior.phases.as_mut() {
            advance_phases(id, seq, dt, events);
        }
    }

    if obstacle.is_destroyed() {
        obstacle.velocity = Vec3::ZERO;
        obstacle.angular_velocity = Vec3::ZERO;
        return ObstacleFate::Keep;
    }

    drive_motion(obstacle, caps.driver, dt);
    ObstacleFate::Keep
}

/// Advance every obstacle for which `should_tick` holds, in parallel.
/// Obstacles that finish their lifecycle are removed; events come back in
/// obstacle order.
pub fn tick_obstacles<F>(obstacles: &mut Vec<ObstacleInstance>, dt: f32, should_tick: F) -> Vec<LevelEvent>
where
    F: Fn(&ObstacleInstance) -> bool + Sync,
{
    let results: Vec<(Vec<LevelEvent>, ObstacleFate)> = obstacles
        .par_iter_mut()
        .map(|obstacle| {
            let mut events = Vec::new();
            if !should_tick(obstacle) {
                return (events, ObstacleFate::Keep);
            }
            let fate = tick_obstacle(obstacle, dt, &mut events);
            (events, fate)
        })
        .collect();

    let mut events = Vec::new();
    let mut fates = Vec::with_capacity(results.len());
    for (obstacle_events, fate) in results {
        events.extend(obstacle_events);
        fates.push(fate);
    }

    let mut fate_iter = fates.into_iter();
    obstacles.retain(|_| fate_iter.next() != Some(ObstacleFate::Remove));
    events
}

fn advance_phases(id: ContentId, seq: &mut PhaseSequence, dt: f32, events: &mut Vec<LevelEvent>) {
    let count = seq.phases().len();
    if count == 0 {
        return;
    }
    seq.elapsed += dt.max(0.0);

    // At most one full cycle per tick
    for _ in 0..count {
        let duration = seq.phases()[seq.current].duration.max(MIN_PHASE_DURATION);
        if seq.elapsed < duration {
            break;
        }
        seq.elapsed -= duration;
        let from = seq.phases()[seq.current].kind;
        seq.current = (seq.current + 1) % count;
        let to = seq.phases()[seq.current].kind;
        events.push(LevelEvent::ObstaclePhaseChanged { id, from, to });
    }
}

fn update_damage(
    id: ContentId,
    position: Vec3,
    destructible: bool,
    damage: &mut DamageState,
    dt: f32,
    events: &mut Vec<LevelEvent>,
) -> ObstacleFate {
    if let Some(timer) = damage.removal_timer.as_mut() {
        *timer -= dt;
        return if *timer <= TIMER_EPSILON {
            ObstacleFate::Remove
        } else {
            ObstacleFate::Keep
        };
    }

    if damage.integrity <= 0.0 && !damage.destroyed {
        damage.integrity = 0.0;
        damage.destroyed = true;
        damage.since_damage = 0.0;
        damage.refresh_level();
        events.push(LevelEvent::ObstacleDestroyed {
            id,
            position,
            cause: DestroyCause::Integrity,
        });
        // Destructible obstacles linger for the destruction animation and
        // never recover; the rest keep a wrecked marker until repaired.
        if destructible {
            damage.removal_timer = Some(DESTROY_REMOVAL_DELAY);
        }
        return ObstacleFate::Keep;
    }

    let damaged = damage.integrity < damage.max_integrity;
    if damaged && damage.can_recover {
        damage.since_damage += dt;
        if damage.since_damage >= damage.recovery_delay - TIMER_EPSILON {
            damage.repair();
            events.push(LevelEvent::ObstacleRepaired { id });
            return ObstacleFate::Keep;
        }
    }

    if damaged && !damage.destroyed && damage.effect_interval > 0.0 {
        damage.effect_timer += dt;
        if damage.effect_timer >= damage.effect_interval {
            damage.effect_timer -= damage.effect_interval;
            let effect = if damage.damage_level >= 2 {
                EffectKind::Fire
            } else {
                EffectKind::Smoke
            };
            events.push(LevelEvent::ObstacleDamageEffect { id, effect, position });
        }
    }

    ObstacleFate::Keep
}

fn drive_motion(obstacle: &mut ObstacleInstance, driver: Option<MotionDriver>, dt: f32) {
    if driver != Some(MotionDriver::Rotate) {
        obstacle.angular_velocity = Vec3::ZERO;
    }

    match driver {
        Some(MotionDriver::Patrol) => {
            let Some(patrol) = obstacle.behavior.patrol.as_mut() else {
                return;
            };
            let Some(target) = patrol.current_point() else {
                obstacle.velocity = Vec3::ZERO;
                return;
            };
            let to_target = target - obstacle.position;
            let distance = to_target.length();
            if distance > f32::EPSILON {
                let dir = to_target / distance;
                let step = (patrol.move_speed.max(0.0) * dt).min(distance);
                obstacle.position += dir * step;
                obstacle.velocity = dir * patrol.move_speed.max(0.0);
            } else {
                obstacle.velocity = Vec3::ZERO;
            }
            if obstacle.position.distance(target) < PATROL_ARRIVAL_DISTANCE {
                patrol.advance();
            }
        }
        Some(MotionDriver::Oscillate) => {
            let Some(osc) = obstacle.behavior.oscillate.as_mut() else {
                return;
            };
            let old = obstacle.position;
            osc.time += dt;
            let new = osc.sample();
            obstacle.position = new;
            obstacle.velocity = if dt > 0.0 { (new - old) / dt } else { Vec3::ZERO };
        }
        Some(MotionDriver::Rotate) => {
            let Some(rotate) = obstacle.behavior.rotate.as_ref() else {
                return;
            };
            let axis = rotate.unit_axis();
            obstacle.rotation = (Quat::from_axis_angle(axis, rotate.speed * dt) * obstacle.rotation).normalize();
            obstacle.angular_velocity = axis * rotate.speed;
            obstacle.velocity = Vec3::ZERO;
        }
        Some(MotionDriver::Phased) => {
            let velocity = obstacle
                .behavior
                .phases
                .as_ref()
                .and_then(|seq| seq.current_phase())
                .filter(|phase| phase.kind == PhaseKind::Active)
                .map_or(Vec3::ZERO, |phase| phase.direction.normalize_or_zero() * phase.speed);
            obstacle.velocity = velocity;
            obstacle.position += velocity * dt;
        }
        None => {
            obstacle.velocity = Vec3::ZERO;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::level::SizeCategory;
    use crate::sim::obstacle::{Lifetime, Oscillate, Patrol, Rotate};

    fn obstacle() -> ObstacleInstance {
        ObstacleInstance::new(ContentId::new(1, 0), "crate", SizeCategory::Small, Vec3::ZERO)
    }

    fn run(ob: &mut ObstacleInstance, ticks: usize, dt: f32) -> (Vec<(usize, LevelEvent)>, Option<usize>) {
        let mut log = Vec::new();
        for i in 0..ticks {
            let mut events = Vec::new();
            let fate = tick_obstacle(ob, dt, &mut events);
            log.extend(events.into_iter().map(|e| (i, e)));
            if fate == ObstacleFate::Remove {
                return (log, Some(i));
            }
        }
        (log, None)
    }

    #[test]
    fn test_patrol_reaches_and_cycles_points() {
        let mut ob = obstacle();
        ob.behavior.patrol = Some(Patrol::new(vec![Vec3::new(2.0, 0.0, 0.0), Vec3::ZERO], 4.0));
        run(&mut ob, 30, 0.1);
        let patrol = ob.behavior.patrol.as_ref().unwrap();
        // 4 m/s for 3 s over a 2 m leg: several round trips
        assert!(patrol.current_point_index < patrol.total_points());
        assert!(ob.position.x >= -1e-4 && ob.position.x <= 2.0 + 1e-4);
    }

    #[test]
    fn test_patrol_advances_on_arrival() {
        let mut ob = obstacle();
        ob.behavior.patrol = Some(Patrol::new(vec![Vec3::new(1.0, 0.0, 0.0), Vec3::new(5.0, 0.0, 0.0)], 10.0));
        let mut events = Vec::new();
        tick_obstacle(&mut ob, 0.5, &mut events);
        assert_eq!(ob.position, Vec3::new(1.0, 0.0, 0.0));
        assert_eq!(ob.behavior.patrol.as_ref().unwrap().current_point_index, 1);
        assert!(events.is_empty());
    }

    #[test]
    fn test_oscillate_velocity_is_finite_difference() {
        let mut ob = obstacle();
        ob.behavior.oscillate = Some(Oscillate::new(Vec3::ZERO, Vec3::new(2.0, 0.0, 0.0), Vec3::splat(1.5)));
        let dt = 0.05;
        let mut events = Vec::new();
        for _ in 0..10 {
            let before = ob.position;
            tick_obstacle(&mut ob, dt, &mut events);
            let expected = (ob.position - before) / dt;
            assert!((ob.velocity - expected).length() < 1e-4);
            assert!(ob.position.x.abs() <= 2.0 + 1e-5);
        }
    }

    #[test]
    fn test_rotate_compounds_orientation() {
        let mut ob = obstacle();
        ob.behavior.rotate = Some(Rotate {
            axis: Vec3::Y,
            speed: std::f32::consts::FRAC_PI_2,
        });
        run(&mut ob, 10, 0.1);
        let forward = ob.rotation * Vec3::Z;
        // 90 degrees about +Y turns +Z into +X
        assert!((forward - Vec3::X).length() < 1e-3);
        assert_eq!(ob.angular_velocity, Vec3::Y * std::f32::consts::FRAC_PI_2);
    }

    #[test]
    fn test_only_highest_precedence_drives_velocity() {
        let mut ob = obstacle();
        ob.behavior.patrol = Some(Patrol::new(vec![Vec3::new(0.0, 0.0, 10.0)], 2.0));
        ob.behavior.oscillate = Some(Oscillate::new(Vec3::ZERO, Vec3::new(5.0, 0.0, 0.0), Vec3::ONE));
        ob.behavior.rotate = Some(Rotate { axis: Vec3::Y, speed: 3.0 });
        let mut events = Vec::new();
        tick_obstacle(&mut ob, 0.5, &mut events);
        assert_eq!(ob.velocity, Vec3::new(0.0, 0.0, 2.0));
        assert_eq!(ob.position, Vec3::new(0.0, 0.0, 1.0));
        assert_eq!(ob.angular_velocity, Vec3::ZERO);
        assert_eq!(ob.rotation, Quat::IDENTITY);
    }

    #[test]
    fn test_lifetime_fades_then_expires() {
        let mut ob = obstacle();
        ob.behavior.lifetime = Some(Lifetime {
            remaining: 1.0,
            fade_out_time: 0.5,
        });
        let (events, removed) = run(&mut ob, 3, 0.25);
        assert!(events.is_empty());
        assert!(removed.is_none());
        assert!((ob.fade_ratio() - 0.5).abs() < 1e-6);

        let (events, removed) = run(&mut ob, 3, 0.25);
        assert_eq!(removed, Some(0));
        assert!(matches!(
            events[..],
            [(0, LevelEvent::ObstacleDestroyed { cause: DestroyCause::Expired, .. })]
        ));
    }

    #[test]
    fn test_phases_cycle_and_drive_velocity() {
        let mut ob = obstacle();
        ob.behavior.phases = Some(PhaseSequence::standard(0.5, 0.5, 0.5, 0.5, Vec3::X, 4.0));
        let (events, _) = run(&mut ob, 1, 0.25);
        assert!(events.is_empty());
        assert_eq!(ob.velocity, Vec3::ZERO);

        // Idle -> Warning -> Active
        let (events, _) = run(&mut ob, 4, 0.25);
        let changes: Vec<_> = events
            .iter()
            .filter_map(|(_, e)| match e {
                LevelEvent::ObstaclePhaseChanged { from, to, .. } => Some((*from, *to)),
                _ => None,
            })
            .collect();
        assert_eq!(
            changes,
            vec![(PhaseKind::Idle, PhaseKind::Warning), (PhaseKind::Warning, PhaseKind::Active)]
        );
        assert_eq!(ob.velocity, Vec3::new(4.0, 0.0, 0.0));

        // Active -> Recovery zeroes velocity
        run(&mut ob, 2, 0.25);
        assert_eq!(ob.behavior.phases.as_ref().unwrap().current_phase().unwrap().kind, PhaseKind::Recovery);
        assert_eq!(ob.velocity, Vec3::ZERO);
    }

    #[test]
    fn test_zero_duration_phases_terminate() {
        let mut ob = obstacle();
        ob.behavior.phases = Some(PhaseSequence::standard(0.0, 0.0, 0.0, 0.0, Vec3::X, 1.0));
        let mut events = Vec::new();
        tick_obstacle(&mut ob, 10.0, &mut events);
        assert_eq!(events.len(), 4);
    }

    #[test]
    fn test_destroyed_then_repaired_once() {
        let mut ob = obstacle();
        let mut damage = DamageState::new(100.0, true, 2.0, 0.0);
        damage.integrity = 0.0;
        ob.behavior.damage = Some(damage);

        let (events, removed) = run(&mut ob, 20, 0.25);
        assert!(removed.is_none());
        assert_eq!(events.len(), 2);
        assert!(matches!(events[0], (0, LevelEvent::ObstacleDestroyed { cause: DestroyCause::Integrity, .. })));
        // 8 ticks of 0.25 s after the destruction tick
        assert!(matches!(events[1], (8, LevelEvent::ObstacleRepaired { .. })));
        assert_eq!(ob.behavior.damage.as_ref().unwrap().integrity, 100.0);
    }

    #[test]
    fn test_destructible_is_removed_after_delay() {
        let mut ob = obstacle();
        ob.destructible = true;
        ob.behavior.damage = Some(DamageState::new(10.0, true, 0.5, 0.0));
        ob.apply_damage(50.0);

        let (events, removed) = run(&mut ob, 40, 0.1);
        assert_eq!(events.len(), 1);
        assert!(matches!(events[0].1, LevelEvent::ObstacleDestroyed { .. }));
        // Removal 2.0 s after the destruction tick
        assert_eq!(removed, Some(20));
    }

    #[test]
    fn test_damage_effects_pulse() {
        let mut ob = obstacle();
        ob.behavior.damage = Some(DamageState::new(100.0, false, 0.0, 0.5));
        ob.apply_damage(80.0);
        let (events, _) = run(&mut ob, 4, 0.25);
        let fires = events
            .iter()
            .filter(|(_, e)| matches!(e, LevelEvent::ObstacleDamageEffect { effect: EffectKind::Fire, .. }))
            .count();
        assert_eq!(fires, 2);
    }

    #[test]
    fn test_batch_removes_and_preserves_order() {
        let mut a = obstacle();
        a.behavior.lifetime = Some(Lifetime {
            remaining: 0.1,
            fade_out_time: 0.0,
        });
        let mut b = obstacle();
        b.id = ContentId::new(1, 1);
        let mut c = obstacle();
        c.id = ContentId::new(1, 2);
        c.behavior.lifetime = Some(Lifetime {
            remaining: 0.1,
            fade_out_time: 0.0,
        });
        let mut obstacles = vec![a, b, c];
        let events = tick_obstacles(&mut obstacles, 0.2, |_| true);
        let ids: Vec<_> = events.iter().filter_map(LevelEvent::obstacle).collect();
        assert_eq!(ids, vec![ContentId::new(1, 0), ContentId::new(1, 2)]);
        assert_eq!(obstacles.len(), 1);
        assert_eq!(obstacles[0].id, ContentId::new(1, 1));
    }

    #[test]
    fn test_batch_skips_filtered() {
        let mut ob = obstacle();
        ob.behavior.lifetime = Some(Lifetime {
            remaining: 0.1,
            fade_out_time: 0.0,
        });
        let mut obstacles = vec![ob];
        let events = tick_obstacles(&mut obstacles, 1.0, |_| false);
        assert!(events.is_empty());
        assert_eq!(obstacles.len(), 1);
    }
}
