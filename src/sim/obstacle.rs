//! Obstacle instances and their behavior components
//!
//! An obstacle carries a table of optional behavior components. Per tick the
//! table is resolved into a plain [`Capabilities`] snapshot; at most one motion
//! component drives velocity, chosen by fixed precedence
//! Patrol > Oscillate > Rotate > Phased.

use glam::{Quat, Vec3};
use serde::{Deserialize, Serialize};

use crate::consts::*;
use crate::level::{ContentId, SizeCategory};

/// Walk a closed loop of waypoints
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Patrol {
    pub points: Vec<Vec3>,
    pub current_point_index: usize,
    pub move_speed: f32,
}

impl Patrol {
    pub fn new(points: Vec<Vec3>, move_speed: f32) -> Self {
        Self {
            points,
            current_point_index: 0,
            move_speed,
        }
    }

    pub fn total_points(&self) -> usize {
        self.points.len()
    }

    pub fn current_point(&self) -> Option<Vec3> {
        self.points.get(self.current_point_index).copied()
    }

    /// Move on to the next waypoint (wraps)
    pub fn advance(&mut self) {
        if !self.points.is_empty() {
            self.current_point_index = (self.current_point_index + 1) % self.points.len();
        }
    }
}

/// `center + amplitude * sin(frequency * time)` per axis
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Oscillate {
    pub center: Vec3,
    pub amplitude: Vec3,
    pub frequency: Vec3,
    pub time: f32,
}

impl Oscillate {
    pub fn new(center: Vec3, amplitude: Vec3, frequency: Vec3) -> Self {
        Self {
            center,
            amplitude,
            frequency,
            time: 0.0,
        }
    }

    /// Position at the current time
    pub fn sample(&self) -> Vec3 {
        let phase = self.frequency * self.time;
        self.center + self.amplitude * Vec3::new(phase.x.sin(), phase.y.sin(), phase.z.sin())
    }
}

/// Constant spin about an axis
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rotate {
    pub axis: Vec3,
    /// Radians per second
    pub speed: f32,
}

impl Rotate {
    /// Unit axis, falling back to +Y for a degenerate axis
    pub fn unit_axis(&self) -> Vec3 {
        self.axis.try_normalize().unwrap_or(Vec3::Y)
    }
}

/// Self-destructs after a fixed time
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Lifetime {
    pub remaining: f32,
    pub fade_out_time: f32,
}

impl Lifetime {
    /// 1.0 until the fade window, then `remaining / fade_out_time`
    pub fn fade_ratio(&self) -> f32 {
        if self.fade_out_time > 0.0 && self.remaining < self.fade_out_time {
            (self.remaining / self.fade_out_time).clamp(0.0, 1.0)
        } else {
            1.0
        }
    }
}

/// Stage of a sequenced obstacle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PhaseKind {
    Idle,
    Warning,
    Active,
    Recovery,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Phase {
    pub kind: PhaseKind,
    pub duration: f32,
    pub direction: Vec3,
    pub speed: f32,
}

/// Cyclic sequence of up to [`MAX_PHASES`] phases
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhaseSequence {
    phases: Vec<Phase>,
    pub current: usize,
    pub elapsed: f32,
}

impl PhaseSequence {
    /// Extra phases beyond [`MAX_PHASES`] are dropped
    pub fn new(mut phases: Vec<Phase>) -> Self {
        phases.truncate(MAX_PHASES);
        Self {
            phases,
            current: 0,
            elapsed: 0.0,
        }
    }

    pub fn phases(&self) -> &[Phase] {
        &self.phases
    }

    pub fn current_phase(&self) -> Option<&Phase> {
        self.phases.get(self.current)
    }

    /// Standard Idle -> Warning -> Active -> Recovery cycle
    pub fn standard(idle: f32, warning: f32, active: f32, recovery: f32, direction: Vec3, speed: f32) -> Self {
        let still = |kind, duration| Phase {
            kind,
            duration,
            direction: Vec3::ZERO,
            speed: 0.0,
        };
        Self::new(vec![
            still(PhaseKind::Idle, idle),
            still(PhaseKind::Warning, warning),
            Phase {
                kind: PhaseKind::Active,
                duration: active,
                direction,
                speed,
            },
            still(PhaseKind::Recovery, recovery),
        ])
    }
}

/// Integrity tracking with optional recovery and effect pulses
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DamageState {
    pub integrity: f32,
    pub max_integrity: f32,
    pub can_recover: bool,
    pub recovery_delay: f32,
    /// Seconds since the last hit or destruction
    pub since_damage: f32,
    /// Visual marker 0 (intact) ..= 3 (wrecked)
    pub damage_level: u8,
    /// Seconds between smoke/fire pulses; 0 disables
    pub effect_interval: f32,
    pub effect_timer: f32,
    pub destroyed: bool,
    /// Set when a destructible obstacle is waiting to be removed
    pub removal_timer: Option<f32>,
}

/// Highest damage marker
pub const MAX_DAMAGE_LEVEL: u8 = 3;

impl DamageState {
    pub fn new(max_integrity: f32, can_recover: bool, recovery_delay: f32, effect_interval: f32) -> Self {
        let max_integrity = max_integrity.max(0.0);
        Self {
            integrity: max_integrity,
            max_integrity,
            can_recover,
            recovery_delay: recovery_delay.max(0.0),
            since_damage: 0.0,
            damage_level: 0,
            effect_interval: effect_interval.max(0.0),
            effect_timer: 0.0,
            destroyed: false,
            removal_timer: None,
        }
    }

    /// Fraction of integrity left
    pub fn ratio(&self) -> f32 {
        if self.max_integrity > 0.0 {
            (self.integrity / self.max_integrity).clamp(0.0, 1.0)
        } else {
            0.0
        }
    }

    /// Subtract integrity; ignored once destroyed
    pub fn apply_damage(&mut self, amount: f32) {
        if self.destroyed || !amount.is_finite() || amount <= 0.0 {
            return;
        }
        self.integrity = (self.integrity - amount).max(0.0);
        self.since_damage = 0.0;
        self.refresh_level();
    }

    pub fn refresh_level(&mut self) {
        let ratio = self.ratio();
        self.damage_level = if ratio >= 0.75 {
            0
        } else if ratio >= 0.5 {
            1
        } else if ratio > 0.25 {
            2
        } else {
            MAX_DAMAGE_LEVEL
        };
    }

    /// Restore full integrity
    pub fn repair(&mut self) {
        self.integrity = self.max_integrity;
        self.damage_level = 0;
        self.destroyed = false;
        self.since_damage = 0.0;
        self.effect_timer = 0.0;
    }
}

/// Behavior component table
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Behavior {
    pub patrol: Option<Patrol>,
    pub oscillate: Option<Oscillate>,
    pub rotate: Option<Rotate>,
    pub lifetime: Option<Lifetime>,
    pub phases: Option<PhaseSequence>,
    pub damage: Option<DamageState>,
}

impl Behavior {
    pub fn is_static(&self) -> bool {
        *self == Behavior::default()
    }
}

/// Component that owns velocity this tick
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MotionDriver {
    Patrol,
    Oscillate,
    Rotate,
    Phased,
}

/// Per-tick snapshot of what an obstacle can do
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Capabilities {
    pub driver: Option<MotionDriver>,
    pub temporary: bool,
    pub phased: bool,
    pub damageable: bool,
    pub destructible: bool,
}

impl Capabilities {
    /// Resolve the component table. Motion precedence is
    /// Patrol > Oscillate > Rotate > Phased.
    pub fn resolve(obstacle: &ObstacleInstance) -> Self {
        let b = &obstacle.behavior;
        let driver = if b.patrol.is_some() {
            Some(MotionDriver::Patrol)
        } else if b.oscillate.is_some() {
            Some(MotionDriver::Oscillate)
        } else if b.rotate.is_some() {
            Some(MotionDriver::Rotate)
        } else if b.phases.is_some() {
            Some(MotionDriver::Phased)
        } else {
            None
        };
        Self {
            driver,
            temporary: b.lifetime.is_some(),
            phased: b.phases.is_some(),
            damageable: b.damage.is_some(),
            destructible: obstacle.destructible,
        }
    }
}

/// A spawned obstacle
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObstacleInstance {
    pub id: ContentId,
    pub code: String,
    pub category: SizeCategory,
    pub collision_radius: f32,
    pub destructible: bool,
    pub strength: f32,
    pub position: Vec3,
    pub rotation: Quat,
    pub velocity: Vec3,
    pub angular_velocity: Vec3,
    pub behavior: Behavior,
}

impl ObstacleInstance {
    pub fn new(id: ContentId, code: impl Into<String>, category: SizeCategory, position: Vec3) -> Self {
        Self {
            id,
            code: code.into(),
            category,
            collision_radius: 0.5,
            destructible: false,
            strength: 0.0,
            position,
            rotation: Quat::IDENTITY,
            velocity: Vec3::ZERO,
            angular_velocity: Vec3::ZERO,
            behavior: Behavior::default(),
        }
    }

    /// Opacity hint for renderers (1.0 unless fading out)
    pub fn fade_ratio(&self) -> f32 {
        self.behavior.lifetime.as_ref().map_or(1.0, Lifetime::fade_ratio)
    }

    pub fn is_destroyed(&self) -> bool {
        self.behavior.damage.as_ref().is_some_and(|d| d.destroyed)
    }

    /// Apply a hit; obstacles without a damage state shrug it off
    pub fn apply_damage(&mut self, amount: f32) -> bool {
        match self.behavior.damage.as_mut() {
            Some(damage) => {
                damage.apply_damage(amount);
                true
            }
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn obstacle() -> ObstacleInstance {
        ObstacleInstance::new(ContentId::new(0, 0), "crate", SizeCategory::Small, Vec3::ZERO)
    }

    #[test]
    fn test_precedence_patrol_over_oscillate_over_rotate() {
        let mut ob = obstacle();
        ob.behavior.rotate = Some(Rotate { axis: Vec3::Y, speed: 1.0 });
        assert_eq!(Capabilities::resolve(&ob).driver, Some(MotionDriver::Rotate));

        ob.behavior.oscillate = Some(Oscillate::new(Vec3::ZERO, Vec3::X, Vec3::ONE));
        assert_eq!(Capabilities::resolve(&ob).driver, Some(MotionDriver::Oscillate));

        ob.behavior.patrol = Some(Patrol::new(vec![Vec3::X], 1.0));
        assert_eq!(Capabilities::resolve(&ob).driver, Some(MotionDriver::Patrol));

        ob.behavior.phases = Some(PhaseSequence::standard(1.0, 1.0, 1.0, 1.0, Vec3::X, 1.0));
        let caps = Capabilities::resolve(&ob);
        assert_eq!(caps.driver, Some(MotionDriver::Patrol));
        assert!(caps.phased);
    }

    #[test]
    fn test_phase_sequence_is_capped() {
        let phase = Phase {
            kind: PhaseKind::Idle,
            duration: 1.0,
            direction: Vec3::ZERO,
            speed: 0.0,
        };
        let seq = PhaseSequence::new(vec![phase; 6]);
        assert_eq!(seq.phases().len(), MAX_PHASES);
    }

    #[test]
    fn test_damage_levels() {
        let mut damage = DamageState::new(100.0, false, 0.0, 0.0);
        damage.apply_damage(30.0);
        assert_eq!(damage.damage_level, 1);
        damage.apply_damage(30.0);
        assert_eq!(damage.damage_level, 2);
        damage.apply_damage(100.0);
        assert_eq!(damage.integrity, 0.0);
        assert_eq!(damage.damage_level, MAX_DAMAGE_LEVEL);
        damage.repair();
        assert_eq!(damage.integrity, 100.0);
        assert_eq!(damage.damage_level, 0);
    }

    #[test]
    fn test_fade_ratio() {
        let lifetime = Lifetime {
            remaining: 0.5,
            fade_out_time: 1.0,
        };
        assert!((lifetime.fade_ratio() - 0.5).abs() < 1e-6);
        let fresh = Lifetime {
            remaining: 4.0,
            fade_out_time: 1.0,
        };
        assert_eq!(fresh.fade_ratio(), 1.0);
    }
}
