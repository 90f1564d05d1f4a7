//! Deterministic level simulation
//!
//! Everything that evolves tick by tick lives here:
//! - Fixed timestep only
//! - No shared RNG (spawn-time draws come from derived seeds)
//! - Stable output order (by content id) even when work runs in parallel

pub mod behavior;
pub mod events;
pub mod navigation;
pub mod obstacle;
pub mod state;
pub mod tick;

pub use behavior::{ObstacleFate, tick_obstacle, tick_obstacles};
pub use events::{DestroyCause, EffectKind, LevelEvent};
pub use navigation::{DirectNavigator, NavAgent, Navigator, PathQuery, PathState};
pub use obstacle::{
    Behavior, Capabilities, DamageState, Lifetime, MotionDriver, ObstacleInstance, Oscillate, Patrol, Phase,
    PhaseKind, PhaseSequence, Rotate,
};
pub use state::{Collectible, CollectibleKind, EnemyInstance, EnemyKind, Level, LevelSummary, PowerUpKind};
pub use tick::{TickInput, tick};
