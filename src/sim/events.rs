//! Events emitted by the simulation
//!
//! Small immutable records for rendering/audio/UI collaborators. The core's
//! responsibility ends once an event is pushed.

use glam::Vec3;
use serde::{Deserialize, Serialize};

use super::obstacle::PhaseKind;
use crate::level::ContentId;

/// Why an obstacle was destroyed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DestroyCause {
    /// Integrity reached zero
    Integrity,
    /// Temporary obstacle ran out of lifetime
    Expired,
}

/// Visual pulse emitted by damaged obstacles
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EffectKind {
    Smoke,
    Fire,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum LevelEvent {
    SegmentActivated {
        segment: u32,
    },
    SegmentDeactivated {
        segment: u32,
    },
    DestinationReached {
        agent: ContentId,
        position: Vec3,
    },
    ObstacleDestroyed {
        id: ContentId,
        position: Vec3,
        cause: DestroyCause,
    },
    ObstacleRepaired {
        id: ContentId,
    },
    ObstaclePhaseChanged {
        id: ContentId,
        from: PhaseKind,
        to: PhaseKind,
    },
    ObstacleDamageEffect {
        id: ContentId,
        effect: EffectKind,
        position: Vec3,
    },
}

impl LevelEvent {
    /// Obstacle the event refers to, if any
    pub fn obstacle(&self) -> Option<ContentId> {
        match self {
            LevelEvent::ObstacleDestroyed { id, .. }
            | LevelEvent::ObstacleRepaired { id }
            | LevelEvent::ObstaclePhaseChanged { id, .. }
            | LevelEvent::ObstacleDamageEffect { id, .. } => Some(*id),
            _ => None,
        }
    }
}
