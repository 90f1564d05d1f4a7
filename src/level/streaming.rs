//! Proximity streaming with hysteresis
//!
//! A segment activates when the player comes within the activation distance
//! of its start and deactivates only once the player is farther than the
//! (strictly larger) deactivation distance. Active segments that have no
//! content yet are requested for generation exactly once.

use std::collections::BTreeSet;

use glam::Vec3;
use rayon::prelude::*;

use super::segment::Segment;
use crate::consts::*;
use crate::settings::StreamingConfig;

/// Result of one [`StreamingManager::update`]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StreamingUpdate {
    pub activations: Vec<u32>,
    pub deactivations: Vec<u32>,
    /// Segments that need content, each requested once until completed or reset
    pub generation_requests: Vec<u32>,
}

impl StreamingUpdate {
    pub fn is_empty(&self) -> bool {
        self.activations.is_empty() && self.deactivations.is_empty() && self.generation_requests.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Transition {
    Activated,
    Deactivated,
}

#[derive(Debug, Clone)]
pub struct StreamingManager {
    activation_distance: f32,
    deactivation_distance: f32,
    /// Requested but not yet completed
    pending: BTreeSet<u32>,
    torn_down: bool,
}

impl StreamingManager {
    /// The band is widened to at least [`MIN_HYSTERESIS_BAND`] if the config
    /// is too narrow.
    pub fn new(config: &StreamingConfig) -> Self {
        let activation_distance = crate::finite_or(config.activation_distance, ACTIVATION_DISTANCE).max(0.0);
        let deactivation_distance = crate::finite_or(config.deactivation_distance, DEACTIVATION_DISTANCE)
            .max(activation_distance + MIN_HYSTERESIS_BAND);
        Self {
            activation_distance,
            deactivation_distance,
            pending: BTreeSet::new(),
            torn_down: false,
        }
    }

    pub fn activation_distance(&self) -> f32 {
        self.activation_distance
    }

    pub fn deactivation_distance(&self) -> f32 {
        self.deactivation_distance
    }

    pub fn is_torn_down(&self) -> bool {
        self.torn_down
    }

    pub fn is_pending(&self, segment: u32) -> bool {
        self.pending.contains(&segment)
    }

    /// Flip active flags from the player position and collect generation
    /// requests. Each segment is visited by exactly one worker.
    pub fn update(&mut self, segments: &mut [Segment], player_position: Vec3) -> StreamingUpdate {
        let mut update = StreamingUpdate::default();
        if self.torn_down {
            return update;
        }

        let (activate, deactivate) = (self.activation_distance, self.deactivation_distance);
        let transitions: Vec<(u32, Transition)> = segments
            .par_iter_mut()
            .filter_map(|segment| {
                let distance = player_position.distance(segment.start.position);
                if !segment.active && distance < activate {
                    segment.active = true;
                    Some((segment.index, Transition::Activated))
                } else if segment.active && distance > deactivate {
                    segment.active = false;
                    Some((segment.index, Transition::Deactivated))
                } else {
                    None
                }
            })
            .collect();

        for (index, transition) in transitions {
            match transition {
                Transition::Activated => update.activations.push(index),
                Transition::Deactivated => update.deactivations.push(index),
            }
        }

        for segment in segments.iter().filter(|s| s.active && !s.generated) {
            if self.pending.insert(segment.index) {
                update.generation_requests.push(segment.index);
            }
        }
        update
    }

    /// Generation for `segment` finished (or was abandoned)
    pub fn complete(&mut self, segment: u32) {
        self.pending.remove(&segment);
    }

    /// Allow a segment to be generated again
    pub fn reset_segment(&mut self, segment: &mut Segment) {
        segment.generated = false;
        self.pending.remove(&segment.index);
    }

    /// Stop all activation and generation requests
    pub fn teardown(&mut self) {
        self.torn_down = true;
        self.pending.clear();
    }
}
