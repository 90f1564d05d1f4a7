//! Navigation agents
//!
//! Pathfinding itself is an external capability behind [`Navigator`]. An agent
//! only asks for a path, follows the returned waypoints and reports arrival.
//! A failed query leaves the agent where it is until [`NavAgent::retry`].

use glam::Vec3;
use serde::{Deserialize, Serialize};

use super::events::LevelEvent;
use crate::consts::*;
use crate::level::ContentId;

/// Outcome of a path request
#[derive(Debug, Clone, PartialEq)]
pub enum PathQuery {
    /// Ordered waypoints ending at the destination
    Ready(Vec<Vec3>),
    Failed,
    /// Still working; ask again next tick
    Calculating,
}

/// Opaque "compute a path between two points" capability
pub trait Navigator: Send + Sync {
    fn compute_path(&self, from: Vec3, to: Vec3) -> PathQuery;
}

/// Straight-line navigator for open paths
#[derive(Debug, Clone, Copy, Default)]
pub struct DirectNavigator;

impl Navigator for DirectNavigator {
    fn compute_path(&self, from: Vec3, to: Vec3) -> PathQuery {
        if !from.is_finite() || !to.is_finite() {
            return PathQuery::Failed;
        }
        PathQuery::Ready(vec![to])
    }
}

/// Path-following state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PathState {
    Idle,
    Calculating,
    Following,
    Arrived,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NavAgent {
    pub state: PathState,
    pub destination: Option<Vec3>,
    pub waypoints: Vec<Vec3>,
    pub waypoint_index: usize,
    pub speed: f32,
    /// Seconds spent in [`PathState::Failed`]
    pub since_failure: f32,
}

impl NavAgent {
    pub fn new(speed: f32) -> Self {
        Self {
            state: PathState::Idle,
            destination: None,
            waypoints: Vec::new(),
            waypoint_index: 0,
            speed: speed.max(0.0),
            since_failure: 0.0,
        }
    }

    /// Request a path to `destination`; resolved on the next update
    pub fn set_destination(&mut self, destination: Vec3) {
        self.destination = Some(destination);
        self.waypoints.clear();
        self.waypoint_index = 0;
        self.since_failure = 0.0;
        self.state = PathState::Calculating;
    }

    /// Re-request the last destination after a failure
    pub fn retry(&mut self) -> bool {
        match (self.state, self.destination) {
            (PathState::Failed, Some(destination)) => {
                self.set_destination(destination);
                true
            }
            _ => false,
        }
    }

    /// Advance the agent by `dt`, moving `position` along the path.
    /// Returns the state after the update.
    pub fn update(
        &mut self,
        agent: ContentId,
        position: &mut Vec3,
        navigator: &dyn Navigator,
        dt: f32,
        events: &mut Vec<LevelEvent>,
    ) -> PathState {
        match self.state {
            PathState::Calculating => {
                let Some(destination) = self.destination else {
                    self.state = PathState::Idle;
                    return self.state;
                };
                match navigator.compute_path(*position, destination) {
                    PathQuery::Ready(waypoints) => {
                        self.waypoints = waypoints;
                        self.waypoint_index = 0;
                        self.state = PathState::Following;
                    }
                    PathQuery::Failed => {
                        self.state = PathState::Failed;
                        self.since_failure = 0.0;
                    }
                    PathQuery::Calculating => {}
                }
            }
            PathState::Following => self.follow(agent, position, dt, events),
            PathState::Failed => self.since_failure += dt,
            PathState::Idle | PathState::Arrived => {}
        }
        self.state
    }

    fn follow(&mut self, agent: ContentId, position: &mut Vec3, dt: f32, events: &mut Vec<LevelEvent>) {
        let mut budget = self.speed * dt.max(0.0);
        while let Some(&target) = self.waypoints.get(self.waypoint_index) {
            let to_target = target - *position;
            let distance = to_target.length();
            if distance <= budget {
                *position = target;
                budget -= distance;
                self.waypoint_index += 1;
                continue;
            }
            *position += to_target / distance * budget;
            if position.distance(target) < PATROL_ARRIVAL_DISTANCE {
                self.waypoint_index += 1;
                continue;
            }
            return;
        }
        self.state = PathState::Arrived;
        events.push(LevelEvent::DestinationReached {
            agent,
            position: *position,
        });
    }
}
