//! Forward obstacle sensor
//!
//! A single sphere cast along an agent's forward axis over the world's
//! obstacle surfaces. Returns at most one result: whichever qualifying
//! surface is nearest. No aggregation of multiple obstacles.

use ordered_float::OrderedFloat;

use crate::simulation::types::{
    AgentId, Classification, PedestrianId, Position, SemaphoreId,
};

/// What a sensor hit refers back to, so rule evaluation can read the
/// detected entity's state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObstacleRef {
    Agent(AgentId),
    Pedestrian(PedestrianId),
    Player,
    Semaphore(SemaphoreId),
    /// Unclassified scenery
    Static,
}

/// A sphere-shaped obstacle surface the sensor can intersect
#[derive(Debug, Clone, Copy)]
pub struct ObstacleSurface {
    pub classification: Classification,
    pub center: Position,
    pub radius: f32,
    pub target: ObstacleRef,
}

/// Result of a forward cast
#[derive(Debug, Clone, Copy)]
pub struct SensorHit {
    pub classification: Classification,
    pub distance: f32,
    pub target: ObstacleRef,
}

/// Distance along a ray at which a sphere of `radius` swept along it first
/// touches `surface`. `None` when there is no contact within `max_distance`.
fn sweep_distance(
    origin: &Position,
    heading: &Position,
    radius: f32,
    max_distance: f32,
    surface: &ObstacleSurface,
) -> Option<f32> {
    let to_center = Position::new(
        surface.center.x - origin.x,
        surface.center.y - origin.y,
        surface.center.z - origin.z,
    );
    let combined = radius + surface.radius;

    // Project the centre onto the cast axis
    let along = to_center.dot(heading);
    if along < 0.0 {
        return None;
    }

    let closest_sq = to_center.dot(&to_center) - along * along;
    let combined_sq = combined * combined;
    if closest_sq > combined_sq {
        return None;
    }

    let t = along - (combined_sq - closest_sq).sqrt();
    let t = t.max(0.0);
    (t <= max_distance).then_some(t)
}

/// Cast a sphere of `radius` from `origin` along `heading` up to
/// `max_distance`, returning the nearest intersecting surface.
pub fn cast(
    origin: &Position,
    heading: &Position,
    radius: f32,
    max_distance: f32,
    obstacles: &[ObstacleSurface],
) -> Option<SensorHit> {
    obstacles
        .iter()
        .filter_map(|surface| {
            sweep_distance(origin, heading, radius, max_distance, surface).map(|distance| {
                SensorHit {
                    classification: surface.classification,
                    distance,
                    target: surface.target,
                }
            })
        })
        .min_by_key(|hit| OrderedFloat(hit.distance))
}
