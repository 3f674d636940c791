//! Speed decision policy
//!
//! Pure, stateless mapping from a forward detection to a target speed and a
//! hard-stop flag. Rules that leave a field alone carry the caller's current
//! value through, so "remain stopped" composes across ticks.

use crate::simulation::types::{DISTANCE_TO_BICYCLE, DISTANCE_TO_PEDESTRIAN};

/// State of a detected peer agent relevant to the car/bicycle rules
#[derive(Debug, Clone, Copy)]
pub struct PeerState {
    pub velocity_magnitude: f32,
    pub temporarily_stopped: bool,
}

/// Go/flicker state of a detected semaphore
#[derive(Debug, Clone, Copy)]
pub struct SemaphoreView {
    pub can_go: bool,
    pub flickering: bool,
}

/// A classified forward detection, with the detected entity's relevant state
/// resolved by the caller. Peers on a different path are reported as `None`
/// by the caller (no rule fires for them).
#[derive(Debug, Clone, Copy)]
pub enum DetectedObstacle {
    Car { distance: f32, peer: PeerState },
    Bicycle { distance: f32, peer: PeerState },
    PedestrianOrPlayer { distance: f32 },
    Semaphore { distance: f32, view: SemaphoreView },
    None,
}

/// Contextual inputs of the deciding agent
#[derive(Debug, Clone, Copy)]
pub struct PolicyInputs {
    /// Free-run speed the agent resumes to
    pub start_speed: f32,
    /// The agent's own instantaneous velocity magnitude
    pub own_velocity_magnitude: f32,
    /// Current stop flag, carried through when no rule overrides it
    pub currently_stopped: bool,
    /// Current target speed, carried through when no rule overrides it
    pub current_target_speed: f32,
    /// Whether the agent is already past the semaphore stop line
    pub inside_semaphore: bool,
    /// Braking distance for a car ahead
    pub car_threshold: f32,
    /// Stop-line distance for a semaphore ahead
    pub semaphore_threshold: f32,
}

/// Immutable decision record: the speed to ease toward and whether the agent
/// must come to a hard stop.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpeedDecision {
    pub target_speed: f32,
    pub stop: bool,
}

/// Evaluate the priority-ordered rules for one detection.
pub fn decide(detection: &DetectedObstacle, inputs: &PolicyInputs) -> SpeedDecision {
    match *detection {
        DetectedObstacle::Car { distance, peer } => {
            peer_ahead(distance, inputs.car_threshold, &peer, inputs)
        }
        DetectedObstacle::Bicycle { distance, peer } => {
            peer_ahead(distance, DISTANCE_TO_BICYCLE, &peer, inputs)
        }
        DetectedObstacle::PedestrianOrPlayer { distance } => pedestrian_ahead(distance, inputs),
        DetectedObstacle::Semaphore { distance, view } => semaphore_ahead(distance, &view, inputs),
        DetectedObstacle::None => SpeedDecision {
            target_speed: inputs.start_speed,
            stop: false,
        },
    }
}

/// Car or bicycle ahead on the same path.
fn peer_ahead(
    distance: f32,
    threshold: f32,
    peer: &PeerState,
    inputs: &PolicyInputs,
) -> SpeedDecision {
    if distance >= threshold {
        // Clear of the peer: resume, at half speed if the peer is stopped
        let target = if peer.temporarily_stopped {
            inputs.start_speed * 0.5
        } else {
            inputs.start_speed
        };
        SpeedDecision {
            target_speed: target,
            stop: false,
        }
    } else if peer.velocity_magnitude < inputs.own_velocity_magnitude {
        // Closing in on a slower peer: hard stop
        SpeedDecision {
            target_speed: inputs.current_target_speed,
            stop: true,
        }
    } else {
        // Peer is at least as fast; stay stopped only while it is stopped
        SpeedDecision {
            target_speed: inputs.current_target_speed,
            stop: peer.temporarily_stopped && inputs.currently_stopped,
        }
    }
}

/// Pedestrian or the player ahead.
fn pedestrian_ahead(distance: f32, inputs: &PolicyInputs) -> SpeedDecision {
    if distance >= DISTANCE_TO_PEDESTRIAN {
        SpeedDecision {
            target_speed: inputs.start_speed * 0.5,
            stop: inputs.currently_stopped,
        }
    } else {
        SpeedDecision {
            target_speed: inputs.current_target_speed,
            stop: true,
        }
    }
}

/// Semaphore ahead, with `inside` meaning the agent already crossed the
/// stop line and must not brake inside the intersection.
fn semaphore_ahead(distance: f32, view: &SemaphoreView, inputs: &PolicyInputs) -> SpeedDecision {
    let near = distance < inputs.semaphore_threshold && !inputs.inside_semaphore;

    // Red, or flickering amber, before the stop line: hard stop
    if (!view.can_go || view.flickering) && near {
        return SpeedDecision {
            target_speed: 0.0,
            stop: true,
        };
    }

    // Green: go through at full speed
    if view.can_go {
        return SpeedDecision {
            target_speed: inputs.start_speed,
            stop: false,
        };
    }

    // Approaching but not yet committed: creep at half speed
    if near {
        return SpeedDecision {
            target_speed: inputs.start_speed * 0.5,
            stop: inputs.currently_stopped,
        };
    }

    SpeedDecision {
        target_speed: inputs.start_speed,
        stop: false,
    }
}
