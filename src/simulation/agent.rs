//! Traffic agent controller
//!
//! Per-agent loop composing the path provider, the forward sensor and the
//! speed decision policy into steering and throttle commands. Sensing and
//! orientation run at the variable rate; all decision logic (policy,
//! turn braking, arrival detection, speed smoothing) runs at the fixed rate
//! to stay consistent with the physics step.

use log::warn;

use crate::simulation::path::{AgentPathState, PathAdvance, PathSet, RespawnRequest};
use crate::simulation::policy::{self, DetectedObstacle, PolicyInputs};
use crate::simulation::sensor::{self, ObstacleSurface, SensorHit};
use crate::simulation::types::{
    AgentBody, AgentId, AgentKind, Position, DISTANCE_TO_CAR, DISTANCE_TO_SEMAPHORE,
    MAX_STEER_ANGLE, MAX_TURN_ANGLE, PATH_APPROACH_DISTANCE, ROLLOVER_TIMEOUT, SENSOR_RADIUS,
    SENSOR_RANGE, STOP_EPSILON, TURN_LOOKAHEAD_DISTANCE,
};

/// Default arrival threshold for waypoints
pub const ARRIVE_THRESHOLD: f32 = 1.5;

/// Heading turn rate for non-four-wheeled agents, per second
const ORIENT_RATE: f32 = 4.0;

/// Result of an agent fixed-rate update indicating what action should be taken
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AgentUpdateResult {
    /// Agent continues moving
    Continue,
    /// Agent finished a non-looping path; a respawn request was queued
    Completed,
    /// Agent spent too long with no wheel on the ground
    RolledOver,
}

/// An autonomous traffic participant following a waypoint path
#[derive(Debug, Clone)]
pub struct TrafficAgent {
    pub id: AgentId,
    pub kind: AgentKind,
    pub body: AgentBody,
    pub path_state: AgentPathState,

    /// Free-run speed the agent returns to when nothing holds it back
    pub start_speed: f32,
    /// Speed the smoothing eases toward
    pub target_speed: f32,
    /// Smoothed current speed; velocity magnitude never exceeds this
    pub current_speed: f32,
    pub increase_rate: f32,
    pub decrease_rate: f32,
    /// Towing a trailer stretches the braking distance
    pub has_trailer: bool,

    pub temporarily_stopped: bool,
    /// Set while the agent is past a semaphore stop line
    pub inside_semaphore: bool,
    pub turn_brake: bool,
    rollover_timer: f32,

    /// Braking distance to a car ahead, tunable per agent
    pub car_threshold: f32,
    /// Braking distance to a semaphore, tunable per agent
    pub semaphore_threshold: f32,
    /// Heading deviation beyond which turn braking engages
    pub max_turn_angle: f32,
    pub cast_radius: f32,

    /// Most recent forward sensor result, refreshed on the sensing tick
    latest_hit: Option<SensorHit>,
    /// Orientation target for non-four-wheeled agents; switches to the
    /// following waypoint inside the approach radius
    orient_aim: Position,
}

impl TrafficAgent {
    pub fn new(
        id: AgentId,
        kind: AgentKind,
        body: AgentBody,
        path_state: AgentPathState,
        start_speed: f32,
    ) -> Self {
        let orient_aim = path_state.target_pos;
        Self {
            id,
            kind,
            body,
            path_state,
            start_speed,
            target_speed: start_speed,
            current_speed: 0.0,
            increase_rate: 1.5,
            decrease_rate: 4.0,
            has_trailer: false,
            temporarily_stopped: false,
            inside_semaphore: false,
            turn_brake: false,
            rollover_timer: 0.0,
            car_threshold: DISTANCE_TO_CAR,
            semaphore_threshold: DISTANCE_TO_SEMAPHORE,
            max_turn_angle: MAX_TURN_ANGLE,
            cast_radius: SENSOR_RADIUS,
            latest_hit: None,
            orient_aim,
        }
    }

    pub fn is_temporarily_stopped(&self) -> bool {
        self.temporarily_stopped
    }

    pub fn latest_hit(&self) -> Option<&SensorHit> {
        self.latest_hit.as_ref()
    }

    pub fn rollover_timer(&self) -> f32 {
        self.rollover_timer
    }

    /// Sensing-rate step: cast the forward sensor and, for non-four-wheeled
    /// agents, smoothly reorient the body toward the current target point.
    pub fn sense(&mut self, delta_secs: f32, obstacles: &[ObstacleSurface]) {
        let origin = self.body.sensor_origin();
        self.latest_hit = sensor::cast(
            &origin,
            &self.body.heading,
            self.cast_radius,
            SENSOR_RANGE,
            obstacles,
        );

        if self.kind != AgentKind::Car {
            self.orient_toward(self.orient_aim, delta_secs);
        }
    }

    /// Rotate the heading toward `target`, ignoring pitch and roll.
    fn orient_toward(&mut self, target: Position, delta_secs: f32) {
        let Some(desired) = self.body.position.direction_to(&target) else {
            return;
        };
        let t = (delta_secs * ORIENT_RATE).min(1.0);
        let blended = self.body.heading.lerp(&desired, t);
        if let Some(unit) = Position::default().direction_to(&blended) {
            self.body.heading = unit;
        }
    }

    /// Fixed-rate step. The caller resolves the latest sensor hit into a
    /// [`DetectedObstacle`] (dropping peers on other paths) before calling.
    pub fn update_fixed(
        &mut self,
        delta_secs: f32,
        detection: &DetectedObstacle,
        paths: &mut PathSet,
    ) -> AgentUpdateResult {
        // Rollover cleanup runs even when the path is missing
        if self.update_rollover(delta_secs) {
            return AgentUpdateResult::RolledOver;
        }

        let Some(path) = paths.get(self.path_state.path) else {
            warn!("agent {:?}: path {:?} missing, stalling", self.id, self.path_state.path);
            return AgentUpdateResult::Continue;
        };

        // 1. Decide the target speed from the forward detection
        let inputs = PolicyInputs {
            start_speed: self.start_speed,
            own_velocity_magnitude: self.body.velocity_magnitude(),
            currently_stopped: self.temporarily_stopped,
            current_target_speed: self.target_speed,
            inside_semaphore: self.inside_semaphore,
            car_threshold: self.car_threshold,
            semaphore_threshold: self.semaphore_threshold,
        };
        let decision = policy::decide(detection, &inputs);
        self.target_speed = decision.target_speed;
        self.temporarily_stopped = decision.stop;

        // 2. Recompute the orientation aim, prefetching the following
        //    waypoint when close enough to turn in early. Driving and
        //    steering always track the real target so arrival cannot be
        //    cut short
        let target = self.path_state.target_pos;
        let arrive_distance = self.body.position.horizontal_distance(&target);

        self.orient_aim =
            if arrive_distance < PATH_APPROACH_DISTANCE && self.path_state.can_prefetch(path) {
                self.path_state.lookahead_point(path).unwrap_or(target)
            } else {
                target
            };

        // 3. Turn braking from the geometry of the upcoming corner; wins
        //    over the policy output every tick it is active
        self.turn_brake = if arrive_distance < TURN_LOOKAHEAD_DISTANCE {
            match self.path_state.next_target_pos {
                Some(next_next) => {
                    let to_next = Position::new(
                        next_next.x - self.body.position.x,
                        0.0,
                        next_next.z - self.body.position.z,
                    );
                    let angle = self.body.heading.signed_angle_about_up(&to_next).abs();
                    angle > self.max_turn_angle
                }
                None => false,
            }
        } else {
            false
        };
        if self.turn_brake {
            self.target_speed = self.start_speed * 0.5;
        }

        // 4. Smooth the current speed with asymmetric rates
        if self.temporarily_stopped {
            let rate = if self.has_trailer {
                self.decrease_rate * 2.5
            } else {
                self.decrease_rate
            };
            self.current_speed = ease(self.current_speed, 0.0, delta_secs * rate);
            if self.current_speed < STOP_EPSILON {
                self.current_speed = 0.0;
            }
        } else {
            self.current_speed = ease(
                self.current_speed,
                self.target_speed,
                delta_secs * self.increase_rate,
            );
        }

        // 5. Steer and drive toward the current target point
        match self.kind {
            AgentKind::Car => {
                if let Some(to_target) = self.body.position.direction_to(&target) {
                    self.body.steer_angle = self
                        .body
                        .heading
                        .signed_angle_about_up(&to_target)
                        .clamp(-MAX_STEER_ANGLE, MAX_STEER_ANGLE);
                }
                // Steered wheels yaw the body proportionally to speed over
                // the wheelbase
                let yaw = self.body.steer_angle
                    * (self.current_speed / self.body.bounding_length.max(0.1))
                    * delta_secs;
                self.body.heading = self.body.heading.rotated_about_up(yaw);
                self.body.velocity = Position::new(
                    self.body.heading.x * self.current_speed,
                    self.body.velocity.y,
                    self.body.heading.z * self.current_speed,
                );
            }
            AgentKind::Bicycle => {
                if let Some(dir) = self.body.position.direction_to(&target) {
                    self.body.velocity = Position::new(
                        dir.x * self.current_speed,
                        self.body.velocity.y,
                        dir.z * self.current_speed,
                    );
                }
            }
        }

        // 6. The integrator never moves faster than the smoothed speed
        let magnitude = self.body.velocity_magnitude();
        if magnitude > self.current_speed && magnitude > 1e-6 {
            let scale = self.current_speed / magnitude;
            self.body.velocity = Position::new(
                self.body.velocity.x * scale,
                self.body.velocity.y * scale,
                self.body.velocity.z * scale,
            );
        }

        // 7. Waypoint arrival and path advancement; finishing an open path
        //    queues exactly one respawn request before removal
        if arrive_distance <= self.path_state.arrive_threshold {
            let Some(path) = paths.get_mut(self.path_state.path) else {
                return AgentUpdateResult::Continue;
            };
            if self.path_state.advance(path) == PathAdvance::Completed {
                path.enqueue_respawn(RespawnRequest {
                    kind: Some(self.kind),
                    direction: Some(self.path_state.direction),
                    speed: None,
                });
                return AgentUpdateResult::Completed;
            }
        }

        AgentUpdateResult::Continue
    }

    /// Accumulate airborne time; reset the instant any wheel touches ground.
    /// Returns true once the agent has been wheels-up past the timeout.
    fn update_rollover(&mut self, delta_secs: f32) -> bool {
        if self.body.grounded_wheels == 0 {
            self.rollover_timer += delta_secs;
        } else {
            self.rollover_timer = 0.0;
        }
        self.rollover_timer > ROLLOVER_TIMEOUT
    }
}

/// Exponential ease of `current` toward `target` by fraction `t`
fn ease(current: f32, target: f32, t: f32) -> f32 {
    current + (target - current) * t.clamp(0.0, 1.0)
}
