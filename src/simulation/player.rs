//! Player safety controller
//!
//! Converts control input into motion, runs AEB obstacle detection, measures
//! driver detection/reaction/collision timing and drives the crash->respawn
//! cycle. Sensing runs on the variable tick; movement integration, the
//! engine spin-up countdown and the crash-recovery phase task run on the
//! fixed tick.

use log::{debug, warn};

use crate::simulation::analytics::{CollisionKind, DriverAnalytics};
use crate::simulation::audio::AudioSink;
use crate::simulation::level::LevelSet;
use crate::simulation::sensor::{self, ObstacleSurface, SensorHit};
use crate::simulation::types::{AgentBody, Classification, Position};

/// Driving and AEB tuning for the player vehicle
#[derive(Debug, Clone)]
pub struct PlayerConfig {
    pub acceleration: f32,
    pub deceleration: f32,
    pub max_forward_speed: f32,
    pub max_reverse_speed: f32,
    pub brake_force: f32,
    pub steer_sensitivity: f32,
    pub min_steer_speed: f32,
    pub aeb_detection_range: f32,
    pub aeb_detection_radius: f32,
    /// Seconds the crash overlay takes to fade in
    pub restart_delay: f32,
    /// Pause at full overlay before the respawn request
    pub restart_hold: f32,
    /// Seconds the overlay takes to fade back out
    pub fade_out_secs: f32,
    /// Engine spin-up duration before movement responds
    pub engine_start_secs: f32,
    pub speed_warning_threshold_kph: f32,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            acceleration: 12.0,
            deceleration: 8.0,
            max_forward_speed: 25.0,
            max_reverse_speed: -10.0,
            brake_force: 40.0,
            steer_sensitivity: 100.0,
            min_steer_speed: 0.1,
            aeb_detection_range: 20.0,
            aeb_detection_radius: 1.5,
            restart_delay: 1.5,
            restart_hold: 1.0,
            fade_out_secs: 0.5,
            engine_start_secs: 1.2,
            speed_warning_threshold_kph: 60.0,
        }
    }
}

/// Engine state: movement integration is inert until `Running`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineStage {
    Off,
    Starting,
    Running,
}

/// Phase of the crash-recovery overlay task
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecoveryPhase {
    Idle,
    FadingIn,
    Holding,
    Requesting,
    FadingOut,
}

/// Feedback grade for a measured reaction time. Grades drive audio cues
/// only; analytics records the occurrence, never the grade.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReactionGrade {
    Satisfactory,
    Unremarked,
    Late,
}

/// Grade a manual brake reaction.
pub fn grade_reaction(reaction_secs: f32) -> ReactionGrade {
    if reaction_secs <= 0.75 {
        ReactionGrade::Satisfactory
    } else if reaction_secs > 1.5 {
        ReactionGrade::Late
    } else {
        ReactionGrade::Unremarked
    }
}

/// Mutable collaborators the player controller reports into
pub struct PlayerContext<'a> {
    pub analytics: &'a mut DriverAnalytics,
    pub audio: &'a mut dyn AudioSink,
    pub levels: &'a mut LevelSet,
}

/// The player-driven vehicle with its AEB subsystem
#[derive(Debug, Clone)]
pub struct PlayerVehicle {
    pub body: AgentBody,
    pub config: PlayerConfig,

    // Normalized control inputs
    throttle_input: f32,
    steer_input: f32,
    is_braking: bool,
    was_braking: bool,

    pub current_speed: f32,
    /// Smoothed absolute speed for display/speed-ratio purposes
    speed_clamped: f32,

    engine: EngineStage,
    engine_timer: f32,

    aeb_enabled: bool,
    aeb_braking: bool,
    aeb_activation_count: usize,

    // Detection episode state
    obstacle_detected_at: Option<f32>,
    driver_reacted: bool,
    has_collided: bool,

    overspeed_warned: bool,

    // Crash recovery task; at most one in flight
    recovery_phase: RecoveryPhase,
    recovery_timer: f32,
    pub overlay_alpha: f32,
}

impl PlayerVehicle {
    pub fn new(body: AgentBody, config: PlayerConfig) -> Self {
        Self {
            body,
            config,
            throttle_input: 0.0,
            steer_input: 0.0,
            is_braking: false,
            was_braking: false,
            current_speed: 0.0,
            speed_clamped: 0.0,
            engine: EngineStage::Off,
            engine_timer: 0.0,
            aeb_enabled: false,
            aeb_braking: false,
            aeb_activation_count: 0,
            obstacle_detected_at: None,
            driver_reacted: false,
            has_collided: false,
            overspeed_warned: false,
            recovery_phase: RecoveryPhase::Idle,
            recovery_timer: 0.0,
            overlay_alpha: 0.0,
        }
    }

    pub fn engine_stage(&self) -> EngineStage {
        self.engine
    }

    pub fn is_aeb_enabled(&self) -> bool {
        self.aeb_enabled
    }

    pub fn is_aeb_braking(&self) -> bool {
        self.aeb_braking
    }

    pub fn aeb_activation_count(&self) -> usize {
        self.aeb_activation_count
    }

    pub fn obstacle_detected_at(&self) -> Option<f32> {
        self.obstacle_detected_at
    }

    pub fn has_collided(&self) -> bool {
        self.has_collided
    }

    pub fn recovery_phase(&self) -> RecoveryPhase {
        self.recovery_phase
    }

    pub fn is_braking(&self) -> bool {
        self.is_braking
    }

    pub fn throttle_input(&self) -> f32 {
        self.throttle_input
    }

    pub fn steer_input(&self) -> f32 {
        self.steer_input
    }

    pub fn current_speed_kph(&self) -> f32 {
        self.current_speed.abs() * 3.6
    }

    /// Smoothed speed as a fraction of top speed, weighted by throttle
    pub fn speed_ratio(&self) -> f32 {
        (self.speed_clamped * self.throttle_input.abs().clamp(0.0, 1.0))
            / self.config.max_forward_speed
    }

    /// Map raw control values into the runtime inputs. The brake is a
    /// boolean derived from the analog value crossing 0.2. The first
    /// nonzero throttle while the engine is off begins the spin-up.
    pub fn apply_input(&mut self, throttle: f32, steer: f32, brake_value: f32) {
        self.throttle_input = throttle.clamp(-1.0, 1.0);
        self.steer_input = steer.clamp(-1.0, 1.0);
        self.is_braking = brake_value > 0.2;

        if self.throttle_input > 0.0 && self.engine == EngineStage::Off {
            self.engine = EngineStage::Starting;
            self.engine_timer = self.config.engine_start_secs;
        }
    }

    /// Discrete AEB toggle event. Disabling mid-brake clears the AEB-braking
    /// flag; an in-flight recovery task is unaffected.
    pub fn toggle_aeb(&mut self, ctx: &mut PlayerContext) {
        self.aeb_enabled = !self.aeb_enabled;
        debug!(
            "AEB is now {}",
            if self.aeb_enabled { "ENABLED" } else { "DISABLED" }
        );
        if self.aeb_enabled {
            ctx.audio.play("AEB Activated");
        } else {
            if self.aeb_braking {
                self.aeb_braking = false;
            }
            ctx.audio.play("AEB intervention successful");
        }
    }

    /// Sensing-rate step: sphere-cast forward and maintain the detection
    /// episode. `now` is the simulation clock.
    pub fn sense(&mut self, now: f32, obstacles: &[ObstacleSurface], ctx: &mut PlayerContext) {
        let origin = self.body.sensor_origin();
        let hit = sensor::cast(
            &origin,
            &self.body.heading,
            self.config.aeb_detection_radius,
            self.config.aeb_detection_range,
            obstacles,
        );

        match hit {
            Some(hit) if Self::is_qualifying(&hit) => {
                let is_pedestrian = hit.classification == Classification::PedestrianOrPlayer;

                if self.obstacle_detected_at.is_none() {
                    self.obstacle_detected_at = Some(now);
                    self.driver_reacted = false;
                    self.has_collided = false;

                    if is_pedestrian {
                        ctx.analytics.register_pedestrian_detected();
                        ctx.audio.play("Approaching pedestrian crossing");
                    } else {
                        ctx.audio.play("Approaching vehicle ahead");
                    }
                }

                if self.aeb_enabled && !self.aeb_braking {
                    self.aeb_activation_count += 1;
                    ctx.analytics.increment_aeb_activations();
                    self.aeb_braking = true;
                    ctx.audio.play("AEB Activated");
                }
            }
            Some(_) => {
                // A non-qualifying surface neither starts nor resets an
                // episode; whatever was detected before stays in effect
            }
            None => {
                self.obstacle_detected_at = None;
                self.aeb_braking = false;
            }
        }
    }

    fn is_qualifying(hit: &SensorHit) -> bool {
        matches!(
            hit.classification,
            Classification::Car | Classification::Bicycle | Classification::PedestrianOrPlayer
        )
    }

    /// Manual reaction measurement and brake-edge feedback. Runs before
    /// movement each fixed tick.
    pub fn update_reaction(&mut self, now: f32, ctx: &mut PlayerContext) {
        if !self.aeb_enabled && !self.driver_reacted && self.is_braking {
            if let Some(detected_at) = self.obstacle_detected_at {
                let reaction_time = now - detected_at;

                ctx.analytics.record_reaction_time(reaction_time);
                ctx.analytics.record_time_to_act();
                ctx.analytics.add_braking_event();
                debug!("driver reaction time: {reaction_time:.2}s");

                if !self.has_collided {
                    match grade_reaction(reaction_time) {
                        ReactionGrade::Satisfactory => {
                            ctx.audio.play("Driver response is satisfactory")
                        }
                        ReactionGrade::Late => {
                            ctx.audio.play("Driver failed to respond in time")
                        }
                        ReactionGrade::Unremarked => {}
                    }
                    ctx.analytics.register_accurate_stop();
                    ctx.audio.play("Collision avoided");
                }

                self.driver_reacted = true;
            }
        }

        // Feedback on every brake-press edge
        if self.is_braking && !self.was_braking {
            ctx.analytics.add_braking_event();
            ctx.audio.play("Brake input delayed pay attention");
        }
        self.was_braking = self.is_braking;
    }

    /// Fixed-rate motion integration: ease toward the applicable target
    /// speed, translate along the heading, steer scaled by speed.
    pub fn update_movement(&mut self, delta_secs: f32) {
        match self.engine {
            EngineStage::Off => return,
            EngineStage::Starting => {
                self.engine_timer -= delta_secs;
                if self.engine_timer <= 0.0 {
                    self.engine = EngineStage::Running;
                }
                return;
            }
            EngineStage::Running => {}
        }

        let cfg = &self.config;
        if self.aeb_enabled && self.aeb_braking {
            let target = if self.throttle_input < 0.0 {
                cfg.max_reverse_speed
            } else {
                0.0
            };
            self.current_speed =
                move_towards(self.current_speed, target, cfg.brake_force * delta_secs);
        } else if self.is_braking {
            self.current_speed = move_towards(self.current_speed, 0.0, cfg.brake_force * delta_secs);
        } else if self.throttle_input > 0.0 {
            self.current_speed = move_towards(
                self.current_speed,
                cfg.max_forward_speed,
                cfg.acceleration * delta_secs,
            );
        } else if self.throttle_input < 0.0 {
            self.current_speed = move_towards(
                self.current_speed,
                cfg.max_reverse_speed,
                cfg.acceleration * delta_secs,
            );
        } else {
            self.current_speed =
                move_towards(self.current_speed, 0.0, cfg.deceleration * delta_secs);
        }

        // Steering rotates the heading, inert below the minimum speed
        if self.current_speed.abs() > cfg.min_steer_speed {
            let steer_deg = self.steer_input
                * cfg.steer_sensitivity
                * delta_secs
                * (self.current_speed / cfg.max_forward_speed);
            self.body.heading = self.body.heading.rotated_about_up(steer_deg);
        }

        // Advance along the heading; expose the motion as velocity so the
        // traffic agents' sensors see the player moving
        self.body.position.x += self.body.heading.x * self.current_speed * delta_secs;
        self.body.position.z += self.body.heading.z * self.current_speed * delta_secs;
        self.body.velocity = Position::new(
            self.body.heading.x * self.current_speed,
            0.0,
            self.body.heading.z * self.current_speed,
        );

        self.speed_clamped = self.speed_clamped
            + (self.current_speed.abs() - self.speed_clamped) * delta_secs.clamp(0.0, 1.0);
    }

    /// Overspeed warning with hysteresis: warn once above the threshold,
    /// clear only after dropping at least 5 km/h below it.
    pub fn update_overspeed(&mut self, ctx: &mut PlayerContext) {
        let kph = self.current_speed_kph();
        if kph > self.config.speed_warning_threshold_kph {
            if !self.overspeed_warned {
                ctx.audio.play("Speed exceeds safety protocol");
                self.overspeed_warned = true;
            }
        } else if kph <= self.config.speed_warning_threshold_kph - 5.0 {
            self.overspeed_warned = false;
        }
    }

    pub fn is_overspeed_warned(&self) -> bool {
        self.overspeed_warned
    }

    /// First contact with an obstacle-classified surface within an episode.
    /// Reports time-to-collision when a detection had registered and starts
    /// the crash-recovery task exactly once.
    pub fn on_collision(&mut self, now: f32, classification: Classification, ctx: &mut PlayerContext) {
        if self.has_collided {
            return;
        }
        self.has_collided = true;

        if let Some(detected_at) = self.obstacle_detected_at {
            let ttc = now - detected_at;
            ctx.analytics.record_time_to_collision(ttc);
            debug!("time to collision: {ttc:.2}s");
        }

        match classification {
            Classification::PedestrianOrPlayer => {
                ctx.audio.play("Detected a crossing pedestrian");
                ctx.analytics.register_collision(CollisionKind::Pedestrian);
            }
            Classification::Car | Classification::Bicycle => {
                ctx.audio.play("Collision detected with vehicle");
                ctx.analytics.register_collision(CollisionKind::Car);
            }
            _ => {
                ctx.audio.play("Collision detected");
                ctx.analytics.register_collision(CollisionKind::Car);
            }
        }

        if self.recovery_phase == RecoveryPhase::Idle {
            self.recovery_phase = RecoveryPhase::FadingIn;
            self.recovery_timer = 0.0;
        }
    }

    /// Advance the crash-recovery overlay task one fixed tick.
    pub fn update_recovery(&mut self, delta_secs: f32, ctx: &mut PlayerContext) {
        match self.recovery_phase {
            RecoveryPhase::Idle => {}
            RecoveryPhase::FadingIn => {
                self.recovery_timer += delta_secs;
                self.overlay_alpha = (self.recovery_timer / self.config.restart_delay).min(1.0);
                if self.recovery_timer >= self.config.restart_delay {
                    self.recovery_phase = RecoveryPhase::Holding;
                    self.recovery_timer = 0.0;
                }
            }
            RecoveryPhase::Holding => {
                self.recovery_timer += delta_secs;
                if self.recovery_timer >= self.config.restart_hold {
                    self.recovery_phase = RecoveryPhase::Requesting;
                }
            }
            RecoveryPhase::Requesting => {
                let level = ctx.levels.current_level();
                match ctx.levels.spawn_point_for(level) {
                    Some(pose) => self.respawn_at(pose.position, pose.heading),
                    None => warn!("no spawn point for level {level}; skipping respawn"),
                }
                self.recovery_phase = RecoveryPhase::FadingOut;
                self.recovery_timer = 0.0;
            }
            RecoveryPhase::FadingOut => {
                self.recovery_timer += delta_secs;
                self.overlay_alpha =
                    (1.0 - self.recovery_timer / self.config.fade_out_secs).max(0.0);
                if self.recovery_timer >= self.config.fade_out_secs {
                    self.overlay_alpha = 0.0;
                    self.recovery_phase = RecoveryPhase::Idle;
                }
            }
        }
    }

    /// Teleport to a spawn pose and zero out all motion.
    pub fn respawn_at(&mut self, position: Position, heading: Position) {
        self.body.position = position;
        self.body.heading = heading;
        self.body.velocity = Position::default();
        self.current_speed = 0.0;
        self.speed_clamped = 0.0;
    }
}

/// Linear step of `current` toward `target` by at most `max_delta`
fn move_towards(current: f32, target: f32, max_delta: f32) -> f32 {
    if (target - current).abs() <= max_delta {
        target
    } else {
        current + (target - current).signum() * max_delta
    }
}
