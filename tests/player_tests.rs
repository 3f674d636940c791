//! Player safety controller validation
//!
//! Exercises the AEB detection episode, manual reaction measurement,
//! overspeed hysteresis, engine spin-up and the crash-recovery task.

use drive_sim::simulation::{
    grade_reaction, AgentBody, Classification, DriverAnalytics, EngineStage, LevelSet,
    ObstacleRef, ObstacleSurface, PlayerConfig, PlayerContext, PlayerVehicle, Pose, Position,
    ReactionGrade, RecordingAudio, RecoveryPhase,
};

struct Harness {
    analytics: DriverAnalytics,
    audio: RecordingAudio,
    levels: LevelSet,
}

impl Harness {
    fn new() -> Self {
        Self {
            analytics: DriverAnalytics::new(),
            audio: RecordingAudio::default(),
            levels: LevelSet::new(vec![Pose::new(
                Position::new(5.0, 0.0, 5.0),
                Position::new(0.0, 0.0, 1.0),
            )]),
        }
    }

    fn ctx(&mut self) -> PlayerContext<'_> {
        PlayerContext {
            analytics: &mut self.analytics,
            audio: &mut self.audio,
            levels: &mut self.levels,
        }
    }

    fn cue_count(&self, cue: &str) -> usize {
        self.audio.cues.iter().filter(|c| c == &cue).count()
    }
}

fn make_player() -> PlayerVehicle {
    let body = AgentBody::new(
        Position::new(0.0, 0.0, 0.0),
        Position::new(1.0, 0.0, 0.0),
        4.0,
        4,
    );
    PlayerVehicle::new(body, PlayerConfig::default())
}

/// Pedestrian sphere dead ahead of the player, on the sensor axis.
fn pedestrian_ahead() -> ObstacleSurface {
    ObstacleSurface {
        classification: Classification::PedestrianOrPlayer,
        center: Position::new(10.0, 0.5, 0.0),
        radius: 0.5,
        target: ObstacleRef::Player,
    }
}

fn semaphore_ahead() -> ObstacleSurface {
    ObstacleSurface {
        classification: Classification::Semaphore,
        center: Position::new(10.0, 0.5, 0.0),
        radius: 0.5,
        target: ObstacleRef::Static,
    }
}

#[test]
fn aeb_activates_once_per_detection_episode() {
    let mut h = Harness::new();
    let mut player = make_player();

    player.toggle_aeb(&mut h.ctx());
    assert!(player.is_aeb_enabled());

    let obstacle = [pedestrian_ahead()];
    player.sense(1.0, &obstacle, &mut h.ctx());
    assert!(player.is_aeb_braking());
    assert_eq!(player.aeb_activation_count(), 1);

    // Repeated hits within the same episode do not re-count
    player.sense(1.1, &obstacle, &mut h.ctx());
    player.sense(1.2, &obstacle, &mut h.ctx());
    assert_eq!(player.aeb_activation_count(), 1);
    assert_eq!(h.analytics.aeb_activations, 1);

    // A full miss ends the episode
    player.sense(2.0, &[], &mut h.ctx());
    assert!(!player.is_aeb_braking());
    assert!(player.obstacle_detected_at().is_none());

    // Re-detection begins a fresh episode
    player.sense(3.0, &obstacle, &mut h.ctx());
    assert_eq!(player.aeb_activation_count(), 2);
}

#[test]
fn non_qualifying_hit_leaves_the_episode_untouched() {
    let mut h = Harness::new();
    let mut player = make_player();
    player.toggle_aeb(&mut h.ctx());

    player.sense(1.0, &[pedestrian_ahead()], &mut h.ctx());
    assert_eq!(player.obstacle_detected_at(), Some(1.0));

    // A semaphore in view neither starts nor clears anything
    player.sense(2.0, &[semaphore_ahead()], &mut h.ctx());
    assert_eq!(player.obstacle_detected_at(), Some(1.0));
    assert!(player.is_aeb_braking());
    assert_eq!(player.aeb_activation_count(), 1);
}

#[test]
fn disabling_aeb_mid_brake_clears_the_braking_flag() {
    let mut h = Harness::new();
    let mut player = make_player();
    player.toggle_aeb(&mut h.ctx());
    player.sense(1.0, &[pedestrian_ahead()], &mut h.ctx());
    assert!(player.is_aeb_braking());

    player.toggle_aeb(&mut h.ctx());
    assert!(!player.is_aeb_enabled());
    assert!(!player.is_aeb_braking());
    assert_eq!(h.cue_count("AEB intervention successful"), 1);
}

#[test]
fn reaction_grading_boundaries() {
    assert_eq!(grade_reaction(0.5), ReactionGrade::Satisfactory);
    assert_eq!(grade_reaction(0.75), ReactionGrade::Satisfactory);
    assert_eq!(grade_reaction(1.0), ReactionGrade::Unremarked);
    assert_eq!(grade_reaction(1.5), ReactionGrade::Unremarked);
    assert_eq!(grade_reaction(2.0), ReactionGrade::Late);
}

#[test]
fn manual_brake_reaction_is_measured_and_graded() {
    let mut h = Harness::new();
    let mut player = make_player();
    // AEB off: the driver is doing the braking

    player.sense(10.0, &[pedestrian_ahead()], &mut h.ctx());
    assert_eq!(h.analytics.pedestrians_detected, 1);
    assert_eq!(h.cue_count("Approaching pedestrian crossing"), 1);

    player.apply_input(0.0, 0.0, 1.0);
    assert!(player.is_braking());

    player.update_reaction(10.5, &mut h.ctx());
    assert_eq!(h.analytics.reaction_times, vec![0.5]);
    assert_eq!(h.analytics.times_to_act, 1);
    // One event from the measurement, one from the brake-press edge
    assert_eq!(h.analytics.braking_events, 2);
    assert_eq!(h.analytics.accurate_stops, 1);
    assert_eq!(h.cue_count("Driver response is satisfactory"), 1);
    assert_eq!(h.cue_count("Collision avoided"), 1);

    // Holding the brake does not measure again
    player.update_reaction(11.0, &mut h.ctx());
    assert_eq!(h.analytics.reaction_times, vec![0.5]);
    assert_eq!(h.analytics.braking_events, 2);
}

#[test]
fn late_reaction_is_called_out_but_still_counts_a_stop() {
    let mut h = Harness::new();
    let mut player = make_player();

    player.sense(10.0, &[pedestrian_ahead()], &mut h.ctx());
    player.apply_input(0.0, 0.0, 1.0);
    player.update_reaction(12.0, &mut h.ctx());

    assert_eq!(h.analytics.reaction_times, vec![2.0]);
    assert_eq!(h.cue_count("Driver failed to respond in time"), 1);
    assert_eq!(h.analytics.accurate_stops, 1);
}

#[test]
fn every_brake_press_edge_counts_one_event() {
    let mut h = Harness::new();
    let mut player = make_player();

    player.apply_input(0.0, 0.0, 1.0);
    player.update_reaction(1.0, &mut h.ctx());
    player.update_reaction(1.1, &mut h.ctx());
    assert_eq!(h.analytics.braking_events, 1);

    player.apply_input(0.0, 0.0, 0.0);
    player.update_reaction(1.2, &mut h.ctx());
    player.apply_input(0.0, 0.0, 0.9);
    player.update_reaction(1.3, &mut h.ctx());
    assert_eq!(h.analytics.braking_events, 2);

    // Analog values at or below the deadzone never count as braking
    player.apply_input(0.0, 0.0, 0.2);
    assert!(!player.is_braking());
}

#[test]
fn overspeed_warning_uses_five_kph_hysteresis() {
    let mut h = Harness::new();
    let mut player = make_player();

    // 61.2 km/h
    player.current_speed = 17.0;
    player.update_overspeed(&mut h.ctx());
    player.update_overspeed(&mut h.ctx());
    assert!(player.is_overspeed_warned());
    assert_eq!(h.cue_count("Speed exceeds safety protocol"), 1);

    // Dip to 57.6 km/h: below the threshold but inside the hysteresis band
    player.current_speed = 16.0;
    player.update_overspeed(&mut h.ctx());
    player.current_speed = 17.0;
    player.update_overspeed(&mut h.ctx());
    assert_eq!(h.cue_count("Speed exceeds safety protocol"), 1);

    // 54 km/h clears the latch; the next excursion warns again
    player.current_speed = 15.0;
    player.update_overspeed(&mut h.ctx());
    assert!(!player.is_overspeed_warned());
    player.current_speed = 17.0;
    player.update_overspeed(&mut h.ctx());
    assert_eq!(h.cue_count("Speed exceeds safety protocol"), 2);
}

#[test]
fn movement_is_inert_until_the_engine_finishes_spinning_up() {
    let mut player = make_player();
    assert_eq!(player.engine_stage(), EngineStage::Off);

    player.apply_input(0.5, 0.0, 0.0);
    assert_eq!(player.engine_stage(), EngineStage::Starting);

    // 1.2 s spin-up at 0.5 s per tick: three ticks before motion responds
    for _ in 0..3 {
        player.update_movement(0.5);
        assert_eq!(player.current_speed, 0.0);
        assert_eq!(player.body.position.x, 0.0);
    }
    assert_eq!(player.engine_stage(), EngineStage::Running);

    player.update_movement(0.5);
    assert!(player.current_speed > 0.0);
    assert!(player.body.position.x > 0.0);
}

#[test]
fn player_speed_stays_within_configured_bounds() {
    let mut player = make_player();
    player.apply_input(1.0, 0.0, 0.0);
    for _ in 0..500 {
        player.update_movement(0.02);
        assert!(player.current_speed <= player.config.max_forward_speed);
    }
    assert_eq!(player.current_speed, player.config.max_forward_speed);

    player.apply_input(-1.0, 0.0, 0.0);
    for _ in 0..500 {
        player.update_movement(0.02);
        assert!(player.current_speed >= player.config.max_reverse_speed);
    }
    assert_eq!(player.current_speed, player.config.max_reverse_speed);
}

#[test]
fn aeb_braking_overrides_throttle() {
    let mut h = Harness::new();
    let mut player = make_player();
    player.toggle_aeb(&mut h.ctx());

    player.apply_input(1.0, 0.0, 0.0);
    for _ in 0..3 {
        player.update_movement(0.5);
    }
    player.update_movement(0.5);
    player.update_movement(0.5);
    let cruising = player.current_speed;
    assert!(cruising > 0.0);

    // Full throttle held, but the AEB hit forces the speed toward zero
    player.sense(5.0, &[pedestrian_ahead()], &mut h.ctx());
    player.update_movement(0.5);
    assert_eq!(player.current_speed, 0.0);
}

#[test]
fn collision_records_kind_and_time_to_collision() {
    let mut h = Harness::new();
    let mut player = make_player();

    player.sense(3.0, &[pedestrian_ahead()], &mut h.ctx());
    player.on_collision(4.0, Classification::PedestrianOrPlayer, &mut h.ctx());

    assert!(player.has_collided());
    assert_eq!(h.analytics.times_to_collision, vec![1.0]);
    assert_eq!(h.analytics.pedestrian_collisions, 1);
    assert_eq!(h.cue_count("Detected a crossing pedestrian"), 1);

    // Repeat contacts within the episode are ignored
    player.on_collision(4.1, Classification::PedestrianOrPlayer, &mut h.ctx());
    assert_eq!(h.analytics.pedestrian_collisions, 1);
}

#[test]
fn crash_recovery_walks_its_phases_and_respawns() {
    let mut h = Harness::new();
    let mut player = make_player();
    player.body.position = Position::new(40.0, 0.0, 0.0);

    player.on_collision(2.0, Classification::Car, &mut h.ctx());
    assert_eq!(player.recovery_phase(), RecoveryPhase::FadingIn);
    assert_eq!(h.analytics.car_collisions, 1);

    // Fade-in lasts restart_delay = 1.5 s
    player.update_recovery(0.5, &mut h.ctx());
    assert!(player.overlay_alpha > 0.0 && player.overlay_alpha < 1.0);
    player.update_recovery(0.5, &mut h.ctx());
    player.update_recovery(0.5, &mut h.ctx());
    assert_eq!(player.recovery_phase(), RecoveryPhase::Holding);
    assert_eq!(player.overlay_alpha, 1.0);

    // Hold lasts restart_hold = 1.0 s
    player.update_recovery(0.5, &mut h.ctx());
    player.update_recovery(0.5, &mut h.ctx());
    assert_eq!(player.recovery_phase(), RecoveryPhase::Requesting);

    // The request tick teleports the player to the level spawn
    player.update_recovery(0.5, &mut h.ctx());
    assert_eq!(player.recovery_phase(), RecoveryPhase::FadingOut);
    assert_eq!(player.body.position.x, 5.0);
    assert_eq!(player.body.position.z, 5.0);
    assert_eq!(player.current_speed, 0.0);

    // Fade-out lasts fade_out_secs = 0.5 s
    player.update_recovery(0.5, &mut h.ctx());
    assert_eq!(player.recovery_phase(), RecoveryPhase::Idle);
    assert_eq!(player.overlay_alpha, 0.0);
}
