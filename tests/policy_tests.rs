//! Speed decision policy validation
//!
//! Exercises each rule of the pure policy on exact boundary values.

use drive_sim::simulation::{
    decide, DetectedObstacle, PeerState, PolicyInputs, SemaphoreView, DISTANCE_TO_CAR,
};

fn inputs(start_speed: f32) -> PolicyInputs {
    PolicyInputs {
        start_speed,
        own_velocity_magnitude: 5.0,
        currently_stopped: false,
        current_target_speed: start_speed,
        inside_semaphore: false,
        car_threshold: DISTANCE_TO_CAR,
        semaphore_threshold: 10.0,
    }
}

fn moving_peer(velocity: f32) -> PeerState {
    PeerState {
        velocity_magnitude: velocity,
        temporarily_stopped: false,
    }
}

fn stopped_peer() -> PeerState {
    PeerState {
        velocity_magnitude: 0.0,
        temporarily_stopped: true,
    }
}

#[test]
fn no_detection_resumes_full_speed() {
    let decision = decide(&DetectedObstacle::None, &inputs(6.0));
    assert_eq!(decision.target_speed, 6.0);
    assert!(!decision.stop);
}

#[test]
fn no_detection_clears_a_carried_stop_flag() {
    let mut ctx = inputs(6.0);
    ctx.currently_stopped = true;
    ctx.current_target_speed = 0.0;
    let decision = decide(&DetectedObstacle::None, &ctx);
    assert_eq!(decision.target_speed, 6.0);
    assert!(!decision.stop);
}

#[test]
fn car_far_ahead_and_stopped_halves_speed() {
    let detection = DetectedObstacle::Car {
        distance: 20.0,
        peer: stopped_peer(),
    };
    let decision = decide(&detection, &inputs(6.0));
    assert_eq!(decision.target_speed, 3.0);
    assert!(!decision.stop);
}

#[test]
fn car_far_ahead_and_moving_resumes_full_speed() {
    let detection = DetectedObstacle::Car {
        distance: 15.0, // exactly at the threshold counts as clear
        peer: moving_peer(5.0),
    };
    let decision = decide(&detection, &inputs(6.0));
    assert_eq!(decision.target_speed, 6.0);
    assert!(!decision.stop);
}

#[test]
fn slower_car_close_ahead_forces_stop() {
    let detection = DetectedObstacle::Car {
        distance: 10.0,
        peer: moving_peer(1.0),
    };
    let decision = decide(&detection, &inputs(6.0));
    assert!(decision.stop);
}

#[test]
fn faster_moving_car_close_ahead_releases_the_stop() {
    let mut ctx = inputs(6.0);
    ctx.currently_stopped = true;
    let detection = DetectedObstacle::Car {
        distance: 10.0,
        peer: moving_peer(8.0),
    };
    let decision = decide(&detection, &ctx);
    assert!(!decision.stop);
}

#[test]
fn stopped_car_close_ahead_keeps_a_stopped_agent_stopped() {
    let mut ctx = inputs(6.0);
    ctx.currently_stopped = true;
    ctx.own_velocity_magnitude = 0.0;
    let detection = DetectedObstacle::Car {
        distance: 10.0,
        peer: stopped_peer(),
    };
    let decision = decide(&detection, &ctx);
    assert!(decision.stop);
}

#[test]
fn bicycle_uses_the_shorter_threshold() {
    // At 10 units a bicycle is already clear (threshold 9), a car is not
    let clear = decide(
        &DetectedObstacle::Bicycle {
            distance: 10.0,
            peer: moving_peer(3.0),
        },
        &inputs(6.0),
    );
    assert_eq!(clear.target_speed, 6.0);
    assert!(!clear.stop);

    let close = decide(
        &DetectedObstacle::Bicycle {
            distance: 8.0,
            peer: moving_peer(1.0),
        },
        &inputs(6.0),
    );
    assert!(close.stop);
}

#[test]
fn pedestrian_far_ahead_halves_speed() {
    let decision = decide(&DetectedObstacle::PedestrianOrPlayer { distance: 8.0 }, &inputs(6.0));
    assert_eq!(decision.target_speed, 3.0);
    assert!(!decision.stop);
}

#[test]
fn pedestrian_close_ahead_forces_stop() {
    let decision = decide(&DetectedObstacle::PedestrianOrPlayer { distance: 7.9 }, &inputs(6.0));
    assert!(decision.stop);
}

#[test]
fn red_semaphore_near_stop_line_forces_full_stop() {
    let detection = DetectedObstacle::Semaphore {
        distance: 5.0,
        view: SemaphoreView {
            can_go: false,
            flickering: false,
        },
    };
    let decision = decide(&detection, &inputs(6.0));
    assert!(decision.stop);
    assert_eq!(decision.target_speed, 0.0);
}

#[test]
fn flickering_semaphore_near_stop_line_forces_full_stop() {
    let detection = DetectedObstacle::Semaphore {
        distance: 5.0,
        view: SemaphoreView {
            can_go: true,
            flickering: true,
        },
    };
    let decision = decide(&detection, &inputs(6.0));
    assert!(decision.stop);
    assert_eq!(decision.target_speed, 0.0);
}

#[test]
fn green_semaphore_resumes_regardless_of_distance() {
    for distance in [2.0, 5.0, 9.9, 15.0] {
        let detection = DetectedObstacle::Semaphore {
            distance,
            view: SemaphoreView {
                can_go: true,
                flickering: false,
            },
        };
        let decision = decide(&detection, &inputs(6.0));
        assert!(!decision.stop, "distance {distance}");
        assert_eq!(decision.target_speed, 6.0, "distance {distance}");
    }
}

#[test]
fn red_semaphore_does_not_stop_an_agent_already_inside() {
    let mut ctx = inputs(6.0);
    ctx.inside_semaphore = true;
    let detection = DetectedObstacle::Semaphore {
        distance: 3.0,
        view: SemaphoreView {
            can_go: false,
            flickering: false,
        },
    };
    let decision = decide(&detection, &ctx);
    assert!(!decision.stop);
    assert_eq!(decision.target_speed, 6.0);
}

#[test]
fn red_semaphore_far_away_is_ignored() {
    let detection = DetectedObstacle::Semaphore {
        distance: 12.0,
        view: SemaphoreView {
            can_go: false,
            flickering: false,
        },
    };
    let decision = decide(&detection, &inputs(6.0));
    assert!(!decision.stop);
    assert_eq!(decision.target_speed, 6.0);
}
