//! Main simulation world that ties everything together
//!
//! Owns the paths, agents, pedestrians, semaphores, the player vehicle and
//! the session services (analytics, audio, levels), and drives the two tick
//! rates: `fixed_tick` for physics-consistent decision logic and
//! `sense_tick` for sensing and orientation.

use anyhow::{Context, Result};
use log::{debug, info, warn};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::HashMap;

use super::agent::{AgentUpdateResult, TrafficAgent, ARRIVE_THRESHOLD};
use super::analytics::DriverAnalytics;
use super::audio::{AudioSink, NullAudio};
use super::level::{FadeTask, LevelSet};
use super::path::PathSet;
use super::player::{PlayerContext, PlayerVehicle};
use super::policy::{DetectedObstacle, PeerState, SemaphoreView};
use super::semaphore::Semaphore;
use super::sensor::{ObstacleRef, ObstacleSurface, SensorHit};
use super::types::{
    AgentBody, AgentId, AgentKind, Classification, PathDirection, PathId, PedestrianId, Pose,
    Position, SemaphoreId, SimId,
};

/// A background pedestrian: a sensed and collidable surface, not a
/// controlled entity
#[derive(Debug, Clone)]
pub struct Pedestrian {
    pub id: PedestrianId,
    pub position: Position,
    pub radius: f32,
}

/// The main simulation world
pub struct SimWorld {
    /// Waypoint paths and their respawn queues
    pub paths: PathSet,

    /// All traffic agents
    pub agents: HashMap<AgentId, TrafficAgent>,

    /// Background pedestrians
    pub pedestrians: HashMap<PedestrianId, Pedestrian>,

    /// All semaphores
    pub semaphores: HashMap<SemaphoreId, Semaphore>,

    /// The player vehicle (singleton, respawned in place on crash)
    pub player: Option<PlayerVehicle>,

    /// Level spawn points and progression
    pub levels: LevelSet,

    /// Driver performance analytics sink
    pub analytics: DriverAnalytics,

    /// Audio cue sink; defaults to a silent no-op
    audio: Box<dyn AudioSink>,

    /// Level intro/cleared overlay task
    pub fade: FadeTask,

    /// Set while a cleared fade runs ahead of a level switch
    pending_level_advance: bool,

    /// Next ID to assign
    next_id: usize,

    /// Simulation time
    pub time: f32,

    /// Optional seeded RNG for reproducible simulations
    rng: Option<StdRng>,
}

impl Default for SimWorld {
    fn default() -> Self {
        Self::new()
    }
}

impl SimWorld {
    fn new_internal(rng: Option<StdRng>) -> Self {
        Self {
            paths: PathSet::new(),
            agents: HashMap::new(),
            pedestrians: HashMap::new(),
            semaphores: HashMap::new(),
            player: None,
            levels: LevelSet::default(),
            analytics: DriverAnalytics::new(),
            audio: Box::new(NullAudio),
            fade: FadeTask::new(),
            pending_level_advance: false,
            next_id: 0,
            time: 0.0,
            rng,
        }
    }

    pub fn new() -> Self {
        Self::new_internal(None)
    }

    /// Create a new SimWorld with a seeded RNG for reproducible simulations
    pub fn new_with_seed(seed: u64) -> Self {
        Self::new_internal(Some(StdRng::seed_from_u64(seed)))
    }

    /// Replace the audio sink (e.g. with a recording sink in tests)
    pub fn set_audio_sink(&mut self, sink: Box<dyn AudioSink>) {
        self.audio = sink;
    }

    /// Get a random value in the given range, using seeded RNG if available
    fn random_range(&mut self, range: std::ops::Range<f32>) -> f32 {
        match &mut self.rng {
            Some(rng) => rng.random_range(range),
            None => rand::rng().random_range(range),
        }
    }

    fn next_sim_id(&mut self) -> SimId {
        let id = SimId(self.next_id);
        self.next_id += 1;
        id
    }

    /// Add a waypoint path to the world
    pub fn add_path(&mut self, points: Vec<Position>, loop_path: bool) -> PathId {
        self.paths.add_path(points, loop_path)
    }

    /// Add a semaphore at a position
    pub fn add_semaphore(&mut self, position: Position) -> SemaphoreId {
        let id = SemaphoreId(self.next_sim_id());
        self.semaphores.insert(id, Semaphore::new(id, position));
        id
    }

    /// Add a background pedestrian at a position
    pub fn add_pedestrian(&mut self, position: Position) -> PedestrianId {
        let id = PedestrianId(self.next_sim_id());
        self.pedestrians.insert(
            id,
            Pedestrian {
                id,
                position,
                radius: 0.4,
            },
        );
        id
    }

    /// Install the player vehicle
    pub fn set_player(&mut self, player: PlayerVehicle) {
        self.player = Some(player);
    }

    /// Install the level spawn points
    pub fn set_levels(&mut self, levels: LevelSet) {
        self.levels = levels;
    }

    /// Spawn a traffic agent at a path's starting terminus
    pub fn spawn_agent(
        &mut self,
        path_id: PathId,
        kind: AgentKind,
        direction: PathDirection,
        speed: Option<f32>,
    ) -> Result<AgentId> {
        let speed = speed.unwrap_or_else(|| match kind {
            AgentKind::Car => self.random_range(4.0..8.0),
            AgentKind::Bicycle => self.random_range(2.0..5.0),
        });

        let path = self.paths.get(path_id).context("Path not found")?;
        let path_state =
            super::path::AgentPathState::new(path, direction, ARRIVE_THRESHOLD)
                .context("Path has no points")?;

        let start = match direction {
            PathDirection::Forward => path.start_point(),
            PathDirection::Backward => path.point_at(path.last_index()),
        }
        .context("Path has no start point")?;

        let heading = start
            .direction_to(&path_state.target_pos)
            .or_else(|| {
                // Spawned on top of the first waypoint: face the next one
                path.point_at(1).and_then(|p| start.direction_to(&p))
            })
            .unwrap_or(Position::new(0.0, 0.0, 1.0));

        let (bounding_length, wheel_count) = match kind {
            AgentKind::Car => (4.0, 4),
            AgentKind::Bicycle => (1.8, 2),
        };
        let body = AgentBody::new(start, heading, bounding_length, wheel_count);

        let id = AgentId(self.next_sim_id());
        let agent = TrafficAgent::new(id, kind, body, path_state, speed);
        self.agents.insert(id, agent);
        debug!("spawned {kind:?} {id:?} on {path_id:?} at {speed:.1}");
        Ok(id)
    }

    /// Begin the given level: respawn the player at its spawn point, play
    /// the intro fade and cue, and reset analytics on first entry.
    pub fn start_level(&mut self, level: usize) {
        if level == 1 {
            debug!("resetting analytics at start of level 1");
            self.analytics.reset_all_stats();
        }

        match self.levels.spawn_point_for(level) {
            Some(pose) => {
                if let Some(player) = &mut self.player {
                    player.respawn_at(pose.position, pose.heading);
                }
            }
            None => warn!("no spawn point configured for level {level}"),
        }

        self.fade.start_intro(level);
        self.audio.play(&format!("Intro Level {level}"));
    }

    /// Called when the player reaches a finish zone: run the cleared fade,
    /// then switch levels once it completes.
    pub fn finish_level(&mut self) {
        if self.pending_level_advance {
            return;
        }
        self.pending_level_advance = true;
        self.fade.start_cleared(self.levels.current_level());
    }

    /// Route the discrete AEB toggle event to the player vehicle
    pub fn toggle_player_aeb(&mut self) {
        if let Some(mut player) = self.player.take() {
            let mut ctx = PlayerContext {
                analytics: &mut self.analytics,
                audio: self.audio.as_mut(),
                levels: &mut self.levels,
            };
            player.toggle_aeb(&mut ctx);
            self.player = Some(player);
        }
    }

    /// Forward raw control input to the player vehicle
    pub fn set_player_input(&mut self, throttle: f32, steer: f32, brake_value: f32) {
        if let Some(player) = &mut self.player {
            player.apply_input(throttle, steer, brake_value);
        }
    }

    /// Drain every path's respawn queue, spawning one agent per request
    fn consume_respawn_queues(&mut self) {
        for path_id in self.paths.ids() {
            loop {
                let request = match self.paths.get_mut(path_id).and_then(|p| p.pop_respawn()) {
                    Some(r) => r,
                    None => break,
                };
                let kind = request.kind.unwrap_or(AgentKind::Car);
                let direction = request.direction.unwrap_or(PathDirection::Forward);
                if let Err(err) = self.spawn_agent(path_id, kind, direction, request.speed) {
                    warn!("respawn on {path_id:?} failed: {err:#}");
                }
            }
        }
    }

    /// Sphere surfaces for every sensed entity except `exclude`
    fn obstacle_surfaces(&self, exclude: ObstacleRef) -> Vec<ObstacleSurface> {
        let mut surfaces = Vec::new();

        for agent in self.agents.values() {
            let target = ObstacleRef::Agent(agent.id);
            if target == exclude {
                continue;
            }
            surfaces.push(ObstacleSurface {
                classification: match agent.kind {
                    AgentKind::Car => Classification::Car,
                    AgentKind::Bicycle => Classification::Bicycle,
                },
                center: agent.body.position,
                radius: agent.body.bounding_length / 2.0,
                target,
            });
        }

        for pedestrian in self.pedestrians.values() {
            surfaces.push(ObstacleSurface {
                classification: Classification::PedestrianOrPlayer,
                center: pedestrian.position,
                radius: pedestrian.radius,
                target: ObstacleRef::Pedestrian(pedestrian.id),
            });
        }

        if exclude != ObstacleRef::Player {
            if let Some(player) = &self.player {
                surfaces.push(ObstacleSurface {
                    classification: Classification::PedestrianOrPlayer,
                    center: player.body.position,
                    radius: player.body.bounding_length / 2.0,
                    target: ObstacleRef::Player,
                });
            }
        }

        for semaphore in self.semaphores.values() {
            surfaces.push(ObstacleSurface {
                classification: Classification::Semaphore,
                center: semaphore.position,
                radius: 0.5,
                target: ObstacleRef::Semaphore(semaphore.id),
            });
        }

        surfaces
    }

    /// Resolve a raw sensor hit into the policy's view of the obstacle.
    /// Peers on a different path fall through to `None` (no rule fires).
    /// The player counts as a pedestrian for the traffic rules.
    fn resolve_detection(&self, own_path: PathId, hit: &SensorHit) -> DetectedObstacle {
        match hit.target {
            ObstacleRef::Agent(peer_id) => {
                let Some(peer) = self.agents.get(&peer_id) else {
                    return DetectedObstacle::None;
                };
                if peer.path_state.path != own_path {
                    return DetectedObstacle::None;
                }
                let state = PeerState {
                    velocity_magnitude: peer.body.velocity_magnitude(),
                    temporarily_stopped: peer.is_temporarily_stopped(),
                };
                match peer.kind {
                    AgentKind::Car => DetectedObstacle::Car {
                        distance: hit.distance,
                        peer: state,
                    },
                    AgentKind::Bicycle => DetectedObstacle::Bicycle {
                        distance: hit.distance,
                        peer: state,
                    },
                }
            }
            ObstacleRef::Pedestrian(_) | ObstacleRef::Player => {
                DetectedObstacle::PedestrianOrPlayer {
                    distance: hit.distance,
                }
            }
            ObstacleRef::Semaphore(id) => match self.semaphores.get(&id) {
                Some(semaphore) => DetectedObstacle::Semaphore {
                    distance: hit.distance,
                    view: SemaphoreView {
                        can_go: semaphore.can_go(),
                        flickering: semaphore.is_flickering(),
                    },
                },
                None => DetectedObstacle::None,
            },
            ObstacleRef::Static => DetectedObstacle::None,
        }
    }

    /// Whether a position is past any semaphore's stop line
    fn inside_any_semaphore_zone(&self, position: &Position) -> bool {
        self.semaphores
            .values()
            .any(|s| position.horizontal_distance(&s.position) < s.zone_radius)
    }

    /// Variable-rate tick: forward sensing and heading orientation for every
    /// agent, plus the player's AEB detection episode bookkeeping.
    pub fn sense_tick(&mut self, delta_secs: f32) {
        let agent_ids: Vec<AgentId> = self.agents.keys().copied().collect();
        for agent_id in agent_ids {
            if let Some(mut agent) = self.agents.remove(&agent_id) {
                let obstacles = self.obstacle_surfaces(ObstacleRef::Agent(agent_id));
                agent.sense(delta_secs, &obstacles);
                self.agents.insert(agent_id, agent);
            }
        }

        if let Some(mut player) = self.player.take() {
            let obstacles = self.obstacle_surfaces(ObstacleRef::Player);
            let mut ctx = PlayerContext {
                analytics: &mut self.analytics,
                audio: self.audio.as_mut(),
                levels: &mut self.levels,
            };
            player.sense(self.time, &obstacles, &mut ctx);
            self.player = Some(player);
        }
    }

    /// Fixed-rate tick: all decision logic and physics integration
    pub fn fixed_tick(&mut self, delta_secs: f32) {
        self.time += delta_secs;

        // Level overlay task
        if self.fade.update(delta_secs) && self.pending_level_advance {
            self.pending_level_advance = false;
            if self.levels.advance_level() {
                self.start_level(self.levels.current_level());
            } else {
                info!("session complete: {}", self.analytics.summary());
            }
        }

        for semaphore in self.semaphores.values_mut() {
            semaphore.update(delta_secs);
        }

        self.consume_respawn_queues();
        self.update_agents(delta_secs);
        self.update_player(delta_secs);
        self.integrate(delta_secs);
        self.check_player_contacts();
    }

    /// Per-agent decision logic and speed control
    fn update_agents(&mut self, delta_secs: f32) {
        let agent_ids: Vec<AgentId> = self.agents.keys().copied().collect();

        for agent_id in agent_ids {
            // Remove the agent while updating to keep peer lookups simple
            if let Some(mut agent) = self.agents.remove(&agent_id) {
                agent.inside_semaphore = self.inside_any_semaphore_zone(&agent.body.position);

                let detection = match agent.latest_hit() {
                    Some(hit) => self.resolve_detection(agent.path_state.path, hit),
                    None => DetectedObstacle::None,
                };

                match agent.update_fixed(delta_secs, &detection, &mut self.paths) {
                    AgentUpdateResult::Continue => {
                        self.agents.insert(agent_id, agent);
                    }
                    AgentUpdateResult::Completed => {
                        debug!("agent {agent_id:?} completed its path");
                    }
                    AgentUpdateResult::RolledOver => {
                        info!("agent {agent_id:?} removed after rollover");
                    }
                }
            }
        }
    }

    /// Player reaction measurement, motion, overspeed and recovery
    fn update_player(&mut self, delta_secs: f32) {
        let Some(mut player) = self.player.take() else {
            return;
        };
        let mut ctx = PlayerContext {
            analytics: &mut self.analytics,
            audio: self.audio.as_mut(),
            levels: &mut self.levels,
        };
        player.update_reaction(self.time, &mut ctx);
        player.update_movement(delta_secs);
        player.update_overspeed(&mut ctx);
        player.update_recovery(delta_secs, &mut ctx);
        self.player = Some(player);
    }

    /// Velocity-based movement for the traffic agents. The player vehicle
    /// integrates its own translation.
    fn integrate(&mut self, delta_secs: f32) {
        for agent in self.agents.values_mut() {
            agent.body.position.x += agent.body.velocity.x * delta_secs;
            agent.body.position.y += agent.body.velocity.y * delta_secs;
            agent.body.position.z += agent.body.velocity.z * delta_secs;
        }
    }

    /// Contact notification for the player: first overlap with any
    /// obstacle-classified surface reports a collision.
    fn check_player_contacts(&mut self) {
        let Some(player) = &self.player else {
            return;
        };
        let player_pos = player.body.position;
        let player_radius = player.body.bounding_length / 2.0;

        let contact = self
            .obstacle_surfaces(ObstacleRef::Player)
            .into_iter()
            .find(|surface| {
                surface.classification != Classification::Semaphore
                    && player_pos.horizontal_distance(&surface.center)
                        <= player_radius + surface.radius
            });

        if let Some(surface) = contact {
            if let Some(mut player) = self.player.take() {
                let mut ctx = PlayerContext {
                    analytics: &mut self.analytics,
                    audio: self.audio.as_mut(),
                    levels: &mut self.levels,
                };
                player.on_collision(self.time, surface.classification, &mut ctx);
                self.player = Some(player);
            }
        }
    }

    /// Print a summary of the world state
    pub fn print_summary(&self) {
        println!("=== Driving Simulation Summary ===");
        println!("Time: {:.2}s", self.time);
        println!(
            "Paths: {}, Agents: {}, Pedestrians: {}, Semaphores: {}",
            self.paths.ids().len(),
            self.agents.len(),
            self.pedestrians.len(),
            self.semaphores.len()
        );

        if !self.agents.is_empty() {
            println!("--- Agents ---");
            for agent in self.agents.values() {
                println!(
                    "  {:?} {:?}: speed={:.1}/{:.1}, target_index={}, stopped={}, turn_brake={}",
                    agent.kind,
                    agent.id.0,
                    agent.current_speed,
                    agent.start_speed,
                    agent.path_state.target_index,
                    agent.is_temporarily_stopped(),
                    agent.turn_brake,
                );
            }
        }

        if let Some(player) = &self.player {
            println!("--- Player ---");
            println!(
                "  speed={:.1} ({:.0} km/h), engine={:?}, AEB={} (braking={}), activations={}",
                player.current_speed,
                player.current_speed_kph(),
                player.engine_stage(),
                player.is_aeb_enabled(),
                player.is_aeb_braking(),
                player.aeb_activation_count(),
            );
        }

        println!("--- Analytics ---");
        println!("  {}", self.analytics.summary());
    }

    /// Create a small demo world: a looping ring road with cars and a
    /// bicycle, a pedestrian crossing with a semaphore, and the player.
    pub fn create_demo_world(seed: u64) -> Result<Self> {
        let mut world = SimWorld::new_with_seed(seed);

        // Rectangular ring road
        let ring = world.add_path(
            vec![
                Position::new(0.0, 0.0, 0.0),
                Position::new(60.0, 0.0, 0.0),
                Position::new(60.0, 0.0, 40.0),
                Position::new(0.0, 0.0, 40.0),
            ],
            true,
        );

        // Open avenue crossing the ring
        let avenue = world.add_path(
            vec![
                Position::new(30.0, 0.0, -20.0),
                Position::new(30.0, 0.0, 20.0),
                Position::new(30.0, 0.0, 60.0),
            ],
            false,
        );

        world.add_semaphore(Position::new(30.0, 0.0, 0.0));
        world.add_pedestrian(Position::new(32.0, 0.0, 1.0));
        world.add_pedestrian(Position::new(28.0, 0.0, 39.0));

        world.spawn_agent(ring, AgentKind::Car, PathDirection::Forward, None)?;
        world.spawn_agent(ring, AgentKind::Bicycle, PathDirection::Forward, None)?;
        world.spawn_agent(avenue, AgentKind::Car, PathDirection::Forward, None)?;

        let spawn = Pose::new(Position::new(10.0, 0.0, 20.0), Position::new(1.0, 0.0, 0.0));
        let mid = Pose::new(Position::new(50.0, 0.0, 20.0), Position::new(-1.0, 0.0, 0.0));
        let last = Pose::new(Position::new(30.0, 0.0, 50.0), Position::new(0.0, 0.0, -1.0));
        world.set_levels(LevelSet::new(vec![spawn, mid, last]));

        let body = AgentBody::new(spawn.position, spawn.heading, 4.0, 4);
        world.set_player(PlayerVehicle::new(body, Default::default()));
        world.start_level(1);

        Ok(world)
    }
}
