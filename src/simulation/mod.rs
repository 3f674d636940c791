//! Driving-safety simulation core
//!
//! All of the simulation logic runs headless: waypoint-following traffic
//! agents, a player vehicle with Autonomous Emergency Braking, and the
//! reaction analytics fed by it. Callers drive two tick rates: a fixed
//! physics tick and a variable sensing tick.

mod agent;
mod analytics;
mod audio;
mod level;
mod path;
mod player;
mod policy;
mod semaphore;
mod sensor;
mod types;
mod world;

pub use agent::{AgentUpdateResult, TrafficAgent, ARRIVE_THRESHOLD};
pub use analytics::{CollisionKind, DriverAnalytics};
pub use audio::{AudioSink, NullAudio, RecordingAudio};
pub use level::{FadePhase, FadeTask, LevelSet};
pub use path::{AgentPathState, PathAdvance, PathSet, RespawnRequest, WaypointPath};
pub use player::{
    grade_reaction, EngineStage, PlayerConfig, PlayerContext, PlayerVehicle, ReactionGrade,
    RecoveryPhase,
};
pub use policy::{decide, DetectedObstacle, PeerState, PolicyInputs, SemaphoreView, SpeedDecision};
pub use semaphore::Semaphore;
pub use sensor::{cast, ObstacleRef, ObstacleSurface, SensorHit};
pub use types::{
    AgentBody, AgentId, AgentKind, Classification, PathDirection, PathId, PedestrianId, Pose,
    Position, SemaphoreId, SimId, DISTANCE_TO_BICYCLE, DISTANCE_TO_CAR, DISTANCE_TO_PEDESTRIAN,
    DISTANCE_TO_SEMAPHORE, MAX_TURN_ANGLE, ROLLOVER_TIMEOUT, SENSOR_RADIUS, SENSOR_RANGE,
};
pub use world::{Pedestrian, SimWorld};
