//! Core types for the driving simulation
//!
//! Standalone types shared by the traffic agents, the player vehicle and the
//! world driver.

/// A unique identifier for simulation entities
/// This is a simple wrapper around a usize for type safety
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SimId(pub usize);

/// A wrapper type for traffic agent IDs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AgentId(pub SimId);

/// A wrapper type for waypoint path IDs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PathId(pub SimId);

/// A wrapper type for semaphore IDs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SemaphoreId(pub SimId);

/// A wrapper type for pedestrian IDs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PedestrianId(pub SimId);

/// Kind of traffic agent following a waypoint path
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AgentKind {
    /// Four-wheeled vehicle, steered via wheel angles
    Car,
    /// Two-wheeled vehicle, steered by rotating the body toward the target
    Bicycle,
}

/// Closed classification of surfaces the forward sensor can report
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification {
    Car,
    Bicycle,
    /// Covers both the player body and background pedestrians
    PedestrianOrPlayer,
    Semaphore,
    /// Surface present but none of the known kinds
    Other,
}

/// Traversal direction along a waypoint path
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathDirection {
    Forward,
    Backward,
}

/// A 3D position in the simulation
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Position {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Position {
    pub fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    pub fn distance(&self, other: &Position) -> f32 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        let dz = self.z - other.z;
        (dx * dx + dy * dy + dz * dz).sqrt()
    }

    /// Distance with both points projected onto the ground plane.
    /// Waypoint arrival checks ignore height differences.
    pub fn horizontal_distance(&self, other: &Position) -> f32 {
        let dx = self.x - other.x;
        let dz = self.z - other.z;
        (dx * dx + dz * dz).sqrt()
    }

    pub fn lerp(&self, other: &Position, t: f32) -> Position {
        Position {
            x: self.x + (other.x - self.x) * t,
            y: self.y + (other.y - self.y) * t,
            z: self.z + (other.z - self.z) * t,
        }
    }

    /// Unit vector from this position toward another, ground plane only.
    /// Returns `None` when the points coincide horizontally.
    pub fn direction_to(&self, other: &Position) -> Option<Position> {
        let dx = other.x - self.x;
        let dz = other.z - self.z;
        let len = (dx * dx + dz * dz).sqrt();
        if len > 1e-6 {
            Some(Position::new(dx / len, 0.0, dz / len))
        } else {
            None
        }
    }

    /// Dot product treating the position as a vector
    pub fn dot(&self, other: &Position) -> f32 {
        self.x * other.x + self.y * other.y + self.z * other.z
    }

    /// Rotate the vector by `degrees` about the up axis.
    pub fn rotated_about_up(&self, degrees: f32) -> Position {
        let rad = degrees.to_radians();
        let (sin, cos) = rad.sin_cos();
        Position::new(self.x * cos + self.z * sin, self.y, self.z * cos - self.x * sin)
    }

    /// Signed angle in degrees between two ground-plane vectors, measured
    /// about the up axis. Positive means `other` lies to the left of `self`.
    pub fn signed_angle_about_up(&self, other: &Position) -> f32 {
        let cross_y = self.z * other.x - self.x * other.z;
        let dot = self.x * other.x + self.z * other.z;
        cross_y.atan2(dot).to_degrees()
    }
}

impl Default for Position {
    fn default() -> Self {
        Self {
            x: 0.0,
            y: 0.0,
            z: 0.0,
        }
    }
}

/// A spawn pose: position plus a horizontal heading
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Pose {
    pub position: Position,
    pub heading: Position,
}

impl Pose {
    pub fn new(position: Position, heading: Position) -> Self {
        Self { position, heading }
    }
}

/// Minimal view of the external rigid body the controllers drive.
/// The integrator owns position writes; controllers set velocity and
/// steering, and read grounded wheel contact counts.
#[derive(Debug, Clone)]
pub struct AgentBody {
    pub position: Position,
    pub velocity: Position,
    /// Unit forward vector, ground plane
    pub heading: Position,
    /// Length of the bounding box along the heading axis
    pub bounding_length: f32,
    pub wheel_count: usize,
    pub grounded_wheels: usize,
    /// Front wheel steer angle in degrees (four-wheeled agents)
    pub steer_angle: f32,
}

impl AgentBody {
    pub fn new(
        position: Position,
        heading: Position,
        bounding_length: f32,
        wheel_count: usize,
    ) -> Self {
        Self {
            position,
            velocity: Position::default(),
            heading,
            bounding_length,
            wheel_count,
            grounded_wheels: wheel_count,
            steer_angle: 0.0,
        }
    }

    pub fn velocity_magnitude(&self) -> f32 {
        (self.velocity.x * self.velocity.x
            + self.velocity.y * self.velocity.y
            + self.velocity.z * self.velocity.z)
            .sqrt()
    }

    /// Origin of the forward sensor cast: half the bounding length ahead of
    /// the body centre, lifted slightly off the ground.
    pub fn sensor_origin(&self) -> Position {
        Position::new(
            self.position.x + self.heading.x * (self.bounding_length / 2.0 + 0.1),
            self.position.y + 0.5,
            self.position.z + self.heading.z * (self.bounding_length / 2.0 + 0.1),
        )
    }
}

/// Braking distance threshold for a car ahead
pub const DISTANCE_TO_CAR: f32 = 15.0;

/// Braking distance threshold for a bicycle ahead
pub const DISTANCE_TO_BICYCLE: f32 = 9.0;

/// Slow/stop distance threshold for a pedestrian or the player ahead
pub const DISTANCE_TO_PEDESTRIAN: f32 = 8.0;

/// Stop-line distance threshold for a semaphore ahead
pub const DISTANCE_TO_SEMAPHORE: f32 = 10.0;

/// Maximum range of the forward sensor cast
pub const SENSOR_RANGE: f32 = 20.0;

/// Radius of the forward sensor sphere cast
pub const SENSOR_RADIUS: f32 = 1.0;

/// Radius within which the following waypoint is prefetched while approaching
pub const PATH_APPROACH_DISTANCE: f32 = 5.0;

/// Radius within which the next-next waypoint is checked for turn braking
pub const TURN_LOOKAHEAD_DISTANCE: f32 = 10.0;

/// Heading deviation in degrees beyond which turn braking engages
pub const MAX_TURN_ANGLE: f32 = 8.0;

/// Seconds with zero grounded wheels before a rolled-over agent is removed
pub const ROLLOVER_TIMEOUT: f32 = 3.0;

/// Speeds below this snap to a full stop
pub const STOP_EPSILON: f32 = 0.15;

/// Steering clamp for four-wheeled agents, degrees
pub const MAX_STEER_ANGLE: f32 = 30.0;
