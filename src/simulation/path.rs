//! Waypoint paths and per-agent traversal state
//!
//! Paths are fixed, ordered point sequences. Each path owns a pending-respawn
//! queue: agents that run off the end of a non-looping path append a request,
//! and the world's spawner drains the queue at the path's start point.

use std::collections::{HashMap, VecDeque};

use crate::simulation::types::{AgentKind, PathDirection, PathId, Position, SimId};

/// Parameters for an agent respawn queued on a path
#[derive(Debug, Clone, Default)]
pub struct RespawnRequest {
    /// Kind of agent to respawn; the spawner defaults to a car
    pub kind: Option<AgentKind>,
    /// Traversal direction for the respawned agent; defaults to forward
    pub direction: Option<PathDirection>,
    /// Free-run speed override; the spawner jitters one when absent
    pub speed: Option<f32>,
}

/// An ordered waypoint sequence with a loop flag and a respawn queue
#[derive(Debug, Clone)]
pub struct WaypointPath {
    pub id: PathId,
    points: Vec<Position>,
    loop_path: bool,
    respawn_queue: VecDeque<RespawnRequest>,
}

impl WaypointPath {
    pub fn new(id: PathId, points: Vec<Position>, loop_path: bool) -> Self {
        Self {
            id,
            points,
            loop_path,
            respawn_queue: VecDeque::new(),
        }
    }

    pub fn point_at(&self, index: usize) -> Option<Position> {
        self.points.get(index).copied()
    }

    pub fn start_point(&self) -> Option<Position> {
        self.points.first().copied()
    }

    pub fn point_count(&self) -> usize {
        self.points.len()
    }

    /// Index of the final waypoint
    pub fn last_index(&self) -> usize {
        self.points.len().saturating_sub(1)
    }

    pub fn is_looping(&self) -> bool {
        self.loop_path
    }

    /// Append a respawn request. Order of appends is preserved.
    pub fn enqueue_respawn(&mut self, params: RespawnRequest) {
        self.respawn_queue.push_back(params);
    }

    pub fn pop_respawn(&mut self) -> Option<RespawnRequest> {
        self.respawn_queue.pop_front()
    }

    pub fn pending_respawns(&self) -> usize {
        self.respawn_queue.len()
    }
}

/// The Path Provider: owns every waypoint path in the world
#[derive(Debug, Default)]
pub struct PathSet {
    paths: HashMap<PathId, WaypointPath>,
    next_id: usize,
}

impl PathSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_path(&mut self, points: Vec<Position>, loop_path: bool) -> PathId {
        let id = PathId(SimId(self.next_id));
        self.next_id += 1;
        self.paths.insert(id, WaypointPath::new(id, points, loop_path));
        id
    }

    pub fn get(&self, id: PathId) -> Option<&WaypointPath> {
        self.paths.get(&id)
    }

    pub fn get_mut(&mut self, id: PathId) -> Option<&mut WaypointPath> {
        self.paths.get_mut(&id)
    }

    pub fn ids(&self) -> Vec<PathId> {
        self.paths.keys().copied().collect()
    }
}

/// Outcome of a waypoint arrival
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathAdvance {
    /// Moved on to the next waypoint
    Continue,
    /// Reached the terminus of a non-looping path; the agent should queue
    /// its respawn request and be removed
    Completed,
}

/// Per-agent traversal state over a [`WaypointPath`]
#[derive(Debug, Clone)]
pub struct AgentPathState {
    pub path: PathId,
    pub target_index: usize,
    pub direction: PathDirection,
    /// Cached current target point
    pub target_pos: Position,
    /// Cached point after the current target, used for turn braking
    pub next_target_pos: Option<Position>,
    /// Horizontal distance at which the target counts as reached
    pub arrive_threshold: f32,
}

impl AgentPathState {
    /// Start traversal at the path terminus matching `direction`.
    pub fn new(path: &WaypointPath, direction: PathDirection, arrive_threshold: f32) -> Option<Self> {
        let start_index = match direction {
            PathDirection::Forward => 0,
            PathDirection::Backward => path.last_index(),
        };
        let target_pos = path.point_at(start_index)?;
        let mut state = Self {
            path: path.id,
            target_index: start_index,
            direction,
            target_pos,
            next_target_pos: None,
            arrive_threshold,
        };
        state.refresh_next_target(path);
        Some(state)
    }

    /// Index of the waypoint after the current target, honouring direction
    /// and loop wrap. `None` at the terminus of a non-looping path.
    fn following_index(&self, path: &WaypointPath) -> Option<usize> {
        match self.direction {
            PathDirection::Forward => {
                if self.target_index < path.last_index() {
                    Some(self.target_index + 1)
                } else if path.is_looping() {
                    Some(0)
                } else {
                    None
                }
            }
            PathDirection::Backward => {
                if self.target_index > 0 {
                    Some(self.target_index - 1)
                } else if path.is_looping() {
                    Some(path.last_index())
                } else {
                    None
                }
            }
        }
    }

    fn refresh_next_target(&mut self, path: &WaypointPath) {
        self.next_target_pos = self
            .following_index(path)
            .and_then(|i| path.point_at(i));
    }

    /// Point to aim the heading at while inside the approach radius of the
    /// current target: the following waypoint when one exists.
    pub fn lookahead_point(&self, path: &WaypointPath) -> Option<Position> {
        self.following_index(path).and_then(|i| path.point_at(i))
    }

    /// Whether the approach-radius prefetch applies at all: always on loops,
    /// and away from the termini of open paths.
    pub fn can_prefetch(&self, path: &WaypointPath) -> bool {
        path.is_looping() || (self.target_index > 0 && self.target_index < path.last_index())
    }

    /// Advance to the next waypoint after arriving at the current target.
    /// Reports [`PathAdvance::Completed`] at the terminus of a non-looping
    /// path.
    pub fn advance(&mut self, path: &WaypointPath) -> PathAdvance {
        match self.following_index(path) {
            Some(next) => {
                self.target_index = next;
                if let Some(pos) = path.point_at(next) {
                    self.target_pos = pos;
                }
                self.refresh_next_target(path);
                PathAdvance::Continue
            }
            None => PathAdvance::Completed,
        }
    }
}
