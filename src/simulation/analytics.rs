//! Driver performance analytics
//!
//! Fire-and-forget event sink fed by the player safety controller. Every
//! method is a plain field update so recording never blocks a tick.

/// Kind of collision reported to analytics
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CollisionKind {
    Pedestrian,
    Car,
}

/// Accumulated driver statistics for a session
#[derive(Debug, Clone, Default)]
pub struct DriverAnalytics {
    pub reaction_times: Vec<f32>,
    pub times_to_act: usize,
    pub braking_events: usize,
    pub accurate_stops: usize,
    pub pedestrians_detected: usize,
    pub times_to_collision: Vec<f32>,
    pub pedestrian_collisions: usize,
    pub car_collisions: usize,
    pub aeb_activations: usize,
}

impl DriverAnalytics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Clear every stat; called once at the start of the first level.
    pub fn reset_all_stats(&mut self) {
        *self = Self::default();
    }

    pub fn record_reaction_time(&mut self, seconds: f32) {
        self.reaction_times.push(seconds);
    }

    pub fn record_time_to_act(&mut self) {
        self.times_to_act += 1;
    }

    pub fn add_braking_event(&mut self) {
        self.braking_events += 1;
    }

    pub fn register_accurate_stop(&mut self) {
        self.accurate_stops += 1;
    }

    pub fn register_pedestrian_detected(&mut self) {
        self.pedestrians_detected += 1;
    }

    pub fn record_time_to_collision(&mut self, seconds: f32) {
        self.times_to_collision.push(seconds);
    }

    pub fn register_collision(&mut self, kind: CollisionKind) {
        match kind {
            CollisionKind::Pedestrian => self.pedestrian_collisions += 1,
            CollisionKind::Car => self.car_collisions += 1,
        }
    }

    pub fn increment_aeb_activations(&mut self) {
        self.aeb_activations += 1;
    }

    pub fn total_collisions(&self) -> usize {
        self.pedestrian_collisions + self.car_collisions
    }

    pub fn mean_reaction_time(&self) -> Option<f32> {
        if self.reaction_times.is_empty() {
            return None;
        }
        Some(self.reaction_times.iter().sum::<f32>() / self.reaction_times.len() as f32)
    }

    /// Get a summary string for display
    pub fn summary(&self) -> String {
        format!(
            "Reactions: {} (mean {:.2}s) | Braking events: {} | Accurate stops: {} | Collisions: {} | AEB activations: {}",
            self.reaction_times.len(),
            self.mean_reaction_time().unwrap_or(0.0),
            self.braking_events,
            self.accurate_stops,
            self.total_collisions(),
            self.aeb_activations,
        )
    }
}
