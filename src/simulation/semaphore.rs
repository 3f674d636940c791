//! Pedestrian-crossing semaphores
//!
//! Agents only consume the go/flicker flags; the cycle timer is a simple
//! green -> flicker -> red loop updated once per fixed tick.

use crate::simulation::types::{Position, SemaphoreId};

/// Phase of a semaphore cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SemaphorePhase {
    Green,
    Flicker,
    Red,
}

/// A traffic semaphore placed on an agent path
#[derive(Debug, Clone)]
pub struct Semaphore {
    pub id: SemaphoreId,
    pub position: Position,
    can_go: bool,
    flickering: bool,
    phase: SemaphorePhase,
    phase_timer: f32,
    pub green_secs: f32,
    pub flicker_secs: f32,
    pub red_secs: f32,
    /// Agents inside this radius count as past the stop line
    pub zone_radius: f32,
}

impl Semaphore {
    pub fn new(id: SemaphoreId, position: Position) -> Self {
        Self {
            id,
            position,
            can_go: true,
            flickering: false,
            phase: SemaphorePhase::Green,
            phase_timer: 0.0,
            green_secs: 12.0,
            flicker_secs: 3.0,
            red_secs: 8.0,
            zone_radius: 5.0,
        }
    }

    pub fn can_go(&self) -> bool {
        self.can_go
    }

    pub fn is_flickering(&self) -> bool {
        self.flickering
    }

    /// Force the light state directly, bypassing the cycle timer.
    pub fn set_state(&mut self, can_go: bool, flickering: bool) {
        self.can_go = can_go;
        self.flickering = flickering;
        self.phase = if flickering {
            SemaphorePhase::Flicker
        } else if can_go {
            SemaphorePhase::Green
        } else {
            SemaphorePhase::Red
        };
        self.phase_timer = 0.0;
    }

    /// Advance the cycle timer.
    pub fn update(&mut self, delta_secs: f32) {
        self.phase_timer += delta_secs;
        let (limit, next) = match self.phase {
            SemaphorePhase::Green => (self.green_secs, SemaphorePhase::Flicker),
            SemaphorePhase::Flicker => (self.flicker_secs, SemaphorePhase::Red),
            SemaphorePhase::Red => (self.red_secs, SemaphorePhase::Green),
        };
        if self.phase_timer >= limit {
            self.phase_timer = 0.0;
            self.phase = next;
            match next {
                SemaphorePhase::Green => {
                    self.can_go = true;
                    self.flickering = false;
                }
                SemaphorePhase::Flicker => {
                    self.can_go = true;
                    self.flickering = true;
                }
                SemaphorePhase::Red => {
                    self.can_go = false;
                    self.flickering = false;
                }
            }
        }
    }
}
