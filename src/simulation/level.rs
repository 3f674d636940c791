//! Level spawn points and the intro/cleared fade sequence
//!
//! The level set is owned by the world and handed to the controllers that
//! need it; nothing resolves it through shared state. Fades are explicit
//! phase tasks stepped from the fixed tick.

use log::debug;

use crate::simulation::types::Pose;

/// Ordered spawn poses, one per level, plus the current level counter
#[derive(Debug, Clone, Default)]
pub struct LevelSet {
    spawns: Vec<Pose>,
    current_level: usize,
}

impl LevelSet {
    pub fn new(spawns: Vec<Pose>) -> Self {
        Self {
            spawns,
            current_level: 1,
        }
    }

    /// The active level, 1-based.
    pub fn current_level(&self) -> usize {
        self.current_level
    }

    pub fn level_count(&self) -> usize {
        self.spawns.len()
    }

    pub fn spawn_point_for(&self, level: usize) -> Option<Pose> {
        self.spawns.get(level.checked_sub(1)?).copied()
    }

    /// Move to the next level. Returns false once every level is cleared.
    pub fn advance_level(&mut self) -> bool {
        self.current_level += 1;
        if self.current_level > self.spawns.len() {
            debug!("all levels complete");
            return false;
        }
        true
    }
}

/// Phase of a level overlay fade
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FadePhase {
    Idle,
    /// Overlay fully visible, message showing
    Showing,
    /// Overlay fading toward its resting alpha
    Fading,
}

/// Timed intro/cleared overlay sequence. Holds the message for a fixed
/// duration, then fades, then goes idle. Independent of both tick rates'
/// decision logic; never blocks either.
#[derive(Debug, Clone)]
pub struct FadeTask {
    phase: FadePhase,
    timer: f32,
    pub alpha: f32,
    pub message: String,
    /// Alpha the fade settles at (0 for intros, 1 for cleared overlays)
    target_alpha: f32,
    pub hold_secs: f32,
    pub fade_secs: f32,
}

impl Default for FadeTask {
    fn default() -> Self {
        Self {
            phase: FadePhase::Idle,
            timer: 0.0,
            alpha: 0.0,
            message: String::new(),
            target_alpha: 0.0,
            hold_secs: 3.0,
            fade_secs: 3.0,
        }
    }
}

impl FadeTask {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn phase(&self) -> FadePhase {
        self.phase
    }

    pub fn is_idle(&self) -> bool {
        self.phase == FadePhase::Idle
    }

    /// Begin a level-intro sequence: overlay at full, fading to clear.
    pub fn start_intro(&mut self, level: usize) {
        self.message = format!("Level {level}");
        self.alpha = 1.0;
        self.target_alpha = 0.0;
        self.timer = 0.0;
        self.phase = FadePhase::Showing;
    }

    /// Begin a level-cleared sequence: message shown, fading to opaque
    /// before the next level loads.
    pub fn start_cleared(&mut self, level: usize) {
        self.message = format!("Level {level} cleared");
        self.alpha = 0.0;
        self.target_alpha = 1.0;
        self.timer = 0.0;
        self.phase = FadePhase::Showing;
    }

    /// Advance one fixed tick. Returns true on the tick the task finishes.
    pub fn update(&mut self, delta_secs: f32) -> bool {
        match self.phase {
            FadePhase::Idle => false,
            FadePhase::Showing => {
                self.timer += delta_secs;
                if self.timer >= self.hold_secs {
                    self.timer = 0.0;
                    self.phase = FadePhase::Fading;
                }
                false
            }
            FadePhase::Fading => {
                self.timer += delta_secs;
                let t = (self.timer / self.fade_secs).min(1.0);
                let start = 1.0 - self.target_alpha;
                self.alpha = start + (self.target_alpha - start) * t;
                if self.timer >= self.fade_secs {
                    self.alpha = self.target_alpha;
                    self.phase = FadePhase::Idle;
                    true
                } else {
                    false
                }
            }
        }
    }
}
