//! Audio cue sink
//!
//! Cues are identified by plain strings. An unbound sink is a silent no-op,
//! never an error.

use log::debug;

/// Receiver for one-shot audio cues
pub trait AudioSink {
    fn play(&mut self, cue: &str);
}

/// Default sink: logs the cue and does nothing else
#[derive(Debug, Default)]
pub struct NullAudio;

impl AudioSink for NullAudio {
    fn play(&mut self, cue: &str) {
        debug!("audio cue: {cue}");
    }
}

/// Test sink that records every cue it receives
#[derive(Debug, Default)]
pub struct RecordingAudio {
    pub cues: Vec<String>,
}

impl AudioSink for RecordingAudio {
    fn play(&mut self, cue: &str) {
        self.cues.push(cue.to_string());
    }
}
