//! Engine timing and limits

use serde::{Deserialize, Serialize};

use crate::graph::COMMAND_QUEUE_CAPACITY;

/// Engine configuration
///
/// All times are in seconds on the audio clock.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// How far ahead of the audio clock new notes are placed
    pub lookahead_secs: f64,
    /// Granularity of the timer pump (and of offline render blocks)
    pub timer_tick_secs: f64,
    /// Fade-out applied when a venue stops
    pub stop_fade_secs: f64,
    /// Ramp applied on volume changes
    pub volume_ramp_secs: f64,
    /// Upper bound on any send's reverb tail
    pub max_send_decay_secs: f32,
    /// Partition size of the convolution reverb (frames, rounded to a power of two)
    pub reverb_block_frames: usize,
    /// Capacity of the control → audio command ring
    pub command_queue_capacity: usize,
    /// Fixed seed for reproducible output (None = seeded from entropy)
    pub seed: Option<u64>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            lookahead_secs: 0.05,
            timer_tick_secs: 0.02,
            stop_fade_secs: 0.5,
            volume_ramp_secs: 0.1,
            max_send_decay_secs: 4.0,
            reverb_block_frames: 1024,
            command_queue_capacity: COMMAND_QUEUE_CAPACITY,
            seed: None,
        }
    }
}

impl EngineConfig {
    /// Deterministic config, used by offline rendering and tests
    pub fn seeded(seed: u64) -> Self {
        Self {
            seed: Some(seed),
            ..Default::default()
        }
    }

    /// Clamp out-of-range values into something the engine can run with
    pub fn sanitized(mut self) -> Self {
        self.lookahead_secs = self.lookahead_secs.clamp(0.0, 1.0);
        self.timer_tick_secs = self.timer_tick_secs.clamp(0.001, 0.25);
        self.stop_fade_secs = self.stop_fade_secs.clamp(0.0, 10.0);
        self.volume_ramp_secs = self.volume_ramp_secs.clamp(0.0, 10.0);
        self.max_send_decay_secs = self.max_send_decay_secs.clamp(0.05, 10.0);
        self.reverb_block_frames = self.reverb_block_frames.clamp(64, 8192);
        self.command_queue_capacity = self.command_queue_capacity.max(64);
        self
    }
}
