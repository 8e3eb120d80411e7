//! Output backends
//!
//! Both backends drive the same [`Renderer`]: the device backend from the
//! cpal callback thread, the offline backend from whoever calls
//! [`AudioHandle::render_offline`].

use super::config::OutputTarget;
use super::cpal_backend::{start_cpal_output, CpalAudioHandle};
use super::error::{AudioError, AudioResult};
use super::offline::OfflineOutput;
use crate::graph::Renderer;
use crate::types::StereoBuffer;

/// Handle to the active output
///
/// Keeps the stream alive (device) or owns the renderer (offline).
pub enum AudioHandle {
    Cpal(CpalAudioHandle),
    Offline(OfflineOutput),
}

impl AudioHandle {
    pub fn sample_rate(&self) -> u32 {
        match self {
            AudioHandle::Cpal(h) => h.sample_rate(),
            AudioHandle::Offline(o) => o.sample_rate(),
        }
    }

    /// Buffer size in frames (0 when offline)
    pub fn buffer_size(&self) -> u32 {
        match self {
            AudioHandle::Cpal(h) => h.buffer_size(),
            AudioHandle::Offline(_) => 0,
        }
    }

    pub fn latency_ms(&self) -> f32 {
        match self {
            AudioHandle::Cpal(h) => h.latency_ms(),
            AudioHandle::Offline(_) => 0.0,
        }
    }

    pub fn description(&self) -> String {
        match self {
            AudioHandle::Cpal(h) => format!("{} @ {}Hz", h.device_name(), h.sample_rate()),
            AudioHandle::Offline(o) => format!("offline @ {}Hz", o.sample_rate()),
        }
    }

    pub fn is_offline(&self) -> bool {
        matches!(self, AudioHandle::Offline(_))
    }

    /// Pull `frames` frames from an offline output, appending them to `out`
    pub fn render_offline(&mut self, frames: usize, out: &mut StereoBuffer) -> AudioResult<()> {
        match self {
            AudioHandle::Offline(o) => {
                o.render_into(frames, out);
                Ok(())
            }
            AudioHandle::Cpal(_) => Err(AudioError::NotOffline),
        }
    }
}

/// Start the output described by `target`
///
/// `build` receives the actual sample rate and returns the renderer to run.
pub fn start_output(
    target: &OutputTarget,
    build: impl FnOnce(u32) -> Renderer,
) -> AudioResult<AudioHandle> {
    match target {
        OutputTarget::Device(config) => start_cpal_output(config, build).map(AudioHandle::Cpal),
        OutputTarget::Offline { sample_rate } => {
            log::debug!("Starting offline output at {}Hz", sample_rate);
            Ok(AudioHandle::Offline(OfflineOutput::new(build(*sample_rate))))
        }
    }
}
