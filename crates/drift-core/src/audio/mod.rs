//! Audio output for Drift
//!
//! The render graph runs either on a cpal device callback or offline, pulled
//! explicitly by the caller. Both follow the same lock-free design:
//!
//! - **Control thread**: sends graph commands via a lock-free ring buffer
//! - **Audio thread**: owns the [`Renderer`](crate::graph::Renderer) exclusively
//! - **Atomics**: the control side reads the audio clock via relaxed atomics
//!
//! ```ignore
//! use drift_core::audio::{AudioContext, OutputTarget};
//!
//! let mut ctx = AudioContext::open(&OutputTarget::default(), 4096)?;
//! println!("clock: {:.3}s", ctx.current_time());
//! ```

mod backend;
mod config;
mod context;
mod cpal_backend;
mod device;
mod error;
mod offline;

pub use backend::{start_output, AudioHandle};
pub use config::{
    AudioConfig, BufferSize, DeviceId, OutputTarget, DEFAULT_BUFFER_SIZE, DEFAULT_SAMPLE_RATE,
    MAX_BUFFER_SIZE,
};
pub use context::AudioContext;
pub use cpal_backend::CpalAudioHandle;
pub use device::{find_device_by_id, get_output_devices, AudioDevice};
pub use error::{AudioError, AudioResult};
pub use offline::OfflineOutput;
