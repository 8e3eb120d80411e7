//! Audio output configuration
//!
//! Device selection and buffer settings, persisted as part of the player's
//! YAML config.

use serde::{Deserialize, Serialize};

/// Maximum callback buffer to pre-allocate (frames)
pub const MAX_BUFFER_SIZE: usize = 8192;

/// Default buffer size when no preference is specified (frames)
/// Ambient material is not latency sensitive, so err on the side of stability.
pub const DEFAULT_BUFFER_SIZE: u32 = 1024;

/// Default sample rate for the audio system (48kHz)
pub const DEFAULT_SAMPLE_RATE: u32 = 48000;

/// Preferred buffer size for audio streams
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum BufferSize {
    /// Let the system choose the default buffer size
    #[default]
    Default,
    /// Request a specific buffer size in frames (may be adjusted by the system)
    Fixed(u32),
    /// Smallest size known to be stable on common hardware
    LowLatency,
}

impl BufferSize {
    /// Get the buffer size in frames, or None for system default
    pub fn as_frames(&self) -> Option<u32> {
        match self {
            BufferSize::Default => None,
            BufferSize::Fixed(frames) => Some(*frames),
            BufferSize::LowLatency => Some(256),
        }
    }

    /// Calculate latency in milliseconds for a given sample rate
    pub fn latency_ms(&self, sample_rate: u32) -> Option<f32> {
        self.as_frames()
            .map(|frames| (frames as f32 / sample_rate as f32) * 1000.0)
    }
}

/// Audio device identifier
///
/// Includes both the device name and the host backend (JACK, ALSA, etc.)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceId {
    /// Device name as reported by the system
    pub name: String,
    /// Audio host identifier (e.g., "JACK", "ALSA", "CoreAudio")
    /// If None, every host is searched
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,
}

impl DeviceId {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            host: None,
        }
    }

    pub fn with_host(name: &str, host: &str) -> Self {
        Self {
            name: name.to_string(),
            host: Some(host.to_string()),
        }
    }

    /// Get a display label that includes the host if available
    pub fn display_label(&self) -> String {
        match &self.host {
            Some(host) => format!("[{}] {}", host, self.name),
            None => self.name.clone(),
        }
    }
}

/// Configuration for the device output
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AudioConfig {
    /// Output device (None = system default)
    pub device: Option<DeviceId>,
    /// Preferred buffer size
    pub buffer_size: BufferSize,
    /// Preferred sample rate (None = 48kHz when the device supports it)
    pub sample_rate: Option<u32>,
}

impl AudioConfig {
    pub fn with_sample_rate(mut self, rate: u32) -> Self {
        self.sample_rate = Some(rate);
        self
    }
}

/// Where the render graph's output goes
#[derive(Debug, Clone, PartialEq)]
pub enum OutputTarget {
    /// A real-time cpal output stream
    Device(AudioConfig),
    /// No device: the caller pulls frames explicitly (tests, file rendering)
    Offline { sample_rate: u32 },
}

impl Default for OutputTarget {
    fn default() -> Self {
        OutputTarget::Device(AudioConfig::default())
    }
}

impl OutputTarget {
    pub fn offline(sample_rate: u32) -> Self {
        OutputTarget::Offline { sample_rate }
    }

    pub fn is_offline(&self) -> bool {
        matches!(self, OutputTarget::Offline { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_buffer_size_latency() {
        assert_eq!(BufferSize::Default.as_frames(), None);
        let ms = BufferSize::Fixed(480).latency_ms(48000).unwrap();
        assert!((ms - 10.0).abs() < 1e-4);
    }

    #[test]
    fn test_device_label() {
        assert_eq!(DeviceId::new("hw:0").display_label(), "hw:0");
        assert_eq!(DeviceId::with_host("hw:0", "ALSA").display_label(), "[ALSA] hw:0");
    }

    #[test]
    fn test_audio_config_yaml_defaults() {
        let config: AudioConfig = serde_yaml::from_str("sample_rate: 44100\n").unwrap();
        assert_eq!(config.sample_rate, Some(44100));
        assert_eq!(config.buffer_size, BufferSize::Default);
        assert!(config.device.is_none());
    }
}
