//! Audio backend error types

use thiserror::Error;

/// Errors that can occur while opening or running the audio output
#[derive(Error, Debug)]
pub enum AudioError {
    /// No audio devices available
    #[error("No audio output devices found")]
    NoDevices,

    /// Failed to get default device
    #[error("Failed to get default audio device: {0}")]
    NoDefaultDevice(String),

    /// Device not found
    #[error("Audio device not found: {0}")]
    DeviceNotFound(String),

    /// Failed to get device configuration
    #[error("Failed to get device config: {0}")]
    ConfigError(String),

    /// Failed to build audio stream
    #[error("Failed to build audio stream: {0}")]
    StreamBuildError(String),

    /// Failed to start/play stream (e.g. output blocked by the platform)
    #[error("Failed to start audio stream: {0}")]
    StreamPlayError(String),

    /// Operation needs the offline renderer but a device is attached
    #[error("Audio output is not offline")]
    NotOffline,
}

/// Result type for audio operations
pub type AudioResult<T> = Result<T, AudioError>;
