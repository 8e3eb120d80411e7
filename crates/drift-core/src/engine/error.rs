//! Engine error types

use thiserror::Error;

use crate::audio::AudioError;

#[derive(Error, Debug)]
pub enum EngineError {
    /// The audio output failed earlier; only `dispose` recovers
    #[error("Audio context is closed")]
    ContextClosed,

    /// The renderer has not drained the command ring; the command was dropped
    #[error("Render command queue full, dropped {0}")]
    CommandQueueFull(&'static str),

    #[error(transparent)]
    Audio(#[from] AudioError),
}

pub type EngineResult<T> = Result<T, EngineError>;
