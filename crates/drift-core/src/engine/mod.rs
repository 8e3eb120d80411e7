//! Venue playback engine
//!
//! The control side of the system: venue sessions, their self-rescheduling
//! pad/bass/melody layers and the public [`Engine`] that owns them.

pub mod engine;
pub mod error;
pub mod gc;
pub mod layers;
pub mod session;
pub mod synth;
pub mod timer;

pub use engine::{percent_to_gain, Engine};
pub use error::{EngineError, EngineResult};
pub use gc::gc_handle;
pub use session::{LayerActivity, LiveVoice, SessionState, VenueSession};
pub use synth::{Envelope, LayerContext, Plateau, Release, Route, Tone, VoiceRequest};
pub use timer::{TimerEntry, TimerHandle, TimerQueue};
