//! Render graph
//!
//! Buses and voices live on the audio thread inside the [`Renderer`]; the
//! control side describes changes as [`GraphCommand`]s and learns about
//! voice completion through [`GraphEvent`]s.

pub mod bus;
pub mod command;
pub mod renderer;
pub mod voice;

pub use bus::Bus;
pub use command::{command_channel, event_channel, GraphCommand, GraphEvent, COMMAND_QUEUE_CAPACITY};
pub use renderer::{ContextAtomics, Renderer, MASTER_GAIN, MAX_BLOCK_FRAMES};
pub use voice::{Partial, SharedKernel, Voice, VoicePath, SEND_DRY, SEND_WET};
