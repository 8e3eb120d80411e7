//! Lock-free messages between the control thread and the renderer
//!
//! Commands flow control → audio over one SPSC ring, events flow back over
//! another. Large payloads travel as `basedrop::Owned` pointers so every
//! message stays pointer-sized and no allocation happens on the audio side.

use basedrop::Owned;

use super::bus::Bus;
use super::voice::Voice;
use crate::types::{BusId, VoiceId};

/// Default capacity of the command ring
pub const COMMAND_QUEUE_CAPACITY: usize = 4096;

/// Capacity of the event ring
pub const EVENT_QUEUE_CAPACITY: usize = 4096;

/// Control → audio thread
pub enum GraphCommand {
    /// Attach a new venue bus
    AddBus(Owned<Bus>),
    /// Ramp a bus's gain linearly from its value at `start` to `target` at `end`
    RampBusGain {
        bus: BusId,
        target: f32,
        start: u64,
        end: u64,
    },
    /// Detach a bus and drop its voices once `at` has been rendered
    RemoveBus { bus: BusId, at: u64 },
    /// Attach a voice to its bus
    StartVoice(Owned<Voice>),
    /// Bring a voice's oscillator stop forward to `at`
    StopVoice { bus: BusId, voice: VoiceId, at: u64 },
}

impl GraphCommand {
    pub fn name(&self) -> &'static str {
        match self {
            GraphCommand::AddBus(_) => "AddBus",
            GraphCommand::RampBusGain { .. } => "RampBusGain",
            GraphCommand::RemoveBus { .. } => "RemoveBus",
            GraphCommand::StartVoice(_) => "StartVoice",
            GraphCommand::StopVoice { .. } => "StopVoice",
        }
    }
}

/// Audio → control thread
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GraphEvent {
    /// A voice's oscillator stopped (or its bus went away first)
    VoiceEnded { bus: BusId, voice: VoiceId },
    /// A bus was detached
    BusRemoved { bus: BusId },
}

/// Create the command ring
pub fn command_channel(
    capacity: usize,
) -> (rtrb::Producer<GraphCommand>, rtrb::Consumer<GraphCommand>) {
    rtrb::RingBuffer::new(capacity.max(1))
}

/// Create the event ring
pub fn event_channel() -> (rtrb::Producer<GraphEvent>, rtrb::Consumer<GraphEvent>) {
    rtrb::RingBuffer::new(EVENT_QUEUE_CAPACITY)
}
