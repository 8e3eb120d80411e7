//! Audio context: the control side's view of a running render graph
//!
//! Owns the output handle and the control ends of the command/event rings,
//! and exposes the audio clock (frames rendered / sample rate).

use std::collections::VecDeque;
use std::sync::Arc;

use super::backend::{start_output, AudioHandle};
use super::config::OutputTarget;
use super::error::AudioResult;
use crate::graph::{command_channel, event_channel, ContextAtomics, GraphCommand, GraphEvent, Renderer};
use crate::types::{frames_to_seconds, BusId, StereoBuffer, VoiceId};

pub struct AudioContext {
    handle: AudioHandle,
    commands: rtrb::Producer<GraphCommand>,
    events: rtrb::Consumer<GraphEvent>,
    atomics: Arc<ContextAtomics>,
    sample_rate: u32,
    next_node_id: u64,
    /// Teardown commands waiting for room in the ring, in order
    deferred: VecDeque<GraphCommand>,
}

impl AudioContext {
    /// Build the render graph and start its output
    pub fn open(target: &OutputTarget, command_capacity: usize) -> AudioResult<Self> {
        let (commands, command_rx) = command_channel(command_capacity);
        let (event_tx, events) = event_channel();
        let atomics = Arc::new(ContextAtomics::new());

        let renderer_atomics = atomics.clone();
        let handle = start_output(target, move |sample_rate| {
            Renderer::new(sample_rate, command_rx, event_tx, renderer_atomics)
        })?;
        let sample_rate = handle.sample_rate();

        log::info!("Audio context running ({})", handle.description());

        Ok(Self {
            handle,
            commands,
            events,
            atomics,
            sample_rate,
            next_node_id: 1,
            deferred: VecDeque::new(),
        })
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Audio clock in frames
    pub fn current_frame(&self) -> u64 {
        self.atomics.frames_rendered()
    }

    /// Audio clock in seconds
    pub fn current_time(&self) -> f64 {
        frames_to_seconds(self.current_frame(), self.sample_rate)
    }

    pub fn is_closed(&self) -> bool {
        self.atomics.is_closed()
    }

    pub fn atomics(&self) -> &Arc<ContextAtomics> {
        &self.atomics
    }

    pub fn handle(&self) -> &AudioHandle {
        &self.handle
    }

    pub fn next_voice_id(&mut self) -> VoiceId {
        let id = self.next_node_id;
        self.next_node_id += 1;
        VoiceId(id)
    }

    pub fn next_bus_id(&mut self) -> BusId {
        let id = self.next_node_id;
        self.next_node_id += 1;
        BusId(id)
    }

    /// Queue a command for the renderer; a full queue hands it back
    pub fn send(&mut self, command: GraphCommand) -> Result<(), GraphCommand> {
        self.commands.push(command).map_err(|rtrb::PushError::Full(c)| c)
    }

    /// Queue a command that must not be lost
    ///
    /// If the ring is full (or older deferred commands are still waiting) the
    /// command is kept and retried by [`flush_deferred`](Self::flush_deferred).
    pub fn send_or_defer(&mut self, command: GraphCommand) {
        if !self.deferred.is_empty() {
            self.deferred.push_back(command);
            return;
        }
        if let Err(command) = self.send(command) {
            log::debug!("Command ring full, deferring {}", command.name());
            self.deferred.push_back(command);
        }
    }

    /// Retry deferred commands; returns how many are still waiting
    pub fn flush_deferred(&mut self) -> usize {
        while let Some(command) = self.deferred.pop_front() {
            if let Err(command) = self.send(command) {
                self.deferred.push_front(command);
                break;
            }
        }
        self.deferred.len()
    }

    /// Next event reported by the renderer
    pub fn poll_event(&mut self) -> Option<GraphEvent> {
        self.events.pop().ok()
    }

    /// Render `frames` frames on an offline output, appending them to `out`
    pub fn render_offline(&mut self, frames: usize, out: &mut StereoBuffer) -> AudioResult<()> {
        self.handle.render_offline(frames, out)
    }
}
