//! Audio-thread side of the render graph
//!
//! The renderer owns every bus and voice exclusively. Each block it applies
//! queued commands, renders the buses in parallel, mixes them into the
//! output and reports voice/bus lifecycle events back to the control side.

use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};
use std::sync::Arc;

use basedrop::Owned;
use rayon::prelude::*;

use super::bus::Bus;
use super::command::{GraphCommand, GraphEvent};
use crate::types::{StereoSample, SAMPLE_RATE};

/// Largest block rendered in one pass; bigger requests are split
pub const MAX_BLOCK_FRAMES: usize = 8192;

/// Bus slots reserved so adding a venue does not reallocate
const BUS_CAPACITY: usize = 32;

/// Fixed master output gain
pub const MASTER_GAIN: f32 = 1.0;

/// Lock-free render state for the control side
///
/// The audio thread writes these once per block; everything else only
/// reads. All operations use `Ordering::Relaxed` since readers only need
/// eventual visibility.
pub struct ContextAtomics {
    /// Frames rendered since the context was created (the audio clock)
    pub frames_rendered: AtomicU64,
    /// Voices still attached to a bus, including draining tails
    pub live_voices: AtomicU32,
    /// Buses attached to the master output
    pub live_buses: AtomicU32,
    /// Voices ever attached
    pub voices_started: AtomicU64,
    /// Master peak of the last block (f32 bits)
    pub master_peak: AtomicU32,
    /// Lifecycle events lost to a full event ring
    pub dropped_events: AtomicU64,
    /// The output failed; the context can no longer render
    pub closed: AtomicBool,
}

impl ContextAtomics {
    pub fn new() -> Self {
        Self {
            frames_rendered: AtomicU64::new(0),
            live_voices: AtomicU32::new(0),
            live_buses: AtomicU32::new(0),
            voices_started: AtomicU64::new(0),
            master_peak: AtomicU32::new(0),
            dropped_events: AtomicU64::new(0),
            closed: AtomicBool::new(false),
        }
    }

    #[inline]
    pub fn frames_rendered(&self) -> u64 {
        self.frames_rendered.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn live_voices(&self) -> u32 {
        self.live_voices.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn live_buses(&self) -> u32 {
        self.live_buses.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn voices_started(&self) -> u64 {
        self.voices_started.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn master_peak(&self) -> f32 {
        f32::from_bits(self.master_peak.load(Ordering::Relaxed))
    }

    #[inline]
    pub fn dropped_events(&self) -> u64 {
        self.dropped_events.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Relaxed)
    }

    pub fn mark_closed(&self) {
        self.closed.store(true, Ordering::Relaxed);
    }
}

impl Default for ContextAtomics {
    fn default() -> Self {
        Self::new()
    }
}

/// Renders all venue buses into one stereo output
pub struct Renderer {
    sample_rate: u32,
    frame: u64,
    buses: Vec<Owned<Bus>>,
    commands: rtrb::Consumer<GraphCommand>,
    events: rtrb::Producer<GraphEvent>,
    atomics: Arc<ContextAtomics>,
}

impl Renderer {
    pub fn new(
        sample_rate: u32,
        commands: rtrb::Consumer<GraphCommand>,
        events: rtrb::Producer<GraphEvent>,
        atomics: Arc<ContextAtomics>,
    ) -> Self {
        Self {
            sample_rate: if sample_rate == 0 { SAMPLE_RATE } else { sample_rate },
            frame: 0,
            buses: Vec::with_capacity(BUS_CAPACITY),
            commands,
            events,
            atomics,
        }
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Frames rendered so far
    pub fn frame(&self) -> u64 {
        self.frame
    }

    pub fn atomics(&self) -> &Arc<ContextAtomics> {
        &self.atomics
    }

    /// Fill `out` with the next `out.len()` frames (real-time safe)
    pub fn process(&mut self, out: &mut [StereoSample]) {
        for chunk in out.chunks_mut(MAX_BLOCK_FRAMES) {
            self.process_block(chunk);
        }
    }

    fn process_block(&mut self, out: &mut [StereoSample]) {
        self.apply_commands();

        let frames = out.len();
        let block_start = self.frame;

        // Buses are independent: render them in parallel
        if self.buses.len() > 1 {
            self.buses
                .par_iter_mut()
                .for_each(|bus| bus.render(frames, block_start));
        } else {
            for bus in self.buses.iter_mut() {
                bus.render(frames, block_start);
            }
        }

        out.fill(StereoSample::silence());
        for bus in self.buses.iter() {
            for (dst, src) in out.iter_mut().zip(bus.buffer().iter()) {
                *dst += *src * MASTER_GAIN;
            }
        }

        self.frame += frames as u64;
        self.collect_finished();
        self.publish(out);
    }

    fn apply_commands(&mut self) {
        while let Ok(command) = self.commands.pop() {
            match command {
                GraphCommand::AddBus(bus) => {
                    self.buses.push(bus);
                }
                GraphCommand::RampBusGain { bus, target, start, end } => {
                    if let Some(bus) = self.buses.iter_mut().find(|b| b.id() == bus) {
                        bus.ramp_gain(target, start, end);
                    }
                }
                GraphCommand::RemoveBus { bus, at } => {
                    if let Some(bus) = self.buses.iter_mut().find(|b| b.id() == bus) {
                        bus.schedule_removal(at);
                    }
                }
                GraphCommand::StartVoice(voice) => {
                    let bus_id = voice.bus();
                    match self.buses.iter_mut().find(|b| b.id() == bus_id) {
                        Some(bus) => {
                            bus.add_voice(voice);
                            self.atomics.voices_started.fetch_add(1, Ordering::Relaxed);
                        }
                        None => {
                            // Bus already gone: the voice never plays
                            report(
                                &mut self.events,
                                &self.atomics,
                                GraphEvent::VoiceEnded {
                                    bus: bus_id,
                                    voice: voice.id(),
                                },
                            );
                        }
                    }
                }
                GraphCommand::StopVoice { bus, voice, at } => {
                    if let Some(bus) = self.buses.iter_mut().find(|b| b.id() == bus) {
                        bus.stop_voice(voice, at);
                    }
                }
            }
        }
    }

    fn collect_finished(&mut self) {
        let now = self.frame;
        let events = &mut self.events;
        let atomics = &self.atomics;

        for bus in self.buses.iter_mut() {
            let bus_id = bus.id();
            bus.drain_ended(|voice| {
                report(events, atomics, GraphEvent::VoiceEnded { bus: bus_id, voice });
            });
            bus.retain_unfinished();

            if bus.remove_at().is_some_and(|at| at <= now) {
                bus.drain_unreported(|voice| {
                    report(events, atomics, GraphEvent::VoiceEnded { bus: bus_id, voice });
                });
                report(events, atomics, GraphEvent::BusRemoved { bus: bus_id });
            }
        }

        self.buses
            .retain(|bus| !bus.remove_at().is_some_and(|at| at <= now));
    }

    fn publish(&self, out: &[StereoSample]) {
        let peak = out.iter().map(|s| s.peak()).fold(0.0, f32::max);
        let voices: usize = self.buses.iter().map(|b| b.voice_count()).sum();
        self.atomics.frames_rendered.store(self.frame, Ordering::Relaxed);
        self.atomics.live_voices.store(voices as u32, Ordering::Relaxed);
        self.atomics.live_buses.store(self.buses.len() as u32, Ordering::Relaxed);
        self.atomics.master_peak.store(peak.to_bits(), Ordering::Relaxed);
    }
}

/// Push an event for the control side, counting it if the ring is full
#[inline]
fn report(events: &mut rtrb::Producer<GraphEvent>, atomics: &ContextAtomics, event: GraphEvent) {
    if events.push(event).is_err() {
        atomics.dropped_events.fetch_add(1, Ordering::Relaxed);
    }
}
