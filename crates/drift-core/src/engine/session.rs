//! Venue audio session
//!
//! Runtime state of one playing venue: its output bus, live voices, pending
//! layer timers and random generator. States run `Created -> Running ->
//! Stopped`; a stopped session is never reused.

use std::collections::HashMap;

use basedrop::{Owned, Shared};
use rand_pcg::Pcg32;

use super::gc::gc_handle;
use super::layers::{BassPlan, MelodyPlan, PadPlan};
use super::synth::{synthesize, LayerContext, Tone};
use super::timer::{TimerEntry, TimerHandle};
use super::error::EngineResult;
use crate::dsp::{create_reverb_impulse, ConvolutionKernel};
use crate::graph::{Bus, GraphCommand, SharedKernel, MAX_BLOCK_FRAMES};
use crate::preset::GenrePreset;
use crate::types::{seconds_to_frames, BusId, Layer, VoiceId, NUM_LAYERS};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Created,
    Running,
    Stopped,
}

/// A voice the renderer has not yet reported as ended
#[derive(Debug, Clone, PartialEq)]
pub struct LiveVoice {
    pub id: VoiceId,
    pub layer: Layer,
    /// Oscillators with the detune actually applied
    pub tones: Vec<Tone>,
    pub start: f64,
    pub stop: f64,
}

/// Per-layer bookkeeping
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct LayerActivity {
    pub invocations: u64,
    /// Time material from the last invocation was placed at
    pub last_at: Option<f64>,
    /// When the last invocation's material stops sounding
    pub last_end: Option<f64>,
}

pub struct VenueSession {
    id: u64,
    venue_id: String,
    preset: &'static GenrePreset,
    state: SessionState,
    volume: f32,
    bus: Option<BusId>,
    live_voices: Vec<LiveVoice>,
    pending: [Option<TimerHandle>; NUM_LAYERS],
    activity: [LayerActivity; NUM_LAYERS],
    rng: Pcg32,
    /// Reverb kernels keyed by impulse length in frames
    kernels: HashMap<u64, SharedKernel>,
}

impl VenueSession {
    pub(crate) fn new(
        id: u64,
        venue_id: &str,
        preset: &'static GenrePreset,
        volume: f32,
        rng: Pcg32,
    ) -> Self {
        Self {
            id,
            venue_id: venue_id.to_string(),
            preset,
            state: SessionState::Created,
            volume: volume.clamp(0.0, 1.0),
            bus: None,
            live_voices: Vec::new(),
            pending: [None; NUM_LAYERS],
            activity: [LayerActivity::default(); NUM_LAYERS],
            rng,
            kernels: HashMap::new(),
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn venue_id(&self) -> &str {
        &self.venue_id
    }

    pub fn preset(&self) -> &'static GenrePreset {
        self.preset
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn is_running(&self) -> bool {
        self.state == SessionState::Running
    }

    /// Output gain (0-1)
    pub fn volume(&self) -> f32 {
        self.volume
    }

    pub fn bus(&self) -> Option<BusId> {
        self.bus
    }

    pub fn live_voices(&self) -> &[LiveVoice] {
        &self.live_voices
    }

    pub fn pending_timer(&self, layer: Layer) -> Option<TimerHandle> {
        self.pending[layer as usize]
    }

    pub fn activity(&self, layer: Layer) -> LayerActivity {
        self.activity[layer as usize]
    }

    pub(crate) fn rng_mut(&mut self) -> &mut Pcg32 {
        &mut self.rng
    }

    pub(crate) fn register_voice(&mut self, voice: LiveVoice) {
        self.live_voices.push(voice);
    }

    /// Deregister a voice the renderer reported as ended
    pub(crate) fn on_voice_ended(&mut self, id: VoiceId) -> bool {
        match self.live_voices.iter().position(|v| v.id == id) {
            Some(index) => {
                self.live_voices.swap_remove(index);
                true
            }
            None => false,
        }
    }

    /// Kernel for a send with the given decay, capped and generated on first use
    pub(crate) fn reverb_kernel(&mut self, decay_secs: f32, cx: &LayerContext<'_>) -> SharedKernel {
        let sample_rate = cx.sample_rate();
        let decay = decay_secs.clamp(0.0, cx.config.max_send_decay_secs);
        let key = seconds_to_frames(decay as f64, sample_rate);

        if let Some(kernel) = self.kernels.get(&key) {
            return kernel.clone();
        }

        let impulse = create_reverb_impulse(sample_rate, decay, &mut self.rng);
        let kernel = Shared::new(
            &gc_handle(),
            ConvolutionKernel::normalized(&impulse, cx.config.reverb_block_frames),
        );
        log::debug!(
            "[{}] Reverb kernel: {:.2}s, {} partitions",
            self.venue_id,
            decay,
            kernel.partition_count()
        );
        self.kernels.insert(key, kernel.clone());
        kernel
    }

    /// Attach the output bus and kick off one invocation of every layer
    pub(crate) fn start(&mut self, cx: &mut LayerContext<'_>) -> EngineResult<()> {
        if self.state != SessionState::Created {
            return Ok(());
        }

        let bus = cx.audio.next_bus_id();
        cx.send(GraphCommand::AddBus(Owned::new(
            &gc_handle(),
            Bus::new(bus, self.volume, MAX_BLOCK_FRAMES),
        )))?;
        self.bus = Some(bus);
        self.state = SessionState::Running;

        let anchor = cx.audio.current_frame();
        for layer in Layer::ALL {
            self.run_layer(layer, anchor, cx);
        }
        Ok(())
    }

    /// Ramp the output gain to `volume` (0-1). No-op unless running.
    pub(crate) fn set_volume(&mut self, volume: f32, cx: &mut LayerContext<'_>) {
        let Some(bus) = self.bus.filter(|_| self.is_running()) else {
            return;
        };
        self.volume = volume.clamp(0.0, 1.0);

        let now = cx.audio.current_frame();
        let end = now + seconds_to_frames(cx.config.volume_ramp_secs, cx.sample_rate());
        if let Err(e) = cx.send(GraphCommand::RampBusGain {
            bus,
            target: self.volume,
            start: now,
            end,
        }) {
            log::warn!("[{}] Volume change lost: {}", self.venue_id, e);
        }
    }

    /// Stop scheduling, fade out and detach
    ///
    /// Cancels every pending layer timer, truncates live voices at
    /// now + fade, fades the bus to silence over the same window and removes
    /// it once the window has been rendered. Calling it again is a no-op.
    pub(crate) fn stop(&mut self, cx: &mut LayerContext<'_>) {
        if self.state == SessionState::Stopped {
            return;
        }
        let was_running = self.is_running();
        self.state = SessionState::Stopped;

        for handle in self.pending.iter_mut().filter_map(Option::take) {
            cx.timers.cancel(handle);
        }

        let Some(bus) = self.bus.filter(|_| was_running) else {
            return;
        };

        let now = cx.audio.current_frame();
        let at = now + seconds_to_frames(cx.config.stop_fade_secs, cx.sample_rate());
        for voice in &self.live_voices {
            cx.audio.send_or_defer(GraphCommand::StopVoice {
                bus,
                voice: voice.id,
                at,
            });
        }
        cx.audio.send_or_defer(GraphCommand::RampBusGain {
            bus,
            target: 0.0,
            start: now,
            end: at,
        });
        cx.audio.send_or_defer(GraphCommand::RemoveBus { bus, at });

        log::debug!(
            "[{}] Stopping: {} live voices fading over {:.2}s",
            self.venue_id,
            self.live_voices.len(),
            cx.config.stop_fade_secs
        );
    }

    /// Timer callback: the pending handle for `layer`, due at `fire_frame`,
    /// has fired
    pub(crate) fn on_timer(&mut self, layer: Layer, fire_frame: u64, cx: &mut LayerContext<'_>) {
        self.pending[layer as usize] = None;
        self.run_layer(layer, fire_frame, cx);
    }

    /// One invocation of a layer: plan, synthesize, schedule the next one
    ///
    /// The next invocation is due `delay` after `anchor_frame`, so late
    /// pumps do not push later cycles back.
    pub(crate) fn run_layer(&mut self, layer: Layer, anchor_frame: u64, cx: &mut LayerContext<'_>) {
        if !self.is_running() {
            return;
        }

        let now = cx.now();
        let (requests, end, delay) = match layer {
            Layer::Pad => {
                let plan = PadPlan::plan(self.preset, &mut self.rng);
                (vec![plan.voice(self.preset, now)], now + plan.total(), plan.next_delay())
            }
            Layer::Bass => {
                let plan = BassPlan::plan(self.preset, &mut self.rng);
                let voices = plan.voices(self.preset, now);
                let end = voices.iter().map(|v| v.stop).fold(now, f64::max);
                (voices, end, plan.next_delay())
            }
            Layer::Melody => {
                let plan = MelodyPlan::plan(self.preset, &mut self.rng);
                (plan.voices(self.preset, now), now + plan.phrase_end(), plan.next_delay())
            }
        };

        let requested = requests.len();
        let started = requests
            .into_iter()
            .filter_map(|request| synthesize(self, cx, request))
            .count();

        log::debug!(
            "[{}] {} at {:.3}s: {}/{} voices, next in {:.2}s",
            self.venue_id,
            layer.name(),
            now,
            started,
            requested,
            delay
        );

        let activity = &mut self.activity[layer as usize];
        activity.invocations += 1;
        activity.last_at = Some(now);
        activity.last_end = Some(end);

        self.schedule(layer, anchor_frame, delay, cx);
    }

    fn schedule(&mut self, layer: Layer, anchor_frame: u64, delay: f64, cx: &mut LayerContext<'_>) {
        if let Some(previous) = self.pending[layer as usize].take() {
            cx.timers.cancel(previous);
        }
        // After a stall longer than a cycle, resume on the next pump instead of
        // replaying every missed invocation at once
        let fire_frame = (anchor_frame + seconds_to_frames(delay, cx.sample_rate()))
            .max(cx.audio.current_frame() + 1);
        let handle = cx.timers.schedule(
            fire_frame,
            TimerEntry {
                venue_id: self.venue_id.clone(),
                session_id: self.id,
                layer,
            },
        );
        self.pending[layer as usize] = Some(handle);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::{AudioContext, OutputTarget};
    use crate::config::EngineConfig;
    use crate::engine::timer::TimerQueue;
    use crate::preset::get_preset;
    use crate::types::StereoBuffer;
    use rand::SeedableRng;

    struct Fixture {
        audio: AudioContext,
        timers: TimerQueue,
        config: EngineConfig,
    }

    impl Fixture {
        fn new() -> Self {
            Self {
                audio: AudioContext::open(&OutputTarget::offline(8000), 4096).unwrap(),
                timers: TimerQueue::new(),
                config: EngineConfig::seeded(1),
            }
        }

        fn cx(&mut self) -> LayerContext<'_> {
            LayerContext {
                audio: &mut self.audio,
                timers: &mut self.timers,
                config: &self.config,
            }
        }
    }

    fn session(genre: &str) -> VenueSession {
        VenueSession::new(1, "lobby", get_preset(genre), 0.5, Pcg32::seed_from_u64(99))
    }

    #[test]
    fn test_start_runs_every_layer_once() {
        let mut fx = Fixture::new();
        let mut s = session("ambient");
        s.start(&mut fx.cx()).unwrap();

        assert!(s.is_running());
        assert!(s.bus().is_some());
        for layer in Layer::ALL {
            assert_eq!(s.activity(layer).invocations, 1);
            assert!(s.pending_timer(layer).is_some());
        }
        assert_eq!(fx.timers.len(), 3);
        // One layered pad voice, four bass notes, 3-7 melody notes
        let pads: Vec<_> = s.live_voices().iter().filter(|v| v.layer == Layer::Pad).collect();
        let bass = s.live_voices().iter().filter(|v| v.layer == Layer::Bass).count();
        assert_eq!(pads.len(), 1);
        assert!(pads[0].tones.len() >= 4);
        assert_eq!(bass, 4);
    }

    #[test]
    fn test_stop_cancels_timers_and_blocks_new_voices() {
        let mut fx = Fixture::new();
        let mut s = session("jazz");
        s.start(&mut fx.cx()).unwrap();
        let voices_before = s.live_voices().len();

        s.stop(&mut fx.cx());
        assert_eq!(s.state(), SessionState::Stopped);
        assert!(fx.timers.is_empty());

        // A callback already in flight when stop() ran
        for layer in Layer::ALL {
            s.run_layer(layer, 0, &mut fx.cx());
            s.on_timer(layer, 0, &mut fx.cx());
            assert!(s.pending_timer(layer).is_none());
        }
        assert_eq!(s.live_voices().len(), voices_before);
        assert!(fx.timers.is_empty());

        // Second stop is a no-op
        s.stop(&mut fx.cx());
        assert_eq!(s.state(), SessionState::Stopped);
    }

    #[test]
    fn test_stopped_session_bus_is_removed_after_fade() {
        let mut fx = Fixture::new();
        let mut s = session("meditation");
        s.start(&mut fx.cx()).unwrap();
        let mut out = StereoBuffer::default();
        fx.audio.render_offline(800, &mut out).unwrap();
        assert_eq!(fx.audio.atomics().live_buses(), 1);

        s.stop(&mut fx.cx());
        fx.audio.render_offline(4000 + 160, &mut out).unwrap();
        assert_eq!(fx.audio.atomics().live_buses(), 0);
        assert_eq!(fx.audio.atomics().live_voices(), 0);
    }

    #[test]
    fn test_volume_only_changes_while_running() {
        let mut fx = Fixture::new();
        let mut s = session("spa");
        s.set_volume(0.9, &mut fx.cx());
        assert_eq!(s.volume(), 0.5);

        s.start(&mut fx.cx()).unwrap();
        s.set_volume(1.7, &mut fx.cx());
        assert_eq!(s.volume(), 1.0);

        s.stop(&mut fx.cx());
        s.set_volume(0.2, &mut fx.cx());
        assert_eq!(s.volume(), 1.0);
    }

    #[test]
    fn test_kernels_cached_per_decay() {
        let mut fx = Fixture::new();
        let mut s = session("ambient");
        let cx = fx.cx();
        let a = s.reverb_kernel(6.0, &cx);
        let b = s.reverb_kernel(4.0, &cx);
        let c = s.reverb_kernel(1.2, &cx);
        // 6s is capped to 4s
        assert!(std::ptr::eq(&*a, &*b));
        assert!(!std::ptr::eq(&*a, &*c));
        assert_eq!(s.kernels.len(), 2);
        assert_eq!(a.tail_frames(), 32_000 + a.block_size());
    }

    #[test]
    fn test_voice_ended_deregisters() {
        let mut fx = Fixture::new();
        let mut s = session("ambient");
        s.start(&mut fx.cx()).unwrap();
        let first = s.live_voices()[0].id;
        let count = s.live_voices().len();
        assert!(s.on_voice_ended(first));
        assert!(!s.on_voice_ended(first));
        assert_eq!(s.live_voices().len(), count - 1);
    }

    #[test]
    fn test_pad_invocation_is_one_voice() {
        let mut fx = Fixture::new();
        let mut s = session("meditation");
        s.start(&mut fx.cx()).unwrap();
        s.run_layer(Layer::Pad, fx.audio.current_frame(), &mut fx.cx());

        let pads: Vec<_> = s.live_voices().iter().filter(|v| v.layer == Layer::Pad).collect();
        assert_eq!(pads.len(), 2);
        assert!(pads.iter().all(|v| v.tones.len() >= 4));

        let mut out = StereoBuffer::default();
        fx.audio.render_offline(800, &mut out).unwrap();
        assert_eq!(fx.audio.atomics().voices_started(), s.live_voices().len() as u64);
    }

    #[test]
    fn test_next_cycle_anchored_to_due_frame() {
        let mut fx = Fixture::new();
        let mut s = session("electronic");
        s.start(&mut fx.cx()).unwrap();
        // 120 bpm: eight beats
        let cycle = 32_000;
        let due = s.pending_timer(Layer::Bass).unwrap().fire_frame();
        assert_eq!(due, cycle);

        // Pump runs well past the due frame
        let mut out = StereoBuffer::default();
        fx.audio.render_offline(due as usize + 1900, &mut out).unwrap();
        s.on_timer(Layer::Bass, due, &mut fx.cx());
        assert_eq!(s.pending_timer(Layer::Bass).unwrap().fire_frame(), due + cycle);
    }

    #[test]
    fn test_stall_longer_than_cycle_resumes_without_backlog() {
        let mut fx = Fixture::new();
        let mut s = session("electronic");
        s.start(&mut fx.cx()).unwrap();
        let due = s.pending_timer(Layer::Bass).unwrap().fire_frame();

        let mut out = StereoBuffer::default();
        fx.audio.render_offline(due as usize * 3, &mut out).unwrap();
        let now = fx.audio.current_frame();
        s.on_timer(Layer::Bass, due, &mut fx.cx());
        let next = s.pending_timer(Layer::Bass).unwrap().fire_frame();
        assert!(next > now);
    }
}
