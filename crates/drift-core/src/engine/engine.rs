//! Audio engine: the public control surface
//!
//! Owns the lazily opened [`AudioContext`], the registry of venue sessions and
//! the timer queue their layers reschedule on. Everything here runs on one
//! control thread; the host calls [`Engine::pump`] regularly (or drives an
//! offline context through [`Engine::run_offline`]).
//!
//! The control methods never fail: problems are logged and the affected
//! venue simply stays silent.

use std::collections::BTreeMap;

use rand::{RngCore, SeedableRng};
use rand_pcg::Pcg32;

use super::error::{EngineError, EngineResult};
use super::session::VenueSession;
use super::synth::LayerContext;
use super::timer::TimerQueue;
use crate::audio::{AudioContext, AudioError, OutputTarget};
use crate::config::EngineConfig;
use crate::graph::GraphEvent;
use crate::preset::get_preset;
use crate::types::{seconds_to_frames, Layer, StereoBuffer};

/// Map a 0-100 volume to a 0-1 gain
pub fn percent_to_gain(volume_percent: f32) -> f32 {
    if volume_percent.is_nan() {
        return 0.0;
    }
    volume_percent.clamp(0.0, 100.0) / 100.0
}

pub struct Engine {
    config: EngineConfig,
    target: OutputTarget,
    /// Opened on first use; `None` again after `dispose`
    context: Option<AudioContext>,
    sessions: BTreeMap<String, VenueSession>,
    timers: TimerQueue,
    /// Seeds each new session's generator
    seeder: Pcg32,
    next_session_id: u64,
    /// Renderer events lost so far, as last logged
    dropped_events_seen: u64,
}

impl Engine {
    pub fn new(config: EngineConfig, target: OutputTarget) -> Self {
        let config = config.sanitized();
        let seeder = match config.seed {
            Some(seed) => Pcg32::seed_from_u64(seed),
            None => Pcg32::from_entropy(),
        };
        Self {
            config,
            target,
            context: None,
            sessions: BTreeMap::new(),
            timers: TimerQueue::new(),
            seeder,
            next_session_id: 1,
            dropped_events_seen: 0,
        }
    }

    /// Engine rendering into an offline context
    pub fn offline(config: EngineConfig, sample_rate: u32) -> Self {
        Self::new(config, OutputTarget::offline(sample_rate))
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn context(&self) -> Option<&AudioContext> {
        self.context.as_ref()
    }

    /// Audio clock in seconds (0 before the context exists)
    pub fn current_time(&self) -> f64 {
        self.context.as_ref().map_or(0.0, AudioContext::current_time)
    }

    pub fn session(&self, venue_id: &str) -> Option<&VenueSession> {
        self.sessions.get(venue_id)
    }

    pub fn sessions(&self) -> impl Iterator<Item = &VenueSession> {
        self.sessions.values()
    }

    pub fn pending_timers(&self) -> usize {
        self.timers.len()
    }

    /// Open the shared context if needed
    ///
    /// A context that has closed stays unusable until [`dispose`](Self::dispose).
    pub fn ensure_context(&mut self) -> EngineResult<()> {
        self.context_mut().map(|_| ())
    }

    fn context_mut(&mut self) -> EngineResult<&mut AudioContext> {
        open_context(&mut self.context, &self.target, &self.config)
    }

    /// Start (or restart) a venue
    ///
    /// Any session already registered for `venue_id` is stopped first, so a
    /// venue never has two sessions. Unknown genres play the default preset.
    pub fn start_venue(&mut self, venue_id: &str, genre: &str, volume_percent: f32) {
        if let Err(e) = self.try_start_venue(venue_id, genre, volume_percent) {
            log::error!("[{}] Failed to start: {}", venue_id, e);
        }
    }

    fn try_start_venue(&mut self, venue_id: &str, genre: &str, volume_percent: f32) -> EngineResult<()> {
        self.stop_venue(venue_id);

        let preset = get_preset(genre);
        let volume = percent_to_gain(volume_percent);
        let id = self.next_session_id;
        self.next_session_id += 1;
        let rng = Pcg32::seed_from_u64(self.seeder.next_u64());

        let audio = open_context(&mut self.context, &self.target, &self.config)?;

        let mut session = VenueSession::new(id, venue_id, preset, volume, rng);
        let mut cx = LayerContext {
            audio,
            timers: &mut self.timers,
            config: &self.config,
        };
        session.start(&mut cx)?;

        log::info!(
            "[{}] Started: {} @ {} bpm, volume {:.0}%",
            venue_id,
            preset.name,
            preset.tempo_bpm,
            volume * 100.0
        );
        self.sessions.insert(venue_id.to_string(), session);
        Ok(())
    }

    /// Stop a venue and drop its session. No-op for unknown venues.
    pub fn stop_venue(&mut self, venue_id: &str) {
        let Some(mut session) = self.sessions.remove(venue_id) else {
            return;
        };
        match self.context.as_mut() {
            Some(audio) => {
                let mut cx = LayerContext {
                    audio,
                    timers: &mut self.timers,
                    config: &self.config,
                };
                session.stop(&mut cx);
            }
            None => {
                for layer in Layer::ALL {
                    if let Some(handle) = session.pending_timer(layer) {
                        self.timers.cancel(handle);
                    }
                }
            }
        }
        log::info!("[{}] Stopped", venue_id);
    }

    /// Ramp a venue's output gain. No-op for unknown venues.
    pub fn set_venue_volume(&mut self, venue_id: &str, volume_percent: f32) {
        let (Some(session), Some(audio)) = (self.sessions.get_mut(venue_id), self.context.as_mut())
        else {
            return;
        };
        let mut cx = LayerContext {
            audio,
            timers: &mut self.timers,
            config: &self.config,
        };
        session.set_volume(percent_to_gain(volume_percent), &mut cx);
        log::debug!("[{}] Volume {:.0}%", venue_id, session.volume() * 100.0);
    }

    pub fn is_playing(&self, venue_id: &str) -> bool {
        self.sessions.contains_key(venue_id)
    }

    pub fn stop_all(&mut self) {
        let venues: Vec<String> = self.sessions.keys().cloned().collect();
        for venue_id in venues {
            self.stop_venue(&venue_id);
        }
    }

    /// Stop everything and release the context
    ///
    /// The next `start_venue` opens a fresh context.
    pub fn dispose(&mut self) {
        self.stop_all();
        if let Some(audio) = self.context.as_mut() {
            let waiting = audio.flush_deferred();
            if waiting > 0 {
                log::debug!("Dropping {} queued teardown commands with the context", waiting);
            }
        }
        self.timers.clear();
        self.dropped_events_seen = 0;
        if self.context.take().is_some() {
            log::info!("Engine disposed");
        }
    }

    /// One step of the control loop
    ///
    /// Retries deferred teardown commands, deregisters voices the renderer
    /// reported ended, then fires every layer timer that has come due on the
    /// audio clock, in order.
    pub fn pump(&mut self) {
        let Some(audio) = self.context.as_mut() else {
            return;
        };
        audio.flush_deferred();

        while let Some(event) = audio.poll_event() {
            match event {
                GraphEvent::VoiceEnded { bus, voice } => {
                    if let Some(session) = self.sessions.values_mut().find(|s| s.bus() == Some(bus)) {
                        session.on_voice_ended(voice);
                    }
                }
                GraphEvent::BusRemoved { bus } => {
                    log::debug!("Bus {} removed", bus.0);
                }
            }
        }

        let dropped = audio.atomics().dropped_events();
        if dropped > self.dropped_events_seen {
            log::warn!(
                "Renderer event ring overflowed: {} events lost",
                dropped - self.dropped_events_seen
            );
            self.dropped_events_seen = dropped;
        }

        if audio.is_closed() {
            return;
        }

        let now = audio.current_frame();
        let mut cx = LayerContext {
            audio,
            timers: &mut self.timers,
            config: &self.config,
        };
        while let Some((handle, entry)) = cx.timers.pop_due(now) {
            match self.sessions.get_mut(&entry.venue_id) {
                Some(session) if session.id() == entry.session_id => {
                    session.on_timer(entry.layer, handle.fire_frame(), &mut cx);
                }
                _ => log::debug!(
                    "[{}] Dropping stale {} timer",
                    entry.venue_id,
                    entry.layer.name()
                ),
            }
        }
    }

    /// Render `seconds` of audio on an offline context, pumping between ticks
    pub fn run_offline(&mut self, seconds: f64) -> EngineResult<StereoBuffer> {
        let audio = self.context_mut()?;
        if !audio.handle().is_offline() {
            return Err(AudioError::NotOffline.into());
        }
        let sample_rate = audio.sample_rate();
        let total = seconds_to_frames(seconds, sample_rate) as usize;
        let tick = (seconds_to_frames(self.config.timer_tick_secs, sample_rate) as usize).max(1);

        let mut out = StereoBuffer::with_capacity(total);
        self.pump();
        let mut rendered = 0;
        while rendered < total {
            let frames = tick.min(total - rendered);
            self.context
                .as_mut()
                .ok_or(EngineError::ContextClosed)?
                .render_offline(frames, &mut out)?;
            rendered += frames;
            self.pump();
        }
        Ok(out)
    }
}

/// The context in `slot`, opened on first use
///
/// A context that has closed stays unusable until the slot is cleared.
fn open_context<'a>(
    slot: &'a mut Option<AudioContext>,
    target: &OutputTarget,
    config: &EngineConfig,
) -> EngineResult<&'a mut AudioContext> {
    if slot.is_none() {
        *slot = Some(AudioContext::open(target, config.command_queue_capacity)?);
    }
    match slot.as_mut() {
        Some(context) if context.is_closed() => Err(EngineError::ContextClosed),
        Some(context) => Ok(context),
        None => Err(EngineError::ContextClosed),
    }
}

impl Drop for Engine {
    fn drop(&mut self) {
        self.dispose();
    }
}
