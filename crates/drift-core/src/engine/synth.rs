//! Voice synthesizer (control side)
//!
//! Turns a [`VoiceRequest`] into a render-graph voice: its tones as weighted
//! oscillators, one gain automation and one signal path, scheduled on the audio clock and registered
//! with the owning session until the renderer reports it ended.

use basedrop::Owned;
use rand::Rng;

use super::error::{EngineError, EngineResult};
use super::gc::gc_handle;
use super::session::{LiveVoice, VenueSession};
use super::timer::TimerQueue;
use crate::audio::AudioContext;
use crate::config::EngineConfig;
use crate::dsp::{Automation, Biquad, Oscillator, Waveform};
use crate::graph::{GraphCommand, Partial, Voice, VoicePath};
use crate::types::{seconds_to_frames, Layer, VoiceId};

/// Resonance of the filtered-reverb send's lowpass
pub const SEND_Q: f32 = 1.0;

/// Level exponential releases decay to before the voice is cut
pub const RELEASE_FLOOR: f32 = 0.001;

/// Linear move to `level * peak`, reached `until` seconds after the start
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Plateau {
    pub level: f32,
    pub until: f64,
}

/// Fall to silence, reached `end` seconds after the start
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Release {
    Linear { end: f64 },
    Exponential { end: f64 },
}

/// Amplitude envelope descriptor
///
/// Linear attack from silence to `peak`, optional linear plateau segment,
/// then the release. Times are relative to the voice start.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Envelope {
    pub peak: f32,
    pub attack: f64,
    pub plateau: Option<Plateau>,
    pub release: Release,
}

impl Envelope {
    /// Seconds from the start until the envelope reaches silence
    pub fn length(&self) -> f64 {
        match self.release {
            Release::Linear { end } | Release::Exponential { end } => end,
        }
    }

    /// Lay the envelope out on the frame timeline starting at `start_frame`
    pub fn automation(&self, start_frame: u64, sample_rate: u32) -> Automation {
        let at = |secs: f64| start_frame + seconds_to_frames(secs, sample_rate);

        let mut env = Automation::new(0.0);
        env.set_value_at(0.0, start_frame);
        env.linear_ramp_to(self.peak, at(self.attack));

        let mut last = self.attack;
        if let Some(plateau) = self.plateau {
            let until = plateau.until.max(last);
            env.linear_ramp_to(self.peak * plateau.level, at(until));
            last = until;
        }

        match self.release {
            Release::Linear { end } => {
                env.linear_ramp_to(0.0, at(end.max(last)));
            }
            Release::Exponential { end } => {
                let end = at(end.max(last));
                env.exponential_ramp_to(RELEASE_FLOOR, end);
                env.set_value_at(0.0, end + 1);
            }
        }
        env
    }
}

/// Signal path after the envelope
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Route {
    /// Lowpass into a 0.7 dry / 0.3 convolution-reverb mix
    ReverbSend { cutoff_hz: f32, decay_secs: f32 },
    /// Dedicated lowpass, no reverb
    Lowpass { cutoff_hz: f32, q: f32 },
}

/// One oscillator within a voice
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Tone {
    pub waveform: Waveform,
    pub frequency: f32,
    /// In a request, detune is drawn uniformly from ±this many cents (0 = none).
    /// On a live voice it is the detune actually applied.
    pub detune_cents: f32,
    /// Mix weight ahead of the shared envelope
    pub gain: f32,
}

impl Tone {
    pub fn new(waveform: Waveform, frequency: f32) -> Self {
        Self {
            waveform,
            frequency,
            detune_cents: 0.0,
            gain: 1.0,
        }
    }

    pub fn with_detune(mut self, cents: f32) -> Self {
        self.detune_cents = cents;
        self
    }

    pub fn with_gain(mut self, gain: f32) -> Self {
        self.gain = gain;
        self
    }
}

/// One voice to synthesize: tones sharing an envelope and a route
#[derive(Debug, Clone, PartialEq)]
pub struct VoiceRequest {
    pub layer: Layer,
    pub tones: Vec<Tone>,
    /// Oscillator start, seconds on the audio clock
    pub start: f64,
    /// Oscillator stop, seconds on the audio clock
    pub stop: f64,
    pub envelope: Envelope,
    pub route: Route,
}

/// What a layer invocation works against
pub struct LayerContext<'a> {
    pub audio: &'a mut AudioContext,
    pub timers: &'a mut TimerQueue,
    pub config: &'a EngineConfig,
}

impl LayerContext<'_> {
    /// Time new material is placed at: the audio clock plus lookahead
    pub fn now(&self) -> f64 {
        self.audio.current_time() + self.config.lookahead_secs
    }

    pub fn sample_rate(&self) -> u32 {
        self.audio.sample_rate()
    }

    /// Queue a command, dropping it if the renderer is behind
    pub fn send(&mut self, command: GraphCommand) -> EngineResult<()> {
        self.audio
            .send(command)
            .map_err(|rejected| EngineError::CommandQueueFull(rejected.name()))
    }
}

/// Schedule one voice for `session`
///
/// Requests for a stopped session, with no tones, or with `stop <= start`
/// are discarded. A rejected command is logged and the note simply does not
/// play.
pub(crate) fn synthesize(
    session: &mut VenueSession,
    cx: &mut LayerContext<'_>,
    request: VoiceRequest,
) -> Option<VoiceId> {
    if !session.is_running() {
        return None;
    }
    let Some(bus) = session.bus() else {
        return None;
    };
    if request.tones.is_empty() {
        return None;
    }
    if !(request.stop > request.start) {
        log::warn!(
            "[{}] Discarding {} voice: stop {:.3}s is not after start {:.3}s",
            session.venue_id(),
            request.layer.name(),
            request.stop,
            request.start
        );
        return None;
    }

    let sample_rate = cx.sample_rate();
    let tones: Vec<Tone> = request
        .tones
        .iter()
        .map(|tone| {
            let detune = if tone.detune_cents > 0.0 {
                session
                    .rng_mut()
                    .gen_range(-tone.detune_cents..=tone.detune_cents)
            } else {
                0.0
            };
            tone.with_detune(detune)
        })
        .collect();
    let partials = tones
        .iter()
        .map(|tone| {
            Partial::new(
                Oscillator::new(tone.waveform, tone.frequency, tone.detune_cents, sample_rate),
                tone.gain,
            )
        })
        .collect();

    let path = match request.route {
        Route::ReverbSend { cutoff_hz, decay_secs } => {
            let kernel = session.reverb_kernel(decay_secs, cx);
            VoicePath::reverb_send(Biquad::lowpass(cutoff_hz, SEND_Q, sample_rate), kernel)
        }
        Route::Lowpass { cutoff_hz, q } => {
            VoicePath::lowpass(Biquad::lowpass(cutoff_hz, q, sample_rate))
        }
    };

    let start_frame = seconds_to_frames(request.start, sample_rate);
    let stop_frame = seconds_to_frames(request.stop, sample_rate).max(start_frame + 1);
    let id = cx.audio.next_voice_id();
    let voice = Voice::new(
        id,
        bus,
        partials,
        request.envelope.automation(start_frame, sample_rate),
        path,
    )
    .scheduled(start_frame, stop_frame);

    if let Err(e) = cx.send(GraphCommand::StartVoice(Owned::new(&gc_handle(), voice))) {
        log::warn!(
            "[{}] {} note at {:.1}Hz did not start: {}",
            session.venue_id(),
            request.layer.name(),
            tones[0].frequency,
            e
        );
        return None;
    }

    session.register_voice(LiveVoice {
        id,
        layer: request.layer,
        tones,
        start: request.start,
        stop: request.stop,
    });
    Some(id)
}
