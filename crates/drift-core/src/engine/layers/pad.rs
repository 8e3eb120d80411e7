//! Pad layer: the slow harmonic bed
//!
//! A randomly chosen chord fades in over 2s, holds for 4-8s and fades out
//! over 2s. The chord tones and a sub an octave down share one voice and one
//! reverb send. The next pad starts 1s before this one has faded out, so
//! consecutive chords crossfade.

use rand::Rng;

use super::pick;
use crate::dsp::Waveform;
use crate::engine::synth::{Envelope, Plateau, Release, Route, Tone, VoiceRequest};
use crate::preset::GenrePreset;
use crate::types::Layer;

pub const FADE_IN_SECS: f64 = 2.0;
pub const FADE_OUT_SECS: f64 = 2.0;
pub const HOLD_MIN_SECS: f64 = 4.0;
pub const HOLD_SPREAD_SECS: f64 = 4.0;
/// How long consecutive pads overlap
pub const OVERLAP_SECS: f64 = 1.0;
/// Random detune range of each chord tone (cents)
pub const DETUNE_CENTS: f32 = 6.0;
/// Sub tone: an octave below the root at 30% of pad gain
pub const SUB_RATIO: f32 = 0.5;
pub const SUB_GAIN: f32 = 0.3;

const FALLBACK_CHORD: &[f32] = &[1.0];

#[derive(Debug, Clone, PartialEq)]
pub struct PadPlan {
    pub base_frequency: f32,
    pub chord: &'static [f32],
    pub hold: f64,
}

impl PadPlan {
    pub fn plan<R: Rng + ?Sized>(preset: &'static GenrePreset, rng: &mut R) -> Self {
        Self {
            base_frequency: pick(preset.base_frequencies, 110.0, rng),
            chord: pick(preset.chord_patterns, FALLBACK_CHORD, rng),
            hold: HOLD_MIN_SECS + rng.gen_range(0.0..HOLD_SPREAD_SECS),
        }
    }

    /// Lifetime of this pad, fade-in to end of fade-out
    pub fn total(&self) -> f64 {
        FADE_IN_SECS + self.hold + FADE_OUT_SECS
    }

    /// Delay until the next pad invocation
    pub fn next_delay(&self) -> f64 {
        self.total() - OVERLAP_SECS
    }

    fn envelope(&self, peak: f32) -> Envelope {
        Envelope {
            peak,
            attack: FADE_IN_SECS,
            plateau: Some(Plateau {
                level: 1.0,
                until: FADE_IN_SECS + self.hold,
            }),
            release: Release::Linear { end: self.total() },
        }
    }

    /// One sine per chord tone plus the triangle sub, as a single voice
    pub fn voice(&self, preset: &GenrePreset, start: f64) -> VoiceRequest {
        let mut tones: Vec<Tone> = self
            .chord
            .iter()
            .map(|ratio| Tone::new(Waveform::Sine, self.base_frequency * ratio).with_detune(DETUNE_CENTS))
            .collect();
        tones.push(Tone::new(Waveform::Triangle, self.base_frequency * SUB_RATIO).with_gain(SUB_GAIN));

        VoiceRequest {
            layer: Layer::Pad,
            tones,
            start,
            stop: start + self.total(),
            envelope: self.envelope(preset.pad_gain),
            route: Route::ReverbSend {
                cutoff_hz: preset.filter_cutoff_hz,
                decay_secs: preset.reverb_decay_seconds,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::preset::get_preset;
    use rand::SeedableRng;
    use rand_pcg::Pcg32;

    #[test]
    fn test_pad_timing() {
        let mut rng = Pcg32::seed_from_u64(4);
        for _ in 0..200 {
            let plan = PadPlan::plan(get_preset("ambient"), &mut rng);
            assert!((4.0..8.0).contains(&plan.hold));
            assert!((8.0..12.0).contains(&plan.total()));
            assert!((plan.next_delay() - (plan.total() - 1.0)).abs() < 1e-12);
        }
    }

    #[test]
    fn test_pad_voices_come_from_preset() {
        let preset = get_preset("jazz");
        let mut rng = Pcg32::seed_from_u64(8);
        let plan = PadPlan::plan(preset, &mut rng);
        assert!(preset.base_frequencies.contains(&plan.base_frequency));
        assert!(preset.chord_patterns.contains(&plan.chord));

        let voice = plan.voice(preset, 3.0);
        assert_eq!(voice.tones.len(), plan.chord.len() + 1);
        assert_eq!(voice.envelope.peak, preset.pad_gain);
        assert_eq!(voice.start, 3.0);
        assert_eq!(voice.stop, 3.0 + plan.total());
        assert!(matches!(voice.route, Route::ReverbSend { .. }));

        let (sub, tones) = voice.tones.split_last().unwrap();
        for (tone, ratio) in tones.iter().zip(plan.chord) {
            assert_eq!(tone.waveform, Waveform::Sine);
            assert_eq!(tone.frequency, plan.base_frequency * ratio);
            assert_eq!(tone.gain, 1.0);
            assert!(tone.detune_cents > 0.0);
        }
        assert_eq!(sub.waveform, Waveform::Triangle);
        assert_eq!(sub.frequency, plan.base_frequency * 0.5);
        assert_eq!(sub.detune_cents, 0.0);
        assert!((sub.gain - 0.3).abs() < 1e-7);
    }

    #[test]
    fn test_pad_envelope_fades() {
        let plan = PadPlan {
            base_frequency: 110.0,
            chord: &[1.0],
            hold: 5.0,
        };
        let env = plan.envelope(0.1);
        assert_eq!(env.attack, 2.0);
        assert_eq!(env.plateau.map(|p| p.until), Some(7.0));
        assert_eq!(env.release, Release::Linear { end: 9.0 });
    }
}
