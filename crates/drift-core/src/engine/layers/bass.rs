//! Bass layer: a four-note walking figure locked to tempo
//!
//! Notes sit two beats apart on a I-I-IV-V pattern an octave below a random
//! base frequency, each a quick pluck through a dry 300Hz lowpass. The
//! figure repeats (with a new root) every eight beats.

use rand::Rng;

use super::pick;
use crate::dsp::Waveform;
use crate::engine::synth::{Envelope, Release, Route, Tone, VoiceRequest};
use crate::preset::GenrePreset;
use crate::types::Layer;

/// Frequency ratio of each note against the root
pub const PATTERN: [f32; 4] = [1.0, 1.0, 1.333, 1.5];
pub const NOTE_SPACING_BEATS: f64 = 2.0;
pub const ATTACK_SECS: f64 = 0.05;
/// Beats until a note has decayed to near silence
pub const DECAY_BEATS: f64 = 1.8;
pub const CYCLE_BEATS: f64 = 8.0;
pub const CUTOFF_HZ: f32 = 300.0;
pub const FILTER_Q: f32 = 2.0;

#[derive(Debug, Clone, PartialEq)]
pub struct BassPlan {
    /// Halved base frequency
    pub root: f32,
    /// Beat length in seconds
    pub beat: f64,
}

impl BassPlan {
    pub fn plan<R: Rng + ?Sized>(preset: &GenrePreset, rng: &mut R) -> Self {
        Self {
            root: pick(preset.base_frequencies, 110.0, rng) * 0.5,
            beat: preset.beat_interval(),
        }
    }

    /// Delay until the next bass invocation
    pub fn next_delay(&self) -> f64 {
        self.beat * CYCLE_BEATS
    }

    pub fn voices(&self, preset: &GenrePreset, start: f64) -> Vec<VoiceRequest> {
        let spacing = self.beat * NOTE_SPACING_BEATS;
        let decay = (self.beat * DECAY_BEATS).max(ATTACK_SECS * 2.0);

        PATTERN
            .iter()
            .enumerate()
            .map(|(i, ratio)| {
                let note_start = start + i as f64 * spacing;
                VoiceRequest {
                    layer: Layer::Bass,
                    tones: vec![Tone::new(Waveform::Sine, self.root * ratio)],
                    start: note_start,
                    stop: note_start + spacing.max(decay),
                    envelope: Envelope {
                        peak: preset.bass_gain,
                        attack: ATTACK_SECS,
                        plateau: None,
                        release: Release::Exponential { end: decay },
                    },
                    route: Route::Lowpass {
                        cutoff_hz: CUTOFF_HZ,
                        q: FILTER_Q,
                    },
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::preset::get_preset;
    use rand::SeedableRng;
    use rand_pcg::Pcg32;

    #[test]
    fn test_bass_cycle_at_120_bpm() {
        let preset = get_preset("electronic");
        assert_eq!(preset.tempo_bpm, 120);
        let mut rng = Pcg32::seed_from_u64(2);
        let plan = BassPlan::plan(preset, &mut rng);
        assert!((plan.beat - 0.5).abs() < 1e-12);
        assert!((plan.next_delay() - 4.0).abs() < 1e-12);
    }

    #[test]
    fn test_bass_notes() {
        let preset = get_preset("jazz");
        let mut rng = Pcg32::seed_from_u64(6);
        let plan = BassPlan::plan(preset, &mut rng);
        assert!(preset
            .base_frequencies
            .iter()
            .any(|f| (f * 0.5 - plan.root).abs() < 1e-6));

        let voices = plan.voices(preset, 10.0);
        assert_eq!(voices.len(), 4);
        let spacing = plan.beat * 2.0;
        for (i, voice) in voices.iter().enumerate() {
            assert!((voice.start - (10.0 + i as f64 * spacing)).abs() < 1e-9);
            assert_eq!(voice.tones[0].frequency, plan.root * PATTERN[i]);
            assert_eq!(voice.envelope.peak, preset.bass_gain);
            assert_eq!(voice.envelope.attack, 0.05);
            assert_eq!(
                voice.envelope.release,
                Release::Exponential { end: plan.beat * 1.8 }
            );
            assert_eq!(voice.route, Route::Lowpass { cutoff_hz: 300.0, q: 2.0 });
            assert!(voice.stop > voice.start);
        }
        assert_eq!(voices[2].tones[0].frequency, plan.root * 1.333);
        assert_eq!(voices[3].tones[0].frequency, plan.root * 1.5);
    }
}
