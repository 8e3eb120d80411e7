//! Melody layer: short swung phrases separated by silence
//!
//! A phrase is 3-7 triangle notes laid back to back, odd notes pushed late
//! by the preset's swing. Notes go through a brighter, shorter reverb send
//! than the pad so the line reads as foreground. After each phrase the layer
//! rests for 2-8 beats.

use rand::Rng;

use super::pick;
use crate::dsp::Waveform;
use crate::engine::synth::{Envelope, Plateau, Release, Route, Tone, VoiceRequest};
use crate::preset::GenrePreset;
use crate::types::Layer;

pub const MIN_NOTES: usize = 3;
pub const MAX_NOTES: usize = 7;
pub const MIN_DURATION_BEATS: f64 = 0.5;
pub const MAX_DURATION_BEATS: f64 = 2.0;
pub const MIN_GAP_BEATS: f64 = 2.0;
pub const GAP_SPREAD_BEATS: f64 = 6.0;
pub const ATTACK_SECS: f64 = 0.02;
/// Plateau level (fraction of peak) and where it is reached (fraction of the note)
pub const SUSTAIN_LEVEL: f32 = 0.7;
pub const SUSTAIN_FRACTION: f64 = 0.3;
pub const CUTOFF_SCALE: f32 = 1.5;
pub const DECAY_SCALE: f32 = 0.6;

#[derive(Debug, Clone, PartialEq)]
pub struct MelodyNote {
    /// Start relative to the phrase start, swing included
    pub offset: f64,
    pub duration: f64,
    pub frequency: f32,
}

impl MelodyNote {
    pub fn end(&self) -> f64 {
        self.offset + self.duration
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MelodyPlan {
    pub notes: Vec<MelodyNote>,
    pub beat: f64,
    /// Rest after the phrase, in beats
    pub gap_beats: f64,
}

impl MelodyPlan {
    pub fn plan<R: Rng + ?Sized>(preset: &GenrePreset, rng: &mut R) -> Self {
        let beat = preset.beat_interval();
        let swing = preset.swing_factor as f64 * beat;
        let count = rng.gen_range(MIN_NOTES..=MAX_NOTES);

        let mut cursor = 0.0;
        let mut notes = Vec::with_capacity(count);
        for i in 0..count {
            let duration = rng.gen_range(MIN_DURATION_BEATS..=MAX_DURATION_BEATS) * beat;
            let offset = if i % 2 == 1 { cursor + swing } else { cursor };
            notes.push(MelodyNote {
                offset,
                duration,
                frequency: pick(preset.melody_note_pool, 440.0, rng),
            });
            cursor += duration;
        }

        Self {
            notes,
            beat,
            gap_beats: MIN_GAP_BEATS + rng.gen_range(0.0..GAP_SPREAD_BEATS),
        }
    }

    /// Offset at which the last note has finished
    pub fn phrase_end(&self) -> f64 {
        self.notes.iter().map(MelodyNote::end).fold(0.0, f64::max)
    }

    pub fn gap(&self) -> f64 {
        self.gap_beats * self.beat
    }

    /// Delay until the next melody invocation
    pub fn next_delay(&self) -> f64 {
        self.phrase_end() + self.gap()
    }

    pub fn voices(&self, preset: &GenrePreset, start: f64) -> Vec<VoiceRequest> {
        let route = Route::ReverbSend {
            cutoff_hz: preset.filter_cutoff_hz * CUTOFF_SCALE,
            decay_secs: preset.reverb_decay_seconds * DECAY_SCALE,
        };

        self.notes
            .iter()
            .map(|note| VoiceRequest {
                layer: Layer::Melody,
                tones: vec![Tone::new(Waveform::Triangle, note.frequency)],
                start: start + note.offset,
                stop: start + note.end(),
                envelope: Envelope {
                    peak: preset.melody_gain,
                    attack: ATTACK_SECS.min(note.duration * 0.1),
                    plateau: Some(Plateau {
                        level: SUSTAIN_LEVEL,
                        until: note.duration * SUSTAIN_FRACTION,
                    }),
                    release: Release::Exponential { end: note.duration },
                },
                route,
            })
            .collect()
    }
}
