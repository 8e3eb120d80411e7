//! Genre preset table
//!
//! Static per-genre musical parameters. Lookup is case-insensitive and never
//! fails: unknown genres resolve to the `ambient` preset.

/// Genre used when a lookup misses
pub const DEFAULT_GENRE: &str = "ambient";

// Chord interval ratios (just intonation)
const MAJOR_7: &[f32] = &[1.0, 1.25, 1.5, 1.875];
const MINOR_7: &[f32] = &[1.0, 1.2, 1.5, 1.8];
const SUS_4: &[f32] = &[1.0, 1.333, 1.5, 2.0];
const ADD_9: &[f32] = &[1.0, 1.25, 1.5, 2.25];
const MINOR_9: &[f32] = &[1.0, 1.2, 1.5, 1.8, 2.25];
const OPEN_FIFTH: &[f32] = &[1.0, 1.5, 2.0];
const MAJOR_TRIAD: &[f32] = &[1.0, 1.25, 1.5];

/// Immutable per-genre synthesis parameters
#[derive(Debug, PartialEq)]
pub struct GenrePreset {
    /// Genre key (lowercase)
    pub name: &'static str,
    /// Low fundamentals used as chord roots (Hz)
    pub base_frequencies: &'static [f32],
    /// Interval-ratio tuples applied multiplicatively to a base frequency
    pub chord_patterns: &'static [&'static [f32]],
    /// Tempo driving bass and melody timing
    pub tempo_bpm: u32,
    /// Lowpass cutoff of the filtered-reverb send (Hz)
    pub filter_cutoff_hz: f32,
    /// Nominal reverb tail length (seconds, capped on the send paths)
    pub reverb_decay_seconds: f32,
    /// Peak amplitude per pad chord tone (0-1)
    pub pad_gain: f32,
    /// Peak amplitude per bass note (0-1)
    pub bass_gain: f32,
    /// Peak amplitude per melody note (0-1)
    pub melody_gain: f32,
    /// Candidate melody frequencies (Hz)
    pub melody_note_pool: &'static [f32],
    /// Fraction of a beat every odd melody note is delayed by
    pub swing_factor: f32,
}

impl GenrePreset {
    /// Length of one beat in seconds
    pub fn beat_interval(&self) -> f64 {
        60.0 / self.tempo_bpm.max(1) as f64
    }
}

/// All known presets. The first entry is the default.
pub static PRESETS: &[GenrePreset] = &[
    GenrePreset {
        name: "ambient",
        base_frequencies: &[110.0, 130.81, 146.83, 164.81],
        chord_patterns: &[MAJOR_7, SUS_4, ADD_9, OPEN_FIFTH],
        tempo_bpm: 60,
        filter_cutoff_hz: 1200.0,
        reverb_decay_seconds: 6.0,
        pad_gain: 0.08,
        bass_gain: 0.1,
        melody_gain: 0.05,
        melody_note_pool: &[440.0, 493.88, 554.37, 659.25, 739.99, 880.0],
        swing_factor: 0.0,
    },
    GenrePreset {
        name: "jazz",
        base_frequencies: &[98.0, 110.0, 130.81, 146.83],
        chord_patterns: &[MAJOR_7, MINOR_7, MINOR_9],
        tempo_bpm: 92,
        filter_cutoff_hz: 2200.0,
        reverb_decay_seconds: 2.5,
        pad_gain: 0.07,
        bass_gain: 0.16,
        melody_gain: 0.07,
        melody_note_pool: &[392.0, 440.0, 466.16, 523.25, 587.33, 622.25, 698.46],
        swing_factor: 0.18,
    },
    GenrePreset {
        name: "lounge",
        base_frequencies: &[110.0, 123.47, 146.83, 164.81],
        chord_patterns: &[MAJOR_7, MINOR_7, ADD_9],
        tempo_bpm: 96,
        filter_cutoff_hz: 1800.0,
        reverb_decay_seconds: 3.0,
        pad_gain: 0.07,
        bass_gain: 0.15,
        melody_gain: 0.06,
        melody_note_pool: &[440.0, 493.88, 554.37, 587.33, 659.25, 739.99],
        swing_factor: 0.1,
    },
    GenrePreset {
        name: "classical",
        base_frequencies: &[130.81, 146.83, 174.61, 196.0],
        chord_patterns: &[MAJOR_TRIAD, MINOR_7, OPEN_FIFTH],
        tempo_bpm: 72,
        filter_cutoff_hz: 2600.0,
        reverb_decay_seconds: 4.5,
        pad_gain: 0.07,
        bass_gain: 0.1,
        melody_gain: 0.07,
        melody_note_pool: &[523.25, 587.33, 659.25, 698.46, 783.99, 880.0, 987.77],
        swing_factor: 0.0,
    },
    GenrePreset {
        name: "meditation",
        base_frequencies: &[98.0, 110.0, 130.81],
        chord_patterns: &[OPEN_FIFTH, SUS_4],
        tempo_bpm: 48,
        filter_cutoff_hz: 800.0,
        reverb_decay_seconds: 8.0,
        pad_gain: 0.09,
        bass_gain: 0.07,
        melody_gain: 0.035,
        melody_note_pool: &[392.0, 440.0, 523.25, 587.33, 659.25],
        swing_factor: 0.0,
    },
    GenrePreset {
        name: "spa",
        base_frequencies: &[110.0, 130.81, 164.81],
        chord_patterns: &[ADD_9, SUS_4, MAJOR_7],
        tempo_bpm: 54,
        filter_cutoff_hz: 950.0,
        reverb_decay_seconds: 7.0,
        pad_gain: 0.085,
        bass_gain: 0.08,
        melody_gain: 0.04,
        melody_note_pool: &[440.0, 493.88, 587.33, 659.25, 783.99],
        swing_factor: 0.04,
    },
    GenrePreset {
        name: "electronic",
        base_frequencies: &[87.31, 98.0, 110.0, 130.81],
        chord_patterns: &[MINOR_7, MINOR_9, OPEN_FIFTH],
        tempo_bpm: 120,
        filter_cutoff_hz: 2800.0,
        reverb_decay_seconds: 2.0,
        pad_gain: 0.06,
        bass_gain: 0.18,
        melody_gain: 0.06,
        melody_note_pool: &[349.23, 392.0, 440.0, 523.25, 587.33, 698.46],
        swing_factor: 0.06,
    },
    GenrePreset {
        name: "acoustic",
        base_frequencies: &[110.0, 123.47, 146.83, 164.81, 196.0],
        chord_patterns: &[MAJOR_TRIAD, ADD_9, SUS_4],
        tempo_bpm: 84,
        filter_cutoff_hz: 2000.0,
        reverb_decay_seconds: 2.2,
        pad_gain: 0.065,
        bass_gain: 0.12,
        melody_gain: 0.07,
        melody_note_pool: &[440.0, 493.88, 554.37, 659.25, 739.99, 880.0],
        swing_factor: 0.08,
    },
];

/// Look up a preset by genre name (case-insensitive)
///
/// Unknown genres silently resolve to the `ambient` preset.
pub fn get_preset(genre: &str) -> &'static GenrePreset {
    let genre = genre.trim();
    PRESETS
        .iter()
        .find(|p| p.name.eq_ignore_ascii_case(genre))
        .unwrap_or(&PRESETS[0])
}

/// Names of all known genres
pub fn genres() -> impl Iterator<Item = &'static str> {
    PRESETS.iter().map(|p| p.name)
}
