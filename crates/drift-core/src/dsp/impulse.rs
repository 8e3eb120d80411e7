//! Synthetic reverb impulse responses
//!
//! Exponentially-shaped noise: each channel is independent uniform noise in
//! [-1, 1) under a `(1 - t)^2.5` envelope. Cheap to generate and dense enough
//! to read as a diffuse hall tail.

use rand::Rng;

/// Curve exponent of the decay envelope
pub const DECAY_EXPONENT: f32 = 2.5;

/// Calibration gain applied on top of 1/RMS (-58 dB)
pub const NORMALIZATION_GAIN: f32 = 0.00125;
/// Sample rate the calibration gain was measured at
pub const NORMALIZATION_SAMPLE_RATE: f32 = 44100.0;
/// Floor on the measured power so near-silent responses stay bounded
pub const NORMALIZATION_MIN_POWER: f32 = 0.000125;

/// Stereo impulse response
#[derive(Debug, Clone)]
pub struct ImpulseResponse {
    sample_rate: u32,
    channels: [Vec<f32>; 2],
}

impl ImpulseResponse {
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Length in frames
    pub fn len(&self) -> usize {
        self.channels[0].len()
    }

    pub fn is_empty(&self) -> bool {
        self.channels[0].is_empty()
    }

    pub fn channel(&self, index: usize) -> &[f32] {
        &self.channels[index]
    }

    pub fn channels(&self) -> &[Vec<f32>; 2] {
        &self.channels
    }

    pub fn duration_secs(&self) -> f64 {
        self.len() as f64 / self.sample_rate as f64
    }

    /// Gain that brings a convolution through this response to roughly unity
    ///
    /// `1 / RMS` over both channels, times the calibration gain, times
    /// `44100 / sample_rate` so longer responses at higher rates do not
    /// come out louder.
    pub fn normalization_scale(&self) -> f32 {
        let frames = (self.channels.len() * self.len()).max(1);
        let energy: f64 = self
            .channels
            .iter()
            .flat_map(|channel| channel.iter())
            .map(|s| (*s as f64) * (*s as f64))
            .sum();
        let mut power = (energy / frames as f64).sqrt() as f32;
        if !power.is_finite() || power < NORMALIZATION_MIN_POWER {
            power = NORMALIZATION_MIN_POWER;
        }
        let mut scale = NORMALIZATION_GAIN / power;
        if self.sample_rate > 0 {
            scale *= NORMALIZATION_SAMPLE_RATE / self.sample_rate as f32;
        }
        scale
    }
}

/// Generate a stereo noise impulse `sample_rate * decay_seconds` frames long
///
/// Never returns an empty response: non-positive decays yield one frame.
pub fn create_reverb_impulse<R: Rng + ?Sized>(
    sample_rate: u32,
    decay_seconds: f32,
    rng: &mut R,
) -> ImpulseResponse {
    let length = ((sample_rate as f64 * decay_seconds.max(0.0) as f64).round() as usize).max(1);
    let mut channels = [Vec::with_capacity(length), Vec::with_capacity(length)];

    for channel in channels.iter_mut() {
        for i in 0..length {
            let envelope = (1.0 - i as f32 / length as f32).powf(DECAY_EXPONENT);
            channel.push(rng.gen_range(-1.0f32..1.0) * envelope);
        }
    }

    ImpulseResponse { sample_rate, channels }
}
