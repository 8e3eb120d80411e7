//! Common types for Drift
//!
//! Fundamental audio types shared by the render graph and the engine:
//! stereo sample/buffer handling, node identifiers and the layer enum.

use std::ops::{Index, IndexMut};

/// Default sample rate (48kHz). The actual rate comes from the output device.
pub const SAMPLE_RATE: u32 = 48000;

/// Number of self-scheduling layers per venue session (pad, bass, melody)
pub const NUM_LAYERS: usize = 3;

/// Audio sample type (32-bit float for processing)
pub type Sample = f32;

/// Layer identifiers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(usize)]
pub enum Layer {
    Pad = 0,
    Bass = 1,
    Melody = 2,
}

impl Layer {
    /// All layers in start order
    pub const ALL: [Layer; NUM_LAYERS] = [Layer::Pad, Layer::Bass, Layer::Melody];

    /// Get the name of this layer
    pub fn name(&self) -> &'static str {
        match self {
            Layer::Pad => "pad",
            Layer::Bass => "bass",
            Layer::Melody => "melody",
        }
    }
}

/// Identifier of a sound-generating voice in the render graph
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct VoiceId(pub u64);

/// Identifier of a venue output bus (the session's output gain node)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BusId(pub u64);

/// A single stereo sample (left and right channels)
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct StereoSample {
    pub left: Sample,
    pub right: Sample,
}

impl StereoSample {
    /// Create a new stereo sample
    #[inline]
    pub fn new(left: Sample, right: Sample) -> Self {
        Self { left, right }
    }

    /// Create a silent stereo sample
    #[inline]
    pub fn silence() -> Self {
        Self::default()
    }

    /// Create a mono sample (same value in both channels)
    #[inline]
    pub fn mono(value: Sample) -> Self {
        Self { left: value, right: value }
    }

    /// Get the peak amplitude (max of abs(left), abs(right))
    #[inline]
    pub fn peak(&self) -> Sample {
        self.left.abs().max(self.right.abs())
    }
}

impl std::ops::Add for StereoSample {
    type Output = Self;

    #[inline]
    fn add(self, other: Self) -> Self {
        Self {
            left: self.left + other.left,
            right: self.right + other.right,
        }
    }
}

impl std::ops::AddAssign for StereoSample {
    #[inline]
    fn add_assign(&mut self, other: Self) {
        self.left += other.left;
        self.right += other.right;
    }
}

impl std::ops::Mul<Sample> for StereoSample {
    type Output = Self;

    #[inline]
    fn mul(self, factor: Sample) -> Self {
        Self {
            left: self.left * factor,
            right: self.right * factor,
        }
    }
}

impl std::ops::MulAssign<Sample> for StereoSample {
    #[inline]
    fn mul_assign(&mut self, factor: Sample) {
        self.left *= factor;
        self.right *= factor;
    }
}

/// A buffer of stereo samples
///
/// The render graph pre-allocates these at their maximum block size and only
/// moves the working length inside the audio callback.
#[derive(Debug, Clone, Default)]
pub struct StereoBuffer {
    samples: Vec<StereoSample>,
}

impl StereoBuffer {
    /// Create a buffer filled with silence
    pub fn silence(len: usize) -> Self {
        Self {
            samples: vec![StereoSample::silence(); len],
        }
    }

    /// Create an empty buffer with room for `capacity` frames
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            samples: Vec::with_capacity(capacity),
        }
    }

    /// Get the number of stereo samples in the buffer
    #[inline]
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// Check if the buffer is empty
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Set the working length of a pre-allocated buffer (real-time safe)
    ///
    /// Fills any newly exposed elements with silence.
    #[inline]
    pub fn set_len_from_capacity(&mut self, new_len: usize) {
        if new_len > self.samples.len() {
            debug_assert!(
                new_len <= self.samples.capacity(),
                "set_len_from_capacity called with len > capacity"
            );
            self.samples.resize(new_len, StereoSample::silence());
        } else {
            self.samples.truncate(new_len);
        }
    }

    /// Fill the buffer with silence
    pub fn fill_silence(&mut self) {
        self.samples.fill(StereoSample::silence());
    }

    /// Get a slice of the samples
    #[inline]
    pub fn as_slice(&self) -> &[StereoSample] {
        &self.samples
    }

    /// Get a mutable slice of the samples
    #[inline]
    pub fn as_mut_slice(&mut self) -> &mut [StereoSample] {
        &mut self.samples
    }

    /// Append another buffer's samples (allocates; offline use only)
    pub fn extend_from(&mut self, other: &StereoBuffer) {
        self.samples.extend_from_slice(&other.samples);
    }

    /// Get an iterator over the samples
    pub fn iter(&self) -> impl Iterator<Item = &StereoSample> {
        self.samples.iter()
    }

    /// Get a mutable iterator over the samples
    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut StereoSample> {
        self.samples.iter_mut()
    }

    /// Get the peak amplitude in the buffer
    pub fn peak(&self) -> Sample {
        self.samples.iter().map(|s| s.peak()).fold(0.0, Sample::max)
    }

    /// RMS over both channels
    pub fn rms(&self) -> Sample {
        if self.samples.is_empty() {
            return 0.0;
        }
        let sum: f64 = self
            .samples
            .iter()
            .map(|s| (s.left as f64).powi(2) + (s.right as f64).powi(2))
            .sum();
        (sum / (self.samples.len() * 2) as f64).sqrt() as Sample
    }
}

impl Index<usize> for StereoBuffer {
    type Output = StereoSample;

    #[inline]
    fn index(&self, index: usize) -> &Self::Output {
        &self.samples[index]
    }
}

impl IndexMut<usize> for StereoBuffer {
    #[inline]
    fn index_mut(&mut self, index: usize) -> &mut Self::Output {
        &mut self.samples[index]
    }
}

/// Convert seconds on the audio timeline to a frame index
#[inline]
pub fn seconds_to_frames(seconds: f64, sample_rate: u32) -> u64 {
    (seconds.max(0.0) * sample_rate as f64).round() as u64
}

/// Convert a frame index to seconds on the audio timeline
#[inline]
pub fn frames_to_seconds(frames: u64, sample_rate: u32) -> f64 {
    frames as f64 / sample_rate as f64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stereo_sample_operations() {
        let a = StereoSample::new(1.0, 2.0);
        let b = StereoSample::new(0.5, 0.5);

        let sum = a + b;
        assert_eq!(sum.left, 1.5);
        assert_eq!(sum.right, 2.5);

        let scaled = a * 0.5;
        assert_eq!(scaled.left, 0.5);
        assert_eq!(scaled.right, 1.0);
    }

    #[test]
    fn test_set_len_from_capacity_keeps_allocation() {
        let mut buffer = StereoBuffer::silence(512);
        buffer.set_len_from_capacity(128);
        assert_eq!(buffer.len(), 128);
        buffer.set_len_from_capacity(512);
        assert_eq!(buffer.len(), 512);
        assert_eq!(buffer.peak(), 0.0);
    }

    #[test]
    fn test_rms_of_constant_signal() {
        let mut buffer = StereoBuffer::silence(64);
        for s in buffer.iter_mut() {
            *s = StereoSample::mono(0.5);
        }
        assert!((buffer.rms() - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_frame_conversion() {
        assert_eq!(seconds_to_frames(4.0, 48000), 192_000);
        assert_eq!(seconds_to_frames(-1.0, 48000), 0);
        assert_eq!(frames_to_seconds(24_000, 48000), 0.5);
    }

    #[test]
    fn test_layer_enumeration() {
        assert_eq!(Layer::ALL.len(), NUM_LAYERS);
        assert_eq!(Layer::Bass.name(), "bass");
        assert_eq!(Layer::Melody as usize, 2);
    }
}
