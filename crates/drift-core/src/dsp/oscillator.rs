//! Phase-accumulating oscillators

use std::f64::consts::TAU;

/// Oscillator waveform
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Waveform {
    Sine,
    Triangle,
}

impl Waveform {
    pub fn name(&self) -> &'static str {
        match self {
            Waveform::Sine => "sine",
            Waveform::Triangle => "triangle",
        }
    }
}

/// Mono oscillator with a detune offset kept separate from its frequency
#[derive(Debug, Clone)]
pub struct Oscillator {
    waveform: Waveform,
    frequency: f32,
    detune_cents: f32,
    /// Normalized phase in [0, 1)
    phase: f64,
    increment: f64,
}

impl Oscillator {
    pub fn new(waveform: Waveform, frequency: f32, detune_cents: f32, sample_rate: u32) -> Self {
        let effective = frequency as f64 * 2f64.powf(detune_cents as f64 / 1200.0);
        Self {
            waveform,
            frequency,
            detune_cents,
            phase: 0.0,
            increment: effective / sample_rate.max(1) as f64,
        }
    }

    pub fn waveform(&self) -> Waveform {
        self.waveform
    }

    /// Nominal frequency (before detune)
    pub fn frequency(&self) -> f32 {
        self.frequency
    }

    pub fn detune_cents(&self) -> f32 {
        self.detune_cents
    }

    /// Frequency actually produced, detune applied
    pub fn effective_frequency(&self, sample_rate: u32) -> f64 {
        self.increment * sample_rate as f64
    }

    /// Produce the next sample and advance the phase
    #[inline]
    pub fn next_sample(&mut self) -> f32 {
        let value = match self.waveform {
            Waveform::Sine => (self.phase * TAU).sin(),
            Waveform::Triangle => {
                // Shifted so the wave starts at zero and rises
                let p = (self.phase + 0.25).fract();
                1.0 - 4.0 * (p - 0.5).abs()
            }
        };
        self.phase = (self.phase + self.increment).fract();
        value as f32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sine_starts_at_zero_and_peaks_at_quarter() {
        // 1 Hz at 4 Hz sample rate: quarter-cycle steps
        let mut osc = Oscillator::new(Waveform::Sine, 1.0, 0.0, 4);
        assert!(osc.next_sample().abs() < 1e-6);
        assert!((osc.next_sample() - 1.0).abs() < 1e-6);
        assert!(osc.next_sample().abs() < 1e-6);
        assert!((osc.next_sample() + 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_triangle_shape() {
        let mut osc = Oscillator::new(Waveform::Triangle, 1.0, 0.0, 8);
        let samples: Vec<f32> = (0..8).map(|_| osc.next_sample()).collect();
        let expected = [0.0, 0.5, 1.0, 0.5, 0.0, -0.5, -1.0, -0.5];
        for (got, want) in samples.iter().zip(expected) {
            assert!((got - want).abs() < 1e-6, "{samples:?}");
        }
    }

    #[test]
    fn test_detune_shifts_effective_frequency_only() {
        let osc = Oscillator::new(Waveform::Sine, 440.0, 1200.0, 48000);
        assert_eq!(osc.frequency(), 440.0);
        assert!((osc.effective_frequency(48000) - 880.0).abs() < 1e-6);

        let flat = Oscillator::new(Waveform::Sine, 440.0, -5.0, 48000);
        assert!(flat.effective_frequency(48000) < 440.0);
    }

    #[test]
    fn test_output_bounded() {
        for waveform in [Waveform::Sine, Waveform::Triangle] {
            let mut osc = Oscillator::new(waveform, 331.0, 3.0, 48000);
            for _ in 0..10_000 {
                assert!(osc.next_sample().abs() <= 1.0 + 1e-6);
            }
        }
    }
}
