//! Biquad lowpass filter (RBJ cookbook)

use std::f32::consts::PI;

/// Biquad filter coefficients, normalized by a0
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BiquadCoeffs {
    b0: f32, b1: f32, b2: f32,
    a1: f32, a2: f32,
}

impl BiquadCoeffs {
    /// Create lowpass coefficients
    ///
    /// Cutoff is clamped into (10 Hz, 0.45 * sample rate) so a preset cutoff
    /// never crosses Nyquist at low device rates.
    pub fn lowpass(cutoff_hz: f32, q: f32, sample_rate: f32) -> Self {
        let freq = cutoff_hz.clamp(10.0, sample_rate * 0.45);
        let w0 = 2.0 * PI * freq / sample_rate;
        let cos_w0 = w0.cos();
        let sin_w0 = w0.sin();
        let alpha = sin_w0 / (2.0 * q.max(0.01));

        let a0 = 1.0 + alpha;
        Self {
            b0: ((1.0 - cos_w0) / 2.0) / a0,
            b1: (1.0 - cos_w0) / a0,
            b2: ((1.0 - cos_w0) / 2.0) / a0,
            a1: (-2.0 * cos_w0) / a0,
            a2: (1.0 - alpha) / a0,
        }
    }

    /// Pass-through (no filtering)
    pub fn passthrough() -> Self {
        Self { b0: 1.0, b1: 0.0, b2: 0.0, a1: 0.0, a2: 0.0 }
    }
}

/// Mono biquad with its own state
#[derive(Debug, Clone)]
pub struct Biquad {
    coeffs: BiquadCoeffs,
    x1: f32, x2: f32,
    y1: f32, y2: f32,
}

impl Biquad {
    pub fn new(coeffs: BiquadCoeffs) -> Self {
        Self { coeffs, x1: 0.0, x2: 0.0, y1: 0.0, y2: 0.0 }
    }

    pub fn lowpass(cutoff_hz: f32, q: f32, sample_rate: u32) -> Self {
        Self::new(BiquadCoeffs::lowpass(cutoff_hz, q, sample_rate as f32))
    }

    #[inline]
    pub fn process(&mut self, input: f32) -> f32 {
        let c = &self.coeffs;
        let out = c.b0 * input + c.b1 * self.x1 + c.b2 * self.x2 - c.a1 * self.y1 - c.a2 * self.y2;
        self.x2 = self.x1;
        self.x1 = input;
        self.y2 = self.y1;
        self.y1 = out;
        out
    }

    pub fn reset(&mut self) {
        self.x1 = 0.0;
        self.x2 = 0.0;
        self.y1 = 0.0;
        self.y2 = 0.0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dsp::oscillator::{Oscillator, Waveform};

    fn steady_state_peak(filter: &mut Biquad, freq: f32, sample_rate: u32) -> f32 {
        let mut osc = Oscillator::new(Waveform::Sine, freq, 0.0, sample_rate);
        for _ in 0..sample_rate {
            filter.process(osc.next_sample());
        }
        (0..sample_rate / 10)
            .map(|_| filter.process(osc.next_sample()).abs())
            .fold(0.0, f32::max)
    }

    #[test]
    fn test_lowpass_passes_dc() {
        let mut filter = Biquad::lowpass(300.0, 2.0, 48000);
        let mut out = 0.0;
        for _ in 0..48000 {
            out = filter.process(1.0);
        }
        assert!((out - 1.0).abs() < 1e-3);
    }

    #[test]
    fn test_lowpass_attenuates_above_cutoff() {
        let sr = 48000;
        let low = steady_state_peak(&mut Biquad::lowpass(1000.0, 1.0, sr), 100.0, sr);
        let high = steady_state_peak(&mut Biquad::lowpass(1000.0, 1.0, sr), 8000.0, sr);
        assert!(low > 0.9, "passband peak {low}");
        assert!(high < 0.05, "stopband peak {high}");
    }

    #[test]
    fn test_cutoff_above_nyquist_is_stable() {
        let mut filter = Biquad::lowpass(20_000.0, 1.0, 8000);
        let peak = steady_state_peak(&mut filter, 440.0, 8000);
        assert!(peak.is_finite() && peak < 1.5);
    }

    #[test]
    fn test_passthrough() {
        let mut filter = Biquad::new(BiquadCoeffs::passthrough());
        assert_eq!(filter.process(0.3), 0.3);
        filter.reset();
        assert_eq!(filter.process(-0.7), -0.7);
    }
}
