//! Uniformly partitioned FFT convolution
//!
//! The impulse response is cut into blocks of `B` frames and each block is
//! transformed once into a [`ConvolutionKernel`]. A [`Convolver`] keeps a
//! frequency-domain delay line of its recent input blocks and produces each
//! output block as the sum of products against every partition (overlap-save
//! on 2B-point transforms). Output lags input by exactly one block.
//!
//! Kernels are immutable and shared between voices; convolvers hold only
//! per-voice state and are fully allocated up front.

use std::sync::Arc;

use realfft::num_complex::Complex;
use realfft::{ComplexToReal, RealFftPlanner, RealToComplex};

use super::impulse::ImpulseResponse;

/// Transformed impulse response plus the FFT plans to use it
pub struct ConvolutionKernel {
    block_size: usize,
    ir_len: usize,
    /// partitions[channel][partition] spectrum, B + 1 bins each
    partitions: [Vec<Vec<Complex<f32>>>; 2],
    forward: Arc<dyn RealToComplex<f32>>,
    inverse: Arc<dyn ComplexToReal<f32>>,
}

impl std::fmt::Debug for ConvolutionKernel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConvolutionKernel")
            .field("block_size", &self.block_size)
            .field("ir_len", &self.ir_len)
            .field("partitions", &self.partition_count())
            .finish()
    }
}

impl ConvolutionKernel {
    /// Partition and transform `ir` as-is with a block size of `block_size` frames
    pub fn new(ir: &ImpulseResponse, block_size: usize) -> Self {
        Self::with_scale(ir, block_size, 1.0)
    }

    /// Like [`ConvolutionKernel::new`], but scaled by
    /// [`ImpulseResponse::normalization_scale`] so the wet signal sits near
    /// the level of its input
    pub fn normalized(ir: &ImpulseResponse, block_size: usize) -> Self {
        Self::with_scale(ir, block_size, ir.normalization_scale())
    }

    fn with_scale(ir: &ImpulseResponse, block_size: usize, scale: f32) -> Self {
        let block_size = block_size.max(16).next_power_of_two();
        let fft_len = block_size * 2;

        let mut planner = RealFftPlanner::<f32>::new();
        let forward = planner.plan_fft_forward(fft_len);
        let inverse = planner.plan_fft_inverse(fft_len);

        let mut time = forward.make_input_vec();
        let mut scratch = forward.make_scratch_vec();

        let partitions = ir.channels().each_ref().map(|channel| {
            channel
                .chunks(block_size)
                .map(|chunk| {
                    time.fill(0.0);
                    for (dst, src) in time.iter_mut().zip(chunk) {
                        *dst = src * scale;
                    }
                    let mut spectrum = forward.make_output_vec();
                    if forward
                        .process_with_scratch(&mut time, &mut spectrum, &mut scratch)
                        .is_err()
                    {
                        spectrum.fill(Complex::new(0.0, 0.0));
                    }
                    spectrum
                })
                .collect::<Vec<_>>()
        });

        Self {
            block_size,
            ir_len: ir.len(),
            partitions,
            forward,
            inverse,
        }
    }

    pub fn block_size(&self) -> usize {
        self.block_size
    }

    pub fn partition_count(&self) -> usize {
        self.partitions[0].len()
    }

    /// Frames of output still produced after the input goes silent
    pub fn tail_frames(&self) -> usize {
        self.ir_len + self.block_size
    }
}

/// Per-voice convolution state (mono in, stereo out)
pub struct Convolver<K: std::ops::Deref<Target = ConvolutionKernel>> {
    kernel: K,
    /// Sliding window: previous block followed by the block being filled
    window: Vec<f32>,
    fft_in: Vec<f32>,
    /// Ring of past input spectra, newest at `head`
    history: Vec<Vec<Complex<f32>>>,
    head: usize,
    accum: Vec<Complex<f32>>,
    time_out: Vec<f32>,
    forward_scratch: Vec<Complex<f32>>,
    inverse_scratch: Vec<Complex<f32>>,
    output: [Vec<f32>; 2],
    pos: usize,
}

impl<K: std::ops::Deref<Target = ConvolutionKernel>> Convolver<K> {
    pub fn new(kernel: K) -> Self {
        let block = kernel.block_size;
        let partitions = kernel.partition_count().max(1);
        let bins = block + 1;
        let forward_scratch = kernel.forward.make_scratch_vec();
        let inverse_scratch = kernel.inverse.make_scratch_vec();
        Self {
            window: vec![0.0; block * 2],
            fft_in: vec![0.0; block * 2],
            history: vec![vec![Complex::new(0.0, 0.0); bins]; partitions],
            head: 0,
            accum: vec![Complex::new(0.0, 0.0); bins],
            time_out: vec![0.0; block * 2],
            forward_scratch,
            inverse_scratch,
            output: [vec![0.0; block], vec![0.0; block]],
            pos: 0,
            kernel,
        }
    }

    pub fn kernel(&self) -> &ConvolutionKernel {
        &self.kernel
    }

    /// Feed one input sample, get one stereo output sample
    #[inline]
    pub fn process(&mut self, input: f32) -> (f32, f32) {
        let block = self.kernel.block_size;
        self.window[block + self.pos] = input;
        let out = (self.output[0][self.pos], self.output[1][self.pos]);
        self.pos += 1;
        if self.pos == block {
            self.pos = 0;
            self.process_block();
        }
        out
    }

    fn process_block(&mut self) {
        let kernel = &*self.kernel;
        let block = kernel.block_size;
        let partitions = self.history.len();

        self.head = (self.head + 1) % partitions;
        self.fft_in.copy_from_slice(&self.window);
        if kernel
            .forward
            .process_with_scratch(&mut self.fft_in, &mut self.history[self.head], &mut self.forward_scratch)
            .is_err()
        {
            self.history[self.head].fill(Complex::new(0.0, 0.0));
        }

        let norm = 1.0 / (block * 2) as f32;
        for (channel, spectra) in kernel.partitions.iter().enumerate() {
            self.accum.fill(Complex::new(0.0, 0.0));
            for (p, h) in spectra.iter().enumerate() {
                let x = &self.history[(self.head + partitions - p) % partitions];
                for ((acc, x), h) in self.accum.iter_mut().zip(x).zip(h) {
                    *acc += x * h;
                }
            }
            // DC and Nyquist bins of a real signal carry no imaginary part
            self.accum[0].im = 0.0;
            self.accum[block].im = 0.0;

            if kernel
                .inverse
                .process_with_scratch(&mut self.accum, &mut self.time_out, &mut self.inverse_scratch)
                .is_err()
            {
                self.time_out.fill(0.0);
            }
            for (dst, src) in self.output[channel].iter_mut().zip(&self.time_out[block..]) {
                *dst = src * norm;
            }
        }

        // Slide: the block just filled becomes the previous block
        self.window.copy_within(block.., 0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dsp::impulse::create_reverb_impulse;
    use rand::SeedableRng;
    use rand_pcg::Pcg32;

    /// Direct-form reference convolution of `input` with one IR channel
    fn direct(input: &[f32], ir: &[f32], len: usize) -> Vec<f32> {
        (0..len)
            .map(|n| {
                (0..=n.min(ir.len() - 1))
                    .filter(|k| n - k < input.len())
                    .map(|k| ir[k] * input[n - k])
                    .sum()
            })
            .collect()
    }

    #[test]
    fn test_matches_direct_convolution_with_one_block_latency() {
        let mut rng = Pcg32::seed_from_u64(42);
        let ir = create_reverb_impulse(8000, 0.05, &mut rng); // 400 frames
        let kernel = Arc::new(ConvolutionKernel::new(&ir, 64));
        assert_eq!(kernel.block_size(), 64);
        assert_eq!(kernel.partition_count(), 7);

        let input: Vec<f32> = (0..300).map(|i| ((i * 7919) % 200) as f32 / 100.0 - 1.0).collect();
        let total = 900;
        let mut conv = Convolver::new(kernel.clone());
        let mut out_l = Vec::with_capacity(total);
        let mut out_r = Vec::with_capacity(total);
        for n in 0..total {
            let (l, r) = conv.process(input.get(n).copied().unwrap_or(0.0));
            out_l.push(l);
            out_r.push(r);
        }

        let expected_l = direct(&input, ir.channel(0), total - 64);
        let expected_r = direct(&input, ir.channel(1), total - 64);
        for n in 0..total - 64 {
            assert!((out_l[n + 64] - expected_l[n]).abs() < 1e-3, "left frame {n}");
            assert!((out_r[n + 64] - expected_r[n]).abs() < 1e-3, "right frame {n}");
        }
        assert!(out_l[..64].iter().all(|s| *s == 0.0));
    }

    #[test]
    fn test_impulse_in_reproduces_ir() {
        let mut rng = Pcg32::seed_from_u64(5);
        let ir = create_reverb_impulse(8000, 0.1, &mut rng);
        let kernel = Arc::new(ConvolutionKernel::new(&ir, 128));
        let mut conv = Convolver::new(kernel.clone());

        let mut out = Vec::new();
        for n in 0..kernel.tail_frames() {
            out.push(conv.process(if n == 0 { 1.0 } else { 0.0 }).0);
        }
        for (i, want) in ir.channel(0).iter().enumerate() {
            assert!((out[i + 128] - want).abs() < 1e-4, "frame {i}");
        }
    }

    #[test]
    fn test_block_size_rounded_to_power_of_two() {
        let mut rng = Pcg32::seed_from_u64(1);
        let ir = create_reverb_impulse(8000, 0.01, &mut rng);
        let kernel = ConvolutionKernel::new(&ir, 100);
        assert_eq!(kernel.block_size(), 128);
        assert_eq!(kernel.partition_count(), 1);
        assert_eq!(kernel.tail_frames(), 80 + 128);
    }

    #[test]
    fn test_normalized_kernel_scales_response() {
        let mut rng = Pcg32::seed_from_u64(5);
        let ir = create_reverb_impulse(8000, 0.1, &mut rng);
        let scale = ir.normalization_scale();
        let kernel = Arc::new(ConvolutionKernel::normalized(&ir, 128));
        let mut conv = Convolver::new(kernel.clone());

        let mut out = Vec::new();
        for n in 0..kernel.tail_frames() {
            out.push(conv.process(if n == 0 { 1.0 } else { 0.0 }).1);
        }
        for (i, want) in ir.channel(1).iter().enumerate() {
            assert!((out[i + 128] - want * scale).abs() < 1e-5, "frame {i}");
        }
    }

    #[test]
    fn test_normalized_wet_level_near_input_level() {
        let mut rng = Pcg32::seed_from_u64(23);
        let ir = create_reverb_impulse(48000, 4.0, &mut rng);
        let kernel = Arc::new(ConvolutionKernel::normalized(&ir, 1024));
        let mut conv = Convolver::new(kernel);

        let amplitude = 0.1f32;
        let step = std::f32::consts::TAU * 220.0 / 48000.0;
        let mut peak = 0.0f32;
        for n in 0..48000 * 3 {
            let (l, r) = conv.process(amplitude * (step * n as f32).sin());
            peak = peak.max(l.abs()).max(r.abs());
        }
        assert!(peak > amplitude * 0.01, "wet path silent: {peak}");
        assert!(peak < amplitude * 3.0, "wet path too hot: {peak}");
    }
}
