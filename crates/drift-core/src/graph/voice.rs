//! Sound-generating voices
//!
//! A voice is a weighted sum of oscillators under one gain envelope, routed
//! through either a filtered reverb send or a plain lowpass. A pad chord and
//! its sub share a single voice, so one invocation costs one convolver. The
//! oscillators stop at `stop_frame`; the path keeps rendering its tail until
//! it has drained.

use basedrop::Shared;

use crate::dsp::{Automation, Biquad, ConvolutionKernel, Convolver, Oscillator};
use crate::types::{BusId, StereoSample, VoiceId};

/// Dry share of the filtered reverb send
pub const SEND_DRY: f32 = 0.7;
/// Wet (convolved) share of the filtered reverb send
pub const SEND_WET: f32 = 0.3;

/// Frames a lowpass-only voice keeps rendering after its oscillator stops
const LOWPASS_TAIL_FRAMES: u64 = 512;

/// Kernel handle shared between the voices of one session
pub type SharedKernel = Shared<ConvolutionKernel>;

/// Signal path after the envelope
pub enum VoicePath {
    /// Lowpass feeding a dry/wet split through a convolution reverb
    ReverbSend {
        filter: Biquad,
        convolver: Convolver<SharedKernel>,
    },
    /// Lowpass only (bass)
    Lowpass(Biquad),
}

impl VoicePath {
    pub fn reverb_send(filter: Biquad, kernel: SharedKernel) -> Self {
        VoicePath::ReverbSend {
            filter,
            convolver: Convolver::new(kernel),
        }
    }

    pub fn lowpass(filter: Biquad) -> Self {
        VoicePath::Lowpass(filter)
    }

    #[inline]
    fn process(&mut self, input: f32) -> StereoSample {
        match self {
            VoicePath::ReverbSend { filter, convolver } => {
                let filtered = filter.process(input);
                let (wet_l, wet_r) = convolver.process(filtered);
                StereoSample::new(
                    filtered * SEND_DRY + wet_l * SEND_WET,
                    filtered * SEND_DRY + wet_r * SEND_WET,
                )
            }
            VoicePath::Lowpass(filter) => StereoSample::mono(filter.process(input)),
        }
    }

    fn tail_frames(&self) -> u64 {
        match self {
            VoicePath::ReverbSend { convolver, .. } => convolver.kernel().tail_frames() as u64,
            VoicePath::Lowpass(_) => LOWPASS_TAIL_FRAMES,
        }
    }
}

/// One oscillator and its mix weight within a voice
pub struct Partial {
    pub oscillator: Oscillator,
    pub gain: f32,
}

impl Partial {
    pub fn new(oscillator: Oscillator, gain: f32) -> Self {
        Self { oscillator, gain }
    }
}

/// A scheduled voice owned by its bus on the audio thread
pub struct Voice {
    id: VoiceId,
    bus: BusId,
    partials: Vec<Partial>,
    envelope: Automation,
    path: VoicePath,
    start_frame: u64,
    stop_frame: u64,
    started: bool,
    /// Oscillator has stopped
    ended: bool,
    /// Ended, but the control side has not been told yet
    ended_unreported: bool,
    tail_remaining: u64,
}

impl Voice {
    pub fn new(
        id: VoiceId,
        bus: BusId,
        partials: Vec<Partial>,
        envelope: Automation,
        path: VoicePath,
    ) -> Self {
        Self {
            id,
            bus,
            partials,
            envelope,
            path,
            start_frame: 0,
            stop_frame: u64::MAX,
            started: false,
            ended: false,
            ended_unreported: false,
            tail_remaining: 0,
        }
    }

    /// Set the oscillator start and stop frames
    pub fn scheduled(mut self, start_frame: u64, stop_frame: u64) -> Self {
        self.start_frame = start_frame;
        self.stop_frame = stop_frame;
        self
    }

    pub fn id(&self) -> VoiceId {
        self.id
    }

    pub fn bus(&self) -> BusId {
        self.bus
    }

    pub fn start_frame(&self) -> u64 {
        self.start_frame
    }

    pub fn stop_frame(&self) -> u64 {
        self.stop_frame
    }

    pub fn partial_count(&self) -> usize {
        self.partials.len()
    }

    pub fn has_ended(&self) -> bool {
        self.ended
    }

    /// Oscillator stopped and tail drained; safe to drop
    pub fn is_finished(&self) -> bool {
        self.ended && self.tail_remaining == 0
    }

    /// Bring the stop frame forward. No-op once the oscillator has stopped.
    pub fn force_stop(&mut self, at_frame: u64) {
        if !self.ended {
            self.stop_frame = self.stop_frame.min(at_frame);
        }
    }

    /// Returns true exactly once, after the oscillator has stopped
    pub fn take_ended(&mut self) -> bool {
        std::mem::take(&mut self.ended_unreported)
    }

    /// Mix this voice into `out`, whose first frame is `block_start`
    pub fn render(&mut self, out: &mut [StereoSample], block_start: u64) {
        if self.is_finished() {
            return;
        }
        let block_end = block_start + out.len() as u64;
        if !self.ended && block_end <= self.start_frame && self.stop_frame > self.start_frame {
            return;
        }

        for (i, slot) in out.iter_mut().enumerate() {
            let frame = block_start + i as u64;

            if !self.ended && frame >= self.stop_frame {
                self.ended = true;
                self.ended_unreported = true;
                self.tail_remaining = if self.started { self.path.tail_frames() } else { 0 };
            }

            if !self.ended {
                if frame < self.start_frame {
                    continue;
                }
                self.started = true;
                let mix: f32 = self
                    .partials
                    .iter_mut()
                    .map(|p| p.oscillator.next_sample() * p.gain)
                    .sum();
                let input = mix * self.envelope.next_value(frame);
                *slot += self.path.process(input);
            } else {
                if self.tail_remaining == 0 {
                    break;
                }
                self.tail_remaining -= 1;
                *slot += self.path.process(0.0);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dsp::{create_reverb_impulse, Waveform};
    use crate::engine::gc::gc_handle;
    use rand::SeedableRng;
    use rand_pcg::Pcg32;

    const SR: u32 = 8000;

    fn flat_envelope(level: f32) -> Automation {
        let mut env = Automation::new(0.0);
        env.set_value_at(level, 0);
        env
    }

    fn lowpass_voice(start: u64, stop: u64) -> Voice {
        Voice::new(
            VoiceId(1),
            BusId(1),
            vec![Partial::new(Oscillator::new(Waveform::Sine, 100.0, 0.0, SR), 1.0)],
            flat_envelope(0.5),
            VoicePath::lowpass(Biquad::lowpass(300.0, 2.0, SR)),
        )
        .scheduled(start, stop)
    }

    fn render_blocks(voice: &mut Voice, blocks: usize, block: usize) -> Vec<StereoSample> {
        let mut all = Vec::new();
        for b in 0..blocks {
            let mut out = vec![StereoSample::silence(); block];
            voice.render(&mut out, (b * block) as u64);
            all.extend(out);
        }
        all
    }

    #[test]
    fn test_silent_before_start() {
        let mut voice = lowpass_voice(300, 1000);
        let out = render_blocks(&mut voice, 4, 128);
        assert!(out[..300].iter().all(|s| s.peak() == 0.0));
        assert!(out[300..].iter().any(|s| s.peak() > 0.0));
        assert!(!voice.has_ended());
    }

    #[test]
    fn test_ended_reported_once_then_tail_drains() {
        let mut voice = lowpass_voice(0, 200);
        render_blocks(&mut voice, 2, 128);
        assert!(voice.has_ended());
        assert!(voice.take_ended());
        assert!(!voice.take_ended());
        assert!(!voice.is_finished());

        render_blocks(&mut voice, 6, 128);
        assert!(voice.is_finished());
    }

    #[test]
    fn test_force_stop_before_start_finishes_without_tail() {
        let mut voice = lowpass_voice(500, 1000);
        voice.force_stop(100);
        assert_eq!(voice.stop_frame(), 100);
        let out = render_blocks(&mut voice, 2, 128);
        assert!(out.iter().all(|s| s.peak() == 0.0));
        assert!(voice.take_ended());
        assert!(voice.is_finished());
    }

    #[test]
    fn test_force_stop_after_end_is_noop() {
        let mut voice = lowpass_voice(0, 100);
        render_blocks(&mut voice, 1, 128);
        voice.force_stop(50);
        assert_eq!(voice.stop_frame(), 100);
        voice.force_stop(10_000);
        assert_eq!(voice.stop_frame(), 100);
    }

    #[test]
    fn test_reverb_send_keeps_ringing_after_stop() {
        let mut rng = Pcg32::seed_from_u64(9);
        let ir = create_reverb_impulse(SR, 0.5, &mut rng);
        let kernel = Shared::new(&gc_handle(), ConvolutionKernel::new(&ir, 128));
        let mut voice = Voice::new(
            VoiceId(2),
            BusId(1),
            vec![Partial::new(Oscillator::new(Waveform::Triangle, 220.0, 0.0, SR), 1.0)],
            flat_envelope(0.5),
            VoicePath::reverb_send(Biquad::lowpass(1200.0, 1.0, SR), kernel),
        )
        .scheduled(0, 1024);

        let out = render_blocks(&mut voice, 16, 128);
        assert!(voice.has_ended());
        // Wet tail audible after the oscillator stopped
        let tail_peak = out[1200..2000].iter().map(|s| s.peak()).fold(0.0, f32::max);
        assert!(tail_peak > 1e-4, "tail peak {tail_peak}");
        // Decorrelated channels from the stereo impulse
        assert!(out[1200..2000].iter().any(|s| s.left != s.right));

        render_blocks(&mut voice, 40, 128);
        assert!(voice.is_finished());
    }

    #[test]
    fn test_partials_sum_under_one_envelope() {
        let single = |gain: f32| {
            Voice::new(
                VoiceId(3),
                BusId(1),
                vec![Partial::new(Oscillator::new(Waveform::Sine, 100.0, 0.0, SR), gain)],
                flat_envelope(0.5),
                VoicePath::lowpass(Biquad::lowpass(3000.0, 0.7, SR)),
            )
            .scheduled(0, 400)
        };
        let mut layered = Voice::new(
            VoiceId(4),
            BusId(1),
            vec![
                Partial::new(Oscillator::new(Waveform::Sine, 100.0, 0.0, SR), 0.6),
                Partial::new(Oscillator::new(Waveform::Sine, 100.0, 0.0, SR), 0.4),
            ],
            flat_envelope(0.5),
            VoicePath::lowpass(Biquad::lowpass(3000.0, 0.7, SR)),
        )
        .scheduled(0, 400);
        assert_eq!(layered.partial_count(), 2);

        let reference = render_blocks(&mut single(1.0), 3, 128);
        let summed = render_blocks(&mut layered, 3, 128);
        for (a, b) in reference.iter().zip(&summed) {
            assert!((a.left - b.left).abs() < 1e-5);
        }

        let muted = render_blocks(&mut single(0.0), 3, 128);
        assert!(muted.iter().all(|s| s.peak() == 0.0));
    }

    #[test]
    fn test_reverb_send_stays_near_dry_level() {
        let sr = 48000;
        let mut rng = Pcg32::seed_from_u64(31);
        let ir = create_reverb_impulse(sr, 4.0, &mut rng);
        let kernel = Shared::new(&gc_handle(), ConvolutionKernel::normalized(&ir, 1024));
        let mut voice = Voice::new(
            VoiceId(5),
            BusId(1),
            vec![Partial::new(Oscillator::new(Waveform::Sine, 220.0, 0.0, sr), 1.0)],
            flat_envelope(0.1),
            VoicePath::reverb_send(Biquad::lowpass(2000.0, 0.7, sr), kernel),
        )
        .scheduled(0, sr as u64 * 2);

        let out = render_blocks(&mut voice, (sr as usize * 3) / 1024, 1024);
        let peak = out.iter().map(|s| s.peak()).fold(0.0, f32::max);
        // Dry alone peaks near 0.1 * SEND_DRY
        assert!(peak > 0.1 * SEND_DRY * 0.8, "peak {peak}");
        assert!(peak < 0.1 * 1.5, "send output far above its input: {peak}");
    }
}
