//! Venue output buses
//!
//! One bus per venue session. It owns the session's voices on the audio
//! thread, sums them and applies the session's automated output gain.

use basedrop::Owned;

use super::voice::Voice;
use crate::dsp::Automation;
use crate::types::{BusId, StereoBuffer, VoiceId};

/// Voice slots reserved per bus so starting a voice does not reallocate
pub const BUS_VOICE_CAPACITY: usize = 64;

pub struct Bus {
    id: BusId,
    gain: Automation,
    voices: Vec<Owned<Voice>>,
    buffer: StereoBuffer,
    remove_at: Option<u64>,
}

impl Bus {
    /// Create a bus holding `gain` until automated
    pub fn new(id: BusId, gain: f32, max_block_frames: usize) -> Self {
        Self {
            id,
            gain: Automation::new(gain),
            voices: Vec::with_capacity(BUS_VOICE_CAPACITY),
            buffer: StereoBuffer::silence(max_block_frames),
            remove_at: None,
        }
    }

    pub fn id(&self) -> BusId {
        self.id
    }

    pub fn voice_count(&self) -> usize {
        self.voices.len()
    }

    pub fn voices(&self) -> impl Iterator<Item = &Voice> {
        self.voices.iter().map(|v| &**v)
    }

    pub fn gain_at(&self, frame: u64) -> f32 {
        self.gain.value_at(frame)
    }

    pub fn remove_at(&self) -> Option<u64> {
        self.remove_at
    }

    pub(crate) fn add_voice(&mut self, voice: Owned<Voice>) {
        self.voices.push(voice);
    }

    pub(crate) fn stop_voice(&mut self, id: VoiceId, at_frame: u64) -> bool {
        match self.voices.iter_mut().find(|v| v.id() == id) {
            Some(voice) => {
                voice.force_stop(at_frame);
                true
            }
            None => false,
        }
    }

    pub(crate) fn ramp_gain(&mut self, target: f32, start: u64, end: u64) {
        self.gain.ramp_from_current(start, target, end);
    }

    pub(crate) fn schedule_removal(&mut self, at_frame: u64) {
        self.remove_at = Some(self.remove_at.map_or(at_frame, |prev| prev.min(at_frame)));
    }

    /// Render `frames` frames starting at `block_start` into the bus buffer
    pub(crate) fn render(&mut self, frames: usize, block_start: u64) {
        self.buffer.set_len_from_capacity(frames);
        self.buffer.fill_silence();

        let out = self.buffer.as_mut_slice();
        for voice in self.voices.iter_mut() {
            voice.render(out, block_start);
        }
        for (i, sample) in out.iter_mut().enumerate() {
            *sample *= self.gain.next_value(block_start + i as u64);
        }
    }

    pub(crate) fn buffer(&self) -> &StereoBuffer {
        &self.buffer
    }

    /// Report voices whose oscillator stopped since the last call
    pub(crate) fn drain_ended(&mut self, mut on_ended: impl FnMut(VoiceId)) {
        for voice in self.voices.iter_mut() {
            if voice.take_ended() {
                on_ended(voice.id());
            }
        }
    }

    /// Drop voices whose tails have drained (deallocation is deferred)
    pub(crate) fn retain_unfinished(&mut self) {
        self.voices.retain(|v| !v.is_finished());
    }

    /// Voices never reported as ended; used when the bus goes away
    pub(crate) fn drain_unreported(&mut self, mut on_ended: impl FnMut(VoiceId)) {
        for voice in self.voices.iter_mut() {
            if voice.take_ended() || !voice.has_ended() {
                on_ended(voice.id());
            }
        }
    }
}
