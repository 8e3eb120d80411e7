//! Sample-accurate parameter automation
//!
//! A timeline of set/linear/exponential events on the audio frame clock.
//! Ramps run from the previous event's value and frame to their own; before
//! the first event the initial value holds, after the last event its value
//! holds.

/// Smallest magnitude an exponential ramp may touch
pub const EXP_FLOOR: f32 = 1e-4;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Curve {
    /// Jump to the value at the event frame
    Set,
    Linear,
    Exponential,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AutomationEvent {
    pub frame: u64,
    pub value: f32,
    pub curve: Curve,
}

/// Automated parameter (gain envelope or bus gain)
#[derive(Debug, Clone)]
pub struct Automation {
    initial: f32,
    events: Vec<AutomationEvent>,
    /// Index of the first event not yet reached; render time only moves forward
    cursor: usize,
}

impl Automation {
    pub fn new(initial: f32) -> Self {
        Self {
            initial,
            events: Vec::with_capacity(4),
            cursor: 0,
        }
    }

    pub fn set_value_at(&mut self, value: f32, frame: u64) -> &mut Self {
        self.push(AutomationEvent { frame, value, curve: Curve::Set })
    }

    pub fn linear_ramp_to(&mut self, value: f32, frame: u64) -> &mut Self {
        self.push(AutomationEvent { frame, value, curve: Curve::Linear })
    }

    /// Exponential ramp; both endpoints are clamped away from zero
    pub fn exponential_ramp_to(&mut self, value: f32, frame: u64) -> &mut Self {
        self.push(AutomationEvent {
            frame,
            value: value.max(EXP_FLOOR),
            curve: Curve::Exponential,
        })
    }

    fn push(&mut self, event: AutomationEvent) -> &mut Self {
        // Keep the timeline sorted; equal frames keep insertion order
        let at = self.events.partition_point(|e| e.frame <= event.frame);
        self.events.insert(at, event);
        self.cursor = self.cursor.min(at);
        self
    }

    /// Drop every event and ramp linearly from the value held at `from`
    /// to `target` at `to`
    ///
    /// Reuses the event storage, so it is safe on the audio thread once the
    /// timeline has held two events.
    pub fn ramp_from_current(&mut self, from: u64, target: f32, to: u64) {
        let current = self.value_at(from);
        self.events.clear();
        self.cursor = 0;
        self.events.push(AutomationEvent { frame: from, value: current, curve: Curve::Set });
        self.events.push(AutomationEvent {
            frame: to.max(from),
            value: target,
            curve: Curve::Linear,
        });
    }

    pub fn events(&self) -> &[AutomationEvent] {
        &self.events
    }

    /// Value at `frame` without touching the cursor
    pub fn value_at(&self, frame: u64) -> f32 {
        let next = self.events.partition_point(|e| e.frame <= frame);
        self.evaluate(next, frame)
    }

    /// Value at `frame`, advancing the cursor
    ///
    /// Frames must be non-decreasing between calls.
    #[inline]
    pub fn next_value(&mut self, frame: u64) -> f32 {
        while self.cursor < self.events.len() && self.events[self.cursor].frame <= frame {
            self.cursor += 1;
        }
        self.evaluate(self.cursor, frame)
    }

    /// `next` is the index of the first event strictly after `frame`
    #[inline]
    fn evaluate(&self, next: usize, frame: u64) -> f32 {
        let (prev_frame, prev_value) = match next {
            0 => (0, self.initial),
            i => (self.events[i - 1].frame, self.events[i - 1].value),
        };
        let Some(target) = self.events.get(next) else {
            return prev_value;
        };

        match target.curve {
            Curve::Set => prev_value,
            Curve::Linear => {
                let span = (target.frame - prev_frame) as f64;
                let t = (frame - prev_frame) as f64 / span;
                (prev_value as f64 + (target.value - prev_value) as f64 * t) as f32
            }
            Curve::Exponential => {
                let span = (target.frame - prev_frame) as f64;
                let t = (frame - prev_frame) as f64 / span;
                let start = prev_value.max(EXP_FLOOR) as f64;
                let ratio = target.value as f64 / start;
                (start * ratio.powf(t)) as f32
            }
        }
    }
}
