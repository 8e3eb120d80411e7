//! Cancellable one-shot timers on the audio clock
//!
//! Layer reschedules are kept here, keyed by the frame they fire at. The
//! engine pump pops whatever has come due; stopping a venue removes its
//! entries so nothing fires afterwards.

use std::collections::BTreeMap;

use crate::types::Layer;

/// Handle to a pending timer (also its ordering key)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimerHandle {
    fire_frame: u64,
    seq: u64,
}

impl TimerHandle {
    /// Audio frame the timer fires at
    pub fn fire_frame(&self) -> u64 {
        self.fire_frame
    }
}

/// What to run when a timer fires
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimerEntry {
    pub venue_id: String,
    /// Guards against a restarted venue picking up its predecessor's timers
    pub session_id: u64,
    pub layer: Layer,
}

#[derive(Debug, Default)]
pub struct TimerQueue {
    entries: BTreeMap<TimerHandle, TimerEntry>,
    next_seq: u64,
}

impl TimerQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn schedule(&mut self, fire_frame: u64, entry: TimerEntry) -> TimerHandle {
        let handle = TimerHandle {
            fire_frame,
            seq: self.next_seq,
        };
        self.next_seq += 1;
        self.entries.insert(handle, entry);
        handle
    }

    /// Remove a pending timer. Returns false if it already fired or was cancelled.
    pub fn cancel(&mut self, handle: TimerHandle) -> bool {
        self.entries.remove(&handle).is_some()
    }

    pub fn is_pending(&self, handle: TimerHandle) -> bool {
        self.entries.contains_key(&handle)
    }

    /// Pop the earliest timer due at or before `now_frame`
    pub fn pop_due(&mut self, now_frame: u64) -> Option<(TimerHandle, TimerEntry)> {
        let first = self.entries.first_key_value()?.0;
        if first.fire_frame > now_frame {
            return None;
        }
        self.entries.pop_first()
    }

    /// Frame of the earliest pending timer
    pub fn next_due(&self) -> Option<u64> {
        self.entries.first_key_value().map(|(h, _)| h.fire_frame)
    }

    /// Pending timers belonging to one session
    pub fn pending_for(&self, session_id: u64) -> usize {
        self.entries
            .values()
            .filter(|e| e.session_id == session_id)
            .count()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(session_id: u64, layer: Layer) -> TimerEntry {
        TimerEntry {
            venue_id: "lobby".to_string(),
            session_id,
            layer,
        }
    }

    #[test]
    fn test_pop_due_in_fire_order() {
        let mut timers = TimerQueue::new();
        timers.schedule(300, entry(1, Layer::Melody));
        timers.schedule(100, entry(1, Layer::Pad));
        timers.schedule(200, entry(1, Layer::Bass));

        assert!(timers.pop_due(99).is_none());
        let layers: Vec<Layer> = std::iter::from_fn(|| timers.pop_due(250))
            .map(|(_, e)| e.layer)
            .collect();
        assert_eq!(layers, vec![Layer::Pad, Layer::Bass]);
        assert_eq!(timers.next_due(), Some(300));
    }

    #[test]
    fn test_same_frame_keeps_schedule_order() {
        let mut timers = TimerQueue::new();
        timers.schedule(50, entry(1, Layer::Bass));
        timers.schedule(50, entry(1, Layer::Pad));
        assert_eq!(timers.pop_due(50).unwrap().1.layer, Layer::Bass);
        assert_eq!(timers.pop_due(50).unwrap().1.layer, Layer::Pad);
    }

    #[test]
    fn test_cancel() {
        let mut timers = TimerQueue::new();
        let a = timers.schedule(10, entry(1, Layer::Pad));
        let b = timers.schedule(20, entry(2, Layer::Pad));
        assert!(timers.cancel(a));
        assert!(!timers.cancel(a));
        assert!(!timers.is_pending(a));
        assert!(timers.is_pending(b));
        assert_eq!(timers.pending_for(1), 0);
        assert_eq!(timers.pending_for(2), 1);
        assert_eq!(timers.pop_due(100).unwrap().0, b);
        assert!(timers.is_empty());
    }
}
