//! Layer planners
//!
//! Each layer is planned as a pure function of the preset and the session's
//! random generator, then turned into voice requests placed at a start time.
//! The session runs the plan and schedules the next invocation.

pub mod bass;
pub mod melody;
pub mod pad;

use rand::Rng;

pub use bass::BassPlan;
pub use melody::{MelodyNote, MelodyPlan};
pub use pad::PadPlan;

/// Uniform choice from a preset table, `fallback` if the table is empty
fn pick<T: Copy, R: Rng + ?Sized>(items: &[T], fallback: T, rng: &mut R) -> T {
    if items.is_empty() {
        return fallback;
    }
    items[rng.gen_range(0..items.len())]
}
