//! Signal processing building blocks
//!
//! Everything here runs on the audio thread once constructed: no allocation
//! in the per-sample paths.

pub mod automation;
pub mod convolver;
pub mod filter;
pub mod impulse;
pub mod oscillator;

pub use automation::Automation;
pub use convolver::{ConvolutionKernel, Convolver};
pub use filter::{Biquad, BiquadCoeffs};
pub use impulse::{create_reverb_impulse, ImpulseResponse};
pub use oscillator::{Oscillator, Waveform};
