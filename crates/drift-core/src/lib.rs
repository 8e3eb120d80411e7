//! Drift Core - procedural ambient music for many venues at once
//!
//! Each playing venue gets a session that keeps regenerating three layers
//! (a reverb-washed pad, a tempo-locked bass figure and a sparse melody)
//! from a genre preset. Sessions render through a shared lock-free graph on
//! the audio thread, either to a cpal device or offline.

pub mod audio;
pub mod config;
pub mod dsp;
pub mod engine;
pub mod graph;
pub mod preset;
pub mod types;

pub use engine::{Engine, EngineError, EngineResult};
pub use preset::{get_preset, GenrePreset};
