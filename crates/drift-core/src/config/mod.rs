//! Configuration for Drift
//!
//! - Engine timing and limits ([`EngineConfig`])
//! - Generic YAML config loading/saving shared with the player
//! - Standard config/render paths
//!
//! ```ignore
//! use drift_core::config::{load_config, save_config, default_config_path};
//!
//! let config: PlayerConfig = load_config(&default_config_path("config.yaml"));
//! save_config(&config, &path)?;
//! ```

mod engine;
mod io;
mod paths;

pub use engine::EngineConfig;
pub use io::{load_config, save_config, try_load_config};
pub use paths::{default_config_dir, default_config_path, default_render_dir};
