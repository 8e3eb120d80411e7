//! Player configuration for drift-player
//!
//! Configuration is stored as YAML in the user's config directory.
//! Default location: ~/.config/drift-player/config.yaml

use serde::{Deserialize, Serialize};

use drift_core::audio::AudioConfig;
use drift_core::config::EngineConfig;
use drift_core::preset::DEFAULT_GENRE;

/// Root configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PlayerConfig {
    /// Output device and buffer settings
    pub audio: AudioConfig,
    /// Engine timing
    pub engine: EngineConfig,
    /// Venues this machine plays for
    pub venues: Vec<VenueConfig>,
}

impl PlayerConfig {
    pub fn venue(&self, id: &str) -> Option<&VenueConfig> {
        self.venues.iter().find(|v| v.id == id)
    }
}

/// One venue as supplied by the venue management system
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VenueConfig {
    pub id: String,
    pub name: String,
    /// The first entry picks the preset
    pub preferred_genres: Vec<String>,
    /// 0-100
    pub volume_level: u8,
    /// Start playing as soon as the player comes up
    pub autostart: bool,
}

impl Default for VenueConfig {
    fn default() -> Self {
        Self {
            id: String::new(),
            name: String::new(),
            preferred_genres: Vec::new(),
            volume_level: 50,
            autostart: false,
        }
    }
}

impl VenueConfig {
    /// Genre handed to the engine
    pub fn genre(&self) -> &str {
        self.preferred_genres
            .first()
            .map(String::as_str)
            .unwrap_or(DEFAULT_GENRE)
    }

    pub fn volume_percent(&self) -> f32 {
        self.volume_level.min(100) as f32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_venue_defaults() {
        let venue = VenueConfig::default();
        assert_eq!(venue.genre(), "ambient");
        assert_eq!(venue.volume_percent(), 50.0);
        assert!(!venue.autostart);
    }

    #[test]
    fn test_volume_is_capped() {
        let venue = VenueConfig {
            volume_level: 250,
            ..Default::default()
        };
        assert_eq!(venue.volume_percent(), 100.0);
    }

    #[test]
    fn test_yaml_roster() {
        let yaml = r#"
engine:
  seed: 7
venues:
  - id: lobby
    name: Hotel Lobby
    preferred_genres: [lounge, jazz]
    volume_level: 35
    autostart: true
  - id: spa
    preferred_genres: []
"#;
        let config: PlayerConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.engine.seed, Some(7));
        assert_eq!(config.engine.lookahead_secs, 0.05);
        assert_eq!(config.venues.len(), 2);

        let lobby = config.venue("lobby").unwrap();
        assert_eq!(lobby.genre(), "lounge");
        assert_eq!(lobby.volume_percent(), 35.0);
        assert!(lobby.autostart);

        let spa = config.venue("spa").unwrap();
        assert_eq!(spa.genre(), "ambient");
        assert_eq!(spa.volume_level, 50);
        assert!(config.venue("kitchen").is_none());
    }

    #[test]
    fn test_save_and_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        let config = PlayerConfig {
            venues: vec![VenueConfig {
                id: "bar".into(),
                name: "Rooftop Bar".into(),
                preferred_genres: vec!["electronic".into()],
                volume_level: 70,
                autostart: true,
            }],
            ..Default::default()
        };

        drift_core::config::save_config(&config, &path).unwrap();
        let loaded: PlayerConfig = drift_core::config::load_config(&path);
        assert_eq!(loaded.venues, config.venues);
    }
}
