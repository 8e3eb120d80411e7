//! Standard locations for Drift files

use std::path::PathBuf;

/// Get the default config directory
///
/// Returns: `~/.config/drift-player` (platform equivalent elsewhere)
pub fn default_config_dir() -> PathBuf {
    dirs::config_dir()
        .or_else(dirs::home_dir)
        .unwrap_or_else(|| PathBuf::from("."))
        .join("drift-player")
}

/// Get the default path of a config file
pub fn default_config_path(filename: &str) -> PathBuf {
    default_config_dir().join(filename)
}

/// Default directory for offline renders
///
/// Returns: `~/Music/drift-renders`
pub fn default_render_dir() -> PathBuf {
    dirs::audio_dir()
        .or_else(|| dirs::home_dir().map(|h| h.join("Music")))
        .unwrap_or_else(|| PathBuf::from("."))
        .join("drift-renders")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_dir_ends_with_app_name() {
        assert!(default_config_dir().ends_with("drift-player"));
    }

    #[test]
    fn test_config_path_includes_filename() {
        let path = default_config_path("test.yaml");
        assert!(path.ends_with("drift-player/test.yaml"));
    }

    #[test]
    fn test_render_dir() {
        assert!(default_render_dir().ends_with("drift-renders"));
    }
}
