//! Application configuration

use crate::presets::DEFAULT_PRESET;
use anyhow::{Context, Result};
use path_absolutize::Absolutize;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Application settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppSettings {
    /// Folder every queued item is written to
    pub output_dir: PathBuf,

    /// Netscape cookies.txt handed to yt-dlp for authenticated downloads
    pub cookie_file: Option<PathBuf>,

    /// Preset applied to newly queued URLs
    pub default_preset: String,

    /// Explicit yt-dlp binary; discovered automatically when unset
    pub ytdlp_path: Option<PathBuf>,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            output_dir: default_download_dir(),
            cookie_file: None,
            default_preset: DEFAULT_PRESET.to_string(),
            ytdlp_path: None,
        }
    }
}

impl AppSettings {
    /// Load settings from a JSON file. A missing file yields the defaults.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            debug!("No settings file at {:?}, using defaults", path);
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read settings file {}", path.display()))?;
        let settings: AppSettings = serde_json::from_str(&content)
            .with_context(|| format!("Malformed settings file {}", path.display()))?;

        debug!("Loaded settings from {:?}", path);
        Ok(settings)
    }

    /// Output folder resolved against the current directory
    pub fn absolute_output_dir(&self) -> PathBuf {
        self.output_dir
            .absolutize()
            .map(|p| p.into_owned())
            .unwrap_or_else(|_| self.output_dir.clone())
    }
}

/// Returns the default download directory
/// - All platforms: ~/Downloads/vidqueue
pub fn default_download_dir() -> PathBuf {
    dirs::download_dir()
        .unwrap_or_else(|| dirs::home_dir().unwrap_or_else(|| PathBuf::from(".")))
        .join("vidqueue")
}

/// Returns the default settings file location
/// - Linux: ~/.config/vidqueue/settings.json
pub fn default_settings_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("vidqueue")
        .join("settings.json")
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_default_config() {
        let config = AppSettings::default();
        assert_eq!(config.default_preset, DEFAULT_PRESET);
        assert!(config.cookie_file.is_none());
        assert!(config.output_dir.ends_with("vidqueue"));
    }

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempdir().unwrap();
        let settings = AppSettings::load(&dir.path().join("nope.json")).unwrap();
        assert_eq!(settings.default_preset, DEFAULT_PRESET);
    }

    #[test]
    fn partial_file_keeps_remaining_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(&path, r#"{ "output_dir": "/tmp/out", "default_preset": "720p (MP4)" }"#)
            .unwrap();

        let settings = AppSettings::load(&path).unwrap();
        assert_eq!(settings.output_dir, PathBuf::from("/tmp/out"));
        assert_eq!(settings.default_preset, "720p (MP4)");
        assert!(settings.ytdlp_path.is_none());
    }

    #[test]
    fn malformed_file_is_an_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(&path, "{ not json").unwrap();
        assert!(AppSettings::load(&path).is_err());
    }

    #[test]
    fn relative_output_dir_is_absolutized() {
        let settings = AppSettings {
            output_dir: PathBuf::from("downloads"),
            ..Default::default()
        };
        assert!(settings.absolute_output_dir().is_absolute());
    }
}
