use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::{DashError, Result};

/// Where the dashboard's date picker starts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InitialDateRange {
    /// Only the most recent date in the dataset.
    Latest,
    /// Every date in the dataset.
    Full,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default = "default_data_path")]
    pub data_path: String,
    #[serde(default = "default_export_dir")]
    pub export_dir: String,
    #[serde(default = "default_page")]
    pub default_page: String,
    #[serde(default = "default_initial_date_range")]
    pub initial_date_range: InitialDateRange,
}

fn default_data_path() -> String {
    "data/Social_Media_Advertising.csv".to_string()
}

fn default_export_dir() -> String {
    "exports".to_string()
}

fn default_page() -> String {
    "overview".to_string()
}

fn default_initial_date_range() -> InitialDateRange {
    InitialDateRange::Latest
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            data_path: default_data_path(),
            export_dir: default_export_dir(),
            default_page: default_page(),
            initial_date_range: default_initial_date_range(),
        }
    }
}

fn config_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".config")
        .join("campaign-dash")
}

pub fn settings_path() -> PathBuf {
    config_dir().join("settings.json")
}

pub fn settings_file_exists() -> bool {
    settings_path().exists()
}

/// Load settings, falling back to defaults when the file is missing or unreadable.
pub fn load_settings() -> Settings {
    load_settings_from(&settings_path())
}

pub fn load_settings_from(path: &std::path::Path) -> Settings {
    if !path.exists() {
        return Settings::default();
    }
    let content = std::fs::read_to_string(path).unwrap_or_default();
    match serde_json::from_str(&content) {
        Ok(settings) => settings,
        Err(e) => {
            log::warn!("ignoring malformed settings at {}: {e}", path.display());
            Settings::default()
        }
    }
}

pub fn save_settings_to(settings: &Settings, path: &std::path::Path) -> Result<()> {
    if let Some(dir) = path.parent() {
        std::fs::create_dir_all(dir)?;
    }
    let json = serde_json::to_string_pretty(settings)
        .map_err(|e| DashError::Settings(e.to_string()))?;
    std::fs::write(path, format!("{json}\n"))?;
    Ok(())
}

pub fn save_settings(settings: &Settings) -> Result<()> {
    save_settings_to(settings, &settings_path())
}

/// Expand a leading `~` to the home directory.
pub fn shellexpand_path(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix('~') {
        if let Some(home) = dirs::home_dir() {
            return home.join(rest.trim_start_matches('/'));
        }
    }
    PathBuf::from(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_save_and_load_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        let settings = Settings {
            data_path: "/tmp/ads.csv".to_string(),
            export_dir: "/tmp/out".to_string(),
            default_page: "deep-dive".to_string(),
            initial_date_range: InitialDateRange::Full,
        };
        save_settings_to(&settings, &path).unwrap();
        let loaded = load_settings_from(&path);
        assert_eq!(loaded.data_path, "/tmp/ads.csv");
        assert_eq!(loaded.default_page, "deep-dive");
        assert_eq!(loaded.initial_date_range, InitialDateRange::Full);
    }

    #[test]
    fn test_load_returns_defaults_when_missing() {
        let dir = tempfile::tempdir().unwrap();
        let s = load_settings_from(&dir.path().join("absent.json"));
        assert_eq!(s.data_path, "data/Social_Media_Advertising.csv");
        assert_eq!(s.initial_date_range, InitialDateRange::Latest);
    }

    #[test]
    fn test_load_merges_with_defaults() {
        let json = r#"{"data_path": "/srv/ads.csv", "initial_date_range": "full"}"#;
        let s: Settings = serde_json::from_str(json).unwrap();
        assert_eq!(s.export_dir, "exports");
        assert_eq!(s.default_page, "overview");
        assert_eq!(s.initial_date_range, InitialDateRange::Full);
    }

    #[test]
    fn test_malformed_file_falls_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(&path, "{not json").unwrap();
        assert_eq!(load_settings_from(&path).export_dir, "exports");
    }

    #[test]
    fn test_shellexpand_plain_path_untouched() {
        assert_eq!(shellexpand_path("data/x.csv"), PathBuf::from("data/x.csv"));
    }
}
