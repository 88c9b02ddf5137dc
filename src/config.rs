//! Dashboard Configuration Module
//! JSON settings for dataset locations, chart limits and export sizes.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Invalid config {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },
}

/// Settings shared by the window, the builder and the exporter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DashboardConfig {
    pub startups_csv: PathBuf,
    pub markets_csv: PathBuf,
    pub top_markets: usize,
    pub top_countries: usize,
    pub top_companies: usize,
    pub top_closure_markets: usize,
    /// Upper bound (in $ billions) of total funding shown in the debt scatter
    pub scatter_max_funding_billions: f64,
    pub window_width: f32,
    pub window_height: f32,
    pub export_width: u32,
    pub export_height: u32,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            startups_csv: PathBuf::from("cleaned_data.csv"),
            markets_csv: PathBuf::from("markets.csv"),
            top_markets: 10,
            top_countries: 10,
            top_companies: 25,
            top_closure_markets: 20,
            scatter_max_funding_billions: 30.0,
            window_width: 1200.0,
            window_height: 900.0,
            export_width: 1280,
            export_height: 720,
        }
    }
}

impl DashboardConfig {
    /// Load settings from a JSON file. No path means defaults.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let Some(path) = path else {
            return Ok(Self::default());
        };

        let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Write settings as pretty JSON.
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let content = serde_json::to_string_pretty(self).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        fs::write(path, content).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Override dataset paths given on the command line.
    pub fn with_data_paths(mut self, startups: Option<PathBuf>, markets: Option<PathBuf>) -> Self {
        if let Some(path) = startups {
            self.startups_csv = path;
        }
        if let Some(path) = markets {
            self.markets_csv = path;
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_path_gives_defaults() {
        let config = DashboardConfig::load(None).unwrap();
        assert_eq!(config, DashboardConfig::default());
        assert_eq!(config.top_companies, 25);
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("dashboard.json");
        fs::write(&path, r#"{ "top_markets": 5, "markets_csv": "closures.csv" }"#).unwrap();

        let config = DashboardConfig::load(Some(&path)).unwrap();
        assert_eq!(config.top_markets, 5);
        assert_eq!(config.markets_csv, PathBuf::from("closures.csv"));
        assert_eq!(config.top_countries, 10);
        assert_eq!(config.startups_csv, PathBuf::from("cleaned_data.csv"));
    }

    #[test]
    fn save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("dashboard.json");
        let config = DashboardConfig {
            top_closure_markets: 12,
            ..DashboardConfig::default()
        };
        config.save(&path).unwrap();

        assert_eq!(DashboardConfig::load(Some(&path)).unwrap(), config);
    }

    #[test]
    fn malformed_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("dashboard.json");
        fs::write(&path, "{ not json").unwrap();

        assert!(matches!(
            DashboardConfig::load(Some(&path)),
            Err(ConfigError::Parse { .. })
        ));
    }

    #[test]
    fn command_line_paths_override() {
        let config = DashboardConfig::default()
            .with_data_paths(Some(PathBuf::from("/data/startups.csv")), None);
        assert_eq!(config.startups_csv, PathBuf::from("/data/startups.csv"));
        assert_eq!(config.markets_csv, PathBuf::from("markets.csv"));
    }
}
