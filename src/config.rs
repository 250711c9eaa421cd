// src/config.rs

use serde::Deserialize;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Cannot read config {0}: {1}")]
    Read(PathBuf, std::io::Error),

    #[error("Invalid config {0}: {1}")]
    Parse(PathBuf, toml::de::Error),
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub layout: LayoutConfig,
    pub results: ResultsConfig,
    pub matching: MatchingConfig,
}

/// Fixed positions of the season workbook layout, all 0-based
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LayoutConfig {
    /// Row holding the season's event names
    pub header_row: usize,
    /// First column of the event names in the header row
    pub event_column: usize,
    /// First row of the wins block
    pub wins_start_row: usize,
    /// First-cell text that opens the main-events and podium blocks
    pub section_marker: String,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            header_row: 3,
            event_column: 2,
            wins_start_row: 6,
            section_marker: "Main Events".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ResultsConfig {
    pub primary_category: String,
    /// Overflow category: its rows only count for already-known competitors
    pub secondary_category: Option<String>,
    pub position_column: usize,
    pub name_column: usize,
}

impl Default for ResultsConfig {
    fn default() -> Self {
        Self {
            primary_category: "Women Elite".to_string(),
            secondary_category: Some("Women Pro".to_string()),
            position_column: 1,
            name_column: 2,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MatchingConfig {
    pub event_threshold: f64,
}

impl Default for MatchingConfig {
    fn default() -> Self {
        Self { event_threshold: 0.8 }
    }
}

impl Config {
    /// Loads the TOML file at `path`, or the defaults when none is given
    pub fn load(path: Option<&Path>) -> Result<Config, ConfigError> {
        let Some(path) = path else {
            return Ok(Config::default());
        };
        let text = std::fs::read_to_string(path).map_err(|e| ConfigError::Read(path.to_path_buf(), e))?;
        toml::from_str(&text).map_err(|e| ConfigError::Parse(path.to_path_buf(), e))
    }
}
