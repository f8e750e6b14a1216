//! Configuration loading and management.

use std::path::{Path, PathBuf};

use figment::Figment;
use figment::providers::{Env, Format, Serialized, Toml};
use pup_core::{EngineConfig, PredictionConfig, StatusConfig, TimelineConfig};
use serde::{Deserialize, Serialize};

/// Application configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Path to the database file.
    pub database_path: PathBuf,

    #[serde(default)]
    pub prediction: PredictionConfig,

    #[serde(default)]
    pub status: StatusConfig,

    #[serde(default)]
    pub timeline: TimelineConfig,
}

impl Default for Config {
    fn default() -> Self {
        let data_dir = dirs_data_path().unwrap_or_else(|| PathBuf::from("."));
        Self {
            database_path: data_dir.join("pup.db"),
            prediction: PredictionConfig::default(),
            status: StatusConfig::default(),
            timeline: TimelineConfig::default(),
        }
    }
}

impl Config {
    /// Loads configuration, optionally from a specific file.
    ///
    /// Later sources win: defaults, `~/.config/pup/config.toml`, the given
    /// file, then `PUP_*` environment variables. Nested keys use `__`, as in
    /// `PUP_PREDICTION__DEFAULT_GAP_MINUTES=120`.
    #[expect(
        clippy::result_large_err,
        reason = "figment::Error is large but only returned at startup"
    )]
    pub fn load_from(config_path: Option<&Path>) -> Result<Self, figment::Error> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        if let Some(config_dir) = dirs_config_path() {
            figment = figment.merge(Toml::file(config_dir.join("config.toml")));
        }

        if let Some(path) = config_path {
            figment = figment.merge(Toml::file(path));
        }

        figment = figment.merge(Env::prefixed("PUP_").split("__"));

        figment.extract()
    }

    /// The engine settings, as one value.
    pub fn engine(&self) -> EngineConfig {
        EngineConfig {
            prediction: self.prediction.clone(),
            status: self.status.clone(),
            timeline: self.timeline.clone(),
        }
    }
}

/// Returns the platform-specific config directory for pup.
fn dirs_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|p| p.join("pup"))
}

/// Returns the platform-specific data directory for pup.
///
/// On Linux: `~/.local/share/pup`
pub fn dirs_data_path() -> Option<PathBuf> {
    dirs::data_dir().map(|p| p.join("pup"))
}
