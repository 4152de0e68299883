//! JSON run configuration.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use skyfix_localize::LocalizerParams;
use skyfix_tiles::{StitchParams, TileFetchParams};

#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

/// Folders and component settings for a full run.
///
/// Folder entries are relative to `base_path` unless absolute.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    pub base_path: PathBuf,
    pub map_folder: PathBuf,
    pub photos_folder: PathBuf,
    pub results_folder: PathBuf,
    pub tiles: TileFetchParams,
    pub stitch: StitchParams,
    pub localizer: LocalizerParams,
    /// External matcher program; see [`skyfix_localize::CommandMatcher`].
    pub matcher_program: Option<String>,
    pub matcher_args: Vec<String>,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            base_path: PathBuf::from("../assets/"),
            map_folder: PathBuf::from("map/"),
            photos_folder: PathBuf::from("query/"),
            results_folder: PathBuf::from("results/"),
            tiles: TileFetchParams::default(),
            stitch: StitchParams::default(),
            localizer: LocalizerParams::default(),
            matcher_program: None,
            matcher_args: Vec::new(),
        }
    }
}

impl RunConfig {
    /// Load a JSON config from disk. Missing fields take their defaults.
    pub fn load_json(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let raw = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&raw)?)
    }

    /// Write this config to disk as pretty JSON.
    pub fn write_json(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        Ok(())
    }

    pub fn map_path(&self) -> PathBuf {
        self.base_path.join(&self.map_folder)
    }

    pub fn photos_path(&self) -> PathBuf {
        self.base_path.join(&self.photos_folder)
    }

    pub fn results_path(&self) -> PathBuf {
        self.base_path.join(&self.results_folder)
    }
}
