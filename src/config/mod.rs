use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

use crate::ui::ThemeChoice;

/// Application configuration with sensible defaults.
///
/// Can be overridden via ~/.config/ftop/config.toml, and the file is
/// overridden by command line flags.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Config {
    pub theme: ThemeChoice,
    /// Print the buffered log on exit even without errors.
    pub debug: bool,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
}

/// TOML-deserializable config file format.
/// All fields are optional, missing fields use defaults.
#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct FileConfig {
    theme: Option<ThemeChoice>,
    debug: Option<bool>,
}

impl Config {
    /// Load ~/.config/ftop/config.toml, see [`Config::load_from`].
    pub fn load() -> Self {
        Self::load_from(&crate::constants::config_file_path())
    }

    /// Load config from `path`, falling back to defaults for any missing
    /// fields. A missing file gives pure defaults, a broken one is logged
    /// and ignored.
    pub fn load_from(path: &Path) -> Self {
        match read_file(path) {
            Ok(Some(file_config)) => Self::default().merge(file_config),
            Ok(None) => Self::default(),
            Err(e) => {
                log::warn!("{}. Using defaults.", e);
                Self::default()
            }
        }
    }

    fn merge(mut self, file_config: FileConfig) -> Self {
        if let Some(v) = file_config.theme {
            self.theme = v;
        }
        if let Some(v) = file_config.debug {
            self.debug = v;
        }
        self
    }

    /// Apply command line flags. `--debug` can only switch debugging on.
    pub fn with_flags(mut self, theme: Option<ThemeChoice>, debug: bool) -> Self {
        if let Some(theme) = theme {
            self.theme = theme;
        }
        self.debug |= debug;
        self
    }
}

fn read_file(path: &Path) -> Result<Option<FileConfig>, ConfigError> {
    let content = match std::fs::read_to_string(path) {
        Ok(c) => c,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(source) => {
            return Err(ConfigError::Read {
                path: path.to_path_buf(),
                source,
            })
        }
    };
    toml::from_str(&content)
        .map(Some)
        .map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
}
