//! Configuration file loading

use crate::error::{Error, Result, ResultExt};
use serde::de::DeserializeOwned;
use std::path::{Path, PathBuf};

/// File names searched in the working directory, in order
pub const DEFAULT_CANDIDATES: &[&str] = &[".partnersell.toml", "partnersell.toml"];

/// A parsed configuration value together with the file it came from
#[derive(Debug, Clone)]
pub struct ConfigFile<T> {
    /// Parsed contents (or defaults when no file was found)
    pub value: T,
    /// Path the value was read from, if any
    pub path: Option<PathBuf>,
}

impl<T: DeserializeOwned + Default> ConfigFile<T> {
    /// Load configuration from an explicit path or the standard locations
    ///
    /// An explicit path that does not exist is an error. When no path is
    /// given and no candidate file exists, defaults are returned.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let config_path = match path {
            Some(p) if !p.exists() => return Err(Error::config_not_found(p)),
            Some(p) => Some(p.to_path_buf()),
            None => find_config_file(Path::new(".")),
        };

        let value = match config_path {
            Some(ref p) => load_config_file(p)?,
            None => T::default(),
        };

        Ok(Self {
            value,
            path: config_path,
        })
    }

    /// Defaults only (no file)
    #[must_use]
    pub fn defaults() -> Self {
        Self {
            value: T::default(),
            path: None,
        }
    }
}

/// Find a configuration file in `dir`, then in the user config directory
#[must_use]
pub fn find_config_file(dir: &Path) -> Option<PathBuf> {
    DEFAULT_CANDIDATES
        .iter()
        .map(|candidate| dir.join(candidate))
        .chain(dirs::config_dir().map(|d| d.join("partnersell").join("config.toml")))
        .find(|p| p.is_file())
}

/// Load and parse a TOML configuration file
pub fn load_config_file<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("reading config file {}", path.display()))?;

    toml::from_str(&content).with_context(|| format!("parsing config file {}", path.display()))
}
