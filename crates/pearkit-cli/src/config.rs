//! User configuration and template directory resolution.

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

/// Template directory shipped alongside the sources.
///
/// This is the source checkout's `data/` path, fixed at compile time. A
/// binary installed elsewhere (e.g. with `cargo install`) has no such
/// directory and needs `--data-dir`, `PEARKIT_DATA_DIR` or `data-dir` in
/// the config file.
pub const BUNDLED_DATA_DIR: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/../../data");

/// Contents of `config.toml`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct Config {
    /// Directory holding the component templates.
    pub data_dir: Option<PathBuf>,
}

impl Config {
    /// Load the configuration.
    ///
    /// An explicit `path` must exist. Without one the default location is
    /// tried, and a missing file there just means an empty configuration.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        if let Some(path) = path {
            return Self::from_file(path);
        }

        match default_config_path() {
            Some(path) if path.is_file() => Self::from_file(&path),
            _ => Ok(Self::default()),
        }
    }

    fn from_file(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        Self::parse(&text).with_context(|| format!("Invalid config file {}", path.display()))
    }

    /// Parse configuration text.
    pub fn parse(text: &str) -> Result<Self> {
        Ok(toml::from_str(text)?)
    }
}

/// `<config dir>/pearkit/config.toml`.
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("pearkit").join("config.toml"))
}

/// Pick the template directory: the command line (or `PEARKIT_DATA_DIR`)
/// first, then the config file, then the bundled templates.
pub fn resolve_data_dir(flag: Option<PathBuf>, config: &Config) -> PathBuf {
    flag.or_else(|| config.data_dir.clone())
        .unwrap_or_else(|| PathBuf::from(BUNDLED_DATA_DIR))
}

/// Fail unless `data_dir` is a directory.
pub fn ensure_data_dir(data_dir: &Path) -> Result<()> {
    if !data_dir.is_dir() {
        bail!(
            "Template directory `{}` does not exist (set --data-dir, PEARKIT_DATA_DIR \
             or data-dir in the config file)",
            data_dir.display()
        );
    }
    Ok(())
}
