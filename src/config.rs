//! Runtime configuration.
//!
//! Layers, lowest to highest precedence:
//! 1. platform data directory (`directories::ProjectDirs`), else `./.chordsheet`
//! 2. YAML config file passed with `--config`
//! 3. `CHORDSHEET_DATA_DIR`
//!
//! ```yaml
//! data-dir: /home/me/songs/.local
//! baseline: /home/me/songs/catalog.json
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use directories::ProjectDirs;
use serde::Deserialize;
use tracing::debug;

use crate::error::SheetError;
use crate::overlay::{FileBlobStore, OverlayStore, OVERLAY_KEY};

pub const DATA_DIR_ENV: &str = "CHORDSHEET_DATA_DIR";

const APP_NAME: &str = "chordsheet";
const FALLBACK_DATA_DIR: &str = ".chordsheet";

/// Contents of a config file; every key is optional
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct ConfigFile {
    pub data_dir: Option<PathBuf>,
    pub baseline: Option<PathBuf>,
}

impl ConfigFile {
    pub fn parse(text: &str) -> Result<Self, SheetError> {
        if text.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(text).map_err(|e| SheetError::ConfigError(e.to_string()))
    }

    pub fn read(path: &Path) -> Result<Self, SheetError> {
        let text = fs::read_to_string(path).map_err(|e| SheetError::io(path, e))?;
        Self::parse(&text)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Directory holding the local overlay
    pub data_dir: PathBuf,
    /// Published catalog layered under the overlay
    pub baseline: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            baseline: None,
        }
    }
}

fn default_data_dir() -> PathBuf {
    ProjectDirs::from("", "", APP_NAME)
        .map(|dirs| dirs.data_dir().to_path_buf())
        .unwrap_or_else(|| PathBuf::from(FALLBACK_DATA_DIR))
}

impl Config {
    /// Resolve from an optional config file and the environment
    pub fn load(path: Option<&Path>) -> Result<Self, SheetError> {
        let file = path.map(ConfigFile::read).transpose()?;
        let env_dir = std::env::var_os(DATA_DIR_ENV)
            .filter(|v| !v.is_empty())
            .map(PathBuf::from);
        let config = Self::from_layers(file, env_dir);
        debug!(data_dir = %config.data_dir.display(), "resolved config");
        Ok(config)
    }

    pub fn from_layers(file: Option<ConfigFile>, env_data_dir: Option<PathBuf>) -> Self {
        let mut config = Config::default();
        if let Some(file) = file {
            if let Some(dir) = file.data_dir {
                config.data_dir = dir;
            }
            config.baseline = file.baseline;
        }
        if let Some(dir) = env_data_dir {
            config.data_dir = dir;
        }
        config
    }

    /// File the overlay store writes to
    pub fn overlay_path(&self) -> PathBuf {
        self.data_dir.join(format!("{}.json", OVERLAY_KEY))
    }

    pub fn overlay_store(&self) -> OverlayStore<FileBlobStore> {
        OverlayStore::new(FileBlobStore::new(&self.data_dir))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_config_file() {
        let file = ConfigFile::parse("data-dir: /tmp/songs\nbaseline: catalog.json\n").unwrap();
        assert_eq!(file.data_dir, Some(PathBuf::from("/tmp/songs")));
        assert_eq!(file.baseline, Some(PathBuf::from("catalog.json")));

        assert_eq!(ConfigFile::parse("").unwrap(), ConfigFile::default());
    }

    #[test]
    fn test_unknown_keys_rejected() {
        assert!(matches!(
            ConfigFile::parse("data_dir: /tmp\n"),
            Err(SheetError::ConfigError(_))
        ));
    }

    #[test]
    fn test_layer_precedence() {
        let file = ConfigFile {
            data_dir: Some(PathBuf::from("/from/file")),
            baseline: Some(PathBuf::from("base.json")),
        };

        let config = Config::from_layers(Some(file.clone()), None);
        assert_eq!(config.data_dir, PathBuf::from("/from/file"));
        assert_eq!(config.baseline, Some(PathBuf::from("base.json")));

        let config = Config::from_layers(Some(file), Some(PathBuf::from("/from/env")));
        assert_eq!(config.data_dir, PathBuf::from("/from/env"));

        let config = Config::from_layers(None, None);
        assert_eq!(config.data_dir, default_data_dir());
        assert_eq!(config.baseline, None);
    }

    #[test]
    fn test_overlay_path() {
        let config = Config::from_layers(None, Some(PathBuf::from("/data")));
        assert_eq!(
            config.overlay_path(),
            PathBuf::from("/data/local_content_index.json")
        );
        assert_eq!(config.overlay_store().store().dir(), Path::new("/data"));
    }

    #[test]
    fn test_missing_config_file_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = Config::load(Some(dir.path().join("nope.yaml").as_path())).unwrap_err();
        assert!(matches!(err, SheetError::Io { .. }));
    }

    #[test]
    fn test_read_config_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("chordsheet.yaml");
        fs::write(&path, "baseline: /srv/catalog.json\n").unwrap();
        let file = ConfigFile::read(&path).unwrap();
        assert_eq!(file.baseline, Some(PathBuf::from("/srv/catalog.json")));
        assert_eq!(file.data_dir, None);
    }
}
