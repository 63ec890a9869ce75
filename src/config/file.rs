//! Config file loading.

use std::path::{Path, PathBuf};

use ini::Ini;
use thiserror::Error;
use tracing::{debug, info};

use super::parser::parse_ini;
use super::settings::ConfigFile;

/// Errors loading or validating a config file.
#[derive(Debug, Error)]
pub enum ConfigFileError {
    /// The file could not be read.
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    /// The file is not well-formed INI.
    #[error("failed to parse config file: {0}")]
    Parse(#[from] ini::ParseError),

    /// A key has an unusable value.
    #[error("invalid value for [{section}] {key} = '{value}': {reason}")]
    InvalidValue {
        section: String,
        key: String,
        value: String,
        reason: String,
    },
}

impl ConfigFile {
    /// Loads configuration from an INI file.
    ///
    /// A missing file yields the defaults; a malformed file or an invalid
    /// value is an error.
    pub fn load(path: &Path) -> Result<ConfigFile, ConfigFileError> {
        if !path.exists() {
            info!(path = %path.display(), "No config file, using defaults");
            return Ok(ConfigFile::default());
        }

        let contents = std::fs::read_to_string(path).map_err(|source| ConfigFileError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        let config = Self::from_ini_str(&contents)?;
        debug!(path = %path.display(), "Loaded config file");
        Ok(config)
    }

    /// Parses configuration from INI text.
    pub fn from_ini_str(contents: &str) -> Result<ConfigFile, ConfigFileError> {
        let ini = Ini::load_from_str(contents)?;
        parse_ini(&ini)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file_yields_defaults() {
        let config = ConfigFile::load(Path::new("/nonexistent/loadguard.ini")).unwrap();
        assert_eq!(config.limits.cpu_warning, 70.0);
    }

    #[test]
    fn test_load_from_disk() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("loadguard.ini");
        std::fs::write(&path, "[cache]\nmax_entries = 99\n").unwrap();

        let config = ConfigFile::load(&path).unwrap();
        assert_eq!(config.cache.max_entries, 99);
    }

    #[test]
    fn test_malformed_ini_is_an_error() {
        let result = ConfigFile::from_ini_str("[unclosed\nkey value");
        assert!(result.is_err());
    }
}
