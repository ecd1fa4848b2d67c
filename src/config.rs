use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use log::LevelFilter;
use serde::Deserialize;

use crate::error::{Result, SwaraError};
use crate::piece::DEFAULT_CHUNK_DURATION;

pub const DEFAULT_BASE_URL: &str = "https://swara.studio/";
pub const DEFAULT_LOG_LEVEL: &str = "info";

/// Settings file as written; every key optional, kebab-case.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
struct RawSettings {
    base_url: Option<String>,
    token_path: Option<PathBuf>,
    chunk_duration: Option<f64>,
    log_level: Option<String>,
}

/// Client and display settings.
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub base_url: String,
    pub token_path: Option<PathBuf>,
    /// Width of a display chunk, in seconds.
    pub chunk_duration: f64,
    pub log_level: LevelFilter,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            base_url: DEFAULT_BASE_URL.to_string(),
            token_path: None,
            chunk_duration: DEFAULT_CHUNK_DURATION,
            log_level: LevelFilter::Info,
        }
    }
}

impl Settings {
    pub fn from_yaml_str(content: &str) -> Result<Self> {
        let raw: RawSettings = if content.trim().is_empty() {
            RawSettings::default()
        } else {
            serde_yaml::from_str(content)?
        };

        let chunk_duration = raw.chunk_duration.unwrap_or(DEFAULT_CHUNK_DURATION);
        if !(chunk_duration > 0.0) {
            return Err(SwaraError::InvalidValue(format!(
                "chunk-duration must be positive: {}",
                chunk_duration
            )));
        }

        let level = raw.log_level.as_deref().unwrap_or(DEFAULT_LOG_LEVEL);
        let log_level = level
            .parse::<LevelFilter>()
            .map_err(|_| SwaraError::InvalidValue(format!("unknown log-level: {}", level)))?;

        Ok(Settings {
            base_url: raw.base_url.unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            token_path: raw.token_path,
            chunk_duration,
            log_level,
        })
    }

    /// Read settings from `path`; a missing file yields the defaults.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        match fs::read_to_string(path) {
            Ok(content) => Settings::from_yaml_str(&content),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(Settings::default()),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_defaults_from_empty() {
        assert_eq!(Settings::from_yaml_str("").unwrap(), Settings::default());
    }

    #[test]
    fn test_kebab_case_keys() {
        let s = Settings::from_yaml_str(
            "base-url: http://localhost:3000/\ntoken-path: /tmp/token.json\nchunk-duration: 15\nlog-level: debug\n",
        )
        .unwrap();
        assert_eq!(s.base_url, "http://localhost:3000/");
        assert_eq!(s.token_path, Some(PathBuf::from("/tmp/token.json")));
        assert_eq!(s.chunk_duration, 15.0);
        assert_eq!(s.log_level, LevelFilter::Debug);
    }

    #[test]
    fn test_bad_values() {
        assert!(matches!(
            Settings::from_yaml_str("chunk-duration: 0"),
            Err(SwaraError::InvalidValue(_))
        ));
        assert!(Settings::from_yaml_str("log-level: loud").is_err());
        assert!(matches!(
            Settings::from_yaml_str("base_url: x"),
            Err(SwaraError::Yaml(_))
        ));
    }

    #[test]
    fn test_missing_file_gives_defaults() {
        let s = Settings::load("/nonexistent/swara-settings.yaml").unwrap();
        assert_eq!(s, Settings::default());
    }
}
