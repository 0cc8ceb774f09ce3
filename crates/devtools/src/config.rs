use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::content::CacheSettings;

pub const DEFAULT_MESSAGE_LOG_CAPACITY: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DevToolsConfig {
    pub cache: CacheSettings,
    pub message_log_capacity: usize,
}

impl Default for DevToolsConfig {
    fn default() -> Self {
        Self {
            cache: CacheSettings::default(),
            message_log_capacity: DEFAULT_MESSAGE_LOG_CAPACITY,
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config '{path}': {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("parse config json: {source}")]
    Parse {
        #[source]
        source: serde_json::Error,
    },
    #[error("parse config json at {path}: {source}")]
    ParseAt {
        path: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("validation failed at {path}: {message}")]
    Invalid { path: &'static str, message: String },
}

pub fn load_config(path: &Path) -> Result<DevToolsConfig, ConfigError> {
    let raw = fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    parse_config(&raw)
}

pub fn parse_config(raw: &str) -> Result<DevToolsConfig, ConfigError> {
    let mut deserializer = serde_json::Deserializer::from_str(raw);
    let config = serde_path_to_error::deserialize::<_, DevToolsConfig>(&mut deserializer)
        .map_err(|error| {
            let path = error.path().to_string();
            let source = error.into_inner();
            if path.is_empty() || path == "." {
                ConfigError::Parse { source }
            } else {
                ConfigError::ParseAt { path, source }
            }
        })?;
    validate_config(&config)?;
    Ok(config)
}

fn validate_config(config: &DevToolsConfig) -> Result<(), ConfigError> {
    if config.cache.display_cap == 0 {
        return Err(ConfigError::Invalid {
            path: "cache.display_cap",
            message: "expected a positive integer, got 0".to_string(),
        });
    }
    if config.message_log_capacity == 0 {
        return Err(ConfigError::Invalid {
            path: "message_log_capacity",
            message: "expected a positive integer, got 0".to_string(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use tempfile::TempDir;

    use super::*;
    use crate::content::{DEFAULT_DISPLAY_CAP, DEFAULT_EXPIRY_INTERVAL_TICKS};

    #[test]
    fn empty_object_yields_defaults() {
        let config = parse_config("{}").expect("parse");
        assert_eq!(config, DevToolsConfig::default());
        assert_eq!(config.cache.expiry_interval_ticks, DEFAULT_EXPIRY_INTERVAL_TICKS);
        assert_eq!(config.cache.display_cap, DEFAULT_DISPLAY_CAP);
        assert!(config.cache.limit_enabled);
    }

    #[test]
    fn partial_cache_section_keeps_other_defaults() {
        let raw = json!({ "cache": { "display_cap": 10, "limit_enabled": false } }).to_string();
        let config = parse_config(&raw).expect("parse");
        assert_eq!(config.cache.display_cap, 10);
        assert!(!config.cache.limit_enabled);
        assert_eq!(config.cache.expiry_interval_ticks, DEFAULT_EXPIRY_INTERVAL_TICKS);
        assert_eq!(config.message_log_capacity, DEFAULT_MESSAGE_LOG_CAPACITY);
    }

    #[test]
    fn type_error_reports_json_path() {
        let raw = json!({ "cache": { "display_cap": "ten" } }).to_string();
        let err = parse_config(&raw).expect_err("err");
        match err {
            ConfigError::ParseAt { path, .. } => assert_eq!(path, "cache.display_cap"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn unknown_field_is_rejected() {
        let raw = json!({ "cache": { "display_limit": 5 } }).to_string();
        assert!(matches!(
            parse_config(&raw).expect_err("err"),
            ConfigError::ParseAt { .. }
        ));
    }

    #[test]
    fn zero_cap_fails_validation() {
        let raw = json!({ "cache": { "display_cap": 0 } }).to_string();
        let err = parse_config(&raw).expect_err("err");
        assert!(matches!(
            err,
            ConfigError::Invalid {
                path: "cache.display_cap",
                ..
            }
        ));

        let raw = json!({ "message_log_capacity": 0 }).to_string();
        assert!(matches!(
            parse_config(&raw).expect_err("err"),
            ConfigError::Invalid {
                path: "message_log_capacity",
                ..
            }
        ));
    }

    #[test]
    fn load_reads_file_and_reports_missing_path() {
        let temp = TempDir::new().expect("temp");
        let path = temp.path().join("devtools.json");
        fs::write(&path, json!({ "message_log_capacity": 8 }).to_string()).expect("write");
        assert_eq!(load_config(&path).expect("load").message_log_capacity, 8);

        let missing = temp.path().join("missing.json");
        assert!(matches!(
            load_config(&missing).expect_err("err"),
            ConfigError::Read { .. }
        ));
    }
}
