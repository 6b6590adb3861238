// Engine configuration loading and parsing (config/engine.toml).

use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::distribution::DEFAULT_ACTIVE_THRESHOLD;
use crate::rating::INACTIVE_EPSILON;

/// Contents written by `write_default_config`.
pub const DEFAULT_CONFIG_TOML: &str = include_str!("../defaults/engine.toml");

/// Location of the config file relative to the base directory.
pub const CONFIG_FILE: &str = "config/engine.toml";

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    ReadError {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse config file {path}: {source}")]
    ParseError {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("validation error for field `{field}`: {message}")]
    ValidationError { field: String, message: String },

    #[error("config file already exists: {path}")]
    AlreadyExists { path: PathBuf },

    #[error("failed to write config file {path}: {source}")]
    WriteError {
        path: PathBuf,
        source: std::io::Error,
    },
}

// ---------------------------------------------------------------------------
// engine.toml structs
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub rating: RatingConfig,
    pub snapshot: SnapshotConfig,
}

/// `[rating]` section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RatingConfig {
    /// Raw score a player must strictly exceed to be counted in the
    /// distribution estimate for their group.
    pub active_threshold: f64,
}

impl Default for RatingConfig {
    fn default() -> Self {
        Self {
            active_threshold: DEFAULT_ACTIVE_THRESHOLD,
        }
    }
}

/// `[snapshot]` section: how records are pulled from a `SnapshotSource`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SnapshotConfig {
    pub page_size: usize,
    pub max_retries: u32,
    pub retry_backoff_ms: u64,
    pub load_timeout_secs: u64,
}

impl Default for SnapshotConfig {
    fn default() -> Self {
        Self {
            page_size: 1000,
            max_retries: 3,
            retry_backoff_ms: 250,
            load_timeout_secs: 120,
        }
    }
}

impl SnapshotConfig {
    /// Delay before retry number `attempt` (1-based), doubling each time.
    pub fn backoff(&self, attempt: u32) -> Duration {
        let factor = 1u64 << attempt.saturating_sub(1).min(16);
        Duration::from_millis(self.retry_backoff_ms.saturating_mul(factor))
    }

    pub fn load_timeout(&self) -> Duration {
        Duration::from_secs(self.load_timeout_secs)
    }
}

// ---------------------------------------------------------------------------
// Loading
// ---------------------------------------------------------------------------

/// Load `config/engine.toml` under `base_dir`.
///
/// A missing file is not an error: the built-in defaults apply. Sections and
/// keys left out of the file also take their defaults.
pub fn load_config_from(base_dir: &Path) -> Result<EngineConfig, ConfigError> {
    let path = base_dir.join(CONFIG_FILE);
    let config = if path.exists() {
        let text = read_file(&path)?;
        parse_config(&text, &path)?
    } else {
        EngineConfig::default()
    };

    validate(&config)?;
    Ok(config)
}

/// Parse config text. `path` is only used in error messages.
pub fn parse_config(text: &str, path: &Path) -> Result<EngineConfig, ConfigError> {
    toml::from_str(text).map_err(|e| ConfigError::ParseError {
        path: path.to_path_buf(),
        source: e,
    })
}

/// Write the default `config/engine.toml` under `base_dir`, creating the
/// directory if needed. Never overwrites an existing file.
pub fn write_default_config(base_dir: &Path) -> Result<PathBuf, ConfigError> {
    let path = base_dir.join(CONFIG_FILE);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| ConfigError::WriteError {
            path: parent.to_path_buf(),
            source: e,
        })?;
    }

    match std::fs::OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(&path)
    {
        Ok(mut dest) => {
            dest.write_all(DEFAULT_CONFIG_TOML.as_bytes())
                .map_err(|e| ConfigError::WriteError {
                    path: path.clone(),
                    source: e,
                })?;
            Ok(path)
        }
        Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
            Err(ConfigError::AlreadyExists { path })
        }
        Err(e) => Err(ConfigError::WriteError { path, source: e }),
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn read_file(path: &Path) -> Result<String, ConfigError> {
    std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
        path: path.to_path_buf(),
        source: e,
    })
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

pub fn validate(config: &EngineConfig) -> Result<(), ConfigError> {
    let threshold = config.rating.active_threshold;
    if !threshold.is_finite() || threshold < INACTIVE_EPSILON {
        return Err(ConfigError::ValidationError {
            field: "rating.active_threshold".into(),
            message: format!("must be a finite number >= {INACTIVE_EPSILON}, got {threshold}"),
        });
    }

    let snapshot = &config.snapshot;
    let positive_fields: &[(&str, u64)] = &[
        ("snapshot.page_size", snapshot.page_size as u64),
        ("snapshot.load_timeout_secs", snapshot.load_timeout_secs),
    ];
    for (name, val) in positive_fields {
        if *val == 0 {
            return Err(ConfigError::ValidationError {
                field: name.to_string(),
                message: "must be > 0".into(),
            });
        }
    }

    Ok(())
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    /// Fresh scratch directory per test so parallel tests don't collide.
    fn scratch_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("statline_{name}_{}", std::process::id()));
        let _ = fs::remove_dir_all(&dir);
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    fn write_config(base: &Path, text: &str) {
        let config_dir = base.join("config");
        fs::create_dir_all(&config_dir).unwrap();
        fs::write(config_dir.join("engine.toml"), text).unwrap();
    }

    #[test]
    fn shipped_defaults_match_built_in_defaults() {
        let parsed = parse_config(DEFAULT_CONFIG_TOML, Path::new("defaults/engine.toml"))
            .expect("defaults should parse");
        assert_eq!(parsed, EngineConfig::default());
        validate(&parsed).expect("defaults should validate");
    }

    #[test]
    fn missing_file_uses_defaults() {
        let tmp = scratch_dir("config_missing");
        let config = load_config_from(&tmp).expect("missing file is fine");
        assert_eq!(config, EngineConfig::default());
        assert!((config.rating.active_threshold - 0.5).abs() < f64::EPSILON);
        assert_eq!(config.snapshot.page_size, 1000);
        let _ = fs::remove_dir_all(&tmp);
    }

    #[test]
    fn partial_file_fills_in_defaults() {
        let tmp = scratch_dir("config_partial");
        write_config(&tmp, "[rating]\nactive_threshold = 2.5\n");
        let config = load_config_from(&tmp).unwrap();
        assert!((config.rating.active_threshold - 2.5).abs() < f64::EPSILON);
        assert_eq!(config.snapshot, SnapshotConfig::default());
        let _ = fs::remove_dir_all(&tmp);
    }

    #[test]
    fn rejects_threshold_below_inactive_epsilon() {
        let tmp = scratch_dir("config_low_threshold");
        write_config(&tmp, "[rating]\nactive_threshold = 0.05\n");
        let err = load_config_from(&tmp).unwrap_err();
        match &err {
            ConfigError::ValidationError { field, .. } => {
                assert_eq!(field, "rating.active_threshold");
            }
            other => panic!("expected ValidationError, got: {other}"),
        }
        let _ = fs::remove_dir_all(&tmp);
    }

    #[test]
    fn rejects_zero_page_size() {
        let tmp = scratch_dir("config_zero_page");
        write_config(&tmp, "[snapshot]\npage_size = 0\n");
        let err = load_config_from(&tmp).unwrap_err();
        match &err {
            ConfigError::ValidationError { field, .. } => {
                assert_eq!(field, "snapshot.page_size");
            }
            other => panic!("expected ValidationError, got: {other}"),
        }
        let _ = fs::remove_dir_all(&tmp);
    }

    #[test]
    fn rejects_zero_timeout() {
        let mut config = EngineConfig::default();
        config.snapshot.load_timeout_secs = 0;
        assert!(matches!(
            validate(&config),
            Err(ConfigError::ValidationError { ref field, .. }) if field == "snapshot.load_timeout_secs"
        ));
    }

    #[test]
    fn rejects_nan_threshold() {
        let mut config = EngineConfig::default();
        config.rating.active_threshold = f64::NAN;
        assert!(validate(&config).is_err());
    }

    #[test]
    fn malformed_toml_is_a_parse_error() {
        let tmp = scratch_dir("config_malformed");
        write_config(&tmp, "[rating\nactive_threshold = ");
        let err = load_config_from(&tmp).unwrap_err();
        assert!(matches!(err, ConfigError::ParseError { .. }));
        let _ = fs::remove_dir_all(&tmp);
    }

    #[test]
    fn write_default_config_never_overwrites() {
        let tmp = scratch_dir("config_write_default");
        let path = write_default_config(&tmp).expect("first write succeeds");
        assert!(path.ends_with("config/engine.toml"));
        assert_eq!(fs::read_to_string(&path).unwrap(), DEFAULT_CONFIG_TOML);

        fs::write(&path, "[rating]\nactive_threshold = 1.0\n").unwrap();
        let err = write_default_config(&tmp).unwrap_err();
        assert!(matches!(err, ConfigError::AlreadyExists { .. }));
        assert!(fs::read_to_string(&path).unwrap().contains("1.0"));
        let _ = fs::remove_dir_all(&tmp);
    }

    #[test]
    fn backoff_doubles() {
        let snapshot = SnapshotConfig {
            retry_backoff_ms: 100,
            ..SnapshotConfig::default()
        };
        assert_eq!(snapshot.backoff(1), Duration::from_millis(100));
        assert_eq!(snapshot.backoff(2), Duration::from_millis(200));
        assert_eq!(snapshot.backoff(3), Duration::from_millis(400));
    }
}
