//! Configuration loading, validation, and management for Waymark.
//!
//! Loads configuration from `~/.waymark/config.toml` with environment
//! variable overrides. Validates all settings at startup.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use waymark_context::{PackingPolicy, RankingWeights};

/// The root configuration structure.
///
/// Maps directly to `~/.waymark/config.toml`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    /// Pipeline-wide settings
    #[serde(default)]
    pub pipeline: PipelineConfig,

    /// Context packer policy
    #[serde(default)]
    pub packing: PackingPolicy,

    /// Default weights for soft preferences
    #[serde(default)]
    pub ranking: RankingWeights,

    /// Log output
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// `[pipeline]` section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Below this best similarity the answer is flagged as low confidence.
    #[serde(default = "default_low_confidence")]
    pub low_confidence_threshold: f32,

    /// Budget used when a spec document omits `max_tokens`.
    #[serde(default = "default_max_tokens")]
    pub default_max_tokens: usize,
}

fn default_low_confidence() -> f32 {
    0.35
}
fn default_max_tokens() -> usize {
    1024
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            low_confidence_threshold: default_low_confidence(),
            default_max_tokens: default_max_tokens(),
        }
    }
}

/// `[logging]` section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Default filter when `RUST_LOG` is unset ("info", "debug", ...)
    #[serde(default = "default_level")]
    pub level: String,

    /// Emit JSON lines instead of human-readable output
    #[serde(default)]
    pub json: bool,
}

fn default_level() -> String {
    "info".into()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_level(),
            json: false,
        }
    }
}

impl AppConfig {
    /// Load configuration from the default path (~/.waymark/config.toml).
    ///
    /// Environment variables take precedence over the file:
    /// - `WAYMARK_MAX_TOKENS`
    /// - `WAYMARK_LOW_CONFIDENCE`
    /// - `WAYMARK_DEDUP_THRESHOLD`
    /// - `WAYMARK_LOG_JSON`
    pub fn load() -> Result<Self, ConfigError> {
        let mut config = Self::load_from(&Self::config_path())?;
        config.apply_env_overrides(|name| std::env::var(name).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a specific file path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::info!("No config file found at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Apply overrides from `lookup` (normally the process environment).
    pub fn apply_env_overrides(
        &mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<(), ConfigError> {
        if let Some(v) = lookup("WAYMARK_MAX_TOKENS") {
            self.pipeline.default_max_tokens = parse_env("WAYMARK_MAX_TOKENS", &v)?;
        }
        if let Some(v) = lookup("WAYMARK_LOW_CONFIDENCE") {
            self.pipeline.low_confidence_threshold = parse_env("WAYMARK_LOW_CONFIDENCE", &v)?;
        }
        if let Some(v) = lookup("WAYMARK_DEDUP_THRESHOLD") {
            self.packing.dedup_threshold = parse_env("WAYMARK_DEDUP_THRESHOLD", &v)?;
        }
        if let Some(v) = lookup("WAYMARK_LOG_JSON") {
            self.logging.json = match v.trim().to_ascii_lowercase().as_str() {
                "1" | "true" | "yes" | "on" => true,
                "0" | "false" | "no" | "off" | "" => false,
                _ => {
                    return Err(ConfigError::InvalidEnv {
                        var: "WAYMARK_LOG_JSON",
                        value: v,
                    });
                }
            };
        }
        Ok(())
    }

    /// Get the configuration directory path.
    pub fn config_dir() -> PathBuf {
        dirs_home().join(".waymark")
    }

    /// Path of the default config file.
    pub fn config_path() -> PathBuf {
        Self::config_dir().join("config.toml")
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let threshold = self.pipeline.low_confidence_threshold;
        if !(0.0..=1.0).contains(&threshold) {
            return Err(ConfigError::ValidationError(format!(
                "pipeline.low_confidence_threshold must be between 0.0 and 1.0, got {threshold}"
            )));
        }

        if self.pipeline.default_max_tokens == 0 {
            return Err(ConfigError::ValidationError(
                "pipeline.default_max_tokens must be > 0".into(),
            ));
        }

        self.packing.validate().map_err(ConfigError::ValidationError)?;
        self.ranking.validate().map_err(ConfigError::ValidationError)?;

        if self.logging.level.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "logging.level must not be empty".into(),
            ));
        }

        Ok(())
    }

    /// Generate a default config TOML string.
    pub fn default_toml() -> String {
        let config = Self::default();
        toml::to_string_pretty(&config).unwrap_or_default()
    }
}

fn parse_env<T: std::str::FromStr>(var: &'static str, value: &str) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::InvalidEnv {
        var,
        value: value.to_string(),
    })
}

/// Get the user's home directory.
fn dirs_home() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        std::env::var("USERPROFILE")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("C:\\Users\\Default"))
    }
    #[cfg(not(target_os = "windows"))]
    {
        std::env::var("HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("/tmp"))
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {path}: {reason}")]
    ReadError { path: PathBuf, reason: String },

    #[error("Failed to parse config file at {path}: {reason}")]
    ParseError { path: PathBuf, reason: String },

    #[error("Invalid value for {var}: {value:?}")]
    InvalidEnv { var: &'static str, value: String },

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;
    use waymark_context::{ScanMode, TokenEstimator};

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn default_config_is_valid() {
        let config = AppConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.pipeline.low_confidence_threshold, 0.35);
        assert_eq!(config.packing.dedup_threshold, 0.85);
        assert_eq!(config.ranking.interest, 0.04);
        assert!(!config.logging.json);
    }

    #[test]
    fn config_roundtrip_toml() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).unwrap();
        let parsed: AppConfig = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed, config);
    }

    #[test]
    fn missing_config_file_returns_defaults() {
        let result = AppConfig::load_from(Path::new("/nonexistent/config.toml"));
        assert_eq!(result.unwrap(), AppConfig::default());
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
[pipeline]
low_confidence_threshold = 0.5

[packing]
scan = "first_fit_stop"
labels = false
estimator = {{ kind = "words", tokens_per_word = 1.33 }}

[logging]
json = true
"#
        )
        .unwrap();

        let config = AppConfig::load_from(file.path()).unwrap();
        assert_eq!(config.pipeline.low_confidence_threshold, 0.5);
        assert_eq!(config.pipeline.default_max_tokens, 1024);
        assert_eq!(config.packing.scan, ScanMode::FirstFitStop);
        assert!(!config.packing.labels);
        assert_eq!(config.packing.estimator, TokenEstimator::words());
        assert_eq!(config.packing.snippet_chars, 200);
        assert!(config.logging.json);
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn invalid_file_value_rejected() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[packing]\ndedup_threshold = 1.5").unwrap();
        assert!(matches!(
            AppConfig::load_from(file.path()),
            Err(ConfigError::ValidationError(msg)) if msg.contains("dedup_threshold")
        ));
    }

    #[test]
    fn malformed_file_is_a_parse_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[pipeline\nlow_confidence_threshold = ").unwrap();
        assert!(matches!(
            AppConfig::load_from(file.path()),
            Err(ConfigError::ParseError { .. })
        ));
    }

    #[test]
    fn env_overrides_take_precedence() {
        let mut config = AppConfig::default();
        config
            .apply_env_overrides(env(&[
                ("WAYMARK_MAX_TOKENS", "2048"),
                ("WAYMARK_LOW_CONFIDENCE", "0.2"),
                ("WAYMARK_DEDUP_THRESHOLD", " 0.9 "),
                ("WAYMARK_LOG_JSON", "true"),
            ]))
            .unwrap();
        assert_eq!(config.pipeline.default_max_tokens, 2048);
        assert_eq!(config.pipeline.low_confidence_threshold, 0.2);
        assert_eq!(config.packing.dedup_threshold, 0.9);
        assert!(config.logging.json);
    }

    #[test]
    fn unparsable_env_value_rejected() {
        let mut config = AppConfig::default();
        let err = config
            .apply_env_overrides(env(&[("WAYMARK_MAX_TOKENS", "lots")]))
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidEnv { var: "WAYMARK_MAX_TOKENS", .. }));

        let err = config
            .apply_env_overrides(env(&[("WAYMARK_LOG_JSON", "maybe")]))
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidEnv { var: "WAYMARK_LOG_JSON", .. }));
    }

    #[test]
    fn out_of_range_threshold_rejected() {
        let config = AppConfig {
            pipeline: PipelineConfig {
                low_confidence_threshold: 1.2,
                ..PipelineConfig::default()
            },
            ..AppConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn default_toml_generation() {
        let toml_str = AppConfig::default_toml();
        assert!(toml_str.contains("low_confidence_threshold"));
        assert!(toml_str.contains("dedup_threshold"));
        assert!(toml_str.contains("scan_all"));
    }
}
