//! Configuration for the keyfence input core.
//!
//! [`KeyfenceConfig`] holds the policy constants the router and the shared
//! primitives read: the typeahead expiry, announcement toggles, page size,
//! and the generic fault message.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{KeyfenceError, KeyfenceResult};
use crate::tracing_config;

/// Default typeahead buffer expiry.
pub const DEFAULT_TYPEAHEAD_TIMEOUT_MS: u64 = 3_000;

/// Default PageUp/PageDown stride.
pub const DEFAULT_PAGE_SIZE: usize = 10;

/// Default text spoken when a handler faults.
pub const DEFAULT_FAULT_ANNOUNCEMENT: &str = "Action failed";

/// Runtime configuration.
///
/// All fields have sensible defaults. Override selectively via a TOML file
/// or environment variables.
///
/// # Environment Variable Overrides
///
/// | Variable                          | Field                  | Default  |
/// |-----------------------------------|------------------------|----------|
/// | `KEYFENCE_TYPEAHEAD_TIMEOUT_MS`   | `typeahead_timeout_ms` | `3000`   |
/// | `KEYFENCE_ANNOUNCE_POSITIONS`     | `announce_positions`   | `true`   |
/// | `KEYFENCE_ANNOUNCE_LEVELS`        | `announce_levels`      | `true`   |
/// | `KEYFENCE_PAGE_SIZE`              | `page_size`            | `10`     |
/// | `KEYFENCE_LOG_LEVEL`              | `log_level`            | `warn`   |
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct KeyfenceConfig {
    /// Idle time after which the typeahead buffer is discarded.
    /// Default: 3000.
    pub typeahead_timeout_ms: u64,

    /// Append "n of m" to cursor-move announcements.
    /// Default: true.
    pub announce_positions: bool,

    /// Announce tree depth changes (debounced).
    /// Default: true.
    pub announce_levels: bool,

    /// Rows skipped by PageUp/PageDown.
    /// Default: 10.
    pub page_size: usize,

    /// Spoken when a handler faults.
    /// Default: "Action failed".
    pub fault_announcement: String,

    /// Default log level when no filter env var is set.
    /// Default: "warn".
    pub log_level: String,
}

impl Default for KeyfenceConfig {
    fn default() -> Self {
        Self {
            typeahead_timeout_ms: DEFAULT_TYPEAHEAD_TIMEOUT_MS,
            announce_positions: true,
            announce_levels: true,
            page_size: DEFAULT_PAGE_SIZE,
            fault_announcement: DEFAULT_FAULT_ANNOUNCEMENT.to_string(),
            log_level: "warn".to_string(),
        }
    }
}

impl KeyfenceConfig {
    /// Typeahead expiry as a `Duration`.
    #[must_use]
    pub const fn typeahead_timeout(&self) -> Duration {
        Duration::from_millis(self.typeahead_timeout_ms)
    }

    /// Parse and validate a TOML document.
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfig` if the document does not parse or a value is
    /// out of range.
    pub fn from_toml_str(contents: &str) -> KeyfenceResult<Self> {
        let config: Self = toml::from_str(contents).map_err(|e| KeyfenceError::InvalidConfig {
            field: "<document>".to_string(),
            value: String::new(),
            reason: e.to_string(),
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a TOML file.
    ///
    /// # Errors
    ///
    /// Returns `Io` if the file cannot be read, `ConfigParse` if it is not
    /// valid TOML for this struct, and `InvalidConfig` for out-of-range values.
    pub fn load(path: &Path) -> KeyfenceResult<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: Self =
            toml::from_str(&contents).map_err(|source| KeyfenceError::ConfigParse {
                path: path.to_path_buf(),
                source,
            })?;
        config.validate()?;
        tracing::debug!(path = %path.display(), "loaded keyfence config");
        Ok(config)
    }

    /// Load overrides from environment variables.
    ///
    /// Only overrides fields for which environment variables are set.
    /// Invalid values are ignored (the current value is kept).
    #[must_use]
    pub fn with_env_overrides(self) -> Self {
        self.with_overrides_from(|key| std::env::var(key).ok())
    }

    fn with_overrides_from(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(val) = lookup("KEYFENCE_TYPEAHEAD_TIMEOUT_MS")
            && let Ok(ms) = val.parse::<u64>()
            && ms > 0
        {
            self.typeahead_timeout_ms = ms;
        }
        if let Some(val) = lookup("KEYFENCE_ANNOUNCE_POSITIONS") {
            self.announce_positions = parse_flag(&val).unwrap_or(self.announce_positions);
        }
        if let Some(val) = lookup("KEYFENCE_ANNOUNCE_LEVELS") {
            self.announce_levels = parse_flag(&val).unwrap_or(self.announce_levels);
        }
        if let Some(val) = lookup("KEYFENCE_PAGE_SIZE")
            && let Ok(size) = val.parse::<usize>()
            && size > 0
        {
            self.page_size = size;
        }
        if let Some(val) = lookup("KEYFENCE_LOG_LEVEL")
            && tracing_config::parse_level(&val).is_some()
        {
            self.log_level = val;
        }
        self
    }

    /// Check every field for range errors.
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfig` naming the first offending field.
    pub fn validate(&self) -> KeyfenceResult<()> {
        if self.typeahead_timeout_ms == 0 {
            return Err(KeyfenceError::InvalidConfig {
                field: "typeahead_timeout_ms".to_string(),
                value: "0".to_string(),
                reason: "timeout must be positive".to_string(),
            });
        }
        if self.page_size == 0 {
            return Err(KeyfenceError::InvalidConfig {
                field: "page_size".to_string(),
                value: "0".to_string(),
                reason: "page size must be at least 1".to_string(),
            });
        }
        if tracing_config::parse_level(&self.log_level).is_none() {
            return Err(KeyfenceError::InvalidConfig {
                field: "log_level".to_string(),
                value: self.log_level.clone(),
                reason: "expected trace, debug, info, warn, or error".to_string(),
            });
        }
        Ok(())
    }
}

fn parse_flag(val: &str) -> Option<bool> {
    match val.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = KeyfenceConfig::default();
        assert_eq!(config.typeahead_timeout(), Duration::from_secs(3));
        assert_eq!(config.page_size, 10);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn toml_partial_document_keeps_defaults() {
        let config = KeyfenceConfig::from_toml_str("typeahead_timeout_ms = 1500\n").unwrap();
        assert_eq!(config.typeahead_timeout_ms, 1500);
        assert!(config.announce_levels);
        assert_eq!(config.fault_announcement, DEFAULT_FAULT_ANNOUNCEMENT);
    }

    #[test]
    fn toml_rejects_zero_timeout() {
        let err = KeyfenceConfig::from_toml_str("typeahead_timeout_ms = 0").unwrap_err();
        assert!(matches!(err, KeyfenceError::InvalidConfig { ref field, .. } if field == "typeahead_timeout_ms"));
    }

    #[test]
    fn toml_rejects_bad_log_level() {
        let err = KeyfenceConfig::from_toml_str("log_level = \"loud\"").unwrap_err();
        assert!(err.to_string().contains("log_level"));
    }

    #[test]
    fn toml_rejects_wrong_types() {
        assert!(KeyfenceConfig::from_toml_str("page_size = \"ten\"").is_err());
    }

    #[test]
    fn env_overrides_apply_valid_values_only() {
        let env: HashMap<&str, &str> = [
            ("KEYFENCE_TYPEAHEAD_TIMEOUT_MS", "1200"),
            ("KEYFENCE_ANNOUNCE_POSITIONS", "off"),
            ("KEYFENCE_ANNOUNCE_LEVELS", "maybe"),
            ("KEYFENCE_PAGE_SIZE", "0"),
            ("KEYFENCE_LOG_LEVEL", "debug"),
        ]
        .into_iter()
        .collect();
        let config = KeyfenceConfig::default()
            .with_overrides_from(|key| env.get(key).map(ToString::to_string));
        assert_eq!(config.typeahead_timeout_ms, 1200);
        assert!(!config.announce_positions);
        assert!(config.announce_levels);
        assert_eq!(config.page_size, DEFAULT_PAGE_SIZE);
        assert_eq!(config.log_level, "debug");
    }

    #[test]
    fn load_missing_file_is_io_error() {
        let err = KeyfenceConfig::load(Path::new("/nonexistent/keyfence.toml")).unwrap_err();
        assert!(matches!(err, KeyfenceError::Io(_)));
    }

    #[test]
    fn load_reads_file() {
        let path = std::env::temp_dir().join(format!(
            "keyfence-config-{}.toml",
            std::process::id()
        ));
        std::fs::write(&path, "page_size = 5\nannounce_positions = false\n").unwrap();
        let config = KeyfenceConfig::load(&path).unwrap();
        assert_eq!(config.page_size, 5);
        assert!(!config.announce_positions);
        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn config_serde_roundtrip() {
        let config = KeyfenceConfig {
            page_size: 7,
            ..KeyfenceConfig::default()
        };
        let json = serde_json::to_string(&config).unwrap();
        let decoded: KeyfenceConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(decoded, config);
    }
}
