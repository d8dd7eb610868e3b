//! Agent configuration management.
//!
//! Configuration is stored as TOML:
//! - Linux: `$XDG_CONFIG_HOME/modeguard/agent.toml`, falling back to
//!   `~/.config/modeguard/agent.toml`
//! - Windows: `%APPDATA%/modeguard/agent.toml`

use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Context;
use serde::{Deserialize, Serialize};

use modeguard_security_mode::{DEFAULT_SUBSCRIBER_CAPACITY, SecurityLevel};
use modeguard_tray::RetryConfig;

/// Agent configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Level the store is initialized with, and the auto-revert target.
    #[serde(default = "default_initial_level")]
    pub initial_level: SecurityLevel,

    /// Events buffered per subscriber before it must resynchronize.
    #[serde(default = "default_subscriber_capacity")]
    pub subscriber_capacity: usize,

    /// Revert user-selected levels back to `initial_level` after this many
    /// seconds. Disabled when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auto_revert_secs: Option<u64>,

    /// Tray render retry policy.
    #[serde(default)]
    pub retry: RetrySettings,
}

/// Backoff settings for failed tray renders.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrySettings {
    #[serde(default = "default_initial_delay_ms")]
    pub initial_delay_ms: u64,

    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,

    #[serde(default = "default_backoff_factor")]
    pub backoff_factor: f64,

    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
}

fn default_initial_level() -> SecurityLevel {
    SecurityLevel::Dynamic
}

fn default_subscriber_capacity() -> usize {
    DEFAULT_SUBSCRIBER_CAPACITY
}

fn default_initial_delay_ms() -> u64 {
    200
}

fn default_max_delay_ms() -> u64 {
    5_000
}

fn default_backoff_factor() -> f64 {
    2.0
}

fn default_max_attempts() -> u32 {
    8
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            initial_delay_ms: default_initial_delay_ms(),
            max_delay_ms: default_max_delay_ms(),
            backoff_factor: default_backoff_factor(),
            max_attempts: default_max_attempts(),
        }
    }
}

impl RetrySettings {
    pub fn to_retry_config(&self) -> RetryConfig {
        RetryConfig {
            initial_delay: Duration::from_millis(self.initial_delay_ms),
            max_delay: Duration::from_millis(self.max_delay_ms),
            backoff_factor: self.backoff_factor,
            max_attempts: self.max_attempts,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            initial_level: default_initial_level(),
            subscriber_capacity: default_subscriber_capacity(),
            auto_revert_secs: None,
            retry: RetrySettings::default(),
        }
    }
}

impl Config {
    /// Loads configuration from disk, or creates a default if not found.
    pub fn load() -> anyhow::Result<Self> {
        Self::load_from(&config_path())
    }

    /// Loads configuration from `path`, writing a default file if missing.
    pub fn load_from(path: &Path) -> anyhow::Result<Self> {
        match std::fs::read_to_string(path) {
            Ok(content) => toml::from_str(&content)
                .with_context(|| format!("invalid config file {}", path.display())),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                let config = Config::default();
                config.save_to(path)?;
                tracing::info!(path = %path.display(), "wrote default configuration");
                Ok(config)
            }
            Err(e) => Err(e).with_context(|| format!("reading {}", path.display())),
        }
    }

    /// Writes the configuration to `path`, readable by the owner only on Unix.
    pub fn save_to(&self, path: &Path) -> anyhow::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, toml::to_string_pretty(self)?)
            .with_context(|| format!("writing {}", path.display()))?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600))?;
        }

        tracing::debug!(path = %path.display(), "configuration saved");
        Ok(())
    }

    /// Auto-revert delay, if enabled.
    pub fn auto_revert(&self) -> Option<Duration> {
        self.auto_revert_secs.map(Duration::from_secs)
    }
}

const APP_DIR: &str = "modeguard";
const CONFIG_FILE: &str = "agent.toml";

fn config_path() -> PathBuf {
    config_base_dir().join(APP_DIR).join(CONFIG_FILE)
}

/// Per-user configuration root for the current platform.
fn config_base_dir() -> PathBuf {
    let from_env = |var: &str, fallback: &str| {
        PathBuf::from(std::env::var_os(var).unwrap_or_else(|| fallback.into()))
    };

    if cfg!(target_os = "windows") {
        from_env("APPDATA", "C:\\Users\\Default\\AppData")
    } else if cfg!(target_os = "linux") {
        std::env::var_os("XDG_CONFIG_HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|| from_env("HOME", "/tmp").join(".config"))
    } else {
        PathBuf::from("/tmp")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let config = Config::default();
        assert_eq!(config.initial_level, SecurityLevel::Dynamic);
        assert_eq!(config.subscriber_capacity, DEFAULT_SUBSCRIBER_CAPACITY);
        assert!(config.auto_revert_secs.is_none());
        assert_eq!(config.retry.to_retry_config(), RetryConfig::default());
    }

    #[test]
    fn config_roundtrip_toml() {
        let config = Config {
            initial_level: SecurityLevel::Fortress,
            subscriber_capacity: 8,
            auto_revert_secs: Some(300),
            retry: RetrySettings {
                initial_delay_ms: 50,
                max_delay_ms: 1_000,
                backoff_factor: 3.0,
                max_attempts: 4,
            },
        };

        let toml_str = toml::to_string_pretty(&config).unwrap();
        let parsed: Config = toml::from_str(&toml_str).unwrap();

        assert_eq!(parsed.initial_level, SecurityLevel::Fortress);
        assert_eq!(parsed.subscriber_capacity, 8);
        assert_eq!(parsed.auto_revert_secs, Some(300));
        assert_eq!(parsed.retry.initial_delay_ms, 50);
        assert_eq!(parsed.retry.max_attempts, 4);
    }

    #[test]
    fn config_partial_toml() {
        // Only specify the level, rest should use defaults.
        let toml_str = r#"initial_level = "secure""#;
        let config: Config = toml::from_str(toml_str).unwrap();
        assert_eq!(config.initial_level, SecurityLevel::Secure);
        assert_eq!(config.retry.max_delay_ms, 5_000);
        assert!(config.auto_revert().is_none());
    }

    #[test]
    fn config_partial_retry_table() {
        let toml_str = "auto_revert_secs = 90\n\n[retry]\nmax_attempts = 2\n";
        let config: Config = toml::from_str(toml_str).unwrap();
        assert_eq!(config.auto_revert(), Some(Duration::from_secs(90)));
        let retry = config.retry.to_retry_config();
        assert_eq!(retry.max_attempts, 2);
        assert_eq!(retry.initial_delay, Duration::from_millis(200));
    }

    #[test]
    fn config_rejects_unknown_level() {
        let toml_str = r#"initial_level = "paranoid""#;
        assert!(toml::from_str::<Config>(toml_str).is_err());
    }

    #[test]
    fn config_path_ends_in_app_dir() {
        let path = config_path();
        assert!(path.ends_with(Path::new(APP_DIR).join(CONFIG_FILE)));
    }

    #[test]
    fn load_reports_malformed_file() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("agent.toml");
        std::fs::write(&path, "initial_level = 3").unwrap();

        let err = Config::load_from(&path).unwrap_err();
        assert!(err.to_string().contains("invalid config file"));
        // The broken file is left alone.
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "initial_level = 3");
    }

    #[test]
    fn load_creates_default_file() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("nested").join("agent.toml");

        let config = Config::load_from(&path).unwrap();
        assert!(path.exists());
        assert_eq!(config.initial_level, SecurityLevel::Dynamic);
    }

    #[test]
    fn config_save_and_load() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("agent.toml");

        let config = Config {
            initial_level: SecurityLevel::Off,
            auto_revert_secs: Some(15),
            ..Config::default()
        };
        config.save_to(&path).unwrap();

        let loaded = Config::load_from(&path).unwrap();
        assert_eq!(loaded.initial_level, SecurityLevel::Off);
        assert_eq!(loaded.auto_revert_secs, Some(15));
    }
}
