//! Configuration loading with env-var overrides.
//!
//! Reads `config/default.toml` relative to the current working directory
//! (built-in defaults if it is absent), then applies `HUB_BRIDGE_LOG_LEVEL`
//! and `HUB_BRIDGE_NOTIFICATION_FAILURES` env overrides.

use std::{
    env, fs,
    path::{Path, PathBuf},
};

use serde::Deserialize;

use crate::bridge::NotificationFailurePolicy;
use crate::error::AppError;

const DEFAULT_CONFIG_PATH: &str = "config/default.toml";

/// Bridge dispatch configuration.
#[derive(Debug, Clone)]
pub struct BridgeConfig {
    /// Organisation name stamped on dispatch metadata.
    pub org: String,
    /// Module name stamped on dispatch metadata.
    pub module: String,
    /// Module version stamped on dispatch metadata.
    pub version: String,
    /// Handling of failed fire-and-forget hooks.
    pub notification_failures: NotificationFailurePolicy,
    /// Capacity of the failure channel under `propagate`.
    pub failure_buffer: usize,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            org: default_org(),
            module: default_module(),
            version: default_version(),
            notification_failures: NotificationFailurePolicy::default(),
            failure_buffer: default_failure_buffer(),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    pub level: String,
    /// Append log output here instead of stderr (already expanded, no `~`).
    pub file: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file: None,
        }
    }
}

/// Fully-resolved configuration.
#[derive(Debug, Clone, Default)]
pub struct Config {
    pub bridge: BridgeConfig,
    pub logging: LoggingConfig,
}

/// Raw TOML shape: `serde` target before resolution.
#[derive(Deserialize, Default)]
struct RawConfig {
    #[serde(default)]
    bridge: RawBridge,
    #[serde(default)]
    logging: RawLogging,
}

#[derive(Deserialize)]
struct RawBridge {
    #[serde(default = "default_org")]
    org: String,
    #[serde(default = "default_module")]
    module: String,
    #[serde(default = "default_version")]
    version: String,
    /// `drop`, `log` or `propagate`; validated during resolution.
    #[serde(default)]
    notification_failures: Option<String>,
    #[serde(default = "default_failure_buffer")]
    failure_buffer: usize,
}

impl Default for RawBridge {
    fn default() -> Self {
        Self {
            org: default_org(),
            module: default_module(),
            version: default_version(),
            notification_failures: None,
            failure_buffer: default_failure_buffer(),
        }
    }
}

#[derive(Deserialize)]
struct RawLogging {
    #[serde(default = "default_log_level")]
    level: String,
    #[serde(default)]
    file: Option<String>,
}

impl Default for RawLogging {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file: None,
        }
    }
}

fn default_org() -> String { "ballerina".to_string() }
fn default_module() -> String { "websubhub".to_string() }
fn default_version() -> String { env!("CARGO_PKG_VERSION").to_string() }
fn default_failure_buffer() -> usize { 64 }
fn default_log_level() -> String { "info".to_string() }

/// Env-var overrides applied on top of the file.
#[derive(Debug, Clone, Default)]
pub struct Overrides<'a> {
    pub log_level: Option<&'a str>,
    pub notification_failures: Option<&'a str>,
}

/// Load `config/default.toml` (or built-in defaults if it does not exist),
/// then apply env-var overrides.
pub fn load() -> Result<Config, AppError> {
    let log_level = env::var("HUB_BRIDGE_LOG_LEVEL").ok();
    let policy = env::var("HUB_BRIDGE_NOTIFICATION_FAILURES").ok();
    let overrides = Overrides {
        log_level: log_level.as_deref(),
        notification_failures: policy.as_deref(),
    };

    let path = Path::new(DEFAULT_CONFIG_PATH);
    if path.exists() {
        load_from(path, &overrides)
    } else {
        resolve(RawConfig::default(), &overrides)
    }
}

/// Internal loader: accepts an explicit path and overrides.
/// Tests pass overrides directly instead of mutating env vars.
pub fn load_from(path: &Path, overrides: &Overrides<'_>) -> Result<Config, AppError> {
    let raw = fs::read_to_string(path)
        .map_err(|e| AppError::Config(format!("cannot read {}: {e}", path.display())))?;

    let parsed: RawConfig = toml::from_str(&raw)
        .map_err(|e| AppError::Config(format!("parse error in {}: {e}", path.display())))?;

    resolve(parsed, overrides)
}

fn resolve(raw: RawConfig, overrides: &Overrides<'_>) -> Result<Config, AppError> {
    let policy = match overrides
        .notification_failures
        .or(raw.bridge.notification_failures.as_deref())
    {
        Some(s) => s.parse::<NotificationFailurePolicy>().map_err(AppError::Config)?,
        None => NotificationFailurePolicy::default(),
    };

    if raw.bridge.failure_buffer == 0 {
        return Err(AppError::Config(
            "bridge.failure_buffer must be greater than zero".into(),
        ));
    }

    let level = overrides
        .log_level
        .map(str::to_string)
        .unwrap_or(raw.logging.level);
    crate::logger::parse_level(&level)
        .map_err(|_| AppError::Config(format!("unrecognised logging.level '{level}'")))?;

    Ok(Config {
        bridge: BridgeConfig {
            org: raw.bridge.org,
            module: raw.bridge.module,
            version: raw.bridge.version,
            notification_failures: policy,
            failure_buffer: raw.bridge.failure_buffer,
        },
        logging: LoggingConfig {
            level,
            file: raw.logging.file.as_deref().map(expand_home),
        },
    })
}

/// Expand a leading `~` to the user's home directory.
/// Absolute or relative paths without `~` are returned unchanged.
pub fn expand_home(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/")
        && let Some(home) = dirs::home_dir()
    {
        return home.join(rest);
    }
    if path == "~"
        && let Some(home) = dirs::home_dir()
    {
        return home;
    }
    PathBuf::from(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const FULL_TOML: &str = r#"
[bridge]
org = "example"
module = "hub"
version = "2.1.0"
notification_failures = "propagate"
failure_buffer = 8

[logging]
level = "debug"
file = "/var/log/hub-bridge.log"
"#;

    fn write_toml(content: &str) -> NamedTempFile {
        let mut f = NamedTempFile::new().unwrap();
        f.write_all(content.as_bytes()).unwrap();
        f
    }

    #[test]
    fn parse_full_config() {
        let f = write_toml(FULL_TOML);
        let cfg = load_from(f.path(), &Overrides::default()).unwrap();
        assert_eq!(cfg.bridge.org, "example");
        assert_eq!(cfg.bridge.module, "hub");
        assert_eq!(cfg.bridge.version, "2.1.0");
        assert_eq!(cfg.bridge.notification_failures, NotificationFailurePolicy::Propagate);
        assert_eq!(cfg.bridge.failure_buffer, 8);
        assert_eq!(cfg.logging.level, "debug");
        assert_eq!(cfg.logging.file, Some(PathBuf::from("/var/log/hub-bridge.log")));
    }

    #[test]
    fn empty_file_uses_defaults() {
        let f = write_toml("");
        let cfg = load_from(f.path(), &Overrides::default()).unwrap();
        assert_eq!(cfg.bridge.org, "ballerina");
        assert_eq!(cfg.bridge.module, "websubhub");
        assert_eq!(cfg.bridge.version, env!("CARGO_PKG_VERSION"));
        assert_eq!(cfg.bridge.notification_failures, NotificationFailurePolicy::Log);
        assert_eq!(cfg.logging.level, "info");
        assert!(cfg.logging.file.is_none());
    }

    #[test]
    fn overrides_win_over_file() {
        let f = write_toml(FULL_TOML);
        let overrides = Overrides {
            log_level: Some("warn"),
            notification_failures: Some("drop"),
        };
        let cfg = load_from(f.path(), &overrides).unwrap();
        assert_eq!(cfg.logging.level, "warn");
        assert_eq!(cfg.bridge.notification_failures, NotificationFailurePolicy::Drop);
    }

    #[test]
    fn unknown_policy_is_config_error() {
        let f = write_toml("[bridge]\nnotification_failures = \"shout\"\n");
        let err = load_from(f.path(), &Overrides::default()).unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("config error"));
        assert!(msg.contains("shout"));
    }

    #[test]
    fn unknown_log_level_in_file_is_config_error() {
        let f = write_toml("[logging]\nlevel = \"verbose\"\n");
        let msg = load_from(f.path(), &Overrides::default()).unwrap_err().to_string();
        assert!(msg.starts_with("config error"));
        assert!(msg.contains("verbose"));
    }

    #[test]
    fn unknown_log_level_override_is_config_error() {
        let f = write_toml("");
        let overrides = Overrides {
            log_level: Some("verbose"),
            notification_failures: None,
        };
        let err = load_from(f.path(), &overrides).unwrap_err();
        assert!(matches!(err, AppError::Config(_)));
    }

    #[test]
    fn builtin_defaults_resolve() {
        let cfg = resolve(RawConfig::default(), &Overrides::default()).unwrap();
        assert_eq!(cfg.bridge.org, BridgeConfig::default().org);
        assert_eq!(cfg.logging.level, "info");
    }

    #[test]
    fn zero_failure_buffer_rejected() {
        let f = write_toml("[bridge]\nfailure_buffer = 0\n");
        assert!(load_from(f.path(), &Overrides::default()).is_err());
    }

    #[test]
    fn malformed_toml_errors() {
        let f = write_toml("[bridge\nmodule = ");
        let msg = load_from(f.path(), &Overrides::default()).unwrap_err().to_string();
        assert!(msg.contains("parse error"));
    }

    #[test]
    fn missing_file_errors() {
        let result = load_from(Path::new("/nonexistent/config.toml"), &Overrides::default());
        assert!(result.unwrap_err().to_string().contains("cannot read"));
    }

    #[test]
    fn tilde_expands_to_home() {
        let home = dirs::home_dir().expect("home dir must exist in test env");
        let expanded = expand_home("~/.hub-bridge/bridge.log");
        assert!(expanded.starts_with(&home));
        assert!(expanded.ends_with("bridge.log"));
    }

    #[test]
    fn plain_paths_unchanged() {
        assert_eq!(expand_home("/absolute/path"), PathBuf::from("/absolute/path"));
        assert_eq!(expand_home("relative/path"), PathBuf::from("relative/path"));
    }
}
