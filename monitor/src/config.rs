//! Configuration module for AFK Monitor.
//!
//! Configuration is layered, lowest precedence first: built-in defaults, a
//! TOML file, environment variables, then command-line flags (applied by the
//! binary through [`Config::apply_cli`]).
//!
//! # File Format
//!
//! ```toml
//! [settings]
//! journal_folder = "C:/Users/me/Saved Games/Frontier Developments/Elite Dangerous"
//! use_utc = false
//! fuel_tank = 64
//! on_malformed = "skip"      # or "abort"
//! poll_interval_ms = 1000
//! duplicate_cap = 5
//!
//! [discord]
//! webhook_url = "https://discord.com/api/webhooks/..."
//! user_id = "123456789012345678"
//!
//! [log_levels]
//! easy-target-scanned = 1
//! ship-destroyed = 3
//! ```
//!
//! # Environment Variables
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `AFK_MONITOR_JOURNAL_DIR` | `~/Saved Games/Frontier Developments/Elite Dangerous` | Journal folder |
//! | `AFK_MONITOR_WEBHOOK_URL` | - | Remote webhook URL (enables remote delivery) |
//! | `AFK_MONITOR_USER_ID` | - | User ID mentioned on level 3 notifications |
//! | `AFK_MONITOR_USE_UTC` | `false` | Stamp output in UTC instead of local time |
//! | `AFK_MONITOR_FUEL_TANK` | 64 | Main fuel tank capacity in tonnes |
//!
//! # Example
//!
//! ```no_run
//! use std::path::Path;
//! use afk_monitor::config::Config;
//!
//! let config = Config::load(Path::new("config.toml")).expect("Failed to load configuration");
//! println!("Fuel tank: {}t", config.fuel_tank);
//! ```

use std::collections::{BTreeMap, HashMap};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::BaseDirs;
use serde::Deserialize;
use thiserror::Error;
use tracing::info;

use crate::dedup::DEFAULT_DUPLICATE_CAP;
use crate::format::TimeMode;
use crate::types::{EventKey, LogLevel};

/// Default configuration file name, looked up in the working directory.
pub const DEFAULT_CONFIG_FILE: &str = "config.toml";

/// Default main fuel tank capacity (Type-10 and Cutter).
const DEFAULT_FUEL_TANK: f64 = 64.0;

/// Default journal polling interval in milliseconds.
const DEFAULT_POLL_INTERVAL_MS: u64 = 1000;

/// Journal folder relative to the home directory.
const DEFAULT_JOURNAL_SUBDIR: [&str; 3] = ["Saved Games", "Frontier Developments", "Elite Dangerous"];

/// Errors that can occur during configuration loading.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// The configuration file exists but could not be read.
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The configuration file is not valid TOML or has the wrong shape.
    #[error("invalid configuration file: {0}")]
    Toml(#[from] toml::de::Error),

    /// A setting has an invalid value.
    #[error("invalid value for {key}: {message}")]
    InvalidValue { key: String, message: String },

    /// Failed to determine home directory.
    #[error("failed to determine home directory")]
    NoHomeDirectory,
}

/// What to do with a journal line that cannot be parsed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MalformedPolicy {
    /// Log a warning and continue with the next line.
    #[default]
    Skip,
    /// Stop monitoring.
    Abort,
}

/// Level resolved for a key, with whether it came from the default.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolvedLevel {
    pub level: LogLevel,
    pub was_default: bool,
}

/// Per-event-kind verbosity table.
///
/// Keys absent from the configuration resolve to [`EventKey::default_level`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VerbosityPolicy {
    levels: HashMap<EventKey, LogLevel>,
    unknown_keys: Vec<String>,
}

impl VerbosityPolicy {
    /// Builds a policy from the `[log_levels]` table.
    ///
    /// Unrecognised keys are kept for reporting and otherwise ignored.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidValue`] for a level outside `0..=3`.
    pub fn from_table(table: &BTreeMap<String, i64>) -> Result<Self, ConfigError> {
        let mut policy = Self::default();

        for (name, value) in table {
            let Ok(key) = name.parse::<EventKey>() else {
                policy.unknown_keys.push(name.clone());
                continue;
            };
            let level = LogLevel::from_int(*value).ok_or_else(|| ConfigError::InvalidValue {
                key: format!("log_levels.{name}"),
                message: format!("expected level 0-3, got {value}"),
            })?;
            policy.levels.insert(key, level);
        }

        Ok(policy)
    }

    /// Sets the level for one key.
    #[must_use]
    pub fn with_level(mut self, key: EventKey, level: LogLevel) -> Self {
        self.levels.insert(key, level);
        self
    }

    /// Resolves the level for a key.
    #[must_use]
    pub fn resolve(&self, key: EventKey) -> ResolvedLevel {
        match self.levels.get(&key) {
            Some(level) => ResolvedLevel {
                level: *level,
                was_default: false,
            },
            None => ResolvedLevel {
                level: key.default_level(),
                was_default: true,
            },
        }
    }

    #[must_use]
    pub fn level(&self, key: EventKey) -> LogLevel {
        self.resolve(key).level
    }

    /// Keys that fall back to their default level.
    #[must_use]
    pub fn defaulted_keys(&self) -> Vec<EventKey> {
        EventKey::ALL
            .into_iter()
            .filter(|key| self.resolve(*key).was_default)
            .collect()
    }

    /// Configured keys that do not name any event.
    #[must_use]
    pub fn unknown_keys(&self) -> &[String] {
        &self.unknown_keys
    }
}

/// Raw configuration file layout.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct FileConfig {
    settings: SettingsSection,
    discord: DiscordSection,
    log_levels: BTreeMap<String, i64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct SettingsSection {
    journal_folder: Option<PathBuf>,
    use_utc: bool,
    fuel_tank: Option<f64>,
    on_malformed: MalformedPolicy,
    poll_interval_ms: Option<u64>,
    duplicate_cap: Option<u32>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct DiscordSection {
    webhook_url: Option<String>,
    user_id: Option<String>,
}

/// Configuration for AFK Monitor.
#[derive(Debug, Clone)]
pub struct Config {
    /// Journal folder override. `None` means the default under the home
    /// directory.
    pub journal_folder: Option<PathBuf>,

    /// Explicit journal file instead of the latest one in the folder.
    pub journal_file: Option<PathBuf>,

    /// Clock used for output timestamps.
    pub time_mode: TimeMode,

    /// Main fuel tank capacity in tonnes.
    pub fuel_tank: f64,

    /// Handling of unparseable journal lines.
    pub on_malformed: MalformedPolicy,

    /// Sleep between polls when the journal has no new data.
    pub poll_interval: Duration,

    /// Identical remote messages delivered before suppression.
    pub duplicate_cap: u32,

    /// Remote webhook URL. `None` disables remote delivery.
    pub webhook_url: Option<String>,

    /// User ID mentioned on level 3 notifications.
    pub user_id: Option<String>,

    /// Per-event verbosity.
    pub verbosity: VerbosityPolicy,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            journal_folder: None,
            journal_file: None,
            time_mode: TimeMode::Local,
            fuel_tank: DEFAULT_FUEL_TANK,
            on_malformed: MalformedPolicy::Skip,
            poll_interval: Duration::from_millis(DEFAULT_POLL_INTERVAL_MS),
            duplicate_cap: DEFAULT_DUPLICATE_CAP,
            webhook_url: None,
            user_id: None,
            verbosity: VerbosityPolicy::default(),
        }
    }
}

impl Config {
    /// Loads the configuration file at `path` (defaults when it does not
    /// exist) and applies environment overrides.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if the file cannot be read or parsed, or if
    /// any setting is out of range.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let mut config = if path.exists() {
            let contents = fs::read_to_string(path).map_err(|source| ConfigError::Read {
                path: path.to_path_buf(),
                source,
            })?;
            info!(path = %path.display(), "Loading configuration file");
            Self::from_toml_str(&contents)?
        } else {
            info!(path = %path.display(), "No configuration file, using defaults");
            Self::default()
        };

        config.apply_env()?;
        Ok(config)
    }

    /// Parses configuration from TOML without consulting the environment.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if the TOML is malformed or any setting is out
    /// of range.
    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        let file: FileConfig = toml::from_str(contents)?;
        let settings = file.settings;

        let fuel_tank = match settings.fuel_tank {
            Some(tank) => validate_fuel_tank("settings.fuel_tank", tank)?,
            None => DEFAULT_FUEL_TANK,
        };

        let poll_interval_ms = settings.poll_interval_ms.unwrap_or(DEFAULT_POLL_INTERVAL_MS);
        if poll_interval_ms == 0 {
            return Err(ConfigError::InvalidValue {
                key: "settings.poll_interval_ms".to_string(),
                message: "poll interval must be greater than 0".to_string(),
            });
        }

        let duplicate_cap = settings.duplicate_cap.unwrap_or(DEFAULT_DUPLICATE_CAP);
        if duplicate_cap == 0 {
            return Err(ConfigError::InvalidValue {
                key: "settings.duplicate_cap".to_string(),
                message: "duplicate cap must be greater than 0".to_string(),
            });
        }

        Ok(Self {
            journal_folder: settings.journal_folder,
            journal_file: None,
            time_mode: if settings.use_utc {
                TimeMode::Utc
            } else {
                TimeMode::Local
            },
            fuel_tank,
            on_malformed: settings.on_malformed,
            poll_interval: Duration::from_millis(poll_interval_ms),
            duplicate_cap,
            webhook_url: non_empty(file.discord.webhook_url),
            user_id: non_empty(file.discord.user_id),
            verbosity: VerbosityPolicy::from_table(&file.log_levels)?,
        })
    }

    /// Applies `AFK_MONITOR_*` environment overrides.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidValue`] for unparseable values.
    pub fn apply_env(&mut self) -> Result<(), ConfigError> {
        if let Ok(dir) = env::var("AFK_MONITOR_JOURNAL_DIR") {
            self.journal_folder = Some(PathBuf::from(dir));
        }

        if let Ok(url) = env::var("AFK_MONITOR_WEBHOOK_URL") {
            self.webhook_url = non_empty(Some(url));
        }

        if let Ok(user) = env::var("AFK_MONITOR_USER_ID") {
            self.user_id = non_empty(Some(user));
        }

        if let Ok(val) = env::var("AFK_MONITOR_USE_UTC") {
            let use_utc = match val.trim().to_ascii_lowercase().as_str() {
                "1" | "true" | "yes" => true,
                "0" | "false" | "no" => false,
                _ => {
                    return Err(ConfigError::InvalidValue {
                        key: "AFK_MONITOR_USE_UTC".to_string(),
                        message: format!("expected true or false, got '{val}'"),
                    })
                }
            };
            self.time_mode = if use_utc { TimeMode::Utc } else { TimeMode::Local };
        }

        if let Ok(val) = env::var("AFK_MONITOR_FUEL_TANK") {
            let tank = val.parse::<f64>().map_err(|_| ConfigError::InvalidValue {
                key: "AFK_MONITOR_FUEL_TANK".to_string(),
                message: format!("expected a number, got '{val}'"),
            })?;
            self.fuel_tank = validate_fuel_tank("AFK_MONITOR_FUEL_TANK", tank)?;
        }

        Ok(())
    }

    /// Applies command-line overrides.
    pub fn apply_cli(
        &mut self,
        journal_folder: Option<PathBuf>,
        journal_file: Option<PathBuf>,
        use_utc: bool,
    ) {
        if journal_folder.is_some() {
            self.journal_folder = journal_folder;
        }
        if journal_file.is_some() {
            self.journal_file = journal_file;
        }
        if use_utc {
            self.time_mode = TimeMode::Utc;
        }
    }

    /// Resolves the journal folder, falling back to the default location
    /// under the home directory.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::NoHomeDirectory`] when no folder is configured
    /// and the home directory cannot be determined.
    pub fn journal_dir(&self) -> Result<PathBuf, ConfigError> {
        if let Some(folder) = &self.journal_folder {
            return Ok(folder.clone());
        }

        let base_dirs = BaseDirs::new().ok_or(ConfigError::NoHomeDirectory)?;
        Ok(DEFAULT_JOURNAL_SUBDIR
            .iter()
            .fold(base_dirs.home_dir().to_path_buf(), |dir, part| dir.join(part)))
    }
}

fn validate_fuel_tank(key: &str, tank: f64) -> Result<f64, ConfigError> {
    if tank.is_finite() && tank > 0.0 {
        Ok(tank)
    } else {
        Err(ConfigError::InvalidValue {
            key: key.to_string(),
            message: format!("fuel tank must be a positive number, got {tank}"),
        })
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::env;

    /// Helper to run tests with isolated environment variables.
    /// Clears all AFK_MONITOR_* vars before the test and restores them after.
    fn with_clean_env<F, R>(f: F) -> R
    where
        F: FnOnce() -> R,
    {
        let saved_vars: Vec<(String, String)> = env::vars()
            .filter(|(k, _)| k.starts_with("AFK_MONITOR_"))
            .collect();

        for (key, _) in &saved_vars {
            env::remove_var(key);
        }

        let result = f();

        for (key, _) in env::vars().filter(|(k, _)| k.starts_with("AFK_MONITOR_")) {
            env::remove_var(key);
        }
        for (key, value) in saved_vars {
            env::set_var(key, value);
        }

        result
    }

    #[test]
    fn empty_file_uses_defaults() {
        let config = Config::from_toml_str("").expect("empty config should parse");

        assert!(config.journal_folder.is_none());
        assert_eq!(config.time_mode, TimeMode::Local);
        assert_eq!(config.fuel_tank, DEFAULT_FUEL_TANK);
        assert_eq!(config.on_malformed, MalformedPolicy::Skip);
        assert_eq!(config.poll_interval, Duration::from_millis(1000));
        assert_eq!(config.duplicate_cap, DEFAULT_DUPLICATE_CAP);
        assert!(config.webhook_url.is_none());
        assert!(config.user_id.is_none());
        assert_eq!(config.verbosity.defaulted_keys().len(), EventKey::ALL.len());
    }

    #[test]
    fn full_file() {
        let config = Config::from_toml_str(
            r#"
[settings]
journal_folder = "/journals"
use_utc = true
fuel_tank = 32
on_malformed = "abort"
poll_interval_ms = 250
duplicate_cap = 3

[discord]
webhook_url = "https://example.com/hook"
user_id = "42"

[log_levels]
easy-target-scanned = 0
ship-destroyed = 2
"#,
        )
        .expect("full config should parse");

        assert_eq!(config.journal_folder, Some(PathBuf::from("/journals")));
        assert_eq!(config.time_mode, TimeMode::Utc);
        assert_eq!(config.fuel_tank, 32.0);
        assert_eq!(config.on_malformed, MalformedPolicy::Abort);
        assert_eq!(config.poll_interval, Duration::from_millis(250));
        assert_eq!(config.duplicate_cap, 3);
        assert_eq!(config.webhook_url.as_deref(), Some("https://example.com/hook"));
        assert_eq!(config.user_id.as_deref(), Some("42"));
        assert_eq!(
            config.verbosity.level(EventKey::EasyTargetScanned),
            LogLevel::Suppressed
        );
        assert_eq!(
            config.verbosity.level(EventKey::ShipDestroyed),
            LogLevel::Remote
        );
    }

    #[test]
    fn empty_discord_strings_disable_remote() {
        let config = Config::from_toml_str(
            r#"
[discord]
webhook_url = ""
user_id = "  "
"#,
        )
        .unwrap();
        assert!(config.webhook_url.is_none());
        assert!(config.user_id.is_none());
    }

    #[test]
    fn level_out_of_range_rejected() {
        let err = Config::from_toml_str("[log_levels]\nfuel-low = 4\n").unwrap_err();
        assert!(matches!(
            err,
            ConfigError::InvalidValue { ref key, ref message }
                if key == "log_levels.fuel-low" && message.contains("0-3")
        ));
    }

    #[test]
    fn zero_fuel_tank_rejected() {
        let err = Config::from_toml_str("[settings]\nfuel_tank = 0\n").unwrap_err();
        assert!(matches!(
            err,
            ConfigError::InvalidValue { ref key, .. } if key == "settings.fuel_tank"
        ));
    }

    #[test]
    fn zero_poll_interval_rejected() {
        let err = Config::from_toml_str("[settings]\npoll_interval_ms = 0\n").unwrap_err();
        assert!(matches!(
            err,
            ConfigError::InvalidValue { ref key, .. } if key == "settings.poll_interval_ms"
        ));
    }

    #[test]
    fn unknown_malformed_policy_rejected() {
        let err = Config::from_toml_str("[settings]\non_malformed = \"ignore\"\n").unwrap_err();
        assert!(matches!(err, ConfigError::Toml(_)));
    }

    #[test]
    fn unknown_level_keys_are_reported() {
        let config = Config::from_toml_str("[log_levels]\nScanEasy = 1\nfuel-low = 1\n").unwrap();
        assert_eq!(config.verbosity.unknown_keys(), ["ScanEasy".to_string()]);
        assert_eq!(config.verbosity.level(EventKey::FuelLow), LogLevel::Terminal);
    }

    #[test]
    fn resolve_reports_defaults() {
        let policy =
            VerbosityPolicy::default().with_level(EventKey::ShipDestroyed, LogLevel::Terminal);

        assert_eq!(
            policy.resolve(EventKey::ShipDestroyed),
            ResolvedLevel {
                level: LogLevel::Terminal,
                was_default: false,
            }
        );
        assert_eq!(
            policy.resolve(EventKey::FuelCritical),
            ResolvedLevel {
                level: LogLevel::Mention,
                was_default: true,
            }
        );
        assert!(!policy.defaulted_keys().contains(&EventKey::ShipDestroyed));
        assert_eq!(policy.defaulted_keys().len(), EventKey::ALL.len() - 1);
    }

    #[test]
    #[serial]
    fn missing_file_uses_defaults() {
        with_clean_env(|| {
            let config = Config::load(Path::new("/nonexistent/afk-monitor/config.toml"))
                .expect("missing file should fall back to defaults");
            assert_eq!(config.fuel_tank, DEFAULT_FUEL_TANK);
        });
    }

    #[test]
    #[serial]
    fn load_reads_file() {
        with_clean_env(|| {
            let dir = tempfile::tempdir().unwrap();
            let path = dir.path().join("config.toml");
            fs::write(&path, "[settings]\nfuel_tank = 128\n").unwrap();

            let config = Config::load(&path).unwrap();
            assert_eq!(config.fuel_tank, 128.0);
        });
    }

    #[test]
    #[serial]
    fn env_overrides_file() {
        with_clean_env(|| {
            env::set_var("AFK_MONITOR_JOURNAL_DIR", "/env/journals");
            env::set_var("AFK_MONITOR_WEBHOOK_URL", "https://env.example.com/hook");
            env::set_var("AFK_MONITOR_USER_ID", "99");
            env::set_var("AFK_MONITOR_USE_UTC", "true");
            env::set_var("AFK_MONITOR_FUEL_TANK", "16");

            let mut config = Config::from_toml_str(
                "[settings]\njournal_folder = \"/file\"\nfuel_tank = 64\n",
            )
            .unwrap();
            config.apply_env().unwrap();

            assert_eq!(config.journal_folder, Some(PathBuf::from("/env/journals")));
            assert_eq!(
                config.webhook_url.as_deref(),
                Some("https://env.example.com/hook")
            );
            assert_eq!(config.user_id.as_deref(), Some("99"));
            assert_eq!(config.time_mode, TimeMode::Utc);
            assert_eq!(config.fuel_tank, 16.0);
        });
    }

    #[test]
    #[serial]
    fn invalid_env_fuel_tank() {
        with_clean_env(|| {
            env::set_var("AFK_MONITOR_FUEL_TANK", "lots");

            let mut config = Config::default();
            let err = config.apply_env().unwrap_err();
            assert!(matches!(
                err,
                ConfigError::InvalidValue { ref key, .. } if key == "AFK_MONITOR_FUEL_TANK"
            ));
        });
    }

    #[test]
    #[serial]
    fn invalid_env_use_utc() {
        with_clean_env(|| {
            env::set_var("AFK_MONITOR_USE_UTC", "sometimes");

            let mut config = Config::default();
            assert!(config.apply_env().is_err());
        });
    }

    #[test]
    fn cli_overrides() {
        let mut config = Config::default();
        config.apply_cli(
            Some(PathBuf::from("/cli")),
            Some(PathBuf::from("/cli/Journal.log")),
            true,
        );
        assert_eq!(config.journal_folder, Some(PathBuf::from("/cli")));
        assert_eq!(config.journal_file, Some(PathBuf::from("/cli/Journal.log")));
        assert_eq!(config.time_mode, TimeMode::Utc);

        // Absent flags keep existing values.
        config.apply_cli(None, None, false);
        assert_eq!(config.journal_folder, Some(PathBuf::from("/cli")));
        assert_eq!(config.time_mode, TimeMode::Utc);
    }

    #[test]
    fn journal_dir_prefers_override() {
        let mut config = Config::default();
        config.journal_folder = Some(PathBuf::from("/override"));
        assert_eq!(config.journal_dir().unwrap(), PathBuf::from("/override"));
    }

    #[test]
    fn default_journal_dir_is_under_home() {
        let config = Config::default();
        if let Ok(dir) = config.journal_dir() {
            assert!(dir.ends_with("Saved Games/Frontier Developments/Elite Dangerous"));
        }
    }
}
