//! # Configuration Management
//!
//! Policy knobs for command dispatch and logout teardown live in
//! [`SessionConfig`]; log output is configured by [`LoggingConfig`].
//!
//! ## Configuration Sources
//! - TOML via `from_file()` / `from_toml()`; missing tables fall back to defaults
//! - Environment overrides via `from_env()` (`REALM_SESSION_*`)
//! - Programmatic tweaks via `default_with_overrides()`
//!
//! Durations are written as integer milliseconds.
//!
//! ```toml
//! [session]
//! kick_on_malformed_command = true
//! logout_delay = 20000
//!
//! [logging]
//! app_name = "realm-7"
//! log_level = "debug"
//! log_to_console = true
//! log_to_file = false
//! json_format = true
//! ```

use crate::error::{Result, SessionError};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;
use tracing::Level;

const ENV_PREFIX: &str = "REALM_SESSION_";

const MAX_POLL_INTERVAL: Duration = Duration::from_secs(1);
const MAX_LOGOUT_DELAY: Duration = Duration::from_secs(300);
const MAX_APP_NAME_LEN: usize = 64;

fn config_error(what: &str, e: impl std::fmt::Display) -> SessionError {
    SessionError::ConfigError(format!("{what}: {e}"))
}

/// Read `REALM_SESSION_<key>`; unset or unparsable values are ignored.
fn env_override<T: FromStr>(key: &str) -> Option<T> {
    std::env::var(format!("{ENV_PREFIX}{key}"))
        .ok()
        .and_then(|raw| raw.trim().parse().ok())
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct EngineConfig {
    #[serde(default)]
    pub session: SessionConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

impl EngineConfig {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)
            .map_err(|e| config_error(&format!("Cannot read {}", path.display()), e))?;
        Self::from_toml(&contents)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| config_error("Invalid TOML", e))
    }

    /// Defaults with any `REALM_SESSION_*` variables applied on top.
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();
        let session = &mut config.session;

        if let Some(kick) = env_override("KICK_ON_MALFORMED") {
            session.kick_on_malformed_command = kick;
        }
        if let Some(ms) = env_override("LOGOUT_DELAY_MS") {
            session.logout_delay = Duration::from_millis(ms);
        }
        if let Some(ms) = env_override("LOGOUT_GRACE_MS") {
            session.recently_logged_out_grace = Duration::from_millis(ms);
        }
        if let Some(limit) = env_override("RELOCATION_POLL_LIMIT") {
            session.relocation_poll_limit = limit;
        }
        if let Some(level) = env_override::<Level>("LOG_LEVEL") {
            config.logging.log_level = level;
        }

        Ok(config)
    }

    pub fn default_with_overrides<F>(mutator: F) -> Self
    where
        F: FnOnce(&mut Self),
    {
        let mut config = Self::default();
        mutator(&mut config);
        config
    }

    /// The default configuration rendered as TOML, for seeding a config file.
    pub fn example_config() -> String {
        let body = toml::to_string_pretty(&Self::default()).unwrap_or_default();
        format!("# realm-session configuration (durations in milliseconds)\n\n{body}")
    }

    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = toml::to_string_pretty(self).map_err(|e| config_error("Cannot encode", e))?;
        std::fs::write(path, content).map_err(|e| config_error("Cannot write config", e))
    }

    /// Every problem found, empty when the configuration is usable.
    pub fn validate(&self) -> Vec<String> {
        self.session
            .validate()
            .into_iter()
            .chain(self.logging.validate())
            .collect()
    }

    pub fn validate_strict(&self) -> Result<()> {
        let problems = self.validate();
        if problems.is_empty() {
            return Ok(());
        }
        Err(SessionError::ConfigError(format!(
            "{} invalid setting(s): {}",
            problems.len(),
            problems.join("; ")
        )))
    }
}

/// Session policy
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Close the connection when a command payload is truncated or oversized
    pub kick_on_malformed_command: bool,

    /// How long world-scoped commands are tolerated after a logout
    #[serde(with = "millis")]
    pub recently_logged_out_grace: Duration,

    /// Delay between a non-instant logout request and the teardown
    #[serde(with = "millis")]
    pub logout_delay: Duration,

    /// Sleep between polls while waiting for a relocation to settle
    #[serde(with = "millis")]
    pub relocation_poll_interval: Duration,

    /// Maximum polls per relocation wait
    pub relocation_poll_limit: u32,

    /// Log payload bytes a handler left unread
    pub log_unprocessed_tail: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            kick_on_malformed_command: false,
            recently_logged_out_grace: Duration::from_secs(30),
            logout_delay: Duration::from_secs(20),
            relocation_poll_interval: Duration::from_millis(5),
            relocation_poll_limit: 200,
            log_unprocessed_tail: true,
        }
    }
}

impl SessionConfig {
    pub fn validate(&self) -> Vec<String> {
        let mut problems: Vec<String> = Vec::new();

        if self.relocation_poll_limit == 0 {
            problems.push("session.relocation_poll_limit is 0; relocation waits would never poll".into());
        }
        if self.relocation_poll_interval > MAX_POLL_INTERVAL {
            problems.push(format!(
                "session.relocation_poll_interval is {:?}, above {:?}",
                self.relocation_poll_interval, MAX_POLL_INTERVAL
            ));
        }
        if self.logout_delay > MAX_LOGOUT_DELAY {
            problems.push(format!(
                "session.logout_delay is {:?}, above {:?}",
                self.logout_delay, MAX_LOGOUT_DELAY
            ));
        }
        if self.recently_logged_out_grace.is_zero() {
            problems.push("session.recently_logged_out_grace is 0".into());
        }

        problems
    }
}

/// Log output
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Reported as the `app` field of the startup event
    pub app_name: String,

    #[serde(with = "level_name")]
    pub log_level: Level,

    pub log_to_console: bool,

    pub log_to_file: bool,

    /// Required when `log_to_file` is set
    pub log_file_path: Option<String>,

    pub json_format: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            app_name: String::from("realm-session"),
            log_level: Level::INFO,
            log_to_console: true,
            log_to_file: false,
            log_file_path: None,
            json_format: false,
        }
    }
}

impl LoggingConfig {
    pub fn validate(&self) -> Vec<String> {
        let mut problems: Vec<String> = Vec::new();

        match self.app_name.len() {
            0 => problems.push("logging.app_name is empty".into()),
            n if n > MAX_APP_NAME_LEN => problems.push(format!(
                "logging.app_name is {n} characters, above {MAX_APP_NAME_LEN}"
            )),
            _ => {}
        }

        match (&self.log_file_path, self.log_to_file) {
            (None, true) => problems.push("logging.log_to_file is set without log_file_path".into()),
            (Some(path), true) => {
                let dir = Path::new(path).parent().filter(|d| !d.as_os_str().is_empty());
                if let Some(dir) = dir.filter(|d| !d.is_dir()) {
                    problems.push(format!("logging directory {} is missing", dir.display()));
                }
            }
            _ => {}
        }

        if !(self.log_to_console || self.log_to_file) {
            problems.push("logging has no output; enable console or file".into());
        }

        problems
    }
}

mod millis {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(u64::try_from(value.as_millis()).unwrap_or(u64::MAX))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}

/// `tracing::Level` as its lowercase name.
mod level_name {
    use serde::{de::Error, Deserialize, Deserializer, Serializer};
    use tracing::Level;

    pub fn serialize<S: Serializer>(level: &Level, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&level.as_str().to_ascii_lowercase())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Level, D::Error> {
        let name = String::deserialize(deserializer)?;
        name.parse()
            .map_err(|_| D::Error::custom(format!("unknown log level `{name}`")))
    }
}
