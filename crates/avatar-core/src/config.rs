//! Configuration loading and typed config structures for the relay.
//!
//! Configuration comes from an optional YAML file (`avatar-relay.yaml` in
//! the working directory, or the path in `AVATAR_RELAY_CONFIG`). Every
//! field has a default, so the file may be absent or partial. Environment
//! variables are applied on top of the file:
//!
//! | Variable | Field |
//! |----------|-------|
//! | `SERVER_ADDRESS` | `server.address` |
//! | `SERVER_PORT` | `server.port` |
//! | `NATS_URL` | `bus.url` |
//! | `EMOTION_TOPIC` | `bus.emotion_topic` |
//! | `ANIMATION_TOPIC` | `bus.animation_topic` |
//! | `AUDIO_TOPIC` | `bus.audio_topic` |
//! | `RELOAD_TOPIC` | `bus.reload_topic` |
//! | `BUS_REPUBLISH` | `bus.republish` |
//! | `ACTIVITY_TIMEOUT_SECS` | `avatar.activity_timeout_secs` |
//! | `LOG_LEVEL` | `logging.level` |

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

/// Default config file name, relative to the working directory.
pub const DEFAULT_CONFIG_FILE: &str = "avatar-relay.yaml";

/// Environment variable naming an alternative config file.
pub const CONFIG_PATH_ENV: &str = "AVATAR_RELAY_CONFIG";

/// Errors that can occur when loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read the configuration file from disk.
    #[error("failed to read config file: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// Failed to parse YAML content.
    #[error("failed to parse config YAML: {source}")]
    Yaml {
        /// The underlying YAML parse error.
        source: serde_yml::Error,
    },

    /// An environment override could not be parsed.
    #[error("invalid value for {name}: {message}")]
    InvalidEnv {
        /// The variable name.
        name: &'static str,
        /// Why the value was rejected.
        message: String,
    },

    /// The configuration parsed but is not usable.
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

impl From<serde_yml::Error> for ConfigError {
    fn from(source: serde_yml::Error) -> Self {
        Self::Yaml { source }
    }
}

/// Top-level relay configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct RelayConfig {
    /// HTTP + live-connection listener.
    #[serde(default)]
    pub server: ServerSection,

    /// Message bus connection and topics.
    #[serde(default)]
    pub bus: BusConfig,

    /// Avatar behaviour.
    #[serde(default)]
    pub avatar: AvatarConfig,

    /// Logging.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl RelayConfig {
    /// Load configuration the way the binary does: YAML file if present,
    /// then environment overrides, then validation.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] if the file is unreadable or malformed,
    /// an override is unparseable, or validation fails.
    pub fn load() -> Result<Self, ConfigError> {
        let path = std::env::var(CONFIG_PATH_ENV)
            .map_or_else(|_e| PathBuf::from(DEFAULT_CONFIG_FILE), PathBuf::from);

        let mut config = if path.exists() {
            Self::from_file(&path)?
        } else {
            Self::default()
        };
        config.apply_overrides(|name| std::env::var(name).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a YAML file at the given path.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if the file cannot be read, or
    /// [`ConfigError::Yaml`] if the content is not valid YAML.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::parse(&contents)
    }

    /// Parse configuration from a YAML string.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Yaml`] if the string is not valid YAML.
    pub fn parse(yaml: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_yml::from_str(yaml)?;
        Ok(config)
    }

    /// Apply overrides from `lookup`, which maps a variable name to its
    /// value (normally `std::env::var`).
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidEnv`] if a numeric or boolean
    /// variable does not parse.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = lookup("SERVER_ADDRESS") {
            self.server.address = v;
        }
        if let Some(v) = lookup("SERVER_PORT") {
            self.server.port = parse_env("SERVER_PORT", &v)?;
        }
        if let Some(v) = lookup("NATS_URL") {
            self.bus.url = Some(v).filter(|u| !u.is_empty());
        }
        if let Some(v) = lookup("EMOTION_TOPIC") {
            self.bus.emotion_topic = v;
        }
        if let Some(v) = lookup("ANIMATION_TOPIC") {
            self.bus.animation_topic = v;
        }
        if let Some(v) = lookup("AUDIO_TOPIC") {
            self.bus.audio_topic = v;
        }
        if let Some(v) = lookup("RELOAD_TOPIC") {
            self.bus.reload_topic = v;
        }
        if let Some(v) = lookup("BUS_REPUBLISH") {
            self.bus.republish = parse_env("BUS_REPUBLISH", &v)?;
        }
        if let Some(v) = lookup("ACTIVITY_TIMEOUT_SECS") {
            self.avatar.activity_timeout_secs = parse_env("ACTIVITY_TIMEOUT_SECS", &v)?;
        }
        if let Some(v) = lookup("LOG_LEVEL") {
            self.logging.level = v;
        }
        Ok(())
    }

    /// Reject configurations the relay cannot run with.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] for a zero activity timeout, an
    /// empty topic, or two ingress topics that collide.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.avatar.activity_timeout_secs == 0 {
            return Err(ConfigError::Invalid(
                "avatar.activity_timeout_secs must be greater than zero".to_owned(),
            ));
        }

        let topics = self.bus.ingress_topics();
        if topics.iter().any(|t| t.is_empty()) {
            return Err(ConfigError::Invalid("bus topics must not be empty".to_owned()));
        }
        for (i, topic) in topics.iter().enumerate() {
            if topics.iter().skip(i.saturating_add(1)).any(|other| other == topic) {
                return Err(ConfigError::Invalid(format!(
                    "bus topic {topic:?} is configured more than once"
                )));
            }
        }
        Ok(())
    }
}

fn parse_env<T>(name: &'static str, value: &str) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    value.trim().parse().map_err(|e: T::Err| ConfigError::InvalidEnv {
        name,
        message: format!("{value:?}: {e}"),
    })
}

/// HTTP + live-connection listener settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ServerSection {
    /// Address to bind.
    #[serde(default = "default_address")]
    pub address: String,

    /// TCP port to listen on.
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            address: default_address(),
            port: default_port(),
        }
    }
}

/// Message bus settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct BusConfig {
    /// NATS server URL. The relay runs without a bus when unset.
    #[serde(default)]
    pub url: Option<String>,

    /// Topic carrying `{"emotion": ...}` payloads.
    #[serde(default = "default_emotion_topic")]
    pub emotion_topic: String,

    /// Topic carrying `{"animation": ...}` payloads.
    #[serde(default = "default_animation_topic")]
    pub animation_topic: String,

    /// Topic carrying `{"url": ...}` payloads.
    #[serde(default = "default_audio_topic")]
    pub audio_topic: String,

    /// Topic that asks live clients to reload.
    #[serde(default = "default_reload_topic")]
    pub reload_topic: String,

    /// Whether committed changes are republished on `<topic>/state`.
    #[serde(default = "default_true")]
    pub republish: bool,
}

impl BusConfig {
    /// All topics the relay subscribes to.
    pub fn ingress_topics(&self) -> [&str; 4] {
        [
            self.emotion_topic.as_str(),
            self.animation_topic.as_str(),
            self.audio_topic.as_str(),
            self.reload_topic.as_str(),
        ]
    }

    /// Topic on which the committed value of `ingress_topic` is republished.
    pub fn state_topic(ingress_topic: &str) -> String {
        format!("{ingress_topic}/state")
    }
}

impl Default for BusConfig {
    fn default() -> Self {
        Self {
            url: None,
            emotion_topic: default_emotion_topic(),
            animation_topic: default_animation_topic(),
            audio_topic: default_audio_topic(),
            reload_topic: default_reload_topic(),
            republish: true,
        }
    }
}

/// Avatar behaviour settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct AvatarConfig {
    /// Seconds of inactivity before the avatar reverts to rest.
    #[serde(default = "default_activity_timeout_secs")]
    pub activity_timeout_secs: u64,
}

impl AvatarConfig {
    /// The inactivity timeout as a [`Duration`].
    pub const fn activity_timeout(&self) -> Duration {
        Duration::from_secs(self.activity_timeout_secs)
    }
}

impl Default for AvatarConfig {
    fn default() -> Self {
        Self {
            activity_timeout_secs: default_activity_timeout_secs(),
        }
    }
}

/// Logging settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LoggingConfig {
    /// Filter used when `RUST_LOG` is unset (e.g. `info`, `debug`).
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

// ---------------------------------------------------------------------------
// Serde default functions
// ---------------------------------------------------------------------------

fn default_address() -> String {
    String::from("127.0.0.1")
}

const fn default_port() -> u16 {
    8765
}

fn default_emotion_topic() -> String {
    String::from("avatar/emotion")
}

fn default_animation_topic() -> String {
    String::from("avatar/animation")
}

fn default_audio_topic() -> String {
    String::from("avatar/audio")
}

fn default_reload_topic() -> String {
    String::from("avatar/reload")
}

const fn default_true() -> bool {
    true
}

const fn default_activity_timeout_secs() -> u64 {
    30
}

fn default_log_level() -> String {
    String::from("info")
}
