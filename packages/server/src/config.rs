//! Server configuration, loaded from an optional TOML file.
//!
//! ```toml
//! [server]
//! host = "127.0.0.1"
//! port = 8080
//!
//! [session]
//! secret = "change-me"
//! ttl_hours = 168
//!
//! [rate_limit.websocket]
//! per_minute = 20
//! burst = 3
//!
//! [[seed.users]]
//! id = 1
//! name = "alice"
//! password = "alice-pw"
//!
//! [[seed.conversations]]
//! id = 1
//! title = "general"
//! members = [1]
//! admins = [1]
//! ```

use std::{fs, path::Path, time::Duration};

use serde::Deserialize;
use thiserror::Error;

use crate::{
    domain::{ConversationId, UserId},
    infrastructure::rate_limit::{RateQuota, VaryBy},
};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file '{path}': {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config file '{path}': {source}")]
    Parse {
        path: String,
        #[source]
        source: toml::de::Error,
    },
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub session: SessionConfig,
    pub rate_limit: RateLimitConfig,
    pub seed: SeedConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// HS256 signing secret. A random one is generated when absent.
    pub secret: Option<String>,
    pub ttl_hours: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            secret: None,
            ttl_hours: 7 * 24,
        }
    }
}

impl SessionConfig {
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_hours * 60 * 60)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LimitConfig {
    pub per_minute: u32,
    pub burst: u32,
    pub vary_by: VaryBy,
}

impl LimitConfig {
    pub fn quota(&self) -> RateQuota {
        RateQuota {
            per_minute: self.per_minute,
            burst: self.burst,
        }
    }
}

impl Default for LimitConfig {
    fn default() -> Self {
        Self {
            per_minute: 20,
            burst: 3,
            vary_by: VaryBy::default(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RateLimitConfig {
    pub websocket: LimitConfig,
    pub http: LimitConfig,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            websocket: LimitConfig::default(),
            http: LimitConfig {
                per_minute: 60,
                burst: 10,
                vary_by: VaryBy::default(),
            },
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SeedConfig {
    pub users: Vec<SeedUser>,
    pub conversations: Vec<SeedConversation>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SeedUser {
    pub id: UserId,
    pub name: String,
    pub password: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SeedConversation {
    pub id: ConversationId,
    pub title: String,
    #[serde(default)]
    pub members: Vec<UserId>,
    #[serde(default)]
    pub admins: Vec<UserId>,
}

impl Config {
    /// Loads the file at `path`, or the defaults when no path is given.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let config = match path {
            Some(path) => {
                let display = path.display().to_string();
                let text = fs::read_to_string(path).map_err(|source| ConfigError::Read {
                    path: display.clone(),
                    source,
                })?;
                Self::parse(&text).map_err(|source| ConfigError::Parse {
                    path: display,
                    source,
                })?
            }
            None => Self::default(),
        };
        config.validate()?;
        Ok(config)
    }

    pub fn parse(text: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(text)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        for (name, limit) in [
            ("websocket", &self.rate_limit.websocket),
            ("http", &self.rate_limit.http),
        ] {
            if limit.per_minute == 0 || limit.burst == 0 {
                return Err(ConfigError::Invalid(format!(
                    "rate_limit.{} needs a non-zero per_minute and burst",
                    name
                )));
            }
        }
        if self.session.ttl_hours == 0 {
            return Err(ConfigError::Invalid("session.ttl_hours must be > 0".into()));
        }
        for conversation in &self.seed.conversations {
            let unknown = conversation
                .members
                .iter()
                .chain(&conversation.admins)
                .find(|id| !self.seed.users.iter().any(|u| u.id == **id));
            if let Some(id) = unknown {
                return Err(ConfigError::Invalid(format!(
                    "conversation {} references unknown user {}",
                    conversation.id, id
                )));
            }
        }
        Ok(())
    }
}
