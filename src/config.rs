//! Environment configuration.

use std::env;
use std::time::Duration;

use chat_transport_http::HttpTransportConfig;
use thiserror::Error;

pub const BASE_URL_ENV_VAR: &str = "SPUR_CHAT_BASE_URL";
pub const TIMEOUT_ENV_VAR: &str = "SPUR_CHAT_TIMEOUT_SEC";
pub const SESSION_ID_ENV_VAR: &str = "SPUR_CHAT_SESSION_ID";
pub const LOG_ENV_VAR: &str = "SPUR_CHAT_LOG";
pub const TRANSPORT_ENV_VAR: &str = "SPUR_CHAT_TRANSPORT";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("SPUR_CHAT_TIMEOUT_SEC must be a positive number of seconds, got {value:?}")]
    InvalidTimeout { value: String },
    #[error("SPUR_CHAT_TRANSPORT must be `http` or `mock`, got {value:?}")]
    UnknownTransport { value: String },
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TransportKind {
    #[default]
    Http,
    /// Scripted offline transport.
    Mock,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnvConfig {
    pub base_url: Option<String>,
    pub timeout: Option<Duration>,
    /// Conversation to resume at startup.
    pub session_id: Option<String>,
    pub log_filter: Option<String>,
    pub transport: TransportKind,
}

impl EnvConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            base_url: env_string_opt(BASE_URL_ENV_VAR),
            timeout: env_string_opt(TIMEOUT_ENV_VAR)
                .map(|value| parse_timeout(&value))
                .transpose()?,
            session_id: env_string_opt(SESSION_ID_ENV_VAR),
            log_filter: env_string_opt(LOG_ENV_VAR),
            transport: env_string_opt(TRANSPORT_ENV_VAR)
                .map(|value| parse_transport(&value))
                .transpose()?
                .unwrap_or_default(),
        })
    }

    pub fn http_transport_config(&self) -> HttpTransportConfig {
        let mut config = HttpTransportConfig::new();

        if let Some(base_url) = &self.base_url {
            config = config.with_base_url(base_url.clone());
        }

        if let Some(timeout) = self.timeout {
            config = config.with_timeout(timeout);
        }

        config
    }
}

fn parse_timeout(value: &str) -> Result<Duration, ConfigError> {
    match value.trim().parse::<u64>() {
        Ok(seconds) if seconds > 0 => Ok(Duration::from_secs(seconds)),
        _ => Err(ConfigError::InvalidTimeout {
            value: value.to_string(),
        }),
    }
}

fn parse_transport(value: &str) -> Result<TransportKind, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "http" => Ok(TransportKind::Http),
        "mock" => Ok(TransportKind::Mock),
        _ => Err(ConfigError::UnknownTransport {
            value: value.to_string(),
        }),
    }
}

fn env_string_opt(key: &str) -> Option<String> {
    env::var(key).ok().and_then(|value| {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        }
    })
}
