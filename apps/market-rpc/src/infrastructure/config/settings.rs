//! Client Configuration Settings
//!
//! Transport target, message size limits and time zone, built directly or
//! loaded from environment variables.

use std::time::Duration;

use chrono_tz::Tz;

use crate::domain::time::DEFAULT_TIMEZONE;

/// Default cap on encoded and decoded message size (100 MiB).
pub const DEFAULT_MAX_MESSAGE_BYTES: usize = 100 * 1024 * 1024;

/// Default connection timeout.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

const ENV_ADDRESS: &str = "MARKET_RPC_ADDRESS";
const ENV_MAX_SEND: &str = "MARKET_RPC_MAX_SEND_MESSAGE_BYTES";
const ENV_MAX_RECEIVE: &str = "MARKET_RPC_MAX_RECEIVE_MESSAGE_BYTES";
const ENV_CONNECT_TIMEOUT: &str = "MARKET_RPC_CONNECT_TIMEOUT_SECS";
const ENV_TIMEZONE: &str = "MARKET_RPC_TIMEZONE";
const ENV_CHANNEL_MODE: &str = "MARKET_RPC_CHANNEL_MODE";

/// How the gRPC transport manages its channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ChannelMode {
    /// Open a fresh channel for every call and drop it afterwards.
    #[default]
    PerCall,
    /// Reuse one lazily connected channel.
    Shared,
}

impl ChannelMode {
    /// Parse `per-call` / `shared`, ignoring case and `_` vs `-`.
    #[must_use]
    pub fn from_str_case_insensitive(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().replace('_', "-").as_str() {
            "per-call" | "percall" => Some(Self::PerCall),
            "shared" => Some(Self::Shared),
            _ => None,
        }
    }

    /// Mode name.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::PerCall => "per-call",
            Self::Shared => "shared",
        }
    }
}

/// Client configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// `host:port` or a full URI.
    pub address: String,
    /// Largest request the client will encode.
    pub max_send_message_size: usize,
    /// Largest response the client will decode.
    pub max_receive_message_size: usize,
    /// Timeout for establishing a channel.
    pub connect_timeout: Duration,
    /// Zone for date-string time bounds.
    pub timezone: Tz,
    /// Channel management strategy.
    pub channel_mode: ChannelMode,
}

impl ClientConfig {
    /// Configuration with defaults for everything but the address.
    #[must_use]
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            max_send_message_size: DEFAULT_MAX_MESSAGE_BYTES,
            max_receive_message_size: DEFAULT_MAX_MESSAGE_BYTES,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            timezone: DEFAULT_TIMEZONE,
            channel_mode: ChannelMode::default(),
        }
    }

    /// Set the send limit.
    #[must_use]
    pub const fn with_max_send_message_size(mut self, bytes: usize) -> Self {
        self.max_send_message_size = bytes;
        self
    }

    /// Set the receive limit.
    #[must_use]
    pub const fn with_max_receive_message_size(mut self, bytes: usize) -> Self {
        self.max_receive_message_size = bytes;
        self
    }

    /// Set the connection timeout.
    #[must_use]
    pub const fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Set the time zone for date strings.
    #[must_use]
    pub const fn with_timezone(mut self, timezone: Tz) -> Self {
        self.timezone = timezone;
        self
    }

    /// Set the channel mode.
    #[must_use]
    pub const fn with_channel_mode(mut self, mode: ChannelMode) -> Self {
        self.channel_mode = mode;
        self
    }

    /// Endpoint URI; `http://` is assumed when the address has no scheme.
    #[must_use]
    pub fn endpoint_uri(&self) -> String {
        if self.address.contains("://") {
            self.address.clone()
        } else {
            format!("http://{}", self.address)
        }
    }

    /// Load configuration from environment variables.
    ///
    /// `MARKET_RPC_ADDRESS` is required. Unparseable sizes and timeouts fall
    /// back to their defaults; an unknown zone or channel mode is an error.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let address =
            lookup(ENV_ADDRESS).ok_or_else(|| ConfigError::MissingEnvVar(ENV_ADDRESS.to_string()))?;
        if address.trim().is_empty() {
            return Err(ConfigError::EmptyValue(ENV_ADDRESS.to_string()));
        }

        let timezone = match lookup(ENV_TIMEZONE) {
            Some(name) => name
                .trim()
                .parse::<Tz>()
                .map_err(|_| ConfigError::InvalidValue {
                    key: ENV_TIMEZONE.to_string(),
                    value: name.clone(),
                })?,
            None => DEFAULT_TIMEZONE,
        };

        let channel_mode = match lookup(ENV_CHANNEL_MODE) {
            Some(mode) => ChannelMode::from_str_case_insensitive(&mode).ok_or_else(|| {
                ConfigError::InvalidValue {
                    key: ENV_CHANNEL_MODE.to_string(),
                    value: mode.clone(),
                }
            })?,
            None => ChannelMode::default(),
        };

        Ok(Self {
            address: address.trim().to_string(),
            max_send_message_size: parse_usize(&lookup, ENV_MAX_SEND, DEFAULT_MAX_MESSAGE_BYTES),
            max_receive_message_size: parse_usize(
                &lookup,
                ENV_MAX_RECEIVE,
                DEFAULT_MAX_MESSAGE_BYTES,
            ),
            connect_timeout: parse_duration_secs(
                &lookup,
                ENV_CONNECT_TIMEOUT,
                DEFAULT_CONNECT_TIMEOUT,
            ),
            timezone,
            channel_mode,
        })
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Required environment variable is missing.
    #[error("missing required environment variable: {0}")]
    MissingEnvVar(String),
    /// Environment variable has empty value.
    #[error("environment variable {0} cannot be empty")]
    EmptyValue(String),
    /// Environment variable could not be interpreted.
    #[error("invalid value for {key}: '{value}'")]
    InvalidValue {
        /// Variable name.
        key: String,
        /// Rejected value.
        value: String,
    },
}

fn parse_usize<F>(lookup: &F, key: &str, default: usize) -> usize
where
    F: Fn(&str) -> Option<String>,
{
    lookup(key)
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

fn parse_duration_secs<F>(lookup: &F, key: &str, default: Duration) -> Duration
where
    F: Fn(&str) -> Option<String>,
{
    lookup(key)
        .and_then(|v| v.trim().parse::<u64>().ok())
        .map_or(default, Duration::from_secs)
}
