//! Configuration Module

mod settings;

pub use settings::{
    ChannelMode, ClientConfig, ConfigError, DEFAULT_CONNECT_TIMEOUT, DEFAULT_MAX_MESSAGE_BYTES,
};
