//! Server Configuration
//!
//! Command-line flags (each with an environment variable fallback) are parsed
//! by [`Cli`] and validated into a [`ServerConfig`]. The server core only ever
//! sees a validated `ServerConfig`.

use clap::Parser;
use std::time::Duration;
use thiserror::Error;

/// Default listen address
pub const DEFAULT_ADDRESS: &str = "127.0.0.1:3223";

/// Default admission ceiling
pub const DEFAULT_MAX_CONNECTIONS: usize = 100;

/// Default maximum request line size (4 KB)
pub const DEFAULT_MAX_MESSAGE_SIZE: usize = 4 * 1024;

/// Default idle timeout (5 minutes)
pub const DEFAULT_IDLE_TIMEOUT: Duration = Duration::from_secs(5 * 60);

/// Errors produced while validating configuration.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid size '{0}': expected a positive number with an optional B, KB or MB suffix")]
    InvalidSize(String),

    #[error("invalid duration '{0}': expected a number with a ms, s, m or h suffix")]
    InvalidDuration(String),

    #[error("max connections must be at least 1")]
    ZeroMaxConnections,
}

/// Per-connection limits applied by every connection handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConnectionLimits {
    /// Longest accepted request line in bytes, excluding the newline
    pub max_message_size: usize,

    /// How long a connection may wait for its next line; `None` disables the timeout
    pub idle_timeout: Option<Duration>,
}

impl Default for ConnectionLimits {
    fn default() -> Self {
        Self {
            max_message_size: DEFAULT_MAX_MESSAGE_SIZE,
            idle_timeout: Some(DEFAULT_IDLE_TIMEOUT),
        }
    }
}

/// Validated configuration consumed by [`crate::server::Server`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    /// Address to bind the listening socket to
    pub address: String,

    /// Maximum number of simultaneously admitted connections
    pub max_connections: usize,

    /// Limits applied to each admitted connection
    pub limits: ConnectionLimits,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            address: DEFAULT_ADDRESS.to_string(),
            max_connections: DEFAULT_MAX_CONNECTIONS,
            limits: ConnectionLimits::default(),
        }
    }
}

impl ServerConfig {
    /// Checks invariants the server relies on.
    pub fn validate(self) -> Result<Self, ConfigError> {
        if self.max_connections == 0 {
            return Err(ConfigError::ZeroMaxConnections);
        }
        if self.limits.max_message_size == 0 {
            return Err(ConfigError::InvalidSize("0".to_string()));
        }
        Ok(self)
    }
}

/// linekv - An in-memory key-value database over a line-oriented TCP protocol
#[derive(Parser, Debug)]
#[command(name = "linekv", version, about)]
pub struct Cli {
    /// Address to listen on
    #[arg(short, long, env = "LINEKV_ADDRESS", default_value = DEFAULT_ADDRESS)]
    pub address: String,

    /// Maximum number of concurrent client connections
    #[arg(short = 'c', long, env = "LINEKV_MAX_CONNECTIONS", default_value_t = DEFAULT_MAX_CONNECTIONS)]
    pub max_connections: usize,

    /// Maximum request line size (e.g. 512B, 4KB, 1MB)
    #[arg(long, env = "LINEKV_MAX_MESSAGE_SIZE", default_value = "4KB", value_parser = parse_size)]
    pub max_message_size: usize,

    /// Close connections idle for this long (e.g. 30s, 5m); 0 disables
    #[arg(long, env = "LINEKV_IDLE_TIMEOUT", default_value = "5m", value_parser = parse_idle_timeout)]
    pub idle_timeout: IdleTimeout,

    /// Log filter directive (e.g. info, debug, linekv=trace)
    #[arg(long, env = "LINEKV_LOG_LEVEL", default_value = "info")]
    pub log_level: String,
}

/// Parsed `--idle-timeout` value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IdleTimeout(pub Option<Duration>);

impl Cli {
    /// Builds and validates the server configuration.
    pub fn server_config(&self) -> Result<ServerConfig, ConfigError> {
        ServerConfig {
            address: self.address.clone(),
            max_connections: self.max_connections,
            limits: ConnectionLimits {
                max_message_size: self.max_message_size,
                idle_timeout: self.idle_timeout.0,
            },
        }
        .validate()
    }
}

/// Parses a byte size such as `512`, `512B`, `4KB` or `1MB`.
pub fn parse_size(input: &str) -> Result<usize, ConfigError> {
    let invalid = || ConfigError::InvalidSize(input.to_string());

    let trimmed = input.trim();
    let split = trimmed
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(trimmed.len());
    let (digits, unit) = trimmed.split_at(split);

    let number: usize = digits.parse().map_err(|_| invalid())?;
    let multiplier = match unit.trim().to_ascii_uppercase().as_str() {
        "" | "B" => 1,
        "KB" => 1024,
        "MB" => 1024 * 1024,
        _ => return Err(invalid()),
    };

    match number.checked_mul(multiplier) {
        Some(0) | None => Err(invalid()),
        Some(size) => Ok(size),
    }
}

/// Parses a duration such as `250ms`, `30s`, `5m` or `1h`.
pub fn parse_duration(input: &str) -> Result<Duration, ConfigError> {
    let invalid = || ConfigError::InvalidDuration(input.to_string());

    let trimmed = input.trim();
    if trimmed == "0" {
        return Ok(Duration::ZERO);
    }

    let split = trimmed
        .find(|c: char| !c.is_ascii_digit())
        .ok_or_else(invalid)?;
    let (digits, unit) = trimmed.split_at(split);
    let number: u64 = digits.parse().map_err(|_| invalid())?;

    let duration = match unit {
        "ms" => Duration::from_millis(number),
        "s" => Duration::from_secs(number),
        "m" => Duration::from_secs(number.checked_mul(60).ok_or_else(invalid)?),
        "h" => Duration::from_secs(number.checked_mul(3600).ok_or_else(invalid)?),
        _ => return Err(invalid()),
    };

    Ok(duration)
}

/// Parses an idle timeout; a zero duration disables it.
pub fn parse_idle_timeout(input: &str) -> Result<IdleTimeout, ConfigError> {
    let duration = parse_duration(input)?;
    Ok(IdleTimeout((!duration.is_zero()).then_some(duration)))
}
