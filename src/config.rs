use std::{env, net::SocketAddr, time::Duration};

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub bind_addr: String,
    pub bind_port: u16,
    pub socket_port: u16,
    pub dedup_ttl: Duration,
    pub dedup_sweep_interval: Duration,
    pub chunk_delay: Duration,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("BIND_PORT must be a valid u16")]
    InvalidPort,
    #[error("MCP_SOCKET_PORT must be a valid u16")]
    InvalidSocketPort,
    #[error("{0} must be a non-negative integer")]
    InvalidDuration(&'static str),
    #[error("MCP_DEDUP_SWEEP_SECS must be greater than zero")]
    InvalidSweepInterval,
    #[error("invalid bind address or port")]
    InvalidSocket,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1".to_string(),
            bind_port: 8080,
            socket_port: 8081,
            dedup_ttl: Duration::from_millis(5000),
            dedup_sweep_interval: Duration::from_secs(30),
            chunk_delay: Duration::from_millis(100),
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the config from an arbitrary key lookup; blank values fall back to defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let read = |key: &str| {
            lookup(key)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        let bind_addr = read("BIND_ADDR").unwrap_or(defaults.bind_addr);
        let bind_port = read("BIND_PORT")
            .map(|value| value.parse::<u16>().map_err(|_| ConfigError::InvalidPort))
            .transpose()?
            .unwrap_or(defaults.bind_port);
        let socket_port = read("MCP_SOCKET_PORT")
            .map(|value| {
                value
                    .parse::<u16>()
                    .map_err(|_| ConfigError::InvalidSocketPort)
            })
            .transpose()?
            .unwrap_or(defaults.socket_port);
        let dedup_ttl = read("MCP_DEDUP_TTL_MS")
            .map(|value| parse_u64(&value, "MCP_DEDUP_TTL_MS").map(Duration::from_millis))
            .transpose()?
            .unwrap_or(defaults.dedup_ttl);
        let dedup_sweep_interval = read("MCP_DEDUP_SWEEP_SECS")
            .map(|value| parse_u64(&value, "MCP_DEDUP_SWEEP_SECS").map(Duration::from_secs))
            .transpose()?
            .unwrap_or(defaults.dedup_sweep_interval);
        let chunk_delay = read("MCP_CHUNK_DELAY_MS")
            .map(|value| parse_u64(&value, "MCP_CHUNK_DELAY_MS").map(Duration::from_millis))
            .transpose()?
            .unwrap_or(defaults.chunk_delay);

        if dedup_sweep_interval.is_zero() {
            return Err(ConfigError::InvalidSweepInterval);
        }

        let config = Self {
            bind_addr,
            bind_port,
            socket_port,
            dedup_ttl,
            dedup_sweep_interval,
            chunk_delay,
        };

        let _ = config.bind_socket()?;
        Ok(config)
    }

    /// Listener for the streamable HTTP and WebSocket bindings.
    pub fn bind_socket(&self) -> Result<SocketAddr, ConfigError> {
        socket_addr(&self.bind_addr, self.bind_port)
    }

    /// Listener for the raw-socket binding.
    pub fn socket_bind(&self) -> Result<SocketAddr, ConfigError> {
        socket_addr(&self.bind_addr, self.socket_port)
    }
}

fn socket_addr(addr: &str, port: u16) -> Result<SocketAddr, ConfigError> {
    format!("{addr}:{port}")
        .parse::<SocketAddr>()
        .map_err(|_| ConfigError::InvalidSocket)
}

fn parse_u64(value: &str, key: &'static str) -> Result<u64, ConfigError> {
    value
        .parse::<u64>()
        .map_err(|_| ConfigError::InvalidDuration(key))
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn config_from(pairs: &[(&str, &str)]) -> Result<Config, ConfigError> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn parse_defaults() {
        let config = config_from(&[]).expect("config should parse");

        assert_eq!(config, Config::default());
        assert_eq!(
            config.bind_socket().expect("http socket"),
            "127.0.0.1:8080".parse::<SocketAddr>().expect("addr")
        );
        assert_eq!(
            config.socket_bind().expect("raw socket").port(),
            8081
        );
    }

    #[test]
    fn parse_overrides() {
        let config = config_from(&[
            ("BIND_ADDR", "0.0.0.0"),
            ("BIND_PORT", "9000"),
            ("MCP_SOCKET_PORT", "9001"),
            ("MCP_DEDUP_TTL_MS", "250"),
            ("MCP_DEDUP_SWEEP_SECS", "5"),
            ("MCP_CHUNK_DELAY_MS", "0"),
        ])
        .expect("config should parse");

        assert_eq!(config.bind_addr, "0.0.0.0");
        assert_eq!(config.bind_port, 9000);
        assert_eq!(config.socket_port, 9001);
        assert_eq!(config.dedup_ttl, Duration::from_millis(250));
        assert_eq!(config.dedup_sweep_interval, Duration::from_secs(5));
        assert_eq!(config.chunk_delay, Duration::ZERO);
    }

    #[test]
    fn blank_values_use_defaults() {
        let config = config_from(&[("BIND_PORT", "  ")]).expect("config should parse");
        assert_eq!(config.bind_port, 8080);
    }

    #[test]
    fn invalid_values_fail() {
        assert_eq!(
            config_from(&[("BIND_PORT", "http")]).expect_err("bad port"),
            ConfigError::InvalidPort
        );
        assert_eq!(
            config_from(&[("MCP_SOCKET_PORT", "70000")]).expect_err("bad socket port"),
            ConfigError::InvalidSocketPort
        );
        assert_eq!(
            config_from(&[("MCP_DEDUP_TTL_MS", "-1")]).expect_err("bad ttl"),
            ConfigError::InvalidDuration("MCP_DEDUP_TTL_MS")
        );
        assert_eq!(
            config_from(&[("MCP_DEDUP_SWEEP_SECS", "0")]).expect_err("zero sweep"),
            ConfigError::InvalidSweepInterval
        );
        assert_eq!(
            config_from(&[("BIND_ADDR", "not an address")]).expect_err("bad addr"),
            ConfigError::InvalidSocket
        );
    }
}
