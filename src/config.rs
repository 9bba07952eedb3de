use std::env;
use std::net::{AddrParseError, SocketAddr};

use thiserror::Error;

pub const ADDR_VAR: &str = "POSTS_ADDR";
pub const SEED_VAR: &str = "POSTS_SEED";
pub const DEFAULT_ADDR: &str = "0.0.0.0:5002";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {var} `{value}`: {source}")]
    InvalidAddr {
        var: &'static str,
        value: String,
        source: AddrParseError,
    },
}

#[derive(Clone, Debug, PartialEq)]
pub struct Config {
    pub addr: SocketAddr,
    /// Start with the sample posts instead of an empty collection.
    pub seed: bool,
}

impl Default for Config {
    fn default() -> Config {
        Config {
            addr: SocketAddr::from(([0, 0, 0, 0], 5002)),
            seed: true,
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Config, ConfigError> {
        Config::from_vars(|key| env::var(key).ok())
    }

    pub fn from_vars<F>(lookup: F) -> Result<Config, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Config::default();

        if let Some(value) = lookup(ADDR_VAR) {
            config.addr = value.trim().parse().map_err(|source| ConfigError::InvalidAddr {
                var: ADDR_VAR,
                value: value.clone(),
                source,
            })?;
        }
        if let Some(value) = lookup(SEED_VAR) {
            config.seed = !matches!(
                value.trim().to_ascii_lowercase().as_str(),
                "0" | "false" | "no" | "off"
            );
        }

        Ok(config)
    }
}
