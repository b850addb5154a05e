//! Configuration module for environment variable parsing.
//!
//! Every setting has a default, so the receiver starts with no environment
//! at all.

use std::env;
use std::str::FromStr;

use tracing::warn;

use crate::model::HashConfig;

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Port for the web server to listen on
    pub port: u16,

    /// Argon2id cost used when hashing webhook passwords and tokens
    pub hash: HashConfig,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            port: 8080,
            hash: HashConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        let defaults = Config::default();

        Config {
            port: parse_or("PORT", defaults.port),

            hash: HashConfig {
                memory_cost: parse_or("HASH_MEMORY_COST_KIB", defaults.hash.memory_cost),
                time_cost: parse_or("HASH_TIME_COST", defaults.hash.time_cost),
                parallelism: parse_or("HASH_PARALLELISM", defaults.hash.parallelism),
            },
        }
    }
}

/// Parse an environment variable, falling back to `default` when it is unset
/// or invalid.
fn parse_or<T>(name: &str, default: T) -> T
where
    T: FromStr + Copy,
{
    let raw = match env::var(name) {
        Ok(v) => v,
        Err(_) => return default,
    };

    match raw.trim().parse() {
        Ok(value) => value,
        Err(_) => {
            warn!(env_var = name, value = %raw, "Invalid value, using default");
            default
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_or_valid() {
        env::set_var("TEST_PARSE_OR_VALID", " 9090 ");
        assert_eq!(parse_or("TEST_PARSE_OR_VALID", 1u16), 9090);
        env::remove_var("TEST_PARSE_OR_VALID");
    }

    #[test]
    fn test_parse_or_invalid() {
        env::set_var("TEST_PARSE_OR_INVALID", "not-a-port");
        assert_eq!(parse_or("TEST_PARSE_OR_INVALID", 8080u16), 8080);
        env::remove_var("TEST_PARSE_OR_INVALID");
    }

    #[test]
    fn test_parse_or_default() {
        assert_eq!(parse_or("NONEXISTENT_VAR", 42u32), 42);
    }

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.port, 8080);
        assert_eq!(config.hash, HashConfig::default());
    }
}
