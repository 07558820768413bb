//! Observability configuration parsing from environment variables.
//!
//! This module handles the log layer style. Verbosity itself is driven by
//! `RUST_LOG` through the subscriber's `EnvFilter`.

use super::{Lookup, env_lookup, string_var};
use anyhow::{Result, bail};
use std::str::FromStr;

/// Style of the `fmt` layer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Pretty,
    Compact,
}

impl FromStr for LogFormat {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "pretty" => Ok(LogFormat::Pretty),
            "compact" => Ok(LogFormat::Compact),
            _ => bail!("Invalid LOG_FORMAT: {}. Must be 'pretty' or 'compact'", s),
        }
    }
}

/// Observability environment configuration
#[derive(Debug, Clone, Default)]
pub struct ObservabilityEnvConfig {
    pub log_format: LogFormat,
}

impl ObservabilityEnvConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(&env_lookup)
    }

    pub fn from_lookup(lookup: Lookup) -> Result<Self> {
        Ok(Self {
            log_format: LogFormat::from_str(&string_var(lookup, "LOG_FORMAT", "pretty"))?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_observability_config_defaults() {
        let config = ObservabilityEnvConfig::from_lookup(&|_| None).unwrap();
        assert_eq!(config.log_format, LogFormat::Pretty);
    }

    #[test]
    fn test_log_format_parsing() {
        let compact = |key: &str| (key == "LOG_FORMAT").then(|| "Compact".to_string());
        let config = ObservabilityEnvConfig::from_lookup(&compact).unwrap();
        assert_eq!(config.log_format, LogFormat::Compact);
        assert!("json".parse::<LogFormat>().is_err());
    }
}
