//! Configuration module for rustsignal.
//!
//! Structured configuration loading from environment variables, organized by
//! concern: Provider, Signal, Universe, and Observability. Every sub-config
//! reads through a lookup function, so tests can feed values without touching
//! the process environment.

mod observability_config;
mod provider_config;
mod signal_config;
mod universe_config;

pub use observability_config::{LogFormat, ObservabilityEnvConfig};
pub use provider_config::{AlpacaConfig, PolygonConfig, ProviderEnvConfig, ProviderKind};
pub use signal_config::SignalEnvConfig;
pub use universe_config::UniverseEnvConfig;

use anyhow::{Result, anyhow};
use std::collections::HashMap;
use std::env;
use std::fmt::Display;
use std::str::FromStr;

/// Variable lookup; `None` means unset.
pub type Lookup<'a> = &'a dyn Fn(&str) -> Option<String>;

/// Reads the process environment, treating blank values as unset.
pub fn env_lookup(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}

/// Lookup over a fixed map, for tests and embedding.
pub fn map_lookup(vars: HashMap<String, String>) -> impl Fn(&str) -> Option<String> {
    move |key| vars.get(key).cloned()
}

pub(crate) fn parse_var<T>(lookup: Lookup, key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: Display,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map_err(|e| anyhow!("Failed to parse {}='{}': {}", key, raw, e)),
        None => Ok(default),
    }
}

pub(crate) fn string_var(lookup: Lookup, key: &str, default: &str) -> String {
    lookup(key).unwrap_or_else(|| default.to_string())
}

/// Main application configuration.
#[derive(Debug, Clone)]
pub struct Config {
    pub provider: ProviderEnvConfig,
    pub signal: SignalEnvConfig,
    pub universe: UniverseEnvConfig,
    pub observability: ObservabilityEnvConfig,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(&env_lookup)
    }

    pub fn from_lookup(lookup: Lookup) -> Result<Self> {
        Ok(Self {
            provider: ProviderEnvConfig::from_lookup(lookup)?,
            signal: SignalEnvConfig::from_lookup(lookup)?,
            universe: UniverseEnvConfig::from_lookup(lookup)?,
            observability: ObservabilityEnvConfig::from_lookup(lookup)?,
        })
    }
}
