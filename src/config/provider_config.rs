//! Market-data provider configuration parsing from environment variables.
//!
//! This module handles loading provider selection, credentials, transport
//! settings and the fetch strategy:
//! - Alpaca (multi-symbol bars)
//! - Polygon (per-symbol aggregates)
//! - Mock (synthetic data)

use super::{Lookup, env_lookup, parse_var, string_var};
use crate::application::fetcher::retry::{Backoff, RetryPolicy};
use crate::application::fetcher::{FetcherSettings, StrategyKind};
use crate::infrastructure::alpaca::common::{DEFAULT_DATA_URL, DEFAULT_FEED};
use crate::infrastructure::core::http_client_factory::{DEFAULT_USER_AGENT, HttpClientSettings};
use crate::infrastructure::polygon::common::DEFAULT_BASE_URL;
use anyhow::{Result, bail};
use std::str::FromStr;
use std::time::Duration;
use tracing::warn;

/// Which market-data provider backs the fetcher
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderKind {
    Mock,
    Alpaca,
    Polygon,
}

impl FromStr for ProviderKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "mock" => Ok(ProviderKind::Mock),
            "alpaca" => Ok(ProviderKind::Alpaca),
            "polygon" => Ok(ProviderKind::Polygon),
            _ => bail!(
                "Invalid PROVIDER: {}. Must be 'mock', 'alpaca', or 'polygon'",
                s
            ),
        }
    }
}

impl ProviderKind {
    /// Fetch layout used when `FETCH_STRATEGY` is unset
    pub fn default_strategy(&self) -> StrategyKind {
        match self {
            ProviderKind::Polygon => StrategyKind::PerSymbol,
            ProviderKind::Alpaca | ProviderKind::Mock => StrategyKind::Chunked,
        }
    }
}

/// Alpaca API configuration
#[derive(Debug, Clone, Default)]
pub struct AlpacaConfig {
    pub api_key: String,
    pub secret_key: String,
    pub data_url: String,
    pub feed: String,
}

impl AlpacaConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(&env_lookup)
    }

    pub fn from_lookup(lookup: Lookup) -> Self {
        Self {
            api_key: string_var(lookup, "ALPACA_API_KEY", ""),
            secret_key: string_var(lookup, "ALPACA_SECRET_KEY", ""),
            data_url: string_var(lookup, "ALPACA_DATA_URL", DEFAULT_DATA_URL),
            feed: string_var(lookup, "ALPACA_FEED", DEFAULT_FEED),
        }
    }
}

/// Polygon API configuration
#[derive(Debug, Clone, Default)]
pub struct PolygonConfig {
    pub api_key: String,
    pub base_url: String,
}

impl PolygonConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(&env_lookup)
    }

    pub fn from_lookup(lookup: Lookup) -> Self {
        Self {
            api_key: string_var(lookup, "POLYGON_API_KEY", ""),
            base_url: string_var(lookup, "POLYGON_BASE_URL", DEFAULT_BASE_URL),
        }
    }
}

/// Aggregated provider configuration
#[derive(Debug, Clone)]
pub struct ProviderEnvConfig {
    pub kind: ProviderKind,
    pub alpaca: AlpacaConfig,
    pub polygon: PolygonConfig,
    pub http: HttpClientSettings,
    pub fetch: FetcherSettings,
}

impl ProviderEnvConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(&env_lookup)
    }

    pub fn from_lookup(lookup: Lookup) -> Result<Self> {
        let kind = ProviderKind::from_str(&string_var(lookup, "PROVIDER", "mock"))?;

        let strategy_kind = match lookup("FETCH_STRATEGY") {
            Some(raw) => StrategyKind::from_str(&raw)?,
            None => kind.default_strategy(),
        };
        let chunk_size = parse_var(lookup, "FETCH_CHUNK_SIZE", 15usize)?;
        let max_concurrency = parse_var(lookup, "FETCH_MAX_CONCURRENCY", 10usize)?;
        if chunk_size == 0 || max_concurrency == 0 {
            bail!("FETCH_CHUNK_SIZE and FETCH_MAX_CONCURRENCY must be at least 1");
        }

        let max_attempts = parse_var(lookup, "FETCH_MAX_ATTEMPTS", 3u32)?.max(1);
        let retry_delay = Duration::from_millis(parse_var(lookup, "FETCH_RETRY_DELAY_MS", 1000u64)?);
        let backoff = match string_var(lookup, "FETCH_RETRY_BACKOFF", "fixed")
            .to_lowercase()
            .as_str()
        {
            "fixed" => Backoff::Fixed(retry_delay),
            "exponential" => Backoff::Exponential {
                base: retry_delay,
                max: Duration::from_millis(parse_var(lookup, "FETCH_RETRY_MAX_DELAY_MS", 8000u64)?),
            },
            other => bail!(
                "Invalid FETCH_RETRY_BACKOFF: {}. Must be 'fixed' or 'exponential'",
                other
            ),
        };

        let requested_ttl = parse_var(lookup, "FETCH_CACHE_TTL_SECS", 5u64)?;
        let cache_ttl_secs = requested_ttl.clamp(5, 10);
        if cache_ttl_secs != requested_ttl {
            warn!(
                "Config: FETCH_CACHE_TTL_SECS={} outside 5-10, using {}",
                requested_ttl, cache_ttl_secs
            );
        }

        let http = HttpClientSettings {
            user_agent: string_var(lookup, "HTTP_USER_AGENT", DEFAULT_USER_AGENT),
            timeout: Duration::from_secs(parse_var(lookup, "HTTP_TIMEOUT_SECS", 15u64)?),
            ..HttpClientSettings::default()
        };

        Ok(Self {
            kind,
            alpaca: AlpacaConfig::from_lookup(lookup),
            polygon: PolygonConfig::from_lookup(lookup),
            http,
            fetch: FetcherSettings {
                strategy: strategy_kind.with_sizes(chunk_size, max_concurrency),
                retry: RetryPolicy {
                    max_attempts,
                    backoff,
                },
                chunk_pause: Duration::from_millis(parse_var(lookup, "FETCH_CHUNK_PAUSE_MS", 250u64)?),
                cache_ttl: Duration::from_secs(cache_ttl_secs),
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::fetcher::FetchStrategy;
    use crate::config::map_lookup;

    fn lookup_of(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        map_lookup(
            pairs
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        )
    }

    #[test]
    fn test_provider_defaults() {
        let config = ProviderEnvConfig::from_lookup(&|_| None).unwrap();
        assert_eq!(config.kind, ProviderKind::Mock);
        assert_eq!(config.fetch.strategy, FetchStrategy::Chunked { chunk_size: 15 });
        assert_eq!(config.fetch.retry, RetryPolicy::default());
        assert_eq!(config.fetch.chunk_pause, Duration::from_millis(250));
        assert_eq!(config.fetch.cache_ttl, Duration::from_secs(5));
        assert_eq!(config.http.timeout, Duration::from_secs(15));
        assert!(config.alpaca.data_url.contains("data.alpaca.markets"));
        assert_eq!(config.alpaca.feed, "iex");
        assert!(config.polygon.base_url.contains("polygon.io"));
    }

    #[test]
    fn test_polygon_defaults_to_per_symbol() {
        let lookup = lookup_of(&[("PROVIDER", "polygon"), ("FETCH_MAX_CONCURRENCY", "20")]);
        let config = ProviderEnvConfig::from_lookup(&lookup).unwrap();
        assert_eq!(
            config.fetch.strategy,
            FetchStrategy::PerSymbol { max_concurrency: 20 }
        );
    }

    #[test]
    fn test_explicit_strategy_and_backoff() {
        let lookup = lookup_of(&[
            ("PROVIDER", "alpaca"),
            ("FETCH_STRATEGY", "bulk"),
            ("FETCH_RETRY_BACKOFF", "exponential"),
            ("FETCH_RETRY_DELAY_MS", "200"),
            ("FETCH_RETRY_MAX_DELAY_MS", "1000"),
            ("FETCH_CACHE_TTL_SECS", "60"),
        ]);
        let config = ProviderEnvConfig::from_lookup(&lookup).unwrap();

        assert_eq!(config.fetch.strategy, FetchStrategy::Bulk);
        assert_eq!(
            config.fetch.retry.backoff,
            Backoff::Exponential {
                base: Duration::from_millis(200),
                max: Duration::from_millis(1000)
            }
        );
        assert_eq!(config.fetch.cache_ttl, Duration::from_secs(10));
    }

    #[test]
    fn test_rejects_bad_values() {
        assert!(ProviderEnvConfig::from_lookup(&lookup_of(&[("FETCH_CHUNK_SIZE", "0")])).is_err());
        assert!(
            ProviderEnvConfig::from_lookup(&lookup_of(&[("FETCH_RETRY_BACKOFF", "random")]))
                .is_err()
        );
        assert!(ProviderEnvConfig::from_lookup(&lookup_of(&[("FETCH_STRATEGY", "stream")])).is_err());
    }
}
