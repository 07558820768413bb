pub mod cache;
pub mod gate;
pub mod retry;

use crate::domain::errors::FetchError;
use crate::domain::market::bar::{Bar, Series};
use crate::domain::market::timeframe::Timeframe;
use crate::domain::ports::{BarMap, MarketDataProvider};
use cache::{BarCache, CacheKey};
use chrono::{DateTime, Utc};
use futures::stream::{self, StreamExt, TryStreamExt};
use gate::RequestGate;
use retry::RetryPolicy;
use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Fetch result keyed by symbol. Every requested symbol is present; symbols
/// without data map to an empty series.
pub type SeriesMap = HashMap<String, Series>;

/// How requests are laid out against the provider
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchStrategy {
    /// One request for the whole symbol set
    Bulk,
    /// One request per group of `chunk_size` symbols, paced by the chunk pause
    Chunked { chunk_size: usize },
    /// One request per symbol, at most `max_concurrency` in flight
    PerSymbol { max_concurrency: usize },
}

impl fmt::Display for FetchStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FetchStrategy::Bulk => write!(f, "bulk"),
            FetchStrategy::Chunked { chunk_size } => write!(f, "chunked({})", chunk_size),
            FetchStrategy::PerSymbol { max_concurrency } => {
                write!(f, "per-symbol({})", max_concurrency)
            }
        }
    }
}

impl FetchStrategy {
    /// Provider calls allowed in flight at once, across all resolutions.
    /// Batched requests go one at a time and are paced by the chunk pause.
    pub fn max_in_flight(&self) -> usize {
        match self {
            FetchStrategy::PerSymbol { max_concurrency } => (*max_concurrency).max(1),
            FetchStrategy::Bulk | FetchStrategy::Chunked { .. } => 1,
        }
    }
}

/// Strategy names as they appear in configuration. Sizes are filled in from
/// the other fetch settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StrategyKind {
    Bulk,
    Chunked,
    PerSymbol,
}

impl FromStr for StrategyKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> anyhow::Result<Self> {
        match s.trim().to_lowercase().replace('_', "-").as_str() {
            "bulk" => Ok(StrategyKind::Bulk),
            "chunked" => Ok(StrategyKind::Chunked),
            "per-symbol" | "persymbol" => Ok(StrategyKind::PerSymbol),
            _ => Err(anyhow::anyhow!(
                "Invalid fetch strategy: '{}'. Valid options: bulk, chunked, per-symbol",
                s
            )),
        }
    }
}

impl StrategyKind {
    pub fn with_sizes(self, chunk_size: usize, max_concurrency: usize) -> FetchStrategy {
        match self {
            StrategyKind::Bulk => FetchStrategy::Bulk,
            StrategyKind::Chunked => FetchStrategy::Chunked {
                chunk_size: chunk_size.max(1),
            },
            StrategyKind::PerSymbol => FetchStrategy::PerSymbol {
                max_concurrency: max_concurrency.max(1),
            },
        }
    }
}

#[derive(Debug, Clone)]
pub struct FetcherSettings {
    pub strategy: FetchStrategy,
    pub retry: RetryPolicy,
    /// Minimum gap between the starts of consecutive batch requests
    pub chunk_pause: Duration,
    pub cache_ttl: Duration,
}

impl Default for FetcherSettings {
    fn default() -> Self {
        Self {
            strategy: FetchStrategy::Chunked { chunk_size: 15 },
            retry: RetryPolicy::default(),
            chunk_pause: Duration::from_millis(250),
            cache_ttl: Duration::from_secs(5),
        }
    }
}

/// Acquires base-resolution bars from a provider.
///
/// Partial failure never surfaces as an error: a chunk or symbol that stays
/// empty after retries just contributes empty series. Only authentication
/// failures are returned, since nothing else in the cycle can succeed either.
pub struct BarFetcher {
    provider: Arc<dyn MarketDataProvider>,
    settings: FetcherSettings,
    cache: BarCache,
    gate: RequestGate,
}

impl BarFetcher {
    pub fn new(provider: Arc<dyn MarketDataProvider>, settings: FetcherSettings) -> Self {
        let cache = BarCache::new(settings.cache_ttl);
        let gate = RequestGate::new(settings.strategy.max_in_flight(), settings.chunk_pause);
        debug!(
            "BarFetcher: {} via {}, at most {} requests in flight",
            provider.name(),
            settings.strategy,
            gate.capacity()
        );
        Self {
            provider,
            settings,
            cache,
            gate,
        }
    }

    pub fn provider_name(&self) -> &str {
        self.provider.name()
    }

    pub async fn fetch(
        &self,
        symbols: &BTreeSet<String>,
        resolution: Timeframe,
    ) -> Result<Arc<SeriesMap>, FetchError> {
        if symbols.is_empty() {
            return Ok(Arc::new(SeriesMap::new()));
        }

        let key = CacheKey::new(symbols, resolution);
        if let Some(hit) = self.cache.get(&key) {
            debug!(
                "BarFetcher: serving {} symbols at {} from cache",
                symbols.len(),
                resolution
            );
            return Ok(hit);
        }

        let to = Utc::now();
        let from = to - resolution.history_window();
        let list: Vec<String> = symbols.iter().cloned().collect();

        let mut raw = match self.settings.strategy {
            FetchStrategy::Bulk => self.fetch_chunked(&list, list.len(), resolution, from, to).await?,
            FetchStrategy::Chunked { chunk_size } => {
                self.fetch_chunked(&list, chunk_size.max(1), resolution, from, to)
                    .await?
            }
            FetchStrategy::PerSymbol { max_concurrency } => {
                self.fetch_per_symbol(&list, max_concurrency.max(1), resolution, from, to)
                    .await?
            }
        };

        let mut result = SeriesMap::with_capacity(list.len());
        let mut missing = 0usize;
        for symbol in &list {
            let series = match raw.remove(symbol) {
                Some(bars) if !bars.is_empty() => Series::new(symbol.as_str(), resolution, bars),
                _ => {
                    missing += 1;
                    Series::empty(symbol.as_str(), resolution)
                }
            };
            result.insert(symbol.clone(), series);
        }

        info!(
            "BarFetcher: {} {} via {}: {}/{} symbols with data",
            self.provider.name(),
            resolution,
            self.settings.strategy,
            list.len() - missing,
            list.len()
        );

        let result = Arc::new(result);
        self.cache.insert(key, result.clone());
        Ok(result)
    }

    async fn fetch_chunked(
        &self,
        symbols: &[String],
        chunk_size: usize,
        resolution: Timeframe,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<BarMap, FetchError> {
        if !self.provider.supports_bulk() {
            debug!(
                "BarFetcher: {} has no multi-symbol endpoint, batches run sequentially",
                self.provider.name()
            );
        }

        let mut merged = BarMap::with_capacity(symbols.len());
        for (i, chunk) in symbols.chunks(chunk_size).enumerate() {
            let label = format!("{} batch {} ({} symbols)", resolution, i + 1, chunk.len());
            let outcome = self
                .settings
                .retry
                .run(&label, |_| async move {
                    let _permit = self.gate.admit(true).await?;
                    let bars = self
                        .provider
                        .get_bars_bulk(chunk, resolution, from, to)
                        .await?;
                    if bars.values().all(|b| b.is_empty()) {
                        return Err(FetchError::Empty {
                            what: label_symbols(chunk),
                        });
                    }
                    Ok(bars)
                })
                .await;

            match outcome {
                Ok(bars) => {
                    for (symbol, bars) in bars {
                        if chunk.contains(&symbol) {
                            merged.entry(symbol).or_default().extend(bars);
                        }
                    }
                }
                Err(e) if e.is_auth() => return Err(e),
                Err(e) => warn!("BarFetcher: {} contributes no data: {}", label, e),
            }
        }
        Ok(merged)
    }

    async fn fetch_per_symbol(
        &self,
        symbols: &[String],
        max_concurrency: usize,
        resolution: Timeframe,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<BarMap, FetchError> {
        let results: Vec<Option<(String, Vec<Bar>)>> = stream::iter(symbols.iter().cloned())
            .map(|symbol| async move {
                let label = format!("{} {}", symbol, resolution);
                let outcome = self
                    .settings
                    .retry
                    .run(&label, |_| {
                        let symbol = symbol.as_str();
                        async move {
                            let _permit = self.gate.admit(false).await?;
                            let bars = self.provider.get_bars(symbol, resolution, from, to).await?;
                            if bars.is_empty() {
                                return Err(FetchError::Empty {
                                    what: symbol.to_string(),
                                });
                            }
                            Ok(bars)
                        }
                    })
                    .await;

                match outcome {
                    Ok(bars) => Ok(Some((symbol, bars))),
                    Err(e) if e.is_auth() => Err(e),
                    Err(e) => {
                        warn!("BarFetcher: {} contributes no data: {}", label, e);
                        Ok(None)
                    }
                }
            })
            .buffer_unordered(max_concurrency)
            .try_collect()
            .await?;

        Ok(results.into_iter().flatten().collect())
    }
}

fn label_symbols(chunk: &[String]) -> String {
    match chunk {
        [one] => one.clone(),
        [first, .., last] => format!("{}..{}", first, last),
        [] => String::new(),
    }
}
