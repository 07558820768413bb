use anyhow::Result;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::info;

use crate::application::classifier::SignalClassifier;
use crate::application::fetcher::BarFetcher;
use crate::application::indicators::IndicatorEngine;
use crate::application::resampler::Resampler;
use crate::application::scanner::SignalScanner;
use crate::config::Config;
use crate::domain::errors::{ScanError, UniverseError};
use crate::domain::market::report::ScanReport;
use crate::domain::market::session::MarketClock;
use crate::domain::market::universe::{AddOutcome, SymbolUniverse};
use crate::domain::ports::MarketDataProvider;
use crate::infrastructure::ProviderFactory;

/// Wired pipeline plus the live symbol universe.
///
/// The universe may be edited between cycles; each cycle scans a snapshot
/// taken when it starts.
pub struct Application {
    pub config: Config,
    pub scanner: SignalScanner,
    pub universe: Arc<RwLock<SymbolUniverse>>,
}

impl Application {
    pub async fn build(config: Config) -> Result<Self> {
        info!(
            "Building rustsignal Application (Provider: {:?})...",
            config.provider.kind
        );
        let provider = ProviderFactory::create(&config.provider);
        let universe = config.universe.load_universe()?;
        Ok(Self::with_provider(config, provider, universe))
    }

    /// Wires the pipeline around an already-built provider.
    pub fn with_provider(
        config: Config,
        provider: Arc<dyn MarketDataProvider>,
        universe: SymbolUniverse,
    ) -> Self {
        let fetcher = BarFetcher::new(provider, config.provider.fetch.clone());
        let clock = MarketClock::new(config.signal.market_timezone);
        let resampler = Resampler::new(clock, config.signal.resample_offset_minutes)
            .with_regular_hours_only(config.signal.regular_hours_only);
        let scanner = SignalScanner::new(
            fetcher,
            resampler,
            IndicatorEngine::default(),
            SignalClassifier::new(config.signal.classifier),
        )
        .with_debug_target(config.signal.debug_target.clone());

        info!(
            "Application: {} groups, {} unique symbols, refresh every {}s, market clock {} (regular hours only: {})",
            universe.groups().len(),
            universe.unique_symbols().len(),
            config.universe.refresh_interval.as_secs(),
            clock.timezone(),
            config.signal.regular_hours_only
        );

        Self {
            config,
            scanner,
            universe: Arc::new(RwLock::new(universe)),
        }
    }

    /// Runs one cycle over the current universe.
    pub async fn scan_once(&self) -> Result<ScanReport, ScanError> {
        let snapshot = self.universe.read().await.snapshot();
        self.scanner.run_cycle(&snapshot).await
    }

    pub async fn add_symbol(&self, group: &str, symbol: &str) -> Result<AddOutcome, UniverseError> {
        self.universe.write().await.add_symbol(group, symbol)
    }

    pub async fn remove_symbol(&self, group: &str, symbol: &str) -> Result<bool, UniverseError> {
        self.universe.write().await.remove_symbol(group, symbol)
    }
}
