use crate::domain::errors::FetchError;
use crate::domain::market::bar::Bar;
use crate::domain::market::timeframe::Timeframe;
use crate::domain::ports::{BarMap, MarketDataProvider};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tracing::{debug, info};

/// In-memory provider for tests and `PROVIDER=mock` dry runs.
///
/// Scripted series take precedence; otherwise, when synthetic data is enabled,
/// a deterministic random walk is generated per (symbol, resolution).
pub struct MockMarketDataProvider {
    scripted: HashMap<(String, Timeframe), Vec<Bar>>,
    synthetic: bool,
    bulk: bool,
    failing: HashSet<String>,
    unauthorized: bool,
    transient_failures: AtomicUsize,
    latency: Duration,
    in_flight: AtomicUsize,
    peak_in_flight: AtomicUsize,
    bulk_calls: AtomicUsize,
    single_calls: AtomicUsize,
    requests: Mutex<Vec<Vec<String>>>,
}

impl Default for MockMarketDataProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl MockMarketDataProvider {
    /// Empty provider: every symbol returns no bars unless scripted.
    pub fn new() -> Self {
        Self {
            scripted: HashMap::new(),
            synthetic: false,
            bulk: true,
            failing: HashSet::new(),
            unauthorized: false,
            transient_failures: AtomicUsize::new(0),
            latency: Duration::ZERO,
            in_flight: AtomicUsize::new(0),
            peak_in_flight: AtomicUsize::new(0),
            bulk_calls: AtomicUsize::new(0),
            single_calls: AtomicUsize::new(0),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Provider that invents plausible bars for any symbol.
    pub fn synthetic() -> Self {
        info!("MockMarketDataProvider: generating synthetic random-walk bars");
        Self {
            synthetic: true,
            ..Self::new()
        }
    }

    pub fn with_series(mut self, symbol: &str, resolution: Timeframe, bars: Vec<Bar>) -> Self {
        self.scripted.insert((symbol.to_string(), resolution), bars);
        self
    }

    /// Requests touching `symbol` fail with a transport error.
    pub fn with_failing_symbol(mut self, symbol: &str) -> Self {
        self.failing.insert(symbol.to_string());
        self
    }

    /// The next `count` requests fail with a transport error.
    pub fn with_transient_failures(self, count: usize) -> Self {
        self.transient_failures.store(count, Ordering::SeqCst);
        self
    }

    pub fn with_unauthorized(mut self) -> Self {
        self.unauthorized = true;
        self
    }

    /// Every request takes at least `latency` to answer.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    pub fn without_bulk(mut self) -> Self {
        self.bulk = false;
        self
    }

    pub fn bulk_calls(&self) -> usize {
        self.bulk_calls.load(Ordering::SeqCst)
    }

    pub fn single_calls(&self) -> usize {
        self.single_calls.load(Ordering::SeqCst)
    }

    pub fn total_calls(&self) -> usize {
        self.bulk_calls() + self.single_calls()
    }

    /// Highest number of requests that were being answered at the same time
    pub fn peak_in_flight(&self) -> usize {
        self.peak_in_flight.load(Ordering::SeqCst)
    }

    /// Symbol lists of every request so far, in arrival order
    pub fn requests(&self) -> Vec<Vec<String>> {
        match self.requests.lock() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    fn record(&self, symbols: Vec<String>) {
        match self.requests.lock() {
            Ok(mut guard) => guard.push(symbols),
            Err(poisoned) => poisoned.into_inner().push(symbols),
        }
    }

    async fn respond<T>(&self, answer: impl FnOnce() -> Result<T, FetchError>) -> Result<T, FetchError> {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak_in_flight.fetch_max(now, Ordering::SeqCst);
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
        let result = answer();
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        result
    }

    fn check_failures(&self, symbols: &[String]) -> Result<(), FetchError> {
        if self.unauthorized {
            return Err(FetchError::Unauthorized { status: 401 });
        }
        let injected = self
            .transient_failures
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if injected {
            return Err(FetchError::Transport {
                reason: "injected transient failure".to_string(),
            });
        }
        if let Some(bad) = symbols.iter().find(|s| self.failing.contains(*s)) {
            return Err(FetchError::Transport {
                reason: format!("injected failure for {}", bad),
            });
        }
        Ok(())
    }

    fn bars_for(
        &self,
        symbol: &str,
        resolution: Timeframe,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Vec<Bar> {
        if let Some(bars) = self.scripted.get(&(symbol.to_string(), resolution)) {
            return bars.clone();
        }
        if self.synthetic {
            return random_walk(symbol, resolution, from, to);
        }
        Vec::new()
    }
}

#[async_trait]
impl MarketDataProvider for MockMarketDataProvider {
    fn name(&self) -> &str {
        "mock"
    }

    fn supports_bulk(&self) -> bool {
        self.bulk
    }

    async fn get_bars(
        &self,
        symbol: &str,
        resolution: Timeframe,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<Bar>, FetchError> {
        self.single_calls.fetch_add(1, Ordering::SeqCst);
        self.record(vec![symbol.to_string()]);
        self.respond(|| {
            self.check_failures(&[symbol.to_string()])?;
            Ok(self.bars_for(symbol, resolution, from, to))
        })
        .await
    }

    async fn get_bars_bulk(
        &self,
        symbols: &[String],
        resolution: Timeframe,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<BarMap, FetchError> {
        self.bulk_calls.fetch_add(1, Ordering::SeqCst);
        self.record(symbols.to_vec());
        let map: BarMap = self
            .respond(|| {
                self.check_failures(symbols)?;
                Ok(symbols
                    .iter()
                    .map(|s| (s.clone(), self.bars_for(s, resolution, from, to)))
                    .filter(|(_, bars)| !bars.is_empty())
                    .collect())
            })
            .await?;
        debug!(
            "MockMarketDataProvider: bulk {} for {} symbols -> {} with bars",
            resolution,
            symbols.len(),
            map.len()
        );
        Ok(map)
    }
}

/// Deterministic walk on the resolution grid covering `[from, to)`.
fn random_walk(
    symbol: &str,
    resolution: Timeframe,
    from: DateTime<Utc>,
    to: DateTime<Utc>,
) -> Vec<Bar> {
    let seed = symbol
        .bytes()
        .fold(resolution.to_minutes() as u64, |acc, b| {
            acc.wrapping_mul(31).wrapping_add(b as u64)
        });
    let mut rng = StdRng::seed_from_u64(seed);

    let mut price: f64 = rng.random_range(20.0..500.0);
    let step = resolution.duration();
    let step_secs = resolution.to_seconds();
    let mut ts = DateTime::from_timestamp(from.timestamp().div_euclid(step_secs) * step_secs, 0)
        .unwrap_or(from);
    let mut bars = Vec::new();

    while ts < to {
        let open = price;
        let close = (open * (1.0 + rng.random_range(-0.004..0.004))).max(0.01);
        let high = open.max(close) * (1.0 + rng.random_range(0.0..0.002));
        let low = (open.min(close) * (1.0 - rng.random_range(0.0..0.002))).max(0.01);
        let volume = rng.random_range(10_000u64..200_000);
        bars.push(Bar::new(ts, open, high, low, close, volume));
        price = close;
        ts += step;
    }
    bars
}
