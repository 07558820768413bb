use crate::application::classifier::SignalClassifier;
use crate::application::fetcher::{BarFetcher, SeriesMap};
use crate::application::indicators::IndicatorEngine;
use crate::application::resampler::Resampler;
use crate::domain::errors::ScanError;
use crate::domain::market::bar::Series;
use crate::domain::market::report::{GroupTable, ResultRow, ScanReport, TimeframeCell};
use crate::domain::market::signal::Diagnostic;
use crate::domain::market::timeframe::Timeframe;
use crate::domain::market::universe::{SymbolUniverse, normalize_symbol};
use chrono::{DateTime, Utc};
use rayon::prelude::*;
use rust_decimal::Decimal;
use rust_decimal::prelude::FromPrimitive;
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Symbol and timeframe whose classification gets a full diagnostic trace
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DebugTarget {
    pub symbol: String,
    pub timeframe: Timeframe,
}

impl DebugTarget {
    pub fn new(symbol: &str, timeframe: Timeframe) -> Self {
        Self {
            symbol: normalize_symbol(symbol),
            timeframe,
        }
    }
}

/// Fetched base series for one cycle, keyed by resolution
type BaseSeries = HashMap<Timeframe, Arc<SeriesMap>>;

struct SymbolOutcome {
    row: ResultRow,
    has_data: bool,
    diagnostic: Option<Diagnostic>,
}

/// Runs scan cycles over a symbol universe.
///
/// A cycle fetches the four base resolutions concurrently, derives the
/// remaining timeframes, classifies every (symbol, timeframe) pair in
/// parallel and lays the rows out in configuration order.
pub struct SignalScanner {
    fetcher: BarFetcher,
    resampler: Resampler,
    engine: IndicatorEngine,
    classifier: SignalClassifier,
    debug_target: Option<DebugTarget>,
}

impl SignalScanner {
    pub fn new(
        fetcher: BarFetcher,
        resampler: Resampler,
        engine: IndicatorEngine,
        classifier: SignalClassifier,
    ) -> Self {
        Self {
            fetcher,
            resampler,
            engine,
            classifier,
            debug_target: None,
        }
    }

    pub fn with_debug_target(mut self, target: Option<DebugTarget>) -> Self {
        self.debug_target = target;
        self
    }

    pub async fn run_cycle(&self, universe: &SymbolUniverse) -> Result<ScanReport, ScanError> {
        self.run_cycle_at(universe, Utc::now()).await
    }

    /// Runs one cycle, judging bar closure against `now`.
    pub async fn run_cycle_at(
        &self,
        universe: &SymbolUniverse,
        now: DateTime<Utc>,
    ) -> Result<ScanReport, ScanError> {
        let started = Instant::now();
        let snapshot = universe.snapshot();
        let ordered = snapshot.unique_symbols();

        let mut requested: BTreeSet<String> = ordered.iter().cloned().collect();
        if let Some(target) = &self.debug_target {
            requested.insert(target.symbol.clone());
        }

        info!(
            "SignalScanner: starting cycle for {} symbols in {} groups via {}",
            requested.len(),
            snapshot.groups().len(),
            self.fetcher.provider_name()
        );

        let (five, fifteen, hourly, daily) = tokio::try_join!(
            self.fetcher.fetch(&requested, Timeframe::FiveMin),
            self.fetcher.fetch(&requested, Timeframe::FifteenMin),
            self.fetcher.fetch(&requested, Timeframe::OneHour),
            self.fetcher.fetch(&requested, Timeframe::OneDay),
        )
        .map_err(ScanError::from)?;

        let bases: BaseSeries = HashMap::from([
            (Timeframe::FiveMin, five),
            (Timeframe::FifteenMin, fifteen),
            (Timeframe::OneHour, hourly),
            (Timeframe::OneDay, daily),
        ]);

        let symbols: Vec<String> = requested.into_iter().collect();
        let mut outcomes: HashMap<String, SymbolOutcome> = symbols
            .par_iter()
            .map(|symbol| (symbol.clone(), self.evaluate_symbol(symbol, &bases, now)))
            .collect();

        let diagnostic = self.debug_target.as_ref().and_then(|target| {
            let found = outcomes
                .get_mut(&target.symbol)
                .and_then(|o| o.diagnostic.take());
            if found.is_none() {
                warn!(
                    "SignalScanner: no diagnostic for {} {} (missing or insufficient data)",
                    target.symbol, target.timeframe
                );
            }
            found
        });
        if let Some(d) = &diagnostic {
            match serde_json::to_string(d) {
                Ok(json) => info!("SignalScanner: diagnostic {}", json),
                Err(e) => warn!("SignalScanner: failed to serialize diagnostic: {}", e),
            }
        }

        let symbols_without_data = ordered
            .iter()
            .filter(|s| outcomes.get(*s).is_none_or(|o| !o.has_data))
            .count();

        let groups: Vec<GroupTable> = snapshot
            .groups()
            .iter()
            .filter(|g| !g.symbols.is_empty())
            .map(|g| GroupTable {
                name: g.name.clone(),
                rows: g
                    .symbols
                    .iter()
                    .map(|s| match outcomes.get(s) {
                        Some(outcome) => outcome.row.clone(),
                        None => ResultRow::placeholder(s.as_str()),
                    })
                    .collect(),
            })
            .collect();

        info!(
            "SignalScanner: cycle complete in {:?}: {} symbols, {} without data",
            started.elapsed(),
            ordered.len(),
            symbols_without_data
        );

        Ok(ScanReport {
            groups,
            updated_at: now,
            symbols_scanned: ordered.len(),
            symbols_without_data,
            diagnostic,
        })
    }

    fn evaluate_symbol(&self, symbol: &str, bases: &BaseSeries, now: DateTime<Utc>) -> SymbolOutcome {
        let base_of = |tf: Timeframe| base_series(bases, symbol, tf);

        let has_data = Timeframe::BASE.iter().any(|tf| base_of(*tf).is_some());
        if !has_data {
            debug!("SignalScanner: {} has no data at any resolution", symbol);
            return SymbolOutcome {
                row: ResultRow::placeholder(symbol),
                has_data,
                diagnostic: None,
            };
        }

        let last_price = base_of(Timeframe::FiveMin)
            .and_then(|s| s.last())
            .and_then(|b| Decimal::from_f64(b.close))
            .map(|d| d.round_dp(2));

        let mut diagnostic = None;
        let cells = Timeframe::REPORTED
            .iter()
            .map(|&tf| {
                let signal = base_of(tf).and_then(|base| {
                    let series = match self.resampler.resample(base, tf) {
                        Ok(series) => series,
                        Err(e) => {
                            warn!("SignalScanner: {} {}: {}", symbol, tf, e);
                            return None;
                        }
                    };
                    let annotated = self.engine.annotate(&series);
                    let wants_trace = self
                        .debug_target
                        .as_ref()
                        .is_some_and(|t| t.symbol == symbol && t.timeframe == tf);
                    let classification = self.classifier.evaluate(&annotated, now, wants_trace);
                    if classification.diagnostic.is_some() {
                        diagnostic = classification.diagnostic;
                    }
                    Some(classification.label)
                });
                TimeframeCell {
                    timeframe: tf,
                    signal,
                }
            })
            .collect();

        SymbolOutcome {
            row: ResultRow {
                symbol: symbol.to_string(),
                last_price,
                cells,
            },
            has_data,
            diagnostic,
        }
    }
}

/// Non-empty base series a timeframe is derived from
fn base_series<'a>(bases: &'a BaseSeries, symbol: &str, tf: Timeframe) -> Option<&'a Series> {
    bases
        .get(&tf.source())
        .and_then(|m| m.get(symbol))
        .filter(|s| !s.is_empty())
}
