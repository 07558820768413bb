use crate::domain::errors::FetchError;
use crate::domain::market::bar::Bar;
use crate::domain::market::timeframe::Timeframe;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;

/// Raw provider output keyed by symbol. Symbols the provider had nothing for
/// may simply be missing.
pub type BarMap = HashMap<String, Vec<Bar>>;

// Need async_trait for async functions in traits
#[async_trait]
pub trait MarketDataProvider: Send + Sync {
    /// Short identifier used in logs
    fn name(&self) -> &str;

    /// Whether one request can carry many symbols
    fn supports_bulk(&self) -> bool {
        false
    }

    async fn get_bars(
        &self,
        symbol: &str,
        resolution: Timeframe,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<Bar>, FetchError>;

    /// Fetches several symbols in one go. Providers without a multi-symbol
    /// endpoint fall back to sequential single-symbol requests.
    async fn get_bars_bulk(
        &self,
        symbols: &[String],
        resolution: Timeframe,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<BarMap, FetchError> {
        let mut out = BarMap::with_capacity(symbols.len());
        for symbol in symbols {
            let bars = self.get_bars(symbol, resolution, from, to).await?;
            if !bars.is_empty() {
                out.insert(symbol.clone(), bars);
            }
        }
        Ok(out)
    }
}
