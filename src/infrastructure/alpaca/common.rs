use crate::domain::market::bar::Bar;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::debug;

// ===== Constants =====

pub const DEFAULT_DATA_URL: &str = "https://data.alpaca.markets";
pub const DEFAULT_FEED: &str = "iex";
pub const PAGE_LIMIT: &str = "10000";

#[derive(Debug, Deserialize, Clone, Serialize)]
pub struct AlpacaBar {
    #[serde(rename = "t")]
    pub timestamp: String,
    #[serde(rename = "o")]
    pub open: f64,
    #[serde(rename = "h")]
    pub high: f64,
    #[serde(rename = "l")]
    pub low: f64,
    #[serde(rename = "c")]
    pub close: f64,
    #[serde(rename = "v")]
    pub volume: f64,
}

impl AlpacaBar {
    /// Converts to a domain bar, dropping unparseable or non-positive entries.
    pub fn to_bar(&self, symbol: &str) -> Option<Bar> {
        let timestamp = match DateTime::parse_from_rfc3339(&self.timestamp) {
            Ok(ts) => ts.with_timezone(&Utc),
            Err(e) => {
                debug!(
                    "AlpacaBarsProvider: dropping {} bar with bad timestamp '{}': {}",
                    symbol, self.timestamp, e
                );
                return None;
            }
        };
        let bar = Bar::new(
            timestamp,
            self.open,
            self.high,
            self.low,
            self.close,
            self.volume.max(0.0).round() as u64,
        );
        if !bar.is_valid() {
            debug!("AlpacaBarsProvider: dropping invalid {} bar at {}", symbol, timestamp);
            return None;
        }
        Some(bar)
    }
}

/// Body of `/v2/stocks/bars`
#[derive(Debug, Deserialize)]
pub struct AlpacaBarsResponse {
    #[serde(default)]
    pub bars: Option<HashMap<String, Vec<AlpacaBar>>>,
    #[serde(default)]
    pub next_page_token: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_bars_response() {
        let body = r#"{
            "bars": {
                "AAPL": [
                    {"t": "2024-01-02T14:30:00Z", "o": 187.15, "h": 188.44, "l": 183.89, "c": 185.64, "v": 82488700, "n": 1, "vw": 185.9}
                ],
                "MSFT": []
            },
            "next_page_token": "QUFQTHxNfDIwMjQ="
        }"#;
        let parsed: AlpacaBarsResponse = serde_json::from_str(body).unwrap();
        let bars = parsed.bars.unwrap();

        assert_eq!(parsed.next_page_token.as_deref(), Some("QUFQTHxNfDIwMjQ="));
        let bar = bars["AAPL"][0].to_bar("AAPL").unwrap();
        assert_eq!(bar.volume, 82_488_700);
        assert_eq!(bar.close, 185.64);
        assert!(bars["MSFT"].is_empty());
    }

    #[test]
    fn test_null_bars_and_token() {
        let parsed: AlpacaBarsResponse =
            serde_json::from_str(r#"{"bars": null, "next_page_token": null}"#).unwrap();
        assert!(parsed.bars.is_none());
        assert!(parsed.next_page_token.is_none());
    }

    #[test]
    fn test_invalid_bars_are_dropped() {
        let bad_time = AlpacaBar {
            timestamp: "yesterday".to_string(),
            open: 1.0,
            high: 1.0,
            low: 1.0,
            close: 1.0,
            volume: 1.0,
        };
        assert!(bad_time.to_bar("X").is_none());

        let zero_price = AlpacaBar {
            timestamp: "2024-01-02T14:30:00Z".to_string(),
            close: 0.0,
            ..bad_time
        };
        assert!(zero_price.to_bar("X").is_none());
    }
}
