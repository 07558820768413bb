use crate::domain::market::bar::Bar;
use chrono::DateTime;
use serde::Deserialize;
use tracing::debug;

pub const DEFAULT_BASE_URL: &str = "https://api.polygon.io";
pub const RESULT_LIMIT: &str = "50000";

/// One aggregate from `/v2/aggs/ticker/...`
#[derive(Debug, Deserialize, Clone)]
pub struct PolygonAgg {
    /// Window start, Unix milliseconds
    #[serde(rename = "t")]
    pub timestamp_ms: i64,
    #[serde(rename = "o")]
    pub open: f64,
    #[serde(rename = "h")]
    pub high: f64,
    #[serde(rename = "l")]
    pub low: f64,
    #[serde(rename = "c")]
    pub close: f64,
    #[serde(rename = "v", default)]
    pub volume: f64,
}

impl PolygonAgg {
    pub fn to_bar(&self, symbol: &str) -> Option<Bar> {
        let Some(timestamp) = DateTime::from_timestamp_millis(self.timestamp_ms) else {
            debug!(
                "PolygonBarsProvider: dropping {} aggregate with bad timestamp {}",
                symbol, self.timestamp_ms
            );
            return None;
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
            debug!("PolygonBarsProvider: dropping invalid {} bar at {}", symbol, timestamp);
            return None;
        }
        Some(bar)
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PolygonAggsResponse {
    #[serde(default)]
    pub results_count: u64,
    #[serde(default)]
    pub results: Option<Vec<PolygonAgg>>,
    #[serde(default)]
    pub status: Option<String>,
}
