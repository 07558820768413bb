use super::common::{DEFAULT_BASE_URL, PolygonAggsResponse, RESULT_LIMIT};
use crate::domain::errors::FetchError;
use crate::domain::market::bar::Bar;
use crate::domain::market::timeframe::Timeframe;
use crate::domain::ports::MarketDataProvider;
use crate::infrastructure::core::http_client_factory::{
    HttpClientFactory, HttpClientSettings, build_url_with_query,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest_middleware::ClientWithMiddleware;
use tracing::{debug, error, trace};

/// Single-symbol bar source backed by Polygon's aggregates endpoint
pub struct PolygonBarsProvider {
    client: ClientWithMiddleware,
    api_key: String,
    base_url: String,
}

impl PolygonBarsProvider {
    pub fn builder() -> PolygonBarsProviderBuilder {
        PolygonBarsProviderBuilder::default()
    }

    fn aggs_url(
        &self,
        symbol: &str,
        resolution: Timeframe,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<String, FetchError> {
        let (multiplier, timespan) = resolution.to_polygon_range();
        let url = format!(
            "{}/v2/aggs/ticker/{}/range/{}/{}/{}/{}",
            self.base_url,
            symbol,
            multiplier,
            timespan,
            from.format("%Y-%m-%d"),
            to.format("%Y-%m-%d")
        );
        let query_params = [
            ("adjusted", "true"),
            ("sort", "asc"),
            ("limit", RESULT_LIMIT),
            ("apiKey", self.api_key.as_str()),
        ];
        build_url_with_query(&url, &query_params).map_err(|e| FetchError::Transport {
            reason: format!("invalid Polygon URL for {}: {}", symbol, e),
        })
    }
}

#[async_trait]
impl MarketDataProvider for PolygonBarsProvider {
    fn name(&self) -> &str {
        "polygon"
    }

    async fn get_bars(
        &self,
        symbol: &str,
        resolution: Timeframe,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<Bar>, FetchError> {
        if self.api_key.trim().is_empty() {
            return Err(FetchError::MissingCredentials {
                provider: "polygon".to_string(),
            });
        }

        let url = self.aggs_url(symbol, resolution, from, to)?;
        trace!("PolygonBarsProvider: GET {} {} aggregates", symbol, resolution);

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(transport_error)?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let error_text = response.text().await.unwrap_or_default();
            error!(
                "PolygonBarsProvider: API error {} for {}: {}",
                status, symbol, error_text
            );
            return Err(FetchError::from_status(status, error_text));
        }

        let body: PolygonAggsResponse =
            response.json().await.map_err(|e| FetchError::Malformed {
                reason: format!("Polygon aggregates for {}: {}", symbol, e.without_url()),
            })?;

        let bars: Vec<Bar> = body
            .results
            .unwrap_or_default()
            .iter()
            .filter_map(|agg| agg.to_bar(symbol))
            .collect();

        debug!(
            "PolygonBarsProvider: {} {} -> {} bars (resultsCount {}, status {})",
            symbol,
            resolution,
            bars.len(),
            body.results_count,
            body.status.as_deref().unwrap_or("?")
        );
        Ok(bars)
    }
}

/// The request URL carries the API key, so it never goes into error text.
fn transport_error(e: reqwest_middleware::Error) -> FetchError {
    let reason = match e {
        reqwest_middleware::Error::Reqwest(inner) => inner.without_url().to_string(),
        other => other.to_string(),
    };
    FetchError::Transport { reason }
}

#[derive(Default)]
pub struct PolygonBarsProviderBuilder {
    api_key: Option<String>,
    base_url: Option<String>,
    http: Option<HttpClientSettings>,
}

impl PolygonBarsProviderBuilder {
    pub fn api_key(mut self, api_key: String) -> Self {
        self.api_key = Some(api_key);
        self
    }

    pub fn base_url(mut self, base_url: String) -> Self {
        self.base_url = Some(base_url);
        self
    }

    pub fn http_settings(mut self, http: HttpClientSettings) -> Self {
        self.http = Some(http);
        self
    }

    pub fn build(self) -> PolygonBarsProvider {
        let http = self.http.unwrap_or_default();
        PolygonBarsProvider {
            client: HttpClientFactory::create_client(&http),
            api_key: self.api_key.unwrap_or_default(),
            base_url: self
                .base_url
                .unwrap_or_else(|| DEFAULT_BASE_URL.to_string())
                .trim_end_matches('/')
                .to_string(),
        }
    }
}
