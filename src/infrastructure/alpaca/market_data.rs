use super::common::{AlpacaBarsResponse, DEFAULT_DATA_URL, DEFAULT_FEED, PAGE_LIMIT};
use crate::domain::errors::FetchError;
use crate::domain::market::bar::Bar;
use crate::domain::market::timeframe::Timeframe;
use crate::domain::ports::{BarMap, MarketDataProvider};
use crate::infrastructure::core::http_client_factory::{
    HttpClientFactory, HttpClientSettings, build_url_with_query,
};
use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use reqwest_middleware::ClientWithMiddleware;
use tracing::{debug, error, trace};

// ===== Historical Bars (REST) =====

/// Multi-symbol bar source backed by Alpaca's `/v2/stocks/bars`
pub struct AlpacaBarsProvider {
    client: ClientWithMiddleware,
    api_key: String,
    api_secret: String,
    data_base_url: String,
    feed: String,
}

impl AlpacaBarsProvider {
    pub fn builder() -> AlpacaBarsProviderBuilder {
        AlpacaBarsProviderBuilder::default()
    }

    fn ensure_credentials(&self) -> Result<(), FetchError> {
        if self.api_key.trim().is_empty() || self.api_secret.trim().is_empty() {
            return Err(FetchError::MissingCredentials {
                provider: "alpaca".to_string(),
            });
        }
        Ok(())
    }

    async fn fetch_page(
        &self,
        symbols: &str,
        resolution: Timeframe,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
        page_token: Option<&str>,
    ) -> Result<AlpacaBarsResponse, FetchError> {
        let url = format!("{}/v2/stocks/bars", self.data_base_url);

        let mut query_params = vec![
            ("symbols", symbols.to_string()),
            ("timeframe", resolution.to_alpaca_string().to_string()),
            ("start", from.to_rfc3339_opts(SecondsFormat::Secs, true)),
            ("end", to.to_rfc3339_opts(SecondsFormat::Secs, true)),
            ("limit", PAGE_LIMIT.to_string()),
            ("adjustment", "all".to_string()),
            ("feed", self.feed.clone()),
            ("sort", "asc".to_string()),
        ];
        if let Some(token) = page_token {
            query_params.push(("page_token", token.to_string()));
        }

        let url_with_query =
            build_url_with_query(&url, &query_params).map_err(|e| FetchError::Transport {
                reason: format!("invalid Alpaca URL {}: {}", url, e),
            })?;

        trace!("AlpacaBarsProvider: GET {}", url_with_query);

        let response = self
            .client
            .get(&url_with_query)
            .header("APCA-API-KEY-ID", &self.api_key)
            .header("APCA-API-SECRET-KEY", &self.api_secret)
            .send()
            .await
            .map_err(|e| FetchError::Transport {
                reason: e.to_string(),
            })?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let error_text = response.text().await.unwrap_or_default();
            error!(
                "AlpacaBarsProvider: API error {} for {}: {}",
                status, symbols, error_text
            );
            return Err(FetchError::from_status(status, error_text));
        }

        response
            .json::<AlpacaBarsResponse>()
            .await
            .map_err(|e| FetchError::Malformed {
                reason: format!("Alpaca bars response: {}", e),
            })
    }
}

#[async_trait]
impl MarketDataProvider for AlpacaBarsProvider {
    fn name(&self) -> &str {
        "alpaca"
    }

    fn supports_bulk(&self) -> bool {
        true
    }

    async fn get_bars(
        &self,
        symbol: &str,
        resolution: Timeframe,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<Bar>, FetchError> {
        let mut map = self
            .get_bars_bulk(&[symbol.to_string()], resolution, from, to)
            .await?;
        Ok(map.remove(symbol).unwrap_or_default())
    }

    async fn get_bars_bulk(
        &self,
        symbols: &[String],
        resolution: Timeframe,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<BarMap, FetchError> {
        self.ensure_credentials()?;
        if symbols.is_empty() {
            return Ok(BarMap::new());
        }

        let joined = symbols.join(",");
        let mut merged = BarMap::with_capacity(symbols.len());
        let mut page_token: Option<String> = None;
        let mut pages = 0usize;

        loop {
            let body = self
                .fetch_page(&joined, resolution, from, to, page_token.as_deref())
                .await?;
            pages += 1;

            for (symbol, raw_bars) in body.bars.unwrap_or_default() {
                let bars = raw_bars.iter().filter_map(|b| b.to_bar(&symbol));
                merged.entry(symbol.clone()).or_default().extend(bars);
            }

            page_token = body.next_page_token.filter(|t| !t.is_empty());
            if page_token.is_none() {
                break;
            }
        }

        debug!(
            "AlpacaBarsProvider: {} {} symbols -> {} with bars ({} pages)",
            resolution,
            symbols.len(),
            merged.values().filter(|b| !b.is_empty()).count(),
            pages
        );
        Ok(merged)
    }
}

#[derive(Default)]
pub struct AlpacaBarsProviderBuilder {
    api_key: Option<String>,
    api_secret: Option<String>,
    data_base_url: Option<String>,
    feed: Option<String>,
    http: Option<HttpClientSettings>,
}

impl AlpacaBarsProviderBuilder {
    pub fn api_key(mut self, api_key: String) -> Self {
        self.api_key = Some(api_key);
        self
    }

    pub fn api_secret(mut self, api_secret: String) -> Self {
        self.api_secret = Some(api_secret);
        self
    }

    pub fn data_base_url(mut self, data_base_url: String) -> Self {
        self.data_base_url = Some(data_base_url);
        self
    }

    pub fn feed(mut self, feed: String) -> Self {
        self.feed = Some(feed);
        self
    }

    pub fn http_settings(mut self, http: HttpClientSettings) -> Self {
        self.http = Some(http);
        self
    }

    /// Missing credentials are not a build error: every request then fails
    /// with [`FetchError::MissingCredentials`].
    pub fn build(self) -> AlpacaBarsProvider {
        let http = self.http.unwrap_or_default();
        AlpacaBarsProvider {
            client: HttpClientFactory::create_client(&http),
            api_key: self.api_key.unwrap_or_default(),
            api_secret: self.api_secret.unwrap_or_default(),
            data_base_url: self
                .data_base_url
                .unwrap_or_else(|| DEFAULT_DATA_URL.to_string())
                .trim_end_matches('/')
                .to_string(),
            feed: self.feed.unwrap_or_else(|| DEFAULT_FEED.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeDelta;

    #[tokio::test]
    async fn test_missing_credentials_fail_before_request() {
        let provider = AlpacaBarsProvider::builder()
            .data_base_url("http://127.0.0.1:9".to_string())
            .build();
        let to = Utc::now();

        let err = provider
            .get_bars_bulk(
                &["AAPL".to_string()],
                Timeframe::OneDay,
                to - TimeDelta::days(5),
                to,
            )
            .await
            .unwrap_err();

        assert!(err.is_auth());
    }

    #[test]
    fn test_builder_trims_base_url() {
        let provider = AlpacaBarsProvider::builder()
            .api_key("k".to_string())
            .api_secret("s".to_string())
            .data_base_url("https://data.example.com/".to_string())
            .build();
        assert_eq!(provider.data_base_url, "https://data.example.com");
        assert_eq!(provider.feed, "iex");
        assert!(provider.supports_bulk());
    }
}
