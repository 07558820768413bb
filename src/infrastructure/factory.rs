use crate::config::{ProviderEnvConfig, ProviderKind};
use crate::domain::ports::MarketDataProvider;
use crate::infrastructure::alpaca::AlpacaBarsProvider;
use crate::infrastructure::mock::MockMarketDataProvider;
use crate::infrastructure::polygon::PolygonBarsProvider;
use std::sync::Arc;
use tracing::{info, warn};

pub struct ProviderFactory;

impl ProviderFactory {
    pub fn create(config: &ProviderEnvConfig) -> Arc<dyn MarketDataProvider> {
        info!(
            "ProviderFactory: using {:?} provider with {} fetch strategy",
            config.kind, config.fetch.strategy
        );
        match config.kind {
            ProviderKind::Mock => Arc::new(MockMarketDataProvider::synthetic()),
            ProviderKind::Alpaca => {
                if config.alpaca.api_key.is_empty() || config.alpaca.secret_key.is_empty() {
                    warn!("ProviderFactory: Alpaca credentials missing, every fetch will fail");
                }
                Arc::new(
                    AlpacaBarsProvider::builder()
                        .api_key(config.alpaca.api_key.clone())
                        .api_secret(config.alpaca.secret_key.clone())
                        .data_base_url(config.alpaca.data_url.clone())
                        .feed(config.alpaca.feed.clone())
                        .http_settings(config.http.clone())
                        .build(),
                )
            }
            ProviderKind::Polygon => {
                if config.polygon.api_key.is_empty() {
                    warn!("ProviderFactory: POLYGON_API_KEY missing, every fetch will fail");
                }
                Arc::new(
                    PolygonBarsProvider::builder()
                        .api_key(config.polygon.api_key.clone())
                        .base_url(config.polygon.base_url.clone())
                        .http_settings(config.http.clone())
                        .build(),
                )
            }
        }
    }
}
