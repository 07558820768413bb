pub mod alpaca;
pub mod core;
pub mod factory;
pub mod mock;
pub mod polygon;

pub use factory::ProviderFactory;
pub use mock::MockMarketDataProvider;
