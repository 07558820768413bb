// Indicator series and signal rules
pub mod classifier;
pub mod indicators;

// Bar acquisition and timeframe derivation
pub mod fetcher;
pub mod resampler;

// Scan cycle orchestrator
pub mod scanner;
pub mod system;
