// Bars, series and resampling buckets
pub mod bar;
pub mod bucket;
pub mod session;
pub mod timeframe;

// Classification output and symbol universe
pub mod report;
pub mod signal;
pub mod universe;
