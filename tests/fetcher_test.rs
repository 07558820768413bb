use chrono::{TimeDelta, TimeZone, Utc};
use rustsignal::application::fetcher::retry::RetryPolicy;
use rustsignal::application::fetcher::{BarFetcher, FetchStrategy, FetcherSettings};
use rustsignal::domain::market::bar::Bar;
use rustsignal::domain::market::timeframe::Timeframe;
use rustsignal::infrastructure::MockMarketDataProvider;
use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;
use tokio_test::{assert_err, assert_ok};

fn symbols(count: usize) -> BTreeSet<String> {
    (0..count).map(|i| format!("SYM{:02}", i)).collect()
}

fn bars_for(seed: usize) -> Vec<Bar> {
    let start = Utc.with_ymd_and_hms(2024, 3, 1, 14, 0, 0).unwrap();
    (0..12)
        .map(|i| {
            let close = 10.0 + seed as f64 + i as f64 * 0.1;
            Bar::new(
                start + TimeDelta::hours(i),
                close,
                close + 0.2,
                close - 0.2,
                close,
                1_000 + i as u64,
            )
        })
        .collect()
}

fn scripted(requested: &BTreeSet<String>) -> MockMarketDataProvider {
    requested
        .iter()
        .enumerate()
        .fold(MockMarketDataProvider::new(), |provider, (i, symbol)| {
            provider.with_series(symbol, Timeframe::OneHour, bars_for(i))
        })
}

fn settings(strategy: FetchStrategy) -> FetcherSettings {
    FetcherSettings {
        strategy,
        retry: RetryPolicy::fixed(3, Duration::ZERO),
        chunk_pause: Duration::ZERO,
        cache_ttl: Duration::ZERO,
    }
}

#[tokio::test]
async fn test_chunked_fetch_splits_requests() {
    let requested = symbols(40);
    let provider = Arc::new(scripted(&requested));
    let fetcher = BarFetcher::new(
        provider.clone(),
        settings(FetchStrategy::Chunked { chunk_size: 15 }),
    );

    let result = assert_ok!(fetcher.fetch(&requested, Timeframe::OneHour).await);

    assert_eq!(provider.bulk_calls(), 3);
    let sizes: Vec<usize> = provider.requests().iter().map(|r| r.len()).collect();
    assert_eq!(sizes, vec![15, 15, 10]);
    assert_eq!(result.len(), 40);
    assert!(result.values().all(|s| s.len() == 12));
}

#[tokio::test]
async fn test_chunked_and_bulk_agree() {
    let requested = symbols(20);
    let chunked = BarFetcher::new(
        Arc::new(scripted(&requested)),
        settings(FetchStrategy::Chunked { chunk_size: 6 }),
    );
    let bulk = BarFetcher::new(Arc::new(scripted(&requested)), settings(FetchStrategy::Bulk));
    let per_symbol = BarFetcher::new(
        Arc::new(scripted(&requested).without_bulk()),
        settings(FetchStrategy::PerSymbol { max_concurrency: 4 }),
    );

    let a = assert_ok!(chunked.fetch(&requested, Timeframe::OneHour).await);
    let b = assert_ok!(bulk.fetch(&requested, Timeframe::OneHour).await);
    let c = assert_ok!(per_symbol.fetch(&requested, Timeframe::OneHour).await);

    assert_eq!(*a, *b);
    assert_eq!(*a, *c);
}

#[tokio::test]
async fn test_per_symbol_fetch_issues_one_request_each() {
    let requested = symbols(9);
    let provider = Arc::new(scripted(&requested).without_bulk());
    let fetcher = BarFetcher::new(
        provider.clone(),
        settings(FetchStrategy::PerSymbol { max_concurrency: 3 }),
    );

    let result = assert_ok!(fetcher.fetch(&requested, Timeframe::OneHour).await);

    assert_eq!(provider.single_calls(), 9);
    assert_eq!(provider.bulk_calls(), 0);
    assert_eq!(result.len(), 9);
    for (symbol, series) in result.iter() {
        assert_eq!(series.symbol(), symbol);
        assert_eq!(series.timeframe(), Timeframe::OneHour);
    }
}

#[tokio::test]
async fn test_exhausted_retries_leave_empty_series() {
    let requested = symbols(10);
    let provider = Arc::new(scripted(&requested).with_failing_symbol("SYM01"));
    let fetcher = BarFetcher::new(
        provider.clone(),
        settings(FetchStrategy::Chunked { chunk_size: 5 }),
    );

    let result = assert_ok!(fetcher.fetch(&requested, Timeframe::OneHour).await);

    // first chunk tried three times, second once
    assert_eq!(provider.bulk_calls(), 4);
    assert_eq!(result.len(), 10);
    assert!(result["SYM00"].is_empty());
    assert!(result["SYM04"].is_empty());
    assert_eq!(result["SYM05"].len(), 12);
}

#[tokio::test]
async fn test_transient_failures_are_retried() {
    let requested = symbols(3);
    let provider = Arc::new(scripted(&requested).with_transient_failures(2));
    let fetcher = BarFetcher::new(provider.clone(), settings(FetchStrategy::Bulk));

    let result = assert_ok!(fetcher.fetch(&requested, Timeframe::OneHour).await);

    assert_eq!(provider.bulk_calls(), 3);
    assert!(result.values().all(|s| s.len() == 12));
}

#[tokio::test]
async fn test_unknown_symbols_yield_empty_series() {
    let mut requested = symbols(2);
    let provider = Arc::new(scripted(&requested));
    requested.insert("NOPE".to_string());
    let fetcher = BarFetcher::new(provider.clone(), settings(FetchStrategy::Bulk));

    let result = assert_ok!(fetcher.fetch(&requested, Timeframe::OneHour).await);

    assert_eq!(result.len(), 3);
    assert!(result["NOPE"].is_empty());
    assert_eq!(provider.bulk_calls(), 1);
}

#[tokio::test]
async fn test_cache_serves_repeat_requests_until_expiry() {
    let requested = symbols(4);
    let provider = Arc::new(scripted(&requested));
    let fetcher = BarFetcher::new(
        provider.clone(),
        FetcherSettings {
            cache_ttl: Duration::from_millis(100),
            ..settings(FetchStrategy::Bulk)
        },
    );

    let first = assert_ok!(fetcher.fetch(&requested, Timeframe::OneHour).await);
    let second = assert_ok!(fetcher.fetch(&requested, Timeframe::OneHour).await);
    assert_eq!(provider.bulk_calls(), 1);
    assert!(Arc::ptr_eq(&first, &second));

    // A different resolution is a different key
    assert_ok!(fetcher.fetch(&requested, Timeframe::OneDay).await);
    let after_daily = provider.bulk_calls();
    assert!(after_daily > 1);

    tokio::time::sleep(Duration::from_millis(150)).await;
    assert_ok!(fetcher.fetch(&requested, Timeframe::OneHour).await);
    assert_eq!(provider.bulk_calls(), after_daily + 1);
}

#[tokio::test]
async fn test_unauthorized_is_returned_without_retry() {
    let requested = symbols(30);
    let provider = Arc::new(MockMarketDataProvider::new().with_unauthorized());
    let fetcher = BarFetcher::new(
        provider.clone(),
        settings(FetchStrategy::Chunked { chunk_size: 15 }),
    );

    let err = assert_err!(fetcher.fetch(&requested, Timeframe::OneHour).await);

    assert!(err.is_auth());
    assert_eq!(provider.bulk_calls(), 1);
}
