use chrono::{DateTime, TimeDelta, TimeZone, Utc};
use rustsignal::application::classifier::{ClassifierConfig, SignalClassifier};
use rustsignal::application::indicators::IndicatorEngine;
use rustsignal::domain::market::bar::{Bar, Series};
use rustsignal::domain::market::signal::{SignalLabel, SignalSet};
use rustsignal::domain::market::timeframe::Timeframe;

fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()
}

fn daily(i: usize, close: f64, spread: f64, volume: u64) -> Bar {
    Bar::new(
        t0() + TimeDelta::days(i as i64),
        close,
        close + spread,
        close - spread,
        close,
        volume,
    )
}

/// 99 quiet daily bars at 100 followed by `last`.
fn flat_then(last: (f64, f64, u64)) -> Series {
    let mut bars: Vec<Bar> = (0..99).map(|i| daily(i, 100.0, 1.0, 1_000)).collect();
    bars.push(daily(99, last.0, last.1, last.2));
    Series::new("TEST", Timeframe::OneDay, bars)
}

/// Steady decline of 1 per day with a bounce on the second-to-last bar.
fn downtrend_with_bounce(final_volume: u64) -> Series {
    let mut bars: Vec<Bar> = (0..98)
        .map(|i| daily(i, 200.0 - i as f64, 0.5, 1_000))
        .collect();
    bars.push(daily(98, 127.0, 0.5, 1_000));
    bars.push(daily(99, 99.0, 0.5, final_volume));
    Series::new("TEST", Timeframe::OneDay, bars)
}

fn classify_with(classifier: &SignalClassifier, series: &Series) -> SignalLabel {
    let annotated = IndicatorEngine::default().annotate(series);
    let last = series.last().unwrap().timestamp;
    classifier.classify(&annotated, last + TimeDelta::days(1) + TimeDelta::hours(1))
}

fn classify(series: &Series) -> SignalLabel {
    classify_with(&SignalClassifier::default(), series)
}

#[test]
fn test_breakout_on_volume_is_strong_buy() {
    let series = flat_then((105.0, 0.5, 3_000));
    assert_eq!(classify(&series), SignalLabel::StrongBuy);
}

#[test]
fn test_crossover_in_rising_trend_is_buy_40() {
    // The jump lifts the slow EMA enough to leave the flat zone
    let series = flat_then((105.0, 0.5, 1_000));
    assert_eq!(classify(&series), SignalLabel::Buy40pct);
}

#[test]
fn test_crossover_in_flat_trend_is_flatten_short() {
    let series = flat_then((101.5, 0.1, 1_000));
    assert_eq!(classify(&series), SignalLabel::FlattenShort);

    let core = SignalClassifier::new(ClassifierConfig {
        signal_set: SignalSet::Core,
        ..Default::default()
    });
    assert_eq!(classify_with(&core, &series), SignalLabel::None);
}

#[test]
fn test_crossunder_with_exhausted_rsi_breaks_ladder() {
    // No gains at all, so RSI sits at 0
    let series = flat_then((95.0, 0.5, 3_000));
    assert_eq!(classify(&series), SignalLabel::BreakLadder);
}

#[test]
fn test_crossunder_in_bear_trend_with_volume_is_sniper_short() {
    assert_eq!(classify(&downtrend_with_bounce(5_000)), SignalLabel::SniperShort);
}

#[test]
fn test_crossunder_in_bear_trend_without_volume_is_sell_40() {
    assert_eq!(classify(&downtrend_with_bounce(1_000)), SignalLabel::Sell40pct);
}

#[test]
fn test_higher_volume_threshold_downgrades_breakout() {
    let series = flat_then((105.0, 0.5, 3_000));
    let strict = SignalClassifier::new(ClassifierConfig {
        volume_breakout_multiplier: 3.0,
        ..Default::default()
    });
    assert_eq!(classify_with(&strict, &series), SignalLabel::Buy40pct);
}

#[test]
fn test_short_history_is_none() {
    let bars: Vec<Bar> = (0..60).map(|i| daily(i, 100.0, 1.0, 1_000)).collect();
    let mut bars = bars;
    bars.push(daily(60, 105.0, 0.5, 3_000));
    let series = Series::new("TEST", Timeframe::OneDay, bars);
    assert_eq!(classify(&series), SignalLabel::None);
}

#[test]
fn test_forming_bar_is_ignored() {
    // Breakout bar first, then a quiet bar that has not closed yet
    let mut bars: Vec<Bar> = (0..99).map(|i| daily(i, 100.0, 1.0, 1_000)).collect();
    bars.push(daily(99, 105.0, 0.5, 3_000));
    bars.push(daily(100, 105.0, 0.5, 1_000));
    let series = Series::new("TEST", Timeframe::OneDay, bars);
    let annotated = IndicatorEngine::default().annotate(&series);
    let classifier = SignalClassifier::default();

    let forming = series.last().unwrap().timestamp + TimeDelta::hours(3);
    assert_eq!(classifier.classify(&annotated, forming), SignalLabel::StrongBuy);

    let closed = series.last().unwrap().timestamp + TimeDelta::days(1);
    assert_eq!(classifier.classify(&annotated, closed), SignalLabel::None);
}
