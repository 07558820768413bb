use crate::domain::market::bar::{AnnotatedBar, AnnotatedSeries};
use crate::domain::market::signal::{Diagnostic, SignalLabel, SignalSet};
use chrono::{DateTime, Utc};

/// Tunables for the crossover rules
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClassifierConfig {
    /// Volume must exceed `volume_avg * multiplier` to count as a breakout
    pub volume_breakout_multiplier: f64,
    /// Yellow-EMA slope (per mille) below which the trend is flat
    pub flat_slope_threshold: f64,
    pub rsi_floor: f64,
    pub min_bars: usize,
    /// Distance between the current bar and the slope reference bar
    pub slope_lookback: usize,
    pub signal_set: SignalSet,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            volume_breakout_multiplier: 1.3,
            flat_slope_threshold: 0.2,
            rsi_floor: 30.0,
            min_bars: 90,
            slope_lookback: 5,
            signal_set: SignalSet::Full,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Classification {
    pub label: SignalLabel,
    pub diagnostic: Option<Diagnostic>,
}

/// Bars the rules are evaluated on, after skipping a still-forming last bar.
struct Window<'a> {
    current: &'a AnnotatedBar,
    previous: &'a AnnotatedBar,
    lookback: &'a AnnotatedBar,
    current_index: usize,
    last_bar_closed: bool,
}

#[derive(Debug, Clone, Copy, Default)]
struct Conditions {
    crossover: bool,
    crossunder: bool,
    volume_breakout: bool,
    slope: f64,
    is_flat: bool,
    is_bear_trend: bool,
}

/// Maps an annotated series to one [`SignalLabel`].
///
/// Pure: the only time input is `now`, used to decide whether the newest bar
/// has closed.
#[derive(Debug, Clone, Default)]
pub struct SignalClassifier {
    config: ClassifierConfig,
}

impl SignalClassifier {
    pub fn new(config: ClassifierConfig) -> Self {
        Self { config }
    }

    pub fn classify(&self, series: &AnnotatedSeries, now: DateTime<Utc>) -> SignalLabel {
        self.evaluate(series, now, false).label
    }

    /// Classifies and, when `with_diagnostic` is set, records every
    /// intermediate value behind the decision.
    pub fn evaluate(
        &self,
        series: &AnnotatedSeries,
        now: DateTime<Utc>,
        with_diagnostic: bool,
    ) -> Classification {
        let Some(window) = self.window(series, now) else {
            return Classification {
                label: SignalLabel::None,
                diagnostic: None,
            };
        };

        let conditions = self.conditions(&window);
        let label = self.label_for(&window, &conditions);

        let diagnostic =
            with_diagnostic.then(|| self.diagnostic(series, now, &window, &conditions, label));
        Classification { label, diagnostic }
    }

    fn window<'a>(&self, series: &'a AnnotatedSeries, now: DateTime<Utc>) -> Option<Window<'a>> {
        let bars = &series.bars;
        if bars.len() < self.config.min_bars {
            return None;
        }

        let last = bars.last()?;
        let last_bar_closed = last.bar.timestamp + series.timeframe.duration() <= now;
        let current_index = if last_bar_closed {
            bars.len() - 1
        } else {
            bars.len().checked_sub(2)?
        };
        let previous_index = current_index.checked_sub(1)?;
        let lookback_index = current_index.checked_sub(self.config.slope_lookback)?;

        Some(Window {
            current: &bars[current_index],
            previous: &bars[previous_index],
            lookback: &bars[lookback_index],
            current_index,
            last_bar_closed,
        })
    }

    fn conditions(&self, w: &Window<'_>) -> Conditions {
        let (cur, prev) = (w.current, w.previous);

        let crossover = prev.bar.close < prev.ema_blue_high && cur.bar.close > cur.ema_blue_high;
        let crossunder = prev.bar.close > prev.ema_blue_low && cur.bar.close < cur.ema_blue_low;
        let volume_breakout =
            (cur.bar.volume as f64) > cur.volume_avg * self.config.volume_breakout_multiplier;

        let reference = w.lookback.ema_yellow_high;
        let slope = if reference == 0.0 || !reference.is_finite() {
            0.0
        } else {
            let raw = (cur.ema_yellow_high - reference).abs() / reference * 1000.0;
            if raw.is_finite() { raw } else { 0.0 }
        };

        Conditions {
            crossover,
            crossunder,
            volume_breakout,
            slope,
            is_flat: slope < self.config.flat_slope_threshold,
            is_bear_trend: cur.ema_blue_high < cur.ema_yellow_low,
        }
    }

    fn label_for(&self, w: &Window<'_>, c: &Conditions) -> SignalLabel {
        let rsi_ok = w.current.rsi > self.config.rsi_floor;

        // first match wins
        let label = if c.crossunder && c.is_bear_trend && c.volume_breakout && rsi_ok {
            SignalLabel::SniperShort
        } else if c.crossover && c.volume_breakout {
            SignalLabel::StrongBuy
        } else if c.crossunder && rsi_ok {
            SignalLabel::Sell40pct
        } else if c.crossover && !c.is_flat {
            SignalLabel::Buy40pct
        } else if c.crossover {
            SignalLabel::FlattenShort
        } else if c.crossunder {
            SignalLabel::BreakLadder
        } else {
            SignalLabel::None
        };

        if self.config.signal_set.permits(label) {
            label
        } else {
            SignalLabel::None
        }
    }

    fn diagnostic(
        &self,
        series: &AnnotatedSeries,
        now: DateTime<Utc>,
        w: &Window<'_>,
        c: &Conditions,
        label: SignalLabel,
    ) -> Diagnostic {
        let cur = w.current;
        let tail_start = (w.current_index + 1).saturating_sub(5);
        let volume_ratio = if cur.volume_avg > 0.0 {
            cur.bar.volume as f64 / cur.volume_avg
        } else {
            0.0
        };

        Diagnostic {
            symbol: series.symbol.clone(),
            timeframe: series.timeframe,
            label,
            evaluated_at: now,
            current_bar: cur.bar.timestamp,
            last_bar_closed: w.last_bar_closed,
            previous_close: w.previous.bar.close,
            current_close: cur.bar.close,
            ema_blue_high: cur.ema_blue_high,
            ema_blue_low: cur.ema_blue_low,
            ema_yellow_high: cur.ema_yellow_high,
            ema_yellow_low: cur.ema_yellow_low,
            volume: cur.bar.volume,
            volume_avg: cur.volume_avg,
            volume_ratio,
            rsi: cur.rsi,
            slope: c.slope,
            crossover: c.crossover,
            crossunder: c.crossunder,
            volume_breakout: c.volume_breakout,
            is_flat: c.is_flat,
            is_bear_trend: c.is_bear_trend,
            recent_bars: series.bars[tail_start..=w.current_index].to_vec(),
        }
    }
}
