use crate::domain::market::bar::{AnnotatedBar, AnnotatedSeries, Series};
use ta::Next;
use ta::indicators::{ExponentialMovingAverage, SimpleMovingAverage};

/// Indicator lengths applied to every series
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IndicatorParams {
    pub blue_high_len: usize,
    pub blue_low_len: usize,
    pub yellow_high_len: usize,
    pub yellow_low_len: usize,
    pub rsi_len: usize,
    pub volume_avg_len: usize,
}

impl Default for IndicatorParams {
    fn default() -> Self {
        Self {
            blue_high_len: 24,
            blue_low_len: 23,
            yellow_high_len: 89,
            yellow_low_len: 90,
            rsi_len: 14,
            volume_avg_len: 20,
        }
    }
}

/// Exponential moving average with `alpha = 2 / (length + 1)`, seeded with
/// the first value (no warm-up window).
///
/// A zero length yields an all-`NaN` output.
pub fn ema(values: &[f64], length: usize) -> Vec<f64> {
    let Ok(mut indicator) = ExponentialMovingAverage::new(length) else {
        return vec![f64::NAN; values.len()];
    };
    values.iter().map(|v| indicator.next(*v)).collect()
}

/// Trailing mean over exactly `length` values; `NaN` until the window fills.
pub fn sma(values: &[f64], length: usize) -> Vec<f64> {
    let Ok(mut indicator) = SimpleMovingAverage::new(length) else {
        return vec![f64::NAN; values.len()];
    };
    values
        .iter()
        .enumerate()
        .map(|(i, v)| {
            // ta averages whatever it has seen during warm-up
            let avg = indicator.next(*v);
            if i + 1 < length { f64::NAN } else { avg }
        })
        .collect()
}

/// Relative strength index with gains and losses smoothed by [`ema`].
///
/// The first position has no delta and is `NaN`. A window with no losses reads
/// 100, one with no gains reads 0, one with no movement at all is `NaN`.
pub fn rsi(values: &[f64], length: usize) -> Vec<f64> {
    if values.is_empty() {
        return Vec::new();
    }

    let mut gains = Vec::with_capacity(values.len());
    let mut losses = Vec::with_capacity(values.len());
    gains.push(0.0);
    losses.push(0.0);
    for pair in values.windows(2) {
        let delta = pair[1] - pair[0];
        gains.push(delta.max(0.0));
        losses.push((-delta).max(0.0));
    }

    let avg_gain = ema(&gains, length);
    let avg_loss = ema(&losses, length);

    avg_gain
        .iter()
        .zip(avg_loss.iter())
        .enumerate()
        .map(|(i, (gain, loss))| {
            if i == 0 || gain.is_nan() || loss.is_nan() {
                f64::NAN
            } else if *loss == 0.0 && *gain == 0.0 {
                f64::NAN
            } else if *loss == 0.0 {
                100.0
            } else if *gain == 0.0 {
                0.0
            } else {
                100.0 - 100.0 / (1.0 + gain / loss)
            }
        })
        .collect()
}

/// Computes every indicator field for a series in one pass.
#[derive(Debug, Clone, Default)]
pub struct IndicatorEngine {
    params: IndicatorParams,
}

impl IndicatorEngine {
    pub fn new(params: IndicatorParams) -> Self {
        Self { params }
    }

    pub fn annotate(&self, series: &Series) -> AnnotatedSeries {
        let bars = series.bars();
        let highs: Vec<f64> = bars.iter().map(|b| b.high).collect();
        let lows: Vec<f64> = bars.iter().map(|b| b.low).collect();
        let closes: Vec<f64> = bars.iter().map(|b| b.close).collect();
        let volumes: Vec<f64> = bars.iter().map(|b| b.volume as f64).collect();

        let p = &self.params;
        let blue_high = ema(&highs, p.blue_high_len);
        let blue_low = ema(&lows, p.blue_low_len);
        let yellow_high = ema(&highs, p.yellow_high_len);
        let yellow_low = ema(&lows, p.yellow_low_len);
        let rsi = rsi(&closes, p.rsi_len);
        let volume_avg = sma(&volumes, p.volume_avg_len);

        let annotated = bars
            .iter()
            .enumerate()
            .map(|(i, bar)| AnnotatedBar {
                bar: *bar,
                ema_blue_high: blue_high[i],
                ema_blue_low: blue_low[i],
                ema_yellow_high: yellow_high[i],
                ema_yellow_low: yellow_low[i],
                rsi: rsi[i],
                volume_avg: volume_avg[i],
            })
            .collect();

        AnnotatedSeries {
            symbol: series.symbol().to_string(),
            timeframe: series.timeframe(),
            bars: annotated,
        }
    }
}
