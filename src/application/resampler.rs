use crate::domain::errors::ResampleError;
use crate::domain::market::bar::Series;
use crate::domain::market::bucket::BarBucket;
use crate::domain::market::session::MarketClock;
use crate::domain::market::timeframe::Timeframe;

const MINUTES_PER_DAY: i64 = 24 * 60;

/// Aggregates a base-resolution series into a coarser timeframe
///
/// Buckets are left-closed and labelled by their start. Boundaries are laid
/// out from local midnight on the market clock, shifted by `offset_minutes`,
/// for every timeframe alike. Buckets without any source bar are omitted; the
/// trailing bucket is emitted even if the period is still running (the
/// classifier decides whether it is closed).
///
/// With `regular_hours_only`, intraday input is cut to the regular session
/// first, including input that is passed through at its own resolution.
#[derive(Debug, Clone, Copy, Default)]
pub struct Resampler {
    clock: MarketClock,
    offset_minutes: i64,
    regular_hours_only: bool,
}

impl Resampler {
    pub fn new(clock: MarketClock, offset_minutes: i64) -> Self {
        Self {
            clock,
            offset_minutes: offset_minutes.rem_euclid(MINUTES_PER_DAY),
            regular_hours_only: false,
        }
    }

    pub fn with_regular_hours_only(mut self, enabled: bool) -> Self {
        self.regular_hours_only = enabled;
        self
    }

    pub fn resample(&self, series: &Series, target: Timeframe) -> Result<Series, ResampleError> {
        let source = series.timeframe();
        let Some(factor) = target.multiple_of(source) else {
            return Err(ResampleError::NotAMultiple {
                from: source.to_string(),
                to: target.to_string(),
            });
        };

        let session;
        let series = if self.regular_hours_only && source != Timeframe::OneDay {
            session = self.clock.regular_hours(series);
            &session
        } else {
            series
        };
        if factor == 1 {
            return Ok(series.clone());
        }

        let mut bars = Vec::with_capacity(series.len() / factor + 1);
        let mut active: Option<BarBucket> = None;

        for bar in series.bars() {
            let start = self
                .clock
                .bucket_start(bar.timestamp, target, self.offset_minutes);
            match active.as_mut() {
                Some(bucket) if bucket.start == start => bucket.absorb(bar),
                _ => {
                    if let Some(done) = active.replace(BarBucket::new(start, bar)) {
                        bars.push(done.into_bar());
                    }
                }
            }
        }
        if let Some(done) = active {
            bars.push(done.into_bar());
        }

        Ok(Series::new(series.symbol(), target, bars))
    }
}
