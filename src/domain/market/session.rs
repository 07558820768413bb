use crate::domain::market::bar::Series;
use crate::domain::market::timeframe::Timeframe;
use chrono::{DateTime, Datelike, NaiveTime, TimeDelta, TimeZone, Timelike, Utc, Weekday};
use chrono_tz::Tz;

pub const DEFAULT_MARKET_TIMEZONE: Tz = chrono_tz::America::New_York;

/// Exchange-local wall clock.
///
/// Resampled buckets are laid out from local midnight, so they follow
/// daylight-saving changes instead of drifting against the UTC grid. The
/// regular session is `[open, close)` on weekdays, judged by bar start.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MarketClock {
    tz: Tz,
    // seconds after local midnight
    open: u32,
    close: u32,
}

impl Default for MarketClock {
    fn default() -> Self {
        Self::new(DEFAULT_MARKET_TIMEZONE)
    }
}

impl MarketClock {
    /// US equity hours (09:30 to 16:00) in `tz`.
    pub fn new(tz: Tz) -> Self {
        Self {
            tz,
            open: 9 * 3600 + 30 * 60,
            close: 16 * 3600,
        }
    }

    pub fn timezone(&self) -> Tz {
        self.tz
    }

    /// Start of the `timeframe` bucket holding `timestamp`.
    ///
    /// The grid restarts at local midnight plus `offset_minutes` every day.
    /// A start that falls into a spring-forward gap is resolved with the
    /// bar's own UTC offset; an ambiguous one takes the earlier instant.
    pub fn bucket_start(
        &self,
        timestamp: DateTime<Utc>,
        timeframe: Timeframe,
        offset_minutes: i64,
    ) -> DateTime<Utc> {
        let local = timestamp.with_timezone(&self.tz).naive_local();
        let midnight = local.date().and_time(NaiveTime::MIN);
        let minutes = (local - midnight).num_minutes();
        let into_bucket = (minutes - offset_minutes).rem_euclid(timeframe.to_minutes() as i64);
        let start = midnight + TimeDelta::minutes(minutes - into_bucket);

        self.tz
            .from_local_datetime(&start)
            .earliest()
            .map(|t| t.with_timezone(&Utc))
            .unwrap_or_else(|| timestamp - (local - start))
    }

    pub fn is_regular_hours(&self, timestamp: DateTime<Utc>) -> bool {
        let local = timestamp.with_timezone(&self.tz);
        let secs = local.num_seconds_from_midnight();
        !matches!(local.weekday(), Weekday::Sat | Weekday::Sun)
            && secs >= self.open
            && secs < self.close
    }

    /// Keeps only regular-session bars of an intraday series. Daily series
    /// are returned unchanged.
    pub fn regular_hours(&self, series: &Series) -> Series {
        if series.timeframe() == Timeframe::OneDay {
            return series.clone();
        }
        let bars = series
            .bars()
            .iter()
            .filter(|b| self.is_regular_hours(b.timestamp))
            .copied()
            .collect();
        Series::new(series.symbol(), series.timeframe(), bars)
    }
}
