use crate::domain::market::bar::Bar;
use chrono::{DateTime, Utc};

/// A bar under construction for one resampling bucket
#[derive(Debug, Clone)]
pub struct BarBucket {
    /// Start of the bucket; becomes the timestamp of the resulting bar
    pub start: DateTime<Utc>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: u64,
    /// Number of source bars absorbed so far
    pub bar_count: usize,
}

impl BarBucket {
    /// Opens a bucket from its first source bar
    pub fn new(start: DateTime<Utc>, first: &Bar) -> Self {
        Self {
            start,
            open: first.open,
            high: first.high,
            low: first.low,
            close: first.close,
            volume: first.volume,
            bar_count: 1,
        }
    }

    /// Merges a later source bar into this bucket
    ///
    /// # Note
    /// - Open remains unchanged (first bar's open)
    /// - High becomes max of all highs
    /// - Low becomes min of all lows
    /// - Close becomes the latest close
    /// - Volume is summed
    pub fn absorb(&mut self, bar: &Bar) {
        if bar.high > self.high {
            self.high = bar.high;
        }
        if bar.low < self.low {
            self.low = bar.low;
        }
        self.close = bar.close;
        self.volume = self.volume.saturating_add(bar.volume);
        self.bar_count += 1;
    }

    pub fn into_bar(self) -> Bar {
        Bar::new(
            self.start,
            self.open,
            self.high,
            self.low,
            self.close,
            self.volume,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_absorb_rules() {
        let start = Utc.with_ymd_and_hms(2024, 1, 2, 14, 0, 0).unwrap();
        let first = Bar::new(start, 100.0, 105.0, 99.0, 103.0, 1000);
        let mut bucket = BarBucket::new(start, &first);

        let later = Bar::new(
            start + chrono::TimeDelta::minutes(5),
            103.0,
            107.0,
            98.0,
            106.0,
            500,
        );
        bucket.absorb(&later);

        assert_eq!(bucket.bar_count, 2);
        let bar = bucket.into_bar();
        assert_eq!(bar.timestamp, start);
        assert_eq!(bar.open, 100.0);
        assert_eq!(bar.high, 107.0);
        assert_eq!(bar.low, 98.0);
        assert_eq!(bar.close, 106.0);
        assert_eq!(bar.volume, 1500);
    }
}
