use anyhow::{Result, anyhow};
use chrono::TimeDelta;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Bar resolutions handled by the pipeline.
///
/// Four of them (`5m`, `15m`, `1h`, `1d`) are fetched from the provider; the
/// rest are derived by resampling a finer base resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Timeframe {
    FiveMin,
    TenMin,
    FifteenMin,
    ThirtyMin,
    OneHour,
    TwoHour,
    ThreeHour,
    FourHour,
    OneDay,
}

impl Timeframe {
    /// Resolutions requested from the market-data provider.
    pub const BASE: [Timeframe; 4] = [
        Timeframe::FiveMin,
        Timeframe::FifteenMin,
        Timeframe::OneHour,
        Timeframe::OneDay,
    ];

    /// Resolutions reported per symbol, in presentation order.
    pub const REPORTED: [Timeframe; 8] = [
        Timeframe::TenMin,
        Timeframe::FifteenMin,
        Timeframe::ThirtyMin,
        Timeframe::OneHour,
        Timeframe::TwoHour,
        Timeframe::ThreeHour,
        Timeframe::FourHour,
        Timeframe::OneDay,
    ];

    /// Returns the duration of this timeframe in minutes
    pub fn to_minutes(&self) -> usize {
        match self {
            Timeframe::FiveMin => 5,
            Timeframe::TenMin => 10,
            Timeframe::FifteenMin => 15,
            Timeframe::ThirtyMin => 30,
            Timeframe::OneHour => 60,
            Timeframe::TwoHour => 120,
            Timeframe::ThreeHour => 180,
            Timeframe::FourHour => 240,
            Timeframe::OneDay => 1440,
        }
    }

    /// Returns the duration in seconds
    pub fn to_seconds(&self) -> i64 {
        (self.to_minutes() * 60) as i64
    }

    pub fn duration(&self) -> TimeDelta {
        TimeDelta::seconds(self.to_seconds())
    }

    /// Short label used in result tables (`10m`, `4h`, `1d`).
    pub fn label(&self) -> &'static str {
        match self {
            Timeframe::FiveMin => "5m",
            Timeframe::TenMin => "10m",
            Timeframe::FifteenMin => "15m",
            Timeframe::ThirtyMin => "30m",
            Timeframe::OneHour => "1h",
            Timeframe::TwoHour => "2h",
            Timeframe::ThreeHour => "3h",
            Timeframe::FourHour => "4h",
            Timeframe::OneDay => "1d",
        }
    }

    /// The base resolution this timeframe is built from.
    pub fn source(&self) -> Timeframe {
        match self {
            Timeframe::TenMin => Timeframe::FiveMin,
            Timeframe::ThirtyMin => Timeframe::FifteenMin,
            Timeframe::TwoHour | Timeframe::ThreeHour | Timeframe::FourHour => Timeframe::OneHour,
            other => *other,
        }
    }

    pub fn is_base(&self) -> bool {
        self.source() == *self
    }

    /// How far back a fetch for this resolution reaches.
    ///
    /// Sized so every derived timeframe still gets comfortably more than the
    /// 90 bars the classifier needs.
    pub fn history_window(&self) -> TimeDelta {
        match self.source() {
            Timeframe::FiveMin => TimeDelta::days(7),
            Timeframe::FifteenMin => TimeDelta::days(14),
            Timeframe::OneHour => TimeDelta::days(90),
            _ => TimeDelta::days(730),
        }
    }

    /// Converts to Alpaca API timeframe string
    pub fn to_alpaca_string(&self) -> &'static str {
        match self {
            Timeframe::FiveMin => "5Min",
            Timeframe::TenMin => "10Min",
            Timeframe::FifteenMin => "15Min",
            Timeframe::ThirtyMin => "30Min",
            Timeframe::OneHour => "1Hour",
            Timeframe::TwoHour => "2Hour",
            Timeframe::ThreeHour => "3Hour",
            Timeframe::FourHour => "4Hour",
            Timeframe::OneDay => "1Day",
        }
    }

    /// Converts to a Polygon aggregates `(multiplier, timespan)` pair
    pub fn to_polygon_range(&self) -> (u32, &'static str) {
        match self {
            Timeframe::OneDay => (1, "day"),
            tf if tf.to_minutes() % 60 == 0 => ((tf.to_minutes() / 60) as u32, "hour"),
            tf => (tf.to_minutes() as u32, "minute"),
        }
    }

    /// Number of `finer` bars that make up one bar of this timeframe, if it
    /// divides evenly.
    pub fn multiple_of(&self, finer: Timeframe) -> Option<usize> {
        let (coarse, fine) = (self.to_minutes(), finer.to_minutes());
        (coarse >= fine && coarse % fine == 0).then_some(coarse / fine)
    }
}

impl FromStr for Timeframe {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "5m" | "5min" | "fivemin" => Ok(Timeframe::FiveMin),
            "10m" | "10min" | "tenmin" => Ok(Timeframe::TenMin),
            "15m" | "15min" | "fifteenmin" => Ok(Timeframe::FifteenMin),
            "30m" | "30min" | "thirtymin" => Ok(Timeframe::ThirtyMin),
            "1h" | "1hour" | "onehour" => Ok(Timeframe::OneHour),
            "2h" | "2hour" | "twohour" => Ok(Timeframe::TwoHour),
            "3h" | "3hour" | "threehour" => Ok(Timeframe::ThreeHour),
            "4h" | "4hour" | "fourhour" => Ok(Timeframe::FourHour),
            "1d" | "1day" | "oneday" => Ok(Timeframe::OneDay),
            _ => Err(anyhow!(
                "Invalid timeframe: '{}'. Valid options: 5m, 10m, 15m, 30m, 1h, 2h, 3h, 4h, 1d",
                s
            )),
        }
    }
}

impl fmt::Display for Timeframe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_to_minutes() {
        assert_eq!(Timeframe::FiveMin.to_minutes(), 5);
        assert_eq!(Timeframe::TenMin.to_minutes(), 10);
        assert_eq!(Timeframe::ThreeHour.to_minutes(), 180);
        assert_eq!(Timeframe::OneDay.to_minutes(), 1440);
    }

    #[test]
    fn test_from_str() {
        assert_eq!(Timeframe::from_str("10m").unwrap(), Timeframe::TenMin);
        assert_eq!(Timeframe::from_str("1Hour").unwrap(), Timeframe::OneHour);
        assert_eq!(Timeframe::from_str(" 4h ").unwrap(), Timeframe::FourHour);
        assert_eq!(Timeframe::from_str("1d").unwrap(), Timeframe::OneDay);
        assert!(Timeframe::from_str("7m").is_err());
    }

    #[test]
    fn test_derivation_sources() {
        assert_eq!(Timeframe::TenMin.source(), Timeframe::FiveMin);
        assert_eq!(Timeframe::ThirtyMin.source(), Timeframe::FifteenMin);
        assert_eq!(Timeframe::TwoHour.source(), Timeframe::OneHour);
        assert_eq!(Timeframe::ThreeHour.source(), Timeframe::OneHour);
        assert_eq!(Timeframe::FourHour.source(), Timeframe::OneHour);
        for tf in Timeframe::BASE {
            assert!(tf.is_base());
        }
        assert!(!Timeframe::FourHour.is_base());
    }

    #[test]
    fn test_multiple_of() {
        assert_eq!(Timeframe::FourHour.multiple_of(Timeframe::OneHour), Some(4));
        assert_eq!(Timeframe::OneHour.multiple_of(Timeframe::OneHour), Some(1));
        assert_eq!(Timeframe::TenMin.multiple_of(Timeframe::FifteenMin), None);
        assert_eq!(Timeframe::OneHour.multiple_of(Timeframe::FourHour), None);
    }

    #[test]
    fn test_api_strings() {
        assert_eq!(Timeframe::FiveMin.to_alpaca_string(), "5Min");
        assert_eq!(Timeframe::OneDay.to_alpaca_string(), "1Day");
        assert_eq!(Timeframe::FiveMin.to_polygon_range(), (5, "minute"));
        assert_eq!(Timeframe::OneHour.to_polygon_range(), (1, "hour"));
        assert_eq!(Timeframe::FourHour.to_polygon_range(), (4, "hour"));
        assert_eq!(Timeframe::OneDay.to_polygon_range(), (1, "day"));
    }
}
