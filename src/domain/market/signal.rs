use crate::domain::market::bar::AnnotatedBar;
use crate::domain::market::timeframe::Timeframe;
use anyhow::{Result, anyhow};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Classification assigned to one symbol at one timeframe
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SignalLabel {
    StrongBuy,
    Buy40pct,
    SniperShort,
    Sell40pct,
    FlattenShort,
    BreakLadder,
    None,
}

impl SignalLabel {
    pub fn as_str(&self) -> &'static str {
        match self {
            SignalLabel::StrongBuy => "STRONG BUY",
            SignalLabel::Buy40pct => "BUY 40%",
            SignalLabel::SniperShort => "SNIPER SHORT",
            SignalLabel::Sell40pct => "SELL 40%",
            SignalLabel::FlattenShort => "FLATTEN SHORT",
            SignalLabel::BreakLadder => "BREAK LADDER",
            SignalLabel::None => "NONE",
        }
    }

    pub fn is_actionable(&self) -> bool {
        *self != SignalLabel::None
    }
}

impl fmt::Display for SignalLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Which labels the classifier is allowed to emit.
///
/// `Core` is the reduced set used by the real-time dashboard: the flatten and
/// ladder-break rules are switched off and fall through to `None`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SignalSet {
    #[default]
    Full,
    Core,
}

impl SignalSet {
    pub fn permits(&self, label: SignalLabel) -> bool {
        match self {
            SignalSet::Full => true,
            SignalSet::Core => !matches!(
                label,
                SignalLabel::FlattenShort | SignalLabel::BreakLadder
            ),
        }
    }
}

impl FromStr for SignalSet {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "full" => Ok(SignalSet::Full),
            "core" => Ok(SignalSet::Core),
            _ => Err(anyhow!("Invalid signal set: '{}'. Valid options: full, core", s)),
        }
    }
}

/// Everything the classifier looked at for one decision.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Diagnostic {
    pub symbol: String,
    pub timeframe: Timeframe,
    pub label: SignalLabel,
    pub evaluated_at: DateTime<Utc>,
    /// Start of the bar treated as "current"
    pub current_bar: DateTime<Utc>,
    /// False when the latest bar was still forming and got skipped
    pub last_bar_closed: bool,
    pub previous_close: f64,
    pub current_close: f64,
    pub ema_blue_high: f64,
    pub ema_blue_low: f64,
    pub ema_yellow_high: f64,
    pub ema_yellow_low: f64,
    pub volume: u64,
    pub volume_avg: f64,
    pub volume_ratio: f64,
    pub rsi: f64,
    pub slope: f64,
    pub crossover: bool,
    pub crossunder: bool,
    pub volume_breakout: bool,
    pub is_flat: bool,
    pub is_bear_trend: bool,
    /// Tail of the annotated series, oldest first
    pub recent_bars: Vec<AnnotatedBar>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_label_display() {
        assert_eq!(SignalLabel::StrongBuy.to_string(), "STRONG BUY");
        assert_eq!(SignalLabel::Sell40pct.to_string(), "SELL 40%");
        assert!(!SignalLabel::None.is_actionable());
    }

    #[test]
    fn test_signal_set_permits() {
        assert!(SignalSet::Full.permits(SignalLabel::BreakLadder));
        assert!(!SignalSet::Core.permits(SignalLabel::FlattenShort));
        assert!(!SignalSet::Core.permits(SignalLabel::BreakLadder));
        assert!(SignalSet::Core.permits(SignalLabel::SniperShort));
    }

    #[test]
    fn test_signal_set_from_str() {
        assert_eq!(SignalSet::from_str("CORE").unwrap(), SignalSet::Core);
        assert_eq!(SignalSet::from_str("full").unwrap(), SignalSet::Full);
        assert!(SignalSet::from_str("partial").is_err());
    }
}
