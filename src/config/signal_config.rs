//! Signal configuration parsing from environment variables.
//!
//! Classifier thresholds, resample alignment and session hours, and the
//! optional diagnostic target.

use super::{Lookup, env_lookup, parse_var, string_var};
use crate::application::classifier::ClassifierConfig;
use crate::application::scanner::DebugTarget;
use crate::domain::market::session::DEFAULT_MARKET_TIMEZONE;
use crate::domain::market::signal::SignalSet;
use crate::domain::market::timeframe::Timeframe;
use anyhow::{Result, anyhow, bail};
use chrono_tz::Tz;
use std::str::FromStr;

const MAX_OFFSET_MINUTES: i64 = 24 * 60;

#[derive(Debug, Clone)]
pub struct SignalEnvConfig {
    pub classifier: ClassifierConfig,
    pub resample_offset_minutes: i64,
    pub market_timezone: Tz,
    /// Drop pre- and post-market intraday bars before classification
    pub regular_hours_only: bool,
    pub debug_target: Option<DebugTarget>,
}

impl Default for SignalEnvConfig {
    fn default() -> Self {
        Self {
            classifier: ClassifierConfig::default(),
            resample_offset_minutes: 0,
            market_timezone: DEFAULT_MARKET_TIMEZONE,
            regular_hours_only: true,
            debug_target: None,
        }
    }
}

impl SignalEnvConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(&env_lookup)
    }

    pub fn from_lookup(lookup: Lookup) -> Result<Self> {
        let defaults = ClassifierConfig::default();

        let volume_breakout_multiplier = parse_var(
            lookup,
            "VOLUME_BREAKOUT_MULTIPLIER",
            defaults.volume_breakout_multiplier,
        )?;
        if !volume_breakout_multiplier.is_finite() || volume_breakout_multiplier <= 0.0 {
            bail!(
                "VOLUME_BREAKOUT_MULTIPLIER must be positive, got {}",
                volume_breakout_multiplier
            );
        }

        let flat_slope_threshold =
            parse_var(lookup, "FLAT_SLOPE_THRESHOLD", defaults.flat_slope_threshold)?;
        if flat_slope_threshold < 0.0 {
            bail!("FLAT_SLOPE_THRESHOLD must not be negative");
        }

        let min_bars = parse_var(lookup, "MIN_BARS", defaults.min_bars)?;
        // The slope reference bar must exist inside the evaluated window.
        if min_bars <= defaults.slope_lookback + 1 {
            bail!(
                "MIN_BARS must exceed {}, got {}",
                defaults.slope_lookback + 1,
                min_bars
            );
        }

        let classifier = ClassifierConfig {
            volume_breakout_multiplier,
            flat_slope_threshold,
            min_bars,
            signal_set: SignalSet::from_str(&string_var(lookup, "SIGNAL_SET", "full"))?,
            ..defaults
        };

        let resample_offset_minutes = parse_var(lookup, "RESAMPLE_ALIGNMENT_OFFSET_MINUTES", 0i64)?;
        if !(1 - MAX_OFFSET_MINUTES..MAX_OFFSET_MINUTES).contains(&resample_offset_minutes) {
            bail!(
                "RESAMPLE_ALIGNMENT_OFFSET_MINUTES must lie within +/-{}, got {}",
                MAX_OFFSET_MINUTES - 1,
                resample_offset_minutes
            );
        }

        let market_timezone = match lookup("MARKET_TIMEZONE") {
            Some(name) => Tz::from_str(name.trim())
                .map_err(|e| anyhow!("Invalid MARKET_TIMEZONE '{}': {}", name, e))?,
            None => DEFAULT_MARKET_TIMEZONE,
        };

        let debug_target = match lookup("DEBUG_SYMBOL") {
            Some(symbol) => {
                let timeframe = Timeframe::from_str(&string_var(lookup, "DEBUG_TIMEFRAME", "1h"))?;
                Some(Self::validate_debug_target(&symbol, timeframe)?)
            }
            None => None,
        };

        Ok(Self {
            classifier,
            resample_offset_minutes,
            market_timezone,
            regular_hours_only: parse_var(lookup, "REGULAR_HOURS_ONLY", true)?,
            debug_target,
        })
    }

    /// Validates a diagnostic target; only reported timeframes are classified.
    pub fn validate_debug_target(symbol: &str, timeframe: Timeframe) -> Result<DebugTarget> {
        if symbol.trim().is_empty() {
            bail!("DEBUG_SYMBOL must not be blank");
        }
        if !Timeframe::REPORTED.contains(&timeframe) {
            bail!(
                "DEBUG_TIMEFRAME {} is not a reported timeframe (one of {})",
                timeframe,
                Timeframe::REPORTED
                    .iter()
                    .map(|tf| tf.label())
                    .collect::<Vec<_>>()
                    .join(", ")
            );
        }
        Ok(DebugTarget::new(symbol, timeframe))
    }
}
