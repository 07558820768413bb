//! Universe configuration parsing from environment variables.
//!
//! Where the symbol groups come from and how often they are rescanned.

use super::{Lookup, env_lookup, parse_var};
use crate::domain::market::universe::SymbolUniverse;
use anyhow::{Context, Result};
use std::fs;
use std::path::PathBuf;
use std::time::Duration;
use tracing::{info, warn};

pub const MIN_REFRESH_SECS: u64 = 10;
pub const MAX_REFRESH_SECS: u64 = 300;

#[derive(Debug, Clone)]
pub struct UniverseEnvConfig {
    /// TOML universe file; the built-in sector lists are used when unset
    pub universe_file: Option<PathBuf>,
    pub refresh_interval: Duration,
}

impl Default for UniverseEnvConfig {
    fn default() -> Self {
        Self {
            universe_file: None,
            refresh_interval: Duration::from_secs(15),
        }
    }
}

impl UniverseEnvConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(&env_lookup)
    }

    pub fn from_lookup(lookup: Lookup) -> Result<Self> {
        let requested = parse_var(lookup, "REFRESH_INTERVAL_SECS", 15u64)?;
        Ok(Self {
            universe_file: lookup("UNIVERSE_FILE").map(PathBuf::from),
            refresh_interval: Duration::from_secs(Self::clamp_refresh(requested)),
        })
    }

    /// Keeps the refresh cadence inside the supported 10-300 s range.
    pub fn clamp_refresh(secs: u64) -> u64 {
        let clamped = secs.clamp(MIN_REFRESH_SECS, MAX_REFRESH_SECS);
        if clamped != secs {
            warn!(
                "Config: refresh interval {}s outside {}-{}s, using {}s",
                secs, MIN_REFRESH_SECS, MAX_REFRESH_SECS, clamped
            );
        }
        clamped
    }

    pub fn load_universe(&self) -> Result<SymbolUniverse> {
        let Some(path) = &self.universe_file else {
            info!("Config: no UNIVERSE_FILE set, using built-in sector lists");
            return Ok(SymbolUniverse::default_sectors());
        };

        let raw = fs::read_to_string(path)
            .with_context(|| format!("Failed to read universe file {}", path.display()))?;
        let universe = SymbolUniverse::from_toml_str(&raw)
            .with_context(|| format!("Failed to parse universe file {}", path.display()))?;

        info!(
            "Config: loaded {} groups ({} unique symbols) from {}",
            universe.groups().len(),
            universe.unique_symbols().len(),
            path.display()
        );
        Ok(universe)
    }
}
