use crate::domain::errors::UniverseError;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// A named, ordered list of ticker symbols (a sector or watchlist)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SymbolGroup {
    pub name: String,
    #[serde(default)]
    pub symbols: Vec<String>,
}

impl SymbolGroup {
    pub fn new(name: impl Into<String>, symbols: &[&str]) -> Self {
        Self {
            name: name.into(),
            symbols: symbols.iter().map(|s| s.to_string()).collect(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddOutcome {
    Added,
    AlreadyPresent,
}

/// Ordered mapping of group name to ordered symbol list.
///
/// A symbol may appear in several groups. The scanner works on a
/// [`snapshot`](SymbolUniverse::snapshot), so edits made while a cycle is
/// running only show up in the next one.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SymbolUniverse {
    #[serde(rename = "group", default)]
    groups: Vec<SymbolGroup>,
}

pub fn normalize_symbol(raw: &str) -> String {
    raw.trim().to_uppercase()
}

impl SymbolUniverse {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_groups(groups: Vec<SymbolGroup>) -> Self {
        let groups = groups
            .into_iter()
            .map(|g| SymbolGroup {
                name: g.name,
                symbols: g
                    .symbols
                    .iter()
                    .map(|s| normalize_symbol(s))
                    .filter(|s| !s.is_empty())
                    .collect(),
            })
            .collect();
        Self { groups }
    }

    /// Parses a universe file:
    ///
    /// ```toml
    /// [[group]]
    /// name = "Semiconductors"
    /// symbols = ["NVDA", "AMD"]
    /// ```
    pub fn from_toml_str(raw: &str) -> Result<Self, UniverseError> {
        let parsed: SymbolUniverse = toml::from_str(raw).map_err(|e| UniverseError::Parse {
            reason: e.to_string(),
        })?;

        let mut seen = HashSet::new();
        for group in &parsed.groups {
            if !seen.insert(group.name.as_str()) {
                return Err(UniverseError::DuplicateGroup {
                    name: group.name.clone(),
                });
            }
        }
        Ok(Self::from_groups(parsed.groups))
    }

    pub fn groups(&self) -> &[SymbolGroup] {
        &self.groups
    }

    pub fn group(&self, name: &str) -> Option<&SymbolGroup> {
        self.groups.iter().find(|g| g.name == name)
    }

    pub fn add_group(&mut self, name: impl Into<String>) -> Result<(), UniverseError> {
        let name = name.into();
        if self.group(&name).is_some() {
            return Err(UniverseError::DuplicateGroup { name });
        }
        self.groups.push(SymbolGroup {
            name,
            symbols: Vec::new(),
        });
        Ok(())
    }

    /// Inserts `raw` at the front of `group` unless it is already listed there.
    pub fn add_symbol(&mut self, group: &str, raw: &str) -> Result<AddOutcome, UniverseError> {
        let symbol = normalize_symbol(raw);
        if symbol.is_empty() {
            return Err(UniverseError::EmptySymbol);
        }
        let target = self.group_mut(group)?;
        if target.symbols.contains(&symbol) {
            return Ok(AddOutcome::AlreadyPresent);
        }
        target.symbols.insert(0, symbol);
        Ok(AddOutcome::Added)
    }

    /// Returns whether the symbol was present.
    pub fn remove_symbol(&mut self, group: &str, raw: &str) -> Result<bool, UniverseError> {
        let symbol = normalize_symbol(raw);
        let target = self.group_mut(group)?;
        let before = target.symbols.len();
        target.symbols.retain(|s| *s != symbol);
        Ok(target.symbols.len() != before)
    }

    /// Every symbol once, in first-seen configuration order.
    pub fn unique_symbols(&self) -> Vec<String> {
        let mut seen = HashSet::new();
        self.groups
            .iter()
            .flat_map(|g| g.symbols.iter())
            .filter(|s| seen.insert(s.as_str()))
            .cloned()
            .collect()
    }

    pub fn snapshot(&self) -> SymbolUniverse {
        self.clone()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.iter().all(|g| g.symbols.is_empty())
    }

    fn group_mut(&mut self, name: &str) -> Result<&mut SymbolGroup, UniverseError> {
        self.groups
            .iter_mut()
            .find(|g| g.name == name)
            .ok_or_else(|| UniverseError::UnknownGroup {
                name: name.to_string(),
            })
    }

    /// Sector lists used when no universe file is configured.
    pub fn default_sectors() -> Self {
        Self::from_groups(vec![
            SymbolGroup::new("Current Positions", &["APLD", "CLSK"]),
            SymbolGroup::new(
                "Tech Leaders",
                &[
                    "TSLA", "NVDA", "AAPL", "AMZN", "META", "NFLX", "ORCL", "PLTR", "MU", "AMD",
                    "AVGO", "TSM", "QCOM", "ADBE", "DIS",
                ],
            ),
            SymbolGroup::new(
                "Nvidia Holdings",
                &["NVDA", "APLD", "CRWV", "NBIS", "ARM", "WRD", "RXRX"],
            ),
            SymbolGroup::new(
                "Nuclear",
                &["SMR", "OKLO", "UUUU", "NEE", "VST", "UEC", "NXE", "DJT", "LEU"],
            ),
            SymbolGroup::new("Quantum Computing", &["QBTS", "RGTI", "IONQ", "QUBT", "LAES"]),
            SymbolGroup::new(
                "AI Software",
                &[
                    "PLTR", "SOUN", "PATH", "TTD", "PINS", "ZETA", "TEM", "SHOP", "DOCU", "FIG",
                    "RDDT", "SNOW", "MDB",
                ],
            ),
            SymbolGroup::new(
                "Trump Trade",
                &[
                    "TSLA", "MARA", "DJT", "MSTR", "XOM", "CLSK", "RIOT", "COIN", "RUM", "UNH",
                ],
            ),
            SymbolGroup::new("Autonomous Driving", &["TSLA", "UBER"]),
            SymbolGroup::new("AI Chips", &["INTC", "NVDA", "TSM"]),
            SymbolGroup::new(
                "Crypto",
                &[
                    "ASST", "SOFI", "BMNR", "BTBT", "BITF", "MARA", "MSTR", "IREN", "CLSK", "HOOD",
                    "HIVE", "RIOT", "WULF", "CIFR", "GME", "COIN", "CRCL", "SBET", "GLXY", "HUT",
                    "BTDR", "DJT",
                ],
            ),
            SymbolGroup::new("Robotics", &["TSLA", "MBLY", "PATH", "RR", "SERV", "PDYN"]),
            SymbolGroup::new(
                "Drones",
                &["ONDS", "ACHR", "JOBY", "RCAT", "KTOS", "UMAC", "AVAV"],
            ),
            SymbolGroup::new(
                "Artificial Intelligence",
                &["NVDA", "INTC", "SMCI", "NVTS", "AMD", "TSM", "AVGO", "QCOM"],
            ),
            SymbolGroup::new(
                "Semiconductors",
                &[
                    "INTC", "NVDA", "MU", "AMD", "AVGO", "LRCX", "TSM", "AMAT", "SMCI", "NVTS",
                ],
            ),
            SymbolGroup::new(
                "Space",
                &[
                    "RKLB", "ASTS", "SIDU", "RDW", "PL", "LUNR", "SATS", "VSAT", "DXYZ", "FJET",
                ],
            ),
            SymbolGroup::new(
                "Rare Earths",
                &["CRML", "UAMY", "UUUU", "MP", "USAR", "AREC", "NB", "EOSE"],
            ),
            SymbolGroup::new(
                "Lithium & Batteries",
                &["LAC", "QS", "LAR", "ENVX", "SGML", "ALAB"],
            ),
            SymbolGroup::new("Storage", &["MU", "SNDK", "WDC", "STX"]),
            SymbolGroup::new("Watchlist", &["APLD", "CLSK"]),
        ])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> SymbolUniverse {
        SymbolUniverse::from_groups(vec![
            SymbolGroup::new("Chips", &["NVDA", "AMD"]),
            SymbolGroup::new("Mega", &["AAPL", "NVDA"]),
        ])
    }

    #[test]
    fn test_add_symbol_inserts_at_front() {
        let mut universe = sample();
        let outcome = universe.add_symbol("Chips", "  intc ").unwrap();

        assert_eq!(outcome, AddOutcome::Added);
        assert_eq!(universe.group("Chips").unwrap().symbols, vec!["INTC", "NVDA", "AMD"]);
    }

    #[test]
    fn test_add_existing_symbol_is_noop() {
        let mut universe = sample();
        let outcome = universe.add_symbol("Chips", "amd").unwrap();

        assert_eq!(outcome, AddOutcome::AlreadyPresent);
        assert_eq!(universe.group("Chips").unwrap().symbols.len(), 2);
    }

    #[test]
    fn test_unknown_group_and_empty_symbol() {
        let mut universe = sample();
        assert!(matches!(
            universe.add_symbol("Nope", "TSLA"),
            Err(UniverseError::UnknownGroup { .. })
        ));
        assert_eq!(universe.add_symbol("Chips", "   "), Err(UniverseError::EmptySymbol));
        assert!(universe.add_group("Chips").is_err());
    }

    #[test]
    fn test_remove_symbol() {
        let mut universe = sample();
        assert!(universe.remove_symbol("Mega", "nvda").unwrap());
        assert!(!universe.remove_symbol("Mega", "NVDA").unwrap());
        // still listed in the other group
        assert!(universe.group("Chips").unwrap().symbols.contains(&"NVDA".to_string()));
    }

    #[test]
    fn test_unique_symbols_first_seen_order() {
        assert_eq!(sample().unique_symbols(), vec!["NVDA", "AMD", "AAPL"]);
    }

    #[test]
    fn test_snapshot_is_detached() {
        let mut universe = sample();
        let snapshot = universe.snapshot();
        universe.add_symbol("Chips", "TSLA").unwrap();

        assert_eq!(snapshot.group("Chips").unwrap().symbols.len(), 2);
    }

    #[test]
    fn test_from_toml() {
        let raw = r#"
            [[group]]
            name = "Space"
            symbols = ["rklb", "ASTS"]

            [[group]]
            name = "Empty"
        "#;
        let universe = SymbolUniverse::from_toml_str(raw).unwrap();

        assert_eq!(universe.groups().len(), 2);
        assert_eq!(universe.group("Space").unwrap().symbols, vec!["RKLB", "ASTS"]);
        assert!(universe.group("Empty").unwrap().symbols.is_empty());
    }

    #[test]
    fn test_from_toml_rejects_duplicate_groups() {
        let raw = r#"
            [[group]]
            name = "A"
            symbols = ["X"]
            [[group]]
            name = "A"
            symbols = ["Y"]
        "#;
        assert!(matches!(
            SymbolUniverse::from_toml_str(raw),
            Err(UniverseError::DuplicateGroup { .. })
        ));
        assert!(matches!(
            SymbolUniverse::from_toml_str("group = 3"),
            Err(UniverseError::Parse { .. })
        ));
    }

    #[test]
    fn test_default_sectors() {
        let universe = SymbolUniverse::default_sectors();
        assert_eq!(universe.groups().len(), 19);
        assert!(!universe.is_empty());
    }
}
