use super::SeriesMap;
use crate::domain::market::timeframe::Timeframe;
use sha2::{Digest, Sha256};
use std::collections::{BTreeSet, HashMap};
use std::sync::{Arc, RwLock};
use std::time::{Duration, Instant};
use tracing::{error, trace};

/// `(symbol-set fingerprint, resolution)`
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub fingerprint: String,
    pub resolution: Timeframe,
}

impl CacheKey {
    pub fn new(symbols: &BTreeSet<String>, resolution: Timeframe) -> Self {
        Self {
            fingerprint: fingerprint(symbols),
            resolution,
        }
    }
}

/// SHA-256 over the sorted symbol set, hex encoded
pub fn fingerprint(symbols: &BTreeSet<String>) -> String {
    let mut hasher = Sha256::new();
    for symbol in symbols {
        hasher.update(symbol.as_bytes());
        hasher.update(b"\n");
    }
    hex::encode(hasher.finalize())
}

/// Short-lived cache of fetch results
pub struct BarCache {
    ttl: Duration,
    entries: RwLock<HashMap<CacheKey, (Instant, Arc<SeriesMap>)>>,
}

impl BarCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: RwLock::new(HashMap::new()),
        }
    }

    pub fn get(&self, key: &CacheKey) -> Option<Arc<SeriesMap>> {
        if self.ttl.is_zero() {
            return None;
        }
        let entries = match self.entries.read() {
            Ok(guard) => guard,
            Err(poisoned) => {
                error!("BarCache: lock poisoned during read, recovering");
                poisoned.into_inner()
            }
        };
        let (stored_at, value) = entries.get(key)?;
        if stored_at.elapsed() < self.ttl {
            trace!("BarCache: HIT for {} {}", key.resolution, key.fingerprint);
            Some(value.clone())
        } else {
            None
        }
    }

    pub fn insert(&self, key: CacheKey, value: Arc<SeriesMap>) {
        if self.ttl.is_zero() {
            return;
        }
        let mut entries = match self.entries.write() {
            Ok(guard) => guard,
            Err(poisoned) => {
                error!("BarCache: lock poisoned during write, recovering");
                poisoned.into_inner()
            }
        };
        let ttl = self.ttl;
        entries.retain(|_, (stored_at, _)| stored_at.elapsed() < ttl);
        entries.insert(key, (Instant::now(), value));
    }

    pub fn len(&self) -> usize {
        match self.entries.read() {
            Ok(guard) => guard.len(),
            Err(poisoned) => poisoned.into_inner().len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set(symbols: &[&str]) -> BTreeSet<String> {
        symbols.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_fingerprint_is_order_independent() {
        let a = fingerprint(&set(&["NVDA", "AAPL", "AMD"]));
        let b = fingerprint(&set(&["AMD", "NVDA", "AAPL", "AAPL"]));
        assert_eq!(a, b);
        assert_eq!(a.len(), 64);
        assert_ne!(a, fingerprint(&set(&["AAPL"])));
    }

    #[test]
    fn test_keys_differ_by_resolution() {
        let symbols = set(&["AAPL"]);
        assert_ne!(
            CacheKey::new(&symbols, Timeframe::FiveMin),
            CacheKey::new(&symbols, Timeframe::OneHour)
        );
    }

    #[test]
    fn test_expiry() {
        let cache = BarCache::new(Duration::from_millis(20));
        let key = CacheKey::new(&set(&["AAPL"]), Timeframe::OneDay);
        cache.insert(key.clone(), Arc::new(SeriesMap::new()));

        assert!(cache.get(&key).is_some());
        std::thread::sleep(Duration::from_millis(40));
        assert!(cache.get(&key).is_none());
    }

    #[test]
    fn test_zero_ttl_disables_cache() {
        let cache = BarCache::new(Duration::ZERO);
        let key = CacheKey::new(&set(&["AAPL"]), Timeframe::OneDay);
        cache.insert(key.clone(), Arc::new(SeriesMap::new()));
        assert!(cache.get(&key).is_none());
        assert!(cache.is_empty());
    }
}
