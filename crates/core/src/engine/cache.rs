//! Memoized breakdowns and recompute generations.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

use serde::Serialize;
use sha2::{Digest, Sha256};

use super::bridge::OfferBreakdown;
use crate::domain::basket::Basket;
use crate::domain::{CatalogVersion, OfferId};

#[derive(Serialize)]
struct CacheKeyInput<'a> {
    catalog_version: &'a CatalogVersion,
    basket: &'a Basket,
}

/// SHA-256 over the catalog version and the canonical basket JSON.
pub fn cache_key(catalog_version: &CatalogVersion, basket: &Basket) -> Option<String> {
    let canonical = serde_json::to_vec(&CacheKeyInput { catalog_version, basket }).ok()?;
    Some(sha256_hex(&canonical))
}

fn sha256_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    format!("{:x}", hasher.finalize())
}

#[derive(Debug, Default)]
struct CacheState {
    entries: HashMap<String, OfferBreakdown>,
    order: VecDeque<String>,
}

/// Bounded map from cache key to breakdown, evicting the oldest entry first.
#[derive(Debug)]
pub struct BreakdownCache {
    capacity: usize,
    state: Mutex<CacheState>,
}

impl BreakdownCache {
    pub fn new(capacity: usize) -> Self {
        Self { capacity: capacity.max(1), state: Mutex::new(CacheState::default()) }
    }

    pub fn get(&self, key: &str) -> Option<OfferBreakdown> {
        let state = self.state.lock().ok()?;
        state.entries.get(key).cloned()
    }

    pub fn insert(&self, key: String, breakdown: OfferBreakdown) {
        let Ok(mut state) = self.state.lock() else {
            return;
        };
        if state.entries.insert(key.clone(), breakdown).is_none() {
            state.order.push_back(key);
        }
        while state.order.len() > self.capacity {
            if let Some(oldest) = state.order.pop_front() {
                state.entries.remove(&oldest);
            }
        }
    }

    pub fn len(&self) -> usize {
        self.state.lock().map(|state| state.entries.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        if let Ok(mut state) = self.state.lock() {
            state.entries.clear();
            state.order.clear();
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct Generation(pub u64);

/// Per-basket generation counter; only the latest generation's result is authoritative.
#[derive(Debug, Default)]
pub struct RecomputeTracker {
    latest: Mutex<HashMap<OfferId, u64>>,
}

impl RecomputeTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a new input generation for `offer`.
    pub fn begin(&self, offer: &OfferId) -> Generation {
        let Ok(mut latest) = self.latest.lock() else {
            return Generation(0);
        };
        let next = latest.get(offer).map_or(1, |current| current.saturating_add(1));
        latest.insert(offer.clone(), next);
        Generation(next)
    }

    pub fn is_current(&self, offer: &OfferId, generation: Generation) -> bool {
        self.latest
            .lock()
            .map(|latest| latest.get(offer).copied() == Some(generation.0))
            .unwrap_or(false)
    }

    /// Returns `result` when `generation` is still the latest, otherwise discards it.
    pub fn accept<T>(&self, offer: &OfferId, generation: Generation, result: T) -> Option<T> {
        self.is_current(offer, generation).then_some(result)
    }
}

#[cfg(test)]
mod tests {
    use super::{cache_key, RecomputeTracker};
    use crate::domain::{CatalogVersion, OfferId};
    use crate::fixtures;

    #[test]
    fn key_depends_on_version_and_basket() {
        let basket = fixtures::scenario_basket();
        let october = CatalogVersion::from("2025-10");
        let september = CatalogVersion::from("2025-09");

        let first = cache_key(&october, &basket).expect("key");
        assert_eq!(first.len(), 64);
        assert!(first.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
        assert_eq!(Some(first.clone()), cache_key(&october, &basket));
        assert_ne!(Some(first.clone()), cache_key(&september, &basket));

        let mut edited = basket.clone();
        edited.items[0].quantity = 2;
        assert_ne!(Some(first), cache_key(&october, &edited));
    }

    #[test]
    fn stale_generations_are_discarded_per_offer() {
        let tracker = RecomputeTracker::new();
        let offer = OfferId::from("offer-1");
        let other = OfferId::from("offer-2");

        let first = tracker.begin(&offer);
        let unrelated = tracker.begin(&other);
        let second = tracker.begin(&offer);

        assert!(second > first);
        assert_eq!(tracker.accept(&offer, first, "stale"), None);
        assert_eq!(tracker.accept(&offer, second, "fresh"), Some("fresh"));
        assert!(tracker.is_current(&other, unrelated));
    }
}
