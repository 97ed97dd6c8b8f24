use crate::interval::Interval;
use std::collections::HashMap;
use typed_builder::TypedBuilder;

/// [`IntervalCacheConfig`] bundles the tunables of an [`IntervalCache`]
///
/// # Constructor(s)
/// When constructing [`IntervalCacheConfig`], one can use [`IntervalCacheConfig::builder`]
/// for a builder-style pattern, or [`IntervalCacheConfig::default`] for the stock limits
///
/// # Examples
/// ```
/// use chronosieve::cache::IntervalCacheConfig;
///
/// let config = IntervalCacheConfig::builder().max_size(32).build();
/// assert_eq!(config.max_ranges_per_entry, 10_000);
/// ```
#[derive(Debug, Clone, Copy, TypedBuilder)]
pub struct IntervalCacheConfig {
    /// Maximum number of entries held at once, the least recently used entry is evicted
    /// when a new key would exceed it
    #[builder(default = 10)]
    pub max_size: usize,

    /// Evaluation results with more intervals than this are handed back to the caller
    /// but never stored
    #[builder(default = 10_000)]
    pub max_ranges_per_entry: usize,
}

impl Default for IntervalCacheConfig {
    fn default() -> Self {
        Self {
            max_size: 10,
            max_ranges_per_entry: 10_000,
        }
    }
}

/// Hit / miss counters accumulated over the lifetime of an [`IntervalCache`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct CacheKey {
    hash: u64,
    start: i64,
    end: i64,
}

#[derive(Debug, Clone)]
struct CacheEntry {
    intervals: Vec<Interval>,
    start: i64,
    end: i64,
    last_accessed: u64,
}

/// [`IntervalCache`] memoizes evaluation results keyed by
/// `(block hash, domain start, domain end)`. Beyond exact-key hits it also answers a
/// narrower domain from any stored superset entry of the same block by binary-searching
/// the slice touching the requested range and clipping its edge intervals
///
/// # Recency
/// Recency is tracked with a logical counter bumped on every operation rather than wall
/// clock time, which keeps replacement order deterministic. Eviction scans linearly for
/// the smallest stamp, which is perfectly adequate at the default capacity of 10
///
/// # See Also
/// - [`IntervalCacheConfig`]
/// - [`Schedule`](crate::schedule::Schedule)
#[derive(Debug)]
pub struct IntervalCache {
    entries: HashMap<CacheKey, CacheEntry>,
    config: IntervalCacheConfig,
    clock: u64,
    stats: CacheStats,
}

impl IntervalCache {
    pub fn new(config: IntervalCacheConfig) -> Self {
        Self {
            entries: HashMap::new(),
            config,
            clock: 0,
            stats: CacheStats::default(),
        }
    }

    pub fn config(&self) -> IntervalCacheConfig {
        self.config
    }

    pub fn stats(&self) -> CacheStats {
        self.stats
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    fn tick(&mut self) -> u64 {
        self.clock += 1;
        self.clock
    }

    /// Looks up the cached result for ``hash`` over `[start, end]`. An exact key match
    /// returns a clone of the stored list; otherwise any same-hash entry whose stored
    /// domain is a superset yields the subset via binary search plus per-element clipping
    pub fn get(&mut self, hash: u64, start: i64, end: i64) -> Option<Vec<Interval>> {
        let stamp = self.tick();
        let exact = CacheKey { hash, start, end };
        if let Some(entry) = self.entries.get_mut(&exact) {
            entry.last_accessed = stamp;
            self.stats.hits += 1;
            return Some(entry.intervals.clone());
        }

        let superset = self
            .entries
            .iter_mut()
            .find(|(key, entry)| key.hash == hash && entry.start <= start && entry.end >= end);
        if let Some((_, entry)) = superset {
            entry.last_accessed = stamp;
            self.stats.hits += 1;
            let lower = entry.intervals.partition_point(|interval| interval.end < start);
            let upper = entry.intervals.partition_point(|interval| interval.start <= end);
            return Some(
                entry.intervals[lower..upper]
                    .iter()
                    .filter_map(|interval| interval.clip(start, end))
                    .collect(),
            );
        }

        self.stats.misses += 1;
        None
    }

    /// Stores a defensive copy of ``intervals`` under `(hash, start, end)`. Same-hash
    /// entries whose domain the new range covers become redundant and are dropped first,
    /// then the least recently used entry is evicted if the cache is still full. Lists
    /// longer than the configured per-entry limit are not stored at all
    pub fn set(&mut self, hash: u64, start: i64, end: i64, intervals: &[Interval]) {
        if intervals.len() > self.config.max_ranges_per_entry {
            return;
        }
        let stamp = self.tick();
        let key = CacheKey { hash, start, end };
        self.entries
            .retain(|k, entry| !(k.hash == hash && entry.start >= start && entry.end <= end));
        if self.entries.len() >= self.config.max_size {
            self.evict_lru();
        }
        self.entries.insert(
            key,
            CacheEntry {
                intervals: intervals.to_vec(),
                start,
                end,
                last_accessed: stamp,
            },
        );
    }

    fn evict_lru(&mut self) {
        let victim = self
            .entries
            .iter()
            .min_by_key(|(_, entry)| entry.last_accessed)
            .map(|(key, _)| *key);
        if let Some(key) = victim {
            self.entries.remove(&key);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn iv(start: i64, end: i64) -> Interval {
        Interval::new(start, end).unwrap()
    }

    #[test]
    fn test_exact_hit_returns_clone() {
        let mut cache = IntervalCache::new(IntervalCacheConfig::default());
        cache.set(1, 0, 100, &[iv(10, 20)]);
        assert_eq!(cache.get(1, 0, 100), Some(vec![iv(10, 20)]));
        assert_eq!(cache.stats().hits, 1);
        assert_eq!(cache.get(2, 0, 100), None);
        assert_eq!(cache.stats().misses, 1);
    }

    #[test]
    fn test_subset_extraction_clips_edges() {
        let mut cache = IntervalCache::new(IntervalCacheConfig::default());
        cache.set(7, 0, 100, &[iv(0, 30), iv(40, 60), iv(80, 100)]);
        let subset = cache.get(7, 25, 85).unwrap();
        assert_eq!(subset, vec![iv(25, 30), iv(40, 60), iv(80, 85)]);
    }

    #[test]
    fn test_subset_entries_dropped_on_wider_set() {
        let mut cache = IntervalCache::new(IntervalCacheConfig::default());
        cache.set(7, 40, 60, &[iv(45, 50)]);
        cache.set(7, 0, 100, &[iv(45, 50)]);
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.get(7, 40, 60), Some(vec![iv(45, 50)]));
    }

    #[test]
    fn test_lru_eviction_order() {
        let config = IntervalCacheConfig::builder().max_size(2).build();
        let mut cache = IntervalCache::new(config);
        cache.set(1, 0, 10, &[iv(0, 5)]);
        cache.set(2, 0, 10, &[iv(1, 6)]);
        // touch the first entry so the second becomes the eviction victim
        assert!(cache.get(1, 0, 10).is_some());
        cache.set(3, 0, 10, &[iv(2, 7)]);
        assert!(cache.get(1, 0, 10).is_some());
        assert!(cache.get(2, 0, 10).is_none());
        assert!(cache.get(3, 0, 10).is_some());
    }

    #[test]
    fn test_oversized_results_are_not_stored() {
        let config = IntervalCacheConfig::builder().max_ranges_per_entry(2).build();
        let mut cache = IntervalCache::new(config);
        cache.set(1, 0, 100, &[iv(0, 1), iv(3, 4), iv(6, 7)]);
        assert!(cache.is_empty());
    }
}
