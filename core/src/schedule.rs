use crate::block::Block;
use crate::cache::{CacheStats, IntervalCache, IntervalCacheConfig};
use crate::errors::ChronoSieveErrors;
use crate::interval::Interval;
use dashmap::DashMap;
use std::sync::{Arc, Mutex};

/// [`ScheduleEntry`] is the payload a [`Schedule`] stores per identifier: the owned block
/// tree plus a human-readable display name
#[derive(Debug, Clone)]
pub struct ScheduleEntry {
    pub name: String,
    pub block: Arc<Block>,
}

/// [`Schedule`] is the registry mapping alphanumeric identifiers to named block trees. It
/// is the resolution context handed to `REF[...]` nodes during evaluation and it owns the
/// [`IntervalCache`] that memoizes [`Schedule::evaluate`] results
///
/// # Constructor(s)
/// When constructing a [`Schedule`], one can use [`Schedule::new`] for the stock cache
/// limits or [`Schedule::with_config`] to tune them via [`IntervalCacheConfig`]
///
/// # Concurrency
/// The registry map tolerates concurrent readers, the cache sits behind a mutex and is
/// touched only at the [`Schedule::evaluate`] boundary. Evaluation itself borrows entries
/// as immutable snapshots (each lookup clones the entry's ``Arc``), so replacing an entry
/// mid-evaluation never invalidates a walk already in flight
///
/// # Examples
/// ```
/// use chronosieve::parser::parse_expression;
/// use chronosieve::schedule::Schedule;
///
/// let schedule = Schedule::new();
/// let hours = parse_expression("T[9:00..17:00] AND WD[1..5]").unwrap();
/// schedule.set("businesshours", "Business hours", hours, true).unwrap();
///
/// let exclusion = parse_expression("NOT REF[businesshours]").unwrap();
/// let off_hours = exclusion.evaluate(0, 86_399_999, Some(&schedule), true).unwrap();
/// assert!(!off_hours.is_empty());
/// ```
///
/// # See Also
/// - [`Block`]
/// - [`IntervalCache`]
#[derive(Debug)]
pub struct Schedule {
    entries: DashMap<String, ScheduleEntry>,
    cache: Mutex<IntervalCache>,
}

impl Schedule {
    pub fn new() -> Self {
        Self::with_config(IntervalCacheConfig::default())
    }

    pub fn with_config(config: IntervalCacheConfig) -> Self {
        Self {
            entries: DashMap::new(),
            cache: Mutex::new(IntervalCache::new(config)),
        }
    }

    /// Registers ``block`` under ``id``
    ///
    /// # Argument(s)
    /// This method accepts the alphanumeric identifier ``id``, a display ``name``, the
    /// ``block`` tree to own, and the ``overwrite`` flag deciding whether an existing
    /// entry under the same identifier may be replaced
    ///
    /// # Returns
    /// Nothing on success, a [`ChronoSieveErrors::InvalidID`] for malformed identifiers
    /// or a [`ChronoSieveErrors::ValidationError`] when the identifier is taken and
    /// ``overwrite`` is false
    pub fn set(
        &self,
        id: impl Into<String>,
        name: impl Into<String>,
        block: Block,
        overwrite: bool,
    ) -> Result<(), ChronoSieveErrors> {
        let id = id.into();
        if id.is_empty() || !id.bytes().all(|byte| byte.is_ascii_alphanumeric()) {
            return Err(ChronoSieveErrors::InvalidID(id));
        }
        if !overwrite && self.entries.contains_key(&id) {
            return Err(ChronoSieveErrors::ValidationError(
                id,
                "an identifier that is not already registered".to_owned(),
            ));
        }
        self.entries.insert(
            id,
            ScheduleEntry {
                name: name.into(),
                block: Arc::new(block),
            },
        );
        Ok(())
    }

    /// Fetches the entry registered under ``id``, cloning is cheap since the block tree
    /// sits behind an ``Arc``
    pub fn get(&self, id: &str) -> Option<ScheduleEntry> {
        self.entries.get(id).map(|entry| entry.value().clone())
    }

    /// Removes the entry registered under ``id``, reporting whether one existed
    pub fn remove(&self, id: &str) -> bool {
        self.entries.remove(id).is_some()
    }

    /// Evaluates the block registered under ``id`` over the inclusive domain
    /// `[start, end]`, with the root merge argument fixed to true
    ///
    /// # Argument(s)
    /// Besides the domain endpoints this method accepts ``cache_after`` which decides
    /// whether a freshly computed result is offered to the cache (results larger than the
    /// configured per-entry limit are never stored either way)
    ///
    /// # Returns
    /// The sorted interval list, a [`ChronoSieveErrors::ReferenceError`] when ``id`` is
    /// not registered, or whichever error the evaluation itself raised
    ///
    /// # See Also
    /// - [`Block::evaluate`]
    /// - [`IntervalCache`]
    pub fn evaluate(
        &self,
        id: &str,
        start: i64,
        end: i64,
        cache_after: bool,
    ) -> Result<Vec<Interval>, ChronoSieveErrors> {
        let block = self.resolve(id).ok_or_else(|| {
            ChronoSieveErrors::ReferenceError(
                id.to_owned(),
                "no entry with this identifier exists".to_owned(),
            )
        })?;
        let hash = block.hash();
        if let Ok(mut cache) = self.cache.lock() {
            if let Some(intervals) = cache.get(hash, start, end) {
                return Ok(intervals);
            }
        }
        let intervals = block.evaluate(start, end, Some(self), true)?;
        if cache_after {
            if let Ok(mut cache) = self.cache.lock() {
                cache.set(hash, start, end, &intervals);
            }
        }
        Ok(intervals)
    }

    /// Answers whether the block registered under ``id`` holds at the timestamp ``t``
    pub fn evaluate_timestamp(&self, id: &str, t: i64) -> Result<bool, ChronoSieveErrors> {
        let block = self.resolve(id).ok_or_else(|| {
            ChronoSieveErrors::ReferenceError(
                id.to_owned(),
                "no entry with this identifier exists".to_owned(),
            )
        })?;
        block.evaluate_timestamp(t, Some(self))
    }

    /// Snapshot of the referenced block for `REF[...]` resolution. The ``Arc`` is cloned
    /// out of the map guard before any recursion happens
    pub(crate) fn resolve(&self, id: &str) -> Option<Arc<Block>> {
        self.entries
            .get(id)
            .map(|entry| Arc::clone(&entry.value().block))
    }

    pub fn ids(&self) -> Vec<String> {
        self.entries.iter().map(|entry| entry.key().clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Discards every cached evaluation result while keeping the registry intact
    pub fn clear_cache(&self) {
        if let Ok(mut cache) = self.cache.lock() {
            cache.clear();
        }
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.cache
            .lock()
            .map(|cache| cache.stats())
            .unwrap_or_default()
    }
}

impl Default for Schedule {
    fn default() -> Self {
        Self::new()
    }
}
