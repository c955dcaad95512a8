//! Memoizing store for local scores.
//!
//! Keys canonicalize the parent set by sorting, so a family scored through
//! any discovery order hits the same entry. Entries are inserted once and
//! never mutated; under a configured capacity the least-recently-used entry
//! is evicted, and a later miss simply recomputes (correctness unaffected,
//! only performance).

use rustc_hash::FxHashMap;

use crate::engine::dag::ParentVec;
use crate::engine::dataset::VarId;
use crate::engine::errors::LearnError;
use crate::engine::score::{CountSummary, LocalScorer};

/// Canonical cache key: child plus its parent set in sorted order.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ScoreKey {
    child: VarId,
    parents: ParentVec,
}

impl ScoreKey {
    /// Builds a key, sorting the parent set into canonical order.
    pub fn new(child: VarId, parents: &[VarId]) -> Self {
        let mut sorted: ParentVec = parents.iter().copied().collect();
        sorted.sort_unstable();
        ScoreKey {
            child,
            parents: sorted,
        }
    }

    /// The child variable.
    pub fn child(&self) -> VarId {
        self.child
    }

    /// The canonical (sorted) parent set.
    pub fn parents(&self) -> &[VarId] {
        &self.parents
    }
}

#[derive(Debug, Clone)]
struct CacheEntry {
    score: f64,
    #[allow(dead_code)] // Retained sufficient-statistics summary for reuse
    summary: CountSummary,
    last_access: u64,
}

/// Counters describing cache behavior over a run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize)]
pub struct CacheStats {
    /// Lookups answered from the store.
    pub hits: u64,
    /// Lookups that required a scorer invocation.
    pub misses: u64,
    /// Entries dropped under memory pressure.
    pub evictions: u64,
    /// Entries currently resident.
    pub entries: usize,
}

/// A memoizing score store keyed by (variable, parent set).
///
/// In sequential use, `lookup_or_compute` guarantees at-most-one scorer
/// invocation per distinct key for as long as the entry stays resident.
#[derive(Debug, Clone)]
pub struct ScoreCache {
    entries: FxHashMap<ScoreKey, CacheEntry>,
    capacity: Option<usize>,
    tick: u64,
    hits: u64,
    misses: u64,
    evictions: u64,
}

impl ScoreCache {
    /// Creates a cache; `capacity` of `None` means unbounded.
    pub fn new(capacity: Option<usize>) -> Self {
        ScoreCache {
            entries: FxHashMap::default(),
            capacity,
            tick: 0,
            hits: 0,
            misses: 0,
            evictions: 0,
        }
    }

    /// Returns the cached score for `key`, marking it recently used.
    pub fn get(&mut self, key: &ScoreKey) -> Option<f64> {
        self.tick += 1;
        let tick = self.tick;
        match self.entries.get_mut(key) {
            Some(entry) => {
                entry.last_access = tick;
                self.hits += 1;
                Some(entry.score)
            }
            None => None,
        }
    }

    /// Whether `key` is resident, without touching access order or counters.
    pub fn contains(&self, key: &ScoreKey) -> bool {
        self.entries.contains_key(key)
    }

    /// Inserts a computed score. Counted as a miss serviced; evicts the
    /// least-recently-used entry when the capacity is exceeded.
    pub fn insert(&mut self, key: ScoreKey, score: f64, summary: CountSummary) {
        self.tick += 1;
        self.misses += 1;
        self.entries.insert(
            key,
            CacheEntry {
                score,
                summary,
                last_access: self.tick,
            },
        );
        if let Some(cap) = self.capacity {
            while self.entries.len() > cap {
                let oldest = self
                    .entries
                    .iter()
                    .min_by_key(|(_, e)| e.last_access)
                    .map(|(k, _)| k.clone());
                match oldest {
                    Some(k) => {
                        self.entries.remove(&k);
                        self.evictions += 1;
                    }
                    None => break,
                }
            }
        }
    }

    /// Returns the cached score for (child, parents), computing and storing
    /// it on a miss.
    pub fn lookup_or_compute(
        &mut self,
        child: VarId,
        parents: &[VarId],
        scorer: &LocalScorer<'_>,
    ) -> Result<f64, LearnError> {
        let key = ScoreKey::new(child, parents);
        if let Some(score) = self.get(&key) {
            return Ok(score);
        }
        let (score, summary) = scorer.score_with_counts(child, key.parents())?;
        self.insert(key, score, summary);
        Ok(score)
    }

    /// Current behavior counters.
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits,
            misses: self.misses,
            evictions: self.evictions,
            entries: self.entries.len(),
        }
    }
}
