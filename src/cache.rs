use std::rc::Rc;

use ahash::AHashMap;

use crate::metrics::{Metrics, StatsCounter};
use crate::ranker::{Id, Ranker, Request};
use crate::view::{ResidentCounters, ResidentView};

// ---------------------------------------------------------------------------
// Harness adapter
// ---------------------------------------------------------------------------

/// A single-threaded cache harness driving a [`Ranker`].
///
/// Tracks which ids are resident and how many bytes they consume; the
/// ranker decides who leaves when the byte budget overflows. Payload
/// storage is the caller's business — this type holds sizes only.
///
/// Per request the protocol is: on a hit, just `update`; on a miss, evict
/// (`rank` → remove → `replaced`) until the new object fits, admit it, then
/// `update`. The ranker reads residency facts back through a shared
/// [`ResidentCounters`] handle installed at construction.
///
/// # Example
/// ```
/// use lhd::{Cache, Lhd, LhdConfig, Request};
///
/// let mut cache = Cache::new(64, |view| Lhd::new(LhdConfig::new(), view));
/// let hit = cache.access(1, &Request::new(0, 16));
/// assert!(!hit);
/// assert!(cache.access(1, &Request::new(0, 16)));
/// ```
pub struct Cache<R: Ranker> {
    ranker: R,
    capacity: u64,
    /// Resident set: id to object size in bytes.
    resident: AHashMap<Id, u64>,
    consumed: u64,
    counters: Rc<ResidentCounters>,
    stats: StatsCounter,
}

impl<R: Ranker> Cache<R> {
    /// Creates a harness with a byte budget of `capacity`, building the
    /// ranker with a view onto this harness's residency counters.
    pub fn new<F>(capacity: u64, make_ranker: F) -> Self
    where
        F: FnOnce(Rc<dyn ResidentView>) -> R,
    {
        assert!(capacity > 0, "capacity must be greater than 0");
        let counters = ResidentCounters::new();
        let view: Rc<dyn ResidentView> = Rc::clone(&counters) as Rc<dyn ResidentView>;
        Cache {
            ranker: make_ranker(view),
            capacity,
            resident: AHashMap::new(),
            consumed: 0,
            counters,
            stats: StatsCounter::new(),
        }
    }

    /// Processes one request; returns whether it hit.
    ///
    /// A hit that grows the object can overshoot the budget until the next
    /// miss; eviction runs only on the insert path, where the accessed id
    /// is not yet resident and so can never be its own victim.
    pub fn access(&mut self, id: Id, req: &Request) -> bool {
        let hit = self.resident.contains_key(&id);

        if hit {
            self.stats.record_hit();
            let old = self.resident.insert(id, req.size).unwrap_or(0);
            self.consumed = self.consumed - old + req.size;
        } else {
            self.stats.record_miss();
            while self.consumed + req.size > self.capacity && !self.resident.is_empty() {
                self.evict_one(req);
            }
            self.resident.insert(id, req.size);
            self.consumed += req.size;
        }

        self.sync_counters();
        self.ranker.update(id, req);
        hit
    }

    fn evict_one(&mut self, req: &Request) {
        let victim = self
            .ranker
            .rank(req)
            .expect("resident set is non-empty, so the ranker has candidates");
        let size = self
            .resident
            .remove(&victim)
            .expect("ranker only knows resident ids");
        self.consumed -= size;
        self.sync_counters();
        self.ranker
            .replaced(victim)
            .expect("victim came from the ranker's own tag table");
        self.stats.record_eviction(1);
    }

    #[inline]
    fn sync_counters(&self) {
        self.counters.set(self.resident.len() as u64, self.consumed);
    }

    // -----------------------------------------------------------------------
    // Introspection
    // -----------------------------------------------------------------------

    pub fn len(&self) -> usize {
        self.resident.len()
    }

    pub fn is_empty(&self) -> bool {
        self.resident.is_empty()
    }

    pub fn contains(&self, id: Id) -> bool {
        self.resident.contains_key(&id)
    }

    pub fn capacity(&self) -> u64 {
        self.capacity
    }

    pub fn consumed_capacity(&self) -> u64 {
        self.consumed
    }

    pub fn stats(&self) -> Metrics {
        self.stats.snapshot()
    }

    pub fn ranker(&self) -> &R {
        &self.ranker
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LhdConfig;
    use crate::ranker::lhd::Lhd;
    use crate::ranker::lru::SampledLru;

    fn lhd_cache(capacity: u64) -> Cache<Lhd> {
        Cache::new(capacity, |view| {
            Lhd::new(
                LhdConfig::new().max_age(64).accs_per_reconfiguration(128),
                view,
            )
        })
    }

    #[test]
    fn first_access_misses_second_hits() {
        let mut cache = lhd_cache(10);
        assert!(!cache.access(1, &Request::new(0, 1)));
        assert!(cache.access(1, &Request::new(0, 1)));
        let stats = cache.stats();
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
    }

    #[test]
    fn byte_budget_is_respected_under_churn() {
        let mut cache = lhd_cache(100);
        for i in 0..500u64 {
            cache.access(i, &Request::new(0, 7));
        }
        assert!(
            cache.consumed_capacity() <= 100,
            "consumed {} exceeds budget",
            cache.consumed_capacity()
        );
        assert!(cache.stats().evictions > 0);
    }

    #[test]
    fn ranker_tracks_exactly_the_resident_set() {
        let mut cache = lhd_cache(20);
        for i in 0..200u64 {
            cache.access(i % 37, &Request::new(0, 3));
        }
        assert_eq!(cache.len(), cache.ranker().len());
        for id in 0..37u64 {
            assert_eq!(
                cache.contains(id),
                cache.ranker().contains(id),
                "cache and ranker disagree on id {}",
                id
            );
        }
    }

    #[test]
    fn oversized_object_clears_the_cache_and_still_lands() {
        let mut cache = lhd_cache(10);
        cache.access(1, &Request::new(0, 4));
        cache.access(2, &Request::new(0, 4));
        cache.access(3, &Request::new(0, 100));
        assert!(cache.contains(3));
        assert_eq!(cache.len(), 1, "everything else had to go");
    }

    #[test]
    fn works_with_the_lru_ranker_too() {
        let mut cache: Cache<SampledLru> = Cache::new(8, |_view| SampledLru::new(64, 0));
        for i in 0..32u64 {
            cache.access(i, &Request::new(0, 1));
        }
        assert_eq!(cache.len(), 8);
        assert_eq!(cache.len(), cache.ranker().len());
    }
}
