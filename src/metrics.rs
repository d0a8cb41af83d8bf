/// Counters updated on every harness operation.
///
/// Plain integers, not atomics: the whole pipeline is driven by one strictly
/// serialized request stream.
#[derive(Debug, Default)]
pub struct StatsCounter {
    hits: u64,
    misses: u64,
    evictions: u64,
}

impl StatsCounter {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn record_hit(&mut self) {
        self.hits += 1;
    }

    #[inline]
    pub fn record_miss(&mut self) {
        self.misses += 1;
    }

    #[inline]
    pub fn record_eviction(&mut self, count: u64) {
        self.evictions += count;
    }

    /// Returns a point-in-time snapshot of the statistics.
    pub fn snapshot(&self) -> Metrics {
        let total = self.hits + self.misses;
        let hit_rate = if total == 0 {
            0.0_f64
        } else {
            self.hits as f64 / total as f64
        };
        Metrics {
            hits: self.hits,
            misses: self.misses,
            evictions: self.evictions,
            hit_rate,
        }
    }
}

/// A point-in-time snapshot of harness statistics.
#[derive(Debug, Clone, PartialEq)]
pub struct Metrics {
    /// Number of requests that found their object resident.
    pub hits: u64,
    /// Number of requests that missed.
    pub misses: u64,
    /// Number of objects evicted under capacity pressure.
    pub evictions: u64,
    /// `hits / (hits + misses)`, or `0.0` if no requests have been made.
    pub hit_rate: f64,
}

impl Metrics {
    pub fn request_count(&self) -> u64 {
        self.hits + self.misses
    }
}
