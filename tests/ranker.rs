use lhd::{Cache, Id, Lhd, LhdConfig, Ranker, RankerError, Request, SampledLru, Xorshift64};
use std::collections::HashMap;

fn lhd_config() -> LhdConfig {
    LhdConfig::new()
        .max_age(1 << 10)
        .accs_per_reconfiguration(1 << 10)
        .rng_seed(7)
}

fn lhd_cache(capacity: u64) -> Cache<Lhd> {
    Cache::new(capacity, |view| Lhd::new(lhd_config(), view))
}

// ---------------------------------------------------------------------------
// Ranker protocol
// ---------------------------------------------------------------------------

#[test]
fn rank_fails_on_a_fresh_ranker() {
    let mut ranker = Lhd::new(lhd_config(), lhd::ResidentCounters::new());
    assert_eq!(ranker.rank(&Request::new(0, 1)), Err(RankerError::Empty));
}

#[test]
fn rank_returns_the_single_resident_object() {
    let mut ranker = Lhd::new(lhd_config(), lhd::ResidentCounters::new());
    ranker.update(7, &Request::new(0, 1));
    assert_eq!(ranker.rank(&Request::new(0, 1)), Ok(7));
}

#[test]
fn clock_advances_once_per_update() {
    let mut ranker = Lhd::new(lhd_config(), lhd::ResidentCounters::new());
    let mut last = ranker.timestamp();
    for i in 0..50u64 {
        ranker.update(i % 5, &Request::new(0, 1));
        assert!(ranker.timestamp() > last, "timestamp must strictly increase");
        last = ranker.timestamp();
    }
    assert_eq!(last, 50);
}

#[test]
fn replaced_is_rejected_for_non_resident_ids() {
    let mut ranker = Lhd::new(lhd_config(), lhd::ResidentCounters::new());
    ranker.update(1, &Request::new(0, 1));
    assert_eq!(ranker.replaced(2), Err(RankerError::Unknown(2)));
    assert_eq!(ranker.len(), 1);
}

// ---------------------------------------------------------------------------
// Harness integration
// ---------------------------------------------------------------------------

#[test]
fn resident_sets_agree_after_every_kind_of_traffic() {
    let mut cache = lhd_cache(64);
    let mut rng = Xorshift64::new(3);
    for _ in 0..5_000 {
        let key = rng.next() % 150;
        let size = 1 + rng.next() % 8;
        cache.access(key, &Request::new((key % 5) as u32, size));
    }
    assert_eq!(cache.len(), cache.ranker().len());
    for key in 0..150u64 {
        assert_eq!(
            cache.contains(key),
            cache.ranker().contains(key),
            "cache and ranker disagree on key {}",
            key
        );
    }
    assert!(cache.consumed_capacity() <= cache.capacity());
}

#[test]
fn replay_is_bit_identical_across_runs() {
    let run = || {
        let mut cache = lhd_cache(256);
        let mut rng = Xorshift64::new(11);
        let mut outcomes = Vec::new();
        for _ in 0..20_000 {
            let key = rng.next() % 400;
            let size = 1 + key % 4;
            outcomes.push(cache.access(key, &Request::new((key % 3) as u32, size)));
        }
        (outcomes, cache.stats())
    };
    let (outcomes_a, stats_a) = run();
    let (outcomes_b, stats_b) = run();
    assert_eq!(outcomes_a, outcomes_b);
    assert_eq!(stats_a, stats_b);
    assert!(stats_a.evictions > 0, "the trace must actually exercise eviction");
}

#[test]
fn different_seeds_still_obey_the_capacity_contract() {
    for seed in [1u64, 2, 3] {
        let mut cache = Cache::new(100, |view| {
            Lhd::new(lhd_config().rng_seed(seed), view)
        });
        for i in 0..2_000u64 {
            cache.access(i % 333, &Request::new(0, 5));
        }
        assert!(cache.consumed_capacity() <= 100);
    }
}

// ---------------------------------------------------------------------------
// Ranked-LRU oracle
// ---------------------------------------------------------------------------

/// Exact LRU over unit-sized objects, as the oracle.
struct ExactLru {
    capacity: usize,
    last_used: HashMap<Id, u64>,
    clock: u64,
}

impl ExactLru {
    fn new(capacity: usize) -> Self {
        ExactLru {
            capacity,
            last_used: HashMap::new(),
            clock: 0,
        }
    }

    fn access(&mut self, key: Id) -> bool {
        self.clock += 1;
        let hit = self.last_used.contains_key(&key);
        if !hit && self.last_used.len() >= self.capacity {
            let oldest = *self
                .last_used
                .iter()
                .min_by_key(|(_, &t)| t)
                .map(|(k, _)| k)
                .unwrap();
            self.last_used.remove(&oldest);
        }
        self.last_used.insert(key, self.clock);
        hit
    }
}

#[test]
fn sampled_lru_tracks_exact_lru_on_a_uniform_trace() {
    const CAPACITY: u64 = 100;
    const POOL: u64 = 200;
    const TRACE: usize = 20_000;

    let mut sampled: Cache<SampledLru> = Cache::new(CAPACITY, |_| SampledLru::new(64, 5));
    let mut exact = ExactLru::new(CAPACITY as usize);

    let mut rng = Xorshift64::new(17);
    let mut sampled_hits = 0usize;
    let mut exact_hits = 0usize;
    for _ in 0..TRACE {
        let key = rng.next() % POOL;
        if sampled.access(key, &Request::new(0, 1)) {
            sampled_hits += 1;
        }
        if exact.access(key) {
            exact_hits += 1;
        }
    }

    let sampled_rate = sampled_hits as f64 / TRACE as f64;
    let exact_rate = exact_hits as f64 / TRACE as f64;
    assert!(
        (sampled_rate - exact_rate).abs() < 0.05,
        "sampled {:.3} vs exact {:.3}",
        sampled_rate,
        exact_rate
    );
}

// ---------------------------------------------------------------------------
// End-to-end hit rate
// ---------------------------------------------------------------------------

/// Zipf(s = 1) sample in `[0, pool)` via the inverse-CDF shortcut
/// `k = pool^u`.
fn zipf(rng: &mut Xorshift64, pool: u64) -> u64 {
    let bits = rng.next() >> 11;
    let u = (bits + 1) as f64 / (1u64 << 53) as f64;
    let k = (pool as f64).powf(u) as u64;
    k.saturating_sub(1).min(pool - 1)
}

#[test]
fn lhd_earns_a_sane_hit_rate_on_a_skewed_trace() {
    const CAPACITY: u64 = 1_000;
    const POOL: u64 = 10_000;
    const TRACE: usize = 200_000;

    let mut cache = Cache::new(CAPACITY, |view| {
        Lhd::new(
            LhdConfig::new()
                .max_age(1 << 12)
                .accs_per_reconfiguration(1 << 12)
                .rng_seed(1),
            view,
        )
    });

    let mut rng = Xorshift64::new(99);
    let mut hits = 0usize;
    for _ in 0..TRACE {
        let key = zipf(&mut rng, POOL);
        if cache.access(key, &Request::new(0, 1)) {
            hits += 1;
        }
    }

    let rate = hits as f64 / TRACE as f64;
    assert!(
        rate > 0.4,
        "Zipf trace with 10% capacity should hit well over 40%, got {:.3}",
        rate
    );
    assert!(cache.consumed_capacity() <= CAPACITY);
}
