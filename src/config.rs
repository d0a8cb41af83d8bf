//! Ranker configuration.
//!
//! All knobs are fixed at construction time. The defaults reproduce the
//! reference parameterization; tests shrink `max_age` and the
//! reconfiguration period to keep scenarios small.

/// Configuration for the [`Lhd`](crate::Lhd) ranker.
///
/// # Example
/// ```
/// use lhd::LhdConfig;
///
/// let config = LhdConfig::new()
///     .max_age(1 << 12)
///     .associativity(32)
///     .rng_seed(7);
/// assert_eq!(config.num_classes(), 16);
/// ```
#[derive(Debug, Clone)]
pub struct LhdConfig {
    /// Histogram length per class. Must be a power of two and at least 2.
    /// Bigger means finer age resolution and more memory.
    pub max_age: usize,
    /// Application/tenant buckets; a request's `app_id` is taken modulo this.
    pub app_classes: usize,
    /// Reuse-distance buckets derived from a tag's recent hit ages.
    pub hit_age_classes: usize,
    /// Updates between reconfiguration passes.
    pub accs_per_reconfiguration: u64,
    /// Per-reconfiguration forgetting factor in `(0, 1]`.
    pub ewma_decay: f64,
    /// Target fraction of objects whose true age overflows the histogram.
    pub age_coarsening_error_tolerance: f64,
    /// Victim samples per `rank` call after warm-up.
    pub associativity: u32,
    /// Seed for the deterministic sampling RNG.
    pub rng_seed: u64,
    /// Emit the density curve at each reconfiguration (diagnostics only;
    /// never affects numerical state).
    pub dump_ranks: bool,
}

impl Default for LhdConfig {
    fn default() -> Self {
        LhdConfig {
            max_age: 1 << 15,
            app_classes: 4,
            hit_age_classes: 4,
            accs_per_reconfiguration: 1 << 20,
            ewma_decay: 0.9,
            age_coarsening_error_tolerance: 0.01,
            associativity: 64,
            rng_seed: 0,
            dump_ranks: false,
        }
    }
}

impl LhdConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Total statistical classes: `app_classes * hit_age_classes`.
    #[inline]
    pub fn num_classes(&self) -> usize {
        self.app_classes * self.hit_age_classes
    }

    pub fn max_age(mut self, max_age: usize) -> Self {
        assert!(
            max_age >= 2 && max_age.is_power_of_two(),
            "max_age must be a power of two >= 2"
        );
        self.max_age = max_age;
        self
    }

    pub fn app_classes(mut self, n: usize) -> Self {
        assert!(n >= 1, "app_classes must be at least 1");
        self.app_classes = n;
        self
    }

    pub fn hit_age_classes(mut self, n: usize) -> Self {
        assert!(n >= 1, "hit_age_classes must be at least 1");
        self.hit_age_classes = n;
        self
    }

    pub fn accs_per_reconfiguration(mut self, n: u64) -> Self {
        assert!(n >= 1, "accs_per_reconfiguration must be at least 1");
        self.accs_per_reconfiguration = n;
        self
    }

    pub fn ewma_decay(mut self, decay: f64) -> Self {
        assert!(
            decay > 0.0 && decay <= 1.0,
            "ewma_decay must be in (0, 1]"
        );
        self.ewma_decay = decay;
        self
    }

    pub fn age_coarsening_error_tolerance(mut self, tolerance: f64) -> Self {
        assert!(tolerance > 0.0, "tolerance must be positive");
        self.age_coarsening_error_tolerance = tolerance;
        self
    }

    pub fn associativity(mut self, k: u32) -> Self {
        assert!(k >= 1, "associativity must be at least 1");
        self.associativity = k;
        self
    }

    pub fn rng_seed(mut self, seed: u64) -> Self {
        self.rng_seed = seed;
        self
    }

    pub fn dump_ranks(mut self, enabled: bool) -> Self {
        self.dump_ranks = enabled;
        self
    }
}
