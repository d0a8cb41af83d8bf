use std::rc::Rc;

use tracing::{debug, trace};

use crate::config::LhdConfig;
use crate::error::RankerError;
use crate::ranker::histogram::ClassStats;
use crate::ranker::tags::{Tag, TagTable};
use crate::ranker::{Id, Ranker, Request};
use crate::rng::Xorshift64;
use crate::view::ResidentView;

/// Candidate count used until the model has settled.
const WARMUP_CANDIDATES: u32 = 8;

/// Reconfiguration count past which `rank` switches from
/// [`WARMUP_CANDIDATES`] to the configured associativity.
const WARMUP_RECONFIGURATIONS: u64 = 50;

/// The coarsening shift is recomputed only at these reconfiguration counts:
/// once early, once after the working-set estimate has stabilized, then
/// never again. Being within the right order of magnitude is all that
/// matters for keeping overflows rare.
const COARSENING_UPDATE_POINTS: [u64; 2] = [5, 25];

// ---------------------------------------------------------------------------
// LHD ranker
// ---------------------------------------------------------------------------

/// Least-Hit-Density eviction ranker.
///
/// ## Algorithm
///
/// Every resident object carries a tag: its coarsened last-access time,
/// its two most recent hit ages, a tenant bucket, and its size. Objects are
/// grouped into *classes* (tenant × recent-reuse pattern), and each class
/// maintains EWMA-decayed histograms of hits and evictions by age. From
/// these, a periodic reconfiguration pass derives each class's *hit
/// density* curve — the expected remaining hits per unit of residency cost
/// at a given age. An object's rank is its class's density at its current
/// age divided by its size; `rank` samples a handful of tags uniformly and
/// evicts the lowest.
///
/// The logical clock is coarsened by a right shift so ages fit the
/// histograms; the shift is tuned online from an EWMA of the resident
/// object count, and histograms plus tag timestamps are rescaled in place
/// when it changes.
///
/// Before the first reconfiguration the density curves are seeded with a
/// `1 / (age + 1)` shape, so early victims follow a Greedy-Dual-Size-
/// Frequency-like rule rather than noise.
///
/// ## Determinism
///
/// Victim choice is a pure function of (request sequence, seed, the
/// harness-reported object counts at each reconfiguration). The sampling
/// RNG advances exactly once per `update` and once per candidate draw —
/// keep that coupling in mind when touching either path.
///
/// ## References
/// - Beckmann, Chen, Cidon (2018). *LHD: Improving Cache Hit Rate by
///   Maximizing Hit Density.* USENIX NSDI.
pub struct Lhd {
    config: LhdConfig,
    /// Read-only residency facts from the harness; the object count feeds
    /// the coarsening controller, the byte count only diagnostics.
    view: Rc<dyn ResidentView>,
    tags: TagTable,
    classes: Vec<ClassStats>,
    rng: Xorshift64,

    /// Logical clock: one tick per `update`.
    timestamp: u64,
    /// Right shift applied to the clock before storing it in a tag.
    age_coarsening_shift: u32,
    /// Countdown to the next reconfiguration pass.
    next_reconfiguration: u64,
    num_reconfigurations: u64,
    /// Ages clamped to the histogram edge since the last reconfiguration.
    /// Informational only.
    overflows: u64,
    ewma_num_objects: f64,
    ewma_num_objects_mass: f64,
}

impl Lhd {
    /// Creates a ranker with the given configuration and a read-only handle
    /// onto the harness's residency state.
    pub fn new(config: LhdConfig, view: Rc<dyn ResidentView>) -> Self {
        assert!(
            config.max_age >= 2 && config.max_age.is_power_of_two(),
            "max_age must be a power of two >= 2"
        );
        assert!(
            config.max_age <= u32::MAX as usize,
            "max_age must fit the 32-bit hit-age fields"
        );
        assert!(config.app_classes >= 1, "app_classes must be at least 1");
        assert!(
            config.hit_age_classes >= 1,
            "hit_age_classes must be at least 1"
        );
        assert!(
            config.accs_per_reconfiguration >= 1,
            "accs_per_reconfiguration must be at least 1"
        );
        assert!(
            config.ewma_decay > 0.0 && config.ewma_decay <= 1.0,
            "ewma_decay must be in (0, 1]"
        );
        assert!(config.associativity >= 1, "associativity must be at least 1");

        let classes = (0..config.num_classes())
            .map(|c| ClassStats::new(config.max_age, c))
            .collect();

        Lhd {
            rng: Xorshift64::new(config.rng_seed),
            next_reconfiguration: config.accs_per_reconfiguration,
            config,
            view,
            tags: TagTable::new(),
            classes,
            timestamp: 0,
            age_coarsening_shift: 0,
            num_reconfigurations: 0,
            overflows: 0,
            ewma_num_objects: 0.0,
            ewma_num_objects_mass: 0.0,
        }
    }

    // -----------------------------------------------------------------------
    // Introspection
    // -----------------------------------------------------------------------

    #[inline]
    pub fn len(&self) -> usize {
        self.tags.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.tags.is_empty()
    }

    #[inline]
    pub fn contains(&self, id: Id) -> bool {
        self.tags.contains(id)
    }

    /// Updates observed so far.
    #[inline]
    pub fn timestamp(&self) -> u64 {
        self.timestamp
    }

    #[inline]
    pub fn age_coarsening_shift(&self) -> u32 {
        self.age_coarsening_shift
    }

    #[inline]
    pub fn num_reconfigurations(&self) -> u64 {
        self.num_reconfigurations
    }

    /// Ages clamped to the histogram edge since the last reconfiguration.
    #[inline]
    pub fn overflows(&self) -> u64 {
        self.overflows
    }

    // -----------------------------------------------------------------------
    // Age and class derivation
    // -----------------------------------------------------------------------

    /// Coarsened age of a tag, clamped to the histogram.
    ///
    /// Clamping is not an error; it is counted so the coarsening controller's
    /// effectiveness shows up in diagnostics.
    fn age_of(&mut self, tag: Tag) -> usize {
        let current = self.timestamp >> self.age_coarsening_shift;
        let raw = current.saturating_sub(tag.timestamp);
        if raw >= self.config.max_age as u64 {
            self.overflows += 1;
            self.config.max_age - 1
        } else {
            raw as usize
        }
    }

    /// Reuse-pattern bucket of a tag.
    ///
    /// Tags that have never been hit (fresh tags carry the
    /// `last_last_hit_age == max_age` sentinel) form bucket 0; hit tags are
    /// bucketed by `log2` of their most recent hit age. The mapping reads
    /// only tag fields, so it is stable across reconfigurations.
    fn hit_age_class(&self, tag: Tag) -> usize {
        let never_hit = tag.last_last_hit_age as usize == self.config.max_age;
        if never_hit || self.config.hit_age_classes == 1 {
            return 0;
        }
        let bucket = (u64::BITS - 1 - (tag.last_hit_age as u64 + 1).leading_zeros()) as usize;
        1 + bucket.min(self.config.hit_age_classes - 2)
    }

    #[inline]
    fn class_of(&self, tag: Tag) -> usize {
        tag.app as usize * self.config.hit_age_classes + self.hit_age_class(tag)
    }

    /// The LHD score: hit density at the tag's class and age, per byte.
    /// Smaller objects of equal hit probability are more valuable to keep.
    fn hit_density(&mut self, tag: Tag) -> f64 {
        let age = self.age_of(tag);
        let class = self.class_of(tag);
        self.classes[class].hit_densities[age] / tag.size.max(1) as f64
    }

    // -----------------------------------------------------------------------
    // Reconfiguration
    // -----------------------------------------------------------------------

    fn reconfigure(&mut self) {
        let mut total_hits = 0.0;
        let mut total_evictions = 0.0;
        for cl in &mut self.classes {
            cl.decay(self.config.ewma_decay);
            total_hits += cl.total_hits;
            total_evictions += cl.total_evictions;
        }

        self.adapt_age_coarsening();

        for cl in &mut self.classes {
            cl.rebuild_densities();
        }

        let total_events = total_hits + total_evictions;
        debug!(
            reconfiguration = self.num_reconfigurations,
            hits = total_hits,
            evictions = total_evictions,
            hit_rate = if total_events > 0.0 {
                total_hits / total_events
            } else {
                0.0
            },
            overflows = self.overflows,
            shift = self.age_coarsening_shift,
            "rebuilt hit-density model"
        );
        if self.config.dump_ranks {
            self.dump_class_ranks();
        }

        self.overflows = 0;
    }

    /// Keeps the time quantum sized so that almost no resident object ages
    /// past the histogram.
    ///
    /// The resident-count EWMA is folded every reconfiguration, but the
    /// shift itself changes only at the scheduled points; when it does, the
    /// histograms are rescaled in place and every resident tag's timestamp
    /// is re-expressed in the new quantum.
    fn adapt_age_coarsening(&mut self) {
        self.ewma_num_objects *= self.config.ewma_decay;
        self.ewma_num_objects_mass *= self.config.ewma_decay;
        self.ewma_num_objects += self.view.num_objects() as f64;
        self.ewma_num_objects_mass += 1.0;

        let num_objects = self.ewma_num_objects / self.ewma_num_objects_mass;
        let optimal =
            num_objects / (self.config.age_coarsening_error_tolerance * self.config.max_age as f64);

        if !COARSENING_UPDATE_POINTS.contains(&self.num_reconfigurations) {
            return;
        }

        let mut shift = 0u32;
        while shift < u64::BITS - 1 && ((1u64 << shift) as f64) < optimal {
            shift += 1;
        }
        let delta = shift as i64 - self.age_coarsening_shift as i64;
        self.age_coarsening_shift = shift;

        // Extra weight on the EWMA delays the effect of any later drift.
        self.ewma_num_objects *= 8.0;
        self.ewma_num_objects_mass *= 8.0;

        if delta > 0 {
            // Quantum grew: fold histogram bins together and drop the low
            // bits of stored timestamps.
            let d = delta as u32;
            for cl in &mut self.classes {
                cl.compress(d);
            }
            for tag in self.tags.iter_mut() {
                tag.timestamp >>= d;
            }
        } else if delta < 0 {
            // Quantum shrank: spread bins out and re-express timestamps in
            // the finer unit.
            let d = (-delta) as u32;
            for cl in &mut self.classes {
                cl.stretch(d);
            }
            for tag in self.tags.iter_mut() {
                tag.timestamp <<= d;
            }
        }

        debug!(
            shift,
            delta, num_objects, optimal, "recomputed age coarsening"
        );
    }

    /// Dumps the per-age rank of an average-sized object for each class.
    /// Pure sink: reads model state and the harness view, mutates nothing.
    fn dump_class_ranks(&self) {
        let num_objects = self.view.num_objects();
        if num_objects == 0 {
            return;
        }
        let avg_object_size = self.view.consumed_capacity() as f64 / num_objects as f64;

        for (class, cl) in self.classes.iter().enumerate() {
            // Only the populated prefix of the curve is worth emitting.
            let mut remaining = cl.total_hits + cl.total_evictions;
            let mut end = 0;
            for age in 0..cl.hit_densities.len() {
                remaining -= cl.hits[age] + cl.evictions[age];
                if cl.hit_densities[age] == 0.0 && remaining < 1e-2 {
                    break;
                }
                end = age + 1;
            }
            let ranks: Vec<f64> = cl.hit_densities[..end]
                .iter()
                .map(|d| d / avg_object_size)
                .collect();
            trace!(
                class,
                hits = cl.total_hits,
                evictions = cl.total_evictions,
                avg_object_size,
                ?ranks,
                "per-age ranks"
            );
        }
    }
}

// ---------------------------------------------------------------------------
// Ranker protocol
// ---------------------------------------------------------------------------

impl Ranker for Lhd {
    /// Samples candidate positions uniformly and returns the id with the
    /// lowest hit density. Ties keep the earliest sample.
    fn rank(&mut self, _req: &Request) -> Result<Id, RankerError> {
        if self.tags.is_empty() {
            return Err(RankerError::Empty);
        }

        // Few candidates at first so the policy converges quickly on this
        // trace; full associativity once the model has settled.
        let candidates = if self.num_reconfigurations > WARMUP_RECONFIGURATIONS {
            self.config.associativity
        } else {
            WARMUP_CANDIDATES
        };

        let len = self.tags.len() as u64;
        let mut victim_pos = (self.rng.next() % len) as usize;
        let mut victim_rank = self.hit_density(*self.tags.get(victim_pos));

        for _ in 1..candidates {
            let pos = (self.rng.next() % len) as usize;
            let rank = self.hit_density(*self.tags.get(pos));
            if rank < victim_rank {
                victim_pos = pos;
                victim_rank = rank;
            }
        }

        Ok(self.tags.get(victim_pos).id)
    }

    fn update(&mut self, id: Id, req: &Request) {
        let coarsened = self.timestamp >> self.age_coarsening_shift;

        match self.tags.find(id) {
            Some(pos) => {
                // Hit: account it in the class the tag belonged to *before*
                // this access reshapes its reuse pattern.
                let tag = *self.tags.get(pos);
                let age = self.age_of(tag);
                let class = self.class_of(tag);
                self.classes[class].hits[age] += 1.0;

                let tag = self.tags.get_mut(pos);
                tag.last_last_hit_age = tag.last_hit_age;
                tag.last_hit_age = age as u32;
                tag.timestamp = coarsened;
                tag.app = req.app_id % self.config.app_classes as u32;
                tag.size = req.size;
            }
            None => {
                let tag = Tag {
                    id,
                    timestamp: coarsened,
                    last_hit_age: 0,
                    last_last_hit_age: self.config.max_age as u32,
                    app: req.app_id % self.config.app_classes as u32,
                    size: req.size,
                };
                self.tags
                    .insert(tag)
                    .expect("id was absent from the index a moment ago");
            }
        }

        // Advance the stream even when no sampling happens: victim sequences
        // stay a function of the update count alone.
        self.rng.next();

        self.timestamp += 1;

        self.next_reconfiguration -= 1;
        if self.next_reconfiguration == 0 {
            self.reconfigure();
            self.next_reconfiguration = self.config.accs_per_reconfiguration;
            self.num_reconfigurations += 1;
        }
    }

    fn replaced(&mut self, id: Id) -> Result<(), RankerError> {
        let pos = self.tags.find(id).ok_or(RankerError::Unknown(id))?;

        // Record the eviction before the tag disappears.
        let tag = *self.tags.get(pos);
        let age = self.age_of(tag);
        let class = self.class_of(tag);
        self.classes[class].evictions[age] += 1.0;

        self.tags.remove(pos);
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
