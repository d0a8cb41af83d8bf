use crate::error::RankerError;
use crate::ranker::tags::{Tag, TagTable};
use crate::ranker::{Id, Ranker, Request};
use crate::rng::Xorshift64;

/// Sampled LRU: the degenerate ranker where an object's rank is simply its
/// age.
///
/// Shares the sampling and replacement protocol with [`Lhd`](crate::Lhd) —
/// uniform candidate draws, victim chosen among the samples, one RNG advance
/// per update — but keeps no classes and no density model. Useful as a
/// baseline and as a sanity oracle: over enough samples it converges on true
/// LRU behavior.
pub struct SampledLru {
    tags: TagTable,
    rng: Xorshift64,
    /// Logical clock: one tick per `update`. No coarsening; ages are exact.
    timestamp: u64,
    associativity: u32,
}

impl SampledLru {
    pub fn new(associativity: u32, rng_seed: u64) -> Self {
        assert!(associativity >= 1, "associativity must be at least 1");
        SampledLru {
            tags: TagTable::new(),
            rng: Xorshift64::new(rng_seed),
            timestamp: 0,
            associativity,
        }
    }

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

    #[inline]
    fn age_of(&self, tag: &Tag) -> u64 {
        self.timestamp - tag.timestamp
    }
}

impl Ranker for SampledLru {
    /// Returns the oldest of the sampled candidates. Ties keep the earliest
    /// sample.
    fn rank(&mut self, _req: &Request) -> Result<Id, RankerError> {
        if self.tags.is_empty() {
            return Err(RankerError::Empty);
        }

        let len = self.tags.len() as u64;
        let mut victim_pos = (self.rng.next() % len) as usize;
        let mut victim_age = self.age_of(self.tags.get(victim_pos));

        for _ in 1..self.associativity {
            let pos = (self.rng.next() % len) as usize;
            let age = self.age_of(self.tags.get(pos));
            if age > victim_age {
                victim_pos = pos;
                victim_age = age;
            }
        }

        Ok(self.tags.get(victim_pos).id)
    }

    fn update(&mut self, id: Id, req: &Request) {
        match self.tags.find(id) {
            Some(pos) => {
                let tag = self.tags.get_mut(pos);
                tag.timestamp = self.timestamp;
                tag.app = req.app_id;
                tag.size = req.size;
            }
            None => {
                let tag = Tag {
                    id,
                    timestamp: self.timestamp,
                    last_hit_age: 0,
                    last_last_hit_age: 0,
                    app: req.app_id,
                    size: req.size,
                };
                self.tags
                    .insert(tag)
                    .expect("id was absent from the index a moment ago");
            }
        }

        self.rng.next();
        self.timestamp += 1;
    }

    fn replaced(&mut self, id: Id) -> Result<(), RankerError> {
        let pos = self.tags.find(id).ok_or(RankerError::Unknown(id))?;
        self.tags.remove(pos);
        Ok(())
    }
}
