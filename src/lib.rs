//! Sampling-based LHD (Least Hit Density) cache eviction.
//!
//! LHD estimates, per object class and age, the expected remaining hits an
//! object contributes per unit of occupied capacity, and evicts the worst of
//! a small random sample instead of scanning every resident object. The
//! model tunes itself online: histograms decay, the density curve is rebuilt
//! periodically, and the time quantization adapts to the working set.
//!
//! The crate centers on the [`Lhd`] ranker (with [`SampledLru`] as the
//! degenerate rank-by-age baseline) plus a minimal single-threaded [`Cache`]
//! harness for driving either one from a request stream.
//!
//! # Example
//! ```
//! use lhd::{Cache, Lhd, LhdConfig, Request};
//!
//! let mut cache = Cache::new(1 << 20, |view| {
//!     Lhd::new(LhdConfig::new().rng_seed(1), view)
//! });
//! for key in 0..100u64 {
//!     cache.access(key, &Request::new(0, 4096));
//! }
//! assert_eq!(cache.stats().misses, 100);
//! ```

mod cache;
mod config;
mod error;
mod metrics;
mod ranker;
mod rng;
mod view;

pub use cache::Cache;
pub use config::LhdConfig;
pub use error::RankerError;
pub use metrics::Metrics;
pub use ranker::lhd::Lhd;
pub use ranker::lru::SampledLru;
pub use ranker::{Id, Ranker, Request};
pub use rng::Xorshift64;
pub use view::{ResidentCounters, ResidentView};
