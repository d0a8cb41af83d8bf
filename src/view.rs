//! Read-only view of the surrounding cache's residency state.
//!
//! The ranker never owns capacity bookkeeping; it is handed a [`ResidentView`]
//! at construction and reads two facts back from the harness: how many
//! objects are resident and how many bytes they consume. The object count
//! feeds the age-coarsening controller; the byte count is used only by
//! diagnostics.

use std::cell::Cell;
use std::rc::Rc;

/// Read-only residency facts supplied by the cache harness.
pub trait ResidentView {
    /// Number of objects currently resident.
    fn num_objects(&self) -> u64;

    /// Total bytes consumed by resident objects.
    fn consumed_capacity(&self) -> u64;
}

/// Shared-counter implementation of [`ResidentView`].
///
/// The harness keeps one `Rc<ResidentCounters>` and hands a clone to the
/// ranker; `Cell` suffices because every call in the pipeline is strictly
/// serialized.
#[derive(Debug, Default)]
pub struct ResidentCounters {
    objects: Cell<u64>,
    bytes: Cell<u64>,
}

impl ResidentCounters {
    pub fn new() -> Rc<Self> {
        Rc::new(Self::default())
    }

    #[inline]
    pub fn set(&self, objects: u64, bytes: u64) {
        self.objects.set(objects);
        self.bytes.set(bytes);
    }
}

impl ResidentView for ResidentCounters {
    #[inline]
    fn num_objects(&self) -> u64 {
        self.objects.get()
    }

    #[inline]
    fn consumed_capacity(&self) -> u64 {
        self.bytes.get()
    }
}
