use thiserror::Error;

/// Errors returned by ranker operations.
///
/// All variants are synchronous and local: a failed call leaves the ranker's
/// state exactly as it was.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum RankerError {
    /// `rank` was called while no objects are resident.
    #[error("cannot rank an empty tag table")]
    Empty,

    /// `replaced` was called for an id the ranker is not tracking.
    #[error("unknown object id {0}")]
    Unknown(u64),

    /// An insert found the id already present.
    ///
    /// Cannot happen when the harness upholds its contract (one `update` per
    /// request, one `replaced` per removal); treat as a programming error.
    #[error("duplicate object id {0}")]
    Duplicate(u64),
}
