//! Core traits for Samipa components.

use crate::{NodeId, Result, SearchHit};

/// Contract implemented by every index variant, so benchmarking and
/// reporting harnesses can treat them polymorphically.
///
/// Concurrency model: one writer at a time. `insert` and `clear` serialize
/// against everything; `search` calls may run concurrently with each other.
pub trait AnnIndex: Send + Sync {
    /// Variant-revealing index name
    fn name(&self) -> &str;

    /// Insert a vector, returning its assigned index
    fn insert(&self, vector: &[f32]) -> Result<NodeId>;

    /// Top-k approximate neighbors of `query`, best first.
    /// `ef` controls the accuracy/latency trade-off and must be at least `k`.
    fn search(&self, query: &[f32], k: usize, ef: usize) -> Result<Vec<SearchHit>>;

    /// Number of stored vectors
    fn len(&self) -> usize;

    /// Check if the index is empty
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Highest populated layer; `None` while the index is empty
    fn max_level(&self) -> Option<usize>;

    /// Deterministic estimate of resident bytes
    fn memory_usage(&self) -> usize;

    /// Reset to the empty state
    fn clear(&self);
}
