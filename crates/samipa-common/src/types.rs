//! Common types used throughout Samipa.

use serde::{Deserialize, Serialize};

/// Vector type alias
pub type Vector = Vec<f32>;

/// Vector index: dense, 0-based, assigned in insertion order, never reused
pub type NodeId = usize;

/// Single result from a similarity search.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SearchHit {
    /// Index of the matched vector
    pub id: NodeId,
    /// Cosine similarity to the query (higher is closer)
    pub score: f32,
}
