//! Configuration types for Samipa.

use serde::{Deserialize, Serialize};

use crate::{DegreePolicy, Result, SamipaError};

/// Construction and search parameters for an HNSW index.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HnswConfig {
    /// Per-layer neighbor bound policy
    pub policy: DegreePolicy,
    /// Construction-time candidate list size
    pub ef_construction: usize,
    /// Seed for level sampling; a fixed seed gives a reproducible graph
    pub seed: u64,
    /// Optional cap on sampled insertion levels. `None` leaves sampling
    /// unbounded, so unlucky draws can create very tall, sparse layers.
    pub max_level: Option<usize>,
}

impl Default for HnswConfig {
    fn default() -> Self {
        Self {
            policy: DegreePolicy::default(),
            ef_construction: 200,
            seed: 42,
            max_level: None,
        }
    }
}

impl HnswConfig {
    /// Validate the configuration.
    ///
    /// # Returns
    ///
    /// Returns `Ok(())` if valid, otherwise returns an error.
    pub fn validate(&self) -> Result<()> {
        self.policy.validate()?;

        if self.ef_construction == 0 {
            return Err(SamipaError::InvalidParameter(
                "ef_construction must be greater than 0".to_string(),
            ));
        }

        if self.max_level == Some(0) {
            return Err(SamipaError::InvalidParameter(
                "max_level cap must be at least 1".to_string(),
            ));
        }

        Ok(())
    }
}
