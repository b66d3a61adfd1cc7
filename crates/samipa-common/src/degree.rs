//! Per-layer neighbor bounds.

use serde::{Deserialize, Serialize};

use crate::{Result, SamipaError};

/// Maximum neighbor count permitted at each layer of the hierarchy.
///
/// This is the axis external benchmarks compare, so the variant in use is
/// exposed through [`DegreePolicy::name`] and [`DegreePolicy::is_adaptive`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DegreePolicy {
    /// Same bound at every layer: `D(l) = M`.
    Fixed {
        /// Maximum neighbors per node (M)
        max_degree: usize,
    },
    /// Bound shrinks geometrically with layer height:
    /// `D(l) = max(1, round(M0 * e^(-l / ln(M0))))`.
    Adaptive {
        /// Layer-0 maximum neighbors per node (M0)
        base_degree: usize,
    },
}

impl Default for DegreePolicy {
    fn default() -> Self {
        Self::Fixed { max_degree: 16 }
    }
}

impl DegreePolicy {
    /// Neighbor bound at `layer`. Queryable for any layer, including ones
    /// the graph has not grown to yet.
    pub fn max_degree(&self, layer: usize) -> usize {
        match *self {
            DegreePolicy::Fixed { max_degree } => max_degree,
            DegreePolicy::Adaptive { base_degree } => {
                let lambda = 1.0 / (base_degree as f64).ln();
                let decayed = base_degree as f64 * (-lambda * layer as f64).exp();
                (decayed.round() as usize).max(1)
            }
        }
    }

    /// The degree parameter M (or M0) that also drives level sampling.
    pub fn degree_parameter(&self) -> usize {
        match *self {
            DegreePolicy::Fixed { max_degree } => max_degree,
            DegreePolicy::Adaptive { base_degree } => base_degree,
        }
    }

    /// Whether the bound decays with layer height.
    pub fn is_adaptive(&self) -> bool {
        matches!(self, DegreePolicy::Adaptive { .. })
    }

    /// Short variant label for reports and index names.
    pub fn name(&self) -> &'static str {
        match self {
            DegreePolicy::Fixed { .. } => "fixed",
            DegreePolicy::Adaptive { .. } => "adaptive",
        }
    }

    /// Reject degenerate degree parameters. Both the decay exponent and the
    /// level-sampling rate divide by `ln(M)`, so M must be at least 2.
    pub fn validate(&self) -> Result<()> {
        if self.degree_parameter() < 2 {
            return Err(SamipaError::InvalidParameter(
                "degree parameter must be at least 2".to_string(),
            ));
        }
        Ok(())
    }
}
