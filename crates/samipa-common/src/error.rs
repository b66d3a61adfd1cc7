//! Error types for Samipa.

/// Main error type for Samipa operations.
///
/// Every failure is detected synchronously at the operation boundary and
/// leaves index state unmodified.
#[derive(Debug, thiserror::Error)]
pub enum SamipaError {
    /// Vector or query length disagrees with the dimension fixed by the
    /// first insertion
    #[error("dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch {
        /// Dimension the index was built with
        expected: usize,
        /// Dimension of the offending input
        actual: usize,
    },

    /// Zero-length input vector
    #[error("empty vector")]
    EmptyVector,

    /// Non-positive or otherwise degenerate parameter
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),
}

impl From<String> for SamipaError {
    fn from(s: String) -> Self {
        SamipaError::InvalidParameter(s)
    }
}

impl From<&str> for SamipaError {
    fn from(s: &str) -> Self {
        SamipaError::InvalidParameter(s.to_string())
    }
}

/// Result type alias using SamipaError.
pub type Result<T> = std::result::Result<T, SamipaError>;
