//! Error types for curve construction and calibration.

use strata_core::{CoreError, Date};
use strata_math::MathError;
use thiserror::Error;

/// A specialized Result type for curve operations.
pub type CurveResult<T> = Result<T, CurveError>;

/// Errors that can occur during curve construction and calibration.
#[derive(Error, Debug, Clone)]
pub enum CurveError {
    /// Curve construction was given inconsistent data.
    #[error("Invalid curve: {reason}")]
    InvalidCurve {
        /// Description of the inconsistency.
        reason: String,
    },

    /// A query date precedes the curve's valuation date.
    #[error("Query date {date} precedes valuation date {valuation_date}")]
    QueryBeforeValuation {
        /// The query date.
        date: Date,
        /// The curve's valuation date.
        valuation_date: Date,
    },

    /// A node mutation was requested for a date with no matching node.
    #[error("No node at {date}: update_node never inserts")]
    NodeNotFound {
        /// The date with no matching node.
        date: Date,
    },

    /// Bulk node update with the wrong number of values.
    #[error("Node count mismatch: curve has {expected} nodes, got {actual} values")]
    NodeCountMismatch {
        /// Number of nodes in the curve.
        expected: usize,
        /// Number of values supplied.
        actual: usize,
    },

    /// A calibration node has no non-excluded instrument to solve it.
    #[error("No instrument to solve node {date}")]
    NoInstrumentForNode {
        /// The unsolvable node date.
        date: Date,
    },

    /// A sibling curve referenced by name is not in the group.
    #[error("Curve not found in group: {name}")]
    CurveNotFound {
        /// The missing curve name.
        name: String,
    },

    /// A model's curve was queried before `reset` built it.
    #[error("Curve '{name}' has not been built")]
    CurveNotBuilt {
        /// The model name.
        name: String,
    },

    /// A node solve failed for data (not convergence) reasons.
    #[error("Calibration failed: {reason}")]
    Calibration {
        /// Description of the failure.
        reason: String,
    },

    /// A bounded iteration failed to converge.
    #[error("Convergence failed after {iterations} iterations (residual: {residual:.2e})")]
    ConvergenceFailed {
        /// Number of iterations attempted.
        iterations: u32,
        /// Final residual.
        residual: f64,
    },

    /// An operation is not supported by this instrument kind.
    #[error("{operation} is not supported for {kind}")]
    Unsupported {
        /// The requested operation.
        operation: String,
        /// The instrument kind.
        kind: String,
    },

    /// Error from the numerical layer.
    #[error(transparent)]
    Math(#[from] MathError),

    /// Error from the core type layer.
    #[error(transparent)]
    Core(#[from] CoreError),
}

impl CurveError {
    /// Creates an invalid curve error.
    #[must_use]
    pub fn invalid_curve(reason: impl Into<String>) -> Self {
        Self::InvalidCurve {
            reason: reason.into(),
        }
    }

    /// Creates a calibration error.
    #[must_use]
    pub fn calibration(reason: impl Into<String>) -> Self {
        Self::Calibration {
            reason: reason.into(),
        }
    }

    /// Creates an unsupported operation error.
    #[must_use]
    pub fn unsupported(operation: impl Into<String>, kind: impl Into<String>) -> Self {
        Self::Unsupported {
            operation: operation.into(),
            kind: kind.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let date = Date::from_ymd(2025, 6, 15).unwrap();
        let err = CurveError::NodeNotFound { date };
        assert!(err.to_string().contains("2025-06-15"));
        assert!(err.to_string().contains("never inserts"));
    }

    #[test]
    fn test_math_error_converts() {
        let math_err = MathError::insufficient_data(2, 1);
        let err: CurveError = math_err.into();
        assert!(matches!(err, CurveError::Math(_)));
    }
}
