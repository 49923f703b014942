//! Error taxonomy for the analysis pipeline.

use serde::Serialize;
use thiserror::Error;

/// Fatal errors raised by the core pipeline.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum SpatialError {
    /// Malformed, negative or non-finite distance data, or an out of range parameter.
    #[error("Invalid input: {message}")]
    InvalidInput {
        /// What was wrong with the input
        message: String,
    },

    /// Too few points, or a degenerate study region, for the requested statistic.
    #[error("Insufficient data: {reason} (required {required}, actual {actual})")]
    InsufficientData {
        /// Minimum number of points required
        required: usize,
        /// Number of points supplied
        actual: usize,
        /// Why the data is insufficient
        reason: String,
    },
}

impl SpatialError {
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput {
            message: message.into(),
        }
    }

    pub fn insufficient_data(required: usize, actual: usize, reason: impl Into<String>) -> Self {
        Self::InsufficientData {
            required,
            actual,
            reason: reason.into(),
        }
    }
}

/// Non-fatal signal that SMACOF hit `max_iterations` before the relative
/// stress improvement dropped below `tolerance`. The coordinates it
/// accompanies are still the best ones found.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ConvergenceWarning {
    pub iterations: usize,
    pub relative_improvement: f64,
    pub tolerance: f64,
}

impl std::fmt::Display for ConvergenceWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "MDS did not converge after {} iterations (last relative improvement {:e}, tolerance {:e})",
            self.iterations, self.relative_improvement, self.tolerance
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = SpatialError::invalid_input("negative cost at (0, 1)");
        assert_eq!(err.to_string(), "Invalid input: negative cost at (0, 1)");

        let err = SpatialError::insufficient_data(3, 2, "too few points for a convex hull");
        assert_eq!(
            err.to_string(),
            "Insufficient data: too few points for a convex hull (required 3, actual 2)"
        );
    }

    #[test]
    fn test_convergence_warning_display() {
        let warning = ConvergenceWarning {
            iterations: 10,
            relative_improvement: 0.5,
            tolerance: 1e-9,
        };
        assert!(warning.to_string().contains("after 10 iterations"));
    }
}
