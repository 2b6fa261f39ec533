//! Error types for Reprise Core
//!
//! This module defines the error taxonomy of the rigid-motion core.
//! We use `thiserror` for ergonomic error definitions with automatic Display/Error implementations.
//!
//! Only construction-time invariant violations are errors. Search budgets that
//! run out are reported through [`ConvergenceWarning`] inside the returned
//! diagnostics, and degenerate rotations (zero or π angle) are ordinary inputs.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type alias for Reprise operations
pub type Result<T> = std::result::Result<T, RepriseError>;

/// Main error type for Reprise operations
#[derive(Error, Debug)]
pub enum RepriseError {
    /// Malformed rotation/translation or a non-orthonormal rotation
    #[error("Invalid pose: {0}")]
    InvalidPose(String),

    /// A bounded trajectory contains a pose outside its radius
    #[error("Invalid domain: pose {index} has translation norm {norm:.6} > r_max {r_max:.6}")]
    InvalidDomain {
        /// Position of the offending pose in the trajectory
        index: usize,
        /// Translation norm of the offending pose
        norm: f64,
        /// Configured domain radius
        r_max: f64,
    },

    /// The domain radius itself is unusable
    #[error("Invalid domain radius: {0}")]
    InvalidRadius(String),

    /// Configuration values out of range
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Serialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Generic error with context
    #[error("{context}: {source}")]
    WithContext {
        /// Description of the failed operation
        context: String,
        /// Underlying error
        source: Box<RepriseError>,
    },
}

impl RepriseError {
    /// Add context to an error
    pub fn context(self, context: impl Into<String>) -> Self {
        Self::WithContext {
            context: context.into(),
            source: Box::new(self),
        }
    }

    /// True for bounded-domain violations, looking through context wrappers
    pub fn is_invalid_domain(&self) -> bool {
        match self {
            Self::InvalidDomain { .. } | Self::InvalidRadius(_) => true,
            Self::WithContext { source, .. } => source.is_invalid_domain(),
            _ => false,
        }
    }

    /// True for malformed poses, looking through context wrappers
    pub fn is_invalid_pose(&self) -> bool {
        match self {
            Self::InvalidPose(_) => true,
            Self::WithContext { source, .. } => source.is_invalid_pose(),
            _ => false,
        }
    }
}

impl From<toml::de::Error> for RepriseError {
    fn from(e: toml::de::Error) -> Self {
        RepriseError::InvalidConfig(e.to_string())
    }
}

impl From<toml::ser::Error> for RepriseError {
    fn from(e: toml::ser::Error) -> Self {
        RepriseError::InvalidConfig(e.to_string())
    }
}

/// Extension trait for adding context to Results
pub trait ResultExt<T> {
    /// Add context to a Result
    fn context(self, context: impl Into<String>) -> Result<T>;

    /// Add lazy context to a Result
    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String;
}

impl<T> ResultExt<T> for Result<T> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| e.context(context))
    }

    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|e| e.context(f()))
    }
}

/// A search ran out of iterations before reaching its target.
///
/// Never raised. Carried in optimizer and calibrator results so callers can
/// decide what an unmet target means for them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConvergenceWarning {
    /// Which search produced the warning
    pub source: String,
    /// Iterations actually spent
    pub iterations: usize,
    /// Best objective value reached
    pub achieved: f64,
    /// Value the search was aiming for
    pub target: f64,
}

impl std::fmt::Display for ConvergenceWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} stopped after {} iterations at {:.6} (target {:.6})",
            self.source, self.iterations, self.achieved, self.target
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_context() {
        let err = RepriseError::InvalidPose("rotation is not orthonormal".into());
        let err = err.context("Failed to build trajectory");

        assert!(err.to_string().contains("Failed to build trajectory"));
        assert!(err.is_invalid_pose());
        assert!(!err.is_invalid_domain());
    }

    #[test]
    fn test_result_ext() {
        let result: Result<()> = Err(RepriseError::InvalidDomain {
            index: 0,
            norm: 2.0,
            r_max: 1.0,
        });
        let result = result.with_context(|| "Bounded trajectory".to_string());

        let err = result.unwrap_err();
        assert!(err.to_string().contains("Bounded trajectory"));
        assert!(err.is_invalid_domain());
    }

    #[test]
    fn test_convergence_warning_display() {
        let warning = ConvergenceWarning {
            source: "calibrator".into(),
            iterations: 20,
            achieved: 0.8,
            target: 0.95,
        };
        assert!(warning.to_string().contains("20 iterations"));
    }
}
