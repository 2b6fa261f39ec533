//! Reprise Core - approximate return to identity on SE(3)
//!
//! Reprise composes sequences of rigid motions, optionally traverses them
//! twice and rescales them by a factor λ, then measures how close the
//! compound transform comes back to where it started. On top of that
//! measurement it searches for the best λ, checks whether that λ matches a
//! notable constant, and scores the result through a weighted cascade.
//!
//! # Architecture
//!
//! Reprise is built on four layers:
//!
//! 1. **SE(3) algebra** (`se3`): poses, trajectories, exp/log maps
//! 2. **Return engine** (`returns`): return error, λ search, quality calibration
//! 3. **Scoring** (`verification`, `resonance`): five-level cascade and constant matching
//! 4. **Diagnostics** (`diagnostics`): stochastic processes, holonomy, hysteresis, BCH
//!
//! # Quick Start
//!
//! ```
//! use nalgebra::Vector3;
//! use reprise_core::{optimize_scaling_factor, Pose, Trajectory, VerificationCascade};
//!
//! // A small excursion and a partial way back
//! let trajectory = Trajectory::bounded(
//!     vec![
//!         Pose::from_rotation_vector(Vector3::new(0.05, 0.0, 0.0), Vector3::new(0.1, 0.0, 0.0)),
//!         Pose::from_rotation_vector(Vector3::new(-0.05, 0.0, 0.0), Vector3::new(-0.1, 0.0, 0.0)),
//!     ],
//!     1.0,
//! )
//! .unwrap();
//!
//! let optimum = optimize_scaling_factor(&trajectory, true);
//! assert!(optimum.error < 1e-9);
//!
//! let result = VerificationCascade::new().verify_regeneration(&trajectory, optimum.lambda, 100.0);
//! assert!(result.overall_score > 0.5);
//! assert!(result.token_award > 0.0);
//! ```
//!
//! # Design Principles
//!
//! 1. **Order matters**: composition is an explicit group law, never vector addition
//!    outside the documented BCH truncation
//! 2. **Immutability**: poses and trajectories are values; every operation returns a new one
//! 3. **Fail loudly at construction**: invalid poses and out-of-domain trajectories are
//!    errors, unmet search targets are reported as warnings
//! 4. **Reproducibility**: every stochastic component takes a seed

#![deny(unsafe_code)]
#![warn(
    missing_docs,
    rust_2018_idioms,
    missing_debug_implementations,
    clippy::all
)]

pub mod config;
pub mod diagnostics;
pub mod error;
pub mod resonance;
pub mod returns;
pub mod se3;
pub mod verification;

// Re-export commonly used types for convenience
pub use config::{DiagnosticsConfig, RepriseConfig};
pub use diagnostics::{
    compute_geometric_phase, predict_composition_accuracy, predict_intervention_interference,
    HysteresisTracker, OrnsteinUhlenbeckProcess, TetheredWalker,
};
pub use error::{ConvergenceWarning, RepriseError, Result, ResultExt};
pub use resonance::{
    ResonanceAwareOptimizer, ResonanceConfig, ResonanceDetector, ResonanceResult,
    RESONANCE_CONSTANTS,
};
pub use returns::{
    compute_return_error, frobenius_distance_to_identity, optimize_scaling_factor,
    verify_approximate_return, ReturnMetrics, ReturnQualityCalibrator, ScalingOptimizer,
    ScalingOptimum,
};
pub use se3::{generate_random_trajectory, Pose, RandomTrajectorySpec, Trajectory};
pub use verification::{CascadeConfig, VerificationCascade, VerificationLevel, VerificationResult};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");
