//! Return error and scaling-factor search - Layer 2 of Reprise
//!
//! A trajectory "returns" when its compound transform, after scaling every
//! pose by λ and optionally traversing the sequence twice, lands near the
//! identity. This module measures that distance and searches for λ.
//!
//! ```text
//! Trajectory ──scale(λ)──> T^λ ──double──> T^λ ++ T^λ ──compose──> P
//!                                                                  │
//!                                         ‖R_P − I‖_F + ‖t_P‖ <────┘
//! ```
//!
//! - [`compute_return_error`]: the universal objective
//! - [`ScalingOptimizer`]: bounded derivative-free minimisation over λ
//! - [`ReturnQualityCalibrator`]: search for a target quality `exp(−error)`

pub mod calibrator;
pub mod metrics;
pub mod optimizer;

pub use calibrator::{
    quality_from_error, CalibrationConfig, CalibrationReport, CalibrationStep,
    CalibrationStrategy, ReturnQualityCalibrator,
};
pub use metrics::{
    compute_return_error, frobenius_distance_to_identity, simulate_cycle,
    verify_approximate_return, ReturnMetrics,
};
pub use optimizer::{
    optimize_scaling_factor, optimize_scaling_factor_within, OptimizerConfig, ScalarMinimum,
    ScalingOptimizer, ScalingOptimum,
};
