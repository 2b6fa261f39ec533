//! Return-error metrics
//!
//! [`compute_return_error`] is the single objective shared by every search
//! and by the verification cascade. Callers that cross-check results must go
//! through it rather than re-deriving the formula.

use crate::se3::{Pose, Trajectory};
use nalgebra::Matrix3;
use serde::{Deserialize, Serialize};

/// `‖R − I‖_F + ‖t‖`; zero exactly at the identity.
pub fn frobenius_distance_to_identity(pose: &Pose) -> f64 {
    pose.distance_to_identity()
}

/// Compound transform of the (optionally doubled) trajectory scaled by λ.
pub fn simulate_cycle(trajectory: &Trajectory, lambda: f64, double: bool) -> Pose {
    let scaled = trajectory.scale(lambda);
    if double {
        scaled.double().compose()
    } else {
        scaled.compose()
    }
}

/// Distance from the compound transform to the identity.
pub fn compute_return_error(trajectory: &Trajectory, lambda: f64, double: bool) -> f64 {
    frobenius_distance_to_identity(&simulate_cycle(trajectory, lambda, double))
}

/// Breakdown returned by [`verify_approximate_return`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReturnMetrics {
    /// Scaling factor evaluated
    pub lambda: f64,
    /// Whether the trajectory was traversed twice
    pub doubled: bool,
    /// `‖R − I‖_F` of the compound transform
    pub rotation_error: f64,
    /// `‖t‖` of the compound transform
    pub translation_error: f64,
    /// Sum of both components; equals [`compute_return_error`]
    pub total_error: f64,
    /// Tolerance the caller supplied
    pub tolerance: f64,
    /// `total_error < tolerance`
    pub return_achieved: bool,
}

/// Evaluate λ and report whether the return lands within `tolerance`.
pub fn verify_approximate_return(
    trajectory: &Trajectory,
    lambda: f64,
    tolerance: f64,
    double: bool,
) -> ReturnMetrics {
    let final_pose = simulate_cycle(trajectory, lambda, double);
    let rotation_error = (final_pose.rotation() - Matrix3::identity()).norm();
    let translation_error = final_pose.translation_norm();
    let total_error = rotation_error + translation_error;

    ReturnMetrics {
        lambda,
        doubled: double,
        rotation_error,
        translation_error,
        total_error,
        tolerance,
        return_achieved: total_error < tolerance,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::Vector3;

    fn pose(rot: [f64; 3], trans: [f64; 3]) -> Pose {
        Pose::from_rotation_vector(Vector3::from(rot), Vector3::from(trans))
    }

    #[test]
    fn test_frobenius_distance_properties() {
        assert!(frobenius_distance_to_identity(&Pose::identity()) < 1e-10);
        assert!(frobenius_distance_to_identity(&pose([0.5, 0.0, 0.0], [1.0, 0.0, 0.0])) > 0.0);
    }

    #[test]
    fn test_identity_trajectory_returns_at_any_lambda() {
        let t = Trajectory::new(vec![Pose::identity(); 3]);
        for lambda in [0.5, 1.0, 2.0] {
            assert_eq!(compute_return_error(&t, lambda, true), 0.0);
        }
    }

    #[test]
    fn test_exact_inverse_pair_returns() {
        let a = pose([0.3, -0.1, 0.2], [0.4, 0.1, 0.0]);
        let t = Trajectory::new(vec![a, a.inverse()]);
        assert!(compute_return_error(&t, 1.0, false) < 1e-12);
        assert!(compute_return_error(&t, 1.0, true) < 1e-12);
    }

    #[test]
    fn test_verify_matches_objective() {
        let t = Trajectory::new(vec![
            pose([0.3, 0.1, 0.0], [0.5, 0.0, 0.0]),
            pose([-0.2, 0.15, 0.0], [0.0, 0.3, 0.0]),
        ]);
        let metrics = verify_approximate_return(&t, 0.7, 10.0, true);
        assert!((metrics.total_error - compute_return_error(&t, 0.7, true)).abs() < 1e-15);
        assert!(metrics.return_achieved);
        assert!(metrics.doubled);

        let strict = verify_approximate_return(&t, 0.7, 1e-9, true);
        assert!(!strict.return_achieved);
    }
}
