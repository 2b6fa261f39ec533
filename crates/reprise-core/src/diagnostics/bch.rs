//! Small-angle composition: Baker–Campbell–Hausdorff truncations
//!
//! For small rotations, `log(e^X e^Y)` is approximately additive in the Lie
//! algebra:
//!
//! ```text
//! log(e^X e^Y) ≈ X + Y + ½[X,Y] + (1/12)([X,[X,Y]] + [Y,[Y,X]]) + …
//! ```
//!
//! This is the only place in the crate where composition is treated as
//! addition. The truncation is trustworthy while both rotation angles stay
//! below π/4; [`predict_composition_accuracy`] reports whether that holds.

use crate::se3::so3::{commutator, hat};
use crate::se3::Pose;
use nalgebra::Matrix3;
use serde::{Deserialize, Serialize};
use std::f64::consts::FRAC_PI_4;

/// Largest rotation angle for which the truncated series is considered
/// predictable.
pub const PREDICTABLE_ANGLE: f64 = FRAC_PI_4;

/// Commutator norm below which the first-order (additive) truncation suffices.
pub const FIRST_ORDER_INTERACTION: f64 = 0.01;

/// Truncation order of the series.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BchOrder {
    /// `X + Y`
    First,
    /// adds `½[X,Y]`
    Second,
    /// adds `(1/12)([X,[X,Y]] + [Y,[Y,X]])`
    Third,
}

/// Approximate `log(e^X e^Y)` for skew-symmetric generators `x`, `y`.
pub fn bch_approximation(x: &Matrix3<f64>, y: &Matrix3<f64>, order: BchOrder) -> Matrix3<f64> {
    let mut result = x + y;
    if order >= BchOrder::Second {
        let xy = commutator(x, y);
        result += xy * 0.5;
        if order >= BchOrder::Third {
            let yx = -xy;
            result += (commutator(x, &xy) + commutator(y, &yx)) / 12.0;
        }
    }
    result
}

/// Whether two poses compose predictably under the truncated series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompositionPrediction {
    /// Rotation angle of the first pose
    pub rot1_angle: f64,
    /// Rotation angle of the second pose
    pub rot2_angle: f64,
    /// First angle below [`PREDICTABLE_ANGLE`]
    pub rot1_small: bool,
    /// Second angle below [`PREDICTABLE_ANGLE`]
    pub rot2_small: bool,
    /// Both angles small
    pub composition_predictable: bool,
    /// Frobenius norm of the generator commutator
    pub interaction_strength: f64,
    /// Lowest order worth using
    pub recommended_order: BchOrder,
}

/// Predict how well the truncated series describes `pose1 ∘ pose2`.
pub fn predict_composition_accuracy(pose1: &Pose, pose2: &Pose) -> CompositionPrediction {
    let w1 = pose1.to_rotation_vector();
    let w2 = pose2.to_rotation_vector();
    let rot1_angle = w1.norm();
    let rot2_angle = w2.norm();
    let rot1_small = rot1_angle < PREDICTABLE_ANGLE;
    let rot2_small = rot2_angle < PREDICTABLE_ANGLE;

    let interaction_strength = commutator(&hat(&w1), &hat(&w2)).norm();
    let recommended_order = if interaction_strength < FIRST_ORDER_INTERACTION {
        BchOrder::First
    } else {
        BchOrder::Second
    };

    CompositionPrediction {
        rot1_angle,
        rot2_angle,
        rot1_small,
        rot2_small,
        composition_predictable: rot1_small && rot2_small,
        interaction_strength,
        recommended_order,
    }
}

/// Order-swap interference: `distance(a∘b, b∘a)`. Zero for commuting poses.
pub fn predict_intervention_interference(a: &Pose, b: &Pose) -> f64 {
    a.compose(b).distance(&b.compose(a))
}

/// How far scaling fails to distribute over composition:
/// `distance(scale(a∘b, λ), scale(a, λ)∘scale(b, λ))`.
pub fn scaling_defect(a: &Pose, b: &Pose, lambda: f64) -> f64 {
    a.compose(b)
        .scale(lambda)
        .distance(&a.scale(lambda).compose(&b.scale(lambda)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::se3::so3::{exp, log, vee};
    use nalgebra::Vector3;

    fn rot(v: [f64; 3]) -> Pose {
        Pose::from_rotation_vector(Vector3::from(v), Vector3::zeros())
    }

    #[test]
    fn test_series_converges_with_order() {
        let wx = Vector3::new(0.1, 0.05, 0.0);
        let wy = Vector3::new(0.0, 0.12, -0.04);
        let exact = log(&(exp(&wx) * exp(&wy)));

        let err = |order| (vee(&bch_approximation(&hat(&wx), &hat(&wy), order)) - exact).norm();
        let (e1, e2, e3) = (err(BchOrder::First), err(BchOrder::Second), err(BchOrder::Third));
        assert!(e2 < e1);
        assert!(e3 < e2);
        assert!(e3 < 1e-4);
    }

    #[test]
    fn test_first_order_exact_for_parallel_generators() {
        let x = hat(&Vector3::new(0.3, 0.0, 0.0));
        let y = hat(&Vector3::new(0.2, 0.0, 0.0));
        let approx = bch_approximation(&x, &y, BchOrder::Third);
        assert!((approx - (x + y)).norm() < 1e-15);
    }

    #[test]
    fn test_prediction_flags() {
        let small = predict_composition_accuracy(&rot([0.1, 0.0, 0.0]), &rot([0.0, 0.1, 0.0]));
        assert!(small.composition_predictable);
        assert_eq!(small.recommended_order, BchOrder::Second);

        let parallel = predict_composition_accuracy(&rot([0.1, 0.0, 0.0]), &rot([0.3, 0.0, 0.0]));
        assert_eq!(parallel.recommended_order, BchOrder::First);

        let large = predict_composition_accuracy(&rot([1.0, 0.0, 0.0]), &rot([0.0, 0.1, 0.0]));
        assert!(!large.rot1_small);
        assert!(large.rot2_small);
        assert!(!large.composition_predictable);
    }

    #[test]
    fn test_commuting_interventions_no_interference() {
        let interference = predict_intervention_interference(&rot([0.1, 0.0, 0.0]), &rot([0.2, 0.0, 0.0]));
        assert!(interference < 0.1);
    }

    #[test]
    fn test_noncommuting_interventions_interference() {
        let interference = predict_intervention_interference(&rot([0.5, 0.0, 0.0]), &rot([0.0, 0.5, 0.0]));
        assert!(interference > 0.05);
    }

    #[test]
    fn test_scaling_distributes_only_for_commuting_poses() {
        let same_axis = scaling_defect(&rot([0.1, 0.0, 0.0]), &rot([0.2, 0.0, 0.0]), 0.5);
        assert!(same_axis < 1e-12);

        let a = Pose::from_rotation_vector(Vector3::new(0.1, 0.0, 0.0), Vector3::new(1.0, 0.0, 0.0));
        let b = Pose::from_rotation_vector(Vector3::new(0.0, 0.1, 0.0), Vector3::new(0.0, 1.0, 0.0));
        assert!(scaling_defect(&a, &b, 0.5) > 0.0);
    }
}
