//! Geometric (holonomy) phase of a traversed loop

use crate::se3::{Pose, Trajectory};
use nalgebra::Vector3;
use serde::{Deserialize, Serialize};

/// Residual transform accumulated around a loop, in logarithmic coordinates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeometricPhase {
    /// Axis-angle of the closing rotation
    pub rotation_phase: Vector3<f64>,
    /// Translation of the closing transform
    pub translation_phase: Vector3<f64>,
    /// Enclosed-area proxy: `Σ ½‖tᵢ × tᵢ₊₁‖` over consecutive translations
    pub loop_area: f64,
}

impl GeometricPhase {
    /// `‖rotation_phase‖ + ‖translation_phase‖`
    pub fn total_magnitude(&self) -> f64 {
        self.rotation_phase.norm() + self.translation_phase.norm()
    }
}

/// Phase of `trajectory`.
///
/// With `close_loop`, the compound transform is composed with its own
/// inverse first, so the phase measures only the numerical residue of the
/// closure. Without it, the phase is the open compound transform itself.
/// `loop_area` is a cross-product proxy, not a surface integral.
pub fn compute_geometric_phase(trajectory: &Trajectory, close_loop: bool) -> GeometricPhase {
    let total = trajectory.compose();
    let closed: Pose = if close_loop {
        total.compose(&total.inverse())
    } else {
        total
    };

    let loop_area = trajectory
        .poses()
        .windows(2)
        .map(|pair| 0.5 * pair[0].translation().cross(pair[1].translation()).norm())
        .sum();

    GeometricPhase {
        rotation_phase: closed.to_rotation_vector(),
        translation_phase: *closed.translation(),
        loop_area,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pose(rot: [f64; 3], trans: [f64; 3]) -> Pose {
        Pose::from_rotation_vector(Vector3::from(rot), Vector3::from(trans))
    }

    fn square() -> Trajectory {
        Trajectory::new(vec![
            pose([0.0, 0.0, 0.2], [1.0, 0.0, 0.0]),
            pose([0.0, 0.0, 0.2], [0.0, 1.0, 0.0]),
            pose([0.0, 0.0, 0.2], [-1.0, 0.0, 0.0]),
        ])
    }

    #[test]
    fn test_closed_loop_phase_vanishes() {
        let phase = compute_geometric_phase(&square(), true);
        assert!(phase.total_magnitude() < 1e-9);
    }

    #[test]
    fn test_open_loop_phase_is_compound_transform() {
        let t = square();
        let phase = compute_geometric_phase(&t, false);
        assert!((phase.rotation_phase - Vector3::new(0.0, 0.0, 0.6)).norm() < 1e-12);
        assert!((phase.translation_phase - t.compose().translation()).norm() < 1e-12);
    }

    #[test]
    fn test_loop_area_proxy() {
        let phase = compute_geometric_phase(&square(), true);
        // ½|x × y| + ½|y × −x| = 1
        assert!((phase.loop_area - 1.0).abs() < 1e-12);
    }
}
