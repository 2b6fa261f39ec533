//! Pose - an element of the rigid-motion group SE(3)
//!
//! A pose pairs an orthonormal rotation (determinant +1) with a translation.
//! Poses are immutable values: every operation returns a new pose and every
//! constructor either guarantees the rotation invariant or fails with
//! [`RepriseError::InvalidPose`].

use super::so3;
use crate::error::{RepriseError, Result};
use nalgebra::{Matrix3, Quaternion, Rotation3, UnitQuaternion, Vector3};
use serde::{Deserialize, Serialize};

/// Tolerance on the norm of a quaternion supplied as "unit".
const UNIT_QUATERNION_TOLERANCE: f64 = 1e-6;

/// Rigid-body transformation `x ↦ R·x + t`.
///
/// # Examples
///
/// ```
/// use reprise_core::se3::Pose;
/// use nalgebra::Vector3;
///
/// let a = Pose::from_rotation_vector(Vector3::new(0.1, 0.0, 0.0), Vector3::new(1.0, 0.0, 0.0));
/// let back = a.compose(&a.inverse());
/// assert!(back.distance_to_identity() < 1e-12);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "PoseRepr", into = "PoseRepr")]
pub struct Pose {
    rotation: Rotation3<f64>,
    translation: Vector3<f64>,
}

impl Pose {
    /// The group identity: `R = I`, `t = 0`.
    pub fn identity() -> Self {
        Self {
            rotation: Rotation3::identity(),
            translation: Vector3::zeros(),
        }
    }

    /// Build from an axis-angle rotation vector and a translation.
    ///
    /// The exponential map yields a rotation for every finite vector, and the
    /// result is re-orthonormalised. Inputs are trusted to be finite; use
    /// [`Pose::try_from_rotation_vector`] for values from outside the crate.
    pub fn from_rotation_vector(rotation_vector: Vector3<f64>, translation: Vector3<f64>) -> Self {
        let matrix = so3::orthonormalize(&so3::exp(&rotation_vector));
        Self {
            rotation: Rotation3::from_matrix_unchecked(matrix),
            translation,
        }
    }

    /// Checked form of [`Pose::from_rotation_vector`]: non-finite entries in
    /// either vector fail with [`RepriseError::InvalidPose`].
    pub fn try_from_rotation_vector(
        rotation_vector: Vector3<f64>,
        translation: Vector3<f64>,
    ) -> Result<Self> {
        check_finite("rotation vector", &rotation_vector)?;
        check_finite("translation", &translation)?;
        Ok(Self::from_rotation_vector(rotation_vector, translation))
    }

    /// Build from a unit quaternion `(w, x, y, z)` and a translation.
    pub fn from_quaternion(quaternion: [f64; 4], translation: Vector3<f64>) -> Result<Self> {
        let [w, x, y, z] = quaternion;
        let q = Quaternion::new(w, x, y, z);
        let norm = q.norm();
        if !norm.is_finite() || (norm - 1.0).abs() > UNIT_QUATERNION_TOLERANCE {
            return Err(RepriseError::InvalidPose(format!(
                "quaternion norm {norm:.9} is not 1"
            )));
        }
        check_finite("translation", &translation)?;

        let unit = UnitQuaternion::from_quaternion(q);
        let matrix = so3::orthonormalize(unit.to_rotation_matrix().matrix());
        Ok(Self {
            rotation: Rotation3::from_matrix_unchecked(matrix),
            translation,
        })
    }

    /// Build from a rotation matrix, which must already be orthonormal with
    /// determinant +1.
    pub fn from_matrix(rotation: Matrix3<f64>, translation: Vector3<f64>) -> Result<Self> {
        if !so3::is_rotation(&rotation) {
            let (gram, det) = so3::orthonormality_defect(&rotation);
            return Err(RepriseError::InvalidPose(format!(
                "rotation is not orthonormal (‖RᵀR − I‖ = {gram:.3e}, |det − 1| = {det:.3e})"
            )));
        }
        check_finite("translation", &translation)?;

        Ok(Self {
            rotation: Rotation3::from_matrix_unchecked(so3::orthonormalize(&rotation)),
            translation,
        })
    }

    /// Build from raw slices: a row-major 3×3 rotation (9 values) and a
    /// translation (3 values).
    pub fn from_slices(rotation: &[f64], translation: &[f64]) -> Result<Self> {
        if rotation.len() != 9 {
            return Err(RepriseError::InvalidPose(format!(
                "rotation needs 9 entries, got {}",
                rotation.len()
            )));
        }
        if translation.len() != 3 {
            return Err(RepriseError::InvalidPose(format!(
                "translation needs 3 entries, got {}",
                translation.len()
            )));
        }
        Self::from_matrix(
            Matrix3::from_row_slice(rotation),
            Vector3::from_column_slice(translation),
        )
    }

    /// Rotation component.
    pub fn rotation(&self) -> &Matrix3<f64> {
        self.rotation.matrix()
    }

    /// Translation component.
    pub fn translation(&self) -> &Vector3<f64> {
        &self.translation
    }

    /// Axis-angle read-back (angle in `[0, π]`).
    pub fn to_rotation_vector(&self) -> Vector3<f64> {
        so3::log(self.rotation.matrix())
    }

    /// Unit quaternion read-back as `(w, x, y, z)` with `w ≥ 0`.
    pub fn to_quaternion(&self) -> [f64; 4] {
        let q = UnitQuaternion::from_rotation_matrix(&self.rotation);
        let q = q.quaternion();
        let sign = if q.w < 0.0 { -1.0 } else { 1.0 };
        [sign * q.w, sign * q.i, sign * q.j, sign * q.k]
    }

    /// Rotation angle in radians.
    pub fn rotation_angle(&self) -> f64 {
        so3::angle(self.rotation.matrix())
    }

    /// Euclidean norm of the translation.
    pub fn translation_norm(&self) -> f64 {
        self.translation.norm()
    }

    /// Group law: `(R₁, t₁)·(R₂, t₂) = (R₁R₂, R₁t₂ + t₁)`.
    ///
    /// Not commutative; `a.compose(&b)` applies `b` first, then `a`.
    pub fn compose(&self, other: &Pose) -> Pose {
        Pose {
            rotation: self.rotation * other.rotation,
            translation: self.rotation * other.translation + self.translation,
        }
    }

    /// Group inverse: `(Rᵀ, −Rᵀt)`.
    pub fn inverse(&self) -> Pose {
        let inv = self.rotation.inverse();
        Pose {
            rotation: inv,
            translation: -(inv * self.translation),
        }
    }

    /// Generalised power `P^λ`.
    ///
    /// Modelling choice: the rotation follows the one-parameter subgroup
    /// `exp(λ·log R)` but the translation is scaled linearly (`λ·t`) instead
    /// of through the SE(3) left Jacobian. The two agree to first order in the
    /// rotation angle, so the approximation holds in the small-angle regime
    /// (individual angles below π/4, see [`crate::diagnostics::bch`]).
    pub fn scale(&self, lambda: f64) -> Pose {
        Pose::from_rotation_vector(self.to_rotation_vector() * lambda, self.translation * lambda)
    }

    /// Frobenius distance to the identity: `‖R − I‖_F + ‖t‖`.
    pub fn distance_to_identity(&self) -> f64 {
        (self.rotation.matrix() - Matrix3::identity()).norm() + self.translation.norm()
    }

    /// Same metric between two poses: `‖R₁ − R₂‖_F + ‖t₁ − t₂‖`.
    pub fn distance(&self, other: &Pose) -> f64 {
        (self.rotation.matrix() - other.rotation.matrix()).norm()
            + (self.translation - other.translation).norm()
    }

    /// True when every rotation and translation entry is finite.
    pub fn is_finite(&self) -> bool {
        self.rotation.matrix().iter().all(|x| x.is_finite())
            && self.translation.iter().all(|x| x.is_finite())
    }

    /// Component-wise closeness check used by tests and callers.
    pub fn approx_eq(&self, other: &Pose, tolerance: f64) -> bool {
        self.distance(other) <= tolerance
    }
}

impl Default for Pose {
    fn default() -> Self {
        Self::identity()
    }
}

fn check_finite(what: &str, v: &Vector3<f64>) -> Result<()> {
    if v.iter().all(|x| x.is_finite()) {
        Ok(())
    } else {
        Err(RepriseError::InvalidPose(format!(
            "{what} has non-finite entries: [{}, {}, {}]",
            v.x, v.y, v.z
        )))
    }
}

/// Plain wire form of a pose; validated on the way in.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct PoseRepr {
    rotation: [[f64; 3]; 3],
    translation: [f64; 3],
}

impl TryFrom<PoseRepr> for Pose {
    type Error = RepriseError;

    fn try_from(repr: PoseRepr) -> Result<Self> {
        let flat: Vec<f64> = repr.rotation.iter().flatten().copied().collect();
        Pose::from_slices(&flat, &repr.translation)
    }
}

impl From<Pose> for PoseRepr {
    fn from(pose: Pose) -> Self {
        let m = pose.rotation.matrix();
        let mut rotation = [[0.0; 3]; 3];
        for (i, row) in rotation.iter_mut().enumerate() {
            for (j, value) in row.iter_mut().enumerate() {
                *value = m[(i, j)];
            }
        }
        PoseRepr {
            rotation,
            translation: [pose.translation.x, pose.translation.y, pose.translation.z],
        }
    }
}
