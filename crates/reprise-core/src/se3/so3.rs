//! SO(3) primitives: hat/vee, exponential and logarithm maps
//!
//! The rotation group is handled through 3×3 matrices and axis-angle
//! (rotation) vectors. Both maps have closed forms (Rodrigues) that lose
//! precision near θ = 0 and θ = π; each has an explicit branch for those
//! regions so that no input produces NaN.

use nalgebra::{Matrix3, Vector3};

/// Below this angle the Taylor expansions replace the closed forms.
pub const SMALL_ANGLE: f64 = 1e-6;

/// Sin θ below this value (with cos θ < 0) selects the near-π logarithm.
const NEAR_PI_SIN: f64 = 1e-2;

/// Tolerance used when validating user-supplied rotation matrices.
pub const ORTHONORMAL_TOLERANCE: f64 = 1e-6;

/// Skew-symmetric matrix `[v]×` of a 3-vector (an element of so(3)).
pub fn hat(v: &Vector3<f64>) -> Matrix3<f64> {
    Matrix3::new(
        0.0, -v.z, v.y, //
        v.z, 0.0, -v.x, //
        -v.y, v.x, 0.0,
    )
}

/// Inverse of [`hat`]. Only the skew part of `m` is read.
pub fn vee(m: &Matrix3<f64>) -> Vector3<f64> {
    Vector3::new(m[(2, 1)], m[(0, 2)], m[(1, 0)])
}

/// Lie bracket `[X, Y] = XY − YX`.
pub fn commutator(x: &Matrix3<f64>, y: &Matrix3<f64>) -> Matrix3<f64> {
    x * y - y * x
}

/// Exponential map so(3) → SO(3) from a rotation vector.
pub fn exp(omega: &Vector3<f64>) -> Matrix3<f64> {
    let theta_sq = omega.norm_squared();
    let theta = theta_sq.sqrt();
    let k = hat(omega);

    let (a, b) = if theta < SMALL_ANGLE {
        (1.0 - theta_sq / 6.0, 0.5 - theta_sq / 24.0)
    } else {
        (theta.sin() / theta, (1.0 - theta.cos()) / theta_sq)
    };

    Matrix3::identity() + k * a + k * k * b
}

/// Logarithm map SO(3) → so(3) as a rotation vector with angle in `[0, π]`.
///
/// `r` is assumed orthonormal; callers validate before reaching here.
pub fn log(r: &Matrix3<f64>) -> Vector3<f64> {
    // vee(R − Rᵀ) = 2 sin θ · n
    let skew = vee(&(r - r.transpose()));
    let sin_theta = 0.5 * skew.norm();
    let cos_theta = (r.trace() - 1.0) * 0.5;
    let theta = sin_theta.atan2(cos_theta);

    if theta < SMALL_ANGLE {
        // θ / (2 sin θ) ≈ 1/2 + θ²/12
        return skew * (0.5 + theta * theta / 12.0);
    }

    if sin_theta < NEAR_PI_SIN && cos_theta < 0.0 {
        return theta * near_pi_axis(r, cos_theta, &skew);
    }

    skew * (theta / (2.0 * sin_theta))
}

/// Rotation axis for angles close to π, where the skew part vanishes.
///
/// Uses `n nᵀ = (sym(R) − cos θ·I) / (1 − cos θ)` and reads the column with
/// the largest diagonal entry; the sign comes from the residual skew part.
fn near_pi_axis(r: &Matrix3<f64>, cos_theta: f64, skew: &Vector3<f64>) -> Vector3<f64> {
    let sym = (r + r.transpose()) * 0.5;
    let outer = (sym - Matrix3::identity() * cos_theta) / (1.0 - cos_theta);

    let mut k = 0;
    for i in 1..3 {
        if outer[(i, i)] > outer[(k, k)] {
            k = i;
        }
    }

    let pivot = outer[(k, k)].max(0.0).sqrt();
    if pivot < f64::EPSILON {
        return Vector3::x();
    }

    let mut axis: Vector3<f64> = outer.column(k) / pivot;
    let norm = axis.norm();
    if norm < f64::EPSILON {
        return Vector3::x();
    }
    axis /= norm;

    if skew.dot(&axis) < 0.0 {
        axis = -axis;
    }
    axis
}

/// Rotation angle of an orthonormal matrix, in `[0, π]`.
pub fn angle(r: &Matrix3<f64>) -> f64 {
    let sin_theta = 0.5 * vee(&(r - r.transpose())).norm();
    sin_theta.atan2((r.trace() - 1.0) * 0.5)
}

/// Project a nearly-orthonormal matrix back onto SO(3).
///
/// Gram-Schmidt on the first two columns, third column from their cross
/// product, so the determinant is +1 by construction.
pub fn orthonormalize(m: &Matrix3<f64>) -> Matrix3<f64> {
    let c0: Vector3<f64> = m.column(0).into_owned();
    let c1: Vector3<f64> = m.column(1).into_owned();

    let n0 = c0.norm();
    if n0 < f64::EPSILON {
        return Matrix3::identity();
    }
    let x = c0 / n0;

    let c1_perp = c1 - x * x.dot(&c1);
    let n1 = c1_perp.norm();
    let y = if n1 < f64::EPSILON {
        any_orthogonal(&x)
    } else {
        c1_perp / n1
    };
    let z = x.cross(&y);

    Matrix3::from_columns(&[x, y, z])
}

fn any_orthogonal(v: &Vector3<f64>) -> Vector3<f64> {
    let helper = if v.x.abs() < 0.9 {
        Vector3::x()
    } else {
        Vector3::y()
    };
    v.cross(&helper).normalize()
}

/// Deviation of `m` from a proper rotation: `(‖mᵀm − I‖_F, |det m − 1|)`.
pub fn orthonormality_defect(m: &Matrix3<f64>) -> (f64, f64) {
    let gram = m.transpose() * m - Matrix3::identity();
    (gram.norm(), (m.determinant() - 1.0).abs())
}

/// True when `m` is a proper rotation within [`ORTHONORMAL_TOLERANCE`].
pub fn is_rotation(m: &Matrix3<f64>) -> bool {
    let (gram, det) = orthonormality_defect(m);
    m.iter().all(|v| v.is_finite()) && gram < ORTHONORMAL_TOLERANCE && det < ORTHONORMAL_TOLERANCE
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::PI;

    fn assert_vec_close(a: &Vector3<f64>, b: &Vector3<f64>, tol: f64) {
        assert!((a - b).norm() < tol, "{a:?} != {b:?}");
    }

    #[test]
    fn test_hat_vee_roundtrip() {
        let v = Vector3::new(0.3, -1.2, 2.5);
        assert_vec_close(&vee(&hat(&v)), &v, 1e-15);
        let h = hat(&v);
        assert!((h + h.transpose()).norm() < 1e-15);
    }

    #[test]
    fn test_exp_log_generic_angle() {
        let v = Vector3::new(0.4, -0.2, 0.9);
        let r = exp(&v);
        assert!(is_rotation(&r));
        assert_vec_close(&log(&r), &v, 1e-12);
    }

    #[test]
    fn test_exp_zero_is_identity() {
        let r = exp(&Vector3::zeros());
        assert_eq!(r, Matrix3::identity());
        assert_eq!(log(&r), Vector3::zeros());
    }

    #[test]
    fn test_tiny_angle_has_no_nan() {
        let v = Vector3::new(1e-12, -3e-13, 2e-12);
        let r = exp(&v);
        let back = log(&r);
        assert!(back.iter().all(|x| x.is_finite()));
        assert_vec_close(&back, &v, 1e-15);
    }

    #[test]
    fn test_log_at_pi() {
        for axis in [Vector3::x(), Vector3::y(), Vector3::z()] {
            let r = exp(&(axis * PI));
            let w = log(&r);
            assert!(w.iter().all(|x| x.is_finite()));
            assert!((w.norm() - PI).abs() < 1e-9);
            // ±axis·π describe the same rotation
            assert!((exp(&w) - r).norm() < 1e-9);
        }
    }

    #[test]
    fn test_log_just_below_pi_keeps_sign() {
        let axis = Vector3::new(1.0, 2.0, -0.5).normalize();
        let v = axis * (PI - 1e-5);
        let w = log(&exp(&v));
        assert_vec_close(&w, &v, 1e-6);
    }

    #[test]
    fn test_round_trip_precision_near_pi() {
        let axis = Vector3::new(1.0, 2.0, 3.0).normalize();
        for gap in [2e-2, 9e-3, 2e-3, 9e-4, 1e-6, 1e-9] {
            let v = axis * (PI - gap);
            let r = exp(&v);
            let w = log(&r);
            assert!((exp(&w) - r).norm() < 1e-12, "gap {gap}: {:e}", (exp(&w) - r).norm());
            assert_vec_close(&w, &v, 1e-9);
            assert!((angle(&r) - (PI - gap)).abs() < 1e-12);
        }
    }

    #[test]
    fn test_orthonormalize_repairs_drift() {
        let mut m = exp(&Vector3::new(0.2, 0.1, -0.3));
        m[(0, 1)] += 1e-4;
        m[(2, 2)] -= 2e-4;
        assert!(!is_rotation(&m));
        let fixed = orthonormalize(&m);
        assert!(is_rotation(&fixed));
    }

    #[test]
    fn test_commutator_of_parallel_generators_vanishes() {
        let x = hat(&Vector3::new(0.1, 0.0, 0.0));
        let y = hat(&Vector3::new(0.7, 0.0, 0.0));
        assert!(commutator(&x, &y).norm() < 1e-15);
    }
}
