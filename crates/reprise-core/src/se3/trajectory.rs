//! Trajectory - an ordered, immutable sequence of poses
//!
//! Traversal order defines the compounded transform. A trajectory may be
//! flagged bounded with a radius `r_max`; the bound is checked once, when the
//! trajectory is built, and a violation is reported immediately.

use super::pose::Pose;
use crate::error::{RepriseError, Result};
use serde::{Deserialize, Serialize};

/// Ordered sequence of SE(3) poses.
///
/// # Examples
///
/// ```
/// use reprise_core::se3::{Pose, Trajectory};
/// use nalgebra::Vector3;
///
/// let step = Pose::from_rotation_vector(Vector3::zeros(), Vector3::new(0.5, 0.0, 0.0));
/// let bounded = Trajectory::bounded(vec![step], 1.0).unwrap();
/// assert_eq!(bounded.double().len(), 2);
///
/// let far = Pose::from_rotation_vector(Vector3::zeros(), Vector3::new(2.0, 0.0, 0.0));
/// assert!(Trajectory::bounded(vec![far], 1.0).is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "TrajectoryRepr", into = "TrajectoryRepr")]
pub struct Trajectory {
    poses: Vec<Pose>,
    r_max: Option<f64>,
}

impl Trajectory {
    /// Unbounded trajectory over `poses`.
    pub fn new(poses: Vec<Pose>) -> Self {
        Self { poses, r_max: None }
    }

    /// Bounded trajectory: every pose must be finite and every translation
    /// norm `≤ r_max`.
    pub fn bounded(poses: Vec<Pose>, r_max: f64) -> Result<Self> {
        if !r_max.is_finite() || r_max <= 0.0 {
            return Err(RepriseError::InvalidRadius(format!(
                "r_max must be positive and finite, got {r_max}"
            )));
        }

        if let Some(index) = poses.iter().position(|p| !p.is_finite()) {
            return Err(RepriseError::InvalidPose(format!(
                "pose {index} has non-finite entries"
            )));
        }

        if let Some((index, norm)) = first_violation(&poses, r_max) {
            return Err(RepriseError::InvalidDomain { index, norm, r_max });
        }

        Ok(Self {
            poses,
            r_max: Some(r_max),
        })
    }

    /// Build with an optional bound, dispatching to [`Trajectory::new`] or
    /// [`Trajectory::bounded`].
    pub fn with_bound(poses: Vec<Pose>, r_max: Option<f64>) -> Result<Self> {
        match r_max {
            Some(r) => Self::bounded(poses, r),
            None => Ok(Self::new(poses)),
        }
    }

    /// Poses in traversal order.
    pub fn poses(&self) -> &[Pose] {
        &self.poses
    }

    /// Number of poses.
    pub fn len(&self) -> usize {
        self.poses.len()
    }

    /// True when the trajectory holds no poses.
    pub fn is_empty(&self) -> bool {
        self.poses.is_empty()
    }

    /// Whether the trajectory carries a domain radius.
    pub fn is_bounded(&self) -> bool {
        self.r_max.is_some()
    }

    /// Domain radius, if bounded.
    pub fn r_max(&self) -> Option<f64> {
        self.r_max
    }

    /// Iterate over the poses in order.
    pub fn iter(&self) -> std::slice::Iter<'_, Pose> {
        self.poses.iter()
    }

    /// Left-to-right fold of the group law; empty trajectories compose to
    /// the identity.
    pub fn compose(&self) -> Pose {
        self.poses
            .iter()
            .fold(Pose::identity(), |acc, pose| acc.compose(pose))
    }

    /// The trajectory followed by a copy of itself. Length doubles, order
    /// and bound are preserved.
    pub fn double(&self) -> Trajectory {
        let mut poses = Vec::with_capacity(self.poses.len() * 2);
        poses.extend_from_slice(&self.poses);
        poses.extend_from_slice(&self.poses);
        Trajectory {
            poses,
            r_max: self.r_max,
        }
    }

    /// Pointwise [`Pose::scale`].
    ///
    /// The result is unbounded: λ > 1 may push translations past `r_max`,
    /// and the bound describes the input domain, not the scaled one.
    pub fn scale(&self, lambda: f64) -> Trajectory {
        Trajectory::new(self.poses.iter().map(|p| p.scale(lambda)).collect())
    }

    /// True iff every translation norm is within `r_max` (trivially true
    /// when unbounded).
    pub fn within_bounds(&self) -> bool {
        match self.r_max {
            Some(r_max) => first_violation(&self.poses, r_max).is_none(),
            None => true,
        }
    }

    /// Drop the bound, keeping the poses.
    pub fn unbounded(&self) -> Trajectory {
        Trajectory::new(self.poses.clone())
    }
}

impl<'a> IntoIterator for &'a Trajectory {
    type Item = &'a Pose;
    type IntoIter = std::slice::Iter<'a, Pose>;

    fn into_iter(self) -> Self::IntoIter {
        self.poses.iter()
    }
}

fn first_violation(poses: &[Pose], r_max: f64) -> Option<(usize, f64)> {
    poses
        .iter()
        .map(Pose::translation_norm)
        .enumerate()
        .find(|(_, norm)| norm.is_nan() || *norm > r_max)
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct TrajectoryRepr {
    poses: Vec<Pose>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    r_max: Option<f64>,
}

impl TryFrom<TrajectoryRepr> for Trajectory {
    type Error = RepriseError;

    fn try_from(repr: TrajectoryRepr) -> Result<Self> {
        Trajectory::with_bound(repr.poses, repr.r_max)
    }
}

impl From<Trajectory> for TrajectoryRepr {
    fn from(t: Trajectory) -> Self {
        TrajectoryRepr {
            poses: t.poses,
            r_max: t.r_max,
        }
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
    fn test_bounded_trajectory_validation() {
        let valid = Trajectory::bounded(vec![pose([0.0; 3], [0.5, 0.5, 0.0])], 1.0).unwrap();
        assert_eq!(valid.len(), 1);
        assert!(valid.is_bounded());

        let err = Trajectory::bounded(vec![pose([0.0; 3], [2.0, 0.0, 0.0])], 1.0).unwrap_err();
        match err {
            RepriseError::InvalidDomain { index, norm, r_max } => {
                assert_eq!(index, 0);
                assert!((norm - 2.0).abs() < 1e-12);
                assert_eq!(r_max, 1.0);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_non_finite_poses_rejected_when_bounded() {
        let nan_translation = pose([0.0; 3], [f64::NAN, 0.0, 0.0]);
        let err = Trajectory::bounded(vec![Pose::identity(), nan_translation], 1.0).unwrap_err();
        assert!(err.is_invalid_pose());
        assert!(err.to_string().contains("pose 1"));

        let nan_rotation = pose([f64::NAN, 0.0, 0.0], [0.0; 3]);
        assert!(Trajectory::bounded(vec![nan_rotation], 1.0)
            .unwrap_err()
            .is_invalid_pose());
    }

    #[test]
    fn test_nan_translation_is_out_of_bounds() {
        let t = Trajectory {
            poses: vec![pose([0.0; 3], [0.0, f64::NAN, 0.0])],
            r_max: Some(1.0),
        };
        assert!(!t.within_bounds());
    }

    #[test]
    fn test_bad_radius_rejected() {
        assert!(Trajectory::bounded(vec![], 0.0).unwrap_err().is_invalid_domain());
        assert!(Trajectory::bounded(vec![], f64::NAN).is_err());
    }

    #[test]
    fn test_empty_composes_to_identity() {
        let t = Trajectory::new(vec![]);
        assert!(t.is_empty());
        assert_eq!(t.compose(), Pose::identity());
    }

    #[test]
    fn test_compose_order_matters() {
        let a = pose([0.4, 0.0, 0.0], [1.0, 0.0, 0.0]);
        let b = pose([0.0, 0.4, 0.0], [0.0, 1.0, 0.0]);
        let ab = Trajectory::new(vec![a, b]).compose();
        let ba = Trajectory::new(vec![b, a]).compose();
        assert!(ab.approx_eq(&a.compose(&b), 1e-12));
        assert!(ab.distance(&ba) > 1e-3);
    }

    #[test]
    fn test_double_preserves_order_and_bound() {
        let a = pose([0.1, 0.0, 0.0], [0.1, 0.0, 0.0]);
        let b = pose([0.0, 0.2, 0.0], [0.0, 0.2, 0.0]);
        let t = Trajectory::bounded(vec![a, b], 1.0).unwrap();
        let d = t.double();
        assert_eq!(d.len(), 4);
        assert_eq!(d.poses(), &[a, b, a, b]);
        assert_eq!(d.r_max(), Some(1.0));
        assert!(d.compose().approx_eq(&t.compose().compose(&t.compose()), 1e-12));
    }

    #[test]
    fn test_scale_is_pointwise() {
        let a = pose([0.2, 0.0, 0.0], [0.8, 0.0, 0.0]);
        let t = Trajectory::bounded(vec![a], 1.0).unwrap();
        let scaled = t.scale(2.0);
        assert!(!scaled.is_bounded());
        assert!(scaled.poses()[0].approx_eq(&a.scale(2.0), 1e-12));
        assert!((scaled.poses()[0].translation_norm() - 1.6).abs() < 1e-12);
    }

    #[test]
    fn test_within_bounds() {
        let t = Trajectory::new(vec![pose([0.0; 3], [5.0, 0.0, 0.0])]);
        assert!(t.within_bounds());
        let b = Trajectory::bounded(vec![pose([0.0; 3], [0.9, 0.0, 0.0])], 1.0).unwrap();
        assert!(b.within_bounds());
    }

    #[test]
    fn test_deserialize_enforces_bound() {
        let t = Trajectory::bounded(vec![pose([0.0; 3], [0.5, 0.0, 0.0])], 1.0).unwrap();
        let json = serde_json::to_string(&t).unwrap();
        let back: Trajectory = serde_json::from_str(&json).unwrap();
        assert_eq!(back.r_max(), Some(1.0));

        let tampered = json.replace("\"r_max\":1.0", "\"r_max\":0.1");
        assert!(serde_json::from_str::<Trajectory>(&tampered).is_err());
    }
}
