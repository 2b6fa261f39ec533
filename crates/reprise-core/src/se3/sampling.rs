//! Random trajectory generation for experiments and tests

use super::pose::Pose;
use super::trajectory::Trajectory;
use crate::error::{RepriseError, Result};
use nalgebra::Vector3;
use rand::Rng;
use rand_distr::{Distribution, Normal, StandardNormal};
use serde::{Deserialize, Serialize};

/// Parameters for [`generate_random_trajectory`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RandomTrajectorySpec {
    /// Number of poses
    pub length: usize,
    /// Radius of the ball translations are drawn from
    pub r_max: f64,
    /// Standard deviation of each rotation-vector component
    pub rotation_scale: f64,
    /// Whether the generated trajectory carries the `r_max` bound
    pub bounded: bool,
}

impl Default for RandomTrajectorySpec {
    fn default() -> Self {
        Self {
            length: 10,
            r_max: 1.0,
            rotation_scale: 0.3,
            bounded: false,
        }
    }
}

impl RandomTrajectorySpec {
    /// Set the number of poses
    pub fn with_length(mut self, length: usize) -> Self {
        self.length = length;
        self
    }

    /// Set the translation radius
    pub fn with_r_max(mut self, r_max: f64) -> Self {
        self.r_max = r_max;
        self
    }

    /// Set the rotation spread
    pub fn with_rotation_scale(mut self, rotation_scale: f64) -> Self {
        self.rotation_scale = rotation_scale;
        self
    }

    /// Attach the radius as a trajectory bound
    pub fn bounded(mut self, bounded: bool) -> Self {
        self.bounded = bounded;
        self
    }
}

/// Draw a random trajectory.
///
/// Rotation vectors have i.i.d. normal components with standard deviation
/// `rotation_scale`; translations are uniform in the ball of radius `r_max`,
/// so a bounded result never violates its own bound.
pub fn generate_random_trajectory<R: Rng + ?Sized>(
    spec: &RandomTrajectorySpec,
    rng: &mut R,
) -> Result<Trajectory> {
    let rotation_noise = Normal::new(0.0, spec.rotation_scale.max(0.0))
        .map_err(|e| RepriseError::InvalidConfig(e.to_string()))?;

    let poses = (0..spec.length)
        .map(|_| {
            let rotation = Vector3::from_fn(|_, _| rotation_noise.sample(rng));
            let translation = uniform_in_ball(spec.r_max, rng);
            Pose::from_rotation_vector(rotation, translation)
        })
        .collect();

    if spec.bounded {
        Trajectory::bounded(poses, spec.r_max)
    } else {
        Ok(Trajectory::new(poses))
    }
}

fn uniform_in_ball<R: Rng + ?Sized>(radius: f64, rng: &mut R) -> Vector3<f64> {
    let direction = loop {
        let v: Vector3<f64> = Vector3::from_fn(|_, _| StandardNormal.sample(rng));
        let n = v.norm();
        if n > f64::EPSILON {
            break v / n;
        }
    };
    let u: f64 = rng.gen();
    direction * (radius * u.cbrt())
}
