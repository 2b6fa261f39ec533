//! Path-dependent "work" accumulation
//!
//! The tracker integrates, over consecutive pose pairs, the relative rotation
//! angle plus the translation displacement. The running integral depends on
//! the path taken, not only on the endpoints, and feeds a saturating
//! enhancement factor `1 + rate · tanh(integral)`.

use crate::se3::{so3, Pose, Trajectory};
use serde::{Deserialize, Serialize};

/// Work between two consecutive poses: `‖log(R_prevᵀ R)‖ + ‖t − t_prev‖`.
pub fn step_work(previous: &Pose, current: &Pose) -> f64 {
    let relative = previous.rotation().transpose() * current.rotation();
    so3::log(&relative).norm() + (current.translation() - previous.translation()).norm()
}

/// Total work along a trajectory's consecutive pairs.
pub fn path_work(trajectory: &Trajectory) -> f64 {
    trajectory
        .poses()
        .windows(2)
        .map(|pair| step_work(&pair[0], &pair[1]))
        .sum()
}

/// Running path integral with a bounded enhancement factor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HysteresisTracker {
    path_integral: f64,
    enhancement_rate: f64,
    history: Vec<f64>,
}

impl Default for HysteresisTracker {
    fn default() -> Self {
        Self::new(0.1)
    }
}

impl HysteresisTracker {
    /// Create with the given enhancement rate
    pub fn new(enhancement_rate: f64) -> Self {
        Self {
            path_integral: 0.0,
            enhancement_rate,
            history: Vec::new(),
        }
    }

    /// Add the work from `previous` to `pose`. Without a previous pose
    /// nothing is accumulated. Returns the work added.
    pub fn update(&mut self, pose: &Pose, previous: Option<&Pose>) -> f64 {
        let Some(previous) = previous else {
            return 0.0;
        };
        let work = step_work(previous, pose);
        self.path_integral += work;
        self.history.push(self.path_integral);
        work
    }

    /// Feed every consecutive pair of `trajectory`.
    pub fn accumulate(&mut self, trajectory: &Trajectory) -> f64 {
        let mut previous: Option<&Pose> = None;
        let mut added = 0.0;
        for pose in trajectory {
            added += self.update(pose, previous);
            previous = Some(pose);
        }
        added
    }

    /// Running integral
    pub fn path_integral(&self) -> f64 {
        self.path_integral
    }

    /// Integral after each update
    pub fn history(&self) -> &[f64] {
        &self.history
    }

    /// Enhancement rate
    pub fn enhancement_rate(&self) -> f64 {
        self.enhancement_rate
    }

    /// `1 + rate · tanh(integral)`, in `[1, 1 + rate)`.
    pub fn enhancement_factor(&self) -> f64 {
        1.0 + self.enhancement_rate * self.path_integral.tanh()
    }

    /// Forget all accumulated work.
    pub fn reset(&mut self) {
        self.path_integral = 0.0;
        self.history.clear();
    }
}
