//! Bounded scalar search for the scaling factor λ
//!
//! The return error is non-convex in λ (composition does not commute), and no
//! gradient is available. The search is therefore derivative-free:
//!
//! 1. Evaluate a uniform grid over `[lambda_min, lambda_max]`, plus λ = 1
//!    (the unscaled trajectory) as a baseline candidate.
//! 2. Refine the bracket around the best grid point with golden-section
//!    search.
//! 3. Report the best λ actually evaluated and its actual error.
//!
//! The procedure is deterministic. It finds a good local optimum, not
//! necessarily the global one.

use super::metrics::compute_return_error;
use crate::error::{ConvergenceWarning, RepriseError, Result};
use crate::se3::Trajectory;
use serde::{Deserialize, Serialize};
use tracing::{debug, trace, warn};

/// 1/φ, the golden-section shrink ratio.
const INV_PHI: f64 = 0.618_033_988_749_894_9;

/// Configuration for the λ search
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OptimizerConfig {
    /// Lower bound on λ
    pub lambda_min: f64,

    /// Upper bound on λ
    pub lambda_max: f64,

    /// Points in the initial uniform scan (at least 2 are used)
    pub grid_points: usize,

    /// Golden-section iteration budget
    pub max_iterations: usize,

    /// Bracket width at which refinement stops
    pub tolerance: f64,
}

impl Default for OptimizerConfig {
    fn default() -> Self {
        Self {
            lambda_min: 0.1,
            lambda_max: 10.0,
            grid_points: 50,
            max_iterations: 100,
            tolerance: 1e-6,
        }
    }
}

impl OptimizerConfig {
    /// Set the λ bounds
    pub fn with_bounds(mut self, lambda_min: f64, lambda_max: f64) -> Self {
        self.lambda_min = lambda_min;
        self.lambda_max = lambda_max;
        self
    }

    /// Set the grid size
    pub fn with_grid_points(mut self, grid_points: usize) -> Self {
        self.grid_points = grid_points;
        self
    }

    /// Set the refinement budget
    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    /// Check ranges
    pub fn validate(&self) -> Result<()> {
        if !(self.lambda_min.is_finite() && self.lambda_max.is_finite()) {
            return Err(RepriseError::InvalidConfig("λ bounds must be finite".into()));
        }
        if self.lambda_min <= 0.0 || self.lambda_min >= self.lambda_max {
            return Err(RepriseError::InvalidConfig(format!(
                "λ bounds must satisfy 0 < min < max, got [{}, {}]",
                self.lambda_min, self.lambda_max
            )));
        }
        if self.max_iterations == 0 {
            return Err(RepriseError::InvalidConfig(
                "optimizer needs at least one iteration".into(),
            ));
        }
        if self.tolerance.is_nan() || self.tolerance <= 0.0 {
            return Err(RepriseError::InvalidConfig(
                "optimizer tolerance must be positive".into(),
            ));
        }
        Ok(())
    }
}

/// Outcome of a bounded scalar minimisation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScalarMinimum {
    /// Best argument evaluated
    pub x: f64,
    /// Objective at `x`
    pub value: f64,
    /// Objective evaluations spent
    pub evaluations: usize,
    /// Golden-section iterations spent
    pub iterations: usize,
    /// Whether the final bracket shrank below the tolerance
    pub converged: bool,
}

/// Best scaling factor found for a trajectory.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScalingOptimum {
    /// Best λ found
    pub lambda: f64,
    /// Return error actually achieved at `lambda`
    pub error: f64,
    /// Whether the trajectory was doubled
    pub doubled: bool,
    /// Objective evaluations spent
    pub evaluations: usize,
    /// Whether refinement met its tolerance
    pub converged: bool,
    /// Set when the iteration budget ran out first
    pub warning: Option<ConvergenceWarning>,
}

/// λ search over [`compute_return_error`].
#[derive(Debug, Clone, Default)]
pub struct ScalingOptimizer {
    config: OptimizerConfig,
}

impl ScalingOptimizer {
    /// Create with default bounds `[0.1, 10]`
    pub fn new() -> Self {
        Self::default()
    }

    /// Create with a validated configuration
    pub fn with_config(config: OptimizerConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    /// Configuration in use
    pub fn config(&self) -> &OptimizerConfig {
        &self.config
    }

    /// Minimise the return error over λ.
    pub fn optimize(&self, trajectory: &Trajectory, double: bool) -> ScalingOptimum {
        self.optimize_objective(trajectory, double, |lambda| {
            compute_return_error(trajectory, lambda, double)
        })
    }

    /// Minimise a caller-shaped objective over λ, then report the true return
    /// error at the chosen λ.
    ///
    /// Used for penalised searches where the objective is not the error itself.
    pub fn optimize_objective<F>(
        &self,
        trajectory: &Trajectory,
        double: bool,
        objective: F,
    ) -> ScalingOptimum
    where
        F: FnMut(f64) -> f64,
    {
        let minimum = self.minimize(objective, &[1.0]);
        let error = compute_return_error(trajectory, minimum.x, double);

        let warning = (!minimum.converged).then(|| ConvergenceWarning {
            source: "scaling optimizer".into(),
            iterations: minimum.iterations,
            achieved: error,
            target: 0.0,
        });
        if let Some(w) = &warning {
            warn!(%w, "λ refinement did not converge");
        }

        debug!(
            lambda = minimum.x,
            error,
            evaluations = minimum.evaluations,
            double,
            "scaling factor optimised"
        );

        ScalingOptimum {
            lambda: minimum.x,
            error,
            doubled: double,
            evaluations: minimum.evaluations,
            converged: minimum.converged,
            warning,
        }
    }

    /// Grid scan plus golden-section refinement of `f` over the configured
    /// bounds. `anchors` inside the bounds are evaluated as extra candidates.
    pub fn minimize<F>(&self, mut f: F, anchors: &[f64]) -> ScalarMinimum
    where
        F: FnMut(f64) -> f64,
    {
        let lo = self.config.lambda_min.min(self.config.lambda_max);
        let hi = self.config.lambda_min.max(self.config.lambda_max);
        let n = self.config.grid_points.max(2);
        let step = (hi - lo) / (n - 1) as f64;

        let mut evaluations = 0usize;
        let mut eval = |x: f64| {
            evaluations += 1;
            let v = f(x);
            if v.is_nan() {
                f64::INFINITY
            } else {
                v
            }
        };

        let mut best_x = lo;
        let mut best_v = f64::INFINITY;
        let mut best_index = 0usize;
        for i in 0..n {
            let x = lo + step * i as f64;
            let v = eval(x);
            if v < best_v {
                best_x = x;
                best_v = v;
                best_index = i;
            }
        }

        let (mut a, mut b) = (
            lo + step * best_index.saturating_sub(1) as f64,
            (lo + step * (best_index + 1) as f64).min(hi),
        );

        for &anchor in anchors.iter().filter(|x| (lo..=hi).contains(*x)) {
            let v = eval(anchor);
            if v < best_v {
                best_x = anchor;
                best_v = v;
                a = (anchor - step).max(lo);
                b = (anchor + step).min(hi);
            }
        }

        let mut c = b - INV_PHI * (b - a);
        let mut d = a + INV_PHI * (b - a);
        let mut fc = eval(c);
        let mut fd = eval(d);
        let mut iterations = 0usize;

        while (b - a) > self.config.tolerance && iterations < self.config.max_iterations {
            iterations += 1;
            if fc < fd {
                b = d;
                d = c;
                fd = fc;
                c = b - INV_PHI * (b - a);
                fc = eval(c);
            } else {
                a = c;
                c = d;
                fc = fd;
                d = a + INV_PHI * (b - a);
                fd = eval(d);
            }
            trace!(iteration = iterations, a, b, "golden-section bracket");
        }

        for (x, v) in [(c, fc), (d, fd)] {
            if v < best_v {
                best_x = x;
                best_v = v;
            }
        }

        ScalarMinimum {
            x: best_x,
            value: best_v,
            evaluations,
            iterations,
            converged: (b - a) <= self.config.tolerance,
        }
    }
}

/// Optimise λ over the default bounds `[0.1, 10]`.
pub fn optimize_scaling_factor(trajectory: &Trajectory, double: bool) -> ScalingOptimum {
    ScalingOptimizer::new().optimize(trajectory, double)
}

/// Optimise λ over custom bounds.
pub fn optimize_scaling_factor_within(
    trajectory: &Trajectory,
    lambda_min: f64,
    lambda_max: f64,
    double: bool,
) -> Result<ScalingOptimum> {
    let config = OptimizerConfig::default().with_bounds(lambda_min, lambda_max);
    Ok(ScalingOptimizer::with_config(config)?.optimize(trajectory, double))
}
