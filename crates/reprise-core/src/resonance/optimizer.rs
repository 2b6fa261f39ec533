//! Golden-ratio biased λ search

use super::constants::{GOLDEN_RATIO, RESONANCE_CONSTANTS};
use crate::error::Result;
use crate::returns::{compute_return_error, OptimizerConfig, ScalingOptimizer, ScalingOptimum};
use crate::se3::Trajectory;
use std::collections::BTreeMap;
use tracing::debug;

/// λ search with an optional quadratic pull toward the golden ratio.
///
/// The biased objective is `error(λ) + bias · (λ − φ)²`. The penalty only
/// shapes where the search settles; the reported error is always the plain
/// return error at the chosen λ.
#[derive(Debug, Clone)]
pub struct ResonanceAwareOptimizer {
    bias_strength: f64,
    double: bool,
    optimizer: ScalingOptimizer,
}

impl Default for ResonanceAwareOptimizer {
    fn default() -> Self {
        Self::new(0.5)
    }
}

impl ResonanceAwareOptimizer {
    /// Optimizer over the default bounds, measuring doubled trajectories.
    pub fn new(bias_strength: f64) -> Self {
        Self {
            bias_strength: bias_strength.max(0.0),
            double: true,
            optimizer: ScalingOptimizer::new(),
        }
    }

    /// Replace the underlying search configuration
    pub fn with_optimizer(mut self, config: OptimizerConfig) -> Result<Self> {
        self.optimizer = ScalingOptimizer::with_config(config)?;
        Ok(self)
    }

    /// Measure single rather than doubled traversals
    pub fn with_double(mut self, double: bool) -> Self {
        self.double = double;
        self
    }

    /// Penalty weight
    pub fn bias_strength(&self) -> f64 {
        self.bias_strength
    }

    /// The constant the bias pulls toward
    pub fn golden_ratio(&self) -> f64 {
        GOLDEN_RATIO
    }

    /// Minimise the return error, penalised toward φ when `bias_to_golden`.
    pub fn optimize_with_bias(&self, trajectory: &Trajectory, bias_to_golden: bool) -> ScalingOptimum {
        let double = self.double;
        let bias = if bias_to_golden { self.bias_strength } else { 0.0 };

        let optimum = self.optimizer.optimize_objective(trajectory, double, |lambda| {
            compute_return_error(trajectory, lambda, double) + bias * (lambda - GOLDEN_RATIO).powi(2)
        });

        debug!(
            bias_to_golden,
            bias,
            lambda = optimum.lambda,
            error = optimum.error,
            "resonance-biased search"
        );
        optimum
    }

    /// Return error with λ fixed to each table constant: `name → (λ, error)`.
    pub fn multi_resonance_search(&self, trajectory: &Trajectory) -> BTreeMap<&'static str, (f64, f64)> {
        RESONANCE_CONSTANTS
            .iter()
            .map(|c| {
                (
                    c.name,
                    (c.value, compute_return_error(trajectory, c.value, self.double)),
                )
            })
            .collect()
    }

    /// Lowest-error entry of [`ResonanceAwareOptimizer::multi_resonance_search`].
    pub fn best_resonance(&self, trajectory: &Trajectory) -> Option<(&'static str, f64, f64)> {
        self.multi_resonance_search(trajectory)
            .into_iter()
            .map(|(name, (lambda, error))| (name, lambda, error))
            .min_by(|a, b| a.2.total_cmp(&b.2))
    }
}
