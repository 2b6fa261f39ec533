//! Matching optimised scaling factors against the constant table

use super::constants::{nearest_resonance, RESONANCE_CONSTANTS};
use crate::error::{RepriseError, Result};
use crate::returns::{compute_return_error, OptimizerConfig, ScalingOptimizer};
use crate::se3::Trajectory;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::debug;

/// Resonance search configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResonanceConfig {
    /// How far above the optimised error a constant's error may sit and still
    /// count as natural
    pub tolerance: f64,

    /// Penalty weight pulling the biased search toward the golden ratio
    pub bias_strength: f64,

    /// Whether errors are measured on the doubled trajectory
    pub double: bool,

    /// λ search used for the unconstrained optimum
    pub optimizer: OptimizerConfig,
}

impl Default for ResonanceConfig {
    fn default() -> Self {
        Self {
            tolerance: 0.1,
            bias_strength: 0.5,
            double: true,
            optimizer: OptimizerConfig::default(),
        }
    }
}

impl ResonanceConfig {
    /// Set the naturalness tolerance
    pub fn with_tolerance(mut self, tolerance: f64) -> Self {
        self.tolerance = tolerance;
        self
    }

    /// Set the golden-ratio bias strength
    pub fn with_bias_strength(mut self, bias_strength: f64) -> Self {
        self.bias_strength = bias_strength;
        self
    }

    /// Check ranges
    pub fn validate(&self) -> Result<()> {
        if self.tolerance.is_nan()
            || self.tolerance < 0.0
            || self.bias_strength.is_nan()
            || self.bias_strength < 0.0
        {
            return Err(RepriseError::InvalidConfig(
                "resonance tolerance and bias strength must be non-negative".into(),
            ));
        }
        self.optimizer.validate()
    }
}

/// Outcome of [`ResonanceDetector::detect_natural_scaling`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResonanceResult {
    /// Constant with the lowest return error
    pub best_resonance: String,
    /// Its value
    pub best_value: f64,
    /// Its return error
    pub best_error: f64,
    /// Return error with λ fixed to each constant
    pub all_resonances: BTreeMap<String, f64>,
    /// `best_error <= optimal_error + tolerance`
    pub is_natural: bool,
    /// λ from the unconstrained search
    pub optimal_lambda: f64,
    /// Error at `optimal_lambda`
    pub optimal_error: f64,
    /// Constant closest to `optimal_lambda`
    pub nearest_to_optimum: String,
    /// `|optimal_lambda − value|` for that constant
    pub nearest_distance: f64,
}

/// Compares a trajectory's best scaling against the constant table.
#[derive(Debug, Clone, Default)]
pub struct ResonanceDetector {
    config: ResonanceConfig,
    optimizer: ScalingOptimizer,
}

impl ResonanceDetector {
    /// Detector with default tolerance 0.1
    pub fn new() -> Self {
        Self::default()
    }

    /// Detector with a validated configuration
    pub fn with_config(config: ResonanceConfig) -> Result<Self> {
        config.validate()?;
        let optimizer = ScalingOptimizer::with_config(config.optimizer.clone())?;
        Ok(Self { config, optimizer })
    }

    /// Configuration in use
    pub fn config(&self) -> &ResonanceConfig {
        &self.config
    }

    /// `(name, value, |λ − value|)` of the closest constant.
    pub fn find_nearest_resonance(&self, lambda: f64) -> (&'static str, f64, f64) {
        let (constant, distance) = nearest_resonance(lambda);
        (constant.name, constant.value, distance)
    }

    /// Evaluate every constant as λ and compare with the optimised λ.
    pub fn detect_natural_scaling(&self, trajectory: &Trajectory) -> ResonanceResult {
        let double = self.config.double;

        let mut best = RESONANCE_CONSTANTS[0];
        let mut best_error = f64::INFINITY;
        let mut all_resonances = BTreeMap::new();
        for constant in RESONANCE_CONSTANTS {
            let error = compute_return_error(trajectory, constant.value, double);
            if error < best_error {
                best = constant;
                best_error = error;
            }
            all_resonances.insert(constant.name.to_string(), error);
        }

        let optimum = self.optimizer.optimize(trajectory, double);
        let (nearest, nearest_distance) = nearest_resonance(optimum.lambda);
        let is_natural = best_error <= optimum.error + self.config.tolerance;

        debug!(
            best = best.name,
            best_error,
            optimal_lambda = optimum.lambda,
            optimal_error = optimum.error,
            is_natural,
            "resonance scan"
        );

        ResonanceResult {
            best_resonance: best.name.to_string(),
            best_value: best.value,
            best_error,
            all_resonances,
            is_natural,
            optimal_lambda: optimum.lambda,
            optimal_error: optimum.error,
            nearest_to_optimum: nearest.name.to_string(),
            nearest_distance,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resonance::constants::{GOLDEN_RATIO, OCTAVE};
    use crate::se3::{generate_random_trajectory, Pose, RandomTrajectorySpec};
    use nalgebra::Vector3;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_nearest_resonance_finder() {
        let detector = ResonanceDetector::new();
        let (name, value, distance) = detector.find_nearest_resonance(0.62);
        assert_eq!(name, "golden_ratio");
        assert!((value - GOLDEN_RATIO).abs() < 0.01);
        assert!(distance < 0.1);

        let (name, value, distance) = detector.find_nearest_resonance(2.05);
        assert_eq!(name, "octave");
        assert_eq!(value, OCTAVE);
        assert!(distance < 0.1);
    }

    #[test]
    fn test_all_resonances_tested() {
        let mut rng = StdRng::seed_from_u64(42);
        let t = generate_random_trajectory(&RandomTrajectorySpec::default(), &mut rng).unwrap();
        let result = ResonanceDetector::new().detect_natural_scaling(&t);

        assert_eq!(result.all_resonances.len(), 7);
        for constant in RESONANCE_CONSTANTS {
            assert!(result.all_resonances[constant.name] >= 0.0);
        }
        assert_eq!(result.all_resonances[&result.best_resonance], result.best_error);
        assert!(result
            .all_resonances
            .values()
            .all(|e| *e >= result.best_error));
    }

    #[test]
    fn test_commuting_trajectory_is_natural_everywhere() {
        // screw motion and its inverse: error vanishes at every λ
        let a = Pose::from_rotation_vector(Vector3::new(0.0, 0.0, 0.3), Vector3::new(0.0, 0.0, 0.5));
        let t = Trajectory::new(vec![a, a.inverse()]);
        let result = ResonanceDetector::new().detect_natural_scaling(&t);
        assert!(result.best_error < 1e-12);
        assert!(result.is_natural);
    }

    #[test]
    fn test_negative_tolerance_rejected() {
        let config = ResonanceConfig::default().with_tolerance(-1.0);
        assert!(ResonanceDetector::with_config(config).is_err());
    }
}
