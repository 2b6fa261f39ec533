//! Return-quality calibration
//!
//! Converts return error into a quality score `Q = exp(−error) ∈ (0, 1]` and
//! searches λ for a target quality. The search strategy sits behind
//! [`CalibrationStrategy`]; whichever is chosen, callers always get back the
//! best λ seen, a convergence flag and the full iteration trace.

use super::metrics::{frobenius_distance_to_identity, simulate_cycle};
use crate::error::{ConvergenceWarning, RepriseError, Result};
use crate::se3::{Pose, Trajectory};
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{debug, warn};

/// 1/φ, the golden-section shrink ratio.
const INV_PHI: f64 = 0.618_033_988_749_894_9;

/// How the calibrator moves its λ bracket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CalibrationStrategy {
    /// Midpoint probing with a direction heuristic: below quality 0.5 the
    /// previous iteration's quality decides which bound moves. Not a
    /// monotone bisection; it can stall on some error landscapes.
    HeuristicBisection,

    /// Golden-section maximisation of quality. The bracket shrinks by 1/φ
    /// every iteration, so it always terminates within tolerance.
    GoldenSection,
}

/// Configuration for the calibrator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CalibrationConfig {
    /// Desired return quality in (0, 1]
    pub target_quality: f64,

    /// Iteration budget
    pub max_iterations: usize,

    /// Lower λ bound
    pub lambda_min: f64,

    /// Upper λ bound
    pub lambda_max: f64,

    /// Bracket width at which the search stops
    pub min_bracket: f64,

    /// Whether the simulated cycle is traversed twice
    pub double: bool,

    /// Search strategy
    pub strategy: CalibrationStrategy,
}

impl Default for CalibrationConfig {
    fn default() -> Self {
        Self {
            target_quality: 0.95,
            max_iterations: 20,
            lambda_min: 0.1,
            lambda_max: 10.0,
            min_bracket: 0.01,
            double: true,
            strategy: CalibrationStrategy::GoldenSection,
        }
    }
}

impl CalibrationConfig {
    /// Set the target quality
    pub fn with_target_quality(mut self, target_quality: f64) -> Self {
        self.target_quality = target_quality;
        self
    }

    /// Set the iteration budget
    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    /// Set the strategy
    pub fn with_strategy(mut self, strategy: CalibrationStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    /// Check ranges
    pub fn validate(&self) -> Result<()> {
        let q = self.target_quality;
        if q.is_nan() || q <= 0.0 || q > 1.0 {
            return Err(RepriseError::InvalidConfig(format!(
                "target quality must be in (0, 1], got {}",
                self.target_quality
            )));
        }
        if !(self.lambda_min.is_finite() && self.lambda_max.is_finite())
            || self.lambda_min <= 0.0
            || self.lambda_min >= self.lambda_max
        {
            return Err(RepriseError::InvalidConfig(format!(
                "calibration bounds must satisfy 0 < min < max, got [{}, {}]",
                self.lambda_min, self.lambda_max
            )));
        }
        if self.max_iterations == 0 {
            return Err(RepriseError::InvalidConfig(
                "calibrator needs at least one iteration".into(),
            ));
        }
        Ok(())
    }
}

/// One probe of the calibration search.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalibrationStep {
    /// Zero-based iteration index
    pub iteration: usize,
    /// λ probed
    pub lambda: f64,
    /// Quality at λ
    pub quality: f64,
    /// Return error at λ
    pub error: f64,
}

/// Diagnostics returned with the calibrated λ.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalibrationReport {
    /// Best λ seen
    pub lambda: f64,
    /// Quality at `lambda`
    pub quality: f64,
    /// `quality ≥ target_quality`
    pub converged: bool,
    /// Every probe in order
    pub iterations: Vec<CalibrationStep>,
    /// Set when the target was not met
    pub warning: Option<ConvergenceWarning>,
}

type CycleSimulator = dyn Fn(&Trajectory, f64) -> Pose + Send + Sync;

/// Searches λ for a target return quality.
pub struct ReturnQualityCalibrator {
    config: CalibrationConfig,
    simulate: Box<CycleSimulator>,
}

impl fmt::Debug for ReturnQualityCalibrator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReturnQualityCalibrator")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl Default for ReturnQualityCalibrator {
    fn default() -> Self {
        Self::standard(CalibrationConfig::default())
    }
}

impl ReturnQualityCalibrator {
    /// Calibrator over the standard scaled (and doubled, per config) cycle
    pub fn new(config: CalibrationConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self::standard(config))
    }

    /// Calibrator over a custom cycle simulation
    pub fn with_simulator<F>(config: CalibrationConfig, simulate: F) -> Result<Self>
    where
        F: Fn(&Trajectory, f64) -> Pose + Send + Sync + 'static,
    {
        config.validate()?;
        Ok(Self {
            config,
            simulate: Box::new(simulate),
        })
    }

    fn standard(config: CalibrationConfig) -> Self {
        let double = config.double;
        Self {
            config,
            simulate: Box::new(move |trajectory, lambda| simulate_cycle(trajectory, lambda, double)),
        }
    }

    /// Configuration in use
    pub fn config(&self) -> &CalibrationConfig {
        &self.config
    }

    /// `Q = exp(−error)`; 1 means a perfect return.
    pub fn return_quality(&self, final_pose: &Pose) -> f64 {
        quality_from_error(frobenius_distance_to_identity(final_pose))
    }

    /// True when the error at `final_pose` grew relative to `previous_error`,
    /// i.e. λ swung past the identity.
    pub fn is_overshooting(&self, final_pose: &Pose, previous_error: f64) -> bool {
        frobenius_distance_to_identity(final_pose) > previous_error
    }

    /// Search λ for the target quality.
    pub fn calibrate(&self, trajectory: &Trajectory) -> CalibrationReport {
        let mut probe = Probe {
            trajectory,
            simulate: self.simulate.as_ref(),
            steps: Vec::with_capacity(self.config.max_iterations),
        };

        match self.config.strategy {
            CalibrationStrategy::HeuristicBisection => self.heuristic_bisection(&mut probe),
            CalibrationStrategy::GoldenSection => self.golden_section(&mut probe),
        }

        let best = probe
            .steps
            .iter()
            .fold(None::<&CalibrationStep>, |best, step| match best {
                Some(b) if b.quality >= step.quality => Some(b),
                _ => Some(step),
            })
            .cloned();

        let (lambda, quality) = best
            .map(|s| (s.lambda, s.quality))
            .unwrap_or((0.5 * (self.config.lambda_min + self.config.lambda_max), 0.0));
        let converged = quality >= self.config.target_quality;

        let warning = (!converged).then(|| ConvergenceWarning {
            source: "return quality calibrator".into(),
            iterations: probe.steps.len(),
            achieved: quality,
            target: self.config.target_quality,
        });
        if let Some(w) = &warning {
            warn!(%w, "calibration target not met");
        }
        debug!(lambda, quality, converged, strategy = ?self.config.strategy, "calibration finished");

        CalibrationReport {
            lambda,
            quality,
            converged,
            iterations: probe.steps,
            warning,
        }
    }

    fn heuristic_bisection(&self, probe: &mut Probe<'_>) {
        let (mut lo, mut hi) = (self.config.lambda_min, self.config.lambda_max);

        for iteration in 0..self.config.max_iterations {
            let lambda = 0.5 * (lo + hi);
            let step = probe.eval(iteration, lambda);

            if step.quality >= self.config.target_quality || hi - lo < self.config.min_bracket {
                break;
            }

            if step.quality < 0.5 {
                match probe.previous_quality() {
                    // getting worse: reverse direction
                    Some(prev) if step.quality < prev => lo = lambda,
                    Some(_) => hi = lambda,
                    None => hi = lambda,
                }
            } else if step.error > 0.0 {
                lo = lambda;
            } else {
                hi = lambda;
            }
        }
    }

    fn golden_section(&self, probe: &mut Probe<'_>) {
        let (mut a, mut b) = (self.config.lambda_min, self.config.lambda_max);
        let mut iteration = 0;

        let mut c = b - INV_PHI * (b - a);
        let mut d = a + INV_PHI * (b - a);
        let mut qc = probe.eval(iteration, c).quality;
        iteration += 1;
        if qc >= self.config.target_quality || iteration >= self.config.max_iterations {
            return;
        }
        let mut qd = probe.eval(iteration, d).quality;
        iteration += 1;

        while iteration < self.config.max_iterations
            && qc.max(qd) < self.config.target_quality
            && (b - a) >= self.config.min_bracket
        {
            if qc > qd {
                b = d;
                d = c;
                qd = qc;
                c = b - INV_PHI * (b - a);
                qc = probe.eval(iteration, c).quality;
            } else {
                a = c;
                c = d;
                qc = qd;
                d = a + INV_PHI * (b - a);
                qd = probe.eval(iteration, d).quality;
            }
            iteration += 1;
        }
    }
}

/// `exp(−error)`, clamped into `[0, 1]`.
pub fn quality_from_error(error: f64) -> f64 {
    (-error.max(0.0)).exp().clamp(0.0, 1.0)
}

struct Probe<'a> {
    trajectory: &'a Trajectory,
    simulate: &'a CycleSimulator,
    steps: Vec<CalibrationStep>,
}

impl Probe<'_> {
    fn eval(&mut self, iteration: usize, lambda: f64) -> CalibrationStep {
        let final_pose = (self.simulate)(self.trajectory, lambda);
        let error = frobenius_distance_to_identity(&final_pose);
        let step = CalibrationStep {
            iteration,
            lambda,
            quality: quality_from_error(error),
            error,
        };
        self.steps.push(step.clone());
        step
    }

    /// Quality of the probe before the most recent one.
    fn previous_quality(&self) -> Option<f64> {
        let n = self.steps.len();
        (n >= 2).then(|| self.steps[n - 2].quality)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::Vector3;

    fn small_cycle() -> Trajectory {
        Trajectory::new(vec![
            Pose::from_rotation_vector(Vector3::new(0.05, 0.0, 0.0), Vector3::new(0.1, 0.0, 0.0)),
            Pose::from_rotation_vector(Vector3::new(-0.05, 0.0, 0.0), Vector3::new(-0.1, 0.0, 0.0)),
        ])
    }

    fn drifting_cycle() -> Trajectory {
        Trajectory::new(vec![
            Pose::from_rotation_vector(Vector3::new(0.3, 0.2, 0.4), Vector3::new(0.2, 0.0, 0.1)),
            Pose::from_rotation_vector(Vector3::new(0.25, 0.15, 0.35), Vector3::new(0.15, 0.0, 0.08)),
        ])
    }

    #[test]
    fn test_quality_metric() {
        let calibrator = ReturnQualityCalibrator::default();
        assert_eq!(calibrator.return_quality(&Pose::identity()), 1.0);
        let far = Pose::from_rotation_vector(Vector3::new(1.0, 0.0, 0.0), Vector3::new(3.0, 0.0, 0.0));
        let q = calibrator.return_quality(&far);
        assert!(q > 0.0 && q < 0.1);
    }

    #[test]
    fn test_overshooting() {
        let calibrator = ReturnQualityCalibrator::default();
        let pose = Pose::from_rotation_vector(Vector3::zeros(), Vector3::new(0.5, 0.0, 0.0));
        assert!(calibrator.is_overshooting(&pose, 0.1));
        assert!(!calibrator.is_overshooting(&pose, 1.0));
    }

    #[test]
    fn test_both_strategies_reach_target_on_easy_cycle() {
        for strategy in [
            CalibrationStrategy::HeuristicBisection,
            CalibrationStrategy::GoldenSection,
        ] {
            let config = CalibrationConfig::default()
                .with_target_quality(0.9)
                .with_strategy(strategy);
            let report = ReturnQualityCalibrator::new(config).unwrap().calibrate(&small_cycle());
            assert!(report.converged, "{strategy:?} failed: {report:?}");
            assert!(report.warning.is_none());
            assert!(!report.iterations.is_empty());
        }
    }

    #[test]
    fn test_trace_and_best_are_consistent() {
        let config = CalibrationConfig::default().with_target_quality(1.0);
        let report = ReturnQualityCalibrator::new(config).unwrap().calibrate(&drifting_cycle());

        assert!(report.iterations.len() <= 20);
        let best = report
            .iterations
            .iter()
            .map(|s| s.quality)
            .fold(f64::NEG_INFINITY, f64::max);
        assert_eq!(report.quality, best);
        assert!(!report.converged);
        assert!(report.warning.is_some());
        for (i, step) in report.iterations.iter().enumerate() {
            assert_eq!(step.iteration, i);
            assert!((0.1..=10.0).contains(&step.lambda));
        }
    }

    #[test]
    fn test_golden_section_terminates_by_bracket() {
        let golden = ReturnQualityCalibrator::new(
            CalibrationConfig::default()
                .with_target_quality(1.0)
                .with_max_iterations(60),
        )
        .unwrap()
        .calibrate(&drifting_cycle());
        // 9.9 · 0.618^k < 0.01 after ~15 shrinks
        assert!(golden.iterations.len() < 25);
        assert!(golden.quality > 0.0);
    }

    #[test]
    fn test_custom_simulator() {
        let calibrator = ReturnQualityCalibrator::with_simulator(
            CalibrationConfig::default(),
            |_trajectory, lambda| {
                Pose::from_rotation_vector(Vector3::zeros(), Vector3::new(lambda - 2.0, 0.0, 0.0))
            },
        )
        .unwrap();
        let report = calibrator.calibrate(&Trajectory::new(vec![]));
        assert!(report.converged);
        assert!((report.lambda - 2.0).abs() < 0.06);
    }

    #[test]
    fn test_invalid_config() {
        assert!(CalibrationConfig::default()
            .with_target_quality(1.5)
            .validate()
            .is_err());
        assert!(CalibrationConfig::default().validate().is_ok());

        let unreachable = CalibrationConfig::default().with_target_quality(0.0);
        assert!(ReturnQualityCalibrator::new(unreachable.clone()).is_err());
        let custom = ReturnQualityCalibrator::with_simulator(unreachable, |_, _| Pose::identity());
        assert!(custom.is_err());

        let mut nan_bound = CalibrationConfig::default();
        nan_bound.lambda_max = f64::NAN;
        assert!(ReturnQualityCalibrator::new(nan_bound).is_err());
    }
}
