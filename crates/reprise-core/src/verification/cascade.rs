//! Five-level verification cascade
//!
//! Each level produces a raw measurement and a score in `[0, 1]`:
//!
//! | Level | Raw value | Score |
//! |---|---|---|
//! | topological | return error (doubled, λ-scaled) | `exp(−error)` |
//! | energetic | mean hysteresis work per step | `exp(−work / work_scale)` |
//! | temporal | trajectory length `n` | `min(n, n_ref) / max(n, n_ref)` |
//! | spatial | 1 if inside `r_max`, else 0 | same |
//! | stochastic | fraction of noisy trials that still return | same |
//!
//! The weighted sum of scores is the overall score. A run passes when the
//! overall score reaches `pass_threshold`; per-level verdicts are reported
//! alongside but do not gate the aggregate.

use crate::diagnostics::HysteresisTracker;
use crate::error::{RepriseError, Result};
use crate::returns::compute_return_error;
use crate::se3::{Pose, Trajectory};
use nalgebra::Vector3;
use rand::rngs::StdRng;
use rand::SeedableRng;
use rand_distr::{Distribution, Normal};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use tracing::{debug, warn};

/// The five checks of the cascade.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VerificationLevel {
    /// Return quality
    Topological,
    /// Cumulative transformation work
    Energetic,
    /// Length plausibility
    Temporal,
    /// Bounded-domain compliance
    Spatial,
    /// Robustness to perturbation
    Stochastic,
}

impl VerificationLevel {
    /// All levels in cascade order
    pub const ALL: [VerificationLevel; 5] = [
        VerificationLevel::Topological,
        VerificationLevel::Energetic,
        VerificationLevel::Temporal,
        VerificationLevel::Spatial,
        VerificationLevel::Stochastic,
    ];

    /// Lowercase name used in reports
    pub fn name(&self) -> &'static str {
        match self {
            VerificationLevel::Topological => "topological",
            VerificationLevel::Energetic => "energetic",
            VerificationLevel::Temporal => "temporal",
            VerificationLevel::Spatial => "spatial",
            VerificationLevel::Stochastic => "stochastic",
        }
    }

    /// Default weight of this level in the overall score
    pub fn default_weight(&self) -> f64 {
        match self {
            VerificationLevel::Topological => 0.35,
            VerificationLevel::Energetic => 0.15,
            VerificationLevel::Temporal => 0.15,
            VerificationLevel::Spatial => 0.15,
            VerificationLevel::Stochastic => 0.20,
        }
    }

    /// Default score a level must reach to pass on its own
    pub fn default_threshold(&self) -> f64 {
        match self {
            VerificationLevel::Topological => 0.5,
            VerificationLevel::Energetic => 0.3,
            VerificationLevel::Temporal => 0.5,
            VerificationLevel::Spatial => 1.0,
            VerificationLevel::Stochastic => 0.7,
        }
    }
}

impl fmt::Display for VerificationLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// One number per level. Used for both weights and thresholds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LevelTable {
    /// Topological entry
    pub topological: f64,
    /// Energetic entry
    pub energetic: f64,
    /// Temporal entry
    pub temporal: f64,
    /// Spatial entry
    pub spatial: f64,
    /// Stochastic entry
    pub stochastic: f64,
}

impl LevelTable {
    /// Build from a per-level function
    pub fn from_fn(f: impl Fn(VerificationLevel) -> f64) -> Self {
        Self {
            topological: f(VerificationLevel::Topological),
            energetic: f(VerificationLevel::Energetic),
            temporal: f(VerificationLevel::Temporal),
            spatial: f(VerificationLevel::Spatial),
            stochastic: f(VerificationLevel::Stochastic),
        }
    }

    /// Entry for `level`
    pub fn get(&self, level: VerificationLevel) -> f64 {
        match level {
            VerificationLevel::Topological => self.topological,
            VerificationLevel::Energetic => self.energetic,
            VerificationLevel::Temporal => self.temporal,
            VerificationLevel::Spatial => self.spatial,
            VerificationLevel::Stochastic => self.stochastic,
        }
    }

    /// Sum of all entries
    pub fn total(&self) -> f64 {
        VerificationLevel::ALL.iter().map(|l| self.get(*l)).sum()
    }

    /// Keyed view
    pub fn to_map(&self) -> BTreeMap<VerificationLevel, f64> {
        VerificationLevel::ALL.iter().map(|l| (*l, self.get(*l))).collect()
    }
}

/// Cascade configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CascadeConfig {
    /// Per-level weights; must sum to 1
    pub weights: LevelTable,

    /// Per-level pass thresholds on the score
    pub thresholds: LevelTable,

    /// Overall score needed to pass
    pub pass_threshold: f64,

    /// Reward scaled by the overall score
    pub base_reward_amount: f64,

    /// Reference trajectory length for the temporal level
    pub expected_length: usize,

    /// Work per step at which the energetic score drops to 1/e
    pub work_scale: f64,

    /// Monte-Carlo trials for the stochastic level
    pub num_trials: usize,

    /// Std of the Gaussian perturbation per component
    pub noise_level: f64,

    /// Return error below which a perturbed trial counts as robust
    pub robustness_error_threshold: f64,

    /// Base seed; trial `k` uses `seed + k`
    pub seed: u64,
}

impl Default for CascadeConfig {
    fn default() -> Self {
        Self {
            weights: LevelTable::from_fn(|l| l.default_weight()),
            thresholds: LevelTable::from_fn(|l| l.default_threshold()),
            pass_threshold: 0.6,
            base_reward_amount: 100.0,
            expected_length: 10,
            work_scale: 1.0,
            num_trials: 10,
            noise_level: 0.05,
            robustness_error_threshold: 0.5,
            seed: 42,
        }
    }
}

impl CascadeConfig {
    /// Set the weights
    pub fn with_weights(mut self, weights: LevelTable) -> Self {
        self.weights = weights;
        self
    }

    /// Set the aggregate pass threshold
    pub fn with_pass_threshold(mut self, pass_threshold: f64) -> Self {
        self.pass_threshold = pass_threshold;
        self
    }

    /// Set the Monte-Carlo trial count and noise level
    pub fn with_trials(mut self, num_trials: usize, noise_level: f64) -> Self {
        self.num_trials = num_trials;
        self.noise_level = noise_level;
        self
    }

    /// Set the base seed
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Check weights and ranges
    pub fn validate(&self) -> Result<()> {
        let total = self.weights.total();
        if (total - 1.0).abs() > 1e-6 {
            return Err(RepriseError::InvalidConfig(format!(
                "cascade weights must sum to 1, got {total}"
            )));
        }
        if VerificationLevel::ALL.iter().any(|l| self.weights.get(*l) < 0.0) {
            return Err(RepriseError::InvalidConfig(
                "cascade weights must be non-negative".into(),
            ));
        }
        if !(0.0..=1.0).contains(&self.pass_threshold) {
            return Err(RepriseError::InvalidConfig(format!(
                "pass threshold must lie in [0, 1], got {}",
                self.pass_threshold
            )));
        }
        if self.expected_length == 0 || self.work_scale.is_nan() || self.work_scale <= 0.0 {
            return Err(RepriseError::InvalidConfig(
                "expected length and work scale must be positive".into(),
            ));
        }
        if self.noise_level.is_nan()
            || self.noise_level < 0.0
            || self.robustness_error_threshold.is_nan()
            || self.robustness_error_threshold <= 0.0
        {
            return Err(RepriseError::InvalidConfig(
                "noise level must be non-negative and robustness threshold positive".into(),
            ));
        }
        Ok(())
    }
}

/// Outcome of a single level.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LevelScore {
    /// Which level
    pub level: VerificationLevel,
    /// Raw measurement
    pub raw: f64,
    /// Normalised score in `[0, 1]`
    pub score: f64,
    /// Weight applied to `score`
    pub weight: f64,
    /// Threshold on `score`
    pub threshold: f64,
    /// `score >= threshold`
    pub passed: bool,
}

impl LevelScore {
    fn new(level: VerificationLevel, raw: f64, score: f64, config: &CascadeConfig) -> Self {
        let threshold = config.thresholds.get(level);
        Self {
            level,
            raw,
            score,
            weight: config.weights.get(level),
            threshold,
            passed: score >= threshold,
        }
    }
}

/// Result of a full cascade run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VerificationResult {
    /// Weighted score in `[0, 1]`
    pub overall_score: f64,
    /// `base_reward_amount × overall_score`, never negative
    pub token_award: f64,
    /// `overall_score >= pass_threshold`
    pub passed: bool,
    /// Raw value per level
    pub verifications: BTreeMap<VerificationLevel, f64>,
    /// Full per-level breakdown in cascade order
    pub levels: Vec<LevelScore>,
}

impl VerificationResult {
    /// Levels whose own threshold was not met
    pub fn failed_levels(&self) -> Vec<VerificationLevel> {
        self.levels
            .iter()
            .filter(|s| !s.passed)
            .map(|s| s.level)
            .collect()
    }

    /// Whether every level met its own threshold
    pub fn all_levels_passed(&self) -> bool {
        self.levels.iter().all(|s| s.passed)
    }
}

/// Scores a trajectory at a given λ.
#[derive(Debug, Clone, Default)]
pub struct VerificationCascade {
    config: CascadeConfig,
}

impl VerificationCascade {
    /// Cascade with default weights and thresholds
    pub fn new() -> Self {
        Self::default()
    }

    /// Cascade with a validated custom configuration
    pub fn with_config(config: CascadeConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    /// Configuration in use
    pub fn config(&self) -> &CascadeConfig {
        &self.config
    }

    /// Weight per level
    pub fn weights(&self) -> BTreeMap<VerificationLevel, f64> {
        self.config.weights.to_map()
    }

    /// Threshold per level
    pub fn thresholds(&self) -> BTreeMap<VerificationLevel, f64> {
        self.config.thresholds.to_map()
    }

    /// Topological level: the doubled return error, computed exactly as the
    /// optimizer computes it.
    pub fn verify_return_quality(&self, trajectory: &Trajectory, lambda: f64) -> f64 {
        compute_return_error(trajectory, lambda, true)
    }

    /// Energetic level: mean hysteresis work per step over the λ-scaled,
    /// doubled trajectory. Zero when there are no steps.
    pub fn verify_energetic(&self, trajectory: &Trajectory, lambda: f64) -> f64 {
        let mut tracker = HysteresisTracker::default();
        tracker.accumulate(&trajectory.scale(lambda).double());
        match tracker.history().len() {
            0 => 0.0,
            steps => tracker.path_integral() / steps as f64,
        }
    }

    /// Temporal level: `min(n, n_ref) / max(n, n_ref)`.
    pub fn verify_temporal(&self, trajectory: &Trajectory) -> f64 {
        let n = trajectory.len();
        let reference = self.config.expected_length.max(1);
        n.min(reference) as f64 / n.max(reference) as f64
    }

    /// Spatial level: every pose finite and every translation inside
    /// `r_max`; the radius check is skipped when unbounded.
    pub fn verify_bounded_domain(&self, trajectory: &Trajectory) -> bool {
        trajectory.iter().all(Pose::is_finite) && trajectory.within_bounds()
    }

    /// Stochastic level: fraction of `num_trials` perturbed copies whose
    /// doubled return error at `lambda` stays under the robustness threshold.
    ///
    /// Each pose's rotation vector and translation receive independent
    /// `N(0, noise_level)` noise. Trial `k` draws from its own stream seeded
    /// with `seed + k`, so the result is reproducible and trials are
    /// independent.
    pub fn verify_noise_robustness(
        &self,
        trajectory: &Trajectory,
        lambda: f64,
        num_trials: usize,
        noise_level: f64,
    ) -> f64 {
        if num_trials == 0 {
            return 0.0;
        }
        let noise = match Normal::new(0.0, noise_level) {
            Ok(noise) => noise,
            Err(e) => {
                warn!(noise_level, error = %e, "invalid noise level, robustness scored as 0");
                return 0.0;
            }
        };

        let robust = (0..num_trials)
            .filter(|&k| {
                let mut rng = StdRng::seed_from_u64(self.config.seed.wrapping_add(k as u64));
                let perturbed = perturb(trajectory, &noise, &mut rng);
                compute_return_error(&perturbed, lambda, true) < self.config.robustness_error_threshold
            })
            .count();

        robust as f64 / num_trials as f64
    }

    /// Run all five levels with the configured reward amount.
    pub fn verify(&self, trajectory: &Trajectory, lambda: f64) -> VerificationResult {
        self.verify_regeneration(trajectory, lambda, self.config.base_reward_amount)
    }

    /// Run all five levels and derive the reward.
    pub fn verify_regeneration(
        &self,
        trajectory: &Trajectory,
        lambda: f64,
        base_reward_amount: f64,
    ) -> VerificationResult {
        let config = &self.config;

        let error = self.verify_return_quality(trajectory, lambda);
        let work = self.verify_energetic(trajectory, lambda);
        let temporal = self.verify_temporal(trajectory);
        let spatial = if self.verify_bounded_domain(trajectory) { 1.0 } else { 0.0 };
        let robustness =
            self.verify_noise_robustness(trajectory, lambda, config.num_trials, config.noise_level);

        let levels = vec![
            LevelScore::new(
                VerificationLevel::Topological,
                error,
                unit_score((-error).exp()),
                config,
            ),
            LevelScore::new(
                VerificationLevel::Energetic,
                work,
                unit_score((-work / config.work_scale).exp()),
                config,
            ),
            LevelScore::new(
                VerificationLevel::Temporal,
                trajectory.len() as f64,
                temporal,
                config,
            ),
            LevelScore::new(VerificationLevel::Spatial, spatial, spatial, config),
            LevelScore::new(VerificationLevel::Stochastic, robustness, robustness, config),
        ];

        for level in &levels {
            debug!(
                level = %level.level,
                raw = level.raw,
                score = level.score,
                passed = level.passed,
                "verification level"
            );
        }

        let overall_score = unit_score(levels.iter().map(|s| s.weight * s.score).sum());
        let token_award = (base_reward_amount * overall_score).max(0.0);
        let passed = overall_score >= config.pass_threshold;

        debug!(overall_score, token_award, passed, lambda, "verification cascade complete");

        VerificationResult {
            overall_score,
            token_award,
            passed,
            verifications: levels.iter().map(|s| (s.level, s.raw)).collect(),
            levels,
        }
    }
}

/// Clamp into `[0, 1]`; NaN scores as 0.
fn unit_score(x: f64) -> f64 {
    if x.is_nan() {
        0.0
    } else {
        x.clamp(0.0, 1.0)
    }
}

fn perturb(trajectory: &Trajectory, noise: &Normal<f64>, rng: &mut StdRng) -> Trajectory {
    let mut sample = || Vector3::from_fn(|_, _| noise.sample(rng));
    Trajectory::new(
        trajectory
            .iter()
            .map(|pose| {
                let rotation = pose.to_rotation_vector() + sample();
                let translation = pose.translation() + sample();
                Pose::from_rotation_vector(rotation, translation)
            })
            .collect(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::returns::optimize_scaling_factor;
    use crate::se3::{generate_random_trajectory, RandomTrajectorySpec};

    fn pose(rot: [f64; 3], trans: [f64; 3]) -> Pose {
        Pose::from_rotation_vector(Vector3::from(rot), Vector3::from(trans))
    }

    fn random_trajectory(seed: u64, length: usize) -> Trajectory {
        let spec = RandomTrajectorySpec::default().with_length(length);
        generate_random_trajectory(&spec, &mut StdRng::seed_from_u64(seed)).unwrap()
    }

    #[test]
    fn test_cascade_structure() {
        let cascade = VerificationCascade::new();
        let weights = cascade.weights();
        assert!((weights.values().sum::<f64>() - 1.0).abs() < 1e-6);
        for level in VerificationLevel::ALL {
            assert!(weights.contains_key(&level));
            assert!(cascade.thresholds().contains_key(&level));
        }
    }

    #[test]
    fn test_return_quality_matches_optimizer() {
        let cascade = VerificationCascade::new();
        let t = random_trajectory(42, 10);
        let optimum = optimize_scaling_factor(&t, true);
        let error = cascade.verify_return_quality(&t, optimum.lambda);
        assert!(error >= 0.0);
        assert_eq!(error, optimum.error);
    }

    #[test]
    fn test_spatial_verification() {
        let cascade = VerificationCascade::new();
        let poses = vec![pose([0.0; 3], [0.5, 0.5, 0.0])];
        let bounded = Trajectory::bounded(poses.clone(), 1.0).unwrap();
        assert!(cascade.verify_bounded_domain(&bounded));
        assert!(cascade.verify_bounded_domain(&Trajectory::new(poses)));
    }

    #[test]
    fn test_non_finite_trajectory_scores_in_unit_range() {
        let cascade = VerificationCascade::new();
        let t = Trajectory::new(vec![pose([f64::NAN, 0.0, 0.0], [0.0; 3])]);
        assert!(!cascade.verify_bounded_domain(&t));

        let result = cascade.verify_regeneration(&t, 1.0, 100.0);
        assert!(result.overall_score.is_finite());
        assert!((0.0..=1.0).contains(&result.overall_score));
        assert!(result.token_award.is_finite());
        assert!(!result.passed);
        assert_eq!(result.verifications[&VerificationLevel::Spatial], 0.0);
        for level in &result.levels {
            assert!((0.0..=1.0).contains(&level.score), "{}: {}", level.level, level.score);
        }
    }

    #[test]
    fn test_temporal_ratio() {
        let cascade = VerificationCascade::new();
        let at_reference = Trajectory::new(vec![Pose::identity(); 10]);
        let short = Trajectory::new(vec![Pose::identity(); 5]);
        let long = Trajectory::new(vec![Pose::identity(); 20]);
        assert_eq!(cascade.verify_temporal(&at_reference), 1.0);
        assert_eq!(cascade.verify_temporal(&short), 0.5);
        assert_eq!(cascade.verify_temporal(&long), 0.5);
        assert_eq!(cascade.verify_temporal(&Trajectory::new(vec![])), 0.0);
    }

    #[test]
    fn test_energetic_is_mean_step_work() {
        let cascade = VerificationCascade::new();
        let t = Trajectory::new(vec![pose([0.0; 3], [1.0, 0.0, 0.0]), Pose::identity()]);
        // doubled: x, 0, x, 0 -> three unit steps
        assert!((cascade.verify_energetic(&t, 1.0) - 1.0).abs() < 1e-12);
        assert!((cascade.verify_energetic(&t, 0.5) - 0.5).abs() < 1e-12);
        assert_eq!(cascade.verify_energetic(&Trajectory::new(vec![]), 1.0), 0.0);
    }

    #[test]
    fn test_noise_robustness_range_and_determinism() {
        let cascade = VerificationCascade::new();
        let t = random_trajectory(7, 5);
        let lambda = optimize_scaling_factor(&t, true).lambda;
        let a = cascade.verify_noise_robustness(&t, lambda, 5, 0.05);
        let b = cascade.verify_noise_robustness(&t, lambda, 5, 0.05);
        assert!((0.0..=1.0).contains(&a));
        assert_eq!(a, b);
        assert_eq!(cascade.verify_noise_robustness(&t, lambda, 0, 0.05), 0.0);
    }

    #[test]
    fn test_identity_is_fully_robust() {
        let cascade = VerificationCascade::new();
        let t = Trajectory::new(vec![Pose::identity(); 3]);
        assert_eq!(cascade.verify_noise_robustness(&t, 1.0, 10, 0.0), 1.0);
    }

    #[test]
    fn test_full_cascade() {
        let cascade = VerificationCascade::new();
        let t = random_trajectory(3, 10);
        let lambda = optimize_scaling_factor(&t, true).lambda;
        let result = cascade.verify_regeneration(&t, lambda, 100.0);

        assert!((0.0..=1.0).contains(&result.overall_score));
        assert!(result.token_award >= 0.0);
        assert_eq!(result.verifications.len(), 5);
        assert_eq!(result.levels.len(), 5);
        assert_eq!(result.passed, result.overall_score >= 0.6);
    }

    #[test]
    fn test_high_quality_trajectory_passes() {
        let cascade = VerificationCascade::new();
        let t = Trajectory::bounded(
            vec![
                pose([0.05, 0.0, 0.0], [0.1, 0.0, 0.0]),
                pose([-0.05, 0.0, 0.0], [-0.1, 0.0, 0.0]),
            ],
            1.0,
        )
        .unwrap();
        let lambda = optimize_scaling_factor(&t, true).lambda;
        let result = cascade.verify(&t, lambda);

        assert!(result.overall_score > 0.5);
        assert!(result.token_award > 0.0);
        assert_eq!(result.verifications[&VerificationLevel::Spatial], 1.0);
    }

    #[test]
    fn test_invalid_weights_rejected() {
        let mut weights = LevelTable::from_fn(|l| l.default_weight());
        weights.topological = 0.9;
        let config = CascadeConfig::default().with_weights(weights);
        assert!(VerificationCascade::with_config(config).is_err());
    }

    #[test]
    fn test_level_names_serialize_lowercase() {
        let json = serde_json::to_string(&VerificationLevel::Topological).unwrap();
        assert_eq!(json, "\"topological\"");
        assert_eq!(VerificationLevel::Stochastic.to_string(), "stochastic");
    }
}
