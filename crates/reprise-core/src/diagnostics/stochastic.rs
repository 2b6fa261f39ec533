//! Stochastic processes on SE(3)
//!
//! Both processes integrate in logarithmic coordinates with Euler–Maruyama
//! and map back through the exponential, so every produced pose is a valid
//! rigid motion. Each instance owns its RNG and its current pose; share one
//! across threads only behind external synchronisation.

use crate::error::{RepriseError, Result};
use crate::se3::{so3, Pose, Trajectory};
use nalgebra::Vector3;
use rand::rngs::StdRng;
use rand::SeedableRng;
use rand_distr::{Distribution, Normal};
use serde::{Deserialize, Serialize};

/// Parameters of the mean-reverting process.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OrnsteinUhlenbeckConfig {
    /// Mean-reversion rate θ
    pub reversion_strength: f64,
    /// Noise amplitude σ
    pub noise_amplitude: f64,
    /// Integration step
    pub dt: f64,
}

impl Default for OrnsteinUhlenbeckConfig {
    fn default() -> Self {
        Self {
            reversion_strength: 0.5,
            noise_amplitude: 0.1,
            dt: 0.01,
        }
    }
}

impl OrnsteinUhlenbeckConfig {
    /// Check ranges
    pub fn validate(&self) -> Result<()> {
        if self.dt.is_nan()
            || self.dt <= 0.0
            || !self.reversion_strength.is_finite()
            || self.reversion_strength < 0.0
            || !self.noise_amplitude.is_finite()
            || self.noise_amplitude < 0.0
        {
            return Err(RepriseError::InvalidConfig(format!(
                "OU process needs dt > 0 and non-negative θ, σ: {self:?}"
            )));
        }
        Ok(())
    }
}

/// Mean-reverting process `dX = θ·log(X⁻¹μ)·dt + σ·dW` toward a target μ.
#[derive(Debug, Clone)]
pub struct OrnsteinUhlenbeckProcess {
    target: Pose,
    config: OrnsteinUhlenbeckConfig,
    current: Pose,
    noise: Normal<f64>,
    rng: StdRng,
}

impl OrnsteinUhlenbeckProcess {
    /// Start at the identity, reverting toward `target`, seeded from entropy.
    pub fn new(target: Pose, config: OrnsteinUhlenbeckConfig) -> Result<Self> {
        Self::build(target, config, StdRng::from_entropy())
    }

    /// Reproducible variant of [`OrnsteinUhlenbeckProcess::new`].
    pub fn with_seed(target: Pose, config: OrnsteinUhlenbeckConfig, seed: u64) -> Result<Self> {
        Self::build(target, config, StdRng::seed_from_u64(seed))
    }

    fn build(target: Pose, config: OrnsteinUhlenbeckConfig, rng: StdRng) -> Result<Self> {
        config.validate()?;
        let noise = Normal::new(0.0, config.noise_amplitude)
            .map_err(|e| RepriseError::InvalidConfig(e.to_string()))?;
        Ok(Self {
            target,
            config,
            current: Pose::identity(),
            noise,
            rng,
        })
    }

    /// Current state
    pub fn current(&self) -> &Pose {
        &self.current
    }

    /// Equilibrium target
    pub fn target(&self) -> &Pose {
        &self.target
    }

    /// One Euler–Maruyama step.
    pub fn step(&mut self) -> Pose {
        let relative_rotation = self.current.rotation().transpose() * self.target.rotation();
        let rotation_drift = so3::log(&relative_rotation) * self.config.reversion_strength;
        let translation_drift =
            (self.target.translation() - self.current.translation()) * self.config.reversion_strength;

        let dt = self.config.dt;
        let sqrt_dt = dt.sqrt();
        let rotation_noise = self.sample_vector();
        let translation_noise = self.sample_vector();

        let rotation =
            self.current.to_rotation_vector() + rotation_drift * dt + rotation_noise * sqrt_dt;
        let translation =
            self.current.translation() + translation_drift * dt + translation_noise * sqrt_dt;

        self.current = Pose::from_rotation_vector(rotation, translation);
        self.current
    }

    /// Run `steps` steps and collect the visited states (unbounded).
    pub fn simulate_trajectory(&mut self, steps: usize) -> Trajectory {
        Trajectory::new((0..steps).map(|_| self.step()).collect())
    }

    fn sample_vector(&mut self) -> Vector3<f64> {
        let noise = &self.noise;
        let rng = &mut self.rng;
        Vector3::from_fn(|_, _| noise.sample(rng))
    }
}

/// Parameters of the tethered walker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TetheredWalkerConfig {
    /// Hooke constant k of the tether
    pub elastic_constant: f64,
    /// Std of translation noise per √time
    pub translation_noise: f64,
    /// Std of rotation noise per √time
    pub rotation_noise: f64,
}

impl Default for TetheredWalkerConfig {
    fn default() -> Self {
        Self {
            elastic_constant: 0.1,
            translation_noise: 0.05,
            rotation_noise: 0.05,
        }
    }
}

impl TetheredWalkerConfig {
    /// Check ranges
    pub fn validate(&self) -> Result<()> {
        if !self.elastic_constant.is_finite() || self.elastic_constant < 0.0 {
            return Err(RepriseError::InvalidConfig(format!(
                "elastic constant must be finite and non-negative, got {}",
                self.elastic_constant
            )));
        }
        for (name, sigma) in [
            ("translation", self.translation_noise),
            ("rotation", self.rotation_noise),
        ] {
            if !sigma.is_finite() || sigma < 0.0 {
                return Err(RepriseError::InvalidConfig(format!(
                    "{name} noise must be finite and non-negative, got {sigma}"
                )));
            }
        }
        Ok(())
    }
}

/// Random walk held near the identity by a Hooke's-law restoring force.
#[derive(Debug, Clone)]
pub struct TetheredWalker {
    config: TetheredWalkerConfig,
    current: Pose,
    translation_noise: Normal<f64>,
    rotation_noise: Normal<f64>,
    rng: StdRng,
}

impl TetheredWalker {
    /// Walker at the identity, seeded from entropy
    pub fn new(config: TetheredWalkerConfig) -> Result<Self> {
        Self::build(config, StdRng::from_entropy())
    }

    /// Reproducible walker
    pub fn with_seed(config: TetheredWalkerConfig, seed: u64) -> Result<Self> {
        Self::build(config, StdRng::seed_from_u64(seed))
    }

    fn build(config: TetheredWalkerConfig, rng: StdRng) -> Result<Self> {
        config.validate()?;
        let translation_noise = Normal::new(0.0, config.translation_noise)
            .map_err(|e| RepriseError::InvalidConfig(e.to_string()))?;
        let rotation_noise = Normal::new(0.0, config.rotation_noise)
            .map_err(|e| RepriseError::InvalidConfig(e.to_string()))?;
        Ok(Self {
            config,
            current: Pose::identity(),
            translation_noise,
            rotation_noise,
            rng,
        })
    }

    /// Current position
    pub fn current_position(&self) -> &Pose {
        &self.current
    }

    /// Move the walker, e.g. to probe the restoring force
    pub fn set_position(&mut self, pose: Pose) {
        self.current = pose;
    }

    /// Elastic constant k
    pub fn elastic_constant(&self) -> f64 {
        self.config.elastic_constant
    }

    /// `(−k·t, −k·log R)`: pulls back toward the identity.
    pub fn compute_return_force(&self) -> (Vector3<f64>, Vector3<f64>) {
        let k = self.config.elastic_constant;
        (
            -self.current.translation() * k,
            -self.current.to_rotation_vector() * k,
        )
    }

    /// Integrate one step of length `dt`.
    pub fn step(&mut self, dt: f64) -> Pose {
        let (translation_force, rotation_force) = self.compute_return_force();
        let sqrt_dt = dt.max(0.0).sqrt();

        let translation_noise = {
            let (dist, rng) = (&self.translation_noise, &mut self.rng);
            Vector3::from_fn(|_, _| dist.sample(rng))
        };
        let rotation_noise = {
            let (dist, rng) = (&self.rotation_noise, &mut self.rng);
            Vector3::from_fn(|_, _| dist.sample(rng))
        };

        let translation =
            self.current.translation() + translation_force * dt + translation_noise * sqrt_dt;
        let rotation =
            self.current.to_rotation_vector() + rotation_force * dt + rotation_noise * sqrt_dt;

        self.current = Pose::from_rotation_vector(rotation, translation);
        self.current
    }
}
