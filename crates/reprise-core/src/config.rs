//! Reprise configuration
//!
//! One serde tree covering every tunable component. Parsing works from
//! strings only; reading files is left to the caller.

use crate::diagnostics::{
    HysteresisTracker, OrnsteinUhlenbeckConfig, OrnsteinUhlenbeckProcess, TetheredWalker,
    TetheredWalkerConfig,
};
use crate::error::{RepriseError, Result, ResultExt};
use crate::resonance::{ResonanceAwareOptimizer, ResonanceConfig, ResonanceDetector};
use crate::returns::{CalibrationConfig, OptimizerConfig, ReturnQualityCalibrator, ScalingOptimizer};
use crate::se3::Pose;
use crate::verification::{CascadeConfig, VerificationCascade};
use serde::{Deserialize, Serialize};

/// Settings for the stochastic and path-dependent diagnostics
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DiagnosticsConfig {
    /// Mean-reverting process
    pub ou: OrnsteinUhlenbeckConfig,

    /// Tethered walker
    pub walker: TetheredWalkerConfig,

    /// Hysteresis enhancement rate
    pub enhancement_rate: f64,

    /// Seed for both processes; entropy when absent
    pub seed: Option<u64>,
}

impl Default for DiagnosticsConfig {
    fn default() -> Self {
        Self {
            ou: OrnsteinUhlenbeckConfig::default(),
            walker: TetheredWalkerConfig::default(),
            enhancement_rate: 0.1,
            seed: None,
        }
    }
}

/// Top-level configuration
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RepriseConfig {
    /// λ search
    pub optimizer: OptimizerConfig,

    /// Quality calibration
    pub calibration: CalibrationConfig,

    /// Verification cascade
    pub cascade: CascadeConfig,

    /// Resonance detection
    pub resonance: ResonanceConfig,

    /// Diagnostics
    pub diagnostics: DiagnosticsConfig,
}

impl RepriseConfig {
    /// Create a new configuration with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse and validate TOML. Missing sections take their defaults.
    pub fn from_toml_str(input: &str) -> Result<Self> {
        let config: Self = toml::from_str(input)?;
        config.validate()?;
        Ok(config)
    }

    /// Parse and validate JSON
    pub fn from_json_str(input: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(input)?;
        config.validate()?;
        Ok(config)
    }

    /// Render as TOML
    pub fn to_toml_string(&self) -> Result<String> {
        Ok(toml::to_string(self)?)
    }

    /// Set the optimizer section
    pub fn with_optimizer(mut self, optimizer: OptimizerConfig) -> Self {
        self.optimizer = optimizer;
        self
    }

    /// Set the calibration section
    pub fn with_calibration(mut self, calibration: CalibrationConfig) -> Self {
        self.calibration = calibration;
        self
    }

    /// Set the cascade section
    pub fn with_cascade(mut self, cascade: CascadeConfig) -> Self {
        self.cascade = cascade;
        self
    }

    /// Set the resonance section
    pub fn with_resonance(mut self, resonance: ResonanceConfig) -> Self {
        self.resonance = resonance;
        self
    }

    /// Set the diagnostics section
    pub fn with_diagnostics(mut self, diagnostics: DiagnosticsConfig) -> Self {
        self.diagnostics = diagnostics;
        self
    }

    /// Validate every section
    pub fn validate(&self) -> Result<()> {
        self.optimizer.validate().context("optimizer")?;
        self.calibration.validate().context("calibration")?;
        self.cascade.validate().context("cascade")?;
        self.resonance.validate().context("resonance")?;
        self.diagnostics.ou.validate().context("diagnostics.ou")?;
        self.diagnostics.walker.validate().context("diagnostics.walker")?;
        let rate = self.diagnostics.enhancement_rate;
        if rate.is_nan() || rate < 0.0 {
            return Err(
                RepriseError::InvalidConfig("enhancement rate must be non-negative".into())
                    .context("diagnostics"),
            );
        }
        Ok(())
    }

    /// λ search built from this configuration
    pub fn scaling_optimizer(&self) -> Result<ScalingOptimizer> {
        ScalingOptimizer::with_config(self.optimizer.clone())
    }

    /// Calibrator built from this configuration
    pub fn calibrator(&self) -> Result<ReturnQualityCalibrator> {
        ReturnQualityCalibrator::new(self.calibration.clone())
    }

    /// Verification cascade built from this configuration
    pub fn cascade(&self) -> Result<VerificationCascade> {
        VerificationCascade::with_config(self.cascade.clone())
    }

    /// Resonance detector built from this configuration
    pub fn resonance_detector(&self) -> Result<ResonanceDetector> {
        ResonanceDetector::with_config(self.resonance.clone())
    }

    /// Biased optimizer sharing the resonance and optimizer sections
    pub fn resonance_optimizer(&self) -> Result<ResonanceAwareOptimizer> {
        Ok(ResonanceAwareOptimizer::new(self.resonance.bias_strength)
            .with_optimizer(self.optimizer.clone())?
            .with_double(self.resonance.double))
    }

    /// Empty hysteresis tracker
    pub fn hysteresis_tracker(&self) -> HysteresisTracker {
        HysteresisTracker::new(self.diagnostics.enhancement_rate)
    }

    /// Mean-reverting process toward `target`
    pub fn ou_process(&self, target: Pose) -> Result<OrnsteinUhlenbeckProcess> {
        let ou = self.diagnostics.ou.clone();
        match self.diagnostics.seed {
            Some(seed) => OrnsteinUhlenbeckProcess::with_seed(target, ou, seed),
            None => OrnsteinUhlenbeckProcess::new(target, ou),
        }
    }

    /// Tethered walker at the identity
    pub fn tethered_walker(&self) -> Result<TetheredWalker> {
        let walker = self.diagnostics.walker.clone();
        match self.diagnostics.seed {
            Some(seed) => TetheredWalker::with_seed(walker, seed),
            None => TetheredWalker::new(walker),
        }
    }
}
