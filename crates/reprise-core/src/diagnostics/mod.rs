//! Exploratory diagnostics - Layer 4 of Reprise
//!
//! None of these feed the return-error pipeline directly. They are probes:
//! stochastic processes on SE(3), a path-dependent work accumulator, the
//! holonomy of a loop, and truncated BCH composition.

pub mod bch;
pub mod holonomy;
pub mod hysteresis;
pub mod stochastic;

pub use bch::{
    bch_approximation, predict_composition_accuracy, predict_intervention_interference,
    scaling_defect, BchOrder, CompositionPrediction,
};
pub use holonomy::{compute_geometric_phase, GeometricPhase};
pub use hysteresis::{path_work, step_work, HysteresisTracker};
pub use stochastic::{
    OrnsteinUhlenbeckConfig, OrnsteinUhlenbeckProcess, TetheredWalker, TetheredWalkerConfig,
};
