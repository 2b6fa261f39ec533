//! Verification cascade - Layer 3 of Reprise
//!
//! Combines five independent checks of a trajectory at a chosen λ into one
//! weighted score and a reward derived from it. See [`cascade`] for the
//! per-level formulas.

pub mod cascade;

pub use cascade::{
    CascadeConfig, LevelScore, LevelTable, VerificationCascade, VerificationLevel,
    VerificationResult,
};
