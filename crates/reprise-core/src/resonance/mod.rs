//! Resonance detection - Layer 3b of Reprise
//!
//! Tests whether a trajectory's best scaling factor sits near one of seven
//! notable constants (golden ratio, silver ratio, plastic number and four
//! musical intervals). The table is compile-time data and safe to read from
//! any thread.

pub mod constants;
pub mod detector;
pub mod optimizer;

pub use constants::{
    nearest_resonance, resonance_constant, ResonanceConstant, GOLDEN_RATIO, MAJOR_THIRD, OCTAVE,
    PERFECT_FIFTH, PERFECT_FOURTH, PLASTIC_NUMBER, RESONANCE_CONSTANTS, SILVER_RATIO,
};
pub use detector::{ResonanceConfig, ResonanceDetector, ResonanceResult};
pub use optimizer::ResonanceAwareOptimizer;
