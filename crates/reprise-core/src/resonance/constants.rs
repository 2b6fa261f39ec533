//! Named scaling constants

use serde::Serialize;

/// A named constant a scaling factor can resonate with.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ResonanceConstant {
    /// Table key, e.g. `"golden_ratio"`
    pub name: &'static str,
    /// Numeric value
    pub value: f64,
}

/// 1/φ = (√5 − 1)/2
pub const GOLDEN_RATIO: f64 = 0.618_033_988_749_894_9;
/// 1 + √2
pub const SILVER_RATIO: f64 = 2.414_213_562_373_095;
/// Real root of x³ = x + 1
pub const PLASTIC_NUMBER: f64 = 1.324_717_957_244_746;
/// 2:1
pub const OCTAVE: f64 = 2.0;
/// 3:2
pub const PERFECT_FIFTH: f64 = 1.5;
/// 4:3
pub const PERFECT_FOURTH: f64 = 4.0 / 3.0;
/// 5:4
pub const MAJOR_THIRD: f64 = 1.25;

/// The fixed table, in reporting order.
pub const RESONANCE_CONSTANTS: [ResonanceConstant; 7] = [
    ResonanceConstant { name: "golden_ratio", value: GOLDEN_RATIO },
    ResonanceConstant { name: "silver_ratio", value: SILVER_RATIO },
    ResonanceConstant { name: "plastic_number", value: PLASTIC_NUMBER },
    ResonanceConstant { name: "octave", value: OCTAVE },
    ResonanceConstant { name: "perfect_fifth", value: PERFECT_FIFTH },
    ResonanceConstant { name: "perfect_fourth", value: PERFECT_FOURTH },
    ResonanceConstant { name: "major_third", value: MAJOR_THIRD },
];

/// Look a constant up by name.
pub fn resonance_constant(name: &str) -> Option<ResonanceConstant> {
    RESONANCE_CONSTANTS.iter().copied().find(|c| c.name == name)
}

/// The constant closest to `lambda`, with its absolute distance. Ties go to
/// the earlier table entry.
pub fn nearest_resonance(lambda: f64) -> (ResonanceConstant, f64) {
    let mut best = RESONANCE_CONSTANTS[0];
    let mut best_distance = (lambda - best.value).abs();
    for constant in &RESONANCE_CONSTANTS[1..] {
        let distance = (lambda - constant.value).abs();
        if distance < best_distance {
            best = *constant;
            best_distance = distance;
        }
    }
    (best, best_distance)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_constant_values() {
        assert!((GOLDEN_RATIO - (5f64.sqrt() - 1.0) / 2.0).abs() < 1e-15);
        assert!((SILVER_RATIO - (1.0 + 2f64.sqrt())).abs() < 1e-15);
        assert!((PLASTIC_NUMBER.powi(3) - PLASTIC_NUMBER - 1.0).abs() < 1e-12);
        assert!((PERFECT_FOURTH - 4.0 / 3.0).abs() < 1e-10);
    }

    #[test]
    fn test_lookup() {
        assert_eq!(resonance_constant("octave").map(|c| c.value), Some(2.0));
        assert!(resonance_constant("tritone").is_none());
    }

    #[test]
    fn test_nearest() {
        let (c, d) = nearest_resonance(0.62);
        assert_eq!(c.name, "golden_ratio");
        assert!(d < 0.1);

        let (c, d) = nearest_resonance(2.05);
        assert_eq!(c.name, "octave");
        assert!(d < 0.1);

        let (c, _) = nearest_resonance(1.3);
        assert_eq!(c.name, "plastic_number");
    }
}
