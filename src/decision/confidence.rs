use crate::models::RiskLevel;

pub const MIN_CONFIDENCE: f64 = 0.40;
pub const MAX_CONFIDENCE: f64 = 1.00;

const FULL_AGREEMENT_BONUS: f64 = 0.10;
const PARTIAL_AGREEMENT_BONUS: f64 = 0.05;
const DISAGREEMENT_PENALTY: f64 = -0.20;
const PER_CRITICAL_BONUS: f64 = 0.05;
const MAX_CRITICAL_BONUS: f64 = 0.10;

/// Round to two decimal places.
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Blend the ML probability with signal agreement and critical findings.
///
/// Agreement compares the coarse ML risk and the clinical risk against the
/// final tier: both match +0.10, one matches +0.05, neither −0.20.
pub fn compute_confidence(
    probability: f64,
    ml_risk: RiskLevel,
    clinical_risk: RiskLevel,
    risk_tier: RiskLevel,
    critical_count: usize,
) -> f64 {
    let agreement = match (ml_risk == risk_tier, clinical_risk == risk_tier) {
        (true, true) => FULL_AGREEMENT_BONUS,
        (true, false) | (false, true) => PARTIAL_AGREEMENT_BONUS,
        (false, false) => DISAGREEMENT_PENALTY,
    };
    let critical_bonus = (critical_count as f64 * PER_CRITICAL_BONUS).min(MAX_CRITICAL_BONUS);

    let raw = probability + agreement + critical_bonus;
    let clamped = if raw.is_nan() {
        MIN_CONFIDENCE
    } else {
        raw.clamp(MIN_CONFIDENCE, MAX_CONFIDENCE)
    };
    round2(clamped)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn full_agreement_clamps_to_one() {
        let c = compute_confidence(0.92, RiskLevel::Low, RiskLevel::Low, RiskLevel::Low, 0);
        assert_eq!(c, 1.0);
    }

    #[test]
    fn partial_agreement() {
        let c = compute_confidence(0.7, RiskLevel::Medium, RiskLevel::Low, RiskLevel::Medium, 0);
        assert_eq!(c, 0.75);
    }

    #[test]
    fn disagreement_clamps_to_floor() {
        let c = compute_confidence(0.5, RiskLevel::Low, RiskLevel::Low, RiskLevel::High, 0);
        assert_eq!(c, 0.40);
    }

    #[test]
    fn critical_bonus_is_capped() {
        let two = compute_confidence(0.6, RiskLevel::Low, RiskLevel::Medium, RiskLevel::High, 2);
        let five = compute_confidence(0.6, RiskLevel::Low, RiskLevel::Medium, RiskLevel::High, 5);
        assert_eq!(two, 0.5);
        assert_eq!(two, five);
    }

    #[test]
    fn always_within_bounds() {
        for p in [0.0, 0.25, 0.5, 0.75, 1.0] {
            for crit in 0..4 {
                let c = compute_confidence(p, RiskLevel::High, RiskLevel::Low, RiskLevel::Medium, crit);
                assert!((MIN_CONFIDENCE..=MAX_CONFIDENCE).contains(&c));
            }
        }
    }
}
