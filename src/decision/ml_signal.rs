use serde::{Deserialize, Serialize};

use crate::models::{MlSignal, RiskLevel};

/// Bucketed reading of the classifier output.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MlSignalAssessment {
    pub ml_signal: MlSignal,
    pub ml_risk: RiskLevel,
    /// Probability of the predicted class; seeds the confidence score.
    pub probability: f64,
}

pub fn evaluate_ml_signal(prediction: u8, p_negative: f64, p_positive: f64) -> MlSignalAssessment {
    let (ml_signal, ml_risk, probability) = if prediction == 1 {
        if p_positive >= 0.8 {
            (MlSignal::StrongHigh, RiskLevel::High, p_positive)
        } else if p_positive >= 0.6 {
            (MlSignal::Moderate, RiskLevel::Medium, p_positive)
        } else {
            (MlSignal::Weak, RiskLevel::Low, p_positive)
        }
    } else if p_negative >= 0.8 {
        (MlSignal::StrongNegative, RiskLevel::Low, p_negative)
    } else {
        (MlSignal::UncertainNegative, RiskLevel::Low, p_negative)
    };

    MlSignalAssessment {
        ml_signal,
        ml_risk,
        probability,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn positive_buckets() {
        let strong = evaluate_ml_signal(1, 0.2, 0.8);
        assert_eq!(strong.ml_signal, MlSignal::StrongHigh);
        assert_eq!(strong.ml_risk, RiskLevel::High);
        assert_eq!(strong.probability, 0.8);

        let moderate = evaluate_ml_signal(1, 0.4, 0.6);
        assert_eq!(moderate.ml_signal, MlSignal::Moderate);
        assert_eq!(moderate.ml_risk, RiskLevel::Medium);

        let weak = evaluate_ml_signal(1, 0.45, 0.55);
        assert_eq!(weak.ml_signal, MlSignal::Weak);
        assert_eq!(weak.ml_risk, RiskLevel::Low);
    }

    #[test]
    fn negative_buckets() {
        let strong = evaluate_ml_signal(0, 0.92, 0.08);
        assert_eq!(strong.ml_signal, MlSignal::StrongNegative);
        assert_eq!(strong.probability, 0.92);

        let uncertain = evaluate_ml_signal(0, 0.7, 0.3);
        assert_eq!(uncertain.ml_signal, MlSignal::UncertainNegative);
        assert_eq!(uncertain.ml_risk, RiskLevel::Low);
        assert_eq!(uncertain.probability, 0.7);
    }
}
