//! ThirdOp decision engine.
//!
//! Pure and synchronous: fuses the IgAN classifier output with rule-based
//! kidney thresholds into a risk tier, an action, an escalation flag, a
//! confidence score and five ranked differential considerations. No I/O.

pub mod clinical;
pub mod confidence;
pub mod differentials;
pub mod fusion;
pub mod input;
pub mod ml_signal;

pub use clinical::*;
pub use confidence::*;
pub use differentials::*;
pub use fusion::*;
pub use input::*;
pub use ml_signal::*;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::{DecisionAction, RiskLevel};

#[derive(Error, Debug, Clone, PartialEq)]
pub enum DecisionError {
    #[error("ML prediction status is '{status}', expected 'success'")]
    ContractViolation { status: String },
}

/// Authoritative engine output. Immutable once computed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Decision {
    pub risk_tier: RiskLevel,
    pub decision: DecisionAction,
    pub human_escalation: bool,
    pub confidence: f64,
    pub clinical_indicators: ClinicalIndicators,
    pub ranked_differentials: Vec<RankedDifferential>,
    pub clinical: ClinicalRiskAssessment,
    pub ml: MlSignalAssessment,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exception: Option<ExceptionRule>,
}

/// Run the full engine on one case.
///
/// Fails only when the ML prediction is not a success; callers must not
/// invoke the engine without a usable prediction.
pub fn analyze_third_op_case(input: &ThirdOpInput) -> Result<Decision, DecisionError> {
    if !input.ml_prediction.is_success() {
        return Err(DecisionError::ContractViolation {
            status: input.ml_prediction.status.clone(),
        });
    }

    let values = &input.clinical;
    let prediction = input.prediction();
    let (p_negative, p_positive) = input.probabilities();

    let clinical = evaluate_clinical(values);
    let ml = evaluate_ml_signal(prediction, p_negative, p_positive);

    let matrix_tier = fuse_risk_tier(ml.ml_signal, clinical.clinical_risk);
    let risk_tier = apply_tier_exceptions(matrix_tier, values);
    let decision = apply_decision_exceptions(map_decision(risk_tier), values);

    let human_escalation = human_escalation(&EscalationInputs {
        risk_tier,
        decision,
        values,
        prediction,
        p_positive,
        critical_count: clinical.critical_count,
    });

    let confidence = compute_confidence(
        ml.probability,
        ml.ml_risk,
        clinical.clinical_risk,
        risk_tier,
        clinical.critical_count,
    );

    let ranked_differentials = rank_differentials(values, p_positive, risk_tier);

    tracing::debug!(
        risk_tier = risk_tier.as_str(),
        matrix_tier = matrix_tier.as_str(),
        decision = decision.as_str(),
        human_escalation,
        confidence,
        "ThirdOp case analyzed"
    );

    Ok(Decision {
        risk_tier,
        decision,
        human_escalation,
        confidence,
        clinical_indicators: clinical.indicators.clone(),
        ranked_differentials,
        clinical,
        ml,
        exception: exception_override(values),
    })
}
