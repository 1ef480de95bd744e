use crate::decision::Decision;
use crate::models::{DifferentialConsideration, Likelihood};

/// Record status used when the narrative generator was unavailable.
pub const FALLBACK_STATUS: &str = "fallback";

pub const HIGH_LIKELIHOOD_FROM: f64 = 0.6;
pub const MODERATE_LIKELIHOOD_FROM: f64 = 0.35;

pub fn likelihood_for(confidence: f64) -> Likelihood {
    if confidence >= HIGH_LIKELIHOOD_FROM {
        Likelihood::High
    } else if confidence >= MODERATE_LIKELIHOOD_FROM {
        Likelihood::Moderate
    } else {
        Likelihood::Low
    }
}

/// Rule-based differentials straight from the engine's scores, in engine order.
pub fn rule_based_differentials(decision: &Decision) -> Vec<DifferentialConsideration> {
    decision
        .ranked_differentials
        .iter()
        .map(|d| DifferentialConsideration {
            condition: d.condition.clone(),
            likelihood: likelihood_for(d.confidence),
            reasoning: d.rationale.clone(),
            confidence: Some(d.confidence),
        })
        .collect()
}

pub fn fallback_message(decision: &Decision) -> String {
    format!(
        "AI narrative unavailable; differentials ranked by rule-based scoring (risk tier {}).",
        decision.risk_tier.as_str()
    )
}
