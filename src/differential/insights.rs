//! Human-readable layer around a decision: clinical-reasoning insights, the
//! explanation text and recommended actions.

use serde_json::{Map, Value};

use crate::decision::Decision;
use crate::models::{DecisionAction, ExplanationSource, LlmInsights};
use crate::reasoning::{ClinicalReasoning, ReasoningError, ReasoningInput};

pub fn reasoning_input(decision: &Decision, lab_display: &Map<String, Value>) -> ReasoningInput {
    ReasoningInput {
        risk_level: decision.risk_tier,
        lab_values: lab_display.clone(),
    }
}

/// Reasoning success becomes tagged insights; any failure becomes the placeholder.
pub fn insights_from_reasoning(
    case_id: &str,
    decision: &Decision,
    result: Result<ClinicalReasoning, ReasoningError>,
) -> LlmInsights {
    match result {
        Ok(reasoning) => LlmInsights::from_concerns(reasoning.concerns, decision.risk_tier),
        Err(e) => {
            tracing::warn!(case_id = %case_id, error = %e, "Clinical reasoning failed, using placeholder insights");
            LlmInsights::placeholder()
        }
    }
}

/// Deterministic explanation of how the engine reached its tier.
pub fn rule_explanation(decision: &Decision) -> String {
    let mut text = format!(
        "Risk tier {} from {} abnormal and {} critical kidney findings combined with an ML signal of {} (probability {:.2}).",
        decision.risk_tier.as_str(),
        decision.clinical.abnormal_count,
        decision.clinical.critical_count,
        decision.ml.ml_signal.as_str().replace('_', " "),
        decision.ml.probability,
    );
    if let Some(rule) = decision.exception {
        text.push_str(&format!(
            " Escalated regardless of the ML signal: {}.",
            rule.description()
        ));
    }
    if let Some(top) = decision.ranked_differentials.first() {
        text.push_str(&format!(
            " Leading consideration: {} ({:.2}).",
            top.condition, top.confidence
        ));
    }
    text
}

/// Explanation shown with the response and where it came from.
pub fn explanation_for(decision: &Decision, insights: &LlmInsights) -> (String, ExplanationSource) {
    if insights.is_placeholder() || insights.overall_interpretation.trim().is_empty() {
        (rule_explanation(decision), ExplanationSource::Rules)
    } else {
        (insights.overall_interpretation.clone(), ExplanationSource::Llm)
    }
}

pub fn recommended_actions(decision: &Decision) -> Vec<String> {
    let mut actions: Vec<String> = Vec::new();
    if decision.human_escalation {
        actions.push("Clinician review required before acting on this assessment".into());
    }

    let steps: &[&str] = match decision.decision {
        DecisionAction::Monitor => &[
            "Repeat kidney panel (creatinine, eGFR, urine ACR) at routine follow-up",
            "Continue current care plan",
        ],
        DecisionAction::RequestAdditionalTests => &[
            "Repeat creatinine and eGFR within 3 months to confirm the trend",
            "Quantify proteinuria with a repeat urine ACR",
            "Review blood pressure and glycemic control",
        ],
        DecisionAction::Escalate => &[
            "Refer to nephrology for prompt evaluation",
            "Repeat renal function tests urgently",
            "Discuss kidney biopsy if proteinuria persists",
        ],
    };
    actions.extend(steps.iter().map(|s| s.to_string()));
    actions
}
