//! Risk-tier fusion, exception overrides, decision mapping and the
//! human-escalation flag.

use serde::{Deserialize, Serialize};

use crate::models::{DecisionAction, MlSignal, RiskLevel};

use super::input::ClinicalValues;

/// Fused tier per ML signal, indexed by clinical risk (low, medium, high).
const FUSION_MATRIX: [(MlSignal, [RiskLevel; 3]); 5] = [
    (
        MlSignal::StrongHigh,
        [RiskLevel::Medium, RiskLevel::High, RiskLevel::High],
    ),
    (
        MlSignal::Moderate,
        [RiskLevel::Medium, RiskLevel::Medium, RiskLevel::High],
    ),
    (
        MlSignal::Weak,
        [RiskLevel::Low, RiskLevel::Low, RiskLevel::Medium],
    ),
    (
        MlSignal::StrongNegative,
        [RiskLevel::Low, RiskLevel::Low, RiskLevel::Low],
    ),
    (
        MlSignal::UncertainNegative,
        [RiskLevel::Low, RiskLevel::Low, RiskLevel::Medium],
    ),
];

fn clinical_index(risk: RiskLevel) -> usize {
    match risk {
        RiskLevel::Low => 0,
        RiskLevel::Medium => 1,
        RiskLevel::High => 2,
    }
}

/// Matrix lookup. Combinations absent from the table read as low.
pub fn fuse_risk_tier(signal: MlSignal, clinical_risk: RiskLevel) -> RiskLevel {
    FUSION_MATRIX
        .iter()
        .find(|(s, _)| *s == signal)
        .map(|(_, row)| row[clinical_index(clinical_risk)])
        .unwrap_or(RiskLevel::Low)
}

/// Hard clinical conditions that force `high` / `escalate`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExceptionRule {
    /// eGFR < 30
    SevereEgfr,
    /// ACR > 300
    SevereProteinuria,
    /// Creatinine > 3.0 with eGFR < 45
    CreatinineWithReducedEgfr,
}

impl ExceptionRule {
    pub fn description(&self) -> &'static str {
        match self {
            ExceptionRule::SevereEgfr => "eGFR below 30",
            ExceptionRule::SevereProteinuria => "ACR above 300",
            ExceptionRule::CreatinineWithReducedEgfr => "creatinine above 3.0 with eGFR below 45",
        }
    }
}

/// First exception that holds, checked in fixed order.
pub fn exception_override(values: &ClinicalValues) -> Option<ExceptionRule> {
    if values.egfr.is_some_and(|e| e < 30.0) {
        return Some(ExceptionRule::SevereEgfr);
    }
    if values.acr.is_some_and(|a| a > 300.0) {
        return Some(ExceptionRule::SevereProteinuria);
    }
    if values.creatinine.is_some_and(|c| c > 3.0) && values.egfr.is_some_and(|e| e < 45.0) {
        return Some(ExceptionRule::CreatinineWithReducedEgfr);
    }
    None
}

pub fn apply_tier_exceptions(tier: RiskLevel, values: &ClinicalValues) -> RiskLevel {
    match exception_override(values) {
        Some(_) => RiskLevel::High,
        None => tier,
    }
}

pub fn map_decision(tier: RiskLevel) -> DecisionAction {
    match tier {
        RiskLevel::Low => DecisionAction::Monitor,
        RiskLevel::Medium => DecisionAction::RequestAdditionalTests,
        RiskLevel::High => DecisionAction::Escalate,
    }
}

/// Re-checks the exceptions on the decision itself; never derived from the tier.
pub fn apply_decision_exceptions(
    decision: DecisionAction,
    values: &ClinicalValues,
) -> DecisionAction {
    match exception_override(values) {
        Some(_) => DecisionAction::Escalate,
        None => decision,
    }
}

pub struct EscalationInputs<'a> {
    pub risk_tier: RiskLevel,
    pub decision: DecisionAction,
    pub values: &'a ClinicalValues,
    pub prediction: u8,
    pub p_positive: f64,
    pub critical_count: usize,
}

pub fn human_escalation(inputs: &EscalationInputs<'_>) -> bool {
    (inputs.risk_tier == RiskLevel::High && inputs.decision == DecisionAction::Escalate)
        || inputs.values.egfr.is_some_and(|e| e < 30.0)
        || inputs.values.acr.is_some_and(|a| a > 300.0)
        || (inputs.prediction == 1 && inputs.p_positive > 0.9)
        || inputs.critical_count >= 2
}
