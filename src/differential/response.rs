use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::decision::{ClinicalIndicators, Decision};
use crate::models::{
    DecisionAction, DifferentialConsideration, DifferentialRecord, DifferentialSource,
    ExplanationSource, LlmInsights, RiskLevel,
};

use super::insights::{explanation_for, recommended_actions};

/// Where the differential in a response came from on this call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DifferentialOutcome {
    /// Reused from the store; no external calls were made.
    Cached,
    /// Freshly generated by the narrative model.
    Fresh,
    /// Narrative unavailable; rule-based ranking.
    Fallback,
}

/// Full kidney decision response: engine output plus the persisted differential.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ThirdOpResponse {
    pub case_id: String,
    pub risk_tier: RiskLevel,
    pub decision: DecisionAction,
    pub human_escalation: bool,
    pub confidence: f64,
    pub clinical_indicators: ClinicalIndicators,
    pub ranked_differentials: Vec<DifferentialConsideration>,
    pub status: String,
    pub message: String,
    pub differential_source: DifferentialSource,
    pub differential_outcome: DifferentialOutcome,
    pub llm_insights: LlmInsights,
    pub explanation: String,
    pub explanation_source: ExplanationSource,
    pub recommended_actions: Vec<String>,
    pub timestamp: DateTime<Utc>,
}

impl ThirdOpResponse {
    pub fn assemble(
        decision: &Decision,
        record: &DifferentialRecord,
        outcome: DifferentialOutcome,
    ) -> Self {
        let (explanation, explanation_source) = explanation_for(decision, &record.llm_insights);
        Self {
            case_id: record.case_id.clone(),
            risk_tier: decision.risk_tier,
            decision: decision.decision,
            human_escalation: decision.human_escalation,
            confidence: decision.confidence,
            clinical_indicators: decision.clinical_indicators.clone(),
            ranked_differentials: record.ranked_differentials.clone(),
            status: record.status.clone(),
            message: record.message.clone(),
            differential_source: record.source,
            differential_outcome: outcome,
            llm_insights: record.llm_insights.clone(),
            explanation,
            explanation_source,
            recommended_actions: recommended_actions(decision),
            timestamp: Utc::now(),
        }
    }
}
