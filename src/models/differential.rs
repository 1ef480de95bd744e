use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use super::enums::{DifferentialSource, Likelihood};
use super::insights::LlmInsights;

/// One differential consideration as persisted and returned to callers.
///
/// LLM output carries a likelihood and reasoning; the rule-based fallback also
/// keeps the engine's numeric confidence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DifferentialConsideration {
    pub condition: String,
    pub likelihood: Likelihood,
    pub reasoning: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
}

/// Persisted differential for one case. Created on first computation and
/// reused verbatim until an explicit refresh replaces it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DifferentialRecord {
    pub case_id: String,
    pub status: String,
    pub message: String,
    pub ranked_differentials: Vec<DifferentialConsideration>,
    pub source: DifferentialSource,
    pub llm_insights: LlmInsights,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}
