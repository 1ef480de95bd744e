use serde::{Deserialize, Serialize};

use super::enums::{InsightsSource, RiskLevel};

/// One patient-facing concern produced by clinical reasoning.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Concern {
    pub title: String,
    pub reason: String,
    #[serde(default)]
    pub doctor_questions: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RankedConcern {
    pub rank: usize,
    pub title: String,
    pub reason: String,
}

/// Human-readable reasoning attached to a case, tagged with where it came from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LlmInsights {
    pub ranked_concerns: Vec<RankedConcern>,
    pub overall_interpretation: String,
    pub concerns: Vec<Concern>,
    pub summary: String,
    pub source: InsightsSource,
}

impl LlmInsights {
    /// Build insights from model concerns; order as returned by the model is the rank.
    pub fn from_concerns(concerns: Vec<Concern>, risk_tier: RiskLevel) -> Self {
        let ranked_concerns = concerns
            .iter()
            .enumerate()
            .map(|(i, c)| RankedConcern {
                rank: i + 1,
                title: c.title.clone(),
                reason: c.reason.clone(),
            })
            .collect();

        let titles: Vec<&str> = concerns
            .iter()
            .map(|c| c.title.as_str())
            .filter(|t| !t.is_empty())
            .collect();

        let overall_interpretation = if titles.is_empty() {
            format!(
                "Lab pattern reviewed at {} risk; no specific concerns were highlighted.",
                risk_tier.as_str()
            )
        } else {
            format!(
                "Lab pattern reviewed at {} risk. Main points to discuss with your doctor: {}.",
                risk_tier.as_str(),
                titles.join("; ")
            )
        };

        let summary = match concerns.len() {
            0 => "No concerns identified by clinical reasoning.".to_string(),
            1 => "1 concern identified by clinical reasoning.".to_string(),
            n => format!("{n} concerns identified by clinical reasoning."),
        };

        Self {
            ranked_concerns,
            overall_interpretation,
            concerns,
            summary,
            source: InsightsSource::Llm,
        }
    }

    /// Static stand-in used whenever clinical reasoning is unavailable.
    pub fn placeholder() -> Self {
        Self {
            ranked_concerns: Vec::new(),
            overall_interpretation:
                "AI clinical reasoning is currently unavailable. The risk tier and differential considerations above are rule-based."
                    .to_string(),
            concerns: Vec::new(),
            summary: "Clinical reasoning unavailable; showing rule-based results only.".to_string(),
            source: InsightsSource::Placeholder,
        }
    }

    pub fn is_placeholder(&self) -> bool {
        self.source == InsightsSource::Placeholder
    }
}
