use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::decision::Decision;
use crate::models::{Concern, DifferentialConsideration, MlPrediction, RiskLevel};
use crate::pipeline::reference::Abnormality;

use super::ReasoningError;

/// Case context handed to the narrative generator alongside the decision.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClinicalContext {
    pub case_id: String,
    /// Lab values under display labels.
    pub lab_values: Map<String, Value>,
    pub ml_prediction: MlPrediction,
}

/// Narrative differential as returned by the model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NarrativeResult {
    pub status: String,
    pub message: String,
    pub ranked_differentials: Vec<DifferentialConsideration>,
}

/// Structured lab input for clinical reasoning: display-keyed values plus
/// the engine's risk tier.
#[derive(Debug, Clone, PartialEq)]
pub struct ReasoningInput {
    pub risk_level: RiskLevel,
    pub lab_values: Map<String, Value>,
}

impl ReasoningInput {
    /// `{"riskLevel": "HIGH", "CREATININE (mg/dL)": 3.4, ...}`
    pub fn to_prompt_json(&self) -> Value {
        let mut object = Map::new();
        object.insert(
            "riskLevel".to_string(),
            Value::String(self.risk_level.prompt_label().to_string()),
        );
        for (key, value) in &self.lab_values {
            object.insert(key.clone(), value.clone());
        }
        Value::Object(object)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ClinicalReasoning {
    pub concerns: Vec<Concern>,
}

/// General multi-system interpretation. On failure this is an error-shaped
/// object, never an `Err` to the caller.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnyReportInterpretation {
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub error: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub concerns: Vec<Concern>,
    pub recommended_department: String,
    pub precautions: Vec<String>,
}

impl AnyReportInterpretation {
    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            error: true,
            message: Some(message.into()),
            ..Self::default()
        }
    }
}

/// Produces narrative differentials from an engine decision.
#[async_trait]
pub trait NarrativeGenerator: Send + Sync {
    async fn generate_narrative(
        &self,
        decision: &Decision,
        context: &ClinicalContext,
    ) -> Result<NarrativeResult, ReasoningError>;
}

/// Produces patient-facing concerns with questions for the doctor.
#[async_trait]
pub trait ClinicalReasoner: Send + Sync {
    async fn generate_reasoning(
        &self,
        input: &ReasoningInput,
    ) -> Result<ClinicalReasoning, ReasoningError>;
}

/// Explains out-of-range values from any report, not only kidney panels.
#[async_trait]
pub trait AnyReportInterpreter: Send + Sync {
    async fn interpret_any_report(
        &self,
        abnormalities: &[Abnormality],
    ) -> Result<AnyReportInterpretation, ReasoningError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn reasoning_input_leads_with_risk_level() {
        let mut labs = Map::new();
        labs.insert("eGFR".into(), json!(28));
        let input = ReasoningInput {
            risk_level: RiskLevel::Medium,
            lab_values: labs,
        };
        let value = input.to_prompt_json();
        assert_eq!(value["riskLevel"], "MODERATE");
        assert_eq!(value["eGFR"], 28);
        let first_key = value.as_object().unwrap().keys().next().unwrap().clone();
        assert_eq!(first_key, "riskLevel");
    }

    #[test]
    fn failed_interpretation_shape() {
        let value = serde_json::to_value(AnyReportInterpretation::failed("Ollama down")).unwrap();
        assert_eq!(value["error"], true);
        assert_eq!(value["message"], "Ollama down");
        assert_eq!(value["concerns"], json!([]));
        assert_eq!(value["recommendedDepartment"], "");
        assert_eq!(value["precautions"], json!([]));
    }

    #[test]
    fn successful_interpretation_omits_error_flag() {
        let value = serde_json::to_value(AnyReportInterpretation {
            recommended_department: "Internal Medicine".into(),
            ..Default::default()
        })
        .unwrap();
        assert!(value.get("error").is_none());
        assert!(value.get("message").is_none());
    }
}
