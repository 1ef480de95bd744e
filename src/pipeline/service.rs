//! End-to-end analysis: raw lab input → normalize → sanity check → module
//! dispatch → differential orchestration → `AnalysisResponse`.
//!
//! Also serves the any-report path: abnormal values of a general report sent
//! to the interpreter, with an error-shaped result on failure.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use uuid::Uuid;

use crate::config::ThirdOpConfig;
use crate::db::store::{DifferentialStore, InMemoryDifferentialStore, SqliteDifferentialStore};
use crate::decision::DecisionError;
use crate::differential::{DifferentialOrchestrator, DifferentialRequest, ThirdOpResponse};
use crate::models::{MlPrediction, ValidationWarning};
use crate::reasoning::{
    AnyReportInterpretation, AnyReportInterpreter, OllamaReasoningClient, ReasoningError,
};

use super::modules::{dispatch_modules, ModuleContext, ModuleResult};
use super::normalize::{canonical_to_display, normalize_report_data};
use super::reference::{collect_abnormalities, Abnormality};
use super::sanity::validate_report_data;

/// Request mode selecting the any-report path.
pub const ANY_REPORT_MODE: &str = "any_report";

#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error(transparent)]
    Decision(#[from] DecisionError),

    #[error("Reasoning client error: {0}")]
    Reasoning(#[from] ReasoningError),
}

// ─── Requests ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisRequest {
    /// Generated when absent.
    #[serde(default, alias = "case_id")]
    pub case_id: Option<String>,
    #[serde(default, alias = "lab_values", alias = "reportData", alias = "report_data")]
    pub lab_values: Value,
    #[serde(default, alias = "ml_prediction")]
    pub ml_prediction: Option<MlPrediction>,
    #[serde(default)]
    pub refresh: bool,
}

/// General report interpretation. Explicit abnormalities win over lab values.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnyReportRequest {
    #[serde(default, alias = "lab_values", alias = "reportData", alias = "report_data")]
    pub lab_values: Value,
    #[serde(default)]
    pub abnormalities: Option<Vec<Abnormality>>,
}

#[derive(Debug, Clone)]
pub enum ServiceRequest {
    Analysis(AnalysisRequest),
    AnyReport(AnyReportRequest),
}

impl ServiceRequest {
    pub fn from_json(raw: Value) -> Result<Self, ServiceError> {
        if !raw.is_object() {
            return Err(ServiceError::InvalidRequest(
                "request must be a JSON object".into(),
            ));
        }
        let invalid = |e: serde_json::Error| ServiceError::InvalidRequest(e.to_string());

        if raw.get("mode").and_then(Value::as_str) == Some(ANY_REPORT_MODE) {
            serde_json::from_value(raw).map(Self::AnyReport).map_err(invalid)
        } else {
            serde_json::from_value(raw).map(Self::Analysis).map_err(invalid)
        }
    }
}

// ─── Responses ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisResponse {
    pub case_id: String,
    /// `None` when the kidney module did not apply.
    pub kidney: Option<ThirdOpResponse>,
    pub modules: Vec<ModuleResult>,
    pub warnings: Vec<ValidationWarning>,
    pub unmapped_keys: Vec<String>,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnyReportResponse {
    #[serde(flatten)]
    pub interpretation: AnyReportInterpretation,
    pub abnormalities: Vec<Abnormality>,
    pub warnings: Vec<ValidationWarning>,
}

// ─── Service ─────────────────────────────────────────────────────────────────

pub struct ThirdOpService {
    orchestrator: DifferentialOrchestrator,
    interpreter: Arc<dyn AnyReportInterpreter>,
}

impl ThirdOpService {
    pub fn new(
        orchestrator: DifferentialOrchestrator,
        interpreter: Arc<dyn AnyReportInterpreter>,
    ) -> Self {
        Self {
            orchestrator,
            interpreter,
        }
    }

    /// SQLite store at the configured path plus one Ollama client serving
    /// every reasoning seam.
    pub fn from_config(config: &ThirdOpConfig) -> Result<Self, ServiceError> {
        let store = open_store(&config.db_path);
        let client = Arc::new(OllamaReasoningClient::from_config(config)?);

        tracing::info!(
            db = %config.db_path.display(),
            model = %client.model(),
            timeout_secs = config.timeout_secs,
            "ThirdOp service configured"
        );

        let orchestrator = DifferentialOrchestrator::new(
            store,
            client.clone(),
            client.clone(),
            Duration::from_secs(config.timeout_secs),
        );
        Ok(Self::new(orchestrator, client))
    }

    pub async fn handle(&self, request: ServiceRequest) -> Result<Value, ServiceError> {
        let value = match request {
            ServiceRequest::Analysis(req) => serde_json::to_value(self.analyze(req).await?),
            ServiceRequest::AnyReport(req) => {
                serde_json::to_value(self.interpret_any_report(req).await)
            }
        };
        value.map_err(|e| ServiceError::InvalidRequest(e.to_string()))
    }

    pub async fn analyze(&self, request: AnalysisRequest) -> Result<AnalysisResponse, ServiceError> {
        let case_id = request
            .case_id
            .filter(|id| !id.trim().is_empty())
            .unwrap_or_else(|| Uuid::new_v4().to_string());

        let normalized = normalize_report_data(&request.lab_values);
        let validated = validate_report_data(&normalized.canonical);

        let mut warnings = normalized.warnings;
        warnings.extend(validated.warnings);

        let ctx = ModuleContext {
            values: &validated.validated,
            ml_prediction: request.ml_prediction.as_ref(),
        };
        let dispatch = dispatch_modules(&ctx);

        let mut modules = Vec::with_capacity(dispatch.others.len() + 1);
        let kidney = match dispatch.kidney {
            Some(outcome) => {
                modules.push(outcome.result);
                let response = self
                    .orchestrator
                    .orchestrate(DifferentialRequest {
                        case_id: case_id.clone(),
                        input: outcome.input,
                        lab_display: canonical_to_display(&validated.validated),
                        refresh: request.refresh,
                    })
                    .await?;
                Some(response)
            }
            None => None,
        };
        modules.extend(dispatch.others);

        tracing::info!(
            case_id = %case_id,
            kidney = kidney.is_some(),
            modules = modules.len(),
            warnings = warnings.len(),
            unmapped = normalized.unmapped.len(),
            "Analysis complete"
        );

        Ok(AnalysisResponse {
            case_id,
            kidney,
            modules,
            warnings,
            unmapped_keys: normalized.unmapped.into_keys().collect(),
            timestamp: Utc::now(),
        })
    }

    /// Never fails: interpreter errors come back as an error-shaped result.
    pub async fn interpret_any_report(&self, request: AnyReportRequest) -> AnyReportResponse {
        let (abnormalities, warnings) = match request.abnormalities {
            Some(list) => (list, Vec::new()),
            None => {
                let normalized = normalize_report_data(&request.lab_values);
                let validated = validate_report_data(&normalized.canonical);
                let mut warnings = normalized.warnings;
                warnings.extend(validated.warnings);
                (collect_abnormalities(&validated.validated), warnings)
            }
        };

        let interpretation = match self.interpreter.interpret_any_report(&abnormalities).await {
            Ok(interpretation) => interpretation,
            Err(e) => {
                tracing::warn!(error = %e, abnormal = abnormalities.len(), "Any-report interpretation failed");
                AnyReportInterpretation::failed(e.to_string())
            }
        };

        AnyReportResponse {
            interpretation,
            abnormalities,
            warnings,
        }
    }
}

/// SQLite store at `path`, or an in-memory store when it cannot be opened.
/// Differentials then last only for this process.
pub fn open_store(path: &Path) -> Arc<dyn DifferentialStore> {
    match SqliteDifferentialStore::open(path) {
        Ok(store) => Arc::new(store),
        Err(e) => {
            tracing::warn!(
                db = %path.display(),
                error = %e,
                "Differential store unavailable, falling back to in-memory store"
            );
            Arc::new(InMemoryDifferentialStore::new())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::store::InMemoryDifferentialStore;
    use crate::models::{DecisionAction, DifferentialSource, FindingStatus, RiskLevel};
    use crate::pipeline::modules::ClinicalModule;
    use crate::reasoning::mock::MockReasoningClient;
    use serde_json::json;

    fn service(mock: MockReasoningClient) -> (ThirdOpService, Arc<MockReasoningClient>) {
        let mock = Arc::new(mock);
        let orchestrator = DifferentialOrchestrator::new(
            Arc::new(InMemoryDifferentialStore::new()),
            mock.clone(),
            mock.clone(),
            Duration::from_secs(5),
        );
        (ThirdOpService::new(orchestrator, mock.clone()), mock)
    }

    fn analysis(raw: Value) -> AnalysisRequest {
        match ServiceRequest::from_json(raw).unwrap() {
            ServiceRequest::Analysis(req) => req,
            other => panic!("unexpected request: {other:?}"),
        }
    }

    #[test]
    fn request_mode_selects_path() {
        let req = ServiceRequest::from_json(json!({"mode": "any_report", "labValues": {"hb": 9}}))
            .unwrap();
        assert!(matches!(req, ServiceRequest::AnyReport(_)));

        let req = ServiceRequest::from_json(json!({"caseId": "c1", "labValues": {}})).unwrap();
        assert!(matches!(req, ServiceRequest::Analysis(_)));

        assert!(matches!(
            ServiceRequest::from_json(json!([1, 2])),
            Err(ServiceError::InvalidRequest(_))
        ));
    }

    #[tokio::test]
    async fn full_kidney_analysis() {
        let (service, _) = service(MockReasoningClient::failing());
        let req = analysis(json!({
            "caseId": "case-1",
            "labValues": {
                "Serum Creatinine": "1.1",
                "eGFR": 28,
                "ACR": 40,
                "Hemoglobin": 11.0,
                "Mystery Marker": 3
            },
            "mlPrediction": {"prediction": 1, "probabilities": [0.3, 0.7], "status": "success"}
        }));

        let response = service.analyze(req).await.unwrap();

        let kidney = response.kidney.expect("kidney applies");
        assert_eq!(kidney.case_id, "case-1");
        assert!(kidney.human_escalation);
        assert_eq!(kidney.differential_source, DifferentialSource::RulesFallback);
        assert_eq!(response.modules[0].module, ClinicalModule::Kidney.name());
        assert!(response
            .modules
            .iter()
            .any(|m| m.module == ClinicalModule::Hematology.name()));
        assert_eq!(response.unmapped_keys, vec!["mysterymarker".to_string()]);
    }

    #[tokio::test]
    async fn without_prediction_kidney_is_absent() {
        let (service, mock) = service(MockReasoningClient::succeeding());
        let req = analysis(json!({"labValues": {"creatinine": 1.0, "egfr": 90}}));

        let response = service.analyze(req).await.unwrap();

        assert!(response.kidney.is_none());
        assert!(!response.case_id.is_empty());
        assert_eq!(mock.narrative_calls(), 0);
    }

    #[tokio::test]
    async fn nephrotic_acr_escalates() {
        let (service, _) = service(MockReasoningClient::failing());
        let req = analysis(json!({
            "caseId": "nephrotic",
            "labValues": {"creatinine": 0.8, "urea": 25, "albumin": 4.5, "egfr": 95, "acr": 6000},
            "mlPrediction": {"prediction": 0, "probabilities": [0.92, 0.08], "status": "success"}
        }));

        let response = service.analyze(req).await.unwrap();

        assert!(response.warnings.iter().all(|w| w.parameter != "acr"));
        let kidney = response.kidney.unwrap();
        assert_eq!(kidney.risk_tier, RiskLevel::High);
        assert_eq!(kidney.decision, DecisionAction::Escalate);
        assert!(kidney.human_escalation);
    }

    #[test]
    fn unopenable_database_falls_back_to_memory() {
        let blocker = tempfile::NamedTempFile::new().unwrap();
        let path = blocker.path().join("thirdop.db");

        let store = open_store(&path);
        assert!(store.find("c1").unwrap().is_none());

        let config = ThirdOpConfig {
            ollama_url: "http://127.0.0.1:9".into(),
            ollama_model: "gemma:7b".into(),
            generic_model: "gemma:7b".into(),
            timeout_secs: 1,
            db_path: path,
        };
        assert!(ThirdOpService::from_config(&config).is_ok());
    }

    #[tokio::test]
    async fn any_report_works_without_database() {
        let blocker = tempfile::NamedTempFile::new().unwrap();
        let orchestrator = DifferentialOrchestrator::new(
            open_store(&blocker.path().join("thirdop.db")),
            Arc::new(MockReasoningClient::failing()),
            Arc::new(MockReasoningClient::failing()),
            Duration::from_secs(5),
        );
        let service = ThirdOpService::new(orchestrator, Arc::new(MockReasoningClient::succeeding()));

        let value = service
            .handle(ServiceRequest::from_json(json!({"mode": "any_report", "abnormalities": []})).unwrap())
            .await
            .unwrap();
        assert_eq!(value["recommendedDepartment"], "Internal Medicine");
    }

    #[tokio::test]
    async fn implausible_values_warn_and_drop() {
        let (service, _) = service(MockReasoningClient::failing());
        let req = analysis(json!({
            "caseId": "c2",
            "labValues": {"creatinine": 900, "egfr": 50},
            "mlPrediction": {"prediction": 0, "probabilities": [0.9, 0.1], "status": "success"}
        }));

        let response = service.analyze(req).await.unwrap();

        assert!(response.warnings.iter().any(|w| w.parameter == "creatinine"));
        let kidney = response.kidney.unwrap();
        assert!(!kidney
            .clinical_indicators
            .abnormal_values
            .iter()
            .any(|v| v.contains("Creatinine")));
    }

    #[tokio::test]
    async fn any_report_from_lab_values() {
        let (service, mock) = service(MockReasoningClient::succeeding());
        let response = service
            .interpret_any_report(AnyReportRequest {
                lab_values: json!({"Hemoglobin": 9.5, "Glucose": 90}),
                abnormalities: None,
            })
            .await;

        assert_eq!(response.abnormalities.len(), 1);
        assert_eq!(response.abnormalities[0].status, FindingStatus::Low);
        assert_eq!(response.interpretation.recommended_department, "Internal Medicine");
        assert_eq!(mock.any_report_calls(), 1);
    }

    #[tokio::test]
    async fn any_report_failure_is_error_shaped() {
        let (service, _) = service(MockReasoningClient::failing());
        let response = service
            .interpret_any_report(AnyReportRequest {
                lab_values: Value::Null,
                abnormalities: Some(vec![Abnormality {
                    parameter: "ALT".into(),
                    value: 120.0,
                    status: FindingStatus::High,
                }]),
            })
            .await;

        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["error"], true);
        assert_eq!(json["concerns"], json!([]));
        assert_eq!(json["recommendedDepartment"], "");
        assert_eq!(json["abnormalities"][0]["parameter"], "ALT");
    }
}
