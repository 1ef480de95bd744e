//! Differential orchestration for one kidney case.
//!
//! Flow:
//! 1. Run the decision engine (pure, always).
//! 2. Unless a refresh is requested, reuse a stored record for the case.
//! 3. Otherwise run the narrative generator and the clinical reasoner
//!    concurrently, each bounded by the configured timeout.
//! 4. Narrative failure falls back to rule-based differentials; reasoning
//!    failure falls back to placeholder insights.
//! 5. Upsert the record and assemble the response.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use serde_json::{Map, Value};
use tokio::task::JoinHandle;

use crate::db::store::DifferentialStore;
use crate::decision::{analyze_third_op_case, Decision, DecisionError, ThirdOpInput};
use crate::models::{DifferentialRecord, DifferentialSource};
use crate::reasoning::{
    ClinicalContext, ClinicalReasoner, NarrativeGenerator, NarrativeResult, ReasoningError,
};

use super::fallback::{fallback_message, rule_based_differentials, FALLBACK_STATUS};
use super::insights::{insights_from_reasoning, reasoning_input};
use super::response::{DifferentialOutcome, ThirdOpResponse};

/// One kidney case to orchestrate.
#[derive(Debug, Clone)]
pub struct DifferentialRequest {
    pub case_id: String,
    pub input: ThirdOpInput,
    /// Lab values under display labels, as shown to the reasoning model.
    pub lab_display: Map<String, Value>,
    /// Recompute even when a stored record exists.
    pub refresh: bool,
}

pub struct DifferentialOrchestrator {
    store: Arc<dyn DifferentialStore>,
    narrative: Arc<dyn NarrativeGenerator>,
    reasoner: Arc<dyn ClinicalReasoner>,
    timeout: Duration,
}

impl DifferentialOrchestrator {
    pub fn new(
        store: Arc<dyn DifferentialStore>,
        narrative: Arc<dyn NarrativeGenerator>,
        reasoner: Arc<dyn ClinicalReasoner>,
        timeout: Duration,
    ) -> Self {
        Self {
            store,
            narrative,
            reasoner,
            timeout,
        }
    }

    /// Only an engine contract violation is an error; every external
    /// failure degrades to a fallback.
    pub async fn orchestrate(
        &self,
        request: DifferentialRequest,
    ) -> Result<ThirdOpResponse, DecisionError> {
        // The response carries the current tier, so the engine runs even on a
        // cache hit. Only the differential and insights are reused.
        let decision = analyze_third_op_case(&request.input)?;

        if !request.refresh {
            if let Some(record) = self.cached(&request.case_id) {
                tracing::info!(case_id = %request.case_id, "Reusing stored differential");
                return Ok(ThirdOpResponse::assemble(
                    &decision,
                    &record,
                    DifferentialOutcome::Cached,
                ));
            }
        }

        let (record, outcome) = self.generate(&request, &decision).await;

        if let Err(e) = self.store.upsert(&record) {
            tracing::warn!(case_id = %request.case_id, error = %e, "Failed to persist differential");
        }

        Ok(ThirdOpResponse::assemble(&decision, &record, outcome))
    }

    /// Store read errors count as a miss.
    fn cached(&self, case_id: &str) -> Option<DifferentialRecord> {
        match self.store.find(case_id) {
            Ok(found) => found,
            Err(e) => {
                tracing::warn!(case_id = %case_id, error = %e, "Differential store read failed, recomputing");
                None
            }
        }
    }

    async fn generate(
        &self,
        request: &DifferentialRequest,
        decision: &Decision,
    ) -> (DifferentialRecord, DifferentialOutcome) {
        let context = ClinicalContext {
            case_id: request.case_id.clone(),
            lab_values: request.lab_display.clone(),
            ml_prediction: request.input.ml_prediction.clone(),
        };
        let input = reasoning_input(decision, &request.lab_display);

        let narrative_task = {
            let generator = Arc::clone(&self.narrative);
            let decision = decision.clone();
            spawn_bounded(self.timeout, async move {
                generator.generate_narrative(&decision, &context).await
            })
        };
        let reasoning_task = {
            let reasoner = Arc::clone(&self.reasoner);
            spawn_bounded(self.timeout, async move {
                reasoner.generate_reasoning(&input).await
            })
        };

        let (narrative, reasoning) = tokio::join!(settle(narrative_task), settle(reasoning_task));

        let llm_insights = insights_from_reasoning(&request.case_id, decision, reasoning);

        let (status, message, ranked_differentials, source, outcome) = match narrative {
            Ok(NarrativeResult {
                status,
                message,
                ranked_differentials,
            }) => (
                status,
                message,
                ranked_differentials,
                DifferentialSource::Llm,
                DifferentialOutcome::Fresh,
            ),
            Err(e) => {
                tracing::warn!(case_id = %request.case_id, error = %e, "Narrative generation failed, using rule-based differentials");
                (
                    FALLBACK_STATUS.to_string(),
                    fallback_message(decision),
                    rule_based_differentials(decision),
                    DifferentialSource::RulesFallback,
                    DifferentialOutcome::Fallback,
                )
            }
        };

        let now = chrono::Local::now().naive_local();
        let record = DifferentialRecord {
            case_id: request.case_id.clone(),
            status,
            message,
            ranked_differentials,
            source,
            llm_insights,
            created_at: now,
            updated_at: now,
        };
        (record, outcome)
    }
}

/// Run an external call on its own task under a deadline. The task keeps
/// running to completion or timeout even if the caller goes away.
fn spawn_bounded<T, F>(timeout: Duration, call: F) -> JoinHandle<Result<T, ReasoningError>>
where
    T: Send + 'static,
    F: Future<Output = Result<T, ReasoningError>> + Send + 'static,
{
    tokio::spawn(async move {
        match tokio::time::timeout(timeout, call).await {
            Ok(result) => result,
            Err(_) => Err(ReasoningError::Timeout(timeout.as_secs())),
        }
    })
}

async fn settle<T>(handle: JoinHandle<Result<T, ReasoningError>>) -> Result<T, ReasoningError> {
    handle
        .await
        .map_err(|e| ReasoningError::TaskFailed(e.to_string()))?
}
