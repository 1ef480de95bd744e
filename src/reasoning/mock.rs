use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;

use crate::decision::Decision;
use crate::models::{Concern, DifferentialConsideration, Likelihood};
use crate::pipeline::reference::Abnormality;

use super::types::{
    AnyReportInterpretation, AnyReportInterpreter, ClinicalContext, ClinicalReasoner,
    ClinicalReasoning, NarrativeGenerator, NarrativeResult, ReasoningInput,
};
use super::ReasoningError;

/// Scripted reasoning client. A seam left unset fails with a connection
/// error; an optional delay simulates a slow model. Counts every call.
#[derive(Default)]
pub struct MockReasoningClient {
    narrative: Option<NarrativeResult>,
    reasoning: Option<ClinicalReasoning>,
    any_report: Option<AnyReportInterpretation>,
    delay: Option<Duration>,
    narrative_calls: AtomicUsize,
    reasoning_calls: AtomicUsize,
    any_report_calls: AtomicUsize,
}

impl MockReasoningClient {
    /// Every call fails.
    pub fn failing() -> Self {
        Self::default()
    }

    /// Every call succeeds with a small canned answer.
    pub fn succeeding() -> Self {
        Self::default()
            .with_narrative(NarrativeResult {
                status: "success".into(),
                message: "Pattern reviewed by the reasoning model.".into(),
                ranked_differentials: vec![
                    DifferentialConsideration {
                        condition: "IgA nephropathy".into(),
                        likelihood: Likelihood::High,
                        reasoning: "Positive classifier output with proteinuria.".into(),
                        confidence: None,
                    },
                    DifferentialConsideration {
                        condition: "Hypertensive nephrosclerosis".into(),
                        likelihood: Likelihood::Low,
                        reasoning: "No reduction in eGFR.".into(),
                        confidence: None,
                    },
                ],
            })
            .with_reasoning(ClinicalReasoning {
                concerns: vec![Concern {
                    title: "Elevated ACR".into(),
                    reason: "More protein than expected is passing into the urine.".into(),
                    doctor_questions: vec![
                        "What could be causing this?".into(),
                        "Is this temporary?".into(),
                        "Do I need additional tests?".into(),
                    ],
                }],
            })
            .with_any_report(AnyReportInterpretation {
                recommended_department: "Internal Medicine".into(),
                precautions: vec!["Stay hydrated".into()],
                ..Default::default()
            })
    }

    pub fn with_narrative(mut self, narrative: NarrativeResult) -> Self {
        self.narrative = Some(narrative);
        self
    }

    pub fn with_reasoning(mut self, reasoning: ClinicalReasoning) -> Self {
        self.reasoning = Some(reasoning);
        self
    }

    pub fn with_any_report(mut self, interpretation: AnyReportInterpretation) -> Self {
        self.any_report = Some(interpretation);
        self
    }

    pub fn without_narrative(mut self) -> Self {
        self.narrative = None;
        self
    }

    pub fn without_reasoning(mut self) -> Self {
        self.reasoning = None;
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn narrative_calls(&self) -> usize {
        self.narrative_calls.load(Ordering::SeqCst)
    }

    pub fn reasoning_calls(&self) -> usize {
        self.reasoning_calls.load(Ordering::SeqCst)
    }

    pub fn any_report_calls(&self) -> usize {
        self.any_report_calls.load(Ordering::SeqCst)
    }

    async fn respond<T: Clone>(&self, scripted: &Option<T>) -> Result<T, ReasoningError> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        scripted
            .clone()
            .ok_or_else(|| ReasoningError::Connection("mock://unavailable".into()))
    }
}

#[async_trait]
impl NarrativeGenerator for MockReasoningClient {
    async fn generate_narrative(
        &self,
        _decision: &Decision,
        _context: &ClinicalContext,
    ) -> Result<NarrativeResult, ReasoningError> {
        self.narrative_calls.fetch_add(1, Ordering::SeqCst);
        self.respond(&self.narrative).await
    }
}

#[async_trait]
impl ClinicalReasoner for MockReasoningClient {
    async fn generate_reasoning(
        &self,
        _input: &ReasoningInput,
    ) -> Result<ClinicalReasoning, ReasoningError> {
        self.reasoning_calls.fetch_add(1, Ordering::SeqCst);
        self.respond(&self.reasoning).await
    }
}

#[async_trait]
impl AnyReportInterpreter for MockReasoningClient {
    async fn interpret_any_report(
        &self,
        _abnormalities: &[Abnormality],
    ) -> Result<AnyReportInterpretation, ReasoningError> {
        self.any_report_calls.fetch_add(1, Ordering::SeqCst);
        self.respond(&self.any_report).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::RiskLevel;
    use serde_json::Map;

    fn input() -> ReasoningInput {
        ReasoningInput {
            risk_level: RiskLevel::Low,
            lab_values: Map::new(),
        }
    }

    #[tokio::test]
    async fn failing_mock_counts_calls() {
        let mock = MockReasoningClient::failing();
        assert!(mock.generate_reasoning(&input()).await.is_err());
        assert!(mock.generate_reasoning(&input()).await.is_err());
        assert_eq!(mock.reasoning_calls(), 2);
        assert_eq!(mock.narrative_calls(), 0);
    }

    #[tokio::test]
    async fn succeeding_mock_returns_script() {
        let mock = MockReasoningClient::succeeding();
        let reasoning = mock.generate_reasoning(&input()).await.unwrap();
        assert_eq!(reasoning.concerns[0].title, "Elevated ACR");
        let report = mock.interpret_any_report(&[]).await.unwrap();
        assert_eq!(report.recommended_department, "Internal Medicine");
    }
}
