use crate::decision::{analyze_third_op_case, Decision, ThirdOpInput};
use crate::models::{LabParameter, MlPrediction};
use crate::pipeline::reference::reference_range;

use super::{present_values, ClinicalModule, Finding, ModuleContext, ModuleResult};

pub const MARKERS: &[LabParameter] = &[
    LabParameter::Creatinine,
    LabParameter::Urea,
    LabParameter::Albumin,
    LabParameter::UricAcid,
    LabParameter::Egfr,
    LabParameter::Acr,
];

/// Kidney module output: the informational result plus the engine decision.
#[derive(Debug, Clone, PartialEq)]
pub struct KidneyOutcome {
    pub result: ModuleResult,
    pub input: ThirdOpInput,
    pub decision: Decision,
}

fn usable_prediction<'a>(ctx: &ModuleContext<'a>) -> Option<&'a MlPrediction> {
    ctx.ml_prediction.filter(|p| p.is_well_formed())
}

/// Run the decision engine on the kidney markers.
///
/// Returns `None` without a well-formed successful prediction, even when kidney
/// markers are present.
pub fn run_kidney(ctx: &ModuleContext<'_>) -> Option<KidneyOutcome> {
    let Some(prediction) = usable_prediction(ctx) else {
        tracing::info!(
            has_prediction = ctx.ml_prediction.is_some(),
            "Kidney module skipped: no usable ML prediction"
        );
        return None;
    };

    let input = ThirdOpInput::from_lab_values(ctx.values, prediction);
    let decision = match analyze_third_op_case(&input) {
        Ok(decision) => decision,
        Err(e) => {
            tracing::warn!(error = %e, "Kidney decision engine rejected input");
            return None;
        }
    };

    let findings = present_values(ctx.values, MARKERS)
        .into_iter()
        .map(|(param, value)| {
            let range = reference_range(param);
            let status = range.classify(value);
            Finding::new(
                param,
                value,
                status,
                format!("reference {}", range.describe(param.unit())),
            )
        })
        .collect();

    let summary = format!(
        "Kidney risk tier {} ({}); confidence {:.2}{}.",
        decision.risk_tier.as_str(),
        decision.decision.as_str().replace('_', " "),
        decision.confidence,
        if decision.human_escalation {
            "; clinician review advised"
        } else {
            ""
        }
    );

    Some(KidneyOutcome {
        result: ModuleResult::new(ClinicalModule::Kidney, findings, summary),
        input,
        decision,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{FindingStatus, LabValues, RiskLevel};

    #[test]
    fn runs_engine_on_kidney_values() {
        let values = LabValues::new()
            .with(LabParameter::Creatinine, 0.8)
            .with(LabParameter::Egfr, 25.0)
            .with(LabParameter::UricAcid, 8.0);
        let ml = MlPrediction::success(0, 0.92, 0.08);
        let outcome = run_kidney(&ModuleContext {
            values: &values,
            ml_prediction: Some(&ml),
        })
        .unwrap();

        assert_eq!(outcome.decision.risk_tier, RiskLevel::High);
        assert_eq!(outcome.result.module, "kidney");
        assert_eq!(outcome.result.findings.len(), 3);
        let uric = outcome
            .result
            .findings
            .iter()
            .find(|f| f.parameter == "URIC ACID (mg/dL)")
            .unwrap();
        assert_eq!(uric.status, FindingStatus::High);
        assert!(outcome.result.summary.contains("clinician review"));
    }

    #[test]
    fn malformed_probabilities_skip_module() {
        let values = LabValues::new().with(LabParameter::Egfr, 80.0);
        let ml = MlPrediction {
            prediction: Some(1),
            probabilities: Some(vec![0.1, 0.2, 0.7]),
            status: "success".into(),
            error: None,
        };
        assert!(run_kidney(&ModuleContext {
            values: &values,
            ml_prediction: Some(&ml),
        })
        .is_none());
    }

    #[test]
    fn missing_prediction_class_skips_module() {
        let values = LabValues::new().with(LabParameter::Egfr, 80.0);
        let ml = MlPrediction {
            prediction: None,
            probabilities: Some(vec![0.6, 0.4]),
            status: "success".into(),
            error: None,
        };
        assert!(run_kidney(&ModuleContext {
            values: &values,
            ml_prediction: Some(&ml),
        })
        .is_none());
    }
}
