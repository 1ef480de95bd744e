use crate::models::{FindingStatus, LabParameter};

use super::{present_values, summarize, ClinicalModule, Finding, ModuleContext, ModuleResult};

pub const MARKERS: &[LabParameter] = &[LabParameter::Glucose, LabParameter::Hba1c];

/// Fasting glucose, mg/dL.
fn classify_glucose(value: f64) -> (FindingStatus, &'static str) {
    if value < 70.0 {
        (FindingStatus::Low, "below fasting range, hypoglycemia possible")
    } else if value < 100.0 {
        (FindingStatus::Normal, "normal fasting glucose")
    } else if value < 126.0 {
        (FindingStatus::Borderline, "impaired fasting glucose (prediabetes range)")
    } else {
        (FindingStatus::High, "fasting glucose in diabetes range")
    }
}

/// HbA1c, %.
fn classify_hba1c(value: f64) -> (FindingStatus, &'static str) {
    if value < 5.7 {
        (FindingStatus::Normal, "normal HbA1c")
    } else if value < 6.5 {
        (FindingStatus::Borderline, "HbA1c in prediabetes range")
    } else {
        (FindingStatus::High, "HbA1c in diabetes range")
    }
}

pub fn run(ctx: &ModuleContext<'_>) -> Option<ModuleResult> {
    let findings: Vec<Finding> = present_values(ctx.values, MARKERS)
        .into_iter()
        .map(|(param, value)| {
            let (status, note) = match param {
                LabParameter::Hba1c => classify_hba1c(value),
                _ => classify_glucose(value),
            };
            Finding::new(param, value, status, note)
        })
        .collect();

    if findings.is_empty() {
        return None;
    }

    let summary = if findings.iter().any(|f| f.status == FindingStatus::High) {
        "Glycemic markers in the diabetes range; repeat testing and clinical correlation advised."
            .to_string()
    } else {
        summarize(
            ClinicalModule::Diabetes,
            &findings,
            "Glycemic markers within normal limits.",
        )
    };

    Some(ModuleResult::new(ClinicalModule::Diabetes, findings, summary))
}
