use crate::models::{FindingStatus, LabParameter};
use crate::pipeline::reference::reference_range;

use super::{present_values, summarize, ClinicalModule, Finding, ModuleContext, ModuleResult};

pub const MARKERS: &[LabParameter] = &[
    LabParameter::Hemoglobin,
    LabParameter::Platelets,
    LabParameter::Wbc,
    LabParameter::Rbc,
    LabParameter::Hematocrit,
];

fn note_for(param: LabParameter, status: FindingStatus) -> &'static str {
    match (param, status) {
        (_, FindingStatus::Normal) => "within reference range",
        (LabParameter::Hemoglobin, FindingStatus::Low) => "low hemoglobin, possible anemia",
        (LabParameter::Hemoglobin, _) => "high hemoglobin",
        (LabParameter::Platelets, FindingStatus::Low) => "thrombocytopenia",
        (LabParameter::Platelets, _) => "thrombocytosis",
        (LabParameter::Wbc, FindingStatus::Low) => "leukopenia",
        (LabParameter::Wbc, _) => "leukocytosis, infection or inflammation possible",
        (LabParameter::Rbc, FindingStatus::Low) => "low red cell count",
        (LabParameter::Hematocrit, FindingStatus::Low) => "low hematocrit",
        (_, FindingStatus::Low) => "below reference range",
        _ => "above reference range",
    }
}

pub fn run(ctx: &ModuleContext<'_>) -> Option<ModuleResult> {
    let findings: Vec<Finding> = present_values(ctx.values, MARKERS)
        .into_iter()
        .map(|(param, value)| {
            let status = reference_range(param).classify(value);
            Finding::new(param, value, status, note_for(param, status))
        })
        .collect();

    if findings.is_empty() {
        return None;
    }

    let summary = summarize(
        ClinicalModule::Hematology,
        &findings,
        "Blood counts within reference ranges.",
    );
    Some(ModuleResult::new(ClinicalModule::Hematology, findings, summary))
}
