use crate::models::{FindingStatus, LabParameter};

use super::{present_values, summarize, ClinicalModule, Finding, ModuleContext, ModuleResult};

pub const MARKERS: &[LabParameter] = &[
    LabParameter::Cholesterol,
    LabParameter::Ldl,
    LabParameter::Hdl,
    LabParameter::Triglyceride,
];

/// (borderline-from, high-from) cut points, mg/dL.
fn upper_tiers(param: LabParameter) -> Option<(f64, f64)> {
    match param {
        LabParameter::Cholesterol => Some((200.0, 240.0)),
        LabParameter::Ldl => Some((100.0, 160.0)),
        LabParameter::Triglyceride => Some((150.0, 200.0)),
        _ => None,
    }
}

fn classify(param: LabParameter, value: f64) -> (FindingStatus, &'static str) {
    if param == LabParameter::Hdl {
        return if value < 40.0 {
            (FindingStatus::Low, "low HDL, reduced cardiovascular protection")
        } else {
            (FindingStatus::Normal, "desirable HDL")
        };
    }

    match upper_tiers(param) {
        Some((_, high)) if value >= high => (FindingStatus::High, "high"),
        Some((borderline, _)) if value >= borderline => (FindingStatus::Borderline, "borderline high"),
        _ => (FindingStatus::Normal, "desirable"),
    }
}

pub fn run(ctx: &ModuleContext<'_>) -> Option<ModuleResult> {
    let findings: Vec<Finding> = present_values(ctx.values, MARKERS)
        .into_iter()
        .map(|(param, value)| {
            let (status, note) = classify(param, value);
            Finding::new(param, value, status, note)
        })
        .collect();

    if findings.is_empty() {
        return None;
    }

    let summary = summarize(ClinicalModule::Lipid, &findings, "Lipid profile in desirable range.");
    Some(ModuleResult::new(ClinicalModule::Lipid, findings, summary))
}
