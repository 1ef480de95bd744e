use crate::models::{FindingStatus, LabParameter};

use super::{present_values, summarize, ClinicalModule, Finding, ModuleContext, ModuleResult};

pub const MARKERS: &[LabParameter] = &[
    LabParameter::VitaminD,
    LabParameter::VitaminB12,
    LabParameter::Homocysteine,
];

fn classify(param: LabParameter, value: f64) -> (FindingStatus, &'static str) {
    match param {
        LabParameter::VitaminD if value < 20.0 => (FindingStatus::Low, "vitamin D deficiency"),
        LabParameter::VitaminD if value < 30.0 => {
            (FindingStatus::Borderline, "vitamin D insufficiency")
        }
        LabParameter::VitaminB12 if value < 200.0 => (FindingStatus::Low, "vitamin B12 deficiency"),
        LabParameter::Homocysteine if value > 15.0 => (
            FindingStatus::High,
            "elevated homocysteine, check B12 and folate status",
        ),
        _ => (FindingStatus::Normal, "adequate"),
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

    let summary = summarize(
        ClinicalModule::Nutrition,
        &findings,
        "Micronutrient markers adequate.",
    );
    Some(ModuleResult::new(ClinicalModule::Nutrition, findings, summary))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::LabValues;

    #[test]
    fn vitamin_d_tiers() {
        assert_eq!(classify(LabParameter::VitaminD, 12.0).0, FindingStatus::Low);
        assert_eq!(classify(LabParameter::VitaminD, 25.0).0, FindingStatus::Borderline);
        assert_eq!(classify(LabParameter::VitaminD, 30.0).0, FindingStatus::Normal);
    }

    #[test]
    fn b12_and_homocysteine() {
        let values = LabValues::new()
            .with(LabParameter::VitaminB12, 150.0)
            .with(LabParameter::Homocysteine, 22.0);
        let result = run(&ModuleContext {
            values: &values,
            ml_prediction: None,
        })
        .unwrap();
        assert_eq!(result.findings[0].status, FindingStatus::Low);
        assert_eq!(result.findings[1].status, FindingStatus::High);
        assert!(result.summary.starts_with("2 of 2 nutrition markers"));
    }
}
