//! Clinical module dispatch.
//!
//! Each module covers one organ system and declares the markers it reads.
//! The dispatcher walks the fixed module list, runs every module with at least
//! one marker present, and keeps the kidney result apart: only kidney feeds
//! the decision path, the others are informational.

pub mod allergy;
pub mod diabetes;
pub mod hematology;
pub mod kidney;
pub mod lipid;
pub mod nutrition;

pub use kidney::KidneyOutcome;

use serde::{Deserialize, Serialize};

use crate::models::{FindingStatus, LabParameter, LabValues, MlPrediction};

// ─── Public types ────────────────────────────────────────────────────────────

/// One marker read by a module.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Finding {
    pub parameter: String,
    pub value: f64,
    pub status: FindingStatus,
    pub note: String,
}

impl Finding {
    pub fn new(param: LabParameter, value: f64, status: FindingStatus, note: impl Into<String>) -> Self {
        Self {
            parameter: param.display_label().to_string(),
            value,
            status,
            note: note.into(),
        }
    }

    pub fn is_abnormal(&self) -> bool {
        self.status != FindingStatus::Normal
    }
}

/// Per-request output of one applicable module.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModuleResult {
    pub applicable: bool,
    pub findings: Vec<Finding>,
    pub summary: String,
    pub module: String,
}

impl ModuleResult {
    pub fn new(module: ClinicalModule, findings: Vec<Finding>, summary: String) -> Self {
        Self {
            applicable: true,
            findings,
            summary,
            module: module.name().to_string(),
        }
    }
}

/// Inputs every module sees.
#[derive(Debug, Clone, Copy)]
pub struct ModuleContext<'a> {
    pub values: &'a LabValues,
    pub ml_prediction: Option<&'a MlPrediction>,
}

// ─── Modules ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClinicalModule {
    Kidney,
    Diabetes,
    Hematology,
    Lipid,
    Nutrition,
    Allergy,
}

impl ClinicalModule {
    /// Dispatch order.
    pub const ALL: [ClinicalModule; 6] = [
        ClinicalModule::Kidney,
        ClinicalModule::Diabetes,
        ClinicalModule::Hematology,
        ClinicalModule::Lipid,
        ClinicalModule::Nutrition,
        ClinicalModule::Allergy,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            ClinicalModule::Kidney => "kidney",
            ClinicalModule::Diabetes => "diabetes",
            ClinicalModule::Hematology => "hematology",
            ClinicalModule::Lipid => "lipid",
            ClinicalModule::Nutrition => "nutrition",
            ClinicalModule::Allergy => "allergy",
        }
    }

    pub fn required_markers(&self) -> &'static [LabParameter] {
        match self {
            ClinicalModule::Kidney => kidney::MARKERS,
            ClinicalModule::Diabetes => diabetes::MARKERS,
            ClinicalModule::Hematology => hematology::MARKERS,
            ClinicalModule::Lipid => lipid::MARKERS,
            ClinicalModule::Nutrition => nutrition::MARKERS,
            ClinicalModule::Allergy => allergy::MARKERS,
        }
    }

    /// True when at least one required marker has a value.
    pub fn has_required_markers(&self, values: &LabValues) -> bool {
        self.required_markers().iter().any(|p| values.is_present(*p))
    }

    /// Run the module. `None` means "no finding", never an error.
    pub fn run(&self, ctx: &ModuleContext<'_>) -> Option<ModuleResult> {
        match self {
            ClinicalModule::Kidney => kidney::run_kidney(ctx).map(|outcome| outcome.result),
            ClinicalModule::Diabetes => diabetes::run(ctx),
            ClinicalModule::Hematology => hematology::run(ctx),
            ClinicalModule::Lipid => lipid::run(ctx),
            ClinicalModule::Nutrition => nutrition::run(ctx),
            ClinicalModule::Allergy => allergy::run(ctx),
        }
    }
}

// ─── Dispatch ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default)]
pub struct DispatchOutcome {
    /// Drives the primary decision path.
    pub kidney: Option<KidneyOutcome>,
    /// Informational results, in dispatch order.
    pub others: Vec<ModuleResult>,
}

pub fn dispatch_modules(ctx: &ModuleContext<'_>) -> DispatchOutcome {
    let mut outcome = DispatchOutcome::default();

    for module in ClinicalModule::ALL {
        if !module.has_required_markers(ctx.values) {
            continue;
        }
        match module {
            ClinicalModule::Kidney => outcome.kidney = kidney::run_kidney(ctx),
            other => {
                if let Some(result) = other.run(ctx) {
                    outcome.others.push(result);
                }
            }
        }
    }

    tracing::debug!(
        kidney = outcome.kidney.is_some(),
        other_modules = outcome.others.len(),
        "Clinical modules dispatched"
    );

    outcome
}

// ─── Shared helpers ──────────────────────────────────────────────────────────

/// Present values for the given markers, in marker order.
pub(crate) fn present_values(
    values: &LabValues,
    markers: &[LabParameter],
) -> Vec<(LabParameter, f64)> {
    markers
        .iter()
        .filter_map(|p| values.get(*p).map(|v| (*p, v)))
        .collect()
}

/// "2 of 3 hematology markers outside reference range: Hemoglobin, WBC."
pub(crate) fn summarize(module: ClinicalModule, findings: &[Finding], normal_text: &str) -> String {
    let abnormal: Vec<&str> = findings
        .iter()
        .filter(|f| f.is_abnormal())
        .map(|f| f.parameter.as_str())
        .collect();

    if abnormal.is_empty() {
        normal_text.to_string()
    } else {
        format!(
            "{} of {} {} markers need attention: {}.",
            abnormal.len(),
            findings.len(),
            module.name(),
            abnormal.join(", ")
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx<'a>(values: &'a LabValues, ml: Option<&'a MlPrediction>) -> ModuleContext<'a> {
        ModuleContext {
            values,
            ml_prediction: ml,
        }
    }

    #[test]
    fn any_marker_is_enough() {
        let values = LabValues::new().with(LabParameter::Hdl, 55.0);
        assert!(ClinicalModule::Lipid.has_required_markers(&values));
        assert!(!ClinicalModule::Diabetes.has_required_markers(&values));
    }

    #[test]
    fn null_marker_does_not_count() {
        let mut values = LabValues::new();
        values.set(LabParameter::Glucose, None);
        assert!(!ClinicalModule::Diabetes.has_required_markers(&values));
    }

    #[test]
    fn dispatch_separates_kidney() {
        let values = LabValues::new()
            .with(LabParameter::Creatinine, 1.0)
            .with(LabParameter::Egfr, 90.0)
            .with(LabParameter::Glucose, 140.0)
            .with(LabParameter::Ige, 40.0);
        let ml = MlPrediction::success(0, 0.9, 0.1);
        let outcome = dispatch_modules(&ctx(&values, Some(&ml)));

        assert!(outcome.kidney.is_some());
        let names: Vec<&str> = outcome.others.iter().map(|m| m.module.as_str()).collect();
        assert_eq!(names, vec!["diabetes", "allergy"]);
        assert!(outcome.others.iter().all(|m| m.applicable));
    }

    #[test]
    fn kidney_needs_valid_prediction() {
        let values = LabValues::new().with(LabParameter::Egfr, 50.0);
        let outcome = dispatch_modules(&ctx(&values, None));
        assert!(outcome.kidney.is_none());

        let failed = MlPrediction::failed("missing features");
        let outcome = dispatch_modules(&ctx(&values, Some(&failed)));
        assert!(outcome.kidney.is_none());
        assert!(outcome.others.is_empty());
    }

    #[test]
    fn empty_report_runs_nothing() {
        let values = LabValues::new();
        let outcome = dispatch_modules(&ctx(&values, None));
        assert!(outcome.kidney.is_none());
        assert!(outcome.others.is_empty());
    }

    #[test]
    fn every_parameter_outside_liver_belongs_to_a_module() {
        let covered: Vec<LabParameter> = ClinicalModule::ALL
            .iter()
            .flat_map(|m| m.required_markers().iter().copied())
            .collect();
        for param in LabParameter::ALL {
            let liver = matches!(param, LabParameter::Alt | LabParameter::Ast | LabParameter::Bilirubin);
            assert_eq!(covered.contains(&param), !liver, "{param}");
        }
    }
}
