use crate::models::{FindingStatus, LabParameter};

use super::{ClinicalModule, Finding, ModuleContext, ModuleResult};

pub const MARKERS: &[LabParameter] = &[LabParameter::Ige];

/// Total IgE upper limit, IU/mL.
const IGE_UPPER: f64 = 100.0;

pub fn run(ctx: &ModuleContext<'_>) -> Option<ModuleResult> {
    let value = ctx.values.get(LabParameter::Ige)?;

    let (finding, summary) = if value > IGE_UPPER {
        (
            Finding::new(
                LabParameter::Ige,
                value,
                FindingStatus::High,
                "elevated total IgE, consistent with atopy or allergic sensitisation",
            ),
            "Total IgE elevated; allergy evaluation may help identify triggers.",
        )
    } else {
        (
            Finding::new(LabParameter::Ige, value, FindingStatus::Normal, "within reference range"),
            "Total IgE within reference range.",
        )
    };

    Some(ModuleResult::new(
        ClinicalModule::Allergy,
        vec![finding],
        summary.to_string(),
    ))
}
