//! Adult reference (normal) ranges per canonical parameter.
//!
//! Used by the non-kidney modules and by the any-report interpreter to decide
//! which values are outside range. The kidney decision path has its own staged
//! thresholds in `decision::clinical`.

use serde::{Deserialize, Serialize};

use crate::models::{FindingStatus, LabParameter, LabValues};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReferenceRange {
    pub low: Option<f64>,
    pub high: Option<f64>,
}

impl ReferenceRange {
    const fn between(low: f64, high: f64) -> Self {
        Self {
            low: Some(low),
            high: Some(high),
        }
    }

    const fn at_least(low: f64) -> Self {
        Self {
            low: Some(low),
            high: None,
        }
    }

    const fn at_most(high: f64) -> Self {
        Self {
            low: None,
            high: Some(high),
        }
    }

    /// Low / Normal / High against this range. Edges are normal.
    pub fn classify(&self, value: f64) -> FindingStatus {
        if self.low.is_some_and(|low| value < low) {
            FindingStatus::Low
        } else if self.high.is_some_and(|high| value > high) {
            FindingStatus::High
        } else {
            FindingStatus::Normal
        }
    }

    pub fn describe(&self, unit: &str) -> String {
        match (self.low, self.high) {
            (Some(low), Some(high)) => format!("{low}-{high} {unit}"),
            (Some(low), None) => format!(">= {low} {unit}"),
            (None, Some(high)) => format!("<= {high} {unit}"),
            (None, None) => "no reference range".to_string(),
        }
    }
}

pub fn reference_range(param: LabParameter) -> ReferenceRange {
    match param {
        LabParameter::Creatinine => ReferenceRange::between(0.6, 1.3),
        LabParameter::Urea => ReferenceRange::between(15.0, 45.0),
        LabParameter::Albumin => ReferenceRange::between(3.5, 5.0),
        LabParameter::UricAcid => ReferenceRange::between(3.5, 7.2),
        LabParameter::Egfr => ReferenceRange::at_least(60.0),
        LabParameter::Acr => ReferenceRange::at_most(30.0),
        LabParameter::Glucose => ReferenceRange::between(70.0, 99.0),
        LabParameter::Hba1c => ReferenceRange::between(4.0, 5.6),
        LabParameter::Hemoglobin => ReferenceRange::between(12.0, 17.5),
        LabParameter::Platelets => ReferenceRange::between(150.0, 450.0),
        LabParameter::Wbc => ReferenceRange::between(4.0, 11.0),
        LabParameter::Rbc => ReferenceRange::between(4.2, 5.9),
        LabParameter::Hematocrit => ReferenceRange::between(36.0, 52.0),
        LabParameter::Cholesterol => ReferenceRange::at_most(200.0),
        LabParameter::Ldl => ReferenceRange::at_most(100.0),
        LabParameter::Hdl => ReferenceRange::at_least(40.0),
        LabParameter::Triglyceride => ReferenceRange::at_most(150.0),
        LabParameter::VitaminD => ReferenceRange::between(30.0, 100.0),
        LabParameter::VitaminB12 => ReferenceRange::between(200.0, 900.0),
        LabParameter::Homocysteine => ReferenceRange::between(5.0, 15.0),
        LabParameter::Ige => ReferenceRange::at_most(100.0),
        LabParameter::Alt => ReferenceRange::between(7.0, 56.0),
        LabParameter::Ast => ReferenceRange::between(10.0, 40.0),
        LabParameter::Bilirubin => ReferenceRange::between(0.1, 1.2),
    }
}

/// One out-of-range value, in the shape sent to the any-report interpreter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Abnormality {
    pub parameter: String,
    pub value: f64,
    pub status: FindingStatus,
}

/// Every present value outside its reference range, in canonical order.
pub fn collect_abnormalities(values: &LabValues) -> Vec<Abnormality> {
    values
        .iter()
        .filter_map(|(param, value)| {
            let value = value?;
            let status = reference_range(param).classify(value);
            (status != FindingStatus::Normal).then(|| Abnormality {
                parameter: param.display_label().to_string(),
                value,
                status,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn edges_are_normal() {
        let range = reference_range(LabParameter::Hemoglobin);
        assert_eq!(range.classify(12.0), FindingStatus::Normal);
        assert_eq!(range.classify(17.5), FindingStatus::Normal);
        assert_eq!(range.classify(11.9), FindingStatus::Low);
        assert_eq!(range.classify(17.6), FindingStatus::High);
    }

    #[test]
    fn one_sided_ranges() {
        assert_eq!(reference_range(LabParameter::Hdl).classify(90.0), FindingStatus::Normal);
        assert_eq!(reference_range(LabParameter::Hdl).classify(35.0), FindingStatus::Low);
        assert_eq!(reference_range(LabParameter::Ldl).classify(0.0), FindingStatus::Normal);
        assert_eq!(reference_range(LabParameter::Ldl).classify(160.0), FindingStatus::High);
    }

    #[test]
    fn describe_formats() {
        assert_eq!(
            reference_range(LabParameter::Creatinine).describe("mg/dL"),
            "0.6-1.3 mg/dL"
        );
        assert_eq!(reference_range(LabParameter::Egfr).describe("mL/min"), ">= 60 mL/min");
    }

    #[test]
    fn collects_only_out_of_range_present_values() {
        let mut values = LabValues::new()
            .with(LabParameter::Hemoglobin, 10.5)
            .with(LabParameter::Glucose, 90.0)
            .with(LabParameter::Ldl, 170.0);
        values.set(LabParameter::Alt, None);

        let abnormal = collect_abnormalities(&values);
        assert_eq!(abnormal.len(), 2);
        assert_eq!(abnormal[0].parameter, "HEMOGLOBIN (g/dL)");
        assert_eq!(abnormal[0].status, FindingStatus::Low);
        assert_eq!(abnormal[1].parameter, "LDL (mg/dL)");
        assert_eq!(abnormal[1].status, FindingStatus::High);
    }
}
