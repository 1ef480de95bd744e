// Physiological plausibility checks on normalized lab values.
// Applied after key normalization, before module dispatch.
// Implausible values become null with a warning; nothing here ever fails.

use serde_json::Value;

use crate::models::{LabParameter, LabValues, ValidationWarning};

/// Plausible measurement bounds for one parameter (inclusive).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SanityBounds {
    pub min: f64,
    pub max: f64,
    pub unit: &'static str,
}

/// Static bounds per canonical key. Wide on purpose: these reject typos and
/// unit mix-ups, not abnormal results.
pub fn sanity_bounds(param: LabParameter) -> SanityBounds {
    let (min, max) = match param {
        LabParameter::Creatinine => (0.1, 20.0),
        LabParameter::Urea => (1.0, 300.0),
        LabParameter::Albumin => (0.5, 7.0),
        LabParameter::UricAcid => (0.5, 20.0),
        LabParameter::Egfr => (0.0, 200.0),
        LabParameter::Acr => (0.0, 30000.0),
        LabParameter::Glucose => (10.0, 1500.0),
        LabParameter::Hba1c => (3.0, 20.0),
        LabParameter::Hemoglobin => (2.0, 25.0),
        LabParameter::Platelets => (1.0, 2000.0),
        LabParameter::Wbc => (0.1, 200.0),
        LabParameter::Rbc => (0.5, 10.0),
        LabParameter::Hematocrit => (5.0, 75.0),
        LabParameter::Cholesterol => (30.0, 1000.0),
        LabParameter::Ldl => (5.0, 700.0),
        LabParameter::Hdl => (5.0, 200.0),
        LabParameter::Triglyceride => (10.0, 5000.0),
        LabParameter::VitaminD => (1.0, 200.0),
        LabParameter::VitaminB12 => (50.0, 5000.0),
        LabParameter::Homocysteine => (1.0, 200.0),
        LabParameter::Ige => (0.0, 20000.0),
        LabParameter::Alt => (1.0, 5000.0),
        LabParameter::Ast => (1.0, 5000.0),
        LabParameter::Bilirubin => (0.05, 50.0),
    };
    SanityBounds {
        min,
        max,
        unit: param.unit(),
    }
}

/// Outcome of checking one value.
#[derive(Debug, Clone, PartialEq)]
pub struct ValueCheck {
    pub value: Option<f64>,
    pub warning: Option<ValidationWarning>,
}

impl ValueCheck {
    fn accepted(value: Option<f64>) -> Self {
        Self {
            value,
            warning: None,
        }
    }

    fn rejected(key: &str, message: String) -> Self {
        Self {
            value: None,
            warning: Some(ValidationWarning::new(key, message)),
        }
    }
}

/// Validated report: same keys as the input, implausible values nulled.
#[derive(Debug, Clone, Default)]
pub struct ValidatedReport {
    pub validated: LabValues,
    pub warnings: Vec<ValidationWarning>,
}

/// Check a single raw value against the bounds of `key`.
///
/// Null stays null silently. Non-numeric values are rejected with a warning.
/// Keys without configured bounds pass numeric values through unchanged.
pub fn validate_value(key: &str, value: &Value) -> ValueCheck {
    let number = match value {
        Value::Null => return ValueCheck::accepted(None),
        Value::Number(n) => n.as_f64().filter(|f| f.is_finite()),
        _ => None,
    };

    let Some(number) = number else {
        return ValueCheck::rejected(key, format!("non-numeric value {value} discarded"));
    };

    match LabParameter::from_canonical(key) {
        Some(param) => check_bounds(param, number),
        None => ValueCheck::accepted(Some(number)),
    }
}

fn check_bounds(param: LabParameter, value: f64) -> ValueCheck {
    let bounds = sanity_bounds(param);
    if value < bounds.min {
        ValueCheck::rejected(
            param.as_str(),
            format!(
                "value {value} below plausible minimum {} {}; set to null",
                bounds.min, bounds.unit
            ),
        )
    } else if value > bounds.max {
        ValueCheck::rejected(
            param.as_str(),
            format!(
                "value {value} above plausible maximum {} {}; set to null",
                bounds.max, bounds.unit
            ),
        )
    } else {
        ValueCheck::accepted(Some(value))
    }
}

/// Validate every value in a canonical report. Total: every input key is
/// present in the output, and corrections only ever add warnings.
pub fn validate_report_data(values: &LabValues) -> ValidatedReport {
    let mut report = ValidatedReport::default();

    for (param, value) in values.iter() {
        let check = match value {
            Some(v) => check_bounds(param, v),
            None => ValueCheck::accepted(None),
        };
        report.validated.set(param, check.value);
        if let Some(warning) = check.warning {
            report.warnings.push(warning);
        }
    }

    if !report.warnings.is_empty() {
        tracing::warn!(
            warning_count = report.warnings.len(),
            "Implausible lab values set to null"
        );
    }

    report
}
