use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Canonical lab parameter vocabulary. Every normalized report is keyed by
/// these and nothing else.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LabParameter {
    Creatinine,
    Urea,
    Albumin,
    UricAcid,
    Egfr,
    Acr,
    Glucose,
    Hba1c,
    Hemoglobin,
    Platelets,
    Wbc,
    Rbc,
    Hematocrit,
    Cholesterol,
    Ldl,
    Hdl,
    Triglyceride,
    VitaminD,
    VitaminB12,
    Homocysteine,
    Ige,
    Alt,
    Ast,
    Bilirubin,
}

impl LabParameter {
    pub const ALL: [LabParameter; 24] = [
        LabParameter::Creatinine,
        LabParameter::Urea,
        LabParameter::Albumin,
        LabParameter::UricAcid,
        LabParameter::Egfr,
        LabParameter::Acr,
        LabParameter::Glucose,
        LabParameter::Hba1c,
        LabParameter::Hemoglobin,
        LabParameter::Platelets,
        LabParameter::Wbc,
        LabParameter::Rbc,
        LabParameter::Hematocrit,
        LabParameter::Cholesterol,
        LabParameter::Ldl,
        LabParameter::Hdl,
        LabParameter::Triglyceride,
        LabParameter::VitaminD,
        LabParameter::VitaminB12,
        LabParameter::Homocysteine,
        LabParameter::Ige,
        LabParameter::Alt,
        LabParameter::Ast,
        LabParameter::Bilirubin,
    ];

    /// Canonical key, identical to the serde form.
    pub fn as_str(self) -> &'static str {
        match self {
            LabParameter::Creatinine => "creatinine",
            LabParameter::Urea => "urea",
            LabParameter::Albumin => "albumin",
            LabParameter::UricAcid => "uricacid",
            LabParameter::Egfr => "egfr",
            LabParameter::Acr => "acr",
            LabParameter::Glucose => "glucose",
            LabParameter::Hba1c => "hba1c",
            LabParameter::Hemoglobin => "hemoglobin",
            LabParameter::Platelets => "platelets",
            LabParameter::Wbc => "wbc",
            LabParameter::Rbc => "rbc",
            LabParameter::Hematocrit => "hematocrit",
            LabParameter::Cholesterol => "cholesterol",
            LabParameter::Ldl => "ldl",
            LabParameter::Hdl => "hdl",
            LabParameter::Triglyceride => "triglyceride",
            LabParameter::VitaminD => "vitamind",
            LabParameter::VitaminB12 => "vitaminb12",
            LabParameter::Homocysteine => "homocysteine",
            LabParameter::Ige => "ige",
            LabParameter::Alt => "alt",
            LabParameter::Ast => "ast",
            LabParameter::Bilirubin => "bilirubin",
        }
    }

    /// Exact canonical-key lookup (no alias handling; see `pipeline::normalize`).
    pub fn from_canonical(key: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|p| p.as_str() == key)
    }

    /// Human-readable label with unit, as shown on reports and sent to the
    /// reasoning model. Kidney labels match the classifier's feature names.
    pub fn display_label(self) -> &'static str {
        match self {
            LabParameter::Creatinine => "CREATININE (mg/dL)",
            LabParameter::Urea => "UREA (mg/dL)",
            LabParameter::Albumin => "ALBUMIN (g/dL)",
            LabParameter::UricAcid => "URIC ACID (mg/dL)",
            LabParameter::Egfr => "eGFR",
            LabParameter::Acr => "ACR",
            LabParameter::Glucose => "GLUCOSE (mg/dL)",
            LabParameter::Hba1c => "HbA1c (%)",
            LabParameter::Hemoglobin => "HEMOGLOBIN (g/dL)",
            LabParameter::Platelets => "PLATELETS (10^3/uL)",
            LabParameter::Wbc => "WBC (10^3/uL)",
            LabParameter::Rbc => "RBC (10^6/uL)",
            LabParameter::Hematocrit => "HEMATOCRIT (%)",
            LabParameter::Cholesterol => "TOTAL CHOLESTEROL (mg/dL)",
            LabParameter::Ldl => "LDL (mg/dL)",
            LabParameter::Hdl => "HDL (mg/dL)",
            LabParameter::Triglyceride => "TRIGLYCERIDES (mg/dL)",
            LabParameter::VitaminD => "VITAMIN D (ng/mL)",
            LabParameter::VitaminB12 => "VITAMIN B12 (pg/mL)",
            LabParameter::Homocysteine => "HOMOCYSTEINE (umol/L)",
            LabParameter::Ige => "IgE (IU/mL)",
            LabParameter::Alt => "ALT (U/L)",
            LabParameter::Ast => "AST (U/L)",
            LabParameter::Bilirubin => "BILIRUBIN (mg/dL)",
        }
    }

    pub fn unit(self) -> &'static str {
        match self {
            LabParameter::Creatinine
            | LabParameter::Urea
            | LabParameter::UricAcid
            | LabParameter::Glucose
            | LabParameter::Cholesterol
            | LabParameter::Ldl
            | LabParameter::Hdl
            | LabParameter::Triglyceride
            | LabParameter::Bilirubin => "mg/dL",
            LabParameter::Albumin | LabParameter::Hemoglobin => "g/dL",
            LabParameter::Egfr => "mL/min/1.73m2",
            LabParameter::Acr => "mg/g",
            LabParameter::Hba1c | LabParameter::Hematocrit => "%",
            LabParameter::Platelets | LabParameter::Wbc => "10^3/uL",
            LabParameter::Rbc => "10^6/uL",
            LabParameter::VitaminD => "ng/mL",
            LabParameter::VitaminB12 => "pg/mL",
            LabParameter::Homocysteine => "umol/L",
            LabParameter::Ige => "IU/mL",
            LabParameter::Alt | LabParameter::Ast => "U/L",
        }
    }
}

impl fmt::Display for LabParameter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Canonical lab values: each known parameter maps to a finite number or null.
///
/// A key present with `None` means "reported but unusable" (blank, or rejected
/// by sanity bounds); an absent key means "never reported". Both read as null.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LabValues {
    values: BTreeMap<LabParameter, Option<f64>>,
}

impl LabValues {
    pub fn new() -> Self {
        Self::default()
    }

    /// Numeric value if present and usable.
    pub fn get(&self, param: LabParameter) -> Option<f64> {
        self.values.get(&param).copied().flatten()
    }

    pub fn is_present(&self, param: LabParameter) -> bool {
        self.get(param).is_some()
    }

    pub fn contains_key(&self, param: LabParameter) -> bool {
        self.values.contains_key(&param)
    }

    /// Set a value. Later writes replace earlier ones; non-finite numbers are stored as null.
    pub fn set(&mut self, param: LabParameter, value: Option<f64>) {
        self.values.insert(param, value.filter(|v| v.is_finite()));
    }

    /// Builder-style `set`, handy for fixtures.
    pub fn with(mut self, param: LabParameter, value: f64) -> Self {
        self.set(param, Some(value));
        self
    }

    pub fn iter(&self) -> impl Iterator<Item = (LabParameter, Option<f64>)> + '_ {
        self.values.iter().map(|(k, v)| (*k, *v))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl FromIterator<(LabParameter, Option<f64>)> for LabValues {
    fn from_iter<I: IntoIterator<Item = (LabParameter, Option<f64>)>>(iter: I) -> Self {
        let mut values = LabValues::new();
        for (param, value) in iter {
            values.set(param, value);
        }
        values
    }
}

/// Correction record emitted by normalization or sanity checks. Accumulated, never thrown.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationWarning {
    pub parameter: String,
    pub message: String,
}

impl ValidationWarning {
    pub fn new(parameter: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            parameter: parameter.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.parameter, self.message)
    }
}
