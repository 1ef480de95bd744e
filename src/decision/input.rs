use serde::{Deserialize, Deserializer, Serialize};

use crate::models::{LabParameter, LabValues, MlPrediction};

/// Probabilities assumed when the classifier output carries none.
pub const DEFAULT_PROBABILITIES: [f64; 2] = [0.5, 0.5];

/// Kidney values the engine reads. Accepts the field spellings older callers
/// used; any missing or non-numeric field is null.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ClinicalValues {
    #[serde(
        default,
        deserialize_with = "lenient_number",
        alias = "Creatinine",
        alias = "serum_creatinine",
        alias = "serumCreatinine",
        alias = "CREATININE (mg/dL)"
    )]
    pub creatinine: Option<f64>,
    #[serde(
        default,
        deserialize_with = "lenient_number",
        alias = "Urea",
        alias = "blood_urea",
        alias = "bloodUrea",
        alias = "bun",
        alias = "UREA (mg/dL)"
    )]
    pub urea: Option<f64>,
    #[serde(
        default,
        deserialize_with = "lenient_number",
        alias = "Albumin",
        alias = "serum_albumin",
        alias = "serumAlbumin",
        alias = "ALBUMIN (g/dL)"
    )]
    pub albumin: Option<f64>,
    #[serde(
        default,
        deserialize_with = "lenient_number",
        alias = "eGFR",
        alias = "EGFR",
        alias = "e_gfr",
        alias = "gfr"
    )]
    pub egfr: Option<f64>,
    #[serde(
        default,
        deserialize_with = "lenient_number",
        alias = "ACR",
        alias = "uacr",
        alias = "albumin_creatinine_ratio",
        alias = "albuminCreatinineRatio"
    )]
    pub acr: Option<f64>,
}

impl ClinicalValues {
    /// Pick the kidney values out of a validated canonical report.
    pub fn from_lab_values(values: &LabValues) -> Self {
        Self {
            creatinine: values.get(LabParameter::Creatinine),
            urea: values.get(LabParameter::Urea),
            albumin: values.get(LabParameter::Albumin),
            egfr: values.get(LabParameter::Egfr),
            acr: values.get(LabParameter::Acr),
        }
    }
}

/// Full engine input.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ThirdOpInput {
    #[serde(
        default,
        alias = "labValues",
        alias = "clinicalValues",
        alias = "clinical_values",
        alias = "clinicalData"
    )]
    pub clinical: ClinicalValues,
    #[serde(default, alias = "ml_prediction", alias = "mlResult", alias = "ml")]
    pub ml_prediction: MlPrediction,
}

impl ThirdOpInput {
    pub fn new(clinical: ClinicalValues, ml_prediction: MlPrediction) -> Self {
        Self {
            clinical,
            ml_prediction,
        }
    }

    pub fn from_lab_values(values: &LabValues, ml_prediction: &MlPrediction) -> Self {
        Self::new(ClinicalValues::from_lab_values(values), ml_prediction.clone())
    }

    /// Predicted class; absent reads as negative.
    pub fn prediction(&self) -> u8 {
        self.ml_prediction.prediction.unwrap_or(0)
    }

    /// `(p_negative, p_positive)`, falling back to an even split when the
    /// classifier did not return exactly two probabilities.
    pub fn probabilities(&self) -> (f64, f64) {
        match self.ml_prediction.probabilities.as_deref() {
            Some([p_neg, p_pos]) => (*p_neg, *p_pos),
            _ => (DEFAULT_PROBABILITIES[0], DEFAULT_PROBABILITIES[1]),
        }
    }
}

fn lenient_number<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match raw {
        Some(serde_json::Value::Number(n)) => n.as_f64(),
        Some(serde_json::Value::String(s)) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
    .filter(|f| f.is_finite()))
}
