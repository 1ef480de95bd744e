//! Key normalization: maps heterogeneous lab field spellings onto the
//! canonical `LabParameter` vocabulary.
//!
//! Matching is case-insensitive and ignores whitespace and punctuation, so
//! "Serum Creatinine", "S.Creatinine" and "CREATININE (mg/dL)" all land on
//! `creatinine`. A trailing parenthetical (usually a unit) is tried stripped
//! if the full spelling is unknown.

use std::collections::{BTreeMap, HashMap};
use std::sync::LazyLock;

use serde_json::{Map, Value};

use crate::models::{LabParameter, LabValues, ValidationWarning};

/// Accepted spellings per canonical key. Normalized at table build time.
const ALIASES: &[(LabParameter, &[&str])] = &[
    (
        LabParameter::Creatinine,
        &["creatinine", "serum creatinine", "s. creatinine", "creat", "scr", "cr"],
    ),
    (
        LabParameter::Urea,
        &[
            "urea",
            "blood urea",
            "serum urea",
            "bun",
            "blood urea nitrogen",
            "urea nitrogen",
        ],
    ),
    (LabParameter::Albumin, &["albumin", "serum albumin", "alb"]),
    (
        LabParameter::UricAcid,
        &["uric acid", "serum uric acid", "urate", "ua"],
    ),
    (
        LabParameter::Egfr,
        &[
            "egfr",
            "gfr",
            "estimated gfr",
            "estimated glomerular filtration rate",
            "ckd-epi egfr",
        ],
    ),
    (
        LabParameter::Acr,
        &[
            "acr",
            "uacr",
            "urine acr",
            "albumin creatinine ratio",
            "albumin/creatinine ratio",
            "urine albumin creatinine ratio",
            "microalbumin creatinine ratio",
        ],
    ),
    (
        LabParameter::Glucose,
        &[
            "glucose",
            "blood glucose",
            "fasting glucose",
            "fasting blood glucose",
            "fbs",
            "fbg",
            "fasting blood sugar",
            "blood sugar",
            "random blood sugar",
            "rbs",
        ],
    ),
    (
        LabParameter::Hba1c,
        &[
            "hba1c",
            "a1c",
            "hemoglobin a1c",
            "glycated hemoglobin",
            "glycosylated hemoglobin",
        ],
    ),
    (
        LabParameter::Hemoglobin,
        &["hemoglobin", "haemoglobin", "hb", "hgb"],
    ),
    (
        LabParameter::Platelets,
        &["platelets", "platelet", "platelet count", "plt"],
    ),
    (
        LabParameter::Wbc,
        &[
            "wbc",
            "wbc count",
            "white blood cells",
            "white blood cell count",
            "total leukocyte count",
            "tlc",
            "leukocytes",
        ],
    ),
    (
        LabParameter::Rbc,
        &[
            "rbc",
            "rbc count",
            "red blood cells",
            "red blood cell count",
            "erythrocytes",
        ],
    ),
    (
        LabParameter::Hematocrit,
        &["hematocrit", "haematocrit", "hct", "pcv", "packed cell volume"],
    ),
    (
        LabParameter::Cholesterol,
        &["cholesterol", "total cholesterol", "serum cholesterol", "tc"],
    ),
    (LabParameter::Ldl, &["ldl", "ldl cholesterol", "ldl-c"]),
    (LabParameter::Hdl, &["hdl", "hdl cholesterol", "hdl-c"]),
    (
        LabParameter::Triglyceride,
        &["triglyceride", "triglycerides", "tg", "trigs"],
    ),
    (
        LabParameter::VitaminD,
        &[
            "vitamin d",
            "vit d",
            "vitamin d3",
            "vitamin d total",
            "25-oh vitamin d",
            "25 hydroxy vitamin d",
        ],
    ),
    (
        LabParameter::VitaminB12,
        &["vitamin b12", "vit b12", "b12", "cobalamin", "cyanocobalamin"],
    ),
    (LabParameter::Homocysteine, &["homocysteine", "hcy"]),
    (
        LabParameter::Ige,
        &["ige", "total ige", "serum ige", "immunoglobulin e"],
    ),
    (
        LabParameter::Alt,
        &["alt", "sgpt", "alanine aminotransferase", "alanine transaminase"],
    ),
    (
        LabParameter::Ast,
        &["ast", "sgot", "aspartate aminotransferase", "aspartate transaminase"],
    ),
    (
        LabParameter::Bilirubin,
        &["bilirubin", "total bilirubin", "serum bilirubin", "tbil"],
    ),
];

static ALIAS_TABLE: LazyLock<HashMap<String, LabParameter>> = LazyLock::new(|| {
    let mut table = HashMap::new();
    for (param, spellings) in ALIASES {
        table.insert(param.as_str().to_string(), *param);
        for spelling in *spellings {
            table.insert(normalize_token(spelling), *param);
        }
    }
    table
});

/// Result of normalizing one raw report.
#[derive(Debug, Clone, Default)]
pub struct NormalizedReport {
    pub canonical: LabValues,
    /// Unrecognized keys (normalized spelling → original value), kept best-effort.
    pub unmapped: BTreeMap<String, Value>,
    pub warnings: Vec<ValidationWarning>,
}

/// Lowercase and drop everything that is not an ASCII letter or digit.
fn normalize_token(raw: &str) -> String {
    raw.chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .map(|c| c.to_ascii_lowercase())
        .collect()
}

/// Canonical parameter for a raw key, if it is a known spelling.
pub fn lookup_parameter(raw_key: &str) -> Option<LabParameter> {
    if let Some(param) = ALIAS_TABLE.get(&normalize_token(raw_key)) {
        return Some(*param);
    }
    // "UREA (mg/dL)" → "UREA"
    raw_key
        .find('(')
        .map(|idx| normalize_token(&raw_key[..idx]))
        .filter(|base| !base.is_empty())
        .and_then(|base| ALIAS_TABLE.get(&base).copied())
}

/// Normalize a raw key: the canonical key when recognized, otherwise the
/// normalized spelling (best effort, never dropped).
pub fn normalize_key(raw_key: &str) -> String {
    match lookup_parameter(raw_key) {
        Some(param) => param.as_str().to_string(),
        None => normalize_token(raw_key),
    }
}

/// Parse-or-discard coercion of a raw JSON value to a finite number.
/// Blank, "nil" and "na" read as absent; anything unparsable is discarded.
pub fn coerce_value(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64().filter(|f| f.is_finite()),
        Value::String(s) => {
            let trimmed = s.trim();
            if trimmed.is_empty()
                || trimmed.eq_ignore_ascii_case("nil")
                || trimmed.eq_ignore_ascii_case("na")
            {
                return None;
            }
            trimmed.parse::<f64>().ok().filter(|f| f.is_finite())
        }
        _ => None,
    }
}

/// Normalize a raw lab-values object. Keys are visited in input order and the
/// last spelling mapping to a canonical key wins.
pub fn normalize_report_data(raw: &Value) -> NormalizedReport {
    match raw {
        Value::Object(map) => normalize_entries(map.iter().map(|(k, v)| (k.as_str(), v))),
        Value::Null => NormalizedReport::default(),
        other => {
            tracing::warn!(kind = json_kind(other), "Lab values payload is not an object");
            NormalizedReport {
                warnings: vec![ValidationWarning::new(
                    "labValues",
                    format!("expected an object of lab values, got {}", json_kind(other)),
                )],
                ..NormalizedReport::default()
            }
        }
    }
}

/// Normalize an ordered sequence of raw (key, value) entries.
pub fn normalize_entries<'a, I>(entries: I) -> NormalizedReport
where
    I: IntoIterator<Item = (&'a str, &'a Value)>,
{
    let mut report = NormalizedReport::default();

    for (raw_key, raw_value) in entries {
        match lookup_parameter(raw_key) {
            Some(param) => {
                if report.canonical.contains_key(param) {
                    tracing::debug!(
                        parameter = param.as_str(),
                        "Duplicate lab spelling, later value wins"
                    );
                }
                report.canonical.set(param, coerce_value(raw_value));
            }
            None => {
                let key = normalize_token(raw_key);
                if key.is_empty() {
                    continue;
                }
                report.warnings.push(ValidationWarning::new(
                    raw_key,
                    format!("unrecognized lab parameter kept as '{key}'"),
                ));
                report.unmapped.insert(key, raw_value.clone());
            }
        }
    }

    report
}

/// Render canonical values under human-readable labels for presentation.
/// One-way: the output is never fed back through normalization.
pub fn canonical_to_display(values: &LabValues) -> Map<String, Value> {
    values
        .iter()
        .map(|(param, value)| {
            let json = value
                .and_then(serde_json::Number::from_f64)
                .map(Value::Number)
                .unwrap_or(Value::Null);
            (param.display_label().to_string(), json)
        })
        .collect()
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::collections::HashSet;

    #[test]
    fn classifier_feature_names_map() {
        assert_eq!(normalize_key("CREATININE (mg/dL)"), "creatinine");
        assert_eq!(normalize_key("UREA (mg/dL)"), "urea");
        assert_eq!(normalize_key("ALBUMIN (g/dL)"), "albumin");
        assert_eq!(normalize_key("URIC ACID (mg/dL)"), "uricacid");
        assert_eq!(normalize_key("eGFR"), "egfr");
        assert_eq!(normalize_key("ACR"), "acr");
    }

    #[test]
    fn matching_ignores_case_whitespace_punctuation() {
        assert_eq!(normalize_key("  Serum   Creatinine "), "creatinine");
        assert_eq!(normalize_key("S.Creatinine"), "creatinine");
        assert_eq!(normalize_key("HbA1c"), "hba1c");
        assert_eq!(normalize_key("Vitamin-B12"), "vitaminb12");
        assert_eq!(normalize_key("LDL-C"), "ldl");
        assert_eq!(normalize_key("Albumin/Creatinine Ratio"), "acr");
    }

    #[test]
    fn unit_suffix_is_ignored_for_unknown_full_spelling() {
        assert_eq!(normalize_key("Hemoglobin (g/dL)"), "hemoglobin");
        assert_eq!(normalize_key("Platelet Count (10^3/uL)"), "platelets");
    }

    #[test]
    fn unknown_key_passes_through_normalized() {
        assert_eq!(normalize_key("Sodium"), "sodium");
        assert_eq!(normalize_key("Potassium (mmol/L)"), "potassiummmoll");
        assert_eq!(lookup_parameter("Sodium"), None);
    }

    #[test]
    fn every_canonical_key_maps_to_itself() {
        for param in LabParameter::ALL {
            assert_eq!(normalize_key(param.as_str()), param.as_str());
            assert_eq!(lookup_parameter(param.display_label()), Some(param));
        }
    }

    #[test]
    fn aliases_are_unambiguous() {
        let mut seen: HashMap<String, LabParameter> = HashMap::new();
        for (param, spellings) in ALIASES {
            for spelling in *spellings {
                let token = normalize_token(spelling);
                if let Some(existing) = seen.insert(token.clone(), *param) {
                    assert_eq!(existing, *param, "alias '{token}' maps to two parameters");
                }
            }
        }
        let covered: HashSet<LabParameter> = ALIASES.iter().map(|(p, _)| *p).collect();
        assert_eq!(covered.len(), LabParameter::ALL.len());
    }

    #[test]
    fn coercion_parse_or_discard() {
        assert_eq!(coerce_value(&json!(1.4)), Some(1.4));
        assert_eq!(coerce_value(&json!(" 42 ")), Some(42.0));
        assert_eq!(coerce_value(&json!("")), None);
        assert_eq!(coerce_value(&json!("NIL")), None);
        assert_eq!(coerce_value(&json!("Na")), None);
        assert_eq!(coerce_value(&json!("high")), None);
        assert_eq!(coerce_value(&json!(true)), None);
        assert_eq!(coerce_value(&json!(null)), None);
    }

    #[test]
    fn normalize_report_mixed_spellings() {
        let report = normalize_report_data(&json!({
            "CREATININE (mg/dL)": 1.8,
            "Blood Urea": "48",
            "eGFR": 42,
            "ACR": "na",
            "Sodium": 138
        }));
        assert_eq!(report.canonical.get(LabParameter::Creatinine), Some(1.8));
        assert_eq!(report.canonical.get(LabParameter::Urea), Some(48.0));
        assert_eq!(report.canonical.get(LabParameter::Egfr), Some(42.0));
        assert!(report.canonical.contains_key(LabParameter::Acr));
        assert_eq!(report.canonical.get(LabParameter::Acr), None);
        assert_eq!(report.unmapped.get("sodium"), Some(&json!(138)));
        assert_eq!(report.warnings.len(), 1);
    }

    #[test]
    fn collision_last_write_wins() {
        let report = normalize_report_data(&json!({
            "creatinine": 1.0,
            "Serum Creatinine": 2.0
        }));
        assert_eq!(report.canonical.get(LabParameter::Creatinine), Some(2.0));
        assert!(report.warnings.is_empty());
    }

    #[test]
    fn non_object_payload_warns() {
        let report = normalize_report_data(&json!([1, 2, 3]));
        assert!(report.canonical.is_empty());
        assert_eq!(report.warnings.len(), 1);
        assert!(normalize_report_data(&Value::Null).warnings.is_empty());
    }

    #[test]
    fn display_rendering() {
        let mut values = LabValues::new().with(LabParameter::Creatinine, 1.2);
        values.set(LabParameter::Egfr, None);
        let display = canonical_to_display(&values);
        assert_eq!(display["CREATININE (mg/dL)"], json!(1.2));
        assert!(display["eGFR"].is_null());
        assert!(!display.contains_key("creatinine"));
    }
}
