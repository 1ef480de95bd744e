//! Rule-based kidney lab evaluation.
//!
//! Creatinine, urea and albumin use a normal range plus an optional one-sided
//! critical threshold. eGFR is staged (CKD 3a..5) and ACR tiered by
//! albuminuria category.

use serde::{Deserialize, Serialize};

use crate::models::RiskLevel;

use super::input::ClinicalValues;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClinicalIndicators {
    pub abnormal_values: Vec<String>,
    pub critical_flags: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClinicalRiskAssessment {
    pub clinical_risk: RiskLevel,
    pub abnormal_count: usize,
    pub critical_count: usize,
    pub indicators: ClinicalIndicators,
}

#[derive(Debug, Clone, Copy)]
enum CriticalBound {
    Above(f64),
    Below(f64),
}

struct RangeRule {
    name: &'static str,
    unit: &'static str,
    low: f64,
    high: f64,
    critical: CriticalBound,
}

const CREATININE: RangeRule = RangeRule {
    name: "Creatinine",
    unit: "mg/dL",
    low: 0.6,
    high: 1.3,
    critical: CriticalBound::Above(3.0),
};

const UREA: RangeRule = RangeRule {
    name: "Urea",
    unit: "mg/dL",
    low: 15.0,
    high: 45.0,
    critical: CriticalBound::Above(100.0),
};

const ALBUMIN: RangeRule = RangeRule {
    name: "Albumin",
    unit: "g/dL",
    low: 3.5,
    high: 5.0,
    critical: CriticalBound::Below(2.5),
};

/// Running tally of findings.
#[derive(Default)]
struct Tally {
    abnormal_count: usize,
    critical_count: usize,
    indicators: ClinicalIndicators,
}

impl Tally {
    fn abnormal(&mut self, text: String) {
        self.abnormal_count += 1;
        self.indicators.abnormal_values.push(text);
    }

    fn critical(&mut self, text: String) {
        self.critical_count += 1;
        self.indicators.critical_flags.push(text);
    }
}

fn check_range(rule: &RangeRule, value: Option<f64>, tally: &mut Tally) {
    let Some(v) = value else { return };
    if (rule.low..=rule.high).contains(&v) {
        return;
    }

    let direction = if v > rule.high { "high" } else { "low" };
    tally.abnormal(format!(
        "{} {v} {} ({direction}; normal {}-{})",
        rule.name, rule.unit, rule.low, rule.high
    ));

    match rule.critical {
        CriticalBound::Above(limit) if v > limit => tally.critical(format!(
            "{} critically elevated: {v} {} (> {limit})",
            rule.name, rule.unit
        )),
        CriticalBound::Below(limit) if v < limit => tally.critical(format!(
            "{} critically low: {v} {} (< {limit})",
            rule.name, rule.unit
        )),
        _ => {}
    }
}

/// CKD stage label for an eGFR value; `None` when not reduced.
pub fn ckd_stage(egfr: f64) -> Option<&'static str> {
    if egfr >= 60.0 {
        None
    } else if egfr >= 45.0 {
        Some("CKD Stage 3a")
    } else if egfr >= 30.0 {
        Some("CKD Stage 3b")
    } else if egfr >= 15.0 {
        Some("CKD Stage 4")
    } else {
        Some("CKD Stage 5")
    }
}

fn check_egfr(value: Option<f64>, tally: &mut Tally) {
    let Some(v) = value else { return };
    let Some(stage) = ckd_stage(v) else { return };

    tally.abnormal(format!("eGFR {v} mL/min/1.73m2 ({stage})"));
    if v < 45.0 {
        tally.critical(format!("eGFR {v} mL/min/1.73m2 indicates {stage}"));
    }
}

fn check_acr(value: Option<f64>, tally: &mut Tally) {
    let Some(v) = value else { return };
    if v < 30.0 {
        return;
    }

    if v <= 300.0 {
        tally.abnormal(format!("ACR {v} mg/g (microalbuminuria)"));
    } else {
        tally.abnormal(format!("ACR {v} mg/g (macroalbuminuria)"));
        tally.critical(format!("ACR {v} mg/g indicates severe proteinuria"));
    }
}

/// Aggregate clinical risk. Critical count is checked first, then the
/// medium condition; everything else (including all-normal) is low.
pub fn aggregate_clinical_risk(abnormal_count: usize, critical_count: usize) -> RiskLevel {
    if critical_count >= 2 {
        RiskLevel::High
    } else if critical_count >= 1 || abnormal_count >= 2 {
        RiskLevel::Medium
    } else {
        RiskLevel::Low
    }
}

pub fn evaluate_clinical(values: &ClinicalValues) -> ClinicalRiskAssessment {
    let mut tally = Tally::default();

    check_range(&CREATININE, values.creatinine, &mut tally);
    check_range(&UREA, values.urea, &mut tally);
    check_range(&ALBUMIN, values.albumin, &mut tally);
    check_egfr(values.egfr, &mut tally);
    check_acr(values.acr, &mut tally);

    ClinicalRiskAssessment {
        clinical_risk: aggregate_clinical_risk(tally.abnormal_count, tally.critical_count),
        abnormal_count: tally.abnormal_count,
        critical_count: tally.critical_count,
        indicators: tally.indicators,
    }
}
