//! Heuristic ranking of the five fixed differential considerations.
//!
//! Scores are additive and advisory; they rank plausibility, they are not
//! probabilities of disease.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

use crate::models::RiskLevel;

use super::confidence::round2;
use super::input::ClinicalValues;

pub const IGA_NEPHROPATHY: &str = "IgA nephropathy";
pub const DIABETIC_NEPHROPATHY: &str = "Diabetic nephropathy";
pub const HYPERTENSIVE_NEPHROSCLEROSIS: &str = "Hypertensive nephrosclerosis";
pub const MINIMAL_CHANGE_DISEASE: &str = "Minimal change disease";
pub const OTHER_GLOMERULOPATHY: &str = "Other glomerulopathy";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RankedDifferential {
    pub condition: String,
    pub confidence: f64,
    pub rationale: String,
}

/// Boolean features the formulas read. Absent values never set a flag.
#[derive(Debug, Clone, Copy, Default)]
struct Features {
    moderate_proteinuria: bool,
    heavy_proteinuria: bool,
    reduced_egfr: bool,
    severe_egfr: bool,
    low_albumin: bool,
}

impl Features {
    fn from_values(values: &ClinicalValues) -> Self {
        Self {
            moderate_proteinuria: values.acr.is_some_and(|a| (30.0..=300.0).contains(&a)),
            heavy_proteinuria: values.acr.is_some_and(|a| a > 300.0),
            reduced_egfr: values.egfr.is_some_and(|e| e < 60.0),
            severe_egfr: values.egfr.is_some_and(|e| e < 30.0),
            low_albumin: values.albumin.is_some_and(|a| a < 3.0),
        }
    }
}

pub fn tier_boost(tier: RiskLevel) -> f64 {
    match tier {
        RiskLevel::High => 0.12,
        RiskLevel::Medium => 0.07,
        RiskLevel::Low => 0.03,
    }
}

/// Accumulates a score and the phrases explaining it.
struct Scorer {
    score: f64,
    drivers: Vec<String>,
}

impl Scorer {
    fn base(score: f64) -> Self {
        Self {
            score,
            drivers: Vec::new(),
        }
    }

    fn add_if(&mut self, condition: bool, weight: f64, driver: &str) -> &mut Self {
        if condition {
            self.score += weight;
            self.drivers.push(driver.to_string());
        }
        self
    }

    fn add_scaled(&mut self, weight: f64, factor: f64, driver: String) -> &mut Self {
        self.score += weight * factor;
        if factor > 0.0 {
            self.drivers.push(driver);
        }
        self
    }

    fn finish(&mut self, condition: &str, tier: RiskLevel) -> RankedDifferential {
        let confidence = round2((self.score + tier_boost(tier)).clamp(0.0, 1.0));
        let rationale = if self.drivers.is_empty() {
            format!("Baseline prior only; overall risk tier {}.", tier.as_str())
        } else {
            format!(
                "Driven by {}; overall risk tier {}.",
                self.drivers.join(", "),
                tier.as_str()
            )
        };
        RankedDifferential {
            condition: condition.to_string(),
            confidence,
            rationale,
        }
    }
}

/// Score all five candidates and sort by descending confidence. Ties keep
/// declaration order.
pub fn rank_differentials(
    values: &ClinicalValues,
    p_positive: f64,
    risk_tier: RiskLevel,
) -> Vec<RankedDifferential> {
    let f = Features::from_values(values);
    let p_pos = if p_positive.is_finite() {
        p_positive.clamp(0.0, 1.0)
    } else {
        0.5
    };
    let p_neg = 1.0 - p_pos;

    let mut ranked = vec![
        Scorer::base(0.20)
            .add_scaled(0.45, p_pos, format!("ML IgAN probability {p_pos:.2}"))
            .add_if(f.moderate_proteinuria, 0.10, "moderate proteinuria")
            .add_if(f.heavy_proteinuria, 0.05, "heavy proteinuria")
            .add_if(f.reduced_egfr, 0.05, "reduced eGFR")
            .finish(IGA_NEPHROPATHY, risk_tier),
        Scorer::base(0.10)
            .add_if(f.moderate_proteinuria, 0.15, "moderate proteinuria")
            .add_if(f.heavy_proteinuria, 0.10, "heavy proteinuria")
            .add_if(f.reduced_egfr, 0.10, "reduced eGFR")
            .add_scaled(0.10, p_neg, format!("low ML IgAN probability ({p_pos:.2})"))
            .finish(DIABETIC_NEPHROPATHY, risk_tier),
        Scorer::base(0.10)
            .add_if(f.reduced_egfr, 0.15, "reduced eGFR")
            .add_if(f.severe_egfr, 0.10, "severely reduced eGFR")
            .add_if(!f.heavy_proteinuria, 0.05, "absence of heavy proteinuria")
            .add_scaled(0.05, p_neg, format!("low ML IgAN probability ({p_pos:.2})"))
            .finish(HYPERTENSIVE_NEPHROSCLEROSIS, risk_tier),
        Scorer::base(0.05)
            .add_if(f.heavy_proteinuria, 0.25, "heavy proteinuria")
            .add_if(f.low_albumin, 0.20, "low albumin")
            .add_if(!f.reduced_egfr, 0.10, "preserved eGFR")
            .finish(MINIMAL_CHANGE_DISEASE, risk_tier),
        Scorer::base(0.15)
            .add_if(f.moderate_proteinuria, 0.05, "moderate proteinuria")
            .add_if(f.heavy_proteinuria, 0.05, "heavy proteinuria")
            .add_if(f.low_albumin, 0.05, "low albumin")
            .finish(OTHER_GLOMERULOPATHY, risk_tier),
    ];

    ranked.sort_by(|a, b| {
        b.confidence
            .partial_cmp(&a.confidence)
            .unwrap_or(Ordering::Equal)
    });
    ranked
}
