use std::sync::LazyLock;

use regex::Regex;
use serde_json::{Map, Value};

use crate::models::{Concern, DifferentialConsideration, Likelihood};

use super::types::{AnyReportInterpretation, ClinicalReasoning, NarrativeResult};
use super::ReasoningError;

const MAX_DOCTOR_QUESTIONS: usize = 3;
const MAX_PRECAUTIONS: usize = 3;

static OPENING_FENCE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^```\w*\s*\n?").expect("valid regex"));
static CLOSING_FENCE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\n?```\s*$").expect("valid regex"));

/// Remove a surrounding Markdown code fence (```json ... ```) and trim.
pub fn strip_code_fences(raw: &str) -> String {
    let text = raw.trim();
    let text = OPENING_FENCE.replace(text, "");
    let text = CLOSING_FENCE.replace(&text, "");
    text.trim().to_string()
}

/// Clean model output and parse it as a single JSON object.
pub fn parse_json_object(raw: &str) -> Result<Map<String, Value>, ReasoningError> {
    let cleaned = strip_code_fences(raw);
    if cleaned.is_empty() {
        return Err(ReasoningError::MalformedResponse(
            "Model returned empty or non-JSON content".into(),
        ));
    }

    let parsed: Value =
        serde_json::from_str(&cleaned).map_err(|e| ReasoningError::JsonParsing(e.to_string()))?;

    match parsed {
        Value::Object(map) => Ok(map),
        _ => Err(ReasoningError::MalformedResponse(
            "Model did not return a JSON object".into(),
        )),
    }
}

/// Scalar as trimmed text. Null and missing read as `None`.
fn text_of(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::Null => None,
        Value::String(s) => Some(s.trim().to_string()),
        other => Some(other.to_string()),
    }
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::String(s) => !s.is_empty(),
        Value::Array(items) => !items.is_empty(),
        Value::Object(map) => !map.is_empty(),
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
    }
}

fn doctor_questions(concern: &Map<String, Value>) -> Vec<String> {
    let raw = concern
        .get("questionsToAskDoctor")
        .filter(|v| is_truthy(v))
        .or_else(|| concern.get("doctorQuestions"));

    let Some(Value::Array(items)) = raw else {
        return Vec::new();
    };

    items
        .iter()
        .take(MAX_DOCTOR_QUESTIONS)
        .filter_map(|q| text_of(Some(q)))
        .filter(|q| !q.is_empty())
        .collect()
}

/// Normalize one model concern. Dropped when it has neither title nor reason.
pub fn normalize_concern(value: &Value) -> Option<Concern> {
    let map = value.as_object()?;
    let title = text_of(map.get("title")).unwrap_or_default();
    let reason = text_of(map.get("reason")).unwrap_or_default();
    if title.is_empty() && reason.is_empty() {
        return None;
    }

    Some(Concern {
        title,
        reason,
        doctor_questions: doctor_questions(map),
    })
}

fn concerns_of(map: &Map<String, Value>) -> Vec<Concern> {
    match map.get("concerns") {
        Some(Value::Array(items)) => items.iter().filter_map(normalize_concern).collect(),
        _ => Vec::new(),
    }
}

pub fn parse_clinical_reasoning(raw: &str) -> Result<ClinicalReasoning, ReasoningError> {
    let map = parse_json_object(raw)?;
    Ok(ClinicalReasoning {
        concerns: concerns_of(&map),
    })
}

fn normalize_differential(value: &Value) -> Option<DifferentialConsideration> {
    let map = value.as_object()?;
    let condition = text_of(map.get("condition")).filter(|c| !c.is_empty())?;
    let likelihood = text_of(map.get("likelihood"))
        .and_then(|l| Likelihood::parse_lenient(&l))
        .unwrap_or(Likelihood::Low);
    let reasoning = text_of(map.get("reasoning").or_else(|| map.get("rationale")))
        .unwrap_or_default();

    Some(DifferentialConsideration {
        condition,
        likelihood,
        reasoning,
        confidence: None,
    })
}

/// Parse a narrative differential. A response without any usable
/// differential is malformed.
pub fn parse_narrative(raw: &str) -> Result<NarrativeResult, ReasoningError> {
    let map = parse_json_object(raw)?;

    let ranked_differentials: Vec<DifferentialConsideration> = match map.get("rankedDifferentials") {
        Some(Value::Array(items)) => items.iter().filter_map(normalize_differential).collect(),
        _ => Vec::new(),
    };
    if ranked_differentials.is_empty() {
        return Err(ReasoningError::MalformedResponse(
            "No ranked differentials in model response".into(),
        ));
    }

    Ok(NarrativeResult {
        status: text_of(map.get("status"))
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| "success".to_string()),
        message: text_of(map.get("message")).unwrap_or_default(),
        ranked_differentials,
    })
}

pub fn parse_any_report(raw: &str) -> Result<AnyReportInterpretation, ReasoningError> {
    let map = parse_json_object(raw)?;

    let recommended_department = match map.get("recommendedDepartment") {
        Some(Value::String(s)) => s.trim().to_string(),
        _ => String::new(),
    };

    let precautions = match map.get("precautions") {
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(|p| text_of(Some(p)))
            .filter(|p| !p.is_empty())
            .take(MAX_PRECAUTIONS)
            .collect(),
        _ => Vec::new(),
    };

    Ok(AnyReportInterpretation {
        error: false,
        message: None,
        concerns: concerns_of(&map),
        recommended_department,
        precautions,
    })
}
