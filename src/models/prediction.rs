use serde::{Deserialize, Deserializer, Serialize};

/// Status value the classifier reports on a usable prediction.
pub const PREDICTION_SUCCESS: &str = "success";

/// Output of the external IgAN classifier. Untrusted: every field may be
/// missing or malformed, and the core only ever reads it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MlPrediction {
    #[serde(default, deserialize_with = "lenient_prediction")]
    pub prediction: Option<u8>,
    /// `[p_negative, p_positive]` when well formed. `None` if the field is
    /// missing or holds anything other than an array of numbers.
    #[serde(default, deserialize_with = "lenient_probabilities")]
    pub probabilities: Option<Vec<f64>>,
    #[serde(default)]
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl MlPrediction {
    pub fn success(prediction: u8, p_negative: f64, p_positive: f64) -> Self {
        Self {
            prediction: Some(prediction),
            probabilities: Some(vec![p_negative, p_positive]),
            status: PREDICTION_SUCCESS.into(),
            error: None,
        }
    }

    pub fn failed(message: &str) -> Self {
        Self {
            prediction: None,
            probabilities: None,
            status: "error".into(),
            error: Some(message.to_string()),
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == PREDICTION_SUCCESS
    }

    /// Success status, a prediction, and exactly two probabilities.
    pub fn is_well_formed(&self) -> bool {
        self.is_success()
            && self.prediction.is_some()
            && self.probabilities.as_ref().is_some_and(|p| p.len() == 2)
    }
}

fn lenient_prediction<'de, D>(deserializer: D) -> Result<Option<u8>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(raw.and_then(|v| match v {
        serde_json::Value::Number(n) => n.as_f64().and_then(|f| {
            if f == 0.0 {
                Some(0)
            } else if f == 1.0 {
                Some(1)
            } else {
                None
            }
        }),
        serde_json::Value::String(s) => match s.trim() {
            "0" => Some(0),
            "1" => Some(1),
            _ => None,
        },
        _ => None,
    }))
}

fn lenient_probabilities<'de, D>(deserializer: D) -> Result<Option<Vec<f64>>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match raw {
        Some(serde_json::Value::Array(items)) => items
            .iter()
            .map(|item| item.as_f64().filter(|f| f.is_finite()))
            .collect::<Option<Vec<f64>>>(),
        _ => None,
    })
}
