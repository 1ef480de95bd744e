use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;

use crate::config::ThirdOpConfig;
use crate::decision::Decision;
use crate::pipeline::reference::Abnormality;

use super::parser::{parse_any_report, parse_clinical_reasoning, parse_narrative};
use super::prompt::{build_any_report_prompt, build_narrative_prompt, build_reasoning_prompt};
use super::types::{
    AnyReportInterpretation, AnyReportInterpreter, ClinicalContext, ClinicalReasoner,
    ClinicalReasoning, NarrativeGenerator, NarrativeResult, ReasoningInput,
};
use super::ReasoningError;

/// Sampling temperature for every call. Zero keeps output repeatable.
pub const TEMPERATURE: f32 = 0.0;

/// Ollama `/api/generate` client serving all three reasoning seams.
pub struct OllamaReasoningClient {
    base_url: String,
    model: String,
    generic_model: String,
    timeout_secs: u64,
    client: reqwest::Client,
}

impl OllamaReasoningClient {
    pub fn new(base_url: &str, model: &str, timeout_secs: u64) -> Result<Self, ReasoningError> {
        // Ollama runs on this machine; never route through a proxy.
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .no_proxy()
            .build()
            .map_err(|e| ReasoningError::Http(e.to_string()))?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            model: model.to_string(),
            generic_model: model.to_string(),
            timeout_secs,
            client,
        })
    }

    /// Model used for any-report interpretation.
    pub fn with_generic_model(mut self, model: &str) -> Self {
        self.generic_model = model.to_string();
        self
    }

    pub fn from_config(config: &ThirdOpConfig) -> Result<Self, ReasoningError> {
        Ok(
            Self::new(&config.ollama_url, &config.ollama_model, config.timeout_secs)?
                .with_generic_model(&config.generic_model),
        )
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// One non-streaming completion; returns the raw `response` text.
    pub async fn generate(&self, model: &str, prompt: &str) -> Result<String, ReasoningError> {
        let url = format!("{}/api/generate", self.base_url);
        let body = OllamaGenerateRequest {
            model,
            prompt,
            stream: false,
            options: GenerateOptions {
                temperature: TEMPERATURE,
            },
        };

        let response = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| self.map_transport_error(e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ReasoningError::ApiError {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: Value = response
            .json()
            .await
            .map_err(|e| ReasoningError::JsonParsing(e.to_string()))?;

        match parsed.get("response") {
            Some(Value::String(text)) => Ok(text.clone()),
            Some(Value::Null) | None => Err(ReasoningError::MalformedResponse(
                "Ollama response missing 'response' field".into(),
            )),
            Some(other) => Ok(other.to_string()),
        }
    }

    fn map_transport_error(&self, e: reqwest::Error) -> ReasoningError {
        if e.is_timeout() {
            ReasoningError::Timeout(self.timeout_secs)
        } else if e.is_connect() {
            ReasoningError::Connection(self.base_url.clone())
        } else {
            ReasoningError::Http(e.to_string())
        }
    }
}

#[derive(Serialize)]
struct OllamaGenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
    options: GenerateOptions,
}

#[derive(Serialize)]
struct GenerateOptions {
    temperature: f32,
}

#[async_trait]
impl NarrativeGenerator for OllamaReasoningClient {
    async fn generate_narrative(
        &self,
        decision: &Decision,
        context: &ClinicalContext,
    ) -> Result<NarrativeResult, ReasoningError> {
        let prompt = build_narrative_prompt(decision, context);
        let raw = self.generate(&self.model, &prompt).await?;
        parse_narrative(&raw)
    }
}

#[async_trait]
impl ClinicalReasoner for OllamaReasoningClient {
    async fn generate_reasoning(
        &self,
        input: &ReasoningInput,
    ) -> Result<ClinicalReasoning, ReasoningError> {
        let prompt = build_reasoning_prompt(input);
        let raw = self.generate(&self.model, &prompt).await?;
        parse_clinical_reasoning(&raw)
    }
}

#[async_trait]
impl AnyReportInterpreter for OllamaReasoningClient {
    async fn interpret_any_report(
        &self,
        abnormalities: &[Abnormality],
    ) -> Result<AnyReportInterpretation, ReasoningError> {
        let prompt = build_any_report_prompt(abnormalities);
        let raw = self.generate(&self.generic_model, &prompt).await?;
        parse_any_report(&raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::RiskLevel;
    use serde_json::{json, Map};
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    /// Serve exactly one HTTP request with a canned response; returns the
    /// base URL and a handle yielding the raw request body.
    async fn serve_once(
        status_line: &'static str,
        body: String,
    ) -> (String, tokio::task::JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let handle = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut request = Vec::new();
            let mut buf = [0u8; 4096];
            loop {
                let n = socket.read(&mut buf).await.unwrap();
                if n == 0 {
                    break;
                }
                request.extend_from_slice(&buf[..n]);
                let text = String::from_utf8_lossy(&request);
                if let Some(header_end) = text.find("\r\n\r\n") {
                    let content_length = text[..header_end]
                        .lines()
                        .find_map(|line| {
                            let (name, value) = line.split_once(':')?;
                            name.eq_ignore_ascii_case("content-length")
                                .then(|| value.trim().parse::<usize>().ok())
                                .flatten()
                        })
                        .unwrap_or(0);
                    if request.len() >= header_end + 4 + content_length {
                        break;
                    }
                }
            }

            let response = format!(
                "{status_line}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                body.len()
            );
            socket.write_all(response.as_bytes()).await.unwrap();
            socket.shutdown().await.ok();

            let text = String::from_utf8_lossy(&request).to_string();
            text.split_once("\r\n\r\n")
                .map(|(_, b)| b.to_string())
                .unwrap_or_default()
        });

        (format!("http://{addr}"), handle)
    }

    fn reasoning_input() -> ReasoningInput {
        let mut labs = Map::new();
        labs.insert("eGFR".into(), json!(28));
        ReasoningInput {
            risk_level: RiskLevel::High,
            lab_values: labs,
        }
    }

    #[test]
    fn constructor_trims_trailing_slash() {
        let client = OllamaReasoningClient::new("http://localhost:11434/", "gemma:7b", 60).unwrap();
        assert_eq!(client.base_url, "http://localhost:11434");
        assert_eq!(client.model(), "gemma:7b");
        assert_eq!(client.generic_model, "gemma:7b");
        let client = client.with_generic_model("llama3:8b");
        assert_eq!(client.generic_model, "llama3:8b");
    }

    #[tokio::test]
    async fn sends_deterministic_non_streaming_request() {
        let model_text = json!({
            "concerns": [{
                "title": "Low eGFR",
                "reason": "Filtration is reduced.",
                "questionsToAskDoctor": ["Why?", "Is it temporary?", "More tests?"]
            }]
        })
        .to_string();
        let body = json!({"model": "gemma:7b", "response": format!("```json\n{model_text}\n```"), "done": true});
        let (url, handle) = serve_once("HTTP/1.1 200 OK", body.to_string()).await;

        let client = OllamaReasoningClient::new(&url, "gemma:7b", 5).unwrap();
        let reasoning = client.generate_reasoning(&reasoning_input()).await.unwrap();
        assert_eq!(reasoning.concerns.len(), 1);
        assert_eq!(reasoning.concerns[0].doctor_questions.len(), 3);

        let sent: Value = serde_json::from_str(&handle.await.unwrap()).unwrap();
        assert_eq!(sent["model"], "gemma:7b");
        assert_eq!(sent["stream"], false);
        assert_eq!(sent["options"]["temperature"], 0.0);
        assert!(sent["prompt"].as_str().unwrap().contains("\"riskLevel\": \"HIGH\""));
    }

    #[tokio::test]
    async fn missing_response_field_is_malformed() {
        let (url, _handle) = serve_once("HTTP/1.1 200 OK", json!({"done": true}).to_string()).await;
        let client = OllamaReasoningClient::new(&url, "gemma:7b", 5).unwrap();
        let err = client.generate("gemma:7b", "hi").await.unwrap_err();
        assert!(matches!(err, ReasoningError::MalformedResponse(_)));
    }

    #[tokio::test]
    async fn error_status_is_api_error() {
        let (url, _handle) = serve_once(
            "HTTP/1.1 404 Not Found",
            json!({"error": "model 'gemma:7b' not found"}).to_string(),
        )
        .await;
        let client = OllamaReasoningClient::new(&url, "gemma:7b", 5).unwrap();
        let err = client.generate("gemma:7b", "hi").await.unwrap_err();
        match err {
            ReasoningError::ApiError { status, body } => {
                assert_eq!(status, 404);
                assert!(body.contains("not found"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn any_report_uses_generic_model() {
        let model_text = json!({
            "concerns": [],
            "recommendedDepartment": "Internal Medicine",
            "precautions": ["Stay hydrated"]
        })
        .to_string();
        let body = json!({"response": model_text});
        let (url, handle) = serve_once("HTTP/1.1 200 OK", body.to_string()).await;

        let client = OllamaReasoningClient::new(&url, "gemma:7b", 5)
            .unwrap()
            .with_generic_model("llama3:8b");
        let result = client.interpret_any_report(&[]).await.unwrap();
        assert_eq!(result.recommended_department, "Internal Medicine");

        let sent: Value = serde_json::from_str(&handle.await.unwrap()).unwrap();
        assert_eq!(sent["model"], "llama3:8b");
    }

    #[tokio::test]
    async fn unreachable_server_is_connection_error() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let client = OllamaReasoningClient::new(&format!("http://{addr}"), "gemma:7b", 5).unwrap();
        let err = client.generate("gemma:7b", "hi").await.unwrap_err();
        assert!(matches!(err, ReasoningError::Connection(_)), "{err}");
    }
}
