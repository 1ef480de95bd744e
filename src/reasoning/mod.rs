//! External reasoning: narrative differentials, patient-facing clinical
//! concerns and any-report interpretation, served by a local Ollama model.
//!
//! Everything here may fail. Callers (the differential orchestrator and the
//! service) own the fallbacks.

pub mod mock;
pub mod ollama;
pub mod parser;
pub mod prompt;
pub mod types;

pub use ollama::*;
pub use parser::*;
pub use prompt::*;
pub use types::*;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ReasoningError {
    #[error("Ollama is not reachable at {0}")]
    Connection(String),

    #[error("Reasoning request timed out after {0} seconds")]
    Timeout(u64),

    #[error("HTTP client error: {0}")]
    Http(String),

    #[error("Ollama returned error (status {status}): {body}")]
    ApiError { status: u16, body: String },

    #[error("Malformed model response: {0}")]
    MalformedResponse(String),

    #[error("JSON parsing error: {0}")]
    JsonParsing(String),

    #[error("Reasoning task failed: {0}")]
    TaskFailed(String),
}
