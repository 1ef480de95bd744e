pub mod config;
pub mod db;
pub mod decision; // Kidney decision engine
pub mod differential; // Cache-first differential orchestration
pub mod models;
pub mod pipeline;
pub mod reasoning; // Ollama-backed narrative + clinical reasoning

use std::io::Read;
use std::path::PathBuf;

use serde_json::{json, Value};
use thiserror::Error;
use tracing_subscriber::EnvFilter;

use config::{ConfigError, ThirdOpConfig};
use pipeline::{ServiceError, ServiceRequest, ThirdOpService};

#[derive(Error, Debug)]
enum CliError {
    #[error("Cannot read {path}: {source}")]
    ReadInput {
        path: String,
        source: std::io::Error,
    },

    #[error("Malformed JSON input: {0}")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Service(#[from] ServiceError),

    #[error("Failed to start async runtime: {0}")]
    Runtime(std::io::Error),
}

/// CLI entry: one request from the file argument or stdin, one JSON
/// response on stdout. Logs go to stderr.
pub fn run() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config::default_log_filter())),
        )
        .with_writer(std::io::stderr)
        .init();

    tracing::info!("{} starting v{}", config::APP_NAME, config::APP_VERSION);

    let code = match execute(std::env::args().nth(1).map(PathBuf::from)) {
        Ok(output) => {
            println!("{output}");
            0
        }
        Err(e) => {
            tracing::error!(error = %e, "Request failed");
            println!("{}", json!({"error": true, "message": e.to_string()}));
            1
        }
    };
    std::process::exit(code);
}

fn execute(input_path: Option<PathBuf>) -> Result<String, CliError> {
    let raw = read_input(input_path)?;
    // An empty request is an empty analysis.
    let request: Value = if raw.trim().is_empty() {
        json!({})
    } else {
        serde_json::from_str(&raw)?
    };
    let request = ServiceRequest::from_json(request)?;

    let config = ThirdOpConfig::from_env()?;
    let service = ThirdOpService::from_config(&config)?;

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(CliError::Runtime)?;
    let response = runtime.block_on(service.handle(request))?;

    Ok(serde_json::to_string_pretty(&response)?)
}

fn read_input(path: Option<PathBuf>) -> Result<String, CliError> {
    match path {
        Some(path) => std::fs::read_to_string(&path).map_err(|source| CliError::ReadInput {
            path: path.display().to_string(),
            source,
        }),
        None => {
            let mut raw = String::new();
            std::io::stdin()
                .read_to_string(&mut raw)
                .map_err(|source| CliError::ReadInput {
                    path: "stdin".into(),
                    source,
                })?;
            Ok(raw)
        }
    }
}
