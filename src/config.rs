use std::path::PathBuf;

use thiserror::Error;

/// Application-level constants
pub const APP_NAME: &str = "ThirdOp";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

pub const DEFAULT_OLLAMA_URL: &str = "http://localhost:11434";
pub const DEFAULT_OLLAMA_MODEL: &str = "gemma:7b";
pub const DEFAULT_TIMEOUT_SECS: u64 = 120;

pub const ENV_OLLAMA_URL: &str = "THIRDOP_OLLAMA_URL";
pub const ENV_OLLAMA_MODEL: &str = "THIRDOP_OLLAMA_MODEL";
pub const ENV_OLLAMA_TIMEOUT: &str = "THIRDOP_OLLAMA_TIMEOUT";
pub const ENV_GENERIC_MODEL: &str = "THIRDOP_GENERIC_MODEL";
pub const ENV_DB_PATH: &str = "THIRDOP_DB_PATH";

#[derive(Error, Debug, PartialEq)]
pub enum ConfigError {
    #[error("{name} must be a positive number of seconds, got '{value}'")]
    InvalidTimeout { name: &'static str, value: String },

    #[error("Cannot determine home directory; set {0}")]
    NoHomeDirectory(&'static str),
}

/// Default tracing filter when `RUST_LOG` is unset.
pub fn default_log_filter() -> &'static str {
    "thirdop=info,thirdop_lib=info"
}

/// ~/ThirdOp/ on all platforms
pub fn app_data_dir() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(APP_NAME))
}

/// Runtime configuration, read from the environment.
#[derive(Debug, Clone, PartialEq)]
pub struct ThirdOpConfig {
    pub ollama_url: String,
    pub ollama_model: String,
    /// Model for any-report interpretation.
    pub generic_model: String,
    /// Bound on every external reasoning call.
    pub timeout_secs: u64,
    pub db_path: PathBuf,
}

impl ThirdOpConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup. Blank values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let ollama_model = get(ENV_OLLAMA_MODEL).unwrap_or_else(|| DEFAULT_OLLAMA_MODEL.to_string());

        let timeout_secs = match get(ENV_OLLAMA_TIMEOUT) {
            None => DEFAULT_TIMEOUT_SECS,
            Some(raw) => match raw.parse::<u64>() {
                Ok(secs) if secs > 0 => secs,
                _ => {
                    return Err(ConfigError::InvalidTimeout {
                        name: ENV_OLLAMA_TIMEOUT,
                        value: raw,
                    })
                }
            },
        };

        let db_path = match get(ENV_DB_PATH) {
            Some(path) => PathBuf::from(path),
            None => app_data_dir()
                .ok_or(ConfigError::NoHomeDirectory(ENV_DB_PATH))?
                .join("thirdop.db"),
        };

        Ok(Self {
            ollama_url: get(ENV_OLLAMA_URL).unwrap_or_else(|| DEFAULT_OLLAMA_URL.to_string()),
            generic_model: get(ENV_GENERIC_MODEL).unwrap_or_else(|| ollama_model.clone()),
            ollama_model,
            timeout_secs,
            db_path,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults() {
        let config = ThirdOpConfig::from_lookup(lookup(&[(ENV_DB_PATH, "/tmp/t.db")])).unwrap();
        assert_eq!(config.ollama_url, "http://localhost:11434");
        assert_eq!(config.ollama_model, "gemma:7b");
        assert_eq!(config.generic_model, "gemma:7b");
        assert_eq!(config.timeout_secs, 120);
        assert_eq!(config.db_path, PathBuf::from("/tmp/t.db"));
    }

    #[test]
    fn overrides() {
        let config = ThirdOpConfig::from_lookup(lookup(&[
            (ENV_OLLAMA_URL, "http://127.0.0.1:9999"),
            (ENV_OLLAMA_MODEL, "medgemma:4b"),
            (ENV_GENERIC_MODEL, "llama3:8b"),
            (ENV_OLLAMA_TIMEOUT, " 30 "),
            (ENV_DB_PATH, "/tmp/x.db"),
        ]))
        .unwrap();
        assert_eq!(config.ollama_model, "medgemma:4b");
        assert_eq!(config.generic_model, "llama3:8b");
        assert_eq!(config.timeout_secs, 30);
    }

    #[test]
    fn zero_or_garbage_timeout_rejected() {
        for bad in ["0", "soon", "-5"] {
            let err = ThirdOpConfig::from_lookup(lookup(&[
                (ENV_OLLAMA_TIMEOUT, bad),
                (ENV_DB_PATH, "/tmp/x.db"),
            ]))
            .unwrap_err();
            assert!(matches!(err, ConfigError::InvalidTimeout { .. }));
        }
    }

    #[test]
    fn blank_values_use_defaults() {
        let config = ThirdOpConfig::from_lookup(lookup(&[
            (ENV_OLLAMA_MODEL, "  "),
            (ENV_DB_PATH, "/tmp/x.db"),
        ]))
        .unwrap();
        assert_eq!(config.ollama_model, "gemma:7b");
    }

    #[test]
    fn default_db_under_app_data() {
        if let Some(dir) = app_data_dir() {
            let config = ThirdOpConfig::from_lookup(|_| None).unwrap();
            assert!(config.db_path.starts_with(dir));
            assert!(config.db_path.ends_with("thirdop.db"));
        }
    }

    #[test]
    fn app_name() {
        assert_eq!(APP_NAME, "ThirdOp");
        assert_eq!(APP_VERSION, "0.3.0");
    }
}
