//! Configuration management for the replay tool.

use std::env;
use std::path::PathBuf;

/// Replay configuration loaded from environment variables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Store snapshot to start from. A missing file means an empty store.
    pub store_path: PathBuf,
    /// JSON array of incoming records
    pub records_path: PathBuf,
    /// Where the resulting snapshot is written
    pub output_path: PathBuf,
    /// Include titles and URLs in debug logs
    pub log_personal_info: bool,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Load configuration from any variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let store_path: PathBuf = lookup("BOUGH_STORE_PATH")
            .ok_or(ConfigError::MissingStorePath)?
            .into();

        let records_path = lookup("BOUGH_RECORDS_PATH")
            .ok_or(ConfigError::MissingRecordsPath)?
            .into();

        let output_path = lookup("BOUGH_OUTPUT_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|| store_path.clone());

        let log_personal_info = match lookup("BOUGH_LOG_PII") {
            None => false,
            Some(value) => match value.to_ascii_lowercase().as_str() {
                "1" | "true" | "yes" => true,
                "0" | "false" | "no" | "" => false,
                _ => return Err(ConfigError::InvalidLogPii(value)),
            },
        };

        Ok(Self {
            store_path,
            records_path,
            output_path,
            log_personal_info,
        })
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("BOUGH_STORE_PATH environment variable is required")]
    MissingStorePath,

    #[error("BOUGH_RECORDS_PATH environment variable is required")]
    MissingRecordsPath,

    #[error("Invalid BOUGH_LOG_PII value: {0}")]
    InvalidLogPii(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| vars.get(name).cloned()
    }

    #[test]
    fn output_defaults_to_store_path() {
        let config = Config::from_lookup(lookup(&[
            ("BOUGH_STORE_PATH", "store.json"),
            ("BOUGH_RECORDS_PATH", "records.json"),
        ]))
        .unwrap();
        assert_eq!(config.output_path, PathBuf::from("store.json"));
        assert!(!config.log_personal_info);
    }

    #[test]
    fn all_variables() {
        let config = Config::from_lookup(lookup(&[
            ("BOUGH_STORE_PATH", "store.json"),
            ("BOUGH_RECORDS_PATH", "records.json"),
            ("BOUGH_OUTPUT_PATH", "out.json"),
            ("BOUGH_LOG_PII", "TRUE"),
        ]))
        .unwrap();
        assert_eq!(config.records_path, PathBuf::from("records.json"));
        assert_eq!(config.output_path, PathBuf::from("out.json"));
        assert!(config.log_personal_info);
    }

    #[test]
    fn missing_required_variables() {
        assert_eq!(
            Config::from_lookup(lookup(&[])),
            Err(ConfigError::MissingStorePath)
        );
        assert_eq!(
            Config::from_lookup(lookup(&[("BOUGH_STORE_PATH", "s.json")])),
            Err(ConfigError::MissingRecordsPath)
        );
    }

    #[test]
    fn invalid_pii_flag() {
        let result = Config::from_lookup(lookup(&[
            ("BOUGH_STORE_PATH", "s.json"),
            ("BOUGH_RECORDS_PATH", "r.json"),
            ("BOUGH_LOG_PII", "sometimes"),
        ]));
        assert_eq!(result, Err(ConfigError::InvalidLogPii("sometimes".into())));
    }
}
