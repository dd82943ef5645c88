//! Raw TOML configuration data types
//!
//! These structs represent the exact structure of the TOML config file.
//! They are deserialized directly; [`FileConfig::validate`] reports values
//! the rest of the application cannot use.

mod logging;
mod output;
mod repl;
mod server;

pub use logging::FileLoggingConfig;
pub use output::FileOutputConfig;
pub use repl::FileReplConfig;
pub use server::FileServerConfig;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A configuration value that cannot be used
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigValidationError {
    #[error("server.base_url must start with http:// or https://, got {0:?}")]
    InvalidBaseUrl(String),

    #[error("server.request_timeout_seconds must be greater than zero")]
    ZeroTimeout,

    #[error("{field} must not be empty")]
    EmptyPath { field: &'static str },
}

/// Complete file configuration (raw TOML structure)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileConfig {
    /// Council server connection
    pub server: FileServerConfig,
    /// Output settings
    pub output: FileOutputConfig,
    /// REPL settings
    pub repl: FileReplConfig,
    /// Log file and transcript locations
    pub logging: FileLoggingConfig,
}

impl FileConfig {
    /// Validate the entire configuration, returning all detected issues.
    pub fn validate(&self) -> Vec<ConfigValidationError> {
        let mut issues = Vec::new();

        let base_url = self.server.base_url.trim();
        if !(base_url.starts_with("http://") || base_url.starts_with("https://")) {
            issues.push(ConfigValidationError::InvalidBaseUrl(
                self.server.base_url.clone(),
            ));
        }
        if self.server.request_timeout_seconds == 0 {
            issues.push(ConfigValidationError::ZeroTimeout);
        }

        let paths = [
            ("repl.history_file", &self.repl.history_file),
            ("logging.file", &self.logging.file),
            ("logging.transcript", &self.logging.transcript),
        ];
        for (field, path) in paths {
            if path.as_ref().is_some_and(|p| p.trim().is_empty()) {
                issues.push(ConfigValidationError::EmptyPath { field });
            }
        }

        issues
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use council_domain::OutputFormat;

    #[test]
    fn test_deserialize_full_config() {
        let toml_str = r#"
[server]
base_url = "http://council.internal:9000"
request_timeout_seconds = 10

[output]
format = "full"
color = false

[repl]
show_progress = false
history_file = "~/.local/share/llm-council/history.txt"
show_reasoning = true

[logging]
transcript = "/tmp/council.jsonl"
"#;

        let config: FileConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.server.base_url, "http://council.internal:9000");
        assert_eq!(config.server.request_timeout().as_secs(), 10);
        assert_eq!(config.output.format, Some(OutputFormat::Full));
        assert!(!config.output.color);
        assert!(!config.repl.show_progress);
        assert!(config.repl.show_reasoning);
        assert_eq!(
            config.logging.transcript.as_deref(),
            Some("/tmp/council.jsonl")
        );
        assert!(config.validate().is_empty());
    }

    #[test]
    fn test_deserialize_partial_config() {
        let toml_str = r#"
[server]
base_url = "https://council.example.com"
"#;

        let config: FileConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.server.base_url, "https://council.example.com");
        // Defaults should apply
        assert_eq!(config.server.request_timeout_seconds, 30);
        assert!(config.output.color);
        assert!(config.repl.show_progress);
        assert!(config.logging.file.is_none());
    }

    #[test]
    fn test_default_config() {
        let config = FileConfig::default();
        assert_eq!(config.server.base_url, "http://localhost:8002");
        assert!(config.output.format.is_none());
        assert!(!config.repl.show_reasoning);
    }

    #[test]
    fn test_validate_valid_config() {
        let config = FileConfig::default();
        assert!(config.validate().is_empty());
    }

    #[test]
    fn test_validate_reports_every_issue() {
        let mut config = FileConfig::default();
        config.server.base_url = "localhost:8002".to_string();
        config.server.request_timeout_seconds = 0;
        config.logging.transcript = Some("  ".to_string());

        let issues = config.validate();
        assert_eq!(
            issues,
            vec![
                ConfigValidationError::InvalidBaseUrl("localhost:8002".to_string()),
                ConfigValidationError::ZeroTimeout,
                ConfigValidationError::EmptyPath {
                    field: "logging.transcript"
                },
            ]
        );
    }

    #[test]
    fn test_unknown_output_format_fails_to_parse() {
        let toml_str = r#"
[output]
format = "markdown"
"#;
        let err = toml::from_str::<FileConfig>(toml_str).unwrap_err();
        assert!(err.to_string().contains("markdown"));
    }
}
