//! Logging configuration from TOML (`[logging]` section)

use serde::{Deserialize, Serialize};

/// Where diagnostic logs and consultation transcripts go
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileLoggingConfig {
    /// Also write tracing output to this file
    pub file: Option<String>,
    /// Record every consultation event as JSONL to this file
    pub transcript: Option<String>,
}
