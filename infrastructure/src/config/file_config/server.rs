//! Server configuration from TOML (`[server]` section)

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Where the council server lives and how long plain requests may take
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileServerConfig {
    /// Base URL of the council server, e.g. `http://localhost:8002`
    pub base_url: String,
    /// Timeout for list/get/create/delete/config requests.
    /// Consultation streams are not subject to it.
    pub request_timeout_seconds: u64,
}

impl FileServerConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_seconds)
    }
}

impl Default for FileServerConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8002".to_string(),
            request_timeout_seconds: 30,
        }
    }
}
