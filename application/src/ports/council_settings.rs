//! Council settings port
//!
//! Which models sit on the council and which one chairs it is stored by the
//! server; this port reads and updates that selection.

use super::conversation_repository::RepositoryError;
use async_trait::async_trait;
use council_domain::ModelId;
use serde::{Deserialize, Serialize};

/// Current council composition as reported by the server
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CouncilSettings {
    #[serde(default)]
    pub council_models: Vec<ModelId>,
    #[serde(default)]
    pub chairman_model: Option<ModelId>,
    /// Providers the server has credentials for
    #[serde(default)]
    pub available_providers: Vec<String>,
}

impl CouncilSettings {
    /// Council members whose provider is not in `available_providers`.
    ///
    /// Empty when the server did not report any providers.
    pub fn unavailable_members(&self) -> Vec<&ModelId> {
        if self.available_providers.is_empty() {
            return Vec::new();
        }
        self.council_models
            .iter()
            .filter(|m| {
                m.provider()
                    .is_some_and(|p| !self.available_providers.iter().any(|a| a == p))
            })
            .collect()
    }
}

/// Partial update; absent fields are left unchanged
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SettingsUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub council_models: Option<Vec<ModelId>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chairman_model: Option<ModelId>,
}

impl SettingsUpdate {
    pub fn is_empty(&self) -> bool {
        self.council_models.is_none() && self.chairman_model.is_none()
    }
}

/// Server health report
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct HealthStatus {
    pub status: String,
    #[serde(default)]
    pub service: String,
}

impl HealthStatus {
    pub fn is_ok(&self) -> bool {
        self.status.eq_ignore_ascii_case("ok")
    }
}

#[async_trait]
pub trait CouncilSettingsPort: Send + Sync {
    async fn get_settings(&self) -> Result<CouncilSettings, RepositoryError>;

    /// Apply `update` and return the settings now in effect
    async fn update_settings(
        &self,
        update: &SettingsUpdate,
    ) -> Result<CouncilSettings, RepositoryError>;

    async fn health(&self) -> Result<HealthStatus, RepositoryError>;
}
