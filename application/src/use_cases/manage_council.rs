//! Manage Council use case
//!
//! Reads and changes which models sit on the council and which one chairs
//! the final synthesis.

use crate::ports::conversation_repository::RepositoryError;
use crate::ports::council_settings::{
    CouncilSettings, CouncilSettingsPort, HealthStatus, SettingsUpdate,
};
use council_domain::ModelId;
use std::sync::Arc;
use thiserror::Error;
use tracing::{error, info, warn};

/// Errors that can occur while managing the council
#[derive(Error, Debug)]
pub enum ManageCouncilError {
    #[error("A council needs at least one model")]
    EmptyCouncil,

    #[error("Nothing to update")]
    EmptyUpdate,

    #[error("Settings error: {0}")]
    Settings(#[from] RepositoryError),
}

/// Use case for reading and updating the council composition
pub struct ManageCouncilUseCase<S: CouncilSettingsPort + 'static> {
    settings: Arc<S>,
}

impl<S: CouncilSettingsPort + 'static> ManageCouncilUseCase<S> {
    pub fn new(settings: Arc<S>) -> Self {
        Self { settings }
    }

    /// Current composition
    pub async fn show(&self) -> Result<CouncilSettings, ManageCouncilError> {
        let settings = self.settings.get_settings().await?;
        for member in settings.unavailable_members() {
            warn!("Council member {} has no configured provider", member);
        }
        Ok(settings)
    }

    /// Apply a partial update and return the settings now in effect.
    ///
    /// An update that names an empty council is rejected before it reaches
    /// the server.
    pub async fn execute(
        &self,
        update: SettingsUpdate,
    ) -> Result<CouncilSettings, ManageCouncilError> {
        if update.is_empty() {
            error!("Rejected council update: nothing to change");
            return Err(ManageCouncilError::EmptyUpdate);
        }
        if update.council_models.as_ref().is_some_and(Vec::is_empty) {
            error!("Rejected council update: empty council");
            return Err(ManageCouncilError::EmptyCouncil);
        }

        let settings = self.settings.update_settings(&update).await?;
        info!(
            "Council updated: {} members, chairman {}",
            settings.council_models.len(),
            settings
                .chairman_model
                .as_ref()
                .map(ModelId::as_str)
                .unwrap_or("(none)")
        );
        Ok(settings)
    }

    pub async fn health(&self) -> Result<HealthStatus, ManageCouncilError> {
        Ok(self.settings.health().await?)
    }
}
