use std::sync::Arc;

use canvass_core::{AgentRunId, ProfileId};
use canvass_db::repositories::IntegrationRepository;
use canvass_providers::{CrmConnector, CrmProvider, ProviderError};
use tracing::{debug, warn};

/// Best-effort CRM side-sync. Nothing here can fail a run.
#[derive(Clone)]
pub struct CrmSync {
    connector: Option<Arc<dyn CrmConnector>>,
    integrations: Arc<dyn IntegrationRepository>,
}

impl CrmSync {
    pub fn new(
        connector: Option<Arc<dyn CrmConnector>>,
        integrations: Arc<dyn IntegrationRepository>,
    ) -> Self {
        Self { connector, integrations }
    }

    /// A backend bound to the profile's verified integration, if sync is enabled and one exists.
    pub async fn provider_for(
        &self,
        run_id: &AgentRunId,
        profile_id: &ProfileId,
    ) -> Option<Arc<dyn CrmProvider>> {
        let connector = self.connector.as_ref()?;
        let integration = match self.integrations.find_verified_for_profile(profile_id).await {
            Ok(Some(integration)) => integration,
            Ok(None) => {
                debug!(
                    event_name = "agent.crm.skipped",
                    run_id = %run_id,
                    profile_id = %profile_id.0,
                    "no verified integration"
                );
                return None;
            }
            Err(error) => {
                warn!(
                    event_name = "agent.crm.lookup_failed",
                    run_id = %run_id,
                    profile_id = %profile_id.0,
                    error = %error,
                    "integration lookup failed"
                );
                return None;
            }
        };

        match connector.connect(&integration) {
            Ok(provider) => Some(provider),
            Err(error) => {
                warn!(
                    event_name = "agent.crm.connect_failed",
                    run_id = %run_id,
                    provider = %integration.provider,
                    error = %error,
                    "crm backend unavailable"
                );
                None
            }
        }
    }
}

/// Logs a failed sync call and converts the outcome to data.
pub fn sync_succeeded<T>(
    run_id: &AgentRunId,
    action: &'static str,
    result: Result<T, ProviderError>,
) -> Option<T> {
    match result {
        Ok(value) => Some(value),
        Err(error) => {
            warn!(
                event_name = "agent.crm.sync_failed",
                run_id = %run_id,
                action,
                error_class = error.error_class(),
                error = %error,
                "crm sync failed"
            );
            None
        }
    }
}
