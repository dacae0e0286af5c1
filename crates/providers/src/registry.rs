use std::sync::Arc;

use canvass_core::config::{AppConfig, CompletionBackend, DiscoveryBackend};
use canvass_core::domain::integration::Integration;
use tracing::info;

use crate::completion::{
    AnthropicCompletion, CompletionProvider, OllamaCompletion, OpenAiCompletion,
};
use crate::crm::{CrmBackend, CrmProvider, HubSpotCrm, SalesforceCrm};
use crate::discovery::{BasicDiscovery, DiscoveryProvider, FirecrawlDiscovery, TavilyDiscovery};
use crate::error::ProviderError;
use crate::http::build_client;

/// Resolves a profile's CRM credentials to a live backend.
pub trait CrmConnector: Send + Sync {
    fn connect(&self, integration: &Integration) -> Result<Arc<dyn CrmProvider>, ProviderError>;
}

/// Builds HubSpot/Salesforce clients over one shared HTTP client.
pub struct HttpCrmConnector {
    client: reqwest::Client,
}

impl HttpCrmConnector {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }

    pub fn with_timeout(timeout_secs: u64) -> Result<Self, ProviderError> {
        Ok(Self::new(build_client(timeout_secs)?))
    }
}

impl CrmConnector for HttpCrmConnector {
    fn connect(&self, integration: &Integration) -> Result<Arc<dyn CrmProvider>, ProviderError> {
        let backend = CrmBackend::parse(&integration.provider).ok_or_else(|| {
            ProviderError::UnknownProvider { kind: "crm", name: integration.provider.clone() }
        })?;

        let token = integration.access_token.clone();
        let provider: Arc<dyn CrmProvider> = match backend {
            CrmBackend::HubSpot => Arc::new(HubSpotCrm::new(
                self.client.clone(),
                token,
                integration.instance_url.as_deref(),
            )),
            CrmBackend::Salesforce => Arc::new(SalesforceCrm::new(
                self.client.clone(),
                token,
                integration.instance_url.as_deref(),
            )?),
        };
        Ok(provider)
    }
}

/// Providers built once at startup and shared by every run.
#[derive(Clone)]
pub struct ProviderRegistry {
    completion: Arc<dyn CompletionProvider>,
    discovery: Arc<dyn DiscoveryProvider>,
    crm: Option<Arc<dyn CrmConnector>>,
}

impl ProviderRegistry {
    pub fn new(
        completion: Arc<dyn CompletionProvider>,
        discovery: Arc<dyn DiscoveryProvider>,
        crm: Option<Arc<dyn CrmConnector>>,
    ) -> Self {
        Self { completion, discovery, crm }
    }

    pub fn from_config(config: &AppConfig) -> Result<Self, ProviderError> {
        let llm = &config.llm;
        let llm_client = build_client(llm.timeout_secs)?;
        let completion: Arc<dyn CompletionProvider> = match llm.provider {
            CompletionBackend::OpenAi => Arc::new(OpenAiCompletion::new(
                llm_client,
                llm.api_key.clone(),
                llm.base_url.as_deref(),
                llm.model.clone(),
            )),
            CompletionBackend::Anthropic => Arc::new(AnthropicCompletion::new(
                llm_client,
                llm.api_key.clone(),
                llm.base_url.as_deref(),
                llm.model.clone(),
            )),
            CompletionBackend::Ollama => Arc::new(OllamaCompletion::new(
                llm_client,
                llm.base_url.as_deref(),
                llm.model.clone(),
            )),
        };

        let discovery_config = &config.discovery;
        let discovery_client = build_client(discovery_config.timeout_secs)?;
        let max_chars = discovery_config.max_content_chars;
        let discovery: Arc<dyn DiscoveryProvider> = match discovery_config.provider {
            DiscoveryBackend::Basic => Arc::new(BasicDiscovery::new(discovery_client, max_chars)),
            DiscoveryBackend::Firecrawl => Arc::new(FirecrawlDiscovery::new(
                discovery_client,
                discovery_config.api_key.clone(),
                discovery_config.base_url.as_deref(),
                max_chars,
            )),
            DiscoveryBackend::Tavily => Arc::new(TavilyDiscovery::new(
                discovery_client,
                discovery_config.api_key.clone(),
                discovery_config.base_url.as_deref(),
                max_chars,
            )),
        };

        let crm: Option<Arc<dyn CrmConnector>> = if config.crm.enabled {
            Some(Arc::new(HttpCrmConnector::with_timeout(config.crm.timeout_secs)?))
        } else {
            None
        };

        info!(
            event_name = "providers.registry.built",
            completion = completion.name(),
            discovery = discovery.name(),
            crm_enabled = crm.is_some(),
            "provider registry ready"
        );

        Ok(Self { completion, discovery, crm })
    }

    pub fn completion(&self) -> &dyn CompletionProvider {
        self.completion.as_ref()
    }

    pub fn discovery(&self) -> &dyn DiscoveryProvider {
        self.discovery.as_ref()
    }

    /// `None` when CRM sync is disabled in configuration.
    pub fn crm(&self) -> Option<Arc<dyn CrmConnector>> {
        self.crm.clone()
    }
}

#[cfg(test)]
mod tests {
    use canvass_core::chrono::Utc;
    use canvass_core::config::{AppConfig, CompletionBackend, DiscoveryBackend};
    use canvass_core::domain::integration::{Integration, IntegrationId};
    use canvass_core::domain::profile::ProfileId;

    use super::{CrmConnector, HttpCrmConnector, ProviderRegistry};
    use crate::crm::CrmBackend;
    use crate::error::ProviderError;

    fn integration(provider: &str, instance_url: Option<&str>) -> Integration {
        Integration {
            id: IntegrationId("INT-1".to_string()),
            profile_id: ProfileId("P-1".to_string()),
            provider: provider.to_string(),
            access_token: "token".to_string().into(),
            instance_url: instance_url.map(str::to_string),
            is_verified: true,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn registry_builds_configured_backends() {
        let mut config = AppConfig::default();
        config.llm.provider = CompletionBackend::Anthropic;
        config.discovery.provider = DiscoveryBackend::Tavily;

        let registry = ProviderRegistry::from_config(&config).expect("registry");
        assert_eq!(registry.completion().name(), "anthropic");
        assert_eq!(registry.discovery().name(), "tavily");
        assert!(registry.crm().is_some());

        config.crm.enabled = false;
        let without_crm = ProviderRegistry::from_config(&config).expect("registry");
        assert!(without_crm.crm().is_none());
    }

    #[test]
    fn connector_maps_integration_provider_names() {
        let connector = HttpCrmConnector::new(reqwest::Client::new());

        let hubspot = connector.connect(&integration("HubSpot", None)).expect("hubspot");
        assert_eq!(hubspot.backend(), CrmBackend::HubSpot);

        let salesforce = connector
            .connect(&integration("salesforce", Some("https://acme.my.salesforce.com")))
            .expect("salesforce");
        assert_eq!(salesforce.backend(), CrmBackend::Salesforce);

        let unknown = connector.connect(&integration("pipedrive", None));
        assert!(matches!(
            unknown,
            Err(ProviderError::UnknownProvider { kind: "crm", ref name }) if name == "pipedrive"
        ));
    }
}
