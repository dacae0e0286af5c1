use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use canvass_core::domain::contact::Contact;

use crate::error::ProviderError;

pub mod hubspot;
pub mod salesforce;

pub use hubspot::HubSpotCrm;
pub use salesforce::SalesforceCrm;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CrmBackend {
    HubSpot,
    Salesforce,
}

impl CrmBackend {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "hubspot" => Some(Self::HubSpot),
            "salesforce" => Some(Self::Salesforce),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::HubSpot => "hubspot",
            Self::Salesforce => "salesforce",
        }
    }
}

impl std::fmt::Display for CrmBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ConnectionCheck {
    pub success: bool,
    pub message: String,
}

#[derive(Clone, Debug, PartialEq)]
pub struct CrmPushResult {
    pub external_id: String,
    pub raw: Value,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PullOptions {
    pub limit: usize,
    pub cursor: Option<String>,
}

impl Default for PullOptions {
    fn default() -> Self {
        Self { limit: 50, cursor: None }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PulledContact {
    pub external_id: String,
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PullPage {
    pub contacts: Vec<PulledContact>,
    pub next_cursor: Option<String>,
}

/// CRM capability bound to one profile's credentials. `external_id` arguments are
/// the CRM's own record ids.
#[async_trait]
pub trait CrmProvider: Send + Sync {
    fn backend(&self) -> CrmBackend;

    async fn test_connection(&self) -> Result<ConnectionCheck, ProviderError>;

    /// Creates the record, or updates it when the contact already carries an external id.
    async fn push_contact(&self, contact: &Contact) -> Result<CrmPushResult, ProviderError>;

    async fn pull_contacts(&self, options: &PullOptions) -> Result<PullPage, ProviderError>;

    async fn add_tag(&self, external_id: &str, tag: &str) -> Result<(), ProviderError>;

    async fn add_note(&self, external_id: &str, note: &str) -> Result<(), ProviderError>;
}

fn join_name(first: Option<&str>, last: Option<&str>) -> String {
    [first, last]
        .into_iter()
        .flatten()
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

fn connection_result(
    result: Result<Value, ProviderError>,
    backend: CrmBackend,
) -> Result<ConnectionCheck, ProviderError> {
    match result {
        Ok(_) => Ok(ConnectionCheck { success: true, message: format!("connected to {backend}") }),
        Err(ProviderError::Upstream { status: Some(status), message, .. }) => Ok(ConnectionCheck {
            success: false,
            message: format!("{backend} rejected the credentials (HTTP {status}): {message}"),
        }),
        Err(error) => Err(error),
    }
}

#[cfg(test)]
mod tests {
    use super::{connection_result, join_name, CrmBackend};
    use crate::error::ProviderError;

    #[test]
    fn backend_names_parse_case_insensitively() {
        assert_eq!(CrmBackend::parse(" HubSpot "), Some(CrmBackend::HubSpot));
        assert_eq!(CrmBackend::parse("salesforce"), Some(CrmBackend::Salesforce));
        assert_eq!(CrmBackend::parse("pipedrive"), None);
    }

    #[test]
    fn names_join_non_empty_parts() {
        assert_eq!(join_name(Some("Jane"), Some("Doe")), "Jane Doe");
        assert_eq!(join_name(None, Some(" Doe ")), "Doe");
        assert_eq!(join_name(None, None), "");
    }

    #[test]
    fn http_rejection_is_a_failed_check_not_an_error() {
        let rejected = connection_result(
            Err(ProviderError::upstream("hubspot", Some(401), "expired token")),
            CrmBackend::HubSpot,
        )
        .expect("check result");
        assert!(!rejected.success);
        assert!(rejected.message.contains("401"));

        let transport = connection_result(
            Err(ProviderError::upstream("hubspot", None, "dns failure")),
            CrmBackend::HubSpot,
        );
        assert!(transport.is_err());
    }
}
