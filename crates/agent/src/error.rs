use canvass_core::DomainError;
use canvass_db::repositories::RepositoryError;
use canvass_providers::ProviderError;
use thiserror::Error;

/// Any error that escapes an executor body. The run is marked failed with its message.
#[derive(Debug, Error)]
pub enum AgentError {
    #[error(transparent)]
    Provider(#[from] ProviderError),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
    #[error(transparent)]
    Domain(#[from] DomainError),
    #[error("contact `{0}` was not found")]
    ContactNotFound(String),
    #[error("model response could not be used: {0}")]
    MalformedResponse(String),
    #[error("run task did not finish: {0}")]
    Join(String),
}

impl AgentError {
    pub fn error_class(&self) -> &'static str {
        match self {
            Self::Provider(error) => error.error_class(),
            Self::Repository(_) => "repository_error",
            Self::Domain(error) => error.error_class(),
            Self::ContactNotFound(_) => "contact_not_found",
            Self::MalformedResponse(_) => "malformed_response",
            Self::Join(_) => "join_error",
        }
    }
}
