use async_trait::async_trait;
use canvass_core::chrono::{DateTime, Utc};
use serde_json::Value;
use thiserror::Error;

use canvass_core::domain::activity::ActivityEvent;
use canvass_core::domain::contact::{Contact, ContactId};
use canvass_core::domain::integration::Integration;
use canvass_core::domain::profile::{Profile, ProfileId};
use canvass_core::domain::run::{AgentRun, AgentRunId};
use canvass_core::domain::sentiment::SentimentReading;

pub mod activity;
pub mod agent_run;
pub mod contact;
pub mod integration;
pub mod memory;
pub mod profile;
pub mod sentiment;

mod rows;

pub use activity::SqlActivityRepository;
pub use agent_run::SqlAgentRunRepository;
pub use contact::SqlContactRepository;
pub use integration::SqlIntegrationRepository;
pub use memory::{
    InMemoryActivityRepository, InMemoryAgentRunRepository, InMemoryContactRepository,
    InMemoryIntegrationRepository, InMemoryProfileRepository, InMemorySentimentRepository,
};
pub use profile::SqlProfileRepository;
pub use sentiment::SqlSentimentRepository;

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("decode error: {0}")]
    Decode(String),
    #[error("{entity} `{id}` was not found")]
    NotFound { entity: &'static str, id: String },
}

#[async_trait]
pub trait ProfileRepository: Send + Sync {
    async fn find_by_id(&self, id: &ProfileId) -> Result<Option<Profile>, RepositoryError>;
    async fn save(&self, profile: Profile) -> Result<(), RepositoryError>;
}

#[async_trait]
pub trait ContactRepository: Send + Sync {
    async fn find_by_id(&self, id: &ContactId) -> Result<Option<Contact>, RepositoryError>;
    async fn save(&self, contact: Contact) -> Result<(), RepositoryError>;
    async fn list_for_profile(
        &self,
        profile_id: &ProfileId,
    ) -> Result<Vec<Contact>, RepositoryError>;
}

/// Run rows. Terminal writes are unconditional: the last caller wins.
#[async_trait]
pub trait AgentRunRepository: Send + Sync {
    async fn insert(&self, run: AgentRun) -> Result<(), RepositoryError>;
    async fn find_by_id(&self, id: &AgentRunId) -> Result<Option<AgentRun>, RepositoryError>;
    async fn mark_completed(
        &self,
        id: &AgentRunId,
        output: Value,
        tokens_used: u32,
        completed_at: DateTime<Utc>,
    ) -> Result<(), RepositoryError>;
    async fn mark_failed(
        &self,
        id: &AgentRunId,
        output: Value,
        completed_at: DateTime<Utc>,
    ) -> Result<(), RepositoryError>;
    async fn list_for_profile(
        &self,
        profile_id: &ProfileId,
    ) -> Result<Vec<AgentRun>, RepositoryError>;
}

#[async_trait]
pub trait ActivityRepository: Send + Sync {
    async fn append(&self, event: ActivityEvent) -> Result<(), RepositoryError>;
    async fn list_for_run(&self, run_id: &AgentRunId)
        -> Result<Vec<ActivityEvent>, RepositoryError>;
}

#[async_trait]
pub trait SentimentRepository: Send + Sync {
    async fn append(&self, reading: SentimentReading) -> Result<(), RepositoryError>;
    async fn list_for_contact(
        &self,
        contact_id: &ContactId,
    ) -> Result<Vec<SentimentReading>, RepositoryError>;
}

#[async_trait]
pub trait IntegrationRepository: Send + Sync {
    async fn find_verified_for_profile(
        &self,
        profile_id: &ProfileId,
    ) -> Result<Option<Integration>, RepositoryError>;
    async fn save(&self, integration: Integration) -> Result<(), RepositoryError>;
}

#[cfg(test)]
pub(crate) mod test_support;
