use std::collections::HashMap;

use canvass_core::chrono::{DateTime, Utc};
use serde_json::Value;
use tokio::sync::RwLock;

use canvass_core::domain::activity::ActivityEvent;
use canvass_core::domain::contact::{Contact, ContactId};
use canvass_core::domain::integration::Integration;
use canvass_core::domain::profile::{Profile, ProfileId};
use canvass_core::domain::run::{AgentRun, AgentRunId, RunStatus};
use canvass_core::domain::sentiment::SentimentReading;

use super::{
    ActivityRepository, AgentRunRepository, ContactRepository, IntegrationRepository,
    ProfileRepository, RepositoryError, SentimentRepository,
};

#[derive(Default)]
pub struct InMemoryProfileRepository {
    profiles: RwLock<HashMap<String, Profile>>,
}

#[async_trait::async_trait]
impl ProfileRepository for InMemoryProfileRepository {
    async fn find_by_id(&self, id: &ProfileId) -> Result<Option<Profile>, RepositoryError> {
        let profiles = self.profiles.read().await;
        Ok(profiles.get(&id.0).cloned())
    }

    async fn save(&self, profile: Profile) -> Result<(), RepositoryError> {
        let mut profiles = self.profiles.write().await;
        profiles.insert(profile.id.0.clone(), profile);
        Ok(())
    }
}

/// Contacts keep insertion order so listings match the SQL ordering.
#[derive(Default)]
pub struct InMemoryContactRepository {
    contacts: RwLock<Vec<Contact>>,
}

#[async_trait::async_trait]
impl ContactRepository for InMemoryContactRepository {
    async fn find_by_id(&self, id: &ContactId) -> Result<Option<Contact>, RepositoryError> {
        let contacts = self.contacts.read().await;
        Ok(contacts.iter().find(|contact| &contact.id == id).cloned())
    }

    async fn save(&self, contact: Contact) -> Result<(), RepositoryError> {
        let mut contacts = self.contacts.write().await;
        match contacts.iter_mut().find(|existing| existing.id == contact.id) {
            Some(existing) => *existing = contact,
            None => contacts.push(contact),
        }
        Ok(())
    }

    async fn list_for_profile(
        &self,
        profile_id: &ProfileId,
    ) -> Result<Vec<Contact>, RepositoryError> {
        let contacts = self.contacts.read().await;
        Ok(contacts.iter().filter(|contact| &contact.profile_id == profile_id).cloned().collect())
    }
}

#[derive(Default)]
pub struct InMemoryAgentRunRepository {
    runs: RwLock<HashMap<String, AgentRun>>,
}

impl InMemoryAgentRunRepository {
    async fn write_terminal(
        &self,
        id: &AgentRunId,
        status: RunStatus,
        output: Value,
        tokens_used: Option<u32>,
        completed_at: DateTime<Utc>,
    ) -> Result<(), RepositoryError> {
        let mut runs = self.runs.write().await;
        let run = runs
            .get_mut(&id.0)
            .ok_or_else(|| RepositoryError::NotFound { entity: "agent_run", id: id.0.clone() })?;
        run.status = status;
        run.output_data = Some(output);
        if let Some(tokens_used) = tokens_used {
            run.tokens_used = tokens_used;
        }
        run.completed_at = Some(completed_at);
        Ok(())
    }
}

#[async_trait::async_trait]
impl AgentRunRepository for InMemoryAgentRunRepository {
    async fn insert(&self, run: AgentRun) -> Result<(), RepositoryError> {
        let mut runs = self.runs.write().await;
        runs.insert(run.id.0.clone(), run);
        Ok(())
    }

    async fn find_by_id(&self, id: &AgentRunId) -> Result<Option<AgentRun>, RepositoryError> {
        let runs = self.runs.read().await;
        Ok(runs.get(&id.0).cloned())
    }

    async fn mark_completed(
        &self,
        id: &AgentRunId,
        output: Value,
        tokens_used: u32,
        completed_at: DateTime<Utc>,
    ) -> Result<(), RepositoryError> {
        self.write_terminal(id, RunStatus::Completed, output, Some(tokens_used), completed_at).await
    }

    async fn mark_failed(
        &self,
        id: &AgentRunId,
        output: Value,
        completed_at: DateTime<Utc>,
    ) -> Result<(), RepositoryError> {
        self.write_terminal(id, RunStatus::Failed, output, None, completed_at).await
    }

    async fn list_for_profile(
        &self,
        profile_id: &ProfileId,
    ) -> Result<Vec<AgentRun>, RepositoryError> {
        let runs = self.runs.read().await;
        let mut listed: Vec<AgentRun> =
            runs.values().filter(|run| &run.profile_id == profile_id).cloned().collect();
        listed.sort_by(|left, right| right.created_at.cmp(&left.created_at));
        Ok(listed)
    }
}

#[derive(Default)]
pub struct InMemoryActivityRepository {
    events: RwLock<Vec<ActivityEvent>>,
}

impl InMemoryActivityRepository {
    pub async fn all(&self) -> Vec<ActivityEvent> {
        self.events.read().await.clone()
    }
}

#[async_trait::async_trait]
impl ActivityRepository for InMemoryActivityRepository {
    async fn append(&self, event: ActivityEvent) -> Result<(), RepositoryError> {
        self.events.write().await.push(event);
        Ok(())
    }

    async fn list_for_run(
        &self,
        run_id: &AgentRunId,
    ) -> Result<Vec<ActivityEvent>, RepositoryError> {
        let events = self.events.read().await;
        Ok(events.iter().filter(|event| event.agent_run_id.as_ref() == Some(run_id)).cloned().collect())
    }
}

#[derive(Default)]
pub struct InMemorySentimentRepository {
    readings: RwLock<Vec<SentimentReading>>,
}

#[async_trait::async_trait]
impl SentimentRepository for InMemorySentimentRepository {
    async fn append(&self, reading: SentimentReading) -> Result<(), RepositoryError> {
        self.readings.write().await.push(reading);
        Ok(())
    }

    async fn list_for_contact(
        &self,
        contact_id: &ContactId,
    ) -> Result<Vec<SentimentReading>, RepositoryError> {
        let readings = self.readings.read().await;
        Ok(readings.iter().filter(|reading| &reading.contact_id == contact_id).cloned().collect())
    }
}

#[derive(Default)]
pub struct InMemoryIntegrationRepository {
    integrations: RwLock<HashMap<String, Integration>>,
}

#[async_trait::async_trait]
impl IntegrationRepository for InMemoryIntegrationRepository {
    async fn find_verified_for_profile(
        &self,
        profile_id: &ProfileId,
    ) -> Result<Option<Integration>, RepositoryError> {
        let integrations = self.integrations.read().await;
        Ok(integrations
            .values()
            .filter(|integration| &integration.profile_id == profile_id && integration.is_verified)
            .max_by_key(|integration| integration.updated_at)
            .cloned())
    }

    async fn save(&self, integration: Integration) -> Result<(), RepositoryError> {
        let mut integrations = self.integrations.write().await;
        integrations.insert(integration.id.0.clone(), integration);
        Ok(())
    }
}
