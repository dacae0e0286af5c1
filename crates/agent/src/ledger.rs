use std::sync::Arc;

use canvass_core::chrono::Utc;
use canvass_core::{AgentRun, AgentRunId, AgentType, ContactId, ProfileId, RunStatus};
use canvass_db::repositories::{AgentRunRepository, RepositoryError};
use serde_json::{json, Value};
use tracing::info;
use uuid::Uuid;

/// Owns the run state machine: rows start `running` and take exactly one terminal write
/// from the executor. Terminal writes are not guarded, a second call overwrites the first.
#[derive(Clone)]
pub struct RunLedger {
    runs: Arc<dyn AgentRunRepository>,
}

impl RunLedger {
    pub fn new(runs: Arc<dyn AgentRunRepository>) -> Self {
        Self { runs }
    }

    pub async fn create_run(
        &self,
        profile_id: &ProfileId,
        agent_type: AgentType,
        input: Value,
        contact_id: Option<ContactId>,
    ) -> Result<AgentRunId, RepositoryError> {
        let run_id = AgentRunId(Uuid::new_v4().to_string());
        self.runs
            .insert(AgentRun {
                id: run_id.clone(),
                profile_id: profile_id.clone(),
                contact_id,
                agent_type,
                status: RunStatus::Running,
                input_data: input,
                output_data: None,
                tokens_used: 0,
                created_at: Utc::now(),
                completed_at: None,
            })
            .await?;

        info!(
            event_name = "agent.run.created",
            run_id = %run_id,
            profile_id = %profile_id.0,
            agent_type = agent_type.as_str(),
            "agent run created"
        );
        Ok(run_id)
    }

    pub async fn complete(
        &self,
        run_id: &AgentRunId,
        output: Value,
        tokens_used: u32,
    ) -> Result<(), RepositoryError> {
        self.runs.mark_completed(run_id, output, tokens_used, Utc::now()).await?;
        info!(event_name = "agent.run.completed", run_id = %run_id, tokens_used, "agent run completed");
        Ok(())
    }

    pub async fn fail(&self, run_id: &AgentRunId, message: &str) -> Result<(), RepositoryError> {
        self.runs.mark_failed(run_id, json!({ "error": message }), Utc::now()).await?;
        info!(event_name = "agent.run.failed", run_id = %run_id, error = message, "agent run failed");
        Ok(())
    }

    pub async fn find(&self, run_id: &AgentRunId) -> Result<Option<AgentRun>, RepositoryError> {
        self.runs.find_by_id(run_id).await
    }
}
