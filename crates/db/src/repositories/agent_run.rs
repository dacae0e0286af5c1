use canvass_core::chrono::{DateTime, Utc};
use serde_json::Value;
use sqlx::{sqlite::SqliteRow, Row};

use canvass_core::domain::contact::ContactId;
use canvass_core::domain::profile::ProfileId;
use canvass_core::domain::run::{AgentRun, AgentRunId, AgentType, RunStatus};

use super::rows::{parse_json, parse_optional_timestamp, parse_timestamp, parse_u32};
use super::{AgentRunRepository, RepositoryError};
use crate::DbPool;

const RUN_COLUMNS: &str = "id,
    profile_id,
    contact_id,
    agent_type,
    status,
    input_json,
    output_json,
    tokens_used,
    created_at,
    completed_at";

pub struct SqlAgentRunRepository {
    pool: DbPool,
}

impl SqlAgentRunRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    async fn write_terminal(
        &self,
        id: &AgentRunId,
        status: RunStatus,
        output: &Value,
        tokens_used: Option<u32>,
        completed_at: DateTime<Utc>,
    ) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            "UPDATE agent_run
             SET status = ?,
                 output_json = ?,
                 tokens_used = COALESCE(?, tokens_used),
                 completed_at = ?
             WHERE id = ?",
        )
        .bind(status.as_str())
        .bind(output.to_string())
        .bind(tokens_used.map(i64::from))
        .bind(completed_at.to_rfc3339())
        .bind(&id.0)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound { entity: "agent_run", id: id.0.clone() });
        }
        Ok(())
    }
}

#[async_trait::async_trait]
impl AgentRunRepository for SqlAgentRunRepository {
    async fn insert(&self, run: AgentRun) -> Result<(), RepositoryError> {
        sqlx::query(&format!(
            "INSERT INTO agent_run ({RUN_COLUMNS}) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)"
        ))
        .bind(&run.id.0)
        .bind(&run.profile_id.0)
        .bind(run.contact_id.as_ref().map(|id| id.0.as_str()))
        .bind(run.agent_type.as_str())
        .bind(run.status.as_str())
        .bind(run.input_data.to_string())
        .bind(run.output_data.as_ref().map(Value::to_string))
        .bind(i64::from(run.tokens_used))
        .bind(run.created_at.to_rfc3339())
        .bind(run.completed_at.map(|value| value.to_rfc3339()))
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn find_by_id(&self, id: &AgentRunId) -> Result<Option<AgentRun>, RepositoryError> {
        let row = sqlx::query(&format!("SELECT {RUN_COLUMNS} FROM agent_run WHERE id = ?"))
            .bind(&id.0)
            .fetch_optional(&self.pool)
            .await?;

        row.map(run_from_row).transpose()
    }

    async fn mark_completed(
        &self,
        id: &AgentRunId,
        output: Value,
        tokens_used: u32,
        completed_at: DateTime<Utc>,
    ) -> Result<(), RepositoryError> {
        self.write_terminal(id, RunStatus::Completed, &output, Some(tokens_used), completed_at)
            .await
    }

    async fn mark_failed(
        &self,
        id: &AgentRunId,
        output: Value,
        completed_at: DateTime<Utc>,
    ) -> Result<(), RepositoryError> {
        self.write_terminal(id, RunStatus::Failed, &output, None, completed_at).await
    }

    async fn list_for_profile(
        &self,
        profile_id: &ProfileId,
    ) -> Result<Vec<AgentRun>, RepositoryError> {
        let rows = sqlx::query(&format!(
            "SELECT {RUN_COLUMNS} FROM agent_run
             WHERE profile_id = ?
             ORDER BY created_at DESC, rowid DESC"
        ))
        .bind(&profile_id.0)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(run_from_row).collect()
    }
}

fn run_from_row(row: SqliteRow) -> Result<AgentRun, RepositoryError> {
    let agent_type_raw = row.try_get::<String, _>("agent_type")?;
    let agent_type = AgentType::parse(&agent_type_raw)
        .ok_or_else(|| RepositoryError::Decode(format!("unknown agent type `{agent_type_raw}`")))?;
    let status_raw = row.try_get::<String, _>("status")?;
    let status = RunStatus::parse(&status_raw)
        .ok_or_else(|| RepositoryError::Decode(format!("unknown run status `{status_raw}`")))?;
    let input_raw = row.try_get::<String, _>("input_json")?;
    let output_data = row
        .try_get::<Option<String>, _>("output_json")?
        .map(|raw| parse_json("output_json", &raw))
        .transpose()?;

    Ok(AgentRun {
        id: AgentRunId(row.try_get("id")?),
        profile_id: ProfileId(row.try_get("profile_id")?),
        contact_id: row.try_get::<Option<String>, _>("contact_id")?.map(ContactId),
        agent_type,
        status,
        input_data: parse_json("input_json", &input_raw)?,
        output_data,
        tokens_used: parse_u32("tokens_used", row.try_get("tokens_used")?)?,
        created_at: parse_timestamp("created_at", row.try_get("created_at")?)?,
        completed_at: parse_optional_timestamp("completed_at", row.try_get("completed_at")?)?,
    })
}
