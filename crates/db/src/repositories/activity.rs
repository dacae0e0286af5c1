use sqlx::{sqlite::SqliteRow, Row};

use canvass_core::domain::activity::{ActivityEvent, ActivityEventId, ActivityType};
use canvass_core::domain::contact::ContactId;
use canvass_core::domain::profile::ProfileId;
use canvass_core::domain::run::AgentRunId;

use super::rows::parse_timestamp;
use super::{ActivityRepository, RepositoryError};
use crate::DbPool;

pub struct SqlActivityRepository {
    pool: DbPool,
}

impl SqlActivityRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl ActivityRepository for SqlActivityRepository {
    async fn append(&self, event: ActivityEvent) -> Result<(), RepositoryError> {
        sqlx::query(
            "INSERT INTO activity_event (
                id,
                profile_id,
                agent_run_id,
                contact_id,
                event_type,
                icon,
                color,
                title,
                detail,
                created_at
             ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&event.id.0)
        .bind(&event.profile_id.0)
        .bind(event.agent_run_id.as_ref().map(|id| id.0.as_str()))
        .bind(event.contact_id.as_ref().map(|id| id.0.as_str()))
        .bind(event.event_type.as_str())
        .bind(&event.icon)
        .bind(&event.color)
        .bind(&event.title)
        .bind(event.detail.as_deref())
        .bind(event.created_at.to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn list_for_run(
        &self,
        run_id: &AgentRunId,
    ) -> Result<Vec<ActivityEvent>, RepositoryError> {
        let rows = sqlx::query(
            "SELECT
                id,
                profile_id,
                agent_run_id,
                contact_id,
                event_type,
                icon,
                color,
                title,
                detail,
                created_at
             FROM activity_event
             WHERE agent_run_id = ?
             ORDER BY rowid ASC",
        )
        .bind(&run_id.0)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(event_from_row).collect()
    }
}

fn event_from_row(row: SqliteRow) -> Result<ActivityEvent, RepositoryError> {
    let event_type_raw = row.try_get::<String, _>("event_type")?;
    let event_type = ActivityType::parse(&event_type_raw).ok_or_else(|| {
        RepositoryError::Decode(format!("unknown activity type `{event_type_raw}`"))
    })?;

    Ok(ActivityEvent {
        id: ActivityEventId(row.try_get("id")?),
        profile_id: ProfileId(row.try_get("profile_id")?),
        agent_run_id: row.try_get::<Option<String>, _>("agent_run_id")?.map(AgentRunId),
        contact_id: row.try_get::<Option<String>, _>("contact_id")?.map(ContactId),
        event_type,
        icon: row.try_get("icon")?,
        color: row.try_get("color")?,
        title: row.try_get("title")?,
        detail: row.try_get("detail")?,
        created_at: parse_timestamp("created_at", row.try_get("created_at")?)?,
    })
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use canvass_core::domain::activity::{ActivityEvent, ActivityType};
    use canvass_core::domain::profile::ProfileMode;
    use canvass_core::domain::run::{AgentRun, AgentRunId, AgentType, RunStatus};

    use super::SqlActivityRepository;
    use crate::repositories::test_support::{parse_ts, sample_profile, setup_pool};
    use crate::repositories::{
        ActivityRepository, AgentRunRepository, ProfileRepository, SqlAgentRunRepository,
        SqlProfileRepository,
    };

    #[tokio::test]
    async fn sql_activity_repo_lists_run_events_in_append_order() {
        let pool = setup_pool().await;
        let profile = sample_profile("P-BIZ", ProfileMode::Business);
        SqlProfileRepository::new(pool.clone()).save(profile.clone()).await.expect("save profile");

        let run_id = AgentRunId("run-1".to_string());
        SqlAgentRunRepository::new(pool.clone())
            .insert(AgentRun {
                id: run_id.clone(),
                profile_id: profile.id.clone(),
                contact_id: None,
                agent_type: AgentType::LeadDiscovery,
                status: RunStatus::Running,
                input_data: json!({}),
                output_data: None,
                tokens_used: 0,
                created_at: parse_ts("2026-10-01T12:00:00Z"),
                completed_at: None,
            })
            .await
            .expect("insert run");

        let repo = SqlActivityRepository::new(pool.clone());
        let start = ActivityEvent::new(profile.id.clone(), ActivityType::AgentStart, "Started")
            .for_run(&run_id);
        let scanning = ActivityEvent::new(profile.id.clone(), ActivityType::Scanning, "Scanning")
            .for_run(&run_id)
            .with_detail("3 queries");
        let unrelated = ActivityEvent::new(profile.id.clone(), ActivityType::LeadFound, "Manual");

        repo.append(start.clone()).await.expect("append start");
        repo.append(unrelated).await.expect("append unrelated");
        repo.append(scanning.clone()).await.expect("append scanning");

        let events = repo.list_for_run(&run_id).await.expect("list events");
        assert_eq!(events, vec![start, scanning]);

        pool.close().await;
    }
}
