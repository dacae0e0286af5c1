use sqlx::{sqlite::SqliteRow, Row};

use canvass_core::domain::profile::{Profile, ProfileId, ProfileMode};

use super::rows::{encode_string_list, parse_string_list, parse_timestamp};
use super::{ProfileRepository, RepositoryError};
use crate::DbPool;

pub struct SqlProfileRepository {
    pool: DbPool,
}

impl SqlProfileRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl ProfileRepository for SqlProfileRepository {
    async fn find_by_id(&self, id: &ProfileId) -> Result<Option<Profile>, RepositoryError> {
        let row = sqlx::query(
            "SELECT
                id,
                name,
                mode,
                context,
                target_persona,
                location,
                knowledge_base_json,
                service_offerings_json,
                business_objections_json,
                riding,
                candidate_name,
                policy_pillars_json,
                political_objections_json,
                created_at,
                updated_at
             FROM profile
             WHERE id = ?",
        )
        .bind(&id.0)
        .fetch_optional(&self.pool)
        .await?;

        row.map(profile_from_row).transpose()
    }

    async fn save(&self, profile: Profile) -> Result<(), RepositoryError> {
        sqlx::query(
            "INSERT INTO profile (
                id,
                name,
                mode,
                context,
                target_persona,
                location,
                knowledge_base_json,
                service_offerings_json,
                business_objections_json,
                riding,
                candidate_name,
                policy_pillars_json,
                political_objections_json,
                created_at,
                updated_at
             ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
             ON CONFLICT(id) DO UPDATE SET
                name = excluded.name,
                mode = excluded.mode,
                context = excluded.context,
                target_persona = excluded.target_persona,
                location = excluded.location,
                knowledge_base_json = excluded.knowledge_base_json,
                service_offerings_json = excluded.service_offerings_json,
                business_objections_json = excluded.business_objections_json,
                riding = excluded.riding,
                candidate_name = excluded.candidate_name,
                policy_pillars_json = excluded.policy_pillars_json,
                political_objections_json = excluded.political_objections_json,
                updated_at = excluded.updated_at",
        )
        .bind(&profile.id.0)
        .bind(&profile.name)
        .bind(profile.mode.as_str())
        .bind(profile.context.as_deref())
        .bind(profile.target_persona.as_deref())
        .bind(profile.location.as_deref())
        .bind(encode_string_list(&profile.knowledge_base)?)
        .bind(encode_string_list(&profile.service_offerings)?)
        .bind(encode_string_list(&profile.business_objections)?)
        .bind(profile.riding.as_deref())
        .bind(profile.candidate_name.as_deref())
        .bind(encode_string_list(&profile.policy_pillars)?)
        .bind(encode_string_list(&profile.political_objections)?)
        .bind(profile.created_at.to_rfc3339())
        .bind(profile.updated_at.to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

fn profile_from_row(row: SqliteRow) -> Result<Profile, RepositoryError> {
    let mode_raw = row.try_get::<String, _>("mode")?;
    let mode = ProfileMode::parse(&mode_raw)
        .ok_or_else(|| RepositoryError::Decode(format!("unknown profile mode `{mode_raw}`")))?;

    Ok(Profile {
        id: ProfileId(row.try_get("id")?),
        name: row.try_get("name")?,
        mode,
        context: row.try_get("context")?,
        target_persona: row.try_get("target_persona")?,
        location: row.try_get("location")?,
        knowledge_base: list_column(&row, "knowledge_base_json")?,
        service_offerings: list_column(&row, "service_offerings_json")?,
        business_objections: list_column(&row, "business_objections_json")?,
        riding: row.try_get("riding")?,
        candidate_name: row.try_get("candidate_name")?,
        policy_pillars: list_column(&row, "policy_pillars_json")?,
        political_objections: list_column(&row, "political_objections_json")?,
        created_at: parse_timestamp("created_at", row.try_get("created_at")?)?,
        updated_at: parse_timestamp("updated_at", row.try_get("updated_at")?)?,
    })
}

fn list_column(row: &SqliteRow, column: &str) -> Result<Vec<String>, RepositoryError> {
    let raw = row.try_get::<String, _>(column)?;
    parse_string_list(column, &raw)
}

#[cfg(test)]
mod tests {
    use canvass_core::domain::profile::{ProfileId, ProfileMode};

    use super::SqlProfileRepository;
    use crate::repositories::test_support::{sample_profile, setup_pool};
    use crate::repositories::ProfileRepository;

    #[tokio::test]
    async fn sql_profile_repo_round_trip_for_both_modes() {
        let pool = setup_pool().await;
        let repo = SqlProfileRepository::new(pool.clone());

        for (id, mode) in [("P-BIZ", ProfileMode::Business), ("P-POL", ProfileMode::Political)] {
            let profile = sample_profile(id, mode);
            repo.save(profile.clone()).await.expect("save profile");

            let found = repo.find_by_id(&profile.id).await.expect("find profile");
            assert_eq!(found, Some(profile));
        }

        let missing = repo.find_by_id(&ProfileId("P-NONE".to_string())).await.expect("lookup");
        assert_eq!(missing, None);

        pool.close().await;
    }

    #[tokio::test]
    async fn sql_profile_repo_save_upserts_existing_row() {
        let pool = setup_pool().await;
        let repo = SqlProfileRepository::new(pool.clone());

        let mut profile = sample_profile("P-BIZ", ProfileMode::Business);
        repo.save(profile.clone()).await.expect("save profile");

        profile.service_offerings.push("water heater repair".to_string());
        repo.save(profile.clone()).await.expect("update profile");

        let found = repo.find_by_id(&profile.id).await.expect("find profile");
        assert_eq!(found.map(|p| p.service_offerings.len()), Some(2));

        pool.close().await;
    }
}
