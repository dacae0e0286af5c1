use secrecy::ExposeSecret;
use sqlx::{sqlite::SqliteRow, Row};

use canvass_core::domain::integration::{Integration, IntegrationId};
use canvass_core::domain::profile::ProfileId;

use super::rows::parse_timestamp;
use super::{IntegrationRepository, RepositoryError};
use crate::DbPool;

pub struct SqlIntegrationRepository {
    pool: DbPool,
}

impl SqlIntegrationRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl IntegrationRepository for SqlIntegrationRepository {
    async fn find_verified_for_profile(
        &self,
        profile_id: &ProfileId,
    ) -> Result<Option<Integration>, RepositoryError> {
        let row = sqlx::query(
            "SELECT
                id,
                profile_id,
                provider,
                access_token,
                instance_url,
                is_verified,
                created_at,
                updated_at
             FROM integration
             WHERE profile_id = ? AND is_verified = 1
             ORDER BY updated_at DESC
             LIMIT 1",
        )
        .bind(&profile_id.0)
        .fetch_optional(&self.pool)
        .await?;

        row.map(integration_from_row).transpose()
    }

    async fn save(&self, integration: Integration) -> Result<(), RepositoryError> {
        sqlx::query(
            "INSERT INTO integration (
                id,
                profile_id,
                provider,
                access_token,
                instance_url,
                is_verified,
                created_at,
                updated_at
             ) VALUES (?, ?, ?, ?, ?, ?, ?, ?)
             ON CONFLICT(id) DO UPDATE SET
                provider = excluded.provider,
                access_token = excluded.access_token,
                instance_url = excluded.instance_url,
                is_verified = excluded.is_verified,
                updated_at = excluded.updated_at",
        )
        .bind(&integration.id.0)
        .bind(&integration.profile_id.0)
        .bind(&integration.provider)
        .bind(integration.access_token.expose_secret())
        .bind(integration.instance_url.as_deref())
        .bind(integration.is_verified)
        .bind(integration.created_at.to_rfc3339())
        .bind(integration.updated_at.to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

fn integration_from_row(row: SqliteRow) -> Result<Integration, RepositoryError> {
    Ok(Integration {
        id: IntegrationId(row.try_get("id")?),
        profile_id: ProfileId(row.try_get("profile_id")?),
        provider: row.try_get("provider")?,
        access_token: row.try_get::<String, _>("access_token")?.into(),
        instance_url: row.try_get("instance_url")?,
        is_verified: row.try_get("is_verified")?,
        created_at: parse_timestamp("created_at", row.try_get("created_at")?)?,
        updated_at: parse_timestamp("updated_at", row.try_get("updated_at")?)?,
    })
}
