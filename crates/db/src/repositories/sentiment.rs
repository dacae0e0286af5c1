use sqlx::{sqlite::SqliteRow, Row};

use canvass_core::domain::contact::ContactId;
use canvass_core::domain::profile::ProfileId;
use canvass_core::domain::sentiment::{IntentType, SentimentReading, SentimentReadingId};

use super::rows::parse_timestamp;
use super::{RepositoryError, SentimentRepository};
use crate::DbPool;

pub struct SqlSentimentRepository {
    pool: DbPool,
}

impl SqlSentimentRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl SentimentRepository for SqlSentimentRepository {
    async fn append(&self, reading: SentimentReading) -> Result<(), RepositoryError> {
        sqlx::query(
            "INSERT INTO sentiment_reading (
                id,
                profile_id,
                contact_id,
                issue,
                score,
                intent_type,
                raw_signal,
                created_at
             ) VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&reading.id.0)
        .bind(&reading.profile_id.0)
        .bind(&reading.contact_id.0)
        .bind(&reading.issue)
        .bind(i64::from(reading.score))
        .bind(reading.intent_type.as_str())
        .bind(&reading.raw_signal)
        .bind(reading.created_at.to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn list_for_contact(
        &self,
        contact_id: &ContactId,
    ) -> Result<Vec<SentimentReading>, RepositoryError> {
        let rows = sqlx::query(
            "SELECT id, profile_id, contact_id, issue, score, intent_type, raw_signal, created_at
             FROM sentiment_reading
             WHERE contact_id = ?
             ORDER BY rowid ASC",
        )
        .bind(&contact_id.0)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(reading_from_row).collect()
    }
}

fn reading_from_row(row: SqliteRow) -> Result<SentimentReading, RepositoryError> {
    let intent_raw = row.try_get::<String, _>("intent_type")?;
    let intent_type = IntentType::parse(&intent_raw)
        .ok_or_else(|| RepositoryError::Decode(format!("unknown intent type `{intent_raw}`")))?;
    let score_raw = row.try_get::<i64, _>("score")?;
    let score = i16::try_from(score_raw)
        .map_err(|_| RepositoryError::Decode(format!("sentiment score out of range: {score_raw}")))?;

    Ok(SentimentReading {
        id: SentimentReadingId(row.try_get("id")?),
        profile_id: ProfileId(row.try_get("profile_id")?),
        contact_id: ContactId(row.try_get("contact_id")?),
        issue: row.try_get("issue")?,
        score,
        intent_type,
        raw_signal: row.try_get("raw_signal")?,
        created_at: parse_timestamp("created_at", row.try_get("created_at")?)?,
    })
}
