use sqlx::migrate::{MigrateError, Migrator};

use crate::DbPool;

pub static MIGRATOR: Migrator = sqlx::migrate!("../../migrations");

pub async fn run_pending(pool: &DbPool) -> Result<(), MigrateError> {
    MIGRATOR.run(pool).await
}

#[cfg(test)]
mod tests {
    use sqlx::Row;

    use super::run_pending;
    use crate::{connect_with_settings, migrations::MIGRATOR};

    const MANAGED_TABLES: &[&str] =
        &["profile", "contact", "agent_run", "activity_event", "sentiment_reading", "integration"];

    const MANAGED_SCHEMA_OBJECTS: &[&str] = &[
        "profile",
        "contact",
        "agent_run",
        "activity_event",
        "sentiment_reading",
        "integration",
        "idx_contact_profile_id",
        "idx_agent_run_profile_id",
        "idx_agent_run_status",
        "idx_activity_event_profile_id",
        "idx_activity_event_agent_run_id",
        "idx_sentiment_reading_contact_id",
        "idx_integration_profile_id",
    ];

    #[tokio::test]
    async fn migrations_create_baseline_tables() {
        let pool = connect_with_settings("sqlite::memory:", 1, 30).await.expect("connect");
        run_pending(&pool).await.expect("run migrations");

        for table in MANAGED_TABLES {
            let count = table_count(&pool, table).await;
            assert_eq!(count, 1, "table `{table}` should exist after migrating");
        }
    }

    #[tokio::test]
    async fn migrations_are_reversible() {
        let pool = connect_with_settings("sqlite::memory:", 1, 30).await.expect("connect");
        run_pending(&pool).await.expect("run migrations");

        MIGRATOR.undo(&pool, 0).await.expect("undo migrations");

        for table in MANAGED_TABLES {
            assert_eq!(table_count(&pool, table).await, 0, "table `{table}` should be dropped");
        }
    }

    #[tokio::test]
    async fn migrations_up_down_up_preserves_schema_signature() {
        let pool = connect_with_settings("sqlite::memory:", 1, 30).await.expect("connect");
        run_pending(&pool).await.expect("run migrations");

        let initial_signature = managed_schema_signature(&pool).await;
        assert_eq!(
            initial_signature.len(),
            MANAGED_SCHEMA_OBJECTS.len(),
            "initial migration pass should create all managed schema objects",
        );

        MIGRATOR.undo(&pool, 0).await.expect("undo migrations");
        assert!(
            managed_schema_signature(&pool).await.is_empty(),
            "managed schema objects should be removed after full undo",
        );

        run_pending(&pool).await.expect("re-run migrations");
        assert_eq!(
            managed_schema_signature(&pool).await,
            initial_signature,
            "up/down/up should preserve migration-managed schema signature",
        );
    }

    #[tokio::test]
    async fn score_check_constraint_rejects_out_of_range_rows() {
        let pool = connect_with_settings("sqlite::memory:", 1, 30).await.expect("connect");
        run_pending(&pool).await.expect("run migrations");

        let timestamp = "2026-10-01T12:00:00Z";
        sqlx::query(
            "INSERT INTO profile (id, name, mode, created_at, updated_at)
             VALUES ('P-1', 'Riding Association', 'political', ?, ?)",
        )
        .bind(timestamp)
        .bind(timestamp)
        .execute(&pool)
        .await
        .expect("insert profile");
        sqlx::query(
            "INSERT INTO contact (id, profile_id, name, source, created_at, updated_at)
             VALUES ('C-1', 'P-1', 'Jane Doe', 'manual', ?, ?)",
        )
        .bind(timestamp)
        .bind(timestamp)
        .execute(&pool)
        .await
        .expect("insert contact");

        let result = sqlx::query(
            "INSERT INTO sentiment_reading
                (id, profile_id, contact_id, issue, score, intent_type, raw_signal, created_at)
             VALUES ('S-1', 'P-1', 'C-1', 'housing', 140, 'voter', 'signal', ?)",
        )
        .bind(timestamp)
        .execute(&pool)
        .await;

        assert!(result.is_err(), "score outside -100..=100 should violate the check constraint");
    }

    async fn table_count(pool: &sqlx::SqlitePool, table: &str) -> i64 {
        sqlx::query(
            "SELECT COUNT(*) AS count FROM sqlite_master WHERE type = 'table' AND name = ?",
        )
        .bind(table)
        .fetch_one(pool)
        .await
        .expect("check table")
        .get::<i64, _>("count")
    }

    async fn managed_schema_signature(pool: &sqlx::SqlitePool) -> Vec<(String, String, String)> {
        let mut signature: Vec<(String, String, String)> = sqlx::query(
            "SELECT type, name, IFNULL(sql, '') AS sql
             FROM sqlite_master
             WHERE type IN ('table', 'index')",
        )
        .fetch_all(pool)
        .await
        .expect("load schema objects")
        .into_iter()
        .filter_map(|row| {
            let name = row.get::<String, _>("name");
            if MANAGED_SCHEMA_OBJECTS.contains(&name.as_str()) {
                Some((row.get::<String, _>("type"), name, row.get::<String, _>("sql")))
            } else {
                None
            }
        })
        .collect();
        signature.sort();
        signature
    }
}
