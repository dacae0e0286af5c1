use sqlx::{sqlite::SqliteRow, Row};

use canvass_core::domain::contact::{Contact, ContactId, DonorIntent, LeadStatus, VoterIntent};
use canvass_core::domain::profile::ProfileId;

use super::rows::{encode_string_list, parse_optional_enum, parse_string_list, parse_timestamp};
use super::{ContactRepository, RepositoryError};
use crate::DbPool;

const CONTACT_COLUMNS: &str = "id,
    profile_id,
    name,
    email,
    phone,
    social_handle,
    profile_url,
    source,
    relevance,
    lead_status,
    voter_intent,
    donor_intent,
    tags_json,
    notes,
    hook,
    crm_external_id,
    created_at,
    updated_at";

pub struct SqlContactRepository {
    pool: DbPool,
}

impl SqlContactRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl ContactRepository for SqlContactRepository {
    async fn find_by_id(&self, id: &ContactId) -> Result<Option<Contact>, RepositoryError> {
        let row = sqlx::query(&format!("SELECT {CONTACT_COLUMNS} FROM contact WHERE id = ?"))
            .bind(&id.0)
            .fetch_optional(&self.pool)
            .await?;

        row.map(contact_from_row).transpose()
    }

    async fn save(&self, contact: Contact) -> Result<(), RepositoryError> {
        sqlx::query(&format!(
            "INSERT INTO contact ({CONTACT_COLUMNS})
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
             ON CONFLICT(id) DO UPDATE SET
                name = excluded.name,
                email = excluded.email,
                phone = excluded.phone,
                social_handle = excluded.social_handle,
                profile_url = excluded.profile_url,
                source = excluded.source,
                relevance = excluded.relevance,
                lead_status = excluded.lead_status,
                voter_intent = excluded.voter_intent,
                donor_intent = excluded.donor_intent,
                tags_json = excluded.tags_json,
                notes = excluded.notes,
                hook = excluded.hook,
                crm_external_id = excluded.crm_external_id,
                updated_at = excluded.updated_at"
        ))
        .bind(&contact.id.0)
        .bind(&contact.profile_id.0)
        .bind(&contact.name)
        .bind(contact.email.as_deref())
        .bind(contact.phone.as_deref())
        .bind(contact.social_handle.as_deref())
        .bind(contact.profile_url.as_deref())
        .bind(&contact.source)
        .bind(i64::from(contact.relevance))
        .bind(contact.lead_status.as_ref().map(LeadStatus::as_str))
        .bind(contact.voter_intent.as_ref().map(VoterIntent::as_str))
        .bind(contact.donor_intent.as_ref().map(DonorIntent::as_str))
        .bind(encode_string_list(&contact.tags)?)
        .bind(contact.notes.as_deref())
        .bind(contact.hook.as_deref())
        .bind(contact.crm_external_id.as_deref())
        .bind(contact.created_at.to_rfc3339())
        .bind(contact.updated_at.to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn list_for_profile(
        &self,
        profile_id: &ProfileId,
    ) -> Result<Vec<Contact>, RepositoryError> {
        let rows = sqlx::query(&format!(
            "SELECT {CONTACT_COLUMNS} FROM contact
             WHERE profile_id = ?
             ORDER BY created_at ASC, rowid ASC"
        ))
        .bind(&profile_id.0)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(contact_from_row).collect()
    }
}

fn contact_from_row(row: SqliteRow) -> Result<Contact, RepositoryError> {
    let relevance_raw = row.try_get::<i64, _>("relevance")?;
    let relevance = u8::try_from(relevance_raw)
        .ok()
        .filter(|value| *value <= 100)
        .ok_or_else(|| RepositoryError::Decode(format!("relevance out of range: {relevance_raw}")))?;
    let tags_raw = row.try_get::<String, _>("tags_json")?;

    Ok(Contact {
        id: ContactId(row.try_get("id")?),
        profile_id: ProfileId(row.try_get("profile_id")?),
        name: row.try_get("name")?,
        email: row.try_get("email")?,
        phone: row.try_get("phone")?,
        social_handle: row.try_get("social_handle")?,
        profile_url: row.try_get("profile_url")?,
        source: row.try_get("source")?,
        relevance,
        lead_status: parse_optional_enum(
            "lead_status",
            row.try_get("lead_status")?,
            LeadStatus::parse,
        )?,
        voter_intent: parse_optional_enum(
            "voter_intent",
            row.try_get("voter_intent")?,
            VoterIntent::parse,
        )?,
        donor_intent: parse_optional_enum(
            "donor_intent",
            row.try_get("donor_intent")?,
            DonorIntent::parse,
        )?,
        tags: parse_string_list("tags_json", &tags_raw)?,
        notes: row.try_get("notes")?,
        hook: row.try_get("hook")?,
        crm_external_id: row.try_get("crm_external_id")?,
        created_at: parse_timestamp("created_at", row.try_get("created_at")?)?,
        updated_at: parse_timestamp("updated_at", row.try_get("updated_at")?)?,
    })
}

#[cfg(test)]
mod tests {
    use canvass_core::domain::contact::{ContactId, DonorIntent, VoterIntent};
    use canvass_core::domain::profile::ProfileMode;

    use super::SqlContactRepository;
    use crate::repositories::test_support::{sample_contact, sample_profile, setup_pool};
    use crate::repositories::{ContactRepository, ProfileRepository, SqlProfileRepository};

    #[tokio::test]
    async fn sql_contact_repo_round_trip_and_list() {
        let pool = setup_pool().await;
        let profile = sample_profile("P-BIZ", ProfileMode::Business);
        SqlProfileRepository::new(pool.clone()).save(profile.clone()).await.expect("save profile");

        let repo = SqlContactRepository::new(pool.clone());
        let first = sample_contact("C-1", &profile.id);
        let mut second = sample_contact("C-2", &profile.id);
        second.name = "Omar Haddad".to_string();
        second.created_at = first.created_at + canvass_core::chrono::Duration::minutes(1);
        second.updated_at = second.created_at;

        repo.save(first.clone()).await.expect("save first");
        repo.save(second.clone()).await.expect("save second");

        assert_eq!(repo.find_by_id(&first.id).await.expect("find"), Some(first.clone()));
        assert_eq!(
            repo.list_for_profile(&profile.id).await.expect("list"),
            vec![first, second],
        );

        pool.close().await;
    }

    #[tokio::test]
    async fn sql_contact_repo_persists_political_intents() {
        let pool = setup_pool().await;
        let profile = sample_profile("P-POL", ProfileMode::Political);
        SqlProfileRepository::new(pool.clone()).save(profile.clone()).await.expect("save profile");

        let repo = SqlContactRepository::new(pool.clone());
        let mut contact = sample_contact("C-POL", &profile.id);
        contact.lead_status = None;
        contact.voter_intent = Some(VoterIntent::Leaning);
        contact.donor_intent = Some(DonorIntent::Potential);
        repo.save(contact.clone()).await.expect("save contact");

        let found = repo.find_by_id(&ContactId("C-POL".to_string())).await.expect("find");
        assert_eq!(found.as_ref().and_then(|c| c.voter_intent), Some(VoterIntent::Leaning));
        assert_eq!(found.and_then(|c| c.donor_intent), Some(DonorIntent::Potential));

        pool.close().await;
    }

    #[tokio::test]
    async fn sql_contact_repo_requires_existing_profile() {
        let pool = setup_pool().await;
        let repo = SqlContactRepository::new(pool.clone());
        let orphan = sample_contact(
            "C-ORPHAN",
            &canvass_core::domain::profile::ProfileId("P-MISSING".to_string()),
        );

        assert!(repo.save(orphan).await.is_err(), "foreign key should reject orphan contact");

        pool.close().await;
    }
}
