use canvass_core::chrono::{DateTime, Utc};
use canvass_core::domain::contact::{Contact, ContactId, LeadStatus};
use canvass_core::domain::profile::{Profile, ProfileId, ProfileMode};

use crate::{connect_with_settings, migrations, DbPool};

pub(crate) async fn setup_pool() -> DbPool {
    let pool = connect_with_settings("sqlite::memory:", 1, 30).await.expect("connect test pool");
    migrations::run_pending(&pool).await.expect("run migrations");
    pool
}

pub(crate) fn parse_ts(value: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(value).expect("valid rfc3339").with_timezone(&Utc)
}

pub(crate) fn sample_profile(id: &str, mode: ProfileMode) -> Profile {
    let political = mode == ProfileMode::Political;
    Profile {
        id: ProfileId(id.to_string()),
        name: if political { "Friends of Ana Reyes" } else { "Harbour Plumbing" }.to_string(),
        mode,
        context: Some("Family-run since 1998".to_string()),
        target_persona: Some("Homeowners in older houses".to_string()),
        location: Some("Halifax".to_string()),
        knowledge_base: vec!["Licensed and insured".to_string()],
        service_offerings: if political { Vec::new() } else { vec!["drain cleaning".to_string()] },
        business_objections: Vec::new(),
        riding: political.then(|| "Halifax West".to_string()),
        candidate_name: political.then(|| "Ana Reyes".to_string()),
        policy_pillars: if political { vec!["housing".to_string()] } else { Vec::new() },
        political_objections: Vec::new(),
        created_at: parse_ts("2026-10-01T12:00:00Z"),
        updated_at: parse_ts("2026-10-01T12:00:00Z"),
    }
}

pub(crate) fn sample_contact(id: &str, profile_id: &ProfileId) -> Contact {
    Contact {
        id: ContactId(id.to_string()),
        profile_id: profile_id.clone(),
        name: "Jane Doe".to_string(),
        email: Some("jane@example.com".to_string()),
        phone: None,
        social_handle: Some("@janedoe".to_string()),
        profile_url: Some("https://example.com/jane".to_string()),
        source: "web_scrape".to_string(),
        relevance: 82,
        lead_status: Some(LeadStatus::Warm),
        voter_intent: None,
        donor_intent: None,
        tags: vec!["lead_discovery".to_string(), "business".to_string()],
        notes: None,
        hook: Some("Asked for plumber recommendations".to_string()),
        crm_external_id: None,
        created_at: parse_ts("2026-10-01T12:05:00Z"),
        updated_at: parse_ts("2026-10-01T12:05:00Z"),
    }
}
