//! Stage E: extracted leads become Contact rows with mode-specific defaults.

use canvass_core::chrono::{DateTime, Utc};
use canvass_core::{
    AgentType, Contact, ContactId, DonorIntent, LeadStatus, Profile, ProfileMode, VoterIntent,
};
use uuid::Uuid;

use super::extract::ExtractedLead;
use super::PipelineMode;

pub const DEFAULT_RELEVANCE: u8 = 50;
pub const WARM_THRESHOLD: u8 = 70;
const UNKNOWN_NAME: &str = "Unknown";

pub fn materialize(
    profile: &Profile,
    lead: ExtractedLead,
    mode: PipelineMode,
    now: DateTime<Utc>,
) -> Contact {
    let relevance = lead.relevance.map(clamp_relevance).unwrap_or(DEFAULT_RELEVANCE);
    let (lead_status, voter_intent, donor_intent) = match profile.mode {
        ProfileMode::Business => {
            let status =
                if relevance >= WARM_THRESHOLD { LeadStatus::Warm } else { LeadStatus::Cold };
            (Some(status), None, None)
        }
        ProfileMode::Political => (None, Some(VoterIntent::Unknown), Some(DonorIntent::None)),
    };

    let tags = lead
        .tags
        .map(clean_list)
        .filter(|tags| !tags.is_empty())
        .unwrap_or_else(|| {
            vec![AgentType::LeadDiscovery.as_str().to_string(), mode.as_str().to_string()]
        });

    Contact {
        id: ContactId(Uuid::new_v4().to_string()),
        profile_id: profile.id.clone(),
        name: non_blank(lead.name).unwrap_or_else(|| UNKNOWN_NAME.to_string()),
        email: non_blank(lead.email),
        phone: non_blank(lead.phone),
        social_handle: non_blank(lead.social_handle),
        profile_url: non_blank(lead.profile_url),
        source: non_blank(lead.source).unwrap_or_else(|| mode.fallback_source().to_string()),
        relevance,
        lead_status,
        voter_intent,
        donor_intent,
        tags,
        notes: non_blank(lead.notes),
        hook: non_blank(lead.hook),
        crm_external_id: None,
        created_at: now,
        updated_at: now,
    }
}

fn clamp_relevance(score: f64) -> u8 {
    if score.is_nan() {
        return DEFAULT_RELEVANCE;
    }
    score.round().clamp(0.0, 100.0) as u8
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.map(|value| value.trim().to_string()).filter(|value| !value.is_empty())
}

fn clean_list(values: Vec<String>) -> Vec<String> {
    values.into_iter().filter_map(|value| non_blank(Some(value))).collect()
}
