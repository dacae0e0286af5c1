use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::profile::ProfileId;

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ContactId(pub String);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LeadStatus {
    Cold,
    Warm,
    Hot,
    Converted,
    Lost,
}

impl LeadStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Cold => "cold",
            Self::Warm => "warm",
            Self::Hot => "hot",
            Self::Converted => "converted",
            Self::Lost => "lost",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "cold" => Some(Self::Cold),
            "warm" => Some(Self::Warm),
            "hot" => Some(Self::Hot),
            "converted" => Some(Self::Converted),
            "lost" => Some(Self::Lost),
            _ => None,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VoterIntent {
    Unknown,
    Supporter,
    Leaning,
    Undecided,
    Opposed,
}

impl VoterIntent {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Unknown => "unknown",
            Self::Supporter => "supporter",
            Self::Leaning => "leaning",
            Self::Undecided => "undecided",
            Self::Opposed => "opposed",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "unknown" => Some(Self::Unknown),
            "supporter" => Some(Self::Supporter),
            "leaning" => Some(Self::Leaning),
            "undecided" => Some(Self::Undecided),
            "opposed" => Some(Self::Opposed),
            _ => None,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DonorIntent {
    None,
    Potential,
    Likely,
    Committed,
}

impl DonorIntent {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Potential => "potential",
            Self::Likely => "likely",
            Self::Committed => "committed",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "none" => Some(Self::None),
            "potential" => Some(Self::Potential),
            "likely" => Some(Self::Likely),
            "committed" => Some(Self::Committed),
            _ => None,
        }
    }
}

/// A discovered lead (business) or constituent (political).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contact {
    pub id: ContactId,
    pub profile_id: ProfileId,
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub social_handle: Option<String>,
    pub profile_url: Option<String>,
    pub source: String,
    pub relevance: u8,
    pub lead_status: Option<LeadStatus>,
    pub voter_intent: Option<VoterIntent>,
    pub donor_intent: Option<DonorIntent>,
    pub tags: Vec<String>,
    pub notes: Option<String>,
    pub hook: Option<String>,
    pub crm_external_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Contact {
    /// First whitespace-separated token of the name, used by CRM payloads.
    pub fn first_name(&self) -> &str {
        self.name.split_whitespace().next().unwrap_or("")
    }

    pub fn last_name(&self) -> &str {
        let trimmed = self.name.trim();
        match trimmed.split_once(char::is_whitespace) {
            Some((_, rest)) => rest.trim(),
            None => "",
        }
    }
}
