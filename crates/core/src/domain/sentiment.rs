use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::contact::ContactId;
use crate::domain::profile::ProfileId;

pub const MIN_SENTIMENT_SCORE: i16 = -100;
pub const MAX_SENTIMENT_SCORE: i16 = 100;

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SentimentReadingId(pub String);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IntentType {
    Voter,
    Donor,
}

impl IntentType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Voter => "voter",
            Self::Donor => "donor",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "voter" => Some(Self::Voter),
            "donor" => Some(Self::Donor),
            _ => None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SentimentReading {
    pub id: SentimentReadingId,
    pub profile_id: ProfileId,
    pub contact_id: ContactId,
    pub issue: String,
    pub score: i16,
    pub intent_type: IntentType,
    pub raw_signal: String,
    pub created_at: DateTime<Utc>,
}

pub fn score_in_range(score: i16) -> bool {
    (MIN_SENTIMENT_SCORE..=MAX_SENTIMENT_SCORE).contains(&score)
}
