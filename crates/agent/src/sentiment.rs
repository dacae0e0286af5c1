use std::sync::Arc;

use canvass_core::chrono::Utc;
use canvass_core::domain::sentiment::score_in_range;
use canvass_core::{
    ContactId, DomainError, IntentType, ProfileId, SentimentReading, SentimentReadingId,
};
use canvass_db::repositories::SentimentRepository;
use tracing::debug;
use uuid::Uuid;

use crate::error::AgentError;

/// One observed signal about a contact's stance on an issue.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SentimentSignal {
    pub issue: String,
    pub score: i16,
    pub intent_type: IntentType,
    pub raw_signal: String,
}

/// Appends readings; repeated signals for the same issue add rows, nothing is merged.
#[derive(Clone)]
pub struct SentimentRecorder {
    readings: Arc<dyn SentimentRepository>,
}

impl SentimentRecorder {
    pub fn new(readings: Arc<dyn SentimentRepository>) -> Self {
        Self { readings }
    }

    pub async fn record(
        &self,
        profile_id: &ProfileId,
        contact_id: &ContactId,
        signal: SentimentSignal,
    ) -> Result<SentimentReading, AgentError> {
        if !score_in_range(signal.score) {
            return Err(DomainError::SentimentOutOfRange(signal.score).into());
        }

        let reading = SentimentReading {
            id: SentimentReadingId(Uuid::new_v4().to_string()),
            profile_id: profile_id.clone(),
            contact_id: contact_id.clone(),
            issue: signal.issue,
            score: signal.score,
            intent_type: signal.intent_type,
            raw_signal: signal.raw_signal,
            created_at: Utc::now(),
        };
        self.readings.append(reading.clone()).await?;

        debug!(
            event_name = "agent.sentiment.recorded",
            contact_id = %contact_id.0,
            issue = %reading.issue,
            score = reading.score,
            "sentiment reading appended"
        );
        Ok(reading)
    }
}
