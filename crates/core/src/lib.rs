pub mod config;
pub mod domain;
pub mod errors;

pub use chrono;

pub use domain::activity::{ActivityEvent, ActivityEventId, ActivityType};
pub use domain::contact::{Contact, ContactId, DonorIntent, LeadStatus, VoterIntent};
pub use domain::integration::{Integration, IntegrationId};
pub use domain::profile::{ModeFields, Profile, ProfileId, ProfileMode};
pub use domain::run::{AgentRun, AgentRunId, AgentType, RunStatus};
pub use domain::sentiment::{IntentType, SentimentReading, SentimentReadingId};
pub use errors::DomainError;
