use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::contact::ContactId;
use crate::domain::profile::ProfileId;
use crate::domain::run::AgentRunId;

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ActivityEventId(pub String);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivityType {
    AgentStart,
    Scanning,
    ScrapeErrors,
    Analyzing,
    LeadFound,
    MessageDrafted,
    ReportReady,
    SentimentRecorded,
    AgentComplete,
    AgentError,
}

impl ActivityType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AgentStart => "agent_start",
            Self::Scanning => "scanning",
            Self::ScrapeErrors => "scrape_errors",
            Self::Analyzing => "analyzing",
            Self::LeadFound => "lead_found",
            Self::MessageDrafted => "message_drafted",
            Self::ReportReady => "report_ready",
            Self::SentimentRecorded => "sentiment_recorded",
            Self::AgentComplete => "agent_complete",
            Self::AgentError => "agent_error",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "agent_start" => Some(Self::AgentStart),
            "scanning" => Some(Self::Scanning),
            "scrape_errors" => Some(Self::ScrapeErrors),
            "analyzing" => Some(Self::Analyzing),
            "lead_found" => Some(Self::LeadFound),
            "message_drafted" => Some(Self::MessageDrafted),
            "report_ready" => Some(Self::ReportReady),
            "sentiment_recorded" => Some(Self::SentimentRecorded),
            "agent_complete" => Some(Self::AgentComplete),
            "agent_error" => Some(Self::AgentError),
            _ => None,
        }
    }

    /// Default (icon, color) display hints for feed renderers.
    pub fn display_hints(&self) -> (&'static str, &'static str) {
        match self {
            Self::AgentStart => ("play", "blue"),
            Self::Scanning => ("search", "blue"),
            Self::ScrapeErrors => ("alert-triangle", "amber"),
            Self::Analyzing => ("cpu", "purple"),
            Self::LeadFound => ("user-plus", "green"),
            Self::MessageDrafted => ("mail", "green"),
            Self::ReportReady => ("file-text", "green"),
            Self::SentimentRecorded => ("activity", "teal"),
            Self::AgentComplete => ("check-circle", "green"),
            Self::AgentError => ("x-circle", "red"),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActivityEvent {
    pub id: ActivityEventId,
    pub profile_id: ProfileId,
    pub agent_run_id: Option<AgentRunId>,
    pub contact_id: Option<ContactId>,
    pub event_type: ActivityType,
    pub icon: String,
    pub color: String,
    pub title: String,
    pub detail: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl ActivityEvent {
    pub fn new(profile_id: ProfileId, event_type: ActivityType, title: impl Into<String>) -> Self {
        let (icon, color) = event_type.display_hints();
        Self {
            id: ActivityEventId(Uuid::new_v4().to_string()),
            profile_id,
            agent_run_id: None,
            contact_id: None,
            event_type,
            icon: icon.to_string(),
            color: color.to_string(),
            title: title.into(),
            detail: None,
            created_at: Utc::now(),
        }
    }

    pub fn for_run(mut self, run_id: &AgentRunId) -> Self {
        self.agent_run_id = Some(run_id.clone());
        self
    }

    pub fn for_contact(mut self, contact_id: &ContactId) -> Self {
        self.contact_id = Some(contact_id.clone());
        self
    }

    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }
}
