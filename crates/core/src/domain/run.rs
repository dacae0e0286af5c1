use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::domain::contact::ContactId;
use crate::domain::profile::ProfileId;

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AgentRunId(pub String);

impl std::fmt::Display for AgentRunId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// The closed set of agent variants a run can execute.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentType {
    LeadDiscovery,
    OutreachWriter,
    IntelReport,
    SentimentScan,
}

impl AgentType {
    pub const ALL: [AgentType; 4] =
        [Self::LeadDiscovery, Self::OutreachWriter, Self::IntelReport, Self::SentimentScan];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::LeadDiscovery => "lead_discovery",
            Self::OutreachWriter => "outreach_writer",
            Self::IntelReport => "intel_report",
            Self::SentimentScan => "sentiment_scan",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "lead_discovery" => Some(Self::LeadDiscovery),
            "outreach_writer" => Some(Self::OutreachWriter),
            "intel_report" => Some(Self::IntelReport),
            "sentiment_scan" => Some(Self::SentimentScan),
            _ => None,
        }
    }
}

impl std::fmt::Display for AgentType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Queued,
    Running,
    Completed,
    Failed,
}

impl RunStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Queued => "queued",
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "queued" => Some(Self::Queued),
            "running" => Some(Self::Running),
            "completed" => Some(Self::Completed),
            "failed" => Some(Self::Failed),
            _ => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AgentRun {
    pub id: AgentRunId,
    pub profile_id: ProfileId,
    pub contact_id: Option<ContactId>,
    pub agent_type: AgentType,
    pub status: RunStatus,
    pub input_data: Value,
    pub output_data: Option<Value>,
    pub tokens_used: u32,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

#[cfg(test)]
mod tests {
    use super::{AgentType, RunStatus};

    #[test]
    fn agent_type_round_trips_from_storage_encoding() {
        for agent_type in AgentType::ALL {
            assert_eq!(AgentType::parse(agent_type.as_str()), Some(agent_type));
        }
        assert_eq!(AgentType::parse("lead-discovery"), Some(AgentType::LeadDiscovery));
        assert_eq!(AgentType::parse("campaign_planner"), None);
    }

    #[test]
    fn only_completed_and_failed_are_terminal() {
        assert!(!RunStatus::Queued.is_terminal());
        assert!(!RunStatus::Running.is_terminal());
        assert!(RunStatus::Completed.is_terminal());
        assert!(RunStatus::Failed.is_terminal());

        for status in
            [RunStatus::Queued, RunStatus::Running, RunStatus::Completed, RunStatus::Failed]
        {
            assert_eq!(RunStatus::parse(status.as_str()), Some(status));
        }
    }
}
