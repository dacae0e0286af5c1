use std::sync::Arc;

use async_trait::async_trait;
use canvass_core::{
    ActivityEvent, ActivityType, AgentRunId, AgentType, Contact, ContactId, DomainError, Profile,
};
use canvass_db::repositories::ContactRepository;
use canvass_providers::ProviderRegistry;
use serde_json::Value;
use tracing::{info, warn};

use crate::activity::ActivityEmitter;
use crate::crm_sync::CrmSync;
use crate::error::AgentError;
use crate::intel::IntelReport;
use crate::lead::LeadDiscovery;
use crate::ledger::RunLedger;
use crate::outreach::OutreachWriter;
use crate::sentiment::SentimentRecorder;
use crate::sentiment_scan::SentimentScan;

/// Everything an executor may touch, built once and shared by all runs.
#[derive(Clone)]
pub struct AgentContext {
    pub providers: ProviderRegistry,
    pub contacts: Arc<dyn ContactRepository>,
    pub ledger: RunLedger,
    pub activity: ActivityEmitter,
    pub sentiment: SentimentRecorder,
    pub crm: CrmSync,
    pub default_max_leads: usize,
}

/// What a successful executor body hands back to the shared contract.
#[derive(Clone, Debug, PartialEq)]
pub struct AgentOutcome {
    pub output: Value,
    pub tokens_used: u32,
}

#[async_trait]
pub trait AgentExecutor: Send + Sync {
    fn agent_type(&self) -> AgentType;

    /// The variant-specific body. Terminal ledger writes are not its concern.
    async fn perform(
        &self,
        run_id: &AgentRunId,
        profile: &Profile,
        input: &Value,
    ) -> Result<AgentOutcome, AgentError>;
}

/// Closed factory from `agent_type` to executor, plus the shared execute contract.
#[derive(Clone)]
pub struct AgentRegistry {
    context: AgentContext,
}

impl AgentRegistry {
    pub fn new(context: AgentContext) -> Self {
        Self { context }
    }

    pub fn context(&self) -> &AgentContext {
        &self.context
    }

    pub fn executor(&self, agent_type: AgentType) -> Box<dyn AgentExecutor> {
        let context = self.context.clone();
        match agent_type {
            AgentType::LeadDiscovery => Box::new(LeadDiscovery::new(context)),
            AgentType::OutreachWriter => Box::new(OutreachWriter::new(context)),
            AgentType::IntelReport => Box::new(IntelReport::new(context)),
            AgentType::SentimentScan => Box::new(SentimentScan::new(context)),
        }
    }

    /// Runs one executor to its single terminal ledger write. Errors are recorded with
    /// `fail`, surfaced as an `agent_error` activity and returned to the caller.
    pub async fn execute(
        &self,
        agent_type: AgentType,
        run_id: &AgentRunId,
        profile: &Profile,
        input: &Value,
    ) -> Result<(), AgentError> {
        let stray = profile.stray_mode_fields();
        if !stray.is_empty() {
            warn!(
                event_name = "agent.profile.stray_mode_fields",
                run_id = %run_id,
                profile_id = %profile.id.0,
                fields = ?stray,
                "inactive-mode fields are populated and will be ignored"
            );
        }

        let executor = self.executor(agent_type);
        let activity = &self.context.activity;
        activity
            .emit(
                ActivityEvent::new(
                    profile.id.clone(),
                    ActivityType::AgentStart,
                    format!("{} started", display_name(agent_type)),
                )
                .for_run(run_id),
            )
            .await;

        match executor.perform(run_id, profile, input).await {
            Ok(outcome) => {
                self.context.ledger.complete(run_id, outcome.output, outcome.tokens_used).await?;
                activity
                    .emit(
                        ActivityEvent::new(
                            profile.id.clone(),
                            ActivityType::AgentComplete,
                            format!("{} finished", display_name(agent_type)),
                        )
                        .for_run(run_id),
                    )
                    .await;
                info!(
                    event_name = "agent.execute.completed",
                    run_id = %run_id,
                    agent_type = agent_type.as_str(),
                    "executor finished"
                );
                Ok(())
            }
            Err(error) => {
                let message = error.to_string();
                activity
                    .emit(
                        ActivityEvent::new(
                            profile.id.clone(),
                            ActivityType::AgentError,
                            format!("{} failed", display_name(agent_type)),
                        )
                        .for_run(run_id)
                        .with_detail(message.clone()),
                    )
                    .await;
                if let Err(ledger_error) = self.context.ledger.fail(run_id, &message).await {
                    warn!(
                        event_name = "agent.execute.fail_write_failed",
                        run_id = %run_id,
                        error = %ledger_error,
                        "could not record run failure"
                    );
                }
                Err(error)
            }
        }
    }
}

pub fn display_name(agent_type: AgentType) -> &'static str {
    match agent_type {
        AgentType::LeadDiscovery => "Lead discovery",
        AgentType::OutreachWriter => "Outreach writer",
        AgentType::IntelReport => "Intel report",
        AgentType::SentimentScan => "Sentiment scan",
    }
}

/// Reads an optional `contact_id` string from run input.
pub(crate) fn input_contact_id(input: &Value) -> Option<ContactId> {
    input
        .get("contact_id")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .map(|id| ContactId(id.to_string()))
}

/// Loads the run's target contact and checks it belongs to the profile.
pub(crate) async fn load_contact(
    context: &AgentContext,
    profile: &Profile,
    input: &Value,
) -> Result<Contact, AgentError> {
    let contact_id = input_contact_id(input)
        .ok_or_else(|| DomainError::InvalidInput("contact_id is required".to_string()))?;
    let contact = context
        .contacts
        .find_by_id(&contact_id)
        .await?
        .ok_or_else(|| AgentError::ContactNotFound(contact_id.0.clone()))?;
    if contact.profile_id != profile.id {
        return Err(DomainError::ContactOutsideProfile {
            contact_id: contact_id.0,
            profile_id: profile.id.0.clone(),
        }
        .into());
    }
    Ok(contact)
}

/// Decodes run input into a typed request; an absent or null input means all defaults.
pub(crate) fn decode_input<T>(input: &Value) -> Result<T, AgentError>
where
    T: serde::de::DeserializeOwned + Default,
{
    if input.is_null() {
        return Ok(T::default());
    }
    serde_json::from_value(input.clone())
        .map_err(|error| DomainError::InvalidInput(error.to_string()).into())
}
