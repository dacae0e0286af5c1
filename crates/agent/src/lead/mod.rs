//! Lead discovery: query construction, fetch, mode selection, extraction and
//! contact materialization.

pub mod extract;
pub mod fetch;
pub mod materialize;
pub mod query;

use async_trait::async_trait;
use canvass_core::chrono::{Datelike, Utc};
use canvass_core::{ActivityEvent, ActivityType, AgentRunId, AgentType, Contact, Profile};
use canvass_providers::CompletionOptions;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{info, warn};

use crate::crm_sync::sync_succeeded;
use crate::error::AgentError;
use crate::executor::{decode_input, AgentContext, AgentExecutor, AgentOutcome};

use self::extract::{parse_leads, system_prompt, user_message, ExtractedLead};
use self::fetch::run_tasks;
use self::materialize::materialize;
use self::query::{build_tasks, Recency};

/// Extraction regime, chosen solely by whether any content was fetched.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PipelineMode {
    Scraped,
    AiProspecting,
}

impl PipelineMode {
    pub fn select(items_fetched: usize) -> Self {
        if items_fetched > 0 {
            Self::Scraped
        } else {
            Self::AiProspecting
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Scraped => "scraped",
            Self::AiProspecting => "ai_prospecting",
        }
    }

    pub fn fallback_source(&self) -> &'static str {
        match self {
            Self::Scraped => "web_scrape",
            Self::AiProspecting => "ai_prospecting",
        }
    }
}

#[derive(Clone, Debug, Default, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct LeadRequest {
    pub sources: Vec<String>,
    pub keywords: Vec<String>,
    pub max_leads: Option<usize>,
    pub recency: Option<String>,
}

/// Scrape-error labels carried on the single `scrape_errors` event.
const REPORTED_FAILURE_LABELS: usize = 3;
const EXTRACTION_TEMPERATURE: f32 = 0.2;
const EXTRACTION_MAX_TOKENS: u32 = 4_096;

pub struct LeadDiscovery {
    context: AgentContext,
}

impl LeadDiscovery {
    pub fn new(context: AgentContext) -> Self {
        Self { context }
    }

    async fn emit(&self, run_id: &AgentRunId, event: ActivityEvent) {
        self.context.activity.emit(event.for_run(run_id)).await;
    }

    /// Pushes new contacts to the profile's CRM and stores the returned external ids.
    async fn push_to_crm(
        &self,
        run_id: &AgentRunId,
        profile: &Profile,
        contacts: &mut [Contact],
    ) {
        if contacts.is_empty() {
            return;
        }
        let Some(crm) = self.context.crm.provider_for(run_id, &profile.id).await else {
            return;
        };
        for contact in contacts.iter_mut() {
            let pushed = crm.push_contact(contact).await;
            let Some(pushed) = sync_succeeded(run_id, "push_contact", pushed) else {
                continue;
            };
            contact.crm_external_id = Some(pushed.external_id);
            contact.updated_at = Utc::now();
            if let Err(error) = self.context.contacts.save(contact.clone()).await {
                warn!(
                    event_name = "agent.crm.external_id_not_saved",
                    run_id = %run_id,
                    contact_id = %contact.id.0,
                    error = %error,
                    "crm id could not be stored on contact"
                );
            }
        }
    }
}

#[async_trait]
impl AgentExecutor for LeadDiscovery {
    fn agent_type(&self) -> AgentType {
        AgentType::LeadDiscovery
    }

    async fn perform(
        &self,
        run_id: &AgentRunId,
        profile: &Profile,
        input: &Value,
    ) -> Result<AgentOutcome, AgentError> {
        let request: LeadRequest = decode_input(input)?;
        let max_leads = request.max_leads.unwrap_or(self.context.default_max_leads);
        let recency = Recency::resolve(request.recency.as_deref(), profile.mode);

        let tasks =
            build_tasks(profile, &request.sources, &request.keywords, recency, Utc::now().year());
        self.emit(
            run_id,
            ActivityEvent::new(
                profile.id.clone(),
                ActivityType::Scanning,
                format!("Scanning {} sources", tasks.len()),
            ),
        )
        .await;

        let discovery = self.context.providers.discovery();
        let report = run_tasks(discovery, &tasks).await;
        if !report.failures.is_empty() {
            let labels: Vec<&str> = report
                .failures
                .iter()
                .take(REPORTED_FAILURE_LABELS)
                .map(|failure| failure.label.as_str())
                .collect();
            self.emit(
                run_id,
                ActivityEvent::new(
                    profile.id.clone(),
                    ActivityType::ScrapeErrors,
                    format!("{} sources could not be read", report.failures.len()),
                )
                .with_detail(labels.join(", ")),
            )
            .await;
        }

        let mode = PipelineMode::select(report.items.len());
        self.emit(
            run_id,
            ActivityEvent::new(
                profile.id.clone(),
                ActivityType::Analyzing,
                match mode {
                    PipelineMode::Scraped => {
                        format!("Analyzing {} collected items", report.items.len())
                    }
                    PipelineMode::AiProspecting => "Generating simulated prospects".to_string(),
                },
            ),
        )
        .await;

        let completion = self
            .context
            .providers
            .completion()
            .complete(
                &system_prompt(profile, mode, recency),
                &user_message(profile, &report.items, max_leads),
                &CompletionOptions::default()
                    .with_temperature(EXTRACTION_TEMPERATURE)
                    .with_max_tokens(EXTRACTION_MAX_TOKENS),
            )
            .await?;

        let mut leads: Vec<ExtractedLead> = match parse_leads(&completion.text) {
            Ok(leads) => leads,
            Err(error) => {
                warn!(
                    event_name = "agent.lead.extraction_unparseable",
                    run_id = %run_id,
                    error = %error,
                    "model response yielded no leads"
                );
                Vec::new()
            }
        };
        leads.truncate(max_leads);

        let now = Utc::now();
        let mut contacts = Vec::with_capacity(leads.len());
        for lead in leads {
            let contact = materialize(profile, lead, mode, now);
            self.context.contacts.save(contact.clone()).await?;
            self.emit(
                run_id,
                ActivityEvent::new(
                    profile.id.clone(),
                    ActivityType::LeadFound,
                    format!("New lead: {}", contact.name),
                )
                .for_contact(&contact.id)
                .with_detail(contact.source.clone()),
            )
            .await;
            contacts.push(contact);
        }

        self.push_to_crm(run_id, profile, &mut contacts).await;

        info!(
            event_name = "agent.lead.finished",
            run_id = %run_id,
            mode = mode.as_str(),
            tasks = tasks.len(),
            items = report.items.len(),
            failures = report.failures.len(),
            leads = contacts.len(),
            "lead discovery finished"
        );

        let contact_ids: Vec<&str> = contacts.iter().map(|contact| contact.id.0.as_str()).collect();
        Ok(AgentOutcome {
            output: json!({
                "mode": mode.as_str(),
                "leads_found": contacts.len(),
                "contact_ids": contact_ids,
                "queries_built": tasks.len(),
                "items_fetched": report.items.len(),
                "errors": report.failures,
                "recency": recency.as_str(),
            }),
            tokens_used: completion.tokens_used,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::PipelineMode;

    #[test]
    fn mode_is_scraped_only_when_something_was_fetched() {
        assert_eq!(PipelineMode::select(0), PipelineMode::AiProspecting);
        assert_eq!(PipelineMode::select(1), PipelineMode::Scraped);
        assert_eq!(PipelineMode::select(12), PipelineMode::Scraped);
    }
}
