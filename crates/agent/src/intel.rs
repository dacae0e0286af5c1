use async_trait::async_trait;
use canvass_core::{ActivityEvent, ActivityType, AgentRunId, AgentType, Profile, ProfileMode};
use canvass_providers::CompletionOptions;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::error::AgentError;
use crate::executor::{decode_input, AgentContext, AgentExecutor, AgentOutcome};
use crate::lead::fetch::{run_tasks, FetchedItem};
use crate::lead::query::{dedupe, FetchTask};
use crate::prompts::{bounded, profile_brief, MAX_ITEM_CHARS, MAX_PROMPT_CONTENT_CHARS};

const INTEL_TEMPERATURE: f32 = 0.3;
const INTEL_MAX_TOKENS: u32 = 3_000;

#[derive(Clone, Debug, Default, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct IntelRequest {
    /// Competitors (business) or opponents (political) to cover.
    pub subjects: Vec<String>,
    /// Pages to read before writing; unreadable ones are listed in the output.
    pub sources: Vec<String>,
    pub focus: Option<String>,
}

/// Competitor or opposition intelligence, optionally grounded in scraped pages.
pub struct IntelReport {
    context: AgentContext,
}

impl IntelReport {
    pub fn new(context: AgentContext) -> Self {
        Self { context }
    }
}

pub fn system_prompt(profile: &Profile) -> String {
    let brief = match profile.mode {
        ProfileMode::Business => {
            "You are a competitive analyst for a local service business. Produce a concise \
             report with sections: Market snapshot, Competitors (positioning, pricing signals, \
             weaknesses), Opportunities, Recommended next moves."
        }
        ProfileMode::Political => {
            "You are an opposition and issue researcher for a local campaign. Produce a concise \
             report with sections: Issue landscape, Opponents (positions, record, recent \
             statements), Constituent concerns, Recommended messaging."
        }
    };
    format!(
        "{brief}\nOnly state facts that appear in the supplied material; label anything else as \
         an assumption. Use markdown headings.\n\nProfile:\n{}",
        profile_brief(profile)
    )
}

pub fn user_message(request: &IntelRequest, items: &[FetchedItem]) -> String {
    let mut message = String::new();
    if !request.subjects.is_empty() {
        message.push_str(&format!("Cover: {}\n", request.subjects.join(", ")));
    }
    let focus = request.focus.as_deref().map(str::trim).filter(|focus| !focus.is_empty());
    if let Some(focus) = focus {
        message.push_str(&format!("Focus: {}\n", bounded(focus, MAX_ITEM_CHARS)));
    }
    if items.is_empty() {
        message.push_str("No source material was collected; rely on the profile only.\n");
        return message;
    }

    let mut budget = MAX_PROMPT_CONTENT_CHARS;
    for item in items {
        if budget == 0 {
            break;
        }
        let content = bounded(&item.content, budget);
        budget = budget.saturating_sub(content.chars().count());
        message.push_str(&format!("\nSource: {}\n{content}\n", item.source));
    }
    message
}

#[async_trait]
impl AgentExecutor for IntelReport {
    fn agent_type(&self) -> AgentType {
        AgentType::IntelReport
    }

    async fn perform(
        &self,
        run_id: &AgentRunId,
        profile: &Profile,
        input: &Value,
    ) -> Result<AgentOutcome, AgentError> {
        let request: IntelRequest = decode_input(input)?;
        let tasks = dedupe(
            request
                .sources
                .iter()
                .map(|url| url.trim())
                .filter(|url| !url.is_empty())
                .map(|url| FetchTask::Url(url.to_string()))
                .collect(),
        );
        let report = run_tasks(self.context.providers.discovery(), &tasks).await;

        let completion = self
            .context
            .providers
            .completion()
            .complete(
                &system_prompt(profile),
                &user_message(&request, &report.items),
                &CompletionOptions::default()
                    .with_temperature(INTEL_TEMPERATURE)
                    .with_max_tokens(INTEL_MAX_TOKENS),
            )
            .await?;
        let body = completion.text.trim().to_string();
        if body.is_empty() {
            return Err(AgentError::MalformedResponse("empty intel report".to_string()));
        }

        self.context
            .activity
            .emit(
                ActivityEvent::new(
                    profile.id.clone(),
                    ActivityType::ReportReady,
                    "Intel report ready",
                )
                .for_run(run_id)
                .with_detail(format!("{} sources read", report.items.len())),
            )
            .await;

        let sources_used: Vec<&str> = report.items.iter().map(|item| item.source.as_str()).collect();
        Ok(AgentOutcome {
            output: json!({
                "report": body,
                "sources_used": sources_used,
                "errors": report.failures,
            }),
            tokens_used: completion.tokens_used,
        })
    }
}

#[cfg(test)]
mod tests {
    use canvass_core::chrono::Utc;
    use canvass_core::{Profile, ProfileId, ProfileMode};

    use super::{system_prompt, user_message, IntelRequest};
    use crate::lead::fetch::FetchedItem;

    fn profile(mode: ProfileMode) -> Profile {
        Profile {
            id: ProfileId("P-1".to_string()),
            name: "Harbour Plumbing".to_string(),
            mode,
            context: None,
            target_persona: None,
            location: Some("Halifax".to_string()),
            knowledge_base: Vec::new(),
            service_offerings: Vec::new(),
            business_objections: Vec::new(),
            riding: None,
            candidate_name: None,
            policy_pillars: Vec::new(),
            political_objections: Vec::new(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn report_sections_follow_mode() {
        assert!(system_prompt(&profile(ProfileMode::Business)).contains("Competitors"));
        assert!(system_prompt(&profile(ProfileMode::Political)).contains("Opponents"));
    }

    #[test]
    fn message_lists_subjects_and_sources() {
        let request = IntelRequest {
            subjects: vec!["Rapid Rooter".to_string(), "DrainCo".to_string()],
            sources: Vec::new(),
            focus: Some("pricing".to_string()),
        };
        let items = vec![FetchedItem {
            source: "https://rapidrooter.example/pricing".to_string(),
            title: None,
            content: "Flat rate drain clearing from $149".to_string(),
        }];

        let message = user_message(&request, &items);
        assert!(message.starts_with("Cover: Rapid Rooter, DrainCo\nFocus: pricing\n"));
        assert!(message.contains("Source: https://rapidrooter.example/pricing"));

        let empty = user_message(&IntelRequest::default(), &[]);
        assert!(empty.contains("No source material was collected"));
    }
}
