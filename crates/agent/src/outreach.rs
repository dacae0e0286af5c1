use async_trait::async_trait;
use canvass_core::{
    ActivityEvent, ActivityType, AgentRunId, AgentType, Contact, ModeFields, Profile,
};
use canvass_providers::CompletionOptions;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::crm_sync::sync_succeeded;
use crate::error::AgentError;
use crate::executor::{decode_input, load_contact, AgentContext, AgentExecutor, AgentOutcome};
use crate::prompts::{audience_noun, bounded, profile_brief, MAX_ITEM_CHARS};

const DEFAULT_CHANNEL: &str = "email";
const OUTREACH_TEMPERATURE: f32 = 0.7;
const OUTREACH_MAX_TOKENS: u32 = 1_024;

#[derive(Clone, Debug, Default, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct OutreachRequest {
    pub contact_id: Option<String>,
    pub channel: Option<String>,
    pub instructions: Option<String>,
}

/// Drafts one personalized message for a contact and keeps it on the run output.
pub struct OutreachWriter {
    context: AgentContext,
}

impl OutreachWriter {
    pub fn new(context: AgentContext) -> Self {
        Self { context }
    }
}

pub fn system_prompt(profile: &Profile, channel: &str) -> String {
    let voice = match profile.mode_fields() {
        ModeFields::Business { objections, .. } => {
            let mut voice = "Write as the business owner: helpful, specific, never pushy. \
                Offer one concrete next step."
                .to_string();
            if !objections.is_empty() {
                voice.push_str(&format!(
                    " Pre-empt these objections where natural: {}.",
                    objections.join("; ")
                ));
            }
            voice
        }
        ModeFields::Political { candidate, objections, .. } => {
            let sender = candidate.unwrap_or("the campaign");
            let mut voice = format!(
                "Write on behalf of {sender}: respectful, local, issue-focused. Invite the \
                 constituent to share their view or attend an event. Never ask for money in a \
                 first message."
            );
            if !objections.is_empty() {
                voice.push_str(&format!(" Be ready to address: {}.", objections.join("; ")));
            }
            voice
        }
    };

    format!(
        "You draft short {channel} outreach to a {noun}. {voice}\n\
         Open with the hook so the message is clearly personal. Keep it under 120 words. \
         Return only the message text with no preamble.\n\nProfile:\n{brief}",
        noun = audience_noun(profile.mode),
        brief = profile_brief(profile),
    )
}

pub fn user_message(contact: &Contact, instructions: Option<&str>) -> String {
    let mut lines = vec![format!("Recipient: {}", contact.name)];
    if let Some(hook) = contact.hook.as_deref() {
        lines.push(format!("Hook: {}", bounded(hook, MAX_ITEM_CHARS)));
    }
    if let Some(notes) = contact.notes.as_deref() {
        lines.push(format!("Notes: {}", bounded(notes, MAX_ITEM_CHARS)));
    }
    lines.push(format!("Found via: {}", contact.source));
    if let Some(instructions) = instructions.map(str::trim).filter(|text| !text.is_empty()) {
        lines.push(format!("Extra instructions: {}", bounded(instructions, MAX_ITEM_CHARS)));
    }
    lines.join("\n")
}

#[async_trait]
impl AgentExecutor for OutreachWriter {
    fn agent_type(&self) -> AgentType {
        AgentType::OutreachWriter
    }

    async fn perform(
        &self,
        run_id: &AgentRunId,
        profile: &Profile,
        input: &Value,
    ) -> Result<AgentOutcome, AgentError> {
        let request: OutreachRequest = decode_input(input)?;
        let contact = load_contact(&self.context, profile, input).await?;
        let channel = request
            .channel
            .as_deref()
            .map(str::trim)
            .filter(|channel| !channel.is_empty())
            .unwrap_or(DEFAULT_CHANNEL);

        let completion = self
            .context
            .providers
            .completion()
            .complete(
                &system_prompt(profile, channel),
                &user_message(&contact, request.instructions.as_deref()),
                &CompletionOptions::default()
                    .with_temperature(OUTREACH_TEMPERATURE)
                    .with_max_tokens(OUTREACH_MAX_TOKENS),
            )
            .await?;
        let message = completion.text.trim().to_string();
        if message.is_empty() {
            return Err(AgentError::MalformedResponse("empty outreach draft".to_string()));
        }

        self.context
            .activity
            .emit(
                ActivityEvent::new(
                    profile.id.clone(),
                    ActivityType::MessageDrafted,
                    format!("Drafted {channel} for {}", contact.name),
                )
                .for_run(run_id)
                .for_contact(&contact.id),
            )
            .await;

        let mut crm_synced = false;
        if let Some(external_id) = contact.crm_external_id.as_deref() {
            if let Some(crm) = self.context.crm.provider_for(run_id, &profile.id).await {
                let note = format!("Outreach draft ({channel}):\n{message}");
                let added = crm.add_note(external_id, &note).await;
                crm_synced = sync_succeeded(run_id, "add_note", added).is_some();
            }
        }

        Ok(AgentOutcome {
            output: json!({
                "contact_id": contact.id.0,
                "channel": channel,
                "message": message,
                "crm_synced": crm_synced,
            }),
            tokens_used: completion.tokens_used,
        })
    }
}

#[cfg(test)]
mod tests {
    use canvass_core::chrono::Utc;
    use canvass_core::{Contact, ContactId, Profile, ProfileId, ProfileMode};

    use super::{system_prompt, user_message};

    fn profile(mode: ProfileMode) -> Profile {
        Profile {
            id: ProfileId("P-1".to_string()),
            name: "Ana Silva for Council".to_string(),
            mode,
            context: None,
            target_persona: None,
            location: Some("Halifax".to_string()),
            knowledge_base: Vec::new(),
            service_offerings: Vec::new(),
            business_objections: vec!["too expensive".to_string()],
            riding: Some("Halifax West".to_string()),
            candidate_name: Some("Ana Silva".to_string()),
            policy_pillars: vec!["transit".to_string()],
            political_objections: Vec::new(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn prompt_voice_follows_profile_mode() {
        let political = system_prompt(&profile(ProfileMode::Political), "sms");
        assert!(political.contains("on behalf of Ana Silva"));
        assert!(political.contains("short sms outreach to a constituent"));
        assert!(!political.contains("too expensive"));

        let business = system_prompt(&profile(ProfileMode::Business), "email");
        assert!(business.contains("prospective customer"));
        assert!(business.contains("too expensive"));
    }

    #[test]
    fn user_message_leads_with_the_hook() {
        let contact = Contact {
            id: ContactId("C-1".to_string()),
            profile_id: ProfileId("P-1".to_string()),
            name: "Sam Reid".to_string(),
            email: None,
            phone: None,
            social_handle: None,
            profile_url: None,
            source: "https://forum.example/t/4".to_string(),
            relevance: 80,
            lead_status: None,
            voter_intent: None,
            donor_intent: None,
            tags: Vec::new(),
            notes: None,
            hook: Some("Asked about the 21 bus route".to_string()),
            crm_external_id: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };

        let message = user_message(&contact, Some("  mention the town hall "));
        assert_eq!(
            message,
            "Recipient: Sam Reid\nHook: Asked about the 21 bus route\n\
             Found via: https://forum.example/t/4\nExtra instructions: mention the town hall"
        );
    }
}
