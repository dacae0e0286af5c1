use async_trait::async_trait;
use canvass_core::chrono::Utc;
use canvass_core::{
    ActivityEvent, ActivityType, AgentRunId, AgentType, DomainError, DonorIntent, IntentType,
    Profile, ProfileMode, VoterIntent,
};
use canvass_providers::CompletionOptions;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::crm_sync::sync_succeeded;
use crate::error::AgentError;
use crate::executor::{decode_input, load_contact, AgentContext, AgentExecutor, AgentOutcome};
use crate::prompts::{bounded, extract_json_object, profile_brief, MAX_ITEM_CHARS};
use crate::sentiment::SentimentSignal;

const SCAN_TEMPERATURE: f32 = 0.0;
const SCAN_MAX_TOKENS: u32 = 512;

#[derive(Clone, Debug, Default, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct SentimentRequest {
    pub contact_id: Option<String>,
    pub issue: String,
    pub signal: String,
    pub intent_type: Option<String>,
}

/// The model's reading of one signal.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SentimentAssessment {
    pub score: i16,
    pub intent_type: Option<IntentType>,
    pub voter_intent: Option<VoterIntent>,
    pub donor_intent: Option<DonorIntent>,
    pub summary: Option<String>,
}

/// Scores a constituent signal, appends a reading and moves the contact's intent.
/// Political profiles only.
pub struct SentimentScan {
    context: AgentContext,
}

impl SentimentScan {
    pub fn new(context: AgentContext) -> Self {
        Self { context }
    }
}

pub fn system_prompt(profile: &Profile) -> String {
    format!(
        "You score how a constituent feels about a campaign issue.\n\
         Return only a JSON object with keys: score (integer from -100 strongly opposed to 100 \
         strongly supportive), intent_type (\"voter\" or \"donor\"), voter_intent (one of \
         unknown, supporter, leaning, undecided, opposed), donor_intent (one of none, potential, \
         likely, committed), summary (one sentence).\n\nCampaign:\n{}",
        profile_brief(profile)
    )
}

/// Reads the assessment object. Unknown enum values become `None`; a missing score is an error.
pub fn parse_assessment(response: &str) -> Result<SentimentAssessment, AgentError> {
    let value = extract_json_object(response)
        .ok_or_else(|| AgentError::MalformedResponse("no json object in response".to_string()))?;
    let raw_score = match value.get("score") {
        Some(Value::Number(number)) => number.as_f64(),
        Some(Value::String(text)) => text.trim().parse::<f64>().ok(),
        _ => None,
    }
    .ok_or_else(|| AgentError::MalformedResponse("score is missing".to_string()))?;

    let text = |key: &str| value.get(key).and_then(Value::as_str).map(str::to_string);
    Ok(SentimentAssessment {
        score: saturate(raw_score),
        intent_type: text("intent_type").as_deref().and_then(IntentType::parse),
        voter_intent: text("voter_intent").as_deref().and_then(VoterIntent::parse),
        donor_intent: text("donor_intent").as_deref().and_then(DonorIntent::parse),
        summary: text("summary"),
    })
}

fn saturate(score: f64) -> i16 {
    score.round().clamp(f64::from(i16::MIN), f64::from(i16::MAX)) as i16
}

#[async_trait]
impl AgentExecutor for SentimentScan {
    fn agent_type(&self) -> AgentType {
        AgentType::SentimentScan
    }

    async fn perform(
        &self,
        run_id: &AgentRunId,
        profile: &Profile,
        input: &Value,
    ) -> Result<AgentOutcome, AgentError> {
        if profile.mode != ProfileMode::Political {
            return Err(DomainError::ProfileModeMismatch {
                agent: AgentType::SentimentScan.as_str(),
                required: ProfileMode::Political,
                actual: profile.mode,
            }
            .into());
        }

        let request: SentimentRequest = decode_input(input)?;
        let issue = request.issue.trim();
        let signal = request.signal.trim();
        if issue.is_empty() || signal.is_empty() {
            let message = "issue and signal are required".to_string();
            return Err(DomainError::InvalidInput(message).into());
        }
        let mut contact = load_contact(&self.context, profile, input).await?;

        let user_message = format!(
            "Issue: {issue}\nSignal from {}:\n{}",
            contact.name,
            bounded(signal, MAX_ITEM_CHARS)
        );
        let completion = self
            .context
            .providers
            .completion()
            .complete(
                &system_prompt(profile),
                &user_message,
                &CompletionOptions::default()
                    .with_temperature(SCAN_TEMPERATURE)
                    .with_max_tokens(SCAN_MAX_TOKENS),
            )
            .await?;
        let assessment = parse_assessment(&completion.text)?;
        let intent_type = request
            .intent_type
            .as_deref()
            .and_then(IntentType::parse)
            .or(assessment.intent_type)
            .unwrap_or(IntentType::Voter);

        let reading = self
            .context
            .sentiment
            .record(
                &profile.id,
                &contact.id,
                SentimentSignal {
                    issue: issue.to_string(),
                    score: assessment.score,
                    intent_type,
                    raw_signal: signal.to_string(),
                },
            )
            .await?;

        if assessment.voter_intent.is_some() || assessment.donor_intent.is_some() {
            contact.voter_intent = assessment.voter_intent.or(contact.voter_intent);
            contact.donor_intent = assessment.donor_intent.or(contact.donor_intent);
            contact.updated_at = Utc::now();
            self.context.contacts.save(contact.clone()).await?;
        }

        self.context
            .activity
            .emit(
                ActivityEvent::new(
                    profile.id.clone(),
                    ActivityType::SentimentRecorded,
                    format!("{} on {issue}: {}", contact.name, reading.score),
                )
                .for_run(run_id)
                .for_contact(&contact.id)
                .with_detail(assessment.summary.clone().unwrap_or_default()),
            )
            .await;

        let mut crm_synced = false;
        if let Some(external_id) = contact.crm_external_id.as_deref() {
            if let Some(crm) = self.context.crm.provider_for(run_id, &profile.id).await {
                let stance =
                    contact.voter_intent.map(|intent| intent.as_str()).unwrap_or("scored");
                let tag = format!("{issue}:{stance}");
                let tagged = crm.add_tag(external_id, &tag).await;
                crm_synced = sync_succeeded(run_id, "add_tag", tagged).is_some();
            }
        }

        Ok(AgentOutcome {
            output: json!({
                "contact_id": contact.id.0,
                "reading_id": reading.id.0,
                "issue": reading.issue,
                "score": reading.score,
                "intent_type": reading.intent_type.as_str(),
                "voter_intent": contact.voter_intent.map(|intent| intent.as_str()),
                "donor_intent": contact.donor_intent.map(|intent| intent.as_str()),
                "summary": assessment.summary,
                "crm_synced": crm_synced,
            }),
            tokens_used: completion.tokens_used,
        })
    }
}
