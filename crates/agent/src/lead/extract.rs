//! Stage D: one completion call and a two-step decode of its answer.

use canvass_core::{Profile, ProfileMode};
use serde::{Deserialize, Deserializer};
use serde_json::Value;
use thiserror::Error;

use super::fetch::FetchedItem;
use super::query::Recency;
use super::PipelineMode;
use crate::prompts::{audience_noun, bounded, profile_brief, strip_code_fence};
use crate::prompts::{MAX_ITEM_CHARS, MAX_PROMPT_CONTENT_CHARS};

/// One lead as returned by the model. Every field is optional; defaults are applied later.
#[derive(Clone, Debug, Default, Deserialize, PartialEq)]
pub struct ExtractedLead {
    #[serde(default, deserialize_with = "lenient_text")]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub email: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub phone: Option<String>,
    #[serde(default, alias = "handle", deserialize_with = "lenient_text")]
    pub social_handle: Option<String>,
    #[serde(default, alias = "url", deserialize_with = "lenient_text")]
    pub profile_url: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub source: Option<String>,
    #[serde(default, alias = "lead_score", deserialize_with = "lenient_score")]
    pub relevance: Option<f64>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub hook: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub notes: Option<String>,
    #[serde(default, deserialize_with = "lenient_tags")]
    pub tags: Option<Vec<String>>,
}

#[derive(Debug, Error)]
pub enum ExtractionParseError {
    #[error("response is empty")]
    Empty,
    #[error("response is not valid json: {0}")]
    Json(#[from] serde_json::Error),
    #[error("response is json but not an array")]
    NotArray,
}

/// Decodes the normalized response into typed leads. Only the outer shape is strict:
/// elements that are not objects are skipped, and one badly typed lead never drops the rest.
pub fn parse_leads(response: &str) -> Result<Vec<ExtractedLead>, ExtractionParseError> {
    let normalized = strip_code_fence(response);
    if normalized.is_empty() {
        return Err(ExtractionParseError::Empty);
    }
    match serde_json::from_str::<Value>(normalized)? {
        Value::Array(elements) => Ok(elements
            .into_iter()
            .filter(Value::is_object)
            .filter_map(|element| serde_json::from_value(element).ok())
            .collect()),
        _ => Err(ExtractionParseError::NotArray),
    }
}

fn scalar_text(value: Value) -> Option<String> {
    match value {
        Value::String(text) => Some(text),
        Value::Number(number) => Some(number.to_string()),
        Value::Bool(flag) => Some(flag.to_string()),
        _ => None,
    }
}

/// Contact fields may arrive as numbers (phone numbers especially).
fn lenient_text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Value>::deserialize(deserializer)?.and_then(scalar_text))
}

/// Tags may arrive as a list or as a single string.
fn lenient_tags<'de, D>(deserializer: D) -> Result<Option<Vec<String>>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        Some(Value::Array(items)) => Some(items.into_iter().filter_map(scalar_text).collect()),
        Some(Value::String(tag)) => Some(vec![tag]),
        _ => None,
    })
}

/// Scores may arrive as numbers or numeric strings.
fn lenient_score<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        Some(Value::Number(number)) => number.as_f64(),
        Some(Value::String(text)) => text.trim().parse::<f64>().ok(),
        _ => None,
    })
}

pub fn system_prompt(profile: &Profile, mode: PipelineMode, recency: Recency) -> String {
    let noun = audience_noun(profile.mode);
    let lead_definition = match profile.mode {
        ProfileMode::Business => {
            "A lead is a person who is asking for, or clearly needs, the services listed in the \
             profile. A business or freelancer offering the same or similar services is a \
             competitor, not a lead. Advertisers and directory listings are not leads."
        }
        ProfileMode::Political => {
            "A lead is a resident voicing a concern, question or opinion about a local issue \
             tied to the profile's policy pillars. Other campaigns, party accounts, journalists \
             and advertisers are not leads."
        }
    };
    let output_shape = "Respond with only a JSON array. Each element is an object with keys: \
        name, email, phone, social_handle, profile_url, source, relevance (0-100), hook, notes, \
        tags (array of strings).";

    match mode {
        PipelineMode::Scraped => format!(
            "You extract real {noun} leads from web content collected for this profile.\n\
             {lead_definition}\n\
             Rules:\n\
             - Only include people who literally appear in the supplied content.\n\
             - Use null for any contact field that is not literally present. Never guess \
             emails, phone numbers or handles.\n\
             - Copy the source URL and any handle verbatim from the content.\n\
             - Only include content from {window}; skip anything visibly older.\n\
             - hook is the specific quoted or paraphrased detail that makes outreach personal.\n\
             {output_shape}\nReturn [] when nobody qualifies.",
            window = recency.window_phrase(),
        ),
        PipelineMode::AiProspecting => format!(
            "No web content could be collected, so you generate clearly simulated example \
             {noun} leads that illustrate who this profile should look for.\n\
             {lead_definition}\n\
             Rules:\n\
             - email and phone must be null. Never invent reachable contact details.\n\
             - Prefix every social_handle with \"simulated:\" and set source to \
             \"ai_prospecting\".\n\
             - Keep personas plausible for {window}.\n\
             {output_shape}",
            window = recency.window_phrase(),
        ),
    }
}

pub fn user_message(profile: &Profile, items: &[FetchedItem], max_leads: usize) -> String {
    let mut message = format!(
        "Profile:\n{}\n\nReturn at most {max_leads} leads.\n",
        profile_brief(profile)
    );
    if items.is_empty() {
        return message;
    }

    message.push_str("\nCollected content:\n");
    let mut budget = MAX_PROMPT_CONTENT_CHARS;
    for (index, item) in items.iter().enumerate() {
        if budget == 0 {
            break;
        }
        let content = bounded(&item.content, MAX_ITEM_CHARS.min(budget));
        budget = budget.saturating_sub(content.chars().count());
        let title = item.title.as_deref().unwrap_or("untitled");
        message.push_str(&format!(
            "\n[{}] {title}\nSource: {}\n{content}\n",
            index + 1,
            item.source
        ));
    }
    message
}

#[cfg(test)]
mod tests {
    use canvass_core::chrono::Utc;
    use canvass_core::{Profile, ProfileId, ProfileMode};

    use super::{parse_leads, system_prompt, user_message, ExtractionParseError};
    use crate::lead::fetch::FetchedItem;
    use crate::lead::query::Recency;
    use crate::lead::PipelineMode;

    fn profile() -> Profile {
        Profile {
            id: ProfileId("P-1".to_string()),
            name: "Harbour Plumbing".to_string(),
            mode: ProfileMode::Business,
            context: None,
            target_persona: Some("Homeowners".to_string()),
            location: Some("Halifax".to_string()),
            knowledge_base: Vec::new(),
            service_offerings: vec!["drain cleaning".to_string()],
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
    fn fenced_arrays_parse_into_typed_leads() {
        let leads = parse_leads(
            "```json\n[{\"name\": \"Sam Reid\", \"relevance\": \"85\", \"url\": \"https://x\"}]\n```",
        )
        .expect("parsed");
        assert_eq!(leads.len(), 1);
        assert_eq!(leads[0].name.as_deref(), Some("Sam Reid"));
        assert_eq!(leads[0].relevance, Some(85.0));
        assert_eq!(leads[0].profile_url.as_deref(), Some("https://x"));
    }

    #[test]
    fn non_arrays_and_prose_are_parse_errors() {
        assert!(matches!(parse_leads("not json"), Err(ExtractionParseError::Json(_))));
        assert!(matches!(parse_leads("{\"leads\": []}"), Err(ExtractionParseError::NotArray)));
        assert!(matches!(parse_leads("   "), Err(ExtractionParseError::Empty)));
        assert_eq!(parse_leads("[1, 2]").expect("array of scalars").len(), 0);
        assert_eq!(parse_leads("[]").expect("empty array").len(), 0);
    }

    #[test]
    fn badly_typed_lead_does_not_drop_its_neighbours() {
        let leads = parse_leads(
            r#"[{"name":"Sam Reid","relevance":80},
                {"name":"Ana Li","phone":9025550101,"tags":"plumbing"},
                "stray prose",
                {"name":"Lee Wu","tags":["drains", 7, null]}]"#,
        )
        .expect("parsed");

        assert_eq!(leads.len(), 3);
        assert_eq!(leads[0].name.as_deref(), Some("Sam Reid"));
        assert_eq!(leads[1].phone.as_deref(), Some("9025550101"));
        assert_eq!(leads[1].tags, Some(vec!["plumbing".to_string()]));
        assert_eq!(leads[2].tags, Some(vec!["drains".to_string(), "7".to_string()]));
    }

    #[test]
    fn prompts_differ_by_pipeline_mode() {
        let scraped = system_prompt(&profile(), PipelineMode::Scraped, Recency::OneWeek);
        assert!(scraped.contains("literally appear"));
        assert!(scraped.contains("the past 7 days"));
        assert!(scraped.contains("competitor, not a lead"));

        let simulated = system_prompt(&profile(), PipelineMode::AiProspecting, Recency::Any);
        assert!(simulated.contains("simulated"));
        assert!(simulated.contains("email and phone must be null"));
    }

    #[test]
    fn user_message_caps_total_content() {
        let items: Vec<FetchedItem> = (0..10)
            .map(|index| FetchedItem {
                source: format!("https://{index}.example"),
                title: None,
                content: "x".repeat(4_000),
            })
            .collect();

        let message = user_message(&profile(), &items, 5);
        assert!(message.contains("Return at most 5 leads."));
        assert!(message.contains("https://5.example"));
        assert!(!message.contains("https://6.example"));
    }
}
