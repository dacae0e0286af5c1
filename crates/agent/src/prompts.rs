//! Shared prompt assembly and model-response normalization.

use canvass_core::{ModeFields, Profile, ProfileMode};
use serde_json::Value;

/// Upper bound for any single piece of fetched or user content placed in a prompt.
pub const MAX_ITEM_CHARS: usize = 4_000;
/// Upper bound for all fetched content placed in one prompt.
pub const MAX_PROMPT_CONTENT_CHARS: usize = 24_000;

/// Renders the profile through its active-mode view. Inactive-mode fields never reach a prompt.
pub fn profile_brief(profile: &Profile) -> String {
    let mut lines = vec![format!("Name: {}", profile.name)];
    push_optional(&mut lines, "Context", profile.context.as_deref());
    push_optional(&mut lines, "Target persona", profile.target_persona.as_deref());
    push_optional(&mut lines, "Location", profile.location.as_deref());

    match profile.mode_fields() {
        ModeFields::Business { services, objections } => {
            push_list(&mut lines, "Services offered", services);
            push_list(&mut lines, "Common objections", objections);
        }
        ModeFields::Political { riding, candidate, pillars, objections } => {
            push_optional(&mut lines, "Riding", riding);
            push_optional(&mut lines, "Candidate", candidate);
            push_list(&mut lines, "Policy pillars", pillars);
            push_list(&mut lines, "Common objections", objections);
        }
    }
    push_list(&mut lines, "Knowledge base", &profile.knowledge_base);

    bounded(&lines.join("\n"), MAX_ITEM_CHARS).to_string()
}

pub fn audience_noun(mode: ProfileMode) -> &'static str {
    match mode {
        ProfileMode::Business => "prospective customer",
        ProfileMode::Political => "constituent",
    }
}

fn push_optional(lines: &mut Vec<String>, label: &str, value: Option<&str>) {
    if let Some(value) = value.map(str::trim).filter(|value| !value.is_empty()) {
        lines.push(format!("{label}: {value}"));
    }
}

fn push_list(lines: &mut Vec<String>, label: &str, values: &[String]) {
    let values: Vec<&str> =
        values.iter().map(|value| value.trim()).filter(|value| !value.is_empty()).collect();
    if !values.is_empty() {
        lines.push(format!("{label}: {}", values.join("; ")));
    }
}

/// Truncates on a char boundary.
pub fn bounded(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((index, _)) => &text[..index],
        None => text,
    }
}

/// Trims the response and removes one wrapping code fence (with or without a language tag).
pub fn strip_code_fence(response: &str) -> &str {
    let trimmed = response.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let body = strip_fence_tag(rest);
    body.trim_end().strip_suffix("```").unwrap_or(body).trim()
}

/// Drops a leading language tag such as `json` or `js`, on its own line or inline.
fn strip_fence_tag(rest: &str) -> &str {
    if !rest.starts_with(|c: char| c.is_ascii_alphabetic()) {
        return rest;
    }
    let tag_end = rest
        .find(|c: char| !(c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '+')))
        .unwrap_or(rest.len());
    match rest[tag_end..].chars().next() {
        None => rest,
        Some(next) if next.is_whitespace() || matches!(next, '[' | '{') => &rest[tag_end..],
        Some(_) => rest,
    }
}

/// Finds a JSON object in a free-form response: fenced, bare, or embedded in prose.
pub fn extract_json_object(response: &str) -> Option<Value> {
    let normalized = strip_code_fence(response);
    if let Ok(value @ Value::Object(_)) = serde_json::from_str::<Value>(normalized) {
        return Some(value);
    }

    let start = normalized.find('{')?;
    let end = normalized.rfind('}')?;
    if end <= start {
        return None;
    }
    match serde_json::from_str::<Value>(&normalized[start..=end]) {
        Ok(value @ Value::Object(_)) => Some(value),
        _ => None,
    }
}
