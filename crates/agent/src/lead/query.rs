//! Stage A: turn a profile plus run input into an ordered, de-duplicated task list.

use std::collections::HashSet;

use canvass_core::{Profile, ProfileMode};

/// How stale a discovered item may be.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Recency {
    OneWeek,
    OneMonth,
    ThreeMonths,
    SixMonths,
    Any,
}

impl Recency {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::OneWeek => "1week",
            Self::OneMonth => "1month",
            Self::ThreeMonths => "3months",
            Self::SixMonths => "6months",
            Self::Any => "any",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "1week" => Some(Self::OneWeek),
            "1month" => Some(Self::OneMonth),
            "3months" => Some(Self::ThreeMonths),
            "6months" => Some(Self::SixMonths),
            "any" => Some(Self::Any),
            _ => None,
        }
    }

    pub fn default_for(mode: ProfileMode) -> Self {
        match mode {
            ProfileMode::Business => Self::OneMonth,
            ProfileMode::Political => Self::OneWeek,
        }
    }

    /// Missing input takes the mode default; an unrecognized value behaves like `1month`.
    pub fn resolve(requested: Option<&str>, mode: ProfileMode) -> Self {
        match requested.map(str::trim).filter(|value| !value.is_empty()) {
            None => Self::default_for(mode),
            Some(value) => Self::parse(value).unwrap_or(Self::OneMonth),
        }
    }

    /// Search suffix for this window. `current_year` is passed in so the mapping stays pure.
    pub fn date_hint(&self, current_year: i32) -> Option<String> {
        match self {
            Self::OneWeek => Some("past week".to_string()),
            Self::OneMonth => Some("past month".to_string()),
            Self::ThreeMonths | Self::SixMonths => Some(current_year.to_string()),
            Self::Any => None,
        }
    }

    /// Human wording used in extraction prompts.
    pub fn window_phrase(&self) -> &'static str {
        match self {
            Self::OneWeek => "the past 7 days",
            Self::OneMonth => "the past 30 days",
            Self::ThreeMonths => "the past 3 months",
            Self::SixMonths => "the past 6 months",
            Self::Any => "any time",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FetchTask {
    Url(String),
    Search(String),
}

impl FetchTask {
    /// Identity used for de-duplication.
    pub fn key(&self) -> String {
        match self {
            Self::Url(url) => format!("url:{}", url.trim()),
            Self::Search(query) => format!("search:{}", normalize_query(query)),
        }
    }

    pub fn label(&self) -> &str {
        match self {
            Self::Url(url) | Self::Search(url) => url,
        }
    }
}

const BUSINESS_TEMPLATES: [&str; 3] = [
    "looking for {term} recommendations {location}",
    "need help with {term} {location}",
    "anyone recommend {term} {location}",
];

const POLITICAL_TEMPLATES: [&str; 3] = [
    "{location} residents {term} concerns",
    "{term} community meeting {location}",
    "{location} {term} local discussion",
];

/// Focus terms per template set.
const MAX_TEMPLATE_TERMS: usize = 2;

const RELATIVE_DATE_PHRASES: [&str; 12] = [
    "today",
    "yesterday",
    "this week",
    "this month",
    "this year",
    "past week",
    "past month",
    "past year",
    "last week",
    "last month",
    "last year",
    "recent",
];

pub fn build_tasks(
    profile: &Profile,
    sources: &[String],
    keywords: &[String],
    recency: Recency,
    current_year: i32,
) -> Vec<FetchTask> {
    let hint = recency.date_hint(current_year);
    let mut tasks = Vec::new();

    tasks.extend(
        sources
            .iter()
            .map(|url| url.trim())
            .filter(|url| !url.is_empty())
            .map(|url| FetchTask::Url(url.to_string())),
    );

    let templates: &[&str] = match profile.mode {
        ProfileMode::Business => &BUSINESS_TEMPLATES,
        ProfileMode::Political => &POLITICAL_TEMPLATES,
    };
    let location = profile.area().unwrap_or("");
    let terms = profile
        .focus_terms()
        .iter()
        .map(|term| term.trim())
        .filter(|term| !term.is_empty())
        .take(MAX_TEMPLATE_TERMS);
    for term in terms {
        for template in templates {
            let query = template.replace("{term}", term).replace("{location}", location);
            tasks.push(FetchTask::Search(with_hint(&query, hint.as_deref())));
        }
    }

    for keyword in keywords.iter().map(|keyword| keyword.trim()).filter(|k| !k.is_empty()) {
        let query = if has_date_token(keyword) {
            collapse_whitespace(keyword)
        } else {
            with_hint(keyword, hint.as_deref())
        };
        tasks.push(FetchTask::Search(query));
    }

    dedupe(tasks)
}

/// First occurrence of each key wins.
pub fn dedupe(tasks: Vec<FetchTask>) -> Vec<FetchTask> {
    let mut seen = HashSet::new();
    tasks.into_iter().filter(|task| seen.insert(task.key())).collect()
}

pub fn has_date_token(text: &str) -> bool {
    let lowered = text.to_ascii_lowercase();
    let has_year = lowered.split(|c: char| !c.is_ascii_digit()).any(|digits| {
        digits.len() == 4 && (digits.starts_with("19") || digits.starts_with("20"))
    });
    has_year || RELATIVE_DATE_PHRASES.iter().any(|phrase| lowered.contains(phrase))
}

fn with_hint(query: &str, hint: Option<&str>) -> String {
    match hint {
        Some(hint) => collapse_whitespace(&format!("{query} {hint}")),
        None => collapse_whitespace(query),
    }
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn normalize_query(query: &str) -> String {
    collapse_whitespace(query).to_lowercase()
}
