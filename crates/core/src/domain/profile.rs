use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ProfileId(pub String);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProfileMode {
    Business,
    Political,
}

impl ProfileMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Business => "business",
            Self::Political => "political",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "business" => Some(Self::Business),
            "political" => Some(Self::Political),
            _ => None,
        }
    }
}

/// Tenant configuration as persisted. Both mode-specific field sets live on the row;
/// callers should read them through [`Profile::mode_fields`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    pub id: ProfileId,
    pub name: String,
    pub mode: ProfileMode,
    pub context: Option<String>,
    pub target_persona: Option<String>,
    pub location: Option<String>,
    pub knowledge_base: Vec<String>,
    pub service_offerings: Vec<String>,
    pub business_objections: Vec<String>,
    pub riding: Option<String>,
    pub candidate_name: Option<String>,
    pub policy_pillars: Vec<String>,
    pub political_objections: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Borrowed view over the fields that belong to the active mode.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ModeFields<'a> {
    Business {
        services: &'a [String],
        objections: &'a [String],
    },
    Political {
        riding: Option<&'a str>,
        candidate: Option<&'a str>,
        pillars: &'a [String],
        objections: &'a [String],
    },
}

impl Profile {
    pub fn mode_fields(&self) -> ModeFields<'_> {
        match self.mode {
            ProfileMode::Business => ModeFields::Business {
                services: &self.service_offerings,
                objections: &self.business_objections,
            },
            ProfileMode::Political => ModeFields::Political {
                riding: self.riding.as_deref(),
                candidate: self.candidate_name.as_deref(),
                pillars: &self.policy_pillars,
                objections: &self.political_objections,
            },
        }
    }

    /// Attribute values that seed discovery queries: services or policy pillars.
    pub fn focus_terms(&self) -> &[String] {
        match self.mode_fields() {
            ModeFields::Business { services, .. } => services,
            ModeFields::Political { pillars, .. } => pillars,
        }
    }

    /// Riding for political profiles, falling back to the shared location.
    pub fn area(&self) -> Option<&str> {
        let area = match self.mode {
            ProfileMode::Business => self.location.as_deref(),
            ProfileMode::Political => self.riding.as_deref().or(self.location.as_deref()),
        };
        area.map(str::trim).filter(|value| !value.is_empty())
    }

    /// Names of inactive-mode fields that carry data. Rows are expected to keep these empty.
    pub fn stray_mode_fields(&self) -> Vec<&'static str> {
        let mut stray = Vec::new();
        match self.mode {
            ProfileMode::Business => {
                if self.riding.is_some() {
                    stray.push("riding");
                }
                if self.candidate_name.is_some() {
                    stray.push("candidate_name");
                }
                if !self.policy_pillars.is_empty() {
                    stray.push("policy_pillars");
                }
                if !self.political_objections.is_empty() {
                    stray.push("political_objections");
                }
            }
            ProfileMode::Political => {
                if !self.service_offerings.is_empty() {
                    stray.push("service_offerings");
                }
                if !self.business_objections.is_empty() {
                    stray.push("business_objections");
                }
            }
        }
        stray
    }
}
