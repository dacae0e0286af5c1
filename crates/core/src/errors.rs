use thiserror::Error;

use crate::domain::profile::ProfileMode;

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum DomainError {
    #[error("{agent} requires a {required:?} profile but profile is {actual:?}")]
    ProfileModeMismatch { agent: &'static str, required: ProfileMode, actual: ProfileMode },
    #[error("contact `{contact_id}` does not belong to profile `{profile_id}`")]
    ContactOutsideProfile { contact_id: String, profile_id: String },
    #[error("sentiment score {0} is outside -100..=100")]
    SentimentOutOfRange(i16),
    #[error("invalid run input: {0}")]
    InvalidInput(String),
    #[error("domain invariant violation: {0}")]
    InvariantViolation(String),
}

impl DomainError {
    /// Stable snake_case class used in logs and run output.
    pub fn error_class(&self) -> &'static str {
        match self {
            Self::ProfileModeMismatch { .. } => "profile_mode_mismatch",
            Self::ContactOutsideProfile { .. } => "contact_outside_profile",
            Self::SentimentOutOfRange(_) => "sentiment_out_of_range",
            Self::InvalidInput(_) => "invalid_input",
            Self::InvariantViolation(_) => "invariant_violation",
        }
    }
}
