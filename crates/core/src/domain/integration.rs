use chrono::{DateTime, Utc};
use secrecy::SecretString;

use crate::domain::profile::ProfileId;

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct IntegrationId(pub String);

/// Per-profile CRM credentials. `Debug` never prints the token.
#[derive(Clone, Debug)]
pub struct Integration {
    pub id: IntegrationId,
    pub profile_id: ProfileId,
    pub provider: String,
    pub access_token: SecretString,
    pub instance_url: Option<String>,
    pub is_verified: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
