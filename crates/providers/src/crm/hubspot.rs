use async_trait::async_trait;
use canvass_core::chrono::Utc;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde_json::{json, Map, Value};

use canvass_core::domain::contact::{Contact, LeadStatus};

use super::{
    connection_result, join_name, ConnectionCheck, CrmBackend, CrmProvider, CrmPushResult,
    PullOptions, PullPage, PulledContact,
};
use crate::error::ProviderError;
use crate::http::{first_string, send_json, trim_base_url};

const PROVIDER: &str = "hubspot";
const DEFAULT_BASE_URL: &str = "https://api.hubapi.com";
/// Multi-line text property holding tags; HubSpot has no native contact tags.
pub const TAG_PROPERTY: &str = "canvass_tags";
const NOTE_TO_CONTACT_ASSOCIATION: u32 = 202;

pub struct HubSpotCrm {
    client: Client,
    access_token: SecretString,
    base_url: String,
}

impl HubSpotCrm {
    pub fn new(client: Client, access_token: SecretString, base_url: Option<&str>) -> Self {
        Self { client, access_token, base_url: trim_base_url(base_url.unwrap_or(DEFAULT_BASE_URL)) }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    fn token(&self) -> &str {
        self.access_token.expose_secret()
    }
}

#[async_trait]
impl CrmProvider for HubSpotCrm {
    fn backend(&self) -> CrmBackend {
        CrmBackend::HubSpot
    }

    async fn test_connection(&self) -> Result<ConnectionCheck, ProviderError> {
        let request = self
            .client
            .get(self.url("/crm/v3/objects/contacts"))
            .query(&[("limit", "1")])
            .bearer_auth(self.token());
        connection_result(send_json(PROVIDER, request).await, CrmBackend::HubSpot)
    }

    async fn push_contact(&self, contact: &Contact) -> Result<CrmPushResult, ProviderError> {
        let body = json!({"properties": contact_properties(contact)});
        let request = match contact.crm_external_id.as_deref() {
            Some(external_id) => self
                .client
                .patch(self.url(&format!("/crm/v3/objects/contacts/{external_id}")))
                .bearer_auth(self.token())
                .json(&body),
            None => self
                .client
                .post(self.url("/crm/v3/objects/contacts"))
                .bearer_auth(self.token())
                .json(&body),
        };

        let raw = send_json(PROVIDER, request).await?;
        let external_id = first_string(&raw, &["id"])
            .ok_or_else(|| ProviderError::upstream(PROVIDER, None, "response had no record id"))?;
        Ok(CrmPushResult { external_id, raw })
    }

    async fn pull_contacts(&self, options: &PullOptions) -> Result<PullPage, ProviderError> {
        let mut query = vec![
            ("limit", options.limit.clamp(1, 100).to_string()),
            ("properties", "firstname,lastname,email,phone".to_string()),
        ];
        if let Some(cursor) = &options.cursor {
            query.push(("after", cursor.clone()));
        }

        let request = self
            .client
            .get(self.url("/crm/v3/objects/contacts"))
            .query(&query)
            .bearer_auth(self.token());
        Ok(parse_contact_page(&send_json(PROVIDER, request).await?))
    }

    async fn add_tag(&self, external_id: &str, tag: &str) -> Result<(), ProviderError> {
        let path = format!("/crm/v3/objects/contacts/{external_id}");
        let current = send_json(
            PROVIDER,
            self.client
                .get(self.url(&path))
                .query(&[("properties", TAG_PROPERTY)])
                .bearer_auth(self.token()),
        )
        .await?;

        let existing = current
            .pointer(&format!("/properties/{TAG_PROPERTY}"))
            .and_then(Value::as_str)
            .unwrap_or("");
        let Some(merged) = merge_tag(existing, tag) else {
            return Ok(());
        };

        let body = json!({"properties": {TAG_PROPERTY: merged}});
        let request = self.client.patch(self.url(&path)).bearer_auth(self.token()).json(&body);
        send_json(PROVIDER, request).await?;
        Ok(())
    }

    async fn add_note(&self, external_id: &str, note: &str) -> Result<(), ProviderError> {
        let body = json!({
            "properties": {
                "hs_note_body": note,
                "hs_timestamp": Utc::now().to_rfc3339(),
            },
            "associations": [{
                "to": {"id": external_id},
                "types": [{
                    "associationCategory": "HUBSPOT_DEFINED",
                    "associationTypeId": NOTE_TO_CONTACT_ASSOCIATION,
                }],
            }],
        });
        let request =
            self.client.post(self.url("/crm/v3/objects/notes")).bearer_auth(self.token()).json(&body);
        send_json(PROVIDER, request).await?;
        Ok(())
    }
}

pub(crate) fn contact_properties(contact: &Contact) -> Value {
    let mut properties = Map::new();
    properties.insert("firstname".to_string(), json!(contact.first_name()));
    properties.insert("lastname".to_string(), json!(contact.last_name()));
    let optional = [
        ("email", contact.email.as_deref()),
        ("phone", contact.phone.as_deref()),
        ("website", contact.profile_url.as_deref()),
    ];
    for (key, value) in optional {
        if let Some(value) = value.map(str::trim).filter(|value| !value.is_empty()) {
            properties.insert(key.to_string(), json!(value));
        }
    }
    if let Some(status) = contact.lead_status {
        properties.insert("hs_lead_status".to_string(), json!(hubspot_lead_status(status)));
    }
    Value::Object(properties)
}

fn hubspot_lead_status(status: LeadStatus) -> &'static str {
    match status {
        LeadStatus::Cold => "NEW",
        LeadStatus::Warm => "OPEN",
        LeadStatus::Hot => "IN_PROGRESS",
        LeadStatus::Converted => "CONNECTED",
        LeadStatus::Lost => "UNQUALIFIED",
    }
}

/// Tags are stored `;`-separated. Returns `None` when the tag is already present.
pub(crate) fn merge_tag(existing: &str, tag: &str) -> Option<String> {
    let tag = tag.trim();
    let mut tags: Vec<&str> =
        existing.split(';').map(str::trim).filter(|value| !value.is_empty()).collect();
    if tag.is_empty() || tags.iter().any(|value| value.eq_ignore_ascii_case(tag)) {
        return None;
    }
    tags.push(tag);
    Some(tags.join(";"))
}

pub(crate) fn parse_contact_page(payload: &Value) -> PullPage {
    let contacts = payload
        .get("results")
        .and_then(Value::as_array)
        .map(|results| {
            results
                .iter()
                .filter_map(|record| {
                    let external_id = first_string(record, &["id"])?;
                    let properties = record.get("properties").cloned().unwrap_or(Value::Null);
                    let first = first_string(&properties, &["firstname"]);
                    let last = first_string(&properties, &["lastname"]);
                    Some(PulledContact {
                        external_id,
                        name: join_name(first.as_deref(), last.as_deref()),
                        email: first_string(&properties, &["email"]),
                        phone: first_string(&properties, &["phone"]),
                    })
                })
                .collect()
        })
        .unwrap_or_default();

    let next_cursor = payload
        .pointer("/paging/next/after")
        .and_then(Value::as_str)
        .map(str::to_string);

    PullPage { contacts, next_cursor }
}

#[cfg(test)]
mod tests {
    use canvass_core::chrono::Utc;
    use canvass_core::domain::contact::{Contact, ContactId, LeadStatus};
    use canvass_core::domain::profile::ProfileId;
    use serde_json::json;

    use super::{contact_properties, merge_tag, parse_contact_page};

    fn contact() -> Contact {
        Contact {
            id: ContactId("C-1".to_string()),
            profile_id: ProfileId("P-1".to_string()),
            name: "Jane van Doe".to_string(),
            email: Some("jane@example.com".to_string()),
            phone: Some("  ".to_string()),
            social_handle: None,
            profile_url: None,
            source: "web_scrape".to_string(),
            relevance: 75,
            lead_status: Some(LeadStatus::Warm),
            voter_intent: None,
            donor_intent: None,
            tags: Vec::new(),
            notes: None,
            hook: None,
            crm_external_id: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn contact_properties_skip_blank_fields() {
        let properties = contact_properties(&contact());
        assert_eq!(
            properties,
            json!({
                "firstname": "Jane",
                "lastname": "van Doe",
                "email": "jane@example.com",
                "hs_lead_status": "OPEN"
            })
        );
    }

    #[test]
    fn tags_merge_once() {
        assert_eq!(merge_tag("", "supporter"), Some("supporter".to_string()));
        assert_eq!(merge_tag("donor; supporter", "Supporter"), None);
        assert_eq!(merge_tag("donor", "housing"), Some("donor;housing".to_string()));
    }

    #[test]
    fn contact_page_reads_paging_cursor() {
        let page = parse_contact_page(&json!({
            "results": [
                {"id": "501", "properties": {"firstname": "Omar", "lastname": "Haddad", "email": null}}
            ],
            "paging": {"next": {"after": "502"}}
        }));

        assert_eq!(page.contacts.len(), 1);
        assert_eq!(page.contacts[0].name, "Omar Haddad");
        assert_eq!(page.contacts[0].email, None);
        assert_eq!(page.next_cursor.as_deref(), Some("502"));
    }
}
