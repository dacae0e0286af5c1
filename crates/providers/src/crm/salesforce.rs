use async_trait::async_trait;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde_json::{json, Map, Value};

use canvass_core::domain::contact::Contact;

use super::{
    connection_result, join_name, ConnectionCheck, CrmBackend, CrmProvider, CrmPushResult,
    PullOptions, PullPage, PulledContact,
};
use crate::error::ProviderError;
use crate::http::{first_string, send_json, trim_base_url, truncate_chars};

const PROVIDER: &str = "salesforce";
const API_VERSION: &str = "v59.0";
const LEAD_SOURCE: &str = "Canvass";
const SUBJECT_LIMIT: usize = 255;

/// REST API against the org's instance URL.
pub struct SalesforceCrm {
    client: Client,
    access_token: SecretString,
    instance_url: String,
}

impl SalesforceCrm {
    pub fn new(
        client: Client,
        access_token: SecretString,
        instance_url: Option<&str>,
    ) -> Result<Self, ProviderError> {
        let instance_url = instance_url
            .map(trim_base_url)
            .filter(|url| !url.is_empty())
            .ok_or_else(|| {
                ProviderError::configuration(PROVIDER, "integration has no instance_url")
            })?;
        Ok(Self { client, access_token, instance_url })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/services/data/{API_VERSION}{path}", self.instance_url)
    }

    fn token(&self) -> &str {
        self.access_token.expose_secret()
    }

    async fn create_task(
        &self,
        who_id: &str,
        subject: &str,
        description: Option<&str>,
    ) -> Result<(), ProviderError> {
        let mut body = json!({
            "WhoId": who_id,
            "Subject": truncate_chars(subject, SUBJECT_LIMIT),
            "Status": "Completed",
        });
        if let Some(description) = description {
            body["Description"] = json!(description);
        }
        let request =
            self.client.post(self.url("/sobjects/Task")).bearer_auth(self.token()).json(&body);
        send_json(PROVIDER, request).await?;
        Ok(())
    }
}

#[async_trait]
impl CrmProvider for SalesforceCrm {
    fn backend(&self) -> CrmBackend {
        CrmBackend::Salesforce
    }

    async fn test_connection(&self) -> Result<ConnectionCheck, ProviderError> {
        let request = self.client.get(self.url("/limits")).bearer_auth(self.token());
        connection_result(send_json(PROVIDER, request).await, CrmBackend::Salesforce)
    }

    async fn push_contact(&self, contact: &Contact) -> Result<CrmPushResult, ProviderError> {
        let body = contact_fields(contact);

        if let Some(external_id) = contact.crm_external_id.as_deref() {
            let request = self
                .client
                .patch(self.url(&format!("/sobjects/Contact/{external_id}")))
                .bearer_auth(self.token())
                .json(&body);
            let raw = send_json(PROVIDER, request).await?;
            return Ok(CrmPushResult { external_id: external_id.to_string(), raw });
        }

        let request =
            self.client.post(self.url("/sobjects/Contact")).bearer_auth(self.token()).json(&body);
        let raw = send_json(PROVIDER, request).await?;
        if raw.get("success").and_then(Value::as_bool) == Some(false) {
            let message = raw
                .pointer("/errors/0/message")
                .and_then(Value::as_str)
                .unwrap_or("create was not successful");
            return Err(ProviderError::upstream(PROVIDER, None, message));
        }
        let external_id = first_string(&raw, &["id"])
            .ok_or_else(|| ProviderError::upstream(PROVIDER, None, "response had no record id"))?;
        Ok(CrmPushResult { external_id, raw })
    }

    async fn pull_contacts(&self, options: &PullOptions) -> Result<PullPage, ProviderError> {
        let request = match &options.cursor {
            Some(next_records_url) => self
                .client
                .get(format!("{}{next_records_url}", self.instance_url))
                .bearer_auth(self.token()),
            None => {
                let soql = format!(
                    "SELECT Id, FirstName, LastName, Email, Phone FROM Contact \
                     ORDER BY CreatedDate DESC LIMIT {}",
                    options.limit.clamp(1, 2_000)
                );
                self.client
                    .get(self.url("/query"))
                    .query(&[("q", soql.as_str())])
                    .bearer_auth(self.token())
            }
        };

        Ok(parse_query_page(&send_json(PROVIDER, request).await?))
    }

    async fn add_tag(&self, external_id: &str, tag: &str) -> Result<(), ProviderError> {
        self.create_task(external_id, &format!("Tag: {}", tag.trim()), None).await
    }

    async fn add_note(&self, external_id: &str, note: &str) -> Result<(), ProviderError> {
        let subject = note.lines().next().unwrap_or("Canvass note");
        self.create_task(external_id, subject, Some(note)).await
    }
}

pub(crate) fn contact_fields(contact: &Contact) -> Value {
    let last_name = match contact.last_name() {
        "" => contact.first_name(),
        last => last,
    };
    let first_name = if contact.last_name().is_empty() { "" } else { contact.first_name() };

    let mut fields = Map::new();
    fields.insert(
        "LastName".to_string(),
        json!(if last_name.is_empty() { "Unknown" } else { last_name }),
    );
    if !first_name.is_empty() {
        fields.insert("FirstName".to_string(), json!(first_name));
    }
    let optional = [
        ("Email", contact.email.as_deref()),
        ("Phone", contact.phone.as_deref()),
        ("Description", contact.hook.as_deref()),
    ];
    for (key, value) in optional {
        if let Some(value) = value.map(str::trim).filter(|value| !value.is_empty()) {
            fields.insert(key.to_string(), json!(value));
        }
    }
    fields.insert("LeadSource".to_string(), json!(LEAD_SOURCE));
    Value::Object(fields)
}

pub(crate) fn parse_query_page(payload: &Value) -> PullPage {
    let contacts = payload
        .get("records")
        .and_then(Value::as_array)
        .map(|records| {
            records
                .iter()
                .filter_map(|record| {
                    let first = first_string(record, &["FirstName"]);
                    let last = first_string(record, &["LastName"]);
                    Some(PulledContact {
                        external_id: first_string(record, &["Id"])?,
                        name: join_name(first.as_deref(), last.as_deref()),
                        email: first_string(record, &["Email"]),
                        phone: first_string(record, &["Phone"]),
                    })
                })
                .collect()
        })
        .unwrap_or_default();

    let done = payload.get("done").and_then(Value::as_bool).unwrap_or(true);
    let next_cursor = if done { None } else { first_string(payload, &["nextRecordsUrl"]) };

    PullPage { contacts, next_cursor }
}
