use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use canvass_agent::{
    ActivityEmitter, AgentContext, AgentRegistry, AgentRuntime, CrmSync, RunLedger,
    SentimentRecorder,
};
use canvass_core::chrono::Utc;
use canvass_core::{
    ActivityType, AgentRun, AgentRunId, AgentType, Contact, ContactId, Profile, ProfileId,
    ProfileMode, RunStatus, VoterIntent,
};
use canvass_db::repositories::{
    ActivityRepository, AgentRunRepository, ContactRepository, InMemoryActivityRepository,
    InMemoryAgentRunRepository, InMemoryContactRepository, InMemoryIntegrationRepository,
    InMemorySentimentRepository, SentimentRepository,
};
use canvass_providers::{
    Completion, CompletionOptions, CompletionProvider, DiscoveryProvider, ProviderError,
    ProviderRegistry, ScrapedPage, SearchHit, SearchOptions,
};
use serde_json::{json, Value};

type TestResult = Result<(), String>;

fn ensure(condition: bool, message: impl Into<String>) -> TestResult {
    if condition {
        Ok(())
    } else {
        Err(message.into())
    }
}

enum Reply {
    Text(&'static str),
    MissingKey,
}

struct ScriptedCompletion {
    reply: Reply,
    prompts: Mutex<Vec<(String, String)>>,
}

impl ScriptedCompletion {
    fn new(reply: Reply) -> Self {
        Self { reply, prompts: Mutex::new(Vec::new()) }
    }

    fn system_prompts(&self) -> Vec<String> {
        self.prompts
            .lock()
            .map(|prompts| prompts.iter().map(|(system, _)| system.clone()).collect())
            .unwrap_or_default()
    }
}

#[async_trait]
impl CompletionProvider for ScriptedCompletion {
    fn name(&self) -> &'static str {
        "scripted"
    }

    async fn complete(
        &self,
        system_prompt: &str,
        user_message: &str,
        _options: &CompletionOptions,
    ) -> Result<Completion, ProviderError> {
        if let Ok(mut prompts) = self.prompts.lock() {
            prompts.push((system_prompt.to_string(), user_message.to_string()));
        }
        match self.reply {
            Reply::Text(text) => Ok(Completion { text: text.to_string(), tokens_used: 120 }),
            Reply::MissingKey => Err(ProviderError::configuration("openai", "missing api key")),
        }
    }
}

/// Search results keyed by a query substring; queries containing a failing marker error out.
struct ScriptedDiscovery {
    results: Vec<(&'static str, Vec<SearchHit>)>,
    failing: Vec<&'static str>,
}

impl ScriptedDiscovery {
    fn empty() -> Self {
        Self { results: Vec::new(), failing: Vec::new() }
    }
}

#[async_trait]
impl DiscoveryProvider for ScriptedDiscovery {
    fn name(&self) -> &'static str {
        "scripted"
    }

    async fn scrape(&self, url: &str) -> Result<ScrapedPage, ProviderError> {
        Err(ProviderError::upstream("scripted", Some(404), format!("{url} not found")))
    }

    async fn search(
        &self,
        query: &str,
        _options: &SearchOptions,
    ) -> Result<Vec<SearchHit>, ProviderError> {
        if self.failing.iter().any(|marker| query.contains(marker)) {
            return Err(ProviderError::upstream("scripted", Some(503), "search backend down"));
        }
        Ok(self
            .results
            .iter()
            .find(|(pattern, _)| query.contains(pattern))
            .map(|(_, hits)| hits.clone())
            .unwrap_or_default())
    }
}

fn hit(url: &str, text: &str) -> SearchHit {
    SearchHit {
        url: url.to_string(),
        title: Some("Thread".to_string()),
        snippet: Some(text.to_string()),
        content: None,
        description: None,
    }
}

struct Harness {
    runtime: AgentRuntime,
    runs: Arc<InMemoryAgentRunRepository>,
    contacts: Arc<InMemoryContactRepository>,
    activity: Arc<InMemoryActivityRepository>,
    sentiment: Arc<InMemorySentimentRepository>,
    completion: Arc<ScriptedCompletion>,
}

impl Harness {
    fn new(reply: Reply, discovery: ScriptedDiscovery) -> Self {
        let runs = Arc::new(InMemoryAgentRunRepository::default());
        let contacts = Arc::new(InMemoryContactRepository::default());
        let activity = Arc::new(InMemoryActivityRepository::default());
        let sentiment = Arc::new(InMemorySentimentRepository::default());
        let integrations = Arc::new(InMemoryIntegrationRepository::default());
        let completion = Arc::new(ScriptedCompletion::new(reply));

        let context = AgentContext {
            providers: ProviderRegistry::new(completion.clone(), Arc::new(discovery), None),
            contacts: contacts.clone(),
            ledger: RunLedger::new(runs.clone()),
            activity: ActivityEmitter::new(activity.clone()),
            sentiment: SentimentRecorder::new(sentiment.clone()),
            crm: CrmSync::new(None, integrations),
            default_max_leads: 10,
        };

        Self {
            runtime: AgentRuntime::new(AgentRegistry::new(context)),
            runs,
            contacts,
            activity,
            sentiment,
            completion,
        }
    }

    async fn run(
        &self,
        profile: &Profile,
        agent_type: AgentType,
        input: Value,
        contact_id: Option<ContactId>,
    ) -> Result<(AgentRun, Result<(), String>), String> {
        let launched = self
            .runtime
            .launch(profile.clone(), agent_type, input, contact_id)
            .await
            .map_err(|error| format!("launch failed: {error}"))?;
        let run_id = launched.run_id.clone();
        let outcome = launched.wait().await.map_err(|error| error.error_class().to_string());
        let run = self
            .runs
            .find_by_id(&run_id)
            .await
            .map_err(|error| error.to_string())?
            .ok_or_else(|| "run row missing".to_string())?;
        Ok((run, outcome))
    }

    async fn event_types(&self, run_id: &AgentRunId) -> Result<Vec<ActivityType>, String> {
        let events = self.activity.list_for_run(run_id).await.map_err(|error| error.to_string())?;
        Ok(events.into_iter().map(|event| event.event_type).collect())
    }

    async fn contacts_for(&self, profile: &Profile) -> Result<Vec<Contact>, String> {
        self.contacts.list_for_profile(&profile.id).await.map_err(|error| error.to_string())
    }
}

fn profile(mode: ProfileMode, focus_terms: &[&str]) -> Profile {
    let terms: Vec<String> = focus_terms.iter().map(|term| term.to_string()).collect();
    let (service_offerings, policy_pillars) = match mode {
        ProfileMode::Business => (terms, Vec::new()),
        ProfileMode::Political => (Vec::new(), terms),
    };
    Profile {
        id: ProfileId("P-1".to_string()),
        name: "Harbour Plumbing".to_string(),
        mode,
        context: Some("Family-run plumbing shop".to_string()),
        target_persona: Some("Homeowners".to_string()),
        location: Some("Halifax".to_string()),
        knowledge_base: Vec::new(),
        service_offerings,
        business_objections: Vec::new(),
        riding: None,
        candidate_name: None,
        policy_pillars,
        political_objections: Vec::new(),
        created_at: Utc::now(),
        updated_at: Utc::now(),
    }
}

fn output_u64(run: &AgentRun, key: &str) -> Option<u64> {
    run.output_data.as_ref().and_then(|output| output.get(key)).and_then(Value::as_u64)
}

fn output_str<'a>(run: &'a AgentRun, key: &str) -> Option<&'a str> {
    run.output_data.as_ref().and_then(|output| output.get(key)).and_then(Value::as_str)
}

const TWO_LEADS: &str = r#"[
  {"name": "Dana Lee", "relevance": 82, "hook": "Asked about a clogged drain"},
  {"name": "Omar Haddad", "relevance": 40}
]"#;

#[tokio::test]
async fn unreachable_sources_fall_back_to_ai_prospecting() -> TestResult {
    let harness = Harness::new(Reply::Text(TWO_LEADS), ScriptedDiscovery::empty());
    let profile = profile(ProfileMode::Business, &["drain cleaning"]);

    let (run, outcome) =
        harness.run(&profile, AgentType::LeadDiscovery, json!({}), None).await?;

    ensure(outcome.is_ok(), format!("run should succeed: {outcome:?}"))?;
    ensure(run.status == RunStatus::Completed, "run completed")?;
    ensure(output_str(&run, "mode") == Some("ai_prospecting"), "ai_prospecting mode")?;
    ensure(output_u64(&run, "queries_built") == Some(3), "three template queries")?;
    ensure(output_u64(&run, "items_fetched") == Some(0), "nothing fetched")?;
    ensure(output_str(&run, "recency") == Some("1month"), "business recency default")?;
    ensure(run.tokens_used == 120, "tokens recorded")?;

    let events = harness.event_types(&run.id).await?;
    ensure(
        events
            == vec![
                ActivityType::AgentStart,
                ActivityType::Scanning,
                ActivityType::Analyzing,
                ActivityType::LeadFound,
                ActivityType::LeadFound,
                ActivityType::AgentComplete,
            ],
        format!("unexpected event sequence: {events:?}"),
    )?;

    let contacts = harness.contacts_for(&profile).await?;
    ensure(contacts.len() == 2, "two contacts")?;
    ensure(
        contacts.iter().all(|contact| contact.source == "ai_prospecting"),
        "simulated leads are tagged ai_prospecting",
    )?;
    let prompts = harness.completion.system_prompts();
    ensure(prompts.len() == 1, "exactly one completion call")?;
    ensure(prompts[0].contains("simulated"), "ai_prospecting prompt used")
}

#[tokio::test]
async fn usable_search_results_switch_to_scraped_mode() -> TestResult {
    let discovery = ScriptedDiscovery {
        results: vec![(
            "burst pipe",
            vec![
                hit("https://forum.example/t/1", "Burst pipe under my sink, who can come today?"),
                hit("https://forum.example/t/2", "Any plumber free for a burst pipe in Dartmouth?"),
                hit("https://forum.example/t/3", "Landlord ignoring our burst pipe, need a pro"),
            ],
        )],
        failing: Vec::new(),
    };
    let reply = r#"[
      {"name": "Kim Chu", "source": "https://forum.example/t/1", "relevance": 90},
      {"name": "Raj Patel", "source": "https://forum.example/t/2", "relevance": 75},
      {"name": "Liz Grant", "source": "https://forum.example/t/3", "relevance": 60}
    ]"#;
    let harness = Harness::new(Reply::Text(reply), discovery);
    let profile = profile(ProfileMode::Business, &[]);

    let (run, outcome) = harness
        .run(
            &profile,
            AgentType::LeadDiscovery,
            json!({ "keywords": ["burst pipe"], "recency": "any" }),
            None,
        )
        .await?;

    ensure(outcome.is_ok(), "run should succeed")?;
    ensure(output_str(&run, "mode") == Some("scraped"), "scraped mode")?;
    ensure(output_u64(&run, "items_fetched") == Some(3), "three items fetched")?;
    ensure(output_u64(&run, "leads_found") == Some(3), "three leads")?;

    let contacts = harness.contacts_for(&profile).await?;
    ensure(contacts.len() == 3, "three contacts")?;
    ensure(
        contacts.iter().all(|contact| contact.source.starts_with("https://forum.example/t/")),
        "every contact traces to a fetched item",
    )?;
    let warm = contacts.iter().filter(|contact| contact.relevance >= 70).count();
    ensure(warm == 2, "two warm leads")?;
    ensure(harness.completion.system_prompts()[0].contains("literally appear"), "scraped prompt")
}

#[tokio::test]
async fn fenced_model_output_is_parsed() -> TestResult {
    let fenced = "```json\n[{\"name\": \"Dana Lee\"}, {\"name\": \"Omar Haddad\"}]\n```";
    let harness = Harness::new(Reply::Text(fenced), ScriptedDiscovery::empty());
    let profile = profile(ProfileMode::Business, &[]);

    let (run, outcome) =
        harness.run(&profile, AgentType::LeadDiscovery, json!(null), None).await?;

    ensure(outcome.is_ok(), "run should succeed")?;
    ensure(output_u64(&run, "leads_found") == Some(2), "both fenced leads parsed")
}

#[tokio::test]
async fn unparseable_model_output_completes_with_zero_leads() -> TestResult {
    let harness = Harness::new(Reply::Text("not json"), ScriptedDiscovery::empty());
    let profile = profile(ProfileMode::Business, &["drain cleaning"]);

    let (run, outcome) =
        harness.run(&profile, AgentType::LeadDiscovery, json!({}), None).await?;

    ensure(outcome.is_ok(), "parse failure must not fail the run")?;
    ensure(run.status == RunStatus::Completed, "run completed")?;
    ensure(output_u64(&run, "leads_found") == Some(0), "zero leads")?;
    ensure(harness.contacts_for(&profile).await?.is_empty(), "no contacts")
}

#[tokio::test]
async fn one_failing_search_is_reported_once_and_the_rest_proceed() -> TestResult {
    let discovery = ScriptedDiscovery {
        results: vec![
            ("burst pipe", vec![hit("https://forum.example/t/1", "Burst pipe in the kitchen, help")]),
            ("sewer backup", vec![hit("https://forum.example/t/7", "Sewer backup in basement again")]),
        ],
        failing: vec!["flooded"],
    };
    let reply = r#"[
      {"name": "Kim Chu", "source": "https://forum.example/t/1"},
      {"name": "Ben Ortiz", "source": "https://forum.example/t/7"}
    ]"#;
    let harness = Harness::new(Reply::Text(reply), discovery);
    let profile = profile(ProfileMode::Business, &[]);

    let (run, outcome) = harness
        .run(
            &profile,
            AgentType::LeadDiscovery,
            json!({
                "keywords": ["burst pipe", "flooded basement", "sewer backup"],
                "recency": "any"
            }),
            None,
        )
        .await?;

    ensure(outcome.is_ok(), "run should succeed")?;
    ensure(output_str(&run, "mode") == Some("scraped"), "scraped mode")?;
    ensure(output_u64(&run, "items_fetched") == Some(2), "two items fetched")?;
    let errors = run
        .output_data
        .as_ref()
        .and_then(|output| output.get("errors"))
        .and_then(Value::as_array)
        .cloned()
        .unwrap_or_default();
    ensure(errors.len() == 1, "one recorded failure")?;
    ensure(errors[0]["label"] == "flooded basement", "failure carries the task label")?;

    let events = harness.activity.list_for_run(&run.id).await.map_err(|e| e.to_string())?;
    let scrape_errors: Vec<_> =
        events.iter().filter(|event| event.event_type == ActivityType::ScrapeErrors).collect();
    ensure(scrape_errors.len() == 1, "exactly one scrape_errors event")?;
    ensure(
        scrape_errors[0].detail.as_deref() == Some("flooded basement"),
        "scrape_errors lists the failed task",
    )?;
    ensure(harness.contacts_for(&profile).await?.len() == 2, "leads from surviving tasks")
}

#[tokio::test]
async fn zero_max_leads_completes_without_contacts() -> TestResult {
    let harness = Harness::new(Reply::Text(TWO_LEADS), ScriptedDiscovery::empty());
    let profile = profile(ProfileMode::Business, &[]);

    let (run, outcome) =
        harness.run(&profile, AgentType::LeadDiscovery, json!({ "max_leads": 0 }), None).await?;

    ensure(outcome.is_ok(), "run should succeed")?;
    ensure(run.status == RunStatus::Completed, "run completed")?;
    ensure(output_u64(&run, "queries_built") == Some(0), "no tasks were built")?;
    ensure(output_str(&run, "mode") == Some("ai_prospecting"), "zero tasks fall through")?;
    ensure(output_u64(&run, "leads_found") == Some(0), "zero leads")?;
    ensure(harness.contacts_for(&profile).await?.is_empty(), "no contacts")
}

#[tokio::test]
async fn political_leads_stay_unknown_and_use_week_window() -> TestResult {
    let reply = r#"[{"name": "Priya Nair", "relevance": 95}]"#;
    let harness = Harness::new(Reply::Text(reply), ScriptedDiscovery::empty());
    let profile = profile(ProfileMode::Political, &["transit"]);

    let (run, outcome) =
        harness.run(&profile, AgentType::LeadDiscovery, json!({}), None).await?;

    ensure(outcome.is_ok(), "run should succeed")?;
    ensure(output_str(&run, "recency") == Some("1week"), "political recency default")?;
    let contacts = harness.contacts_for(&profile).await?;
    ensure(contacts.len() == 1, "one contact")?;
    ensure(contacts[0].voter_intent == Some(VoterIntent::Unknown), "voter intent unknown")?;
    ensure(contacts[0].lead_status.is_none(), "no business status")
}

#[tokio::test]
async fn provider_errors_fail_the_run_and_reach_the_supervisor() -> TestResult {
    let harness = Harness::new(Reply::MissingKey, ScriptedDiscovery::empty());
    let profile = profile(ProfileMode::Business, &[]);

    let (run, outcome) =
        harness.run(&profile, AgentType::LeadDiscovery, json!({}), None).await?;

    ensure(outcome == Err("provider_configuration".to_string()), "error returned to caller")?;
    ensure(run.status == RunStatus::Failed, "run failed")?;
    let message = output_str(&run, "error").unwrap_or_default();
    ensure(message.contains("missing api key"), format!("error recorded verbatim: {message}"))?;

    let events = harness.event_types(&run.id).await?;
    ensure(events.last() == Some(&ActivityType::AgentError), "agent_error closes the feed")
}

#[tokio::test]
async fn sentiment_scan_rejects_business_profiles() -> TestResult {
    let harness = Harness::new(Reply::Text("{\"score\": 10}"), ScriptedDiscovery::empty());
    let profile = profile(ProfileMode::Business, &[]);

    let (run, outcome) = harness
        .run(&profile, AgentType::SentimentScan, json!({ "issue": "x", "signal": "y" }), None)
        .await?;

    ensure(outcome == Err("profile_mode_mismatch".to_string()), "mode mismatch surfaced")?;
    ensure(run.status == RunStatus::Failed, "run failed")
}

fn stored_contact(profile: &Profile, id: &str) -> Contact {
    Contact {
        id: ContactId(id.to_string()),
        profile_id: profile.id.clone(),
        name: "Sam Reid".to_string(),
        email: None,
        phone: None,
        social_handle: None,
        profile_url: None,
        source: "https://forum.example/t/4".to_string(),
        relevance: 80,
        lead_status: None,
        voter_intent: Some(VoterIntent::Unknown),
        donor_intent: None,
        tags: Vec::new(),
        notes: None,
        hook: Some("Asked about the 21 bus route".to_string()),
        crm_external_id: None,
        created_at: Utc::now(),
        updated_at: Utc::now(),
    }
}

#[tokio::test]
async fn sentiment_scan_appends_reading_and_moves_intent() -> TestResult {
    let reply = "Here is my read: {\"score\": 65, \"voter_intent\": \"leaning\", \
                 \"summary\": \"Likes the transit plan\"}";
    let harness = Harness::new(Reply::Text(reply), ScriptedDiscovery::empty());
    let profile = profile(ProfileMode::Political, &["transit"]);
    let contact = stored_contact(&profile, "C-1");
    harness.contacts.save(contact.clone()).await.map_err(|error| error.to_string())?;

    let (run, outcome) = harness
        .run(
            &profile,
            AgentType::SentimentScan,
            json!({ "issue": "transit", "signal": "Finally someone fixing the 21 bus" }),
            Some(contact.id.clone()),
        )
        .await?;

    ensure(outcome.is_ok(), format!("run should succeed: {outcome:?}"))?;
    ensure(run.contact_id == Some(contact.id.clone()), "run references the contact")?;
    let readings =
        harness.sentiment.list_for_contact(&contact.id).await.map_err(|e| e.to_string())?;
    ensure(readings.len() == 1 && readings[0].score == 65, "one reading with the model score")?;

    let updated = harness
        .contacts
        .find_by_id(&contact.id)
        .await
        .map_err(|error| error.to_string())?
        .ok_or("contact missing")?;
    ensure(updated.voter_intent == Some(VoterIntent::Leaning), "voter intent moved")
}

#[tokio::test]
async fn run_row_names_the_contact_the_executor_scored() -> TestResult {
    let harness = Harness::new(Reply::Text("{\"score\": -20}"), ScriptedDiscovery::empty());
    let profile = profile(ProfileMode::Political, &["transit"]);
    let scored = stored_contact(&profile, "C-7");
    let other = stored_contact(&profile, "C-8");
    harness.contacts.save(scored.clone()).await.map_err(|error| error.to_string())?;
    harness.contacts.save(other.clone()).await.map_err(|error| error.to_string())?;

    let (run, outcome) = harness
        .run(
            &profile,
            AgentType::SentimentScan,
            json!({ "contact_id": "C-7", "issue": "transit", "signal": "Buses are always late" }),
            None,
        )
        .await?;

    ensure(outcome.is_ok(), format!("run should succeed: {outcome:?}"))?;
    ensure(run.contact_id == Some(scored.id.clone()), "row names the input contact")?;
    let readings =
        harness.sentiment.list_for_contact(&scored.id).await.map_err(|e| e.to_string())?;
    ensure(readings.len() == 1, "reading written for the same contact")?;

    let conflicting = harness
        .runtime
        .launch(
            profile.clone(),
            AgentType::SentimentScan,
            json!({ "contact_id": "C-7", "issue": "transit", "signal": "Late again" }),
            Some(other.id.clone()),
        )
        .await;
    ensure(
        matches!(&conflicting, Err(error) if error.error_class() == "invalid_input"),
        "conflicting contacts are rejected at launch",
    )?;
    let rows = harness.runs.list_for_profile(&profile.id).await.map_err(|e| e.to_string())?;
    ensure(rows.len() == 1, "no row written for the rejected launch")
}

#[tokio::test]
async fn out_of_range_sentiment_fails_the_run() -> TestResult {
    let harness = Harness::new(Reply::Text("{\"score\": 140}"), ScriptedDiscovery::empty());
    let profile = profile(ProfileMode::Political, &[]);
    let contact = stored_contact(&profile, "C-2");
    harness.contacts.save(contact.clone()).await.map_err(|error| error.to_string())?;

    let (run, outcome) = harness
        .run(
            &profile,
            AgentType::SentimentScan,
            json!({ "issue": "housing", "signal": "Rents are out of control" }),
            Some(contact.id.clone()),
        )
        .await?;

    ensure(outcome == Err("sentiment_out_of_range".to_string()), "range violation surfaced")?;
    ensure(run.status == RunStatus::Failed, "run failed")?;
    let readings =
        harness.sentiment.list_for_contact(&contact.id).await.map_err(|e| e.to_string())?;
    ensure(readings.is_empty(), "nothing appended")
}

#[tokio::test]
async fn outreach_draft_is_stored_on_the_run() -> TestResult {
    let harness = Harness::new(
        Reply::Text("  Hi Sam, saw your question about the 21 bus...  "),
        ScriptedDiscovery::empty(),
    );
    let profile = profile(ProfileMode::Political, &["transit"]);
    let contact = stored_contact(&profile, "C-3");
    harness.contacts.save(contact.clone()).await.map_err(|error| error.to_string())?;

    let (run, outcome) = harness
        .run(&profile, AgentType::OutreachWriter, json!({ "channel": "sms" }), Some(contact.id))
        .await?;

    ensure(outcome.is_ok(), "run should succeed")?;
    ensure(
        output_str(&run, "message") == Some("Hi Sam, saw your question about the 21 bus..."),
        "trimmed draft stored",
    )?;
    ensure(output_str(&run, "channel") == Some("sms"), "channel recorded")?;
    let events = harness.event_types(&run.id).await?;
    ensure(events.contains(&ActivityType::MessageDrafted), "message_drafted emitted")
}

#[tokio::test]
async fn outreach_for_another_profiles_contact_fails() -> TestResult {
    let harness = Harness::new(Reply::Text("Hello"), ScriptedDiscovery::empty());
    let profile = profile(ProfileMode::Business, &[]);
    let mut contact = stored_contact(&profile, "C-4");
    contact.profile_id = ProfileId("P-other".to_string());
    harness.contacts.save(contact.clone()).await.map_err(|error| error.to_string())?;

    let (run, outcome) = harness
        .run(&profile, AgentType::OutreachWriter, json!({}), Some(contact.id))
        .await?;

    ensure(outcome == Err("contact_outside_profile".to_string()), "ownership enforced")?;
    ensure(run.status == RunStatus::Failed, "run failed")?;
    ensure(harness.completion.system_prompts().is_empty(), "no completion call was made")
}
