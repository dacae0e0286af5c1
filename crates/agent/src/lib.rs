//! Agent execution for Canvass.
//!
//! A run moves through one ledger row: the runtime writes it as `running`, detaches the
//! executor selected by `agent_type`, and the executor's shared contract performs exactly
//! one terminal write (`completed` with output and token count, or `failed` with the error).
//!
//! Variants:
//! - `lead_discovery` builds search/scrape tasks, fetches with per-task failure isolation,
//!   picks `scraped` or `ai_prospecting` extraction and materializes contacts.
//! - `outreach_writer` drafts a personalized message for one contact.
//! - `intel_report` writes competitor or opposition intelligence.
//! - `sentiment_scan` scores a constituent signal and appends a sentiment reading.
//!
//! Activity events and sentiment readings are append-only side channels. CRM sync is
//! best effort and never fails a run.

pub mod activity;
pub mod crm_sync;
pub mod error;
pub mod executor;
pub mod intel;
pub mod lead;
pub mod ledger;
pub mod outreach;
pub mod prompts;
pub mod runtime;
pub mod sentiment;
pub mod sentiment_scan;

pub use activity::ActivityEmitter;
pub use crm_sync::CrmSync;
pub use error::AgentError;
pub use executor::{AgentContext, AgentExecutor, AgentOutcome, AgentRegistry};
pub use lead::PipelineMode;
pub use ledger::RunLedger;
pub use runtime::{AgentRuntime, LaunchedRun};
pub use sentiment::{SentimentRecorder, SentimentSignal};
