//! Vendor-neutral capability interfaces for completion, web discovery and CRM sync,
//! with the concrete HTTP backends selected from configuration.

pub mod completion;
pub mod crm;
pub mod discovery;
pub mod error;
pub mod registry;

mod http;

pub use completion::{Completion, CompletionOptions, CompletionProvider};
pub use crm::{
    ConnectionCheck, CrmBackend, CrmProvider, CrmPushResult, PullOptions, PullPage, PulledContact,
};
pub use discovery::{DiscoveryProvider, ScrapedPage, SearchHit, SearchOptions};
pub use error::ProviderError;
pub use registry::{CrmConnector, HttpCrmConnector, ProviderRegistry};
