use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("{provider} is not configured: {message}")]
    Configuration { provider: &'static str, message: String },
    #[error("{provider} upstream error{}: {message}", status_suffix(.status))]
    Upstream { provider: &'static str, status: Option<u16>, message: String },
    #[error("{provider} does not support {capability}")]
    Unsupported { provider: &'static str, capability: &'static str },
    #[error("unknown {kind} provider `{name}`")]
    UnknownProvider { kind: &'static str, name: String },
}

impl ProviderError {
    pub fn configuration(provider: &'static str, message: impl Into<String>) -> Self {
        Self::Configuration { provider, message: message.into() }
    }

    pub fn upstream(provider: &'static str, status: Option<u16>, message: impl Into<String>) -> Self {
        Self::Upstream { provider, status, message: message.into() }
    }

    pub fn error_class(&self) -> &'static str {
        match self {
            Self::Configuration { .. } => "provider_configuration",
            Self::Upstream { .. } => "provider_upstream",
            Self::Unsupported { .. } => "provider_unsupported",
            Self::UnknownProvider { .. } => "provider_unknown",
        }
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Upstream { status, .. } => *status,
            _ => None,
        }
    }
}

fn status_suffix(status: &Option<u16>) -> String {
    status.map(|code| format!(" (HTTP {code})")).unwrap_or_default()
}
