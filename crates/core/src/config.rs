use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    pub llm: LlmConfig,
    pub discovery: DiscoveryConfig,
    pub crm: CrmConfig,
    pub pipeline: PipelineConfig,
    pub logging: LoggingConfig,
}

#[derive(Clone, Debug)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub timeout_secs: u64,
}

#[derive(Clone, Debug)]
pub struct LlmConfig {
    pub provider: CompletionBackend,
    pub api_key: Option<SecretString>,
    pub base_url: Option<String>,
    pub model: String,
    pub timeout_secs: u64,
}

#[derive(Clone, Debug)]
pub struct DiscoveryConfig {
    pub provider: DiscoveryBackend,
    pub api_key: Option<SecretString>,
    pub base_url: Option<String>,
    pub timeout_secs: u64,
    pub max_content_chars: usize,
}

#[derive(Clone, Debug)]
pub struct CrmConfig {
    pub enabled: bool,
    pub timeout_secs: u64,
}

#[derive(Clone, Debug)]
pub struct PipelineConfig {
    pub default_max_leads: usize,
}

#[derive(Clone, Debug)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompletionBackend {
    OpenAi,
    Anthropic,
    Ollama,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiscoveryBackend {
    Basic,
    Firecrawl,
    Tavily,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    Compact,
    Pretty,
    Json,
}

#[derive(Clone, Debug, Default)]
pub struct ConfigOverrides {
    pub database_url: Option<String>,
    pub log_level: Option<String>,
    pub llm_provider: Option<CompletionBackend>,
    pub llm_model: Option<String>,
    pub llm_api_key: Option<String>,
    pub discovery_provider: Option<DiscoveryBackend>,
    pub discovery_api_key: Option<String>,
    pub crm_enabled: Option<bool>,
}

#[derive(Clone, Debug, Default)]
pub struct LoadOptions {
    pub config_path: Option<PathBuf>,
    pub require_file: bool,
    pub overrides: ConfigOverrides,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read config file `{path}`: {source}")]
    ReadFile { path: PathBuf, source: std::io::Error },
    #[error("could not parse config file `{path}`: {source}")]
    ParseFile { path: PathBuf, source: toml::de::Error },
    #[error("required config file was not found: `{0}`")]
    MissingConfigFile(PathBuf),
    #[error("environment variable interpolation failed for `{var}`")]
    MissingEnvInterpolation { var: String },
    #[error("unterminated environment interpolation expression")]
    UnterminatedInterpolation,
    #[error("invalid environment override for `{key}`: `{value}`")]
    InvalidEnvOverride { key: String, value: String },
    #[error("configuration validation failed: {0}")]
    Validation(String),
}

const DEFAULT_OLLAMA_BASE_URL: &str = "http://localhost:11434";

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database: DatabaseConfig {
                url: "sqlite://canvass.db".to_string(),
                max_connections: 5,
                timeout_secs: 30,
            },
            llm: LlmConfig {
                provider: CompletionBackend::Ollama,
                api_key: None,
                base_url: None,
                model: "llama3.1".to_string(),
                timeout_secs: 120,
            },
            discovery: DiscoveryConfig {
                provider: DiscoveryBackend::Basic,
                api_key: None,
                base_url: None,
                timeout_secs: 30,
                max_content_chars: 15_000,
            },
            crm: CrmConfig { enabled: true, timeout_secs: 20 },
            pipeline: PipelineConfig { default_max_leads: 10 },
            logging: LoggingConfig { level: "info".to_string(), format: LogFormat::Compact },
        }
    }
}

fn secret_value(value: String) -> SecretString {
    value.into()
}

impl CompletionBackend {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::OpenAi => "openai",
            Self::Anthropic => "anthropic",
            Self::Ollama => "ollama",
        }
    }
}

impl DiscoveryBackend {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Basic => "basic",
            Self::Firecrawl => "firecrawl",
            Self::Tavily => "tavily",
        }
    }
}

impl std::str::FromStr for CompletionBackend {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "openai" => Ok(Self::OpenAi),
            "anthropic" => Ok(Self::Anthropic),
            "ollama" => Ok(Self::Ollama),
            other => Err(ConfigError::Validation(format!(
                "unsupported llm provider `{other}` (expected openai|anthropic|ollama)"
            ))),
        }
    }
}

impl std::str::FromStr for DiscoveryBackend {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "basic" => Ok(Self::Basic),
            "firecrawl" => Ok(Self::Firecrawl),
            "tavily" => Ok(Self::Tavily),
            other => Err(ConfigError::Validation(format!(
                "unsupported discovery provider `{other}` (expected basic|firecrawl|tavily)"
            ))),
        }
    }
}

impl std::str::FromStr for LogFormat {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "compact" => Ok(Self::Compact),
            "pretty" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            other => Err(ConfigError::Validation(format!(
                "unsupported log format `{other}` (expected compact|pretty|json)"
            ))),
        }
    }
}

impl AppConfig {
    pub fn load(options: LoadOptions) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        let maybe_path = resolve_config_path(options.config_path.as_deref());

        if let Some(path) = maybe_path {
            let patch = read_patch(&path)?;
            config.apply_patch(patch)?;
        } else if options.require_file {
            let expected = options.config_path.unwrap_or_else(|| PathBuf::from("canvass.toml"));
            return Err(ConfigError::MissingConfigFile(expected));
        }

        config.apply_env_overrides()?;
        config.apply_overrides(options.overrides);
        config.fill_backend_defaults();
        config.validate()?;

        Ok(config)
    }

    /// Ollama has no hosted endpoint, so an unset base url means the local daemon.
    fn fill_backend_defaults(&mut self) {
        if self.llm.provider == CompletionBackend::Ollama && self.llm.base_url.is_none() {
            self.llm.base_url = Some(DEFAULT_OLLAMA_BASE_URL.to_string());
        }
    }

    fn apply_patch(&mut self, patch: ConfigPatch) -> Result<(), ConfigError> {
        if let Some(database) = patch.database {
            if let Some(url) = database.url {
                self.database.url = url;
            }
            if let Some(max_connections) = database.max_connections {
                self.database.max_connections = max_connections;
            }
            if let Some(timeout_secs) = database.timeout_secs {
                self.database.timeout_secs = timeout_secs;
            }
        }

        if let Some(llm) = patch.llm {
            if let Some(provider) = llm.provider {
                self.llm.provider = provider.parse()?;
            }
            if let Some(api_key) = llm.api_key {
                self.llm.api_key = Some(secret_value(api_key));
            }
            if let Some(base_url) = llm.base_url {
                self.llm.base_url = Some(base_url);
            }
            if let Some(model) = llm.model {
                self.llm.model = model;
            }
            if let Some(timeout_secs) = llm.timeout_secs {
                self.llm.timeout_secs = timeout_secs;
            }
        }

        if let Some(discovery) = patch.discovery {
            if let Some(provider) = discovery.provider {
                self.discovery.provider = provider.parse()?;
            }
            if let Some(api_key) = discovery.api_key {
                self.discovery.api_key = Some(secret_value(api_key));
            }
            if let Some(base_url) = discovery.base_url {
                self.discovery.base_url = Some(base_url);
            }
            if let Some(timeout_secs) = discovery.timeout_secs {
                self.discovery.timeout_secs = timeout_secs;
            }
            if let Some(max_content_chars) = discovery.max_content_chars {
                self.discovery.max_content_chars = max_content_chars;
            }
        }

        if let Some(crm) = patch.crm {
            if let Some(enabled) = crm.enabled {
                self.crm.enabled = enabled;
            }
            if let Some(timeout_secs) = crm.timeout_secs {
                self.crm.timeout_secs = timeout_secs;
            }
        }

        if let Some(pipeline) = patch.pipeline {
            if let Some(default_max_leads) = pipeline.default_max_leads {
                self.pipeline.default_max_leads = default_max_leads;
            }
        }

        if let Some(logging) = patch.logging {
            if let Some(level) = logging.level {
                self.logging.level = level;
            }
            if let Some(format) = logging.format {
                self.logging.format = format;
            }
        }

        Ok(())
    }

    fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        if let Some(value) = read_env("CANVASS_DATABASE_URL") {
            self.database.url = value;
        }
        if let Some(value) = read_env("CANVASS_DATABASE_MAX_CONNECTIONS") {
            self.database.max_connections =
                parse_number("CANVASS_DATABASE_MAX_CONNECTIONS", &value)?;
        }
        if let Some(value) = read_env("CANVASS_DATABASE_TIMEOUT_SECS") {
            self.database.timeout_secs = parse_number("CANVASS_DATABASE_TIMEOUT_SECS", &value)?;
        }

        if let Some(value) = read_env("CANVASS_LLM_PROVIDER") {
            self.llm.provider = value.parse()?;
        }
        if let Some(value) = read_env("CANVASS_LLM_API_KEY") {
            self.llm.api_key = Some(secret_value(value));
        }
        if let Some(value) = read_env("CANVASS_LLM_BASE_URL") {
            self.llm.base_url = Some(value);
        }
        if let Some(value) = read_env("CANVASS_LLM_MODEL") {
            self.llm.model = value;
        }
        if let Some(value) = read_env("CANVASS_LLM_TIMEOUT_SECS") {
            self.llm.timeout_secs = parse_number("CANVASS_LLM_TIMEOUT_SECS", &value)?;
        }

        if let Some(value) = read_env("CANVASS_DISCOVERY_PROVIDER") {
            self.discovery.provider = value.parse()?;
        }
        if let Some(value) = read_env("CANVASS_DISCOVERY_API_KEY") {
            self.discovery.api_key = Some(secret_value(value));
        }
        if let Some(value) = read_env("CANVASS_DISCOVERY_BASE_URL") {
            self.discovery.base_url = Some(value);
        }
        if let Some(value) = read_env("CANVASS_DISCOVERY_TIMEOUT_SECS") {
            self.discovery.timeout_secs = parse_number("CANVASS_DISCOVERY_TIMEOUT_SECS", &value)?;
        }
        if let Some(value) = read_env("CANVASS_DISCOVERY_MAX_CONTENT_CHARS") {
            self.discovery.max_content_chars =
                parse_number("CANVASS_DISCOVERY_MAX_CONTENT_CHARS", &value)?;
        }

        if let Some(value) = read_env("CANVASS_CRM_ENABLED") {
            self.crm.enabled = parse_bool("CANVASS_CRM_ENABLED", &value)?;
        }
        if let Some(value) = read_env("CANVASS_CRM_TIMEOUT_SECS") {
            self.crm.timeout_secs = parse_number("CANVASS_CRM_TIMEOUT_SECS", &value)?;
        }

        if let Some(value) = read_env("CANVASS_PIPELINE_DEFAULT_MAX_LEADS") {
            self.pipeline.default_max_leads =
                parse_number("CANVASS_PIPELINE_DEFAULT_MAX_LEADS", &value)?;
        }

        let log_level =
            read_env("CANVASS_LOGGING_LEVEL").or_else(|| read_env("CANVASS_LOG_LEVEL"));
        if let Some(value) = log_level {
            self.logging.level = value;
        }
        let log_format =
            read_env("CANVASS_LOGGING_FORMAT").or_else(|| read_env("CANVASS_LOG_FORMAT"));
        if let Some(value) = log_format {
            self.logging.format = value.parse()?;
        }

        Ok(())
    }

    fn apply_overrides(&mut self, overrides: ConfigOverrides) {
        if let Some(database_url) = overrides.database_url {
            self.database.url = database_url;
        }
        if let Some(log_level) = overrides.log_level {
            self.logging.level = log_level;
        }
        if let Some(llm_provider) = overrides.llm_provider {
            self.llm.provider = llm_provider;
        }
        if let Some(llm_model) = overrides.llm_model {
            self.llm.model = llm_model;
        }
        if let Some(llm_api_key) = overrides.llm_api_key {
            self.llm.api_key = Some(secret_value(llm_api_key));
        }
        if let Some(discovery_provider) = overrides.discovery_provider {
            self.discovery.provider = discovery_provider;
        }
        if let Some(discovery_api_key) = overrides.discovery_api_key {
            self.discovery.api_key = Some(secret_value(discovery_api_key));
        }
        if let Some(enabled) = overrides.crm_enabled {
            self.crm.enabled = enabled;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_database(&self.database)?;
        validate_llm(&self.llm)?;
        validate_discovery(&self.discovery)?;
        validate_timeout("crm.timeout_secs", self.crm.timeout_secs)?;
        validate_pipeline(&self.pipeline)?;
        validate_logging(&self.logging)?;
        Ok(())
    }
}

impl LlmConfig {
    /// Whether a credential is present for the selected backend. Missing credentials are
    /// reported by the provider at call time, not at load.
    pub fn has_credential(&self) -> bool {
        match self.provider {
            CompletionBackend::OpenAi | CompletionBackend::Anthropic => {
                non_empty_secret(self.api_key.as_ref())
            }
            CompletionBackend::Ollama => {
                self.base_url.as_deref().is_some_and(|url| !url.trim().is_empty())
            }
        }
    }
}

impl DiscoveryConfig {
    pub fn has_credential(&self) -> bool {
        match self.provider {
            DiscoveryBackend::Basic => true,
            DiscoveryBackend::Firecrawl | DiscoveryBackend::Tavily => {
                non_empty_secret(self.api_key.as_ref())
            }
        }
    }
}

fn non_empty_secret(value: Option<&SecretString>) -> bool {
    value.is_some_and(|secret| !secret.expose_secret().trim().is_empty())
}

fn resolve_config_path(explicit_path: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit_path {
        return path.exists().then_some(path.to_path_buf());
    }

    [PathBuf::from("canvass.toml"), PathBuf::from("config/canvass.toml")]
        .into_iter()
        .find(|path| path.exists())
}

fn read_patch(path: &Path) -> Result<ConfigPatch, ConfigError> {
    let raw = fs::read_to_string(path)
        .map_err(|source| ConfigError::ReadFile { path: path.to_path_buf(), source })?;

    let interpolated = interpolate_env_vars(&raw)?;
    toml::from_str::<ConfigPatch>(&interpolated)
        .map_err(|source| ConfigError::ParseFile { path: path.to_path_buf(), source })
}

fn interpolate_env_vars(input: &str) -> Result<String, ConfigError> {
    let mut output = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch == '$' && matches!(chars.peek(), Some('{')) {
            chars.next();
            let mut key = String::new();

            loop {
                match chars.next() {
                    Some('}') => break,
                    Some(next) => key.push(next),
                    None => return Err(ConfigError::UnterminatedInterpolation),
                }
            }

            let value = env::var(&key)
                .map_err(|_| ConfigError::MissingEnvInterpolation { var: key.clone() })?;
            output.push_str(&value);
            continue;
        }

        output.push(ch);
    }

    Ok(output)
}

fn validate_database(database: &DatabaseConfig) -> Result<(), ConfigError> {
    let url = database.url.trim();
    let sqlite_url =
        url.starts_with("sqlite://") || url.starts_with("sqlite::") || url == ":memory:";
    if !sqlite_url {
        return Err(ConfigError::Validation(
            "database.url must be a sqlite URL (`sqlite://...`, `sqlite::...`, or `:memory:`)"
                .to_string(),
        ));
    }

    if database.max_connections == 0 {
        return Err(ConfigError::Validation(
            "database.max_connections must be greater than zero".to_string(),
        ));
    }

    validate_timeout("database.timeout_secs", database.timeout_secs)
}

fn validate_llm(llm: &LlmConfig) -> Result<(), ConfigError> {
    validate_timeout("llm.timeout_secs", llm.timeout_secs)?;

    if llm.model.trim().is_empty() {
        return Err(ConfigError::Validation("llm.model must not be empty".to_string()));
    }

    validate_base_url("llm.base_url", llm.base_url.as_deref())
}

fn validate_discovery(discovery: &DiscoveryConfig) -> Result<(), ConfigError> {
    validate_timeout("discovery.timeout_secs", discovery.timeout_secs)?;

    if !(500..=200_000).contains(&discovery.max_content_chars) {
        return Err(ConfigError::Validation(
            "discovery.max_content_chars must be in range 500..=200000".to_string(),
        ));
    }

    validate_base_url("discovery.base_url", discovery.base_url.as_deref())
}

fn validate_pipeline(pipeline: &PipelineConfig) -> Result<(), ConfigError> {
    if pipeline.default_max_leads > 100 {
        return Err(ConfigError::Validation(
            "pipeline.default_max_leads must be at most 100".to_string(),
        ));
    }
    Ok(())
}

fn validate_logging(logging: &LoggingConfig) -> Result<(), ConfigError> {
    let level = logging.level.trim().to_ascii_lowercase();
    match level.as_str() {
        "trace" | "debug" | "info" | "warn" | "error" => Ok(()),
        _ => Err(ConfigError::Validation(
            "logging.level must be one of trace|debug|info|warn|error".to_string(),
        )),
    }
}

fn validate_timeout(key: &str, timeout_secs: u64) -> Result<(), ConfigError> {
    if timeout_secs == 0 || timeout_secs > 300 {
        return Err(ConfigError::Validation(format!("{key} must be in range 1..=300")));
    }
    Ok(())
}

fn validate_base_url(key: &str, base_url: Option<&str>) -> Result<(), ConfigError> {
    if let Some(base_url) = base_url {
        if !base_url.starts_with("http://") && !base_url.starts_with("https://") {
            return Err(ConfigError::Validation(format!(
                "{key} must start with http:// or https://"
            )));
        }
    }
    Ok(())
}

fn read_env(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn parse_number<T: std::str::FromStr>(key: &str, value: &str) -> Result<T, ConfigError> {
    value.trim().parse::<T>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_bool(key: &str, value: &str) -> Result<bool, ConfigError> {
    value.trim().parse::<bool>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

#[derive(Debug, Default, Deserialize)]
struct ConfigPatch {
    database: Option<DatabasePatch>,
    llm: Option<LlmPatch>,
    discovery: Option<DiscoveryPatch>,
    crm: Option<CrmPatch>,
    pipeline: Option<PipelinePatch>,
    logging: Option<LoggingPatch>,
}

#[derive(Debug, Default, Deserialize)]
struct DatabasePatch {
    url: Option<String>,
    max_connections: Option<u32>,
    timeout_secs: Option<u64>,
}

// Provider names stay strings here so unknown backends get the descriptive FromStr error.
#[derive(Debug, Default, Deserialize)]
struct LlmPatch {
    provider: Option<String>,
    api_key: Option<String>,
    base_url: Option<String>,
    model: Option<String>,
    timeout_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct DiscoveryPatch {
    provider: Option<String>,
    api_key: Option<String>,
    base_url: Option<String>,
    timeout_secs: Option<u64>,
    max_content_chars: Option<usize>,
}

#[derive(Debug, Default, Deserialize)]
struct CrmPatch {
    enabled: Option<bool>,
    timeout_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct PipelinePatch {
    default_max_leads: Option<usize>,
}

#[derive(Debug, Default, Deserialize)]
struct LoggingPatch {
    level: Option<String>,
    format: Option<LogFormat>,
}
