use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use canvass_core::config::{AppConfig, LoadOptions, LogFormat};
use toml::Value;

/// One row of the effective-config listing.
struct ConfigField {
    key: &'static str,
    env_keys: &'static [&'static str],
    value: String,
}

pub fn run() -> String {
    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => config,
        Err(error) => return format!("config validation failed: {error}"),
    };

    let config_file_path = detect_config_path();
    let config_file_doc = load_config_file_doc(config_file_path.as_deref());

    let mut lines = vec!["effective config (source precedence: env > file > default):".to_string()];
    for field in effective_fields(&config) {
        let source = field_source(
            field.key,
            field.env_keys,
            config_file_doc.as_ref(),
            config_file_path.as_deref(),
        );
        lines.push(render_line(field.key, &field.value, source));
    }

    lines.join("\n")
}

fn effective_fields(config: &AppConfig) -> Vec<ConfigField> {
    let field = |key: &'static str, env_keys: &'static [&'static str], value: String| {
        ConfigField { key, env_keys, value }
    };
    vec![
        field("database.url", &["CANVASS_DATABASE_URL"], config.database.url.clone()),
        field(
            "database.max_connections",
            &["CANVASS_DATABASE_MAX_CONNECTIONS"],
            config.database.max_connections.to_string(),
        ),
        field(
            "database.timeout_secs",
            &["CANVASS_DATABASE_TIMEOUT_SECS"],
            config.database.timeout_secs.to_string(),
        ),
        field("llm.provider", &["CANVASS_LLM_PROVIDER"], config.llm.provider.as_str().to_string()),
        field("llm.model", &["CANVASS_LLM_MODEL"], config.llm.model.clone()),
        field("llm.base_url", &["CANVASS_LLM_BASE_URL"], optional(config.llm.base_url.as_deref())),
        field("llm.api_key", &["CANVASS_LLM_API_KEY"], redacted(config.llm.api_key.is_some())),
        field(
            "llm.timeout_secs",
            &["CANVASS_LLM_TIMEOUT_SECS"],
            config.llm.timeout_secs.to_string(),
        ),
        field(
            "discovery.provider",
            &["CANVASS_DISCOVERY_PROVIDER"],
            config.discovery.provider.as_str().to_string(),
        ),
        field(
            "discovery.base_url",
            &["CANVASS_DISCOVERY_BASE_URL"],
            optional(config.discovery.base_url.as_deref()),
        ),
        field(
            "discovery.api_key",
            &["CANVASS_DISCOVERY_API_KEY"],
            redacted(config.discovery.api_key.is_some()),
        ),
        field(
            "discovery.timeout_secs",
            &["CANVASS_DISCOVERY_TIMEOUT_SECS"],
            config.discovery.timeout_secs.to_string(),
        ),
        field(
            "discovery.max_content_chars",
            &["CANVASS_DISCOVERY_MAX_CONTENT_CHARS"],
            config.discovery.max_content_chars.to_string(),
        ),
        field("crm.enabled", &["CANVASS_CRM_ENABLED"], config.crm.enabled.to_string()),
        field("crm.timeout_secs", &["CANVASS_CRM_TIMEOUT_SECS"], config.crm.timeout_secs.to_string()),
        field(
            "pipeline.default_max_leads",
            &["CANVASS_PIPELINE_DEFAULT_MAX_LEADS"],
            config.pipeline.default_max_leads.to_string(),
        ),
        field(
            "logging.level",
            &["CANVASS_LOGGING_LEVEL", "CANVASS_LOG_LEVEL"],
            config.logging.level.clone(),
        ),
        field(
            "logging.format",
            &["CANVASS_LOGGING_FORMAT", "CANVASS_LOG_FORMAT"],
            log_format_name(config.logging.format).to_string(),
        ),
    ]
}

fn detect_config_path() -> Option<PathBuf> {
    ["canvass.toml", "config/canvass.toml"].into_iter().map(PathBuf::from).find(|path| path.exists())
}

fn load_config_file_doc(path: Option<&Path>) -> Option<Value> {
    let path = path?;
    let raw = fs::read_to_string(path).ok()?;
    raw.parse::<Value>().ok()
}

fn field_source(
    key_path: &str,
    env_keys: &[&str],
    config_file_doc: Option<&Value>,
    config_file_path: Option<&Path>,
) -> String {
    if let Some(env_key) = env_keys.iter().find(|key| env::var_os(key).is_some()) {
        return format!("env ({env_key})");
    }

    if let Some(doc) = config_file_doc {
        if contains_path(doc, key_path) {
            let file_path = config_file_path
                .map(|path| path.display().to_string())
                .unwrap_or_else(|| "config file".to_string());
            return format!("file ({file_path})");
        }
    }

    "default".to_string()
}

fn contains_path(root: &Value, key_path: &str) -> bool {
    let mut current = root;
    for key in key_path.split('.') {
        let Some(next) = current.get(key) else {
            return false;
        };
        current = next;
    }
    true
}

fn render_line(key: &str, value: &str, source: String) -> String {
    format!("- {key} = {value} (source: {source})")
}

fn optional(value: Option<&str>) -> String {
    value.unwrap_or("<unset>").to_string()
}

fn redacted(present: bool) -> String {
    if present { "<redacted>" } else { "<unset>" }.to_string()
}

fn log_format_name(format: LogFormat) -> &'static str {
    match format {
        LogFormat::Compact => "compact",
        LogFormat::Pretty => "pretty",
        LogFormat::Json => "json",
    }
}
