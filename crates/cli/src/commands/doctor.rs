use canvass_core::config::{AppConfig, DiscoveryBackend, LoadOptions};
use canvass_db::connection::connect_with_config;
use serde::Serialize;

use crate::commands::{build_runtime, CommandResult};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
enum CheckStatus {
    Pass,
    Fail,
    Skipped,
}

#[derive(Debug, Serialize)]
struct DoctorCheck {
    name: &'static str,
    status: CheckStatus,
    details: String,
}

impl DoctorCheck {
    fn new(name: &'static str, status: CheckStatus, details: impl Into<String>) -> Self {
        Self { name, status, details: details.into() }
    }
}

#[derive(Debug, Serialize)]
struct DoctorReport {
    overall_status: CheckStatus,
    summary: String,
    checks: Vec<DoctorCheck>,
}

pub fn run(json_output: bool) -> CommandResult {
    let report = build_report();
    let exit_code = if report.overall_status == CheckStatus::Pass { 0 } else { 1 };

    let output = if json_output {
        serde_json::to_string_pretty(&report).unwrap_or_else(|error| {
            format!(
                "{{\"overall_status\":\"fail\",\"summary\":\"doctor serialization failed\",\"error\":\"{}\"}}",
                escape_json(&error.to_string())
            )
        })
    } else {
        render_human(&report)
    };

    CommandResult { exit_code, output }
}

fn build_report() -> DoctorReport {
    let mut checks = Vec::new();

    match AppConfig::load(LoadOptions::default()) {
        Ok(config) => {
            checks.push(DoctorCheck::new(
                "config_validation",
                CheckStatus::Pass,
                "configuration loaded and validated",
            ));
            checks.push(check_database_connectivity(&config));
            checks.push(check_completion_credential(&config));
            checks.push(check_discovery_capability(&config));
        }
        Err(error) => {
            checks.push(DoctorCheck::new(
                "config_validation",
                CheckStatus::Fail,
                error.to_string(),
            ));
            for name in ["database_connectivity", "completion_credential", "discovery_capability"]
            {
                checks.push(DoctorCheck::new(
                    name,
                    CheckStatus::Skipped,
                    "skipped because configuration did not load",
                ));
            }
        }
    }

    let all_pass = checks.iter().all(|check| check.status == CheckStatus::Pass);
    let overall_status = if all_pass { CheckStatus::Pass } else { CheckStatus::Fail };
    let summary = if all_pass {
        "doctor: all readiness checks passed".to_string()
    } else {
        "doctor: one or more readiness checks failed".to_string()
    };

    DoctorReport { overall_status, summary, checks }
}

fn check_completion_credential(config: &AppConfig) -> DoctorCheck {
    let provider = config.llm.provider.as_str();
    if config.llm.has_credential() {
        DoctorCheck::new(
            "completion_credential",
            CheckStatus::Pass,
            format!("{provider} credential present for model `{}`", config.llm.model),
        )
    } else {
        DoctorCheck::new(
            "completion_credential",
            CheckStatus::Fail,
            format!("{provider} requires an api key or base url; agent runs will fail"),
        )
    }
}

fn check_discovery_capability(config: &AppConfig) -> DoctorCheck {
    let provider = config.discovery.provider.as_str();
    match config.discovery.provider {
        DiscoveryBackend::Basic => DoctorCheck::new(
            "discovery_capability",
            CheckStatus::Pass,
            "basic: page scraping only, search queries are reported as unsupported",
        ),
        DiscoveryBackend::Firecrawl | DiscoveryBackend::Tavily => {
            if config.discovery.has_credential() {
                DoctorCheck::new(
                    "discovery_capability",
                    CheckStatus::Pass,
                    format!("{provider}: scrape and search available"),
                )
            } else {
                DoctorCheck::new(
                    "discovery_capability",
                    CheckStatus::Fail,
                    format!("{provider} requires CANVASS_DISCOVERY_API_KEY"),
                )
            }
        }
    }
}

fn check_database_connectivity(config: &AppConfig) -> DoctorCheck {
    let runtime = match build_runtime(false) {
        Ok(runtime) => runtime,
        Err(error) => {
            return DoctorCheck::new(
                "database_connectivity",
                CheckStatus::Fail,
                format!("failed to initialize async runtime: {error}"),
            );
        }
    };

    let result = runtime.block_on(async {
        let pool = connect_with_config(&config.database)
            .await
            .map_err(|error| format!("failed to connect to database: {error}"))?;

        pool.close().await;
        Ok::<(), String>(())
    });

    match result {
        Ok(()) => DoctorCheck::new(
            "database_connectivity",
            CheckStatus::Pass,
            format!("connected using `{}`", config.database.url),
        ),
        Err(error) => DoctorCheck::new("database_connectivity", CheckStatus::Fail, error),
    }
}

fn render_human(report: &DoctorReport) -> String {
    let mut lines = Vec::new();
    lines.push(report.summary.clone());

    for check in &report.checks {
        let marker = match check.status {
            CheckStatus::Pass => "ok",
            CheckStatus::Fail => "fail",
            CheckStatus::Skipped => "skip",
        };
        lines.push(format!("- [{marker}] {}: {}", check.name, check.details));
    }

    lines.join("\n")
}

fn escape_json(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"")
}
