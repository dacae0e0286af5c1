use canvass_core::{AgentType, ContactId, ProfileId};
use serde_json::Value;
use tracing::info;

use crate::bootstrap::{bootstrap, load_config, Application};
use crate::commands::{build_runtime, CommandResult};

const COMMAND: &str = "run";

#[derive(Debug, Clone)]
pub struct RunArgs {
    pub profile: String,
    pub agent: String,
    pub input: Option<String>,
    pub contact: Option<String>,
}

/// A failure before or after the executor ran, already mapped to the CLI contract.
struct RunFailure {
    error_class: String,
    message: String,
    exit_code: u8,
    run: Option<Value>,
}

impl RunFailure {
    fn new(error_class: &str, message: impl Into<String>, exit_code: u8) -> Self {
        Self { error_class: error_class.to_string(), message: message.into(), exit_code, run: None }
    }
}

pub fn run(args: RunArgs) -> CommandResult {
    let Some(agent_type) = AgentType::parse(&args.agent) else {
        let known: Vec<&str> = AgentType::ALL.iter().map(AgentType::as_str).collect();
        return CommandResult::failure(
            COMMAND,
            "invalid_agent",
            format!("unknown agent `{}`; expected one of {}", args.agent, known.join(", ")),
            7,
        );
    };

    let input = match parse_input(args.input.as_deref()) {
        Ok(input) => input,
        Err(message) => return CommandResult::failure(COMMAND, "invalid_input", message, 7),
    };

    let config = match load_config() {
        Ok(config) => config,
        Err(error) => {
            return CommandResult::failure(
                COMMAND,
                error.error_class(),
                error.to_string(),
                error.exit_code(),
            );
        }
    };

    let runtime = match build_runtime(true) {
        Ok(runtime) => runtime,
        Err(error) => {
            return CommandResult::failure(
                COMMAND,
                "runtime_init",
                format!("failed to initialize async runtime: {error}"),
                3,
            );
        }
    };

    let profile_id = ProfileId(args.profile);
    let contact_id = args.contact.map(ContactId);

    let result = runtime.block_on(async {
        let application = bootstrap(config).await.map_err(|error| {
            RunFailure::new(error.error_class(), error.to_string(), error.exit_code())
        })?;
        let outcome = launch_and_wait(&application, profile_id, agent_type, input, contact_id).await;
        application.close().await;
        outcome
    });

    match result {
        Ok(run) => CommandResult::ok_with_run(COMMAND, "run completed", Some(run)),
        Err(failure) => CommandResult::failure_with_run(
            COMMAND,
            &failure.error_class,
            failure.message,
            failure.exit_code,
            failure.run,
        ),
    }
}

async fn launch_and_wait(
    application: &Application,
    profile_id: ProfileId,
    agent_type: AgentType,
    input: Value,
    contact_id: Option<ContactId>,
) -> Result<Value, RunFailure> {
    let profile = application
        .profiles
        .find_by_id(&profile_id)
        .await
        .map_err(|error| RunFailure::new("repository_error", error.to_string(), 4))?
        .ok_or_else(|| {
            RunFailure::new(
                "profile_not_found",
                format!("profile `{}` was not found", profile_id.0),
                7,
            )
        })?;

    let launched = application
        .runtime
        .launch(profile, agent_type, input, contact_id)
        .await
        .map_err(|error| RunFailure::new(error.error_class(), error.to_string(), 1))?;
    let run_id = launched.run_id.clone();
    info!(
        event_name = "cli.run.launched",
        run_id = %run_id,
        agent_type = agent_type.as_str(),
        "agent run launched"
    );

    let executed = launched.wait().await;

    let row = application
        .runs
        .find_by_id(&run_id)
        .await
        .map_err(|error| RunFailure::new("repository_error", error.to_string(), 4))?;
    let row = row.and_then(|run| serde_json::to_value(run).ok());

    match executed {
        Ok(()) => row.ok_or_else(|| {
            RunFailure::new("repository_error", format!("run `{run_id}` row is missing"), 4)
        }),
        Err(error) => Err(RunFailure {
            error_class: error.error_class().to_string(),
            message: error.to_string(),
            exit_code: 1,
            run: row,
        }),
    }
}

fn parse_input(raw: Option<&str>) -> Result<Value, String> {
    let Some(raw) = raw.map(str::trim).filter(|raw| !raw.is_empty()) else {
        return Ok(Value::Object(Default::default()));
    };
    match serde_json::from_str::<Value>(raw) {
        Ok(value @ Value::Object(_)) => Ok(value),
        Ok(_) => Err("run input must be a JSON object".to_string()),
        Err(error) => Err(format!("run input is not valid JSON: {error}")),
    }
}
