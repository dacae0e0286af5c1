use canvass_core::{AgentRunId, AgentType, ContactId, DomainError, Profile};
use serde_json::{json, Value};
use tokio::task::JoinHandle;
use tracing::{error, info};

use crate::error::AgentError;
use crate::executor::{input_contact_id, AgentRegistry};

/// A run whose row is written and whose executor is in flight.
pub struct LaunchedRun {
    pub run_id: AgentRunId,
    pub handle: JoinHandle<Result<(), AgentError>>,
}

impl LaunchedRun {
    /// Waits for the executor. A panicked or aborted task surfaces as `AgentError::Join`.
    pub async fn wait(self) -> Result<(), AgentError> {
        match self.handle.await {
            Ok(result) => result,
            Err(join_error) => Err(AgentError::Join(join_error.to_string())),
        }
    }
}

/// The trigger side of a run: write the `running` row, then detach the executor.
#[derive(Clone)]
pub struct AgentRuntime {
    registry: AgentRegistry,
}

impl AgentRuntime {
    pub fn new(registry: AgentRegistry) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &AgentRegistry {
        &self.registry
    }

    /// Returns once the run row exists. The executor's own terminal write happens later;
    /// its error, if any, is logged here and handed back through the join handle.
    pub async fn launch(
        &self,
        profile: Profile,
        agent_type: AgentType,
        input: Value,
        contact_id: Option<ContactId>,
    ) -> Result<LaunchedRun, AgentError> {
        let (input, contact_id) = resolve_contact(input, contact_id)?;

        let run_id = self
            .registry
            .context()
            .ledger
            .create_run(&profile.id, agent_type, input.clone(), contact_id)
            .await?;

        let registry = self.registry.clone();
        let task_run_id = run_id.clone();
        let handle = tokio::spawn(async move {
            let result = registry.execute(agent_type, &task_run_id, &profile, &input).await;
            match &result {
                Ok(()) => info!(
                    event_name = "agent.runtime.run_finished",
                    run_id = %task_run_id,
                    agent_type = agent_type.as_str(),
                    "run finished"
                ),
                Err(run_error) => error!(
                    event_name = "agent.runtime.run_failed",
                    run_id = %task_run_id,
                    agent_type = agent_type.as_str(),
                    error_class = run_error.error_class(),
                    error = %run_error,
                    "run failed"
                ),
            }
            result
        });

        Ok(LaunchedRun { run_id, handle })
    }
}

/// Settles the run's one contact. The trigger's contact is copied into the input; when the
/// input already names a different contact the run is rejected before any row is written.
/// The returned id is read back from the merged input, so the row and the executor agree.
fn resolve_contact(
    input: Value,
    contact_id: Option<ContactId>,
) -> Result<(Value, Option<ContactId>), DomainError> {
    let input = match (input, contact_id) {
        (input, None) => input,
        (Value::Null, Some(contact_id)) => json!({ "contact_id": contact_id.0 }),
        (Value::Object(mut fields), Some(contact_id)) => {
            let named = fields
                .get("contact_id")
                .and_then(Value::as_str)
                .map(str::trim)
                .filter(|named| !named.is_empty());
            if let Some(named) = named {
                if named != contact_id.0 {
                    return Err(DomainError::InvalidInput(format!(
                        "contact `{}` conflicts with input contact_id `{named}`",
                        contact_id.0
                    )));
                }
            }
            fields.insert("contact_id".to_string(), Value::String(contact_id.0));
            Value::Object(fields)
        }
        (_, Some(_)) => {
            return Err(DomainError::InvalidInput(
                "run input must be a JSON object when a contact is given".to_string(),
            ));
        }
    };
    let contact_id = input_contact_id(&input);
    Ok((input, contact_id))
}
