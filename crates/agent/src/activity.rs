use std::sync::Arc;

use canvass_core::ActivityEvent;
use canvass_db::repositories::ActivityRepository;
use tracing::warn;

/// Append-only writer for the activity feed. Write failures are logged and dropped.
#[derive(Clone)]
pub struct ActivityEmitter {
    events: Arc<dyn ActivityRepository>,
}

impl ActivityEmitter {
    pub fn new(events: Arc<dyn ActivityRepository>) -> Self {
        Self { events }
    }

    pub async fn emit(&self, event: ActivityEvent) {
        let event_type = event.event_type.as_str();
        let run_id = event.agent_run_id.as_ref().map(|id| id.0.clone()).unwrap_or_default();
        if let Err(error) = self.events.append(event).await {
            warn!(
                event_name = "agent.activity.write_failed",
                run_id = %run_id,
                activity_type = event_type,
                error = %error,
                "activity event dropped"
            );
        }
    }
}
