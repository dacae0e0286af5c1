use canvass_db::connection::connect_with_config;
use canvass_db::migrations;

use crate::bootstrap::load_config;
use crate::commands::{build_runtime, CommandResult};

pub fn run() -> CommandResult {
    let config = match load_config() {
        Ok(config) => config,
        Err(error) => {
            return CommandResult::failure(
                "migrate",
                error.error_class(),
                error.to_string(),
                error.exit_code(),
            );
        }
    };

    let runtime = match build_runtime(false) {
        Ok(runtime) => runtime,
        Err(error) => {
            return CommandResult::failure(
                "migrate",
                "runtime_init",
                format!("failed to initialize async runtime: {error}"),
                3,
            );
        }
    };

    let result = runtime.block_on(async {
        let pool = connect_with_config(&config.database)
            .await
            .map_err(|error| ("db_connectivity", error.to_string(), 4u8))?;
        let applied = migrations::run_pending(&pool)
            .await
            .map_err(|error| ("migration", error.to_string(), 5u8));
        pool.close().await;
        applied
    });

    match result {
        Ok(()) => CommandResult::success("migrate", "applied pending migrations"),
        Err((error_class, message, exit_code)) => {
            CommandResult::failure("migrate", error_class, message, exit_code)
        }
    }
}
