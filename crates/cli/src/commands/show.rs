use serde_json::json;

use bindery_core::config::{AppConfig, LoadOptions};
use bindery_core::domain::RunId;
use bindery_db::{connect_with_settings, migrations, RunRepository, SqlRunRepository};

use crate::commands::{current_thread_runtime, CommandResult};

pub fn run(run_id: &str) -> CommandResult {
    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => config,
        Err(error) => {
            return CommandResult::failure(
                "show",
                "config_validation",
                format!("configuration issue: {error}"),
                2,
            );
        }
    };

    let runtime = match current_thread_runtime("show") {
        Ok(runtime) => runtime,
        Err(result) => return result,
    };

    let run_id = RunId(run_id.to_string());
    let result = runtime.block_on(async {
        let pool = connect_with_settings(
            &config.database.url,
            config.database.max_connections,
            config.database.timeout_secs,
        )
        .await
        .map_err(|error| ("db_connectivity", error.to_string(), 4u8))?;
        migrations::run_pending(&pool)
            .await
            .map_err(|error| ("migration", error.to_string(), 5u8))?;
        let record = SqlRunRepository::new(pool.clone())
            .find_by_id(&run_id)
            .await
            .map_err(|error| ("persistence", error.to_string(), 4u8))?;
        pool.close().await;
        Ok::<_, (&'static str, String, u8)>(record)
    });

    match result {
        Ok(Some(record)) => CommandResult::success_with_data(
            "show",
            format!("run {}", record.run_id),
            Some(json!({ "record": record })),
        ),
        Ok(None) => {
            CommandResult::failure("show", "not_found", format!("no run `{}`", run_id.0), 2)
        }
        Err((error_class, message, exit_code)) => {
            CommandResult::failure("show", error_class, message, exit_code)
        }
    }
}
