use serde_json::json;

use bindery_core::config::{AppConfig, LoadOptions};
use bindery_core::domain::RunStatus;
use bindery_db::{connect_with_settings, migrations, RunRepository, SqlRunRepository};

use crate::commands::{current_thread_runtime, CommandResult};

pub fn run(limit: u32, status: Option<&str>) -> CommandResult {
    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => config,
        Err(error) => {
            return CommandResult::failure(
                "runs",
                "config_validation",
                format!("configuration issue: {error}"),
                2,
            );
        }
    };

    let status = match status.map(str::parse::<RunStatus>).transpose() {
        Ok(status) => status,
        Err(message) => {
            return CommandResult::failure("runs", "status_parse", message, 2);
        }
    };

    let runtime = match current_thread_runtime("runs") {
        Ok(runtime) => runtime,
        Err(result) => return result,
    };

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
        let summaries = SqlRunRepository::new(pool.clone())
            .list(limit, status)
            .await
            .map_err(|error| ("persistence", error.to_string(), 4u8))?;
        pool.close().await;
        Ok::<_, (&'static str, String, u8)>(summaries)
    });

    match result {
        Ok(summaries) => CommandResult::success_with_data(
            "runs",
            format!("{} run(s)", summaries.len()),
            Some(json!({ "runs": summaries })),
        ),
        Err((error_class, message, exit_code)) => {
            CommandResult::failure("runs", error_class, message, exit_code)
        }
    }
}
