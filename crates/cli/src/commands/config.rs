use serde_json::json;

use bindery_core::config::{AppConfig, LoadOptions};

use crate::commands::CommandResult;

pub fn run() -> CommandResult {
    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => config,
        Err(error) => {
            return CommandResult::failure(
                "config",
                "config_validation",
                format!("configuration issue: {error}"),
                2,
            );
        }
    };

    CommandResult::success_with_data(
        "config",
        "effective configuration",
        Some(json!({
            "database": {
                "url": config.database.url,
                "max_connections": config.database.max_connections,
                "timeout_secs": config.database.timeout_secs,
            },
            "retrieval": {
                "data_dir": config.retrieval.data_dir.display().to_string(),
                "chunk_size": config.retrieval.chunk_size,
                "chunk_overlap": config.retrieval.chunk_overlap,
                "top_k": config.retrieval.top_k,
                "embedding_dim": config.retrieval.embedding_dim,
            },
            "rating": {
                "base_rate_per_1000": config.rating.base_rate_per_1000,
                "reference_year": config.rating.reference_year,
            },
            "workflow": { "mode": config.workflow.mode },
            "logging": { "level": config.logging.level, "format": config.logging.format },
        })),
    )
}
