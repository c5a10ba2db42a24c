use std::path::Path;

use serde_json::json;

use bindery_core::config::{AppConfig, LoadOptions};
use bindery_core::retrieval::{ChunkingConfig, GuidelineStore, HashedEmbedder};

use crate::commands::{guidelines_from_dir, CommandResult};

pub fn run(dir: Option<&Path>) -> CommandResult {
    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => config,
        Err(error) => {
            return CommandResult::failure(
                "ingest",
                "config_validation",
                format!("configuration issue: {error}"),
                2,
            );
        }
    };

    let data_dir = dir.unwrap_or(&config.retrieval.data_dir);
    let documents = match guidelines_from_dir(data_dir) {
        Ok(documents) => documents,
        Err(error) => {
            return CommandResult::failure(
                "ingest",
                "data_dir",
                format!("could not read `{}`: {error}", data_dir.display()),
                2,
            );
        }
    };
    if documents.is_empty() {
        return CommandResult::failure(
            "ingest",
            "data_dir",
            format!("no markdown documents found in `{}`", data_dir.display()),
            2,
        );
    }

    let store = GuidelineStore::new(
        HashedEmbedder::new(config.retrieval.embedding_dim),
        ChunkingConfig {
            chunk_size: config.retrieval.chunk_size,
            chunk_overlap: config.retrieval.chunk_overlap,
        },
    );
    let summary = match store.ingest(&documents) {
        Ok(summary) => summary,
        Err(error) => {
            return CommandResult::failure("ingest", "guideline_ingest", error.to_string(), 6);
        }
    };

    CommandResult::success_with_data(
        "ingest",
        format!("ingested {} chunks from {} documents", summary.chunks, summary.documents),
        Some(json!({
            "documents": summary.documents,
            "chunks": summary.chunks,
            "summary": store.document_summary(),
        })),
    )
}
