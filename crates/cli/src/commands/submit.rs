use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use serde_json::{json, Value};
use tracing::{info, warn};

use bindery_core::config::{AppConfig, LoadOptions};
use bindery_core::domain::{QuoteSubmission, RunId, RunRecord};
use bindery_core::pipeline::{UnderwritingEngine, UnderwritingNodes, WorkflowMode};
use bindery_core::retrieval::fixtures::builtin_guidelines;
use bindery_core::retrieval::{ChunkingConfig, GuidelineStore, HashedEmbedder};
use bindery_core::tools::{
    CountyHazardScorer, DeterministicRatingEngine, HeuristicAddressNormalizer,
};
use bindery_db::{connect_with_settings, migrations, RunRepository, SqlRunRepository};

use crate::commands::{current_thread_runtime, guidelines_from_dir, CommandResult};

pub fn run(file: &Path, basic: bool, answers: Option<&str>) -> CommandResult {
    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => config,
        Err(error) => {
            return CommandResult::failure(
                "submit",
                "config_validation",
                format!("configuration issue: {error}"),
                2,
            );
        }
    };
    crate::init_logging(&config);

    let submission = match load_submission(file) {
        Ok(submission) => submission,
        Err(message) => {
            return CommandResult::failure("submit", "submission_parse", message, 2);
        }
    };

    let answers = match answers.map(parse_answers).transpose() {
        Ok(answers) => answers,
        Err(message) => {
            return CommandResult::failure("submit", "answers_parse", message, 2);
        }
    };

    let store = GuidelineStore::new(
        HashedEmbedder::new(config.retrieval.embedding_dim),
        ChunkingConfig {
            chunk_size: config.retrieval.chunk_size,
            chunk_overlap: config.retrieval.chunk_overlap,
        },
    );
    let documents = match guidelines_from_dir(&config.retrieval.data_dir) {
        Ok(documents) if !documents.is_empty() => documents,
        _ => {
            warn!(
                event_name = "submit.guidelines.builtin_fallback",
                data_dir = %config.retrieval.data_dir.display(),
                "guideline directory missing or empty, using the built-in corpus"
            );
            builtin_guidelines()
        }
    };
    if let Err(error) = store.ingest(&documents) {
        return CommandResult::failure("submit", "guideline_ingest", error.to_string(), 6);
    }

    let nodes = UnderwritingNodes::new(
        HeuristicAddressNormalizer,
        CountyHazardScorer,
        DeterministicRatingEngine::new(
            config.rating.base_rate_per_1000,
            config.rating.reference_year,
        ),
        store,
        config.retrieval.top_k,
    );
    let mode = if basic { WorkflowMode::Basic } else { config.workflow.mode };
    let engine = UnderwritingEngine::new(mode, nodes);

    let run_id = RunId::generate();
    info!(
        event_name = "submit.run.start",
        run_id = %run_id,
        mode = ?mode,
        applicant = %submission.applicant_name,
        "starting underwriting run"
    );

    let (record, outcome) = match engine.run(submission, answers) {
        Ok(state) => {
            let record = RunRecord::from_state(run_id.clone(), state);
            info!(
                event_name = "submit.run.finished",
                run_id = %run_id,
                status = record.status.as_str(),
                "underwriting run reached a terminal state"
            );
            (record, Ok(()))
        }
        Err(failure) => {
            let message = failure.to_string();
            let record = RunRecord::from_failure(run_id.clone(), &failure);
            warn!(
                event_name = "submit.run.failed",
                run_id = %run_id,
                stage = failure.stage.as_str(),
                error = %message,
                "underwriting run failed on infrastructure"
            );
            (record, Err(message))
        }
    };

    let data = json!({
        "run_id": record.run_id,
        "status": record.status,
        "decision": record.workflow_state.decision,
        "missing_info": record.workflow_state.missing_info,
    });

    if let Err(result) = persist(&config, record) {
        return result;
    }

    match outcome {
        Ok(()) => CommandResult::success_with_data(
            "submit",
            format!("run {run_id} persisted"),
            Some(data),
        ),
        Err(message) => CommandResult::failure("submit", "workflow_failure", message, 6),
    }
}

fn load_submission(file: &Path) -> Result<QuoteSubmission, String> {
    let raw = fs::read_to_string(file)
        .map_err(|error| format!("could not read `{}`: {error}", file.display()))?;
    serde_json::from_str(&raw)
        .map_err(|error| format!("could not parse `{}`: {error}", file.display()))
}

fn parse_answers(raw: &str) -> Result<BTreeMap<String, Value>, String> {
    serde_json::from_str(raw).map_err(|error| format!("answers must be a JSON object: {error}"))
}

fn persist(config: &AppConfig, record: RunRecord) -> Result<(), CommandResult> {
    let runtime = current_thread_runtime("submit")?;

    runtime
        .block_on(async {
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
            SqlRunRepository::new(pool.clone())
                .save(record)
                .await
                .map_err(|error| ("persistence", error.to_string(), 4u8))?;
            pool.close().await;
            Ok::<(), (&'static str, String, u8)>(())
        })
        .map_err(|(error_class, message, exit_code)| {
            CommandResult::failure("submit", error_class, message, exit_code)
        })
}
