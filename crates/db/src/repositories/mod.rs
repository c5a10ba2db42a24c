use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

use bindery_core::domain::{RunId, RunRecord, RunStatus};

pub mod memory;
pub mod run;

pub use memory::InMemoryRunRepository;
pub use run::SqlRunRepository;

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("decode error: {0}")]
    Decode(String),
}

/// Listing row: the record without its (potentially large) state snapshot.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize)]
pub struct RunSummary {
    pub run_id: RunId,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub status: RunStatus,
}

/// The run store boundary. Records are keyed by run id, created once per
/// run and updated in place; `delete` exists for administrative cleanup
/// only and is never called by the workflow core.
#[async_trait]
pub trait RunRepository: Send + Sync {
    async fn save(&self, record: RunRecord) -> Result<(), RepositoryError>;

    async fn find_by_id(&self, run_id: &RunId) -> Result<Option<RunRecord>, RepositoryError>;

    async fn list(
        &self,
        limit: u32,
        status: Option<RunStatus>,
    ) -> Result<Vec<RunSummary>, RepositoryError>;

    async fn update_status(
        &self,
        run_id: &RunId,
        status: RunStatus,
        error_message: Option<String>,
    ) -> Result<(), RepositoryError>;

    async fn delete(&self, run_id: &RunId) -> Result<bool, RepositoryError>;
}
