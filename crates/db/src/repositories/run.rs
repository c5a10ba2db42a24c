use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::Row;

use bindery_core::domain::{RunId, RunRecord, RunStatus, WorkflowState};

use super::{RepositoryError, RunRepository, RunSummary};
use crate::DbPool;

pub struct SqlRunRepository {
    pool: DbPool,
}

impl SqlRunRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl RunRepository for SqlRunRepository {
    async fn save(&self, record: RunRecord) -> Result<(), RepositoryError> {
        let workflow_state = serde_json::to_string(&record.workflow_state)
            .map_err(|error| RepositoryError::Decode(error.to_string()))?;
        let stage_outputs = serde_json::to_string(&record.stage_outputs)
            .map_err(|error| RepositoryError::Decode(error.to_string()))?;

        sqlx::query(
            "INSERT INTO run_records \
             (run_id, created_at, updated_at, status, workflow_state, stage_outputs, error_message) \
             VALUES (?, ?, ?, ?, ?, ?, ?) \
             ON CONFLICT(run_id) DO UPDATE SET \
             updated_at = excluded.updated_at, \
             status = excluded.status, \
             workflow_state = excluded.workflow_state, \
             stage_outputs = excluded.stage_outputs, \
             error_message = excluded.error_message",
        )
        .bind(&record.run_id.0)
        .bind(record.created_at.to_rfc3339())
        .bind(record.updated_at.to_rfc3339())
        .bind(record.status.as_str())
        .bind(workflow_state)
        .bind(stage_outputs)
        .bind(&record.error_message)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn find_by_id(&self, run_id: &RunId) -> Result<Option<RunRecord>, RepositoryError> {
        let row = sqlx::query(
            "SELECT run_id, created_at, updated_at, status, workflow_state, stage_outputs, \
             error_message FROM run_records WHERE run_id = ?",
        )
        .bind(&run_id.0)
        .fetch_optional(&self.pool)
        .await?;

        row.map(decode_record).transpose()
    }

    async fn list(
        &self,
        limit: u32,
        status: Option<RunStatus>,
    ) -> Result<Vec<RunSummary>, RepositoryError> {
        let rows = match status {
            Some(status) => {
                sqlx::query(
                    "SELECT run_id, created_at, updated_at, status FROM run_records \
                     WHERE status = ? ORDER BY created_at DESC LIMIT ?",
                )
                .bind(status.as_str())
                .bind(i64::from(limit))
                .fetch_all(&self.pool)
                .await?
            }
            None => {
                sqlx::query(
                    "SELECT run_id, created_at, updated_at, status FROM run_records \
                     ORDER BY created_at DESC LIMIT ?",
                )
                .bind(i64::from(limit))
                .fetch_all(&self.pool)
                .await?
            }
        };

        rows.into_iter()
            .map(|row| {
                Ok(RunSummary {
                    run_id: RunId(row.get::<String, _>("run_id")),
                    created_at: decode_timestamp(&row.get::<String, _>("created_at"))?,
                    updated_at: decode_timestamp(&row.get::<String, _>("updated_at"))?,
                    status: decode_status(&row.get::<String, _>("status"))?,
                })
            })
            .collect()
    }

    async fn update_status(
        &self,
        run_id: &RunId,
        status: RunStatus,
        error_message: Option<String>,
    ) -> Result<(), RepositoryError> {
        sqlx::query(
            "UPDATE run_records SET status = ?, updated_at = ?, error_message = ? \
             WHERE run_id = ?",
        )
        .bind(status.as_str())
        .bind(Utc::now().to_rfc3339())
        .bind(error_message)
        .bind(&run_id.0)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn delete(&self, run_id: &RunId) -> Result<bool, RepositoryError> {
        let result = sqlx::query("DELETE FROM run_records WHERE run_id = ?")
            .bind(&run_id.0)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}

fn decode_record(row: sqlx::sqlite::SqliteRow) -> Result<RunRecord, RepositoryError> {
    let workflow_state: WorkflowState =
        serde_json::from_str(&row.get::<String, _>("workflow_state"))
            .map_err(|error| RepositoryError::Decode(error.to_string()))?;
    let stage_outputs = match row.get::<Option<String>, _>("stage_outputs") {
        Some(raw) => serde_json::from_str(&raw)
            .map_err(|error| RepositoryError::Decode(error.to_string()))?,
        None => Default::default(),
    };

    Ok(RunRecord {
        run_id: RunId(row.get::<String, _>("run_id")),
        created_at: decode_timestamp(&row.get::<String, _>("created_at"))?,
        updated_at: decode_timestamp(&row.get::<String, _>("updated_at"))?,
        status: decode_status(&row.get::<String, _>("status"))?,
        workflow_state,
        stage_outputs,
        error_message: row.get::<Option<String>, _>("error_message"),
    })
}

fn decode_timestamp(raw: &str) -> Result<DateTime<Utc>, RepositoryError> {
    DateTime::parse_from_rfc3339(raw)
        .map(|timestamp| timestamp.with_timezone(&Utc))
        .map_err(|error| RepositoryError::Decode(format!("bad timestamp `{raw}`: {error}")))
}

fn decode_status(raw: &str) -> Result<RunStatus, RepositoryError> {
    raw.parse().map_err(RepositoryError::Decode)
}
