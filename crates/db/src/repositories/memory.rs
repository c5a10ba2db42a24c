use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;

use bindery_core::domain::{RunId, RunRecord, RunStatus};

use super::{RepositoryError, RunRepository, RunSummary};

/// In-memory run store for tests and embedded use. Concurrent callers are
/// isolated by run id under a single RwLock.
#[derive(Default)]
pub struct InMemoryRunRepository {
    records: RwLock<HashMap<String, RunRecord>>,
}

#[async_trait]
impl RunRepository for InMemoryRunRepository {
    async fn save(&self, record: RunRecord) -> Result<(), RepositoryError> {
        let mut records = self.records.write().await;
        records.insert(record.run_id.0.clone(), record);
        Ok(())
    }

    async fn find_by_id(&self, run_id: &RunId) -> Result<Option<RunRecord>, RepositoryError> {
        let records = self.records.read().await;
        Ok(records.get(&run_id.0).cloned())
    }

    async fn list(
        &self,
        limit: u32,
        status: Option<RunStatus>,
    ) -> Result<Vec<RunSummary>, RepositoryError> {
        let records = self.records.read().await;
        let mut summaries: Vec<RunSummary> = records
            .values()
            .filter(|record| status.map_or(true, |wanted| record.status == wanted))
            .map(|record| RunSummary {
                run_id: record.run_id.clone(),
                created_at: record.created_at,
                updated_at: record.updated_at,
                status: record.status,
            })
            .collect();

        summaries.sort_by(|left, right| right.created_at.cmp(&left.created_at));
        summaries.truncate(limit as usize);
        Ok(summaries)
    }

    async fn update_status(
        &self,
        run_id: &RunId,
        status: RunStatus,
        error_message: Option<String>,
    ) -> Result<(), RepositoryError> {
        let mut records = self.records.write().await;
        if let Some(record) = records.get_mut(&run_id.0) {
            record.status = status;
            record.updated_at = Utc::now();
            record.error_message = error_message;
        }
        Ok(())
    }

    async fn delete(&self, run_id: &RunId) -> Result<bool, RepositoryError> {
        let mut records = self.records.write().await;
        Ok(records.remove(&run_id.0).is_some())
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;

    use bindery_core::domain::{QuoteSubmission, RunId, RunRecord, RunStatus, WorkflowState};

    use crate::repositories::{InMemoryRunRepository, RunRepository};

    fn record() -> RunRecord {
        let submission = QuoteSubmission {
            applicant_name: "Jane Doe".to_string(),
            address: "456 Oak Ave, Fresno, CA 93650".to_string(),
            property_type: "condo".to_string(),
            coverage_amount: Decimal::new(250_000, 0),
            construction_year: Some(2010),
            square_footage: Some(1300.0),
            roof_type: None,
            foundation_type: None,
            notes: None,
        };
        RunRecord::from_state(RunId::generate(), WorkflowState::new(submission))
    }

    #[tokio::test]
    async fn in_memory_round_trip() {
        let repo = InMemoryRunRepository::default();
        let record = record();

        repo.save(record.clone()).await.expect("save");
        let found = repo.find_by_id(&record.run_id).await.expect("find");

        assert_eq!(found, Some(record));
    }

    #[tokio::test]
    async fn list_respects_status_filter_and_limit() {
        let repo = InMemoryRunRepository::default();
        for _ in 0..3 {
            repo.save(record()).await.expect("save");
        }
        let mut failed = record();
        failed.status = RunStatus::Failed;
        repo.save(failed).await.expect("save failed");

        let all = repo.list(2, None).await.expect("list");
        assert_eq!(all.len(), 2);

        let failed_only = repo.list(10, Some(RunStatus::Failed)).await.expect("list failed");
        assert_eq!(failed_only.len(), 1);
    }

    #[tokio::test]
    async fn update_status_touches_only_the_named_run() {
        let repo = InMemoryRunRepository::default();
        let first = record();
        let second = record();
        repo.save(first.clone()).await.expect("save first");
        repo.save(second.clone()).await.expect("save second");

        repo.update_status(&first.run_id, RunStatus::Failed, Some("boom".to_string()))
            .await
            .expect("update");

        let updated = repo.find_by_id(&first.run_id).await.expect("find").expect("present");
        assert_eq!(updated.status, RunStatus::Failed);
        let untouched = repo.find_by_id(&second.run_id).await.expect("find").expect("present");
        assert_eq!(untouched.status, second.status);
    }
}
