//! Result persistence — the write/read seam toward durable storage.
//!
//! The platform's database lives behind this trait; the pipeline only
//! requires idempotent upsert semantics keyed by (job, student, question).
//! `MemoryResultStore` is the in-process implementation used by tests and
//! embedders that bring their own durability.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::types::{JobId, QuestionId, ResultRecord, StudentId};

/// Error from the persistence backend.
///
/// Unlike grader and parse failures, a store failure is infrastructure-level
/// and propagates to the caller; the affected question is reported as failed
/// rather than silently dropped.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("storage backend error: {0}")]
    Backend(String),
}

/// Primary key of one stored result.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ResultKey {
    pub job_id: JobId,
    pub student_id: StudentId,
    pub question_id: QuestionId,
}

impl ResultKey {
    pub fn new(
        job_id: impl Into<JobId>,
        student_id: impl Into<StudentId>,
        question_id: impl Into<QuestionId>,
    ) -> Self {
        Self {
            job_id: job_id.into(),
            student_id: student_id.into(),
            question_id: question_id.into(),
        }
    }

    /// Key of an existing record.
    pub fn of(record: &ResultRecord) -> Self {
        Self::new(
            record.job_id.clone(),
            record.student_id.clone(),
            record.question_id.clone(),
        )
    }
}

/// Storage seam for grading results.
#[async_trait]
pub trait ResultStore: Send + Sync {
    /// Write a result, replacing any previous record under the same key.
    /// Re-persisting the same outcome must leave one record, not two.
    async fn upsert_result(&self, record: &ResultRecord) -> Result<(), StoreError>;

    /// Read one result, if present.
    async fn get_result(&self, key: &ResultKey) -> Result<Option<ResultRecord>, StoreError>;

    /// All results for a job, for the review surface and job summaries.
    async fn results_for_job(&self, job_id: &str) -> Result<Vec<ResultRecord>, StoreError>;
}

/// In-memory `ResultStore` backed by a `HashMap`.
#[derive(Default)]
pub struct MemoryResultStore {
    records: RwLock<HashMap<ResultKey, ResultRecord>>,
}

impl MemoryResultStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored records.
    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }
}

#[async_trait]
impl ResultStore for MemoryResultStore {
    async fn upsert_result(&self, record: &ResultRecord) -> Result<(), StoreError> {
        self.records
            .write()
            .await
            .insert(ResultKey::of(record), record.clone());
        Ok(())
    }

    async fn get_result(&self, key: &ResultKey) -> Result<Option<ResultRecord>, StoreError> {
        Ok(self.records.read().await.get(key).cloned())
    }

    async fn results_for_job(&self, job_id: &str) -> Result<Vec<ResultRecord>, StoreError> {
        Ok(self
            .records
            .read()
            .await
            .values()
            .filter(|r| r.job_id == job_id)
            .cloned()
            .collect())
    }
}
