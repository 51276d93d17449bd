//! Multi-model consensus grading pipeline
//!
//! The subsystem of the assessment platform that turns one student's answer
//! to one question into a trusted grade. Three independent AI graders
//! receive the identical rubric and answer-sheet evidence; their raw
//! responses are defensively parsed and put to a vote, and the agreement
//! level decides whether the grade is auto-accepted or routed to a human.
//!
//! # Architecture
//!
//! ```text
//! ┌───────────────────────────────────────────────────────────┐
//! │                    GradingPipeline                        │
//! │  one unit per (student, question); units run concurrently │
//! └─────────────────────────┬─────────────────────────────────┘
//!                           │
//!           ┌───────────────┼───────────────┐
//!           ▼               ▼               ▼
//!     ┌───────────┐   ┌───────────┐   ┌───────────┐
//!     │ grader_1  │   │ grader_2  │   │ grader_3  │   (GraderPanel)
//!     └─────┬─────┘   └─────┬─────┘   └─────┬─────┘
//!           └───────────────┼───────────────┘
//!                           ▼
//!                  parser (×3) → evaluator          (consensus)
//!                           │
//!                           ▼
//!            ResultStatus::from_consensus           (status)
//!                           │
//!                           ▼
//!              ResultStore::upsert_result           (store)
//! ```
//!
//! Consensus levels: `full` (all successful graders agree), `majority`
//! (at least two agree), `none` (disagreement or insufficient opinions —
//! the question becomes `pending_review` for a teacher). A grader that
//! errors, times out, or returns garbage contributes no vote but stays in
//! the stored audit trail.
//!
//! # Usage
//!
//! ```ignore
//! use std::sync::Arc;
//! use grading::{GradingConfig, GradingPipeline, MemoryResultStore};
//!
//! let config = GradingConfig::default();
//! let store = Arc::new(MemoryResultStore::new());
//! let pipeline = GradingPipeline::from_config(&config, store.clone())?;
//!
//! let (reports, summary) = pipeline.grade_job(&job_id, &submissions, &questions).await;
//! println!("graded {}, review {}", summary.ai_graded, summary.pending_review);
//! ```

pub mod config;
pub mod consensus;
pub mod dispatch;
pub mod grader;
pub mod pipeline;
pub mod prompt;
pub mod status;
pub mod store;
pub mod types;

pub use config::GradingConfig;
pub use consensus::{evaluate, parse_grader_response};
pub use dispatch::GraderPanel;
pub use grader::{EvidencePage, Grader, GraderError, GradingRequest, HttpGrader};
pub use pipeline::{
    GradingPipeline, JobSummary, PipelineError, QuestionReport, QuestionSpec, StudentSubmission,
    SubmissionReport,
};
pub use status::ResultStatus;
pub use store::{MemoryResultStore, ResultKey, ResultStore, StoreError};
pub use types::{
    ConsensusLabel, ConsensusOutcome, GraderId, GraderInvocationResult, JobId,
    ParsedGraderResponse, QuestionId, ResultRecord, StudentId,
};
