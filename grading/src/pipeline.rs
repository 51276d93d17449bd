//! Grading pipeline — per-question orchestration and job-level fan-out.
//!
//! One unit of work is a (student, question) pair: build the prompt,
//! dispatch the panel, evaluate consensus, resolve the workflow status, and
//! persist the result. Units are independent and commutative, so questions
//! within a submission and submissions within a job all run concurrently.
//! The only suspension points are the grader calls and the final write.

use std::sync::Arc;

use futures::future::join_all;
use tracing::{error, info, warn};

use crate::config::GradingConfig;
use crate::consensus::evaluate;
use crate::dispatch::GraderPanel;
use crate::grader::{EvidencePage, GradingRequest};
use crate::prompt::build_grading_prompt;
use crate::status::ResultStatus;
use crate::store::{ResultKey, ResultStore, StoreError};
use crate::types::{ConsensusOutcome, QuestionId, ResultRecord, StudentId};

/// Error from a grading unit.
///
/// Grader failures never surface here (they degrade to "no opinion" inside
/// the evaluator); only infrastructure failures propagate.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("store error: {0}")]
    Store(#[from] StoreError),
}

/// One question of the assessment, as configured by the teacher.
#[derive(Debug, Clone)]
pub struct QuestionSpec {
    pub question_id: QuestionId,
    /// The question as posed to the student.
    pub question_text: String,
    /// The rubric the graders must follow.
    pub rubric_text: String,
    /// Maximum score on the rubric scale.
    pub max_score: f64,
    /// Answer text extracted from the scan, if OCR produced any.
    pub answer_text: Option<String>,
}

/// One student's matched answer sheet within a job.
#[derive(Debug, Clone)]
pub struct StudentSubmission {
    pub student_id: StudentId,
    /// Rendered pages of the answer sheet, shared by every question.
    pub evidence: Vec<EvidencePage>,
}

/// Outcome of one graded question, echoed back to the orchestrator.
#[derive(Debug, Clone)]
pub struct QuestionReport {
    pub question_id: QuestionId,
    pub status: ResultStatus,
    pub outcome: ConsensusOutcome,
}

/// Outcome of one student's submission.
#[derive(Debug)]
pub struct SubmissionReport {
    pub student_id: StudentId,
    /// Questions that were evaluated and persisted.
    pub graded: Vec<QuestionReport>,
    /// Questions whose result could not be written: (question, error).
    pub failed: Vec<(QuestionId, String)>,
}

/// Aggregate counts for a whole job.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct JobSummary {
    /// Questions needing no human action (consensus reached, or already
    /// teacher-graded and left untouched).
    pub ai_graded: usize,
    pub pending_review: usize,
    pub failed: usize,
}

/// The grading pipeline: a grader panel plus a result store.
pub struct GradingPipeline {
    panel: GraderPanel,
    store: Arc<dyn ResultStore>,
    include_tips: bool,
}

impl GradingPipeline {
    /// Build a pipeline from explicit components.
    pub fn new(panel: GraderPanel, store: Arc<dyn ResultStore>) -> Self {
        Self {
            panel,
            store,
            include_tips: false,
        }
    }

    /// Build a pipeline with the standard HTTP panel from configuration.
    pub fn from_config(
        config: &GradingConfig,
        store: Arc<dyn ResultStore>,
    ) -> Result<Self, crate::grader::GraderError> {
        Ok(Self {
            panel: GraderPanel::from_config(config)?,
            store,
            include_tips: config.include_tips,
        })
    }

    /// Whether grader feedback should carry improvement tips.
    pub fn with_tips(mut self, include_tips: bool) -> Self {
        self.include_tips = include_tips;
        self
    }

    /// Grade one (student, question) unit and persist the decision.
    ///
    /// A record already graded by a teacher is left untouched: a manual
    /// override outlives automatic re-runs unless explicitly re-triggered.
    pub async fn grade_question(
        &self,
        job_id: &str,
        student_id: &str,
        question: &QuestionSpec,
        evidence: &[EvidencePage],
    ) -> Result<QuestionReport, PipelineError> {
        let key = ResultKey::new(job_id, student_id, question.question_id.clone());
        if let Some(existing) = self.store.get_result(&key).await? {
            if existing.status == ResultStatus::TeacherGraded {
                info!(
                    job_id,
                    student_id,
                    question_id = %question.question_id,
                    "teacher-graded result exists, skipping automatic re-grade"
                );
                return Ok(QuestionReport {
                    question_id: question.question_id.clone(),
                    status: existing.status,
                    outcome: ConsensusOutcome {
                        final_grade: existing.grade,
                        final_feedback: existing.feedback,
                        consensus: existing.consensus_achieved,
                        structured_responses: existing.ai_responses,
                    },
                });
            }
        }

        let request = GradingRequest {
            prompt: build_grading_prompt(question, self.include_tips),
            evidence: evidence.to_vec(),
        };

        let raw_results = self.panel.dispatch(&request).await;
        let outcome = evaluate(&raw_results);
        let status = ResultStatus::from_consensus(outcome.consensus);

        info!(
            job_id,
            student_id,
            question_id = %question.question_id,
            consensus = %outcome.consensus,
            status = %status,
            grade = ?outcome.final_grade,
            "question graded"
        );

        let record = ResultRecord::from_outcome(
            job_id,
            student_id,
            question.question_id.clone(),
            outcome.clone(),
            status,
        );
        self.store.upsert_result(&record).await?;

        Ok(QuestionReport {
            question_id: question.question_id.clone(),
            status,
            outcome,
        })
    }

    /// Grade every question of one submission, concurrently.
    ///
    /// Persistence failures are collected per question rather than aborting
    /// the sibling questions; the report reflects exactly what was stored.
    pub async fn grade_submission(
        &self,
        job_id: &str,
        submission: &StudentSubmission,
        questions: &[QuestionSpec],
    ) -> SubmissionReport {
        let units = questions.iter().map(|question| async move {
            let result = self
                .grade_question(job_id, &submission.student_id, question, &submission.evidence)
                .await;
            (question.question_id.clone(), result)
        });

        let mut graded = Vec::new();
        let mut failed = Vec::new();
        for (question_id, result) in join_all(units).await {
            match result {
                Ok(report) => graded.push(report),
                Err(e) => {
                    error!(
                        job_id,
                        student_id = %submission.student_id,
                        question_id = %question_id,
                        error = %e,
                        "failed to persist question result"
                    );
                    failed.push((question_id, e.to_string()));
                }
            }
        }

        SubmissionReport {
            student_id: submission.student_id.clone(),
            graded,
            failed,
        }
    }

    /// Grade a whole job: all submissions concurrently, then summarize.
    pub async fn grade_job(
        &self,
        job_id: &str,
        submissions: &[StudentSubmission],
        questions: &[QuestionSpec],
    ) -> (Vec<SubmissionReport>, JobSummary) {
        let runs = submissions
            .iter()
            .map(|submission| self.grade_submission(job_id, submission, questions));
        let reports = join_all(runs).await;

        let mut summary = JobSummary::default();
        for report in &reports {
            for graded in &report.graded {
                match graded.status {
                    ResultStatus::AiGraded | ResultStatus::TeacherGraded => {
                        summary.ai_graded += 1
                    }
                    ResultStatus::PendingReview => summary.pending_review += 1,
                    _ => {}
                }
            }
            summary.failed += report.failed.len();
        }

        if summary.failed > 0 {
            warn!(
                job_id,
                failed = summary.failed,
                "job finished with unpersisted questions"
            );
        } else {
            info!(
                job_id,
                ai_graded = summary.ai_graded,
                pending_review = summary.pending_review,
                "job finished"
            );
        }

        (reports, summary)
    }
}
