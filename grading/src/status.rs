//! Result status lifecycle — workflow state per (job, student, question).

use serde::{Deserialize, Serialize};

use crate::types::ConsensusLabel;

/// Workflow status of a single question result.
///
/// The pipeline itself produces only `AiGraded` and `PendingReview`.
/// `TeacherGraded` is set by the manual-override path and `Failed` by the
/// outer orchestrator when the pipeline breaks; both are stored here so the
/// full lifecycle deserializes from the review surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResultStatus {
    /// Created, not yet picked up.
    Pending,
    /// Grading in flight.
    Processing,
    /// Consensus reached; grade auto-accepted.
    AiGraded,
    /// Graders disagreed; a human makes the final call.
    PendingReview,
    /// A teacher supplied or confirmed the grade manually.
    TeacherGraded,
    /// The pipeline itself broke for this question.
    Failed,
}

impl ResultStatus {
    /// Map a consensus classification to its workflow status.
    ///
    /// `Full` and `Majority` are both trusted; anything else goes to a human.
    pub fn from_consensus(label: ConsensusLabel) -> Self {
        if label.is_agreement() {
            Self::AiGraded
        } else {
            Self::PendingReview
        }
    }
}

impl std::fmt::Display for ResultStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::Processing => write!(f, "processing"),
            Self::AiGraded => write!(f, "ai_graded"),
            Self::PendingReview => write!(f, "pending_review"),
            Self::TeacherGraded => write!(f, "teacher_graded"),
            Self::Failed => write!(f, "failed"),
        }
    }
}
