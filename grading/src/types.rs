//! Core types for the consensus grading pipeline
//!
//! These types flow between the dispatcher, the consensus evaluator, and the
//! result store. `ParsedGraderResponse` and `ResultRecord` are also the
//! serialized audit surface shown to teachers during review.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Identifier of a grading job (one uploaded assessment run).
pub type JobId = String;

/// Identifier of a student within a job.
pub type StudentId = String;

/// Identifier of a question within an assessment.
pub type QuestionId = String;

/// Identifier of one independent grader in the panel (`"grader_1"`..).
pub type GraderId = String;

/// Raw outcome of a single grader invocation, before any parsing.
///
/// One of these exists per grader per dispatch. It is consumed immediately by
/// the consensus evaluator and never persisted.
#[derive(Debug, Clone)]
pub struct GraderInvocationResult {
    /// Which grader produced this.
    pub grader_id: GraderId,
    /// Whether the call returned without transport/API error.
    pub succeeded: bool,
    /// Unparsed response body. Only meaningful when `succeeded`.
    pub raw_text: Option<String>,
    /// Error description. Only meaningful when not `succeeded`.
    pub error: Option<String>,
}

impl GraderInvocationResult {
    /// A grader call that returned a response body.
    pub fn success(grader_id: impl Into<GraderId>, raw_text: impl Into<String>) -> Self {
        Self {
            grader_id: grader_id.into(),
            succeeded: true,
            raw_text: Some(raw_text.into()),
            error: None,
        }
    }

    /// A grader call that failed (transport error, API error, timeout).
    pub fn failure(grader_id: impl Into<GraderId>, error: impl Into<String>) -> Self {
        Self {
            grader_id: grader_id.into(),
            succeeded: false,
            raw_text: None,
            error: Some(error.into()),
        }
    }
}

/// One grader's opinion after parsing, retained for the audit trail.
///
/// Invariant: `grade` is `None` whenever the source invocation failed or no
/// numeric grade could be extracted from its text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParsedGraderResponse {
    /// Which grader produced this. Stored as `model_id`, the field name the
    /// review UI reads.
    #[serde(rename = "model_id")]
    pub grader_id: GraderId,
    /// Extracted numeric score, if any.
    pub grade: Option<f64>,
    /// Rationale text. Synthetic (`"Model error: ..."`) when the call failed,
    /// empty when the response was unparseable.
    pub feedback: String,
    /// Original unsliced response text. `None` when the call never returned.
    pub raw_response: Option<String>,
}

impl ParsedGraderResponse {
    /// Placeholder for a grader whose response yielded no usable opinion.
    /// The grader stays visible in the audit record with `grade: None`.
    pub fn empty(grader_id: impl Into<GraderId>, raw_response: Option<String>) -> Self {
        Self {
            grader_id: grader_id.into(),
            grade: None,
            feedback: String::new(),
            raw_response,
        }
    }

    /// Placeholder for a grader whose invocation failed outright.
    pub fn from_error(grader_id: impl Into<GraderId>, error: &str) -> Self {
        Self {
            grader_id: grader_id.into(),
            grade: None,
            feedback: format!("Model error: {}", error),
            raw_response: None,
        }
    }
}

/// Agreement classification among the panel's numeric grades.
///
/// Stored alongside the grade as the `consensus_achieved` tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConsensusLabel {
    /// All successful graders produced the identical grade.
    Full,
    /// At least two of the successful graders agree.
    Majority,
    /// Disagreement, or fewer than two numeric opinions.
    None,
}

impl ConsensusLabel {
    /// Whether this level of agreement is trusted without human review.
    pub fn is_agreement(self) -> bool {
        matches!(self, Self::Full | Self::Majority)
    }
}

impl std::fmt::Display for ConsensusLabel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Full => write!(f, "full"),
            Self::Majority => write!(f, "majority"),
            Self::None => write!(f, "none"),
        }
    }
}

/// Final decision for one (student, question) unit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConsensusOutcome {
    /// Agreed-upon grade. `None` when no consensus was reached.
    pub final_grade: Option<f64>,
    /// Feedback belonging to whichever response contributed the agreed grade.
    pub final_feedback: Option<String>,
    /// Agreement classification.
    pub consensus: ConsensusLabel,
    /// All grader opinions in dispatch order, failures included, so the
    /// review UI can show every opinion even when no consensus was reached.
    pub structured_responses: Vec<ParsedGraderResponse>,
}

impl ConsensusOutcome {
    /// An outcome with no agreement and no grade.
    pub fn no_consensus(structured_responses: Vec<ParsedGraderResponse>) -> Self {
        Self {
            final_grade: None,
            final_feedback: None,
            consensus: ConsensusLabel::None,
            structured_responses,
        }
    }
}

/// The persisted row per (job, student, question).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResultRecord {
    pub job_id: JobId,
    pub student_id: StudentId,
    pub question_id: QuestionId,
    /// Final grade, absent while the question awaits review.
    pub grade: Option<f64>,
    /// Final feedback, absent while the question awaits review.
    pub feedback: Option<String>,
    /// Workflow status derived from the consensus classification.
    pub status: crate::status::ResultStatus,
    /// Full ordered audit trail of grader opinions.
    pub ai_responses: Vec<ParsedGraderResponse>,
    /// Stored consensus classification.
    pub consensus_achieved: ConsensusLabel,
    /// When this record was written.
    pub graded_at: DateTime<Utc>,
}

impl ResultRecord {
    /// Build the record for a consensus outcome.
    pub fn from_outcome(
        job_id: impl Into<JobId>,
        student_id: impl Into<StudentId>,
        question_id: impl Into<QuestionId>,
        outcome: ConsensusOutcome,
        status: crate::status::ResultStatus,
    ) -> Self {
        Self {
            job_id: job_id.into(),
            student_id: student_id.into(),
            question_id: question_id.into(),
            grade: outcome.final_grade,
            feedback: outcome.final_feedback,
            status,
            ai_responses: outcome.structured_responses,
            consensus_achieved: outcome.consensus,
            graded_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invocation_constructors() {
        let ok = GraderInvocationResult::success("grader_1", "{\"grade\": 5}");
        assert!(ok.succeeded);
        assert_eq!(ok.raw_text.as_deref(), Some("{\"grade\": 5}"));
        assert!(ok.error.is_none());

        let err = GraderInvocationResult::failure("grader_2", "timeout");
        assert!(!err.succeeded);
        assert!(err.raw_text.is_none());
        assert_eq!(err.error.as_deref(), Some("timeout"));
    }

    #[test]
    fn test_error_placeholder_feedback() {
        let parsed = ParsedGraderResponse::from_error("grader_3", "rate limited");
        assert_eq!(parsed.grade, None);
        assert_eq!(parsed.feedback, "Model error: rate limited");
        assert!(parsed.raw_response.is_none());
    }

    #[test]
    fn test_consensus_label_display() {
        assert_eq!(ConsensusLabel::Full.to_string(), "full");
        assert_eq!(ConsensusLabel::Majority.to_string(), "majority");
        assert_eq!(ConsensusLabel::None.to_string(), "none");
    }

    #[test]
    fn test_consensus_label_serde() {
        let json = serde_json::to_string(&ConsensusLabel::Majority).unwrap();
        assert_eq!(json, "\"majority\"");
        let parsed: ConsensusLabel = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, ConsensusLabel::Majority);
    }

    #[test]
    fn test_parsed_response_wire_name() {
        let parsed = ParsedGraderResponse {
            grader_id: "grader_1".to_string(),
            grade: Some(8.0),
            feedback: "Good".to_string(),
            raw_response: Some("{\"grade\": 8}".to_string()),
        };
        let json = serde_json::to_value(&parsed).unwrap();
        // The review UI reads `model_id`, not `grader_id`.
        assert_eq!(json["model_id"], "grader_1");
        assert!(json.get("grader_id").is_none());
    }

    #[test]
    fn test_record_serde_roundtrip() {
        let outcome = ConsensusOutcome {
            final_grade: Some(7.5),
            final_feedback: Some("Solid".to_string()),
            consensus: ConsensusLabel::Full,
            structured_responses: vec![ParsedGraderResponse::empty("grader_1", None)],
        };
        let record = ResultRecord::from_outcome(
            "job-1",
            "student-1",
            "q1",
            outcome,
            crate::status::ResultStatus::AiGraded,
        );
        let json = serde_json::to_string(&record).unwrap();
        let parsed: ResultRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.grade, Some(7.5));
        assert_eq!(parsed.consensus_achieved, ConsensusLabel::Full);
        assert_eq!(parsed.ai_responses.len(), 1);
    }
}
