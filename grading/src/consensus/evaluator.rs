//! Consensus evaluation — the voting algorithm over grader opinions.
//!
//! Given the raw results of one dispatch, the evaluator parses every
//! response, filters down to numeric opinions, and classifies agreement:
//!
//! - fewer than 2 opinions — insufficient signal, no consensus; a lone
//!   numeric opinion is never auto-trusted
//! - all opinions identical — full consensus
//! - 3 opinions with a value appearing at least twice — majority consensus
//! - otherwise — no consensus, the question goes to human review
//!
//! Grades are compared by exact numeric equality; rubric scales produce
//! clean values, so there is no tolerance window. The final grade is always
//! a literal value some grader produced, never an average. Transport
//! failures and unparseable responses are indistinguishable at the voting
//! stage: both contribute zero votes but stay visible in the audit trail.

use tracing::{debug, info, warn};

use crate::types::{ConsensusLabel, ConsensusOutcome, GraderInvocationResult, ParsedGraderResponse};

use super::parser::parse_grader_response;

/// Evaluate consensus among the panel's responses for one question.
///
/// Deterministic given the set of results: `structured_responses` preserves
/// dispatch order, and feedback selection uses that order, not arrival time.
pub fn evaluate(raw_results: &[GraderInvocationResult]) -> ConsensusOutcome {
    let parsed: Vec<ParsedGraderResponse> = raw_results.iter().map(parse_invocation).collect();

    // Only responses carrying a numeric grade get a vote.
    let opinions: Vec<(f64, &str)> = parsed
        .iter()
        .filter_map(|r| r.grade.map(|g| (g, r.feedback.as_str())))
        .collect();

    if opinions.len() < 2 {
        info!(
            opinions = opinions.len(),
            "insufficient grader opinions, no consensus"
        );
        return ConsensusOutcome::no_consensus(parsed);
    }

    // Full consensus: every opinion carries the identical grade.
    let (first_grade, first_feedback) = opinions[0];
    if opinions.iter().all(|&(g, _)| g == first_grade) {
        debug!(grade = first_grade, "full consensus");
        return ConsensusOutcome {
            final_grade: Some(first_grade),
            final_feedback: Some(first_feedback.to_string()),
            consensus: if opinions.len() == raw_results.len() {
                ConsensusLabel::Full
            } else {
                // Agreement among 2 of 3 (third grader failed) is recorded as
                // majority, matching the observed product behavior.
                ConsensusLabel::Majority
            },
            structured_responses: parsed,
        };
    }

    // Majority: with 3 opinions, any grade appearing at least twice wins.
    if opinions.len() == 3 {
        for (i, &(candidate, _)) in opinions.iter().enumerate() {
            let count = opinions.iter().filter(|&&(g, _)| g == candidate).count();
            if count >= 2 {
                // Feedback comes from the first opinion carrying the winning
                // grade; `i` is 0 or the earliest carrier by construction.
                let feedback = opinions[i].1.to_string();
                debug!(grade = candidate, "majority consensus (2 of 3)");
                return ConsensusOutcome {
                    final_grade: Some(candidate),
                    final_feedback: Some(feedback),
                    consensus: ConsensusLabel::Majority,
                    structured_responses: parsed,
                };
            }
        }
        info!("all three grades distinct, no consensus");
        return ConsensusOutcome::no_consensus(parsed);
    }

    // Exactly 2 opinions that disagree.
    info!("two grader opinions disagree, no consensus");
    ConsensusOutcome::no_consensus(parsed)
}

/// Parse one invocation into its audit-trail entry.
///
/// A failed call and an unparseable response are both recorded with
/// `grade: None`; neither drops the grader from the record.
fn parse_invocation(result: &GraderInvocationResult) -> ParsedGraderResponse {
    if !result.succeeded {
        let error = result.error.as_deref().unwrap_or("Unknown error");
        warn!(grader_id = %result.grader_id, error, "grader invocation failed");
        return ParsedGraderResponse::from_error(&result.grader_id, error);
    }

    let raw_text = result.raw_text.as_deref().unwrap_or_default();
    match parse_grader_response(raw_text, &result.grader_id) {
        Some(parsed) => parsed,
        None => {
            let preview: String = raw_text.chars().take(100).collect();
            warn!(
                grader_id = %result.grader_id,
                preview = %preview,
                "unparseable grader response, treating as no opinion"
            );
            ParsedGraderResponse::empty(&result.grader_id, Some(raw_text.to_string()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn graded(id: &str, grade: f64, feedback: &str) -> GraderInvocationResult {
        GraderInvocationResult::success(
            id,
            format!(r#"{{"grade": {}, "feedback": "{}"}}"#, grade, feedback),
        )
    }

    fn failed(id: &str) -> GraderInvocationResult {
        GraderInvocationResult::failure(id, "connection reset")
    }

    fn garbage(id: &str) -> GraderInvocationResult {
        GraderInvocationResult::success(id, "I am unable to produce a grade today.")
    }

    // Three identical grades.
    #[test]
    fn test_full_consensus() {
        let outcome = evaluate(&[
            graded("grader_1", 8.0, "Good"),
            graded("grader_2", 8.0, "Solid"),
            graded("grader_3", 8.0, "OK"),
        ]);
        assert_eq!(outcome.consensus, ConsensusLabel::Full);
        assert_eq!(outcome.final_grade, Some(8.0));
        // Feedback from the first opinion in dispatch order.
        assert_eq!(outcome.final_feedback.as_deref(), Some("Good"));
        assert_eq!(outcome.structured_responses.len(), 3);
    }

    // Majority wins regardless of which graders carry it.
    #[test]
    fn test_majority_two_of_three() {
        let outcome = evaluate(&[
            graded("grader_1", 10.0, "A"),
            graded("grader_2", 15.0, "B"),
            graded("grader_3", 10.0, "C"),
        ]);
        assert_eq!(outcome.consensus, ConsensusLabel::Majority);
        assert_eq!(outcome.final_grade, Some(10.0));
        assert_eq!(outcome.final_feedback.as_deref(), Some("A"));
    }

    #[test]
    fn test_majority_value_in_later_positions() {
        let outcome = evaluate(&[
            graded("grader_1", 12.0, "Outlier"),
            graded("grader_2", 10.0, "First carrier"),
            graded("grader_3", 10.0, "Second carrier"),
        ]);
        assert_eq!(outcome.consensus, ConsensusLabel::Majority);
        assert_eq!(outcome.final_grade, Some(10.0));
        assert_eq!(outcome.final_feedback.as_deref(), Some("First carrier"));
    }

    // Three pairwise-distinct grades.
    #[test]
    fn test_three_distinct_no_consensus() {
        let outcome = evaluate(&[
            graded("grader_1", 10.0, "A"),
            graded("grader_2", 12.0, "B"),
            graded("grader_3", 15.0, "C"),
        ]);
        assert_eq!(outcome.consensus, ConsensusLabel::None);
        assert_eq!(outcome.final_grade, None);
        assert_eq!(outcome.final_feedback, None);
        assert_eq!(outcome.structured_responses.len(), 3);
    }

    // A lone opinion is never auto-trusted.
    #[test]
    fn test_single_opinion_insufficient() {
        let outcome = evaluate(&[graded("grader_1", 9.0, "A"), failed("grader_2"), failed("grader_3")]);
        assert_eq!(outcome.consensus, ConsensusLabel::None);
        assert_eq!(outcome.final_grade, None);
        // Failures remain visible for audit.
        assert_eq!(outcome.structured_responses.len(), 3);
        assert_eq!(
            outcome.structured_responses[1].feedback,
            "Model error: connection reset"
        );
    }

    // 2 agreeing graders plus 1 failure is recorded as majority, not full.
    #[test]
    fn test_two_agreeing_with_failure_is_majority() {
        let outcome = evaluate(&[
            graded("grader_1", 7.0, "A"),
            graded("grader_2", 7.0, "B"),
            failed("grader_3"),
        ]);
        assert_eq!(outcome.consensus, ConsensusLabel::Majority);
        assert_eq!(outcome.final_grade, Some(7.0));
        assert_eq!(outcome.final_feedback.as_deref(), Some("A"));
    }

    #[test]
    fn test_two_disagreeing_no_consensus() {
        let outcome = evaluate(&[
            graded("grader_1", 7.0, "A"),
            graded("grader_2", 9.0, "B"),
            failed("grader_3"),
        ]);
        assert_eq!(outcome.consensus, ConsensusLabel::None);
        assert_eq!(outcome.final_grade, None);
    }

    // Third scenario: all garbage text still yields 3 audit entries.
    #[test]
    fn test_all_unparseable() {
        let outcome = evaluate(&[garbage("grader_1"), garbage("grader_2"), garbage("grader_3")]);
        assert_eq!(outcome.consensus, ConsensusLabel::None);
        assert_eq!(outcome.structured_responses.len(), 3);
        assert!(outcome
            .structured_responses
            .iter()
            .all(|r| r.grade.is_none() && r.raw_response.is_some()));
    }

    // Unparseable and failed graders are identical at the voting stage.
    #[test]
    fn test_unparseable_counts_like_failure() {
        let outcome = evaluate(&[
            graded("grader_1", 5.0, "A"),
            garbage("grader_2"),
            graded("grader_3", 5.0, "C"),
        ]);
        assert_eq!(outcome.consensus, ConsensusLabel::Majority);
        assert_eq!(outcome.final_grade, Some(5.0));
    }

    #[test]
    fn test_no_results_at_all() {
        let outcome = evaluate(&[]);
        assert_eq!(outcome.consensus, ConsensusLabel::None);
        assert!(outcome.structured_responses.is_empty());
    }

    // The evaluator never averages; decimals must match exactly.
    #[test]
    fn test_exact_equality_no_tolerance() {
        let outcome = evaluate(&[
            graded("grader_1", 7.5, "A"),
            graded("grader_2", 7.5, "B"),
            graded("grader_3", 7.4, "C"),
        ]);
        assert_eq!(outcome.consensus, ConsensusLabel::Majority);
        assert_eq!(outcome.final_grade, Some(7.5));
    }
}
