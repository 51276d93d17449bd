//! Grading prompt construction.
//!
//! Every grader in the panel receives the identical prompt: the rubric, the
//! question, the extracted answer text for reference, and a strict contract
//! that the entire output be one JSON object with `grade` and `feedback`
//! keys. The scanned answer-sheet image travels separately as evidence and
//! is declared the single source of truth over the extracted text.

use crate::pipeline::QuestionSpec;

const GRADING_PROMPT: &str = r#"You are a highly experienced and objective Teaching Assistant. Your sole purpose is to grade a student's answer for a specific question based on the provided rubric. You must be impartial, consistent, and base your entire assessment ONLY on the provided materials.

RULES:

1. THE IMAGE IS THE SINGLE SOURCE OF TRUTH: the attached scanned image of the student's handwritten answer is the definitive evidence. The "Student's Answer Text" below was extracted from it as a convenience; where they differ, grade the handwriting in the image.
2. THE RUBRIC IS YOUR ONLY LAW: grade strictly and exclusively against the grading rubric below. Do not use external knowledge.
3. FOCUS ON A SINGLE QUESTION: your grade and feedback must pertain only to the student's answer for this question.
4. PRODUCE RUBRIC-BASED FEEDBACK: constructive, professional, explicitly referencing the rubric's criteria to justify the grade.
5. THE OUTPUT MUST BE PERFECT JSON: your entire output must be a single valid JSON object with no text before or after it, and exactly two keys:
   - "grade" (number): the score for this question, out of a maximum of {max_score}.
   - "feedback" (string): the rubric-based feedback, in simple Markdown.

GRADING RUBRIC:
---
{rubric_text}
---

EXAM QUESTION:
---
{question_text}
---

STUDENT'S ANSWER TEXT (for reference):
---
{answer_text}
---

Analyze the handwritten answer in the provided image based on the materials and rules. Generate the JSON output now."#;

const TIPS_SECTION: &str = "\n6. INCLUDE IMPROVEMENT TIPS: end the feedback with a \"### Improvement Tips\" section containing 1-2 specific, actionable suggestions for the student.";

/// Build the grading prompt for one question.
///
/// `include_tips` appends the improvement-tips instruction; it is a per-job
/// teacher preference carried in the pipeline configuration.
pub fn build_grading_prompt(question: &QuestionSpec, include_tips: bool) -> String {
    let mut prompt = GRADING_PROMPT
        .replace("{max_score}", &format_score(question.max_score))
        .replace("{rubric_text}", &question.rubric_text)
        .replace("{question_text}", &question.question_text)
        .replace(
            "{answer_text}",
            question
                .answer_text
                .as_deref()
                .unwrap_or("(no extracted text available)"),
        );

    if include_tips {
        // The tips rule slots in after rule 5, before the materials.
        prompt = prompt.replace(
            "\n\nGRADING RUBRIC:",
            &format!("{}\n\nGRADING RUBRIC:", TIPS_SECTION),
        );
    }

    prompt
}

/// Render a max score without a trailing `.0` for whole numbers.
fn format_score(score: f64) -> String {
    if score.fract() == 0.0 {
        format!("{}", score as i64)
    } else {
        format!("{}", score)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn question() -> QuestionSpec {
        QuestionSpec {
            question_id: "q1".to_string(),
            question_text: "Explain photosynthesis.".to_string(),
            rubric_text: "2 pts: light reactions. 3 pts: Calvin cycle.".to_string(),
            max_score: 5.0,
            answer_text: Some("Plants use sunlight...".to_string()),
        }
    }

    #[test]
    fn test_prompt_carries_materials() {
        let prompt = build_grading_prompt(&question(), false);
        assert!(prompt.contains("Explain photosynthesis."));
        assert!(prompt.contains("Calvin cycle"));
        assert!(prompt.contains("Plants use sunlight..."));
        assert!(prompt.contains("maximum of 5."));
        assert!(!prompt.contains("Improvement Tips"));
    }

    #[test]
    fn test_tips_section_is_optional() {
        let prompt = build_grading_prompt(&question(), true);
        assert!(prompt.contains("Improvement Tips"));
    }

    #[test]
    fn test_missing_answer_text_placeholder() {
        let mut q = question();
        q.answer_text = None;
        let prompt = build_grading_prompt(&q, false);
        assert!(prompt.contains("(no extracted text available)"));
    }

    #[test]
    fn test_fractional_max_score_kept() {
        let mut q = question();
        q.max_score = 2.5;
        let prompt = build_grading_prompt(&q, false);
        assert!(prompt.contains("maximum of 2.5."));
    }
}
