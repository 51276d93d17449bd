//! Defensive extraction of `{grade, feedback}` from raw grader output.
//!
//! Graders are instructed to return a bare JSON object, but in practice the
//! payload arrives wrapped in preamble, markdown fences, or trailing
//! commentary. The parser slices between the first `{` and the last `}` and
//! tolerates two payload shapes: a multi-question `{"results": [...]}` batch
//! (first element taken) and a single `{"grade": ..., "feedback": ...}`
//! object. Anything else is an unparseable response, reported as `None` —
//! never an error, since one grader's garbage must not abort the others.

use serde_json::Value;
use tracing::{debug, warn};

use crate::types::ParsedGraderResponse;

/// Parse one grader's raw text into a structured response.
///
/// Returns `None` when no JSON object can be located, the slice is not valid
/// JSON, or the payload matches neither tolerated shape. A recognized payload
/// with a missing or non-numeric `grade` still parses — the grade is simply
/// `None` (no opinion), per the fails-soft policy.
pub fn parse_grader_response(raw_text: &str, grader_id: &str) -> Option<ParsedGraderResponse> {
    let start = raw_text.find('{')?;
    let end = raw_text.rfind('}')?;
    if end < start {
        warn!(grader_id, "no JSON object found in grader response");
        return None;
    }

    let payload: Value = match serde_json::from_str(&raw_text[start..=end]) {
        Ok(value) => value,
        Err(e) => {
            warn!(grader_id, error = %e, "grader response is not valid JSON");
            return None;
        }
    };

    // Explicit shape discrimination: a batch payload is identified by its
    // `results` array, a single-question payload by the presence of a
    // `grade` key. Checked in that order.
    let record = if let Some(results) = payload.get("results").and_then(Value::as_array) {
        results.first()?
    } else if payload.get("grade").is_some() {
        &payload
    } else {
        warn!(grader_id, "grader response JSON has neither `results` nor `grade`");
        return None;
    };

    let grade = record.get("grade").and_then(grade_value);
    let feedback = record
        .get("feedback")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();

    debug!(grader_id, ?grade, "parsed grader response");

    Some(ParsedGraderResponse {
        grader_id: grader_id.to_string(),
        grade,
        feedback,
        raw_response: Some(raw_text.to_string()),
    })
}

/// Coerce a grade value to f64. Models occasionally quote the number
/// (`"grade": "7.5"`); anything non-numeric is no opinion.
fn grade_value(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
}
