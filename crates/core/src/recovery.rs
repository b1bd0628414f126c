//! Turns raw model output into validated triples.
//!
//! Each response gets at most two parse attempts: the text as-is, then the
//! slice from the first `[{` through the last `}` with a closing `]`
//! appended. Anything still unparsable is dropped for that chunk.

use crate::chunking::PARAGRAPH_SEPARATOR;
use crate::models::Triple;
use crate::schema::TripleSchema;
use serde_json::Value;
use tracing::{debug, warn};

const LIST_START: &str = "[{";
const OBJECT_END: char = '}';

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseAttempt {
    Strict,
    Repair,
}

/// Recovers the triples from one model response.
pub fn recover(raw: &str, schema: &TripleSchema) -> Vec<Triple> {
    match parse_with_repair(raw) {
        Some((value, attempt)) => {
            let triples = schema.validate(&value);
            debug!(?attempt, triple_count = triples.len(), "recovered response");
            triples
        }
        None => {
            warn!(
                preview = %preview(raw),
                "model output is not recoverable json, chunk yields no triples"
            );
            Vec::new()
        }
    }
}

/// Splits a combined response on blank lines and recovers every segment in order.
pub fn recover_segments(combined: &str, schema: &TripleSchema) -> Vec<Triple> {
    combined
        .split(PARAGRAPH_SEPARATOR)
        .filter(|segment| !segment.trim().is_empty())
        .flat_map(|segment| recover(segment, schema))
        .collect()
}

/// Parses `raw`, falling back to a single bracket-slice repair.
pub fn parse_with_repair(raw: &str) -> Option<(Value, ParseAttempt)> {
    match serde_json::from_str::<Value>(raw) {
        Ok(value) => return Some((value, ParseAttempt::Strict)),
        Err(error) => debug!(%error, "strict parse failed, trying bracket repair"),
    }

    let repaired = repair_slice(raw)?;
    match serde_json::from_str::<Value>(&repaired) {
        Ok(value) => Some((value, ParseAttempt::Repair)),
        Err(error) => {
            debug!(%error, "repaired slice is still not valid json");
            None
        }
    }
}

/// `raw[first "[{" ..= last "}"] + "]"`, or `None` when either marker is missing.
pub fn repair_slice(raw: &str) -> Option<String> {
    let start = raw.find(LIST_START)?;
    let end = raw.rfind(OBJECT_END)?;
    if end < start {
        return None;
    }

    let mut repaired = raw[start..=end].to_string();
    repaired.push(']');
    Some(repaired)
}

fn preview(raw: &str) -> String {
    raw.chars().take(80).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const WELL_FORMED: &str =
        r#"[{"head":"A","head_type":"T","relation":"r","tail":"B","tail_type":"T"}]"#;

    #[test]
    fn well_formed_list_is_returned_as_is() -> Result<(), Box<dyn std::error::Error>> {
        let triples = recover(WELL_FORMED, &TripleSchema::default());
        let expected: Vec<Triple> = serde_json::from_str(WELL_FORMED)?;
        assert_eq!(triples, expected);
        assert_eq!(triples.len(), 1);
        Ok(())
    }

    #[test]
    fn prose_wrapped_and_unterminated_list_is_repaired() {
        let raw = r#"noise [{"head":"A","head_type":"T","relation":"r","tail":"B","tail_type":"T"} trailing"#;
        let (_, attempt) = parse_with_repair(raw).expect("repair should succeed");
        assert_eq!(attempt, ParseAttempt::Repair);

        let triples = recover(raw, &TripleSchema::default());
        assert_eq!(triples.len(), 1);
        assert_eq!(triples[0].field("tail"), Some("B"));
    }

    #[test]
    fn list_truncated_inside_trailing_object_keeps_complete_objects() {
        let raw = r#"[{"head":"A","head_type":"T","relation":"r","tail":"B","tail_type":"T"},{"head":"C","head_type":"T","relation":"r","tail":"D","tail_type":"T"},{"head":"E","head_ty"#;
        let triples = recover(raw, &TripleSchema::default());
        assert_eq!(triples.len(), 2);
        assert_eq!(triples[1].field("head"), Some("C"));
    }

    #[test]
    fn markdown_fenced_output_is_repaired() {
        let raw = "```json\n[{\"head\":\"A\",\"head_type\":\"T\",\"relation\":\"r\",\"tail\":\"B\",\"tail_type\":\"T\"}]\n```";
        assert_eq!(recover(raw, &TripleSchema::default()).len(), 1);
    }

    #[test]
    fn unrecoverable_input_yields_nothing() {
        assert!(recover("not json at all", &TripleSchema::default()).is_empty());
        assert!(recover("}{ [{", &TripleSchema::default()).is_empty());
        assert!(recover("", &TripleSchema::default()).is_empty());
    }

    #[test]
    fn repair_is_attempted_only_once() {
        // The slice itself is broken, so there must be no second repair.
        let raw = r#"prefix [{"head": [{"x": 1} suffix"#;
        assert_eq!(repair_slice(raw).as_deref(), Some(r#"[{"head": [{"x": 1}]"#));
        assert!(parse_with_repair(raw).is_none());
    }

    #[test]
    fn repair_needs_both_markers() {
        assert!(repair_slice(r#"{"head":"A"}"#).is_none());
        assert!(repair_slice("[{ no closing brace").is_none());
    }

    #[test]
    fn strict_single_object_is_validated() {
        let raw = json!({"head":"A","head_type":"T","relation":"r","tail":"B","tail_type":"T"})
            .to_string();
        assert_eq!(recover(&raw, &TripleSchema::default()).len(), 1);
    }

    #[test]
    fn combined_responses_are_recovered_segment_by_segment() {
        let combined = format!(
            "{WELL_FORMED}\n\nSorry, I cannot help with that.\n\nHere you go: [{{\"head\":\"C\",\"head_type\":\"T\",\"relation\":\"r\",\"tail\":\"D\",\"tail_type\":\"T\"}}"
        );

        let triples = recover_segments(&combined, &TripleSchema::default());
        assert_eq!(triples.len(), 2);
        assert_eq!(triples[0].field("head"), Some("A"));
        assert_eq!(triples[1].field("head"), Some("C"));
    }
}
