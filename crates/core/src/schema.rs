use crate::models::{Triple, HEAD, HEAD_TYPE, RELATION, TAIL, TAIL_TYPE};
use serde_json::Value;
use tracing::debug;

/// Required-key set a parsed record must carry to be kept.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TripleSchema {
    required: Vec<String>,
}

impl Default for TripleSchema {
    fn default() -> Self {
        Self::new([HEAD, HEAD_TYPE, RELATION, TAIL, TAIL_TYPE])
    }
}

impl TripleSchema {
    pub fn new<I, S>(required: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            required: required.into_iter().map(Into::into).collect(),
        }
    }

    pub fn required(&self) -> &[String] {
        &self.required
    }

    /// Keeps the elements of `value` that are objects carrying every required key.
    ///
    /// A list is checked element by element; any other value is checked alone.
    /// Never fails: rejected elements are dropped.
    pub fn validate(&self, value: &Value) -> Vec<Triple> {
        match value {
            Value::Array(items) => items
                .iter()
                .enumerate()
                .filter_map(|(index, item)| {
                    let accepted = self.accept(item);
                    if accepted.is_none() {
                        debug!(index, "dropping record that does not match the triple schema");
                    }
                    accepted
                })
                .collect(),
            single => match self.accept(single) {
                Some(triple) => vec![triple],
                None => {
                    debug!("dropping record that does not match the triple schema");
                    Vec::new()
                }
            },
        }
    }

    fn accept(&self, item: &Value) -> Option<Triple> {
        let fields = item.as_object()?;
        if self.required.iter().all(|key| fields.contains_key(key)) {
            Some(Triple::from_map(fields.clone()))
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::TripleSchema;
    use serde_json::json;

    #[test]
    fn list_keeps_only_valid_elements() {
        let schema = TripleSchema::default();
        let value = json!([
            {"head": "A", "head_type": "Unit", "relation": "r", "tail": "B", "tail_type": "Unit"},
            {"head": "A", "relation": "r", "tail": "B"},
            {"head": "C", "head_type": "Unit", "relation": "r", "tail": "D", "tail_type": "Unit"},
            "not an object",
            {"head": "E", "head_type": "Unit", "relation": "r", "tail": "F", "tail_type": null},
        ]);

        let triples = schema.validate(&value);
        assert_eq!(triples.len(), 3);
        assert_eq!(triples[0].field("head"), Some("A"));
        assert_eq!(triples[1].field("head"), Some("C"));
        assert_eq!(triples[2].field("head"), Some("E"));
    }

    #[test]
    fn single_object_is_checked_alone_and_keeps_extra_keys() {
        let schema = TripleSchema::default();
        let value = json!({
            "head": "CITS1003",
            "head_type": "Unit",
            "relation": "has_prerequisite",
            "tail": "CITS1001",
            "tail_type": "Unit",
            "confidence": 0.9
        });

        let triples = schema.validate(&value);
        assert_eq!(triples.len(), 1);
        assert_eq!(triples[0].get("confidence"), Some(&json!(0.9)));
    }

    #[test]
    fn scalars_and_empty_lists_yield_nothing() {
        let schema = TripleSchema::default();
        assert!(schema.validate(&json!(42)).is_empty());
        assert!(schema.validate(&json!(null)).is_empty());
        assert!(schema.validate(&json!([])).is_empty());
    }

    #[test]
    fn required_keys_are_configurable() {
        let schema = TripleSchema::new(["head", "tail"]);
        let triples = schema.validate(&json!([{"head": "A", "tail": "B"}]));
        assert_eq!(triples.len(), 1);
    }
}
