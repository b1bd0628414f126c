use crate::error::ExtractError;
use crate::schema::TripleSchema;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

pub const HEAD: &str = "head";
pub const HEAD_TYPE: &str = "head_type";
pub const RELATION: &str = "relation";
pub const TAIL: &str = "tail";
pub const TAIL_TYPE: &str = "tail_type";

pub const DEFAULT_MODEL: &str = "gpt-3.5-turbo";

pub const DEFAULT_SYSTEM_INSTRUCTION: &str = r#"You extract knowledge-graph triples from descriptions of university courses and units.

Return ONLY a JSON array. Each element is an object with exactly these keys:
  "head"      - the source entity, e.g. a unit code such as "CITS1003"
  "head_type" - the type of the head entity, e.g. "Unit", "Course", "Major"
  "relation"  - a short relation name, e.g. "has_prerequisite", "taught_in", "has_outcome"
  "tail"      - the target entity
  "tail_type" - the type of the tail entity, e.g. "Unit", "Semester", "Outcome", "Skill"

Rules:
- Use entities that appear in the text; do not invent facts.
- Use null for a field you cannot determine instead of guessing.
- Do not wrap the array in markdown or add any explanation."#;

/// One knowledge-graph triple as produced by the model.
///
/// The record keeps every key the model returned, including ones outside the
/// schema, so nothing is lost between the per-source file and the combined artifact.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Triple(Map<String, Value>);

impl Triple {
    pub fn new(
        head: impl Into<String>,
        head_type: impl Into<String>,
        relation: impl Into<String>,
        tail: impl Into<String>,
        tail_type: impl Into<String>,
    ) -> Self {
        let mut fields = Map::new();
        fields.insert(HEAD.to_string(), Value::String(head.into()));
        fields.insert(HEAD_TYPE.to_string(), Value::String(head_type.into()));
        fields.insert(RELATION.to_string(), Value::String(relation.into()));
        fields.insert(TAIL.to_string(), Value::String(tail.into()));
        fields.insert(TAIL_TYPE.to_string(), Value::String(tail_type.into()));
        Self(fields)
    }

    pub fn from_map(fields: Map<String, Value>) -> Self {
        Self(fields)
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn field(&self, key: &str) -> Option<&str> {
        self.0.get(key).and_then(Value::as_str)
    }

    pub fn fields(&self) -> &Map<String, Value> {
        &self.0
    }

    pub fn has_keys(&self, required: &[String]) -> bool {
        required.iter().all(|key| self.0.contains_key(key))
    }

    /// True when every required key is present and not `null`.
    pub fn is_complete(&self, required: &[String]) -> bool {
        required
            .iter()
            .all(|key| self.0.get(key).is_some_and(|value| !value.is_null()))
    }

    pub fn into_map(self) -> Map<String, Value> {
        self.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SamplingParams {
    pub temperature: f32,
    pub top_p: f32,
    pub frequency_penalty: f32,
    pub presence_penalty: f32,
}

impl Default for SamplingParams {
    fn default() -> Self {
        Self {
            temperature: 0.2,
            top_p: 1.0,
            frequency_penalty: 0.0,
            presence_penalty: 0.0,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ExtractorConfig {
    pub model: String,
    pub system_instruction: String,
    pub sampling: SamplingParams,
    /// Word budget per chunk. A single paragraph above the budget still
    /// becomes its own chunk.
    pub max_words: usize,
    pub schema: TripleSchema,
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        Self {
            model: DEFAULT_MODEL.to_string(),
            system_instruction: DEFAULT_SYSTEM_INSTRUCTION.to_string(),
            sampling: SamplingParams::default(),
            max_words: 1,
            schema: TripleSchema::default(),
        }
    }
}

impl ExtractorConfig {
    pub fn validate(&self) -> Result<(), ExtractError> {
        if self.model.trim().is_empty() {
            return Err(ExtractError::InvalidConfig("model identifier is empty".to_string()));
        }

        if self.system_instruction.trim().is_empty() {
            return Err(ExtractError::InvalidConfig("system instruction is empty".to_string()));
        }

        if self.max_words == 0 {
            return Err(ExtractError::InvalidConfig("max_words must be at least 1".to_string()));
        }

        if self.schema.required().is_empty() {
            return Err(ExtractError::InvalidConfig("schema has no required keys".to_string()));
        }

        let sampling = &self.sampling;
        if !(0.0..=2.0).contains(&sampling.temperature) {
            return Err(ExtractError::InvalidConfig(format!(
                "temperature {} is outside [0, 2]",
                sampling.temperature
            )));
        }

        if !(sampling.top_p > 0.0 && sampling.top_p <= 1.0) {
            return Err(ExtractError::InvalidConfig(format!(
                "top_p {} is outside (0, 1]",
                sampling.top_p
            )));
        }

        for (name, value) in [
            ("frequency_penalty", sampling.frequency_penalty),
            ("presence_penalty", sampling.presence_penalty),
        ] {
            if !(-2.0..=2.0).contains(&value) {
                return Err(ExtractError::InvalidConfig(format!(
                    "{name} {value} is outside [-2, 2]"
                )));
            }
        }

        Ok(())
    }
}
