use crate::backend::{GenerationBackend, GenerationRequest};
use crate::chunking::{chunk_by_words, PARAGRAPH_SEPARATOR};
use crate::error::ExtractError;
use crate::models::{ExtractorConfig, Triple};
use crate::recovery::recover_segments;
use tracing::info;

const CHUNK_PREVIEW_CHARS: usize = 30;

/// Drives chunks through a [`GenerationBackend`] one request at a time.
pub struct TripleExtractor<B>
where
    B: GenerationBackend,
{
    backend: B,
    config: ExtractorConfig,
}

#[derive(Debug, Clone)]
pub struct Extraction {
    pub chunk_count: usize,
    pub raw: String,
    pub triples: Vec<Triple>,
}

impl<B> TripleExtractor<B>
where
    B: GenerationBackend,
{
    pub fn new(backend: B, config: ExtractorConfig) -> Result<Self, ExtractError> {
        config.validate()?;
        Ok(Self { backend, config })
    }

    pub fn config(&self) -> &ExtractorConfig {
        &self.config
    }

    /// Sends every chunk of `source_text` to the backend in order and joins the
    /// raw completions with a blank line. The first backend failure aborts the run.
    pub fn run(&self, source_text: &str) -> Result<String, ExtractError> {
        Ok(self.generate(source_text)?.1)
    }

    /// [`run`](Self::run) followed by recovery and validation of every response segment.
    pub fn extract(&self, source_text: &str) -> Result<Extraction, ExtractError> {
        let (chunk_count, raw) = self.generate(source_text)?;
        let triples = recover_segments(&raw, &self.config.schema);

        Ok(Extraction {
            chunk_count,
            raw,
            triples,
        })
    }

    fn generate(&self, source_text: &str) -> Result<(usize, String), ExtractError> {
        let chunks = chunk_by_words(source_text, self.config.max_words);
        let total = chunks.len();
        let mut responses = Vec::with_capacity(total);

        for (index, chunk) in chunks.iter().enumerate() {
            info!(
                chunk = index + 1,
                total,
                preview = %chunk.chars().take(CHUNK_PREVIEW_CHARS).collect::<String>(),
                "processing chunk"
            );

            let request = GenerationRequest {
                model: self.config.model.clone(),
                system_instruction: self.config.system_instruction.clone(),
                user_message: chunk.clone(),
                sampling: self.config.sampling,
            };

            responses.push(self.backend.complete(&request)?);
        }

        Ok((total, responses.join(PARAGRAPH_SEPARATOR)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::GenerationError;
    use std::cell::RefCell;

    #[derive(Default)]
    struct ScriptedBackend {
        responses: RefCell<Vec<Result<String, String>>>,
        requests: RefCell<Vec<GenerationRequest>>,
    }

    impl ScriptedBackend {
        fn replying(responses: &[&str]) -> Self {
            Self {
                responses: RefCell::new(responses.iter().rev().map(|r| Ok(r.to_string())).collect()),
                requests: RefCell::default(),
            }
        }
    }

    impl GenerationBackend for ScriptedBackend {
        fn complete(&self, request: &GenerationRequest) -> Result<String, GenerationError> {
            self.requests.borrow_mut().push(request.clone());
            match self.responses.borrow_mut().pop() {
                Some(Ok(text)) => Ok(text),
                Some(Err(details)) => Err(GenerationError::BackendResponse {
                    backend: "scripted".to_string(),
                    details,
                }),
                None => Ok("[]".to_string()),
            }
        }
    }

    const TRIPLE_A: &str =
        r#"[{"head":"A","head_type":"Unit","relation":"r","tail":"B","tail_type":"Unit"}]"#;
    const TRIPLE_C: &str =
        r#"[{"head":"C","head_type":"Unit","relation":"r","tail":"D","tail_type":"Unit"}]"#;

    #[test]
    fn one_request_per_chunk_in_order() -> Result<(), Box<dyn std::error::Error>> {
        let backend = ScriptedBackend::replying(&[TRIPLE_A, TRIPLE_C]);
        let extractor = TripleExtractor::new(&backend, ExtractorConfig::default())?;

        let raw = extractor.run("first paragraph\n\nsecond paragraph")?;

        assert_eq!(raw, format!("{TRIPLE_A}\n\n{TRIPLE_C}"));
        let requests = backend.requests.borrow();
        assert_eq!(requests.len(), 2);
        assert_eq!(requests[0].user_message, "first paragraph");
        assert_eq!(requests[1].user_message, "second paragraph");
        assert_eq!(requests[0].model, "gpt-3.5-turbo");
        assert_eq!(requests[0].sampling.temperature, 0.2);
        Ok(())
    }

    #[test]
    fn extract_recovers_each_chunk_response() -> Result<(), Box<dyn std::error::Error>> {
        let backend = ScriptedBackend::replying(&[TRIPLE_A, "I could not find anything.", TRIPLE_C]);
        let extractor = TripleExtractor::new(&backend, ExtractorConfig::default())?;

        let extraction = extractor.extract("one\n\ntwo\n\nthree")?;

        assert_eq!(extraction.chunk_count, 3);
        assert_eq!(extraction.triples.len(), 2);
        assert_eq!(extraction.triples[0].field("head"), Some("A"));
        assert_eq!(extraction.triples[1].field("head"), Some("C"));
        Ok(())
    }

    #[test]
    fn backend_failure_aborts_the_run() -> Result<(), Box<dyn std::error::Error>> {
        let backend = ScriptedBackend {
            responses: RefCell::new(vec![Err("503".to_string()), Ok(TRIPLE_A.to_string())]),
            requests: RefCell::default(),
        };
        let extractor = TripleExtractor::new(&backend, ExtractorConfig::default())?;

        let result = extractor.run("one\n\ntwo\n\nthree");

        assert!(matches!(result, Err(ExtractError::Generation(_))));
        assert_eq!(backend.requests.borrow().len(), 2);
        Ok(())
    }

    #[test]
    fn empty_text_makes_no_requests() -> Result<(), Box<dyn std::error::Error>> {
        let backend = ScriptedBackend::default();
        let extractor = TripleExtractor::new(&backend, ExtractorConfig::default())?;

        let extraction = extractor.extract("   ")?;

        assert_eq!(extraction.chunk_count, 0);
        assert!(extraction.raw.is_empty());
        assert!(extraction.triples.is_empty());
        assert!(backend.requests.borrow().is_empty());
        Ok(())
    }

    #[test]
    fn blank_paragraphs_do_not_become_requests() -> Result<(), Box<dyn std::error::Error>> {
        let backend = ScriptedBackend::default();
        let extractor = TripleExtractor::new(&backend, ExtractorConfig::default())?;

        extractor.run("\n\nCITS1003 Cybersecurity\n\n\n\nOffered in Semester 1\n\n")?;

        let requests = backend.requests.borrow();
        assert_eq!(requests.len(), 2);
        assert!(requests
            .iter()
            .all(|request| !request.user_message.trim().is_empty()));
        Ok(())
    }

    #[test]
    fn invalid_config_is_rejected_at_construction() {
        let config = ExtractorConfig {
            model: String::new(),
            ..ExtractorConfig::default()
        };
        assert!(TripleExtractor::new(ScriptedBackend::default(), config).is_err());
    }
}
