pub mod aggregate;
pub mod artifact;
pub mod backend;
pub mod chunking;
pub mod error;
pub mod jobs;
pub mod models;
pub mod orchestrator;
pub mod recovery;
pub mod schema;

pub use aggregate::{aggregate, remove_consumed, AggregateReport, SkippedResult};
pub use artifact::{
    render_artifact, write_artifact, write_atomic, ArtifactFormat, DEFAULT_MODULE_IDENTIFIER,
};
pub use backend::{
    ChatEndpointConfig, GenerationBackend, GenerationRequest, OpenAiChatBackend, DEFAULT_BASE_URL,
    DEFAULT_TIMEOUT_SECS,
};
pub use chunking::{chunk_by_words, word_count, PARAGRAPH_SEPARATOR};
pub use error::{ExtractError, GenerationError};
pub use jobs::{
    discover_source_files, resolve_sources, run_batch, run_job, BatchReport, FailedJob, JobReport,
    SourceJob,
};
pub use models::{
    ExtractorConfig, SamplingParams, Triple, DEFAULT_MODEL, DEFAULT_SYSTEM_INSTRUCTION,
};
pub use orchestrator::{Extraction, TripleExtractor};
pub use recovery::{recover, recover_segments, ParseAttempt};
pub use schema::TripleSchema;
