use thiserror::Error;

#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("generation failed: {0}")]
    Generation(#[from] GenerationError),

    #[error("path has no file name: {0}")]
    MissingFileName(String),

    #[error("invalid extractor config: {0}")]
    InvalidConfig(String),

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("failed to persist {path}: {reason}")]
    Persist { path: String, reason: String },
}

#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("invalid response from {backend}: {details}")]
    BackendResponse { backend: String, details: String },

    #[error("malformed completion: {0}")]
    MalformedResponse(String),

    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("url parse error: {0}")]
    Url(#[from] url::ParseError),

    #[error("completion body is not valid json: {0}")]
    Serialization(#[from] serde_json::Error),
}
