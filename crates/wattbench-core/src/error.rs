use thiserror::Error;

#[derive(Error, Debug)]
pub enum WattbenchError {
    #[error("Ollama error: {0}")]
    Ollama(String),

    #[error("Benchmark failed: {0}")]
    BenchmarkFailed(String),

    #[error("Submission failed: {0}")]
    Submit(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("HTTP error: {0}")]
    Http(String),

    #[error("Config error: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, WattbenchError>;
