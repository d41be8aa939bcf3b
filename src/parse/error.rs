#[derive(Debug, thiserror::Error)]
pub enum JobError {
    #[error("{0}")]
    InvalidResponse(String),

    #[error("Job did not finish within the polling window")]
    TimeoutError,

    #[error("Job failed: {0}")]
    Failed(String),

    #[error("Missing credentials: set {0}")]
    MissingCredentials(&'static str),

    #[error("HTTP error: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Task error: {0}")]
    JoinError(#[from] tokio::task::JoinError),
}
