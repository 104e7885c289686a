use thiserror::Error;

/// Errors raised while preparing or executing a single request.
///
/// Never surfaces to the response channel directly — callers convert it
/// into a [`crate::protocol::WorkerResult`] or an error-channel diagnostic.
#[derive(Debug, Error)]
pub enum WorkerError {
    #[error("failed to prepare workspace: {0}")]
    Workspace(#[from] std::io::Error),

    #[error("failed to install response channel: {0}")]
    Hygiene(String),

    #[error("engine error: {0}")]
    Engine(#[from] fastnode_runtime::RuntimeError),

    #[error("engine returned malformed event data: {0}")]
    MalformedEvent(#[from] serde_json::Error),
}
