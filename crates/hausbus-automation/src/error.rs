//! Error types for the automation engine

use thiserror::Error;

/// Errors that can occur in the automation engine
#[derive(Error, Debug)]
pub enum AutomationError {
    /// No task with this name is registered in the task registry
    #[error("Unknown task: {0}")]
    UnknownTask(String),

    /// A scheduled action failed
    #[error("Task failed: {0}")]
    TaskFailed(String),

    /// Device actuation failed
    #[error("Gateway error: {0}")]
    Gateway(#[from] hausbus_core::GatewayError),

    /// IO error (persistence)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
