// ABOUTME: Defines all error types for the quotagate library using thiserror.
// ABOUTME: Scheduler errors are synchronous; client errors wrap HTTP failures.

/// Errors raised by the scheduler itself.
///
/// A work item's own failure is never represented here: it is returned to the
/// caller verbatim as the task's output.
#[derive(Debug, thiserror::Error)]
pub enum SchedulerError {
    #[error("invalid task: expected {expected}")]
    InvalidTask { expected: &'static str },

    #[error("task dropped before producing an outcome")]
    TaskDropped,

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Errors from the rate-limited HTTP client.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("Deserialization error: {0}")]
    Deserialize(#[from] serde_json::Error),

    #[error("Scheduler error: {0}")]
    Scheduler(#[from] SchedulerError),
}
