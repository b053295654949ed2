//! Event log failures.

/// Why an event could not be written or read back.
#[derive(Debug, thiserror::Error)]
pub enum ObserveError {
    #[error("event log query failed: {0}")]
    Sql(#[from] rusqlite::Error),

    /// The event payload could not be encoded as JSON.
    #[error("event payload could not be encoded: {0}")]
    Payload(#[from] serde_json::Error),
}
