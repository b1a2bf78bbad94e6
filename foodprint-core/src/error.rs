use std::time::Duration;

use thiserror::Error;

use crate::engine::QueryState;

/// Errors from running a single query against the engine.
#[derive(Error, Debug)]
pub enum QueryError {
    /// The engine reported FAILED or CANCELLED for the execution.
    #[error("Query {state}: {reason}")]
    Failed { state: QueryState, reason: String },

    /// The engine could not be reached, or rejected the request (network, auth, throttling).
    #[error("Query engine request failed: {0}")]
    Transport(String),

    /// The execution did not reach a terminal state within the poll budget.
    #[error("Query {execution_id} did not finish within {}s", waited.as_secs())]
    Timeout {
        execution_id: String,
        waited: Duration,
    },

    /// The engine answered, but not with something we can read.
    #[error("Unexpected query result: {0}")]
    MalformedResult(String),
}
