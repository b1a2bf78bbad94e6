//! Query engine abstraction.
//!
//! The engine is an asynchronous SQL service with a start / poll / fetch
//! contract. Production talks to Athena; tests and local runs use the fake.

mod athena;
mod fake;

pub use athena::AthenaEngine;
pub use fake::{FakeEngine, FakeOutcome};

use std::fmt;
use std::str::FromStr;

use async_trait::async_trait;

use crate::config::ConfigError;
use crate::error::QueryError;

/// One row as returned by the engine: positional, nullable text cells.
pub type RawRow = Vec<Option<String>>;

/// Lifecycle state of a query execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryState {
    Queued,
    Running,
    Succeeded,
    Failed,
    Cancelled,
}

impl QueryState {
    pub fn as_str(&self) -> &'static str {
        match self {
            QueryState::Queued => "QUEUED",
            QueryState::Running => "RUNNING",
            QueryState::Succeeded => "SUCCEEDED",
            QueryState::Failed => "FAILED",
            QueryState::Cancelled => "CANCELLED",
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, QueryState::Queued | QueryState::Running)
    }
}

impl fmt::Display for QueryState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Status snapshot of an execution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryStatus {
    pub state: QueryState,
    /// Engine-supplied explanation for the last state change, if any.
    pub reason: Option<String>,
}

impl QueryStatus {
    pub fn new(state: QueryState) -> Self {
        Self {
            state,
            reason: None,
        }
    }
}

/// Where a query runs: database, result output location and workgroup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryContext {
    pub database: String,
    /// S3 URI for result files. None defers to the workgroup's setting.
    pub output_location: Option<String>,
    pub workgroup: String,
}

/// A single submission: SQL text bound to a context. Built fresh per call.
#[derive(Debug, Clone)]
pub struct QueryRequest<'a> {
    pub sql: &'a str,
    pub context: &'a QueryContext,
}

/// Trait for query engines, enabling a fake in tests.
///
/// Implementations must be thread-safe; one engine handle is shared by every
/// in-flight request.
#[async_trait]
pub trait QueryEngine: Send + Sync + fmt::Debug {
    /// Submit a query and return its execution id.
    async fn start_query(&self, request: &QueryRequest<'_>) -> Result<String, QueryError>;

    /// Read the current status of an execution.
    async fn query_status(&self, execution_id: &str) -> Result<QueryStatus, QueryError>;

    /// Fetch every result row of a succeeded execution, header row included.
    async fn fetch_rows(&self, execution_id: &str) -> Result<Vec<RawRow>, QueryError>;

    /// Ask the engine to stop an execution. Best effort.
    async fn stop_query(&self, execution_id: &str) -> Result<(), QueryError>;

    /// Engine name for logs and health output (e.g., "athena", "fake").
    fn engine_name(&self) -> &'static str;
}

/// Engine implementation to run queries against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineKind {
    Athena,
    Fake,
}

impl EngineKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EngineKind::Athena => "athena",
            EngineKind::Fake => "fake",
        }
    }
}

impl FromStr for EngineKind {
    type Err = ConfigError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "athena" => Ok(EngineKind::Athena),
            "fake" => Ok(EngineKind::Fake),
            _ => Err(ConfigError::Invalid {
                name: "QUERY_ENGINE",
                value: raw.to_string(),
                reason: "expected \"athena\" or \"fake\"",
            }),
        }
    }
}

/// Build an engine of the given kind.
///
/// Athena reads region and credentials from the standard AWS environment
/// (`AWS_REGION`, `AWS_ACCESS_KEY_ID`, `AWS_SECRET_ACCESS_KEY`, profiles).
pub async fn create_engine(kind: EngineKind) -> Box<dyn QueryEngine> {
    match kind {
        EngineKind::Athena => Box::new(AthenaEngine::from_env().await),
        EngineKind::Fake => Box::new(FakeEngine::new()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_terminal_states() {
        assert!(!QueryState::Queued.is_terminal());
        assert!(!QueryState::Running.is_terminal());
        assert!(QueryState::Succeeded.is_terminal());
        assert!(QueryState::Failed.is_terminal());
        assert!(QueryState::Cancelled.is_terminal());
    }

    #[test]
    fn test_state_display_matches_engine_names() {
        assert_eq!(QueryState::Cancelled.to_string(), "CANCELLED");
        assert_eq!(QueryState::Failed.to_string(), "FAILED");
    }

    #[tokio::test]
    async fn test_create_engine_by_kind() {
        for (raw, name) in [("fake", "fake"), (" FAKE ", "fake")] {
            let kind: EngineKind = raw.parse().unwrap();
            assert_eq!(kind.as_str(), name);
            assert_eq!(create_engine(kind).await.engine_name(), name);
        }
        assert!("".parse::<EngineKind>().is_err());
    }
}
