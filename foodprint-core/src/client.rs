//! Query execution client: submit, poll until terminal, fetch.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::{sleep, Instant};
use tracing::Instrument;

use crate::engine::{QueryContext, QueryEngine, QueryRequest, QueryState, RawRow};
use crate::error::QueryError;
use crate::result::ResultSet;

/// How often to poll and how long to wait before giving up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollPolicy {
    pub interval: Duration,
    pub max_wait: Duration,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(1),
            max_wait: Duration::from_secs(300),
        }
    }
}

/// Runs SQL against an engine on a fixed context.
///
/// Cloning shares the engine handle.
#[derive(Debug, Clone)]
pub struct QueryClient {
    engine: Arc<dyn QueryEngine>,
    context: Arc<QueryContext>,
    policy: PollPolicy,
}

impl QueryClient {
    pub fn new(engine: Arc<dyn QueryEngine>, context: QueryContext, policy: PollPolicy) -> Self {
        Self {
            engine,
            context: Arc::new(context),
            policy,
        }
    }

    pub fn engine_name(&self) -> &'static str {
        self.engine.engine_name()
    }

    pub fn context(&self) -> &QueryContext {
        &self.context
    }

    /// Run a query and map its rows, using the first row as the header.
    pub async fn execute(&self, sql: &str) -> Result<ResultSet, QueryError> {
        let rows = self.execute_rows(sql).await?;
        Ok(ResultSet::from_raw(rows))
    }

    /// Run a query and return the raw rows, header included if the statement has one.
    pub async fn execute_rows(&self, sql: &str) -> Result<Vec<RawRow>, QueryError> {
        let span = tracing::info_span!(
            "engine.query",
            engine = self.engine.engine_name(),
            execution_id = tracing::field::Empty,
        );
        self.run(sql).instrument(span).await
    }

    async fn run(&self, sql: &str) -> Result<Vec<RawRow>, QueryError> {
        let started = Instant::now();
        let request = QueryRequest {
            sql,
            context: &self.context,
        };

        let execution_id = self.engine.start_query(&request).await?;
        tracing::Span::current().record("execution_id", execution_id.as_str());
        tracing::debug!(sql, "query submitted");

        loop {
            sleep(self.policy.interval).await;

            let status = self.engine.query_status(&execution_id).await?;
            match status.state {
                QueryState::Succeeded => break,
                QueryState::Failed | QueryState::Cancelled => {
                    let reason = status
                        .reason
                        .unwrap_or_else(|| "no reason given".to_string());
                    tracing::warn!(state = %status.state, reason = %reason, "query did not succeed");
                    return Err(QueryError::Failed {
                        state: status.state,
                        reason,
                    });
                }
                QueryState::Queued | QueryState::Running => {
                    let waited = started.elapsed();
                    if waited >= self.policy.max_wait {
                        if let Err(e) = self.engine.stop_query(&execution_id).await {
                            tracing::warn!(error = %e, "failed to stop timed out query");
                        }
                        return Err(QueryError::Timeout {
                            execution_id,
                            waited,
                        });
                    }
                }
            }
        }

        let rows = self.engine.fetch_rows(&execution_id).await?;
        tracing::debug!(
            rows = rows.len(),
            elapsed_ms = %started.elapsed().as_millis(),
            "query finished"
        );
        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{FakeEngine, FakeOutcome};

    fn fast_policy() -> PollPolicy {
        PollPolicy {
            interval: Duration::from_millis(1),
            max_wait: Duration::from_secs(5),
        }
    }

    fn client(engine: Arc<FakeEngine>, policy: PollPolicy) -> QueryClient {
        QueryClient::new(
            engine,
            QueryContext {
                database: "recipes".to_string(),
                output_location: Some("s3://results/".to_string()),
                workgroup: "primary".to_string(),
            },
            policy,
        )
    }

    #[tokio::test]
    async fn test_execute_polls_until_succeeded() {
        let engine = Arc::new(
            FakeEngine::new()
                .with_table("count(*)", &["total"], &[&["42"]])
                .with_status_script(vec![
                    QueryState::Queued,
                    QueryState::Running,
                    QueryState::Running,
                ]),
        );
        let client = client(engine.clone(), fast_policy());

        let result = client
            .execute("SELECT COUNT(*) AS total FROM recipes")
            .await
            .unwrap();

        assert_eq!(result.len(), 1);
        assert_eq!(result.first().unwrap().parse_i64("total").unwrap(), 42);
        assert_eq!(engine.submitted_queries().len(), 1);
    }

    #[tokio::test]
    async fn test_failed_query_carries_reason() {
        let engine = Arc::new(FakeEngine::new().with_outcome(
            "select",
            FakeOutcome::Fail("SYNTAX_ERROR: line 1:8".to_string()),
        ));
        let client = client(engine, fast_policy());

        let err = client.execute("SELECT nope").await.unwrap_err();
        match err {
            QueryError::Failed { state, reason } => {
                assert_eq!(state, QueryState::Failed);
                assert_eq!(reason, "SYNTAX_ERROR: line 1:8");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_cancelled_query_fails() {
        let engine = Arc::new(
            FakeEngine::new()
                .with_outcome("select", FakeOutcome::Cancel("Cancelled by user".to_string())),
        );
        let client = client(engine, fast_policy());

        let err = client.execute("SELECT 1").await.unwrap_err();
        assert_eq!(err.to_string(), "Query CANCELLED: Cancelled by user");
    }

    #[tokio::test]
    async fn test_transport_error_propagates_immediately() {
        let engine = Arc::new(FakeEngine::new().with_outcome(
            "select",
            FakeOutcome::Unreachable("connection refused".to_string()),
        ));
        let client = client(engine.clone(), fast_policy());

        let err = client.execute("SELECT 1").await.unwrap_err();
        assert!(matches!(err, QueryError::Transport(_)));
        assert_eq!(engine.submitted_queries().len(), 1);
    }

    #[tokio::test]
    async fn test_stuck_query_times_out_and_is_stopped() {
        let engine = Arc::new(FakeEngine::new().with_outcome("select", FakeOutcome::Stuck));
        let client = client(
            engine.clone(),
            PollPolicy {
                interval: Duration::from_millis(1),
                max_wait: Duration::from_millis(20),
            },
        );

        let err = client.execute("SELECT 1").await.unwrap_err();
        match err {
            QueryError::Timeout { execution_id, .. } => {
                assert_eq!(engine.stopped_executions(), vec![execution_id]);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
