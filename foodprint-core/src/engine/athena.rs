//! AWS Athena engine.

use std::future::Future;

use async_trait::async_trait;
use aws_sdk_athena::error::DisplayErrorContext;
use aws_sdk_athena::types::{
    QueryExecutionContext, QueryExecutionState, ResultConfiguration, ResultSet,
};
use aws_sdk_athena::Client;

use super::{QueryEngine, QueryRequest, QueryState, QueryStatus, RawRow};
use crate::error::QueryError;

/// Athena-backed engine. Cheap to clone; the SDK client pools connections.
#[derive(Debug, Clone)]
pub struct AthenaEngine {
    client: Client,
}

impl AthenaEngine {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Build a client from the standard AWS environment (region, credentials, profile).
    pub async fn from_env() -> Self {
        let config = aws_config::load_from_env().await;
        Self::new(Client::new(&config))
    }
}

fn transport<E: std::error::Error + 'static>(err: E) -> QueryError {
    QueryError::Transport(DisplayErrorContext(&err).to_string())
}

fn map_state(state: &QueryExecutionState) -> Result<QueryState, QueryError> {
    match state {
        QueryExecutionState::Queued => Ok(QueryState::Queued),
        QueryExecutionState::Running => Ok(QueryState::Running),
        QueryExecutionState::Succeeded => Ok(QueryState::Succeeded),
        QueryExecutionState::Failed => Ok(QueryState::Failed),
        QueryExecutionState::Cancelled => Ok(QueryState::Cancelled),
        other => Err(QueryError::MalformedResult(format!(
            "Unknown query state: {}",
            other.as_str()
        ))),
    }
}

/// An execution that has not reported a state yet counts as queued.
fn state_or_queued(state: Option<&QueryExecutionState>) -> Result<QueryState, QueryError> {
    state.map_or(Ok(QueryState::Queued), map_state)
}

/// Text cells of one result page. Non-text cells become NULL.
fn page_rows(result_set: Option<&ResultSet>) -> Vec<RawRow> {
    result_set
        .map(|result_set| {
            result_set
                .rows()
                .iter()
                .map(|row| {
                    row.data()
                        .iter()
                        .map(|datum| datum.var_char_value().map(str::to_string))
                        .collect()
                })
                .collect()
        })
        .unwrap_or_default()
}

/// Follow continuation tokens until the last page, concatenating rows.
///
/// Only the first page carries the header row, so pages are appended as-is.
async fn collect_pages<F, Fut>(mut fetch_page: F) -> Result<Vec<RawRow>, QueryError>
where
    F: FnMut(Option<String>) -> Fut,
    Fut: Future<Output = Result<(Vec<RawRow>, Option<String>), QueryError>>,
{
    let mut rows = Vec::new();
    let mut next_token = None;
    loop {
        let (page, token) = fetch_page(next_token.take()).await?;
        rows.extend(page);
        match token {
            Some(token) => next_token = Some(token),
            None => return Ok(rows),
        }
    }
}

#[async_trait]
impl QueryEngine for AthenaEngine {
    async fn start_query(&self, request: &QueryRequest<'_>) -> Result<String, QueryError> {
        let mut call = self
            .client
            .start_query_execution()
            .query_string(request.sql)
            .query_execution_context(
                QueryExecutionContext::builder()
                    .database(&request.context.database)
                    .build(),
            )
            .work_group(&request.context.workgroup);

        if let Some(location) = &request.context.output_location {
            call = call.result_configuration(
                ResultConfiguration::builder()
                    .output_location(location)
                    .build(),
            );
        }

        let output = call.send().await.map_err(transport)?;

        output
            .query_execution_id()
            .map(str::to_string)
            .ok_or_else(|| QueryError::MalformedResult("No execution id returned".to_string()))
    }

    async fn query_status(&self, execution_id: &str) -> Result<QueryStatus, QueryError> {
        let output = self
            .client
            .get_query_execution()
            .query_execution_id(execution_id)
            .send()
            .await
            .map_err(transport)?;

        let status = output
            .query_execution()
            .and_then(|execution| execution.status())
            .ok_or_else(|| {
                QueryError::MalformedResult(format!("No status for execution {}", execution_id))
            })?;

        let state = state_or_queued(status.state())?;

        Ok(QueryStatus {
            state,
            reason: status.state_change_reason().map(str::to_string),
        })
    }

    async fn fetch_rows(&self, execution_id: &str) -> Result<Vec<RawRow>, QueryError> {
        // GetQueryResults returns at most 1000 rows per call
        collect_pages(|next_token| async move {
            let output = self
                .client
                .get_query_results()
                .query_execution_id(execution_id)
                .set_next_token(next_token)
                .send()
                .await
                .map_err(transport)?;

            Ok((
                page_rows(output.result_set()),
                output.next_token().map(str::to_string),
            ))
        })
        .await
    }

    async fn stop_query(&self, execution_id: &str) -> Result<(), QueryError> {
        self.client
            .stop_query_execution()
            .query_execution_id(execution_id)
            .send()
            .await
            .map_err(transport)?;
        Ok(())
    }

    fn engine_name(&self) -> &'static str {
        "athena"
    }
}
