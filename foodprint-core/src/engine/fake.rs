//! Fake query engine for testing.
//!
//! Outcomes are matched by checking whether the submitted SQL contains a
//! registered substring, so tests run without AWS access.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, RwLock};

use async_trait::async_trait;

use super::{QueryEngine, QueryRequest, QueryState, QueryStatus, RawRow};
use crate::error::QueryError;

/// What the fake does with a matching query.
#[derive(Debug, Clone)]
pub enum FakeOutcome {
    /// Succeed with these rows (header row first).
    Rows(Vec<RawRow>),
    /// Reach FAILED with this reason.
    Fail(String),
    /// Reach CANCELLED with this reason.
    Cancel(String),
    /// Reject the submission as if the engine were unreachable.
    Unreachable(String),
    /// Never leave RUNNING.
    Stuck,
}

impl FakeOutcome {
    /// Build a successful outcome from a header and text rows.
    pub fn table(header: &[&str], rows: &[&[&str]]) -> Self {
        let mut all: Vec<RawRow> = Vec::with_capacity(rows.len() + 1);
        all.push(header.iter().map(|c| Some(c.to_string())).collect());
        all.extend(
            rows.iter()
                .map(|row| row.iter().map(|v| Some(v.to_string())).collect()),
        );
        FakeOutcome::Rows(all)
    }

    /// A successful outcome with a header and no data rows.
    pub fn empty(header: &[&str]) -> Self {
        Self::table(header, &[])
    }
}

#[derive(Debug)]
struct Execution {
    outcome: FakeOutcome,
    polls: usize,
    stopped: bool,
}

/// A fake engine for testing.
#[derive(Debug, Default)]
pub struct FakeEngine {
    /// SQL substring -> outcome, first match wins
    outcomes: RwLock<Vec<(String, FakeOutcome)>>,
    /// Outcome when no pattern matches
    default_outcome: Option<FakeOutcome>,
    /// States reported before the terminal state of every execution
    status_script: Vec<QueryState>,
    executions: Mutex<HashMap<String, Execution>>,
    submitted: Mutex<Vec<String>>,
    next_id: AtomicU64,
}

impl FakeEngine {
    /// Create a fake with no registered outcomes.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an outcome for queries containing `sql_contains` (case-insensitive).
    pub fn with_outcome(self, sql_contains: &str, outcome: FakeOutcome) -> Self {
        self.add_outcome(sql_contains, outcome);
        self
    }

    /// Register a successful table for queries containing `sql_contains`.
    pub fn with_table(self, sql_contains: &str, header: &[&str], rows: &[&[&str]]) -> Self {
        self.with_outcome(sql_contains, FakeOutcome::table(header, rows))
    }

    /// Register an outcome on an engine that is already shared.
    pub fn add_outcome(&self, sql_contains: &str, outcome: FakeOutcome) {
        self.outcomes
            .write()
            .unwrap()
            .push((sql_contains.to_lowercase(), outcome));
    }

    /// Set the outcome when no pattern matches.
    pub fn with_default_outcome(mut self, outcome: FakeOutcome) -> Self {
        self.default_outcome = Some(outcome);
        self
    }

    /// Report these states, one per poll, before the terminal state.
    pub fn with_status_script(mut self, states: Vec<QueryState>) -> Self {
        self.status_script = states;
        self
    }

    /// Every SQL text submitted so far, in order.
    pub fn submitted_queries(&self) -> Vec<String> {
        self.submitted.lock().unwrap().clone()
    }

    /// Execution ids that were asked to stop.
    pub fn stopped_executions(&self) -> Vec<String> {
        let executions = self.executions.lock().unwrap();
        let mut ids: Vec<String> = executions
            .iter()
            .filter(|(_, e)| e.stopped)
            .map(|(id, _)| id.clone())
            .collect();
        ids.sort();
        ids
    }

    fn outcome_for(&self, sql: &str) -> Option<FakeOutcome> {
        let sql_lower = sql.to_lowercase();
        let outcomes = self.outcomes.read().unwrap();
        outcomes
            .iter()
            .find(|(pattern, _)| sql_lower.contains(pattern))
            .map(|(_, outcome)| outcome.clone())
            .or_else(|| self.default_outcome.clone())
    }
}

#[async_trait]
impl QueryEngine for FakeEngine {
    async fn start_query(&self, request: &QueryRequest<'_>) -> Result<String, QueryError> {
        self.submitted.lock().unwrap().push(request.sql.to_string());

        let outcome = self.outcome_for(request.sql).ok_or_else(|| {
            QueryError::Transport(format!(
                "FakeEngine: No outcome configured for query (first 100 chars): {}",
                request.sql.chars().take(100).collect::<String>()
            ))
        })?;

        if let FakeOutcome::Unreachable(message) = &outcome {
            return Err(QueryError::Transport(message.clone()));
        }

        let id = format!("fake-{}", self.next_id.fetch_add(1, Ordering::Relaxed) + 1);
        self.executions.lock().unwrap().insert(
            id.clone(),
            Execution {
                outcome,
                polls: 0,
                stopped: false,
            },
        );
        Ok(id)
    }

    async fn query_status(&self, execution_id: &str) -> Result<QueryStatus, QueryError> {
        let mut executions = self.executions.lock().unwrap();
        let execution = executions
            .get_mut(execution_id)
            .ok_or_else(|| QueryError::Transport(format!("Unknown execution {}", execution_id)))?;

        execution.polls += 1;
        if let Some(state) = self.status_script.get(execution.polls - 1) {
            return Ok(QueryStatus::new(*state));
        }

        let status = match &execution.outcome {
            FakeOutcome::Rows(_) => QueryStatus::new(QueryState::Succeeded),
            FakeOutcome::Fail(reason) => QueryStatus {
                state: QueryState::Failed,
                reason: Some(reason.clone()),
            },
            FakeOutcome::Cancel(reason) => QueryStatus {
                state: QueryState::Cancelled,
                reason: Some(reason.clone()),
            },
            FakeOutcome::Stuck if execution.stopped => QueryStatus {
                state: QueryState::Cancelled,
                reason: Some("Query was cancelled by user".to_string()),
            },
            FakeOutcome::Stuck => QueryStatus::new(QueryState::Running),
            FakeOutcome::Unreachable(message) => {
                return Err(QueryError::Transport(message.clone()))
            }
        };
        Ok(status)
    }

    async fn fetch_rows(&self, execution_id: &str) -> Result<Vec<RawRow>, QueryError> {
        let executions = self.executions.lock().unwrap();
        match executions.get(execution_id).map(|e| &e.outcome) {
            Some(FakeOutcome::Rows(rows)) => Ok(rows.clone()),
            Some(_) => Err(QueryError::MalformedResult(format!(
                "Execution {} has no results",
                execution_id
            ))),
            None => Err(QueryError::Transport(format!(
                "Unknown execution {}",
                execution_id
            ))),
        }
    }

    async fn stop_query(&self, execution_id: &str) -> Result<(), QueryError> {
        let mut executions = self.executions.lock().unwrap();
        if let Some(execution) = executions.get_mut(execution_id) {
            execution.stopped = true;
        }
        Ok(())
    }

    fn engine_name(&self) -> &'static str {
        "fake"
    }
}
