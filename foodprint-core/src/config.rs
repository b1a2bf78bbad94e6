//! Engine settings read from environment-style key/value sources.
//!
//! Every binary reads engine configuration through [`EngineSettings`], so
//! blank handling and defaults are the same everywhere.

use std::str::FromStr;
use std::time::Duration;

use thiserror::Error;

use crate::client::PollPolicy;
use crate::engine::{EngineKind, QueryContext};

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),

    #[error("{name} has an invalid value {value:?}: {reason}")]
    Invalid {
        name: &'static str,
        value: String,
        reason: &'static str,
    },
}

/// Process environment lookup.
pub fn env_lookup(name: &str) -> Option<String> {
    std::env::var(name).ok()
}

/// Wrap a lookup so blank values count as unset.
pub fn non_blank<F>(lookup: F) -> impl Fn(&str) -> Option<String>
where
    F: Fn(&str) -> Option<String>,
{
    move |name: &str| lookup(name).filter(|v| !v.trim().is_empty())
}

/// Parse an optional numeric setting.
pub fn parse_number<T: FromStr>(
    var: &impl Fn(&str) -> Option<String>,
    name: &'static str,
) -> Result<Option<T>, ConfigError> {
    match var(name) {
        None => Ok(None),
        Some(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::Invalid {
                name,
                value: raw,
                reason: "expected a non-negative integer",
            }),
    }
}

/// Which engine to run against, where, and how to poll it.
#[derive(Debug, Clone, PartialEq)]
pub struct EngineSettings {
    pub kind: EngineKind,
    pub context: QueryContext,
    pub poll: PollPolicy,
}

impl EngineSettings {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(env_lookup)
    }

    /// Read engine settings. Blank values count as unset.
    ///
    /// - `QUERY_ENGINE`: "athena" (default) | "fake"
    /// - `AWS_ATHENA_DATABASE`: required for athena, "default" for fake
    /// - `AWS_ATHENA_WORKGROUP`: workgroup (default: "primary")
    /// - `AWS_ATHENA_OUTPUT_LOCATION`: S3 output location (optional)
    /// - `QUERY_POLL_INTERVAL_MS`: delay between status polls (default: 1000)
    /// - `QUERY_MAX_WAIT_SECS`: give up after this long (default: 300)
    ///
    /// Region and credentials are read by the AWS SDK itself.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = non_blank(lookup);

        let kind = match var("QUERY_ENGINE") {
            Some(raw) => raw.parse()?,
            None => EngineKind::Athena,
        };

        // The fake engine ignores the database, so local runs need no AWS setup
        let database = match var("AWS_ATHENA_DATABASE") {
            Some(db) => db,
            None if kind == EngineKind::Fake => "default".to_string(),
            None => return Err(ConfigError::Missing("AWS_ATHENA_DATABASE")),
        };

        let mut poll = PollPolicy::default();
        if let Some(ms) = parse_number::<u64>(&var, "QUERY_POLL_INTERVAL_MS")? {
            poll.interval = Duration::from_millis(ms.max(1));
        }
        if let Some(secs) = parse_number::<u64>(&var, "QUERY_MAX_WAIT_SECS")? {
            poll.max_wait = Duration::from_secs(secs);
        }

        Ok(Self {
            kind,
            context: QueryContext {
                database,
                output_location: var("AWS_ATHENA_OUTPUT_LOCATION"),
                workgroup: var("AWS_ATHENA_WORKGROUP").unwrap_or_else(|| "primary".to_string()),
            },
            poll,
        })
    }
}
