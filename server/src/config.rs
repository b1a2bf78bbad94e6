//! Server configuration, read once from the environment at startup.

use std::sync::Arc;

use foodprint_core::config::{env_lookup, non_blank, parse_number};
use foodprint_core::footprint::{FootprintAggregator, FootprintTables};
use foodprint_core::sql::tables;
use foodprint_core::{ConfigError, EngineSettings, QueryClient, QueryEngine};

#[derive(Debug, Clone, PartialEq)]
pub struct ServerConfig {
    pub port: u16,
    pub engine: EngineSettings,
    pub recipes_table: String,
    pub footprint_tables: FootprintTables,
    /// Footprint lookups in flight per recipe.
    pub footprint_concurrency: usize,
}

impl ServerConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(env_lookup)
    }

    /// Build from any key/value source. Blank values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = non_blank(lookup);
        let engine = EngineSettings::from_lookup(&var)?;

        let footprint_concurrency =
            match parse_number::<usize>(&var, "FOOTPRINT_LOOKUP_CONCURRENCY")? {
                Some(0) => {
                    return Err(ConfigError::Invalid {
                        name: "FOOTPRINT_LOOKUP_CONCURRENCY",
                        value: "0".to_string(),
                        reason: "must be at least 1",
                    })
                }
                Some(n) => n,
                None => 1,
            };

        Ok(Self {
            port: parse_number::<u16>(&var, "PORT")?.unwrap_or(3000),
            engine,
            recipes_table: var("RECIPES_TABLE").unwrap_or_else(|| tables::RECIPES.to_string()),
            footprint_tables: FootprintTables {
                ingredients: var("INGREDIENTS_TABLE")
                    .unwrap_or_else(|| tables::INGREDIENTS.to_string()),
                mapped: var("MAPPED_FOOTPRINT_TABLE")
                    .unwrap_or_else(|| tables::MAPPED_FOOTPRINTS.to_string()),
            },
            footprint_concurrency,
        })
    }
}

/// Everything a request handler needs, built once and shared.
#[derive(Debug, Clone)]
pub struct AppContext {
    pub client: QueryClient,
    pub recipes_table: String,
    pub ingredients_table: String,
    pub footprints: FootprintAggregator,
}

impl AppContext {
    pub fn new(config: &ServerConfig, engine: Arc<dyn QueryEngine>) -> Self {
        let client = QueryClient::new(
            engine,
            config.engine.context.clone(),
            config.engine.poll,
        );
        let footprints = FootprintAggregator::new(
            client.clone(),
            config.footprint_tables.clone(),
            config.footprint_concurrency,
        );

        Self {
            client,
            recipes_table: config.recipes_table.clone(),
            ingredients_table: config.footprint_tables.ingredients.clone(),
            footprints,
        }
    }
}
