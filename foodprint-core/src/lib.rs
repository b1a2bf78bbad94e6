pub mod client;
pub mod config;
pub mod engine;
pub mod error;
pub mod filter;
pub mod footprint;
pub mod pagination;
pub mod result;
pub mod sql;

pub use client::{PollPolicy, QueryClient};
pub use config::{ConfigError, EngineSettings};
pub use engine::{
    create_engine, AthenaEngine, EngineKind, FakeEngine, FakeOutcome, QueryContext, QueryEngine,
    QueryState,
};
pub use error::QueryError;
pub use filter::{FilterError, FilterKind, IngredientFilter};
pub use footprint::{
    Footprint, FootprintAggregator, FootprintBreakdown, FootprintError, FootprintTables,
    IngredientFootprint, IngredientMatch,
};
pub use pagination::{paginate, Page, PageRequest, PagedQuery, PaginationError};
pub use result::{ResultSet, Row};
pub use sql::Predicate;
