//! Two-phase pagination: count the matches, then fetch one window.
//!
//! The window is expressed with `ROW_NUMBER()` instead of OFFSET so the same
//! query shape works across engine versions.

use thiserror::Error;

use crate::client::QueryClient;
use crate::error::QueryError;
use crate::result::Row;
use crate::sql::{where_clause, Predicate};

pub const DEFAULT_PAGE: u64 = 1;
pub const DEFAULT_LIMIT: u64 = 10;

/// Helper column added by the window query and stripped from results.
const ROW_NUM: &str = "row_num";

#[derive(Error, Debug)]
pub enum PaginationError {
    #[error("Invalid pagination parameters. Page and limit must be positive integers.")]
    InvalidParameters,

    #[error("No results found.")]
    NotFound,

    #[error("Page number exceeds total pages. Maximum page number is {total_pages}.")]
    PageOutOfRange { total_pages: u64 },

    #[error(transparent)]
    Query(#[from] QueryError),
}

/// A validated page/limit pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    page: u64,
    limit: u64,
}

impl Default for PageRequest {
    fn default() -> Self {
        Self {
            page: DEFAULT_PAGE,
            limit: DEFAULT_LIMIT,
        }
    }
}

impl PageRequest {
    pub fn new(page: u64, limit: u64) -> Result<Self, PaginationError> {
        if page == 0 || limit == 0 {
            return Err(PaginationError::InvalidParameters);
        }
        Ok(Self { page, limit })
    }

    /// Parse raw query-string values. Missing values take the defaults
    /// (page 1, limit 10); anything but a positive integer is rejected.
    pub fn parse(page: Option<&str>, limit: Option<&str>) -> Result<Self, PaginationError> {
        let page = parse_positive(page, DEFAULT_PAGE)?;
        let limit = parse_positive(limit, DEFAULT_LIMIT)?;
        Self::new(page, limit)
    }

    pub fn page(&self) -> u64 {
        self.page
    }

    pub fn limit(&self) -> u64 {
        self.limit
    }

    /// Number of rows before this page.
    pub fn offset(&self) -> u64 {
        (self.page - 1).saturating_mul(self.limit)
    }
}

fn parse_positive(raw: Option<&str>, default: u64) -> Result<u64, PaginationError> {
    match raw.map(str::trim) {
        None | Some("") => Ok(default),
        Some(value) => value
            .parse::<u64>()
            .ok()
            .filter(|v| *v > 0)
            .ok_or(PaginationError::InvalidParameters),
    }
}

/// ceil(count / limit).
pub fn total_pages(count: u64, limit: u64) -> u64 {
    count.div_ceil(limit)
}

/// Check a page against a known total and return the page count.
///
/// A zero total is reported as not found regardless of the page asked for.
pub fn check_bounds(total: u64, request: &PageRequest) -> Result<u64, PaginationError> {
    if total == 0 {
        return Err(PaginationError::NotFound);
    }
    let pages = total_pages(total, request.limit);
    if request.page > pages {
        return Err(PaginationError::PageOutOfRange { total_pages: pages });
    }
    Ok(pages)
}

/// What to paginate: table, projection, filter and ordering.
#[derive(Debug, Clone)]
pub struct PagedQuery<'a> {
    pub table: &'a str,
    pub columns: &'a [&'a str],
    pub predicate: Option<Predicate>,
    pub order_by: &'a str,
    /// Secondary sort key so ties in `order_by` land on the same page every time.
    pub tie_breaker: Option<&'a str>,
}

impl PagedQuery<'_> {
    pub fn count_sql(&self) -> String {
        format!(
            "SELECT COUNT(*) AS total FROM {}{}",
            self.table,
            where_clause(self.predicate.as_ref())
        )
    }

    pub fn page_sql(&self, request: &PageRequest) -> String {
        let order = match self.tie_breaker {
            Some(tie) if tie != self.order_by => format!("{}, {}", self.order_by, tie),
            _ => self.order_by.to_string(),
        };
        let offset = request.offset();

        format!(
            "SELECT * FROM (SELECT {}, ROW_NUMBER() OVER (ORDER BY {}) AS {} FROM {}{}) AS ranked \
             WHERE {} > {} AND {} <= {} ORDER BY {}",
            self.columns.join(", "),
            order,
            ROW_NUM,
            self.table,
            where_clause(self.predicate.as_ref()),
            ROW_NUM,
            offset,
            ROW_NUM,
            offset.saturating_add(request.limit),
            ROW_NUM,
        )
    }
}

/// One page of rows plus the totals needed to navigate.
#[derive(Debug, Clone, PartialEq)]
pub struct Page {
    pub page: u64,
    pub limit: u64,
    pub total_results: u64,
    pub total_pages: u64,
    pub rows: Vec<Row>,
}

/// Run the count query, check bounds, then fetch the requested window.
pub async fn paginate(
    client: &QueryClient,
    query: &PagedQuery<'_>,
    request: PageRequest,
) -> Result<Page, PaginationError> {
    let counted = client.execute(&query.count_sql()).await?;
    let total = counted
        .first()
        .ok_or_else(|| QueryError::MalformedResult("Count query returned no rows".to_string()))?
        .parse_i64("total")?;
    let total = u64::try_from(total)
        .map_err(|_| QueryError::MalformedResult(format!("Negative count: {}", total)))?;

    let total_pages = check_bounds(total, &request)?;

    let rows: Vec<Row> = client
        .execute(&query.page_sql(&request))
        .await?
        .into_rows()
        .into_iter()
        .map(|row| row.without(ROW_NUM))
        .collect();

    tracing::debug!(
        table = query.table,
        total,
        page = request.page,
        returned = rows.len(),
        "page fetched"
    );

    Ok(Page {
        page: request.page,
        limit: request.limit,
        total_results: total,
        total_pages,
        rows,
    })
}
