//! Per-request query counting.
//!
//! A tracing Layer counts `engine.query` spans into a task-local counter that
//! lives for the duration of one HTTP request. Output layers carry their own
//! [`log_filter`], so `RUST_LOG` never hides query spans from the counter.

use axum::{body::Body, http::Request, middleware::Next, response::Response};
use std::sync::{
    atomic::{AtomicU32, Ordering},
    Arc,
};
use tracing::{span::Id, Subscriber};
use tracing_subscriber::{layer::Context, registry::LookupSpan, EnvFilter, Layer};

/// Span name opened by the query client for every engine round trip.
const QUERY_SPAN: &str = "engine.query";

/// Level filter for output layers, from `RUST_LOG` (default: info).
pub fn log_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
}

tokio::task_local! {
    /// Follows the request's task across await points and thread migrations.
    static QUERY_COUNTER: Arc<AtomicU32>;
}

/// Engine queries issued so far by the current request, if counting is active.
pub fn get_query_count() -> Option<u32> {
    QUERY_COUNTER
        .try_with(|counter| counter.load(Ordering::Relaxed))
        .ok()
}

/// Counts `engine.query` spans per HTTP request.
///
/// Footprint lookups may run several queries concurrently, but they are polled
/// inside the handler's task, so the task-local counter still sees them.
pub struct QueryCountingLayer;

impl<S> Layer<S> for QueryCountingLayer
where
    S: Subscriber + for<'a> LookupSpan<'a>,
{
    fn on_new_span(&self, _attrs: &tracing::span::Attributes<'_>, id: &Id, ctx: Context<'_, S>) {
        let Some(span) = ctx.span(id) else {
            return;
        };

        if span.name() == QUERY_SPAN {
            let _ = QUERY_COUNTER.try_with(|counter| {
                counter.fetch_add(1, Ordering::Relaxed);
            });
        }
    }
}

/// Initializes the per-request counter.
///
/// Must be the outermost layer so the counter exists before the trace span
/// and every handler future.
pub async fn query_counting_middleware(request: Request<Body>, next: Next) -> Response {
    let counter = Arc::new(AtomicU32::new(0));
    QUERY_COUNTER.scope(counter, next.run(request)).await
}

/// Adds `X-Query-Count` to responses when `TRACK_QUERY_COUNT=1`.
pub async fn query_count_header_middleware(request: Request<Body>, next: Next) -> Response {
    let mut response = next.run(request).await;

    if std::env::var("TRACK_QUERY_COUNT")
        .map(|v| v == "1")
        .unwrap_or(false)
    {
        if let Some(count) = get_query_count() {
            response
                .headers_mut()
                .insert("X-Query-Count", axum::http::HeaderValue::from(count));
        }
    }

    response
}
