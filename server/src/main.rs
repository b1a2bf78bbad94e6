mod api;
mod config;
mod telemetry;

use anyhow::Context;
use axum::extract::MatchedPath;
use axum::http::Request;
use axum::middleware;
use config::{AppContext, ServerConfig};
use opentelemetry::trace::TracerProvider;
use opentelemetry_appender_tracing::layer::OpenTelemetryTracingBridge;
use opentelemetry_otlp::WithExportConfig;
use opentelemetry_sdk::logs::SdkLoggerProvider;
use opentelemetry_sdk::trace::SdkTracerProvider;
use std::env;
use std::net::{TcpStream, ToSocketAddrs};
use std::sync::Arc;
use std::time::Duration;
use tower_http::trace::TraceLayer;
use tracing::Span;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::Layer;

/// Application state shared across all handlers
pub type AppState = Arc<AppContext>;

/// Build OTLP trace and log pipelines when the collector answers.
fn otlp_pipelines(
    endpoint: &str,
) -> anyhow::Result<Option<(SdkTracerProvider, SdkLoggerProvider)>> {
    let host_port = endpoint
        .trim_start_matches("http://")
        .trim_start_matches("https://");

    // Quick TCP check so a missing collector does not stall startup
    let is_reachable = host_port
        .to_socket_addrs()
        .ok()
        .and_then(|mut addrs| addrs.next())
        .map(|addr| TcpStream::connect_timeout(&addr, Duration::from_millis(100)).is_ok())
        .unwrap_or(false);
    if !is_reachable {
        return Ok(None);
    }

    let service_name =
        env::var("OTEL_SERVICE_NAME").unwrap_or_else(|_| "foodprint-server".to_string());
    let resource = opentelemetry_sdk::Resource::builder()
        .with_service_name(service_name)
        .build();

    let trace_exporter = opentelemetry_otlp::SpanExporter::builder()
        .with_tonic()
        .with_endpoint(endpoint)
        .build()
        .context("Failed to create OTLP trace exporter")?;
    let trace_provider = SdkTracerProvider::builder()
        .with_batch_exporter(trace_exporter)
        .with_resource(resource.clone())
        .build();

    let log_exporter = opentelemetry_otlp::LogExporter::builder()
        .with_tonic()
        .with_endpoint(endpoint)
        .build()
        .context("Failed to create OTLP log exporter")?;
    let log_provider = SdkLoggerProvider::builder()
        .with_batch_exporter(log_exporter)
        .with_resource(resource)
        .build();

    Ok(Some((trace_provider, log_provider)))
}

/// Initialize logging, with OpenTelemetry export when
/// OTEL_EXPORTER_OTLP_ENDPOINT is set and reachable.
fn init_telemetry() -> anyhow::Result<()> {
    let registry = tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_filter(telemetry::log_filter()))
        .with(telemetry::QueryCountingLayer);

    let endpoint = env::var("OTEL_EXPORTER_OTLP_ENDPOINT").ok();
    let pipelines = match endpoint.as_deref() {
        Some(endpoint) => otlp_pipelines(endpoint)?,
        None => None,
    };

    match (endpoint, pipelines) {
        (Some(endpoint), Some((trace_provider, log_provider))) => {
            let tracer = trace_provider.tracer("foodprint-server");
            opentelemetry::global::set_tracer_provider(trace_provider);
            registry
                .with(
                    tracing_opentelemetry::layer()
                        .with_tracer(tracer)
                        .with_filter(telemetry::log_filter()),
                )
                .with(
                    OpenTelemetryTracingBridge::new(&log_provider)
                        .with_filter(telemetry::log_filter()),
                )
                .init();
            tracing::info!("OpenTelemetry enabled, exporting traces and logs to {}", endpoint);
        }
        (Some(endpoint), None) => {
            registry.init();
            tracing::info!(
                "OpenTelemetry endpoint {} not reachable, using console logging only",
                endpoint
            );
        }
        (None, _) => {
            registry.init();
            tracing::debug!("OTEL_EXPORTER_OTLP_ENDPOINT not set, using console logging only");
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Check for --openapi flag to dump spec and exit
    if env::args().any(|arg| arg == "--openapi") {
        println!("{}", api::openapi().to_pretty_json()?);
        return Ok(());
    }

    init_telemetry()?;

    let config = ServerConfig::from_env()?;
    let engine = foodprint_core::create_engine(config.engine.kind).await;
    tracing::info!(
        engine = engine.engine_name(),
        database = %config.engine.context.database,
        workgroup = %config.engine.context.workgroup,
        "query engine ready"
    );

    let state: AppState = Arc::new(AppContext::new(&config, Arc::from(engine)));

    let app = api::build_router(state)
        .layer(middleware::from_fn(telemetry::query_count_header_middleware))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|request: &Request<_>| {
                    let matched_path = request
                        .extensions()
                        .get::<MatchedPath>()
                        .map(MatchedPath::as_str)
                        .unwrap_or(request.uri().path());

                    tracing::info_span!(
                        "http_request",
                        method = %request.method(),
                        path = %matched_path,
                    )
                })
                .on_request(|_request: &Request<_>, _span: &Span| {})
                .on_response(
                    |response: &axum::http::Response<_>, latency: Duration, _span: &Span| {
                        let status = response.status().as_u16();
                        if status >= 500 {
                            tracing::error!(
                                status = %status,
                                latency_ms = %latency.as_millis(),
                                "request failed with server error"
                            );
                        } else {
                            tracing::info!(
                                status = %status,
                                latency_ms = %latency.as_millis(),
                                "request completed"
                            );
                        }
                    },
                )
                .on_failure(
                    |error: tower_http::classify::ServerErrorsFailureClass,
                     latency: Duration,
                     _span: &Span| {
                        tracing::error!(
                            error = %error,
                            latency_ms = %latency.as_millis(),
                            "request failed"
                        );
                    },
                ),
        )
        // Outermost, so the counter wraps the trace span
        .layer(middleware::from_fn(telemetry::query_counting_middleware));

    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    let local_addr = listener.local_addr()?;

    tracing::info!("Server listening on {}", local_addr);
    tracing::info!(
        "Swagger UI available at http://localhost:{}/swagger-ui/",
        local_addr.port()
    );

    axum::serve(listener, app).await?;
    Ok(())
}
