//! HTTP surface for the metric aggregation engine.
//!
//! Read-only JSON endpoints over snapshots, series and summaries. Source
//! failures never turn into HTTP errors: they show up as missing metrics or
//! empty series. Only malformed requests are rejected.

use std::sync::Arc;

use axum::{
    Router,
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
    routing::get,
};
use chrono::{NaiveDate, Utc};
use log::debug;
use serde::{Deserialize, Serialize};

use vitalsync_core::{
    CategoryGroup, DateRange, GuardStats, MetricAggregationEngine, MetricCategory,
    MetricDefinition, MetricSeries, Snapshot, SnapshotBuilder, SnapshotEntry,
};

/// Longest window a single series request may span.
pub const MAX_SERIES_DAYS: u32 = 366;
const DEFAULT_SERIES_DAYS: u32 = 7;
const DEFAULT_TOP: usize = 10;

/// Shared server state.
struct AppState {
    engine: Arc<MetricAggregationEngine>,
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

type ApiError = (StatusCode, Json<ErrorResponse>);

fn bad_request(msg: impl Into<String>) -> ApiError {
    (
        StatusCode::BAD_REQUEST,
        Json(ErrorResponse { error: msg.into() }),
    )
}

fn today() -> NaiveDate {
    Utc::now().date_naive()
}

#[derive(Deserialize)]
struct CategoryParams {
    category: Option<String>,
}

#[derive(Deserialize)]
struct DateParams {
    date: Option<NaiveDate>,
}

#[derive(Deserialize)]
struct SeriesParams {
    start: Option<NaiveDate>,
    end: Option<NaiveDate>,
    days: Option<u32>,
}

#[derive(Deserialize)]
struct SummaryParams {
    date: Option<NaiveDate>,
    top: Option<usize>,
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    metrics: usize,
    cloud_fallback: bool,
    native: GuardStats,
}

#[derive(Serialize)]
struct MetricsResponse {
    metrics: Vec<MetricDefinition>,
    total: usize,
}

#[derive(Serialize)]
struct SummaryResponse {
    date: NaiveDate,
    resolved: usize,
    missing: Vec<&'static str>,
    top: Vec<SnapshotEntry>,
    categories: Vec<CategoryGroup<SnapshotEntry>>,
}

/// Resolve the requested window: explicit `start..=end`, or the last
/// `days` days ending at `end` (default today).
fn series_range(params: &SeriesParams) -> Result<DateRange, ApiError> {
    let end = params.end.unwrap_or_else(today);
    let range = match (params.start, params.days) {
        (Some(_), Some(_)) => return Err(bad_request("use either start or days, not both")),
        (Some(start), None) => DateRange::new(start, end),
        (None, days) => DateRange::last_days(end, days.unwrap_or(DEFAULT_SERIES_DAYS)),
    }
    .map_err(|e| bad_request(e.to_string()))?;

    if range.days() > MAX_SERIES_DAYS {
        return Err(bad_request(format!(
            "window of {} days exceeds the {MAX_SERIES_DAYS}-day limit",
            range.days()
        )));
    }
    Ok(range)
}

async fn handle_snapshot(
    State(state): State<Arc<AppState>>,
    Query(params): Query<DateParams>,
) -> Json<Snapshot> {
    let date = params.date.unwrap_or_else(today);
    Json(state.engine.snapshot(date).await)
}

async fn handle_series(
    State(state): State<Arc<AppState>>,
    Path(metric): Path<String>,
    Query(params): Query<SeriesParams>,
) -> Result<Json<MetricSeries>, ApiError> {
    let range = series_range(&params)?;
    debug!("series {metric} over {range}");
    Ok(Json(state.engine.series(&metric, range).await))
}

async fn handle_summary(
    State(state): State<Arc<AppState>>,
    Query(params): Query<SummaryParams>,
) -> Json<SummaryResponse> {
    let date = params.date.unwrap_or_else(today);
    let top = params.top.unwrap_or(DEFAULT_TOP);
    let snapshot = state.engine.snapshot(date).await;
    let builder = SnapshotBuilder::new(state.engine.catalog(), &snapshot);

    Json(SummaryResponse {
        date,
        resolved: snapshot.len(),
        missing: builder.missing().iter().map(|d| d.id).collect(),
        top: builder.top_n(top),
        categories: builder.by_category(),
    })
}

async fn handle_metrics(
    State(state): State<Arc<AppState>>,
    Query(params): Query<CategoryParams>,
) -> Result<Json<MetricsResponse>, ApiError> {
    let catalog = state.engine.catalog();
    let metrics: Vec<MetricDefinition> = match params.category.as_deref() {
        None => catalog.all().to_vec(),
        Some(label) => {
            let category = MetricCategory::parse(label)
                .ok_or_else(|| bad_request(format!("unknown category: {label}")))?;
            catalog.by_category(category).into_iter().cloned().collect()
        }
    };
    let total = metrics.len();
    Ok(Json(MetricsResponse { metrics, total }))
}

async fn handle_health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    let engine = &state.engine;
    let native = engine.guard_stats();
    let status = if native.reads > 0 && native.timeouts + native.failures == native.reads {
        "degraded"
    } else {
        "healthy"
    };
    Json(HealthResponse {
        status,
        metrics: engine.catalog().len(),
        cloud_fallback: engine.has_cloud(),
        native,
    })
}

async fn handle_index(State(state): State<Arc<AppState>>) -> Json<serde_json::Value> {
    let catalog = state.engine.catalog();
    let categories: Vec<String> = MetricCategory::ALL.iter().map(|c| c.to_string()).collect();

    Json(serde_json::json!({
        "name": "vitalsync",
        "version": vitalsync_core::VERSION,
        "metrics": catalog.len(),
        "cloud_fallback": state.engine.has_cloud(),
        "endpoints": {
            "/": "This API index",
            "/health": "Native read counters and cloud availability",
            "/metrics": {
                "method": "GET",
                "description": "Metric catalog",
                "params": { "category": format!("Filter by category: {}", categories.join(", ")) }
            },
            "/api/v1/snapshot": {
                "method": "GET",
                "description": "Every metric with data for one day",
                "params": { "date": "YYYY-MM-DD (default: today)" }
            },
            "/api/v1/series/{metric}": {
                "method": "GET",
                "description": "Readings and stats for one metric",
                "params": {
                    "start": "YYYY-MM-DD, with end",
                    "end": "YYYY-MM-DD (default: today)",
                    "days": format!("Window length ending at end (default: {DEFAULT_SERIES_DAYS}, max: {MAX_SERIES_DAYS})"),
                }
            },
            "/api/v1/summary": {
                "method": "GET",
                "description": "Snapshot grouped by category",
                "params": {
                    "date": "YYYY-MM-DD (default: today)",
                    "top": format!("Number of headline metrics (default: {DEFAULT_TOP})"),
                }
            },
        },
        "examples": {
            "snapshot": "/api/v1/snapshot",
            "series": "/api/v1/series/steps?days=30",
            "summary": "/api/v1/summary?top=5",
        }
    }))
}

/// Build the axum router.
pub fn build_router(engine: Arc<MetricAggregationEngine>) -> Router {
    let state = Arc::new(AppState { engine });

    Router::new()
        .route("/", get(handle_index))
        .route("/health", get(handle_health))
        .route("/metrics", get(handle_metrics))
        .route("/api/v1/snapshot", get(handle_snapshot))
        .route("/api/v1/series/{metric}", get(handle_series))
        .route("/api/v1/summary", get(handle_summary))
        .with_state(state)
}

/// Run the HTTP server until the listener fails.
pub async fn run_server(
    engine: Arc<MetricAggregationEngine>,
    host: &str,
    port: u16,
) -> std::io::Result<()> {
    let app = build_router(engine);
    let addr = format!("{host}:{port}");
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    log::info!("listening on {}", listener.local_addr()?);
    axum::serve(listener, app).await
}
