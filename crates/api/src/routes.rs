use crate::cache::{CacheStats, SegmentCache};
use crate::config::AppConfig;
use crate::metrics::{Metrics, MetricsSnapshot, TimedOperation};
use crate::session::{DisplaySession, DocumentSnapshot, DocumentView, ViewSnapshot};
use annotate::{
    annotation_counts, highlight, toggle_selection, AnalysisResult, EntityAnnotation,
    HighlightedSegment, SpanReport,
};
use axum::{
    extract::State,
    http::{header, StatusCode},
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use batch::{aggregate_batch, to_csv, BatchResult, RawBatch};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub metrics: Arc<Metrics>,
    pub cache: Arc<SegmentCache>,
    pub session: Arc<Mutex<DisplaySession>>,
}

impl AppState {
    pub fn new(config: AppConfig) -> Self {
        let cache_entries = if config.cache.enabled {
            config.cache.max_entries
        } else {
            0
        };

        Self {
            config: Arc::new(config),
            metrics: Metrics::new(),
            cache: Arc::new(SegmentCache::new(cache_entries)),
            session: Arc::new(Mutex::new(DisplaySession::new())),
        }
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/metrics", get(get_metrics))
        .route("/segments", post(resolve_segments))
        .route("/selection/toggle", post(toggle))
        .route("/analysis", post(show_analysis))
        .route("/batch", post(show_batch))
        .route("/batch/csv", post(export_batch))
        .route("/view", get(get_view))
        .route("/view/select", post(select_in_view))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

#[derive(Serialize)]
struct HealthResponse {
    status: String,
}

#[derive(Deserialize)]
struct SegmentsRequest {
    text: String,
    #[serde(default)]
    entities: Vec<EntityAnnotation>,
    #[serde(default)]
    selected: Option<String>,
}

#[derive(Serialize)]
struct SegmentsResponse {
    segments: Vec<HighlightedSegment>,
    report: SpanReport,
    counts: BTreeMap<String, usize>,
}

#[derive(Deserialize)]
struct ToggleRequest {
    #[serde(default)]
    selected: Option<String>,
    candidate: String,
}

#[derive(Serialize)]
struct ToggleResponse {
    selected: Option<String>,
}

#[derive(Deserialize)]
struct SelectRequest {
    candidate: String,
}

async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
    })
}

#[derive(Serialize)]
struct MetricsResponse {
    #[serde(flatten)]
    metrics: MetricsSnapshot,
    cache: CacheStats,
}

async fn get_metrics(State(state): State<AppState>) -> Json<MetricsResponse> {
    Json(MetricsResponse {
        metrics: state.metrics.snapshot(),
        cache: state.cache.stats(),
    })
}

async fn resolve_segments(
    State(state): State<AppState>,
    Json(req): Json<SegmentsRequest>,
) -> Json<SegmentsResponse> {
    let timer = TimedOperation::start();
    let (resolution, cached) = state.cache.resolve(&req.text, &req.entities);
    state
        .metrics
        .record_resolution(timer.elapsed(), resolution.segments.len(), &resolution.report);
    state.metrics.record_request(true);

    tracing::debug!(
        segments = resolution.segments.len(),
        cached,
        "resolved segments"
    );

    Json(SegmentsResponse {
        segments: highlight(&resolution.segments, req.selected.as_deref()),
        report: resolution.report,
        counts: annotation_counts(&req.entities),
    })
}

async fn toggle(Json(req): Json<ToggleRequest>) -> Json<ToggleResponse> {
    Json(ToggleResponse {
        selected: toggle_selection(req.selected.as_deref(), &req.candidate),
    })
}

async fn show_analysis(
    State(state): State<AppState>,
    Json(analysis): Json<AnalysisResult>,
) -> Result<Json<DocumentSnapshot>, StatusCode> {
    // Held from begin to completion with no await in between, so a dropped
    // request can never leave a ticket pending.
    let mut session = state.session.lock().await;
    let ticket = begin_submission(&mut session, &state)?;

    let Some(text) = analysis.text.clone() else {
        tracing::warn!(%ticket, "analysis payload has no text to render");
        session.fail(ticket).map_err(internal_error)?;
        state.metrics.record_request(false);
        return Err(StatusCode::UNPROCESSABLE_ENTITY);
    };

    let timer = TimedOperation::start();
    let view = DocumentView::new(text, &analysis);
    state.metrics.record_resolution(
        timer.elapsed(),
        view.document.segments.len(),
        &view.document.report,
    );

    let snapshot = view.snapshot();
    session
        .complete_document(ticket, view)
        .map_err(internal_error)?;
    state.metrics.record_request(true);

    Ok(Json(snapshot))
}

async fn show_batch(
    State(state): State<AppState>,
    Json(raw): Json<RawBatch>,
) -> Result<Json<BatchResult>, StatusCode> {
    let mut session = state.session.lock().await;
    let ticket = begin_submission(&mut session, &state)?;

    let timer = TimedOperation::start();
    let result = aggregate_batch(&raw, &state.config.aggregation);
    state.metrics.record_batch(timer.elapsed(), &result);

    session
        .complete_batch(ticket, result.clone())
        .map_err(internal_error)?;
    state.metrics.record_request(true);

    Ok(Json(result))
}

async fn export_batch(
    State(state): State<AppState>,
    Json(raw): Json<RawBatch>,
) -> Result<impl IntoResponse, StatusCode> {
    let timer = TimedOperation::start();
    let result = aggregate_batch(&raw, &state.config.aggregation);
    state.metrics.record_batch(timer.elapsed(), &result);

    let csv = to_csv(&result).map_err(|e| {
        state.metrics.record_request(false);
        internal_error(e)
    })?;
    state.metrics.record_export();
    state.metrics.record_request(true);

    Ok((
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8"),
            (
                header::CONTENT_DISPOSITION,
                "attachment; filename=\"analysis_results.csv\"",
            ),
        ],
        csv,
    ))
}

async fn get_view(State(state): State<AppState>) -> Json<ViewSnapshot> {
    Json(state.session.lock().await.snapshot())
}

async fn select_in_view(
    State(state): State<AppState>,
    Json(req): Json<SelectRequest>,
) -> Result<Json<DocumentSnapshot>, StatusCode> {
    state
        .session
        .lock()
        .await
        .toggle_selection(&req.candidate)
        .map(Json)
        .ok_or(StatusCode::CONFLICT)
}

fn begin_submission(
    session: &mut DisplaySession,
    state: &AppState,
) -> Result<uuid::Uuid, StatusCode> {
    session.begin().map_err(|e| {
        tracing::warn!("Rejected submission: {}", e);
        state.metrics.record_request(false);
        StatusCode::CONFLICT
    })
}

fn internal_error(e: anyhow::Error) -> StatusCode {
    tracing::error!("Request failed: {:#}", e);
    StatusCode::INTERNAL_SERVER_ERROR
}
