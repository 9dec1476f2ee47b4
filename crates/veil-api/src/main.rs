//! veil-api - HTTP API server for the veil PII screening service

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use axum::{
    extract::{DefaultBodyLimit, Multipart, Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tower_http::{cors::CorsLayer, limit::RequestBodyLimitLayer, trace::TraceLayer};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use uuid::Uuid;

use veil_core::defaults::{
    BIND_ADDR, ENV_BIND_ADDR, ENV_UPLOAD_DIR, ENV_WHISPER_BASE_URL, PAGE_LIMIT, PAGE_OFFSET,
    UPLOAD_DIR, UPLOAD_LIMIT_BYTES,
};
use veil_core::{EntitySpan, Job, JobStatus, JobStore, Summary};
use veil_detect::{DetectorPool, EnsembleReconciler, SegmentAnalyzer, TranscriptionBackend, WhisperBackend};
use veil_jobs::{AnalysisPipeline, AnalysisWorker, JobQueue, MemoryJobStore, WorkerConfig};

/// Application state shared across handlers.
#[derive(Clone)]
struct AppState {
    store: Arc<dyn JobStore>,
    /// Submission side of the worker queue. `None` when no transcription
    /// backend is configured, in which case uploads are rejected with 503.
    queue: Option<JobQueue>,
    analyzer: Arc<SegmentAnalyzer>,
    upload_dir: PathBuf,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "veil_api=debug,tower_http=debug".into());
    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .init();

    let upload_dir = std::env::var(ENV_UPLOAD_DIR)
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from(UPLOAD_DIR));

    // Detector pool is built once and shared; detection is available even
    // when transcription is not.
    let pool = DetectorPool::from_env();
    info!(detector_count = pool.len(), "Detector pool initialized");

    let store = Arc::new(MemoryJobStore::new());

    let worker_config = WorkerConfig::from_env();
    let (queue, _worker_handle) = match WhisperBackend::from_env() {
        Some(backend) if worker_config.enabled => {
            info!(model = backend.model_name(), "Transcription backend initialized");
            let pipeline = AnalysisPipeline::new(
                store.clone(),
                Arc::new(backend),
                SegmentAnalyzer::new(EnsembleReconciler::new(pool.clone())),
            );
            let worker = AnalysisWorker::new(pipeline, worker_config);
            let queue = worker.queue();
            let handle = worker.start();
            info!("Analysis worker started");
            (Some(queue), Some(handle))
        }
        Some(_) => {
            info!("Analysis worker disabled, media uploads will be rejected");
            (None, None)
        }
        None => {
            warn!(
                "{} not set, media uploads will be rejected",
                ENV_WHISPER_BASE_URL
            );
            (None, None)
        }
    };

    let state = AppState {
        store,
        queue,
        analyzer: Arc::new(SegmentAnalyzer::new(EnsembleReconciler::new(pool))),
        upload_dir,
    };

    let app = build_router(state);

    let addr: SocketAddr = std::env::var(ENV_BIND_ADDR)
        .unwrap_or_else(|_| BIND_ADDR.to_string())
        .parse()?;
    info!("Starting server on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/health", get(health_check))
        .route("/analyze/video", post(analyze_video))
        .route("/analyze/text", post(analyze_text))
        .route("/jobs", get(list_jobs))
        .route("/jobs/:id", get(get_job).delete(delete_job))
        // Middleware
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .layer(DefaultBodyLimit::max(UPLOAD_LIMIT_BYTES))
        .layer(RequestBodyLimitLayer::new(UPLOAD_LIMIT_BYTES))
        .with_state(state)
}

// =============================================================================
// SYSTEM ENDPOINTS
// =============================================================================

async fn root() -> impl IntoResponse {
    Json(serde_json::json!({
        "message": "veil PII screening API",
        "version": env!("CARGO_PKG_VERSION"),
        "endpoints": {
            "POST /analyze/video": "Upload and analyze a recording for PII",
            "POST /analyze/text": "Analyze text for PII",
            "GET /jobs": "List analysis jobs",
            "GET /jobs/{job_id}": "Get analysis results",
            "DELETE /jobs/{job_id}": "Delete a job and its results",
            "GET /health": "Health check"
        }
    }))
}

async fn health_check() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "healthy",
        "timestamp": Utc::now(),
    }))
}

// =============================================================================
// ANALYSIS ENDPOINTS
// =============================================================================

/// Response to a media submission.
#[derive(Debug, Serialize)]
struct SubmitResponse {
    job_id: Uuid,
    status: JobStatus,
    message: String,
    check_status_url: String,
}

/// Upload a media file and queue it for PII analysis.
///
/// Accepts multipart/form-data with a `file` field whose content type must be
/// `video/*` or `audio/*`. The upload is spooled to disk, a queued job is
/// created, and the job id is returned immediately; callers poll
/// `check_status_url` for the result.
async fn analyze_video(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<SubmitResponse>, ApiError> {
    let queue = state.queue.clone().ok_or_else(|| {
        ApiError::ServiceUnavailable(
            "Transcription backend not configured. Set VEIL_WHISPER_BASE_URL environment variable."
                .into(),
        )
    })?;

    let mut file_data: Option<Vec<u8>> = None;
    let mut content_type: Option<String> = None;
    let mut original_filename: Option<String> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::BadRequest(format!("Multipart error: {}", e)))?
    {
        let field_name = field.name().map(|n| n.to_string());
        match field_name.as_deref() {
            Some("file") => {
                content_type = field.content_type().map(|c| c.to_string());
                original_filename = field.file_name().map(|f| f.to_string());
                file_data = Some(
                    field
                        .bytes()
                        .await
                        .map_err(|e| ApiError::BadRequest(format!("Read error: {}", e)))?
                        .to_vec(),
                );
            }
            _ => {} // ignore unknown fields
        }
    }

    let media = file_data
        .ok_or_else(|| ApiError::BadRequest("Missing file in multipart form".to_string()))?;
    if media.is_empty() {
        return Err(ApiError::BadRequest("Media file is empty".into()));
    }

    let mime_type = content_type.as_deref().unwrap_or("");
    if !is_supported_media_type(mime_type) {
        return Err(ApiError::BadRequest(
            "File must be a video or audio file".into(),
        ));
    }

    let job_id = Uuid::new_v4();

    tokio::fs::create_dir_all(&state.upload_dir)
        .await
        .map_err(|e| ApiError::Internal(format!("Failed to create upload dir: {}", e)))?;
    let media_path = state
        .upload_dir
        .join(format!("{}.{}", job_id, extension_for_mime(mime_type)));
    tokio::fs::write(&media_path, &media)
        .await
        .map_err(|e| ApiError::Internal(format!("Failed to spool upload: {}", e)))?;

    if let Err(e) = state
        .store
        .create(job_id, original_filename, Some(media_path.clone()))
        .await
    {
        let _ = tokio::fs::remove_file(&media_path).await;
        return Err(e.into());
    }

    if let Err(e) = queue.submit(job_id).await {
        // The job keeps the media path; record the failure and release it
        let _ = state.store.fail(job_id, "Analysis worker unavailable").await;
        if let Ok(Some(path)) = state.store.take_media_path(job_id).await {
            let _ = tokio::fs::remove_file(&path).await;
        }
        return Err(e.into());
    }

    info!(job_id = %job_id, size = media.len(), "Media upload queued");

    Ok(Json(SubmitResponse {
        job_id,
        status: JobStatus::Queued,
        message: "Upload accepted. Analysis started.".to_string(),
        check_status_url: format!("/jobs/{}", job_id),
    }))
}

#[derive(Debug, Deserialize)]
struct AnalyzeTextRequest {
    text: String,
}

#[derive(Debug, Serialize)]
struct AnalyzeTextResponse {
    pii_detected: Vec<EntitySpan>,
    summary: Summary,
}

/// Analyze raw text for PII, synchronously.
///
/// Detector outages are absorbed by the ensemble, so a total outage degrades
/// to an empty report rather than an error.
async fn analyze_text(
    State(state): State<AppState>,
    Json(request): Json<AnalyzeTextRequest>,
) -> Result<Json<AnalyzeTextResponse>, ApiError> {
    let (pii_detected, summary) = state.analyzer.analyze_text(&request.text).await;
    Ok(Json(AnalyzeTextResponse {
        pii_detected,
        summary,
    }))
}

// =============================================================================
// JOB ENDPOINTS
// =============================================================================

#[derive(Debug, Deserialize)]
struct ListJobsQuery {
    limit: Option<usize>,
    offset: Option<usize>,
}

#[derive(Debug, Serialize)]
struct ListJobsResponse {
    jobs: Vec<Job>,
    total: usize,
    limit: usize,
    offset: usize,
}

async fn list_jobs(
    State(state): State<AppState>,
    Query(query): Query<ListJobsQuery>,
) -> Result<Json<ListJobsResponse>, ApiError> {
    let limit = query.limit.unwrap_or(PAGE_LIMIT);
    let offset = query.offset.unwrap_or(PAGE_OFFSET);

    let jobs = state.store.list(limit, offset).await?;
    let total = state.store.count().await?;

    Ok(Json(ListJobsResponse {
        jobs,
        total,
        limit,
        offset,
    }))
}

/// Get a job snapshot by id. Never blocks; `queued`/`processing` snapshots
/// are returned before results exist.
async fn get_job(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Job>, ApiError> {
    let job = state
        .store
        .get(id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Job not found".to_string()))?;
    Ok(Json(job))
}

/// Delete a job record, releasing any media it still owns.
async fn delete_job(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<serde_json::Value>, ApiError> {
    // Claim the media path before the record disappears; a job that was
    // never processed still owns its upload.
    let media = match state.store.take_media_path(id).await {
        Ok(path) => path,
        Err(veil_core::Error::JobNotFound(_)) => {
            return Err(ApiError::NotFound("Job not found".to_string()))
        }
        Err(e) => return Err(e.into()),
    };
    if let Some(path) = media {
        if let Err(e) = tokio::fs::remove_file(&path).await {
            warn!(error = %e, path = %path.display(), "Failed to remove media file");
        }
    }

    state.store.delete(id).await?;

    Ok(Json(serde_json::json!({
        "message": format!("Job {} deleted successfully", id),
    })))
}

// =============================================================================
// HELPERS
// =============================================================================

/// Uploads must be a video or audio container.
fn is_supported_media_type(mime_type: &str) -> bool {
    mime_type.starts_with("video/") || mime_type.starts_with("audio/")
}

/// Spool-file extension for a media content type.
fn extension_for_mime(mime_type: &str) -> &'static str {
    match mime_type {
        "audio/mpeg" | "audio/mp3" => "mp3",
        "audio/wav" | "audio/x-wav" => "wav",
        "audio/ogg" => "ogg",
        "audio/flac" => "flac",
        "audio/aac" => "aac",
        "audio/webm" | "video/webm" => "webm",
        "video/quicktime" => "mov",
        "video/x-matroska" => "mkv",
        _ => "mp4",
    }
}

// =============================================================================
// ERROR HANDLING
// =============================================================================

#[derive(Debug)]
enum ApiError {
    Core(veil_core::Error),
    NotFound(String),
    BadRequest(String),
    ServiceUnavailable(String),
    Internal(String),
}

impl From<veil_core::Error> for ApiError {
    fn from(err: veil_core::Error) -> Self {
        match &err {
            veil_core::Error::NotFound(msg) => ApiError::NotFound(msg.clone()),
            veil_core::Error::JobNotFound(id) => ApiError::NotFound(format!("Job {} not found", id)),
            veil_core::Error::InvalidInput(msg) => ApiError::BadRequest(msg.clone()),
            _ => ApiError::Core(err),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let (status, message) = match self {
            ApiError::Core(err) => (StatusCode::INTERNAL_SERVER_ERROR, err.to_string()),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::ServiceUnavailable(msg) => (StatusCode::SERVICE_UNAVAILABLE, msg),
            ApiError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
        };

        let body = Json(serde_json::json!({
            "error": message,
        }));

        (status, body).into_response()
    }
}
