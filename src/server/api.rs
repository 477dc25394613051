//! HTTP API over the page cache.
//!
//! - GET /api/page/{id}?index=&maxheight=&maxwidth=&base64=
//! - GET /api/archive/{id}
//! - GET /api/thumbnail/{id}?base64=
//! - GET /api/cache/stats
//! - GET /health
//!
//! With `base64=true` an image is returned as standard base64 text instead of
//! JPEG bytes.

use std::sync::Arc;
use std::time::Instant;

use axum::extract::{Path, Query, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use serde::{Deserialize, Serialize};
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{debug, error};
use uuid::Uuid;

use crate::archive::identity::ArchiveIdentity;
use crate::cache::pages::PageService;
use crate::cache::stats::CacheStatsSnapshot;
use crate::config::Config;
use crate::error::PageError;

const JPEG_CONTENT_TYPE: &str = "image/jpeg";

/// Application state shared across handlers.
pub struct AppState {
    pub pages: PageService,
    pub config: Arc<Config>,
    pub start_time: Instant,
}

/// Build the axum router with all API routes.
pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/page/{id}", get(page))
        .route("/api/archive/{id}", get(archive_info))
        .route("/api/thumbnail/{id}", get(thumbnail))
        .route("/api/cache/stats", get(cache_stats))
        .route("/health", get(health))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive()),
        )
        .with_state(state)
}

// ─── Request/Response Types ────────────────────────────────────────────────

/// Page request parameters. Zero means "unbounded" for either dimension.
#[derive(Debug, Default, Deserialize)]
pub struct PageQuery {
    #[serde(default)]
    pub index: usize,
    #[serde(default, rename = "maxheight")]
    pub max_height: u32,
    #[serde(default, rename = "maxwidth")]
    pub max_width: u32,
    #[serde(default)]
    pub base64: bool,
}

#[derive(Debug, Default, Deserialize)]
pub struct ThumbnailQuery {
    #[serde(default)]
    pub base64: bool,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ArchiveInfo {
    pub id: ArchiveIdentity,
    pub page_count: usize,
    pub file_size: u64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub uptime_secs: u64,
    pub cache: CacheStatsSnapshot,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
}

/// A [`PageError`] rendered as an HTTP response.
#[derive(Debug)]
pub struct ApiError(PageError);

impl From<PageError> for ApiError {
    fn from(err: PageError) -> Self {
        Self(err)
    }
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match &self.0 {
            PageError::NotFound(_) | PageError::UnknownArchive(_) => StatusCode::NOT_FOUND,
            PageError::IndexOutOfRange { .. } => StatusCode::BAD_REQUEST,
            PageError::CorruptArchive { .. } | PageError::Decode(_) => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
            PageError::Busy(_) => StatusCode::SERVICE_UNAVAILABLE,
            PageError::Encode(_) | PageError::Io(_) | PageError::Task(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() && !self.0.is_retryable() {
            error!(error = %self.0, "Request failed");
        }
        let body = Json(ErrorBody {
            error: self.0.to_string(),
        });
        if self.0.is_retryable() {
            return (status, [(header::RETRY_AFTER, "1")], body).into_response();
        }
        (status, body).into_response()
    }
}

fn parse_identity(raw: &str) -> Result<ArchiveIdentity, ApiError> {
    raw.parse()
        .map_err(|_| ApiError(PageError::NotFound(format!("archive {raw}"))))
}

async fn image_file(path: &std::path::Path, base64: bool) -> Result<Response, ApiError> {
    let bytes = tokio::fs::read(path).await.map_err(|err| {
        if err.kind() == std::io::ErrorKind::NotFound {
            PageError::NotFound(path.display().to_string())
        } else {
            PageError::Io(err)
        }
    })?;
    if base64 {
        return Ok(STANDARD.encode(bytes).into_response());
    }
    Ok(([(header::CONTENT_TYPE, JPEG_CONTENT_TYPE)], bytes).into_response())
}

// ─── Route Handlers ────────────────────────────────────────────────────────

async fn page(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Query(query): Query<PageQuery>,
) -> Result<Response, ApiError> {
    let request_id = Uuid::new_v4();
    let archive = parse_identity(&id)?;

    debug!(
        %request_id,
        %archive,
        index = query.index,
        max_height = query.max_height,
        max_width = query.max_width,
        "Page request"
    );

    let path = state
        .pages
        .get_page_or_extract(&archive, query.index, query.max_height, query.max_width)
        .await?;
    image_file(&path, query.base64).await
}

async fn archive_info(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<ArchiveInfo>, ApiError> {
    let archive = parse_identity(&id)?;
    let record = state.pages.archive(&archive).await?;
    Ok(Json(ArchiveInfo {
        id: archive,
        page_count: record.page_count,
        file_size: record.file_size,
    }))
}

async fn thumbnail(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Query(query): Query<ThumbnailQuery>,
) -> Result<Response, ApiError> {
    let archive = parse_identity(&id)?;
    if query.base64 {
        // No default image in text form: an empty body means "no thumbnail".
        return match state.pages.thumbnail(&archive).await {
            Some(path) => image_file(&path, true).await,
            None => Ok(String::new().into_response()),
        };
    }
    let path = state.pages.thumbnail_or_default(&archive).await;
    image_file(&path, false).await
}

async fn cache_stats(State(state): State<Arc<AppState>>) -> Json<CacheStatsSnapshot> {
    Json(state.pages.stats())
}

async fn health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        uptime_secs: state.start_time.elapsed().as_secs(),
        cache: state.pages.stats(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        let busy = ApiError(PageError::Busy("sig".into()));
        assert_eq!(busy.status(), StatusCode::SERVICE_UNAVAILABLE);

        let range = ApiError(PageError::IndexOutOfRange { index: 9, count: 2 });
        assert_eq!(range.status(), StatusCode::BAD_REQUEST);

        let missing = ApiError(PageError::NotFound("x".into()));
        assert_eq!(missing.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn test_busy_response_has_retry_after() {
        let response = ApiError(PageError::Busy("sig".into())).into_response();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(response.headers()[header::RETRY_AFTER], "1");
    }

    #[test]
    fn test_invalid_identity_is_not_found() {
        let err = parse_identity("../etc").unwrap_err();
        assert_eq!(err.status(), StatusCode::NOT_FOUND);
    }
}
