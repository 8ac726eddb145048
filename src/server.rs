use crate::config::AppConfig;
use crate::error::{SubmitError, ValidationErrors};
use crate::filter::FilterState;
use crate::geolocation::{FixedPosition, Locator};
use crate::intake::{EntryPoint, ReportDraft};
use crate::render::{GeoJsonSurface, MapView};
use crate::session::{LocationState, MapSession};
use crate::store::KindCounts;
use crate::sync::SyncSummary;
use crate::types::{HotspotPoint, ReportRecord};
use anyhow::Result;
use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use geojson::FeatureCollection;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::net::SocketAddr;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::Mutex;
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;
use tracing::info;

pub struct AppState {
    pub session: Mutex<MapSession<GeoJsonSurface>>,
    pub locator: Option<Mutex<Locator<FixedPosition>>>,
}

pub type SharedState = Arc<AppState>;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error(transparent)]
    Invalid(#[from] ValidationErrors),

    #[error("no position provider configured")]
    NoPositionProvider,

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<SubmitError> for ApiError {
    fn from(e: SubmitError) -> Self {
        match e {
            SubmitError::Invalid(errors) => ApiError::Invalid(errors),
            SubmitError::Store(e) => ApiError::Internal(e.to_string()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match self {
            ApiError::Invalid(ref errors) => {
                return (
                    StatusCode::UNPROCESSABLE_ENTITY,
                    Json(json!({ "errors": errors.messages() })),
                )
                    .into_response();
            }
            ApiError::NoPositionProvider => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        (status, self.to_string()).into_response()
    }
}

#[derive(Deserialize)]
pub struct SubmitRequest {
    #[serde(default = "manual_entry")]
    pub entry: EntryPoint,
    pub draft: ReportDraft,
}

fn manual_entry() -> EntryPoint {
    EntryPoint::Manual
}

#[derive(Debug, Serialize)]
pub struct FiltersResponse {
    pub filters: FilterState,
    pub sync: SyncSummary,
    pub visible: usize,
}

#[derive(Debug, Serialize)]
pub struct ViewResponse {
    pub view: MapView,
    pub location: LocationState,
}

pub fn router(state: SharedState, static_dir: Option<&std::path::Path>) -> Router {
    let api = Router::new()
        .route("/api/hotspots", get(hotspots_handler))
        .route("/api/markers", get(markers_handler))
        .route("/api/filters", get(get_filters_handler).put(put_filters_handler))
        .route("/api/reports", get(reports_handler).post(submit_handler))
        .route("/api/stats", get(stats_handler))
        .route("/api/view", get(view_handler))
        .route("/api/locate", post(locate_handler))
        .with_state(state);

    let app = match static_dir {
        Some(dir) => api.fallback_service(ServeDir::new(dir)),
        None => api,
    };
    app.layer(CorsLayer::permissive())
}

pub async fn start_server(config: AppConfig, state: SharedState) -> Result<()> {
    let port = config.server.port;
    let addr = SocketAddr::from(([127, 0, 0, 1], port));

    info!("Starting server on http://{}", addr);

    let app = router(state, config.server.static_dir.as_deref());
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

/// Pure filter over the store; does not touch the session's own filters.
pub async fn hotspots_handler(
    State(state): State<SharedState>,
    Query(filters): Query<FilterState>,
) -> Json<Vec<HotspotPoint>> {
    let session = state.session.lock().await;
    let points = filters.visible(session.store().all()).into_iter().cloned().collect();
    Json(points)
}

pub async fn markers_handler(State(state): State<SharedState>) -> Json<FeatureCollection> {
    let session = state.session.lock().await;
    Json(session.layer().surface().feature_collection())
}

pub async fn get_filters_handler(State(state): State<SharedState>) -> Json<FilterState> {
    Json(state.session.lock().await.filters())
}

pub async fn put_filters_handler(
    State(state): State<SharedState>,
    Json(filters): Json<FilterState>,
) -> Json<FiltersResponse> {
    let mut session = state.session.lock().await;
    let sync = session.set_filters(filters);
    Json(FiltersResponse {
        filters,
        sync,
        visible: session.visible().len(),
    })
}

pub async fn submit_handler(
    State(state): State<SharedState>,
    Json(request): Json<SubmitRequest>,
) -> Result<(StatusCode, Json<ReportRecord>), ApiError> {
    let mut session = state.session.lock().await;
    let record = session.submit_report(&request.draft, request.entry)?;
    Ok((StatusCode::CREATED, Json(record)))
}

pub async fn reports_handler(State(state): State<SharedState>) -> Json<Vec<ReportRecord>> {
    Json(state.session.lock().await.recent_reports())
}

pub async fn stats_handler(State(state): State<SharedState>) -> Json<KindCounts> {
    Json(state.session.lock().await.stats())
}

pub async fn view_handler(State(state): State<SharedState>) -> Json<ViewResponse> {
    let session = state.session.lock().await;
    Json(ViewResponse {
        view: session.view(),
        location: session.location(),
    })
}

pub async fn locate_handler(
    State(state): State<SharedState>,
) -> Result<Json<ViewResponse>, ApiError> {
    let locator = state.locator.as_ref().ok_or(ApiError::NoPositionProvider)?;
    let mut locator = locator.lock().await;

    let generation = locator.request();
    state.session.lock().await.begin_locate(generation);

    // session stays unlocked while the provider answers
    let fix = locator.resolve().await;

    let mut session = state.session.lock().await;
    if let Some(fix) = fix {
        session.finish_locate(fix);
    }
    Ok(Json(ViewResponse {
        view: session.view(),
        location: session.location(),
    }))
}
