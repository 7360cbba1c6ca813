use std::sync::Arc;
use std::time::Duration;

use axum::{
    BoxError, Json, Router,
    error_handling::HandleErrorLayer,
    extract::{DefaultBodyLimit, Query, State, rejection::QueryRejection},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use geojson::{FeatureCollection, GeoJson};
use geonet_core::prelude::*;
use serde::Deserialize;
use serde_json::{Map, Value, json};
use tokio::sync::Semaphore;
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::config::ServerConfig;
use crate::export::{ARCHIVE_FILE_NAME, zip_collection};

const GEOJSON_MEDIA_TYPE: &str = "application/geo+json";
const ZIP_MEDIA_TYPE: &str = "application/zip";

pub struct AppState {
    pub config: ServerConfig,
    /// One permit per running analysis. The permit travels into the blocking
    /// task, so a request that times out keeps its slot until the work ends.
    pub analysis_slots: Arc<Semaphore>,
}

impl AppState {
    pub fn new(config: ServerConfig) -> Self {
        let slots = config.max_concurrent_analyses.max(1);
        Self {
            config,
            analysis_slots: Arc::new(Semaphore::new(slots)),
        }
    }
}

pub fn router(config: ServerConfig) -> Router {
    router_with_state(Arc::new(AppState::new(config)))
}

pub fn router_with_state(state: Arc<AppState>) -> Router {
    let config = &state.config;
    let timeout = Duration::from_secs(config.request_timeout_secs);
    let concurrency = config.max_concurrent_analyses.max(1);
    let body_limit = config.max_body_bytes;
    let cors = if config.cors_allow_any_origin {
        CorsLayer::permissive()
    } else {
        CorsLayer::new()
    };

    Router::new()
        .route("/health", get(health))
        .route("/analyze", post(analyze))
        .route("/export", post(export))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(
            ServiceBuilder::new()
                .layer(HandleErrorLayer::new(handle_layer_error))
                .timeout(timeout)
                .concurrency_limit(concurrency),
        )
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

/// Failure of a request, rendered as `{ "detail": ... }`
#[derive(Debug)]
pub enum ApiError {
    Analysis(Error),
    BadRequest(String),
    Timeout,
    Internal(String),
}

impl From<Error> for ApiError {
    fn from(error: Error) -> Self {
        ApiError::Analysis(error)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, detail) = match self {
            ApiError::Analysis(error) if error.is_input_error() => {
                (StatusCode::BAD_REQUEST, error.to_string())
            }
            ApiError::Analysis(error) => (StatusCode::INTERNAL_SERVER_ERROR, error.to_string()),
            ApiError::BadRequest(detail) => (StatusCode::BAD_REQUEST, detail),
            ApiError::Timeout => (
                StatusCode::REQUEST_TIMEOUT,
                "analysis did not finish in time".to_string(),
            ),
            ApiError::Internal(detail) => (StatusCode::INTERNAL_SERVER_ERROR, detail),
        };

        if status.is_server_error() {
            tracing::error!("request failed: {detail}");
        }

        (status, Json(json!({ "detail": detail }))).into_response()
    }
}

async fn handle_layer_error(error: BoxError) -> Response {
    if error.is::<tower::timeout::error::Elapsed>() {
        ApiError::Timeout.into_response()
    } else {
        ApiError::Internal(error.to_string()).into_response()
    }
}

/// Query parameters of `/analyze`, named after the form fields of the web
/// client
#[derive(Debug, Deserialize)]
pub struct AnalyzeQuery {
    pub analysis_type: String,
    #[serde(default = "default_classification_method")]
    pub classification_method: String,
    #[serde(default = "default_class_count")]
    pub class_count: usize,
    #[serde(default = "default_metric")]
    pub metric: String,
    #[serde(default)]
    pub radius: Option<String>,
}

fn default_classification_method() -> String {
    ClassificationMethod::default().to_string()
}

fn default_class_count() -> usize {
    5
}

fn default_metric() -> String {
    WeightMode::default().to_string()
}

impl AnalyzeQuery {
    fn into_params(self) -> Result<AnalysisParams, Error> {
        let radius = match self.radius.as_deref() {
            Some(radius) => parse_radius(radius)?,
            None => None,
        };
        let params = AnalysisParams {
            analysis_type: self.analysis_type.parse()?,
            classification_method: self.classification_method.parse()?,
            class_count: self.class_count,
            weight_mode: self.metric.parse()?,
            radius,
        };
        params.validate()?;
        Ok(params)
    }
}

async fn health() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

async fn analyze(
    State(state): State<Arc<AppState>>,
    query: Result<Query<AnalyzeQuery>, QueryRejection>,
    body: String,
) -> Result<Response, ApiError> {
    let Query(query) = query.map_err(|e| ApiError::BadRequest(e.body_text()))?;
    let params = query.into_params()?;
    tracing::info!(
        "analyze: {} / {} ({} classes), weight {}, radius {:?}",
        params.analysis_type,
        params.classification_method,
        params.class_count,
        params.weight_mode,
        params.radius
    );

    let permit = Arc::clone(&state.analysis_slots)
        .acquire_owned()
        .await
        .map_err(|e| ApiError::Internal(format!("analysis slots closed: {e}")))?;

    let builder_config = state.config.graph.clone();
    let output = tokio::task::spawn_blocking(move || {
        let _permit = permit;
        let features = parse_feature_set(&body)?;
        run_network_analysis_with(&features, &params, &builder_config, &SphericalMercator)
    })
    .await
    .map_err(|e| ApiError::Internal(format!("analysis task failed: {e}")))??;

    tracing::info!(
        "analyze: {} features -> {} edges over {} nodes",
        output.summary.features,
        output.summary.edges,
        output.summary.nodes
    );

    let mut collection = output.collection;
    collection.foreign_members = Some(legend(&output.classification));
    geojson_response(&collection)
}

/// Legend of the classification, attached to the collection as a foreign
/// member
fn legend(classification: &Classification) -> Map<String, Value> {
    let mut members = Map::new();
    members.insert(
        "legend".to_string(),
        json!({
            "method": classification.method,
            "bins": classification.bins,
            "k": classification.k,
        }),
    );
    members
}

async fn export(body: String) -> Result<Response, ApiError> {
    let geojson: GeoJson = body
        .parse()
        .map_err(|e: geojson::Error| ApiError::BadRequest(format!("invalid GeoJSON: {e}")))?;
    let GeoJson::FeatureCollection(collection) = geojson else {
        return Err(ApiError::BadRequest(
            "export expects a FeatureCollection".to_string(),
        ));
    };

    let archive = zip_collection(&collection)
        .map_err(|e| ApiError::Internal(format!("failed to build archive: {e}")))?;
    tracing::info!(
        "export: {} features, {} byte archive",
        collection.features.len(),
        archive.len()
    );

    let disposition = format!("attachment; filename=\"{ARCHIVE_FILE_NAME}\"");
    Ok((
        [
            (header::CONTENT_TYPE, ZIP_MEDIA_TYPE.to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        archive,
    )
        .into_response())
}

fn geojson_response(collection: &FeatureCollection) -> Result<Response, ApiError> {
    let body = serde_json::to_string(collection)
        .map_err(|e| ApiError::Internal(format!("failed to serialize output: {e}")))?;
    Ok(([(header::CONTENT_TYPE, GEOJSON_MEDIA_TYPE)], body).into_response())
}
