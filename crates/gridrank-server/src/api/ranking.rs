//! Grid rank handlers.
//!
//! Long-running checks observe the server's shutdown token so a graceful
//! shutdown ends polling with whatever results have arrived.

use std::time::Duration;

use axum::{extract::State, http::StatusCode, Extension, Json};
use gridrank_core::validate::validate_polling_parameters;
use gridrank_core::{Device, GridCoordinate, GridRequest, ValidationError};
use gridrank_engine::{
    build_rank_map, GridCheckReport, GridTask, RankError, RankMapEntry, RankingService,
    ResultsReport, ServiceInfo, StatusEnvelope,
};
use serde::{Deserialize, Serialize};

use crate::middleware::RequestId;

use super::{map_rank_error, ApiError, ApiResponse, AppState, ResponseMeta};

// ---------------------------------------------------------------------------
// Request bodies
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub(super) struct GridRequestBody {
    pub business_name: String,
    pub lat: f64,
    pub lng: f64,
    pub grid_size: Option<u32>,
    pub radius_km: Option<f64>,
    pub language_code: Option<String>,
    pub device: Option<String>,
    pub zoom: Option<u8>,
}

#[derive(Debug, Deserialize)]
pub(super) struct GridCheckRequest {
    #[serde(flatten)]
    pub grid: GridRequestBody,
    pub max_wait_time: Option<u64>,
    pub poll_interval: Option<u64>,
    pub target_domain: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(super) struct ResultsRequest {
    pub task_ids: Vec<String>,
    pub max_wait_time: Option<u64>,
    pub poll_interval: Option<u64>,
    #[serde(default)]
    pub coordinates: Vec<String>,
    pub target_domain: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(super) struct StatusRequest {
    #[serde(default)]
    pub task_ids: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub(super) struct GridCoordinatesRequest {
    pub lat: f64,
    pub lng: f64,
    pub grid_size: Option<u32>,
    pub radius_km: Option<f64>,
}

// ---------------------------------------------------------------------------
// Response bodies
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
pub(super) struct CreatedTasksResponse {
    pub task_ids: Vec<String>,
    pub grid_coordinates: Vec<String>,
    pub tasks: Vec<GridTask>,
    pub rejected_count: usize,
}

#[derive(Debug, Serialize)]
pub(super) struct ResultsResponse {
    #[serde(flatten)]
    pub report: ResultsReport,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rank_map: Option<Vec<RankMapEntry>>,
}

#[derive(Debug, Serialize)]
pub(super) struct GridCoordinatesResponse {
    pub center: GridCoordinate,
    pub grid_size: u32,
    pub radius_km: f64,
    pub coordinates: Vec<GridCoordinate>,
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn require_service<'a>(state: &'a AppState, req_id: &str) -> Result<&'a RankingService, ApiError> {
    state.service.as_ref().ok_or_else(|| {
        ApiError::new(
            req_id,
            "provider_unconfigured",
            "provider credentials are not configured",
        )
    })
}

fn validation_error(req_id: &str, error: &ValidationError) -> ApiError {
    ApiError::new(req_id, "validation_error", error.to_string())
}

fn build_request(req_id: &str, body: &GridRequestBody) -> Result<GridRequest, ApiError> {
    let mut builder = GridRequest::builder(&body.business_name, body.lat, body.lng);
    if let Some(size) = body.grid_size {
        builder = builder.grid_size(size);
    }
    if let Some(radius) = body.radius_km {
        builder = builder.radius_km(radius);
    }
    if let Some(code) = &body.language_code {
        builder = builder.language_code(code);
    }
    if let Some(device) = &body.device {
        let device: Device = device.parse().map_err(|e| validation_error(req_id, &e))?;
        builder = builder.device(device);
    }
    if let Some(zoom) = body.zoom {
        builder = builder.zoom(zoom);
    }
    builder.build().map_err(|e| validation_error(req_id, &e))
}

/// Caller-supplied bounds are validated; omitted ones fall back to the
/// configured defaults.
fn polling_bounds(
    req_id: &str,
    state: &AppState,
    max_wait_time: Option<u64>,
    poll_interval: Option<u64>,
) -> Result<(Duration, Duration), ApiError> {
    if max_wait_time.is_none() && poll_interval.is_none() {
        return Ok((state.default_max_wait, state.default_poll_interval));
    }
    let max_wait = max_wait_time.unwrap_or(state.default_max_wait.as_secs());
    let interval = poll_interval.unwrap_or(state.default_poll_interval.as_secs());
    validate_polling_parameters(max_wait, interval).map_err(|e| validation_error(req_id, &e))?;
    Ok((Duration::from_secs(max_wait), Duration::from_secs(interval)))
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// POST /api/v1/ranking/grid-check: create, poll and optionally rank.
pub(super) async fn grid_check(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Json(body): Json<GridCheckRequest>,
) -> Result<Json<ApiResponse<GridCheckReport>>, ApiError> {
    let rid = &req_id.0;
    let request = build_request(rid, &body.grid)?;
    let (max_wait, poll_interval) =
        polling_bounds(rid, &state, body.max_wait_time, body.poll_interval)?;
    let service = require_service(&state, rid)?;

    let mut report = service
        .advanced_check(&request, max_wait, poll_interval, &state.shutdown)
        .await
        .map_err(|e| map_rank_error(rid.clone(), &e))?;
    if let Some(domain) = body.target_domain.as_deref().filter(|d| !d.trim().is_empty()) {
        RankingService::attach_rank_map(&mut report, domain);
    }

    Ok(Json(ApiResponse {
        data: report,
        meta: ResponseMeta::new(req_id.0),
    }))
}

/// POST /api/v1/ranking/create-tasks: submit without waiting.
pub(super) async fn create_tasks(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Json(body): Json<GridRequestBody>,
) -> Result<(StatusCode, Json<ApiResponse<CreatedTasksResponse>>), ApiError> {
    let rid = &req_id.0;
    let request = build_request(rid, &body)?;
    let service = require_service(&state, rid)?;

    let batch = service
        .create_tasks(&request)
        .await
        .map_err(|e| map_rank_error(rid.clone(), &e))?;

    let data = CreatedTasksResponse {
        task_ids: batch.task_ids(),
        grid_coordinates: batch.coordinate_strings(),
        rejected_count: batch.rejected().len(),
        tasks: batch.tasks,
    };
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse {
            data,
            meta: ResponseMeta::new(req_id.0),
        }),
    ))
}

/// POST /api/v1/ranking/results: poll existing tasks.
pub(super) async fn get_results(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Json(body): Json<ResultsRequest>,
) -> Result<Json<ApiResponse<ResultsResponse>>, ApiError> {
    let rid = &req_id.0;
    if body.task_ids.is_empty() {
        return Err(ApiError::new(
            rid,
            "validation_error",
            "task_ids must not be empty",
        ));
    }
    let (max_wait, poll_interval) =
        polling_bounds(rid, &state, body.max_wait_time, body.poll_interval)?;
    let service = require_service(&state, rid)?;

    let report = service
        .get_results(&body.task_ids, max_wait, poll_interval, &state.shutdown)
        .await;
    let rank_map = body
        .target_domain
        .as_deref()
        .filter(|_| !body.coordinates.is_empty())
        .map(|domain| build_rank_map(&body.task_ids, &body.coordinates, &report, Some(domain)));

    Ok(Json(ApiResponse {
        data: ResultsResponse { report, rank_map },
        meta: ResponseMeta::new(req_id.0),
    }))
}

/// POST /api/v1/ranking/status: one non-blocking sweep.
pub(super) async fn get_status(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Json(body): Json<StatusRequest>,
) -> Result<Json<ApiResponse<StatusEnvelope>>, ApiError> {
    let service = require_service(&state, &req_id.0)?;
    let envelope = service.get_task_status(&body.task_ids).await;
    Ok(Json(ApiResponse {
        data: envelope,
        meta: ResponseMeta::new(req_id.0),
    }))
}

/// POST /api/v1/ranking/grid: coordinates only, no provider call.
pub(super) async fn calculate_grid(
    Extension(req_id): Extension<RequestId>,
    Json(body): Json<GridCoordinatesRequest>,
) -> Result<Json<ApiResponse<GridCoordinatesResponse>>, ApiError> {
    let grid_size = body.grid_size.unwrap_or(3);
    let radius_km = body.radius_km.unwrap_or(5.0);
    let coordinates =
        RankingService::calculate_grid_coordinates(body.lat, body.lng, grid_size, radius_km)
            .map_err(|e: RankError| map_rank_error(req_id.0.clone(), &e))?;

    Ok(Json(ApiResponse {
        data: GridCoordinatesResponse {
            center: GridCoordinate {
                lat: body.lat,
                lng: body.lng,
            },
            grid_size,
            radius_km,
            coordinates,
        },
        meta: ResponseMeta::new(req_id.0),
    }))
}

/// GET /api/v1/ranking/info
pub(super) async fn service_info(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
) -> Json<ApiResponse<ServiceInfo>> {
    let info = match &state.service {
        Some(service) => service.service_info().await,
        None => ServiceInfo::unconfigured(),
    };
    Json(ApiResponse {
        data: info,
        meta: ResponseMeta::new(req_id.0),
    })
}
