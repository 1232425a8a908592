//! Report endpoints.
//!
//! `POST /api/reports` runs the full pipeline for one image; the others
//! read stored reports.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::api::error::ApiError;
use crate::api::types::{run_blocking, ApiContext};
use crate::db::repository;
use crate::models::{MedicalReport, PatientSummary};
use crate::pipeline::extraction::ImageSource;
use crate::pipeline::processor::{ProcessRequest, ProcessingOutcome};
use crate::report::build_patient_summary;

const DEFAULT_LIST_LIMIT: u32 = 20;
const MAX_LIST_LIMIT: u32 = 100;

#[derive(Deserialize)]
pub struct ListQuery {
    pub limit: Option<u32>,
}

#[derive(Serialize)]
pub struct ReportListResponse {
    pub patient_id: String,
    pub total: i64,
    pub reports: Vec<MedicalReport>,
}

/// `POST /api/reports`: process a report image for a patient.
///
/// Only `base64` and `url` sources are accepted here. `file_path` is for
/// in-process callers; over HTTP it would expose the server's filesystem.
pub async fn create(
    State(ctx): State<ApiContext>,
    Json(request): Json<ProcessRequest>,
) -> Result<(StatusCode, Json<ProcessingOutcome>), ApiError> {
    if matches!(request.image, ImageSource::FilePath(_)) {
        return Err(ApiError::BadRequest(
            "Image source 'file_path' is not accepted; send 'base64' or 'url'".into(),
        ));
    }

    let deadline = ctx.deadline();
    tracing::info!(source = request.image.kind(), "Report processing requested");

    let outcome = run_blocking(move || {
        ctx.processor
            .process(&ctx.store, &request, deadline)
            .map_err(ApiError::from)
    })
    .await?;

    Ok((StatusCode::CREATED, Json(outcome)))
}

/// `GET /api/reports/:report_id`
pub async fn detail(
    State(ctx): State<ApiContext>,
    Path(report_id): Path<String>,
) -> Result<Json<MedicalReport>, ApiError> {
    let report_id = Uuid::parse_str(&report_id)
        .map_err(|_| ApiError::BadRequest("Invalid report ID format".into()))?;

    let report = run_blocking(move || {
        ctx.store
            .with_conn(|conn| repository::get_report(conn, &report_id))
            .map_err(ApiError::from)
    })
    .await?
    .ok_or_else(|| ApiError::NotFound("Report not found".into()))?;

    Ok(Json(report))
}

/// `GET /api/patients/:patient_id/reports?limit=`: newest first.
pub async fn list_for_patient(
    State(ctx): State<ApiContext>,
    Path(patient_id): Path<String>,
    Query(query): Query<ListQuery>,
) -> Result<Json<ReportListResponse>, ApiError> {
    let limit = query.limit.unwrap_or(DEFAULT_LIST_LIMIT).clamp(1, MAX_LIST_LIMIT);

    let response = run_blocking(move || {
        ctx.store.with_conn(|conn| {
            if repository::get_patient(conn, &patient_id)?.is_none() {
                return Err(ApiError::NotFound("Patient not found".into()));
            }
            let reports = repository::list_reports_for_patient(conn, &patient_id, Some(limit))?;
            let total = repository::count_reports_for_patient(conn, &patient_id)?;
            Ok(ReportListResponse {
                patient_id,
                total,
                reports,
            })
        })
    })
    .await?;

    Ok(Json(response))
}

/// `GET /api/patients/:patient_id/summary`: per-indicator history.
pub async fn summary(
    State(ctx): State<ApiContext>,
    Path(patient_id): Path<String>,
) -> Result<Json<PatientSummary>, ApiError> {
    let summary = run_blocking(move || {
        ctx.store.with_conn(|conn| {
            if repository::get_patient(conn, &patient_id)?.is_none() {
                return Err(ApiError::NotFound("Patient not found".into()));
            }
            let reports = repository::list_reports_for_patient(conn, &patient_id, None)?;
            Ok(build_patient_summary(&patient_id, &reports))
        })
    })
    .await?;

    Ok(Json(summary))
}
