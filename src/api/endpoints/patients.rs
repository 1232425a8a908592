//! Patient identity endpoints.

use axum::extract::{Query, State};
use axum::Json;

use crate::api::error::ApiError;
use crate::api::types::{run_blocking, ApiContext};
use crate::identity;
use crate::models::{Patient, PatientFilter, PatientInfo};

/// `GET /api/patients?patient_id=&name=&phone=`: any subset of the fields.
pub async fn lookup(
    State(ctx): State<ApiContext>,
    Query(filter): Query<PatientFilter>,
) -> Result<Json<Patient>, ApiError> {
    if filter.is_empty() {
        return Err(ApiError::BadRequest(
            "Provide at least one of patient_id, name or phone".into(),
        ));
    }

    let patient = run_blocking(move || {
        ctx.store
            .with_conn(|conn| {
                identity::find_patient(conn, ctx.identity_salt(), &filter).map_err(ApiError::from)
            })
    })
    .await?
    .ok_or_else(|| ApiError::NotFound("Patient not found".into()))?;

    Ok(Json(patient))
}

/// `PUT /api/patients`: insert or update by `patient_id`.
pub async fn upsert(
    State(ctx): State<ApiContext>,
    Json(info): Json<PatientInfo>,
) -> Result<Json<Patient>, ApiError> {
    let patient = run_blocking(move || {
        ctx.store.with_conn(|conn| {
            identity::upsert_patient(conn, ctx.identity_salt(), &info).map_err(ApiError::from)
        })
    })
    .await?;

    Ok(Json(patient))
}
