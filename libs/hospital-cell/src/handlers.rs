use std::collections::HashMap;
use std::sync::Arc;

use axum::{
    extract::{Extension, State},
    http::StatusCode,
};
use chrono::{NaiveDate, Utc};
use serde_json::{json, Value};
use tracing::info;

use shared_database::AppState;
use shared_models::auth::User;
use shared_models::error::AppError;
use shared_models::extract::{Json, Path, Query};
use shared_models::validation::ValidationErrors;
use shared_utils::query::ListQuery;

use crate::models::{
    CreateHospitalRequest, Hospital, UpdateHospitalRequest, VacCenter, VacCenterQuery,
    LISTABLE_FIELDS,
};
use crate::services::HospitalService;

#[utoipa::path(
    get,
    path = "/api/v1/hospitals",
    tag = "Hospitals",
    params(
        ("select" = Option<String>, Query, description = "Comma separated fields to return"),
        ("sort" = Option<String>, Query, description = "Comma separated sort keys, '-' prefix for descending"),
        ("page" = Option<u32>, Query, description = "Page number, default 1"),
        ("limit" = Option<u32>, Query, description = "Page size, default 25")
    ),
    responses(
        (status = 200, description = "The list of the hospitals", body = [Hospital]),
        (status = 400, description = "Unknown field in select, sort or filter")
    )
)]
#[axum::debug_handler]
pub async fn list_hospitals(
    State(state): State<Arc<AppState>>,
    Query(params): Query<HashMap<String, String>>,
) -> Result<Json<Value>, AppError> {
    let query = ListQuery::from_params(&params, &LISTABLE_FIELDS)?;
    let service = HospitalService::new(&state);

    let (hospitals, total) = service.list_hospitals(&query).await?;

    Ok(Json(json!({
        "success": true,
        "count": hospitals.len(),
        "pagination": query.pagination(total),
        "data": hospitals
    })))
}

#[utoipa::path(
    get,
    path = "/api/v1/hospitals/{id}",
    tag = "Hospitals",
    params(("id" = String, Path, description = "The hospital id")),
    responses(
        (status = 200, description = "The hospital description by id", body = Hospital),
        (status = 404, description = "The hospital was not found")
    )
)]
#[axum::debug_handler]
pub async fn get_hospital(
    State(state): State<Arc<AppState>>,
    Path(hospital_id): Path<String>,
) -> Result<Json<Value>, AppError> {
    let service = HospitalService::new(&state);

    let hospital = service.get_hospital(&hospital_id).await?;

    Ok(Json(json!({
        "success": true,
        "data": hospital
    })))
}

#[utoipa::path(
    post,
    path = "/api/v1/hospitals",
    tag = "Hospitals",
    request_body = CreateHospitalRequest,
    responses(
        (status = 201, description = "The hospital was successfully created", body = Hospital),
        (status = 400, description = "One or more fields are invalid"),
        (status = 401, description = "Missing or invalid token"),
        (status = 403, description = "Caller is not an admin")
    ),
    security(("bearer_auth" = []))
)]
#[axum::debug_handler]
pub async fn create_hospital(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<User>,
    Json(request): Json<CreateHospitalRequest>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    let service = HospitalService::new(&state);

    let hospital = service.create_hospital(request).await?;
    info!("Admin {} created hospital {}", user.id, hospital.id);

    Ok((StatusCode::CREATED, Json(json!({
        "success": true,
        "data": hospital
    }))))
}

#[utoipa::path(
    put,
    path = "/api/v1/hospitals/{id}",
    tag = "Hospitals",
    params(("id" = String, Path, description = "The hospital id")),
    request_body = UpdateHospitalRequest,
    responses(
        (status = 200, description = "The hospital was updated", body = Hospital),
        (status = 404, description = "The hospital was not found")
    ),
    security(("bearer_auth" = []))
)]
#[axum::debug_handler]
pub async fn update_hospital(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<User>,
    Path(hospital_id): Path<String>,
    Json(request): Json<UpdateHospitalRequest>,
) -> Result<Json<Value>, AppError> {
    let service = HospitalService::new(&state);

    let hospital: Hospital = service.update_hospital(&hospital_id, request).await?;
    info!("Admin {} updated hospital {}", user.id, hospital.id);

    Ok(Json(json!({
        "success": true,
        "data": hospital
    })))
}

#[utoipa::path(
    delete,
    path = "/api/v1/hospitals/{id}",
    tag = "Hospitals",
    params(("id" = String, Path, description = "The hospital id")),
    responses(
        (status = 200, description = "The hospital was deleted"),
        (status = 404, description = "The hospital was not found")
    ),
    security(("bearer_auth" = []))
)]
#[axum::debug_handler]
pub async fn delete_hospital(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<User>,
    Path(hospital_id): Path<String>,
) -> Result<Json<Value>, AppError> {
    let service = HospitalService::new(&state);

    let removed = service.delete_hospital(&hospital_id).await?;
    info!("Admin {} deleted hospital {} ({} appointments removed)", user.id, hospital_id, removed);

    Ok(Json(json!({
        "success": true,
        "data": {}
    })))
}

#[utoipa::path(
    get,
    path = "/api/v1/hospitals/vacCenters",
    tag = "Hospitals",
    params(("date" = Option<String>, Query, description = "Day to report on (YYYY-MM-DD), default today")),
    responses(
        (status = 200, description = "Hospitals with their remaining dose capacity", body = [VacCenter]),
        (status = 400, description = "Malformed date")
    )
)]
#[axum::debug_handler]
pub async fn get_vac_centers(
    State(state): State<Arc<AppState>>,
    Query(query): Query<VacCenterQuery>,
) -> Result<Json<Value>, AppError> {
    let date = match query.date.as_deref() {
        Some(raw) => NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d").map_err(|_| {
            AppError::Validation(ValidationErrors::single("date", "Date must be formatted as YYYY-MM-DD"))
        })?,
        None => Utc::now().date_naive(),
    };

    let service = HospitalService::new(&state);
    let centers = service.get_vac_centers(date).await?;

    Ok(Json(json!({
        "success": true,
        "count": centers.len(),
        "data": centers
    })))
}
