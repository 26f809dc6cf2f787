use std::sync::Arc;

use axum::extract::{Extension, State};
use serde_json::{json, Value};

use shared_database::AppState;
use shared_models::auth::User;
use shared_models::error::AppError;
use shared_models::extract::{Json, Path};

use crate::models::{CreateVacQueueRequest, UpdateVacQueueRequest, VacQueue};
use crate::services::VacQueueService;

// ==============================================================================
// LISTINGS
// ==============================================================================

#[utoipa::path(
    get,
    path = "/api/v1/appointments",
    tag = "Appointments",
    responses(
        (status = 200, description = "Appointments visible to the caller", body = [VacQueue]),
        (status = 401, description = "Missing or invalid token")
    ),
    security(("bearer_auth" = []))
)]
#[axum::debug_handler]
pub async fn list_appointments(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    let service = VacQueueService::new(&state);

    let appointments = service.list_appointments(&user, None).await?;

    Ok(Json(json!({
        "success": true,
        "count": appointments.len(),
        "data": appointments
    })))
}

#[utoipa::path(
    get,
    path = "/api/v1/hospitals/{id}/appointments",
    tag = "Appointments",
    params(("id" = String, Path, description = "The hospital id")),
    responses(
        (status = 200, description = "Appointments at the hospital visible to the caller", body = [VacQueue]),
        (status = 404, description = "The hospital id is malformed")
    ),
    security(("bearer_auth" = []))
)]
#[axum::debug_handler]
pub async fn list_hospital_appointments(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<User>,
    Path(hospital_id): Path<String>,
) -> Result<Json<Value>, AppError> {
    let service = VacQueueService::new(&state);

    let appointments = service.list_appointments(&user, Some(&hospital_id)).await?;

    Ok(Json(json!({
        "success": true,
        "count": appointments.len(),
        "data": appointments
    })))
}

// ==============================================================================
// BOOKING
// ==============================================================================

/// Books the caller into the hospital. The booking always belongs to the
/// authenticated user, admins included.
#[utoipa::path(
    post,
    path = "/api/v1/hospitals/{id}/appointments",
    tag = "Appointments",
    params(("id" = String, Path, description = "The hospital id")),
    request_body = CreateVacQueueRequest,
    responses(
        (status = 200, description = "The appointment was booked", body = VacQueue),
        (status = 400, description = "Invalid date or the hospital is fully booked that day"),
        (status = 404, description = "The hospital was not found"),
        (status = 409, description = "The caller already holds an appointment")
    ),
    security(("bearer_auth" = []))
)]
#[axum::debug_handler]
pub async fn create_appointment(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<User>,
    Path(hospital_id): Path<String>,
    Json(request): Json<CreateVacQueueRequest>,
) -> Result<Json<Value>, AppError> {
    let service = VacQueueService::new(&state);

    let appointment = service.create_appointment(&user, &hospital_id, request).await?;

    Ok(Json(json!({
        "success": true,
        "data": appointment
    })))
}

// ==============================================================================
// SINGLE APPOINTMENT
// ==============================================================================

#[utoipa::path(
    get,
    path = "/api/v1/appointments/{id}",
    tag = "Appointments",
    params(("id" = String, Path, description = "The appointment id")),
    responses(
        (status = 200, description = "The appointment", body = VacQueue),
        (status = 403, description = "The caller does not own the appointment"),
        (status = 404, description = "The appointment was not found")
    ),
    security(("bearer_auth" = []))
)]
#[axum::debug_handler]
pub async fn get_appointment(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<User>,
    Path(appointment_id): Path<String>,
) -> Result<Json<Value>, AppError> {
    let service = VacQueueService::new(&state);

    let appointment = service.get_appointment(&user, &appointment_id).await?;

    Ok(Json(json!({
        "success": true,
        "data": appointment
    })))
}

#[utoipa::path(
    put,
    path = "/api/v1/appointments/{id}",
    tag = "Appointments",
    params(("id" = String, Path, description = "The appointment id")),
    request_body = UpdateVacQueueRequest,
    responses(
        (status = 200, description = "The appointment was moved", body = VacQueue),
        (status = 400, description = "Invalid date or the target day is fully booked"),
        (status = 403, description = "The caller does not own the appointment"),
        (status = 404, description = "The appointment or hospital was not found")
    ),
    security(("bearer_auth" = []))
)]
#[axum::debug_handler]
pub async fn update_appointment(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<User>,
    Path(appointment_id): Path<String>,
    Json(request): Json<UpdateVacQueueRequest>,
) -> Result<Json<Value>, AppError> {
    let service = VacQueueService::new(&state);

    let appointment = service.update_appointment(&user, &appointment_id, request).await?;

    Ok(Json(json!({
        "success": true,
        "data": appointment
    })))
}

#[utoipa::path(
    delete,
    path = "/api/v1/appointments/{id}",
    tag = "Appointments",
    params(("id" = String, Path, description = "The appointment id")),
    responses(
        (status = 200, description = "The appointment was cancelled"),
        (status = 403, description = "The caller does not own the appointment"),
        (status = 404, description = "The appointment was not found")
    ),
    security(("bearer_auth" = []))
)]
#[axum::debug_handler]
pub async fn delete_appointment(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<User>,
    Path(appointment_id): Path<String>,
) -> Result<Json<Value>, AppError> {
    let service = VacQueueService::new(&state);

    service.delete_appointment(&user, &appointment_id).await?;

    Ok(Json(json!({
        "success": true,
        "data": {}
    })))
}
