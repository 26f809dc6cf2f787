use std::sync::Arc;

use axum::{
    Router,
    body::Body,
    http::Request,
    middleware::{self, Next},
    routing::get,
};

use shared_database::AppState;
use shared_models::auth::Role;
use shared_utils::extractor::{authorize, protect};

use crate::handlers;

const BOOKING_ROLES: &[Role] = &[Role::Admin, Role::User];

/// `/api/v1/appointments`
pub fn appointment_routes(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(handlers::list_appointments))
        .route(
            "/{id}",
            get(handlers::get_appointment)
                .put(handlers::update_appointment)
                .delete(handlers::delete_appointment),
        )
        .route_layer(middleware::from_fn(|req: Request<Body>, next: Next| {
            authorize(BOOKING_ROLES, req, next)
        }))
        .route_layer(middleware::from_fn_with_state(state.clone(), protect))
        .with_state(state)
}

/// Appointments nested under a hospital; merged into the hospital router so
/// both share `/api/v1/hospitals`.
pub fn hospital_appointment_routes(state: Arc<AppState>) -> Router {
    Router::new()
        .route(
            "/{id}/appointments",
            get(handlers::list_hospital_appointments).post(handlers::create_appointment),
        )
        .route_layer(middleware::from_fn(|req: Request<Body>, next: Next| {
            authorize(BOOKING_ROLES, req, next)
        }))
        .route_layer(middleware::from_fn_with_state(state.clone(), protect))
        .with_state(state)
}
