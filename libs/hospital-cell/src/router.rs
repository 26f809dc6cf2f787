use std::sync::Arc;

use axum::{
    Router,
    body::Body,
    http::Request,
    middleware::{self, Next},
    routing::{get, post, put},
};

use shared_database::AppState;
use shared_models::auth::Role;
use shared_utils::extractor::{authorize, protect};

use crate::handlers;

pub fn hospital_routes(state: Arc<AppState>) -> Router {
    let public_routes = Router::new()
        .route("/", get(handlers::list_hospitals))
        .route("/vacCenters", get(handlers::get_vac_centers))
        .route("/{id}", get(handlers::get_hospital));

    // Layers run bottom-up: protect resolves the user, then authorize checks the role.
    let admin_routes = Router::new()
        .route("/", post(handlers::create_hospital))
        .route("/{id}", put(handlers::update_hospital).delete(handlers::delete_hospital))
        .route_layer(middleware::from_fn(|req: Request<Body>, next: Next| {
            authorize(&[Role::Admin], req, next)
        }))
        .route_layer(middleware::from_fn_with_state(state.clone(), protect));

    Router::new()
        .merge(public_routes)
        .merge(admin_routes)
        .with_state(state)
}
