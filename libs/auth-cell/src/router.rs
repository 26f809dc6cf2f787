use std::sync::Arc;

use axum::{
    Router,
    routing::{get, post, put},
    middleware,
};

use shared_database::AppState;
use shared_utils::extractor::protect;

use crate::handlers;

pub fn auth_routes(state: Arc<AppState>) -> Router {
    let public_routes = Router::new()
        .route("/register", post(handlers::register))
        .route("/login", post(handlers::login));

    let protected_routes = Router::new()
        .route("/me", get(handlers::get_me))
        .route("/logout", get(handlers::logout))
        .route("/updatedetails", put(handlers::update_details))
        .route("/updatepassword", put(handlers::update_password))
        .route_layer(middleware::from_fn_with_state(state.clone(), protect));

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .with_state(state)
}
