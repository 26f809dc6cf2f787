use std::sync::Arc;

use axum::{
    Json, Router,
    routing::get,
};
use utoipa::OpenApi;

use appointment_cell::router::{appointment_routes, hospital_appointment_routes};
use auth_cell::router::auth_routes;
use hospital_cell::router::hospital_routes;
use shared_database::AppState;

use crate::docs::ApiDoc;

pub fn create_router(state: Arc<AppState>) -> Router {
    let hospitals = hospital_routes(state.clone())
        .merge(hospital_appointment_routes(state.clone()));

    Router::new()
        .route("/", get(|| async { "VacQ API is running!" }))
        .route("/api-docs/openapi.json", get(|| async { Json(ApiDoc::openapi()) }))
        .nest("/api/v1/auth", auth_routes(state.clone()))
        .nest("/api/v1/hospitals", hospitals)
        .nest("/api/v1/appointments", appointment_routes(state))
}

#[cfg(test)]
mod tests {
    use axum::{
        body::Body,
        http::{Request, StatusCode},
    };
    use serde_json::Value;
    use tower::ServiceExt;

    use shared_utils::test_utils::TestConfig;

    use super::*;

    fn app() -> Router {
        create_router(TestConfig::default().to_state())
    }

    #[tokio::test]
    async fn liveness_route_answers() {
        let response = app()
            .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn openapi_document_lists_every_resource() {
        let response = app()
            .oneshot(Request::builder().uri("/api-docs/openapi.json").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let doc: Value = serde_json::from_slice(&body).unwrap();
        let paths = doc["paths"].as_object().unwrap();

        for path in [
            "/api/v1/auth/register",
            "/api/v1/hospitals",
            "/api/v1/hospitals/{id}",
            "/api/v1/hospitals/vacCenters",
            "/api/v1/hospitals/{id}/appointments",
            "/api/v1/appointments/{id}",
        ] {
            assert!(paths.contains_key(path), "missing {}", path);
        }
    }

    #[tokio::test]
    async fn protected_routes_are_nested_under_api_v1() {
        for (method, uri) in [
            ("GET", "/api/v1/auth/me"),
            ("GET", "/api/v1/appointments"),
            ("POST", "/api/v1/hospitals"),
            ("POST", "/api/v1/hospitals/00000000-0000-0000-0000-000000000000/appointments"),
        ] {
            let response = app()
                .oneshot(Request::builder().method(method).uri(uri).body(Body::empty()).unwrap())
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::UNAUTHORIZED, "{} {}", method, uri);
        }
    }
}
