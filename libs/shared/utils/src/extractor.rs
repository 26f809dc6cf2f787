use std::sync::Arc;

use axum::{
    extract::State,
    http::{header::AUTHORIZATION, HeaderMap, Request},
    middleware::Next,
    response::Response,
    body::Body,
};
use axum_extra::extract::cookie::CookieJar;
use tracing::{debug, warn};
use uuid::Uuid;

use shared_database::AppState;
use shared_models::auth::{Role, User};
use shared_models::error::AppError;

use crate::jwt::validate_token;

pub const TOKEN_COOKIE: &str = "token";

const NOT_AUTHORIZED: &str = "Not authorized to access this route";

/// Bearer header first, then the `token` cookie set at login.
pub fn extract_token(headers: &HeaderMap) -> Option<String> {
    let from_header = headers
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(|token| token.trim().to_string())
        .filter(|token| !token.is_empty());

    from_header.or_else(|| {
        CookieJar::from_headers(headers)
            .get(TOKEN_COOKIE)
            .map(|cookie| cookie.value().to_string())
            .filter(|token| !token.is_empty() && token != "none")
    })
}

/// Resolves the bearer credential to a stored user and attaches it to the
/// request. Runs before `authorize`.
pub async fn protect(
    State(state): State<Arc<AppState>>,
    mut request: Request<Body>,
    next: Next,
) -> Result<Response, AppError> {
    let token = extract_token(request.headers())
        .ok_or_else(|| AppError::Unauthorized(NOT_AUTHORIZED.to_string()))?;

    let claims = validate_token(&token, &state.config.jwt_secret).map_err(|e| {
        debug!("Rejected token: {}", e);
        AppError::Unauthorized(NOT_AUTHORIZED.to_string())
    })?;

    let user_id = Uuid::parse_str(&claims.sub)
        .map_err(|_| AppError::Unauthorized(NOT_AUTHORIZED.to_string()))?;

    let user = state.db.get_user(&user_id)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?
        .ok_or_else(|| {
            warn!("Token subject {} no longer exists", user_id);
            AppError::Unauthorized(NOT_AUTHORIZED.to_string())
        })?;

    request.extensions_mut().insert(user);

    Ok(next.run(request).await)
}

/// Role gate for routes already behind `protect`. Attach with
/// `middleware::from_fn(|req: Request<Body>, next: Next| authorize(&[Role::Admin], req, next))`.
pub async fn authorize(
    roles: &'static [Role],
    request: Request<Body>,
    next: Next,
) -> Result<Response, AppError> {
    let user = extract_user(&request)?;
    check_role(&user, roles)?;

    Ok(next.run(request).await)
}

pub fn check_role(user: &User, roles: &[Role]) -> Result<(), AppError> {
    if roles.contains(&user.role) {
        Ok(())
    } else {
        Err(AppError::Forbidden(format!(
            "User role {} is not authorized to access this route",
            user.role
        )))
    }
}

pub fn extract_user<B>(request: &Request<B>) -> Result<User, AppError> {
    request
        .extensions()
        .get::<User>()
        .cloned()
        .ok_or_else(|| AppError::Unauthorized(NOT_AUTHORIZED.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use axum::http::HeaderValue;

    use axum::{middleware, routing::get, Router};
    use serde_json::json;
    use tower::ServiceExt;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use crate::test_utils::{JwtTestUtils, TestConfig, TestUser};

    const ADMIN_ONLY: &[Role] = &[Role::Admin];

    fn admin_app(state: Arc<AppState>) -> Router {
        Router::new()
            .route("/", get(|| async { "ok" }))
            .route_layer(middleware::from_fn(|req: Request<Body>, next: Next| authorize(ADMIN_ONLY, req, next)))
            .route_layer(middleware::from_fn_with_state(state.clone(), protect))
            .with_state(state)
    }

    async fn mount_user(server: &MockServer, user: &TestUser) {
        Mock::given(method("GET"))
            .and(path("/rest/v1/users"))
            .and(query_param("id", format!("eq.{}", user.id)))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([user.row()])))
            .mount(server)
            .await;
    }

    async fn status_for(app: Router, token: Option<&str>) -> axum::http::StatusCode {
        let mut request = Request::builder().uri("/");
        if let Some(token) = token {
            request = request.header(AUTHORIZATION, format!("Bearer {}", token));
        }
        app.oneshot(request.body(Body::empty()).unwrap()).await.unwrap().status()
    }

    #[test]
    fn bearer_header_wins_over_cookie() {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer header-token"));
        headers.insert("cookie", HeaderValue::from_static("token=cookie-token"));

        assert_eq!(extract_token(&headers).as_deref(), Some("header-token"));
    }

    #[test]
    fn falls_back_to_cookie() {
        let mut headers = HeaderMap::new();
        headers.insert("cookie", HeaderValue::from_static("theme=dark; token=cookie-token"));

        assert_eq!(extract_token(&headers).as_deref(), Some("cookie-token"));
    }

    #[test]
    fn logged_out_cookie_is_ignored() {
        let mut headers = HeaderMap::new();
        headers.insert("cookie", HeaderValue::from_static("token=none"));

        assert_eq!(extract_token(&headers), None);
    }

    #[test]
    fn non_bearer_scheme_is_ignored() {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_static("Basic dXNlcjpwYXNz"));

        assert_eq!(extract_token(&headers), None);
    }

    #[test]
    fn role_check() {
        let admin = TestUser::admin("admin@example.com").to_user();
        let user = TestUser::user("user@example.com").to_user();

        assert!(check_role(&admin, &[Role::Admin]).is_ok());
        assert!(check_role(&user, &[Role::Admin, Role::User]).is_ok());
        assert_matches!(check_role(&user, &[Role::Admin]), Err(AppError::Forbidden(msg)) => {
            assert_eq!(msg, "User role user is not authorized to access this route");
        });
    }

    #[test]
    fn extract_user_reads_the_resolved_identity() {
        let user = TestUser::user("user@example.com").to_user();

        let mut request = Request::builder().uri("/").body(Body::empty()).unwrap();
        assert_matches!(extract_user(&request), Err(AppError::Unauthorized(_)));

        request.extensions_mut().insert(user.clone());
        assert_eq!(extract_user(&request).unwrap().id, user.id);
    }

    #[tokio::test]
    async fn protect_then_authorize_admits_admins_only() {
        let server = MockServer::start().await;
        let config = TestConfig::with_url(&server.uri());
        let admin = TestUser::admin("admin@example.com");
        let user = TestUser::user("user@example.com");
        mount_user(&server, &admin).await;
        mount_user(&server, &user).await;

        let admin_token = JwtTestUtils::create_test_token(&admin, &config.jwt_secret);
        let user_token = JwtTestUtils::create_test_token(&user, &config.jwt_secret);

        assert_eq!(status_for(admin_app(config.to_state()), Some(&admin_token)).await, 200);
        assert_eq!(status_for(admin_app(config.to_state()), Some(&user_token)).await, 403);
    }

    #[tokio::test]
    async fn protect_rejects_missing_bad_and_orphaned_tokens() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/rest/v1/users"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
            .mount(&server)
            .await;

        let config = TestConfig::with_url(&server.uri());
        let ghost = TestUser::admin("ghost@example.com");

        for token in [
            None,
            Some(JwtTestUtils::create_malformed_token()),
            Some(JwtTestUtils::create_expired_token(&ghost, &config.jwt_secret)),
            Some(JwtTestUtils::create_invalid_signature_token(&ghost)),
            Some(JwtTestUtils::create_test_token(&ghost, &config.jwt_secret)),
        ] {
            let status = status_for(admin_app(config.to_state()), token.as_deref()).await;
            assert_eq!(status, 401);
        }
    }
}
