use std::sync::Arc;

use axum::extract::{Extension, State};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use serde_json::{json, Value};
use time::Duration;
use tracing::debug;

use shared_config::AppConfig;
use shared_database::AppState;
use shared_models::auth::{TokenResponse, User};
use shared_models::error::AppError;
use shared_models::extract::Json;
use shared_utils::extractor::TOKEN_COOKIE;

use crate::models::{LoginRequest, RegisterRequest, UpdateDetailsRequest, UpdatePasswordRequest};
use crate::services::AccountService;

const LOGOUT_COOKIE_SECONDS: i64 = 10;

/// The `token` cookie set next to every token response.
pub fn token_cookie(config: &AppConfig, token: String) -> Cookie<'static> {
    Cookie::build((TOKEN_COOKIE, token))
        .http_only(true)
        .secure(config.is_production())
        .same_site(SameSite::Lax)
        .path("/")
        .max_age(Duration::days(config.jwt_cookie_expire_days))
        .build()
}

fn token_response(config: &AppConfig, jar: CookieJar, token: String) -> (CookieJar, Json<TokenResponse>) {
    let jar = jar.add(token_cookie(config, token.clone()));
    (jar, Json(TokenResponse { success: true, token }))
}

#[utoipa::path(
    post,
    path = "/api/v1/auth/register",
    tag = "Auth",
    request_body = RegisterRequest,
    responses(
        (status = 200, description = "Account created; the token is also set as a cookie", body = TokenResponse),
        (status = 400, description = "One or more fields are invalid or the email is taken"),
        (status = 403, description = "Admin self-registration is disabled")
    )
)]
#[axum::debug_handler]
pub async fn register(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    Json(request): Json<RegisterRequest>,
) -> Result<(CookieJar, Json<TokenResponse>), AppError> {
    let service = AccountService::new(&state);

    let (_, token) = service.register(request).await?;

    Ok(token_response(&state.config, jar, token))
}

#[utoipa::path(
    post,
    path = "/api/v1/auth/login",
    tag = "Auth",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Logged in; the token is also set as a cookie", body = TokenResponse),
        (status = 400, description = "Email or password missing"),
        (status = 401, description = "Invalid credentials")
    )
)]
#[axum::debug_handler]
pub async fn login(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    Json(request): Json<LoginRequest>,
) -> Result<(CookieJar, Json<TokenResponse>), AppError> {
    let service = AccountService::new(&state);

    let (_, token) = service.login(request).await?;

    Ok(token_response(&state.config, jar, token))
}

#[utoipa::path(
    get,
    path = "/api/v1/auth/me",
    tag = "Auth",
    responses(
        (status = 200, description = "The logged in user", body = User),
        (status = 401, description = "Missing or invalid token")
    ),
    security(("bearer_auth" = []))
)]
#[axum::debug_handler]
pub async fn get_me(Extension(user): Extension<User>) -> Result<Json<Value>, AppError> {
    debug!("Getting profile for user: {}", user.id);

    Ok(Json(json!({
        "success": true,
        "data": user
    })))
}

/// Overwrites the cookie with a short-lived placeholder.
#[utoipa::path(
    get,
    path = "/api/v1/auth/logout",
    tag = "Auth",
    responses((status = 200, description = "Logged out")),
    security(("bearer_auth" = []))
)]
#[axum::debug_handler]
pub async fn logout(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<User>,
    jar: CookieJar,
) -> Result<(CookieJar, Json<Value>), AppError> {
    debug!("Logging out user: {}", user.id);

    let cookie = Cookie::build((TOKEN_COOKIE, "none"))
        .http_only(true)
        .secure(state.config.is_production())
        .path("/")
        .max_age(Duration::seconds(LOGOUT_COOKIE_SECONDS))
        .build();

    Ok((jar.add(cookie), Json(json!({
        "success": true,
        "data": {}
    }))))
}

#[utoipa::path(
    put,
    path = "/api/v1/auth/updatedetails",
    tag = "Auth",
    request_body = UpdateDetailsRequest,
    responses(
        (status = 200, description = "The updated user", body = User),
        (status = 400, description = "One or more fields are invalid or the email is taken")
    ),
    security(("bearer_auth" = []))
)]
#[axum::debug_handler]
pub async fn update_details(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<User>,
    Json(request): Json<UpdateDetailsRequest>,
) -> Result<Json<Value>, AppError> {
    let service = AccountService::new(&state);

    let updated = service.update_details(&user, request).await?;

    Ok(Json(json!({
        "success": true,
        "data": updated
    })))
}

#[utoipa::path(
    put,
    path = "/api/v1/auth/updatepassword",
    tag = "Auth",
    request_body = UpdatePasswordRequest,
    responses(
        (status = 200, description = "Password changed; a new token is issued", body = TokenResponse),
        (status = 401, description = "Current password is wrong")
    ),
    security(("bearer_auth" = []))
)]
#[axum::debug_handler]
pub async fn update_password(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<User>,
    jar: CookieJar,
    Json(request): Json<UpdatePasswordRequest>,
) -> Result<(CookieJar, Json<TokenResponse>), AppError> {
    let service = AccountService::new(&state);

    let token = service.update_password(&user, request).await?;

    Ok(token_response(&state.config, jar, token))
}
