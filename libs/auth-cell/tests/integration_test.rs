use axum::{
    body::Body,
    http::{header::SET_COOKIE, Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use tower::ServiceExt;
use uuid::Uuid;
use wiremock::matchers::{body_partial_json, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use auth_cell::router::auth_routes;
use auth_cell::services::PasswordService;
use shared_utils::jwt::validate_token;
use shared_utils::test_utils::{JwtTestUtils, MockSupabaseResponses, TestConfig, TestUser};

struct TestApp {
    app: Router,
    secret: String,
}

fn create_test_app(mock_server: &MockServer) -> TestApp {
    let config = TestConfig::with_url(&mock_server.uri());
    TestApp {
        app: auth_routes(config.to_state()),
        secret: config.jwt_secret,
    }
}

async fn mount_user_by_id(mock_server: &MockServer, row: Value) {
    Mock::given(method("GET"))
        .and(path("/rest/v1/users"))
        .and(query_param("id", format!("eq.{}", row["id"].as_str().unwrap())))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([row])))
        .mount(mock_server)
        .await;
}

async fn mount_user_by_email(mock_server: &MockServer, email: &str, rows: Value) {
    Mock::given(method("GET"))
        .and(path("/rest/v1/users"))
        .and(query_param("email", format!("eq.{}", email)))
        .respond_with(ResponseTemplate::new(200).set_body_json(rows))
        .mount(mock_server)
        .await;
}

fn json_request(method: &str, uri: &str, token: Option<&str>, body: Option<Value>) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json");

    if let Some(token) = token {
        builder = builder.header("authorization", format!("Bearer {}", token));
    }

    let body = match body {
        Some(value) => Body::from(value.to_string()),
        None => Body::empty(),
    };

    builder.body(body).unwrap()
}

async fn read_json(response: axum::response::Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&body).unwrap()
}

fn set_cookie(response: &axum::response::Response) -> String {
    response
        .headers()
        .get(SET_COOKIE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string()
}

fn register_body(email: &str) -> Value {
    json!({
        "name": "Somchai Jaidee",
        "tel": "081-234-5678",
        "email": email,
        "password": "secret1"
    })
}

// ==============================================================================
// REGISTER
// ==============================================================================

#[tokio::test]
async fn test_register_returns_token_and_cookie() {
    let mock_server = MockServer::start().await;
    let test_app = create_test_app(&mock_server);

    let user = TestUser::user("somchai@example.com");
    mount_user_by_email(&mock_server, "somchai@example.com", json!([])).await;

    Mock::given(method("POST"))
        .and(path("/rest/v1/users"))
        .and(body_partial_json(json!({ "email": "somchai@example.com", "role": "user" })))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!([
            MockSupabaseResponses::user_row(&user, "$argon2id$stored")
        ])))
        .expect(1)
        .mount(&mock_server)
        .await;

    let response = test_app.app
        .oneshot(json_request("POST", "/register", None, Some(register_body("Somchai@Example.com"))))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);

    let cookie = set_cookie(&response);
    assert!(cookie.starts_with("token="));
    assert!(cookie.contains("HttpOnly"));

    let body = read_json(response).await;
    assert_eq!(body["success"], true);

    let claims = validate_token(body["token"].as_str().unwrap(), &test_app.secret).unwrap();
    assert_eq!(claims.sub, user.id.to_string());
}

#[tokio::test]
async fn test_register_duplicate_email_is_a_validation_error() {
    let mock_server = MockServer::start().await;
    let test_app = create_test_app(&mock_server);

    let existing = TestUser::user("somchai@example.com");
    mount_user_by_email(&mock_server, "somchai@example.com", json!([existing.row()])).await;

    Mock::given(method("POST"))
        .and(path("/rest/v1/users"))
        .respond_with(ResponseTemplate::new(201))
        .expect(0)
        .mount(&mock_server)
        .await;

    let response = test_app.app
        .oneshot(json_request("POST", "/register", None, Some(register_body("somchai@example.com"))))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = read_json(response).await;
    assert_eq!(body["fields"][0]["field"], "email");
    assert_eq!(body["error"], "Email already registered");
}

#[tokio::test]
async fn test_register_admin_is_forbidden_by_default() {
    let mock_server = MockServer::start().await;
    let test_app = create_test_app(&mock_server);

    let mut body = register_body("boss@example.com");
    body["role"] = json!("admin");

    let response = test_app.app
        .oneshot(json_request("POST", "/register", None, Some(body)))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_register_reports_all_invalid_fields() {
    let mock_server = MockServer::start().await;
    let test_app = create_test_app(&mock_server);

    let response = test_app.app
        .oneshot(json_request(
            "POST",
            "/register",
            None,
            Some(json!({ "name": "", "tel": "1", "email": "nope", "password": "123" })),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = read_json(response).await;
    assert_eq!(body["fields"].as_array().unwrap().len(), 4);
}

// ==============================================================================
// LOGIN
// ==============================================================================

#[tokio::test]
async fn test_login_with_correct_password() {
    let mock_server = MockServer::start().await;
    let test_app = create_test_app(&mock_server);

    let user = TestUser::user("somchai@example.com");
    let hash = PasswordService::hash_password("secret1").unwrap();
    mount_user_by_email(
        &mock_server,
        "somchai@example.com",
        json!([MockSupabaseResponses::user_row(&user, &hash)]),
    )
    .await;

    let response = test_app.app
        .oneshot(json_request(
            "POST",
            "/login",
            None,
            Some(json!({ "email": "somchai@example.com", "password": "secret1" })),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert!(set_cookie(&response).starts_with("token="));

    let body = read_json(response).await;
    let claims = validate_token(body["token"].as_str().unwrap(), &test_app.secret).unwrap();
    assert_eq!(claims.sub, user.id.to_string());
}

#[tokio::test]
async fn test_login_with_wrong_password_or_unknown_email() {
    let mock_server = MockServer::start().await;
    let test_app = create_test_app(&mock_server);

    let user = TestUser::user("somchai@example.com");
    let hash = PasswordService::hash_password("secret1").unwrap();
    mount_user_by_email(
        &mock_server,
        "somchai@example.com",
        json!([MockSupabaseResponses::user_row(&user, &hash)]),
    )
    .await;
    mount_user_by_email(&mock_server, "nobody@example.com", json!([])).await;

    for (email, password) in [("somchai@example.com", "wrong-password"), ("nobody@example.com", "secret1")] {
        let response = test_app.app.clone()
            .oneshot(json_request(
                "POST",
                "/login",
                None,
                Some(json!({ "email": email, "password": password })),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        let body = read_json(response).await;
        assert_eq!(body["error"], "Invalid credentials");
    }
}

#[tokio::test]
async fn test_login_requires_email_and_password() {
    let mock_server = MockServer::start().await;
    let test_app = create_test_app(&mock_server);

    let response = test_app.app
        .oneshot(json_request("POST", "/login", None, Some(json!({ "email": "somchai@example.com" }))))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = read_json(response).await;
    assert_eq!(body["error"], "Please provide an email and password");
}

#[tokio::test]
async fn test_login_with_unreadable_body_gets_the_error_envelope() {
    let mock_server = MockServer::start().await;
    let test_app = create_test_app(&mock_server);

    let request = Request::builder()
        .method("POST")
        .uri("/login")
        .header("content-type", "application/json")
        .body(Body::from("{\"email\": \"somchai@example.com\", "))
        .unwrap();

    let response = test_app.app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = read_json(response).await;
    assert_eq!(body["success"], false);
    assert!(body["error"].is_string());
}

// ==============================================================================
// PROTECTED ROUTES
// ==============================================================================

#[tokio::test]
async fn test_me_returns_user_without_hash() {
    let mock_server = MockServer::start().await;
    let test_app = create_test_app(&mock_server);

    let user = TestUser::user("somchai@example.com");
    mount_user_by_id(&mock_server, MockSupabaseResponses::user_row(&user, "$argon2id$stored")).await;

    let token = JwtTestUtils::create_test_token(&user, &test_app.secret);
    let response = test_app.app
        .oneshot(json_request("GET", "/me", Some(&token), None))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = read_json(response).await;
    assert_eq!(body["data"]["email"], "somchai@example.com");
    assert_eq!(body["data"]["role"], "user");
    assert!(body["data"].get("password_hash").is_none());
}

#[tokio::test]
async fn test_me_accepts_token_cookie() {
    let mock_server = MockServer::start().await;
    let test_app = create_test_app(&mock_server);

    let user = TestUser::user("somchai@example.com");
    mount_user_by_id(&mock_server, user.row()).await;

    let token = JwtTestUtils::create_test_token(&user, &test_app.secret);
    let request = Request::builder()
        .method("GET")
        .uri("/me")
        .header("cookie", format!("token={}", token))
        .body(Body::empty())
        .unwrap();

    let response = test_app.app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_me_rejects_bad_tokens() {
    let mock_server = MockServer::start().await;
    let test_app = create_test_app(&mock_server);

    let user = TestUser::user("somchai@example.com");
    mount_user_by_id(&mock_server, user.row()).await;

    let tokens = vec![
        None,
        Some(JwtTestUtils::create_expired_token(&user, &test_app.secret)),
        Some(JwtTestUtils::create_invalid_signature_token(&user)),
        Some(JwtTestUtils::create_malformed_token()),
    ];

    for token in tokens {
        let response = test_app.app.clone()
            .oneshot(json_request("GET", "/me", token.as_deref(), None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED, "token {:?}", token);
    }
}

#[tokio::test]
async fn test_logout_replaces_cookie() {
    let mock_server = MockServer::start().await;
    let test_app = create_test_app(&mock_server);

    let user = TestUser::user("somchai@example.com");
    mount_user_by_id(&mock_server, user.row()).await;

    let token = JwtTestUtils::create_test_token(&user, &test_app.secret);
    let response = test_app.app
        .oneshot(json_request("GET", "/logout", Some(&token), None))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let cookie = set_cookie(&response);
    assert!(cookie.starts_with("token=none"));
    assert!(cookie.contains("Max-Age=10"));
    assert_eq!(read_json(response).await, json!({ "success": true, "data": {} }));
}

#[tokio::test]
async fn test_update_details_changes_name() {
    let mock_server = MockServer::start().await;
    let test_app = create_test_app(&mock_server);

    let user = TestUser::user("somchai@example.com");
    mount_user_by_id(&mock_server, user.row()).await;

    let mut updated = user.row();
    updated["name"] = json!("Somchai J.");

    Mock::given(method("PATCH"))
        .and(path("/rest/v1/users"))
        .and(query_param("id", format!("eq.{}", user.id)))
        .and(body_partial_json(json!({ "name": "Somchai J." })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([updated])))
        .expect(1)
        .mount(&mock_server)
        .await;

    let token = JwtTestUtils::create_test_token(&user, &test_app.secret);
    let response = test_app.app
        .oneshot(json_request("PUT", "/updatedetails", Some(&token), Some(json!({ "name": "Somchai J." }))))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = read_json(response).await;
    assert_eq!(body["data"]["name"], "Somchai J.");
}

#[tokio::test]
async fn test_update_details_rejects_taken_email() {
    let mock_server = MockServer::start().await;
    let test_app = create_test_app(&mock_server);

    let user = TestUser::user("somchai@example.com");
    mount_user_by_id(&mock_server, user.row()).await;

    let other = TestUser::user("taken@example.com");
    mount_user_by_email(&mock_server, "taken@example.com", json!([other.row()])).await;

    let token = JwtTestUtils::create_test_token(&user, &test_app.secret);
    let response = test_app.app
        .oneshot(json_request(
            "PUT",
            "/updatedetails",
            Some(&token),
            Some(json!({ "email": "taken@example.com" })),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_update_password_checks_current_password() {
    let mock_server = MockServer::start().await;
    let test_app = create_test_app(&mock_server);

    let user = TestUser::user("somchai@example.com");
    let hash = PasswordService::hash_password("secret1").unwrap();
    let row = MockSupabaseResponses::user_row(&user, &hash);
    mount_user_by_id(&mock_server, row.clone()).await;

    Mock::given(method("PATCH"))
        .and(path("/rest/v1/users"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([row])))
        .expect(1)
        .mount(&mock_server)
        .await;

    let token = JwtTestUtils::create_test_token(&user, &test_app.secret);

    let response = test_app.app.clone()
        .oneshot(json_request(
            "PUT",
            "/updatepassword",
            Some(&token),
            Some(json!({ "currentPassword": "not-it", "newPassword": "secret2" })),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = test_app.app
        .oneshot(json_request(
            "PUT",
            "/updatepassword",
            Some(&token),
            Some(json!({ "currentPassword": "secret1", "newPassword": "secret2" })),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = read_json(response).await;
    let claims = validate_token(body["token"].as_str().unwrap(), &test_app.secret).unwrap();
    assert_eq!(claims.sub, user.id.to_string());
    assert!(Uuid::parse_str(&claims.sub).is_ok());
}
