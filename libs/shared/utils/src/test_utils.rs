use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use serde_json::{json, Value};
use uuid::Uuid;

use shared_config::AppConfig;
use shared_database::AppState;
use shared_models::auth::{Role, User};

use crate::jwt::{create_token, create_token_at};

pub struct TestConfig {
    pub jwt_secret: String,
    pub supabase_url: String,
    pub supabase_service_key: String,
}

impl Default for TestConfig {
    fn default() -> Self {
        Self {
            jwt_secret: "test-secret-key-for-jwt-validation-must-be-long-enough".to_string(),
            supabase_url: "http://localhost:54321".to_string(),
            supabase_service_key: "test-service-key".to_string(),
        }
    }
}

impl TestConfig {
    pub fn with_url(url: &str) -> Self {
        Self {
            supabase_url: url.to_string(),
            ..Self::default()
        }
    }

    pub fn to_app_config(&self) -> AppConfig {
        AppConfig {
            supabase_url: self.supabase_url.clone(),
            supabase_service_key: self.supabase_service_key.clone(),
            jwt_secret: self.jwt_secret.clone(),
            jwt_expire: Duration::from_secs(30 * 86_400),
            jwt_cookie_expire_days: 30,
            default_daily_capacity: 50,
            allow_admin_registration: false,
            app_env: "test".to_string(),
            port: 5000,
        }
    }

    pub fn to_state(&self) -> Arc<AppState> {
        Arc::new(AppState::new(self.to_app_config()))
    }
}

pub struct TestUser {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub tel: String,
    pub role: Role,
}

impl Default for TestUser {
    fn default() -> Self {
        Self::new("test@example.com", Role::User)
    }
}

impl TestUser {
    pub fn new(email: &str, role: Role) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: "Test User".to_string(),
            email: email.to_string(),
            tel: "0812345678".to_string(),
            role,
        }
    }

    pub fn user(email: &str) -> Self {
        Self::new(email, Role::User)
    }

    pub fn admin(email: &str) -> Self {
        Self::new(email, Role::Admin)
    }

    pub fn to_user(&self) -> User {
        User {
            id: self.id,
            name: self.name.clone(),
            tel: self.tel.clone(),
            email: self.email.clone(),
            role: self.role,
            password_hash: String::new(),
            created_at: Some(Utc::now()),
        }
    }

    /// The row the store returns for this user.
    pub fn row(&self) -> Value {
        MockSupabaseResponses::user_row(self, "")
    }
}

pub struct JwtTestUtils;

impl JwtTestUtils {
    pub fn create_test_token(user: &TestUser, secret: &str) -> String {
        create_token(&user.id, secret, Duration::from_secs(3600))
            .expect("test secret is set")
    }

    pub fn create_expired_token(user: &TestUser, secret: &str) -> String {
        let now = Utc::now().timestamp();
        create_token_at(&user.id, secret, now - 7200, now - 3600)
            .expect("test secret is set")
    }

    pub fn create_invalid_signature_token(user: &TestUser) -> String {
        Self::create_test_token(user, "wrong-secret")
    }

    pub fn create_malformed_token() -> String {
        "invalid.token.format".to_string()
    }
}

pub struct MockSupabaseResponses;

impl MockSupabaseResponses {
    pub fn user_row(user: &TestUser, password_hash: &str) -> Value {
        json!({
            "id": user.id,
            "name": user.name,
            "tel": user.tel,
            "email": user.email,
            "role": user.role,
            "password_hash": password_hash,
            "created_at": "2024-01-01T00:00:00Z"
        })
    }

    pub fn hospital_row(hospital_id: &Uuid, name: &str, daily_capacity: i32) -> Value {
        json!({
            "id": hospital_id,
            "name": name,
            "address": "121 Sukhumvit Road",
            "district": "Bang Na",
            "province": "Bangkok",
            "postalcode": "10110",
            "tel": "02-2187000",
            "region": "Bangkok",
            "daily_capacity": daily_capacity,
            "created_at": "2024-01-01T00:00:00Z"
        })
    }

    pub fn vac_queue_row(id: &Uuid, user_id: &Uuid, hospital_id: &Uuid, appt_date: &str) -> Value {
        json!({
            "id": id,
            "user_id": user_id,
            "hospital_id": hospital_id,
            "appt_date": appt_date,
            "created_at": "2024-01-01T00:00:00Z"
        })
    }

    pub fn error_response(code: &str, message: &str) -> Value {
        json!({
            "code": code,
            "message": message,
            "details": null,
            "hint": null
        })
    }
}
