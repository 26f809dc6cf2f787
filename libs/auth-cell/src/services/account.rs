use reqwest::Method;
use serde_json::{json, Map, Value};
use tracing::{debug, info, warn};

use shared_config::AppConfig;
use shared_database::error::postgrest_error;
use shared_database::{AppState, SupabaseClient};
use shared_models::auth::{Role, User};
use shared_models::validation::ValidationErrors;
use shared_utils::jwt::create_token;

use crate::models::{
    AuthError, LoginRequest, RegisterRequest, UpdateDetailsRequest, UpdatePasswordRequest,
};
use crate::services::PasswordService;

pub struct AccountService<'a> {
    supabase: &'a SupabaseClient,
    config: &'a AppConfig,
}

impl<'a> AccountService<'a> {
    pub fn new(state: &'a AppState) -> Self {
        Self {
            supabase: &state.db,
            config: &state.config,
        }
    }

    /// Creates the account and returns it with a fresh token.
    pub async fn register(&self, request: RegisterRequest) -> Result<(User, String), AuthError> {
        let role = request.validate().map_err(AuthError::Validation)?;

        if role == Role::Admin && !self.config.allow_admin_registration {
            warn!("Rejected admin self-registration for {:?}", request.email);
            return Err(AuthError::AdminRegistrationDisabled);
        }

        let email = normalize_email(request.email.as_deref().unwrap_or_default());
        debug!("Registering user: {}", email);

        self.ensure_email_available(&email, None).await?;

        let password_hash = PasswordService::hash_password(request.password.as_deref().unwrap_or_default())?;

        let user_data = json!({
            "name": request.name.as_deref().map(str::trim),
            "tel": request.tel.as_deref().map(str::trim),
            "email": email,
            "role": role,
            "password_hash": password_hash,
        });

        let result: Vec<User> = self.supabase
            .request_with_headers(
                Method::POST,
                "/rest/v1/users",
                Some(user_data),
                Some(SupabaseClient::representation_headers()),
            )
            .await
            .map_err(map_write_error)?;

        let user = result
            .into_iter()
            .next()
            .ok_or_else(|| AuthError::DatabaseError("Failed to create user".to_string()))?;

        info!("User {} registered with role {}", user.id, user.role);

        let token = self.issue_token(&user)?;
        Ok((user, token))
    }

    pub async fn login(&self, request: LoginRequest) -> Result<(User, String), AuthError> {
        let (email, password) = match (request.email.as_deref(), request.password.as_deref()) {
            (Some(email), Some(password)) if !email.trim().is_empty() && !password.is_empty() => {
                (email, password)
            }
            _ => {
                return Err(AuthError::Validation(ValidationErrors::single(
                    "email",
                    "Please provide an email and password",
                )))
            }
        };

        debug!("Login attempt for {}", email.trim());

        let user = self.supabase
            .get_user_by_email(email)
            .await
            .map_err(|e| AuthError::DatabaseError(e.to_string()))?
            .ok_or(AuthError::InvalidCredentials)?;

        if !PasswordService::verify_password(password, &user.password_hash)? {
            warn!("Wrong password for user {}", user.id);
            return Err(AuthError::InvalidCredentials);
        }

        info!("User {} logged in", user.id);

        let token = self.issue_token(&user)?;
        Ok((user, token))
    }

    pub async fn update_details(&self, user: &User, request: UpdateDetailsRequest) -> Result<User, AuthError> {
        request.validate().map_err(AuthError::Validation)?;

        if request.is_empty() {
            return Ok(user.clone());
        }

        let mut update_data = Map::new();

        if let Some(name) = &request.name {
            update_data.insert("name".to_string(), json!(name.trim()));
        }
        if let Some(tel) = &request.tel {
            update_data.insert("tel".to_string(), json!(tel.trim()));
        }
        if let Some(email) = &request.email {
            let email = normalize_email(email);
            if email != user.email {
                self.ensure_email_available(&email, Some(user)).await?;
            }
            update_data.insert("email".to_string(), json!(email));
        }

        let updated = self.patch_user(user, Value::Object(update_data)).await?;
        info!("User {} updated their details", updated.id);
        Ok(updated)
    }

    /// Replaces the password after checking the current one and returns a
    /// new token.
    pub async fn update_password(&self, user: &User, request: UpdatePasswordRequest) -> Result<String, AuthError> {
        request.validate().map_err(AuthError::Validation)?;

        let current = request.current_password.as_deref().unwrap_or_default();
        if !PasswordService::verify_password(current, &user.password_hash)? {
            warn!("User {} gave a wrong current password", user.id);
            return Err(AuthError::WrongPassword);
        }

        let password_hash = PasswordService::hash_password(request.new_password.as_deref().unwrap_or_default())?;
        let updated = self.patch_user(user, json!({ "password_hash": password_hash })).await?;

        info!("User {} changed their password", updated.id);
        self.issue_token(&updated)
    }

    pub fn issue_token(&self, user: &User) -> Result<String, AuthError> {
        create_token(&user.id, &self.config.jwt_secret, self.config.jwt_expire).map_err(AuthError::Token)
    }

    async fn patch_user(&self, user: &User, data: Value) -> Result<User, AuthError> {
        let result: Vec<User> = self.supabase
            .request_with_headers(
                Method::PATCH,
                &format!("/rest/v1/users?id=eq.{}", user.id),
                Some(data),
                Some(SupabaseClient::representation_headers()),
            )
            .await
            .map_err(map_write_error)?;

        result.into_iter().next().ok_or(AuthError::UserNotFound)
    }

    async fn ensure_email_available(&self, email: &str, current: Option<&User>) -> Result<(), AuthError> {
        let existing = self.supabase
            .get_user_by_email(email)
            .await
            .map_err(|e| AuthError::DatabaseError(e.to_string()))?;

        match existing {
            Some(found) if current.map_or(true, |user| user.id != found.id) => {
                warn!("Email {} is already registered", email);
                Err(AuthError::EmailTaken)
            }
            _ => Ok(()),
        }
    }
}

fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

fn map_write_error(err: anyhow::Error) -> AuthError {
    match postgrest_error(&err) {
        Some(pg) if pg.is_unique_violation() => AuthError::EmailTaken,
        _ => AuthError::DatabaseError(err.to_string()),
    }
}
