use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use shared_models::auth::Role;
use shared_models::error::AppError;
use shared_models::validation::ValidationErrors;

pub const NAME_MAX_LEN: usize = 50;
pub const PASSWORD_MIN_LEN: usize = 6;

#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct RegisterRequest {
    #[schema(example = "Somchai Jaidee")]
    pub name: Option<String>,
    #[schema(example = "081-234-5678")]
    pub tel: Option<String>,
    #[schema(example = "somchai@example.com")]
    pub email: Option<String>,
    pub password: Option<String>,
    /// `user` unless an admin account is being bootstrapped.
    pub role: Option<String>,
}

impl RegisterRequest {
    pub fn validate(&self) -> Result<Role, ValidationErrors> {
        let mut errors = ValidationErrors::new();

        errors.require("name", self.name.as_deref(), "Please add a name");
        errors.max_length("name", self.name.as_deref(), NAME_MAX_LEN, "Name can not be more than 50 characters");
        if errors.require("tel", self.tel.as_deref(), "Please add a telephone number") {
            errors.tel("tel", self.tel.as_deref());
        }
        if errors.require("email", self.email.as_deref(), "Please add an email") {
            errors.email("email", self.email.as_deref());
        }
        if errors.require("password", self.password.as_deref(), "Please add a password") {
            check_password(&mut errors, "password", self.password.as_deref());
        }

        let role = match self.role.as_deref().map(str::trim) {
            None | Some("") => Role::User,
            Some(raw) => raw.parse::<Role>().unwrap_or_else(|message| {
                errors.add("role", message);
                Role::User
            }),
        };

        errors.into_result()?;
        Ok(role)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct LoginRequest {
    pub email: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct UpdateDetailsRequest {
    pub name: Option<String>,
    pub tel: Option<String>,
    pub email: Option<String>,
}

impl UpdateDetailsRequest {
    pub fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();

        errors.not_blank("name", self.name.as_deref(), "Please add a name");
        errors.max_length("name", self.name.as_deref(), NAME_MAX_LEN, "Name can not be more than 50 characters");
        errors.not_blank("tel", self.tel.as_deref(), "Please add a telephone number");
        errors.tel("tel", self.tel.as_deref());
        errors.not_blank("email", self.email.as_deref(), "Please add an email");
        errors.email("email", self.email.as_deref());

        errors.into_result()
    }

    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.tel.is_none() && self.email.is_none()
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct UpdatePasswordRequest {
    #[serde(rename = "currentPassword", alias = "current_password")]
    pub current_password: Option<String>,
    #[serde(rename = "newPassword", alias = "new_password")]
    pub new_password: Option<String>,
}

impl UpdatePasswordRequest {
    pub fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();

        errors.require("currentPassword", self.current_password.as_deref(), "Please provide your current password");
        if errors.require("newPassword", self.new_password.as_deref(), "Please provide a new password") {
            check_password(&mut errors, "newPassword", self.new_password.as_deref());
        }

        errors.into_result()
    }
}

fn check_password(errors: &mut ValidationErrors, field: &str, value: Option<&str>) {
    if let Some(password) = value {
        if password.chars().count() < PASSWORD_MIN_LEN {
            errors.add(field, "Password must be at least 6 characters");
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("{0}")]
    Validation(ValidationErrors),

    #[error("Email already registered")]
    EmailTaken,

    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Password is incorrect")]
    WrongPassword,

    #[error("Only an admin can create another admin")]
    AdminRegistrationDisabled,

    #[error("User not found")]
    UserNotFound,

    #[error("Password hashing error: {0}")]
    Hashing(String),

    #[error("Token error: {0}")]
    Token(String),

    #[error("Database error: {0}")]
    DatabaseError(String),
}

impl From<AuthError> for AppError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::Validation(errors) => AppError::Validation(errors),
            AuthError::EmailTaken => AppError::Validation(ValidationErrors::single("email", err.to_string())),
            AuthError::InvalidCredentials | AuthError::WrongPassword => AppError::Unauthorized(err.to_string()),
            AuthError::AdminRegistrationDisabled => AppError::Forbidden(err.to_string()),
            AuthError::UserNotFound => AppError::NotFound(err.to_string()),
            AuthError::Hashing(msg) | AuthError::Token(msg) => AppError::Internal(msg),
            AuthError::DatabaseError(msg) => AppError::Database(msg),
        }
    }
}
