use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Debug, Serialize, Deserialize)]
pub struct JwtHeader {
    pub alg: String,
    #[serde(default)]
    pub typ: String,
}

#[derive(Debug, PartialEq, Serialize, Deserialize)]
pub struct JwtClaims {
    pub sub: String,
    pub exp: Option<u64>,
    pub iat: Option<u64>,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[default]
    User,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Admin => "admin",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "user" => Ok(Role::User),
            "admin" => Ok(Role::Admin),
            other => Err(format!("'{}' is not a valid role", other)),
        }
    }
}

/// A row of the `users` table. The password hash is read from the store but
/// never written back out in a response body.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub tel: String,
    pub email: String,
    #[serde(default)]
    pub role: Role,
    #[serde(default, skip_serializing)]
    #[schema(ignore)]
    pub password_hash: String,
    pub created_at: Option<DateTime<Utc>>,
}

impl User {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct TokenResponse {
    pub success: bool,
    pub token: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn role_round_trips_through_strings() {
        assert_eq!("admin".parse::<Role>(), Ok(Role::Admin));
        assert_eq!("user".parse::<Role>(), Ok(Role::User));
        assert!("doctor".parse::<Role>().is_err());
        assert_eq!(Role::Admin.to_string(), "admin");
    }

    #[test]
    fn user_serialization_hides_password_hash() {
        let user: User = serde_json::from_value(json!({
            "id": Uuid::new_v4(),
            "name": "Somchai",
            "tel": "0812345678",
            "email": "somchai@example.com",
            "role": "admin",
            "password_hash": "$argon2id$v=19$secret",
            "created_at": "2024-01-01T00:00:00Z"
        }))
        .unwrap();

        assert!(user.is_admin());
        assert_eq!(user.password_hash, "$argon2id$v=19$secret");

        let out = serde_json::to_value(&user).unwrap();
        assert!(out.get("password_hash").is_none());
        assert_eq!(out["role"], "admin");
    }

    #[test]
    fn missing_role_defaults_to_user() {
        let user: User = serde_json::from_value(json!({
            "id": Uuid::new_v4(),
            "name": "Malee",
            "tel": "0899999999",
            "email": "malee@example.com",
            "created_at": null
        }))
        .unwrap();

        assert_eq!(user.role, Role::User);
        assert!(!user.is_admin());
    }
}
