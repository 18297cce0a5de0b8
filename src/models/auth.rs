//! Authentication-related models

use serde::{Deserialize, Serialize};
use validator::Validate;

/// User role as reported by the backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UserRole {
    User,
    Admin,
    Superadmin,
}

impl UserRole {
    /// Whether the role may use the back office
    pub fn is_admin(&self) -> bool {
        matches!(self, UserRole::Admin | UserRole::Superadmin)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            UserRole::User => "user",
            UserRole::Admin => "admin",
            UserRole::Superadmin => "superadmin",
        }
    }
}

/// Login request
#[derive(Debug, Serialize, Validate)]
pub struct LoginRequest {
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 1))]
    pub password: String,
}

/// Registration request
#[derive(Debug, Clone, Serialize, Validate)]
pub struct RegisterRequest {
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 8, message = "password must be at least 8 characters"))]
    pub password: String,
    #[validate(length(min = 1, message = "first name is required"))]
    pub first_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
}

/// Login / refresh response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tokens {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub token_type: Option<String>,
}

/// Registration response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisterResponse {
    pub id: i64,
    pub email: String,
    pub role: UserRole,
    pub first_name: String,
    #[serde(default)]
    pub last_name: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Profile {
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
}

/// Current user (`GET /api/users/me`)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Me {
    pub id: i64,
    pub email: String,
    pub role: UserRole,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub profile: Option<Profile>,
}

impl Me {
    /// Name to show in headers; falls back to the profile, then to the email
    pub fn display_name(&self) -> String {
        let first = self
            .first_name
            .clone()
            .or_else(|| self.profile.as_ref().and_then(|p| p.first_name.clone()))
            .filter(|s| !s.trim().is_empty());
        let last = self
            .last_name
            .clone()
            .or_else(|| self.profile.as_ref().and_then(|p| p.last_name.clone()))
            .filter(|s| !s.trim().is_empty());

        match (first, last) {
            (Some(f), Some(l)) => format!("{} {}", f, l),
            (Some(f), None) => f,
            (None, Some(l)) => l,
            (None, None) => self.email.clone(),
        }
    }
}
