use crate::validation::validate_not_blank;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

/// Registration payload.
///
/// Missing fields default to empty strings so they surface as field-level
/// validation errors instead of a generic body rejection.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct RegisterRequest {
    #[serde(default)]
    #[validate(
        length(max = 150, message = "Ensure this field has no more than 150 characters."),
        custom(function = "validate_not_blank")
    )]
    pub username: String,
    #[serde(default)]
    #[validate(email(message = "Enter a valid email address."))]
    pub email: String,
    #[serde(default)]
    #[validate(length(min = 5, message = "Ensure this field has at least 5 characters."))]
    pub password: String,
    #[serde(default)]
    #[validate(length(max = 255, message = "Ensure this field has no more than 255 characters."))]
    pub name: String,
}

/// Credentials for token issuance. `username` may hold either a username
/// or an email address; `email` is accepted as an alias.
#[derive(Debug, Clone, Deserialize)]
pub struct TokenRequest {
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub password: String,
}

impl TokenRequest {
    /// The login identifier, preferring `username` when both are present.
    pub fn identifier(&self) -> Option<&str> {
        self.username
            .as_deref()
            .or(self.email.as_deref())
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenResponse {
    pub token: String,
}

/// PATCH /user/me
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct UpdateProfileRequest {
    #[validate(
        length(max = 150, message = "Ensure this field has no more than 150 characters."),
        custom(function = "validate_not_blank")
    )]
    pub username: Option<String>,
    #[validate(email(message = "Enter a valid email address."))]
    pub email: Option<String>,
    #[validate(length(max = 255, message = "Ensure this field has no more than 255 characters."))]
    pub name: Option<String>,
    #[validate(length(min = 5, message = "Ensure this field has at least 5 characters."))]
    pub password: Option<String>,
}

/// PUT /user/me
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct ReplaceProfileRequest {
    #[serde(default)]
    #[validate(
        length(max = 150, message = "Ensure this field has no more than 150 characters."),
        custom(function = "validate_not_blank")
    )]
    pub username: String,
    #[serde(default)]
    #[validate(email(message = "Enter a valid email address."))]
    pub email: String,
    #[serde(default)]
    #[validate(length(max = 255, message = "Ensure this field has no more than 255 characters."))]
    pub name: String,
    #[validate(length(min = 5, message = "Ensure this field has at least 5 characters."))]
    pub password: Option<String>,
}

impl From<ReplaceProfileRequest> for UpdateProfileRequest {
    fn from(req: ReplaceProfileRequest) -> Self {
        Self {
            username: Some(req.username),
            email: Some(req.email),
            name: Some(req.name),
            password: req.password,
        }
    }
}

/// User as returned to its owner (never carries the password hash)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UserProfile {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub name: String,
}

/// User as listed on the staff endpoints
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdminUserView {
    pub id: i64,
    pub username: String,
    pub name: String,
    pub email: String,
    pub is_active: bool,
    pub is_staff: bool,
    pub is_superuser: bool,
    pub created_at: DateTime<Utc>,
    pub last_login_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AdminUserUpdate {
    pub name: Option<String>,
    pub is_active: Option<bool>,
    pub is_staff: Option<bool>,
    pub is_superuser: Option<bool>,
}
