use crate::auth::hash_auth_token;
use crate::state::AppState;
use crate::web::api::error_response;
use axum::{
    extract::FromRequestParts,
    http::{StatusCode, header, request::Parts},
    response::Response,
};
use chrono::Utc;
use pantry_db::{AuthTokenRepo, UserRepo, UserRow};
use std::sync::Arc;

/// Extractor that resolves an `Authorization: Bearer <token>` header (or the
/// `Token <token>` form) to an active user.
/// Use `AuthUser` directly for required auth.
#[derive(Debug)]
pub struct AuthUser {
    pub user: UserRow,
    /// Hash of the presented token, used for revocation
    pub token_hash: String,
}

impl AuthUser {
    pub fn user_id(&self) -> i64 {
        self.user.id
    }

    /// Reject callers without staff rights with 403
    pub fn require_staff(&self) -> Result<(), Response> {
        if self.user.is_staff {
            Ok(())
        } else {
            Err(error_response(
                StatusCode::FORBIDDEN,
                "You do not have permission to perform this action.",
            ))
        }
    }
}

fn unauthorized(message: &str) -> Response {
    error_response(StatusCode::UNAUTHORIZED, message)
}

/// Strip the auth scheme from a header value
fn bearer_token(value: &str) -> Option<&str> {
    value
        .strip_prefix("Bearer ")
        .or_else(|| value.strip_prefix("Token "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

impl FromRequestParts<Arc<AppState>> for AuthUser {
    type Rejection = Response;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let auth_header = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok());

        let token = match auth_header {
            Some(val) => match bearer_token(val) {
                Some(t) => t,
                None => return Err(unauthorized("Invalid authorization header format")),
            },
            None => {
                return Err(unauthorized(
                    "Authentication credentials were not provided.",
                ));
            }
        };

        let token_hash = hash_auth_token(token);
        let row = match AuthTokenRepo::get_by_hash(&state.pool, &token_hash).await {
            Ok(Some(row)) => row,
            Ok(None) => return Err(unauthorized("Invalid token.")),
            Err(e) => {
                tracing::error!("Failed to look up auth token: {:#}", e);
                return Err(unauthorized("Invalid token."));
            }
        };

        if row.is_expired(Utc::now()) {
            return Err(unauthorized("Token has expired."));
        }

        let user = match UserRepo::get_by_id(&state.pool, row.user_id).await {
            Ok(Some(user)) if user.is_active => user,
            Ok(_) => return Err(unauthorized("User inactive or deleted.")),
            Err(e) => {
                tracing::error!("Failed to load token owner: {:#}", e);
                return Err(unauthorized("Invalid token."));
            }
        };

        if let Err(e) = AuthTokenRepo::touch_last_used(&state.pool, &token_hash).await {
            tracing::warn!("Failed to update token last_used_at: {:#}", e);
        }

        Ok(AuthUser { user, token_hash })
    }
}
