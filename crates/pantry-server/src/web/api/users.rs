use crate::accounts::{self, AccountError, NewAccount};
use crate::auth::{
    generate_auth_token, token_expiry, token_prefix, verify_dummy_password, verify_password,
};
use crate::state::AppState;
use crate::web::api::middleware::AuthUser;
use crate::web::api::{
    ApiJson, ValidJson, error_response, field_error, internal_error, not_found,
};
use axum::{
    Json,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use chrono::Utc;
use pantry_common::models::user::{
    RegisterRequest, ReplaceProfileRequest, TokenRequest, TokenResponse, UpdateProfileRequest,
    UserProfile,
};
use pantry_common::validation::normalize_email;
use pantry_db::{AuthTokenRepo, UserRepo, UserRow};
use std::sync::Arc;

const BAD_CREDENTIALS: &str = "Unable to authenticate with provided credentials.";

fn profile(user: &UserRow) -> UserProfile {
    UserProfile {
        id: user.id,
        username: user.username.clone(),
        email: user.email.clone(),
        name: user.name.clone(),
    }
}

fn account_error(e: AccountError) -> Response {
    match e {
        AccountError::Internal(e) => internal_error("Account operation failed", &e),
        other => {
            let field = other.field().unwrap_or("non_field_errors");
            let message = match &other {
                AccountError::Validation { message, .. } => message.clone(),
                _ => other.to_string(),
            };
            field_error(field, message)
        }
    }
}

/// POST /api/user/create - Register a new user
#[tracing::instrument(skip(state, req))]
pub async fn register(
    State(state): State<Arc<AppState>>,
    ValidJson(req): ValidJson<RegisterRequest>,
) -> impl IntoResponse {
    let account = NewAccount {
        username: &req.username,
        email: &req.email,
        password: &req.password,
        name: &req.name,
    };

    match accounts::create_user(&state.pool, &account).await {
        Ok(user) => {
            tracing::info!("Registered user {}", user.id);
            (StatusCode::CREATED, Json(profile(&user))).into_response()
        }
        Err(e) => account_error(e),
    }
}

/// POST /api/user/token - Exchange credentials for a new auth token
#[tracing::instrument(skip(state, req))]
pub async fn issue_token(
    State(state): State<Arc<AppState>>,
    ApiJson(req): ApiJson<TokenRequest>,
) -> impl IntoResponse {
    let identifier = match req.identifier() {
        Some(id) if !req.password.is_empty() => id.to_string(),
        _ => return error_response(StatusCode::BAD_REQUEST, BAD_CREDENTIALS),
    };

    let user = match UserRepo::get_by_login(&state.pool, &identifier, &normalize_email(&identifier))
        .await
    {
        Ok(Some(u)) => u,
        Ok(None) => {
            verify_dummy_password(&req.password);
            return error_response(StatusCode::BAD_REQUEST, BAD_CREDENTIALS);
        }
        Err(e) => return internal_error("Failed to look up user", &e),
    };

    match verify_password(&req.password, &user.password_hash) {
        Ok(true) => {}
        Ok(false) => return error_response(StatusCode::BAD_REQUEST, BAD_CREDENTIALS),
        Err(e) => {
            tracing::warn!("Stored password hash for user {} is unusable: {:#}", user.id, e);
            return error_response(StatusCode::BAD_REQUEST, BAD_CREDENTIALS);
        }
    }

    if !user.is_active {
        return error_response(StatusCode::BAD_REQUEST, BAD_CREDENTIALS);
    }

    let expires_at = match token_expiry(Utc::now(), state.config.auth.token_ttl_days) {
        Ok(at) => at,
        Err(e) => return internal_error("Failed to compute token expiry", &e),
    };
    let (raw_token, token_hash) = generate_auth_token();

    if let Err(e) = AuthTokenRepo::create(
        &state.pool,
        &token_hash,
        user.id,
        token_prefix(&raw_token),
        expires_at,
    )
    .await
    {
        return internal_error("Failed to store auth token", &e);
    }

    if let Err(e) = UserRepo::touch_last_login(&state.pool, user.id).await {
        tracing::warn!("Failed to update last_login_at: {:#}", e);
    }

    Json(TokenResponse { token: raw_token }).into_response()
}

/// DELETE /api/user/token - Revoke the token used for this request
#[tracing::instrument(skip(state, auth))]
pub async fn revoke_token(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
) -> impl IntoResponse {
    match AuthTokenRepo::delete(&state.pool, &auth.token_hash).await {
        Ok(_) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => internal_error("Failed to revoke auth token", &e),
    }
}

/// GET /api/user/me - Current user's profile
#[tracing::instrument(skip(auth))]
pub async fn get_me(auth: AuthUser) -> impl IntoResponse {
    Json(profile(&auth.user))
}

/// PATCH /api/user/me - Update some profile fields
#[tracing::instrument(skip(state, auth, req))]
pub async fn patch_me(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    ValidJson(req): ValidJson<UpdateProfileRequest>,
) -> impl IntoResponse {
    save_profile(&state, &auth, &req).await
}

/// PUT /api/user/me - Replace the profile
#[tracing::instrument(skip(state, auth, req))]
pub async fn put_me(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    ValidJson(req): ValidJson<ReplaceProfileRequest>,
) -> impl IntoResponse {
    save_profile(&state, &auth, &UpdateProfileRequest::from(req)).await
}

async fn save_profile(state: &AppState, auth: &AuthUser, req: &UpdateProfileRequest) -> Response {
    match accounts::update_profile(&state.pool, auth.user_id(), req).await {
        Ok(Some(user)) => Json(profile(&user)).into_response(),
        Ok(None) => not_found(),
        Err(e) => account_error(e),
    }
}
