use crate::state::AppState;
use crate::web::api::middleware::AuthUser;
use crate::web::api::{ApiJson, ApiPath, ApiQuery, internal_error, not_found};
use axum::{Json, extract::State, response::IntoResponse};
use pantry_common::models::user::{AdminUserUpdate, AdminUserView};
use pantry_db::{UserFlags, UserRepo, UserRow};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;

#[derive(Debug, Deserialize)]
pub struct ListUsersQuery {
    #[serde(default = "default_limit")]
    pub limit: i64,
    #[serde(default)]
    pub offset: i64,
}

fn default_limit() -> i64 {
    50
}

fn admin_view(user: UserRow) -> AdminUserView {
    AdminUserView {
        id: user.id,
        username: user.username,
        name: user.name,
        email: user.email,
        is_active: user.is_active,
        is_staff: user.is_staff,
        is_superuser: user.is_superuser,
        created_at: user.created_at,
        last_login_at: user.last_login_at,
    }
}

/// GET /api/admin/users - List users (staff only)
#[tracing::instrument(skip(state, auth))]
pub async fn list_users(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    ApiQuery(query): ApiQuery<ListUsersQuery>,
) -> impl IntoResponse {
    if let Err(resp) = auth.require_staff() {
        return resp;
    }

    let limit = query.limit.clamp(1, 500);
    let offset = query.offset.max(0);

    let users = match UserRepo::list(&state.pool, limit, offset).await {
        Ok(u) => u,
        Err(e) => return internal_error("Failed to list users", &e),
    };
    let total = match UserRepo::count(&state.pool).await {
        Ok(n) => n,
        Err(e) => return internal_error("Failed to count users", &e),
    };

    let items: Vec<AdminUserView> = users.into_iter().map(admin_view).collect();
    Json(json!({
        "items": items,
        "total": total,
        "limit": limit,
        "offset": offset,
    }))
    .into_response()
}

/// GET /api/admin/users/{id} - User detail (staff only)
#[tracing::instrument(skip(state, auth))]
pub async fn get_user(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    ApiPath(id): ApiPath<i64>,
) -> impl IntoResponse {
    if let Err(resp) = auth.require_staff() {
        return resp;
    }

    match UserRepo::get_by_id(&state.pool, id).await {
        Ok(Some(user)) => Json(admin_view(user)).into_response(),
        Ok(None) => not_found(),
        Err(e) => internal_error("Failed to get user", &e),
    }
}

/// PATCH /api/admin/users/{id} - Change name and permission flags (staff only)
#[tracing::instrument(skip(state, auth))]
pub async fn update_user(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    ApiPath(id): ApiPath<i64>,
    ApiJson(req): ApiJson<AdminUserUpdate>,
) -> impl IntoResponse {
    if let Err(resp) = auth.require_staff() {
        return resp;
    }

    let flags = UserFlags {
        name: req.name.as_deref().map(str::trim),
        is_active: req.is_active,
        is_staff: req.is_staff,
        is_superuser: req.is_superuser,
    };

    match UserRepo::update_flags(&state.pool, id, &flags).await {
        Ok(Some(user)) => {
            tracing::info!("User {} updated by staff user {}", id, auth.user_id());
            Json(admin_view(user)).into_response()
        }
        Ok(None) => not_found(),
        Err(e) => internal_error("Failed to update user", &e),
    }
}
