//! Handlers shared by the tag and ingredient endpoints.

use crate::state::AppState;
use crate::web::api::middleware::AuthUser;
use crate::web::api::{error_response, field_error, internal_error, not_found, parse_assigned_only};
use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use pantry_common::models::recipe::{AttributePatch, AttributeRequest, AttributeView};
use pantry_db::{AttributeKind, AttributeRepo, AttributeRow, is_unique_violation};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct AttributeListQuery {
    pub assigned_only: Option<String>,
}

fn view(row: AttributeRow) -> AttributeView {
    AttributeView {
        id: row.id,
        name: row.name,
    }
}

fn duplicate_name(kind: AttributeKind) -> Response {
    field_error(
        "name",
        format!("{} with this name already exists.", kind.label()),
    )
}

pub(super) async fn list(
    state: &AppState,
    kind: AttributeKind,
    auth: &AuthUser,
    query: &AttributeListQuery,
) -> Response {
    let assigned_only = match parse_assigned_only(query.assigned_only.as_deref()) {
        Ok(v) => v,
        Err(msg) => return error_response(StatusCode::BAD_REQUEST, msg),
    };

    match AttributeRepo::list(&state.pool, kind, auth.user_id(), assigned_only).await {
        Ok(rows) => Json(rows.into_iter().map(view).collect::<Vec<_>>()).into_response(),
        Err(e) => internal_error(&format!("Failed to list {}", kind.table()), &e),
    }
}

pub(super) async fn create(
    state: &AppState,
    kind: AttributeKind,
    auth: &AuthUser,
    req: &AttributeRequest,
) -> Response {
    match AttributeRepo::create(&state.pool, kind, auth.user_id(), req.name.trim()).await {
        Ok(row) => (StatusCode::CREATED, Json(view(row))).into_response(),
        Err(e) if is_unique_violation(&e) => duplicate_name(kind),
        Err(e) => internal_error(&format!("Failed to create {}", kind.table()), &e),
    }
}

pub(super) async fn get(
    state: &AppState,
    kind: AttributeKind,
    auth: &AuthUser,
    id: i64,
) -> Response {
    match AttributeRepo::get(&state.pool, kind, auth.user_id(), id).await {
        Ok(Some(row)) => Json(view(row)).into_response(),
        Ok(None) => not_found(),
        Err(e) => internal_error(&format!("Failed to get {}", kind.table()), &e),
    }
}

pub(super) async fn update(
    state: &AppState,
    kind: AttributeKind,
    auth: &AuthUser,
    id: i64,
    req: &AttributePatch,
) -> Response {
    let Some(name) = req.name.as_deref() else {
        // Nothing to change
        return get(state, kind, auth, id).await;
    };

    match AttributeRepo::rename(&state.pool, kind, auth.user_id(), id, name.trim()).await {
        Ok(Some(row)) => Json(view(row)).into_response(),
        Ok(None) => not_found(),
        Err(e) if is_unique_violation(&e) => duplicate_name(kind),
        Err(e) => internal_error(&format!("Failed to update {}", kind.table()), &e),
    }
}

pub(super) async fn delete(
    state: &AppState,
    kind: AttributeKind,
    auth: &AuthUser,
    id: i64,
) -> Response {
    match AttributeRepo::delete(&state.pool, kind, auth.user_id(), id).await {
        Ok(true) => StatusCode::NO_CONTENT.into_response(),
        Ok(false) => not_found(),
        Err(e) => internal_error(&format!("Failed to delete {}", kind.table()), &e),
    }
}
