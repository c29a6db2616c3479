use crate::state::AppState;
use crate::web::api::attributes::{self, AttributeListQuery};
use crate::web::api::middleware::AuthUser;
use crate::web::api::{ApiPath, ApiQuery, ValidJson};
use axum::{extract::State, response::IntoResponse};
use pantry_common::models::recipe::{AttributePatch, AttributeRequest};
use pantry_db::AttributeKind;
use std::sync::Arc;

const KIND: AttributeKind = AttributeKind::Tag;

/// GET /api/recipe/tags - List the caller's tags
#[tracing::instrument(skip(state, auth))]
pub async fn list_tags(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    ApiQuery(query): ApiQuery<AttributeListQuery>,
) -> impl IntoResponse {
    attributes::list(&state, KIND, &auth, &query).await
}

/// POST /api/recipe/tags
#[tracing::instrument(skip(state, auth))]
pub async fn create_tag(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    ValidJson(req): ValidJson<AttributeRequest>,
) -> impl IntoResponse {
    attributes::create(&state, KIND, &auth, &req).await
}

/// GET /api/recipe/tags/{id}
#[tracing::instrument(skip(state, auth))]
pub async fn get_tag(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    ApiPath(id): ApiPath<i64>,
) -> impl IntoResponse {
    attributes::get(&state, KIND, &auth, id).await
}

/// PATCH /api/recipe/tags/{id} - Rename a tag
#[tracing::instrument(skip(state, auth))]
pub async fn update_tag(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    ApiPath(id): ApiPath<i64>,
    ValidJson(req): ValidJson<AttributePatch>,
) -> impl IntoResponse {
    attributes::update(&state, KIND, &auth, id, &req).await
}

/// DELETE /api/recipe/tags/{id}
#[tracing::instrument(skip(state, auth))]
pub async fn delete_tag(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    ApiPath(id): ApiPath<i64>,
) -> impl IntoResponse {
    attributes::delete(&state, KIND, &auth, id).await
}
