pub mod admin;
mod attributes;
pub mod ingredients;
pub mod middleware;
pub mod recipes;
pub mod tags;
pub mod users;

use crate::state::AppState;
use axum::extract::{
    DefaultBodyLimit, FromRequest, FromRequestParts, Multipart, Path, Query, Request,
};
use axum::http::StatusCode;
use axum::http::request::Parts;
use axum::response::{IntoResponse, Response};
use axum::{Json, Router, routing::get, routing::post};
use pantry_common::validation::error_fields;
use serde::de::DeserializeOwned;
use serde_json::json;
use std::sync::Arc;
use validator::{Validate, ValidationErrors};

pub fn build_api_routes(state: Arc<AppState>) -> Router {
    let upload_limit = state.config.media.max_upload_bytes;

    Router::new()
        // Accounts
        .route("/user/create", post(users::register))
        .route(
            "/user/token",
            post(users::issue_token).delete(users::revoke_token),
        )
        .route(
            "/user/me",
            get(users::get_me).patch(users::patch_me).put(users::put_me),
        )
        // Recipes
        .route(
            "/recipe/recipes",
            get(recipes::list_recipes).post(recipes::create_recipe),
        )
        .route(
            "/recipe/recipes/{id}",
            get(recipes::get_recipe)
                .patch(recipes::update_recipe)
                .put(recipes::replace_recipe)
                .delete(recipes::delete_recipe),
        )
        .route(
            "/recipe/recipes/{id}/upload-image",
            post(recipes::upload_image).layer(DefaultBodyLimit::max(upload_limit)),
        )
        // Tags
        .route("/recipe/tags", get(tags::list_tags).post(tags::create_tag))
        .route(
            "/recipe/tags/{id}",
            get(tags::get_tag)
                .patch(tags::update_tag)
                .delete(tags::delete_tag),
        )
        // Ingredients
        .route(
            "/recipe/ingredients",
            get(ingredients::list_ingredients).post(ingredients::create_ingredient),
        )
        .route(
            "/recipe/ingredients/{id}",
            get(ingredients::get_ingredient)
                .patch(ingredients::update_ingredient)
                .delete(ingredients::delete_ingredient),
        )
        // Staff
        .route("/admin/users", get(admin::list_users))
        .route(
            "/admin/users/{id}",
            get(admin::get_user).patch(admin::update_user),
        )
        .with_state(state)
}

/// `{"error": message}` with the given status
pub(crate) fn error_response(status: StatusCode, message: impl Into<String>) -> Response {
    (status, Json(json!({"error": message.into()}))).into_response()
}

/// Log the full error chain and answer with a generic 500
pub(crate) fn internal_error(context: &str, e: &anyhow::Error) -> Response {
    tracing::error!("{}: {:#}", context, e);
    error_response(StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
}

/// Missing and foreign-owned records look the same to the caller
pub(crate) fn not_found() -> Response {
    error_response(StatusCode::NOT_FOUND, "Not found.")
}

pub(crate) fn validation_error(errors: &ValidationErrors) -> Response {
    (
        StatusCode::BAD_REQUEST,
        Json(json!({
            "error": "Invalid input.",
            "fields": error_fields(errors),
        })),
    )
        .into_response()
}

/// A 400 carrying a single field error, shaped like `validation_error`
pub(crate) fn field_error(field: &str, message: impl Into<String>) -> Response {
    (
        StatusCode::BAD_REQUEST,
        Json(json!({
            "error": "Invalid input.",
            "fields": { field: [message.into()] },
        })),
    )
        .into_response()
}

/// JSON body extractor whose rejections are JSON 400s
pub struct ApiJson<T>(pub T);

impl<S, T> FromRequest<S> for ApiJson<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = Response;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => Ok(ApiJson(value)),
            Err(rejection) => Err(error_response(
                StatusCode::BAD_REQUEST,
                rejection.body_text(),
            )),
        }
    }
}

/// `ApiJson` that also runs the payload's `Validate` rules
pub struct ValidJson<T>(pub T);

impl<S, T> FromRequest<S> for ValidJson<T>
where
    T: DeserializeOwned + Validate,
    S: Send + Sync,
{
    type Rejection = Response;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let ApiJson(value) = ApiJson::<T>::from_request(req, state).await?;
        value.validate().map_err(|e| validation_error(&e))?;
        Ok(ValidJson(value))
    }
}

/// Path extractor whose rejections are JSON errors
pub struct ApiPath<T>(pub T);

impl<S, T> FromRequestParts<S> for ApiPath<T>
where
    T: DeserializeOwned + Send,
    S: Send + Sync,
{
    type Rejection = Response;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        match Path::<T>::from_request_parts(parts, state).await {
            Ok(Path(value)) => Ok(ApiPath(value)),
            Err(rejection) => Err(error_response(rejection.status(), rejection.body_text())),
        }
    }
}

/// Query string extractor whose rejections are JSON 400s
pub struct ApiQuery<T>(pub T);

impl<S, T> FromRequestParts<S> for ApiQuery<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = Response;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        match Query::<T>::from_request_parts(parts, state).await {
            Ok(Query(value)) => Ok(ApiQuery(value)),
            Err(rejection) => Err(error_response(
                StatusCode::BAD_REQUEST,
                rejection.body_text(),
            )),
        }
    }
}

/// Multipart extractor; a missing or wrong content type becomes a JSON error
pub struct ApiMultipart(pub Multipart);

impl<S> FromRequest<S> for ApiMultipart
where
    S: Send + Sync,
{
    type Rejection = Response;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match Multipart::from_request(req, state).await {
            Ok(multipart) => Ok(ApiMultipart(multipart)),
            Err(rejection) => Err(error_response(rejection.status(), rejection.body_text())),
        }
    }
}

/// Parse a comma separated id list such as `1,2,3`.
/// An absent or empty parameter means no filter.
pub(crate) fn parse_id_list(raw: Option<&str>) -> Result<Option<Vec<i64>>, String> {
    let raw = match raw.map(str::trim) {
        Some(s) if !s.is_empty() => s,
        _ => return Ok(None),
    };
    raw.split(',')
        .map(|part| {
            part.trim()
                .parse::<i64>()
                .map_err(|_| format!("'{}' is not a valid id", part.trim()))
        })
        .collect::<Result<Vec<_>, _>>()
        .map(Some)
}

/// Parse the `assigned_only` flag: `1`/`true` or `0`/`false`, default off
pub(crate) fn parse_assigned_only(raw: Option<&str>) -> Result<bool, String> {
    match raw.map(str::trim) {
        None | Some("") => Ok(false),
        Some("1") | Some("true") => Ok(true),
        Some("0") | Some("false") => Ok(false),
        Some(other) => Err(format!(
            "assigned_only must be 0 or 1, got '{}'",
            other
        )),
    }
}
