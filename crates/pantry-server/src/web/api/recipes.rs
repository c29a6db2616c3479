use crate::media::detect_image;
use crate::state::AppState;
use crate::web::api::middleware::AuthUser;
use crate::web::api::{
    ApiMultipart, ApiPath, ApiQuery, ValidJson, error_response, field_error, internal_error,
    not_found, parse_id_list,
};
use anyhow::{Context, Result};
use axum::{
    Json,
    body::Bytes,
    extract::{Multipart, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use pantry_common::models::recipe::{
    AttributeRef, AttributeView, RecipeDetailView, RecipeImageView, RecipePatch, RecipeRequest,
    RecipeView, unique_names,
};
use pantry_db::{
    AttributeKind, AttributeRepo, NewRecipe, RecipeChanges, RecipeFilter, RecipeRepo, RecipeRow,
};
use serde::Deserialize;
use sqlx::{PgConnection, PgPool};
use std::collections::HashMap;
use std::sync::Arc;

const IMAGE_FIELD: &str = "image";
const INVALID_IMAGE: &str =
    "Upload a valid image. The file you uploaded was either not an image or a corrupted image.";

#[derive(Debug, Deserialize)]
pub struct RecipeListQuery {
    /// Comma separated tag ids
    pub tags: Option<String>,
    /// Comma separated ingredient ids
    pub ingredients: Option<String>,
}

/// Load the tags and ingredients of `rows` and build list views, keeping the
/// order of `rows`.
async fn recipe_views(pool: &PgPool, rows: &[RecipeRow]) -> Result<Vec<RecipeView>> {
    let ids: Vec<i64> = rows.iter().map(|r| r.id).collect();
    let mut tags = linked_views(pool, AttributeKind::Tag, &ids).await?;
    let mut ingredients = linked_views(pool, AttributeKind::Ingredient, &ids).await?;

    Ok(rows
        .iter()
        .map(|r| RecipeView {
            id: r.id,
            title: r.title.clone(),
            time_minutes: r.time_minutes,
            price: r.price,
            link: r.link.clone(),
            tags: tags.remove(&r.id).unwrap_or_default(),
            ingredients: ingredients.remove(&r.id).unwrap_or_default(),
        })
        .collect())
}

async fn linked_views(
    pool: &PgPool,
    kind: AttributeKind,
    recipe_ids: &[i64],
) -> Result<HashMap<i64, Vec<AttributeView>>> {
    let mut by_recipe: HashMap<i64, Vec<AttributeView>> = HashMap::new();
    for row in AttributeRepo::list_for_recipes(pool, kind, recipe_ids).await? {
        by_recipe.entry(row.recipe_id).or_default().push(AttributeView {
            id: row.id,
            name: row.name,
        });
    }
    Ok(by_recipe)
}

async fn detail_view(state: &AppState, row: RecipeRow) -> Result<RecipeDetailView> {
    let recipe = recipe_views(&state.pool, std::slice::from_ref(&row))
        .await?
        .pop()
        .context("Recipe view missing")?;
    Ok(RecipeDetailView {
        recipe,
        description: row.description,
        image: row.image.as_deref().map(|path| state.media.url_for(path)),
    })
}

/// Resolve the named attributes for the owner, creating missing ones, and
/// make them the recipe's complete set. `None` leaves the links alone.
async fn replace_links(
    conn: &mut PgConnection,
    kind: AttributeKind,
    user_id: i64,
    recipe_id: i64,
    refs: Option<&[AttributeRef]>,
) -> Result<()> {
    let Some(refs) = refs else {
        return Ok(());
    };

    let mut ids = Vec::with_capacity(refs.len());
    for name in unique_names(refs) {
        let row = AttributeRepo::get_or_create(&mut *conn, kind, user_id, &name).await?;
        ids.push(row.id);
    }
    AttributeRepo::set_links(conn, kind, recipe_id, &ids).await
}

/// Insert the recipe and its links in one transaction
async fn insert_recipe(pool: &PgPool, user_id: i64, req: &RecipeRequest) -> Result<RecipeRow> {
    let mut tx = pool.begin().await.context("Failed to begin transaction")?;
    let new_recipe = NewRecipe {
        title: req.title.trim(),
        time_minutes: req.time_minutes,
        price: req.price,
        link: &req.link,
        description: &req.description,
    };
    let row = RecipeRepo::create(&mut tx, user_id, &new_recipe).await?;
    replace_links(&mut tx, AttributeKind::Tag, user_id, row.id, req.tags.as_deref()).await?;
    replace_links(
        &mut tx,
        AttributeKind::Ingredient,
        user_id,
        row.id,
        req.ingredients.as_deref(),
    )
    .await?;
    tx.commit().await.context("Failed to commit recipe")?;
    Ok(row)
}

/// Update the recipe and, where given, its links in one transaction.
/// `None` when the recipe is not the user's; nothing is changed then.
async fn apply_changes(
    pool: &PgPool,
    user_id: i64,
    id: i64,
    patch: &RecipePatch,
) -> Result<Option<RecipeRow>> {
    let mut tx = pool.begin().await.context("Failed to begin transaction")?;
    let changes = RecipeChanges {
        title: patch.title.as_deref().map(str::trim),
        time_minutes: patch.time_minutes,
        price: patch.price,
        link: patch.link.as_deref(),
        description: patch.description.as_deref(),
    };
    let Some(row) = RecipeRepo::update(&mut tx, user_id, id, &changes).await? else {
        return Ok(None);
    };
    replace_links(&mut tx, AttributeKind::Tag, user_id, row.id, patch.tags.as_deref()).await?;
    replace_links(
        &mut tx,
        AttributeKind::Ingredient,
        user_id,
        row.id,
        patch.ingredients.as_deref(),
    )
    .await?;
    tx.commit().await.context("Failed to commit recipe")?;
    Ok(Some(row))
}

/// GET /api/recipe/recipes - List the caller's recipes
#[tracing::instrument(skip(state, auth))]
pub async fn list_recipes(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    ApiQuery(query): ApiQuery<RecipeListQuery>,
) -> impl IntoResponse {
    let filter = match (
        parse_id_list(query.tags.as_deref()),
        parse_id_list(query.ingredients.as_deref()),
    ) {
        (Ok(tag_ids), Ok(ingredient_ids)) => RecipeFilter {
            tag_ids,
            ingredient_ids,
        },
        (Err(msg), _) | (_, Err(msg)) => return error_response(StatusCode::BAD_REQUEST, msg),
    };

    let rows = match RecipeRepo::list(&state.pool, auth.user_id(), &filter).await {
        Ok(rows) => rows,
        Err(e) => return internal_error("Failed to list recipes", &e),
    };

    match recipe_views(&state.pool, &rows).await {
        Ok(views) => Json(views).into_response(),
        Err(e) => internal_error("Failed to load recipe attributes", &e),
    }
}

/// POST /api/recipe/recipes - Create a recipe with its tags and ingredients
#[tracing::instrument(skip(state, auth, req))]
pub async fn create_recipe(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    ValidJson(req): ValidJson<RecipeRequest>,
) -> impl IntoResponse {
    let row = match insert_recipe(&state.pool, auth.user_id(), &req).await {
        Ok(row) => row,
        Err(e) => return internal_error("Failed to create recipe", &e),
    };

    match detail_view(&state, row).await {
        Ok(view) => (StatusCode::CREATED, Json(view)).into_response(),
        Err(e) => internal_error("Failed to load recipe", &e),
    }
}

/// GET /api/recipe/recipes/{id}
#[tracing::instrument(skip(state, auth))]
pub async fn get_recipe(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    ApiPath(id): ApiPath<i64>,
) -> impl IntoResponse {
    let row = match RecipeRepo::get(&state.pool, auth.user_id(), id).await {
        Ok(Some(row)) => row,
        Ok(None) => return not_found(),
        Err(e) => return internal_error("Failed to get recipe", &e),
    };

    match detail_view(&state, row).await {
        Ok(view) => Json(view).into_response(),
        Err(e) => internal_error("Failed to load recipe", &e),
    }
}

/// PATCH /api/recipe/recipes/{id} - Partial update
#[tracing::instrument(skip(state, auth, req))]
pub async fn update_recipe(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    ApiPath(id): ApiPath<i64>,
    ValidJson(req): ValidJson<RecipePatch>,
) -> impl IntoResponse {
    save_recipe(&state, &auth, id, &req).await
}

/// PUT /api/recipe/recipes/{id} - Full update; omitted link and description
/// are cleared
#[tracing::instrument(skip(state, auth, req))]
pub async fn replace_recipe(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    ApiPath(id): ApiPath<i64>,
    ValidJson(req): ValidJson<RecipeRequest>,
) -> impl IntoResponse {
    save_recipe(&state, &auth, id, &RecipePatch::from(req)).await
}

async fn save_recipe(state: &AppState, auth: &AuthUser, id: i64, patch: &RecipePatch) -> Response {
    let row = match apply_changes(&state.pool, auth.user_id(), id, patch).await {
        Ok(Some(row)) => row,
        Ok(None) => return not_found(),
        Err(e) => return internal_error("Failed to update recipe", &e),
    };

    match detail_view(state, row).await {
        Ok(view) => Json(view).into_response(),
        Err(e) => internal_error("Failed to load recipe", &e),
    }
}

/// DELETE /api/recipe/recipes/{id}
#[tracing::instrument(skip(state, auth))]
pub async fn delete_recipe(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    ApiPath(id): ApiPath<i64>,
) -> impl IntoResponse {
    let row = match RecipeRepo::delete(&state.pool, auth.user_id(), id).await {
        Ok(Some(row)) => row,
        Ok(None) => return not_found(),
        Err(e) => return internal_error("Failed to delete recipe", &e),
    };

    if let Some(image) = row.image.as_deref() {
        if let Err(e) = state.media.delete(image).await {
            tracing::warn!("Failed to remove image of deleted recipe {}: {:#}", id, e);
        }
    }

    StatusCode::NO_CONTENT.into_response()
}

/// Pull the bytes of the image field out of the multipart body
async fn read_image_field(multipart: &mut Multipart) -> Result<Option<Bytes>, Response> {
    loop {
        let field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => return Ok(None),
            Err(e) => return Err(error_response(e.status(), e.body_text())),
        };
        if field.name() != Some(IMAGE_FIELD) {
            continue;
        }
        return match field.bytes().await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) => Err(error_response(e.status(), e.body_text())),
        };
    }
}

/// POST /api/recipe/recipes/{id}/upload-image - Attach an image to a recipe
#[tracing::instrument(skip(state, auth, multipart))]
pub async fn upload_image(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    ApiPath(id): ApiPath<i64>,
    ApiMultipart(mut multipart): ApiMultipart,
) -> impl IntoResponse {
    let user_id = auth.user_id();
    match RecipeRepo::get(&state.pool, user_id, id).await {
        Ok(Some(_)) => {}
        Ok(None) => return not_found(),
        Err(e) => return internal_error("Failed to get recipe", &e),
    }

    let bytes = match read_image_field(&mut multipart).await {
        Ok(Some(bytes)) if !bytes.is_empty() => bytes,
        Ok(_) => return field_error(IMAGE_FIELD, "No file was submitted."),
        Err(resp) => return resp,
    };

    let to_check = bytes.clone();
    let format = match tokio::task::spawn_blocking(move || detect_image(&to_check)).await {
        Ok(Ok(format)) => format,
        Ok(Err(e)) => {
            tracing::debug!("Rejected upload for recipe {}: {}", id, e);
            return field_error(IMAGE_FIELD, INVALID_IMAGE);
        }
        Err(e) => return internal_error("Image check failed", &anyhow::Error::from(e)),
    };

    let relative = match state.media.save_recipe_image(&bytes, format).await {
        Ok(path) => path,
        Err(e) => return internal_error("Failed to store image", &e),
    };

    let change = match RecipeRepo::set_image(&state.pool, user_id, id, Some(&relative)).await {
        Ok(change) => change,
        Err(e) => {
            if let Err(cleanup) = state.media.delete(&relative).await {
                tracing::warn!("Failed to remove orphaned image: {:#}", cleanup);
            }
            return internal_error("Failed to save recipe image", &e);
        }
    };

    let Some(change) = change else {
        // Deleted while the upload was in flight
        if let Err(e) = state.media.delete(&relative).await {
            tracing::warn!("Failed to remove orphaned image: {:#}", e);
        }
        return not_found();
    };

    if let Some(old) = change.previous.as_deref().filter(|old| *old != relative) {
        if let Err(e) = state.media.delete(old).await {
            tracing::warn!("Failed to remove replaced image {}: {:#}", old, e);
        }
    }

    Json(RecipeImageView {
        id: change.recipe.id,
        image: change.recipe.image.as_deref().map(|path| state.media.url_for(path)),
    })
    .into_response()
}
