use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{PgConnection, PgPool};

const RECIPE_COLUMNS: &str =
    "id, user_id, title, time_minutes, price, link, description, image, created_at, updated_at";

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct RecipeRow {
    pub id: i64,
    pub user_id: i64,
    pub title: String,
    pub time_minutes: i32,
    pub price: Decimal,
    pub link: String,
    pub description: String,
    /// Path relative to the media root, e.g. `uploads/recipe/<uuid>.png`
    pub image: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewRecipe<'a> {
    pub title: &'a str,
    pub time_minutes: i32,
    pub price: Decimal,
    pub link: &'a str,
    pub description: &'a str,
}

/// Column changes for an update; `None` keeps the stored value.
/// The owner is not part of it: recipes never change hands.
#[derive(Debug, Clone, Default)]
pub struct RecipeChanges<'a> {
    pub title: Option<&'a str>,
    pub time_minutes: Option<i32>,
    pub price: Option<Decimal>,
    pub link: Option<&'a str>,
    pub description: Option<&'a str>,
}

/// List filters. A recipe matches a filter when it is linked to any of the
/// listed ids; both filters must match when both are set.
#[derive(Debug, Clone, Default)]
pub struct RecipeFilter {
    pub tag_ids: Option<Vec<i64>>,
    pub ingredient_ids: Option<Vec<i64>>,
}

/// Result of swapping a recipe's image
#[derive(Debug, Clone)]
pub struct ImageChange {
    pub recipe: RecipeRow,
    /// The path that was stored before the swap
    pub previous: Option<String>,
}

pub struct RecipeRepo;

impl RecipeRepo {
    pub async fn create(
        conn: &mut PgConnection,
        user_id: i64,
        recipe: &NewRecipe<'_>,
    ) -> Result<RecipeRow> {
        let row = sqlx::query_as::<_, RecipeRow>(&format!(
            r#"INSERT INTO recipe (user_id, title, time_minutes, price, link, description)
               VALUES ($1, $2, $3, $4, $5, $6)
               RETURNING {}"#,
            RECIPE_COLUMNS
        ))
        .bind(user_id)
        .bind(recipe.title)
        .bind(recipe.time_minutes)
        .bind(recipe.price)
        .bind(recipe.link)
        .bind(recipe.description)
        .fetch_one(conn)
        .await
        .context("Failed to create recipe")?;
        Ok(row)
    }

    /// Get one of the user's recipes. Other users' recipes are reported as
    /// missing.
    pub async fn get(pool: &PgPool, user_id: i64, id: i64) -> Result<Option<RecipeRow>> {
        let row = sqlx::query_as::<_, RecipeRow>(&format!(
            "SELECT {} FROM recipe WHERE id = $1 AND user_id = $2",
            RECIPE_COLUMNS
        ))
        .bind(id)
        .bind(user_id)
        .fetch_optional(pool)
        .await
        .context("Failed to get recipe")?;
        Ok(row)
    }

    /// List the user's recipes, newest id first
    pub async fn list(
        pool: &PgPool,
        user_id: i64,
        filter: &RecipeFilter,
    ) -> Result<Vec<RecipeRow>> {
        let rows = sqlx::query_as::<_, RecipeRow>(&format!(
            r#"SELECT {} FROM recipe r
               WHERE r.user_id = $1
                 AND ($2::BIGINT[] IS NULL OR EXISTS (
                     SELECT 1 FROM recipe_tag rt
                     WHERE rt.recipe_id = r.id AND rt.tag_id = ANY($2)))
                 AND ($3::BIGINT[] IS NULL OR EXISTS (
                     SELECT 1 FROM recipe_ingredient ri
                     WHERE ri.recipe_id = r.id AND ri.ingredient_id = ANY($3)))
               ORDER BY r.id DESC"#,
            RECIPE_COLUMNS
        ))
        .bind(user_id)
        .bind(filter.tag_ids.as_deref())
        .bind(filter.ingredient_ids.as_deref())
        .fetch_all(pool)
        .await
        .context("Failed to list recipes")?;
        Ok(rows)
    }

    pub async fn update(
        conn: &mut PgConnection,
        user_id: i64,
        id: i64,
        changes: &RecipeChanges<'_>,
    ) -> Result<Option<RecipeRow>> {
        let row = sqlx::query_as::<_, RecipeRow>(&format!(
            r#"UPDATE recipe SET
                 title = COALESCE($3, title),
                 time_minutes = COALESCE($4, time_minutes),
                 price = COALESCE($5, price),
                 link = COALESCE($6, link),
                 description = COALESCE($7, description),
                 updated_at = NOW()
               WHERE id = $1 AND user_id = $2
               RETURNING {}"#,
            RECIPE_COLUMNS
        ))
        .bind(id)
        .bind(user_id)
        .bind(changes.title)
        .bind(changes.time_minutes)
        .bind(changes.price)
        .bind(changes.link)
        .bind(changes.description)
        .fetch_optional(conn)
        .await
        .context("Failed to update recipe")?;
        Ok(row)
    }

    /// Point the recipe at a new image path. Returns the updated row, or
    /// `None` when the recipe is not the user's.
    pub async fn set_image(
        pool: &PgPool,
        user_id: i64,
        id: i64,
        image: Option<&str>,
    ) -> Result<Option<ImageChange>> {
        let mut tx = pool.begin().await.context("Failed to begin transaction")?;

        // Row lock serializes concurrent swaps, so each one sees the
        // image the previous swap stored.
        let previous: Option<(Option<String>,)> = sqlx::query_as(
            "SELECT image FROM recipe WHERE id = $1 AND user_id = $2 FOR UPDATE",
        )
        .bind(id)
        .bind(user_id)
        .fetch_optional(&mut *tx)
        .await
        .context("Failed to lock recipe")?;
        let Some((previous,)) = previous else {
            return Ok(None);
        };

        let recipe = sqlx::query_as::<_, RecipeRow>(&format!(
            r#"UPDATE recipe SET image = $2, updated_at = NOW()
               WHERE id = $1
               RETURNING {}"#,
            RECIPE_COLUMNS
        ))
        .bind(id)
        .bind(image)
        .fetch_one(&mut *tx)
        .await
        .context("Failed to set recipe image")?;

        tx.commit().await.context("Failed to commit recipe image")?;
        Ok(Some(ImageChange { recipe, previous }))
    }

    /// Delete one of the user's recipes, returning the removed row.
    pub async fn delete(pool: &PgPool, user_id: i64, id: i64) -> Result<Option<RecipeRow>> {
        let row = sqlx::query_as::<_, RecipeRow>(&format!(
            "DELETE FROM recipe WHERE id = $1 AND user_id = $2 RETURNING {}",
            RECIPE_COLUMNS
        ))
        .bind(id)
        .bind(user_id)
        .fetch_optional(pool)
        .await
        .context("Failed to delete recipe")?;
        Ok(row)
    }
}
