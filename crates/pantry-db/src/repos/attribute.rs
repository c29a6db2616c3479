use anyhow::{Context, Result};
use sqlx::{PgConnection, PgPool};

/// Tags and ingredients share one shape: an owner-scoped name linked to
/// recipes through a join table. The kind selects the tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttributeKind {
    Tag,
    Ingredient,
}

impl AttributeKind {
    pub fn table(self) -> &'static str {
        match self {
            AttributeKind::Tag => "tag",
            AttributeKind::Ingredient => "ingredient",
        }
    }

    pub fn link_table(self) -> &'static str {
        match self {
            AttributeKind::Tag => "recipe_tag",
            AttributeKind::Ingredient => "recipe_ingredient",
        }
    }

    pub fn link_column(self) -> &'static str {
        match self {
            AttributeKind::Tag => "tag_id",
            AttributeKind::Ingredient => "ingredient_id",
        }
    }

    /// Human-readable singular, used in error messages
    pub fn label(self) -> &'static str {
        match self {
            AttributeKind::Tag => "Tag",
            AttributeKind::Ingredient => "Ingredient",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct AttributeRow {
    pub id: i64,
    pub user_id: i64,
    pub name: String,
}

/// An attribute together with the recipe it is linked to
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct LinkedAttributeRow {
    pub recipe_id: i64,
    pub id: i64,
    pub name: String,
}

pub struct AttributeRepo;

impl AttributeRepo {
    /// Plain insert. A name already owned by the user fails with a unique
    /// violation on `(user_id, name)`.
    pub async fn create(
        pool: &PgPool,
        kind: AttributeKind,
        user_id: i64,
        name: &str,
    ) -> Result<AttributeRow> {
        let row = sqlx::query_as::<_, AttributeRow>(&format!(
            "INSERT INTO {} (user_id, name) VALUES ($1, $2) RETURNING id, user_id, name",
            kind.table()
        ))
        .bind(user_id)
        .bind(name)
        .fetch_one(pool)
        .await
        .with_context(|| format!("Failed to create {}", kind.table()))?;
        Ok(row)
    }

    /// Return the user's attribute with this name, creating it if missing.
    ///
    /// A single upsert statement against the `(user_id, name)` constraint, so
    /// concurrent requests resolving the same name converge on one row.
    pub async fn get_or_create(
        conn: &mut PgConnection,
        kind: AttributeKind,
        user_id: i64,
        name: &str,
    ) -> Result<AttributeRow> {
        let row = sqlx::query_as::<_, AttributeRow>(&format!(
            r#"INSERT INTO {} (user_id, name) VALUES ($1, $2)
               ON CONFLICT (user_id, name) DO UPDATE SET name = EXCLUDED.name
               RETURNING id, user_id, name"#,
            kind.table()
        ))
        .bind(user_id)
        .bind(name)
        .fetch_one(conn)
        .await
        .with_context(|| format!("Failed to get or create {}", kind.table()))?;
        Ok(row)
    }

    pub async fn get(
        pool: &PgPool,
        kind: AttributeKind,
        user_id: i64,
        id: i64,
    ) -> Result<Option<AttributeRow>> {
        let row = sqlx::query_as::<_, AttributeRow>(&format!(
            "SELECT id, user_id, name FROM {} WHERE id = $1 AND user_id = $2",
            kind.table()
        ))
        .bind(id)
        .bind(user_id)
        .fetch_optional(pool)
        .await
        .with_context(|| format!("Failed to get {}", kind.table()))?;
        Ok(row)
    }

    /// List the user's attributes by descending name. With `assigned_only`,
    /// only those linked to at least one of the user's recipes; each row is
    /// returned once however many recipes reference it.
    pub async fn list(
        pool: &PgPool,
        kind: AttributeKind,
        user_id: i64,
        assigned_only: bool,
    ) -> Result<Vec<AttributeRow>> {
        let sql = if assigned_only {
            format!(
                r#"SELECT a.id, a.user_id, a.name FROM {table} a
                   WHERE a.user_id = $1 AND EXISTS (
                       SELECT 1 FROM {link} l JOIN recipe r ON r.id = l.recipe_id
                       WHERE l.{column} = a.id AND r.user_id = $1
                   )
                   ORDER BY a.name DESC, a.id DESC"#,
                table = kind.table(),
                link = kind.link_table(),
                column = kind.link_column(),
            )
        } else {
            format!(
                "SELECT id, user_id, name FROM {} WHERE user_id = $1 ORDER BY name DESC, id DESC",
                kind.table()
            )
        };

        let rows = sqlx::query_as::<_, AttributeRow>(&sql)
            .bind(user_id)
            .fetch_all(pool)
            .await
            .with_context(|| format!("Failed to list {}", kind.table()))?;
        Ok(rows)
    }

    pub async fn rename(
        pool: &PgPool,
        kind: AttributeKind,
        user_id: i64,
        id: i64,
        name: &str,
    ) -> Result<Option<AttributeRow>> {
        let row = sqlx::query_as::<_, AttributeRow>(&format!(
            "UPDATE {} SET name = $3 WHERE id = $1 AND user_id = $2 RETURNING id, user_id, name",
            kind.table()
        ))
        .bind(id)
        .bind(user_id)
        .bind(name)
        .fetch_optional(pool)
        .await
        .with_context(|| format!("Failed to rename {}", kind.table()))?;
        Ok(row)
    }

    /// Delete an owned attribute; its recipe links go with it, recipes stay.
    pub async fn delete(
        pool: &PgPool,
        kind: AttributeKind,
        user_id: i64,
        id: i64,
    ) -> Result<bool> {
        let result = sqlx::query(&format!(
            "DELETE FROM {} WHERE id = $1 AND user_id = $2",
            kind.table()
        ))
        .bind(id)
        .bind(user_id)
        .execute(pool)
        .await
        .with_context(|| format!("Failed to delete {}", kind.table()))?;
        Ok(result.rows_affected() > 0)
    }

    /// Attributes linked to any of the given recipes, ordered by name
    pub async fn list_for_recipes(
        pool: &PgPool,
        kind: AttributeKind,
        recipe_ids: &[i64],
    ) -> Result<Vec<LinkedAttributeRow>> {
        if recipe_ids.is_empty() {
            return Ok(Vec::new());
        }
        let rows = sqlx::query_as::<_, LinkedAttributeRow>(&format!(
            r#"SELECT l.recipe_id, a.id, a.name FROM {link} l
               JOIN {table} a ON a.id = l.{column}
               WHERE l.recipe_id = ANY($1)
               ORDER BY a.name, a.id"#,
            link = kind.link_table(),
            table = kind.table(),
            column = kind.link_column(),
        ))
        .bind(recipe_ids)
        .fetch_all(pool)
        .await
        .with_context(|| format!("Failed to list {} links", kind.table()))?;
        Ok(rows)
    }

    /// Replace the recipe's links of this kind with exactly `attribute_ids`.
    /// An empty slice clears the links; attribute rows are never deleted.
    pub async fn set_links(
        conn: &mut PgConnection,
        kind: AttributeKind,
        recipe_id: i64,
        attribute_ids: &[i64],
    ) -> Result<()> {
        sqlx::query(&format!(
            "DELETE FROM {} WHERE recipe_id = $1",
            kind.link_table()
        ))
        .bind(recipe_id)
        .execute(&mut *conn)
        .await
        .with_context(|| format!("Failed to clear {} links", kind.table()))?;

        if attribute_ids.is_empty() {
            return Ok(());
        }

        sqlx::query(&format!(
            r#"INSERT INTO {link} (recipe_id, {column})
               SELECT $1, UNNEST($2::BIGINT[])
               ON CONFLICT DO NOTHING"#,
            link = kind.link_table(),
            column = kind.link_column(),
        ))
        .bind(recipe_id)
        .bind(attribute_ids)
        .execute(&mut *conn)
        .await
        .with_context(|| format!("Failed to link {}", kind.table()))?;
        Ok(())
    }

    /// Link a single attribute to a recipe (no-op when already linked)
    pub async fn add_link(
        pool: &PgPool,
        kind: AttributeKind,
        recipe_id: i64,
        attribute_id: i64,
    ) -> Result<()> {
        sqlx::query(&format!(
            "INSERT INTO {} (recipe_id, {}) VALUES ($1, $2) ON CONFLICT DO NOTHING",
            kind.link_table(),
            kind.link_column()
        ))
        .bind(recipe_id)
        .bind(attribute_id)
        .execute(pool)
        .await
        .with_context(|| format!("Failed to link {}", kind.table()))?;
        Ok(())
    }
}
