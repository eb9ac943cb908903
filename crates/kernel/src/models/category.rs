//! Blog categories and the post/category association.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

/// A blog category.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Category {
    pub id: Uuid,
    pub name: String,
    pub slug: String,
    pub description: String,
    pub display_order: i32,
    pub created_at: DateTime<Utc>,
}

/// Category with the number of posts in it.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct CategoryWithCount {
    pub id: Uuid,
    pub name: String,
    pub slug: String,
    pub description: String,
    pub display_order: i32,
    pub post_count: i64,
}

/// Input for creating or editing a category.
#[derive(Debug, Clone, Deserialize)]
pub struct CategoryInput {
    pub name: String,
    /// Derived from the name when absent.
    pub slug: Option<String>,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub display_order: i32,
}

const COLUMNS: &str = "id, name, slug, description, display_order, created_at";

impl Category {
    /// All categories with total post counts, in display order.
    pub async fn list_with_counts(pool: &PgPool) -> Result<Vec<CategoryWithCount>> {
        let categories = sqlx::query_as::<_, CategoryWithCount>(
            r#"
            SELECT c.id, c.name, c.slug, c.description, c.display_order,
                   COUNT(pc.post_id) AS post_count
            FROM categories c
            LEFT JOIN post_categories pc ON pc.category_id = c.id
            GROUP BY c.id
            ORDER BY c.display_order, c.name
            "#,
        )
        .fetch_all(pool)
        .await
        .context("failed to list categories")?;

        Ok(categories)
    }

    /// Categories with counts of published posts only.
    pub async fn list_public(pool: &PgPool) -> Result<Vec<CategoryWithCount>> {
        let categories = sqlx::query_as::<_, CategoryWithCount>(
            r#"
            SELECT c.id, c.name, c.slug, c.description, c.display_order,
                   COUNT(p.id) AS post_count
            FROM categories c
            LEFT JOIN post_categories pc ON pc.category_id = c.id
            LEFT JOIN posts p ON p.id = pc.post_id AND p.state = 'published'
            GROUP BY c.id
            ORDER BY c.display_order, c.name
            "#,
        )
        .fetch_all(pool)
        .await
        .context("failed to list public categories")?;

        Ok(categories)
    }

    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Self>> {
        let sql = format!("SELECT {COLUMNS} FROM categories WHERE id = $1");
        let category = sqlx::query_as::<_, Category>(&sql)
            .bind(id)
            .fetch_optional(pool)
            .await
            .context("failed to fetch category")?;

        Ok(category)
    }

    pub async fn find_by_slug(pool: &PgPool, slug: &str) -> Result<Option<Self>> {
        let sql = format!("SELECT {COLUMNS} FROM categories WHERE slug = $1");
        let category = sqlx::query_as::<_, Category>(&sql)
            .bind(slug)
            .fetch_optional(pool)
            .await
            .context("failed to fetch category by slug")?;

        Ok(category)
    }

    /// Whether `name` or `slug` is used by a category other than `exclude`.
    pub async fn conflicts(
        pool: &PgPool,
        name: &str,
        slug: &str,
        exclude: Option<Uuid>,
    ) -> Result<(bool, bool)> {
        let row: (bool, bool) = sqlx::query_as(
            r#"
            SELECT
                EXISTS(SELECT 1 FROM categories WHERE lower(name) = lower($1) AND ($3::uuid IS NULL OR id <> $3)),
                EXISTS(SELECT 1 FROM categories WHERE slug = $2 AND ($3::uuid IS NULL OR id <> $3))
            "#,
        )
        .bind(name)
        .bind(slug)
        .bind(exclude)
        .fetch_one(pool)
        .await
        .context("failed to check category uniqueness")?;

        Ok(row)
    }

    pub async fn create(
        pool: &PgPool,
        name: &str,
        slug: &str,
        description: &str,
        display_order: i32,
    ) -> Result<Self> {
        let sql = format!(
            "INSERT INTO categories (id, name, slug, description, display_order) \
             VALUES ($1, $2, $3, $4, $5) RETURNING {COLUMNS}"
        );
        let category = sqlx::query_as::<_, Category>(&sql)
            .bind(Uuid::now_v7())
            .bind(name)
            .bind(slug)
            .bind(description)
            .bind(display_order)
            .fetch_one(pool)
            .await
            .context("failed to create category")?;

        Ok(category)
    }

    pub async fn update(
        pool: &PgPool,
        id: Uuid,
        name: &str,
        slug: &str,
        description: &str,
        display_order: i32,
    ) -> Result<Option<Self>> {
        let sql = format!(
            "UPDATE categories SET name = $1, slug = $2, description = $3, display_order = $4 \
             WHERE id = $5 RETURNING {COLUMNS}"
        );
        let category = sqlx::query_as::<_, Category>(&sql)
            .bind(name)
            .bind(slug)
            .bind(description)
            .bind(display_order)
            .bind(id)
            .fetch_optional(pool)
            .await
            .context("failed to update category")?;

        Ok(category)
    }

    pub async fn delete(pool: &PgPool, id: Uuid) -> Result<bool> {
        let result = sqlx::query("DELETE FROM categories WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await
            .context("failed to delete category")?;

        Ok(result.rows_affected() > 0)
    }

    /// Categories attached to a post.
    pub async fn list_for_post(pool: &PgPool, post_id: Uuid) -> Result<Vec<Self>> {
        let categories = sqlx::query_as::<_, Category>(
            r#"
            SELECT c.id, c.name, c.slug, c.description, c.display_order, c.created_at
            FROM categories c
            JOIN post_categories pc ON pc.category_id = c.id
            WHERE pc.post_id = $1
            ORDER BY c.display_order, c.name
            "#,
        )
        .bind(post_id)
        .fetch_all(pool)
        .await
        .context("failed to list post categories")?;

        Ok(categories)
    }

    /// Replace a post's categories. Unknown category ids are ignored.
    pub async fn set_for_post(pool: &PgPool, post_id: Uuid, category_ids: &[Uuid]) -> Result<()> {
        let mut tx = pool.begin().await.context("failed to begin transaction")?;

        sqlx::query("DELETE FROM post_categories WHERE post_id = $1")
            .bind(post_id)
            .execute(&mut *tx)
            .await
            .context("failed to clear post categories")?;

        sqlx::query(
            "INSERT INTO post_categories (post_id, category_id) \
             SELECT $1, id FROM categories WHERE id = ANY($2)",
        )
        .bind(post_id)
        .bind(category_ids)
        .execute(&mut *tx)
        .await
        .context("failed to set post categories")?;

        tx.commit().await.context("failed to commit post categories")?;
        Ok(())
    }
}
