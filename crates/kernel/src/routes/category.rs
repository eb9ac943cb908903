//! Category administration routes.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{get, put};
use axum::{Json, Router};
use tower_sessions::Session;
use tracing::info;
use uuid::Uuid;

use crate::content::slug::{is_reserved, slugify};
use crate::error::{AppError, AppResult, FieldErrors};
use crate::models::category::CategoryWithCount;
use crate::models::{Category, CategoryInput};
use crate::routes::helpers::{Affected, require_admin};
use crate::state::AppState;

/// Create the category router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/admin/categories", get(list).post(create))
        .route("/api/admin/categories/{id}", put(update).delete(destroy))
}

/// Normalized name and slug for a submission.
///
/// A blank slug is derived from the name.
fn normalize(input: &CategoryInput) -> Result<(String, String), FieldErrors> {
    let mut errors = FieldErrors::new();
    let name = input.name.trim().to_string();
    if name.is_empty() {
        errors.insert(
            "name".to_string(),
            vec!["This field is required.".to_string()],
        );
    }

    let source = input
        .slug
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .unwrap_or(&name);
    let slug = slugify(source);
    if slug.is_empty() && !errors.contains_key("name") {
        errors.insert(
            "slug".to_string(),
            vec!["Enter a valid slug.".to_string()],
        );
    }
    if is_reserved(&slug) {
        errors.insert(
            "slug".to_string(),
            vec![format!("\"{slug}\" is reserved by the blog.")],
        );
    }

    if errors.is_empty() {
        Ok((name, slug))
    } else {
        Err(errors)
    }
}

async fn check_unique(
    state: &AppState,
    name: &str,
    slug: &str,
    exclude: Option<Uuid>,
) -> AppResult<()> {
    let (name_taken, slug_taken) = Category::conflicts(state.db(), name, slug, exclude).await?;

    let mut errors = FieldErrors::new();
    if name_taken {
        errors.insert(
            "name".to_string(),
            vec!["A category with this name already exists.".to_string()],
        );
    }
    if slug_taken {
        errors.insert(
            "slug".to_string(),
            vec!["A category with this slug already exists.".to_string()],
        );
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(AppError::Validation(errors))
    }
}

/// GET /api/admin/categories
async fn list(
    State(state): State<AppState>,
    session: Session,
) -> AppResult<Json<Vec<CategoryWithCount>>> {
    require_admin(&state, &session).await?;
    Ok(Json(Category::list_with_counts(state.db()).await?))
}

/// POST /api/admin/categories
async fn create(
    State(state): State<AppState>,
    session: Session,
    Json(input): Json<CategoryInput>,
) -> AppResult<(StatusCode, Json<Category>)> {
    require_admin(&state, &session).await?;
    let (name, slug) = normalize(&input).map_err(AppError::Validation)?;
    check_unique(&state, &name, &slug, None).await?;

    let category = Category::create(
        state.db(),
        &name,
        &slug,
        input.description.trim(),
        input.display_order,
    )
    .await?;

    info!(category_id = %category.id, slug = %category.slug, "category created");
    Ok((StatusCode::CREATED, Json(category)))
}

/// PUT /api/admin/categories/{id}
async fn update(
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<Uuid>,
    Json(input): Json<CategoryInput>,
) -> AppResult<Json<Category>> {
    require_admin(&state, &session).await?;
    let (name, slug) = normalize(&input).map_err(AppError::Validation)?;
    check_unique(&state, &name, &slug, Some(id)).await?;

    let category = Category::update(
        state.db(),
        id,
        &name,
        &slug,
        input.description.trim(),
        input.display_order,
    )
    .await?
    .ok_or(AppError::NotFound)?;

    Ok(Json(category))
}

/// DELETE /api/admin/categories/{id}
///
/// Posts keep existing; only their link to the category goes.
async fn destroy(
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<Uuid>,
) -> AppResult<Json<Affected>> {
    require_admin(&state, &session).await?;

    if !Category::delete(state.db(), id).await? {
        return Err(AppError::NotFound);
    }
    info!(category_id = %id, "category deleted");
    Ok(Json(Affected { affected: 1 }))
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    fn input(name: &str, slug: Option<&str>) -> CategoryInput {
        CategoryInput {
            name: name.to_string(),
            slug: slug.map(str::to_string),
            description: String::new(),
            display_order: 0,
        }
    }

    #[test]
    fn slug_derived_from_name() {
        let (name, slug) = normalize(&input(" Web Design ", None)).unwrap();
        assert_eq!(name, "Web Design");
        assert_eq!(slug, "web-design");
    }

    #[test]
    fn explicit_slug_normalized() {
        let (_, slug) = normalize(&input("News", Some("Latest News!"))).unwrap();
        assert_eq!(slug, "latest-news");
    }

    #[test]
    fn reserved_slugs_rejected() {
        let errors = normalize(&input("Search", None)).unwrap_err();
        assert!(errors.contains_key("slug"));

        let errors = normalize(&input("Archive", Some("categories"))).unwrap_err();
        assert!(errors.contains_key("slug"));

        assert!(normalize(&input("Search Tips", None)).is_ok());
    }

    #[test]
    fn name_required() {
        let errors = normalize(&input("  ", None)).unwrap_err();
        assert!(errors.contains_key("name"));
    }
}
