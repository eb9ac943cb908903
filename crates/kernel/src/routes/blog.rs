//! Public blog routes: listing, search, author pages and the slug resolver.

use std::collections::HashMap;

use axum::extract::{Path, Query, State};
use axum::routing::get;
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::warn;
use uuid::Uuid;

use crate::content::text;
use crate::error::{AppError, AppResult};
use crate::models::category::CategoryWithCount;
use crate::models::comment::DEFAULT_VISIBLE_COMMENTS;
use crate::models::user::AuthorSummary;
use crate::models::{Category, Comment, CommentThread, ContentItem, ContentKind, User};
use crate::routes::helpers::{PageQuery, Paged, Pagination, non_blank};
use crate::state::AppState;

const BLOG_PAGE_SIZE: i64 = 4;
const FEATURED_POSTS: i64 = 3;
const SEARCH_PAGE_SIZE: i64 = 9;
const AUTHOR_PAGE_SIZE: i64 = 9;
const CATEGORY_PAGE_SIZE: i64 = 6;
const RELATED_POSTS: i64 = 4;
const CARD_EXCERPT_WORDS: usize = 30;

/// Create the public blog router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/blog", get(index))
        .route("/api/blog/search", get(search))
        .route("/api/blog/categories", get(categories))
        .route("/api/blog/authors/{username}", get(author))
        .route("/api/blog/{slug}", get(resolve))
}

/// Post summary for listings.
#[derive(Debug, Serialize)]
pub struct PostCard {
    pub id: Uuid,
    pub title: String,
    pub slug: String,
    pub excerpt: String,
    pub published_at: Option<DateTime<Utc>>,
    pub read_time: i32,
    pub view_count: i64,
    pub is_featured: bool,
    pub featured_image_id: Option<Uuid>,
    pub author: Option<AuthorSummary>,
}

/// A post or page with its author and categories.
#[derive(Debug, Serialize)]
pub struct ItemView {
    #[serde(flatten)]
    pub item: ContentItem,
    pub author: Option<AuthorSummary>,
    pub categories: Vec<Category>,
}

/// Build the full view of an item.
pub async fn item_view(state: &AppState, item: ContentItem) -> AppResult<ItemView> {
    let author = match item.author_id {
        Some(id) => User::find_by_id(state.db(), id).await?.map(|u| u.summary()),
        None => None,
    };
    let categories = match item.kind {
        ContentKind::Post => Category::list_for_post(state.db(), item.id).await?,
        ContentKind::Page => Vec::new(),
    };

    Ok(ItemView {
        item,
        author,
        categories,
    })
}

/// Summarize posts, loading their authors in one query.
pub async fn post_cards(state: &AppState, items: Vec<ContentItem>) -> AppResult<Vec<PostCard>> {
    let mut author_ids: Vec<Uuid> = items.iter().filter_map(|i| i.author_id).collect();
    author_ids.sort_unstable();
    author_ids.dedup();

    let authors: HashMap<Uuid, AuthorSummary> = User::find_many(state.db(), &author_ids)
        .await?
        .into_iter()
        .map(|u| (u.id, u.summary()))
        .collect();

    Ok(items
        .into_iter()
        .map(|item| PostCard {
            author: item.author_id.and_then(|id| authors.get(&id).cloned()),
            excerpt: item
                .excerpt
                .clone()
                .unwrap_or_else(|| text::excerpt(&item.body, CARD_EXCERPT_WORDS)),
            id: item.id,
            title: item.title,
            slug: item.slug,
            published_at: item.published_at,
            read_time: item.read_time,
            view_count: item.view_count,
            is_featured: item.is_featured,
            featured_image_id: item.featured_image_id,
        })
        .collect())
}

#[derive(Debug, Serialize)]
struct BlogIndex {
    featured: Vec<PostCard>,
    posts: Paged<PostCard>,
}

/// GET /api/blog
///
/// Up to three featured posts are pulled out of the paged listing.
async fn index(
    State(state): State<AppState>,
    Query(query): Query<PageQuery>,
) -> AppResult<Json<BlogIndex>> {
    let featured = ContentItem::featured_posts(state.db(), FEATURED_POSTS).await?;
    let exclude: Vec<Uuid> = featured.iter().map(|p| p.id).collect();

    let pagination = Pagination::new(query.page, BLOG_PAGE_SIZE);
    let (posts, total) = tokio::try_join!(
        ContentItem::list_published_posts(
            state.db(),
            &exclude,
            pagination.limit(),
            pagination.offset()
        ),
        ContentItem::count_published_posts(state.db(), &exclude),
    )?;

    Ok(Json(BlogIndex {
        featured: post_cards(&state, featured).await?,
        posts: pagination.wrap(post_cards(&state, posts).await?, total),
    }))
}

#[derive(Debug, Deserialize)]
struct SearchQuery {
    q: Option<String>,
    page: Option<i64>,
}

#[derive(Debug, Serialize)]
struct SearchResults {
    keyword: String,
    results: Paged<PostCard>,
}

/// GET /api/blog/search?q=
///
/// A blank keyword returns no results.
async fn search(
    State(state): State<AppState>,
    Query(query): Query<SearchQuery>,
) -> AppResult<Json<SearchResults>> {
    let pagination = Pagination::new(query.page, SEARCH_PAGE_SIZE);
    let Some(keyword) = non_blank(query.q) else {
        return Ok(Json(SearchResults {
            keyword: String::new(),
            results: pagination.wrap(Vec::new(), 0),
        }));
    };

    let (posts, total) = tokio::try_join!(
        ContentItem::search_published(
            state.db(),
            &keyword,
            pagination.limit(),
            pagination.offset()
        ),
        ContentItem::count_search(state.db(), &keyword),
    )?;

    Ok(Json(SearchResults {
        keyword,
        results: pagination.wrap(post_cards(&state, posts).await?, total),
    }))
}

/// GET /api/blog/categories
async fn categories(State(state): State<AppState>) -> AppResult<Json<Vec<CategoryWithCount>>> {
    Ok(Json(Category::list_public(state.db()).await?))
}

#[derive(Debug, Serialize)]
struct AuthorPage {
    author: AuthorSummary,
    total_posts: i64,
    posts: Paged<PostCard>,
}

/// GET /api/blog/authors/{username}
async fn author(
    State(state): State<AppState>,
    Path(username): Path<String>,
    Query(query): Query<PageQuery>,
) -> AppResult<Json<AuthorPage>> {
    let user = User::find_by_username(state.db(), &username)
        .await?
        .ok_or(AppError::NotFound)?;

    let pagination = Pagination::new(query.page, AUTHOR_PAGE_SIZE);
    let (posts, total) = tokio::try_join!(
        ContentItem::list_by_author(state.db(), user.id, pagination.limit(), pagination.offset()),
        ContentItem::count_by_author(state.db(), user.id),
    )?;

    Ok(Json(AuthorPage {
        author: user.summary(),
        total_posts: total,
        posts: pagination.wrap(post_cards(&state, posts).await?, total),
    }))
}

#[derive(Debug, Deserialize)]
struct ResolveQuery {
    page: Option<i64>,
    #[serde(default)]
    show_all_comments: bool,
}

/// What a public slug resolved to.
#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
enum Resolved {
    Category {
        category: Category,
        posts: Paged<PostCard>,
    },
    Page {
        page: ItemView,
    },
    Post {
        post: ItemView,
        related: Vec<PostCard>,
        comments: Vec<CommentThread>,
        total_comments: i64,
        show_all_comments: bool,
    },
}

/// GET /api/blog/{slug}
///
/// Categories win over pages, and pages over posts.
async fn resolve(
    State(state): State<AppState>,
    Path(slug): Path<String>,
    Query(query): Query<ResolveQuery>,
) -> AppResult<Json<Resolved>> {
    if let Some(category) = Category::find_by_slug(state.db(), &slug).await? {
        let pagination = Pagination::new(query.page, CATEGORY_PAGE_SIZE);
        let (posts, total) = tokio::try_join!(
            ContentItem::list_in_category(
                state.db(),
                category.id,
                pagination.limit(),
                pagination.offset()
            ),
            ContentItem::count_in_category(state.db(), category.id),
        )?;
        return Ok(Json(Resolved::Category {
            category,
            posts: pagination.wrap(post_cards(&state, posts).await?, total),
        }));
    }

    if let Some(page) =
        ContentItem::find_published_by_slug(state.db(), ContentKind::Page, &slug).await?
    {
        if let Err(e) = ContentItem::increment_views(state.db(), ContentKind::Page, page.id).await {
            warn!(error = %e, id = %page.id, "failed to count page view");
        }
        return Ok(Json(Resolved::Page {
            page: item_view(&state, page).await?,
        }));
    }

    let post = ContentItem::find_published_by_slug(state.db(), ContentKind::Post, &slug)
        .await?
        .ok_or(AppError::NotFound)?;

    if let Err(e) = ContentItem::increment_views(state.db(), ContentKind::Post, post.id).await {
        warn!(error = %e, id = %post.id, "failed to count post view");
    }

    let limit = (!query.show_all_comments).then_some(DEFAULT_VISIBLE_COMMENTS);
    let (related, comments, total_comments) = tokio::try_join!(
        ContentItem::related_posts(state.db(), post.id, RELATED_POSTS),
        Comment::public_threads(state.db(), post.id, limit),
        Comment::count_public(state.db(), post.id),
    )?;

    Ok(Json(Resolved::Post {
        post: item_view(&state, post).await?,
        related: post_cards(&state, related).await?,
        comments,
        total_comments,
        show_all_comments: query.show_all_comments,
    }))
}
