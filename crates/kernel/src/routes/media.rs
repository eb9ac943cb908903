//! Media library routes.

use axum::extract::{DefaultBodyLimit, Multipart, Path, Query, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tower_sessions::Session;
use tracing::{info, warn};
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::file::service::MAX_FILE_SIZE;
use crate::file::{IncomingFile, ReconcileReport, UploadResult};
use crate::models::media::{MediaFilter, human_size};
use crate::models::{MediaCategory, MediaFile};
use crate::routes::helpers::{Paged, Pagination, non_blank, require_admin, require_user};
use crate::state::AppState;

const MEDIA_PAGE_SIZE: i64 = 20;

/// Multipart ceiling for one upload request; per-file size is checked separately.
const UPLOAD_BODY_LIMIT: usize = 25 * 1024 * 1024;

/// Create the media router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/api/admin/media",
            get(library).post(upload).layer(DefaultBodyLimit::max(UPLOAD_BODY_LIMIT)),
        )
        .route("/api/admin/media/bulk-delete", post(bulk_delete))
        .route("/api/admin/media/reconcile", post(reconcile))
        .route("/api/admin/media/import", post(import))
        .route(
            "/api/admin/media/{id}",
            get(detail).put(update).delete(destroy),
        )
}

/// Media record as shown in the library.
#[derive(Debug, Serialize)]
struct MediaView {
    id: Uuid,
    url: String,
    name: String,
    #[serde(rename = "type")]
    category: MediaCategory,
    size: String,
    mime_type: String,
    alt_text: String,
    description: String,
    file_extension: String,
    created_at: DateTime<Utc>,
}

fn media_view(state: &AppState, file: MediaFile) -> MediaView {
    MediaView {
        url: state.media().public_url(&file),
        size: file.human_size(),
        file_extension: file.extension(),
        id: file.id,
        name: file.filename,
        category: file.category,
        mime_type: file.mime_type,
        alt_text: file.alt_text,
        description: file.description,
        created_at: file.created_at,
    }
}

#[derive(Debug, Deserialize)]
struct LibraryQuery {
    /// A category name or `all`.
    #[serde(rename = "type")]
    category: Option<String>,
    search: Option<String>,
    page: Option<i64>,
}

#[derive(Debug, Serialize)]
struct CategoryCount {
    category: &'static str,
    count: i64,
}

#[derive(Debug, Serialize)]
struct LibraryResponse {
    #[serde(flatten)]
    files: Paged<MediaView>,
    counts: Vec<CategoryCount>,
}

/// GET /api/admin/media?type=&search=&page=
///
/// Read-only. Records whose file went missing stay listed until a
/// reconcile pass removes them.
async fn library(
    State(state): State<AppState>,
    session: Session,
    Query(query): Query<LibraryQuery>,
) -> AppResult<Json<LibraryResponse>> {
    require_user(&state, &session).await?;

    let category = match non_blank(query.category).as_deref() {
        None | Some("all") => None,
        Some(name) => Some(MediaCategory::from(name)),
    };
    let filter = MediaFilter {
        category,
        search: non_blank(query.search),
    };
    let pagination = Pagination::new(query.page, MEDIA_PAGE_SIZE);

    let (files, total, per_category) = tokio::try_join!(
        MediaFile::list(state.db(), &filter, pagination.limit(), pagination.offset()),
        MediaFile::count(state.db(), &filter),
        MediaFile::category_counts(state.db()),
    )?;

    let mut counts = vec![CategoryCount {
        category: "all",
        count: per_category.iter().map(|(_, n)| n).sum(),
    }];
    counts.extend(per_category.into_iter().map(|(cat, count)| CategoryCount {
        category: cat.as_str(),
        count,
    }));

    let views = files.into_iter().map(|f| media_view(&state, f)).collect();
    Ok(Json(LibraryResponse {
        files: pagination.wrap(views, total),
        counts,
    }))
}

#[derive(Debug, Serialize)]
struct UploadResponse {
    success: bool,
    files: Vec<UploadResult>,
    message: String,
}

/// POST /api/admin/media (multipart, repeatable `files` field)
async fn upload(
    State(state): State<AppState>,
    session: Session,
    mut multipart: Multipart,
) -> AppResult<Json<UploadResponse>> {
    let user = require_user(&state, &session).await?;

    let mut files = Vec::new();
    loop {
        let field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => break,
            Err(e) => {
                warn!(error = %e, "failed to read multipart field");
                return Err(AppError::BadRequest("malformed upload".to_string()));
            }
        };

        if field.name() != Some("files") {
            continue;
        }

        let filename = field
            .file_name()
            .map(str::to_string)
            .filter(|n| !n.trim().is_empty())
            .ok_or_else(|| AppError::field("files", "Each file needs a name."))?;
        let declared_type = field.content_type().map(str::to_string);

        let data = field.bytes().await.map_err(|e| {
            warn!(error = %e, filename = %filename, "failed to read upload data");
            AppError::BadRequest("failed to read file data".to_string())
        })?;

        if data.len() > MAX_FILE_SIZE {
            return Err(AppError::field(
                "files",
                format!(
                    "{filename} is too large ({}; max {}).",
                    human_size(i64::try_from(data.len()).unwrap_or(i64::MAX)),
                    human_size(MAX_FILE_SIZE as i64)
                ),
            ));
        }

        files.push(IncomingFile {
            filename,
            declared_type,
            data: data.to_vec(),
        });
    }

    if files.is_empty() {
        return Err(AppError::field("files", "No files were uploaded."));
    }

    let uploaded = state.media().upload(files).await?;
    info!(user_id = %user.id, count = uploaded.len(), "media uploaded");

    Ok(Json(UploadResponse {
        success: true,
        message: format!("Successfully uploaded {} file(s)", uploaded.len()),
        files: uploaded,
    }))
}

/// GET /api/admin/media/{id}
async fn detail(
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<Uuid>,
) -> AppResult<Json<MediaView>> {
    require_user(&state, &session).await?;

    let file = MediaFile::find_by_id(state.db(), id)
        .await?
        .ok_or(AppError::NotFound)?;
    Ok(Json(media_view(&state, file)))
}

#[derive(Debug, Deserialize)]
struct UpdateRequest {
    alt_text: Option<String>,
    description: Option<String>,
    #[serde(rename = "type")]
    category: Option<MediaCategory>,
}

/// PUT /api/admin/media/{id}
///
/// Omitted fields keep their value. A category of `other` re-infers from
/// the filename.
async fn update(
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<Uuid>,
    Json(request): Json<UpdateRequest>,
) -> AppResult<Json<MediaView>> {
    require_user(&state, &session).await?;

    let file = MediaFile::find_by_id(state.db(), id)
        .await?
        .ok_or(AppError::NotFound)?;

    let alt_text = request.alt_text.unwrap_or(file.alt_text);
    let description = request.description.unwrap_or(file.description);
    let category = MediaCategory::resolve(request.category.or(Some(file.category)), &file.filename);

    let updated = MediaFile::update_meta(state.db(), id, alt_text.trim(), description.trim(), category)
        .await?
        .ok_or(AppError::NotFound)?;
    Ok(Json(media_view(&state, updated)))
}

#[derive(Debug, Serialize)]
struct DeleteResponse {
    success: bool,
    deleted: u64,
    message: String,
}

/// DELETE /api/admin/media/{id}
async fn destroy(
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<Uuid>,
) -> AppResult<Json<DeleteResponse>> {
    require_user(&state, &session).await?;

    if !state.media().delete(id).await? {
        return Err(AppError::NotFound);
    }
    Ok(Json(DeleteResponse {
        success: true,
        deleted: 1,
        message: "Media deleted successfully".to_string(),
    }))
}

#[derive(Debug, Deserialize)]
struct BulkDeleteRequest {
    #[serde(default, alias = "media_ids")]
    ids: Vec<Uuid>,
}

/// POST /api/admin/media/bulk-delete
///
/// Unknown ids are skipped; the count reports what was removed.
async fn bulk_delete(
    State(state): State<AppState>,
    session: Session,
    Json(request): Json<BulkDeleteRequest>,
) -> AppResult<Json<DeleteResponse>> {
    require_user(&state, &session).await?;
    if request.ids.is_empty() {
        return Err(AppError::BadRequest("no files selected".to_string()));
    }

    let deleted = state.media().delete_many(&request.ids).await?;
    Ok(Json(DeleteResponse {
        success: true,
        deleted,
        message: format!("Successfully deleted {deleted} file(s)"),
    }))
}

/// POST /api/admin/media/reconcile
async fn reconcile(
    State(state): State<AppState>,
    session: Session,
) -> AppResult<Json<ReconcileReport>> {
    let user = require_admin(&state, &session).await?;
    let report = state.media().reconcile().await?;
    info!(user_id = %user.id, checked = report.checked, removed = report.removed, "media reconciled by admin");
    Ok(Json(report))
}

#[derive(Debug, Serialize)]
struct ImportResponse {
    imported: usize,
}

/// POST /api/admin/media/import
///
/// Register stored files that have no record.
async fn import(
    State(state): State<AppState>,
    session: Session,
) -> AppResult<Json<ImportResponse>> {
    require_admin(&state, &session).await?;
    let imported = state.media().import_untracked().await?;
    Ok(Json(ImportResponse { imported }))
}
