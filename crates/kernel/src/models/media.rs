//! Media library records and extension-based classification.

use std::path::Path;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

use crate::db::escape_like;

/// Media category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaCategory {
    Image,
    Document,
    Spreadsheet,
    Video,
    Audio,
    #[default]
    Other,
}

const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "gif", "webp", "svg", "bmp"];
const VIDEO_EXTENSIONS: &[&str] = &["mp4", "mov", "avi", "mkv", "wmv", "flv"];
const AUDIO_EXTENSIONS: &[&str] = &["mp3", "wav", "ogg", "m4a", "flac"];
const DOCUMENT_EXTENSIONS: &[&str] = &["pdf", "docx", "pptx", "doc", "txt", "rtf"];
const SPREADSHEET_EXTENSIONS: &[&str] = &["xlsx", "xls", "csv", "ods"];

impl MediaCategory {
    pub const ALL: [MediaCategory; 6] = [
        MediaCategory::Image,
        MediaCategory::Document,
        MediaCategory::Spreadsheet,
        MediaCategory::Video,
        MediaCategory::Audio,
        MediaCategory::Other,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            MediaCategory::Image => "image",
            MediaCategory::Document => "document",
            MediaCategory::Spreadsheet => "spreadsheet",
            MediaCategory::Video => "video",
            MediaCategory::Audio => "audio",
            MediaCategory::Other => "other",
        }
    }

    /// Infer the category from a filename's extension, case-insensitively.
    pub fn from_filename(filename: &str) -> Self {
        let ext = extension(filename).to_ascii_lowercase();
        let ext = ext.as_str();

        if IMAGE_EXTENSIONS.contains(&ext) {
            MediaCategory::Image
        } else if VIDEO_EXTENSIONS.contains(&ext) {
            MediaCategory::Video
        } else if AUDIO_EXTENSIONS.contains(&ext) {
            MediaCategory::Audio
        } else if DOCUMENT_EXTENSIONS.contains(&ext) {
            MediaCategory::Document
        } else if SPREADSHEET_EXTENSIONS.contains(&ext) {
            MediaCategory::Spreadsheet
        } else {
            MediaCategory::Other
        }
    }

    /// Resolve the category to store: an explicit non-`other` choice wins,
    /// otherwise infer from the filename.
    pub fn resolve(explicit: Option<MediaCategory>, filename: &str) -> Self {
        match explicit {
            Some(category) if category != MediaCategory::Other => category,
            _ => MediaCategory::from_filename(filename),
        }
    }
}

impl From<&str> for MediaCategory {
    fn from(v: &str) -> Self {
        match v {
            "image" => MediaCategory::Image,
            "document" => MediaCategory::Document,
            "spreadsheet" => MediaCategory::Spreadsheet,
            "video" => MediaCategory::Video,
            "audio" => MediaCategory::Audio,
            _ => MediaCategory::Other,
        }
    }
}

/// Extension without the dot, as written.
pub fn extension(filename: &str) -> &str {
    Path::new(filename)
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
}

/// Filename without directory or extension.
pub fn file_stem(filename: &str) -> &str {
    Path::new(filename)
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or(filename)
}

/// Human-readable size with one decimal, e.g. `1.5 KB`.
pub fn human_size(bytes: i64) -> String {
    let mut size = bytes as f64;
    for unit in ["bytes", "KB", "MB", "GB"] {
        if size < 1024.0 {
            return format!("{size:.1} {unit}");
        }
        size /= 1024.0;
    }
    format!("{size:.1} TB")
}

/// Media file record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MediaFile {
    pub id: Uuid,
    /// Storage URI (`local://...`).
    pub uri: String,
    /// Original upload name.
    pub filename: String,
    pub alt_text: String,
    pub description: String,
    pub category: MediaCategory,
    pub mime_type: String,
    pub size: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(sqlx::FromRow)]
struct MediaRow {
    id: Uuid,
    uri: String,
    filename: String,
    alt_text: String,
    description: String,
    category: String,
    mime_type: String,
    size: i64,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<MediaRow> for MediaFile {
    fn from(row: MediaRow) -> Self {
        Self {
            id: row.id,
            uri: row.uri,
            filename: row.filename,
            alt_text: row.alt_text,
            description: row.description,
            category: MediaCategory::from(row.category.as_str()),
            mime_type: row.mime_type,
            size: row.size,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

/// Values for a new media record.
#[derive(Debug, Clone)]
pub struct NewMediaFile {
    pub uri: String,
    pub filename: String,
    pub alt_text: String,
    pub category: MediaCategory,
    pub mime_type: String,
    pub size: i64,
}

/// Library listing filter.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MediaFilter {
    pub category: Option<MediaCategory>,
    /// Matches filename, alt text or description.
    pub search: Option<String>,
}

const COLUMNS: &str =
    "id, uri, filename, alt_text, description, category, mime_type, size, created_at, updated_at";

impl MediaFile {
    pub fn extension(&self) -> String {
        extension(&self.filename).to_ascii_uppercase()
    }

    pub fn human_size(&self) -> String {
        human_size(self.size)
    }

    pub async fn insert(pool: &PgPool, input: NewMediaFile) -> Result<Self> {
        let sql = format!(
            r#"
            INSERT INTO media_files (id, uri, filename, alt_text, category, mime_type, size)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING {COLUMNS}
            "#
        );
        let row = sqlx::query_as::<_, MediaRow>(&sql)
            .bind(Uuid::now_v7())
            .bind(&input.uri)
            .bind(&input.filename)
            .bind(&input.alt_text)
            .bind(input.category.as_str())
            .bind(&input.mime_type)
            .bind(input.size)
            .fetch_one(pool)
            .await
            .context("failed to create media record")?;

        Ok(row.into())
    }

    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Self>> {
        let sql = format!("SELECT {COLUMNS} FROM media_files WHERE id = $1");
        let row = sqlx::query_as::<_, MediaRow>(&sql)
            .bind(id)
            .fetch_optional(pool)
            .await
            .context("failed to fetch media record")?;

        Ok(row.map(Into::into))
    }

    pub async fn find_many(pool: &PgPool, ids: &[Uuid]) -> Result<Vec<Self>> {
        let sql = format!("SELECT {COLUMNS} FROM media_files WHERE id = ANY($1)");
        let rows = sqlx::query_as::<_, MediaRow>(&sql)
            .bind(ids)
            .fetch_all(pool)
            .await
            .context("failed to fetch media records")?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    /// Filtered listing, newest first. Read-only.
    pub async fn list(
        pool: &PgPool,
        filter: &MediaFilter,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Self>> {
        let sql = format!(
            "SELECT {COLUMNS} FROM media_files WHERE {} ORDER BY created_at DESC LIMIT $3 OFFSET $4",
            FILTER_SQL
        );
        let rows = sqlx::query_as::<_, MediaRow>(&sql)
            .bind(filter.category.map(|c| c.as_str()))
            .bind(search_pattern(filter))
            .bind(limit)
            .bind(offset)
            .fetch_all(pool)
            .await
            .context("failed to list media")?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    pub async fn count(pool: &PgPool, filter: &MediaFilter) -> Result<i64> {
        let sql = format!("SELECT COUNT(*) FROM media_files WHERE {FILTER_SQL}");
        let count: i64 = sqlx::query_scalar(&sql)
            .bind(filter.category.map(|c| c.as_str()))
            .bind(search_pattern(filter))
            .fetch_one(pool)
            .await
            .context("failed to count media")?;

        Ok(count)
    }

    /// Record counts per category; categories with no files report 0.
    pub async fn category_counts(pool: &PgPool) -> Result<Vec<(MediaCategory, i64)>> {
        let rows: Vec<(String, i64)> =
            sqlx::query_as("SELECT category, COUNT(*) FROM media_files GROUP BY category")
                .fetch_all(pool)
                .await
                .context("failed to count media by category")?;

        Ok(MediaCategory::ALL
            .iter()
            .map(|cat| {
                let n = rows
                    .iter()
                    .find(|(name, _)| name == cat.as_str())
                    .map_or(0, |(_, n)| *n);
                (*cat, n)
            })
            .collect())
    }

    /// Every record's id and URI, for reconciliation.
    pub async fn all_uris(pool: &PgPool) -> Result<Vec<(Uuid, String)>> {
        let rows: Vec<(Uuid, String)> = sqlx::query_as("SELECT id, uri FROM media_files")
            .fetch_all(pool)
            .await
            .context("failed to list media URIs")?;

        Ok(rows)
    }

    pub async fn update_meta(
        pool: &PgPool,
        id: Uuid,
        alt_text: &str,
        description: &str,
        category: MediaCategory,
    ) -> Result<Option<Self>> {
        let sql = format!(
            "UPDATE media_files SET alt_text = $1, description = $2, category = $3, updated_at = now() \
             WHERE id = $4 RETURNING {COLUMNS}"
        );
        let row = sqlx::query_as::<_, MediaRow>(&sql)
            .bind(alt_text)
            .bind(description)
            .bind(category.as_str())
            .bind(id)
            .fetch_optional(pool)
            .await
            .context("failed to update media record")?;

        Ok(row.map(Into::into))
    }

    pub async fn delete_rows(pool: &PgPool, ids: &[Uuid]) -> Result<u64> {
        let result = sqlx::query("DELETE FROM media_files WHERE id = ANY($1)")
            .bind(ids)
            .execute(pool)
            .await
            .context("failed to delete media records")?;

        Ok(result.rows_affected())
    }
}

/// Parameters: $1 category, $2 search pattern.
const FILTER_SQL: &str = "($1::text IS NULL OR category = $1) \
     AND ($2::text IS NULL OR filename ILIKE $2 OR alt_text ILIKE $2 OR description ILIKE $2)";

fn search_pattern(filter: &MediaFilter) -> Option<String> {
    filter
        .search
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| format!("%{}%", escape_like(s)))
}
