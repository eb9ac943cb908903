//! Media library service.
//!
//! Handles uploads, metadata edits, deletion, and the explicit reconciliation
//! pass that removes records whose stored file has disappeared.

use std::collections::HashSet;
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use serde::Serialize;
use sqlx::PgPool;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::storage::FileStorage;
use crate::models::media::{MediaCategory, MediaFile, NewMediaFile, file_stem, human_size};

/// Maximum upload size (10 MB).
pub const MAX_FILE_SIZE: usize = 10 * 1024 * 1024;

/// One file received from a multipart upload.
#[derive(Debug, Clone)]
pub struct IncomingFile {
    pub filename: String,
    /// Content type declared by the client, if any.
    pub declared_type: Option<String>,
    pub data: Vec<u8>,
}

/// Upload response entry.
#[derive(Debug, Clone, Serialize)]
pub struct UploadResult {
    pub id: Uuid,
    pub filename: String,
    pub url: String,
    #[serde(rename = "type")]
    pub category: MediaCategory,
    pub size: String,
    pub mime_type: String,
}

/// Outcome of a reconciliation pass.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ReconcileReport {
    pub checked: usize,
    pub removed: u64,
}

/// Media library service.
#[derive(Clone)]
pub struct MediaService {
    inner: Arc<MediaServiceInner>,
}

struct MediaServiceInner {
    pool: PgPool,
    storage: Arc<dyn FileStorage>,
}

impl MediaService {
    pub fn new(pool: PgPool, storage: Arc<dyn FileStorage>) -> Self {
        Self {
            inner: Arc::new(MediaServiceInner { pool, storage }),
        }
    }

    pub fn storage(&self) -> &Arc<dyn FileStorage> {
        &self.inner.storage
    }

    pub fn public_url(&self, file: &MediaFile) -> String {
        self.inner.storage.public_url(&file.uri)
    }

    /// Store each file and create its record.
    ///
    /// All files are size-checked before anything is written.
    pub async fn upload(&self, files: Vec<IncomingFile>) -> Result<Vec<UploadResult>> {
        for file in &files {
            check_size(file)?;
        }

        let mut results = Vec::with_capacity(files.len());
        for file in files {
            let mime_type = detect_mime(&file.filename, file.declared_type.as_deref(), &file.data);
            let uri = self.inner.storage.generate_uri(&file.filename);

            self.inner
                .storage
                .write(&uri, &file.data)
                .await
                .context("failed to write file to storage")?;

            let record = MediaFile::insert(
                &self.inner.pool,
                NewMediaFile {
                    uri,
                    alt_text: file_stem(&file.filename).to_string(),
                    category: MediaCategory::from_filename(&file.filename),
                    filename: file.filename,
                    mime_type,
                    size: i64::try_from(file.data.len()).unwrap_or(i64::MAX),
                },
            )
            .await?;

            debug!(id = %record.id, uri = %record.uri, size = record.size, "media uploaded");
            results.push(UploadResult {
                id: record.id,
                url: self.public_url(&record),
                size: human_size(record.size),
                category: record.category,
                filename: record.filename,
                mime_type: record.mime_type,
            });
        }

        info!(count = results.len(), "media upload complete");
        Ok(results)
    }

    /// Delete one record and its stored file.
    ///
    /// Storage errors are logged; the record is removed regardless.
    pub async fn delete(&self, id: Uuid) -> Result<bool> {
        let Some(file) = MediaFile::find_by_id(&self.inner.pool, id).await? else {
            return Ok(false);
        };

        self.remove_stored(&file).await;
        let removed = MediaFile::delete_rows(&self.inner.pool, &[id]).await?;
        Ok(removed > 0)
    }

    /// Delete many records; unknown ids are skipped. Returns records removed.
    pub async fn delete_many(&self, ids: &[Uuid]) -> Result<u64> {
        if ids.is_empty() {
            return Ok(0);
        }

        let files = MediaFile::find_many(&self.inner.pool, ids).await?;
        for file in &files {
            self.remove_stored(file).await;
        }

        let found: Vec<Uuid> = files.iter().map(|f| f.id).collect();
        let removed = MediaFile::delete_rows(&self.inner.pool, &found).await?;
        info!(requested = ids.len(), removed, "media bulk delete");
        Ok(removed)
    }

    /// Remove every record whose stored file no longer exists.
    pub async fn reconcile(&self) -> Result<ReconcileReport> {
        let records = MediaFile::all_uris(&self.inner.pool).await?;
        let checked = records.len();
        let orphans = find_orphans(self.inner.storage.as_ref(), &records).await;

        let removed = if orphans.is_empty() {
            0
        } else {
            MediaFile::delete_rows(&self.inner.pool, &orphans).await?
        };

        info!(checked, removed, "media reconciliation complete");
        Ok(ReconcileReport { checked, removed })
    }

    /// Create records for stored files that have none. Returns files added.
    pub async fn import_untracked(&self) -> Result<usize> {
        let known: HashSet<String> = MediaFile::all_uris(&self.inner.pool)
            .await?
            .into_iter()
            .map(|(_, uri)| uri)
            .collect();
        let stored = self.inner.storage.list().await?;

        let mut added = 0;
        for uri in stored.into_iter().filter(|u| !known.contains(u)) {
            let size = match self.inner.storage.size(&uri).await {
                Ok(size) => i64::try_from(size).unwrap_or(i64::MAX),
                Err(e) => {
                    warn!(error = %e, uri = %uri, "skipping unreadable media file");
                    continue;
                }
            };
            let filename = uri.rsplit('/').next().unwrap_or(&uri).to_string();
            MediaFile::insert(
                &self.inner.pool,
                NewMediaFile {
                    alt_text: file_stem(&filename).to_string(),
                    category: MediaCategory::from_filename(&filename),
                    mime_type: mime_from_extension(&filename).to_string(),
                    size,
                    filename,
                    uri: uri.clone(),
                },
            )
            .await?;
            info!(uri = %uri, "imported untracked media file");
            added += 1;
        }

        Ok(added)
    }

    async fn remove_stored(&self, file: &MediaFile) {
        if let Err(e) = self.inner.storage.delete(&file.uri).await {
            warn!(error = %e, uri = %file.uri, "failed to delete file from storage");
        }
    }
}

impl std::fmt::Debug for MediaService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MediaService").finish()
    }
}

/// Ids of records whose file is missing from storage.
///
/// A storage error while checking keeps the record.
pub async fn find_orphans(storage: &dyn FileStorage, records: &[(Uuid, String)]) -> Vec<Uuid> {
    let mut orphans = Vec::new();
    for (id, uri) in records {
        match storage.exists(uri).await {
            Ok(true) => {}
            Ok(false) => {
                debug!(id = %id, uri = %uri, "media file missing");
                orphans.push(*id);
            }
            Err(e) => warn!(error = %e, uri = %uri, "could not check media file"),
        }
    }
    orphans
}

pub(crate) fn check_size(file: &IncomingFile) -> Result<()> {
    if file.data.len() > MAX_FILE_SIZE {
        bail!(
            "{} is too large: {} bytes (max {} bytes)",
            file.filename,
            file.data.len(),
            MAX_FILE_SIZE
        );
    }
    Ok(())
}

/// MIME type sniffed from content, else declared by the client, else
/// guessed from the extension.
pub fn detect_mime(filename: &str, declared: Option<&str>, data: &[u8]) -> String {
    if let Some(kind) = infer::get(data) {
        return kind.mime_type().to_string();
    }
    match declared {
        Some(d) if !d.is_empty() && d != "application/octet-stream" => d.to_string(),
        _ => mime_from_extension(filename).to_string(),
    }
}

fn mime_from_extension(filename: &str) -> &'static str {
    match crate::models::media::extension(filename)
        .to_ascii_lowercase()
        .as_str()
    {
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "svg" => "image/svg+xml",
        "bmp" => "image/bmp",
        "mp4" => "video/mp4",
        "mov" => "video/quicktime",
        "mp3" => "audio/mpeg",
        "wav" => "audio/wav",
        "ogg" => "audio/ogg",
        "pdf" => "application/pdf",
        "txt" => "text/plain",
        "csv" => "text/csv",
        "rtf" => "application/rtf",
        "doc" => "application/msword",
        "docx" => "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
        "xls" => "application/vnd.ms-excel",
        "xlsx" => "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
        _ => "application/octet-stream",
    }
}

/// Sanitize a filename for safe storage.
pub(crate) fn sanitize_filename(filename: &str) -> String {
    use std::path::Path;

    let name = Path::new(filename)
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or(filename);

    name.chars()
        .map(|c| match c {
            'a'..='z' | 'A'..='Z' | '0'..='9' | '.' | '-' | '_' => c,
            _ => '_',
        })
        .take(200)
        .collect()
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn sanitize_strips_paths_and_odd_chars() {
        assert_eq!(sanitize_filename("test.jpg"), "test.jpg");
        assert_eq!(sanitize_filename("my file.jpg"), "my_file.jpg");
        assert_eq!(sanitize_filename("../../etc/passwd"), "passwd");
        assert_eq!(sanitize_filename("test<script>.jpg"), "test_script_.jpg");
        assert!(!sanitize_filename("..%2F..%2Fetc").contains('%'));
    }

    #[test]
    fn oversize_upload_rejected() {
        let big = IncomingFile {
            filename: "big.bin".to_string(),
            declared_type: None,
            data: vec![0; MAX_FILE_SIZE + 1],
        };
        assert!(check_size(&big).is_err());

        let ok = IncomingFile {
            filename: "ok.bin".to_string(),
            declared_type: None,
            data: vec![0; 16],
        };
        assert!(check_size(&ok).is_ok());
    }

    #[test]
    fn mime_sniffed_before_extension() {
        let png = [0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A, 0, 0, 0, 0];
        assert_eq!(detect_mime("wrong.txt", None, &png), "image/png");
        assert_eq!(detect_mime("notes.txt", None, b"hello"), "text/plain");
        assert_eq!(
            detect_mime("data.bin", Some("application/x-custom"), b"hello"),
            "application/x-custom"
        );
        assert_eq!(
            detect_mime("data.bin", Some("application/octet-stream"), b"hello"),
            "application/octet-stream"
        );
    }
}
