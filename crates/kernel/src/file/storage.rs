//! File storage backends.

use std::path::{Component, Path, PathBuf};

use anyhow::{Context, Result};
use async_trait::async_trait;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};

use super::service::sanitize_filename;

/// File storage backend trait.
#[async_trait]
pub trait FileStorage: Send + Sync {
    /// Write data to storage at the given URI.
    async fn write(&self, uri: &str, data: &[u8]) -> Result<()>;

    /// Delete a file from storage. Missing files are not an error.
    async fn delete(&self, uri: &str) -> Result<()>;

    /// Check if a file exists. Errors other than "not found" are returned.
    async fn exists(&self, uri: &str) -> Result<bool>;

    /// Size of a stored file in bytes.
    async fn size(&self, uri: &str) -> Result<u64>;

    /// Every stored file's URI.
    async fn list(&self) -> Result<Vec<String>>;

    /// Get the public URL for a file.
    fn public_url(&self, uri: &str) -> String;

    /// Build a fresh, collision-free URI for an uploaded filename.
    fn generate_uri(&self, filename: &str) -> String;
}

/// Local filesystem storage under the uploads directory.
pub struct LocalFileStorage {
    base_path: PathBuf,
    base_url: String,
}

impl LocalFileStorage {
    pub fn new(base_path: impl Into<PathBuf>, base_url: impl Into<String>) -> Self {
        Self {
            base_path: base_path.into(),
            base_url: base_url.into(),
        }
    }

    /// Resolve a `local://` URI to a path under the base directory.
    ///
    /// Rejects `..` components.
    fn parse_uri(&self, uri: &str) -> Result<PathBuf> {
        let path = uri
            .strip_prefix("local://")
            .context("invalid local URI, must start with local://")?;
        for component in Path::new(path).components() {
            if matches!(component, Component::ParentDir) {
                anyhow::bail!("directory traversal not allowed in storage URI");
            }
        }
        Ok(self.base_path.join(path))
    }

    fn to_uri(&self, path: &Path) -> Option<String> {
        let relative = path.strip_prefix(&self.base_path).ok()?;
        let parts: Vec<&str> = relative
            .components()
            .map(|c| c.as_os_str().to_str())
            .collect::<Option<_>>()?;
        Some(format!("local://{}", parts.join("/")))
    }
}

#[async_trait]
impl FileStorage for LocalFileStorage {
    async fn write(&self, uri: &str, data: &[u8]) -> Result<()> {
        let path = self.parse_uri(uri)?;

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .await
                .context("failed to create directories")?;
        }

        let mut file = fs::File::create(&path)
            .await
            .context("failed to create file")?;
        file.write_all(data).await.context("failed to write file")?;
        file.flush().await.context("failed to flush file")?;

        debug!(uri = %uri, path = ?path, size = data.len(), "file written");
        Ok(())
    }

    async fn delete(&self, uri: &str) -> Result<()> {
        let path = self.parse_uri(uri)?;

        if fs::try_exists(&path)
            .await
            .context("failed to check file before deleting")?
        {
            fs::remove_file(&path)
                .await
                .context("failed to delete file")?;
            debug!(uri = %uri, "file deleted");
        } else {
            warn!(uri = %uri, "file not found for deletion");
        }

        Ok(())
    }

    async fn exists(&self, uri: &str) -> Result<bool> {
        let path = self.parse_uri(uri)?;
        fs::try_exists(&path)
            .await
            .with_context(|| format!("failed to check file {}", path.display()))
    }

    async fn size(&self, uri: &str) -> Result<u64> {
        let path = self.parse_uri(uri)?;
        let metadata = fs::metadata(&path)
            .await
            .with_context(|| format!("failed to stat file {}", path.display()))?;
        Ok(metadata.len())
    }

    async fn list(&self) -> Result<Vec<String>> {
        let mut uris = Vec::new();
        if !fs::try_exists(&self.base_path)
            .await
            .context("failed to check uploads directory")?
        {
            return Ok(uris);
        }

        let mut pending = vec![self.base_path.clone()];
        while let Some(dir) = pending.pop() {
            let mut entries = fs::read_dir(&dir)
                .await
                .with_context(|| format!("failed to read directory {}", dir.display()))?;
            while let Some(entry) = entries
                .next_entry()
                .await
                .context("failed to read directory entry")?
            {
                let file_type = entry.file_type().await.context("failed to stat entry")?;
                let path = entry.path();
                if file_type.is_dir() {
                    pending.push(path);
                } else if file_type.is_file() {
                    match self.to_uri(&path) {
                        Some(uri) => uris.push(uri),
                        None => warn!(path = ?path, "skipping file with non-UTF-8 path"),
                    }
                }
            }
        }

        uris.sort();
        Ok(uris)
    }

    fn public_url(&self, uri: &str) -> String {
        let path = uri.strip_prefix("local://").unwrap_or(uri);
        format!("{}/{}", self.base_url.trim_end_matches('/'), path)
    }

    /// `local://uploads/YYYY/MM/<8 hex>_<sanitized name>`
    fn generate_uri(&self, filename: &str) -> String {
        let now = chrono::Utc::now();
        let unique_id = uuid::Uuid::now_v7().simple().to_string();

        format!(
            "local://uploads/{}/{}/{}_{}",
            now.format("%Y"),
            now.format("%m"),
            &unique_id[24..],
            sanitize_filename(filename)
        )
    }
}

impl std::fmt::Debug for LocalFileStorage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocalFileStorage")
            .field("base_path", &self.base_path)
            .field("base_url", &self.base_url)
            .finish()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn generated_uri_keeps_sanitized_name() {
        let storage = LocalFileStorage::new("/tmp/uploads", "/media");
        let uri = storage.generate_uri("my photo.jpg");

        assert!(uri.starts_with("local://uploads/"));
        assert!(uri.ends_with("_my_photo.jpg"));
    }

    #[test]
    fn generated_uris_differ() {
        let storage = LocalFileStorage::new("/tmp/uploads", "/media");
        assert_ne!(storage.generate_uri("a.png"), storage.generate_uri("a.png"));
    }

    #[test]
    fn public_url_joins_base() {
        let storage = LocalFileStorage::new("/tmp/uploads", "https://example.com/media/");
        let url = storage.public_url("local://uploads/2026/02/abc123_test.jpg");

        assert_eq!(url, "https://example.com/media/uploads/2026/02/abc123_test.jpg");
    }

    #[test]
    fn traversal_rejected() {
        let storage = LocalFileStorage::new("/tmp/uploads", "/media");
        assert!(storage.parse_uri("local://../etc/passwd").is_err());
        assert!(storage.parse_uri("s3://bucket/key").is_err());
        assert!(storage.parse_uri("local://uploads/ok.txt").is_ok());
    }
}
