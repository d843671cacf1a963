//! Bootcamp photo storage
//!
//! Uploads are streamed into a uniquely named `.part` file in the upload
//! directory and renamed into place once complete, so a reader never sees a
//! half-written photo and concurrent uploads for one bootcamp never share a file.

use std::path::{Path, PathBuf};

use crate::config::UploadsConfig;
use crate::error::{Error, Result};

/// Prefix of every stored photo name
pub const PHOTO_PREFIX: &str = "photo_";

/// Filesystem storage for uploaded photos
#[derive(Debug, Clone)]
pub struct PhotoStorage {
    dir: PathBuf,
    max_bytes: u64,
}

impl PhotoStorage {
    /// Build from the uploads configuration
    pub fn new(config: &UploadsConfig) -> Self {
        Self {
            dir: config.dir.clone(),
            max_bytes: config.max_file_upload_bytes,
        }
    }

    /// Directory photos are written to and served from
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Largest accepted photo in bytes
    pub fn max_bytes(&self) -> u64 {
        self.max_bytes
    }

    /// `photo_<id><ext>`, keeping the extension of the uploaded file name
    pub fn file_name(bootcamp_id: &str, original: Option<&str>) -> String {
        let ext = original
            .and_then(|name| Path::new(name).extension())
            .and_then(|ext| ext.to_str())
            .filter(|ext| !ext.is_empty() && ext.chars().all(|c| c.is_ascii_alphanumeric()))
            .map(|ext| format!(".{}", ext.to_ascii_lowercase()))
            .unwrap_or_default();
        format!("{PHOTO_PREFIX}{bootcamp_id}{ext}")
    }

    /// Reject a photo larger than the configured limit
    pub fn check_size(&self, size: u64) -> Result<()> {
        if size > self.max_bytes {
            return Err(Error::BadRequest(format!(
                "Please upload an image less than {} bytes",
                self.max_bytes
            )));
        }
        Ok(())
    }

    /// Write `bytes` to `name` atomically and return the final path
    pub async fn store(&self, name: &str, bytes: &[u8]) -> Result<PathBuf> {
        self.check_size(bytes.len() as u64)?;
        tokio::fs::create_dir_all(&self.dir).await?;

        let target = self.dir.join(name);
        let staging = self
            .dir
            .join(format!(".{name}.{}.part", uuid::Uuid::now_v7().simple()));

        if let Err(err) = tokio::fs::write(&staging, bytes).await {
            let _ = tokio::fs::remove_file(&staging).await;
            return Err(err.into());
        }
        if let Err(err) = tokio::fs::rename(&staging, &target).await {
            let _ = tokio::fs::remove_file(&staging).await;
            return Err(err.into());
        }

        tracing::info!(path = %target.display(), bytes = bytes.len(), "photo stored");
        Ok(target)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn storage(dir: &Path, max: u64) -> PhotoStorage {
        PhotoStorage::new(&UploadsConfig {
            dir: dir.to_path_buf(),
            max_file_upload_bytes: max,
        })
    }

    #[test]
    fn test_file_name() {
        assert_eq!(PhotoStorage::file_name("abc", Some("me.JPG")), "photo_abc.jpg");
        assert_eq!(PhotoStorage::file_name("abc", Some("noext")), "photo_abc");
        assert_eq!(PhotoStorage::file_name("abc", Some("../../x.p/ng")), "photo_abc");
        assert_eq!(PhotoStorage::file_name("abc", None), "photo_abc");
    }

    #[tokio::test]
    async fn test_store_and_overwrite() {
        let dir = tempfile::tempdir().unwrap();
        let photos = storage(dir.path(), 16);

        let path = photos.store("photo_a.png", b"first").await.unwrap();
        photos.store("photo_a.png", b"second").await.unwrap();
        assert_eq!(tokio::fs::read(&path).await.unwrap(), b"second");

        let leftovers: Vec<_> = std::fs::read_dir(dir.path())
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_name().to_string_lossy().ends_with(".part"))
            .collect();
        assert!(leftovers.is_empty());
    }

    #[tokio::test]
    async fn test_oversize_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let photos = storage(dir.path(), 4);
        let err = photos.store("photo_a.png", b"too large").await.unwrap_err();
        assert!(matches!(err, Error::BadRequest(_)));
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }
}
