//! Local filesystem store for uploaded images.
//!
//! Files land under the media root in date directories with a timestamped
//! file name, e.g. `2026/08/07/20260807T101500123_photo.jpg`. Database rows
//! only carry these root-relative paths.

use std::path::{Component, Path, PathBuf};

use chrono::Utc;
use thiserror::Error;
use tokio::fs;

#[derive(Debug, Error)]
pub enum MediaError {
    /// The stored path points outside the media root.
    #[error("media path {0:?} escapes the media root")]
    InvalidPath(String),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Clone)]
pub struct MediaStore {
    root: PathBuf,
}

impl MediaStore {
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    /// Root directory the store writes under.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Keeps the extension and a recognizable stem, replaces anything the
    /// filesystem might interpret.
    fn sanitize_name(original: &str) -> String {
        let name: String = original
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                    c
                } else {
                    '_'
                }
            })
            .collect();
        let trimmed = name.trim_matches('.');
        if trimmed.is_empty() {
            "upload".to_string()
        } else {
            trimmed.to_string()
        }
    }

    /// Saves an upload and returns its path relative to the media root.
    pub async fn save(&self, original_name: &str, data: &[u8]) -> Result<String, MediaError> {
        let now = Utc::now();
        let rel_dir = now.format("%Y/%m/%d").to_string();
        let file_name = format!(
            "{}_{}",
            now.format("%Y%m%dT%H%M%S%3f"),
            Self::sanitize_name(original_name)
        );

        let dir = self.root.join(&rel_dir);
        fs::create_dir_all(&dir).await?;
        fs::write(dir.join(&file_name), data).await?;

        Ok(format!("{rel_dir}/{file_name}"))
    }

    /// Removes a stored file. A file that is already gone is not an error
    /// (the row may outlive a manually pruned disk).
    pub async fn remove(&self, media_path: &str) -> Result<(), MediaError> {
        let rel = Path::new(media_path);
        if rel.is_absolute()
            || rel
                .components()
                .any(|c| matches!(c, Component::ParentDir | Component::Prefix(_)))
        {
            return Err(MediaError::InvalidPath(media_path.to_string()));
        }

        match fs::remove_file(self.root.join(rel)).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    static NEXT_DIR: AtomicU32 = AtomicU32::new(0);

    fn test_store() -> MediaStore {
        let dir = std::env::temp_dir().join(format!(
            "adboard-media-test-{}-{}",
            std::process::id(),
            NEXT_DIR.fetch_add(1, Ordering::Relaxed)
        ));
        MediaStore::new(dir)
    }

    #[tokio::test]
    async fn test_save_and_remove() {
        let store = test_store();

        let path = store.save("photo.jpg", b"not really a jpeg").await.unwrap();
        assert!(path.ends_with("_photo.jpg"));

        let on_disk = store.root.join(&path);
        assert_eq!(fs::read(&on_disk).await.unwrap(), b"not really a jpeg");

        store.remove(&path).await.unwrap();
        assert!(!on_disk.exists());
    }

    #[tokio::test]
    async fn test_save_sanitizes_hostile_names() {
        let store = test_store();

        let path = store.save("../../etc/pass wd.png", b"x").await.unwrap();
        assert!(!Path::new(&path)
            .components()
            .any(|c| matches!(c, Component::ParentDir)));
        assert!(path.ends_with(".png"));
        assert!(!path.contains(' '));
        assert!(store.root.join(&path).exists());
    }

    #[tokio::test]
    async fn test_remove_missing_file_is_ok() {
        let store = test_store();
        store.remove("2026/01/01/nothing_here.jpg").await.unwrap();
    }

    #[tokio::test]
    async fn test_remove_rejects_traversal() {
        let store = test_store();
        assert!(matches!(
            store.remove("../outside.jpg").await,
            Err(MediaError::InvalidPath(_))
        ));
        assert!(matches!(
            store.remove("/etc/passwd").await,
            Err(MediaError::InvalidPath(_))
        ));
    }
}
