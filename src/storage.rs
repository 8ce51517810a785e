use crate::config::Config;
use std::path::PathBuf;
use thiserror::Error;
use uuid::Uuid;

/// URL prefix the HTTP layer serves stored photos under.
pub const UPLOAD_URL_PREFIX: &str = "/api/uploads";

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("image store I/O failed: {0}")]
    Io(#[from] std::io::Error),
}

/// Maps an image content type to the stored file extension. `None` means
/// the upload is not an accepted image.
pub fn extension_for(content_type: &str) -> Option<&'static str> {
    match content_type {
        "image/jpeg" => Some("jpg"),
        "image/png" => Some("png"),
        "image/webp" => Some("webp"),
        "image/gif" => Some("gif"),
        _ => None,
    }
}

/// Uniform "store image, get back a retrievable URL" seam. Local disk is the
/// shipped backend; an object-store backend slots in as another variant.
#[derive(Clone)]
pub enum ImageStore {
    LocalDisk(LocalDiskStore),
}

impl ImageStore {
    pub fn local(config: &Config) -> Self {
        ImageStore::LocalDisk(LocalDiskStore::new(&config.upload_dir))
    }

    pub async fn store(&self, bytes: &[u8], extension: &str) -> Result<String, StorageError> {
        match self {
            ImageStore::LocalDisk(store) => store.store(bytes, extension).await,
        }
    }
}

#[derive(Clone)]
pub struct LocalDiskStore {
    dir: PathBuf,
}

impl LocalDiskStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    async fn store(&self, bytes: &[u8], extension: &str) -> Result<String, StorageError> {
        let file_name = format!("{}.{}", Uuid::new_v4(), extension);
        let path = self.dir.join(&file_name);
        tokio::fs::write(&path, bytes).await?;
        Ok(format!("{UPLOAD_URL_PREFIX}/{file_name}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepted_image_types() {
        assert_eq!(extension_for("image/jpeg"), Some("jpg"));
        assert_eq!(extension_for("image/png"), Some("png"));
        assert_eq!(extension_for("application/pdf"), None);
        assert_eq!(extension_for("text/plain"), None);
    }

    #[tokio::test]
    async fn local_store_returns_servable_url() {
        let dir = std::env::temp_dir().join(format!("attend-store-{}", Uuid::new_v4()));
        std::fs::create_dir_all(&dir).unwrap();

        let store = LocalDiskStore::new(&dir);
        let url = store.store(b"not really a jpeg", "jpg").await.unwrap();

        assert!(url.starts_with(UPLOAD_URL_PREFIX));
        assert!(url.ends_with(".jpg"));

        let file_name = url.rsplit('/').next().unwrap();
        assert_eq!(std::fs::read(dir.join(file_name)).unwrap(), b"not really a jpeg");

        std::fs::remove_dir_all(&dir).unwrap();
    }
}
