use std::path::PathBuf;

use async_trait::async_trait;
use tokio::fs;

use super::error::MediaError;
use super::hash::MediaHash;
use super::key::MediaKey;
use super::traits::MediaStore;

/// Media store backed by a local directory.
///
/// Files land at `{root}/{namespace}/{2 hex chars}/{62 hex chars}.{ext}`.
/// Writes go to `{root}/.tmp` first and are renamed into place, so readers
/// never observe a half-written file.
pub struct FilesystemMediaStore {
    root: PathBuf,
    max_size: u64,
}

impl FilesystemMediaStore {
    pub async fn new(root: PathBuf, max_size: u64) -> Result<Self, MediaError> {
        fs::create_dir_all(&root).await?;
        fs::create_dir_all(root.join(".tmp")).await?;
        Ok(Self { root, max_size })
    }

    fn temp_path(&self) -> PathBuf {
        self.root
            .join(".tmp")
            .join(uuid::Uuid::new_v4().to_string())
    }
}

#[async_trait]
impl MediaStore for FilesystemMediaStore {
    async fn put(
        &self,
        namespace: &str,
        extension: &str,
        data: &[u8],
    ) -> Result<MediaKey, MediaError> {
        if data.len() as u64 > self.max_size {
            return Err(MediaError::TooLarge {
                actual: data.len() as u64,
                limit: self.max_size,
            });
        }

        let key = MediaKey::new(namespace, MediaHash::compute(data), extension)?;
        let target = key.to_path_buf(&self.root);

        if fs::try_exists(&target).await? {
            return Ok(key);
        }

        let temp_path = self.temp_path();
        if let Err(e) = fs::write(&temp_path, data).await {
            let _ = fs::remove_file(&temp_path).await;
            return Err(e.into());
        }

        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent).await?;
        }

        if let Err(e) = fs::rename(&temp_path, &target).await {
            let _ = fs::remove_file(&temp_path).await;
            return Err(e.into());
        }

        tracing::debug!(key = %key, bytes = data.len(), "Stored media file");
        Ok(key)
    }

    async fn delete(&self, key: &MediaKey) -> Result<bool, MediaError> {
        match fs::remove_file(key.to_path_buf(&self.root)).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }
}
