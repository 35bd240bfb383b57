use async_trait::async_trait;

use super::error::MediaError;
use super::key::MediaKey;

/// Content-addressed storage for uploaded media.
#[async_trait]
pub trait MediaStore: Send + Sync {
    /// Store bytes under `namespace` and return the key they can be read back with.
    ///
    /// Storing identical bytes twice returns the same key.
    async fn put(
        &self,
        namespace: &str,
        extension: &str,
        data: &[u8],
    ) -> Result<MediaKey, MediaError>;

    /// Returns `true` if the file was deleted, `false` if it did not exist.
    async fn delete(&self, key: &MediaKey) -> Result<bool, MediaError>;
}
