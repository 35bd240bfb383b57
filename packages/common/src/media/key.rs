use std::fmt;
use std::path::PathBuf;

use super::error::MediaError;
use super::hash::MediaHash;

/// Location of a stored file relative to the media root.
///
/// Rendered as `{namespace}/{shard prefix}/{shard suffix}.{extension}`, e.g.
/// `recipes/images/3f/a1...9c.png`. This string is what gets persisted in the
/// database and appended to the public media URL.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct MediaKey {
    namespace: String,
    hash: MediaHash,
    extension: String,
}

impl MediaKey {
    pub fn new(namespace: &str, hash: MediaHash, extension: &str) -> Result<Self, MediaError> {
        let namespace = namespace.trim_matches('/');
        if namespace.is_empty()
            || namespace
                .split('/')
                .any(|seg| seg.is_empty() || seg == "." || seg == "..")
        {
            return Err(MediaError::InvalidKey(format!("bad namespace '{namespace}'")));
        }
        if !namespace
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '/' | '_' | '-'))
        {
            return Err(MediaError::InvalidKey(format!("bad namespace '{namespace}'")));
        }

        let extension = extension.to_ascii_lowercase();
        if extension.is_empty()
            || extension.len() > 8
            || !extension.chars().all(|c| c.is_ascii_alphanumeric())
        {
            return Err(MediaError::InvalidKey(format!("bad extension '{extension}'")));
        }

        Ok(Self {
            namespace: namespace.to_string(),
            hash,
            extension,
        })
    }

    /// Parse a key previously produced by [`MediaKey::as_path`].
    pub fn parse(path: &str) -> Result<Self, MediaError> {
        let invalid = || MediaError::InvalidKey(path.to_string());

        let (dir, file) = path.rsplit_once('/').ok_or_else(invalid)?;
        let (namespace, prefix) = dir.rsplit_once('/').ok_or_else(invalid)?;
        let (suffix, extension) = file.split_once('.').ok_or_else(invalid)?;

        let hash = MediaHash::from_hex(&format!("{prefix}{suffix}")).map_err(|_| invalid())?;
        Self::new(namespace, hash, extension)
    }

    pub fn as_path(&self) -> String {
        format!(
            "{}/{}/{}.{}",
            self.namespace,
            self.hash.shard_prefix(),
            self.hash.shard_suffix(),
            self.extension
        )
    }

    /// Filesystem location under `root`.
    pub fn to_path_buf(&self, root: &std::path::Path) -> PathBuf {
        let mut path = root.to_path_buf();
        for seg in self.namespace.split('/') {
            path.push(seg);
        }
        path.push(self.hash.shard_prefix());
        path.push(format!("{}.{}", self.hash.shard_suffix(), self.extension));
        path
    }
}

impl fmt::Debug for MediaKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "MediaKey({})", self.as_path())
    }
}

impl fmt::Display for MediaKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.as_path())
    }
}
