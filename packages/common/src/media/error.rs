use thiserror::Error;

/// Errors that can occur while storing or deleting media files.
#[derive(Debug, Error)]
pub enum MediaError {
    #[error("media IO error: {0}")]
    Io(#[from] std::io::Error),
    /// A stored path could not be parsed back into a key.
    #[error("invalid media key: {0}")]
    InvalidKey(String),
    #[error("media exceeds size limit ({actual} > {limit} bytes)")]
    TooLarge { actual: u64, limit: u64 },
}
