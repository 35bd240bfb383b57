pub mod media;

pub use media::{FilesystemMediaStore, MediaError, MediaHash, MediaKey, MediaStore};
