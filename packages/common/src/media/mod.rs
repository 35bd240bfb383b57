mod error;
mod hash;
mod key;
mod traits;

pub mod filesystem;

pub use error::MediaError;
pub use filesystem::FilesystemMediaStore;
pub use hash::MediaHash;
pub use key::MediaKey;
pub use traits::MediaStore;
