use std::io::Cursor;

use ::image::{ImageFormat, ImageReader};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use thiserror::Error;

use crate::error::AppError;

/// Namespace recipe photos are stored under in the media store.
pub const RECIPE_IMAGE_NAMESPACE: &str = "recipes/images";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ImageError {
    #[error("image must be a data URL of the form data:image/<type>;base64,<payload>")]
    NotDataUrl,
    #[error("image payload is not valid base64")]
    BadPayload,
    #[error("image payload is empty")]
    Empty,
    #[error("payload is not a PNG, JPEG, GIF or WebP image")]
    NotAnImage,
    #[error("unsupported image format {0}")]
    UnsupportedFormat(String),
    #[error("image header is corrupt")]
    Corrupt,
}

impl From<ImageError> for AppError {
    fn from(err: ImageError) -> Self {
        AppError::Validation(format!("Invalid image: {err}"))
    }
}

/// A decoded upload, ready for the media store.
#[derive(Debug, PartialEq, Eq)]
pub struct DecodedImage {
    pub extension: &'static str,
    pub bytes: Vec<u8>,
}

/// Raster formats accepted for recipe photos, with the extension they are stored under.
fn stored_extension(format: ImageFormat) -> Result<&'static str, ImageError> {
    match format {
        ImageFormat::Png => Ok("png"),
        ImageFormat::Jpeg => Ok("jpg"),
        ImageFormat::Gif => Ok("gif"),
        ImageFormat::WebP => Ok("webp"),
        other => Err(ImageError::UnsupportedFormat(format!("{other:?}"))),
    }
}

/// Decode a `data:image/<type>;base64,<payload>` string.
///
/// The declared type is not trusted: the format is sniffed from the payload's
/// signature and its header must parse. The extension follows the sniffed format.
pub fn decode_data_url(data_url: &str) -> Result<DecodedImage, ImageError> {
    let rest = data_url
        .trim()
        .strip_prefix("data:")
        .ok_or(ImageError::NotDataUrl)?;
    let (mime, payload) = rest.split_once(";base64,").ok_or(ImageError::NotDataUrl)?;
    if !mime.to_ascii_lowercase().starts_with("image/") {
        return Err(ImageError::NotDataUrl);
    }

    let bytes = STANDARD
        .decode(payload.trim())
        .map_err(|_| ImageError::BadPayload)?;
    if bytes.is_empty() {
        return Err(ImageError::Empty);
    }

    let format = ::image::guess_format(&bytes).map_err(|_| ImageError::NotAnImage)?;
    let extension = stored_extension(format)?;

    ImageReader::with_format(Cursor::new(bytes.as_slice()), format)
        .into_dimensions()
        .map_err(|_| ImageError::Corrupt)?;

    Ok(DecodedImage { extension, bytes })
}

/// Public URL of a stored media key.
pub fn media_url(public_url: &str, key: &str) -> String {
    format!("{}/{}", public_url.trim_end_matches('/'), key)
}
