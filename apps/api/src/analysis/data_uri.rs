//! Parsing for `data:<mime>;base64,<payload>` image descriptors sent by the upload widget.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use thiserror::Error;

/// Largest decoded image accepted, matching the dashboard's upload limit.
pub const MAX_IMAGE_BYTES: usize = 4 * 1024 * 1024;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum DataUriError {
    #[error("must be a data URI starting with 'data:'")]
    MissingScheme,

    #[error("must be base64 encoded ('data:<mimetype>;base64,<data>')")]
    NotBase64,

    #[error("must be an image, got '{0}'")]
    NotAnImage(String),

    #[error("contains no image data")]
    Empty,

    #[error("is not valid base64: {0}")]
    InvalidBase64(String),

    #[error("image is {size} bytes, the limit is {max} bytes")]
    TooLarge { size: usize, max: usize },
}

/// A validated image data URI. Borrows from the original string.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageDataUri<'a> {
    pub mime_type: &'a str,
    /// Raw base64 text, passed through to the provider untouched.
    pub payload: &'a str,
    pub decoded_len: usize,
}

/// Parses and bounds an image data URI.
///
/// Accepts optional media-type parameters (`data:image/png;name=a.png;base64,...`);
/// only the leading `type/subtype` is checked.
pub fn parse_image_data_uri(input: &str) -> Result<ImageDataUri<'_>, DataUriError> {
    let rest = input
        .trim()
        .strip_prefix("data:")
        .ok_or(DataUriError::MissingScheme)?;

    let (header, payload) = rest.split_once(',').ok_or(DataUriError::NotBase64)?;
    let media = header
        .strip_suffix(";base64")
        .ok_or(DataUriError::NotBase64)?;

    let mime_type = media.split(';').next().unwrap_or_default().trim();
    let is_image = mime_type
        .strip_prefix("image/")
        .is_some_and(|subtype| !subtype.is_empty());
    if !is_image {
        return Err(DataUriError::NotAnImage(mime_type.to_string()));
    }

    if payload.is_empty() {
        return Err(DataUriError::Empty);
    }

    let decoded = STANDARD
        .decode(payload)
        .map_err(|e| DataUriError::InvalidBase64(e.to_string()))?;
    if decoded.is_empty() {
        return Err(DataUriError::Empty);
    }
    if decoded.len() > MAX_IMAGE_BYTES {
        return Err(DataUriError::TooLarge {
            size: decoded.len(),
            max: MAX_IMAGE_BYTES,
        });
    }

    Ok(ImageDataUri {
        mime_type,
        payload,
        decoded_len: decoded.len(),
    })
}
