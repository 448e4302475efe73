//! Validation of the `image` field returned by the backend.

use serde_json::Value;
use thiserror::Error;

const BASE64_MARKER: &str = "base64,";

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum PayloadError {
    #[error("No image data received from the server")]
    Missing,

    #[error("Invalid image data received")]
    Invalid,
}

/// Drops a data-URI prefix such as `data:image/png;base64,`.
///
/// Keeps everything after the last `base64,` marker; text without the
/// marker is returned as is.
pub fn strip_data_uri_prefix(image: &str) -> &str {
    image
        .rsplit_once(BASE64_MARKER)
        .map(|(_, payload)| payload)
        .unwrap_or(image)
}

/// Returns the displayable base64 payload of an `image` field.
pub fn extract_image(image: Option<&Value>) -> Result<&str, PayloadError> {
    let text = match image {
        None | Some(Value::Null) => return Err(PayloadError::Missing),
        Some(Value::String(text)) => text,
        Some(_) => return Err(PayloadError::Invalid),
    };

    if text.trim().is_empty() {
        return Err(PayloadError::Invalid);
    }

    // A bare prefix passes; the display surface rejects what it cannot decode.
    Ok(strip_data_uri_prefix(text))
}
