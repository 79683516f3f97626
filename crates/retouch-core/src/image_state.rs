use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use serde::{Deserialize, Serialize};

use crate::error::{Result, RetouchError};

const BASE64_MARKER: &str = ";base64,";

/// One immutable version of the edited image.
///
/// The content is always a base64 data URI (`data:<type>;base64,<payload>`),
/// which is also the shape persisted to session storage:
/// `{"dataUrl": "...", "mimeType": "..."}`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawImageState")]
pub struct ImageState {
    #[serde(rename = "dataUrl")]
    content: String,
    #[serde(rename = "mimeType")]
    media_type: String,
}

/// Unvalidated wire form, checked by `TryFrom` on deserialization.
#[derive(Deserialize)]
struct RawImageState {
    #[serde(rename = "dataUrl")]
    content: String,
    #[serde(rename = "mimeType")]
    media_type: String,
}

impl TryFrom<RawImageState> for ImageState {
    type Error = RetouchError;

    fn try_from(raw: RawImageState) -> Result<Self> {
        Self::from_parts(raw.content, raw.media_type)
    }
}

impl ImageState {
    /// Encode raw image bytes as a new state.
    pub fn from_bytes(bytes: &[u8], media_type: impl Into<String>) -> Self {
        Self::from_base64(BASE64.encode(bytes), media_type)
    }

    /// Wrap an already base64-encoded payload (as returned by the model).
    pub fn from_base64(payload: impl AsRef<str>, media_type: impl Into<String>) -> Self {
        let media_type = media_type.into();
        let content = format!("data:{media_type}{BASE64_MARKER}{}", payload.as_ref());
        Self {
            content,
            media_type,
        }
    }

    /// Parse a `data:<type>;base64,<payload>` URI.
    pub fn from_data_uri(uri: &str) -> Result<Self> {
        let media_type = uri
            .strip_prefix("data:")
            .and_then(|rest| rest.split_once(BASE64_MARKER))
            .map(|(media_type, _)| media_type.to_string())
            .ok_or_else(|| RetouchError::InvalidDataUri(truncate(uri)))?;
        Self::from_parts(uri.to_string(), media_type)
    }

    /// Rebuild a state from its persisted fields. The content must be a
    /// base64 data URI and the media type must be non-empty.
    pub fn from_parts(content: String, media_type: String) -> Result<Self> {
        if media_type.trim().is_empty() {
            return Err(RetouchError::UnsupportedMediaType(media_type));
        }
        let well_formed = content
            .strip_prefix("data:")
            .is_some_and(|rest| rest.contains(BASE64_MARKER));
        if !well_formed {
            return Err(RetouchError::InvalidDataUri(truncate(&content)));
        }
        Ok(Self {
            content,
            media_type,
        })
    }

    pub fn data_uri(&self) -> &str {
        &self.content
    }

    pub fn media_type(&self) -> &str {
        &self.media_type
    }

    /// The base64 payload after the data URI header.
    pub fn base64_payload(&self) -> &str {
        self.content
            .split_once(BASE64_MARKER)
            .map(|(_, payload)| payload)
            .unwrap_or_default()
    }

    /// Decode the payload back into raw image bytes.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        Ok(BASE64.decode(self.base64_payload())?)
    }

    /// Approximate decoded size in bytes.
    pub fn byte_len(&self) -> usize {
        self.base64_payload().len() / 4 * 3
    }

    /// File extension matching the media type, for exports.
    pub fn file_extension(&self) -> &'static str {
        extension_for_media_type(&self.media_type)
    }
}

pub fn extension_for_media_type(media_type: &str) -> &'static str {
    match media_type {
        "image/jpeg" | "image/jpg" => "jpg",
        "image/webp" => "webp",
        "image/gif" => "gif",
        "image/bmp" => "bmp",
        "image/tiff" => "tiff",
        _ => "png",
    }
}

/// Guess the media type of raw bytes from their magic number.
pub fn sniff_media_type(bytes: &[u8]) -> Option<&'static str> {
    image::guess_format(bytes).ok().map(|f| f.to_mime_type())
}

fn truncate(s: &str) -> String {
    s.chars().take(48).collect()
}
