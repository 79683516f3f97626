use thiserror::Error;

#[derive(Error, Debug)]
pub enum RetouchError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Image format error: {0}")]
    ImageError(#[from] image::ImageError),

    #[error("Invalid base64 payload: {0}")]
    Base64(#[from] base64::DecodeError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid data URI: {0}")]
    InvalidDataUri(String),

    #[error("Unsupported media type: {0}")]
    UnsupportedMediaType(String),

    #[error("Corrupt session snapshot: {0}")]
    CorruptSnapshot(String),

    #[error("Empty image data")]
    EmptyImage,

    #[error("Storage quota exceeded for '{key}' ({size} bytes, limit {limit})")]
    StorageQuota { key: String, size: usize, limit: usize },
}

pub type Result<T> = std::result::Result<T, RetouchError>;
