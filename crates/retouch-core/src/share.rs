use thiserror::Error;

use crate::image_state::ImageState;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ShareError {
    #[error("sharing is not supported")]
    Unsupported,

    #[error("share failed: {0}")]
    Failed(String),
}

/// Destination for an exported image (share sheet, clipboard, ...).
pub trait ShareTarget {
    fn share(&self, image: &ImageState, file_name: &str) -> Result<(), ShareError>;
}

/// Target used when the platform offers no share capability.
pub struct NoShare;

impl ShareTarget for NoShare {
    fn share(&self, _image: &ImageState, _file_name: &str) -> Result<(), ShareError> {
        Err(ShareError::Unsupported)
    }
}
