mod adjust;
mod codec;
mod download;
mod upload;

use serde::{Deserialize, Serialize};

pub use adjust::{apply_visual_adjustment, Adjustments};
pub use download::{compress_for_download, prepare_download};
pub use upload::optimize_for_upload;

/// Export quality tier. Each tier maps to a size ceiling and encoder
/// quality through [`crate::config::ExportConfig`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QualityTier {
    Low,
    #[default]
    Medium,
    High,
}

impl std::fmt::Display for QualityTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Low => write!(f, "Low"),
            Self::Medium => write!(f, "Medium"),
            Self::High => write!(f, "High"),
        }
    }
}
