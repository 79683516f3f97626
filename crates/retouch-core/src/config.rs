use serde::{Deserialize, Serialize};

use crate::consts::{
    DEFAULT_MODEL_MAX_RETRIES, DEFAULT_MODEL_TIMEOUT_SECS, DEFAULT_UPLOAD_JPEG_QUALITY,
    DEFAULT_UPLOAD_MAX_DIMENSION,
};
use crate::transform::QualityTier;

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct RetouchConfig {
    #[serde(default)]
    pub model: ModelConfig,
    #[serde(default)]
    pub upload: UploadConfig,
    #[serde(default)]
    pub export: ExportConfig,
    #[serde(default)]
    pub editor: EditorConfig,
    #[serde(default)]
    pub voice: VoiceConfig,
    #[serde(default)]
    pub share: ShareConfig,
}

/// Hosted image model settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    /// Base URL of the generative API.
    pub endpoint: String,
    /// Model used for image edits.
    pub edit_model: String,
    /// Model used for edit suggestions.
    pub suggestion_model: String,
    /// Environment variable holding the API key. Read at call time.
    pub api_key_env: String,
    pub timeout_secs: u64,
    /// Retries for transient failures (429, 5xx, transport).
    pub max_retries: u32,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://generativelanguage.googleapis.com/v1beta".into(),
            edit_model: "gemini-2.5-flash-image-preview".into(),
            suggestion_model: "gemini-2.5-flash".into(),
            api_key_env: "GEMINI_API_KEY".into(),
            timeout_secs: DEFAULT_MODEL_TIMEOUT_SECS,
            max_retries: DEFAULT_MODEL_MAX_RETRIES,
        }
    }
}

/// Optimization applied to images before they enter the history.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct UploadConfig {
    /// Longest edge after downscaling (pixels).
    pub max_dimension: u32,
    /// JPEG quality (1..=100) for re-encoded uploads.
    pub jpeg_quality: u8,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            max_dimension: DEFAULT_UPLOAD_MAX_DIMENSION,
            jpeg_quality: DEFAULT_UPLOAD_JPEG_QUALITY,
        }
    }
}

/// Size ceiling and encoder quality for one export tier.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TierSettings {
    pub max_dimension: u32,
    pub quality: u8,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportConfig {
    pub low: TierSettings,
    pub medium: TierSettings,
    pub high: TierSettings,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            low: TierSettings {
                max_dimension: 1024,
                quality: 60,
            },
            medium: TierSettings {
                max_dimension: 2048,
                quality: 80,
            },
            high: TierSettings {
                max_dimension: 4096,
                quality: 92,
            },
        }
    }
}

impl ExportConfig {
    pub fn tier(&self, tier: QualityTier) -> TierSettings {
        match tier {
            QualityTier::Low => self.low,
            QualityTier::Medium => self.medium,
            QualityTier::High => self.high,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct EditorConfig {
    /// Reject undo/redo/reset/clear while an edit, upload or export is in
    /// flight.
    pub lock_history_while_busy: bool,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            lock_history_while_busy: true,
        }
    }
}

/// External speech-to-text program. It must print one transcript per
/// line on stdout; lines starting with `~` are interim results.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct VoiceConfig {
    pub command: Vec<String>,
}

/// External program receiving exported image bytes on stdin (for example
/// a clipboard tool).
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ShareConfig {
    pub command: Vec<String>,
}
