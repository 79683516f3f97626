use crate::consts::{MAX_ZOOM, MIN_ZOOM};
use crate::image_state::ImageState;
use crate::transform::{Adjustments, QualityTier};

use super::error::EditorError;

/// Which edit-class operation is running.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LoadingStage {
    Optimizing,
    ApplyingEdit,
    PreparingDownload,
}

impl std::fmt::Display for LoadingStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Optimizing => write!(f, "Optimizing image…"),
            Self::ApplyingEdit => write!(f, "Applying AI edit…"),
            Self::PreparingDownload => write!(f, "Preparing download…"),
        }
    }
}

/// Pan/zoom transform of the inspection view.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Viewport {
    pub scale: f32,
    pub offset_x: f32,
    pub offset_y: f32,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            scale: MIN_ZOOM,
            offset_x: 0.0,
            offset_y: 0.0,
        }
    }
}

impl Viewport {
    /// Set the zoom level, clamped to [1, 10]. Back at 1x the view recentres.
    pub fn set_zoom(&mut self, scale: f32) {
        self.scale = if scale.is_finite() {
            scale.clamp(MIN_ZOOM, MAX_ZOOM)
        } else {
            MIN_ZOOM
        };
        if self.scale <= MIN_ZOOM {
            self.offset_x = 0.0;
            self.offset_y = 0.0;
        }
    }

    pub fn zoom_by(&mut self, factor: f32) {
        self.set_zoom(self.scale * factor);
    }

    /// Translate the view. Ignored at 1x, where the image fits the view.
    pub fn pan(&mut self, dx: f32, dy: f32) {
        if self.scale > MIN_ZOOM {
            self.offset_x += dx;
            self.offset_y += dy;
        }
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }

    pub fn is_reset(&self) -> bool {
        *self == Self::default()
    }
}

/// Exported image waiting to be saved or shared.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PendingDownload {
    pub image: ImageState,
    pub tier: QualityTier,
}

/// Ephemeral editor state. Never persisted.
#[derive(Debug, Default)]
pub struct EditorUiState {
    /// Running edit-class operation (None = idle).
    pub loading: Option<LoadingStage>,
    /// Main error slot: edits, uploads, exports, sharing.
    pub error: Option<EditorError>,

    pub suggestions: Vec<String>,
    pub suggestions_loading: bool,
    pub suggestion_error: Option<String>,

    pub voice_active: bool,
    pub voice_error: Option<String>,

    pub adjustments: Adjustments,
    pub viewport: Viewport,
    /// Show the original instead of the current version.
    pub comparing: bool,

    pub pending_download: Option<PendingDownload>,
}

impl EditorUiState {
    pub fn is_busy(&self) -> bool {
        self.loading.is_some()
    }

    /// Human-readable label of the running operation.
    pub fn loading_label(&self) -> Option<String> {
        self.loading.map(|stage| stage.to_string())
    }

    pub(super) fn begin(&mut self, stage: LoadingStage) {
        self.loading = Some(stage);
        self.error = None;
    }

    pub(super) fn finish(&mut self) {
        self.loading = None;
    }

    /// Neutral view: no adjustment, no zoom, no comparison.
    pub(super) fn reset_view(&mut self) {
        self.adjustments.reset();
        self.viewport.reset();
        self.comparing = false;
    }

    pub(super) fn reset_for_new_session(&mut self) {
        self.error = None;
        self.suggestions.clear();
        self.suggestion_error = None;
        self.voice_error = None;
        self.pending_download = None;
        self.reset_view();
    }
}
