use std::time::Duration;

use crate::collab::{CollaboratorError, EditRequest, SuggestionRequest};
use crate::image_state::ImageState;
use crate::transform::{Adjustments, QualityTier};

/// Commands for the edit-class worker (one in flight at a time).
pub(crate) enum EditCommand {
    /// Optimize an uploaded file and turn it into a new session root.
    Optimize { bytes: Vec<u8>, media_type: String },

    /// Apply a text instruction through the image model.
    Edit { request: EditRequest },

    /// Adjust then compress the current image for export.
    PrepareDownload {
        image: ImageState,
        adjustments: Adjustments,
        tier: QualityTier,
    },
}

/// Commands for the suggestion worker.
pub(crate) enum SuggestCommand {
    /// `generation` identifies the session the request was made for.
    Suggest {
        request: SuggestionRequest,
        generation: u64,
    },
}

/// Results sent from the workers back to the editor.
pub(crate) enum WorkerEvent {
    Optimized {
        result: Result<ImageState, String>,
        elapsed: Duration,
    },
    Edited {
        result: Result<ImageState, CollaboratorError>,
        elapsed: Duration,
    },
    Suggested {
        result: Result<Vec<String>, CollaboratorError>,
        generation: u64,
    },
    DownloadReady {
        result: Result<ImageState, String>,
        tier: QualityTier,
    },
}
