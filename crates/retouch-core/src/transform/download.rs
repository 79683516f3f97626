use tracing::{debug, warn};

use crate::config::ExportConfig;
use crate::error::Result;
use crate::image_state::ImageState;

use super::adjust::{apply_visual_adjustment, Adjustments};
use super::codec::{decode, encode, fit_within, lossy_target};
use super::QualityTier;

/// Recompress an image for download at the given tier.
///
/// Never fails: on any decode/encode error the input is returned unchanged.
pub fn compress_for_download(
    state: &ImageState,
    tier: QualityTier,
    config: &ExportConfig,
) -> ImageState {
    let settings = config.tier(tier);

    let img = match decode(state) {
        Ok(img) => img,
        Err(e) => {
            warn!(error = %e, %tier, "Download compression skipped: cannot decode");
            return state.clone();
        }
    };

    let source = fit_within(&img, settings.max_dimension).unwrap_or(img);
    match encode(&source, lossy_target(&source), settings.quality) {
        Ok((bytes, media_type)) => {
            debug!(
                %tier,
                width = source.width(),
                height = source.height(),
                bytes = bytes.len(),
                "Compressed for download"
            );
            ImageState::from_bytes(&bytes, media_type)
        }
        Err(e) => {
            warn!(error = %e, %tier, "Download compression failed; using original");
            state.clone()
        }
    }
}

/// Produce the exported file: visual adjustment first, then compression.
///
/// Only the adjustment step can fail (undecodable source).
pub fn prepare_download(
    state: &ImageState,
    adjustments: Adjustments,
    tier: QualityTier,
    config: &ExportConfig,
) -> Result<ImageState> {
    let adjusted = apply_visual_adjustment(state, adjustments.brightness, adjustments.contrast)?;
    Ok(compress_for_download(&adjusted, tier, config))
}
