use tracing::{debug, warn};

use crate::config::UploadConfig;

use super::codec::{encode, fit_within, lossy_target};

/// Downscale and re-encode an upload before it enters the history.
///
/// Never fails: when the input cannot be decoded or re-encoded, the
/// original bytes and media type come back unchanged.
pub fn optimize_for_upload(
    bytes: Vec<u8>,
    media_type: &str,
    config: &UploadConfig,
) -> (Vec<u8>, String) {
    let img = match image::load_from_memory(&bytes) {
        Ok(img) => img,
        Err(e) => {
            warn!(error = %e, media_type, "Upload optimization skipped: cannot decode");
            return (bytes, media_type.to_string());
        }
    };

    let resized = fit_within(&img, config.max_dimension);
    let web_friendly = matches!(media_type, "image/jpeg" | "image/png");
    if resized.is_none() && web_friendly {
        debug!(width = img.width(), height = img.height(), "Upload already within limits");
        return (bytes, media_type.to_string());
    }

    let source = resized.as_ref().unwrap_or(&img);
    match encode(source, lossy_target(source), config.jpeg_quality) {
        Ok((encoded, encoded_type)) => {
            debug!(
                from = bytes.len(),
                to = encoded.len(),
                width = source.width(),
                height = source.height(),
                "Upload optimized"
            );
            (encoded, encoded_type.to_string())
        }
        Err(e) => {
            warn!(error = %e, "Upload optimization failed; using original");
            (bytes, media_type.to_string())
        }
    }
}
