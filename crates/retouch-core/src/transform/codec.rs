use std::io::Cursor;

use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::{DynamicImage, ImageFormat};

use crate::error::Result;
use crate::image_state::ImageState;

pub(super) fn decode(state: &ImageState) -> Result<DynamicImage> {
    let bytes = state.to_bytes()?;
    Ok(image::load_from_memory(&bytes)?)
}

/// Downscale so the longest edge fits `max_dimension`, keeping the aspect
/// ratio. Returns `None` when the image already fits.
pub(super) fn fit_within(img: &DynamicImage, max_dimension: u32) -> Option<DynamicImage> {
    if img.width().max(img.height()) <= max_dimension {
        return None;
    }
    Some(img.resize(max_dimension, max_dimension, FilterType::Lanczos3))
}

/// PNG keeps transparency; everything else goes to JPEG.
pub(super) fn lossy_target(img: &DynamicImage) -> ImageFormat {
    if img.color().has_alpha() {
        ImageFormat::Png
    } else {
        ImageFormat::Jpeg
    }
}

/// Encode to `format`, returning the bytes and their media type.
pub(super) fn encode(
    img: &DynamicImage,
    format: ImageFormat,
    quality: u8,
) -> Result<(Vec<u8>, &'static str)> {
    let mut buf = Vec::new();
    let media_type = match format {
        ImageFormat::Jpeg => {
            let rgb = DynamicImage::ImageRgb8(img.to_rgb8());
            let encoder = JpegEncoder::new_with_quality(&mut buf, quality.clamp(1, 100));
            rgb.write_with_encoder(encoder)?;
            ImageFormat::Jpeg.to_mime_type()
        }
        _ => {
            img.write_to(&mut Cursor::new(&mut buf), ImageFormat::Png)?;
            ImageFormat::Png.to_mime_type()
        }
    };
    Ok((buf, media_type))
}
