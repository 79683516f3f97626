use image::{DynamicImage, ImageFormat};
use rayon::prelude::*;

use crate::consts::{MAX_ADJUSTMENT, NEUTRAL_ADJUSTMENT, PARALLEL_PIXEL_THRESHOLD};
use crate::error::Result;
use crate::image_state::ImageState;

use super::codec::{decode, encode};

/// Quality used when re-encoding an adjusted JPEG.
const ADJUSTED_JPEG_QUALITY: u8 = 95;

/// Brightness/contrast in percent. 100/100 is neutral.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Adjustments {
    pub brightness: u32,
    pub contrast: u32,
}

impl Default for Adjustments {
    fn default() -> Self {
        Self {
            brightness: NEUTRAL_ADJUSTMENT,
            contrast: NEUTRAL_ADJUSTMENT,
        }
    }
}

impl Adjustments {
    pub fn is_neutral(&self) -> bool {
        *self == Self::default()
    }

    pub fn set_brightness(&mut self, pct: u32) {
        self.brightness = pct.min(MAX_ADJUSTMENT);
    }

    pub fn set_contrast(&mut self, pct: u32) {
        self.contrast = pct.min(MAX_ADJUSTMENT);
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// Apply brightness then contrast, with CSS filter semantics:
/// `brightness(b%)` scales each channel by `b/100`, `contrast(c%)` scales
/// around the 0.5 midpoint by `c/100`. Alpha is untouched.
///
/// Returns the input unchanged when both values are neutral; fails when
/// the source cannot be decoded.
pub fn apply_visual_adjustment(
    state: &ImageState,
    brightness_pct: u32,
    contrast_pct: u32,
) -> Result<ImageState> {
    if brightness_pct == NEUTRAL_ADJUSTMENT && contrast_pct == NEUTRAL_ADJUSTMENT {
        return Ok(state.clone());
    }

    let img = decode(state)?;
    let lut = build_lut(brightness_pct, contrast_pct);

    let mut rgba = img.to_rgba8();
    let pixel_count = (rgba.width() * rgba.height()) as usize;
    let apply = |px: &mut [u8]| {
        px[0] = lut[px[0] as usize];
        px[1] = lut[px[1] as usize];
        px[2] = lut[px[2] as usize];
    };
    if pixel_count >= PARALLEL_PIXEL_THRESHOLD {
        rgba.par_chunks_exact_mut(4).for_each(apply);
    } else {
        rgba.chunks_exact_mut(4).for_each(apply);
    }

    let adjusted = DynamicImage::ImageRgba8(rgba);
    let format = if state.media_type() == "image/jpeg" {
        ImageFormat::Jpeg
    } else {
        ImageFormat::Png
    };
    let (bytes, media_type) = encode(&adjusted, format, ADJUSTED_JPEG_QUALITY)?;
    Ok(ImageState::from_bytes(&bytes, media_type))
}

fn build_lut(brightness_pct: u32, contrast_pct: u32) -> [u8; 256] {
    let b = brightness_pct as f32 / 100.0;
    let c = contrast_pct as f32 / 100.0;
    let mut lut = [0u8; 256];
    for (v, out) in lut.iter_mut().enumerate() {
        let x = v as f32 / 255.0 * b;
        let x = (x - 0.5) * c + 0.5;
        *out = (x.clamp(0.0, 1.0) * 255.0).round() as u8;
    }
    lut
}
