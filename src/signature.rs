//! Operator-signature pipeline: fetch, trim, fit, centre, clip.
//!
//! The raw image comes from the signature folder on the remote store (or a
//! per-record payload). Before drawing, surrounding blank canvas is trimmed
//! away so a small scrawl is not rendered as a tiny mark in an empty cell,
//! then the image is fitted and centred inside a margin-shrunk cell and
//! clipped to the unshrunk cell so it can never cross a gridline.

use crate::canvas::{Canvas, RectMm};
use crate::store::ObjectStore;
use anyhow::{Context, Result};
use base64::engine::general_purpose::STANDARD as BASE64_STANDARD;
use base64::Engine;
use image::RgbaImage;
use regex::Regex;

/// Store folder holding the operator signature image.
pub const SIGNATURE_FOLDER: &str = "Firma_OSA";

#[derive(Debug, Clone, Copy)]
pub struct SignatureOptions {
    /// Inner margin (mm) shaved off every side of the destination cell.
    pub margin: f32,
    /// Centre the scaled image inside the shrunk cell.
    pub center: bool,
    /// Extra uniform shrink, clamped to [0.5, 1.0].
    pub scale: f32,
    /// Trim surrounding blank canvas before fitting.
    pub trim: bool,
    /// A pixel counts as blank when every channel is at or above this.
    pub white_threshold: u8,
    /// A pixel counts as transparent at or below this alpha.
    pub alpha_threshold: u8,
}

impl Default for SignatureOptions {
    fn default() -> Self {
        Self {
            margin: 0.8,
            center: true,
            scale: 0.95,
            trim: true,
            white_threshold: 250,
            alpha_threshold: 10,
        }
    }
}

/// Decode PNG or JPEG signature bytes into a raster.
pub fn decode(bytes: &[u8]) -> Result<RgbaImage> {
    let decoded = image::load_from_memory(bytes).context("decode signature image")?;
    Ok(decoded.to_rgba8())
}

/// Decode a per-record signature payload: base64 image bytes, with or
/// without a `data:image/...;base64,` prefix.
pub fn decode_payload(payload: &str) -> Result<RgbaImage> {
    let encoded = match payload.split_once(',') {
        Some((prefix, rest)) if prefix.starts_with("data:") => rest,
        _ => payload,
    };
    let bytes = BASE64_STANDARD
        .decode(encoded.trim())
        .context("decode signature payload base64")?;
    decode(&bytes)
}

/// Bounding box (left, top, right, bottom) of pixels that are opaque enough
/// and not near-white. `None` when nothing qualifies.
fn content_bounds(image: &RgbaImage, options: &SignatureOptions) -> Option<(u32, u32, u32, u32)> {
    let mut bounds: Option<(u32, u32, u32, u32)> = None;
    for (x, y, pixel) in image.enumerate_pixels() {
        let [r, g, b, a] = pixel.0;
        let opaque = a > options.alpha_threshold;
        let inked =
            r < options.white_threshold || g < options.white_threshold || b < options.white_threshold;
        if !(opaque && inked) {
            continue;
        }
        bounds = Some(match bounds {
            None => (x, y, x, y),
            Some((left, top, right, bottom)) => {
                (left.min(x), top.min(y), right.max(x), bottom.max(y))
            }
        });
    }
    bounds
}

/// Crop to the inked bounding box; the original image when no pixel
/// qualifies or the box degenerates to a line.
pub fn trim(image: &RgbaImage, options: &SignatureOptions) -> RgbaImage {
    match content_bounds(image, options) {
        Some((left, top, right, bottom)) if right > left && bottom > top => {
            image::imageops::crop_imm(image, left, top, right - left + 1, bottom - top + 1)
                .to_image()
        }
        _ => image.clone(),
    }
}

/// Largest aspect-preserving placement of a `natural_w x natural_h` image
/// inside the margin-shrunk `dest`, scaled down once more and optionally
/// centred.
pub(crate) fn placement(
    natural_w: u32,
    natural_h: u32,
    dest: RectMm,
    options: &SignatureOptions,
) -> RectMm {
    let margin = options.margin.max(0.0);
    let box_x = dest.x + margin;
    let box_y = dest.y + margin;
    let box_w = (dest.w - margin * 2.0).max(0.1);
    let box_h = (dest.h - margin * 2.0).max(0.1);

    let ratio_img = natural_w.max(1) as f32 / natural_h.max(1) as f32;
    let ratio_box = box_w / box_h;
    let (mut draw_w, mut draw_h) = if ratio_img > ratio_box {
        (box_w, box_w / ratio_img)
    } else {
        (box_h * ratio_img, box_h)
    };

    let scale = options.scale.clamp(0.5, 1.0);
    draw_w *= scale;
    draw_h *= scale;

    let (offset_x, offset_y) = if options.center {
        ((box_w - draw_w) / 2.0, (box_h - draw_h) / 2.0)
    } else {
        (0.0, 0.0)
    };
    RectMm::new(box_x + offset_x, box_y + offset_y, draw_w, draw_h)
}

/// Place the signature into `dest`, clipped to the unshrunk cell. Returns
/// false when nothing was drawn; the caller falls back to a text marker.
pub fn composite_into<C: Canvas>(
    canvas: &mut C,
    image: &RgbaImage,
    dest: RectMm,
    options: &SignatureOptions,
) -> bool {
    let prepared = if options.trim {
        trim(image, options)
    } else {
        image.clone()
    };
    let target = placement(prepared.width(), prepared.height(), dest, options);
    canvas.push_clip(dest);
    let drawn = canvas.image(&prepared, target);
    canvas.pop_clip();
    match drawn {
        Ok(()) => true,
        Err(err) => {
            tracing::warn!(error = %err, "signature draw failed; falling back to text marker");
            false
        }
    }
}

/// Fetch the operator signature bytes from the store's signature folder:
/// the first PNG/JPEG entry, if the folder and a file exist.
pub fn fetch(store: &dyn ObjectStore, root_id: &str) -> Result<Option<Vec<u8>>> {
    let Some(folder) = store.find_by_name(SIGNATURE_FOLDER, Some(root_id))? else {
        return Ok(None);
    };
    let pattern = Regex::new(r"(?i)\.(png|jpe?g)$").context("compile signature file pattern")?;
    let files = store.list(Some(&folder.id))?;
    let Some(file) = files
        .iter()
        .find(|file| !file.is_folder && pattern.is_match(&file.name))
    else {
        return Ok(None);
    };
    let bytes = store.download(&file.id)?;
    Ok(Some(bytes))
}
