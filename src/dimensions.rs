//! Final `width`/`height` of an image.
//!
//! Declared sizes are trusted when both are present. A single declared side
//! is completed from the true aspect ratio, never from the other attribute.
//! With nothing declared the true size is used, except for SVGs, which
//! follow the browser's intrinsic sizing rules.

use crate::html::ImgElement;
use crate::imaging::calculations::{
    declared_ratio_matches, derive_missing_side, parse_dimension, round_size, svg_intrinsic_size,
};
use crate::imaging::svg::SvgRoot;
use crate::imaging::{Dimensions, ImageMeta};
use crate::process::ImageError;

/// Declared `width`/`height` attributes, non-numeric ones counting as absent.
pub fn declared_size(img: &ImgElement) -> (Option<u32>, Option<u32>) {
    (
        img.get("width").and_then(parse_dimension),
        img.get("height").and_then(parse_dimension),
    )
}

/// Size resolved for one image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolvedSize {
    pub size: Dimensions,
    /// Declared width and height disagree with the true aspect ratio
    /// (to one decimal). Informational only; nothing is reported.
    pub ratio_mismatch: bool,
}

/// Resolve the size of `img` and write it back as attributes.
///
/// `svg_source` is the raw SVG document when the resource is an SVG.
pub fn resolve_size(
    img: &mut ImgElement,
    src: &str,
    meta: Option<ImageMeta>,
    svg_source: Option<&[u8]>,
) -> Result<ResolvedSize, ImageError> {
    let meta = meta
        .filter(|m| m.width.is_some() || m.height.is_some())
        .ok_or_else(|| ImageError::MetadataUnavailable(src.to_string()))?;

    let (width, height) = declared_size(img);

    let (w, h) = match (width, height) {
        (Some(w), Some(h)) => {
            let ratio_mismatch = h > 0
                && true_ratio(&meta).is_some_and(|ratio| !declared_ratio_matches((w, h), ratio));
            return Ok(ResolvedSize {
                size: Dimensions {
                    width: w,
                    height: h,
                },
                ratio_mismatch,
            });
        }
        (None, None) => match svg_source {
            Some(data) => {
                let root = SvgRoot::parse(data).unwrap_or_default();
                svg_intrinsic_size(
                    root.width.as_deref(),
                    root.height.as_deref(),
                    root.view_box.as_deref(),
                )
            }
            None => {
                let size = meta
                    .dimensions()
                    .ok_or_else(|| ImageError::UnresolvedSize(src.to_string()))?;
                (size.width as f64, size.height as f64)
            }
        },
        _ => {
            let ratio =
                true_ratio(&meta).ok_or_else(|| ImageError::UnresolvedSize(src.to_string()))?;
            derive_missing_side(width, height, ratio)
                .ok_or_else(|| ImageError::UnresolvedSize(src.to_string()))?
        }
    };

    let size = round_size(w, h);
    img.set("width", size.width.to_string());
    img.set("height", size.height.to_string());
    Ok(ResolvedSize {
        size,
        ratio_mismatch: false,
    })
}

fn true_ratio(meta: &ImageMeta) -> Option<f64> {
    let size = meta.dimensions()?;
    let ratio = size.width as f64 / size.height as f64;
    (ratio.is_finite() && ratio > 0.0).then_some(ratio)
}
