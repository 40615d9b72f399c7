//! Inlining small variants as data URIs.
//!
//! Only a variant adopted by the current reference is a candidate. SVG is
//! inlined as compact percent-encoded markup, WebP as base64. JPEG and PNG
//! are never inlined.

use crate::context::RunContext;
use crate::format::ImageFormat;
use crate::html::ImgElement;
use crate::imaging::{CompressedVariant, svg};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;

/// Data URI for a variant, when its format can be inlined.
pub fn data_uri(variant: &CompressedVariant) -> Option<String> {
    match variant.format {
        ImageFormat::Svg => Some(svg::to_data_uri(&String::from_utf8_lossy(&variant.data))),
        ImageFormat::Webp => Some(format!(
            "data:{};base64,{}",
            variant.format.mime(),
            STANDARD.encode(&variant.data)
        )),
        ImageFormat::Jpg | ImageFormat::Pjpg | ImageFormat::Png => None,
    }
}

/// Inline `variant` into `img` when it is at most `embed_size` bytes.
///
/// Returns whether the image is now embedded.
pub fn embed(
    img: &mut ImgElement,
    variant: &CompressedVariant,
    original_size: u64,
    embed_size: u64,
    ctx: &mut RunContext,
) -> bool {
    if variant.len() > embed_size {
        return false;
    }
    let Some(uri) = data_uri(variant) else {
        return false;
    };

    img.set("src", uri);
    img.remove("loading");
    img.remove("decoding");
    ctx.report_summary(
        format!("{}->embed", variant.format.extension()),
        original_size,
        variant.len(),
    );
    true
}
