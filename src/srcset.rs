//! Responsive `srcset` generation.
//!
//! Downscaled copies are written next to the source as
//! `<name>@<width>w.<ext>`, in the format the dispatcher chose for the
//! base image. Each output path is produced at most once per run, but every
//! referencing element still lists it.

use crate::context::RunContext;
use crate::dispatch::target_format;
use crate::format::ImageFormat;
use crate::html::ImgElement;
use crate::imaging::calculations::calculate_srcset_steps;
use crate::imaging::{CompressRequest, Dimensions, ImageBackend};
use crate::process::{FileScope, ImageError};
use crate::resource::{Resource, translate_src};

/// `src` of one srcset step: extension replaced by `@<width>w.<ext>`.
///
/// Query strings and fragments are dropped.
pub fn step_src(src: &str, width: u32, format: ImageFormat) -> String {
    let path = src.split(['?', '#']).next().unwrap_or_default();
    let name_start = path.rfind('/').map_or(0, |i| i + 1);
    let stem = match path[name_start..].rfind('.') {
        Some(dot) if dot > 0 => &path[..name_start + dot],
        _ => path,
    };
    format!("{}@{}w.{}", stem, width, format.extension())
}

/// Add a `srcset` to `img` unless it already has one or the source is an SVG.
///
/// `size` is the resolved size of the base image.
pub fn generate_srcset(
    img: &mut ImgElement,
    resource: &Resource,
    size: Dimensions,
    progressive: bool,
    scope: &FileScope,
    backend: &impl ImageBackend,
    ctx: &mut RunContext,
) -> Result<(), ImageError> {
    if resource.is_svg() || img.has("srcset") {
        return Ok(());
    }

    let steps = calculate_srcset_steps(size, scope.config.srcset_min_width);
    if steps.is_empty() {
        return Ok(());
    }

    let format = target_format(progressive);
    let lossless = resource.format() == Some(ImageFormat::Png);
    let mut entries = Vec::with_capacity(steps.len());
    for step in steps {
        let target = step_src(resource.src(), step.width, format);
        let output = translate_src(scope.root, scope.file, &target);

        if ctx.claim_output(&output) {
            let data = resource.data().map_err(|e| scope.read_error(resource, e))?;
            let request = CompressRequest::new(format)
                .resized(step.width, step.height)
                .lossless(lossless);
            let variant = backend
                .compress(data, &request)
                .map_err(|source| ImageError::Backend {
                    src: target.clone(),
                    source,
                })?;
            if let Some(variant) = variant {
                scope.write(&output, &variant.data)?;
            }
        }

        entries.push(format!("{} {}w", target, step.width));
    }

    let current = img.get("src").unwrap_or(resource.src()).to_string();
    img.set(
        "srcset",
        format!("{} {}w, {}", current, size.width, entries.join(", ")),
    );
    Ok(())
}
