//! Format selection and the canonical compression of a resource.
//!
//! Above the fold, an opaque image becomes a progressive JPEG: it paints
//! early, so it is adopted even when it comes out larger. Everything else
//! becomes WebP and is only adopted when it is smaller than the source.
//!
//! Each source file is compressed once per run. Later references reuse the
//! first decision: their `src` gets the same extension and no codec runs.

use crate::context::RunContext;
use crate::format::ImageFormat;
use crate::html::ImgElement;
use crate::imaging::{CompressRequest, CompressedVariant, ImageBackend, ImageMeta};
use crate::process::{FileScope, ImageError};
use crate::resource::Resource;
use std::path::{Path, PathBuf};

/// Outcome of dispatching one image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dispatched {
    /// Output is progressive JPEG rather than WebP (srcset steps follow suit).
    pub progressive: bool,
    /// Variant produced and adopted by this reference. `None` when the
    /// resource was already handled, or nothing better came out.
    pub fresh: Option<CompressedVariant>,
}

/// Progressive JPEG needs a known, opaque image above the fold.
pub fn can_be_progressive(above_fold: bool, meta: Option<&ImageMeta>) -> bool {
    above_fold && meta.is_some_and(|m| !m.has_alpha.unwrap_or(false))
}

pub fn target_format(progressive: bool) -> ImageFormat {
    if progressive {
        ImageFormat::Pjpg
    } else {
        ImageFormat::Webp
    }
}

/// Adopt a variant when it shrinks the file, or unconditionally for progressive output.
pub fn accepts(compressed_size: u64, original_size: u64, progressive: bool) -> bool {
    compressed_size < original_size || progressive
}

/// Extension to append to the source name, `""` when it already matches.
pub fn added_extension(source_ext: &str, format: ImageFormat) -> String {
    let ext = format.extension();
    if source_ext == ext {
        String::new()
    } else {
        format!(".{}", ext)
    }
}

/// Insert `suffix` at the end of the path part of `src`, before any query or fragment.
pub fn suffixed_src(src: &str, suffix: &str) -> String {
    let split = src.find(['?', '#']).unwrap_or(src.len());
    format!("{}{}{}", &src[..split], suffix, &src[split..])
}

fn suffixed_path(path: &Path, suffix: &str) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(suffix);
    PathBuf::from(name)
}

pub fn dispatch(
    img: &mut ImgElement,
    resource: &Resource,
    above_fold: bool,
    scope: &FileScope,
    backend: &impl ImageBackend,
    ctx: &mut RunContext,
) -> Result<Dispatched, ImageError> {
    let meta = resource.meta(backend).map_err(|e| scope.read_error(resource, e))?;
    let progressive = can_be_progressive(above_fold, meta.as_ref());

    if !ctx.claim_compression(resource.path()) {
        if let Some(suffix) = ctx.adopted_suffix(resource.path()) {
            img.set("src", suffixed_src(resource.src(), suffix));
        }
        return Ok(Dispatched {
            progressive,
            fresh: None,
        });
    }

    let data = resource.data().map_err(|e| scope.read_error(resource, e))?;
    let original_size = data.len() as u64;
    let request = CompressRequest::new(target_format(progressive))
        .lossless(resource.format() == Some(ImageFormat::Png));
    let variant = backend
        .compress(data, &request)
        .map_err(|source| ImageError::Backend {
            src: resource.src().to_string(),
            source,
        })?;

    let Some(variant) = variant.filter(|v| accepts(v.len(), original_size, progressive)) else {
        return Ok(Dispatched {
            progressive,
            fresh: None,
        });
    };

    let source_ext = resource.extension();
    let suffix = added_extension(&source_ext, variant.format);
    let output = suffixed_path(resource.path(), &suffix);
    scope.write(&output, &variant.data)?;
    ctx.claim_output(&output);
    ctx.adopt_compression(resource.path(), &suffix);
    ctx.report_summary(
        format!("{}->{}", source_ext, variant.format.extension()),
        original_size,
        variant.len(),
    );
    img.set("src", suffixed_src(resource.src(), &suffix));

    Ok(Dispatched {
        progressive,
        fresh: Some(variant),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ImageConfig;
    use crate::html::HtmlDocument;
    use crate::imaging::backend::tests::MockBackend;
    use crate::test_helpers::SiteBuilder;

    fn img(tag: &str) -> ImgElement {
        HtmlDocument::parse(tag.to_string()).unwrap().images()[0].clone()
    }

    #[test]
    fn progressive_needs_opaque_image_above_fold() {
        let opaque = ImageMeta::new(10, 10, false);
        let alpha = ImageMeta::new(10, 10, true);
        let unknown_alpha = ImageMeta {
            has_alpha: None,
            ..opaque
        };

        assert!(can_be_progressive(true, Some(&opaque)));
        assert!(can_be_progressive(true, Some(&unknown_alpha)));
        assert!(!can_be_progressive(true, Some(&alpha)));
        assert!(!can_be_progressive(true, None));
        assert!(!can_be_progressive(false, Some(&opaque)));
    }

    #[test]
    fn acceptance_rule() {
        assert!(accepts(99, 100, false));
        assert!(!accepts(100, 100, false));
        assert!(!accepts(150, 100, false));
        assert!(accepts(150, 100, true));
    }

    #[test]
    fn extension_only_added_when_different() {
        assert_eq!(added_extension("png", ImageFormat::Webp), ".webp");
        assert_eq!(added_extension("jpg", ImageFormat::Pjpg), "");
        assert_eq!(added_extension("jpeg", ImageFormat::Pjpg), ".jpg");
        assert_eq!(added_extension("svg", ImageFormat::Svg), "");
    }

    #[test]
    fn suffix_goes_before_query() {
        assert_eq!(suffixed_src("a.png", ".webp"), "a.png.webp");
        assert_eq!(suffixed_src("a.png?v=2#top", ".webp"), "a.png.webp?v=2#top");
        assert_eq!(suffixed_src("a.jpg", ""), "a.jpg");
    }

    #[test]
    fn smaller_webp_is_adopted_and_written() {
        let site = SiteBuilder::new().file("a.png", &[1; 100]);
        let config = ImageConfig::default();
        let scope = site.scope("index.html", &config, false);
        let resource = site.resource("index.html", "a.png");
        let backend = MockBackend::with_image(50, 50, true, 40);
        let mut ctx = RunContext::new();
        let mut el = img(r#"<img src="a.png">"#);

        let out = dispatch(&mut el, &resource, false, &scope, &backend, &mut ctx).unwrap();

        assert!(!out.progressive);
        assert_eq!(out.fresh.map(|v| v.format), Some(ImageFormat::Webp));
        assert_eq!(el.get("src"), Some("a.png.webp"));
        let written = std::fs::read(site.path().join("a.png.webp")).unwrap();
        assert_eq!(written.len(), 40);
        assert!(ctx.is_generated(&site.path().join("a.png.webp")));
        assert_eq!(ctx.summary()[0].action, "png->webp");
        assert_eq!(ctx.summary()[0].original_size, 100);
        assert_eq!(ctx.summary()[0].compressed_size, 40);
    }

    #[test]
    fn png_sources_use_lossless_webp() {
        let site = SiteBuilder::new().file("a.png", &[1; 100]);
        let config = ImageConfig::default();
        let scope = site.scope("index.html", &config, false);
        let resource = site.resource("index.html", "a.png");
        let backend = MockBackend::with_image(50, 50, true, 40);
        let mut ctx = RunContext::new();

        dispatch(&mut img(r#"<img src="a.png">"#), &resource, false, &scope, &backend, &mut ctx).unwrap();

        let ops = backend.get_operations();
        assert!(ops.contains(&crate::imaging::backend::tests::RecordedOp::Compress {
            target: ImageFormat::Webp,
            resize: None,
            lossless: true,
        }));
    }

    #[test]
    fn larger_webp_is_rejected() {
        let site = SiteBuilder::new().file("a.jpg", &[1; 100]);
        let config = ImageConfig::default();
        let scope = site.scope("index.html", &config, false);
        let resource = site.resource("index.html", "a.jpg");
        let backend = MockBackend::with_image(50, 50, false, 200);
        let mut ctx = RunContext::new();
        let mut el = img(r#"<img src="a.jpg">"#);

        let out = dispatch(&mut el, &resource, false, &scope, &backend, &mut ctx).unwrap();

        assert_eq!(out.fresh, None);
        assert_eq!(el.get("src"), Some("a.jpg"));
        assert!(!site.path().join("a.jpg.webp").exists());
        assert!(ctx.summary().is_empty());
    }

    #[test]
    fn progressive_jpeg_adopted_even_when_larger() {
        let site = SiteBuilder::new().file("hero.jpg", &[1; 100]);
        let config = ImageConfig::default();
        let scope = site.scope("index.html", &config, false);
        let resource = site.resource("index.html", "hero.jpg");
        let backend = MockBackend::with_image(50, 50, false, 150);
        let mut ctx = RunContext::new();
        let mut el = img(r#"<img src="hero.jpg">"#);

        let out = dispatch(&mut el, &resource, true, &scope, &backend, &mut ctx).unwrap();

        assert!(out.progressive);
        assert_eq!(out.fresh.map(|v| v.len()), Some(150));
        // Same extension: overwritten in place
        assert_eq!(el.get("src"), Some("hero.jpg"));
        assert_eq!(std::fs::read(site.path().join("hero.jpg")).unwrap().len(), 150);
        assert_eq!(ctx.summary()[0].action, "jpg->jpg");
        assert_eq!(backend.compress_calls(), vec![(ImageFormat::Pjpg, None)]);
    }

    #[test]
    fn second_reference_reuses_first_decision() {
        let site = SiteBuilder::new().file("img/a.png", &[1; 100]);
        let config = ImageConfig::default();
        let backend = MockBackend::with_image(50, 50, true, 40);
        let mut ctx = RunContext::new();

        let first_scope = site.scope("index.html", &config, false);
        let mut first = img(r#"<img src="img/a.png">"#);
        let r1 = site.resource("index.html", "img/a.png");
        dispatch(&mut first, &r1, false, &first_scope, &backend, &mut ctx).unwrap();

        let second_scope = site.scope("blog/post.html", &config, false);
        let mut second = img(r#"<img src="../img/a.png">"#);
        let r2 = site.resource("blog/post.html", "../img/a.png");
        let out = dispatch(&mut second, &r2, false, &second_scope, &backend, &mut ctx).unwrap();

        assert_eq!(out.fresh, None);
        assert_eq!(backend.compress_calls().len(), 1);
        assert_eq!(first.get("src"), Some("img/a.png.webp"));
        assert_eq!(second.get("src"), Some("../img/a.png.webp"));
    }

    #[test]
    fn dry_run_skips_writes_but_rewrites_src() {
        let site = SiteBuilder::new().file("a.png", &[1; 100]);
        let config = ImageConfig::default();
        let scope = site.scope("index.html", &config, true);
        let resource = site.resource("index.html", "a.png");
        let backend = MockBackend::with_image(50, 50, true, 40);
        let mut ctx = RunContext::new();
        let mut el = img(r#"<img src="a.png">"#);

        dispatch(&mut el, &resource, false, &scope, &backend, &mut ctx).unwrap();

        assert_eq!(el.get("src"), Some("a.png.webp"));
        assert!(!site.path().join("a.png.webp").exists());
        assert_eq!(ctx.summary().len(), 1);
    }

    #[test]
    fn codec_without_result_is_no_improvement() {
        let site = SiteBuilder::new().file("a.png", &[1; 100]);
        let config = ImageConfig::default();
        let scope = site.scope("index.html", &config, false);
        let resource = site.resource("index.html", "a.png");
        let backend = MockBackend {
            meta: Some(ImageMeta::new(10, 10, false)),
            ..MockBackend::new()
        };
        let mut ctx = RunContext::new();
        let mut el = img(r#"<img src="a.png">"#);

        let out = dispatch(&mut el, &resource, false, &scope, &backend, &mut ctx).unwrap();

        assert_eq!(out.fresh, None);
        assert_eq!(el.get("src"), Some("a.png"));
        assert!(ctx.is_compressed(resource.path()));
    }
}
