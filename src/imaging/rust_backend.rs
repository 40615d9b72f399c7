//! Pure Rust image decoding with libwebp for WebP output.
//!
//! ## Crate mapping
//!
//! | Operation | Crate / function |
//! |---|---|
//! | Identify (JPEG, PNG, WebP) | `image::ImageReader::into_decoder` (header only, no full decode) |
//! | Identify (SVG) | root `width`/`height`/`viewBox` via `quick-xml` |
//! | Decode | `image` crate (pure Rust decoders) |
//! | Resize | `image::DynamicImage::resize_exact` with `Lanczos3` filter |
//! | Encode → JPEG | `image::codecs::jpeg::JpegEncoder` (baseline) |
//! | Encode → progressive JPEG | `mozjpeg::Compress` with progressive scans |
//! | Encode → WebP | `webp` crate (libwebp), lossy or lossless with effort |
//! | SVG | `quick-xml` minification, whatever the target |

use super::backend::{BackendError, CompressedVariant, ImageBackend, ImageMeta};
use super::calculations::{parse_dimension, svg_intrinsic_size, view_box_ratio};
use super::params::{CompressRequest, EncoderSettings, Quality, WebpParams};
use super::svg;
use crate::format::ImageFormat;
use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::{DynamicImage, ImageDecoder, ImageReader};
use std::io::Cursor;
use std::panic::{AssertUnwindSafe, catch_unwind};

/// Production backend.
///
/// See the [module docs](self) for the crate-to-operation mapping.
pub struct RustBackend {
    settings: EncoderSettings,
}

impl RustBackend {
    pub fn new(settings: EncoderSettings) -> Self {
        Self { settings }
    }
}

impl Default for RustBackend {
    fn default() -> Self {
        Self::new(EncoderSettings::default())
    }
}

/// Decode an image from memory, guessing the format from its magic bytes.
fn load_image(data: &[u8]) -> Result<DynamicImage, BackendError> {
    ImageReader::new(Cursor::new(data))
        .with_guessed_format()
        .map_err(BackendError::Io)?
        .decode()
        .map_err(|e| BackendError::ProcessingFailed(format!("Failed to decode image: {}", e)))
}

/// Read dimensions and color type from the image header.
fn identify_raster(data: &[u8]) -> Result<ImageMeta, BackendError> {
    let decoder = ImageReader::new(Cursor::new(data))
        .with_guessed_format()
        .map_err(BackendError::Io)?
        .into_decoder()
        .map_err(|e| {
            BackendError::ProcessingFailed(format!("Failed to read image header: {}", e))
        })?;
    let (width, height) = decoder.dimensions();
    Ok(ImageMeta::new(width, height, decoder.color_type().has_alpha()))
}

/// SVG metadata: explicit root size, else the viewBox size, else the default object size.
fn identify_svg(data: &[u8]) -> Result<ImageMeta, BackendError> {
    let root = svg::SvgRoot::parse(data)
        .ok_or_else(|| BackendError::ProcessingFailed("No <svg> root element".into()))?;

    let explicit = root
        .width
        .as_deref()
        .and_then(parse_dimension)
        .zip(root.height.as_deref().and_then(parse_dimension));
    let (width, height) = match explicit {
        Some((w, h)) => (w, h),
        None => match root.view_box.as_deref().and_then(view_box_size) {
            Some(size) => size,
            None => {
                let (w, h) = svg_intrinsic_size(None, None, None);
                (w as u32, h as u32)
            }
        },
    };
    Ok(ImageMeta::new(width, height, true))
}

/// Width and height of a viewBox, when it describes a usable box.
fn view_box_size(view_box: &str) -> Option<(u32, u32)> {
    view_box_ratio(view_box)?;
    let mut parts = view_box
        .split(|c: char| c.is_whitespace() || c == ',')
        .filter(|s| !s.is_empty())
        .skip(2);
    let w = parse_dimension(parts.next()?)?;
    let h = parse_dimension(parts.next()?)?;
    Some((w, h))
}

fn encode_jpeg(img: &DynamicImage, quality: Quality) -> Result<Vec<u8>, BackendError> {
    let mut buf = Vec::new();
    let encoder = JpegEncoder::new_with_quality(&mut buf, quality.value() as u8);
    DynamicImage::ImageRgb8(img.to_rgb8())
        .write_with_encoder(encoder)
        .map_err(|e| BackendError::ProcessingFailed(format!("JPEG encode failed: {}", e)))?;
    Ok(buf)
}

/// Progressive JPEG through mozjpeg.
///
/// libjpeg reports fatal errors by unwinding, so the whole encode runs
/// under `catch_unwind`.
fn encode_progressive_jpeg(img: &DynamicImage, quality: Quality) -> Result<Vec<u8>, BackendError> {
    let rgb = img.to_rgb8();
    let encoded = catch_unwind(AssertUnwindSafe(|| -> std::io::Result<Vec<u8>> {
        let mut compress = mozjpeg::Compress::new(mozjpeg::ColorSpace::JCS_RGB);
        compress.set_size(rgb.width() as usize, rgb.height() as usize);
        compress.set_quality(quality.value() as f32);
        compress.set_progressive_mode();
        let mut started = compress.start_compress(Vec::new())?;
        started.write_scanlines(rgb.as_raw())?;
        started.finish()
    }))
    .map_err(|_| BackendError::ProcessingFailed("Progressive JPEG encode aborted".into()))?;
    Ok(encoded?)
}

fn encode_webp(
    img: &DynamicImage,
    params: WebpParams,
    lossless: bool,
) -> Result<Vec<u8>, BackendError> {
    // libwebp only takes 8-bit RGB or RGBA input
    let img = if img.color().has_alpha() {
        DynamicImage::ImageRgba8(img.to_rgba8())
    } else {
        DynamicImage::ImageRgb8(img.to_rgb8())
    };
    let encoder = webp::Encoder::from_image(&img)
        .map_err(|e| BackendError::ProcessingFailed(format!("WebP encoder: {}", e)))?;

    let mut config = webp::WebPConfig::new()
        .map_err(|_| BackendError::ProcessingFailed("WebP config init failed".into()))?;
    config.lossless = i32::from(lossless);
    config.quality = params.quality;
    config.method = i32::from(params.effort);

    let memory = encoder
        .encode_advanced(&config)
        .map_err(|e| BackendError::ProcessingFailed(format!("WebP encode failed: {:?}", e)))?;
    Ok(memory.to_vec())
}

impl ImageBackend for RustBackend {
    fn identify(&self, data: &[u8]) -> Result<ImageMeta, BackendError> {
        if svg::looks_like_svg(data) {
            return identify_svg(data);
        }
        identify_raster(data)
    }

    fn compress(
        &self,
        data: &[u8],
        request: &CompressRequest,
    ) -> Result<Option<CompressedVariant>, BackendError> {
        if svg::looks_like_svg(data) {
            let minified = svg::minify(data).map_err(BackendError::ProcessingFailed)?;
            return Ok(Some(CompressedVariant {
                format: ImageFormat::Svg,
                data: minified,
            }));
        }

        let img = load_image(data)?;
        let img = match request.resize {
            Some(size) => img.resize_exact(size.width, size.height, FilterType::Lanczos3),
            None => img,
        };

        let data = match request.target {
            ImageFormat::Jpg => encode_jpeg(&img, self.settings.jpeg_quality)?,
            ImageFormat::Pjpg => encode_progressive_jpeg(&img, self.settings.jpeg_quality)?,
            ImageFormat::Webp => {
                encode_webp(&img, self.settings.webp(request.lossless), request.lossless)?
            }
            // Rasters are only ever re-encoded as JPEG or WebP
            ImageFormat::Png | ImageFormat::Svg => return Ok(None),
        };

        Ok(Some(CompressedVariant {
            format: request.target,
            data,
        }))
    }
}
