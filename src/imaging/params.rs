//! Parameter types for codec operations.
//!
//! These structs describe *what* to encode, not *how*. They are the
//! interface between the pipeline stages (which decide format and size) and
//! the [`backend`](super::backend) (which does the byte-level work). This
//! separation allows swapping backends (e.g. for testing with a mock)
//! without changing decision logic.
//!
//! ## Types
//!
//! - [`Quality`] — Lossy encoding quality (1–100). Clamped on construction.
//! - [`CompressRequest`] — Target format, optional resize, WebP mode.
//! - [`EncoderSettings`] — Per-format knobs resolved from [`ImageConfig`].

use super::backend::Dimensions;
use crate::config::{ImageConfig, WebpOptions};
use crate::format::ImageFormat;

/// Quality setting for lossy image encoding (1-100).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Quality(pub u32);

impl Quality {
    pub fn new(value: u32) -> Self {
        Self(value.clamp(1, 100))
    }

    pub fn value(self) -> u32 {
        self.0
    }
}

impl Default for Quality {
    fn default() -> Self {
        Self(75)
    }
}

/// One call into [`ImageBackend::compress`](super::ImageBackend::compress).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompressRequest {
    pub target: ImageFormat,
    /// Exact output size. `None` keeps the source size.
    pub resize: Option<Dimensions>,
    /// Use the lossless WebP settings (ignored by other targets).
    pub lossless: bool,
}

impl CompressRequest {
    pub fn new(target: ImageFormat) -> Self {
        Self {
            target,
            resize: None,
            lossless: false,
        }
    }

    pub fn resized(mut self, width: u32, height: u32) -> Self {
        self.resize = Some(Dimensions { width, height });
        self
    }

    pub fn lossless(mut self, lossless: bool) -> Self {
        self.lossless = lossless;
        self
    }
}

/// WebP encoder knobs.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WebpParams {
    /// libwebp `method`, 0-6.
    pub effort: u8,
    pub quality: f32,
}

impl From<&WebpOptions> for WebpParams {
    fn from(opts: &WebpOptions) -> Self {
        Self {
            effort: opts.effort.min(6) as u8,
            quality: opts.quality.min(100) as f32,
        }
    }
}

/// Encoder settings shared by every compression in a run.
#[derive(Debug, Clone, PartialEq)]
pub struct EncoderSettings {
    pub jpeg_quality: Quality,
    pub webp_lossless: WebpParams,
    pub webp_lossy: WebpParams,
}

impl EncoderSettings {
    pub fn from_config(config: &ImageConfig) -> Self {
        Self {
            jpeg_quality: Quality::new(config.jpeg.quality),
            webp_lossless: WebpParams::from(&config.webp.lossless),
            webp_lossy: WebpParams::from(&config.webp.lossy),
        }
    }

    pub fn webp(&self, lossless: bool) -> WebpParams {
        if lossless {
            self.webp_lossless
        } else {
            self.webp_lossy
        }
    }
}

impl Default for EncoderSettings {
    fn default() -> Self {
        Self::from_config(&ImageConfig::default())
    }
}
