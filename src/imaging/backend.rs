//! Image codec backend trait and shared types.
//!
//! The [`ImageBackend`] trait defines the two operations the pipeline needs
//! from a codec: identify (dimensions + alpha) and compress (re-encode,
//! optionally resized).
//!
//! The production implementation is
//! [`RustBackend`](super::rust_backend::RustBackend). Tests use the
//! recording `MockBackend` from this module's test submodule.

use super::params::CompressRequest;
use crate::format::ImageFormat;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BackendError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Processing failed: {0}")]
    ProcessingFailed(String),
}

/// Pixel dimensions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Dimensions {
    pub width: u32,
    pub height: u32,
}

/// What a backend could learn about an image without re-encoding it.
///
/// Every field is optional: an SVG without explicit size has no intrinsic
/// dimensions, and some decoders can't report an alpha channel.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ImageMeta {
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub has_alpha: Option<bool>,
}

impl ImageMeta {
    pub fn new(width: u32, height: u32, has_alpha: bool) -> Self {
        Self {
            width: Some(width),
            height: Some(height),
            has_alpha: Some(has_alpha),
        }
    }

    /// Both dimensions, when known.
    pub fn dimensions(&self) -> Option<Dimensions> {
        Some(Dimensions {
            width: self.width?,
            height: self.height?,
        })
    }
}

/// One re-encoding result. Never mutated after creation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompressedVariant {
    pub format: ImageFormat,
    pub data: Vec<u8>,
}

impl CompressedVariant {
    pub fn len(&self) -> u64 {
        self.data.len() as u64
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

/// Trait for image codec backends.
pub trait ImageBackend: Sync {
    /// Read dimensions and alpha information from encoded bytes.
    fn identify(&self, data: &[u8]) -> Result<ImageMeta, BackendError>;

    /// Re-encode `data` as requested.
    ///
    /// `Ok(None)` means the backend has nothing to offer for this input
    /// (unsupported source or target); callers treat it as "no improvement".
    fn compress(
        &self,
        data: &[u8],
        request: &CompressRequest,
    ) -> Result<Option<CompressedVariant>, BackendError>;
}
