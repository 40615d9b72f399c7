//! Image codec layer.
//!
//! | Operation | Crate / function |
//! |---|---|
//! | **Identify** | `image::ImageReader::into_decoder` / SVG root attributes |
//! | **Compress → JPEG, PNG** | `image` crate encoders |
//! | **Compress → WebP** | `webp` crate (libwebp) |
//! | **SVG minify** | `quick-xml` |
//!
//! The module is split into:
//! - **Calculations**: Pure functions for dimension and srcset math (unit testable)
//! - **Parameters**: Data structures describing codec requests
//! - **Backend**: [`ImageBackend`] trait + [`RustBackend`]
//! - **SVG**: root inspection, minification, data URIs

pub mod backend;
pub mod calculations;
mod params;
pub mod rust_backend;
pub mod svg;

pub use backend::{BackendError, CompressedVariant, Dimensions, ImageBackend, ImageMeta};
pub use params::{CompressRequest, EncoderSettings, Quality, WebpParams};
pub use rust_backend::RustBackend;
