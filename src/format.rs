//! Image format tags.
//!
//! Every decision that depends on "what kind of image is this" goes through
//! [`ImageFormat`]: the file extension written to disk, the MIME type used
//! for data URIs, and the tag shown in summary actions. Adding a format is
//! one new variant and the compiler points at every table that needs a case.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

/// A format a [`CompressedVariant`](crate::imaging::CompressedVariant) can carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageFormat {
    Jpg,
    /// Progressive JPEG. Same extension and MIME type as [`ImageFormat::Jpg`].
    Pjpg,
    Png,
    Webp,
    Svg,
}

impl ImageFormat {
    /// Short tag used in summary actions and the JSON report.
    pub fn tag(self) -> &'static str {
        match self {
            Self::Jpg => "jpg",
            Self::Pjpg => "pjpg",
            Self::Png => "png",
            Self::Webp => "webp",
            Self::Svg => "svg",
        }
    }

    /// File extension (without the dot) for files of this format.
    pub fn extension(self) -> &'static str {
        match self {
            Self::Jpg | Self::Pjpg => "jpg",
            Self::Png => "png",
            Self::Webp => "webp",
            Self::Svg => "svg",
        }
    }

    pub fn mime(self) -> &'static str {
        match self {
            Self::Jpg | Self::Pjpg => "image/jpeg",
            Self::Png => "image/png",
            Self::Webp => "image/webp",
            Self::Svg => "image/svg+xml",
        }
    }

    /// Map a file extension (case-insensitive, no dot) to a format.
    ///
    /// `jpeg` and `jpg` both map to [`ImageFormat::Jpg`]; progressive JPEG
    /// is never inferred from a filename.
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "jpg" | "jpeg" => Some(Self::Jpg),
            "png" => Some(Self::Png),
            "webp" => Some(Self::Webp),
            "svg" => Some(Self::Svg),
            _ => None,
        }
    }

    pub fn from_path(path: &Path) -> Option<Self> {
        path.extension()
            .and_then(|e| e.to_str())
            .and_then(Self::from_extension)
    }
}

impl fmt::Display for ImageFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}
