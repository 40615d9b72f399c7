//! Shared test utilities for the imgpress test suite.
//!
//! Provides a throwaway site builder plus synthetic image encoders, so tests
//! can lay out HTML and images on disk without fixture files.
//!
//! # Usage
//!
//! ```rust
//! use crate::test_helpers::*;
//!
//! let site = SiteBuilder::new()
//!     .file("img/a.png", &png_bytes(100, 50, true))
//!     .html("index.html", r#"<img src="img/a.png" alt="">"#);
//!
//! let resource = site.resource("index.html", "img/a.png");
//! assert_eq!(resource.extension(), "png");
//! ```

use crate::config::ImageConfig;
use crate::process::FileScope;
use crate::resource::Resource;
use image::{DynamicImage, ImageFormat, Rgb, RgbImage, Rgba, RgbaImage};
use std::io::Cursor;
use std::path::Path;
use tempfile::TempDir;

// =========================================================================
// Site layout
// =========================================================================

/// A site root in a temp directory, deleted on drop.
pub struct SiteBuilder {
    dir: TempDir,
}

impl SiteBuilder {
    pub fn new() -> Self {
        Self {
            dir: TempDir::new().unwrap(),
        }
    }

    /// Write `data` at `relative`, creating parent directories.
    pub fn file(self, relative: &str, data: &[u8]) -> Self {
        let path = self.dir.path().join(relative);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).unwrap();
        }
        std::fs::write(path, data).unwrap();
        self
    }

    pub fn html(self, relative: &str, content: &str) -> Self {
        self.file(relative, content.as_bytes())
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn read(&self, relative: &str) -> String {
        std::fs::read_to_string(self.dir.path().join(relative)).unwrap()
    }

    /// Pipeline scope for the HTML file at `relative`.
    pub fn scope<'a>(
        &'a self,
        relative: &'a str,
        config: &'a ImageConfig,
        dry_run: bool,
    ) -> FileScope<'a> {
        FileScope::new(self.path(), Path::new(relative), config, dry_run)
    }

    /// Resolve `src` as referenced from the HTML file at `relative`. Panics if missing.
    pub fn resource(&self, relative: &str, src: &str) -> Resource {
        Resource::resolve(self.path(), Path::new(relative), src)
            .unwrap_or_else(|| panic!("{} not found from {}", src, relative))
    }
}

// =========================================================================
// Synthetic images
// =========================================================================

fn encode(img: DynamicImage, format: ImageFormat) -> Vec<u8> {
    let mut buf = Cursor::new(Vec::new());
    img.write_to(&mut buf, format).unwrap();
    buf.into_inner()
}

/// A gradient JPEG of the given size.
pub fn jpeg_bytes(width: u32, height: u32) -> Vec<u8> {
    let img = RgbImage::from_fn(width, height, |x, y| {
        Rgb([(x % 256) as u8, (y % 256) as u8, ((x + y) % 256) as u8])
    });
    encode(DynamicImage::ImageRgb8(img), ImageFormat::Jpeg)
}

/// A gradient PNG, RGBA when `alpha` is set.
pub fn png_bytes(width: u32, height: u32, alpha: bool) -> Vec<u8> {
    let img = if alpha {
        DynamicImage::ImageRgba8(RgbaImage::from_fn(width, height, |x, y| {
            Rgba([(x % 256) as u8, (y % 256) as u8, 128, ((x * 7) % 256) as u8])
        }))
    } else {
        DynamicImage::ImageRgb8(RgbImage::from_fn(width, height, |x, y| {
            Rgb([(x % 256) as u8, (y % 256) as u8, 128])
        }))
    };
    encode(img, ImageFormat::Png)
}
