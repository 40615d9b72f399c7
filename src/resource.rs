//! Resolving `<img src>` references to files on disk.
//!
//! A `src` is local when it is neither an absolute URL (`https:`, `data:`,
//! ...) nor protocol-relative (`//cdn...`). Local references resolve
//! against the site root when they start with `/`, else against the
//! directory of the HTML file. Query strings and fragments are dropped and
//! percent-escapes decoded, and the result is normalized lexically so every
//! spelling of one file maps to the same identity.
//!
//! A [`Resource`] reads its bytes and metadata lazily and caches both.

use crate::format::ImageFormat;
use crate::imaging::{ImageBackend, ImageMeta};
use percent_encoding::percent_decode_str;
use std::cell::OnceCell;
use std::io;
use std::path::{Component, Path, PathBuf};
use url::Url;

/// Does this `src` point at a file of the site being processed?
pub fn is_local(src: &str) -> bool {
    let src = src.trim();
    if src.starts_with("//") || src.starts_with("data:") {
        return false;
    }
    Url::parse(src).is_err()
}

/// Map a local `src` to an absolute path.
///
/// `html_file` is the referencing file, relative to `root`.
pub fn translate_src(root: &Path, html_file: &Path, src: &str) -> PathBuf {
    let src = src.trim();
    let src = src.split(['?', '#']).next().unwrap_or_default();
    let decoded = percent_decode_str(src).decode_utf8_lossy();

    let joined = match decoded.strip_prefix('/') {
        Some(rooted) => root.join(rooted),
        None => root
            .join(html_file.parent().unwrap_or(Path::new("")))
            .join(decoded.as_ref()),
    };
    normalize(&joined)
}

/// Resolve `.` and `..` without touching the filesystem.
fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !out.pop() {
                    out.push(component);
                }
            }
            other => out.push(other),
        }
    }
    out
}

/// One physical image referenced from HTML.
#[derive(Debug)]
pub struct Resource {
    src: String,
    path: PathBuf,
    data: OnceCell<Vec<u8>>,
    meta: OnceCell<Option<ImageMeta>>,
}

impl Resource {
    /// Resolve `src` from `html_file`. `None` when no such file exists.
    pub fn resolve(root: &Path, html_file: &Path, src: &str) -> Option<Self> {
        let path = translate_src(root, html_file, src);
        path.is_file().then(|| Self {
            src: src.to_string(),
            path,
            data: OnceCell::new(),
            meta: OnceCell::new(),
        })
    }

    /// The `src` attribute this resource was resolved from.
    pub fn src(&self) -> &str {
        &self.src
    }

    /// Absolute path; the resource's identity for the whole run.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Lowercase file extension without the dot, `""` when there is none.
    pub fn extension(&self) -> String {
        self.path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase)
            .unwrap_or_default()
    }

    pub fn format(&self) -> Option<ImageFormat> {
        ImageFormat::from_path(&self.path)
    }

    pub fn is_svg(&self) -> bool {
        self.format() == Some(ImageFormat::Svg)
    }

    /// File contents, read on first access.
    pub fn data(&self) -> io::Result<&[u8]> {
        if let Some(data) = self.data.get() {
            return Ok(data);
        }
        let data = std::fs::read(&self.path)?;
        Ok(self.data.get_or_init(|| data))
    }

    pub fn len(&self) -> io::Result<u64> {
        Ok(self.data()?.len() as u64)
    }

    /// Image metadata, identified on first access.
    ///
    /// `Ok(None)` when the backend can't identify the file.
    pub fn meta(&self, backend: &impl ImageBackend) -> io::Result<Option<ImageMeta>> {
        if let Some(meta) = self.meta.get() {
            return Ok(*meta);
        }
        let meta = backend.identify(self.data()?).ok();
        Ok(*self.meta.get_or_init(|| meta))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::imaging::backend::tests::{MockBackend, RecordedOp};
    use tempfile::TempDir;

    #[test]
    fn local_and_remote_sources() {
        assert!(is_local("img/a.png"));
        assert!(is_local("/img/a.png"));
        assert!(is_local("../a.png?v=2"));
        assert!(!is_local("https://example.com/a.png"));
        assert!(!is_local("http://example.com/a.png"));
        assert!(!is_local("//cdn.example.com/a.png"));
        assert!(!is_local("data:image/png;base64,AAAA"));
    }

    #[test]
    fn translate_relative_to_html_file() {
        let root = Path::new("/site");
        assert_eq!(
            translate_src(root, Path::new("blog/post.html"), "img/a.png"),
            PathBuf::from("/site/blog/img/a.png")
        );
        assert_eq!(
            translate_src(root, Path::new("index.html"), "a.png"),
            PathBuf::from("/site/a.png")
        );
    }

    #[test]
    fn translate_rooted_src() {
        assert_eq!(
            translate_src(Path::new("/site"), Path::new("blog/post.html"), "/img/a.png"),
            PathBuf::from("/site/img/a.png")
        );
    }

    #[test]
    fn translate_normalizes_spellings_of_one_file() {
        let root = Path::new("/site");
        let a = translate_src(root, Path::new("blog/post.html"), "../img/./a.png");
        let b = translate_src(root, Path::new("index.html"), "/img/a.png");
        assert_eq!(a, b);
    }

    #[test]
    fn translate_strips_query_and_decodes() {
        assert_eq!(
            translate_src(Path::new("/site"), Path::new("index.html"), "my%20photo.jpg?v=3#x"),
            PathBuf::from("/site/my photo.jpg")
        );
    }

    #[test]
    fn resolve_missing_file_is_none() {
        let tmp = TempDir::new().unwrap();
        assert!(Resource::resolve(tmp.path(), Path::new("index.html"), "nope.png").is_none());
    }

    #[test]
    fn resolve_reads_lazily_and_caches_meta() {
        let tmp = TempDir::new().unwrap();
        std::fs::write(tmp.path().join("Photo.PNG"), b"12345").unwrap();

        let res = Resource::resolve(tmp.path(), Path::new("index.html"), "Photo.PNG").unwrap();
        assert_eq!(res.src(), "Photo.PNG");
        assert_eq!(res.extension(), "png");
        assert_eq!(res.format(), Some(ImageFormat::Png));
        assert!(!res.is_svg());
        assert_eq!(res.len().unwrap(), 5);

        let backend = MockBackend::with_image(10, 20, false, 1);
        let first = res.meta(&backend).unwrap();
        let second = res.meta(&backend).unwrap();
        assert_eq!(first, second);
        assert_eq!(first.and_then(|m| m.width), Some(10));
        assert_eq!(backend.get_operations(), vec![RecordedOp::Identify { len: 5 }]);
    }

    #[test]
    fn unidentifiable_meta_is_none() {
        let tmp = TempDir::new().unwrap();
        std::fs::write(tmp.path().join("a.png"), b"x").unwrap();
        let res = Resource::resolve(tmp.path(), Path::new("index.html"), "a.png").unwrap();
        assert_eq!(res.meta(&MockBackend::new()).unwrap(), None);
    }
}
