//! HTML document adapter.
//!
//! The `tl` parser finds `<img>` and `<the-fold>` elements (so markup inside
//! comments or scripts is never mistaken for a tag) and gives their byte
//! offsets in the source. Each `<img>` opening tag is then tokenized into
//! an ordered attribute list that the pipeline edits in place.
//!
//! Serialization splices only the edited `<img>` tags and removed folds back
//! into the original text; every other byte of the document is preserved.

use std::ops::Range;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum HtmlError {
    #[error("HTML parse error: {0}")]
    Parse(String),
}

/// Tag name of the fold marker element.
pub const FOLD_TAG: &str = "the-fold";

/// One `<img>` element: its position in the source and its attributes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImgElement {
    offset: usize,
    len: usize,
    /// Attribute names as written, values raw (entities untouched).
    /// `None` is a bare attribute like `<img ismap>`.
    attrs: Vec<(String, Option<String>)>,
    self_closing: bool,
    modified: bool,
}

impl ImgElement {
    /// Tokenize the `<img ...>` opening tag starting at `offset`.
    fn read(source: &str, offset: usize) -> Option<Self> {
        let bytes = source.as_bytes();
        let head = bytes.get(offset..offset + 4)?;
        if !head.eq_ignore_ascii_case(b"<img") {
            return None;
        }

        let mut attrs = Vec::new();
        let mut self_closing = false;
        let mut i = offset + 4;
        loop {
            while i < bytes.len() && bytes[i].is_ascii_whitespace() {
                i += 1;
            }
            match bytes.get(i)? {
                b'>' => {
                    i += 1;
                    break;
                }
                b'/' => {
                    self_closing = bytes.get(i + 1) == Some(&b'>');
                    i += 1;
                    continue;
                }
                _ => {}
            }

            let name_start = i;
            while i < bytes.len()
                && !bytes[i].is_ascii_whitespace()
                && !matches!(bytes[i], b'=' | b'>' | b'/')
            {
                i += 1;
            }
            let name = source[name_start..i].to_string();

            while i < bytes.len() && bytes[i].is_ascii_whitespace() {
                i += 1;
            }
            if bytes.get(i) != Some(&b'=') {
                attrs.push((name, None));
                continue;
            }
            i += 1;
            while i < bytes.len() && bytes[i].is_ascii_whitespace() {
                i += 1;
            }

            let value = match bytes.get(i)? {
                &quote @ (b'"' | b'\'') => {
                    let start = i + 1;
                    let end = start + bytes[start..].iter().position(|&b| b == quote)?;
                    i = end + 1;
                    &source[start..end]
                }
                _ => {
                    let start = i;
                    while i < bytes.len() && !bytes[i].is_ascii_whitespace() && bytes[i] != b'>' {
                        i += 1;
                    }
                    &source[start..i]
                }
            };
            attrs.push((name, Some(value.to_string())));
        }

        Some(Self {
            offset,
            len: i - offset,
            attrs,
            self_closing,
            modified: false,
        })
    }

    /// Byte offset of the opening `<` in the source document.
    pub fn offset(&self) -> usize {
        self.offset
    }

    pub fn is_modified(&self) -> bool {
        self.modified
    }

    fn position(&self, name: &str) -> Option<usize> {
        self.attrs
            .iter()
            .position(|(key, _)| key.eq_ignore_ascii_case(name))
    }

    /// Attribute value. A bare attribute reads as `""`.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.position(name)
            .map(|i| self.attrs[i].1.as_deref().unwrap_or(""))
    }

    pub fn has(&self, name: &str) -> bool {
        self.position(name).is_some()
    }

    /// Set an attribute, keeping its position when it already exists.
    pub fn set(&mut self, name: &str, value: impl Into<String>) {
        let value = Some(value.into());
        match self.position(name) {
            Some(i) if self.attrs[i].1 == value => return,
            Some(i) => self.attrs[i].1 = value,
            None => self.attrs.push((name.to_string(), value)),
        }
        self.modified = true;
    }

    pub fn remove(&mut self, name: &str) {
        if let Some(i) = self.position(name) {
            self.attrs.remove(i);
            self.modified = true;
        }
    }

    /// Serialize the opening tag. Values are always double-quoted.
    pub fn to_html(&self) -> String {
        let mut out = String::from("<img");
        for (name, value) in &self.attrs {
            out.push(' ');
            out.push_str(name);
            if let Some(value) = value {
                out.push_str("=\"");
                out.push_str(&value.replace('"', "&quot;"));
                out.push('"');
            }
        }
        out.push_str(if self.self_closing { " />" } else { ">" });
        out
    }
}

/// A parsed HTML file ready for in-place `<img>` rewriting.
#[derive(Debug)]
pub struct HtmlDocument {
    source: String,
    images: Vec<ImgElement>,
    folds: Vec<Range<usize>>,
    remove_folds: bool,
}

impl HtmlDocument {
    pub fn parse(source: String) -> Result<Self, HtmlError> {
        let (images, folds) = {
            let dom = tl::parse(&source, tl::ParserOptions::default())
                .map_err(|e| HtmlError::Parse(format!("{:?}", e)))?;
            let base = source.as_ptr() as usize;

            let mut images = Vec::new();
            let mut folds = Vec::new();
            for node in dom.nodes() {
                let Some(tag) = node.as_tag() else { continue };
                let ptr = tag.raw().as_bytes().as_ptr() as usize;
                if ptr < base || ptr >= base + source.len() {
                    continue;
                }
                let offset = ptr - base;
                let name = tag.name().as_bytes();
                if name.eq_ignore_ascii_case(b"img") {
                    images.extend(ImgElement::read(&source, offset));
                } else if name.eq_ignore_ascii_case(FOLD_TAG.as_bytes()) {
                    folds.push(offset..fold_end(&source, offset));
                }
            }
            (images, folds)
        };

        let mut doc = Self {
            source,
            images,
            folds,
            remove_folds: false,
        };
        doc.images.sort_by_key(|img| img.offset);
        doc.images.dedup_by_key(|img| img.offset);
        doc.folds.sort_by_key(|fold| fold.start);
        Ok(doc)
    }

    /// Offset of the first `<the-fold>`, or 0 when there is none.
    ///
    /// Images that start before this offset are above the fold.
    pub fn fold_offset(&self) -> usize {
        self.folds.first().map_or(0, |fold| fold.start)
    }

    pub fn has_fold(&self) -> bool {
        !self.folds.is_empty()
    }

    /// `<img>` elements in document order.
    pub fn images(&self) -> &[ImgElement] {
        &self.images
    }

    pub fn images_mut(&mut self) -> &mut [ImgElement] {
        &mut self.images
    }

    /// Drop every `<the-fold>` element (with its content) on serialization.
    pub fn remove_folds(&mut self) {
        self.remove_folds = true;
    }

    /// Will serialization change anything?
    pub fn is_modified(&self) -> bool {
        (self.remove_folds && self.has_fold()) || self.images.iter().any(ImgElement::is_modified)
    }

    pub fn to_html(&self) -> String {
        let mut edits: Vec<(Range<usize>, String)> = self
            .images
            .iter()
            .filter(|img| img.modified)
            .map(|img| (img.offset..img.offset + img.len, img.to_html()))
            .collect();
        if self.remove_folds {
            edits.extend(self.folds.iter().map(|fold| (fold.clone(), String::new())));
        }
        edits.sort_by_key(|(range, _)| range.start);

        let mut out = String::with_capacity(self.source.len());
        let mut cursor = 0;
        for (range, replacement) in edits {
            // An edit nested inside an already removed range is dropped with it
            if range.start < cursor {
                continue;
            }
            out.push_str(&self.source[cursor..range.start]);
            out.push_str(&replacement);
            cursor = range.end;
        }
        out.push_str(&self.source[cursor..]);
        out
    }
}

/// End of a fold element: past its closing tag when there is one, else
/// past the opening tag.
fn fold_end(source: &str, offset: usize) -> usize {
    let bytes = source.as_bytes();
    let open_end = bytes[offset..]
        .iter()
        .position(|&b| b == b'>')
        .map_or(source.len(), |i| offset + i + 1);
    if bytes[offset..open_end].ends_with(b"/>") {
        return open_end;
    }

    let closing = format!("</{}", FOLD_TAG);
    let rest = source[open_end..].to_ascii_lowercase();
    match rest.find(&closing) {
        Some(i) => {
            let close_start = open_end + i;
            bytes[close_start..]
                .iter()
                .position(|&b| b == b'>')
                .map_or(source.len(), |j| close_start + j + 1)
        }
        None => open_end,
    }
}
