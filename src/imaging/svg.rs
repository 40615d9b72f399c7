//! SVG helpers: root attribute inspection, minification and data URIs.
//!
//! SVGs are never rasterized. Sizing only needs the root element's
//! `width`, `height` and `viewBox`; compression is a lossless text
//! minification; inlining uses the compact percent-encoded form rather
//! than base64.

use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};
use quick_xml::Writer;
use quick_xml::events::Event;
use quick_xml::reader::Reader;

/// The size-related attributes of an `<svg>` root element, raw.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SvgRoot {
    pub width: Option<String>,
    pub height: Option<String>,
    pub view_box: Option<String>,
}

impl SvgRoot {
    /// Read the first `<svg>` element's attributes.
    ///
    /// Attribute names are matched case-insensitively. Returns `None` when
    /// the document has no `<svg>` element or is not well-formed before it.
    pub fn parse(data: &[u8]) -> Option<Self> {
        let mut reader = Reader::from_reader(data);
        let mut buf = Vec::new();
        loop {
            match reader.read_event_into(&mut buf) {
                Ok(Event::Start(e)) | Ok(Event::Empty(e))
                    if e.local_name().as_ref().eq_ignore_ascii_case(b"svg") =>
                {
                    let mut root = SvgRoot::default();
                    for attr in e.attributes().with_checks(false).flatten() {
                        let value = String::from_utf8_lossy(&attr.value).into_owned();
                        let key = attr.key.local_name();
                        let key = key.as_ref();
                        if key.eq_ignore_ascii_case(b"width") {
                            root.width = Some(value);
                        } else if key.eq_ignore_ascii_case(b"height") {
                            root.height = Some(value);
                        } else if key.eq_ignore_ascii_case(b"viewbox") {
                            root.view_box = Some(value);
                        }
                    }
                    return Some(root);
                }
                Ok(Event::Eof) | Err(_) => return None,
                Ok(_) => {}
            }
            buf.clear();
        }
    }
}

/// Cheap sniff: does this look like an SVG document?
pub fn looks_like_svg(data: &[u8]) -> bool {
    let head = &data[..data.len().min(1024)];
    let head = String::from_utf8_lossy(head);
    let head = head.trim_start_matches('\u{feff}').trim_start();
    head.starts_with("<svg") || (head.starts_with("<?xml") || head.starts_with("<!")) && head.contains("<svg")
}

/// Minify an SVG document.
///
/// Drops the XML declaration, doctype, comments, processing instructions and
/// whitespace-only text between elements; everything else is re-emitted as is.
pub fn minify(data: &[u8]) -> Result<Vec<u8>, String> {
    let mut reader = Reader::from_reader(data);
    reader.config_mut().trim_text(true);
    let mut writer = Writer::new(Vec::with_capacity(data.len()));
    let mut buf = Vec::new();
    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Eof) => break,
            Ok(Event::Decl(_) | Event::DocType(_) | Event::Comment(_) | Event::PI(_)) => {}
            Ok(event) => writer
                .write_event(event)
                .map_err(|e| format!("Failed to write SVG: {e}"))?,
            Err(e) => {
                return Err(format!(
                    "Invalid SVG at byte {}: {e}",
                    reader.buffer_position()
                ));
            }
        }
        buf.clear();
    }
    Ok(writer.into_inner())
}

/// Characters left alone by `encodeURIComponent`, plus the ones that are
/// safe to keep literal in a double-quoted `src` attribute.
const DATA_URI_SET: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')')
    .remove(b' ')
    .remove(b'=')
    .remove(b':')
    .remove(b'/');

/// Encode SVG markup as a compact `data:image/svg+xml,` URI.
///
/// Whitespace runs collapse to one space, double quotes become single
/// quotes, and only the characters that must be escaped are
/// percent-encoded (lowercase hex).
pub fn to_data_uri(svg: &str) -> String {
    let svg = svg.strip_prefix('\u{feff}').unwrap_or(svg);
    let body = svg
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .replace('"', "'");

    let mut uri = String::from("data:image/svg+xml,");
    for chunk in utf8_percent_encode(&body, DATA_URI_SET) {
        if chunk.starts_with('%') {
            uri.push_str(&chunk.to_ascii_lowercase());
        } else {
            uri.push_str(chunk);
        }
    }
    uri
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_reads_root_attributes() {
        let svg = br#"<?xml version="1.0"?>
<svg xmlns="http://www.w3.org/2000/svg" width="120" height="60" viewBox="0 0 400 100">
  <rect width="10" height="10"/>
</svg>"#;
        let root = SvgRoot::parse(svg).unwrap();
        assert_eq!(root.width.as_deref(), Some("120"));
        assert_eq!(root.height.as_deref(), Some("60"));
        assert_eq!(root.view_box.as_deref(), Some("0 0 400 100"));
    }

    #[test]
    fn parse_matches_viewbox_case_insensitively() {
        let root = SvgRoot::parse(br#"<svg viewbox="0 0 10 20"></svg>"#).unwrap();
        assert_eq!(root.view_box.as_deref(), Some("0 0 10 20"));
        assert_eq!(root.width, None);
    }

    #[test]
    fn parse_ignores_nested_sizes() {
        let root = SvgRoot::parse(br#"<svg><rect width="5" height="5"/></svg>"#).unwrap();
        assert_eq!(root, SvgRoot::default());
    }

    #[test]
    fn parse_without_svg_root_is_none() {
        assert_eq!(SvgRoot::parse(b"<html></html>"), None);
        assert_eq!(SvgRoot::parse(b"\x89PNG\r\n"), None);
    }

    #[test]
    fn sniffs_svg() {
        assert!(looks_like_svg(b"<svg></svg>"));
        assert!(looks_like_svg(b"  <?xml version=\"1.0\"?>\n<svg/>"));
        assert!(looks_like_svg(b"<!-- icon -->\n<svg/>"));
        assert!(!looks_like_svg(b"\x89PNG\r\n\x1a\n"));
        assert!(!looks_like_svg(b"<html></html>"));
    }

    #[test]
    fn minify_strips_comments_and_whitespace() {
        let svg = br#"<?xml version="1.0" encoding="UTF-8"?>
<!-- generator: something -->
<svg xmlns="http://www.w3.org/2000/svg" viewBox="0 0 10 10">
    <rect x="0" y="0" width="10" height="10"/>
</svg>
"#;
        let out = String::from_utf8(minify(svg).unwrap()).unwrap();
        assert!(!out.contains("<?xml"));
        assert!(!out.contains("generator"));
        assert!(!out.contains('\n'));
        assert!(out.starts_with("<svg"));
        assert!(out.contains("<rect"));
        assert!(out.len() < svg.len());
    }

    #[test]
    fn minify_rejects_broken_markup() {
        assert!(minify(b"<svg><g></svg>").is_err());
    }

    #[test]
    fn data_uri_is_compact() {
        let uri = to_data_uri("<svg xmlns=\"http://www.w3.org/2000/svg\">\n  <path d=\"M0 0\"/>\n</svg>");
        assert_eq!(
            uri,
            "data:image/svg+xml,%3csvg xmlns='http://www.w3.org/2000/svg'%3e %3cpath d='M0 0'/%3e %3c/svg%3e"
        );
    }

    #[test]
    fn data_uri_escapes_hash_and_percent() {
        let uri = to_data_uri("<svg fill=\"#fff\" opacity=\"50%\"/>");
        assert!(uri.contains("%23fff"));
        assert!(uri.contains("50%25"));
        assert!(!uri.contains('"'));
    }
}
