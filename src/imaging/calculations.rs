//! Pure calculation functions for image dimensions.
//!
//! All functions here are pure and testable without any I/O or images.

use super::backend::Dimensions;

/// Width difference between two consecutive srcset steps, in pixels.
pub const SRCSET_STEP: u32 = 300;

/// Size browsers give a replaced element with no intrinsic dimensions.
pub const DEFAULT_OBJECT_SIZE: (f64, f64) = (300.0, 150.0);

/// Parse a declared `width`/`height` attribute.
///
/// Non-numeric and negative values count as absent. Decimals are truncated
/// (`"100.7"` → `100`).
pub fn parse_dimension(value: &str) -> Option<u32> {
    let n = value.trim().parse::<f64>().ok()?;
    if !n.is_finite() || n < 0.0 {
        return None;
    }
    Some(n.trunc().min(u32::MAX as f64) as u32)
}

/// Round a ratio to one decimal place.
pub fn round_ratio(ratio: f64) -> f64 {
    (ratio * 10.0).round() / 10.0
}

/// Do declared dimensions have the same aspect ratio (to one decimal) as the image?
///
/// # Examples
/// ```
/// # use imgpress::imaging::calculations::declared_ratio_matches;
/// assert!(declared_ratio_matches((200, 100), 2.04));
/// assert!(!declared_ratio_matches((100, 50), 1.5));
/// ```
pub fn declared_ratio_matches(declared: (u32, u32), true_ratio: f64) -> bool {
    let (w, h) = declared;
    round_ratio(w as f64 / h as f64) == round_ratio(true_ratio)
}

/// Fill in the missing side from the other one and the aspect ratio.
///
/// Returns `None` when neither side is declared.
pub fn derive_missing_side(
    width: Option<u32>,
    height: Option<u32>,
    ratio: f64,
) -> Option<(f64, f64)> {
    match (width, height) {
        (Some(w), Some(h)) => Some((w as f64, h as f64)),
        (Some(w), None) => Some((w as f64, w as f64 / ratio)),
        (None, Some(h)) => Some((h as f64 * ratio, h as f64)),
        (None, None) => None,
    }
}

/// Aspect ratio (`width / height`) of an SVG `viewBox`.
///
/// Only the integer part of each number counts. Returns `None` when the
/// box is malformed or the ratio is not a positive finite number.
pub fn view_box_ratio(view_box: &str) -> Option<f64> {
    let parts: Vec<&str> = view_box
        .split(|c: char| c.is_whitespace() || c == ',')
        .filter(|s| !s.is_empty())
        .collect();
    if parts.len() < 4 {
        return None;
    }
    let w = parse_leading_int(parts[2])?;
    let h = parse_leading_int(parts[3])?;
    let ratio = w as f64 / h as f64;
    (ratio.is_finite() && ratio > 0.0).then_some(ratio)
}

/// `parseInt`-style parse: optional sign, then leading digits.
fn parse_leading_int(s: &str) -> Option<i64> {
    let end = s
        .char_indices()
        .find(|&(i, c)| !(c.is_ascii_digit() || (i == 0 && (c == '-' || c == '+'))))
        .map_or(s.len(), |(i, _)| i);
    s[..end].parse().ok()
}

/// Size a browser gives an `<img>` of an SVG whose size isn't declared in HTML.
///
/// - Numeric `width` and `height` on the root: used as is.
/// - Neither present but a `viewBox`: fit the default 300×150 box, by
///   width when the ratio is at least 2, by height otherwise.
/// - Anything else: 300×150.
///
/// # Examples
/// ```
/// # use imgpress::imaging::calculations::svg_intrinsic_size;
/// assert_eq!(svg_intrinsic_size(None, None, Some("0 0 400 100")), (300.0, 75.0));
/// assert_eq!(svg_intrinsic_size(None, None, None), (300.0, 150.0));
/// ```
pub fn svg_intrinsic_size(
    width: Option<&str>,
    height: Option<&str>,
    view_box: Option<&str>,
) -> (f64, f64) {
    if let (Some(w), Some(h)) = (
        width.and_then(parse_dimension),
        height.and_then(parse_dimension),
    ) {
        return (w as f64, h as f64);
    }

    if width.is_none()
        && height.is_none()
        && let Some(ratio) = view_box.and_then(view_box_ratio)
    {
        let (default_w, default_h) = DEFAULT_OBJECT_SIZE;
        return if ratio >= 2.0 {
            (default_w, default_w / ratio)
        } else {
            (default_h * ratio, default_h)
        };
    }

    DEFAULT_OBJECT_SIZE
}

/// Round a computed size to whole non-negative pixels.
pub fn round_size(width: f64, height: f64) -> Dimensions {
    fn px(v: f64) -> u32 {
        if v.is_finite() && v > 0.0 {
            v.round().min(u32::MAX as f64) as u32
        } else {
            0
        }
    }
    Dimensions {
        width: px(width),
        height: px(height),
    }
}

/// Calculate the downscaled widths of a responsive set.
///
/// Starts one [`SRCSET_STEP`] below the base width and keeps stepping down
/// while the width stays strictly above `min_width`. Heights keep the base
/// aspect ratio and are floored. The base size itself is not included.
///
/// # Examples
/// ```
/// # use imgpress::imaging::calculations::calculate_srcset_steps;
/// # use imgpress::imaging::Dimensions;
/// let steps = calculate_srcset_steps(Dimensions { width: 1000, height: 500 }, 640);
/// let widths: Vec<u32> = steps.iter().map(|d| d.width).collect();
/// assert_eq!(widths, vec![700]);
///
/// let steps = calculate_srcset_steps(Dimensions { width: 1000, height: 500 }, 300);
/// let widths: Vec<u32> = steps.iter().map(|d| d.width).collect();
/// assert_eq!(widths, vec![700, 400]);
/// ```
pub fn calculate_srcset_steps(base: Dimensions, min_width: u32) -> Vec<Dimensions> {
    if base.width == 0 || base.height == 0 {
        return Vec::new();
    }
    let ratio = base.width as f64 / base.height as f64;

    let mut steps = Vec::new();
    let mut width = base.width.saturating_sub(SRCSET_STEP);
    while width > min_width && width > 0 {
        steps.push(Dimensions {
            width,
            height: (width as f64 / ratio).floor() as u32,
        });
        width = width.saturating_sub(SRCSET_STEP);
    }
    steps
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_dimension_rejects_non_numbers() {
        assert_eq!(parse_dimension(" 42.5 "), Some(42));
        assert_eq!(parse_dimension("100px"), None);
        assert_eq!(parse_dimension("auto"), None);
        assert_eq!(parse_dimension(""), None);
        assert_eq!(parse_dimension("NaN"), None);
        assert_eq!(parse_dimension("inf"), None);
    }

    #[test]
    fn parse_dimension_truncates_and_rejects_negative() {
        assert_eq!(parse_dimension("100"), Some(100));
        assert_eq!(parse_dimension("100.9"), Some(100));
        assert_eq!(parse_dimension("0"), Some(0));
        assert_eq!(parse_dimension("-5"), None);
        assert_eq!(parse_dimension("50%"), None);
    }

    #[test]
    fn ratio_rounding() {
        assert_eq!(round_ratio(1.333), 1.3);
        assert_eq!(round_ratio(1.96), 2.0);
        assert!(declared_ratio_matches((400, 300), 1.3333));
        assert!(!declared_ratio_matches((100, 50), 4.0 / 3.0));
    }

    #[test]
    fn derive_height_from_width() {
        assert_eq!(derive_missing_side(Some(400), None, 2.0), Some((400.0, 200.0)));
    }

    #[test]
    fn derive_width_from_height() {
        assert_eq!(derive_missing_side(None, Some(300), 1.5), Some((450.0, 300.0)));
    }

    #[test]
    fn derive_nothing_declared() {
        assert_eq!(derive_missing_side(None, None, 1.0), None);
    }

    #[test]
    fn view_box_parsing() {
        assert_eq!(view_box_ratio("0 0 400 100"), Some(4.0));
        assert_eq!(view_box_ratio("0,0,100,50"), Some(2.0));
        assert_eq!(view_box_ratio("0 0 24.5 12"), Some(2.0));
        assert_eq!(view_box_ratio("0 0 100"), None);
        assert_eq!(view_box_ratio("0 0 100 0"), None);
        assert_eq!(view_box_ratio("0 0 0 100"), None);
        assert_eq!(view_box_ratio("a b c d"), None);
    }

    #[test]
    fn svg_explicit_size_wins() {
        assert_eq!(
            svg_intrinsic_size(Some("64"), Some("32"), Some("0 0 400 100")),
            (64.0, 32.0)
        );
    }

    #[test]
    fn svg_wide_view_box_fits_width() {
        assert_eq!(svg_intrinsic_size(None, None, Some("0 0 400 100")), (300.0, 75.0));
    }

    #[test]
    fn svg_narrow_view_box_fits_height() {
        // ratio 1 → height 150, width 150
        assert_eq!(svg_intrinsic_size(None, None, Some("0 0 50 50")), (150.0, 150.0));
        // ratio exactly 2 fits by width
        assert_eq!(svg_intrinsic_size(None, None, Some("0 0 200 100")), (300.0, 150.0));
    }

    #[test]
    fn svg_without_anything_is_default_box() {
        assert_eq!(svg_intrinsic_size(None, None, None), (300.0, 150.0));
    }

    #[test]
    fn svg_partial_or_relative_size_is_default_box() {
        // one side only: viewBox is ignored
        assert_eq!(
            svg_intrinsic_size(Some("100"), None, Some("0 0 400 100")),
            (300.0, 150.0)
        );
        // percentages aren't numeric
        assert_eq!(
            svg_intrinsic_size(Some("100%"), Some("100%"), Some("0 0 400 100")),
            (300.0, 150.0)
        );
    }

    #[test]
    fn round_size_rounds_half_up() {
        assert_eq!(round_size(100.5, 33.3), Dimensions { width: 101, height: 33 });
        assert_eq!(round_size(f64::NAN, -4.0), Dimensions { width: 0, height: 0 });
    }

    #[test]
    fn srcset_steps_stop_at_min_width() {
        // 700 > 640 is kept, 400 <= 640 stops the loop
        let steps = calculate_srcset_steps(
            Dimensions {
                width: 1000,
                height: 500,
            },
            640,
        );
        assert_eq!(steps, vec![Dimensions { width: 700, height: 350 }]);
    }

    #[test]
    fn srcset_steps_low_min_width() {
        let steps = calculate_srcset_steps(
            Dimensions {
                width: 1000,
                height: 500,
            },
            100,
        );
        assert_eq!(
            steps,
            vec![
                Dimensions { width: 700, height: 350 },
                Dimensions { width: 400, height: 200 },
            ]
        );
    }

    #[test]
    fn srcset_heights_are_floored() {
        let steps = calculate_srcset_steps(
            Dimensions {
                width: 1300,
                height: 700,
            },
            640,
        );
        // 1000 / (1300/700) = 538.46 → 538, 700 / (1300/700) = 376.9 → 376
        assert_eq!(
            steps,
            vec![
                Dimensions { width: 1000, height: 538 },
                Dimensions { width: 700, height: 376 },
            ]
        );
    }

    #[test]
    fn srcset_unreachable_min_width_yields_nothing() {
        let base = Dimensions {
            width: 4000,
            height: 3000,
        };
        assert!(calculate_srcset_steps(base, 16000).is_empty());
    }

    #[test]
    fn srcset_small_or_degenerate_images_yield_nothing() {
        assert!(calculate_srcset_steps(Dimensions { width: 800, height: 600 }, 640).is_empty());
        assert!(calculate_srcset_steps(Dimensions { width: 200, height: 100 }, 0).is_empty());
        assert!(calculate_srcset_steps(Dimensions { width: 1000, height: 0 }, 0).is_empty());
    }
}
