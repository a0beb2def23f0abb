//! Text measurement and ellipsis fitting.

pub const ELLIPSIS: &str = "\u{2026}";

/// Metrics of the font labels are painted with.
pub trait TextMeasure {
    fn width(&self, text: &str) -> f32;
    fn ascent(&self) -> f32;
    fn line_height(&self) -> f32;
    fn font_size(&self) -> f32;
}

/// Fixed-advance estimate of a proportional sans-serif font.
///
/// Exact enough to size labels for SVG/PNG export, where the final font is
/// chosen by the viewer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ApproxMetrics {
    pub font_size: f32,
    pub char_width: f32,
    pub ascent: f32,
    pub line_height: f32,
}

impl ApproxMetrics {
    pub fn for_font_size(font_size: f32) -> Self {
        Self {
            font_size,
            char_width: font_size * 0.6,
            ascent: font_size * 0.8,
            line_height: font_size * 1.25,
        }
    }
}

impl Default for ApproxMetrics {
    fn default() -> Self {
        Self::for_font_size(12.0)
    }
}

impl TextMeasure for ApproxMetrics {
    fn width(&self, text: &str) -> f32 {
        text.chars().count() as f32 * self.char_width
    }

    fn ascent(&self) -> f32 {
        self.ascent
    }

    fn line_height(&self) -> f32 {
        self.line_height
    }

    fn font_size(&self) -> f32 {
        self.font_size
    }
}

/// Longest prefix of `text` plus an ellipsis that fits in `max_width`.
///
/// Strings that already fit come back unchanged. Prefix widths grow
/// monotonically, so the cut point is found by binary search over char
/// boundaries.
pub fn fit_text<M: TextMeasure + ?Sized>(text: &str, max_width: f32, measure: &M) -> String {
    if measure.width(text) <= max_width {
        return text.to_string();
    }

    let boundaries: Vec<usize> = text
        .char_indices()
        .map(|(idx, _)| idx)
        .chain(std::iter::once(text.len()))
        .collect();

    let mut best = ELLIPSIS.to_string();
    let mut lo = 0_usize;
    let mut hi = boundaries.len() - 1;

    while lo <= hi {
        let mid = (lo + hi) / 2;
        let candidate = format!("{}{ELLIPSIS}", &text[..boundaries[mid]]);
        if measure.width(&candidate) <= max_width {
            best = candidate;
            lo = mid + 1;
        } else if mid == 0 {
            break;
        } else {
            hi = mid - 1;
        }
    }

    best
}
