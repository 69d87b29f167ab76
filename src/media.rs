//! Media (paper) description: PWG self-describing names, dimensions in
//! hundredths of a millimeter, and the margin-default rules the IPP option
//! parser applies when a media-col doesn't specify them.

use serde::{Deserialize, Serialize};

/// Default margin for a non-borderless medium, in hundredths of a
/// millimeter (12.5mm top/bottom, 6.25mm left/right).
pub const DEFAULT_MARGIN_BOTTOM_TOP: i32 = 1250;
pub const DEFAULT_MARGIN_LEFT_RIGHT: i32 = 625;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Media {
    pub name: String,
    pub color: String,
    pub source: String,
    pub media_type: String,
    /// Hundredths of a millimeter.
    pub width: i32,
    /// Hundredths of a millimeter.
    pub length: i32,
    pub bottom: i32,
    pub left: i32,
    pub right: i32,
    pub top: i32,
}

impl Default for Media {
    fn default() -> Self {
        Media::by_name("iso_a4_210x297mm").unwrap_or_else(|| Media::borderless(
            "iso_a4_210x297mm", 21000, 29700,
        ))
    }
}

/// PWG media size table: a small subset of `media-size-name` entries, in
/// hundredths of a millimeter, wide enough to cover common print jobs plus
/// every borderless size named in the spec.
const PWG_MEDIA_TABLE: &[(&str, i32, i32)] = &[
    ("iso_a3_297x420mm", 29700, 42000),
    ("iso_a4_210x297mm", 21000, 29700),
    ("iso_a5_148x210mm", 14800, 21000),
    ("iso_a6_105x148mm", 10500, 14800),
    ("na_letter_8.5x11in", 21590, 27940),
    ("na_legal_8.5x14in", 21590, 35560),
    ("na_index-4x6_4x6in", 10160, 15240),
    ("na_5x7_5x7in", 12700, 17780),
    ("na_govt-letter_8x10in", 20320, 25400),
];

/// Borderless-photo sizes carry zero margins instead of the printer default,
/// per the source's special-case list: any of the named sizes, or any name
/// containing the substring `photo`.
fn is_borderless(name: &str) -> bool {
    matches!(
        name,
        "iso_a6_105x148mm" | "na_index-4x6_4x6in" | "na_5x7_5x7in" | "na_govt-letter_8x10in"
    ) || name.contains("photo")
}

impl Media {
    pub fn borderless(name: &str, width: i32, length: i32) -> Self {
        Media {
            name: name.to_string(),
            color: String::new(),
            source: String::new(),
            media_type: String::new(),
            width,
            length,
            bottom: 0,
            left: 0,
            right: 0,
            top: 0,
        }
    }

    pub fn with_default_margins(name: &str, width: i32, length: i32) -> Self {
        Media {
            name: name.to_string(),
            color: String::new(),
            source: String::new(),
            media_type: String::new(),
            width,
            length,
            bottom: DEFAULT_MARGIN_BOTTOM_TOP,
            left: DEFAULT_MARGIN_LEFT_RIGHT,
            right: DEFAULT_MARGIN_LEFT_RIGHT,
            top: DEFAULT_MARGIN_BOTTOM_TOP,
        }
    }

    /// Looks the name up in the PWG size table, applying the borderless
    /// exception for photo-ish sizes.
    pub fn by_name(name: &str) -> Option<Self> {
        let (w, l) = PWG_MEDIA_TABLE
            .iter()
            .find(|(n, _, _)| *n == name)
            .map(|(_, w, l)| (*w, *l))?;

        Some(if is_borderless(name) {
            Media::borderless(name, w, l)
        } else {
            Media::with_default_margins(name, w, l)
        })
    }

    /// Looks a size up by its `x-dimension`/`y-dimension` (hundredths of mm),
    /// as used when parsing a `media-size` sub-collection without a name.
    pub fn by_dimensions(x: i32, y: i32) -> Option<Self> {
        PWG_MEDIA_TABLE
            .iter()
            .find(|(_, w, l)| (*w == x && *l == y) || (*w == y && *l == x))
            .map(|(n, w, l)| {
                if is_borderless(n) {
                    Media::borderless(n, *w, *l)
                } else {
                    Media::with_default_margins(n, *w, *l)
                }
            })
    }

    /// Converts hundredths-of-a-millimeter to PDF points (1/72 inch).
    pub fn hmm_to_pt(hmm: i32) -> f32 {
        hmm as f32 * 72.0 / 2540.0
    }

    pub fn width_pt(&self) -> f32 {
        Self::hmm_to_pt(self.width)
    }

    pub fn length_pt(&self) -> f32 {
        Self::hmm_to_pt(self.length)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn a4_has_standard_margins() {
        let m = Media::by_name("iso_a4_210x297mm").unwrap();
        assert_eq!(m.bottom, DEFAULT_MARGIN_BOTTOM_TOP);
        assert_eq!(m.left, DEFAULT_MARGIN_LEFT_RIGHT);
    }

    #[test]
    fn photo_sizes_are_borderless() {
        let m = Media::by_name("na_index-4x6_4x6in").unwrap();
        assert_eq!(m.bottom, 0);
        assert_eq!(m.left, 0);

        let named_photo = Media::borderless("custom_photo_4x6in", 10160, 15240);
        assert_eq!(named_photo.top, 0);
    }

    #[test]
    fn default_media_is_a4() {
        let m = Media::default();
        assert_eq!(m.name, "iso_a4_210x297mm");
    }
}
