//! AcroForm and annotation flattening: turns interactive widgets and
//! markup annotations into ordinary page content before imposition, since
//! printing needs a static appearance rather than a live form field.

use lopdf::{Dictionary, Object};

use crate::matrix::Matrix;

bitflags::bitflags! {
    /// PDF annotation `/F` flags (table 165, subset used by the flattener).
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct AnnotFlags: u32 {
        const INVISIBLE = 1 << 0;
        const HIDDEN = 1 << 1;
        const PRINT = 1 << 2;
        const NO_ZOOM = 1 << 3;
        const NO_ROTATE = 1 << 4;
        const NO_VIEW = 1 << 5;
        const READ_ONLY = 1 << 6;
        const LOCKED = 1 << 7;
    }
}

/// An annotation carried over from the page dictionary, reduced to the
/// fields the flattener needs.
#[derive(Debug, Clone)]
pub struct Annotation {
    pub subtype: String,
    pub rect: [f32; 4],
    pub flags: AnnotFlags,
    pub matrix: Matrix,
    pub appearance_bbox: Option<[f32; 4]>,
    pub appearance_stream: Option<Vec<u8>>,
    pub appearance_resources: Option<Dictionary>,
    pub has_ap_dict: bool,
    pub field_value: Option<String>,
    pub default_appearance: Option<String>,
}

/// Whether an annotation should be dropped outright (forbidden flags set,
/// or required flags missing) before any appearance work is attempted.
pub fn should_drop(annot: &AnnotFlags, forbidden: AnnotFlags, required: AnnotFlags) -> bool {
    annot.intersects(forbidden) || !annot.contains(required)
}

/// A resolved font reference extracted from a `/DA` default-appearance
/// string, e.g. `"/Helv 12 Tf 0 g"` → `("Helv", 12.0)`.
pub fn parse_default_appearance(da: &str) -> Option<(String, f32)> {
    let tokens: Vec<&str> = da.split_whitespace().collect();
    let tf_index = tokens.iter().position(|t| *t == "Tf")?;
    if tf_index < 2 {
        return None;
    }
    let size: f32 = tokens[tf_index - 1].parse().ok()?;
    let name = tokens[tf_index - 2].strip_prefix('/')?.to_string();
    Some((name, size))
}

/// Computes the Form-XObject placement matrix `T1 * R * S * T2` that maps
/// the appearance stream's `/BBox` (after its own `/Matrix`) precisely onto
/// the annotation's `/Rect`, per the PDF spec's appearance-stream
/// algorithm. `page_rotation_ccw_degrees` is only applied when the
/// annotation's `NO_ROTATE` flag is set and the page carries a rotation.
pub fn appearance_placement_matrix(
    bbox: [f32; 4],
    bbox_matrix: Matrix,
    rect: [f32; 4],
    flags: AnnotFlags,
    page_rotation_ccw_degrees: f32,
) -> Matrix {
    let corners = [
        (bbox[0], bbox[1]),
        (bbox[2], bbox[1]),
        (bbox[2], bbox[3]),
        (bbox[0], bbox[3]),
    ];
    let transformed: Vec<(f32, f32)> = corners.iter().map(|&(x, y)| bbox_matrix.apply_to_point(x, y)).collect();
    let (min_x, max_x) = transformed.iter().map(|p| p.0).fold((f32::MAX, f32::MIN), |(lo, hi), x| (lo.min(x), hi.max(x)));
    let (min_y, max_y) = transformed.iter().map(|p| p.1).fold((f32::MAX, f32::MIN), |(lo, hi), y| (lo.min(y), hi.max(y)));

    let transformed_w = (max_x - min_x).max(f32::EPSILON);
    let transformed_h = (max_y - min_y).max(f32::EPSILON);

    let (rx0, ry0, rx1, ry1) = (rect[0].min(rect[2]), rect[1].min(rect[3]), rect[0].max(rect[2]), rect[1].max(rect[3]));
    let rect_w = rx1 - rx0;
    let rect_h = ry1 - ry0;

    let sx = rect_w / transformed_w;
    let sy = rect_h / transformed_h;

    let t2 = Matrix::translate(-min_x, -min_y);
    let s = Matrix::scale(sx, sy);
    let r = if flags.contains(AnnotFlags::NO_ROTATE) && page_rotation_ccw_degrees != 0.0 {
        Matrix::rotate_rad(page_rotation_ccw_degrees.to_radians())
    } else {
        Matrix::identity()
    };
    let t1 = Matrix::translate(rx0, ry0);

    t2.then(r).then(s).then(t1)
}

/// Synthesizes a `BT … Tf (value) Tj ET` content stream for a `Tx`/`Ch`
/// widget's current value, using the font/size parsed from its `/DA`
/// string. The caller supplies the already-escaped PDF string literal
/// bytes for `value`.
pub fn synthesize_text_appearance(font_name: &str, font_size: f32, value: &str) -> Vec<u8> {
    let escaped = escape_pdf_string(value);
    format!("BT /{font_name} {font_size} Tf 2 2 Td {escaped} Tj ET").into_bytes()
}

fn escape_pdf_string(value: &str) -> String {
    let mut out = String::from("(");
    for c in value.chars() {
        match c {
            '(' | ')' | '\\' => {
                out.push('\\');
                out.push(c);
            }
            _ => out.push(c),
        }
    }
    out.push(')');
    out
}

/// Trigger condition: the catalog's `/AcroForm /Fields` is non-empty, or
/// any page has a non-empty `/Annots` array.
pub fn needs_flattening(acroform_fields_len: usize, any_page_has_annots: bool) -> bool {
    acroform_fields_len > 0 || any_page_has_annots
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn drops_annotations_missing_print_flag() {
        let flags = AnnotFlags::empty();
        assert!(should_drop(&flags, AnnotFlags::HIDDEN, AnnotFlags::PRINT));
    }

    #[test]
    fn drops_hidden_even_if_print_set() {
        let flags = AnnotFlags::PRINT | AnnotFlags::HIDDEN;
        assert!(should_drop(&flags, AnnotFlags::HIDDEN, AnnotFlags::PRINT));
    }

    #[test]
    fn keeps_printable_non_hidden_annotation() {
        let flags = AnnotFlags::PRINT;
        assert!(!should_drop(&flags, AnnotFlags::HIDDEN, AnnotFlags::PRINT));
    }

    #[test]
    fn parses_font_name_and_size_from_da_string() {
        assert_eq!(
            parse_default_appearance("/Helv 12 Tf 0 g"),
            Some(("Helv".to_string(), 12.0))
        );
        assert_eq!(parse_default_appearance("0 g"), None);
    }

    #[test]
    fn placement_matrix_maps_bbox_onto_rect_without_rotation() {
        let m = appearance_placement_matrix(
            [0.0, 0.0, 10.0, 10.0],
            Matrix::identity(),
            [100.0, 100.0, 120.0, 110.0],
            AnnotFlags::empty(),
            0.0,
        );
        let (x, y) = m.apply_to_point(0.0, 0.0);
        assert!((x - 100.0).abs() < 1e-3);
        assert!((y - 100.0).abs() < 1e-3);
        let (x2, y2) = m.apply_to_point(10.0, 10.0);
        assert!((x2 - 120.0).abs() < 1e-3);
        assert!((y2 - 110.0).abs() < 1e-3);
    }

    #[test]
    fn escapes_parens_and_backslashes_in_synthesized_text() {
        let bytes = synthesize_text_appearance("Helv", 12.0, "a(b)c\\d");
        let text = String::from_utf8(bytes).unwrap();
        assert!(text.contains(r"a\(b\)c\\d"));
    }
}
