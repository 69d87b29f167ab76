//! Per-cell page copying: clip, border, scale, mirror, and the CTM that
//! places one input page's content inside one output cell.

use crate::geometry::Rect;
use crate::matrix::Matrix;
use crate::options::{PageBorder, PrintScaling};
use crate::units::Pt;

/// Which border lines to draw around a cell, and their stroke widths, in
/// points. A "thick" variant widens the inset; "double" draws two
/// concentric rectangles.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BorderSpec {
    pub lines: u8,
    pub inset: Pt,
    pub line_width: Pt,
}

impl BorderSpec {
    pub fn for_style(style: PageBorder) -> Option<Self> {
        match style {
            PageBorder::None => None,
            PageBorder::Single => Some(BorderSpec {
                lines: 1,
                inset: Pt(2.25),
                line_width: Pt(0.5),
            }),
            PageBorder::SingleThick => Some(BorderSpec {
                lines: 1,
                inset: Pt(4.5),
                line_width: Pt(1.0),
            }),
            PageBorder::Double => Some(BorderSpec {
                lines: 2,
                inset: Pt(2.25),
                line_width: Pt(0.5),
            }),
            PageBorder::DoubleThick => Some(BorderSpec {
                lines: 2,
                inset: Pt(4.5),
                line_width: Pt(1.0),
            }),
        }
    }

    /// The rectangles to stroke, innermost first.
    pub fn rects(&self, cell: Rect) -> Vec<Rect> {
        (0..self.lines)
            .map(|i| {
                let inset = Pt(self.inset.0 * (i as f32 + 1.0));
                Rect::new(
                    cell.left + inset,
                    cell.bottom + inset,
                    cell.right - inset,
                    cell.top - inset,
                )
            })
            .collect()
    }
}

/// Whether the input page's rectangle should be rotated 90 degrees to best
/// fit the cell: true when the cell and input disagree on
/// portrait-vs-landscape orientation.
pub fn needs_orientation_swap(cell: Rect, input: Rect) -> bool {
    let cell_landscape = cell.width().0 > cell.height().0;
    let input_landscape = input.width().0 > input.height().0;
    cell_landscape != input_landscape
}

/// Scale factor to map an `iwidth`×`iheight` input page into a
/// `width`×`height` cell, per `print_scaling`.
pub fn scaling_factor(width: Pt, height: Pt, iwidth: Pt, iheight: Pt, print_scaling: PrintScaling) -> f32 {
    let sx = width.0 / iwidth.0;
    let sy = height.0 / iheight.0;
    match print_scaling {
        PrintScaling::Fill => sx.max(sy),
        PrintScaling::None => 1.0,
        _ => sx.min(sy),
    }
}

/// Builds the content-stream CTM that places a scaled, optionally-rotated,
/// optionally-mirrored input page centered in `cell`.
pub fn build_ctm(cell: Rect, iwidth: Pt, iheight: Pt, scale: f32, rotate_90: bool, mirror: bool, media_width: Pt) -> Matrix {
    let cw = cell.width();
    let ch = cell.height();
    let (scaled_w, scaled_h) = if rotate_90 {
        (Pt(iheight.0 * scale), Pt(iwidth.0 * scale))
    } else {
        (Pt(iwidth.0 * scale), Pt(iheight.0 * scale))
    };
    let x0 = cell.left.0 + (cw.0 - scaled_w.0) / 2.0;
    let y0 = cell.bottom.0 + (ch.0 - scaled_h.0) / 2.0;

    let place = if rotate_90 {
        Matrix([0.0, -scale, scale, 0.0, x0, y0])
    } else {
        Matrix([scale, 0.0, 0.0, scale, x0, y0])
    };

    if mirror {
        let mirror_m = Matrix([-1.0, 0.0, 0.0, 1.0, media_width.0, 0.0]);
        mirror_m.then(place)
    } else {
        place
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scaling_picks_min_for_fit_and_max_for_fill() {
        let s_fit = scaling_factor(Pt(100.0), Pt(50.0), Pt(200.0), Pt(50.0), PrintScaling::Fit);
        assert!((s_fit - 0.5).abs() < 1e-6);
        let s_fill = scaling_factor(Pt(100.0), Pt(50.0), Pt(200.0), Pt(50.0), PrintScaling::Fill);
        assert!((s_fill - 1.0).abs() < 1e-6);
    }

    #[test]
    fn orientation_swap_detected_when_cell_and_input_disagree() {
        let cell = Rect::from_size(Pt(200.0), Pt(100.0));
        let input_portrait = Rect::from_size(Pt(100.0), Pt(200.0));
        assert!(needs_orientation_swap(cell, input_portrait));
        let input_landscape = Rect::from_size(Pt(200.0), Pt(100.0));
        assert!(!needs_orientation_swap(cell, input_landscape));
    }

    #[test]
    fn ctm_centers_scaled_content_in_cell() {
        let cell = Rect::from_size(Pt(100.0), Pt(100.0));
        let m = build_ctm(cell, Pt(50.0), Pt(50.0), 1.0, false, false, Pt(0.0));
        assert_eq!(m.0[4], 25.0);
        assert_eq!(m.0[5], 25.0);
    }

    #[test]
    fn mirror_prepends_horizontal_flip() {
        let cell = Rect::from_size(Pt(100.0), Pt(100.0));
        let m = build_ctm(cell, Pt(50.0), Pt(50.0), 1.0, false, true, Pt(200.0));
        // After mirroring about media width 200, x should be reflected.
        assert!(m.0[0] < 0.0);
    }

    #[test]
    fn border_rects_are_inset_by_2_25_per_line() {
        let spec = BorderSpec::for_style(PageBorder::Single).unwrap();
        let cell = Rect::from_size(Pt(100.0), Pt(100.0));
        let rects = spec.rects(cell);
        assert_eq!(rects.len(), 1);
        assert!((rects[0].left.0 - 2.25).abs() < 1e-6);
    }
}
