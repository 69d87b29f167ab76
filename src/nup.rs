//! N-up layout: column/row table, cell placement order, and the booklet
//! page shuffle.
//!
//! Grounded in the original `pdftopdf.c`'s `prepare_pages`/layout-selection
//! logic: booklet forces a fixed 2-up layout and walks input pages into a
//! front-half/back-half output-page pairing; normal N-up walks them
//! left-to-right into `num_layout`-sized groups whose cells are placed by
//! `orientation_requested`.

use crate::geometry::Rotation;
use crate::units::Pt;

/// `(cols, rows, landscape)` for a supported `number-up` value.
pub fn layout_for(number_up: u32) -> (u32, u32, bool) {
    match number_up {
        1 => (1, 1, false),
        2 => (1, 2, true),
        3 => (1, 3, true),
        4 => (2, 2, false),
        6 => (2, 3, true),
        8 => (2, 4, true),
        9 => (3, 3, false),
        10 => (2, 5, true),
        12 => (3, 4, false),
        15 => (3, 5, true),
        16 => (4, 4, false),
        _ => (1, 1, false),
    }
}

/// Row/column of cell `i` (0-based, `i < cols*rows`) within the grid, given
/// `orientation_requested`. `R90`/`landscape` and `R270`/`rev-landscape` use
/// the spec's "landscape"/"reverse landscape" placement rules; `R0`/`R180`
/// use "portrait"/"reverse portrait".
pub fn cell_position(i: u32, cols: u32, rows: u32, orientation: Rotation) -> (u32, u32) {
    match orientation {
        Rotation::R0 => (i % cols, rows - 1 - i / cols),
        Rotation::R90 => (cols - 1 - i / rows, rows - 1 - (i % rows)),
        Rotation::R180 => (cols - 1 - (i % cols), i / cols),
        Rotation::R270 => (i / rows, i % rows),
    }
}

/// Number of output pages a booklet imposition of `num_inpages` input pages
/// produces: rounded up to a multiple of 2, then up again if that's odd
/// (i.e. a multiple of 4 overall, matching a signature that folds evenly).
pub fn booklet_num_outpages(num_inpages: u32) -> u32 {
    let mut n = num_inpages.div_ceil(2);
    if n % 2 == 1 {
        n += 1;
    }
    n
}

/// Booklet output-page index for the `current`-th (0-based) input page
/// placed, given the total `num_outpages`. The first half of input pages
/// fill output pages front-to-back in order; the second half fill the same
/// output pages in reverse, producing a stack that reads in order once
/// folded and stapled along the spine.
pub fn booklet_output_page(current: u32, num_outpages: u32) -> u32 {
    if current < num_outpages {
        current
    } else {
        2 * num_outpages - current - 1
    }
}

/// Which of the two booklet half-sheet cells (0 = top, 1 = bottom) a given
/// input page occupies: alternates with every input page placed.
pub fn booklet_cell(current: u32) -> u32 {
    current % 2
}

/// Horizontal/vertical alignment of a subpage within its cell once scaled.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Align {
    pub x: f32,
    pub y: f32,
}

impl Default for Align {
    fn default() -> Self {
        Align { x: 0.5, y: 0.5 }
    }
}

/// Uniform scale factor and placement offset to fit a `page` sized
/// `(page_w, page_h)` into a `cell` sized `(cell_w, cell_h)`, preserving
/// aspect ratio and filling the cell, then centering (or `align`-ing) the
/// leftover space.
pub fn fit_to_cell(page_w: Pt, page_h: Pt, cell_w: Pt, cell_h: Pt, align: Align) -> (f32, Pt, Pt) {
    let scale = (cell_w.0 / page_w.0).min(cell_h.0 / page_h.0);
    let scaled_w = Pt(page_w.0 * scale);
    let scaled_h = Pt(page_h.0 * scale);
    let slack_x = cell_w - scaled_w;
    let slack_y = cell_h - scaled_h;
    (scale, slack_x * align.x, slack_y * align.y)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn layout_table_matches_contract() {
        assert_eq!(layout_for(1), (1, 1, false));
        assert_eq!(layout_for(2), (1, 2, true));
        assert_eq!(layout_for(6), (2, 3, true));
        assert_eq!(layout_for(9), (3, 3, false));
        assert_eq!(layout_for(16), (4, 4, false));
    }

    #[test]
    fn cell_position_portrait_fills_bottom_row_first() {
        // 2x2 grid, portrait: cell 0 is bottom-left, cell 1 bottom-right,
        // cell 2 top-left, cell 3 top-right.
        assert_eq!(cell_position(0, 2, 2, Rotation::R0), (0, 1));
        assert_eq!(cell_position(1, 2, 2, Rotation::R0), (1, 1));
        assert_eq!(cell_position(2, 2, 2, Rotation::R0), (0, 0));
        assert_eq!(cell_position(3, 2, 2, Rotation::R0), (1, 0));
    }

    #[test]
    fn booklet_output_pages_round_up_to_multiple_of_four_signature() {
        assert_eq!(booklet_num_outpages(1), 2);
        assert_eq!(booklet_num_outpages(4), 2);
        assert_eq!(booklet_num_outpages(5), 4);
        assert_eq!(booklet_num_outpages(8), 4);
    }

    #[test]
    fn booklet_shuffle_reverses_second_half() {
        let n = booklet_num_outpages(8); // 4
        let seq: Vec<u32> = (0..8).map(|c| booklet_output_page(c, n)).collect();
        assert_eq!(seq, vec![0, 1, 2, 3, 3, 2, 1, 0]);
    }

    #[test]
    fn fit_to_cell_preserves_aspect_and_centers() {
        let (scale, ox, oy) = fit_to_cell(Pt(100.0), Pt(200.0), Pt(50.0), Pt(50.0), Align::default());
        assert!((scale - 0.25).abs() < 1e-6);
        assert!(ox.0 > 0.0);
        assert!((oy.0).abs() < 1e-6);
    }
}
