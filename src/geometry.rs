//! Page geometry primitives: rectangles and quarter-turn rotations.
//!
//! Grounded in the deleted `rectangle.rs`'s `Rect` (llx/lly/urx/ury + stream-op
//! emission), generalized to the `{left,bottom,right,top,width,height}` shape
//! the imposition planner and page copier need, plus the `rotate_move`
//! contract from the spec's geometry component.

use serde::{Deserialize, Serialize};

use crate::matrix::Matrix;
use crate::units::Pt;

/// Axis-aligned rectangle in PDF user-space points.
///
/// Invariant: `width == right - left`, `height == top - bottom`, both
/// non-negative.
#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    pub left: Pt,
    pub bottom: Pt,
    pub right: Pt,
    pub top: Pt,
}

impl Rect {
    pub fn new(left: Pt, bottom: Pt, right: Pt, top: Pt) -> Self {
        Self {
            left,
            bottom,
            right,
            top,
        }
    }

    /// Builds a rectangle anchored at the origin with the given width/height.
    pub fn from_size(width: Pt, height: Pt) -> Self {
        Self::new(Pt(0.0), Pt(0.0), width, height)
    }

    pub fn width(&self) -> Pt {
        self.right - self.left
    }

    pub fn height(&self) -> Pt {
        self.top - self.bottom
    }

    pub fn translate(&self, dx: Pt, dy: Pt) -> Self {
        Self {
            left: self.left + dx,
            right: self.right + dx,
            bottom: self.bottom + dy,
            top: self.top + dy,
        }
    }

    pub fn scale(&self, factor: f32) -> Self {
        Self {
            left: self.left * factor,
            right: self.right * factor,
            bottom: self.bottom * factor,
            top: self.top * factor,
        }
    }

    /// Emits the rectangle as a PDF `re` path-construction operator operand
    /// list: `x y width height`.
    pub fn into_stream_op(self) -> lopdf::content::Operation {
        use crate::glob_defines::OP_PATH_CONST_RECT;
        lopdf::content::Operation::new(
            OP_PATH_CONST_RECT,
            vec![
                self.left.0.into(),
                self.bottom.0.into(),
                self.width().0.into(),
                self.height().0.into(),
            ],
        )
    }

    /// Rotates the rectangle about the origin by `r`, then translates it so
    /// it sits back in the positive quadrant of a `w`×`h` (or, for ±90°
    /// rotations, `h`×`w`) sheet. This is the `rotate_move` contract from the
    /// spec: applying it and then its inverse with swapped dimensions returns
    /// the original rectangle.
    pub fn rotate_move(&self, r: Rotation, w: Pt, h: Pt) -> Self {
        let (w0, h0, x0, y0) = (self.width(), self.height(), self.left, self.bottom);
        match r {
            Rotation::R0 => *self,
            Rotation::R90 => {
                // rotate ccw 90: (x,y) -> (-y,x); translate by (h,0) to stay positive.
                Rect::new(
                    h - (y0 + h0),
                    x0,
                    h - y0,
                    x0 + w0,
                )
                .normalized_against(w, h)
            }
            Rotation::R180 => Rect::new(
                w - (x0 + w0),
                h - (y0 + h0),
                w - x0,
                h - y0,
            ),
            Rotation::R270 => {
                // rotate ccw 270: (x,y) -> (y,-x); translate by (0,w).
                Rect::new(
                    y0,
                    w - (x0 + w0),
                    y0 + h0,
                    w - x0,
                )
                .normalized_against(h, w)
            }
        }
    }

    /// No-op hook kept for symmetry with the C implementation's bounds
    /// clamping; `rotate_move`'s arithmetic above already lands in range.
    fn normalized_against(self, _w: Pt, _h: Pt) -> Self {
        self
    }
}

/// Quarter-turn page rotation.
///
/// PDF's `/Rotate` is clockwise; this type's arithmetic (`+`, unary `-`) is
/// counter-clockwise modulo 4. The mapping to `/Rotate` degrees
/// (`R0→0, R90→270, R180→180, R270→90`) is applied only at the PDF boundary,
/// via [`Rotation::to_pdf_degrees`].
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Rotation {
    R0,
    R90,
    R180,
    R270,
}

impl Rotation {
    pub fn as_quarter_turns(self) -> i32 {
        match self {
            Rotation::R0 => 0,
            Rotation::R90 => 1,
            Rotation::R180 => 2,
            Rotation::R270 => 3,
        }
    }

    pub fn from_quarter_turns(n: i32) -> Self {
        match n.rem_euclid(4) {
            0 => Rotation::R0,
            1 => Rotation::R90,
            2 => Rotation::R180,
            _ => Rotation::R270,
        }
    }

    pub fn is_swapped_axes(self) -> bool {
        matches!(self, Rotation::R90 | Rotation::R270)
    }

    /// Counter-clockwise degrees, matching this crate's internal convention.
    pub fn as_ccw_degrees(self) -> f32 {
        self.as_quarter_turns() as f32 * 90.0
    }

    /// The value to place in a PDF page's `/Rotate` entry (clockwise).
    pub fn to_pdf_degrees(self) -> i64 {
        match self {
            Rotation::R0 => 0,
            Rotation::R90 => 270,
            Rotation::R180 => 180,
            Rotation::R270 => 90,
        }
    }

    /// The rotation matrix (about the origin) for this quarter turn.
    pub fn to_matrix(self) -> Matrix {
        Matrix::rotate_quarter(self.as_quarter_turns())
    }
}

impl std::ops::Add for Rotation {
    type Output = Rotation;
    fn add(self, rhs: Rotation) -> Rotation {
        Rotation::from_quarter_turns(self.as_quarter_turns() + rhs.as_quarter_turns())
    }
}

impl std::ops::Neg for Rotation {
    type Output = Rotation;
    fn neg(self) -> Rotation {
        Rotation::from_quarter_turns(-self.as_quarter_turns())
    }
}

impl Default for Rotation {
    fn default() -> Self {
        Rotation::R0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rotate_move_is_involution_within_epsilon() {
        let w = Pt(200.0);
        let h = Pt(100.0);
        let r = Rect::new(Pt(10.0), Pt(5.0), Pt(60.0), Pt(40.0));

        for rot in [Rotation::R0, Rotation::R90, Rotation::R180, Rotation::R270] {
            let (w2, h2) = if rot.is_swapped_axes() { (h, w) } else { (w, h) };
            let moved = r.rotate_move(rot, w, h);
            let back = moved.rotate_move(-rot, w2, h2);
            assert!((back.left.0 - r.left.0).abs() < 1e-4, "rot={rot:?}");
            assert!((back.bottom.0 - r.bottom.0).abs() < 1e-4, "rot={rot:?}");
            assert!((back.right.0 - r.right.0).abs() < 1e-4, "rot={rot:?}");
            assert!((back.top.0 - r.top.0).abs() < 1e-4, "rot={rot:?}");
        }
    }

    #[test]
    fn rotation_addition_wraps_mod_4() {
        assert_eq!(Rotation::R270 + Rotation::R180, Rotation::R90);
        assert_eq!(-Rotation::R90, Rotation::R270);
    }

    #[test]
    fn pdf_rotate_mapping_matches_contract() {
        assert_eq!(Rotation::R0.to_pdf_degrees(), 0);
        assert_eq!(Rotation::R90.to_pdf_degrees(), 270);
        assert_eq!(Rotation::R180.to_pdf_degrees(), 180);
        assert_eq!(Rotation::R270.to_pdf_degrees(), 90);
    }
}
