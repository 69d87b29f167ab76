//! Row sources for the raster input formats that aren't PWG/Apple Raster
//! itself: TIFF (decoded via the `tiff` crate) and JPEG-XL (signature
//! detection only — decoding it is out of scope, see [`jxl`]).

pub mod jxl;
pub mod tiff;

pub use self::jxl::JxlRowSource;
pub use self::tiff::TiffRowSource;
