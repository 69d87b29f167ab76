//! PWG/Apple Raster page header and the lazy row-source abstraction feeding
//! the encoder.

/// Source color space, as carried in a raster header's `cupsColorSpace`
/// field (the subset the encoder's color-decision table distinguishes).
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum RasterColorSpace {
    Sw,
    K,
    Srgb,
    AdobeRgb,
    Cmyk,
    Device(u8),
}

impl RasterColorSpace {
    pub fn channels(self) -> usize {
        match self {
            RasterColorSpace::Sw | RasterColorSpace::K => 1,
            RasterColorSpace::Srgb | RasterColorSpace::AdobeRgb => 3,
            RasterColorSpace::Cmyk => 4,
            RasterColorSpace::Device(n) => n as usize,
        }
    }
}

/// `RasterHeader`: the per-page geometry and color parameters a PWG/Apple
/// Raster stream carries ahead of its pixel data.
#[derive(Debug, Clone, PartialEq)]
pub struct RasterHeader {
    pub cups_width: u32,
    pub cups_height: u32,
    pub cups_bits_per_color: u8,
    pub cups_bits_per_pixel: u8,
    pub cups_bytes_per_line: u32,
    pub cups_color_space: RasterColorSpace,
    pub cups_rendering_intent: String,
    pub hw_resolution: [u32; 2],
}

impl RasterHeader {
    /// Validates the `cupsBytesPerLine * cupsHeight <= u32::MAX` invariant.
    pub fn validate(&self) -> crate::errors::Result<()> {
        let total = (self.cups_bytes_per_line as u64) * (self.cups_height as u64);
        if total > u32::MAX as u64 {
            return Err(crate::errors::Error::InputFormat(format!(
                "raster page too large: {} bytes/line * {} rows overflows u32",
                self.cups_bytes_per_line, self.cups_height
            )));
        }
        Ok(())
    }
}

/// A lazy source of raster rows, implemented by each decoder (PWG/Apple
/// Raster directly, TIFF/JPEG-XL via the `decoders` module).
pub trait RowSource {
    /// Reads the next page's header, or `None` at end of input.
    fn next_page_header(&mut self) -> crate::errors::Result<Option<RasterHeader>>;

    /// Reads exactly one row (`cupsBytesPerLine` bytes) of the current
    /// page into `buf`, which the caller sizes in advance.
    fn read_row(&mut self, buf: &mut [u8]) -> crate::errors::Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn header(bytes_per_line: u32, height: u32) -> RasterHeader {
        RasterHeader {
            cups_width: 100,
            cups_height: height,
            cups_bits_per_color: 8,
            cups_bits_per_pixel: 24,
            cups_bytes_per_line: bytes_per_line,
            cups_color_space: RasterColorSpace::Srgb,
            cups_rendering_intent: "Perceptual".to_string(),
            hw_resolution: [300, 300],
        }
    }

    #[test]
    fn validate_accepts_small_pages() {
        assert!(header(300, 100).validate().is_ok());
    }

    #[test]
    fn validate_rejects_overflowing_pages() {
        assert!(header(u32::MAX, u32::MAX).validate().is_err());
    }

    #[test]
    fn channel_counts_match_color_space() {
        assert_eq!(RasterColorSpace::Srgb.channels(), 3);
        assert_eq!(RasterColorSpace::Cmyk.channels(), 4);
        assert_eq!(RasterColorSpace::Device(6).channels(), 6);
    }
}
