//! Per-pixel color and bit-depth conversion for the raster-to-PDF encoder.
//!
//! Modeled as enums with match-based dispatch rather than function
//! pointers, per the source's dynamic-dispatch table over color-space
//! pairs and bit widths — this keeps each conversion monomorphized and
//! inlinable. Every conversion is parameterized by `bytes_per_sample` (1
//! for 8-bit, 2 for 16-bit raster data) so the same dispatch table serves
//! both depths without duplicated per-depth code paths.

/// Which bit-level transform to apply to each sample before color
/// conversion. Byte-wise bitwise NOT is depth-agnostic: inverting every
/// byte of a multi-byte sample is the same as inverting the sample itself,
/// regardless of its byte order, so this never needs a depth parameter.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum BitConversion {
    Identity,
    Invert,
}

impl BitConversion {
    pub fn apply(self, row: &mut [u8]) {
        if let BitConversion::Invert = self {
            for b in row.iter_mut() {
                *b = !*b;
            }
        }
    }
}

/// Which channel-level transform to apply, chosen from the raster's source
/// color space and the destination the PDF page needs.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ColorConversion {
    Identity,
    Invert,
    RgbToCmyk,
    CmykToRgb,
    RgbToWhite,
    WhiteToRgb,
    CmykToWhite,
    WhiteToCmyk,
}

impl ColorConversion {
    /// Input and output channel counts for this conversion.
    pub fn channels(self) -> (usize, usize) {
        match self {
            ColorConversion::Identity | ColorConversion::Invert => (1, 1),
            ColorConversion::RgbToCmyk => (3, 4),
            ColorConversion::CmykToRgb => (4, 3),
            ColorConversion::RgbToWhite => (3, 1),
            ColorConversion::WhiteToRgb => (1, 3),
            ColorConversion::CmykToWhite => (4, 1),
            ColorConversion::WhiteToCmyk => (1, 4),
        }
    }

    /// Converts one pixel's samples, each `bytes_per_sample` bytes wide (1
    /// for 8-bit raster data, 2 for 16-bit). `Identity`/`Invert` pass
    /// `src` through byte-for-byte regardless of depth; the math
    /// conversions read each channel as a normalized `f32` so they work
    /// identically at either depth, then re-quantize to the same depth on
    /// the way out.
    pub fn apply_pixel(self, src: &[u8], dst: &mut Vec<u8>, bytes_per_sample: usize) {
        match self {
            ColorConversion::Identity => dst.extend_from_slice(src),
            ColorConversion::Invert => dst.extend(src.iter().map(|b| !b)),
            _ => {
                let (in_ch, _) = self.channels();
                let max = sample_max(bytes_per_sample);
                let mut s = [0f32; 4];
                for (i, slot) in s.iter_mut().enumerate().take(in_ch) {
                    let off = i * bytes_per_sample;
                    *slot = read_sample(&src[off..off + bytes_per_sample], bytes_per_sample) as f32 / max;
                }
                let out: Vec<f32> = match self {
                    ColorConversion::RgbToCmyk => {
                        let (c, m, y, k) = rgb_to_cmyk_f(s[0], s[1], s[2]);
                        vec![c, m, y, k]
                    }
                    ColorConversion::CmykToRgb => {
                        let (r, g, b) = cmyk_to_rgb_f(s[0], s[1], s[2], s[3]);
                        vec![r, g, b]
                    }
                    ColorConversion::RgbToWhite => vec![luminance_f(s[0], s[1], s[2])],
                    ColorConversion::WhiteToRgb => vec![s[0], s[0], s[0]],
                    ColorConversion::CmykToWhite => {
                        let (r, g, b) = cmyk_to_rgb_f(s[0], s[1], s[2], s[3]);
                        vec![luminance_f(r, g, b)]
                    }
                    ColorConversion::WhiteToCmyk => vec![0.0, 0.0, 0.0, 1.0 - s[0]],
                    ColorConversion::Identity | ColorConversion::Invert => unreachable!(),
                };
                for v in out {
                    write_sample(dst, (v.clamp(0.0, 1.0) * max).round() as u32, bytes_per_sample);
                }
            }
        }
    }

    /// Converts a full row of packed pixel data at the given sample depth.
    pub fn apply_row(self, row: &[u8], bytes_per_sample: usize) -> Vec<u8> {
        let (in_ch, out_ch) = self.channels();
        let in_stride = (in_ch * bytes_per_sample).max(1);
        let mut out = Vec::with_capacity((row.len() / in_stride) * out_ch * bytes_per_sample);
        for pixel in row.chunks_exact(in_stride) {
            self.apply_pixel(pixel, &mut out, bytes_per_sample);
        }
        out
    }
}

fn sample_max(bytes_per_sample: usize) -> f32 {
    if bytes_per_sample >= 2 {
        65535.0
    } else {
        255.0
    }
}

fn read_sample(bytes: &[u8], bytes_per_sample: usize) -> u32 {
    if bytes_per_sample >= 2 {
        u16::from_ne_bytes([bytes[0], bytes[1]]) as u32
    } else {
        bytes[0] as u32
    }
}

fn write_sample(dst: &mut Vec<u8>, v: u32, bytes_per_sample: usize) {
    if bytes_per_sample >= 2 {
        dst.extend_from_slice(&(v as u16).to_ne_bytes());
    } else {
        dst.push(v as u8);
    }
}

fn rgb_to_cmyk_f(r: f32, g: f32, b: f32) -> (f32, f32, f32, f32) {
    let k = 1.0 - r.max(g).max(b);
    if k >= 1.0 {
        return (0.0, 0.0, 0.0, 1.0);
    }
    let c = (1.0 - r - k) / (1.0 - k);
    let m = (1.0 - g - k) / (1.0 - k);
    let y = (1.0 - b - k) / (1.0 - k);
    (c, m, y, k)
}

fn cmyk_to_rgb_f(c: f32, m: f32, y: f32, k: f32) -> (f32, f32, f32) {
    (
        (1.0 - c) * (1.0 - k),
        (1.0 - m) * (1.0 - k),
        (1.0 - y) * (1.0 - k),
    )
}

fn luminance_f(r: f32, g: f32, b: f32) -> f32 {
    0.299 * r + 0.587 * g + 0.114 * b
}

fn rgb_to_cmyk(r: u8, g: u8, b: u8) -> (u8, u8, u8, u8) {
    let (c, m, y, k) = rgb_to_cmyk_f(r as f32 / 255.0, g as f32 / 255.0, b as f32 / 255.0);
    (
        (c * 255.0).round() as u8,
        (m * 255.0).round() as u8,
        (y * 255.0).round() as u8,
        (k * 255.0).round() as u8,
    )
}

fn cmyk_to_rgb(c: u8, m: u8, y: u8, k: u8) -> (u8, u8, u8) {
    let (r, g, b) = cmyk_to_rgb_f(c as f32 / 255.0, m as f32 / 255.0, y as f32 / 255.0, k as f32 / 255.0);
    (
        (r * 255.0).round() as u8,
        (g * 255.0).round() as u8,
        (b * 255.0).round() as u8,
    )
}

/// Byte-swaps 16-bit big-endian raster samples in place when running on a
/// little-endian host, per the raster page contract. Involutive: calling
/// it twice returns the original byte order, which is how the encoder
/// both reads wire-format rows into host order for conversion and writes
/// the converted result back out in wire (big-endian) order.
pub fn fix_16bpc_endianness(row: &mut [u8]) {
    #[cfg(target_endian = "little")]
    {
        for pair in row.chunks_exact_mut(2) {
            pair.swap(0, 1);
        }
    }
    #[cfg(target_endian = "big")]
    {
        let _ = row;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rgb_cmyk_roundtrip_is_approximately_stable() {
        let (c, m, y, k) = rgb_to_cmyk(200, 100, 50);
        let (r, g, b) = cmyk_to_rgb(c, m, y, k);
        assert!((r as i32 - 200).abs() <= 2);
        assert!((g as i32 - 100).abs() <= 2);
        assert!((b as i32 - 50).abs() <= 2);
    }

    #[test]
    fn white_is_pure_black_generates_full_k() {
        assert_eq!(rgb_to_cmyk(0, 0, 0), (0, 0, 0, 255));
    }

    #[test]
    fn invert_bit_conversion_flips_all_bits() {
        let mut row = vec![0x00, 0xFF, 0x0F];
        BitConversion::Invert.apply(&mut row);
        assert_eq!(row, vec![0xFF, 0x00, 0xF0]);
    }

    #[test]
    fn rgb_to_white_uses_luminance_weights() {
        let mut out = Vec::new();
        ColorConversion::RgbToWhite.apply_pixel(&[255, 255, 255], &mut out, 1);
        assert_eq!(out, vec![255]);
    }

    #[test]
    fn apply_row_dispatches_across_whole_row() {
        let row = [255u8, 0, 0, 0, 255, 0];
        let out = ColorConversion::RgbToCmyk.apply_row(&row, 1);
        assert_eq!(out.len(), 8);
    }

    #[test]
    fn apply_row_16bpc_preserves_sample_width_and_count() {
        // Two native-endian u16 RGB pixels: white, then black.
        let mut row = Vec::new();
        row.extend_from_slice(&0xFFFFu16.to_ne_bytes());
        row.extend_from_slice(&0xFFFFu16.to_ne_bytes());
        row.extend_from_slice(&0xFFFFu16.to_ne_bytes());
        row.extend_from_slice(&0u16.to_ne_bytes());
        row.extend_from_slice(&0u16.to_ne_bytes());
        row.extend_from_slice(&0u16.to_ne_bytes());

        let out = ColorConversion::RgbToWhite.apply_row(&row, 2);
        assert_eq!(out.len(), 4); // 2 pixels * 1 channel * 2 bytes
        assert_eq!(u16::from_ne_bytes([out[0], out[1]]), 0xFFFF);
        assert_eq!(u16::from_ne_bytes([out[2], out[3]]), 0);
    }

    #[test]
    fn identity_conversion_is_depth_agnostic() {
        let row = [0x12u8, 0x34, 0x56, 0x78];
        assert_eq!(ColorConversion::Identity.apply_row(&row, 2), row.to_vec());
    }
}
