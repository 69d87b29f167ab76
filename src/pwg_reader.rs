//! A [`crate::raster_header::RowSource`] reading the real PWG/Apple Raster
//! wire format: a 4-byte synchronization word (`RaS2`) followed by a
//! sequence of fixed-size, big-endian page headers and their row data,
//! back to back with no inter-page framing.
//!
//! Field layout and sizes mirror the well-known `cups_page_header2_t`
//! record (1796 bytes total); we only decode the handful of fields
//! `RasterHeader` carries and skip the rest with fixed-size reads so the
//! stream position stays correct for every page in the sequence.

use std::io::Read;

use crate::errors::{Error, Result};
use crate::raster_header::{RasterColorSpace, RasterHeader, RowSource};

const SYNC_WORD: &[u8; 4] = b"RaS2";

const STRINGS_BLOCK: usize = 64 * 4; // PwgRaster, MediaColor, MediaType, PrintContentOptimize
const RESERVED_0: usize = 12;
const RESERVED_1: usize = 16;
const RESERVED_2: usize = 12;
const RESERVED_3: usize = 8;
const RESERVED_4: usize = 4;
const RESERVED_5: usize = 8;
const RESERVED_6: usize = 4;
const RESERVED_7: usize = 16;
const RESERVED_8: usize = 28;
const RESERVED_9: usize = 20;
const VENDOR_DATA: usize = 4 + 4 + 1088; // vendor_identifier, vendor_length, vendor_data
const TAIL_STRINGS: usize = 64 + 64 + 64; // reserved_10, rendering_intent, page_size_name

/// Reads one `RasterHeader`'s worth of bytes (everything after the leading
/// strings block and up through `page_size_name`) from `r`, returning the
/// fields the encoder needs and leaving the cursor at the first pixel row.
fn read_header_body<R: Read>(r: &mut R) -> Result<RasterHeader> {
    skip(r, STRINGS_BLOCK)?;
    skip(r, RESERVED_0)?;
    let _cut_media = read_u32(r)?;
    let _duplex = read_u32(r)?;
    let hw_x = read_u32(r)?;
    let hw_y = read_u32(r)?;
    skip(r, RESERVED_1)?;
    let _insert_sheet = read_u32(r)?;
    let _jog = read_u32(r)?;
    let _leading_edge = read_u32(r)?;
    skip(r, RESERVED_2)?;
    let _media_position = read_u32(r)?;
    let _media_weight_metric = read_u32(r)?;
    skip(r, RESERVED_3)?;
    let _num_copies = read_u32(r)?;
    let _orientation = read_u32(r)?;
    skip(r, RESERVED_4)?;
    let _page_size_w = read_u32(r)?;
    let _page_size_h = read_u32(r)?;
    skip(r, RESERVED_5)?;
    let _tumble = read_u32(r)?;
    let width = read_u32(r)?;
    let height = read_u32(r)?;
    skip(r, RESERVED_6)?;
    let bits_per_color = read_u32(r)?;
    let bits_per_pixel = read_u32(r)?;
    let bytes_per_line = read_u32(r)?;
    let _color_order = read_u32(r)?;
    let color_space = read_u32(r)?;
    skip(r, RESERVED_7)?;
    let _num_colors = read_u32(r)?;
    skip(r, RESERVED_8)?;
    let _total_page_count = read_u32(r)?;
    let _cross_feed_transform = read_u32(r)?;
    let _feed_transform = read_u32(r)?;
    let _image_box_left = read_u32(r)?;
    let _image_box_top = read_u32(r)?;
    let _image_box_right = read_u32(r)?;
    let _image_box_bottom = read_u32(r)?;
    let _alternate_primary = read_u32(r)?;
    let _print_quality = read_u32(r)?;
    skip(r, RESERVED_9)?;
    skip(r, VENDOR_DATA)?;
    skip(r, 64)?; // reserved_10
    let rendering_intent = read_nul_terminated_string(r, 64)?;
    skip(r, 64)?; // page_size_name

    let header = RasterHeader {
        cups_width: width,
        cups_height: height,
        cups_bits_per_color: bits_per_color as u8,
        cups_bits_per_pixel: bits_per_pixel as u8,
        cups_bytes_per_line: bytes_per_line,
        cups_color_space: color_space_from_code(color_space),
        cups_rendering_intent: rendering_intent,
        hw_resolution: [hw_x, hw_y],
    };
    header.validate()?;
    Ok(header)
}

fn color_space_from_code(code: u32) -> RasterColorSpace {
    match code {
        3 => RasterColorSpace::K,
        6 => RasterColorSpace::Cmyk,
        18 => RasterColorSpace::Sw,
        19 => RasterColorSpace::Srgb,
        20 => RasterColorSpace::AdobeRgb,
        n if n <= u8::MAX as u32 => RasterColorSpace::Device(n as u8),
        _ => RasterColorSpace::Device(0),
    }
}

fn read_u32<R: Read>(r: &mut R) -> Result<u32> {
    let mut buf = [0u8; 4];
    r.read_exact(&mut buf)?;
    Ok(u32::from_be_bytes(buf))
}

fn skip<R: Read>(r: &mut R, n: usize) -> Result<()> {
    let mut buf = vec![0u8; n];
    r.read_exact(&mut buf)?;
    Ok(())
}

fn read_nul_terminated_string<R: Read>(r: &mut R, len: usize) -> Result<String> {
    let mut buf = vec![0u8; len];
    r.read_exact(&mut buf)?;
    let end = buf.iter().position(|&b| b == 0).unwrap_or(buf.len());
    Ok(String::from_utf8_lossy(&buf[..end]).into_owned())
}

/// Like `Read::read_exact`, but distinguishes "nothing left to read" (`Ok(false)`)
/// from "stream ended partway through a record" (an `InputFormat` error), so
/// callers can tell clean end-of-input apart from a truncated page header.
fn fill_or_eof<R: Read>(r: &mut R, buf: &mut [u8]) -> Result<bool> {
    let mut total = 0;
    while total < buf.len() {
        match r.read(&mut buf[total..]) {
            Ok(0) if total == 0 => return Ok(false),
            Ok(0) => {
                return Err(Error::InputFormat(
                    "truncated PWG Raster page header".to_string(),
                ))
            }
            Ok(n) => total += n,
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(Error::Io(e)),
        }
    }
    Ok(true)
}

/// Reads a PWG/Apple Raster byte stream page by page.
pub struct PwgRasterReader<R> {
    reader: R,
    synced: bool,
    current: Option<RasterHeader>,
}

impl<R: Read> PwgRasterReader<R> {
    pub fn new(reader: R) -> Self {
        PwgRasterReader {
            reader,
            synced: false,
            current: None,
        }
    }

    fn read_sync_word(&mut self) -> Result<bool> {
        let mut magic = [0u8; 4];
        if !fill_or_eof(&mut self.reader, &mut magic)? {
            return Ok(false);
        }
        if &magic != SYNC_WORD {
            return Err(Error::InputFormat(format!(
                "not a PWG Raster stream: expected sync word {:?}, got {:?}",
                SYNC_WORD, magic
            )));
        }
        Ok(true)
    }
}

impl<R: Read> RowSource for PwgRasterReader<R> {
    fn next_page_header(&mut self) -> Result<Option<RasterHeader>> {
        if !self.synced {
            self.synced = true;
            if !self.read_sync_word()? {
                return Ok(None);
            }
        }

        let mut probe = [0u8; 1];
        if !fill_or_eof(&mut self.reader, &mut probe)? {
            self.current = None;
            return Ok(None);
        }
        let rest = (STRINGS_BLOCK - 1)
            + RESERVED_0
            + 4 * 2 // cut_media, duplex
            + 4 * 2 // hw_resolution
            + RESERVED_1
            + 4 * 3 // insert_sheet, jog, leading_edge
            + RESERVED_2
            + 4 * 2 // media_position, media_weight_metric
            + RESERVED_3
            + 4 * 2 // num_copies, orientation
            + RESERVED_4
            + 4 * 2 // page_size
            + RESERVED_5
            + 4 * 3 // tumble, width, height
            + RESERVED_6
            + 4 * 5 // bits_per_color, bits_per_pixel, bytes_per_line, color_order, color_space
            + RESERVED_7
            + 4 // num_colors
            + RESERVED_8
            + 4 * 7 // total_page_count, cross/feed transform, image box * 4
            + 4 * 2 // alternate_primary, print_quality
            + RESERVED_9
            + VENDOR_DATA
            + TAIL_STRINGS;

        // `probe` already consumed the first byte of the strings block; chain
        // it back on so `read_header_body` sees a contiguous header.
        let mut chained = probe.to_vec();
        let mut remainder = vec![0u8; rest];
        self.reader.read_exact(&mut remainder)?;
        chained.extend_from_slice(&remainder);
        let header = read_header_body(&mut chained.as_slice())?;
        self.current = Some(header.clone());
        Ok(Some(header))
    }

    fn read_row(&mut self, buf: &mut [u8]) -> Result<()> {
        let _ = self
            .current
            .as_ref()
            .ok_or_else(|| Error::InputFormat("read_row called before a page header".to_string()))?;
        self.reader.read_exact(buf)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn sample_header_bytes(width: u32, height: u32, color_space: u32, bytes_per_line: u32) -> Vec<u8> {
        let mut out = Vec::new();
        out.extend_from_slice(SYNC_WORD);
        out.extend(std::iter::repeat(0u8).take(STRINGS_BLOCK)); // strings
        out.extend(std::iter::repeat(0u8).take(RESERVED_0));
        out.extend_from_slice(&0u32.to_be_bytes()); // cut_media
        out.extend_from_slice(&0u32.to_be_bytes()); // duplex
        out.extend_from_slice(&300u32.to_be_bytes()); // hw_resolution[0]
        out.extend_from_slice(&300u32.to_be_bytes()); // hw_resolution[1]
        out.extend(std::iter::repeat(0u8).take(RESERVED_1));
        out.extend_from_slice(&0u32.to_be_bytes()); // insert_sheet
        out.extend_from_slice(&0u32.to_be_bytes()); // jog
        out.extend_from_slice(&0u32.to_be_bytes()); // leading_edge
        out.extend(std::iter::repeat(0u8).take(RESERVED_2));
        out.extend_from_slice(&0u32.to_be_bytes()); // media_position
        out.extend_from_slice(&0u32.to_be_bytes()); // media_weight_metric
        out.extend(std::iter::repeat(0u8).take(RESERVED_3));
        out.extend_from_slice(&1u32.to_be_bytes()); // num_copies
        out.extend_from_slice(&0u32.to_be_bytes()); // orientation
        out.extend(std::iter::repeat(0u8).take(RESERVED_4));
        out.extend_from_slice(&595u32.to_be_bytes()); // page_size[0]
        out.extend_from_slice(&841u32.to_be_bytes()); // page_size[1]
        out.extend(std::iter::repeat(0u8).take(RESERVED_5));
        out.extend_from_slice(&0u32.to_be_bytes()); // tumble
        out.extend_from_slice(&width.to_be_bytes());
        out.extend_from_slice(&height.to_be_bytes());
        out.extend(std::iter::repeat(0u8).take(RESERVED_6));
        out.extend_from_slice(&8u32.to_be_bytes()); // bits_per_color
        out.extend_from_slice(&24u32.to_be_bytes()); // bits_per_pixel
        out.extend_from_slice(&bytes_per_line.to_be_bytes());
        out.extend_from_slice(&0u32.to_be_bytes()); // color_order
        out.extend_from_slice(&color_space.to_be_bytes());
        out.extend(std::iter::repeat(0u8).take(RESERVED_7));
        out.extend_from_slice(&3u32.to_be_bytes()); // num_colors
        out.extend(std::iter::repeat(0u8).take(RESERVED_8));
        out.extend_from_slice(&1u32.to_be_bytes()); // total_page_count
        out.extend_from_slice(&1i32.to_be_bytes()); // cross_feed_transform
        out.extend_from_slice(&1i32.to_be_bytes()); // feed_transform
        out.extend_from_slice(&0u32.to_be_bytes()); // image_box_left
        out.extend_from_slice(&0u32.to_be_bytes()); // image_box_top
        out.extend_from_slice(&0u32.to_be_bytes()); // image_box_right
        out.extend_from_slice(&0u32.to_be_bytes()); // image_box_bottom
        out.extend_from_slice(&0xFFFFFFu32.to_be_bytes()); // alternate_primary
        out.extend_from_slice(&0u32.to_be_bytes()); // print_quality
        out.extend(std::iter::repeat(0u8).take(RESERVED_9));
        out.extend(std::iter::repeat(0u8).take(VENDOR_DATA));
        out.extend(std::iter::repeat(0u8).take(64)); // reserved_10
        let mut intent = vec![0u8; 64];
        intent[..11].copy_from_slice(b"Perceptual\0");
        out.extend(intent);
        out.extend(std::iter::repeat(0u8).take(64)); // page_size_name
        out
    }

    #[test]
    fn reads_a_single_page_header_and_rejects_bad_sync() {
        let bytes = sample_header_bytes(4, 2, 19, 12);
        let mut reader = PwgRasterReader::new(Cursor::new(bytes));
        let header = reader.next_page_header().unwrap().unwrap();
        assert_eq!(header.cups_width, 4);
        assert_eq!(header.cups_height, 2);
        assert_eq!(header.cups_color_space, RasterColorSpace::Srgb);
        assert_eq!(header.cups_rendering_intent, "Perceptual");

        let mut bad = PwgRasterReader::new(Cursor::new(b"NOPE".to_vec()));
        assert!(bad.next_page_header().is_err());
    }

    #[test]
    fn empty_stream_yields_no_pages() {
        let mut reader = PwgRasterReader::new(Cursor::new(Vec::new()));
        assert_eq!(reader.next_page_header().unwrap(), None);
    }

    #[test]
    fn reads_row_bytes_after_a_header() {
        let mut bytes = sample_header_bytes(2, 1, 3, 2);
        bytes.extend_from_slice(&[0xAA, 0xBB]);
        let mut reader = PwgRasterReader::new(Cursor::new(bytes));
        let header = reader.next_page_header().unwrap().unwrap();
        assert_eq!(header.cups_color_space, RasterColorSpace::K);
        let mut row = vec![0u8; header.cups_bytes_per_line as usize];
        reader.read_row(&mut row).unwrap();
        assert_eq!(row, vec![0xAA, 0xBB]);
    }
}
