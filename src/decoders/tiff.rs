//! TIFF input via the `tiff` crate, adapted to [`RowSource`].
//!
//! `tiff`'s `Decoder` hands back a whole image per `read_image()` call
//! rather than row-by-row, so we decode eagerly into a buffer on
//! `next_page_header` and serve `read_row` out of it — the same shape
//! `raster.rs`'s encoder already expects from a `RowSource`.

use std::io::{Read, Seek};

use tiff::decoder::{Decoder, DecodingResult};
use tiff::ColorType;

use crate::errors::{Error, Result};
use crate::raster_header::{RasterColorSpace, RasterHeader, RowSource};

fn tiff_err(e: tiff::TiffError) -> Error {
    Error::InputFormat(format!("tiff: {e}"))
}

fn classify(color_type: ColorType) -> Result<(RasterColorSpace, usize, u8)> {
    match color_type {
        ColorType::Gray(bits) => Ok((RasterColorSpace::Sw, 1, bits)),
        ColorType::RGB(bits) => Ok((RasterColorSpace::Srgb, 3, bits)),
        ColorType::RGBA(bits) => Ok((RasterColorSpace::Device(4), 4, bits)),
        ColorType::CMYK(bits) => Ok((RasterColorSpace::Cmyk, 4, bits)),
        other => Err(Error::InputFormat(format!(
            "unsupported TIFF photometric interpretation: {other:?}"
        ))),
    }
}

fn decoding_result_to_bytes(result: DecodingResult) -> Result<Vec<u8>> {
    match result {
        DecodingResult::U8(v) => Ok(v),
        DecodingResult::U16(v) => {
            let mut bytes = Vec::with_capacity(v.len() * 2);
            for sample in v {
                bytes.extend_from_slice(&sample.to_be_bytes());
            }
            Ok(bytes)
        }
        other => Err(Error::InputFormat(format!(
            "unsupported TIFF sample format: {other:?}"
        ))),
    }
}

/// A `RowSource` over a (possibly multi-page) TIFF stream.
pub struct TiffRowSource<R> {
    decoder: Option<Decoder<R>>,
    started: bool,
    buffer: Vec<u8>,
    bytes_per_line: usize,
    next_row: usize,
}

impl<R: Read + Seek> TiffRowSource<R> {
    pub fn new(reader: R) -> Result<Self> {
        let decoder = Decoder::new(reader).map_err(tiff_err)?;
        Ok(TiffRowSource {
            decoder: Some(decoder),
            started: false,
            buffer: Vec::new(),
            bytes_per_line: 0,
            next_row: 0,
        })
    }
}

impl<R: Read + Seek> RowSource for TiffRowSource<R> {
    fn next_page_header(&mut self) -> Result<Option<RasterHeader>> {
        let decoder = match self.decoder.as_mut() {
            Some(d) => d,
            None => return Ok(None),
        };

        if self.started {
            if !decoder.more_images() {
                self.decoder = None;
                return Ok(None);
            }
            decoder.next_image().map_err(tiff_err)?;
        }
        self.started = true;

        let (width, height) = decoder.dimensions().map_err(tiff_err)?;
        let color_type = decoder.colortype().map_err(tiff_err)?;
        let (color_space, channels, bits_per_sample) = classify(color_type)?;
        let image = decoder.read_image().map_err(tiff_err)?;
        let bytes = decoding_result_to_bytes(image)?;

        self.bytes_per_line = width as usize * channels * (bits_per_sample as usize / 8).max(1);
        self.buffer = bytes;
        self.next_row = 0;

        let header = RasterHeader {
            cups_width: width,
            cups_height: height,
            cups_bits_per_color: bits_per_sample,
            cups_bits_per_pixel: bits_per_sample * channels as u8,
            cups_bytes_per_line: self.bytes_per_line as u32,
            cups_color_space: color_space,
            cups_rendering_intent: "Perceptual".to_string(),
            hw_resolution: [300, 300],
        };
        header.validate()?;
        Ok(Some(header))
    }

    fn read_row(&mut self, buf: &mut [u8]) -> Result<()> {
        let start = self.next_row * self.bytes_per_line;
        let end = start + self.bytes_per_line;
        if end > self.buffer.len() {
            return Err(Error::InputFormat(
                "tiff: read_row past end of decoded page".to_string(),
            ));
        }
        buf.copy_from_slice(&self.buffer[start..end]);
        self.next_row += 1;
        Ok(())
    }
}
