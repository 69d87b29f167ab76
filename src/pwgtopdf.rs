//! Raster-to-PDF/PCLm pipeline: wires a [`crate::raster_header::RowSource`]
//! (PWG/Apple Raster, TIFF, or a JPEG-XL signature check) through
//! [`crate::raster`]'s per-page encoder into a finished document via
//! [`crate::pdf_adapter::PdfFile`].

use std::io::{Read, Seek};

use lopdf::{Dictionary, Object};

use crate::decoders::{JxlRowSource, TiffRowSource};
use crate::env::Env;
use crate::errors::{Error, Result};
use crate::filter_data::FilterData;
use crate::pdf_adapter::PdfFile;
use crate::pwg_reader::PwgRasterReader;
use crate::raster::{self, ColorManagement, EncodedPage, StreamFilter};
use crate::raster_header::RowSource;

/// Output shape: a single full-page image per page, or PCLm strips.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum OutputFormat {
    Pdf,
    Pclm,
}

fn output_format(final_content_type: &str) -> OutputFormat {
    if final_content_type.eq_ignore_ascii_case("application/pclm") {
        OutputFormat::Pclm
    } else {
        OutputFormat::Pdf
    }
}

fn color_management(filter_data: &FilterData) -> ColorManagement<'static> {
    match filter_data.options.get("cm-disabled").map(String::as_str) {
        Some("yes") | Some("true") => ColorManagement::Disabled,
        _ => ColorManagement::NoProfile,
    }
}

fn strip_height(filter_data: &FilterData) -> u32 {
    filter_data
        .printer_attr("pclm-strip-height-preferred")
        .and_then(|v| v.split(',').next())
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(16)
}

fn compression_method(filter_data: &FilterData) -> StreamFilter {
    raster::negotiate_compression(filter_data.printer_attr("pclm-compression-method-preferred"))
}

/// Builds the page dictionary + `/Resources/XObject` entries for one
/// encoded page and registers its image streams, returning the new page's
/// object ID.
fn write_page(doc: &PdfFile, width_pt: f32, height_pt: f32, encoded: EncodedPage, names: &[String]) -> Result<lopdf::ObjectId> {
    let mut xobjects = Dictionary::new();
    for (image, name) in encoded.images.into_iter().zip(names) {
        let stream: lopdf::Stream = image.into();
        let id = doc.create_stream(stream);
        xobjects.set(name.as_str(), Object::Reference(id));
    }

    let mut resources = Dictionary::new();
    resources.set("XObject", Object::Dictionary(xobjects));

    let content_bytes = encoded.content.encode().map_err(|e| Error::InputFormat(format!("content stream encode failed: {e}")))?;
    let content_id = doc.create_stream(lopdf::Stream::new(Dictionary::new(), content_bytes));

    let mut page = Dictionary::new();
    page.set("Type", Object::Name(b"Page".to_vec()));
    page.set("MediaBox", Object::Array(vec![0.into(), 0.into(), width_pt.into(), height_pt.into()]));
    page.set("Resources", Object::Dictionary(resources));
    page.set("Contents", Object::Reference(content_id));

    Ok(doc.create_object(Object::Dictionary(page)))
}

fn build_row_source<'a, R: Read + Seek + 'a>(content_type: &str, reader: R) -> Result<Box<dyn RowSource + 'a>> {
    match content_type {
        "image/pwg-raster" | "image/urf" => Ok(Box::new(PwgRasterReader::new(reader))),
        "image/tiff" => Ok(Box::new(TiffRowSource::new(reader)?)),
        "image/jxl" => Ok(Box::new(JxlRowSource::new(reader))),
        other => Err(Error::Unsupported(format!("unsupported raster input type: {other}"))),
    }
}

/// Runs the full raster-to-PDF/PCLm transform and returns the output
/// document's bytes.
pub fn run<R: Read + Seek>(filter_data: &FilterData, reader: R, env: &Env) -> Result<Vec<u8>> {
    let mut source = build_row_source(&filter_data.content_type, reader)?;
    let format = output_format(&filter_data.final_content_type);
    let cm = color_management(filter_data);
    let strip_h = strip_height(filter_data);
    let compression = compression_method(filter_data);

    let doc = PdfFile::create("1.7");
    let mut page_ids = Vec::new();

    while let Some(header) = source.next_page_header()? {
        if env.is_canceled() {
            return Err(Error::Cancelled);
        }

        let (encoded, names): (EncodedPage, Vec<String>) = match format {
            OutputFormat::Pdf => {
                let page = raster::encode_page_pdf(&header, source.as_mut(), &cm)?;
                (page, vec![raster::SINGLE_IMAGE_NAME.to_string()])
            }
            OutputFormat::Pclm => {
                let page = raster::encode_page_pclm(&header, source.as_mut(), &cm, strip_h, compression)?;
                let names = (0..page.images.len()).map(raster::strip_name).collect();
                (page, names)
            }
        };

        let pt_per_px_x = 72.0 / header.hw_resolution[0].max(1) as f32;
        let pt_per_px_y = 72.0 / header.hw_resolution[1].max(1) as f32;
        let width_pt = header.cups_width as f32 * pt_per_px_x;
        let height_pt = header.cups_height as f32 * pt_per_px_y;

        let page_id = write_page(&doc, width_pt, height_pt, encoded, &names)?;
        page_ids.push(page_id);
        env.log(crate::env::LogLevel::Debug, &format!("encoded page {}", page_ids.len()));
    }

    let catalog_entries: Vec<(&str, Object)> = match format {
        OutputFormat::Pclm => vec![(
            "PCLm-Version",
            Object::String(b"PCLm-1.0".to_vec(), lopdf::StringFormat::Literal),
        )],
        OutputFormat::Pdf => Vec::new(),
    };
    doc.finish_catalog(&page_ids, &catalog_entries)?;
    doc.into_bytes()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    const STRINGS_BLOCK: usize = 64 * 4;
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
    const VENDOR_DATA: usize = 4 + 4 + 1088;

    /// Mirrors pwg_reader.rs's own test fixture builder field-for-field, so
    /// the header this module hands the encoder is a real, validly-shaped
    /// PWG Raster page rather than an offset guess.
    fn sample_pwg_page(width: u32, height: u32, bytes_per_line: u32) -> Vec<u8> {
        let mut out = Vec::new();
        out.extend_from_slice(b"RaS2");
        out.extend(std::iter::repeat(0u8).take(STRINGS_BLOCK));
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
        out.extend_from_slice(&19u32.to_be_bytes()); // color_space = sRGB
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
        out.extend(std::iter::repeat(0xABu8).take((bytes_per_line * height) as usize));
        out
    }

    #[test]
    fn runs_a_single_page_pwg_raster_to_pdf() {
        let bytes = sample_pwg_page(2, 2, 6);
        let mut data = FilterData::new(1, "u", "t", 1);
        data.content_type = "image/pwg-raster".to_string();
        data.final_content_type = "application/pdf".to_string();

        let env = Env::passive();
        let out = run(&data, Cursor::new(bytes), &env).unwrap();
        assert!(out.starts_with(b"%PDF"));
    }

    #[test]
    fn runs_pclm_and_splits_into_strips() {
        let bytes = sample_pwg_page(2, 20, 6);
        let mut data = FilterData::new(1, "u", "t", 1);
        data.content_type = "image/pwg-raster".to_string();
        data.final_content_type = "application/pclm".to_string();

        let env = Env::passive();
        let out = run(&data, Cursor::new(bytes), &env).unwrap();
        assert!(out.starts_with(b"%PDF"));
    }

    #[test]
    fn rejects_an_unsupported_content_type() {
        let mut data = FilterData::new(1, "u", "t", 1);
        data.content_type = "application/octet-stream".to_string();
        let env = Env::passive();
        assert!(run(&data, Cursor::new(Vec::new()), &env).is_err());
    }
}
