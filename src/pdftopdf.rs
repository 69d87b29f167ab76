//! PDF page-imposition pipeline: reads one or more input PDF documents,
//! flattens their interactive form fields/annotations into static content,
//! imposes their pages onto an N-up or booklet layout, and wires in
//! banner/job-sheet and error-sheet pages, producing one finished document.
//!
//! Grounded in the teacher's deleted `pdf_impose.rs` orchestration module
//! (one pass to open/prepare documents, one to lay out and copy pages, one
//! to finish the catalog), rebuilt around [`crate::imposition::plan`] for
//! the page-to-cell assignment and [`crate::pdf_adapter::PdfFile`] for the
//! object graph.

use std::collections::{BTreeMap, HashMap};
use std::io::Read;

use lopdf::content::{Content, Operation};
use lopdf::{Dictionary, Object, ObjectId};

use crate::banner::{self, LogPrefix, LoggedEvent};
use crate::content_stream;
use crate::env::{Env, LogLevel};
use crate::errors::{Error, Result};
use crate::filter_data::FilterData;
use crate::flatten::{self, AnnotFlags};
use crate::geometry::Rect;
use crate::imposition::{self, DocumentPages, Placement};
use crate::matrix::Matrix;
use crate::media::Media;
use crate::nup;
use crate::options::{self, ErrorSheetReport, FilterOptions};
use crate::page_copier::{self, BorderSpec};
use crate::pdf_adapter::PdfFile;
use crate::resources::{CellNameMap, ResourceMerger};
use crate::units::Pt;

/// Runs the full imposition pipeline over `inputs` (one reader per input
/// document, in job order) and returns the finished PDF's bytes.
pub fn run<R: Read>(filter_data: &FilterData, inputs: Vec<R>, env: &Env) -> Result<Vec<u8>> {
    let options = options::parse_options(&filter_data.options);
    let total_inputs = inputs.len();
    let mut events: Vec<LoggedEvent> = Vec::new();
    let mut sources = Vec::new();

    for (idx, mut reader) in inputs.into_iter().enumerate() {
        let document_index = idx as u32 + 1;
        let mut bytes = Vec::new();
        reader.read_to_end(&mut bytes).map_err(Error::Io)?;

        match PdfFile::open(&bytes, document_index, &|n| crate::env::document_password(n)) {
            Ok(doc) => {
                if let Err(e) = flatten_document(&doc, env) {
                    env.warn(&format!("form flattening skipped for document {document_index}: {e}"));
                    events.push(LoggedEvent { prefix: LogPrefix::Warning, message: e.to_string() });
                }
                sources.push(doc);
            }
            Err(e) => {
                env.error(&format!("document {document_index} of {total_inputs} could not be opened: {e}"));
                events.push(banner::event_from_error(&e));
                if sources.is_empty() {
                    return Err(e);
                }
            }
        }
    }

    if sources.is_empty() {
        let out = PdfFile::create("1.7");
        out.finish_catalog(&[], &[])?;
        return out.into_bytes();
    }

    let documents: Vec<DocumentPages> = sources
        .iter()
        .map(|doc| DocumentPages { first_page: 1, last_page: doc.num_pages().max(1) })
        .collect();
    let placements = imposition::plan(&documents, &options);

    let effective_number_up = if options.imposition_template == "booklet" { 2 } else { options.number_up.max(1) };
    let (cols, rows, _landscape) = nup::layout_for(effective_number_up);
    let num_layout = cols * rows;

    let num_outpages = placements.iter().map(|p| p.output_page).max().map(|m| m + 1).unwrap_or(0);
    let mut by_output: BTreeMap<u32, Vec<Placement>> = BTreeMap::new();
    for p in &placements {
        by_output.entry(p.output_page).or_default().push(*p);
    }

    let out_doc = PdfFile::create("1.7");
    let media_rect = Rect::from_size(Pt(options.media.width_pt()), Pt(options.media.length_pt()));
    let crop_rect = crop_rect_for(&options.media, &options, media_rect);

    let mut output_page_ids = Vec::new();
    for out_idx in imposition::output_order(num_outpages, &options) {
        if env.is_canceled() {
            env.log(LogLevel::Info, "job cancelled; emitting the pages produced so far");
            break;
        }
        let placed = by_output.remove(&out_idx).unwrap_or_default();
        let page_id = build_output_page(&out_doc, &sources, &placed, &options, media_rect, crop_rect, cols, rows, num_layout, out_idx)?;
        output_page_ids.push(page_id);
    }

    let is_pdf_family = filter_data.final_content_type.is_empty() || filter_data.final_content_type.eq_ignore_ascii_case("application/pdf");
    let hardware_requested = filter_data.printer_attr("hardware-copies").map(|v| v == "true").unwrap_or(false);
    let hardware_copies = imposition::use_hardware_copies(is_pdf_family, hardware_requested);

    let mut final_ids = output_page_ids;
    if !hardware_copies && options.copies > 1 {
        if options.sides != "one-sided" && final_ids.len() % 2 == 1 {
            final_ids.push(blank_page(&out_doc, media_rect)?);
        }
        let base = final_ids.clone();
        final_ids = Vec::with_capacity(base.len() * options.copies as usize);
        for _ in 0..options.copies {
            final_ids.extend_from_slice(&base);
        }
    }

    let (start_sheet, end_sheet) = job_sheets_parts(&options.job_sheets);
    let mut leading = Vec::new();
    let mut trailing = Vec::new();
    if start_sheet != "none" {
        leading.push(banner_page(
            &out_doc,
            &options.job_sheets_media,
            &filter_data.title,
            &filter_data.user,
            final_ids.len() as u32,
            &options.job_sheet_message,
        )?);
    }
    if end_sheet != "none" {
        trailing.push(banner_page(
            &out_doc,
            &options.job_sheets_media,
            &filter_data.title,
            &filter_data.user,
            final_ids.len() as u32,
            &options.job_sheet_message,
        )?);
    }

    let want_error_sheet = match options.job_error_sheet.report {
        ErrorSheetReport::Always => true,
        ErrorSheetReport::OnError => !events.is_empty(),
        ErrorSheetReport::None => false,
    };
    if want_error_sheet {
        let duplex = options.sides != "one-sided";
        for _ in 0..banner::error_sheet_copies(duplex) {
            trailing.push(error_sheet_page(&out_doc, &options.job_error_sheet.media, &events)?);
        }
    }

    let mut all_ids = leading;
    all_ids.extend(final_ids);
    all_ids.extend(trailing);

    out_doc.finish_catalog(&all_ids, &[])?;
    out_doc.into_bytes()
}

/// Splits a `job-sheets` value into its `(start, end)` banner names; a
/// single bare value sets only the start banner, per CUPS convention.
fn job_sheets_parts(job_sheets: &str) -> (&str, &str) {
    let mut parts = job_sheets.splitn(2, ',');
    let start = parts.next().unwrap_or("none");
    let end = parts.next().unwrap_or("none");
    (start, end)
}

/// Which page rotation (if any) compensates for short-edge duplex binding
/// on a given (0-based) output page index.
fn duplex_page_rotate(options: &FilterOptions, output_index: u32) -> i64 {
    if options.sides == "two-sided-short-edge" && output_index % 2 == 1 {
        180
    } else {
        0
    }
}

fn crop_rect_for(media: &Media, options: &FilterOptions, media_rect: Rect) -> Rect {
    Rect::new(
        media_rect.left + Pt(Media::hmm_to_pt(media.left)) + Pt(options.page_left as f32),
        media_rect.bottom + Pt(Media::hmm_to_pt(media.bottom)) + Pt(options.page_bottom as f32),
        media_rect.right - Pt(Media::hmm_to_pt(media.right)) - Pt(options.page_right as f32),
        media_rect.top - Pt(Media::hmm_to_pt(media.top)) - Pt(options.page_top as f32),
    )
}

fn cell_rect_for(crop: Rect, cols: u32, rows: u32, col: u32, row: u32) -> Rect {
    let w = crop.width() / cols as f32;
    let h = crop.height() / rows as f32;
    Rect::new(
        crop.left + w * col as f32,
        crop.bottom + h * row as f32,
        crop.left + w * (col + 1) as f32,
        crop.bottom + h * (row + 1) as f32,
    )
}

fn blank_page(out_doc: &PdfFile, media_rect: Rect) -> Result<ObjectId> {
    let content_id = out_doc.create_stream(lopdf::Stream::new(Dictionary::new(), Vec::new()));
    let mut dict = Dictionary::new();
    dict.set("Type", Object::Name(b"Page".to_vec()));
    dict.set("MediaBox", Object::Array(vec![0.into(), 0.into(), media_rect.width().0.into(), media_rect.height().0.into()]));
    dict.set("Contents", Object::Reference(content_id));
    Ok(out_doc.create_object(Object::Dictionary(dict)))
}

fn build_text_page(out_doc: &PdfFile, width_pt: f32, height_pt: f32, content: Content) -> Result<ObjectId> {
    let (font_name, font_dict) = banner::courier_font_resource();
    let mut fonts = Dictionary::new();
    fonts.set(font_name.as_str(), Object::Dictionary(font_dict));
    let mut resources = Dictionary::new();
    resources.set("Font", Object::Dictionary(fonts));

    let bytes = encode_content(&content)?;
    let content_id = out_doc.create_stream(lopdf::Stream::new(Dictionary::new(), bytes));

    let mut dict = Dictionary::new();
    dict.set("Type", Object::Name(b"Page".to_vec()));
    dict.set("MediaBox", Object::Array(vec![0.into(), 0.into(), width_pt.into(), height_pt.into()]));
    dict.set("Resources", Object::Dictionary(resources));
    dict.set("Contents", Object::Reference(content_id));
    Ok(out_doc.create_object(Object::Dictionary(dict)))
}

fn banner_page(out_doc: &PdfFile, media: &Media, title: &str, user: &str, pages: u32, message: &str) -> Result<ObjectId> {
    let (w, h) = (media.width_pt(), media.length_pt());
    let content = banner::banner_content(w, h, title, user, pages, message);
    build_text_page(out_doc, w, h, content)
}

fn error_sheet_page(out_doc: &PdfFile, media: &Media, events: &[LoggedEvent]) -> Result<ObjectId> {
    let (w, h) = (media.width_pt(), media.length_pt());
    let content = banner::error_sheet_content(w, h, events);
    build_text_page(out_doc, w, h, content)
}

fn encode_content(content: &Content) -> Result<Vec<u8>> {
    content.encode().map_err(|e| Error::InputFormat(format!("content stream encode failed: {e}")))
}

/// Builds one imposed output page: one cell per placement, clipped,
/// bordered, scaled, and centered, with shared resources merged under a
/// per-cell rename prefix.
#[allow(clippy::too_many_arguments)]
fn build_output_page(
    out_doc: &PdfFile,
    sources: &[PdfFile],
    placed: &[Placement],
    options: &FilterOptions,
    media_rect: Rect,
    crop_rect: Rect,
    cols: u32,
    rows: u32,
    num_layout: u32,
    output_index: u32,
) -> Result<ObjectId> {
    let mut content = Vec::new();
    let mut merger = ResourceMerger::new();

    for cell_index in 0..num_layout {
        let Some(p) = placed.iter().find(|p| p.cell == cell_index) else { continue };
        let Some(source) = sources.get(p.document_index as usize) else { continue };
        let Some(page_id) = source.page_id(p.input_page.saturating_sub(1)) else { continue };

        let orientation = options
            .override_for(p.document_index + 1, p.input_page)
            .and_then(|o| o.orientation_requested)
            .unwrap_or(options.orientation_requested);
        let (col, row) = nup::cell_position(cell_index, cols, rows, orientation);
        let cell_rect = cell_rect_for(crop_rect, cols, rows, col, row);

        draw_cell(source, out_doc, page_id, cell_rect, media_rect, options, &mut merger, cell_index, &mut content)?;
    }

    let resources = merger.into_dictionary();
    let content = crate::utils::compress_stream(lopdf::Stream::new(Dictionary::new(), content));
    let content_id = out_doc.create_stream(content);

    let mut dict = Dictionary::new();
    dict.set("Type", Object::Name(b"Page".to_vec()));
    dict.set("MediaBox", Object::Array(vec![0.into(), 0.into(), media_rect.width().0.into(), media_rect.height().0.into()]));
    dict.set("Resources", Object::Dictionary(resources));
    dict.set("Contents", Object::Reference(content_id));

    let rotate = duplex_page_rotate(options, output_index);
    if rotate != 0 {
        dict.set("Rotate", Object::Integer(rotate));
    }

    Ok(out_doc.create_object(Object::Dictionary(dict)))
}

/// Copies one input page's content into `cell`: clips to the cell, strokes
/// a border if requested, places the page via its computed CTM, then
/// rewrites and appends its (already-flattened) content stream, importing
/// whatever resources it reaches into `out_doc` along the way.
#[allow(clippy::too_many_arguments)]
fn draw_cell(
    source: &PdfFile,
    out_doc: &PdfFile,
    input_page_id: ObjectId,
    cell: Rect,
    media_rect: Rect,
    options: &FilterOptions,
    merger: &mut ResourceMerger,
    cell_index: u32,
    content_out: &mut Vec<u8>,
) -> Result<()> {
    let page_dict = source.page_dict(input_page_id)?;
    let input_rect = page_box(source, &page_dict, b"CropBox")
        .or_else(|| page_box(source, &page_dict, b"MediaBox"))
        .unwrap_or(media_rect);

    let rotate_90 = page_copier::needs_orientation_swap(cell, input_rect);
    let (eff_w, eff_h) = if rotate_90 {
        (input_rect.height(), input_rect.width())
    } else {
        (input_rect.width(), input_rect.height())
    };
    let scale = page_copier::scaling_factor(cell.width(), cell.height(), eff_w, eff_h, options.print_scaling);
    let place = page_copier::build_ctm(cell, input_rect.width(), input_rect.height(), scale, rotate_90, options.mirror, media_rect.width());
    let ctm = Matrix::translate(-input_rect.left.0, -input_rect.bottom.0).then(place);

    content_out.extend_from_slice(b"q\n");

    if let Some(border) = BorderSpec::for_style(options.page_border) {
        for rect in border.rects(cell) {
            let ops = Content {
                operations: vec![
                    Operation::new("w", vec![border.line_width.0.into()]),
                    rect.into_stream_op(),
                    Operation::new("S", vec![]),
                ],
            };
            content_out.extend(encode_content(&ops)?);
        }
    }

    let clip = Content {
        operations: vec![cell.into_stream_op(), Operation::new("W", vec![]), Operation::new("n", vec![])],
    };
    content_out.extend(encode_content(&clip)?);

    let cm = Content {
        operations: vec![Operation::new("cm", ctm.0.iter().map(|f| (*f).into()).collect())],
    };
    content_out.extend(encode_content(&cm)?);

    let resources_obj = source
        .resolve_dict_value(&page_dict, b"Resources")
        .unwrap_or_else(|_| Object::Dictionary(Dictionary::new()));
    let imported = out_doc.import_object(source, &resources_obj)?;
    let resources_dict = match imported {
        Object::Dictionary(d) => d,
        Object::Stream(s) => s.dict,
        _ => Dictionary::new(),
    };
    let cell_map = merger.merge_cell(&resources_dict, cell_index);
    let flat_map = flatten_cell_map(&cell_map);

    for stream in source.page_content_streams(input_page_id)? {
        content_out.extend(content_stream::rewrite_names(&stream, &flat_map));
        content_out.push(b'\n');
    }

    content_out.extend_from_slice(b"Q\n");
    Ok(())
}

fn flatten_cell_map(map: &CellNameMap) -> HashMap<String, String> {
    let mut flat = HashMap::new();
    for sub in map.values() {
        for (k, v) in sub {
            flat.insert(k.clone(), v.clone());
        }
    }
    flat
}

fn page_box(doc: &PdfFile, page_dict: &Dictionary, key: &[u8]) -> Option<Rect> {
    let obj = doc.resolve_dict_value(page_dict, key).ok()?;
    let arr = rect_from_object(&obj)?;
    Some(Rect::new(Pt(arr[0]), Pt(arr[1]), Pt(arr[2]), Pt(arr[3])))
}

fn as_f32(o: &Object) -> Option<f32> {
    match o {
        Object::Integer(n) => Some(*n as f32),
        Object::Real(f) => Some(*f),
        _ => None,
    }
}

fn rect_from_object(o: &Object) -> Option<[f32; 4]> {
    if let Object::Array(arr) = o {
        if arr.len() == 4 {
            let v: Vec<f32> = arr.iter().filter_map(as_f32).collect();
            if v.len() == 4 {
                return Some([v[0], v[1], v[2], v[3]]);
            }
        }
    }
    None
}

fn matrix_from_object(o: &Object) -> Option<Matrix> {
    if let Object::Array(arr) = o {
        if arr.len() == 6 {
            let v: Vec<f32> = arr.iter().filter_map(as_f32).collect();
            if v.len() == 6 {
                return Some(Matrix([v[0], v[1], v[2], v[3], v[4], v[5]]));
            }
        }
    }
    None
}

fn pdf_string(o: &Object) -> Option<String> {
    match o {
        Object::String(b, _) => Some(String::from_utf8_lossy(b).to_string()),
        _ => None,
    }
}

/// Flattens every page's annotations/form-widget appearances into static
/// content, in place, on `doc`. A no-op if the document has no AcroForm
/// fields and no page carries annotations.
fn flatten_document(doc: &PdfFile, env: &Env) -> Result<()> {
    let catalog = doc.catalog()?;
    let acroform = doc.resolve_dict(&catalog, b"AcroForm").ok();

    let fields_len = acroform
        .as_ref()
        .and_then(|af| doc.resolve_dict_value(af, b"Fields").ok())
        .map(|o| if let Object::Array(a) = o { a.len() } else { 0 })
        .unwrap_or(0);
    let need_appearances = acroform
        .as_ref()
        .and_then(|af| af.get(b"NeedAppearances").ok())
        .and_then(|o| o.as_bool().ok())
        .unwrap_or(false);
    let acroform_da = acroform
        .as_ref()
        .and_then(|af| af.get(b"DA").ok())
        .and_then(|o| doc.resolve(o).ok())
        .and_then(|o| pdf_string(&o));

    let num_pages = doc.num_pages();
    let mut any_annots = false;
    for i in 0..num_pages {
        let Some(page_id) = doc.page_id(i) else { continue };
        let page_dict = doc.page_dict(page_id)?;
        if doc
            .resolve_dict_value(&page_dict, b"Annots")
            .map(|o| matches!(o, Object::Array(a) if !a.is_empty()))
            .unwrap_or(false)
        {
            any_annots = true;
            break;
        }
    }

    if !flatten::needs_flattening(fields_len, any_annots) {
        return Ok(());
    }

    for i in 0..num_pages {
        let Some(page_id) = doc.page_id(i) else { continue };
        if let Err(e) = flatten_page(doc, page_id, acroform_da.as_deref(), need_appearances) {
            env.warn(&format!("annotation flattening failed on page {}: {e}", i + 1));
        }
    }
    Ok(())
}

fn flatten_page(doc: &PdfFile, page_id: ObjectId, acroform_da: Option<&str>, need_appearances: bool) -> Result<()> {
    let page_dict = doc.page_dict(page_id)?;
    let Ok(Object::Array(annot_refs)) = doc.resolve_dict_value(&page_dict, b"Annots") else {
        return Ok(());
    };
    if annot_refs.is_empty() {
        return Ok(());
    }

    let page_rotation_deg = page_dict.get(b"Rotate").ok().and_then(as_f32).unwrap_or(0.0);
    let mut resources = doc.resolve_dict(&page_dict, b"Resources").unwrap_or_else(|_| Dictionary::new());
    let mut xobjects = match resources.get(b"XObject") {
        Ok(Object::Dictionary(d)) => d.clone(),
        _ => Dictionary::new(),
    };

    let mut new_content = Vec::new();
    let mut fxo_count = 0u32;

    for annot_ref in &annot_refs {
        let Ok(Object::Dictionary(annot_dict)) = doc.resolve(annot_ref) else { continue };

        let subtype = annot_dict
            .get(b"Subtype")
            .ok()
            .and_then(|o| o.as_name().ok())
            .map(|b| String::from_utf8_lossy(b).to_string())
            .unwrap_or_default();
        let flags = AnnotFlags::from_bits_truncate(annot_dict.get(b"F").ok().and_then(|o| o.as_i64().ok()).unwrap_or(0) as u32);

        if flatten::should_drop(&flags, AnnotFlags::HIDDEN, AnnotFlags::PRINT) {
            continue;
        }
        if need_appearances && subtype == "Widget" {
            continue;
        }

        let Some(rect) = annot_dict.get(b"Rect").ok().and_then(rect_from_object) else { continue };

        let field_type = annot_dict.get(b"FT").ok().and_then(|o| o.as_name().ok()).map(|b| String::from_utf8_lossy(b).to_string());
        let value = annot_dict.get(b"V").ok().and_then(|o| doc.resolve(o).ok()).and_then(|o| pdf_string(&o));
        let da = annot_dict
            .get(b"DA")
            .ok()
            .and_then(|o| doc.resolve(o).ok())
            .and_then(|o| pdf_string(&o))
            .or_else(|| acroform_da.map(str::to_string));
        let synth = matches!(field_type.as_deref(), Some("Tx") | Some("Ch")) && value.is_some() && da.is_some();

        let (bbox, bbox_matrix, stream_bytes, stream_resources) = if synth {
            let (font_name, font_size) = flatten::parse_default_appearance(da.as_deref().unwrap()).unwrap_or(("Helv".to_string(), 12.0));
            let bbox = [0.0, 0.0, rect[2] - rect[0], rect[3] - rect[1]];
            let content = flatten::synthesize_text_appearance(&font_name, font_size, value.as_deref().unwrap_or(""));
            let mut font_res = Dictionary::new();
            if let Some(font_ref) = lookup_font(doc, &resources, &font_name) {
                font_res.set(font_name.as_str(), font_ref);
            }
            let mut res = Dictionary::new();
            res.set("Font", Object::Dictionary(font_res));
            (Some(bbox), Matrix::identity(), Some(content), Some(res))
        } else if let Ok(ap) = doc.resolve_dict(&annot_dict, b"AP") {
            match ap_stream(doc, &ap, &annot_dict) {
                Some((stream_id, bbox, matrix)) => {
                    let bytes = doc.stream_bytes(stream_id)?;
                    let res = match doc.object(stream_id)? {
                        Object::Stream(s) => match s.dict.get(b"Resources") {
                            Ok(r) => match doc.resolve(r) {
                                Ok(Object::Dictionary(d)) => Some(d),
                                _ => None,
                            },
                            Err(_) => None,
                        },
                        _ => None,
                    };
                    (Some(bbox), matrix, Some(bytes), res)
                }
                None => (None, Matrix::identity(), None, None),
            }
        } else {
            (None, Matrix::identity(), None, None)
        };

        let (Some(bbox), Some(stream_bytes)) = (bbox, stream_bytes) else { continue };
        let placement = flatten::appearance_placement_matrix(bbox, bbox_matrix, rect, flags, page_rotation_deg);

        let mut fxo_dict = Dictionary::new();
        fxo_dict.set("Type", Object::Name(b"XObject".to_vec()));
        fxo_dict.set("Subtype", Object::Name(b"Form".to_vec()));
        fxo_dict.set("BBox", Object::Array(bbox.iter().map(|v| (*v).into()).collect()));
        if let Some(res) = stream_resources {
            fxo_dict.set("Resources", Object::Dictionary(res));
        }
        let mut stream = lopdf::Stream::new(fxo_dict, stream_bytes);
        let _ = stream.compress();
        let fxo_id = doc.create_stream(stream);

        let name = format!("Fxo{fxo_count}");
        fxo_count += 1;
        xobjects.set(name.as_str(), Object::Reference(fxo_id));

        new_content.extend(b"q\n");
        let cm = Content {
            operations: vec![Operation::new("cm", placement.0.iter().map(|f| (*f).into()).collect())],
        };
        new_content.extend(encode_content(&cm)?);
        new_content.extend(format!("/{name} Do\n").into_bytes());
        new_content.extend(b"Q\n");
    }

    if fxo_count == 0 {
        return Ok(());
    }

    resources.set("XObject", Object::Dictionary(xobjects));
    doc.set_dict_value(page_id, "Resources", Object::Dictionary(resources))?;

    let new_stream_id = doc.create_stream(lopdf::Stream::new(Dictionary::new(), new_content));
    append_content_stream(doc, page_id, new_stream_id)
}

fn lookup_font(doc: &PdfFile, page_resources: &Dictionary, name: &str) -> Option<Object> {
    let fonts = doc.resolve_dict(page_resources, b"Font").ok()?;
    fonts.get(name.as_bytes()).ok().cloned()
}

/// Resolves an annotation's `/AP /N` entry to the (possibly `/AS`-selected)
/// appearance stream's object ID, `/BBox`, and `/Matrix`.
fn ap_stream(doc: &PdfFile, ap: &Dictionary, annot_dict: &Dictionary) -> Option<(ObjectId, [f32; 4], Matrix)> {
    let n_ref = match ap.get(b"N").ok()? {
        Object::Reference(r) => *r,
        _ => return None,
    };
    let stream_id = match doc.object(n_ref).ok()? {
        Object::Stream(_) => n_ref,
        Object::Dictionary(states) => {
            let as_name = annot_dict.get(b"AS").ok()?.as_name().ok()?;
            match states.get(as_name).ok()? {
                Object::Reference(r) => *r,
                _ => return None,
            }
        }
        _ => return None,
    };
    let Object::Stream(stream) = doc.object(stream_id).ok()? else { return None };
    let bbox = stream.dict.get(b"BBox").ok().and_then(rect_from_object)?;
    let matrix = stream.dict.get(b"Matrix").ok().and_then(matrix_from_object).unwrap_or_else(Matrix::identity);
    Some((stream_id, bbox, matrix))
}

fn append_content_stream(doc: &PdfFile, page_id: ObjectId, new_id: ObjectId) -> Result<()> {
    let page_dict = doc.page_dict(page_id)?;
    let mut ids: Vec<ObjectId> = match page_dict.get(b"Contents") {
        Ok(Object::Reference(r)) => vec![*r],
        Ok(Object::Array(arr)) => arr.iter().filter_map(|o| if let Object::Reference(r) = o { Some(*r) } else { None }).collect(),
        _ => Vec::new(),
    };
    ids.push(new_id);
    doc.set_dict_value(page_id, "Contents", Object::Array(ids.into_iter().map(Object::Reference).collect()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn sample_pdf_bytes(num_pages: u32) -> Vec<u8> {
        let mut doc = lopdf::Document::with_version("1.7");
        let mut page_ids = Vec::new();
        for _ in 0..num_pages {
            let content_id = doc.add_object(Object::Stream(lopdf::Stream::new(Dictionary::new(), b"0 0 0 rg 0 0 100 100 re f".to_vec())));
            let mut page = Dictionary::new();
            page.set("Type", Object::Name(b"Page".to_vec()));
            page.set("MediaBox", Object::Array(vec![0.into(), 0.into(), 612.0.into(), 792.0.into()]));
            page.set("Contents", Object::Reference(content_id));
            page.set("Resources", Object::Dictionary(Dictionary::new()));
            page_ids.push(doc.add_object(Object::Dictionary(page)));
        }
        let mut pages = Dictionary::new();
        pages.set("Type", Object::Name(b"Pages".to_vec()));
        pages.set("Kids", Object::Array(page_ids.iter().map(|id| Object::Reference(*id)).collect()));
        pages.set("Count", Object::Integer(page_ids.len() as i64));
        let pages_id = doc.add_object(Object::Dictionary(pages));
        for id in &page_ids {
            if let Ok(Object::Dictionary(d)) = doc.get_object_mut(*id) {
                d.set("Parent", Object::Reference(pages_id));
            }
        }
        let mut catalog = Dictionary::new();
        catalog.set("Type", Object::Name(b"Catalog".to_vec()));
        catalog.set("Pages", Object::Reference(pages_id));
        let catalog_id = doc.add_object(Object::Dictionary(catalog));
        doc.trailer.set("Root", Object::Reference(catalog_id));
        let mut out = Vec::new();
        doc.save_to(&mut out).unwrap();
        out
    }

    #[test]
    fn runs_a_two_up_job_and_imposes_onto_one_output_page() {
        let bytes = sample_pdf_bytes(2);
        let mut data = FilterData::new(1, "alice", "report", 1);
        data.options.insert("number-up".to_string(), "2".to_string());
        let env = Env::passive();
        let out = run(&data, vec![Cursor::new(bytes)], &env).unwrap();
        assert!(out.starts_with(b"%PDF"));
    }

    #[test]
    fn empty_input_list_returns_an_empty_but_valid_document() {
        let data = FilterData::new(1, "alice", "report", 1);
        let env = Env::passive();
        let out = run::<Cursor<Vec<u8>>>(&data, vec![], &env).unwrap();
        assert!(out.starts_with(b"%PDF"));
    }

    #[test]
    fn software_copies_duplicate_the_page_sequence() {
        let bytes = sample_pdf_bytes(1);
        let mut data = FilterData::new(1, "alice", "report", 1);
        data.final_content_type = "application/vnd.cups-raster".to_string();
        data.options.insert("copies".to_string(), "3".to_string());
        let env = Env::passive();
        let out = run(&data, vec![Cursor::new(bytes)], &env).unwrap();
        let doc = lopdf::Document::load_mem(&out).unwrap();
        assert_eq!(doc.get_pages().len(), 3);
    }

    #[test]
    fn job_sheets_parts_splits_on_comma_and_defaults_end_to_none() {
        assert_eq!(job_sheets_parts("standard,none"), ("standard", "none"));
        assert_eq!(job_sheets_parts("standard"), ("standard", "none"));
        assert_eq!(job_sheets_parts("none"), ("none", "none"));
    }

    #[test]
    fn duplex_rotates_every_other_output_page_for_short_edge_binding() {
        let mut o = FilterOptions::default();
        o.sides = "two-sided-short-edge".to_string();
        assert_eq!(duplex_page_rotate(&o, 0), 0);
        assert_eq!(duplex_page_rotate(&o, 1), 180);
    }

    #[test]
    fn cell_rect_for_divides_the_crop_rect_into_equal_cells() {
        let crop = Rect::from_size(Pt(200.0), Pt(100.0));
        let r = cell_rect_for(crop, 2, 1, 1, 0);
        assert!((r.left.0 - 100.0).abs() < 1e-6);
        assert!((r.right.0 - 200.0).abs() < 1e-6);
    }
}
