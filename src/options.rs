//! IPP option model: `FilterOptions`, its parser, and the page-range /
//! override lookups the imposition planner drives off it.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::collection::{self, Value};
use crate::geometry::Rotation;
use crate::interval_set::IntervalSet;
use crate::media::Media;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ImageOrientation {
    Portrait,
    Landscape,
    RevLandscape,
    RevPortrait,
    None,
}

impl Default for ImageOrientation {
    fn default() -> Self {
        ImageOrientation::None
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorSheetReport {
    None,
    OnError,
    Always,
}

impl Default for ErrorSheetReport {
    fn default() -> Self {
        ErrorSheetReport::None
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobErrorSheet {
    pub report: ErrorSheetReport,
    pub media: Media,
}

impl Default for JobErrorSheet {
    fn default() -> Self {
        JobErrorSheet {
            report: ErrorSheetReport::None,
            media: Media::default(),
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum MultipleDocumentHandling {
    Collated,
    Uncollated,
    SingleDoc,
    SingleDocNewSheet,
}

impl Default for MultipleDocumentHandling {
    fn default() -> Self {
        MultipleDocumentHandling::Collated
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum PageDelivery {
    SameOrderFaceDown,
    SameOrderFaceUp,
    ReverseOrderFaceDown,
    ReverseOrderFaceUp,
}

impl Default for PageDelivery {
    fn default() -> Self {
        PageDelivery::SameOrderFaceDown
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum PageSet {
    All,
    Odd,
    Even,
}

impl Default for PageSet {
    fn default() -> Self {
        PageSet::All
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum PrintQuality {
    Draft,
    Normal,
    High,
}

impl Default for PrintQuality {
    fn default() -> Self {
        PrintQuality::Normal
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum PrintScaling {
    Auto,
    AutoFit,
    Fill,
    Fit,
    None,
}

impl Default for PrintScaling {
    fn default() -> Self {
        PrintScaling::None
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SeparatorType {
    None,
    Slip,
    Start,
    End,
    Both,
}

impl Default for SeparatorType {
    fn default() -> Self {
        SeparatorType::None
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum PageBorder {
    None,
    Single,
    SingleThick,
    Double,
    DoubleThick,
}

impl Default for PageBorder {
    fn default() -> Self {
        PageBorder::None
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ImagePosition {
    None,
    BottomLeft,
    Center,
    TopRight,
}

impl Default for ImagePosition {
    fn default() -> Self {
        ImagePosition::None
    }
}

/// One `{...}` entry from `overrides`: a document/page-scoped patch applied
/// on top of the base options during imposition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Override {
    pub first_document: u32,
    pub last_document: u32,
    pub first_page: u32,
    pub last_page: u32,
    pub media: Option<Media>,
    pub orientation_requested: Option<Rotation>,
}

impl Override {
    /// Sort key: `(first_document, last_document, first_page, last_page)`.
    pub fn sort_key(&self) -> (u32, u32, u32, u32) {
        (
            self.first_document,
            self.last_document,
            self.first_page,
            self.last_page,
        )
    }

    pub fn applies_to(&self, document: u32, page: u32) -> bool {
        (self.first_document..=self.last_document).contains(&document)
            && (self.first_page..=self.last_page).contains(&page)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilterOptions {
    pub copies: u32,
    pub force_front_side: IntervalSet,
    pub image_orientation: ImageOrientation,
    pub imposition_template: String,
    pub job_error_sheet: JobErrorSheet,
    pub job_name: String,
    pub job_originating_user_name: String,
    pub job_pages_per_set: u32,
    pub job_sheet_message: String,
    pub job_sheets: String,
    pub job_sheets_media: Media,
    pub media: Media,
    pub multiple_document_handling: MultipleDocumentHandling,
    pub number_up: u32,
    pub orientation_requested: Rotation,
    pub output_bin: String,
    pub overrides: Vec<Override>,
    pub page_delivery: PageDelivery,
    pub page_ranges: IntervalSet,
    pub page_set: PageSet,
    pub print_color_mode: String,
    pub print_content_optimize: String,
    pub print_quality: PrintQuality,
    pub print_rendering_intent: String,
    pub print_scaling: PrintScaling,
    pub printer_resolution: (u32, u32),
    pub separator_type: SeparatorType,
    pub reverse_order: bool,
    pub sides: String,
    pub mirror: bool,
    pub page_border: PageBorder,
    pub page_top: i32,
    pub page_left: i32,
    pub page_right: i32,
    pub page_bottom: i32,
    pub page_label: String,
    pub pdf_auto_rotate: bool,
    pub x_image_position: ImagePosition,
    pub y_image_position: ImagePosition,
    pub x_side1_image_shift: i32,
    pub y_side1_image_shift: i32,
    pub x_side2_image_shift: i32,
    pub y_side2_image_shift: i32,
}

impl Default for FilterOptions {
    fn default() -> Self {
        FilterOptions {
            copies: 1,
            force_front_side: IntervalSet::new(),
            image_orientation: ImageOrientation::default(),
            imposition_template: String::new(),
            job_error_sheet: JobErrorSheet::default(),
            job_name: "Untitled".to_string(),
            job_originating_user_name: "Guest".to_string(),
            job_pages_per_set: 0,
            job_sheet_message: String::new(),
            job_sheets: "none".to_string(),
            job_sheets_media: Media::default(),
            media: Media::default(),
            multiple_document_handling: MultipleDocumentHandling::default(),
            number_up: 1,
            orientation_requested: Rotation::R0,
            output_bin: String::new(),
            overrides: Vec::new(),
            page_delivery: PageDelivery::default(),
            page_ranges: IntervalSet::new(),
            page_set: PageSet::default(),
            print_color_mode: String::new(),
            print_content_optimize: String::new(),
            print_quality: PrintQuality::default(),
            print_rendering_intent: String::new(),
            print_scaling: PrintScaling::default(),
            printer_resolution: (0, 0),
            separator_type: SeparatorType::default(),
            reverse_order: false,
            sides: "one-sided".to_string(),
            mirror: false,
            page_border: PageBorder::default(),
            page_top: 0,
            page_left: 0,
            page_right: 0,
            page_bottom: 0,
            page_label: String::new(),
            pdf_auto_rotate: false,
            x_image_position: ImagePosition::default(),
            y_image_position: ImagePosition::default(),
            x_side1_image_shift: 0,
            y_side1_image_shift: 0,
            x_side2_image_shift: 0,
            y_side2_image_shift: 0,
        }
    }
}

impl FilterOptions {
    /// false if excluded by `page_set`; otherwise membership in `page_ranges`
    /// (an empty set means "all pages").
    pub fn is_page_in_range(&self, n: u32) -> bool {
        match self.page_set {
            PageSet::Odd if n % 2 == 0 => return false,
            PageSet::Even if n % 2 == 1 => return false,
            _ => {}
        }
        self.page_ranges.is_empty() || self.page_ranges.contains(n)
    }

    /// Finds the override (if any) applying to a given document/page pair.
    /// Ties are broken by sort key, lowest first, matching the order
    /// `overrides` was normalized into.
    pub fn override_for(&self, document: u32, page: u32) -> Option<&Override> {
        self.overrides.iter().find(|o| o.applies_to(document, page))
    }
}

/// Looks up `foo`: first in `options`, then as `IPP_FOO` in the process
/// environment (`-` replaced with `_`, uppercased), then `IPP_FOO_DEFAULT`.
fn lookup<'a>(options: &'a HashMap<String, String>, name: &str) -> Option<std::borrow::Cow<'a, str>> {
    if let Some(v) = options.get(name) {
        return Some(std::borrow::Cow::Borrowed(v));
    }
    let env_name = format!("IPP_{}", name.to_uppercase().replace('-', "_"));
    if let Ok(v) = std::env::var(&env_name) {
        return Some(std::borrow::Cow::Owned(v));
    }
    if let Ok(v) = std::env::var(format!("{}_DEFAULT", env_name)) {
        return Some(std::borrow::Cow::Owned(v));
    }
    None
}

fn warn_unrecognized(name: &str, value: &str) {
    log::warn!("unrecognized value \"{value}\" for option \"{name}\", using default");
}

fn parse_rotation(s: &str) -> Option<Rotation> {
    match s {
        "none" => Some(Rotation::R0),
        "landscape" => Some(Rotation::R90),
        "rev-landscape" => Some(Rotation::R270),
        "rev-portrait" => Some(Rotation::R180),
        "portrait" => Some(Rotation::R0),
        _ => None,
    }
}

fn media_from_collection(body: &str) -> Option<Media> {
    let col = collection::parse_collection(body);
    if let Some(name) = col.get("media-size-name").and_then(Value::as_str) {
        return Media::by_name(name);
    }
    if let Some(Value::Collection(size)) = col.get("media-size") {
        let dims = collection::parse_collection(size);
        let x: i32 = dims.get("x-dimension").and_then(Value::as_str)?.parse().ok()?;
        let y: i32 = dims.get("y-dimension").and_then(Value::as_str)?.parse().ok()?;
        return Media::by_dimensions(x, y);
    }
    None
}

fn parse_override(body: &str) -> Option<Override> {
    let col = collection::parse_collection(body);
    let docs = col
        .get("document-numbers")
        .and_then(Value::as_str)
        .map(IntervalSet::parse)
        .unwrap_or_else(IntervalSet::all);
    let pages = col
        .get("page-numbers")
        .and_then(Value::as_str)
        .map(IntervalSet::parse)
        .unwrap_or_else(IntervalSet::all);

    // IntervalSet doesn't expose bounds directly; re-derive min/max by
    // scanning a generous range, since overrides are a handful of small
    // document/page numbers in practice.
    let (first_document, last_document) = bounds(&docs);
    let (first_page, last_page) = bounds(&pages);

    let media = col
        .get("media")
        .and_then(Value::as_str)
        .and_then(Media::by_name)
        .or_else(|| col.get("media-col").and_then(Value::as_collection).and_then(media_from_collection));

    let orientation_requested = col
        .get("orientation-requested")
        .and_then(Value::as_str)
        .and_then(parse_rotation);

    Some(Override {
        first_document,
        last_document,
        first_page,
        last_page,
        media,
        orientation_requested,
    })
}

fn bounds(set: &IntervalSet) -> (u32, u32) {
    let mut lo = None;
    let mut hi = 0u32;
    for n in 1..=100_000u32 {
        if set.contains(n) {
            lo.get_or_insert(n);
            hi = n;
        }
    }
    (lo.unwrap_or(1), if hi == 0 { u32::MAX } else { hi })
}

/// Parses an option map (as produced by `cupsParseOptions2`-style splitting
/// upstream) into a [`FilterOptions`]. Unrecognized enum values and
/// out-of-range integers are logged and the default retained; a missing or
/// unresolvable media falls back to A4.
pub fn parse_options(options: &HashMap<String, String>) -> FilterOptions {
    let mut out = FilterOptions::default();

    if let Some(v) = lookup(options, "copies") {
        match v.parse::<u32>() {
            Ok(n) if n >= 1 => out.copies = n,
            _ => warn_unrecognized("copies", &v),
        }
    }

    if let Some(v) = lookup(options, "force-front-side") {
        out.force_front_side = IntervalSet::parse(&v);
    }

    if let Some(v) = lookup(options, "image-orientation") {
        out.image_orientation = match v.as_ref() {
            "portrait" => ImageOrientation::Portrait,
            "landscape" => ImageOrientation::Landscape,
            "rev-landscape" => ImageOrientation::RevLandscape,
            "rev-portrait" => ImageOrientation::RevPortrait,
            "none" => ImageOrientation::None,
            _ => {
                warn_unrecognized("image-orientation", &v);
                ImageOrientation::None
            }
        };
    }

    if let Some(v) = lookup(options, "imposition-template") {
        out.imposition_template = v.into_owned();
    }

    if let Some(v) = lookup(options, "job-error-sheet-report") {
        out.job_error_sheet.report = match v.as_ref() {
            "none" => ErrorSheetReport::None,
            "on-error" => ErrorSheetReport::OnError,
            "always" => ErrorSheetReport::Always,
            _ => {
                warn_unrecognized("job-error-sheet-report", &v);
                ErrorSheetReport::None
            }
        };
    }

    if let Some(v) = lookup(options, "job-name") {
        out.job_name = truncate(v.as_ref(), 255);
    }
    if let Some(v) = lookup(options, "job-originating-user-name") {
        out.job_originating_user_name = truncate(v.as_ref(), 255);
    }
    if let Some(v) = lookup(options, "job-pages-per-set") {
        match v.parse::<u32>() {
            Ok(n) if n >= 1 => out.job_pages_per_set = n,
            _ => warn_unrecognized("job-pages-per-set", &v),
        }
    }
    if let Some(v) = lookup(options, "job-sheet-message") {
        out.job_sheet_message = truncate(v.as_ref(), 1023);
    }
    if let Some(v) = lookup(options, "job-sheets") {
        out.job_sheets = v.into_owned();
    }

    let media = lookup(options, "media")
        .and_then(|v| Media::by_name(&v))
        .or_else(|| lookup(options, "media-col").and_then(|v| media_from_collection(&v)));
    match media {
        Some(m) => out.media = m,
        None => {
            if lookup(options, "media").is_some() || lookup(options, "media-col").is_some() {
                log::warn!("unresolvable media, falling back to A4");
            }
        }
    }
    out.job_sheets_media = out.media.clone();
    if let Some(v) = lookup(options, "job-sheets-media") {
        if let Some(m) = Media::by_name(&v) {
            out.job_sheets_media = m;
        }
    }

    if let Some(v) = lookup(options, "multiple-document-handling") {
        out.multiple_document_handling = match v.as_ref() {
            "collated" => MultipleDocumentHandling::Collated,
            "uncollated" => MultipleDocumentHandling::Uncollated,
            "single-document" => MultipleDocumentHandling::SingleDoc,
            "single-document-new-sheet" => MultipleDocumentHandling::SingleDocNewSheet,
            _ => {
                warn_unrecognized("multiple-document-handling", &v);
                MultipleDocumentHandling::Collated
            }
        };
    }

    if let Some(v) = lookup(options, "number-up") {
        match v.parse::<u32>() {
            Ok(n) if [1, 2, 3, 4, 6, 8, 9, 10, 12, 15, 16].contains(&n) => out.number_up = n,
            _ => warn_unrecognized("number-up", &v),
        }
    }

    if let Some(v) = lookup(options, "orientation-requested") {
        match parse_rotation(&v) {
            Some(r) => out.orientation_requested = r,
            None => warn_unrecognized("orientation-requested", &v),
        }
    }

    if let Some(v) = lookup(options, "output-bin") {
        out.output_bin = v.into_owned();
    }

    if let Some(v) = lookup(options, "overrides") {
        out.overrides = collection::split_collections(&v)
            .iter()
            .filter_map(|body| parse_override(body))
            .collect();
        out.overrides.sort_by_key(Override::sort_key);
    }

    if let Some(v) = lookup(options, "page-delivery") {
        out.page_delivery = match v.as_ref() {
            "same-order-face-down" => PageDelivery::SameOrderFaceDown,
            "same-order-face-up" => PageDelivery::SameOrderFaceUp,
            "reverse-order-face-down" => PageDelivery::ReverseOrderFaceDown,
            "reverse-order-face-up" => PageDelivery::ReverseOrderFaceUp,
            _ => {
                warn_unrecognized("page-delivery", &v);
                PageDelivery::SameOrderFaceDown
            }
        };
    }

    if let Some(v) = lookup(options, "page-ranges") {
        out.page_ranges = IntervalSet::parse(&v);
    }

    if let Some(v) = lookup(options, "page-set") {
        out.page_set = match v.as_ref() {
            "all" => PageSet::All,
            "odd" => PageSet::Odd,
            "even" => PageSet::Even,
            _ => {
                warn_unrecognized("page-set", &v);
                PageSet::All
            }
        };
    }

    if let Some(v) = lookup(options, "print-color-mode") {
        out.print_color_mode = v.into_owned();
    }
    if let Some(v) = lookup(options, "print-content-optimize") {
        out.print_content_optimize = v.into_owned();
    }

    if let Some(v) = lookup(options, "print-quality") {
        out.print_quality = match v.as_ref() {
            "draft" => PrintQuality::Draft,
            "normal" => PrintQuality::Normal,
            "high" => PrintQuality::High,
            _ => {
                warn_unrecognized("print-quality", &v);
                PrintQuality::Normal
            }
        };
    }

    if let Some(v) = lookup(options, "print-rendering-intent") {
        out.print_rendering_intent = v.into_owned();
    }

    if let Some(v) = lookup(options, "print-scaling") {
        out.print_scaling = match v.as_ref() {
            "auto" => PrintScaling::Auto,
            "auto-fit" => PrintScaling::AutoFit,
            "fill" => PrintScaling::Fill,
            "fit" => PrintScaling::Fit,
            "none" => PrintScaling::None,
            _ => {
                warn_unrecognized("print-scaling", &v);
                PrintScaling::None
            }
        };
    }

    if let Some(v) = lookup(options, "printer-resolution") {
        if let Some((x, y)) = parse_resolution(&v) {
            out.printer_resolution = (x, y);
        } else {
            warn_unrecognized("printer-resolution", &v);
        }
    }

    if let Some(v) = lookup(options, "separator-type") {
        out.separator_type = match v.as_ref() {
            "none" => SeparatorType::None,
            "slip-sheets" => SeparatorType::Slip,
            "start-sheet" => SeparatorType::Start,
            "end-sheet" => SeparatorType::End,
            "both-sheets" => SeparatorType::Both,
            _ => {
                warn_unrecognized("separator-type", &v);
                SeparatorType::None
            }
        };
    }

    if let Some(v) = lookup(options, "reverse-order") {
        out.reverse_order = parse_bool(&v);
    }
    if let Some(v) = lookup(options, "sides") {
        out.sides = v.into_owned();
    }
    if let Some(v) = lookup(options, "mirror") {
        out.mirror = parse_bool(&v);
    }

    if let Some(v) = lookup(options, "page-border") {
        out.page_border = match v.as_ref() {
            "none" => PageBorder::None,
            "single" => PageBorder::Single,
            "single-thick" => PageBorder::SingleThick,
            "double" => PageBorder::Double,
            "double-thick" => PageBorder::DoubleThick,
            _ => {
                warn_unrecognized("page-border", &v);
                PageBorder::None
            }
        };
    }

    if let Some(v) = lookup(options, "page-top") {
        apply_int(&v, "page-top", &mut out.page_top);
    }
    if let Some(v) = lookup(options, "page-left") {
        apply_int(&v, "page-left", &mut out.page_left);
    }
    if let Some(v) = lookup(options, "page-right") {
        apply_int(&v, "page-right", &mut out.page_right);
    }
    if let Some(v) = lookup(options, "page-bottom") {
        apply_int(&v, "page-bottom", &mut out.page_bottom);
    }

    if let Some(v) = lookup(options, "page-label") {
        out.page_label = truncate(v.as_ref(), 255);
    }
    if let Some(v) = lookup(options, "pdf-auto-rotate") {
        out.pdf_auto_rotate = parse_bool(&v);
    }

    if let Some(v) = lookup(options, "x-image-position") {
        out.x_image_position = parse_image_position(&v, "x-image-position");
    }
    if let Some(v) = lookup(options, "y-image-position") {
        out.y_image_position = parse_image_position(&v, "y-image-position");
    }

    if let Some(v) = lookup(options, "x-side1-image-shift") {
        apply_int(&v, "x-side1-image-shift", &mut out.x_side1_image_shift);
    }
    if let Some(v) = lookup(options, "y-side1-image-shift") {
        apply_int(&v, "y-side1-image-shift", &mut out.y_side1_image_shift);
    }
    if let Some(v) = lookup(options, "x-side2-image-shift") {
        apply_int(&v, "x-side2-image-shift", &mut out.x_side2_image_shift);
    }
    if let Some(v) = lookup(options, "y-side2-image-shift") {
        apply_int(&v, "y-side2-image-shift", &mut out.y_side2_image_shift);
    }

    out
}

fn apply_int(v: &str, field: &str, slot: &mut i32) {
    match v.parse::<i32>() {
        Ok(n) => *slot = n,
        Err(_) => warn_unrecognized(field, v),
    }
}

fn parse_image_position(v: &str, field: &str) -> ImagePosition {
    match v {
        "none" => ImagePosition::None,
        "bottom-left" | "top-left" => ImagePosition::BottomLeft,
        "center" => ImagePosition::Center,
        "top-right" | "bottom-right" => ImagePosition::TopRight,
        _ => {
            warn_unrecognized(field, v);
            ImagePosition::None
        }
    }
}

fn parse_bool(v: &str) -> bool {
    matches!(v, "true" | "yes" | "on" | "1")
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        s.chars().take(max).collect()
    }
}

/// Parses `printer-resolution` in either `NNNxNNNdpi` or `NNNdpi` form.
fn parse_resolution(v: &str) -> Option<(u32, u32)> {
    let v = v.strip_suffix("dpi").unwrap_or(v);
    if let Some((x, y)) = v.split_once('x') {
        Some((x.parse().ok()?, y.parse().ok()?))
    } else {
        let n = v.parse().ok()?;
        Some((n, n))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn opts(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    #[test]
    fn defaults_match_contract() {
        let o = FilterOptions::default();
        assert_eq!(o.copies, 1);
        assert_eq!(o.number_up, 1);
        assert_eq!(o.job_name, "Untitled");
        assert_eq!(o.sides, "one-sided");
    }

    #[test]
    fn unrecognized_enum_keeps_default() {
        let o = parse_options(&opts(&[("print-quality", "ultra")]));
        assert_eq!(o.print_quality, PrintQuality::Normal);
    }

    #[test]
    fn out_of_range_number_up_keeps_default() {
        let o = parse_options(&opts(&[("number-up", "5")]));
        assert_eq!(o.number_up, 1);
    }

    #[test]
    fn page_set_excludes_correctly() {
        let mut o = FilterOptions::default();
        o.page_set = PageSet::Odd;
        assert!(o.is_page_in_range(1));
        assert!(!o.is_page_in_range(2));
    }

    #[test]
    fn resolution_parses_both_forms() {
        assert_eq!(parse_resolution("300x600dpi"), Some((300, 600)));
        assert_eq!(parse_resolution("300dpi"), Some((300, 300)));
    }

    #[test]
    fn overrides_sort_by_key() {
        let o = parse_options(&opts(&[(
            "overrides",
            "{document-numbers=2 page-numbers=1} {document-numbers=1 page-numbers=1}",
        )]));
        assert_eq!(o.overrides.len(), 2);
        assert!(o.overrides[0].first_document <= o.overrides[1].first_document);
    }
}
