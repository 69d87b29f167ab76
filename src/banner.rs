//! Banner and error-sheet page generation, printed with a built-in Courier
//! font so it never depends on an embedded font being available.

use lopdf::content::{Content, Operation};
use lopdf::{Dictionary, Object};

use crate::errors::Error;

/// Base text size (points); banner headers print at `2 * BASE_FONT_SIZE`.
pub const BASE_FONT_SIZE: f32 = 12.0;

/// Builds the `/Font` resource entry for the banner's Courier font,
/// registered under `/F1`.
pub fn courier_font_resource() -> (String, Dictionary) {
    let mut font = Dictionary::new();
    font.set("Type", Object::Name(b"Font".to_vec()));
    font.set("Subtype", Object::Name(b"Type1".to_vec()));
    font.set("BaseFont", Object::Name(b"Courier".to_vec()));
    ("F1".to_string(), font)
}

/// One logged event, carried through to the error sheet. `'E'` denotes an
/// error, `'I'` an informational warning (the source's two-letter prefix
/// scheme).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogPrefix {
    Error,
    Warning,
}

impl LogPrefix {
    fn label(self) -> &'static str {
        match self {
            LogPrefix::Error => "E",
            LogPrefix::Warning => "I",
        }
    }
}

#[derive(Debug, Clone)]
pub struct LoggedEvent {
    pub prefix: LogPrefix,
    pub message: String,
}

/// Builds a banner page's content stream: job metadata lines in the
/// media's right half, header lines at `2 * BASE_FONT_SIZE`, body lines at
/// `BASE_FONT_SIZE`.
pub fn banner_content(
    media_width_pt: f32,
    media_height_pt: f32,
    title: &str,
    user: &str,
    pages: u32,
    message: &str,
) -> Content {
    let x = media_width_pt / 2.0 + 36.0;
    let mut y = media_height_pt - 72.0;
    let mut ops = vec![Operation::new("BT", vec![]), text_font_op(2.0 * BASE_FONT_SIZE)];

    for line in [
        format!("Title: {title}"),
        format!("User: {user}"),
        format!("Pages: {pages}"),
        format!("Message: {message}"),
    ] {
        ops.push(Operation::new("Tm", vec![1.into(), 0.into(), 0.into(), 1.into(), x.into(), y.into()]));
        ops.push(show_text_op(&line));
        y -= 2.0 * BASE_FONT_SIZE * 1.5;
    }
    ops.push(Operation::new("ET", vec![]));
    Content { operations: ops }
}

/// Builds an error sheet's content stream: an `Errors:` section (prefix
/// `E`) followed by a `Warnings:` section (prefix `I`), each falling back
/// to `"No Errors"`/`"No Warnings"` when empty.
pub fn error_sheet_content(media_width_pt: f32, media_height_pt: f32, events: &[LoggedEvent]) -> Content {
    let _ = media_width_pt;
    let errors: Vec<&LoggedEvent> = events.iter().filter(|e| e.prefix == LogPrefix::Error).collect();
    let warnings: Vec<&LoggedEvent> = events.iter().filter(|e| e.prefix == LogPrefix::Warning).collect();

    let mut lines = vec!["Errors:".to_string()];
    if errors.is_empty() {
        lines.push("No Errors".to_string());
    } else {
        lines.extend(errors.iter().map(|e| format!("{}: {}", e.prefix.label(), e.message)));
    }
    lines.push("Warnings:".to_string());
    if warnings.is_empty() {
        lines.push("No Warnings".to_string());
    } else {
        lines.extend(warnings.iter().map(|e| format!("{}: {}", e.prefix.label(), e.message)));
    }

    let mut ops = vec![Operation::new("BT", vec![]), text_font_op(BASE_FONT_SIZE)];
    let mut y = media_height_pt - 72.0;
    for line in &lines {
        ops.push(Operation::new("Tm", vec![1.into(), 0.into(), 0.into(), 1.into(), (72.0).into(), y.into()]));
        ops.push(show_text_op(line));
        y -= BASE_FONT_SIZE * 1.4;
    }
    ops.push(Operation::new("ET", vec![]));
    Content { operations: ops }
}

fn text_font_op(size: f32) -> Operation {
    Operation::new("Tf", vec![Object::Name(b"F1".to_vec()), size.into()])
}

fn show_text_op(text: &str) -> Operation {
    Operation::new(
        "Tj",
        vec![Object::String(text.as_bytes().to_vec(), lopdf::StringFormat::Literal)],
    )
}

/// How many copies of the error sheet to emit: two when duplex (so a back
/// side exists per the `duplex_xform` rule), otherwise one.
pub fn error_sheet_copies(duplex: bool) -> u32 {
    if duplex {
        2
    } else {
        1
    }
}

/// Converts an accumulated error list into the events an error sheet
/// should render, collapsing any fatal [`Error`] into an `E`-prefixed line.
pub fn event_from_error(err: &Error) -> LoggedEvent {
    LoggedEvent {
        prefix: LogPrefix::Error,
        message: err.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_events_produce_no_errors_no_warnings() {
        let content = error_sheet_content(612.0, 792.0, &[]);
        let rendered: Vec<String> = content
            .operations
            .iter()
            .filter(|op| op.operator == "Tj")
            .map(|op| format!("{:?}", op.operands))
            .collect();
        assert!(rendered.iter().any(|s| s.contains("No Errors")));
        assert!(rendered.iter().any(|s| s.contains("No Warnings")));
    }

    #[test]
    fn error_sheet_copies_doubles_for_duplex() {
        assert_eq!(error_sheet_copies(false), 1);
        assert_eq!(error_sheet_copies(true), 2);
    }

    #[test]
    fn event_from_error_uses_error_prefix() {
        let event = event_from_error(&Error::Cancelled);
        assert_eq!(event.prefix, LogPrefix::Error);
    }
}
