//! The job-invocation contract (§6.1): everything a filter binary receives
//! about the job it's asked to transform, independent of how it arrived
//! (CUPS argv, a direct library call, or a test fixture).

use std::collections::HashMap;

/// One filter invocation's job metadata and options, as handed to
/// [`crate::pdftopdf::run`]/[`crate::pwgtopdf::run`] by a CLI binary or a
/// test. `logfunc`/`iscanceledfunc` are not carried here directly — they're
/// the two closures an [`crate::env::Env`] is built from at the call site,
/// since `Env` isn't `Clone`/`Debug` and doesn't belong on a data record.
#[derive(Debug, Clone, Default)]
pub struct FilterData {
    pub job_id: u32,
    pub user: String,
    pub title: String,
    pub copies: u32,
    /// MIME type of the input document (e.g. `application/pdf`).
    pub content_type: String,
    /// Negotiated output MIME type; empty means "let the filter decide
    /// from its own defaults".
    pub final_content_type: String,
    /// Flattened CUPS/IPP option set, as [`crate::options::parse_options`]
    /// expects.
    pub options: HashMap<String, String>,
    /// Printer capability attributes (e.g. `pclm-strip-height-preferred`,
    /// `pclm-compression-method-preferred`), looked up the same way as
    /// `options` but scoped to the destination printer rather than the job.
    pub printer_attrs: HashMap<String, String>,
    /// Job-level IPP attributes not already folded into `options`.
    pub job_attrs: HashMap<String, String>,
}

impl FilterData {
    pub fn new(job_id: u32, user: impl Into<String>, title: impl Into<String>, copies: u32) -> Self {
        FilterData {
            job_id,
            user: user.into(),
            title: title.into(),
            copies,
            ..Default::default()
        }
    }

    pub fn printer_attr(&self, name: &str) -> Option<&str> {
        self.printer_attrs.get(name).map(String::as_str)
    }

    pub fn job_attr(&self, name: &str) -> Option<&str> {
        self.job_attrs.get(name).map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_sets_the_required_fields_and_defaults_the_rest() {
        let data = FilterData::new(42, "alice", "report.pdf", 3);
        assert_eq!(data.job_id, 42);
        assert_eq!(data.user, "alice");
        assert_eq!(data.copies, 3);
        assert!(data.options.is_empty());
    }

    #[test]
    fn printer_attr_reads_through_the_map() {
        let mut data = FilterData::new(1, "bob", "x", 1);
        data.printer_attrs.insert("pclm-strip-height-preferred".to_string(), "16".to_string());
        assert_eq!(data.printer_attr("pclm-strip-height-preferred"), Some("16"));
        assert_eq!(data.printer_attr("missing"), None);
    }
}
