//! The CUPS filter argv convention both binaries share:
//! `<binary> job-id user title copies options [filename]`, with the
//! document read from `filename` if given or stdin otherwise, and written
//! to stdout. `options` is a single space-separated `key=value` blob, the
//! same shape CUPS hands a filter on the command line.

use std::collections::HashMap;
use std::path::PathBuf;

use clap::{value_parser, Arg, Command};

use crate::errors::{Error, Result};
use crate::filter_data::FilterData;

pub struct Invocation {
    pub filter_data: FilterData,
    pub input_path: Option<PathBuf>,
}

fn command(name: &'static str) -> Command {
    Command::new(name)
        .arg(Arg::new("job-id").required(true).index(1))
        .arg(Arg::new("user").required(true).index(2))
        .arg(Arg::new("title").required(true).index(3))
        .arg(
            Arg::new("copies")
                .required(true)
                .index(4)
                .value_parser(value_parser!(u32)),
        )
        .arg(Arg::new("options").index(5).default_value(""))
        .arg(Arg::new("filename").index(6))
}

/// Parses `std::env::args()` into an [`Invocation`], the way a CUPS
/// `cupsd`-invoked filter binary receives its job.
pub fn parse(binary_name: &'static str) -> Result<Invocation> {
    parse_from(binary_name, std::env::args())
}

fn parse_from(binary_name: &'static str, args: impl Iterator<Item = String>) -> Result<Invocation> {
    let matches = command(binary_name)
        .try_get_matches_from(args)
        .map_err(|e| Error::Unsupported(format!("argument error: {e}")))?;

    let job_id: u32 = matches
        .get_one::<String>("job-id")
        .unwrap()
        .parse()
        .map_err(|_| Error::Unsupported("job-id must be a non-negative integer".to_string()))?;
    let user = matches.get_one::<String>("user").unwrap().clone();
    let title = matches.get_one::<String>("title").unwrap().clone();
    let copies = *matches.get_one::<u32>("copies").unwrap();
    let options = parse_option_blob(matches.get_one::<String>("options").map(String::as_str).unwrap_or(""));
    let input_path = matches.get_one::<String>("filename").map(PathBuf::from);

    let mut filter_data = FilterData::new(job_id, user, title, copies);
    filter_data.options = options;

    Ok(Invocation {
        filter_data,
        input_path,
    })
}

/// Splits a CUPS-style `key=value key2=value2` options string, the same
/// format `options.rs::parse_options` expects as its lookup source.
fn parse_option_blob(blob: &str) -> HashMap<String, String> {
    let mut out = HashMap::new();
    for token in blob.split_whitespace() {
        match token.split_once('=') {
            Some((key, value)) => {
                out.insert(key.to_string(), value.to_string());
            }
            None => {
                out.insert(token.to_string(), "true".to_string());
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(s: &str) -> Vec<String> {
        std::iter::once("pdftopdf".to_string())
            .chain(s.split_whitespace().map(str::to_string))
            .collect()
    }

    #[test]
    fn parses_the_canonical_five_argument_form() {
        let inv = parse_from("pdftopdf", args("42 alice report.pdf 3 number-up=2").into_iter()).unwrap();
        assert_eq!(inv.filter_data.job_id, 42);
        assert_eq!(inv.filter_data.user, "alice");
        assert_eq!(inv.filter_data.copies, 3);
        assert_eq!(inv.filter_data.options.get("number-up"), Some(&"2".to_string()));
        assert_eq!(inv.input_path, None);
    }

    #[test]
    fn accepts_a_trailing_filename() {
        let argv = vec![
            "pdftopdf".to_string(),
            "1".to_string(),
            "bob".to_string(),
            "title".to_string(),
            "1".to_string(),
            "".to_string(),
            "/tmp/job.pdf".to_string(),
        ];
        let inv = parse_from("pdftopdf", argv.into_iter()).unwrap();
        assert_eq!(inv.input_path, Some(PathBuf::from("/tmp/job.pdf")));
    }

    #[test]
    fn bare_option_flags_default_to_true() {
        let options = parse_option_blob("fitplot number-up=4");
        assert_eq!(options.get("fitplot"), Some(&"true".to_string()));
        assert_eq!(options.get("number-up"), Some(&"4".to_string()));
    }

    #[test]
    fn rejects_a_non_numeric_copies_field() {
        assert!(parse_from("pdftopdf", args("1 bob title notanumber").into_iter()).is_err());
    }
}
