//! Crate-wide error type.
//!
//! error_chain and failure are certainly nice, but completely overengineered
//! for this use-case. For example, neither of them allow error localization.
//! Additionally, debugging macros can get hairy really quick and matching with
//! `*e.kind()` or doing From conversions for other errors is really hard to do.
//!
//! So in this case, the best form of error handling is to use the simple Rust-native
//! way: Just enums, `From` + pattern matching. No macros, except for this one.
//!
//! What this macro does is (simplified): `impl From<$a> for $b { $b::$variant(error) }`
macro_rules! impl_from {
    ($from:ident, $to:ident::$variant:ident) => {
        impl From<$from> for $to {
            fn from(err: $from) -> Self {
                $to::$variant(err.into())
            }
        }
    };
}

use std::error::Error as StdError;
use std::fmt;
use std::io::Error as IoError;

/// Crate-wide error type, covering everything that can go wrong while parsing
/// options, reading/writing PDF objects, or running a filter end to end.
#[derive(Debug)]
pub enum Error {
    /// Wraps `std::io::Error` (reading/writing files, pipes, temp files).
    Io(IoError),
    /// Wraps `lopdf::Error` (malformed PDF object graph).
    Pdf(lopdf::Error),
    /// Input document is not a well-formed instance of the content type it
    /// claims to be (bad PDF header, truncated raster stream, wrong magic).
    InputFormat(String),
    /// Input asks for something this filter was never meant to do (an
    /// options combination, a color space, a page size outside contract).
    Unsupported(String),
    /// A resource could not be obtained: missing font metrics, ICC profile,
    /// banner template, or similar filesystem/asset lookup failure.
    Resource(String),
    /// The job was cancelled cooperatively via `Env::is_canceled`.
    Cancelled,
    /// The document is encrypted and no usable password was supplied.
    Permission(String),
}

impl_from!(IoError, Error::Io);
impl_from!(LopdfError, Error::Pdf);

// lopdf::Error doesn't need a type alias, but `impl_from!` expects a bare
// identifier so we give it one via a local alias.
type LopdfError = lopdf::Error;

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        use self::Error::*;
        match self {
            Io(e) => write!(f, "I/O error: {e}"),
            Pdf(e) => write!(f, "PDF error: {e}"),
            InputFormat(msg) => write!(f, "input format error: {msg}"),
            Unsupported(msg) => write!(f, "unsupported: {msg}"),
            Resource(msg) => write!(f, "resource error: {msg}"),
            Cancelled => write!(f, "job cancelled"),
            Permission(msg) => write!(f, "permission error: {msg}"),
        }
    }
}

impl StdError for Error {}

/// Exit code mapping for the two filter binaries (§6.1): cancellation exits
/// cleanly, `Io`/`Resource` are retryable infrastructure problems, everything
/// else is a hard failure.
impl Error {
    pub fn exit_code(&self) -> i32 {
        match self {
            Error::Cancelled => 0,
            Error::Io(_) | Error::Resource(_) => 1,
            Error::Pdf(_) | Error::InputFormat(_) | Error::Unsupported(_) | Error::Permission(_) => 2,
        }
    }
}

pub type Result<T> = ::std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exit_codes_match_contract() {
        assert_eq!(Error::Cancelled.exit_code(), 0);
        assert_eq!(Error::Resource("x".into()).exit_code(), 1);
        assert_eq!(Error::Unsupported("x".into()).exit_code(), 2);
    }

    #[test]
    fn io_error_converts() {
        let io = IoError::new(std::io::ErrorKind::NotFound, "nope");
        let err: Error = io.into();
        assert!(matches!(err, Error::Io(_)));
    }
}
