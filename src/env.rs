//! Ambient job environment: logging sink, cancellation check, and the
//! environment-variable lookups the filter contract relies on, grouped
//! behind one handle instead of global statics.

use std::env;

/// A level for the `logfunc` sink, mirroring the four CUPS filter levels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    fn as_log_level(self) -> log::Level {
        match self {
            LogLevel::Debug => log::Level::Debug,
            LogLevel::Info => log::Level::Info,
            LogLevel::Warn => log::Level::Warn,
            LogLevel::Error => log::Level::Error,
        }
    }
}

/// Replaces the teacher's global `Verbosity`/temp-basename statics with an
/// explicit handle threaded through the pipeline: a log sink and a
/// cooperative cancellation check, both closures so the CLI binaries can
/// wire them to CUPS's `logfunc`/`iscanceledfunc` while tests can wire them
/// to nothing.
pub struct Env<'a> {
    log: Box<dyn Fn(LogLevel, &str) + 'a>,
    is_canceled: Box<dyn Fn() -> bool + 'a>,
    pub debug_cell_boxes: bool,
}

impl<'a> Env<'a> {
    pub fn new(log: impl Fn(LogLevel, &str) + 'a, is_canceled: impl Fn() -> bool + 'a) -> Self {
        Env {
            log: Box::new(log),
            is_canceled: Box::new(is_canceled),
            debug_cell_boxes: env::var_os("IPPTRANSFORM_DEBUG").is_some(),
        }
    }

    /// An `Env` with a `log`-crate-backed sink and no cancellation source,
    /// suitable for library-internal use and tests.
    pub fn passive() -> Self {
        Env::new(
            |level, msg| log::log!(level.as_log_level(), "{msg}"),
            || false,
        )
    }

    pub fn log(&self, level: LogLevel, msg: &str) {
        (self.log)(level, msg);
    }

    pub fn warn(&self, msg: &str) {
        self.log(LogLevel::Warn, msg);
    }

    pub fn error(&self, msg: &str) {
        self.log(LogLevel::Error, msg);
    }

    pub fn is_canceled(&self) -> bool {
        (self.is_canceled)()
    }
}

/// Reads `CUPS_FONTPATH`, defaulting to `<datadir>/fonts`.
pub fn cups_fontpath(datadir: &str) -> String {
    env::var("CUPS_FONTPATH").unwrap_or_else(|_| format!("{datadir}/fonts"))
}

/// Reads the `CLASSIFICATION` banner string, if any.
pub fn classification() -> Option<String> {
    env::var("CLASSIFICATION").ok().filter(|s| !s.is_empty())
}

/// Reads `CUPS_IPPFIND`, defaulting to the `ippfind` binary on `PATH`.
pub fn cups_ippfind() -> String {
    env::var("CUPS_IPPFIND").unwrap_or_else(|_| "ippfind".to_string())
}

/// Resolves the decryption password for the `n`-th document (1-based),
/// per `IPP_DOCUMENT_PASSWORD<n>` falling back to `IPP_DOCUMENT_PASSWORD`.
pub fn document_password(document_index: u32) -> Option<String> {
    env::var(format!("IPP_DOCUMENT_PASSWORD{document_index}"))
        .or_else(|_| env::var("IPP_DOCUMENT_PASSWORD"))
        .ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[test]
    fn env_log_invokes_the_supplied_sink() {
        let seen = Cell::new(false);
        let env = Env::new(|_level, _msg| seen.set(true), || false);
        env.warn("uh oh");
        assert!(seen.get());
    }

    #[test]
    fn env_is_canceled_reflects_the_supplied_predicate() {
        let env = Env::new(|_, _| {}, || true);
        assert!(env.is_canceled());
    }
}
