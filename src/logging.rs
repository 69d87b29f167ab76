//! Wires the `log` facade the rest of the crate calls into (`debug!`,
//! `warn!`, ...) up to `env_logger`, the way a CUPS filter binary wants:
//! one line per record on stderr, level controlled by an environment
//! variable so `cupsd` can turn verbosity up without a recompile.

use std::io::Write;

use log::LevelFilter;

/// Name of the environment variable a filter binary's caller sets to pick
/// a log level (`error`, `warn`, `info`, `debug`, `trace`). Distinct from
/// `RUST_LOG` so it doesn't collide with other Rust tools `cupsd` might
/// shell out to on the same host.
pub const LOG_LEVEL_VAR: &str = "CUPSFILTERS_PDF_LOG";

/// Installs the global logger. Safe to call more than once per process
/// (e.g. from multiple `#[test]`s) — later calls are no-ops.
pub fn init() {
    let mut builder = env_logger::Builder::from_env(
        env_logger::Env::new().filter_or(LOG_LEVEL_VAR, "warn"),
    );
    builder.format(|buf, record| {
        writeln!(buf, "{}: {}", record.level(), record.args())
    });
    let _ = builder.try_init();
}

/// Installs the logger at a fixed level, ignoring the environment. Used by
/// binaries that translate a CUPS `-o verbose` style option directly into
/// a level rather than deferring to `CUPSFILTERS_PDF_LOG`.
pub fn init_at(level: LevelFilter) {
    let mut builder = env_logger::Builder::new();
    builder.filter_level(level);
    builder.format(|buf, record| {
        writeln!(buf, "{}: {}", record.level(), record.args())
    });
    let _ = builder.try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn init_does_not_panic_when_called_repeatedly() {
        init();
        init();
        init_at(LevelFilter::Debug);
    }
}
