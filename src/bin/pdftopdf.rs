//! `pdftopdf`: the CUPS page-imposition filter binary. Reads one PDF job
//! (stdin or a trailing filename) and writes the imposed, banner-wrapped
//! PDF to stdout.

use std::fs::File;
use std::io::{self, Read, Write};
use std::process::ExitCode;

use cupsfilters_pdf::{self as lib, Error};

fn read_input(path: Option<&std::path::Path>) -> io::Result<Vec<u8>> {
    let mut bytes = Vec::new();
    match path {
        Some(p) => {
            File::open(p)?.read_to_end(&mut bytes)?;
        }
        None => {
            io::stdin().read_to_end(&mut bytes)?;
        }
    }
    Ok(bytes)
}

fn main() -> ExitCode {
    lib::logging::init();

    let mut invocation = match lib::cli::parse("pdftopdf") {
        Ok(inv) => inv,
        Err(e) => {
            eprintln!("pdftopdf: {e}");
            return ExitCode::from(2);
        }
    };
    invocation
        .filter_data
        .options
        .entry("copies".to_string())
        .or_insert_with(|| invocation.filter_data.copies.to_string());
    invocation.filter_data.content_type = std::env::var("CONTENT_TYPE").unwrap_or_else(|_| "application/pdf".to_string());
    invocation.filter_data.final_content_type = std::env::var("FINAL_CONTENT_TYPE").unwrap_or_default();

    let bytes = match read_input(invocation.input_path.as_deref()) {
        Ok(b) => b,
        Err(e) => {
            eprintln!("pdftopdf: failed to read input: {e}");
            return ExitCode::from(1);
        }
    };

    let env = lib::env::Env::new(
        |level, msg| {
            let prefix = match level {
                lib::env::LogLevel::Debug => "DEBUG",
                lib::env::LogLevel::Info => "INFO",
                lib::env::LogLevel::Warn => "WARN",
                lib::env::LogLevel::Error => "ERROR",
            };
            eprintln!("{prefix}: {msg}");
        },
        || std::env::var_os("CUPS_FILTER_CANCELED").is_some(),
    );

    match lib::pdftopdf::run(&invocation.filter_data, vec![io::Cursor::new(bytes)], &env) {
        Ok(out) => {
            if let Err(e) = io::stdout().write_all(&out) {
                eprintln!("pdftopdf: failed to write output: {e}");
                return ExitCode::from(1);
            }
            ExitCode::from(0)
        }
        Err(e) => {
            eprintln!("pdftopdf: {e}");
            ExitCode::from(exit_code(&e))
        }
    }
}

fn exit_code(e: &Error) -> u8 {
    e.exit_code() as u8
}
