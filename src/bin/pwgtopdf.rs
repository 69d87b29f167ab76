//! `pwgtopdf`: the CUPS raster-to-PDF/PCLm filter binary. Reads one
//! PWG/Apple Raster (or TIFF/JPEG-XL) job and writes the encoded PDF or
//! PCLm document to stdout.

use std::fs::File;
use std::io::{self, Cursor, Read, Write};
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

    let mut invocation = match lib::cli::parse("pwgtopdf") {
        Ok(inv) => inv,
        Err(e) => {
            eprintln!("pwgtopdf: {e}");
            return ExitCode::from(2);
        }
    };
    invocation
        .filter_data
        .options
        .entry("copies".to_string())
        .or_insert_with(|| invocation.filter_data.copies.to_string());
    invocation.filter_data.content_type = std::env::var("CONTENT_TYPE").unwrap_or_else(|_| "image/pwg-raster".to_string());
    invocation.filter_data.final_content_type = std::env::var("FINAL_CONTENT_TYPE").unwrap_or_else(|_| "application/pdf".to_string());

    let bytes = match read_input(invocation.input_path.as_deref()) {
        Ok(b) => b,
        Err(e) => {
            eprintln!("pwgtopdf: failed to read input: {e}");
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

    match lib::pwgtopdf::run(&invocation.filter_data, Cursor::new(bytes), &env) {
        Ok(out) => {
            if let Err(e) = io::stdout().write_all(&out) {
                eprintln!("pwgtopdf: failed to write output: {e}");
                return ExitCode::from(1);
            }
            ExitCode::from(0)
        }
        Err(e) => {
            eprintln!("pwgtopdf: {e}");
            ExitCode::from(exit_code(&e))
        }
    }
}

fn exit_code(e: &Error) -> u8 {
    e.exit_code() as u8
}
