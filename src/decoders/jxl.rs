//! JPEG-XL input handling: signature detection only.
//!
//! Decoding JPEG-XL is out of scope — there's no pure-Rust decoder in the
//! rest of this crate's dependency stack, and pulling in a C binding would
//! be the one new piece of native tooling in an otherwise pure-Rust
//! pipeline. A well-formed JXL signature is recognized and rejected with
//! `Unsupported` rather than a byte-garbage `InputFormat` error, so callers
//! can tell "this is a JXL file we can't read" from "this isn't JXL at all".

use std::io::Read;

use crate::errors::{Error, Result};
use crate::raster_header::{RasterHeader, RowSource};

/// Raw JPEG-XL codestream signature (ISO/IEC 18181-2 Annex A).
const CODESTREAM_SIGNATURE: [u8; 2] = [0xFF, 0x0A];

/// ISO-BMFF container signature: box size `0x0000000C`, box type `JXL `,
/// then the fixed payload `0D 0A 87 0A`.
const CONTAINER_SIGNATURE: [u8; 12] = [
    0x00, 0x00, 0x00, 0x0C, 0x4A, 0x58, 0x4C, 0x20, 0x0D, 0x0A, 0x87, 0x0A,
];

fn looks_like_jxl(prefix: &[u8]) -> bool {
    prefix.starts_with(&CODESTREAM_SIGNATURE) || prefix.starts_with(&CONTAINER_SIGNATURE)
}

/// A `RowSource` that only ever returns `Unsupported` (for a recognized
/// signature) or `InputFormat` (for anything else) — there is no row data
/// to serve.
pub struct JxlRowSource<R> {
    reader: R,
    checked: bool,
}

impl<R: Read> JxlRowSource<R> {
    pub fn new(reader: R) -> Self {
        JxlRowSource {
            reader,
            checked: false,
        }
    }
}

impl<R: Read> RowSource for JxlRowSource<R> {
    fn next_page_header(&mut self) -> Result<Option<RasterHeader>> {
        if self.checked {
            return Ok(None);
        }
        self.checked = true;

        let mut prefix = [0u8; 12];
        let mut filled = 0;
        while filled < prefix.len() {
            match self.reader.read(&mut prefix[filled..]) {
                Ok(0) => break,
                Ok(n) => filled += n,
                Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(Error::Io(e)),
            }
        }

        if looks_like_jxl(&prefix[..filled]) {
            Err(Error::Unsupported(
                "JPEG-XL decoding is not implemented".to_string(),
            ))
        } else {
            Err(Error::InputFormat(
                "input does not carry a recognized JPEG-XL signature".to_string(),
            ))
        }
    }

    fn read_row(&mut self, _buf: &mut [u8]) -> Result<()> {
        Err(Error::Unsupported(
            "JPEG-XL decoding is not implemented".to_string(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn recognized_codestream_signature_is_unsupported_not_malformed() {
        let mut src = JxlRowSource::new(Cursor::new(vec![0xFF, 0x0A, 0, 0]));
        let err = src.next_page_header().unwrap_err();
        assert!(matches!(err, Error::Unsupported(_)));
    }

    #[test]
    fn recognized_container_signature_is_unsupported_not_malformed() {
        let mut src = JxlRowSource::new(Cursor::new(CONTAINER_SIGNATURE.to_vec()));
        let err = src.next_page_header().unwrap_err();
        assert!(matches!(err, Error::Unsupported(_)));
    }

    #[test]
    fn garbage_input_is_input_format_error() {
        let mut src = JxlRowSource::new(Cursor::new(b"not jxl at all".to_vec()));
        let err = src.next_page_header().unwrap_err();
        assert!(matches!(err, Error::InputFormat(_)));
    }
}
