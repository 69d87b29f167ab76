//! Name-token rewriting for content streams copied between pages.
//!
//! Tokenizes a raw content stream just enough to find `/name` tokens and
//! skip over string literals faithfully, so a per-cell name remapping (see
//! [`crate::resources`]) can be applied without a full PDF content-stream
//! parse. Modeled as an explicit state machine rather than nested
//! `match`-in-`match` dispatch.

use std::collections::HashMap;

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
enum State {
    Normal,
    InName,
    /// `depth` tracks nested, unescaped parentheses inside a `(...)` string.
    InString(u32),
    InStringEscape(u32),
    InHexString,
}

/// Rewrites every `/name` token found in `input` that has an entry in
/// `remap`, leaving everything else — including the contents of `(...)`
/// and `<...>` string literals — untouched.
pub fn rewrite_names(input: &[u8], remap: &HashMap<String, String>) -> Vec<u8> {
    let mut out = Vec::with_capacity(input.len());
    let mut state = State::Normal;
    let mut name_buf = Vec::new();

    let flush_name = |name_buf: &mut Vec<u8>, out: &mut Vec<u8>| {
        if name_buf.is_empty() {
            return;
        }
        let name = String::from_utf8_lossy(name_buf);
        out.push(b'/');
        match remap.get(name.as_ref()) {
            Some(mapped) => out.extend_from_slice(mapped.as_bytes()),
            None => out.extend_from_slice(name_buf),
        }
        name_buf.clear();
    };

    for &b in input {
        match state {
            State::Normal => match b {
                b'/' => {
                    state = State::InName;
                }
                b'(' => {
                    state = State::InString(0);
                    out.push(b);
                }
                b'<' => {
                    state = State::InHexString;
                    out.push(b);
                }
                _ => out.push(b),
            },
            State::InName => {
                if is_name_terminator(b) {
                    flush_name(&mut name_buf, &mut out);
                    state = State::Normal;
                    match b {
                        b'(' => {
                            state = State::InString(0);
                            out.push(b);
                        }
                        b'<' => {
                            state = State::InHexString;
                            out.push(b);
                        }
                        _ => out.push(b),
                    }
                } else {
                    name_buf.push(b);
                }
            }
            State::InString(depth) => match b {
                b'\\' => {
                    state = State::InStringEscape(depth);
                    out.push(b);
                }
                b'(' => {
                    state = State::InString(depth + 1);
                    out.push(b);
                }
                b')' => {
                    out.push(b);
                    state = if depth == 0 {
                        State::Normal
                    } else {
                        State::InString(depth - 1)
                    };
                }
                _ => out.push(b),
            },
            State::InStringEscape(depth) => {
                out.push(b);
                state = State::InString(depth);
            }
            State::InHexString => {
                out.push(b);
                if b == b'>' {
                    state = State::Normal;
                }
            }
        }
    }
    flush_name(&mut name_buf, &mut out);
    out
}

fn is_name_terminator(b: u8) -> bool {
    b.is_ascii_whitespace() || matches!(b, b'/' | b'(' | b')' | b'<' | b'>' | b'[' | b']' | b'{' | b'}' | b'%')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rewrites_only_mapped_names() {
        let mut remap = HashMap::new();
        remap.insert("F1".to_string(), "aF1".to_string());
        let input = b"/F1 12 Tf (/F1 is not a name) Tj /F2 1 Tf";
        let out = rewrite_names(input, &remap);
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "/aF1 12 Tf (/F1 is not a name) Tj /F2 1 Tf"
        );
    }

    #[test]
    fn skips_nested_parens_and_escapes() {
        let mut remap = HashMap::new();
        remap.insert("X1".to_string(), "aX1".to_string());
        let input = br"(nested (parens) and \) escape) /X1 Do";
        let out = rewrite_names(input, &remap);
        assert_eq!(
            String::from_utf8(out).unwrap(),
            r"(nested (parens) and \) escape) /aX1 Do"
        );
    }

    #[test]
    fn skips_hex_strings_untouched() {
        let remap = HashMap::new();
        let input = b"<48656C6C6F> Tj";
        assert_eq!(rewrite_names(input, &remap), input);
    }
}
