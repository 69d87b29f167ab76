//! Generic IPP "collection" value parser.
//!
//! A collection is CUPS's textual encoding of an IPP collection attribute:
//! space-separated `name=value` pairs, with `'`/`"` quoting, `\` escaping,
//! and nested `{...}` collections kept intact (not recursively parsed) so the
//! caller can hand them back to [`parse_collection`] itself. A bare `noname`
//! token is sugar for `name=false`.

use std::collections::HashMap;

/// One parsed value out of a collection string.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Bool(bool),
    Text(String),
    /// Unparsed nested `{...}` body, with the braces stripped.
    Collection(String),
}

impl Value {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_collection(&self) -> Option<&str> {
        match self {
            Value::Collection(s) => Some(s),
            _ => None,
        }
    }
}

/// A parsed collection: an ordered map from attribute name to value.
pub type Collection = HashMap<String, Value>;

/// Parses one collection body (without the caller needing to strip the
/// outer `{`/`}` first — either form works).
pub fn parse_collection(input: &str) -> Collection {
    let mut out = Collection::new();
    let body = input.trim();
    let body = body.strip_prefix('{').unwrap_or(body);
    let body = body.strip_suffix('}').unwrap_or(body);

    let mut chars = body.chars().peekable();
    while let Some(&c) = chars.peek() {
        if c.is_whitespace() {
            chars.next();
            continue;
        }
        let name = read_token(&mut chars, &['=', ' ']);
        if name.is_empty() {
            break;
        }
        if chars.peek() == Some(&'=') {
            chars.next(); // consume '='
            let value = read_value(&mut chars);
            out.insert(name, value);
        } else if let Some(stripped) = name.strip_prefix("no") {
            out.insert(stripped.to_string(), Value::Bool(false));
        } else {
            out.insert(name, Value::Bool(true));
        }
    }

    out
}

fn read_token(chars: &mut std::iter::Peekable<std::str::Chars>, stop: &[char]) -> String {
    let mut s = String::new();
    while let Some(&c) = chars.peek() {
        if stop.contains(&c) {
            break;
        }
        s.push(c);
        chars.next();
    }
    s
}

fn read_value(chars: &mut std::iter::Peekable<std::str::Chars>) -> Value {
    match chars.peek() {
        Some('{') => {
            chars.next();
            let mut depth = 1usize;
            let mut s = String::new();
            while let Some(c) = chars.next() {
                match c {
                    '{' => {
                        depth += 1;
                        s.push(c);
                    }
                    '}' => {
                        depth -= 1;
                        if depth == 0 {
                            break;
                        }
                        s.push(c);
                    }
                    _ => s.push(c),
                }
            }
            Value::Collection(s)
        }
        Some('\'') | Some('"') => {
            let quote = chars.next().unwrap();
            let mut s = String::new();
            while let Some(c) = chars.next() {
                match c {
                    '\\' => {
                        if let Some(escaped) = chars.next() {
                            s.push(escaped);
                        }
                    }
                    c if c == quote => break,
                    c => s.push(c),
                }
            }
            Value::Text(s)
        }
        _ => {
            let mut s = String::new();
            while let Some(&c) = chars.peek() {
                if c.is_whitespace() {
                    break;
                }
                if c == '\\' {
                    chars.next();
                    if let Some(escaped) = chars.next() {
                        s.push(escaped);
                    }
                    continue;
                }
                s.push(c);
                chars.next();
            }
            if s == "true" {
                Value::Bool(true)
            } else if s == "false" {
                Value::Bool(false)
            } else {
                Value::Text(s)
            }
        }
    }
}

/// Splits a space-separated list of one-or-more `{...}` collections (as
/// used by `overrides`, which may repeat) into their raw bodies.
pub fn split_collections(input: &str) -> Vec<String> {
    let mut out = Vec::new();
    let mut chars = input.trim().chars().peekable();
    while let Some(&c) = chars.peek() {
        if c.is_whitespace() {
            chars.next();
            continue;
        }
        if c == '{' {
            chars.next();
            let mut depth = 1usize;
            let mut s = String::new();
            while let Some(c) = chars.next() {
                match c {
                    '{' => {
                        depth += 1;
                        s.push(c);
                    }
                    '}' => {
                        depth -= 1;
                        if depth == 0 {
                            break;
                        }
                        s.push(c);
                    }
                    _ => s.push(c),
                }
            }
            out.push(s);
        } else {
            chars.next();
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_flat_pairs_and_booleans() {
        let c = parse_collection("media-color=white nocollate fit-to-page");
        assert_eq!(c.get("media-color").unwrap().as_str(), Some("white"));
        assert_eq!(c.get("collate").unwrap().as_bool(), Some(false));
        assert_eq!(c.get("fit-to-page").unwrap().as_bool(), Some(true));
    }

    #[test]
    fn parses_quoted_values_with_escapes() {
        let c = parse_collection(r#"media-size-name="na_letter_8.5x11in""#);
        assert_eq!(
            c.get("media-size-name").unwrap().as_str(),
            Some("na_letter_8.5x11in")
        );

        let c2 = parse_collection(r#"job-sheet-message='quoted \'inner\' text'"#);
        assert_eq!(
            c2.get("job-sheet-message").unwrap().as_str(),
            Some("quoted 'inner' text")
        );
    }

    #[test]
    fn keeps_nested_collections_intact() {
        let c = parse_collection("media-col={media-size={x-dimension=21000 y-dimension=29700}}");
        let nested = c.get("media-col").unwrap().as_collection().unwrap();
        let inner = parse_collection(nested);
        let size = inner.get("media-size").unwrap().as_collection().unwrap();
        let dims = parse_collection(size);
        assert_eq!(dims.get("x-dimension").unwrap().as_str(), Some("21000"));
    }

    #[test]
    fn splits_repeated_collections() {
        let parts = split_collections("{a=1} {b=2}");
        assert_eq!(parts.len(), 2);
        assert_eq!(parse_collection(&parts[0]).get("a").unwrap().as_str(), Some("1"));
    }
}
