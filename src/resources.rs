//! Per-cell PDF resource merging: folds an input page's `/Resources` into
//! a composite output page's resource dictionary, renaming on conflict.
//!
//! Grounded in the teacher's deleted `pdf_resources.rs` (`PdfResources`,
//! `into_with_document_and_layers`), generalized from the fixed
//! XObject/pattern/graphics-state/layer key set to the eight-key set the
//! merge algorithm names.

use std::collections::HashMap;

use lopdf::{Dictionary, Object};

/// Resource dictionary keys the merger participates in; anything else in
/// `/Resources` is ignored.
const MERGED_KEYS: &[&str] = &[
    "ColorSpace",
    "ExtGState",
    "Font",
    "Pattern",
    "ProcSet",
    "Properties",
    "Shading",
    "XObject",
];

/// Per-cell name remapping, keyed by resource-dictionary key (e.g. `Font`)
/// then by original sub-key, to its mapped replacement.
pub type CellNameMap = HashMap<String, HashMap<String, String>>;

/// A composite page's merged resource dictionary, built up one cell at a
/// time.
#[derive(Debug, Default)]
pub struct ResourceMerger {
    dict: Dictionary,
    proc_set: Vec<Object>,
    proc_set_seen: Vec<Vec<u8>>,
}

impl ResourceMerger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Merges `input_resources` (an input page's `/Resources` dictionary)
    /// into the composite, for the given `cell_index` (`0`-based, used to
    /// derive the `'a' + cell_index` rename prefix on conflict). Returns
    /// the per-key name map content-stream rewriting should apply for this
    /// cell.
    pub fn merge_cell(&mut self, input_resources: &Dictionary, cell_index: u32) -> CellNameMap {
        let prefix = rename_prefix(cell_index);
        let mut cell_map = CellNameMap::new();

        for &key in MERGED_KEYS {
            let Ok(value) = input_resources.get(key.as_bytes()) else {
                continue;
            };

            if key == "ProcSet" {
                self.merge_proc_set(value);
                continue;
            }

            match value {
                Object::Dictionary(sub) => {
                    let renamed = self.merge_dict_key(key, sub, &prefix);
                    if !renamed.is_empty() {
                        cell_map.insert(key.to_string(), renamed);
                    }
                }
                other => {
                    // Array- or indirect-valued keys: treat the whole key
                    // as a single conflict unit under the same rule.
                    if !self.dict.has(key.as_bytes()) {
                        self.dict.set(key, other.clone());
                    } else {
                        let mapped_key = format!("{prefix}{key}");
                        self.dict.set(mapped_key.clone(), other.clone());
                        cell_map
                            .entry(key.to_string())
                            .or_default()
                            .insert(key.to_string(), mapped_key);
                    }
                }
            }
        }

        cell_map
    }

    fn merge_proc_set(&mut self, value: &Object) {
        if let Object::Array(names) = value {
            for name in names {
                if let Object::Name(n) = name {
                    if !self.proc_set_seen.contains(n) {
                        self.proc_set_seen.push(n.clone());
                        self.proc_set.push(Object::Name(n.clone()));
                    }
                }
            }
        }
    }

    fn merge_dict_key(&mut self, key: &str, sub: &Dictionary, prefix: &str) -> HashMap<String, String> {
        let mut renamed = HashMap::new();
        let composite_sub = match self.dict.get_mut(key.as_bytes()) {
            Ok(Object::Dictionary(d)) => d,
            _ => {
                self.dict.set(key, Object::Dictionary(Dictionary::new()));
                match self.dict.get_mut(key.as_bytes()).unwrap() {
                    Object::Dictionary(d) => d,
                    _ => unreachable!(),
                }
            }
        };

        for (sub_key, sub_value) in sub.iter() {
            let sub_key_str = String::from_utf8_lossy(sub_key).to_string();
            if composite_sub.has(sub_key) {
                let mapped = format!("{prefix}{sub_key_str}");
                composite_sub.set(mapped.clone(), sub_value.clone());
                renamed.insert(sub_key_str, mapped);
            } else {
                composite_sub.set(sub_key_str.clone(), sub_value.clone());
            }
        }

        renamed
    }

    /// Finalizes the merged `/Resources` dictionary, folding in the
    /// accumulated `/ProcSet` array.
    pub fn into_dictionary(mut self) -> Dictionary {
        if !self.proc_set.is_empty() {
            self.dict.set("ProcSet", Object::Array(self.proc_set));
        }
        self.dict
    }
}

/// `'a' + cell_index`, e.g. cell 0 → `a`, cell 1 → `b`, … cell 25 → `z`,
/// cell 26 → `aa` (wrapping like a spreadsheet column label beyond 26
/// cells, which no supported N-up layout reaches).
fn rename_prefix(cell_index: u32) -> String {
    let mut n = cell_index;
    let mut letters = Vec::new();
    loop {
        letters.push((b'a' + (n % 26) as u8) as char);
        if n < 26 {
            break;
        }
        n = n / 26 - 1;
    }
    letters.iter().rev().collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn font_dict(entries: &[(&str, i64)]) -> Dictionary {
        let mut d = Dictionary::new();
        let mut fonts = Dictionary::new();
        for (name, id) in entries {
            fonts.set(*name, Object::Reference((*id as u32, 0)));
        }
        d.set("Font", Object::Dictionary(fonts));
        d
    }

    #[test]
    fn first_cell_copies_without_renaming() {
        let mut merger = ResourceMerger::new();
        let map = merger.merge_cell(&font_dict(&[("F1", 5)]), 0);
        assert!(map.is_empty());
        let merged = merger.into_dictionary();
        let Object::Dictionary(fonts) = merged.get(b"Font").unwrap() else {
            panic!()
        };
        assert!(fonts.has(b"F1"));
    }

    #[test]
    fn conflicting_second_cell_gets_prefixed_name() {
        let mut merger = ResourceMerger::new();
        merger.merge_cell(&font_dict(&[("F1", 5)]), 0);
        let map = merger.merge_cell(&font_dict(&[("F1", 9)]), 1);
        assert_eq!(map.get("Font").unwrap().get("F1").unwrap(), "bF1");

        let merged = merger.into_dictionary();
        let Object::Dictionary(fonts) = merged.get(b"Font").unwrap() else {
            panic!()
        };
        assert!(fonts.has(b"F1"));
        assert!(fonts.has(b"bF1"));
    }

    #[test]
    fn rename_prefix_follows_spreadsheet_column_style() {
        assert_eq!(rename_prefix(0), "a");
        assert_eq!(rename_prefix(1), "b");
        assert_eq!(rename_prefix(25), "z");
    }

    #[test]
    fn proc_set_unions_preserving_first_appearance_order() {
        let mut merger = ResourceMerger::new();
        let mut r1 = Dictionary::new();
        r1.set("ProcSet", Object::Array(vec![Object::Name(b"PDF".to_vec()), Object::Name(b"Text".to_vec())]));
        merger.merge_cell(&r1, 0);
        let mut r2 = Dictionary::new();
        r2.set("ProcSet", Object::Array(vec![Object::Name(b"Text".to_vec()), Object::Name(b"ImageC".to_vec())]));
        merger.merge_cell(&r2, 1);

        let merged = merger.into_dictionary();
        let Object::Array(procset) = merged.get(b"ProcSet").unwrap() else {
            panic!()
        };
        let names: Vec<&[u8]> = procset
            .iter()
            .map(|o| if let Object::Name(n) = o { n.as_slice() } else { &[] })
            .collect();
        assert_eq!(names, vec![b"PDF".as_slice(), b"Text".as_slice(), b"ImageC".as_slice()]);
    }
}
