//! PDF document adapter: the capability surface the imposition pipeline
//! drives, wrapping an in-memory [`lopdf::Document`].
//!
//! Grounded in the teacher's deleted `pdf_document.rs`/`pdf_page.rs`
//! (`Rc<RefCell<_>>` handle pattern, builder-style page/stream creation),
//! stripped of fonts, OCG layers, and bookmarks — none of which this
//! pipeline's pages need — and extended with the open/copy-page/password
//! capabilities the spec's PDF writer contract calls for.

use std::cell::RefCell;
use std::rc::Rc;

use lopdf::{Dictionary, Document, Object, ObjectId, Stream};

use crate::errors::{Error, Result};

/// A PDF document being assembled or read, shared by reference among the
/// pages/objects created from it.
#[derive(Clone)]
pub struct PdfFile {
    inner: Rc<RefCell<Document>>,
}

/// A password callback, given the 1-based document index within the job;
/// resolves to `IPP_DOCUMENT_PASSWORD<n>` (or `IPP_DOCUMENT_PASSWORD` for
/// the first document) per the environment contract.
pub type PasswordFn<'a> = dyn Fn(u32) -> Option<String> + 'a;

impl PdfFile {
    /// Opens an existing PDF from bytes, decrypting with `password_fn` if
    /// it's encrypted.
    pub fn open(bytes: &[u8], document_index: u32, password_fn: &PasswordFn) -> Result<Self> {
        let mut doc = Document::load_mem(bytes).map_err(Error::Pdf)?;
        if doc.is_encrypted() {
            let password = password_fn(document_index).unwrap_or_default();
            doc.decrypt(&password).map_err(|_| {
                Error::Permission(format!("document {document_index} requires a valid password"))
            })?;
        }
        Ok(PdfFile {
            inner: Rc::new(RefCell::new(doc)),
        })
    }

    /// Creates a fresh, empty PDF at the given version (e.g. `"1.7"`).
    pub fn create(version: &str) -> Self {
        let mut doc = Document::with_version(version);
        doc.reference_table = Default::default();
        PdfFile {
            inner: Rc::new(RefCell::new(doc)),
        }
    }

    pub fn num_pages(&self) -> u32 {
        self.inner.borrow().get_pages().len() as u32
    }

    /// Returns the object ID of the `i`-th page (0-based document order).
    pub fn page_id(&self, i: u32) -> Option<ObjectId> {
        self.inner
            .borrow()
            .get_pages()
            .values()
            .nth(i as usize)
            .copied()
    }

    pub fn page_dict(&self, id: ObjectId) -> Result<Dictionary> {
        self.inner
            .borrow()
            .get_dictionary(id)
            .map(Clone::clone)
            .map_err(Error::Pdf)
    }

    /// Reads the decoded content-stream bytes of every stream a page
    /// references (its `/Contents`, normalized to an array).
    pub fn page_content_streams(&self, id: ObjectId) -> Result<Vec<Vec<u8>>> {
        let doc = self.inner.borrow();
        let dict = doc.get_dictionary(id).map_err(Error::Pdf)?;
        let contents = dict.get(b"Contents").map_err(Error::Pdf)?;
        let ids: Vec<ObjectId> = match contents {
            Object::Reference(r) => vec![*r],
            Object::Array(arr) => arr
                .iter()
                .filter_map(|o| if let Object::Reference(r) = o { Some(*r) } else { None })
                .collect(),
            _ => Vec::new(),
        };
        ids.into_iter().map(|id| Self::stream_bytes_locked(&doc, id)).collect()
    }

    /// Reads one stream's content, decoded (Flate/etc.) if it carries a
    /// `/Filter`. Used for page content streams and annotation appearance
    /// streams alike — both are read, never re-encoded, since the content
    /// merger re-compresses on write via [`crate::utils::compress_stream`].
    pub fn stream_bytes(&self, id: ObjectId) -> Result<Vec<u8>> {
        let doc = self.inner.borrow();
        Self::stream_bytes_locked(&doc, id)
    }

    fn stream_bytes_locked(doc: &Document, id: ObjectId) -> Result<Vec<u8>> {
        let stream = doc.get_object(id).and_then(Object::as_stream).map_err(Error::Pdf)?;
        Ok(stream.decompressed_content().unwrap_or_else(|_| stream.content.clone()))
    }

    /// The document's `/Root` catalog dictionary.
    pub fn catalog(&self) -> Result<Dictionary> {
        let doc = self.inner.borrow();
        let root = doc.trailer.get(b"Root").map_err(Error::Pdf)?;
        match root {
            Object::Reference(id) => doc.get_dictionary(*id).map(Clone::clone).map_err(Error::Pdf),
            Object::Dictionary(d) => Ok(d.clone()),
            _ => Err(Error::Pdf(lopdf::Error::Type)),
        }
    }

    /// Inserts a new indirect object (e.g. a page dictionary, a resource
    /// dictionary, an XObject stream) and returns its ID.
    pub fn create_object(&self, object: Object) -> ObjectId {
        self.inner.borrow_mut().add_object(object)
    }

    pub fn create_stream(&self, stream: Stream) -> ObjectId {
        self.inner.borrow_mut().add_object(Object::Stream(stream))
    }

    /// Moves a source page's dictionary and its directly-referenced
    /// resources/content verbatim into this document, returning the new
    /// object ID. Used for hardware-copy duplication and straight page
    /// passthrough.
    pub fn copy_page(&self, source: &PdfFile, source_page: ObjectId) -> Result<ObjectId> {
        let src_doc = source.inner.borrow();
        let mut dst_doc = self.inner.borrow_mut();
        let mut remap = std::collections::BTreeMap::new();
        let new_id = deep_copy_object(&src_doc, &mut dst_doc, source_page, &mut remap)?;
        Ok(new_id)
    }

    /// Deep-copies an arbitrary object tree (typically a page's
    /// `/Resources` dictionary) from `source` into this document, rewriting
    /// every indirect reference it reaches along the way. Used when a page's
    /// resources need to live alongside content copied into a different
    /// `PdfFile` than the one they were read from.
    pub fn import_object(&self, source: &PdfFile, object: &Object) -> Result<Object> {
        let src_doc = source.inner.borrow();
        let mut dst_doc = self.inner.borrow_mut();
        let mut remap = std::collections::BTreeMap::new();
        rewrite_references(&src_doc, &mut dst_doc, object.clone(), &mut remap)
    }

    pub fn set_dict_value(&self, id: ObjectId, key: &str, value: Object) -> Result<()> {
        let mut doc = self.inner.borrow_mut();
        let obj = doc.get_object_mut(id).map_err(Error::Pdf)?;
        match obj {
            Object::Dictionary(d) => {
                d.set(key, value);
                Ok(())
            }
            Object::Stream(s) => {
                s.dict.set(key, value);
                Ok(())
            }
            _ => Err(Error::Pdf(lopdf::Error::Type)),
        }
    }

    /// Looks up an object by ID, independent of whatever indirection got
    /// you there.
    pub fn object(&self, id: ObjectId) -> Result<Object> {
        self.inner.borrow().get_object(id).cloned().map_err(Error::Pdf)
    }

    /// Dereferences `object` one level if it's an indirect reference,
    /// otherwise returns it unchanged. Values pulled straight out of a
    /// `Dictionary::get` (a page's `/Resources`, `/Annots`, an annotation's
    /// `/AP`) are often references rather than the object itself.
    pub fn resolve(&self, object: &Object) -> Result<Object> {
        match object {
            Object::Reference(id) => self.object(*id),
            other => Ok(other.clone()),
        }
    }

    /// Looks up `key` in `dict` and resolves it if it's an indirect
    /// reference.
    pub fn resolve_dict_value(&self, dict: &Dictionary, key: &[u8]) -> Result<Object> {
        let value = dict.get(key).map_err(Error::Pdf)?.clone();
        self.resolve(&value)
    }

    /// Like `resolve_dict_value`, but requires the resolved value to be a
    /// dictionary (or a stream, whose dictionary is returned) — the shape
    /// `/Resources` and `/AP` entries take.
    pub fn resolve_dict(&self, dict: &Dictionary, key: &[u8]) -> Result<Dictionary> {
        match self.resolve_dict_value(dict, key)? {
            Object::Dictionary(d) => Ok(d),
            Object::Stream(s) => Ok(s.dict),
            _ => Err(Error::Pdf(lopdf::Error::Type)),
        }
    }

    /// Assembles the `/Pages` tree and `/Root` catalog over the given page
    /// IDs, in order, and points every page's `/Parent` at it. Called once
    /// per output document, after every page has been created.
    pub fn finish_catalog(&self, page_ids: &[ObjectId], extra_catalog_entries: &[(&str, Object)]) -> Result<()> {
        let mut doc = self.inner.borrow_mut();

        let mut pages_dict = Dictionary::new();
        pages_dict.set("Type", Object::Name(b"Pages".to_vec()));
        pages_dict.set(
            "Kids",
            Object::Array(page_ids.iter().map(|id| Object::Reference(*id)).collect()),
        );
        pages_dict.set("Count", Object::Integer(page_ids.len() as i64));
        let pages_id = doc.add_object(Object::Dictionary(pages_dict));

        for &page_id in page_ids {
            let obj = doc.get_object_mut(page_id).map_err(Error::Pdf)?;
            match obj {
                Object::Dictionary(d) => d.set("Parent", Object::Reference(pages_id)),
                _ => return Err(Error::Pdf(lopdf::Error::Type)),
            };
        }

        let mut catalog = Dictionary::new();
        catalog.set("Type", Object::Name(b"Catalog".to_vec()));
        catalog.set("Pages", Object::Reference(pages_id));
        for (key, value) in extra_catalog_entries {
            catalog.set(*key, value.clone());
        }
        let catalog_id = doc.add_object(Object::Dictionary(catalog));
        doc.trailer.set("Root", Object::Reference(catalog_id));
        Ok(())
    }

    pub fn into_bytes(self) -> Result<Vec<u8>> {
        let mut doc = Rc::try_unwrap(self.inner)
            .map(RefCell::into_inner)
            .unwrap_or_else(|rc| rc.borrow().clone());
        let mut out = Vec::new();
        doc.save_to(&mut out).map_err(Error::Pdf)?;
        Ok(out)
    }
}

/// Recursively copies `id` and everything it (transitively) references
/// from `src` into `dst`, deduplicating via `remap` so shared resources
/// (e.g. a font used by two pages) aren't duplicated.
fn deep_copy_object(
    src: &Document,
    dst: &mut Document,
    id: ObjectId,
    remap: &mut std::collections::BTreeMap<ObjectId, ObjectId>,
) -> Result<ObjectId> {
    if let Some(&mapped) = remap.get(&id) {
        return Ok(mapped);
    }
    let object = src.get_object(id).map_err(Error::Pdf)?.clone();
    let new_id = dst.new_object_id();
    remap.insert(id, new_id);
    let rewritten = rewrite_references(src, dst, object, remap)?;
    dst.objects.insert(new_id, rewritten);
    Ok(new_id)
}

fn rewrite_references(
    src: &Document,
    dst: &mut Document,
    object: Object,
    remap: &mut std::collections::BTreeMap<ObjectId, ObjectId>,
) -> Result<Object> {
    Ok(match object {
        Object::Reference(r) => Object::Reference(deep_copy_object(src, dst, r, remap)?),
        Object::Array(items) => Object::Array(
            items
                .into_iter()
                .map(|o| rewrite_references(src, dst, o, remap))
                .collect::<Result<Vec<_>>>()?,
        ),
        Object::Dictionary(mut d) => {
            let keys: Vec<Vec<u8>> = d.iter().map(|(k, _)| k.clone()).collect();
            for k in keys {
                let v = d.get(&k).unwrap().clone();
                let rewritten = rewrite_references(src, dst, v, remap)?;
                d.set(k, rewritten);
            }
            Object::Dictionary(d)
        }
        Object::Stream(mut s) => {
            let keys: Vec<Vec<u8>> = s.dict.iter().map(|(k, _)| k.clone()).collect();
            for k in keys {
                let v = s.dict.get(&k).unwrap().clone();
                let rewritten = rewrite_references(src, dst, v, remap)?;
                s.dict.set(k, rewritten);
            }
            Object::Stream(s)
        }
        other => other,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_then_add_object_assigns_an_id() {
        let file = PdfFile::create("1.7");
        let id = file.create_object(Object::Dictionary(Dictionary::new()));
        assert!(id.0 > 0);
    }

    #[test]
    fn set_dict_value_roundtrips() {
        let file = PdfFile::create("1.7");
        let id = file.create_object(Object::Dictionary(Dictionary::new()));
        file.set_dict_value(id, "Type", Object::Name(b"Page".to_vec())).unwrap();
        let dict = file.page_dict(id).unwrap();
        assert_eq!(dict.get(b"Type").unwrap().as_name().unwrap(), b"Page");
    }

    #[test]
    fn resolve_dict_follows_an_indirect_reference() {
        let file = PdfFile::create("1.7");
        let mut resources = Dictionary::new();
        resources.set("Font", Dictionary::new());
        let resources_id = file.create_object(Object::Dictionary(resources));

        let mut page = Dictionary::new();
        page.set("Resources", Object::Reference(resources_id));
        let page_id = file.create_object(Object::Dictionary(page));

        let page_dict = file.page_dict(page_id).unwrap();
        let resolved = file.resolve_dict(&page_dict, b"Resources").unwrap();
        assert!(resolved.has(b"Font"));
    }

    #[test]
    fn resolve_passes_through_direct_values() {
        let file = PdfFile::create("1.7");
        let direct = Object::Integer(7);
        assert_eq!(file.resolve(&direct).unwrap(), Object::Integer(7));
    }

    #[test]
    fn import_object_rewrites_references_into_the_destination_document() {
        let source = PdfFile::create("1.7");
        let font_id = source.create_object(Object::Dictionary(Dictionary::new()));
        let mut fonts = Dictionary::new();
        fonts.set("F1", Object::Reference(font_id));
        let mut resources = Dictionary::new();
        resources.set("Font", Object::Dictionary(fonts));

        let dest = PdfFile::create("1.7");
        let imported = dest.import_object(&source, &Object::Dictionary(resources)).unwrap();
        let Object::Dictionary(imported) = imported else { panic!("expected a dictionary") };
        let Object::Dictionary(imported_fonts) = imported.get(b"Font").unwrap() else { panic!("expected a dictionary") };
        let Object::Reference(imported_font_id) = imported_fonts.get(b"F1").unwrap() else { panic!("expected a reference") };

        assert_ne!(*imported_font_id, font_id);
        assert!(dest.object(*imported_font_id).is_ok());
    }

    #[test]
    fn catalog_resolves_the_root_dictionary() {
        let file = PdfFile::create("1.7");
        let lang = Object::String(b"en".to_vec(), lopdf::StringFormat::Literal);
        file.finish_catalog(&[], &[("Lang", lang)]).unwrap();
        let catalog = file.catalog().unwrap();
        assert_eq!(catalog.get(b"Type").unwrap().as_name().unwrap(), b"Catalog");
        assert_eq!(catalog.get(b"Lang").unwrap().as_str().unwrap(), b"en");
    }

    #[test]
    fn finish_catalog_wires_pages_tree_and_parent_pointers() {
        let file = PdfFile::create("1.7");
        let page1 = file.create_object(Object::Dictionary(Dictionary::new()));
        let page2 = file.create_object(Object::Dictionary(Dictionary::new()));
        file.finish_catalog(&[page1, page2], &[]).unwrap();

        let page1_dict = file.page_dict(page1).unwrap();
        assert!(page1_dict.has(b"Parent"));

        let bytes = file.into_bytes().unwrap();
        assert!(!bytes.is_empty());
    }
}
