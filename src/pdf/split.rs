//! Splitting a multi-page PDF into independent single-page documents

use lopdf::{Dictionary, Document, Object, ObjectId};

use crate::error::{Error, Result};
use crate::pdf::PdfPage;

/// Split a PDF buffer into one self-contained document per page
///
/// Pages keep their document order and are numbered from 1. Each output
/// buffer is a complete PDF that loads on its own. An unreadable buffer or
/// a document without pages fails with `Error::Document`; no partial output
/// is returned.
pub fn split_pages(bytes: &[u8]) -> Result<Vec<PdfPage>> {
    let source = Document::load_mem(bytes)
        .map_err(|e| Error::Document(format!("failed to load PDF: {}", e)))?;

    let page_ids: Vec<ObjectId> = source.get_pages().into_values().collect();
    if page_ids.is_empty() {
        return Err(Error::Document("PDF has no pages".to_string()));
    }

    let mut pages = Vec::with_capacity(page_ids.len());
    for (index, page_id) in page_ids.into_iter().enumerate() {
        let content = extract_single_page(&source, page_id)?;
        pages.push(PdfPage {
            page_number: index + 1,
            content,
        });
    }

    Ok(pages)
}

/// Build a standalone document holding only the given page
///
/// Works on a clone of the source: the page gets a fresh one-entry page
/// tree and catalog, everything unreachable from it is pruned away.
fn extract_single_page(source: &Document, page_id: ObjectId) -> Result<Vec<u8>> {
    let mut single = source.clone();

    // Attributes a page may inherit from its parent chain must be copied
    // onto the page dictionary before it is re-parented under a fresh tree.
    let inherited: Vec<(&[u8], Object)> = [
        b"Resources".as_slice(),
        b"MediaBox".as_slice(),
        b"CropBox".as_slice(),
        b"Rotate".as_slice(),
    ]
    .iter()
    .filter_map(|key| inherited_attribute(&single, page_id, key).map(|value| (*key, value)))
    .collect();

    if let Ok(Object::Dictionary(ref mut page_dict)) = single.get_object_mut(page_id) {
        for (key, value) in inherited {
            if page_dict.get(key).is_err() {
                page_dict.set(key, value);
            }
        }
    }

    // Fresh single-entry page tree and catalog
    let pages_id = single.new_object_id();
    let mut pages_object = Dictionary::new();
    pages_object.set("Type", Object::Name(b"Pages".to_vec()));
    pages_object.set("Count", Object::Integer(1));
    pages_object.set("Kids", Object::Array(vec![Object::Reference(page_id)]));
    single.objects.insert(pages_id, Object::Dictionary(pages_object));

    let catalog_id = single.new_object_id();
    let mut catalog = Dictionary::new();
    catalog.set("Type", Object::Name(b"Catalog".to_vec()));
    catalog.set("Pages", Object::Reference(pages_id));
    single.objects.insert(catalog_id, Object::Dictionary(catalog));

    single.trailer.set("Root", Object::Reference(catalog_id));
    single.trailer.remove(b"Info");

    if let Ok(Object::Dictionary(ref mut page_dict)) = single.get_object_mut(page_id) {
        page_dict.set("Parent", Object::Reference(pages_id));
    }

    // Drop the remaining pages and the old tree, then serialize
    single.prune_objects();
    single.renumber_objects();
    single.compress();

    let mut content = Vec::new();
    single
        .save_to(&mut content)
        .map_err(|e| Error::Document(format!("failed to serialize page: {}", e)))?;

    Ok(content)
}

/// Resolve a page attribute, walking up the parent chain if needed
fn inherited_attribute(doc: &Document, page_id: ObjectId, key: &[u8]) -> Option<Object> {
    let mut current = page_id;
    loop {
        let dict = match doc.get_object(current) {
            Ok(Object::Dictionary(dict)) => dict,
            _ => return None,
        };
        if let Ok(value) = dict.get(key) {
            return Some(value.clone());
        }
        match dict.get(b"Parent") {
            Ok(Object::Reference(parent)) => current = *parent,
            _ => return None,
        }
    }
}
