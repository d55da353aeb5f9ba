//! Recombining single-page documents into one multi-page PDF

use std::collections::BTreeMap;

use lopdf::{Dictionary, Document, Object, ObjectId};

use crate::error::{Error, Result};
use crate::pdf::PdfPage;

/// Merge single-page PDFs into one document, ordered by page number
///
/// Pages may arrive in any order; the sort is stable, so repeated page
/// numbers keep their relative order (deduplication is the caller's
/// responsibility). Every buffer's objects are renumbered into a shared id
/// space, then a fresh page tree and catalog are built over the collected
/// page objects. An empty input or an unreadable buffer fails with
/// `Error::Document`.
pub fn combine_pages(pages: &[PdfPage]) -> Result<Vec<u8>> {
    if pages.is_empty() {
        return Err(Error::Document("no pages to combine".to_string()));
    }

    let mut sorted: Vec<&PdfPage> = pages.iter().collect();
    sorted.sort_by_key(|page| page.page_number);

    // Renumber each document into a common id space and collect everything
    let mut max_id = 1;
    let mut page_ids: Vec<ObjectId> = Vec::new();
    let mut objects: BTreeMap<ObjectId, Object> = BTreeMap::new();

    for page in sorted {
        let mut doc = Document::load_mem(&page.content).map_err(|e| {
            Error::Document(format!(
                "failed to load page {}: {}",
                page.page_number, e
            ))
        })?;

        doc.renumber_objects_with(max_id);
        max_id = doc.max_id + 1;

        page_ids.extend(doc.get_pages().into_values());
        objects.extend(doc.objects);
    }

    let mut merged = Document::with_version("1.5");
    merged.objects.extend(objects);
    // new_object_id() must not collide with the ids just imported
    merged.max_id = max_id - 1;

    let pages_id = merged.new_object_id();
    let kids: Vec<Object> = page_ids.iter().map(|&id| Object::Reference(id)).collect();

    let mut pages_object = Dictionary::new();
    pages_object.set("Type", Object::Name(b"Pages".to_vec()));
    pages_object.set("Count", Object::Integer(page_ids.len() as i64));
    pages_object.set("Kids", Object::Array(kids));
    merged.objects.insert(pages_id, Object::Dictionary(pages_object));

    let catalog_id = merged.new_object_id();
    let mut catalog = Dictionary::new();
    catalog.set("Type", Object::Name(b"Catalog".to_vec()));
    catalog.set("Pages", Object::Reference(pages_id));
    merged.objects.insert(catalog_id, Object::Dictionary(catalog));

    merged.trailer.set("Root", Object::Reference(catalog_id));

    for &page_id in &page_ids {
        if let Ok(Object::Dictionary(ref mut dict)) = merged.get_object_mut(page_id) {
            dict.set("Parent", Object::Reference(pages_id));
        }
    }

    merged.compress();

    let mut bytes = Vec::new();
    merged
        .save_to(&mut bytes)
        .map_err(|e| Error::Document(format!("failed to serialize merged PDF: {}", e)))?;
    Ok(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pdf::sample::{sample_pdf, SamplePage};
    use crate::pdf::split::split_pages;
    use crate::pdf::page_count;

    fn three_page_fixture() -> Vec<u8> {
        sample_pdf(&[
            SamplePage::new("MARCIA CARVALHO", "19"),
            SamplePage::new("JOSE DA SILVA", "17"),
            SamplePage::new("MARCOS ROBERTO", "18"),
        ])
        .unwrap()
    }

    fn page_text(bytes: &[u8], page: u32) -> String {
        Document::load_mem(bytes).unwrap().extract_text(&[page]).unwrap()
    }

    #[test]
    fn test_split_then_combine_round_trips() {
        let source = three_page_fixture();
        let pages = split_pages(&source).unwrap();
        let merged = combine_pages(&pages).unwrap();

        assert_eq!(page_count(&merged).unwrap(), 3);
        assert!(page_text(&merged, 1).contains("MARCIA CARVALHO"));
        assert!(page_text(&merged, 2).contains("JOSE DA SILVA"));
        assert!(page_text(&merged, 3).contains("MARCOS ROBERTO"));
    }

    #[test]
    fn test_combine_orders_by_page_number() {
        let mut pages = split_pages(&three_page_fixture()).unwrap();
        pages.reverse();

        let merged = combine_pages(&pages).unwrap();

        assert_eq!(page_count(&merged).unwrap(), 3);
        // Document order follows page_number, not supply order
        assert!(page_text(&merged, 1).contains("MARCIA CARVALHO"));
        assert!(page_text(&merged, 3).contains("MARCOS ROBERTO"));
    }

    #[test]
    fn test_combine_keeps_repeated_page_numbers() {
        let pages = split_pages(&three_page_fixture()).unwrap();
        let doubled = vec![pages[0].clone(), pages[0].clone()];

        let merged = combine_pages(&doubled).unwrap();
        assert_eq!(page_count(&merged).unwrap(), 2);
    }

    #[test]
    fn test_combine_empty_input_fails() {
        assert!(matches!(combine_pages(&[]), Err(Error::Document(_))));
    }

    #[test]
    fn test_combine_rejects_unreadable_page() {
        let pages = vec![PdfPage {
            page_number: 1,
            content: b"broken".to_vec(),
        }];
        assert!(matches!(combine_pages(&pages), Err(Error::Document(_))));
    }
}
