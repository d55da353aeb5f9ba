//! PDF manipulation module: splitting, merging, report generation

pub mod fonts;
pub mod merge;
pub mod report;
pub mod sample;
pub mod split;

use lopdf::{Document, Object};

use crate::error::{Error, Result};

// Re-export commonly used items
pub use merge::combine_pages;
pub use report::{default_columns, generate_report, ReportColumn, ReportField, ReportLayout};
pub use sample::{sample_csv, sample_pdf};
pub use split::split_pages;

/// A single extracted page: a self-contained one-page PDF document
///
/// `page_number` is 1-based and records the page's position in the
/// originating document.
#[derive(Debug, Clone)]
pub struct PdfPage {
    /// Position in the source document, starting at 1
    pub page_number: usize,
    /// Complete single-page PDF bytes, independently loadable
    pub content: Vec<u8>,
}

/// Count the pages of a PDF held in memory
pub fn page_count(bytes: &[u8]) -> Result<usize> {
    let doc = Document::load_mem(bytes)
        .map_err(|e| Error::Document(format!("failed to load PDF: {}", e)))?;
    count_pages_from_catalog(&doc)
}

/// Count pages by reading the Count field from the Pages dictionary
/// This is more reliable than get_pages() which doesn't handle nested page trees
pub(crate) fn count_pages_from_catalog(doc: &Document) -> Result<usize> {
    let catalog_ref = doc
        .trailer
        .get(b"Root")
        .map_err(|_| Error::Document("no Root in trailer".to_string()))?;

    let catalog_id = match catalog_ref {
        Object::Reference(id) => *id,
        _ => return Err(Error::Document("Root is not a reference".to_string())),
    };

    let catalog = doc
        .get_object(catalog_id)
        .map_err(|e| Error::Document(format!("unreadable catalog: {}", e)))?;

    let catalog_dict = match catalog {
        Object::Dictionary(dict) => dict,
        _ => return Err(Error::Document("catalog is not a dictionary".to_string())),
    };

    let pages_ref = catalog_dict
        .get(b"Pages")
        .map_err(|_| Error::Document("no Pages in catalog".to_string()))?;

    let pages_id = match pages_ref {
        Object::Reference(id) => *id,
        _ => return Err(Error::Document("Pages is not a reference".to_string())),
    };

    let pages_obj = doc
        .get_object(pages_id)
        .map_err(|e| Error::Document(format!("unreadable page tree: {}", e)))?;

    let pages_dict = match pages_obj {
        Object::Dictionary(dict) => dict,
        _ => return Err(Error::Document("Pages is not a dictionary".to_string())),
    };

    let count = pages_dict
        .get(b"Count")
        .map_err(|_| Error::Document("no Count in Pages".to_string()))?;

    match count {
        Object::Integer(n) => Ok(*n as usize),
        _ => Err(Error::Document("Count is not an integer".to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_count_rejects_garbage() {
        let result = page_count(b"definitely not a pdf");
        assert!(matches!(result, Err(Error::Document(_))));
    }
}
