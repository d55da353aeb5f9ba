//! Positional pairing of persisted boletos with extracted PDF pages
//!
//! The pairing is positional, not content-based: it relies on the caller's
//! guarantee that the boletos and the uploaded document originate from the
//! same batch, authored in matching order. Under that precondition, sorting
//! boletos by identifier recovers the authoring order and the i-th boleto
//! owns the i-th page.

use std::collections::BTreeMap;

use tracing::info;

use crate::domain::Boleto;
use crate::pdf::PdfPage;

/// What fell out of a pairing run, counted by reason
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReconcileSummary {
    /// Pairs actually produced
    pub paired: usize,
    /// Boletos without a storage identifier, excluded up front
    pub missing_id: usize,
    /// Boletos beyond the page count
    pub unpaired_boletos: usize,
    /// Pages beyond the boleto count
    pub unpaired_pages: usize,
}

impl ReconcileSummary {
    /// True when every boleto and every page found a partner
    pub fn is_exact(&self) -> bool {
        self.missing_id == 0 && self.unpaired_boletos == 0 && self.unpaired_pages == 0
    }
}

/// The id-to-page mapping plus its summary
#[derive(Debug)]
pub struct Reconciliation {
    /// Pages keyed by boleto identifier, iterated in ascending id order
    pub pages_by_id: BTreeMap<i64, PdfPage>,
    pub summary: ReconcileSummary,
}

/// Pair boletos with pages by position
///
/// Precondition: boletos and pages come from the same originating batch in
/// matching order; the sort key is the identifier, ascending. Boletos
/// without an identifier cannot be output targets and are skipped. A size
/// mismatch is not an error: exactly `min(boletos, pages)` pairs are
/// produced and the excess on either side is counted in the summary.
pub fn pair_with_pages(boletos: &[Boleto], pages: Vec<PdfPage>) -> Reconciliation {
    let mut with_id: Vec<(i64, &Boleto)> = boletos
        .iter()
        .filter_map(|b| b.id().map(|id| (id, b)))
        .collect();
    let missing_id = boletos.len() - with_id.len();

    with_id.sort_by_key(|(id, _)| *id);

    let page_total = pages.len();
    let paired = with_id.len().min(page_total);

    let pages_by_id: BTreeMap<i64, PdfPage> = with_id
        .iter()
        .map(|(id, _)| *id)
        .zip(pages)
        .collect();

    let summary = ReconcileSummary {
        paired,
        missing_id,
        unpaired_boletos: with_id.len() - paired,
        unpaired_pages: page_total - paired,
    };

    if !summary.is_exact() {
        info!(
            paired = summary.paired,
            missing_id = summary.missing_id,
            unpaired_boletos = summary.unpaired_boletos,
            unpaired_pages = summary.unpaired_pages,
            "reconciliation left items unmatched"
        );
    }

    Reconciliation {
        pages_by_id,
        summary,
    }
}
