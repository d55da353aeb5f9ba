//! The three pipelines: CSV import, PDF processing and report generation
//!
//! Each operation wires the engine components against the storage and file
//! seams and returns a structured outcome. Row-level problems are counted,
//! not raised; an operation that ends up with zero usable boletos fails with
//! `Error::NotFound` instead of producing an empty artifact.

use std::path::Path;

use tracing::info;

use crate::domain::{Boleto, BoletoFilter};
use crate::error::{Error, Result};
use crate::files::{archival_name, FileSaveResult, FileStore};
use crate::import::{self, SkippedRows};
use crate::pdf::{self, report::{ReportColumn, ReportLayout}};
use crate::reconcile::{self, ReconcileSummary};
use crate::store::{BoletoStore, LoteDirectory};

/// Result of one CSV import
#[derive(Debug)]
pub struct ImportOutcome {
    /// Boletos persisted in this import, with their assigned ids
    pub saved: Vec<Boleto>,
    /// Rows dropped during mapping, by reason
    pub skipped: SkippedRows,
    /// Where the original CSV content was archived
    pub archive: FileSaveResult,
}

/// Parse, map, bulk-save and archive one CSV upload
///
/// The whole batch saves inside one transaction; a lote conflict rolls it
/// back entirely (`Error::Conflict`). A CSV whose rows all drop during
/// mapping fails with `Error::NotFound` and archives nothing.
pub fn import_csv<S>(
    store: &S,
    files: &FileStore,
    content: &str,
    original_name: &str,
) -> Result<ImportOutcome>
where
    S: BoletoStore + LoteDirectory,
{
    let records = import::parse_records(content)?;
    let outcome = import::map_to_boletos(&records, store)?;

    if outcome.boletos.is_empty() {
        return Err(Error::NotFound(format!(
            "no importable boletos in '{}' ({} rows dropped)",
            original_name,
            outcome.skipped.total()
        )));
    }

    let saved = store.save_many(&outcome.boletos)?;

    let archive = files.save_file(
        &archival_name(original_name),
        content.as_bytes(),
        &files.csv_archive_dir(),
    )?;

    info!(
        saved = saved.len(),
        skipped = outcome.skipped.total(),
        archive = %archive.path.display(),
        "CSV import finished"
    );

    Ok(ImportOutcome {
        saved,
        skipped: outcome.skipped,
        archive,
    })
}

/// Result of processing one uploaded PDF
#[derive(Debug)]
pub struct ProcessOutcome {
    /// Per-boleto files written, in ascending id order
    pub written: Vec<FileSaveResult>,
    /// How the positional pairing went
    pub summary: ReconcileSummary,
    /// Where the recombined document was archived
    pub archive: FileSaveResult,
}

/// Split an uploaded PDF, reconcile pages against stored boletos and write
/// one `{id}.pdf` per paired boleto under `output_dir`
///
/// The split pages are also merged back in order and archived. Requires at
/// least one active boleto in storage; pairing excess on either side is
/// reported in the summary, not raised.
pub fn process_pdf<S>(
    store: &S,
    files: &FileStore,
    pdf_bytes: &[u8],
    original_name: &str,
    output_dir: &Path,
) -> Result<ProcessOutcome>
where
    S: BoletoStore,
{
    let boletos = store.list_active(&BoletoFilter::default())?;
    if boletos.is_empty() {
        return Err(Error::NotFound(
            "no boletos found for processing".to_string(),
        ));
    }

    let pages = pdf::split_pages(pdf_bytes)?;
    let combined = pdf::combine_pages(&pages)?;

    let reconciliation = reconcile::pair_with_pages(&boletos, pages);

    let mut written = Vec::with_capacity(reconciliation.pages_by_id.len());
    for (id, page) in &reconciliation.pages_by_id {
        let result = files.save_file(&format!("{}.pdf", id), &page.content, output_dir)?;
        written.push(result);
    }

    let archive = files.save_file(
        &archival_name(original_name),
        &combined,
        &files.pdf_archive_dir(),
    )?;

    info!(
        written = written.len(),
        archive = %archive.path.display(),
        "PDF processing finished"
    );

    Ok(ProcessOutcome {
        written,
        summary: reconciliation.summary,
        archive,
    })
}

/// Result of one report generation
#[derive(Debug)]
pub struct ReportOutcome {
    /// The assembled PDF
    pub bytes: Vec<u8>,
    /// The boletos the report covers, ascending by id
    pub boletos: Vec<Boleto>,
}

/// Render the report for the active boletos matching the filter
pub fn generate_report<S>(
    store: &S,
    filter: &BoletoFilter,
    columns: &[ReportColumn],
    layout: &ReportLayout,
) -> Result<ReportOutcome>
where
    S: BoletoStore,
{
    let boletos = store.list_active(filter)?;
    if boletos.is_empty() {
        return Err(Error::NotFound(
            "no boletos match the requested filters".to_string(),
        ));
    }

    let bytes = pdf::report::generate_report(&boletos, columns, layout)?;

    info!(boletos = boletos.len(), "report generated");

    Ok(ReportOutcome { bytes, boletos })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Lote;
    use crate::pdf::report::default_columns;
    use crate::pdf::sample::{demo_pages, sample_csv, sample_pdf};
    use crate::store::SqliteStore;
    use tempfile::TempDir;

    fn seeded_store() -> SqliteStore {
        let store = SqliteStore::in_memory().unwrap();
        for name in ["0017", "0018", "0019"] {
            store.insert_lote(&Lote::new(name).unwrap()).unwrap();
        }
        store
    }

    #[test]
    fn test_import_saves_and_archives() {
        let tmp = TempDir::new().unwrap();
        let store = seeded_store();
        let files = FileStore::new(tmp.path());

        let outcome =
            import_csv(&store, &files, &sample_csv(&demo_pages()), "boletos.csv").unwrap();

        assert_eq!(outcome.saved.len(), 3);
        assert_eq!(outcome.skipped.total(), 0);
        assert!(outcome.archive.path.exists());
        assert!(outcome.archive.path.starts_with(tmp.path().join("csv")));
    }

    #[test]
    fn test_import_with_no_usable_rows_is_not_found() {
        let tmp = TempDir::new().unwrap();
        let store = seeded_store();
        let files = FileStore::new(tmp.path());

        let content = "nome;unidade;valor;linha_digitavel\nJOSE;9999;10.0;123";
        let result = import_csv(&store, &files, content, "boletos.csv");

        assert!(matches!(result, Err(Error::NotFound(_))));
        assert!(!tmp.path().join("csv").exists(), "nothing archived on failure");
    }

    #[test]
    fn test_process_requires_stored_boletos() {
        let tmp = TempDir::new().unwrap();
        let store = seeded_store();
        let files = FileStore::new(tmp.path());
        let pdf_bytes = sample_pdf(&demo_pages()).unwrap();

        let result = process_pdf(
            &store,
            &files,
            &pdf_bytes,
            "upload.pdf",
            &tmp.path().join("out"),
        );
        assert!(matches!(result, Err(Error::NotFound(_))));
    }

    #[test]
    fn test_process_writes_one_file_per_boleto() {
        let tmp = TempDir::new().unwrap();
        let store = seeded_store();
        let files = FileStore::new(tmp.path());

        import_csv(&store, &files, &sample_csv(&demo_pages()), "boletos.csv").unwrap();

        let pdf_bytes = sample_pdf(&demo_pages()).unwrap();
        let out_dir = tmp.path().join("boletos");
        let outcome =
            process_pdf(&store, &files, &pdf_bytes, "upload.pdf", &out_dir).unwrap();

        assert_eq!(outcome.written.len(), 3);
        assert!(outcome.summary.is_exact());
        let names: Vec<&str> = outcome.written.iter().map(|w| w.name.as_str()).collect();
        assert_eq!(names, vec!["1.pdf", "2.pdf", "3.pdf"]);
        assert!(outcome.archive.path.starts_with(tmp.path().join("pdf")));
    }

    #[test]
    fn test_report_not_found_on_empty_store() {
        let store = seeded_store();
        let result = generate_report(
            &store,
            &BoletoFilter::default(),
            &default_columns(),
            &ReportLayout::default(),
        );
        assert!(matches!(result, Err(Error::NotFound(_))));
    }

    #[test]
    fn test_report_covers_filtered_boletos() {
        let tmp = TempDir::new().unwrap();
        let store = seeded_store();
        let files = FileStore::new(tmp.path());
        import_csv(&store, &files, &sample_csv(&demo_pages()), "boletos.csv").unwrap();

        let outcome = generate_report(
            &store,
            &BoletoFilter {
                min_amount: Some(150.0),
                ..Default::default()
            },
            &default_columns(),
            &ReportLayout::default(),
        )
        .unwrap();

        assert_eq!(outcome.boletos.len(), 2);
        assert_eq!(pdf::page_count(&outcome.bytes).unwrap(), 1);
    }
}
